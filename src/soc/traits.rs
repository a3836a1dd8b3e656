//! Bank Unit Traits.
//!
//! This module defines the interface between the controller core and the
//! per-bank state machines that feed it. A bank unit tracks its own open row
//! and transaction queue; each cycle it presents at most one command request,
//! and the controller answers with a `ready` strobe when that request is
//! issued on the channel.

use crate::common::command::{ControlBits, A10};
use crate::core::registers::Timings;

/// Command request presented by one bank unit.
///
/// `is_cmd` marks row commands (activate, precharge); `is_read` and `is_write`
/// mark column commands. The control bits are asserted-high.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BankRequest {
    pub valid: bool,
    pub is_cmd: bool,
    pub is_read: bool,
    pub is_write: bool,
    pub bits: ControlBits,
    /// Bank unit index on the channel (rank-major).
    pub unit: usize,
    pub address: u32,
}

impl BankRequest {
    /// No request this cycle.
    pub fn idle(unit: usize) -> Self {
        Self {
            unit,
            ..Self::default()
        }
    }

    /// Row activate.
    pub fn activate(unit: usize, row: u32) -> Self {
        Self {
            valid: true,
            is_cmd: true,
            bits: ControlBits::ACTIVATE,
            unit,
            address: row,
            ..Self::default()
        }
    }

    /// Single-bank precharge (A10 low).
    pub fn precharge(unit: usize) -> Self {
        Self {
            valid: true,
            is_cmd: true,
            bits: ControlBits::PRECHARGE,
            unit,
            address: 0,
            ..Self::default()
        }
    }

    /// Column read.
    pub fn read(unit: usize, col: u32) -> Self {
        Self {
            valid: true,
            is_read: true,
            bits: ControlBits::READ,
            unit,
            address: col & !A10,
            ..Self::default()
        }
    }

    /// Column write.
    pub fn write(unit: usize, col: u32) -> Self {
        Self {
            valid: true,
            is_write: true,
            bits: ControlBits::WRITE,
            unit,
            address: col & !A10,
            ..Self::default()
        }
    }

    /// `true` for an activate (RAS only).
    pub fn is_activate(&self) -> bool {
        self.bits == ControlBits::ACTIVATE
    }

    pub fn is_precharge(&self) -> bool {
        self.bits == ControlBits::PRECHARGE
    }
}

/// Per-bank state machine driven by the controller.
///
/// The controller calls `request` and `refresh_gnt` at the start of a cycle,
/// arbitrates, and then calls `tick` exactly once with the outcome.
pub trait BankUnit {
    /// The request presented this cycle.
    fn request(&self) -> BankRequest;

    /// `true` once the bank is precharge-ready for a pending refresh.
    fn refresh_gnt(&self) -> bool;

    /// Commits one cycle.
    ///
    /// # Arguments
    ///
    /// * `ready` - The request returned by `request` was issued this cycle.
    /// * `refresh_req` - The refresher is holding a refresh request.
    /// * `timings` - Timing register snapshot for this cycle.
    fn tick(&mut self, ready: bool, refresh_req: bool, timings: &Timings);
}
