//! Memory Transaction Types.
//!
//! This module defines the transactions queued in front of each bank unit. A
//! transaction is already split into its bank, row and column coordinates; the
//! bank unit turns it into activate, column and precharge requests.

use serde::Serialize;

/// Direction of a memory transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Data read access.
    ///
    /// Issued on the channel as a `RD` column command while the scheduler is
    /// in its read phase.
    Read,

    /// Data write access.
    ///
    /// Issued on the channel as a `WR` column command while the scheduler is
    /// in its write phase.
    Write,
}

/// A single transaction addressed to one bank unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub access: AccessType,
    /// Bank unit index (rank-major: `rank * nbanks + bank`).
    pub unit: usize,
    pub row: u32,
    pub col: u32,
}

impl Transaction {
    /// Creates a read transaction.
    pub fn read(unit: usize, row: u32, col: u32) -> Self {
        Self {
            access: AccessType::Read,
            unit,
            row,
            col,
        }
    }

    /// Creates a write transaction.
    pub fn write(unit: usize, row: u32, col: u32) -> Self {
        Self {
            access: AccessType::Write,
            unit,
            row,
            col,
        }
    }

    pub fn is_write(&self) -> bool {
        self.access == AccessType::Write
    }
}
