//! Phase steering.
//!
//! A controller cycle carries `nphases` DFI command slots. The steerer fills each
//! slot from one source (nothing, the row-command chooser, the column-command
//! chooser, or the refresher) and derives the read and write data enables. Write
//! data enables are delayed by the PHY write latency.

use std::collections::VecDeque;

use crate::common::command::{CommandKind, ControlBits, RawCommand};
use crate::core::refresh::RefreshCommand;
use crate::soc::traits::BankRequest;

/// Source selected for one phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Steer {
    Nop,
    Cmd,
    Req,
    Refresh,
}

/// Chip select for one phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankSelect {
    All,
    One(u32),
}

/// Command slot driven on one DFI phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseCommand {
    pub bits: ControlBits,
    pub rank: RankSelect,
    pub bank: u32,
    pub address: u32,
    pub rddata_en: bool,
    pub wrdata_en: bool,
}

impl PhaseCommand {
    pub fn nop() -> Self {
        Self {
            bits: ControlBits::NOP,
            rank: RankSelect::All,
            bank: 0,
            address: 0,
            rddata_en: false,
            wrdata_en: false,
        }
    }

    pub fn is_nop(&self) -> bool {
        self.bits.is_nop()
    }

    /// Named command carried by this slot.
    pub fn kind(&self) -> CommandKind {
        // Every ControlBits value encodes to a valid three-bit code.
        CommandKind::decode(self.bits.code(), self.address).unwrap_or(CommandKind::Nop)
    }

    /// Wire view of the slot.
    ///
    /// # Arguments
    ///
    /// * `nranks` - Ranks on the channel; with a single rank no rank is reported.
    pub fn to_raw(&self, nranks: usize) -> RawCommand {
        let rank = match self.rank {
            RankSelect::One(rank) if nranks > 1 => Some(rank),
            _ => None,
        };
        let mut raw = RawCommand::new(self.bits, self.bank, self.address).with_rank(rank);
        raw.wrdata_en = self.wrdata_en;
        raw
    }
}

/// Routes chosen commands to DFI phases.
#[derive(Clone, Debug)]
pub struct Steerer {
    nbanks: usize,
    wrdata: Vec<VecDeque<bool>>,
}

impl Steerer {
    /// Creates a steerer.
    ///
    /// # Arguments
    ///
    /// * `nphases` - DFI phases per controller cycle.
    /// * `nbanks` - Banks per rank; bank unit `u` is rank `u / nbanks`.
    /// * `t_phy_wrlat` - Cycles between a write command and its data enable.
    pub fn new(nphases: usize, nbanks: usize, t_phy_wrlat: u32) -> Self {
        let line = VecDeque::from(vec![false; t_phy_wrlat as usize]);
        Self {
            nbanks: nbanks.max(1),
            wrdata: vec![line; nphases],
        }
    }

    fn from_request(&self, req: &BankRequest) -> PhaseCommand {
        PhaseCommand {
            bits: req.bits,
            rank: RankSelect::One((req.unit / self.nbanks) as u32),
            bank: (req.unit % self.nbanks) as u32,
            address: req.address,
            rddata_en: req.is_read,
            wrdata_en: req.is_write,
        }
    }

    /// Builds the phase slots for one cycle.
    ///
    /// # Arguments
    ///
    /// * `sel` - Source per phase.
    /// * `cmd` - Accepted row command, if any.
    /// * `req` - Accepted column command, if any.
    /// * `refresh` - Refresher command, if any.
    pub fn steer(
        &mut self,
        sel: &[Steer],
        cmd: Option<&BankRequest>,
        req: Option<&BankRequest>,
        refresh: Option<&RefreshCommand>,
    ) -> Vec<PhaseCommand> {
        let mut phases = Vec::with_capacity(sel.len());
        for (i, steer) in sel.iter().enumerate() {
            let mut slot = match steer {
                Steer::Nop => PhaseCommand::nop(),
                Steer::Cmd => cmd.map_or_else(PhaseCommand::nop, |r| self.from_request(r)),
                Steer::Req => req.map_or_else(PhaseCommand::nop, |r| self.from_request(r)),
                Steer::Refresh => refresh.map_or_else(PhaseCommand::nop, |r| PhaseCommand {
                    bits: r.bits,
                    address: r.address,
                    ..PhaseCommand::nop()
                }),
            };
            if let Some(line) = self.wrdata.get_mut(i) {
                line.push_back(slot.wrdata_en);
                slot.wrdata_en = line.pop_front().unwrap_or(false);
            }
            phases.push(slot);
        }
        phases
    }
}
