//! DRAM Command Encodings.
//!
//! Commands travel on the channel as three active-low control bits (RAS#, CAS#,
//! WE#) plus a bank and an address field. Address bit 10 selects the all-banks
//! precharge and the long ZQ calibration; address bit 12 selects the burst length
//! of column commands.
//!
//! | RAS# | CAS# | WE# | Command            |
//! |------|------|-----|--------------------|
//! | 0    | 0    | 0   | `MRS`              |
//! | 0    | 0    | 1   | `REF`              |
//! | 0    | 1    | 0   | `PRE` / `PREA`     |
//! | 0    | 1    | 1   | `ACT`              |
//! | 1    | 0    | 0   | `WR`               |
//! | 1    | 0    | 1   | `RD`               |
//! | 1    | 1    | 0   | `ZQCS` / `ZQCL`    |
//! | 1    | 1    | 1   | `NOP`              |

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DecodeError;

/// Address bit selecting all banks (precharge) or long calibration (ZQ).
pub const A10: u32 = 1 << 10;

/// Address bit selecting an 8-beat burst on column commands.
pub const A12: u32 = 1 << 12;

/// Column bits carried in the address field of column commands.
pub const COLUMN_MASK: u32 = 0xFFF;

/// Largest valid control code.
pub const MAX_CODE: u8 = 0b111;

/// Asserted (active-high) view of the RAS#/CAS#/WE# control lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ControlBits {
    pub ras: bool,
    pub cas: bool,
    pub we: bool,
}

impl ControlBits {
    pub const NOP: Self = Self::new(false, false, false);
    pub const ACTIVATE: Self = Self::new(true, false, false);
    pub const PRECHARGE: Self = Self::new(true, false, true);
    pub const READ: Self = Self::new(false, true, false);
    pub const WRITE: Self = Self::new(false, true, true);
    pub const REFRESH: Self = Self::new(true, true, false);
    pub const ZQ_CALIBRATION: Self = Self::new(false, false, true);
    pub const MODE_REGISTER_SET: Self = Self::new(true, true, true);

    pub const fn new(ras: bool, cas: bool, we: bool) -> Self {
        Self { ras, cas, we }
    }

    /// Packs the bits into the active-low `{RAS#, CAS#, WE#}` code.
    pub fn code(&self) -> u8 {
        ((!self.ras as u8) << 2) | ((!self.cas as u8) << 1) | (!self.we as u8)
    }

    /// Unpacks an active-low control code.
    ///
    /// # Arguments
    ///
    /// * `code` - The `{RAS#, CAS#, WE#}` code.
    ///
    /// # Returns
    ///
    /// The asserted control bits, or `DecodeError::UnknownCode` for codes wider
    /// than three bits.
    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        if code > MAX_CODE {
            return Err(DecodeError::UnknownCode(code));
        }
        Ok(Self::new(code & 0b100 == 0, code & 0b010 == 0, code & 0b001 == 0))
    }

    pub fn is_nop(&self) -> bool {
        !self.ras && !self.cas && !self.we
    }
}

/// Named DRAM command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommandKind {
    #[serde(rename = "ACT")]
    Activate,
    #[serde(rename = "PRE")]
    Precharge,
    #[serde(rename = "PREA")]
    PrechargeAll,
    #[serde(rename = "RD")]
    Read,
    #[serde(rename = "WR")]
    Write,
    #[serde(rename = "REF")]
    Refresh,
    #[serde(rename = "ZQCS")]
    ZqShort,
    #[serde(rename = "ZQCL")]
    ZqLong,
    #[serde(rename = "MRS")]
    ModeRegisterSet,
    #[serde(rename = "NOP")]
    Nop,
}

impl CommandKind {
    pub const ALL: [CommandKind; 10] = [
        CommandKind::Activate,
        CommandKind::Precharge,
        CommandKind::PrechargeAll,
        CommandKind::Read,
        CommandKind::Write,
        CommandKind::Refresh,
        CommandKind::ZqShort,
        CommandKind::ZqLong,
        CommandKind::ModeRegisterSet,
        CommandKind::Nop,
    ];

    /// Decodes a control code and address into a command name.
    ///
    /// # Arguments
    ///
    /// * `code` - Active-low `{RAS#, CAS#, WE#}` code.
    /// * `address` - Address field; bit 10 selects `PREA` and `ZQCL`.
    pub fn decode(code: u8, address: u32) -> Result<Self, DecodeError> {
        let a10 = address & A10 != 0;
        let kind = match code {
            0b000 => CommandKind::ModeRegisterSet,
            0b001 => CommandKind::Refresh,
            0b010 if a10 => CommandKind::PrechargeAll,
            0b010 => CommandKind::Precharge,
            0b011 => CommandKind::Activate,
            0b100 => CommandKind::Write,
            0b101 => CommandKind::Read,
            0b110 if a10 => CommandKind::ZqLong,
            0b110 => CommandKind::ZqShort,
            0b111 => CommandKind::Nop,
            _ => return Err(DecodeError::UnknownCode(code)),
        };
        Ok(kind)
    }

    /// Short JEDEC-style name.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            CommandKind::Activate => "ACT",
            CommandKind::Precharge => "PRE",
            CommandKind::PrechargeAll => "PREA",
            CommandKind::Read => "RD",
            CommandKind::Write => "WR",
            CommandKind::Refresh => "REF",
            CommandKind::ZqShort => "ZQCS",
            CommandKind::ZqLong => "ZQCL",
            CommandKind::ModeRegisterSet => "MRS",
            CommandKind::Nop => "NOP",
        }
    }

    /// Single-bank and all-bank precharge match each other in timing rules.
    pub fn is_precharge(&self) -> bool {
        matches!(self, CommandKind::Precharge | CommandKind::PrechargeAll)
    }

    pub fn is_column(&self) -> bool {
        matches!(self, CommandKind::Read | CommandKind::Write)
    }

    /// Commands whose bank field addresses a single DRAM bank.
    pub fn is_bank_addressed(&self) -> bool {
        matches!(
            self,
            CommandKind::Activate | CommandKind::Precharge | CommandKind::Read | CommandKind::Write
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Burst length selected by address bit 12 of a column command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Burst {
    #[serde(rename = "BC4")]
    Chop4,
    #[serde(rename = "BL8")]
    Length8,
}

/// One cycle of the command channel as observed on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommand {
    /// Active-low `{RAS#, CAS#, WE#}` code.
    pub code: u8,
    #[serde(default)]
    pub bank: u32,
    #[serde(default)]
    pub address: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub cs_n: bool,
    #[serde(default = "default_cke", skip_serializing_if = "is_true")]
    pub cke: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub wrdata_en: bool,
}

impl Default for RawCommand {
    fn default() -> Self {
        Self::nop()
    }
}

impl RawCommand {
    /// Idle channel cycle.
    pub fn nop() -> Self {
        Self {
            code: MAX_CODE,
            bank: 0,
            address: 0,
            rank: None,
            cs_n: false,
            cke: true,
            wrdata_en: false,
        }
    }

    pub fn new(bits: ControlBits, bank: u32, address: u32) -> Self {
        Self {
            code: bits.code(),
            bank,
            address,
            ..Self::nop()
        }
    }

    pub fn with_rank(mut self, rank: Option<u32>) -> Self {
        self.rank = rank;
        self
    }

    /// Decodes the cycle into a named command.
    ///
    /// # Arguments
    ///
    /// * `time` - Time stamp attached to the decoded command.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the device is deselected (`cs_n` high or `cke` low),
    /// the decoded command otherwise, or `DecodeError` for an unknown code.
    pub fn decode(&self, time: u64) -> Result<Option<Command>, DecodeError> {
        if self.cs_n || !self.cke {
            return Ok(None);
        }
        let kind = CommandKind::decode(self.code, self.address)?;
        let mut cmd = Command {
            kind,
            time,
            rank: self.rank,
            bank: None,
            row: None,
            col: None,
            burst: None,
        };
        match kind {
            CommandKind::Activate => {
                cmd.bank = Some(self.bank);
                cmd.row = Some(self.address);
            }
            CommandKind::Read | CommandKind::Write => {
                cmd.bank = Some(self.bank);
                cmd.col = Some(self.address & COLUMN_MASK);
                cmd.burst = Some(if self.address & A12 != 0 {
                    Burst::Length8
                } else {
                    Burst::Chop4
                });
            }
            CommandKind::Precharge | CommandKind::ModeRegisterSet => {
                cmd.bank = Some(self.bank);
            }
            _ => {}
        }
        Ok(Some(cmd))
    }
}

fn default_cke() -> bool {
    true
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_true(v: &bool) -> bool {
    *v
}

/// A decoded command with its time stamp and arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Command {
    pub kind: CommandKind,
    pub time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst: Option<Burst>,
}

impl Command {
    /// `(rank, bank)` of a command that addresses one bank.
    pub fn bank_key(&self) -> Option<(u32, u32)> {
        if !self.kind.is_bank_addressed() {
            return None;
        }
        self.bank.map(|bank| (self.rank.unwrap_or(0), bank))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={:<10} {:<4}", self.time, self.kind.mnemonic())?;
        if let Some(rank) = self.rank {
            write!(f, " rank={}", rank)?;
        }
        if let Some(bank) = self.bank {
            write!(f, " bank={}", bank)?;
        }
        if let Some(row) = self.row {
            write!(f, " row={:#06x}", row)?;
        }
        if let Some(col) = self.col {
            write!(f, " col={:#05x}", col)?;
        }
        if let Some(burst) = self.burst {
            let name = match burst {
                Burst::Chop4 => "BC4",
                Burst::Length8 => "BL8",
            };
            write!(f, " {}", name)?;
        }
        Ok(())
    }
}
