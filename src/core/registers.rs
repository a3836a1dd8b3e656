//! Programmable timing registers.
//!
//! Timing values are held in cycles of the controller clock. Each register is
//! sized from the largest value it is expected to hold (one bit wider than that
//! value needs), and every write is checked against that width. The controller
//! reads one immutable `Timings` snapshot per tick, so a write takes effect at
//! the next cycle boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::ConfigError;

/// Timing register selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimingReg {
    #[serde(rename = "tRP")]
    Rp,
    #[serde(rename = "tRCD")]
    Rcd,
    #[serde(rename = "tWR")]
    Wr,
    #[serde(rename = "tWTR")]
    Wtr,
    #[serde(rename = "tREFI")]
    Refi,
    #[serde(rename = "tRFC")]
    Rfc,
    #[serde(rename = "tFAW")]
    Faw,
    #[serde(rename = "tCCD")]
    Ccd,
    #[serde(rename = "tRRD")]
    Rrd,
    #[serde(rename = "tRC")]
    Rc,
    #[serde(rename = "tRAS")]
    Ras,
    #[serde(rename = "tZQCS")]
    Zqcs,
}

impl TimingReg {
    pub const ALL: [TimingReg; 12] = [
        TimingReg::Rp,
        TimingReg::Rcd,
        TimingReg::Wr,
        TimingReg::Wtr,
        TimingReg::Refi,
        TimingReg::Rfc,
        TimingReg::Faw,
        TimingReg::Ccd,
        TimingReg::Rrd,
        TimingReg::Rc,
        TimingReg::Ras,
        TimingReg::Zqcs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TimingReg::Rp => "tRP",
            TimingReg::Rcd => "tRCD",
            TimingReg::Wr => "tWR",
            TimingReg::Wtr => "tWTR",
            TimingReg::Refi => "tREFI",
            TimingReg::Rfc => "tRFC",
            TimingReg::Faw => "tFAW",
            TimingReg::Ccd => "tCCD",
            TimingReg::Rrd => "tRRD",
            TimingReg::Rc => "tRC",
            TimingReg::Ras => "tRAS",
            TimingReg::Zqcs => "tZQCS",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TimingReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Timing values in controller-clock cycles.
///
/// Entries missing from a `[timing]` table take their default values, except
/// tZQCS which stays unconfigured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    #[serde(rename = "tRP")]
    pub t_rp: u32,
    #[serde(rename = "tRCD")]
    pub t_rcd: u32,
    #[serde(rename = "tWR")]
    pub t_wr: u32,
    #[serde(rename = "tWTR")]
    pub t_wtr: u32,
    #[serde(rename = "tREFI")]
    pub t_refi: u32,
    #[serde(rename = "tRFC")]
    pub t_rfc: u32,
    #[serde(rename = "tFAW")]
    pub t_faw: u32,
    #[serde(rename = "tCCD")]
    pub t_ccd: u32,
    #[serde(rename = "tRRD")]
    pub t_rrd: u32,
    #[serde(rename = "tRC")]
    pub t_rc: u32,
    #[serde(rename = "tRAS")]
    pub t_ras: u32,
    /// ZQ short calibration time; `None` disables periodic ZQCS.
    #[serde(rename = "tZQCS", default, skip_serializing_if = "Option::is_none")]
    pub t_zqcs: Option<u32>,
}

impl Default for Timings {
    /// DDR3-class timings for a 100 MHz controller clock.
    fn default() -> Self {
        Self {
            t_rp: 3,
            t_rcd: 3,
            t_wr: 3,
            t_wtr: 2,
            t_refi: 780,
            t_rfc: 26,
            t_faw: 8,
            t_ccd: 2,
            t_rrd: 2,
            t_rc: 10,
            t_ras: 7,
            t_zqcs: None,
        }
    }
}

impl Timings {
    /// Reads one register; `None` for an unconfigured tZQCS.
    pub fn get(&self, reg: TimingReg) -> Option<u32> {
        let value = match reg {
            TimingReg::Rp => self.t_rp,
            TimingReg::Rcd => self.t_rcd,
            TimingReg::Wr => self.t_wr,
            TimingReg::Wtr => self.t_wtr,
            TimingReg::Refi => self.t_refi,
            TimingReg::Rfc => self.t_rfc,
            TimingReg::Faw => self.t_faw,
            TimingReg::Ccd => self.t_ccd,
            TimingReg::Rrd => self.t_rrd,
            TimingReg::Rc => self.t_rc,
            TimingReg::Ras => self.t_ras,
            TimingReg::Zqcs => return self.t_zqcs,
        };
        Some(value)
    }

    fn set(&mut self, reg: TimingReg, value: u32) {
        match reg {
            TimingReg::Rp => self.t_rp = value,
            TimingReg::Rcd => self.t_rcd = value,
            TimingReg::Wr => self.t_wr = value,
            TimingReg::Wtr => self.t_wtr = value,
            TimingReg::Refi => self.t_refi = value,
            TimingReg::Rfc => self.t_rfc = value,
            TimingReg::Faw => self.t_faw = value,
            TimingReg::Ccd => self.t_ccd = value,
            TimingReg::Rrd => self.t_rrd = value,
            TimingReg::Rc => self.t_rc = value,
            TimingReg::Ras => self.t_ras = value,
            TimingReg::Zqcs => self.t_zqcs = Some(value),
        }
    }
}

/// Largest expected value per register, read from the `[limits]` table.
///
/// A register left out of the table is sized from its initial value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingLimits {
    #[serde(rename = "tRP")]
    pub t_rp: Option<u32>,
    #[serde(rename = "tRCD")]
    pub t_rcd: Option<u32>,
    #[serde(rename = "tWR")]
    pub t_wr: Option<u32>,
    #[serde(rename = "tWTR")]
    pub t_wtr: Option<u32>,
    #[serde(rename = "tREFI")]
    pub t_refi: Option<u32>,
    #[serde(rename = "tRFC")]
    pub t_rfc: Option<u32>,
    #[serde(rename = "tFAW")]
    pub t_faw: Option<u32>,
    #[serde(rename = "tCCD")]
    pub t_ccd: Option<u32>,
    #[serde(rename = "tRRD")]
    pub t_rrd: Option<u32>,
    #[serde(rename = "tRC")]
    pub t_rc: Option<u32>,
    #[serde(rename = "tRAS")]
    pub t_ras: Option<u32>,
    #[serde(rename = "tZQCS")]
    pub t_zqcs: Option<u32>,
}

impl TimingLimits {
    pub fn get(&self, reg: TimingReg) -> Option<u32> {
        match reg {
            TimingReg::Rp => self.t_rp,
            TimingReg::Rcd => self.t_rcd,
            TimingReg::Wr => self.t_wr,
            TimingReg::Wtr => self.t_wtr,
            TimingReg::Refi => self.t_refi,
            TimingReg::Rfc => self.t_rfc,
            TimingReg::Faw => self.t_faw,
            TimingReg::Ccd => self.t_ccd,
            TimingReg::Rrd => self.t_rrd,
            TimingReg::Rc => self.t_rc,
            TimingReg::Ras => self.t_ras,
            TimingReg::Zqcs => self.t_zqcs,
        }
    }
}

/// Register width needed for values up to `max`: its bit length plus one.
pub fn register_width(max: u32) -> u32 {
    (u32::BITS - max.leading_zeros()) + 1
}

/// Width-checked timing register file.
#[derive(Clone, Debug)]
pub struct RegisterBank {
    values: Timings,
    widths: [u32; TimingReg::ALL.len()],
}

impl RegisterBank {
    /// Creates the register file.
    ///
    /// # Arguments
    ///
    /// * `values` - Initial register contents.
    /// * `limits` - Largest expected value per register; sets the widths. A
    ///   register without a limit is sized from its initial value.
    ///
    /// # Returns
    ///
    /// `ConfigError::RegisterOverflow` if an initial value does not fit, or
    /// `ConfigError::ZeroTiming` for a zero tRP, tRFC, tREFI or tZQCS.
    pub fn new(values: Timings, limits: &TimingLimits) -> Result<Self, ConfigError> {
        let mut widths = [1; TimingReg::ALL.len()];
        for reg in TimingReg::ALL {
            let max = limits.get(reg).or(values.get(reg)).unwrap_or(0);
            widths[reg.index()] = register_width(max);
        }
        let bank = Self { values, widths };
        for reg in TimingReg::ALL {
            if let Some(value) = values.get(reg) {
                bank.check(reg, value)?;
            }
        }
        Ok(bank)
    }

    fn check(&self, reg: TimingReg, value: u32) -> Result<(), ConfigError> {
        let width = self.width(reg);
        if width < u32::BITS && value >> width != 0 {
            return Err(ConfigError::RegisterOverflow { reg, value, width });
        }
        let spans_cycles = matches!(
            reg,
            TimingReg::Rp | TimingReg::Rfc | TimingReg::Refi | TimingReg::Zqcs
        );
        if value == 0 && spans_cycles {
            return Err(ConfigError::ZeroTiming(reg));
        }
        Ok(())
    }

    /// Width in bits of one register.
    pub fn width(&self, reg: TimingReg) -> u32 {
        self.widths[reg.index()]
    }

    /// Current register contents.
    pub fn snapshot(&self) -> &Timings {
        &self.values
    }

    /// Writes one register.
    ///
    /// The new value is visible from the next controller tick. Writing tZQCS
    /// when ZQ calibration was not configured is rejected, since the ZQCS
    /// sequence only exists when the register does.
    pub fn write(&mut self, reg: TimingReg, value: u32) -> Result<(), ConfigError> {
        if reg == TimingReg::Zqcs && self.values.t_zqcs.is_none() {
            return Err(ConfigError::MissingRegister(reg));
        }
        self.check(reg, value)?;
        self.values.set(reg, value);
        Ok(())
    }
}
