//! Controller configuration.
//!
//! Configuration is read from a TOML file with one table per concern:
//! `[general]`, `[controller]`, `[phy]`, `[timing]`, `[limits]`, `[checker]` and
//! `[workload]`. Every field has a default, so a partial file (or an empty one)
//! yields a runnable single-rank, single-phase DDR3-class setup. Loading always
//! runs `Config::validate`.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::clock::Clock;
use crate::common::error::ConfigError;
use crate::core::refresh::MAX_POSTPONING;
use crate::core::registers::{RegisterBank, TimingLimits, Timings};
use crate::verify::rules::{default_rules, TimingRule};

const DEFAULT_CLK_FREQ_MHZ: f64 = 100.0;
const DEFAULT_NBANKS: usize = 8;
const DEFAULT_NRANKS: usize = 1;
const DEFAULT_POSTPONING: u32 = 1;
const DEFAULT_ZQCS_FREQ_HZ: f64 = 1.0;
const DEFAULT_READ_TIME: u32 = 32;
const DEFAULT_WRITE_TIME: u32 = 16;
const DEFAULT_QUEUE_DEPTH: usize = 8;

const DEFAULT_CL: u32 = 6;
const DEFAULT_CWL: u32 = 5;

const DEFAULT_TRANSACTIONS: usize = 4096;
const DEFAULT_READ_RATIO: f64 = 0.7;
const DEFAULT_LOCALITY: f64 = 0.6;
const DEFAULT_ROW_BITS: u32 = 12;
const DEFAULT_COL_BITS: u32 = 10;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_MAX_CYCLES: u64 = 1_000_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub phy: PhyConfig,
    #[serde(default)]
    pub timing: Timings,
    /// Largest expected register values; sizes the timing registers.
    #[serde(default)]
    pub limits: TimingLimits,
    #[serde(default)]
    pub checker: CheckerConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            controller: ControllerConfig::default(),
            phy: PhyConfig::default(),
            timing: Timings::default(),
            limits: TimingLimits::default(),
            checker: CheckerConfig::default(),
            workload: WorkloadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub trace_commands: bool,
    #[serde(default = "default_clk_freq_mhz")]
    pub clk_freq_mhz: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            trace_commands: false,
            clk_freq_mhz: default_clk_freq_mhz(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Banks per rank.
    #[serde(default = "default_nbanks")]
    pub nbanks: usize,

    #[serde(default = "default_nranks")]
    pub nranks: usize,

    #[serde(default = "default_true")]
    pub with_refresh: bool,

    /// Refresh pulses folded into one refresh sequence.
    #[serde(default = "default_postponing")]
    pub refresh_postponing: u32,

    /// ZQ short calibration rate; only used when tZQCS is configured.
    #[serde(default = "default_zqcs_freq_hz")]
    pub zqcs_freq_hz: f64,

    /// Read anti-starvation timeout in cycles; 0 disables it.
    #[serde(default = "default_read_time")]
    pub read_time: u32,

    /// Write anti-starvation timeout in cycles; 0 disables it.
    #[serde(default = "default_write_time")]
    pub write_time: u32,

    /// Transactions queued per bank unit.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            nbanks: default_nbanks(),
            nranks: default_nranks(),
            with_refresh: true,
            refresh_postponing: default_postponing(),
            zqcs_freq_hz: default_zqcs_freq_hz(),
            read_time: default_read_time(),
            write_time: default_write_time(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl ControllerConfig {
    pub fn nunits(&self) -> usize {
        self.nbanks * self.nranks
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhyConfig {
    #[serde(default = "default_nphases")]
    pub nphases: usize,

    #[serde(default)]
    pub rdphase: usize,

    #[serde(default)]
    pub wrphase: usize,

    /// CAS latency in memory clocks.
    #[serde(default = "default_cl")]
    pub cl: u32,

    /// CAS write latency in memory clocks.
    #[serde(default = "default_cwl")]
    pub cwl: u32,

    /// Read command to read data, in controller cycles.
    #[serde(default)]
    pub read_latency: Option<u32>,

    /// Write command to write data enable, in controller cycles.
    #[serde(default)]
    pub t_phy_wrlat: u32,
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            nphases: default_nphases(),
            rdphase: 0,
            wrphase: 0,
            cl: default_cl(),
            cwl: default_cwl(),
            read_latency: None,
            t_phy_wrlat: 0,
        }
    }
}

impl PhyConfig {
    /// Write latency in controller cycles: `ceil(cwl / nphases)`.
    pub fn write_latency(&self) -> u32 {
        let n = self.nphases.max(1) as u32;
        self.cwl.div_ceil(n)
    }

    /// Cycles spent in the read-to-write turnaround.
    pub fn rtw_delay(&self) -> u32 {
        match self.read_latency {
            Some(latency) => latency.saturating_sub(1),
            None => (self.cl + 1) / self.nphases.max(1) as u32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckerConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<TimingRule>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    Sequential,
    Random,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    #[serde(default = "default_pattern")]
    pub pattern: Pattern,

    #[serde(default = "default_transactions")]
    pub transactions: usize,

    /// Fraction of reads in the generated stream.
    #[serde(default = "default_read_ratio")]
    pub read_ratio: f64,

    /// Probability that a random transaction reuses the previous bank and row.
    #[serde(default = "default_locality")]
    pub locality: f64,

    #[serde(default = "default_row_bits")]
    pub row_bits: u32,

    #[serde(default = "default_col_bits")]
    pub col_bits: u32,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_max_cycles")]
    pub max_cycles: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            transactions: default_transactions(),
            read_ratio: default_read_ratio(),
            locality: default_locality(),
            row_bits: default_row_bits(),
            col_bits: default_col_bits(),
            seed: default_seed(),
            max_cycles: default_max_cycles(),
        }
    }
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn clock(&self) -> Result<Clock, ConfigError> {
        Clock::from_mhz(self.general.clk_freq_mhz, self.phy.nphases).ok_or_else(|| {
            ConfigError::Frequency(format!("clock of {} MHz", self.general.clk_freq_mhz))
        })
    }

    /// ZQ short calibration period in controller cycles.
    ///
    /// `None` when tZQCS is not configured.
    pub fn zqcs_period(&self) -> Result<Option<u32>, ConfigError> {
        if self.timing.t_zqcs.is_none() {
            return Ok(None);
        }
        let freq = self.controller.zqcs_freq_hz;
        let cycles = (self.general.clk_freq_mhz * 1e6 / freq).round();
        if !freq.is_finite() || freq <= 0.0 || !(1.0..=u32::MAX as f64).contains(&cycles) {
            return Err(ConfigError::Frequency(format!("ZQCS rate of {} Hz", freq)));
        }
        Ok(Some(cycles as u32))
    }

    /// Longest interval between two refresh completions, in cycles.
    ///
    /// Refresh requests are spaced exactly `tREFI * postponing` apart, but the
    /// sequence only starts once every bank grants. A bank grants when its
    /// last activate has served tRAS and its last write has cleared the
    /// write-to-precharge window. The scheduler also needs to leave any
    /// turnaround begun before the banks went quiet. Completions can therefore
    /// drift from the request period by at most that wait, plus the request
    /// and phase-change latches.
    pub fn max_refresh_interval(&self) -> u64 {
        let t = &self.timing;
        let wl = self.phy.write_latency();
        let grant_wait = [
            t.t_ras,
            wl + t.t_wr + t.t_ccd,
            t.t_wtr + wl + t.t_ccd,
            self.phy.rtw_delay(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        let period = t.t_refi as u64 * self.controller.refresh_postponing as u64;
        period + grant_wait as u64 + 2
    }

    /// Checks every cross-field constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ctrl = &self.controller;
        if !(1..=MAX_POSTPONING).contains(&ctrl.refresh_postponing) {
            return Err(ConfigError::Postponing(ctrl.refresh_postponing));
        }
        if ctrl.nbanks == 0 || !ctrl.nbanks.is_power_of_two() {
            return Err(ConfigError::Geometry(format!(
                "{} banks per rank is not a power of two",
                ctrl.nbanks
            )));
        }
        if ctrl.nranks == 0 || !ctrl.nranks.is_power_of_two() {
            return Err(ConfigError::Geometry(format!(
                "{} ranks is not a power of two",
                ctrl.nranks
            )));
        }
        if ctrl.queue_depth == 0 {
            return Err(ConfigError::Geometry("queue depth must be non-zero".into()));
        }

        let phy = &self.phy;
        if phy.nphases == 0 {
            return Err(ConfigError::Geometry("at least one DFI phase is required".into()));
        }
        for (name, phase) in [("rdphase", phy.rdphase), ("wrphase", phy.wrphase)] {
            if phase >= phy.nphases {
                return Err(ConfigError::Phase {
                    name,
                    phase,
                    nphases: phy.nphases,
                });
            }
        }

        self.clock()?;
        if ctrl.with_refresh {
            self.zqcs_period()?;
        }
        RegisterBank::new(self.timing, &self.limits)?;

        let wl = &self.workload;
        for (name, p) in [("read_ratio", wl.read_ratio), ("locality", wl.locality)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Workload(format!("{} {} is not a probability", name, p)));
            }
        }
        if wl.row_bits == 0 || wl.row_bits > 24 || wl.col_bits == 0 || wl.col_bits > 10 {
            return Err(ConfigError::Workload(format!(
                "{} row bits and {} column bits are out of range",
                wl.row_bits, wl.col_bits
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_clk_freq_mhz() -> f64 {
    DEFAULT_CLK_FREQ_MHZ
}

fn default_nbanks() -> usize {
    DEFAULT_NBANKS
}

fn default_nranks() -> usize {
    DEFAULT_NRANKS
}

fn default_postponing() -> u32 {
    DEFAULT_POSTPONING
}

fn default_zqcs_freq_hz() -> f64 {
    DEFAULT_ZQCS_FREQ_HZ
}

fn default_read_time() -> u32 {
    DEFAULT_READ_TIME
}

fn default_write_time() -> u32 {
    DEFAULT_WRITE_TIME
}

fn default_queue_depth() -> usize {
    DEFAULT_QUEUE_DEPTH
}

fn default_nphases() -> usize {
    1
}

fn default_cl() -> u32 {
    DEFAULT_CL
}

fn default_cwl() -> u32 {
    DEFAULT_CWL
}

fn default_pattern() -> Pattern {
    Pattern::Random
}

fn default_transactions() -> usize {
    DEFAULT_TRANSACTIONS
}

fn default_read_ratio() -> f64 {
    DEFAULT_READ_RATIO
}

fn default_locality() -> f64 {
    DEFAULT_LOCALITY
}

fn default_row_bits() -> u32 {
    DEFAULT_ROW_BITS
}

fn default_col_bits() -> u32 {
    DEFAULT_COL_BITS
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_max_cycles() -> u64 {
    DEFAULT_MAX_CYCLES
}
