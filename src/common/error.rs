//! Error Types.
//!
//! Configuration problems are fatal and reported when the configuration is
//! loaded. Decode failures affect a single observed command. Trace errors cover
//! reading and writing command traces. Timing and bank-state violations are not
//! errors; the protocol model collects them as `Violation` values instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::registers::TimingReg;

/// Rejected controller configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Refresh postponement depth outside `1..=8`.
    #[error("refresh postponing must be between 1 and 8, got {0}")]
    Postponing(u32),

    /// A timing value does not fit in its register.
    #[error("timing register {reg} value {value} does not fit in {width} bits")]
    RegisterOverflow {
        reg: TimingReg,
        value: u32,
        width: u32,
    },

    /// A timing value that must span at least one cycle is zero.
    #[error("timing register {0} must be at least one cycle")]
    ZeroTiming(TimingReg),

    /// A rule or sequence refers to a register that is not configured.
    #[error("timing register {0} is not configured")]
    MissingRegister(TimingReg),

    /// Phase index outside the number of DFI phases.
    #[error("{name} {phase} is out of range for {nphases} phases")]
    Phase {
        name: &'static str,
        phase: usize,
        nphases: usize,
    },

    /// Invalid bank, rank or address geometry.
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// Synthetic workload parameters out of range.
    #[error("invalid workload: {0}")]
    Workload(String),

    /// Clock or ZQ calibration frequency that yields no usable period.
    #[error("invalid frequency: {0}")]
    Frequency(String),
}

/// Failure to decode a raw command encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The control code does not fit in the three RAS#/CAS#/WE# bits.
    #[error("unknown command code {0:#b}")]
    UnknownCode(u8),
}

/// Failure while reading or writing a JSON-lines command trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The trace file could not be opened or created.
    #[error("failed to open trace {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing trace data failed.
    #[error("trace I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A trace line is not a valid command record.
    #[error("trace line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
