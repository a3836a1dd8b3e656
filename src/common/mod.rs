//! Common utilities and types used throughout the DRAM command scheduler.
//!
//! This module provides the command encodings shared by the controller and the
//! protocol model, the clock conversion between cycles and time units, memory
//! transaction descriptors, and the crate's error types.

/// Clock period and cycle-to-time conversion.
pub mod clock;

/// Raw control-bit encodings and decoded commands.
pub mod command;

/// Memory transaction descriptors.
pub mod data;

/// Error types for configuration, decoding and trace handling.
pub mod error;

pub use clock::Clock;
pub use command::{Burst, Command, CommandKind, ControlBits, RawCommand};
pub use data::{AccessType, Transaction};
pub use error::{ConfigError, DecodeError, TraceError};
