//! DRAM Command Scheduler Library.
//!
//! This crate implements a cycle-stepped model of the command-scheduling and
//! timing-compliance core of a DRAM memory controller. Every cycle it decides which
//! command (activate, read, write, precharge, refresh, no-op) reaches the shared
//! command channel, and it can verify an observed command stream against a table of
//! minimum-spacing rules.
//!
//! # Architecture
//!
//! * **Guards**: Countdown windows that enforce tRRD, tCCD, tFAW and the
//!   write-to-read turnaround.
//! * **Refresh**: Timer, postponer, executors, sequencer and the refresher FSM that
//!   takes exclusive ownership of the channel.
//! * **Scheduler**: Read/write/refresh arbitration with anti-starvation timers,
//!   round-robin choosers and a phase steerer.
//! * **Verification**: Command decoding, per-bank row state and rule checking.
//!
//! # Modules
//!
//! * `common`: Command encodings, clock conversion and error types.
//! * `config`: Configuration loading and validation.
//! * `core`: Guards, timing registers, refresh subsystem and scheduler.
//! * `sim`: Synthetic workloads and the simulation runner.
//! * `soc`: Bank units that feed requests into the controller.
//! * `stats`: Controller statistics collection and reporting.
//! * `verify`: Protocol timing model, rule checker and trace files.

/// Command encodings, clock conversion and error types.
///
/// Provides the raw and decoded command representations shared between the
/// scheduling and verification sides of the crate.
pub mod common;

/// Configuration system for controller, PHY, timing and workload settings.
///
/// Loads and validates TOML configuration files.
pub mod config;

/// Controller core: guards, timing registers, refresh subsystem and scheduler.
pub mod core;

/// Synthetic traffic generation and the closed-loop simulation runner.
pub mod sim;

/// Per-bank request sources driven by the controller.
pub mod soc;

/// Controller statistics collection and reporting.
///
/// Tracks cycles spent in each scheduler phase and the number of commands
/// issued by kind.
pub mod stats;

/// Protocol timing model: decoding, bank state tracking and rule checking.
pub mod verify;
