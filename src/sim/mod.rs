//! Simulation harness.
//!
//! Generates synthetic traffic and runs it through the controller with the
//! protocol model checking every issued command.

/// Controller, workload and protocol model stepped together.
pub mod runner;

/// Seeded synthetic transaction streams.
pub mod workload;

pub use runner::{SimReport, Simulation};
pub use workload::Workload;
