//! Controller core.
//!
//! The scheduling direction of the crate: spacing guards, programmable timing
//! registers, the refresh subsystem, the command choosers and steerer, the
//! scheduler FSM, and the top-level `Controller` that steps them together.

/// Round-robin command chooser.
pub mod chooser;

/// Top-level controller and per-cycle output.
pub mod controller;

/// Delay-window and four-activate-window guards.
pub mod guard;

/// Refresh timer, postponer, executors and refresher FSM.
pub mod refresh;

/// Timing registers and their width checks.
pub mod registers;

/// Read/write/refresh scheduler FSM.
pub mod scheduler;

/// Routing of chosen commands to DFI phases.
pub mod steerer;

pub use controller::{ChannelOwner, Controller, CycleOutput};
pub use scheduler::Phase;
