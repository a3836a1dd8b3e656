//! Refresh subsystem.
//!
//! Keeps the DRAM cells refreshed without ever missing the deadline: a timer paces
//! refresh pulses, a postponer batches them, and the refresher FSM takes the channel
//! from the scheduler to run the precharge-all and auto-refresh sequence (followed
//! by a ZQ short calibration when one is due).

/// Refresh and ZQCS executors, timeline counter and sequencer.
pub mod executor;

/// Refresher FSM.
pub mod refresher;

/// Refresh timer and postponer.
pub mod timer;

pub use executor::{RefreshCommand, RefreshExecutor, RefreshSequencer, TimelineCounter, ZqcsExecutor};
pub use refresher::{Refresher, RefresherOutput, RefresherState};
pub use timer::{RefreshPostponer, RefreshTimer, MAX_POSTPONING};
