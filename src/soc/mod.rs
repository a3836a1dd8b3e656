//! Bank units feeding the controller core.
//!
//! The controller only arbitrates among per-bank requests. This module defines
//! the request interface and the open-row bank machine used by the simulator.

/// Open-row reference bank machine.
pub mod bank;

/// Bank request descriptor and the `BankUnit` trait.
pub mod traits;

pub use bank::RowBank;
pub use traits::{BankRequest, BankUnit};
