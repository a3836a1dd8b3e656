//! Verification direction: from an observed command stream back to a verdict.
//!
//! The protocol model decodes raw commands, tracks bank state and runs the rule
//! checker; traces can be read from and written to JSON-lines files.

/// Rule evaluation against the last-seen table.
pub mod checker;

/// Bank-state model, violations and reports.
pub mod model;

/// Timing rule table and rule resolution.
pub mod rules;

/// JSON-lines trace reading and writing.
pub mod trace;

pub use checker::TimingChecker;
pub use model::{CheckReport, ProtocolModel, Violation};
pub use rules::{default_rules, CheckRule, RuleScope, TimingRule};
pub use trace::{check_trace, parse_trace, read_trace, TraceEntry, TraceWriter};
