//! Timing rule table.
//!
//! A rule names a predecessor command, a successor command and the timing
//! register holding their minimum spacing. Rules are written in cycles and
//! resolved to time units against the controller clock before checking.

use std::fmt;

use serde::Deserialize;

use crate::common::clock::Clock;
use crate::common::command::CommandKind;
use crate::core::registers::{TimingReg, Timings};

/// Where the predecessor of a rule is looked up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    /// Latest predecessor anywhere on the channel.
    #[default]
    Channel,
    /// Latest predecessor on the successor's bank. Bankless commands fall back
    /// to channel scope.
    Bank,
}

/// Rule as written in the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct TimingRule {
    pub prev: CommandKind,
    pub curr: CommandKind,
    pub timing: TimingReg,
    #[serde(default)]
    pub scope: RuleScope,
}

impl TimingRule {
    pub const fn channel(prev: CommandKind, curr: CommandKind, timing: TimingReg) -> Self {
        Self {
            prev,
            curr,
            timing,
            scope: RuleScope::Channel,
        }
    }

    pub const fn bank(prev: CommandKind, curr: CommandKind, timing: TimingReg) -> Self {
        Self {
            prev,
            curr,
            timing,
            scope: RuleScope::Bank,
        }
    }

    /// Resolves the rule to a delay in time units.
    ///
    /// With several DFI phases the delay allows for the phase offset between
    /// the two commands; see `Clock::spacing_ps`.
    ///
    /// Returns `None` when the rule's register is not configured.
    pub fn resolve(&self, timings: &Timings, clock: &Clock) -> Option<CheckRule> {
        let cycles = timings.get(self.timing)?;
        Some(CheckRule {
            name: format!("{}->{} ({})", self.prev, self.curr, self.timing),
            prev: self.prev,
            curr: self.curr,
            delay: clock.spacing_ps(cycles),
            scope: self.scope,
        })
    }
}

/// Rule ready for checking, with its delay in time units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckRule {
    pub name: String,
    pub prev: CommandKind,
    pub curr: CommandKind,
    pub delay: u64,
    pub scope: RuleScope,
}

impl CheckRule {
    /// Channel-scoped rule with an explicit delay.
    pub fn new(prev: CommandKind, curr: CommandKind, delay: u64) -> Self {
        Self {
            name: format!("{}->{}", prev, curr),
            prev,
            curr,
            delay,
            scope: RuleScope::Channel,
        }
    }

    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    /// `true` when `kind` is this rule's successor (PRE and PREA match each other).
    pub fn applies_to(&self, kind: CommandKind) -> bool {
        same_command(self.curr, kind)
    }
}

impl fmt::Display for CheckRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Command-name equality used for rule matching.
pub fn same_command(a: CommandKind, b: CommandKind) -> bool {
    a == b || (a.is_precharge() && b.is_precharge())
}

/// JEDEC spacing rules between command pairs.
pub fn default_rules() -> Vec<TimingRule> {
    use CommandKind::*;
    vec![
        TimingRule::bank(Precharge, Activate, TimingReg::Rp),
        TimingRule::channel(Precharge, Refresh, TimingReg::Rp),
        TimingRule::bank(Activate, Write, TimingReg::Rcd),
        TimingRule::bank(Activate, Read, TimingReg::Rcd),
        TimingRule::bank(Activate, Precharge, TimingReg::Ras),
        TimingRule::channel(Refresh, Precharge, TimingReg::Rfc),
        TimingRule::channel(Refresh, Activate, TimingReg::Rfc),
        TimingRule::channel(Write, Read, TimingReg::Ccd),
        TimingRule::channel(Write, Write, TimingReg::Ccd),
        TimingRule::channel(Read, Read, TimingReg::Ccd),
        TimingRule::channel(Read, Write, TimingReg::Ccd),
        TimingRule::bank(Activate, Activate, TimingReg::Rc),
        TimingRule::channel(Activate, Activate, TimingReg::Rrd),
        TimingRule::bank(Write, Precharge, TimingReg::Wr),
        TimingRule::channel(Write, Read, TimingReg::Wtr),
        TimingRule::channel(ZqShort, Activate, TimingReg::Zqcs),
    ]
}
