//! Timing rule checker.
//!
//! For every observed command the checker evaluates each rule whose successor
//! matches, finds the latest occurrence of the rule's predecessor, and reports a
//! violation when less than the rule's delay has elapsed. A predecessor that was
//! never seen leaves the rule unconstrained. The command's own time stamp is then
//! recorded for later rules.
//!
//! Bank-scoped rules look the predecessor up on the successor's bank. A
//! predecessor that addresses no bank (PREA, REF, ZQ calibration) counts for
//! a bank when it was sent to the bank's rank or to every rank.

use std::collections::HashMap;

use crate::common::command::{Command, CommandKind};
use crate::verify::model::Violation;
use crate::verify::rules::{same_command, CheckRule, RuleScope};

/// Last-seen tables and rule evaluation.
#[derive(Clone, Debug, Default)]
pub struct TimingChecker {
    rules: Vec<CheckRule>,
    /// Latest time per command anywhere on the channel.
    last_seen: HashMap<CommandKind, u64>,
    /// Latest time per bank-addressed command and `(rank, bank)`.
    last_per_bank: HashMap<(CommandKind, (u32, u32)), u64>,
    /// Latest time per bankless command and target rank (`None` for all).
    last_per_rank: HashMap<(CommandKind, Option<u32>), u64>,
    trace: bool,
}

impl TimingChecker {
    pub fn new(rules: Vec<CheckRule>) -> Self {
        Self {
            rules,
            last_seen: HashMap::new(),
            last_per_bank: HashMap::new(),
            last_per_rank: HashMap::new(),
            trace: true,
        }
    }

    /// Enables debug logging of every rule evaluation.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn rules(&self) -> &[CheckRule] {
        &self.rules
    }

    /// Latest time `kind` was seen on the channel, or as it applies to the
    /// bank `key`.
    fn latest(&self, kind: CommandKind, key: Option<(u32, u32)>) -> Option<u64> {
        CommandKind::ALL
            .iter()
            .filter(|&&k| same_command(k, kind))
            .filter_map(|&k| match key {
                None => self.last_seen.get(&k).copied(),
                Some(bank) if k.is_bank_addressed() => self.last_per_bank.get(&(k, bank)).copied(),
                Some((rank, _)) => {
                    let ranked = self.last_per_rank.get(&(k, Some(rank))).copied();
                    let broadcast = self.last_per_rank.get(&(k, None)).copied();
                    ranked.max(broadcast)
                }
            })
            .max()
    }

    /// Checks one command and records it.
    ///
    /// # Returns
    ///
    /// One violation per rule whose minimum spacing is not met.
    pub fn check(&mut self, cmd: &Command) -> Vec<Violation> {
        let mut violations = Vec::new();
        if cmd.kind == CommandKind::Nop {
            return violations;
        }

        for rule in self.rules.iter().filter(|r| r.applies_to(cmd.kind)) {
            let key = match rule.scope {
                RuleScope::Channel => None,
                RuleScope::Bank => cmd.bank_key(),
            };
            let Some(prev_time) = self.latest(rule.prev, key) else {
                continue;
            };
            let actual = cmd.time.saturating_sub(prev_time);
            if self.trace {
                clilog::debug!(
                    "t={} rule {}: elapsed {} required {}",
                    cmd.time,
                    rule,
                    actual,
                    rule.delay
                );
            }
            if actual < rule.delay {
                violations.push(Violation::Timing {
                    rule: rule.name.clone(),
                    prev: rule.prev,
                    curr: cmd.kind,
                    time: cmd.time,
                    actual,
                    required: rule.delay,
                });
            }
        }

        self.last_seen.insert(cmd.kind, cmd.time);
        match cmd.bank_key() {
            Some(bank) => {
                self.last_per_bank.insert((cmd.kind, bank), cmd.time);
            }
            None => {
                self.last_per_rank.insert((cmd.kind, cmd.rank), cmd.time);
            }
        }
        violations
    }
}
