//! Protocol Timing Model.
//!
//! An observer for a DRAM command stream. It decodes each time-stamped raw
//! command, checks it against the timing rule table, and tracks the open row of
//! every bank it sees:
//!
//! * `ACT` opens a bank. Re-activating the open row is logged as an anomaly;
//!   activating a different row without a precharge is a violation.
//! * `PRE` closes one bank, `PREA` every bank of the addressed rank (or of all
//!   ranks when no rank is given).
//! * `RD`/`WR` need an open bank. Each `WR` waits for one cycle carrying
//!   `wrdata_en`; data enables without a pending write are violations.
//! * `REF` needs every bank of the addressed rank closed.
//!
//! Violations never stop the model; they are collected and fail the report.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::Serialize;

use crate::common::clock::Clock;
use crate::common::command::{Command, CommandKind, RawCommand};
use crate::core::registers::Timings;
use crate::verify::checker::TimingChecker;
use crate::verify::rules::{CheckRule, TimingRule};

/// Protocol or timing violation found in a command stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Two commands closer than a rule allows.
    Timing {
        rule: String,
        prev: CommandKind,
        curr: CommandKind,
        time: u64,
        actual: u64,
        required: u64,
    },
    /// Column command to a bank with no open row.
    ClosedBank {
        time: u64,
        command: CommandKind,
        rank: u32,
        bank: u32,
    },
    /// Activate to a different row while a row is open.
    RowConflict {
        time: u64,
        rank: u32,
        bank: u32,
        open_row: u32,
        row: u32,
    },
    /// Refresh while a bank still has an open row.
    RefreshWithOpenBank {
        time: u64,
        rank: u32,
        bank: u32,
        open_row: u32,
    },
    /// Command code that does not decode.
    Decode { time: u64, code: u8 },
    /// Write data enable with no outstanding write.
    OrphanWriteData { time: u64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Timing {
                rule,
                time,
                actual,
                required,
                ..
            } => write!(
                f,
                "t={}: {} violated, elapsed {} < required {}",
                time, rule, actual, required
            ),
            Violation::ClosedBank {
                time,
                command,
                rank,
                bank,
            } => write!(f, "t={}: {} to closed bank {}.{}", time, command, rank, bank),
            Violation::RowConflict {
                time,
                rank,
                bank,
                open_row,
                row,
            } => write!(
                f,
                "t={}: ACT row {:#x} on bank {}.{} with row {:#x} open",
                time, row, rank, bank, open_row
            ),
            Violation::RefreshWithOpenBank {
                time,
                rank,
                bank,
                open_row,
            } => write!(
                f,
                "t={}: REF with bank {}.{} open at row {:#x}",
                time, rank, bank, open_row
            ),
            Violation::Decode { time, code } => {
                write!(f, "t={}: undecodable command code {:#b}", time, code)
            }
            Violation::OrphanWriteData { time } => {
                write!(f, "t={}: write data without a pending write", time)
            }
        }
    }
}

/// Verdict over an observed stream.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CheckReport {
    pub passed: bool,
    /// Commands decoded and checked (NOPs excluded).
    pub commands: u64,
    pub anomalies: u64,
    pub decode_failures: u64,
    pub violations: Vec<Violation>,
}

/// Observational model of the device's bank state.
#[derive(Clone, Debug)]
pub struct ProtocolModel {
    checker: TimingChecker,
    open_rows: BTreeMap<(u32, u32), u32>,
    pending_writes: VecDeque<(u64, (u32, u32))>,
    commands: u64,
    anomalies: u64,
    decode_failures: u64,
    violations: Vec<Violation>,
    log: Option<Vec<Command>>,
    verbose: bool,
}

impl ProtocolModel {
    pub fn new(rules: Vec<CheckRule>) -> Self {
        Self {
            checker: TimingChecker::new(rules),
            open_rows: BTreeMap::new(),
            pending_writes: VecDeque::new(),
            commands: 0,
            anomalies: 0,
            decode_failures: 0,
            violations: Vec::new(),
            log: None,
            verbose: true,
        }
    }

    /// Builds the model from configured rules.
    ///
    /// Rules on registers that are not configured (tZQCS) are dropped.
    pub fn from_rules(rules: &[TimingRule], timings: &Timings, clock: &Clock) -> Self {
        let resolved = rules
            .iter()
            .filter_map(|rule| {
                let resolved = rule.resolve(timings, clock);
                if resolved.is_none() {
                    clilog::debug!(
                        "skipping rule {}->{}: {} not configured",
                        rule.prev,
                        rule.curr,
                        rule.timing
                    );
                }
                resolved
            })
            .collect();
        Self::new(resolved)
    }

    /// Controls logging of decoded commands and rule evaluations.
    ///
    /// Violations and anomalies are logged regardless.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self.checker.set_trace(verbose);
        self
    }

    /// Keeps every decoded command for `commands_log`.
    pub fn with_log(mut self) -> Self {
        self.log = Some(Vec::new());
        self
    }

    pub fn commands_log(&self) -> &[Command] {
        self.log.as_deref().unwrap_or(&[])
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Row currently open on `(rank, bank)`.
    pub fn open_row(&self, rank: u32, bank: u32) -> Option<u32> {
        self.open_rows.get(&(rank, bank)).copied()
    }

    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    fn violation(&mut self, violation: Violation) {
        clilog::error!("{}", violation);
        self.violations.push(violation);
    }

    /// Observes one channel cycle.
    ///
    /// # Arguments
    ///
    /// * `time` - Time stamp in time units.
    /// * `raw` - Raw command on the channel.
    ///
    /// # Returns
    ///
    /// The decoded command, or `None` for NOPs, deselected cycles and codes that
    /// fail to decode.
    pub fn observe(&mut self, time: u64, raw: &RawCommand) -> Option<Command> {
        let cmd = self.decode_and_check(time, raw);
        // A write and its data enable may share a slot when the PHY write
        // latency is zero, so the write is recorded first.
        if raw.wrdata_en && self.pending_writes.pop_front().is_none() {
            self.violation(Violation::OrphanWriteData { time });
        }
        cmd
    }

    fn decode_and_check(&mut self, time: u64, raw: &RawCommand) -> Option<Command> {
        let cmd = match raw.decode(time) {
            Ok(Some(cmd)) if cmd.kind != CommandKind::Nop => cmd,
            Ok(_) => return None,
            Err(err) => {
                clilog::error!("t={}: {}", time, err);
                self.decode_failures += 1;
                self.violation(Violation::Decode {
                    time,
                    code: raw.code,
                });
                return None;
            }
        };
        if self.verbose {
            clilog::info!("{}", cmd);
        }

        for violation in self.checker.check(&cmd) {
            self.violation(violation);
        }
        self.update_banks(&cmd);

        self.commands += 1;
        if let Some(log) = self.log.as_mut() {
            log.push(cmd.clone());
        }
        Some(cmd)
    }

    fn update_banks(&mut self, cmd: &Command) {
        let rank = cmd.rank.unwrap_or(0);
        match cmd.kind {
            CommandKind::Activate => {
                let (Some(bank), Some(row)) = (cmd.bank, cmd.row) else {
                    return;
                };
                match self.open_rows.get(&(rank, bank)).copied() {
                    Some(open_row) if open_row == row => {
                        clilog::warn!(
                            ACT_REOPEN,
                            "t={}: ACT to already open row {:#x} on bank {}.{}",
                            cmd.time,
                            row,
                            rank,
                            bank
                        );
                        self.anomalies += 1;
                    }
                    Some(open_row) => {
                        self.violation(Violation::RowConflict {
                            time: cmd.time,
                            rank,
                            bank,
                            open_row,
                            row,
                        });
                        self.open_rows.insert((rank, bank), row);
                    }
                    None => {
                        self.open_rows.insert((rank, bank), row);
                    }
                }
            }
            CommandKind::Precharge => {
                if let Some(bank) = cmd.bank {
                    self.open_rows.remove(&(rank, bank));
                }
            }
            CommandKind::PrechargeAll => match cmd.rank {
                Some(rank) => self.open_rows.retain(|&(r, _), _| r != rank),
                None => self.open_rows.clear(),
            },
            CommandKind::Read | CommandKind::Write => {
                let Some(bank) = cmd.bank else {
                    return;
                };
                if !self.open_rows.contains_key(&(rank, bank)) {
                    self.violation(Violation::ClosedBank {
                        time: cmd.time,
                        command: cmd.kind,
                        rank,
                        bank,
                    });
                }
                if cmd.kind == CommandKind::Write {
                    self.pending_writes.push_back((cmd.time, (rank, bank)));
                }
            }
            CommandKind::Refresh => {
                let open: Vec<((u32, u32), u32)> = self
                    .open_rows
                    .iter()
                    .filter(|(&(r, _), _)| cmd.rank.map_or(true, |rank| rank == r))
                    .map(|(&key, &row)| (key, row))
                    .collect();
                for ((rank, bank), open_row) in open {
                    self.violation(Violation::RefreshWithOpenBank {
                        time: cmd.time,
                        rank,
                        bank,
                        open_row,
                    });
                }
            }
            _ => {}
        }
    }

    /// Summarizes everything observed so far.
    pub fn report(&self) -> CheckReport {
        CheckReport {
            passed: self.passed(),
            commands: self.commands,
            anomalies: self.anomalies,
            decode_failures: self.decode_failures,
            violations: self.violations.clone(),
        }
    }
}
