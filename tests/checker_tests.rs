//! Integration tests for the protocol timing model and rule checker.

use dram_scheduler::common::clock::Clock;
use dram_scheduler::common::command::{Command, CommandKind, ControlBits, RawCommand, A10};
use dram_scheduler::common::error::TraceError;
use dram_scheduler::core::registers::{TimingReg, Timings};
use dram_scheduler::verify::rules::same_command;
use dram_scheduler::verify::{
    check_trace, default_rules, parse_trace, CheckRule, ProtocolModel, RuleScope, TimingChecker,
    TimingRule, TraceEntry, TraceWriter, Violation,
};
use proptest::prelude::*;

fn raw(bits: ControlBits, bank: u32, address: u32) -> RawCommand {
    RawCommand::new(bits, bank, address)
}

fn cmd(bits: ControlBits, bank: u32, address: u32, time: u64) -> Command {
    raw(bits, bank, address).decode(time).unwrap().unwrap()
}

fn write_to_read_model() -> ProtocolModel {
    ProtocolModel::new(vec![CheckRule::new(
        CommandKind::Write,
        CommandKind::Read,
        6,
    )])
}

/// Tests a read too close to a write: one violation reporting the elapsed time.
#[test]
fn test_write_to_read_violation() {
    let mut checker = TimingChecker::new(vec![CheckRule::new(
        CommandKind::Write,
        CommandKind::Read,
        6,
    )]);
    assert!(checker.check(&cmd(ControlBits::WRITE, 0, 0, 0)).is_empty());
    let violations = checker.check(&cmd(ControlBits::READ, 0, 0, 4));
    assert_eq!(violations.len(), 1);
    match &violations[0] {
        Violation::Timing {
            prev,
            curr,
            actual,
            required,
            time,
            ..
        } => {
            assert_eq!(*prev, CommandKind::Write);
            assert_eq!(*curr, CommandKind::Read);
            assert_eq!(*actual, 4);
            assert_eq!(*required, 6);
            assert_eq!(*time, 4);
        }
        other => panic!("unexpected violation {:?}", other),
    }
}

/// Tests a read far enough from the write.
#[test]
fn test_write_to_read_satisfied() {
    let mut checker = TimingChecker::new(vec![CheckRule::new(
        CommandKind::Write,
        CommandKind::Read,
        6,
    )]);
    checker.check(&cmd(ControlBits::WRITE, 0, 0, 0));
    assert!(checker.check(&cmd(ControlBits::READ, 0, 0, 7)).is_empty());
}

/// Tests that the exact minimum spacing is legal.
#[test]
fn test_exact_spacing_is_legal() {
    let mut checker = TimingChecker::new(vec![CheckRule::new(
        CommandKind::Write,
        CommandKind::Read,
        6,
    )]);
    checker.check(&cmd(ControlBits::WRITE, 0, 0, 10));
    assert!(checker.check(&cmd(ControlBits::READ, 0, 0, 16)).is_empty());
}

/// Tests that a successor with no predecessor is unconstrained.
#[test]
fn test_missing_predecessor_unconstrained() {
    let mut checker = TimingChecker::new(vec![CheckRule::new(
        CommandKind::Write,
        CommandKind::Read,
        6,
    )]);
    assert!(checker.check(&cmd(ControlBits::READ, 0, 0, 0)).is_empty());
}

/// Tests that rules resolve from cycles to time units with the controller clock.
#[test]
fn test_rule_resolution() {
    let clock = Clock::from_mhz(100.0, 1).unwrap();
    let timings = Timings::default();
    let rule = TimingRule::channel(CommandKind::Write, CommandKind::Read, TimingReg::Wtr)
        .resolve(&timings, &clock)
        .unwrap();
    assert_eq!(rule.delay, timings.t_wtr as u64 * 10_000);
    assert_eq!(rule.name, "WR->RD (tWTR)");

    // tZQCS is unconfigured by default; its rule is dropped.
    let zq = TimingRule::channel(CommandKind::ZqShort, CommandKind::Activate, TimingReg::Zqcs);
    assert!(zq.resolve(&timings, &clock).is_none());
    assert_eq!(default_rules().len(), 16);
}

/// Tests that the model reports the timing violation through a full stream.
#[test]
fn test_model_reports_timing_violation() {
    let mut model = write_to_read_model();
    model.observe(0, &raw(ControlBits::ACTIVATE, 0, 3));
    model.observe(10, &raw(ControlBits::WRITE, 0, 0));
    model.observe(14, &raw(ControlBits::READ, 0, 0));
    let report = model.report();
    assert!(!report.passed);
    assert_eq!(report.commands, 3);
    assert_eq!(report.violations.len(), 1);
    assert!(matches!(
        report.violations[0],
        Violation::Timing { actual: 4, .. }
    ));
}

/// Tests a column command to a bank with no open row.
#[test]
fn test_closed_bank_violation() {
    let mut model = ProtocolModel::new(Vec::new());
    model.observe(0, &raw(ControlBits::READ, 2, 0));
    assert_eq!(
        model.violations(),
        &[Violation::ClosedBank {
            time: 0,
            command: CommandKind::Read,
            rank: 0,
            bank: 2,
        }]
    );
}

/// Tests activate handling: a new row without precharge is a violation, the
/// already open row is only an anomaly.
#[test]
fn test_activate_row_state() {
    let mut model = ProtocolModel::new(Vec::new());
    model.observe(0, &raw(ControlBits::ACTIVATE, 1, 5));
    model.observe(10, &raw(ControlBits::ACTIVATE, 1, 5));
    assert!(model.passed());
    assert_eq!(model.report().anomalies, 1);

    model.observe(20, &raw(ControlBits::ACTIVATE, 1, 6));
    assert!(matches!(
        model.violations(),
        [Violation::RowConflict {
            open_row: 5,
            row: 6,
            ..
        }]
    ));
    assert_eq!(model.open_row(0, 1), Some(6));
}

/// Tests precharge and precharge-all bank closing.
#[test]
fn test_precharge_closes_banks() {
    let mut model = ProtocolModel::new(Vec::new());
    model.observe(0, &raw(ControlBits::ACTIVATE, 0, 1));
    model.observe(1, &raw(ControlBits::ACTIVATE, 1, 1));
    model.observe(2, &raw(ControlBits::ACTIVATE, 2, 1));
    model.observe(3, &raw(ControlBits::PRECHARGE, 0, 0));
    assert_eq!(model.open_row(0, 0), None);
    assert_eq!(model.open_row(0, 1), Some(1));

    model.observe(4, &raw(ControlBits::PRECHARGE, 0, A10));
    assert_eq!(model.open_row(0, 1), None);
    assert_eq!(model.open_row(0, 2), None);
    model.observe(5, &raw(ControlBits::REFRESH, 0, A10));
    assert!(model.passed());
}

/// Tests that precharge-all with a rank only closes that rank.
#[test]
fn test_precharge_all_per_rank() {
    let mut model = ProtocolModel::new(Vec::new());
    model.observe(0, &raw(ControlBits::ACTIVATE, 3, 1).with_rank(Some(0)));
    model.observe(1, &raw(ControlBits::ACTIVATE, 3, 1).with_rank(Some(1)));
    model.observe(2, &raw(ControlBits::PRECHARGE, 0, A10).with_rank(Some(1)));
    assert_eq!(model.open_row(0, 3), Some(1));
    assert_eq!(model.open_row(1, 3), None);
}

/// Tests that a ranked precharge-all only constrains bank rules on its own rank,
/// while a broadcast one constrains every rank.
#[test]
fn test_precharge_all_rank_in_bank_rules() {
    let rule = CheckRule::new(CommandKind::Precharge, CommandKind::Activate, 10)
        .with_scope(RuleScope::Bank);
    let mut checker = TimingChecker::new(vec![rule]);
    let ranked = |bits, bank, address, rank, time| {
        raw(bits, bank, address)
            .with_rank(Some(rank))
            .decode(time)
            .unwrap()
            .unwrap()
    };

    assert!(checker
        .check(&ranked(ControlBits::PRECHARGE, 0, A10, 1, 0))
        .is_empty());
    assert!(checker
        .check(&ranked(ControlBits::ACTIVATE, 3, 1, 0, 2))
        .is_empty());
    let violations = checker.check(&ranked(ControlBits::ACTIVATE, 3, 1, 1, 4));
    assert_eq!(
        violations,
        vec![Violation::Timing {
            rule: "PRE->ACT".into(),
            prev: CommandKind::Precharge,
            curr: CommandKind::Activate,
            time: 4,
            actual: 4,
            required: 10,
        }]
    );

    assert!(checker
        .check(&cmd(ControlBits::PRECHARGE, 0, A10, 20))
        .is_empty());
    assert_eq!(
        checker
            .check(&ranked(ControlBits::ACTIVATE, 5, 1, 0, 25))
            .len(),
        1
    );
}

/// Tests refresh with an open bank.
#[test]
fn test_refresh_with_open_bank() {
    let mut model = ProtocolModel::new(Vec::new());
    model.observe(0, &raw(ControlBits::ACTIVATE, 4, 9));
    model.observe(5, &raw(ControlBits::REFRESH, 0, A10));
    assert_eq!(
        model.violations(),
        &[Violation::RefreshWithOpenBank {
            time: 5,
            rank: 0,
            bank: 4,
            open_row: 9,
        }]
    );
}

/// Tests write data enables against outstanding writes.
#[test]
fn test_write_data_pairing() {
    let mut model = ProtocolModel::new(Vec::new());
    model.observe(0, &raw(ControlBits::ACTIVATE, 0, 1));
    // Zero write latency: command and data enable share a slot.
    let mut wr = raw(ControlBits::WRITE, 0, 8);
    wr.wrdata_en = true;
    model.observe(5, &wr);
    assert!(model.passed());

    let mut data = RawCommand::nop();
    data.wrdata_en = true;
    model.observe(6, &data);
    assert_eq!(model.violations(), &[Violation::OrphanWriteData { time: 6 }]);
}

/// Tests that an undecodable code is reported and the stream continues.
#[test]
fn test_unknown_code() {
    let mut model = ProtocolModel::new(Vec::new()).with_log();
    let mut bad = RawCommand::nop();
    bad.code = 9;
    assert!(model.observe(0, &bad).is_none());
    model.observe(1, &raw(ControlBits::ACTIVATE, 0, 1));

    let report = model.report();
    assert_eq!(report.decode_failures, 1);
    assert_eq!(report.violations, vec![Violation::Decode { time: 0, code: 9 }]);
    assert_eq!(model.commands_log().len(), 1);
}

/// Tests that deselected cycles and NOPs are not commands.
#[test]
fn test_deselected_cycles_ignored() {
    let mut model = ProtocolModel::new(Vec::new());
    let mut deselected = raw(ControlBits::READ, 0, 0);
    deselected.cs_n = true;
    assert!(model.observe(0, &deselected).is_none());
    let mut no_clock = raw(ControlBits::READ, 0, 0);
    no_clock.cke = false;
    assert!(model.observe(1, &no_clock).is_none());
    assert!(model.observe(2, &RawCommand::nop()).is_none());
    assert!(model.passed());
    assert_eq!(model.report().commands, 0);
}

/// Tests bank-scoped precharge-to-activate spacing against a precharge-all.
#[test]
fn test_bank_rule_sees_precharge_all() {
    let rule = CheckRule::new(CommandKind::Precharge, CommandKind::Activate, 3)
        .with_scope(RuleScope::Bank);
    let mut model = ProtocolModel::new(vec![rule]);
    model.observe(0, &raw(ControlBits::PRECHARGE, 0, A10));
    model.observe(2, &raw(ControlBits::ACTIVATE, 5, 1));
    assert_eq!(model.violations().len(), 1);
}

/// Tests parsing a trace with comments and checking it.
#[test]
fn test_trace_parse_and_check() {
    let text = r#"
# ACT, WR, then a read too early
{"time":0,"code":3,"bank":0,"address":16}
{"time":10,"code":4,"bank":0,"address":8,"wrdata_en":true}

{"time":14,"code":5,"bank":0,"address":8}
"#;
    let entries = parse_trace(text.as_bytes()).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries[1].raw.wrdata_en);
    assert!(entries[0].raw.cke);

    let mut model = write_to_read_model();
    let report = check_trace(&entries, &mut model);
    assert_eq!(report.commands, 3);
    assert_eq!(report.violations.len(), 1);
}

/// Tests that malformed lines report their line number.
#[test]
fn test_trace_parse_error_line() {
    let text = "{\"time\":0,\"code\":7}\n{\"time\":\n";
    match parse_trace(text.as_bytes()) {
        Err(TraceError::Json { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected a JSON error, got {:?}", other.map(|e| e.len())),
    }
}

/// Tests that written traces parse back to the same entries.
#[test]
fn test_trace_writer_output_parses() {
    let entries = vec![
        TraceEntry {
            time: 0,
            raw: raw(ControlBits::ACTIVATE, 1, 0x40).with_rank(Some(1)),
        },
        TraceEntry {
            time: 30_000,
            raw: raw(ControlBits::READ, 1, 8 | A10),
        },
    ];
    let mut writer = TraceWriter::new(Vec::new());
    for entry in &entries {
        writer.write(entry).unwrap();
    }
    let bytes = writer.into_inner().unwrap();
    assert_eq!(parse_trace(bytes.as_slice()).unwrap(), entries);
}

/// Brute-force violation count per command over channel-scoped rules.
fn reference_violations(rules: &[CheckRule], cmds: &[Command]) -> Vec<usize> {
    cmds.iter()
        .enumerate()
        .map(|(i, cmd)| {
            rules
                .iter()
                .filter(|r| same_command(r.curr, cmd.kind))
                .filter(|r| {
                    cmds[..i]
                        .iter()
                        .rev()
                        .find(|p| same_command(p.kind, r.prev))
                        .is_some_and(|p| cmd.time - p.time < r.delay)
                })
                .count()
        })
        .collect()
}

fn command_strategy() -> impl Strategy<Value = (ControlBits, u32, u32)> {
    let bits = prop_oneof![
        Just(ControlBits::ACTIVATE),
        Just(ControlBits::PRECHARGE),
        Just(ControlBits::READ),
        Just(ControlBits::WRITE),
        Just(ControlBits::REFRESH),
    ];
    (bits, 0u32..4, prop_oneof![Just(0u32), Just(A10)])
}

fn kind_strategy() -> impl Strategy<Value = CommandKind> {
    prop_oneof![
        Just(CommandKind::Activate),
        Just(CommandKind::Precharge),
        Just(CommandKind::PrechargeAll),
        Just(CommandKind::Read),
        Just(CommandKind::Write),
        Just(CommandKind::Refresh),
    ]
}

proptest! {
    /// Tests that the checker flags exactly the rule breaches of a stream.
    #[test]
    fn test_checker_matches_reference(
        rules in prop::collection::vec((kind_strategy(), kind_strategy(), 0u64..12), 1..6),
        stream in prop::collection::vec((command_strategy(), 0u64..6), 1..60),
    ) {
        let rules: Vec<CheckRule> = rules
            .into_iter()
            .map(|(prev, curr, delay)| CheckRule::new(prev, curr, delay))
            .collect();
        let mut time = 0;
        let cmds: Vec<Command> = stream
            .into_iter()
            .map(|((bits, bank, address), delta)| {
                time += delta;
                cmd(bits, bank, address, time)
            })
            .collect();

        let mut checker = TimingChecker::new(rules.clone());
        let expected = reference_violations(&rules, &cmds);
        for (c, &n) in cmds.iter().zip(&expected) {
            prop_assert_eq!(checker.check(c).len(), n, "at {}", c);
        }
    }
}
