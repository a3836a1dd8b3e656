//! Integration tests for the refresh subsystem.

mod common;

use common::{row_banks, small_config, ScriptedBank};
use dram_scheduler::common::command::CommandKind;
use dram_scheduler::core::refresh::{
    RefreshCommand, RefreshPostponer, RefreshSequencer, RefreshTimer, Refresher, RefresherState,
};
use dram_scheduler::core::registers::Timings;
use dram_scheduler::core::{Controller, CycleOutput, Phase};
use dram_scheduler::soc::BankUnit;

fn run<B: BankUnit>(controller: &mut Controller<B>, cycles: u64) -> Vec<CycleOutput> {
    (0..cycles).map(|_| controller.tick()).collect()
}

/// Lengths of consecutive runs of refresh-phase cycles.
fn refresh_runs(outputs: &[CycleOutput]) -> Vec<u64> {
    let mut runs = Vec::new();
    let mut current = 0;
    for out in outputs {
        if out.phase == Phase::Refresh {
            current += 1;
        } else if current > 0 {
            runs.push(current);
            current = 0;
        }
    }
    runs
}

/// Tests that the timer pulses once per period starting at cycle 0.
#[test]
fn test_timer_period() {
    let mut timer = RefreshTimer::new();
    let mut pulses = Vec::new();
    for cycle in 0..35u32 {
        let pulse = timer.done();
        if pulse {
            pulses.push(cycle);
        }
        timer.tick(!pulse, 10);
    }
    assert_eq!(pulses, vec![0, 10, 20, 30]);
}

/// Tests that the postponer emits on every fourth pulse.
#[test]
fn test_postponer_batches_pulses() {
    let mut postponer = RefreshPostponer::new(4);
    let emitted: Vec<bool> = (0..8).map(|_| postponer.tick(true)).collect();
    assert_eq!(
        emitted,
        vec![false, false, false, true, false, false, false, true]
    );
    assert!(!postponer.tick(false));
}

/// Tests the sequencer's back-to-back passes and single done strobe.
#[test]
fn test_sequencer_runs_postponed_passes() {
    let timings = Timings {
        t_rp: 2,
        t_rfc: 4,
        ..Timings::default()
    };
    let mut seq = RefreshSequencer::new();
    let mut refreshes = Vec::new();
    let mut precharges = Vec::new();
    let mut done = Vec::new();
    for cycle in 0..30u32 {
        let out = seq.tick(cycle == 0, 3, &timings);
        match out.command {
            Some(cmd) if cmd == RefreshCommand::auto_refresh() => refreshes.push(cycle),
            Some(cmd) if cmd == RefreshCommand::precharge_all() => precharges.push(cycle),
            _ => {}
        }
        if out.done {
            done.push(cycle);
        }
    }
    assert_eq!(precharges, vec![0, 7, 14]);
    assert_eq!(refreshes, vec![2, 9, 16]);
    assert_eq!(done, vec![20]);
    assert!(!seq.busy());
}

/// Tests the refresher's full cycle with an immediately ready scheduler.
#[test]
fn test_refresher_sequence_with_ready_scheduler() {
    let timings = Timings {
        t_rp: 2,
        t_rfc: 5,
        t_refi: 100,
        ..Timings::default()
    };
    let mut refresher = Refresher::new(true, 1, None);
    // Cycle 0: pulse, request latched.
    let out = refresher.tick(true, &timings);
    assert!(!out.valid);
    assert_eq!(refresher.state(), RefresherState::WaitBankMachines);

    let mut commands = Vec::new();
    let mut last_cycle = None;
    for cycle in 1..20u32 {
        let out = refresher.tick(true, &timings);
        if let Some(cmd) = out.command {
            commands.push((cycle, cmd));
        }
        if out.last {
            assert!(!out.valid);
            assert!(out.refresh_done);
            last_cycle = Some(cycle);
            break;
        }
        assert!(out.valid);
    }
    assert_eq!(
        commands,
        vec![
            (1, RefreshCommand::precharge_all()),
            (3, RefreshCommand::auto_refresh()),
        ]
    );
    assert_eq!(last_cycle, Some(8));
    assert_eq!(refresher.state(), RefresherState::Idle);
}

/// Tests that a due ZQ calibration follows the refresh in the same sequence.
#[test]
fn test_refresher_appends_zqcs() {
    let timings = Timings {
        t_rp: 2,
        t_rfc: 5,
        t_refi: 100,
        t_zqcs: Some(6),
        ..Timings::default()
    };
    let mut refresher = Refresher::new(true, 1, Some(1000));
    let mut kinds = Vec::new();
    let mut zqcs_done = false;
    for _ in 0..40 {
        let out = refresher.tick(true, &timings);
        if let Some(cmd) = out.command {
            kinds.push(cmd);
        }
        if out.last {
            zqcs_done = out.zqcs_done;
            break;
        }
    }
    assert_eq!(
        kinds,
        vec![
            RefreshCommand::precharge_all(),
            RefreshCommand::auto_refresh(),
            RefreshCommand::precharge_all(),
            RefreshCommand::zq_short(),
        ]
    );
    assert!(zqcs_done);
}

/// Tests that, with one refresh per request, each refresh phase lasts
/// tRP + tRFC + 1 cycles and banks regain the channel afterwards.
#[test]
fn test_refresh_phase_length_without_postponing() {
    let config = small_config();
    let t = config.timing;
    let banks: Vec<ScriptedBank> = (0..config.controller.nunits())
        .map(ScriptedBank::idle)
        .collect();
    let mut controller = Controller::new(&config, banks).unwrap();
    let outputs = run(&mut controller, 3 * t.t_refi as u64);

    let runs = refresh_runs(&outputs);
    assert!(runs.len() >= 2);
    for len in runs {
        assert_eq!(len, (t.t_rp + t.t_rfc + 1) as u64);
    }
    let refreshes = outputs
        .iter()
        .filter(|o| o.phase == Phase::Refresh)
        .flat_map(|o| o.phases.iter())
        .filter(|slot| slot.kind() == CommandKind::Refresh)
        .count();
    assert_eq!(refreshes, outputs.iter().filter(|o| o.refresh_done).count());
}

/// Tests that four postponed refreshes run back to back in one phase.
#[test]
fn test_postponed_refreshes_back_to_back() {
    let mut config = small_config();
    config.controller.refresh_postponing = 4;
    let t = config.timing;
    let pass = (t.t_rp + t.t_rfc + 1) as u64;
    let banks: Vec<ScriptedBank> = (0..config.controller.nunits())
        .map(ScriptedBank::idle)
        .collect();
    let mut controller = Controller::new(&config, banks).unwrap();
    let outputs = run(&mut controller, 4 * t.t_refi as u64 + pass * 4 + 8);

    let runs = refresh_runs(&outputs);
    assert_eq!(runs, vec![4 * pass]);

    let refresh_cycles: Vec<u64> = outputs
        .iter()
        .filter(|o| o.phases.iter().any(|s| s.kind() == CommandKind::Refresh))
        .map(|o| o.cycle)
        .collect();
    assert_eq!(refresh_cycles.len(), 4);
    for pair in refresh_cycles.windows(2) {
        assert_eq!(pair[1] - pair[0], pass);
    }
    assert_eq!(outputs.iter().filter(|o| o.refresh_done).count(), 1);
}

/// Tests that idle banks see one refresh sequence every tREFI x postponing.
#[test]
fn test_refresh_period_with_idle_banks() {
    for postponing in [1, 2, 8] {
        let mut config = small_config();
        config.controller.refresh_postponing = postponing;
        let period = config.timing.t_refi as u64 * postponing as u64;
        let banks = row_banks(&config);
        let mut controller = Controller::new(&config, banks).unwrap();
        let done: Vec<u64> = run(&mut controller, period * 5)
            .iter()
            .filter(|o| o.refresh_done)
            .map(|o| o.cycle)
            .collect();
        assert!(done.len() >= 4, "postponing {}", postponing);
        for pair in done.windows(2) {
            assert_eq!(pair[1] - pair[0], period, "postponing {}", postponing);
        }
    }
}

/// Tests that a disabled refresher never takes the channel.
#[test]
fn test_refresh_disabled() {
    let mut config = small_config();
    config.controller.with_refresh = false;
    let banks = row_banks(&config);
    let mut controller = Controller::new(&config, banks).unwrap();
    let outputs = run(&mut controller, 2000);
    assert!(outputs.iter().all(|o| o.phase != Phase::Refresh));
    assert_eq!(controller.stats().cmd_refresh, 0);
}
