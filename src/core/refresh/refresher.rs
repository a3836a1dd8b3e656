//! Refresher state machine.
//!
//! ```text
//!  Idle --pending--> WaitBankMachines --ready--> DoRefresh --done--> Idle
//!                                                    |
//!                                                    +--done & ZQCS due--> DoZqcs --done--> Idle
//! ```
//!
//! The refresher raises `valid` as soon as it leaves `Idle` and holds it until the
//! cycle its sequence completes; that cycle drops `valid` and raises `last`. It only
//! drives the channel while the scheduler reports `ready`, which happens once every
//! bank unit has granted the refresh.

use crate::core::refresh::executor::{
    ExecutorOutput, RefreshCommand, RefreshSequencer, ZqcsExecutor,
};
use crate::core::refresh::timer::{RefreshPostponer, RefreshTimer};
use crate::core::registers::Timings;

/// Refresher FSM state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefresherState {
    Idle,
    WaitBankMachines,
    DoRefresh,
    DoZqcs,
}

/// Refresher outputs for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefresherOutput {
    /// Refresh requested; advertised to every bank unit.
    pub valid: bool,
    /// End of the sequence; the scheduler leaves its refresh phase.
    pub last: bool,
    /// Command driven on the channel this cycle, if any.
    pub command: Option<RefreshCommand>,
    /// A refresh sequence (all postponed passes) completed this cycle.
    pub refresh_done: bool,
    /// A ZQ short calibration completed this cycle.
    pub zqcs_done: bool,
}

/// ZQ short calibration scheduling.
#[derive(Clone, Debug)]
struct ZqcsSchedule {
    timer: RefreshTimer,
    period: u32,
    executor: ZqcsExecutor,
    due: bool,
    start: bool,
}

/// Periodic refresh and ZQ calibration controller.
#[derive(Clone, Debug)]
pub struct Refresher {
    enabled: bool,
    state: RefresherState,
    timer: RefreshTimer,
    postponer: RefreshPostponer,
    pending: bool,
    sequencer: RefreshSequencer,
    zqcs: Option<ZqcsSchedule>,
}

impl Refresher {
    /// Creates the refresher.
    ///
    /// # Arguments
    ///
    /// * `enabled` - When `false` the refresher never requests the channel.
    /// * `postponing` - Refresh pulses folded into one sequence (1 to 8).
    /// * `zqcs_period` - ZQ short calibration period in cycles, or `None` when
    ///   tZQCS is not configured.
    pub fn new(enabled: bool, postponing: u32, zqcs_period: Option<u32>) -> Self {
        Self {
            enabled,
            state: RefresherState::Idle,
            timer: RefreshTimer::new(),
            postponer: RefreshPostponer::new(postponing),
            pending: false,
            sequencer: RefreshSequencer::new(),
            zqcs: zqcs_period.map(|period| ZqcsSchedule {
                timer: RefreshTimer::new(),
                period,
                executor: ZqcsExecutor::new(),
                due: false,
                start: false,
            }),
        }
    }

    pub fn state(&self) -> RefresherState {
        self.state
    }

    pub fn postponing(&self) -> u32 {
        self.postponer.postponing()
    }

    /// `true` while a postponed refresh request waits for the FSM.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Advances one cycle.
    ///
    /// # Arguments
    ///
    /// * `ready` - The scheduler has handed over the channel.
    /// * `timings` - Timing snapshot for this cycle.
    pub fn tick(&mut self, ready: bool, timings: &Timings) -> RefresherOutput {
        let mut out = RefresherOutput::default();
        if !self.enabled {
            return out;
        }

        let pulse = self.timer.done();
        self.timer.tick(!pulse, timings.t_refi);
        if self.postponer.tick(pulse) {
            self.pending = true;
        }
        if let Some(zq) = self.zqcs.as_mut() {
            let pulse = zq.timer.done();
            zq.timer.tick(!pulse, zq.period);
            zq.due |= pulse;
        }

        match self.state {
            RefresherState::Idle => {
                if self.pending {
                    self.pending = false;
                    self.state = RefresherState::WaitBankMachines;
                }
            }
            RefresherState::WaitBankMachines => {
                out.valid = true;
                if ready {
                    let step = self.sequencer.tick(true, self.postponer.postponing(), timings);
                    self.apply_refresh_step(step, &mut out);
                }
            }
            RefresherState::DoRefresh => {
                out.valid = true;
                let step = self
                    .sequencer
                    .tick(false, self.postponer.postponing(), timings);
                self.apply_refresh_step(step, &mut out);
            }
            RefresherState::DoZqcs => {
                out.valid = true;
                if let (Some(zq), Some(t_zqcs)) = (self.zqcs.as_mut(), timings.t_zqcs) {
                    let step = zq.executor.tick(zq.start, timings, t_zqcs);
                    zq.start = false;
                    out.command = step.command;
                    if step.done {
                        zq.due = false;
                        out.zqcs_done = true;
                        self.finish(&mut out);
                    }
                } else {
                    self.finish(&mut out);
                }
            }
        }
        out
    }

    fn apply_refresh_step(&mut self, step: ExecutorOutput, out: &mut RefresherOutput) {
        self.state = RefresherState::DoRefresh;
        out.command = step.command;
        if !step.done {
            return;
        }
        out.refresh_done = true;
        if let Some(zq) = self.zqcs.as_mut().filter(|zq| zq.due) {
            zq.start = true;
            self.state = RefresherState::DoZqcs;
        } else {
            self.finish(out);
        }
    }

    fn finish(&mut self, out: &mut RefresherOutput) {
        out.valid = false;
        out.last = true;
        self.state = RefresherState::Idle;
    }
}
