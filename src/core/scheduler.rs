//! Command Scheduler FSM.
//!
//! The scheduler owns the shared command channel. It alternates between a read
//! phase and a write phase with turnaround phases in between, and hands the
//! channel to the refresher when every bank unit has granted a pending refresh.
//!
//! Each tick evaluates, in order:
//! 1. the spacing guards (tRRD, tFAW, tCCD, write-to-read),
//! 2. chooser eligibility and `ready` gating for the current phase,
//! 3. the phase transition,
//! 4. phase steering of the accepted commands.
//!
//! Anti-starvation timers bound how long one traffic class can hold the channel
//! while the other class is waiting.

use std::fmt;

use serde::Serialize;

use crate::core::chooser::{CommandChooser, Wants};
use crate::core::guard::{DelayGuard, FawGuard};
use crate::core::refresh::RefresherOutput;
use crate::core::registers::Timings;
use crate::core::steerer::{PhaseCommand, Steer, Steerer};
use crate::soc::traits::BankRequest;

/// Scheduler phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    Read,
    Write,
    ReadToWriteTurnaround,
    WriteToReadTurnaround,
    Refresh,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Read => "READ",
            Phase::Write => "WRITE",
            Phase::ReadToWriteTurnaround => "RTW",
            Phase::WriteToReadTurnaround => "WTR",
            Phase::Refresh => "REFRESH",
        };
        f.write_str(name)
    }
}

/// Bounds the time one traffic class may keep the channel.
///
/// The counter reloads while its class is not being served and counts down
/// while it is; `max_time()` is high once it reaches zero. A timeout of zero
/// disables the timer.
#[derive(Clone, Debug)]
pub struct AntiStarvation {
    timeout: u32,
    time: u32,
}

impl AntiStarvation {
    pub fn new(timeout: u32) -> Self {
        Self {
            timeout,
            time: timeout.saturating_sub(1),
        }
    }

    pub fn max_time(&self) -> bool {
        self.timeout != 0 && self.time == 0
    }

    pub fn tick(&mut self, enabled: bool) {
        if self.timeout == 0 {
            return;
        }
        if !enabled {
            self.time = self.timeout - 1;
        } else if self.time > 0 {
            self.time -= 1;
        }
    }
}

/// Static scheduler parameters.
#[derive(Clone, Debug)]
pub struct SchedulerSettings {
    pub nphases: usize,
    pub rdphase: usize,
    pub wrphase: usize,
    /// Banks per rank.
    pub nbanks: usize,
    /// Bank units on the channel (`nranks * nbanks`).
    pub nunits: usize,
    /// Write latency in controller cycles.
    pub write_latency: u32,
    /// Cycles spent in the read-to-write turnaround.
    pub rtw_delay: u32,
    pub read_time: u32,
    pub write_time: u32,
    pub t_phy_wrlat: u32,
}

/// Inputs sampled by the scheduler in one cycle.
pub struct SchedulerInputs<'a> {
    pub requests: &'a [BankRequest],
    /// AND of every bank unit's refresh grant.
    pub refresh_gnt: bool,
    pub refresher: &'a RefresherOutput,
    pub timings: &'a Timings,
}

/// Scheduler outputs for one cycle.
#[derive(Clone, Debug)]
pub struct SchedulerOutput {
    /// Phase the scheduler was in during this cycle.
    pub phase: Phase,
    /// Per bank unit: its request was issued.
    pub acks: Vec<bool>,
    /// Command slots, one per DFI phase.
    pub phases: Vec<PhaseCommand>,
    /// Number of bank requests issued this cycle.
    pub issued: usize,
    /// Phase switch forced by an anti-starvation timer.
    pub starvation_switch: bool,
}

/// Read/write/refresh arbiter.
#[derive(Clone, Debug)]
pub struct Scheduler {
    settings: SchedulerSettings,
    phase: Phase,
    rtw_remaining: u32,
    choose_cmd: CommandChooser,
    choose_req: CommandChooser,
    trrd: DelayGuard,
    tfaw: FawGuard,
    tccd: DelayGuard,
    twtr: DelayGuard,
    read_starvation: AntiStarvation,
    write_starvation: AntiStarvation,
    steerer: Steerer,
}

impl Scheduler {
    pub fn new(settings: SchedulerSettings) -> Self {
        Self {
            phase: Phase::Read,
            rtw_remaining: 0,
            choose_cmd: CommandChooser::new(settings.nunits),
            choose_req: CommandChooser::new(settings.nunits),
            trrd: DelayGuard::new(),
            tfaw: FawGuard::new(),
            tccd: DelayGuard::new(),
            twtr: DelayGuard::new(),
            read_starvation: AntiStarvation::new(settings.read_time),
            write_starvation: AntiStarvation::new(settings.write_time),
            steerer: Steerer::new(settings.nphases, settings.nbanks, settings.t_phy_wrlat),
            settings,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    fn single_phase(&self) -> bool {
        self.settings.nphases == 1
    }

    /// Phase issuing read commands one slot ahead of read data.
    pub fn rdcmdphase(&self) -> usize {
        let n = self.settings.nphases;
        (self.settings.rdphase + n - 1) % n
    }

    pub fn wrcmdphase(&self) -> usize {
        let n = self.settings.nphases;
        (self.settings.wrphase + n - 1) % n
    }

    fn steer_sel(&self) -> Vec<Steer> {
        let n = self.settings.nphases;
        let mut sel = vec![Steer::Nop; n];
        match self.phase {
            Phase::Read => {
                sel[self.settings.rdphase] = Steer::Req;
                sel[self.rdcmdphase()] = Steer::Cmd;
            }
            Phase::Write => {
                sel[self.settings.wrphase] = Steer::Req;
                sel[self.wrcmdphase()] = Steer::Cmd;
            }
            Phase::Refresh => sel[0] = Steer::Refresh,
            Phase::ReadToWriteTurnaround | Phase::WriteToReadTurnaround => {}
        }
        sel
    }

    fn enter_rtw(&mut self) -> Phase {
        self.rtw_remaining = self.settings.rtw_delay;
        if self.rtw_remaining == 0 {
            Phase::Write
        } else {
            Phase::ReadToWriteTurnaround
        }
    }

    /// Advances the scheduler by one cycle.
    pub fn tick(&mut self, inputs: SchedulerInputs<'_>) -> SchedulerOutput {
        let SchedulerInputs {
            requests,
            refresh_gnt,
            refresher,
            timings,
        } = inputs;
        let phase = self.phase;

        let ras_allowed = self.trrd.ready() && self.tfaw.ready();
        let cas_allowed = self.tccd.ready();
        let read_available = requests.iter().any(|r| r.valid && r.is_read);
        let write_available = requests.iter().any(|r| r.valid && r.is_write);

        // Row and column choices accepted this cycle.
        let mut cmd_accept: Option<usize> = None;
        let mut req_accept: Option<usize> = None;
        if matches!(phase, Phase::Read | Phase::Write) {
            let reads = phase == Phase::Read;
            if self.single_phase() {
                let wants = Wants {
                    reads,
                    writes: !reads,
                    cmds: true,
                    activates: ras_allowed,
                };
                if let Some(i) = self.choose_req.choose(requests, &wants) {
                    let ready = cas_allowed && (!requests[i].is_activate() || ras_allowed);
                    if ready {
                        self.choose_req.accept(i);
                        req_accept = Some(i);
                    }
                }
            } else {
                let cmd_wants = Wants {
                    cmds: true,
                    activates: ras_allowed,
                    ..Wants::default()
                };
                if let Some(i) = self.choose_cmd.choose(requests, &cmd_wants) {
                    if !requests[i].is_activate() || ras_allowed {
                        self.choose_cmd.accept(i);
                        cmd_accept = Some(i);
                    }
                }
                let req_wants = Wants {
                    reads,
                    writes: !reads,
                    ..Wants::default()
                };
                if let Some(i) = self.choose_req.choose(requests, &req_wants) {
                    if cas_allowed {
                        self.choose_req.accept(i);
                        req_accept = Some(i);
                    }
                }
            }
        }

        let accepted: Vec<&BankRequest> = [cmd_accept, req_accept]
            .into_iter()
            .flatten()
            .map(|i| &requests[i])
            .collect();
        let activate = accepted.iter().any(|r| r.is_activate());
        let column = accepted.iter().any(|r| r.is_read || r.is_write);
        let write = accepted.iter().any(|r| r.is_write);

        let mut acks = vec![false; requests.len()];
        for i in [cmd_accept, req_accept].into_iter().flatten() {
            acks[i] = true;
        }

        // With one phase the request chooser also carries row commands.
        let sel = self.steer_sel();
        let cmd_source = if self.single_phase() { req_accept } else { cmd_accept };
        let phases = self.steerer.steer(
            &sel,
            cmd_source.map(|i| &requests[i]),
            req_accept.map(|i| &requests[i]),
            refresher.command.as_ref(),
        );

        let max_read_time = self.read_starvation.max_time();
        let max_write_time = self.write_starvation.max_time();
        let mut starvation_switch = false;
        let next = match phase {
            Phase::Read => {
                if refresh_gnt {
                    Phase::Refresh
                } else if write_available && (!read_available || max_read_time) {
                    starvation_switch = read_available;
                    self.enter_rtw()
                } else {
                    Phase::Read
                }
            }
            Phase::Write => {
                if refresh_gnt {
                    Phase::Refresh
                } else if read_available && (!write_available || max_write_time) {
                    starvation_switch = write_available;
                    Phase::WriteToReadTurnaround
                } else {
                    Phase::Write
                }
            }
            Phase::ReadToWriteTurnaround => {
                self.rtw_remaining = self.rtw_remaining.saturating_sub(1);
                if self.rtw_remaining == 0 {
                    Phase::Write
                } else {
                    Phase::ReadToWriteTurnaround
                }
            }
            Phase::WriteToReadTurnaround => {
                if self.twtr.ready() {
                    Phase::Read
                } else {
                    Phase::WriteToReadTurnaround
                }
            }
            Phase::Refresh => {
                if refresher.last {
                    Phase::Read
                } else {
                    Phase::Refresh
                }
            }
        };

        self.trrd.tick(activate, timings.t_rrd);
        self.tfaw.tick(activate, timings.t_faw);
        self.tccd.tick(column, timings.t_ccd);
        self.twtr.tick(
            write,
            timings.t_wtr + self.settings.write_latency + timings.t_ccd,
        );
        self.read_starvation.tick(phase == Phase::Read);
        self.write_starvation.tick(phase == Phase::Write);

        if next != phase {
            clilog::debug!("scheduler phase {} -> {}", phase, next);
        }
        self.phase = next;

        SchedulerOutput {
            phase,
            acks,
            phases,
            issued: accepted.len(),
            starvation_switch,
        }
    }
}
