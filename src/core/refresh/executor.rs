//! Refresh and ZQ calibration sequences.
//!
//! Both executors are driven by a `TimelineCounter`: once triggered it counts
//! elapsed cycles up to the end of the sequence and then returns to zero, and the
//! executor emits its commands at fixed positions on that timeline.

use crate::common::command::{ControlBits, A10};
use crate::core::registers::Timings;

/// Elapsed-cycle counter for a fixed command timeline.
#[derive(Clone, Debug, Default)]
pub struct TimelineCounter {
    count: u32,
}

impl TimelineCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running(&self) -> bool {
        self.count != 0
    }

    /// Advances one cycle.
    ///
    /// # Arguments
    ///
    /// * `trigger` - Starts the timeline when idle.
    /// * `target` - Last position of the timeline.
    ///
    /// # Returns
    ///
    /// The position reached this cycle, or `None` when idle.
    pub fn tick(&mut self, trigger: bool, target: u32) -> Option<u32> {
        if !trigger && self.count == 0 {
            return None;
        }
        let pos = self.count;
        self.count = if pos >= target { 0 } else { pos + 1 };
        Some(pos)
    }
}

/// Command driven onto the channel by the refresher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshCommand {
    pub bits: ControlBits,
    pub address: u32,
}

impl RefreshCommand {
    pub fn precharge_all() -> Self {
        Self {
            bits: ControlBits::PRECHARGE,
            address: A10,
        }
    }

    pub fn auto_refresh() -> Self {
        Self {
            bits: ControlBits::REFRESH,
            address: A10,
        }
    }

    pub fn zq_short() -> Self {
        Self {
            bits: ControlBits::ZQ_CALIBRATION,
            address: 0,
        }
    }
}

/// Output of one executor cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutorOutput {
    pub command: Option<RefreshCommand>,
    pub done: bool,
}

/// Precharge-all, wait tRP, auto-refresh, wait tRFC.
#[derive(Clone, Debug, Default)]
pub struct RefreshExecutor {
    timeline: TimelineCounter,
}

impl RefreshExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, start: bool, timings: &Timings) -> ExecutorOutput {
        let refresh_at = timings.t_rp;
        let done_at = timings.t_rp + timings.t_rfc;
        let mut out = ExecutorOutput::default();
        match self.timeline.tick(start, done_at) {
            Some(0) => out.command = Some(RefreshCommand::precharge_all()),
            Some(pos) if pos == refresh_at => out.command = Some(RefreshCommand::auto_refresh()),
            Some(pos) if pos == done_at => out.done = true,
            _ => {}
        }
        out
    }
}

/// Precharge-all, wait tRP, ZQ short calibration, wait tZQCS.
#[derive(Clone, Debug, Default)]
pub struct ZqcsExecutor {
    timeline: TimelineCounter,
}

impl ZqcsExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances one cycle; `t_zqcs` is the calibration time in cycles.
    pub fn tick(&mut self, start: bool, timings: &Timings, t_zqcs: u32) -> ExecutorOutput {
        let zqcs_at = timings.t_rp;
        let done_at = timings.t_rp + t_zqcs;
        let mut out = ExecutorOutput::default();
        match self.timeline.tick(start, done_at) {
            Some(0) => out.command = Some(RefreshCommand::precharge_all()),
            Some(pos) if pos == zqcs_at => out.command = Some(RefreshCommand::zq_short()),
            Some(pos) if pos == done_at => out.done = true,
            _ => {}
        }
        out
    }
}

/// Runs the refresh executor once per owed refresh.
#[derive(Clone, Debug, Default)]
pub struct RefreshSequencer {
    remaining: u32,
    executor: RefreshExecutor,
}

impl RefreshSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn busy(&self) -> bool {
        self.remaining != 0
    }

    /// Advances one cycle.
    ///
    /// # Arguments
    ///
    /// * `start` - Load `postponing` passes; the first pass begins this cycle.
    /// * `postponing` - Number of refreshes to run.
    /// * `timings` - Timing snapshot for this cycle.
    ///
    /// `done` in the returned output is high only when the last pass completes.
    pub fn tick(&mut self, start: bool, postponing: u32, timings: &Timings) -> ExecutorOutput {
        if start {
            self.remaining = postponing;
        }
        let mut out = self.executor.tick(self.remaining > 0, timings);
        if out.done {
            self.remaining = self.remaining.saturating_sub(1);
            out.done = self.remaining == 0;
        }
        out
    }
}
