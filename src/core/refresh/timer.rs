//! Refresh cadence.
//!
//! The timer produces a one-cycle pulse every tREFI cycles; the postponer folds
//! several consecutive pulses into a single refresh request so the sequencer can
//! run the owed refreshes back to back.

/// Largest supported refresh postponement depth.
pub const MAX_POSTPONING: u32 = 8;

/// Periodic down-counter.
///
/// `done()` is high while the count is zero. Each tick decrements the count while
/// `wait` is high and the timer is not done, and reloads `period - 1` otherwise.
/// Driving `wait` with `!done()` yields a pulse every `period` cycles, the first
/// one at cycle 0.
#[derive(Clone, Debug, Default)]
pub struct RefreshTimer {
    count: u32,
}

impl RefreshTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done(&self) -> bool {
        self.count == 0
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn tick(&mut self, wait: bool, period: u32) {
        if wait && !self.done() {
            self.count -= 1;
        } else {
            self.count = period.saturating_sub(1);
        }
    }
}

/// Collapses `postponing` refresh pulses into one request.
#[derive(Clone, Debug)]
pub struct RefreshPostponer {
    count: u32,
    postponing: u32,
}

impl RefreshPostponer {
    pub fn new(postponing: u32) -> Self {
        let postponing = postponing.max(1);
        Self {
            count: postponing - 1,
            postponing,
        }
    }

    pub fn postponing(&self) -> u32 {
        self.postponing
    }

    /// Consumes one cycle of the refresh pulse.
    ///
    /// Returns `true` in the cycle the `postponing`-th pulse arrives.
    pub fn tick(&mut self, pulse: bool) -> bool {
        if !pulse {
            return false;
        }
        if self.count == 0 {
            self.count = self.postponing - 1;
            true
        } else {
            self.count -= 1;
            false
        }
    }
}
