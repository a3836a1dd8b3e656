//! Minimum-spacing guards.
//!
//! Every command-to-command spacing rule the controller enforces is built from
//! these two primitives. A `DelayGuard` blocks for a programmable number of cycles
//! after each trigger; a `FawGuard` counts activates inside a sliding window.

use std::collections::VecDeque;

/// Activates allowed inside one four-activate window.
pub const FAW_ACTIVATES: usize = 4;

/// Countdown window armed by a trigger.
///
/// A trigger in cycle `t` with delay `D` keeps `ready()` low until cycle `t + D`,
/// so two triggers gated by the guard are at least `D` cycles apart. Delays of zero
/// and one never block. The delay is sampled when the trigger fires; changing it
/// later only affects the next window. A new trigger restarts the window.
#[derive(Clone, Debug, Default)]
pub struct DelayGuard {
    count: u32,
}

impl DelayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when the guarded event may happen this cycle.
    pub fn ready(&self) -> bool {
        self.count == 0
    }

    /// Cycles left before the guard opens.
    pub fn remaining(&self) -> u32 {
        self.count
    }

    /// Advances the guard by one cycle.
    ///
    /// # Arguments
    ///
    /// * `trigger` - The guarded event happened this cycle.
    /// * `delay` - Minimum spacing in cycles, sampled on trigger.
    pub fn tick(&mut self, trigger: bool, delay: u32) {
        if trigger {
            self.count = delay.saturating_sub(1);
        } else {
            self.count = self.count.saturating_sub(1);
        }
    }
}

/// Four-activate window guard.
///
/// `ready()` is low while four activates were triggered within the last `tFAW`
/// cycles. The window length is resampled on every tick, so a register change
/// applies to activates already in flight.
#[derive(Clone, Debug, Default)]
pub struct FawGuard {
    now: u64,
    window: u32,
    stamps: VecDeque<u64>,
}

impl FawGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready(&self) -> bool {
        self.in_window() < FAW_ACTIVATES
    }

    fn in_window(&self) -> usize {
        self.stamps
            .iter()
            .filter(|&&t| self.now - t < self.window as u64)
            .count()
    }

    /// Advances the guard by one cycle.
    ///
    /// # Arguments
    ///
    /// * `trigger` - An activate was issued this cycle.
    /// * `tfaw` - Window length in cycles.
    pub fn tick(&mut self, trigger: bool, tfaw: u32) {
        if trigger {
            if self.stamps.len() == FAW_ACTIVATES {
                self.stamps.pop_front();
            }
            self.stamps.push_back(self.now);
        }
        self.now += 1;
        self.window = tfaw;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_guard_spacing() {
        let mut guard = DelayGuard::new();
        assert!(guard.ready());
        guard.tick(true, 3);
        assert!(!guard.ready());
        guard.tick(false, 3);
        assert!(!guard.ready());
        guard.tick(false, 3);
        assert!(guard.ready());
    }

    #[test]
    fn test_delay_guard_short_delays_never_block() {
        let mut guard = DelayGuard::new();
        guard.tick(true, 1);
        assert!(guard.ready());
        guard.tick(true, 0);
        assert!(guard.ready());
    }

    #[test]
    fn test_faw_guard_blocks_fifth_activate() {
        let mut guard = FawGuard::new();
        for _ in 0..4 {
            assert!(guard.ready());
            guard.tick(true, 10);
        }
        assert!(!guard.ready());
        for _ in 0..5 {
            guard.tick(false, 10);
        }
        assert!(!guard.ready());
        guard.tick(false, 10);
        assert!(guard.ready());
    }
}
