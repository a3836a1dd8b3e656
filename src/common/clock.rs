//! Controller clock.
//!
//! Timing registers hold controller-clock cycles while observed command traces
//! carry absolute time stamps in picoseconds. `Clock` converts between the two.

/// Picoseconds per microsecond, the scale used for `clk_freq_mhz`.
const PS_PER_US: f64 = 1_000_000.0;

/// Controller clock with an integral period in picoseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    period_ps: u64,
    nphases: u64,
}

impl Clock {
    /// Creates a clock from its frequency.
    ///
    /// # Arguments
    ///
    /// * `clk_freq_mhz` - Controller clock frequency in MHz.
    /// * `nphases` - DFI phases per controller cycle.
    ///
    /// Returns `None` when the frequency does not yield a period of at least one
    /// picosecond.
    pub fn from_mhz(clk_freq_mhz: f64, nphases: usize) -> Option<Self> {
        if !clk_freq_mhz.is_finite() || clk_freq_mhz <= 0.0 || nphases == 0 {
            return None;
        }
        let period_ps = (PS_PER_US / clk_freq_mhz).round() as u64;
        (period_ps > 0).then_some(Self {
            period_ps,
            nphases: nphases as u64,
        })
    }

    pub fn period_ps(&self) -> u64 {
        self.period_ps
    }

    /// Converts a cycle count into time units.
    pub fn cycles_to_ps(&self, cycles: u32) -> u64 {
        cycles as u64 * self.period_ps
    }

    /// Smallest time between two commands issued `cycles` controller cycles
    /// apart.
    ///
    /// Commands of one cycle sit on different DFI phases, so a later command on
    /// an earlier phase can be up to `nphases - 1` phase slots closer.
    pub fn spacing_ps(&self, cycles: u32) -> u64 {
        let slack = (self.nphases - 1) * self.period_ps / self.nphases;
        self.cycles_to_ps(cycles).saturating_sub(slack)
    }

    /// Time stamp of a DFI phase within a controller cycle.
    pub fn timestamp(&self, cycle: u64, phase: usize) -> u64 {
        cycle * self.period_ps + phase as u64 * self.period_ps / self.nphases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_rounds_to_picoseconds() {
        let clock = Clock::from_mhz(100.0, 1).unwrap();
        assert_eq!(clock.period_ps(), 10_000);
        assert_eq!(clock.cycles_to_ps(6), 60_000);
        assert_eq!(Clock::from_mhz(0.0, 1), None);
    }

    #[test]
    fn test_phase_timestamps() {
        let clock = Clock::from_mhz(100.0, 4).unwrap();
        assert_eq!(clock.timestamp(2, 0), 20_000);
        assert_eq!(clock.timestamp(2, 3), 27_500);
        // Phase 3 of cycle 2 to phase 0 of cycle 5 is three cycles apart.
        assert_eq!(clock.timestamp(5, 0) - clock.timestamp(2, 3), clock.spacing_ps(3));
    }
}
