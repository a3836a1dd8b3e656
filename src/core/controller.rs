//! Controller top level.
//!
//! Wires the refresher, the scheduler and the bank units together and steps
//! them in a fixed order each cycle:
//!
//! 1. take the timing register snapshot,
//! 2. tick the refresher with the scheduler's current phase as `ready`,
//! 3. sample bank requests and refresh grants,
//! 4. tick the scheduler,
//! 5. commit the bank units with their acknowledgements and the refresh request.
//!
//! Exactly one party owns the command channel in any cycle.

use crate::common::clock::Clock;
use crate::common::command::RawCommand;
use crate::common::error::ConfigError;
use crate::config::Config;
use crate::core::refresh::Refresher;
use crate::core::registers::RegisterBank;
use crate::core::scheduler::{Phase, Scheduler, SchedulerInputs, SchedulerSettings};
use crate::core::steerer::PhaseCommand;
use crate::soc::traits::{BankRequest, BankUnit};
use crate::stats::ControllerStats;

/// Owner of the command channel in one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOwner {
    Idle,
    Scheduler,
    Refresher,
}

/// Everything the controller drove in one cycle.
#[derive(Clone, Debug)]
pub struct CycleOutput {
    pub cycle: u64,
    /// Scheduler phase during the cycle.
    pub phase: Phase,
    /// Scheduler phase for the next cycle.
    pub next_phase: Phase,
    pub owner: ChannelOwner,
    /// One slot per DFI phase.
    pub phases: Vec<PhaseCommand>,
    pub starvation_switch: bool,
    pub refresh_done: bool,
    pub zqcs_done: bool,
}

impl CycleOutput {
    /// Time-stamped wire view of the cycle.
    ///
    /// Only slots carrying a command or a write data enable are returned.
    pub fn raw_commands(&self, clock: &Clock, nranks: usize) -> Vec<(u64, RawCommand)> {
        self.phases
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_nop() || slot.wrdata_en)
            .map(|(i, slot)| (clock.timestamp(self.cycle, i), slot.to_raw(nranks)))
            .collect()
    }
}

/// DRAM controller core driving a set of bank units.
pub struct Controller<B: BankUnit> {
    registers: RegisterBank,
    refresher: Refresher,
    scheduler: Scheduler,
    banks: Vec<B>,
    nranks: usize,
    clock: Clock,
    cycle: u64,
    stats: ControllerStats,
    trace: bool,
}

impl<B: BankUnit> Controller<B> {
    /// Builds a controller.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration.
    /// * `banks` - Bank units, rank-major; there must be `nranks * nbanks`.
    pub fn new(config: &Config, banks: Vec<B>) -> Result<Self, ConfigError> {
        let ctrl = &config.controller;
        if banks.len() != ctrl.nunits() {
            return Err(ConfigError::Geometry(format!(
                "{} bank units for {} ranks of {} banks",
                banks.len(),
                ctrl.nranks,
                ctrl.nbanks
            )));
        }
        let registers = RegisterBank::new(config.timing, &config.limits)?;
        let zqcs_period = config.zqcs_period()?;
        let refresher = Refresher::new(ctrl.with_refresh, ctrl.refresh_postponing, zqcs_period);
        let phy = &config.phy;
        let scheduler = Scheduler::new(SchedulerSettings {
            nphases: phy.nphases,
            rdphase: phy.rdphase,
            wrphase: phy.wrphase,
            nbanks: ctrl.nbanks,
            nunits: banks.len(),
            write_latency: phy.write_latency(),
            rtw_delay: phy.rtw_delay(),
            read_time: ctrl.read_time,
            write_time: ctrl.write_time,
            t_phy_wrlat: phy.t_phy_wrlat,
        });
        Ok(Self {
            registers,
            refresher,
            scheduler,
            banks,
            nranks: ctrl.nranks,
            clock: config.clock()?,
            cycle: 0,
            stats: ControllerStats::default(),
            trace: config.general.trace_commands || cfg!(feature = "always-trace"),
        })
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn phase(&self) -> Phase {
        self.scheduler.phase()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn nranks(&self) -> usize {
        self.nranks
    }

    pub fn banks(&self) -> &[B] {
        &self.banks
    }

    pub fn bank_mut(&mut self, unit: usize) -> Option<&mut B> {
        self.banks.get_mut(unit)
    }

    pub fn refresher(&self) -> &Refresher {
        &self.refresher
    }

    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    /// Timing registers; writes apply from the next tick.
    pub fn registers_mut(&mut self) -> &mut RegisterBank {
        &mut self.registers
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Advances the controller by one cycle.
    pub fn tick(&mut self) -> CycleOutput {
        let timings = *self.registers.snapshot();
        let phase = self.scheduler.phase();

        let refresh = self.refresher.tick(phase == Phase::Refresh, &timings);
        let requests: Vec<BankRequest> = self.banks.iter().map(|b| b.request()).collect();
        let refresh_gnt = self.banks.iter().all(|b| b.refresh_gnt());

        let out = self.scheduler.tick(SchedulerInputs {
            requests: &requests,
            refresh_gnt,
            refresher: &refresh,
            timings: &timings,
        });
        for (bank, &ack) in self.banks.iter_mut().zip(&out.acks) {
            bank.tick(ack, refresh.valid, &timings);
        }

        debug_assert!(
            !(out.phase == Phase::Refresh && out.issued > 0),
            "bank command issued during refresh"
        );
        debug_assert!(
            refresh.command.is_none() || out.phase == Phase::Refresh,
            "refresher drove the channel outside its phase"
        );
        let owner = if out.phase == Phase::Refresh {
            ChannelOwner::Refresher
        } else if out.issued > 0 {
            ChannelOwner::Scheduler
        } else {
            ChannelOwner::Idle
        };

        let cycle_out = CycleOutput {
            cycle: self.cycle,
            phase: out.phase,
            next_phase: self.scheduler.phase(),
            owner,
            phases: out.phases,
            starvation_switch: out.starvation_switch,
            refresh_done: refresh.refresh_done,
            zqcs_done: refresh.zqcs_done,
        };

        if self.trace {
            for (i, slot) in cycle_out.phases.iter().enumerate() {
                if !slot.is_nop() {
                    clilog::info!(
                        "[Cmd] cycle={} phase={} {} {} bank={} addr={:#x}",
                        self.cycle,
                        i,
                        cycle_out.phase,
                        slot.kind(),
                        slot.bank,
                        slot.address
                    );
                }
            }
        }

        self.stats.record(&cycle_out);
        self.cycle += 1;
        cycle_out
    }
}
