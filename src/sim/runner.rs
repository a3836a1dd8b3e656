//! Closed-loop simulation.
//!
//! Feeds a synthetic workload into `RowBank` queues, steps the controller, and
//! passes every issued command through the protocol model so each run is
//! self-checked against the timing rules.

use std::fs::File;
use std::iter::Peekable;

use serde::Serialize;

use crate::common::data::Transaction;
use crate::common::error::{ConfigError, TraceError};
use crate::config::Config;
use crate::core::controller::{Controller, CycleOutput};
use crate::sim::workload::Workload;
use crate::soc::bank::RowBank;
use crate::stats::ControllerStats;
use crate::verify::model::{CheckReport, ProtocolModel};
use crate::verify::trace::{TraceEntry, TraceWriter};

/// Outcome of a simulation run.
#[derive(Clone, Debug, Serialize)]
pub struct SimReport {
    pub cycles: u64,
    /// Transactions whose column command was issued.
    pub completed: u64,
    /// `true` when the workload drained before the cycle limit.
    pub drained: bool,
    pub stats: ControllerStats,
    pub check: CheckReport,
}

/// Controller, workload and checker stepped together.
pub struct Simulation {
    controller: Controller<RowBank>,
    workload: Peekable<Workload>,
    stalled: Option<Transaction>,
    model: ProtocolModel,
    trace: Option<TraceWriter<File>>,
}

impl Simulation {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let nunits = config.controller.nunits();
        let banks = (0..nunits)
            .map(|unit| RowBank::new(unit, config.controller.queue_depth, config.phy.write_latency()))
            .collect();
        let controller = Controller::new(config, banks)?;
        let model =
            ProtocolModel::from_rules(&config.checker.rules, &config.timing, controller.clock())
                .with_verbose(config.general.trace_commands);
        Ok(Self {
            controller,
            workload: Workload::new(&config.workload, nunits).peekable(),
            stalled: None,
            model,
            trace: None,
        })
    }

    /// Writes every observed channel cycle to a JSON-lines trace.
    pub fn with_trace(mut self, writer: TraceWriter<File>) -> Self {
        self.trace = Some(writer);
        self
    }

    pub fn controller(&self) -> &Controller<RowBank> {
        &self.controller
    }

    pub fn model(&self) -> &ProtocolModel {
        &self.model
    }

    /// Moves transactions into bank queues in order until one does not fit.
    fn feed(&mut self) {
        while let Some(txn) = self.stalled.take().or_else(|| self.workload.next()) {
            let Some(bank) = self.controller.bank_mut(txn.unit) else {
                continue;
            };
            if let Err(txn) = bank.push(txn) {
                self.stalled = Some(txn);
                break;
            }
        }
    }

    /// `true` once every transaction has been issued.
    pub fn drained(&mut self) -> bool {
        self.stalled.is_none()
            && self.workload.peek().is_none()
            && self.controller.banks().iter().all(RowBank::is_idle)
    }

    /// Runs one controller cycle.
    pub fn step(&mut self) -> Result<CycleOutput, TraceError> {
        self.feed();
        let out = self.controller.tick();
        let clock = *self.controller.clock();
        for (time, raw) in out.raw_commands(&clock, self.controller.nranks()) {
            self.model.observe(time, &raw);
            if let Some(trace) = self.trace.as_mut() {
                trace.write(&TraceEntry { time, raw })?;
            }
        }
        Ok(out)
    }

    /// Runs until the workload drains or `max_cycles` elapse.
    pub fn run(&mut self, max_cycles: u64) -> Result<SimReport, TraceError> {
        let timer = clilog::stimer!("simulation");
        while self.controller.cycle() < max_cycles && !self.drained() {
            self.step()?;
        }
        let drained = self.drained();
        if !drained {
            clilog::warn!(
                "cycle limit {} reached with transactions outstanding",
                max_cycles
            );
        }
        if let Some(trace) = self.trace.as_mut() {
            trace.flush()?;
        }
        clilog::finish!(timer);

        Ok(SimReport {
            cycles: self.controller.cycle(),
            completed: self.controller.banks().iter().map(RowBank::completed).sum(),
            drained,
            stats: self.controller.stats().clone(),
            check: self.model.report(),
        })
    }
}
