//! Controller statistics collection and reporting.
//!
//! Tracks how many cycles the scheduler spends in each phase, how busy the
//! command channel is, and how many commands of each kind were issued.

use std::time::Instant;

use serde::Serialize;

use crate::common::command::CommandKind;
use crate::core::controller::CycleOutput;
use crate::core::scheduler::Phase;

/// Controller statistics structure tracking all performance metrics.
#[derive(Clone, Debug, Serialize)]
pub struct ControllerStats {
    #[serde(skip)]
    start_time: Instant,
    pub cycles: u64,

    pub cycles_read: u64,
    pub cycles_write: u64,
    pub cycles_rtw: u64,
    pub cycles_wtr: u64,
    pub cycles_refresh: u64,
    /// Cycles carrying at least one non-NOP command.
    pub cycles_busy: u64,

    pub cmd_activate: u64,
    pub cmd_precharge: u64,
    pub cmd_precharge_all: u64,
    pub cmd_read: u64,
    pub cmd_write: u64,
    pub cmd_refresh: u64,
    pub cmd_zqcs: u64,

    pub refresh_sequences: u64,
    pub zqcs_sequences: u64,
    pub turnarounds: u64,
    pub starvation_switches: u64,
}

impl Default for ControllerStats {
    /// Returns the default value.
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            cycles_read: 0,
            cycles_write: 0,
            cycles_rtw: 0,
            cycles_wtr: 0,
            cycles_refresh: 0,
            cycles_busy: 0,
            cmd_activate: 0,
            cmd_precharge: 0,
            cmd_precharge_all: 0,
            cmd_read: 0,
            cmd_write: 0,
            cmd_refresh: 0,
            cmd_zqcs: 0,
            refresh_sequences: 0,
            zqcs_sequences: 0,
            turnarounds: 0,
            starvation_switches: 0,
        }
    }
}

impl ControllerStats {
    /// Accumulates one controller cycle.
    pub fn record(&mut self, out: &CycleOutput) {
        self.cycles += 1;
        match out.phase {
            Phase::Read => self.cycles_read += 1,
            Phase::Write => self.cycles_write += 1,
            Phase::ReadToWriteTurnaround => self.cycles_rtw += 1,
            Phase::WriteToReadTurnaround => self.cycles_wtr += 1,
            Phase::Refresh => self.cycles_refresh += 1,
        }
        if out.next_phase != out.phase
            && matches!(
                out.next_phase,
                Phase::ReadToWriteTurnaround | Phase::WriteToReadTurnaround
            )
        {
            self.turnarounds += 1;
        }
        if out.starvation_switch {
            self.starvation_switches += 1;
        }
        if out.refresh_done {
            self.refresh_sequences += 1;
        }
        if out.zqcs_done {
            self.zqcs_sequences += 1;
        }

        let mut busy = false;
        for slot in out.phases.iter().filter(|slot| !slot.is_nop()) {
            busy = true;
            match slot.kind() {
                CommandKind::Activate => self.cmd_activate += 1,
                CommandKind::Precharge => self.cmd_precharge += 1,
                CommandKind::PrechargeAll => self.cmd_precharge_all += 1,
                CommandKind::Read => self.cmd_read += 1,
                CommandKind::Write => self.cmd_write += 1,
                CommandKind::Refresh => self.cmd_refresh += 1,
                CommandKind::ZqShort => self.cmd_zqcs += 1,
                _ => {}
            }
        }
        if busy {
            self.cycles_busy += 1;
        }
    }

    /// Fraction of cycles that carried a column command.
    pub fn data_bus_utilization(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        (self.cmd_read + self.cmd_write) as f64 / self.cycles as f64
    }

    /// Prints a formatted summary of all controller statistics.
    pub fn print(&self) {
        let seconds = self.start_time.elapsed().as_secs_f64();
        let cyc = self.cycles.max(1) as f64;
        let pct = |n: u64| 100.0 * n as f64 / cyc;
        let khz = if seconds > 0.0 {
            (self.cycles as f64 / seconds) / 1000.0
        } else {
            0.0
        };

        println!("\n==========================================================");
        println!("DRAM CONTROLLER STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {:.4} s", seconds);
        println!("sim_cycles               {}", self.cycles);
        println!("sim_freq                 {:.2} kHz", khz);
        println!("bus_utilization          {:.2}%", 100.0 * self.data_bus_utilization());
        println!("cmd_bus_busy             {:.2}%", pct(self.cycles_busy));
        println!("----------------------------------------------------------");
        println!("SCHEDULER PHASES");
        println!("  read                   {} ({:.2}%)", self.cycles_read, pct(self.cycles_read));
        println!("  write                  {} ({:.2}%)", self.cycles_write, pct(self.cycles_write));
        println!("  read_to_write          {} ({:.2}%)", self.cycles_rtw, pct(self.cycles_rtw));
        println!("  write_to_read          {} ({:.2}%)", self.cycles_wtr, pct(self.cycles_wtr));
        println!(
            "  refresh                {} ({:.2}%)",
            self.cycles_refresh,
            pct(self.cycles_refresh)
        );
        println!("  turnarounds            {}", self.turnarounds);
        println!("  starvation_switches    {}", self.starvation_switches);
        println!("----------------------------------------------------------");
        println!("COMMANDS");
        println!("  ACT                    {}", self.cmd_activate);
        println!("  PRE                    {}", self.cmd_precharge);
        println!("  PREA                   {}", self.cmd_precharge_all);
        println!("  RD                     {}", self.cmd_read);
        println!("  WR                     {}", self.cmd_write);
        println!("  REF                    {}", self.cmd_refresh);
        println!("  ZQCS                   {}", self.cmd_zqcs);
        println!("----------------------------------------------------------");
        println!("MAINTENANCE");
        println!("  refresh_sequences      {}", self.refresh_sequences);
        println!("  zqcs_sequences         {}", self.zqcs_sequences);
        println!("==========================================================");
    }
}
