//! DRAM controller scheduler CLI.
//!
//! # Usage
//!
//! The binary runs in two modes:
//! 1. **simulate**: Drives the controller with the configured synthetic
//!    workload, checks every issued command and prints controller statistics.
//! 2. **check**: Replays a JSON-lines command trace through the protocol model.
//!
//! Both modes exit with a non-zero status when a violation is found.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use dram_scheduler::config::Config;
use dram_scheduler::sim::Simulation;
use dram_scheduler::verify::{check_trace, read_trace, CheckReport, ProtocolModel, TraceWriter};

/// Command-line arguments for the DRAM scheduler.
#[derive(Parser, Debug)]
#[command(author, version, about = "DRAM command scheduler and timing checker")]
struct Args {
    #[arg(short, long, default_value = "configs/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Runs the synthetic workload through the controller.
    Simulate {
        /// Cycle limit; overrides `workload.max_cycles`.
        #[arg(long)]
        cycles: Option<u64>,

        /// Writes the issued command stream as a JSON-lines trace.
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Prints the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Checks a recorded command trace against the timing rules.
    Check {
        trace: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    clilog::init_stderr_color_debug();
    clilog::enable_timer("dram_scheduler");
    clilog::set_max_print_count(clilog::Level::Warn, "ACT_REOPEN", 8);

    let args = Args::parse();
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            clilog::error!("{:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Runs the selected mode.
///
/// # Returns
///
/// `true` when no violation was found.
fn run(args: Args) -> anyhow::Result<bool> {
    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    match args.mode {
        Mode::Simulate {
            cycles,
            trace,
            json,
        } => {
            if !json {
                print_config(&config);
            }
            let mut sim = Simulation::new(&config).context("building controller")?;
            if let Some(path) = trace {
                let writer = TraceWriter::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                sim = sim.with_trace(writer);
            }
            let report = sim
                .run(cycles.unwrap_or(config.workload.max_cycles))
                .context("writing trace")?;

            if json {
                print_json(&report)?;
            } else {
                report.stats.print();
                println!("completed_transactions   {}", report.completed);
                println!("workload_drained         {}", report.drained);
                print_check(&report.check);
            }
            Ok(report.check.passed)
        }
        Mode::Check { trace, json } => {
            let timer = clilog::stimer!("check_trace");
            let entries =
                read_trace(&trace).with_context(|| format!("reading {}", trace.display()))?;
            let clock = config.clock()?;
            let mut model = ProtocolModel::from_rules(&config.checker.rules, &config.timing, &clock);
            let report = check_trace(&entries, &mut model);
            clilog::finish!(timer);

            if json {
                print_json(&report)?;
            } else {
                print_check(&report);
            }
            Ok(report.passed)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_check(report: &CheckReport) {
    println!("==========================================================");
    println!("PROTOCOL CHECK");
    println!("----------------------------------------------------------");
    println!("  Commands:           {}", report.commands);
    println!("  Anomalies:          {}", report.anomalies);
    println!("  Decode Failures:    {}", report.decode_failures);
    println!("  Violations:         {}", report.violations.len());
    for violation in report.violations.iter().take(16) {
        println!("    {}", violation);
    }
    if report.violations.len() > 16 {
        println!("    ... {} more", report.violations.len() - 16);
    }
    println!(
        "  Result:             {}",
        if report.passed { "PASS" } else { "FAIL" }
    );
    println!("==========================================================");
}

fn print_config(config: &Config) {
    println!("Global Configuration");
    println!("--------------------");
    println!("General:");
    println!("  Trace Commands:     {}", config.general.trace_commands);
    println!("  Clock:              {} MHz", config.general.clk_freq_mhz);
    println!("Controller:");
    println!(
        "  Geometry:           {} rank(s) x {} banks",
        config.controller.nranks, config.controller.nbanks
    );
    println!(
        "  Refresh:            {} (postponing {})",
        if config.controller.with_refresh {
            "Enabled"
        } else {
            "Disabled"
        },
        config.controller.refresh_postponing
    );
    println!(
        "  ZQCS:               {}",
        match config.timing.t_zqcs {
            Some(t) => format!("Enabled (tZQCS {}, {} Hz)", t, config.controller.zqcs_freq_hz),
            None => "Disabled".to_string(),
        }
    );
    println!(
        "  Anti-Starvation:    read {} / write {} cycles",
        config.controller.read_time, config.controller.write_time
    );
    println!("  Queue Depth:        {}", config.controller.queue_depth);
    println!("PHY:");
    println!("  Phases:             {}", config.phy.nphases);
    println!(
        "  Read/Write Phase:   {} / {}",
        config.phy.rdphase, config.phy.wrphase
    );
    println!(
        "  CL/CWL:             {} / {}",
        config.phy.cl, config.phy.cwl
    );
    println!("Timing:");
    let t = &config.timing;
    println!(
        "  tRP {} tRCD {} tWR {} tWTR {} tCCD {}",
        t.t_rp, t.t_rcd, t.t_wr, t.t_wtr, t.t_ccd
    );
    println!(
        "  tREFI {} tRFC {} tFAW {} tRRD {} tRC {} tRAS {}",
        t.t_refi, t.t_rfc, t.t_faw, t.t_rrd, t.t_rc, t.t_ras
    );
    println!("Workload:");
    println!(
        "  Pattern:            {:?}, {} transactions",
        config.workload.pattern, config.workload.transactions
    );
    println!(
        "  Read Ratio:         {:.2}, locality {:.2}",
        config.workload.read_ratio, config.workload.locality
    );
    println!("--------------------");
}
