//! Integration tests for configuration loading and validation.

use std::path::Path;

use dram_scheduler::common::command::CommandKind;
use dram_scheduler::common::error::ConfigError;
use dram_scheduler::config::{Config, Pattern};
use dram_scheduler::core::registers::TimingReg;
use dram_scheduler::core::Controller;
use dram_scheduler::soc::RowBank;
use dram_scheduler::verify::RuleScope;

fn configs_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/configs"))
}

/// Tests that the shipped configurations load and validate.
#[test]
fn test_shipped_configs_load() {
    let config = Config::load(configs_dir().join("default.toml")).unwrap();
    assert_eq!(config.controller.nbanks, 8);
    assert_eq!(config.timing.t_zqcs, Some(64));
    assert_eq!(config.workload.pattern, Pattern::Random);

    let quad = Config::load(configs_dir().join("quad_phase.toml")).unwrap();
    assert_eq!(quad.phy.nphases, 4);
    assert_eq!(quad.controller.nunits(), 16);
    assert_eq!(quad.timing.t_zqcs, None);
}

/// Tests that an empty file yields the defaults.
#[test]
fn test_empty_config_defaults() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config.controller.refresh_postponing, 1);
    assert_eq!(config.phy.nphases, 1);
    assert_eq!(config.checker.rules.len(), 16);
    assert_eq!(config.zqcs_period().unwrap(), None);
}

/// Tests that a partial timing table keeps the other defaults.
#[test]
fn test_partial_timing_table() {
    let config = Config::from_toml_str("[timing]\ntRP = 5\ntZQCS = 40\n").unwrap();
    assert_eq!(config.timing.t_rp, 5);
    assert_eq!(config.timing.t_rcd, 3);
    assert_eq!(config.timing.t_zqcs, Some(40));
    // 1 Hz at 100 MHz.
    assert_eq!(config.zqcs_period().unwrap(), Some(100_000_000));
}

/// Tests that postponing outside 1..=8 is rejected.
#[test]
fn test_postponing_range() {
    let err = Config::from_toml_str("[controller]\nrefresh_postponing = 9\n").unwrap_err();
    assert!(matches!(err, ConfigError::Postponing(9)));
    let err = Config::from_toml_str("[controller]\nrefresh_postponing = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Postponing(0)));
    assert!(Config::from_toml_str("[controller]\nrefresh_postponing = 8\n").is_ok());
}

/// Tests that a timing value wider than its register is rejected.
#[test]
fn test_register_overflow() {
    let text = "[timing]\ntRFC = 300\n[limits]\ntRFC = 100\n";
    match Config::from_toml_str(text) {
        Err(ConfigError::RegisterOverflow { reg, value, width }) => {
            assert_eq!(reg, TimingReg::Rfc);
            assert_eq!(value, 300);
            assert_eq!(width, 8);
        }
        other => panic!("expected overflow, got {:?}", other.map(|_| ())),
    }
}

/// Tests that registers missing from a partial limits table are sized from
/// their timing values.
#[test]
fn test_partial_limits_fall_back_to_timing() {
    let config = Config::from_toml_str("[timing]\ntREFI = 7800\n[limits]\ntRP = 15\n").unwrap();
    assert_eq!(config.limits.t_rp, Some(15));
    assert_eq!(config.limits.t_refi, None);

    let banks: Vec<RowBank> = (0..config.controller.nunits())
        .map(|unit| RowBank::new(unit, 4, config.phy.write_latency()))
        .collect();
    let controller = Controller::new(&config, banks).unwrap();
    let registers = controller.registers();
    assert_eq!(registers.width(TimingReg::Refi), 14);
    assert_eq!(registers.width(TimingReg::Rp), 5);
    assert_eq!(registers.snapshot().t_refi, 7800);
}

/// Tests that zero tRP and tREFI are rejected.
#[test]
fn test_zero_timings() {
    let err = Config::from_toml_str("[timing]\ntRP = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::ZeroTiming(TimingReg::Rp)));
    let err = Config::from_toml_str("[timing]\ntREFI = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::ZeroTiming(TimingReg::Refi)));
}

/// Tests phase and geometry checks.
#[test]
fn test_phase_and_geometry() {
    let err = Config::from_toml_str("[phy]\nnphases = 2\nrdphase = 2\n").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Phase {
            name: "rdphase",
            phase: 2,
            nphases: 2
        }
    ));
    let err = Config::from_toml_str("[controller]\nnbanks = 6\n").unwrap_err();
    assert!(matches!(err, ConfigError::Geometry(_)));
    let err = Config::from_toml_str("[general]\nclk_freq_mhz = 0.0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Frequency(_)));
}

/// Tests workload parameter checks.
#[test]
fn test_workload_checks() {
    let err = Config::from_toml_str("[workload]\nread_ratio = 1.5\n").unwrap_err();
    assert!(matches!(err, ConfigError::Workload(_)));
    let err = Config::from_toml_str("[workload]\ncol_bits = 11\n").unwrap_err();
    assert!(matches!(err, ConfigError::Workload(_)));
}

/// Tests that unparsable TOML is a parse error.
#[test]
fn test_parse_error() {
    let err = Config::from_toml_str("[timing]\ntRP = \"three\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    let err = Config::load("/nonexistent/dram.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

/// Tests a custom rule table.
#[test]
fn test_custom_rules() {
    let text = r#"
[[checker.rules]]
prev = "WR"
curr = "RD"
timing = "tWTR"

[[checker.rules]]
prev = "PRE"
curr = "ACT"
timing = "tRP"
scope = "bank"
"#;
    let config = Config::from_toml_str(text).unwrap();
    let rules = &config.checker.rules;
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].prev, CommandKind::Write);
    assert_eq!(rules[0].scope, RuleScope::Channel);
    assert_eq!(rules[1].timing, TimingReg::Rp);
    assert_eq!(rules[1].scope, RuleScope::Bank);
}

/// Tests derived PHY latencies.
#[test]
fn test_phy_latencies() {
    let config = Config::from_toml_str("[phy]\nnphases = 4\ncwl = 6\ncl = 7\n").unwrap();
    assert_eq!(config.phy.write_latency(), 2);
    assert_eq!(config.phy.rtw_delay(), 2);
    let config = Config::from_toml_str("[phy]\nread_latency = 9\n").unwrap();
    assert_eq!(config.phy.rtw_delay(), 8);
}

/// Tests runtime register writes through the controller.
#[test]
fn test_runtime_register_writes() {
    let config = Config::from_toml_str("[limits]\ntRP = 15\n").unwrap();
    let banks: Vec<RowBank> = (0..config.controller.nunits())
        .map(|unit| RowBank::new(unit, 4, config.phy.write_latency()))
        .collect();
    let mut controller = Controller::new(&config, banks).unwrap();
    let registers = controller.registers_mut();
    assert_eq!(registers.width(TimingReg::Rp), 5);
    registers.write(TimingReg::Rp, 12).unwrap();
    assert!(matches!(
        registers.write(TimingReg::Rp, 40),
        Err(ConfigError::RegisterOverflow { .. })
    ));
    assert!(matches!(
        registers.write(TimingReg::Zqcs, 10),
        Err(ConfigError::MissingRegister(TimingReg::Zqcs))
    ));
    assert_eq!(controller.registers().snapshot().t_rp, 12);
}

/// Tests that the controller rejects a bank count that does not match.
#[test]
fn test_controller_bank_count() {
    let config = Config::default();
    let banks = vec![RowBank::new(0, 4, 5)];
    assert!(matches!(
        Controller::new(&config, banks),
        Err(ConfigError::Geometry(_))
    ));
}
