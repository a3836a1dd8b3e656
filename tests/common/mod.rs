//! Shared helpers for integration tests.

#![allow(dead_code)]

use dram_scheduler::config::Config;
use dram_scheduler::core::registers::Timings;
use dram_scheduler::soc::{BankRequest, BankUnit, RowBank};

/// Bank unit that presents a fixed request every cycle.
///
/// Grants a refresh one cycle after the refresher asks for it and counts how
/// often its request was issued.
#[derive(Clone, Debug)]
pub struct ScriptedBank {
    pub request: BankRequest,
    pub issued: u64,
    refresh_pending: bool,
}

impl ScriptedBank {
    pub fn new(request: BankRequest) -> Self {
        Self {
            request,
            issued: 0,
            refresh_pending: false,
        }
    }

    pub fn idle(unit: usize) -> Self {
        Self::new(BankRequest::idle(unit))
    }
}

impl BankUnit for ScriptedBank {
    fn request(&self) -> BankRequest {
        if self.refresh_pending {
            BankRequest::idle(self.request.unit)
        } else {
            self.request
        }
    }

    fn refresh_gnt(&self) -> bool {
        self.refresh_pending
    }

    fn tick(&mut self, ready: bool, refresh_req: bool, _timings: &Timings) {
        if ready && self.request().valid {
            self.issued += 1;
        }
        self.refresh_pending = refresh_req;
    }
}

/// Single-rank, single-phase configuration without ZQ calibration.
pub fn small_config() -> Config {
    let mut config = Config::default();
    config.timing = Timings {
        t_rp: 2,
        t_rcd: 2,
        t_wr: 2,
        t_wtr: 2,
        t_refi: 200,
        t_rfc: 10,
        t_faw: 8,
        t_ccd: 2,
        t_rrd: 2,
        t_rc: 8,
        t_ras: 5,
        t_zqcs: None,
    };
    config.workload.transactions = 256;
    config.workload.max_cycles = 50_000;
    config
}

/// Row banks for every unit of `config`.
pub fn row_banks(config: &Config) -> Vec<RowBank> {
    (0..config.controller.nunits())
        .map(|unit| RowBank::new(unit, config.controller.queue_depth, config.phy.write_latency()))
        .collect()
}
