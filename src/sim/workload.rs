//! Synthetic transaction streams.
//!
//! Addresses are split column-first, then bank unit, then row, so a sequential
//! stream walks all columns of a row before moving to the next bank. The random
//! pattern reuses the previous bank and row with probability `locality`.

use rand::prelude::*;
use rand::rngs::SmallRng;

use crate::common::data::Transaction;
use crate::config::{Pattern, WorkloadConfig};

/// Seeded transaction generator.
pub struct Workload {
    rng: SmallRng,
    pattern: Pattern,
    remaining: usize,
    read_ratio: f64,
    locality: f64,
    nunits: u64,
    nrows: u64,
    ncols: u64,
    next_addr: u64,
    last: Option<(usize, u32)>,
}

impl Workload {
    /// Creates a generator.
    ///
    /// # Arguments
    ///
    /// * `config` - Workload parameters.
    /// * `nunits` - Bank units on the channel.
    pub fn new(config: &WorkloadConfig, nunits: usize) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(config.seed),
            pattern: config.pattern,
            remaining: config.transactions,
            read_ratio: config.read_ratio,
            locality: config.locality,
            nunits: nunits.max(1) as u64,
            nrows: 1u64 << config.row_bits,
            ncols: 1u64 << config.col_bits,
            next_addr: 0,
            last: None,
        }
    }

    fn split(&self, addr: u64) -> (usize, u32, u32) {
        let col = addr % self.ncols;
        let unit = (addr / self.ncols) % self.nunits;
        let row = (addr / self.ncols / self.nunits) % self.nrows;
        (unit as usize, row as u32, col as u32)
    }
}

impl Iterator for Workload {
    type Item = Transaction;

    fn next(&mut self) -> Option<Transaction> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let is_read = self.rng.random_bool(self.read_ratio);
        let (unit, row, col) = match self.pattern {
            Pattern::Sequential => {
                let addr = self.next_addr;
                self.next_addr += 1;
                self.split(addr)
            }
            Pattern::Random => {
                let col = self.rng.random_range(0..self.ncols) as u32;
                match self.last {
                    Some((unit, row)) if self.rng.random_bool(self.locality) => (unit, row, col),
                    _ => {
                        let unit = self.rng.random_range(0..self.nunits) as usize;
                        let row = self.rng.random_range(0..self.nrows) as u32;
                        (unit, row, col)
                    }
                }
            }
        };
        self.last = Some((unit, row));

        Some(if is_read {
            Transaction::read(unit, row, col)
        } else {
            Transaction::write(unit, row, col)
        })
    }
}
