//! Reference Bank Machine.
//!
//! `RowBank` serves a FIFO of transactions against one DRAM bank with an
//! open-row policy:
//!
//! * **Row Hit:** The front transaction targets the open row; a read or write is
//!   requested once tRCD has elapsed since the activate.
//! * **Row Miss (Open):** A different row is open; a precharge is requested once
//!   tRAS and the write-to-precharge window have elapsed.
//! * **Row Miss (Closed):** No row is open; an activate is requested once tRP and
//!   tRC allow it.
//!
//! When the refresher raises its request the bank stops presenting commands and
//! grants the refresh as soon as its open row could be precharged. The refresh
//! sequence starts with a precharge-all, so the row is considered closed once the
//! request drops.

use std::collections::VecDeque;

use crate::common::data::Transaction;
use crate::core::guard::DelayGuard;
use crate::core::registers::Timings;
use crate::soc::traits::{BankRequest, BankUnit};

/// Open-row bank machine with a bounded transaction queue.
#[derive(Clone, Debug)]
pub struct RowBank {
    unit: usize,
    queue: VecDeque<Transaction>,
    capacity: usize,
    open_row: Option<u32>,
    refresh_pending: bool,
    /// Controller cycles from a write command to its data on the bus.
    write_latency: u32,
    trcd: DelayGuard,
    tras: DelayGuard,
    trc: DelayGuard,
    trp: DelayGuard,
    twtp: DelayGuard,
    completed: u64,
}

impl RowBank {
    /// Creates an idle bank with all rows closed.
    ///
    /// # Arguments
    ///
    /// * `unit` - Bank unit index on the channel (rank-major).
    /// * `capacity` - Maximum queued transactions.
    /// * `write_latency` - Write latency in controller cycles.
    pub fn new(unit: usize, capacity: usize, write_latency: u32) -> Self {
        Self {
            unit,
            queue: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            open_row: None,
            refresh_pending: false,
            write_latency,
            trcd: DelayGuard::new(),
            tras: DelayGuard::new(),
            trc: DelayGuard::new(),
            trp: DelayGuard::new(),
            twtp: DelayGuard::new(),
            completed: 0,
        }
    }

    /// Queues a transaction.
    ///
    /// Returns the transaction back when the queue is full.
    pub fn push(&mut self, txn: Transaction) -> Result<(), Transaction> {
        if self.queue.len() >= self.capacity {
            return Err(txn);
        }
        self.queue.push_back(txn);
        Ok(())
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn open_row(&self) -> Option<u32> {
        self.open_row
    }

    /// Transactions whose column command has been issued.
    pub fn completed(&self) -> u64 {
        self.completed
    }
}

impl BankUnit for RowBank {
    fn request(&self) -> BankRequest {
        if self.refresh_pending {
            return BankRequest::idle(self.unit);
        }
        let Some(txn) = self.queue.front() else {
            return BankRequest::idle(self.unit);
        };
        match self.open_row {
            Some(row) if row == txn.row => {
                if !self.trcd.ready() {
                    BankRequest::idle(self.unit)
                } else if txn.is_write() {
                    BankRequest::write(self.unit, txn.col)
                } else {
                    BankRequest::read(self.unit, txn.col)
                }
            }
            Some(_) => {
                if self.tras.ready() && self.twtp.ready() {
                    BankRequest::precharge(self.unit)
                } else {
                    BankRequest::idle(self.unit)
                }
            }
            None => {
                if self.trp.ready() && self.trc.ready() {
                    BankRequest::activate(self.unit, txn.row)
                } else {
                    BankRequest::idle(self.unit)
                }
            }
        }
    }

    fn refresh_gnt(&self) -> bool {
        self.refresh_pending && self.tras.ready() && self.twtp.ready()
    }

    fn tick(&mut self, ready: bool, refresh_req: bool, timings: &Timings) {
        let req = self.request();
        let accepted = ready && req.valid;
        let activate = accepted && req.is_activate();
        let precharge = accepted && req.is_precharge();
        let write = accepted && req.is_write;

        if activate {
            self.open_row = Some(req.address);
        }
        if precharge {
            self.open_row = None;
        }
        if accepted && (req.is_read || req.is_write) {
            self.queue.pop_front();
            self.completed += 1;
        }

        if refresh_req {
            self.refresh_pending = true;
        } else if self.refresh_pending {
            self.refresh_pending = false;
            self.open_row = None;
        }

        self.trcd.tick(activate, timings.t_rcd);
        self.tras.tick(activate, timings.t_ras);
        self.trc.tick(activate, timings.t_rc);
        self.trp.tick(precharge, timings.t_rp);
        self.twtp
            .tick(write, self.write_latency + timings.t_wr + timings.t_ccd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_miss_sequence() {
        let timings = Timings::default();
        let mut bank = RowBank::new(0, 4, 2);
        bank.push(Transaction::read(0, 5, 8)).unwrap();

        let req = bank.request();
        assert!(req.is_activate());
        assert_eq!(req.address, 5);
        bank.tick(true, false, &timings);
        assert_eq!(bank.open_row(), Some(5));

        // tRCD = 3: the read appears three cycles after the activate.
        assert!(!bank.request().valid);
        bank.tick(false, false, &timings);
        assert!(!bank.request().valid);
        bank.tick(false, false, &timings);
        let req = bank.request();
        assert!(req.is_read);
        assert_eq!(req.address, 8);
        bank.tick(true, false, &timings);
        assert!(bank.is_idle());
        assert_eq!(bank.completed(), 1);
    }

    #[test]
    fn test_refresh_request_masks_and_closes_row() {
        let timings = Timings::default();
        let mut bank = RowBank::new(0, 4, 2);
        bank.push(Transaction::read(0, 1, 0)).unwrap();
        bank.tick(true, false, &timings);
        assert_eq!(bank.open_row(), Some(1));

        bank.tick(false, true, &timings);
        assert!(!bank.request().valid);
        assert!(!bank.refresh_gnt());
        for _ in 0..timings.t_ras {
            bank.tick(false, true, &timings);
        }
        assert!(bank.refresh_gnt());

        bank.tick(false, false, &timings);
        assert_eq!(bank.open_row(), None);
        assert!(bank.request().is_activate());
    }
}
