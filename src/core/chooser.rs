//! Round-robin command chooser.
//!
//! Each chooser looks at every bank request and picks one that matches what the
//! scheduler currently wants. A request is eligible when it is valid and either
//!
//! * it is a row command, row commands are wanted, and it is not an activate
//!   unless activates are wanted, or
//! * its read and write flags equal the wanted read and write flags.
//!
//! The search starts at the bank after the last accepted one, so every bank with
//! an eligible request is served within one rotation.

use crate::soc::traits::BankRequest;

/// Request classes the scheduler accepts this cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Wants {
    pub reads: bool,
    pub writes: bool,
    pub cmds: bool,
    pub activates: bool,
}

impl Wants {
    pub fn eligible(&self, req: &BankRequest) -> bool {
        if !req.valid {
            return false;
        }
        let command = req.is_cmd && self.cmds && (!req.is_activate() || self.activates);
        let access = req.is_read == self.reads && req.is_write == self.writes;
        command || access
    }
}

/// Round-robin arbiter over bank requests.
#[derive(Clone, Debug)]
pub struct CommandChooser {
    next: usize,
    n: usize,
}

impl CommandChooser {
    pub fn new(n: usize) -> Self {
        Self { next: 0, n }
    }

    /// Picks the first eligible request in round-robin order.
    ///
    /// # Returns
    ///
    /// The index of the chosen request, or `None` if nothing is eligible.
    pub fn choose(&self, requests: &[BankRequest], wants: &Wants) -> Option<usize> {
        (0..self.n)
            .map(|offset| (self.next + offset) % self.n)
            .find(|&i| requests.get(i).is_some_and(|req| wants.eligible(req)))
    }

    /// Moves priority past an accepted request.
    pub fn accept(&mut self, index: usize) {
        self.next = (index + 1) % self.n;
    }
}
