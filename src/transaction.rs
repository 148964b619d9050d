//! Nested transaction bookkeeping and write-forcing flags for one engine session.
//!
//! The state never talks to a backend. The engine asks it what a call means physically, performs
//! the physical operation, and only then records the transition, so a failed `BEGIN`/`COMMIT`/
//! `ROLLBACK` leaves the depth untouched.

use tracing::trace;

use crate::types::ConnectionRole;

/// What a transaction-control call requires of the write connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStep {
    /// Nothing to do (commit/rollback outside a transaction).
    Noop,
    /// Depth already adjusted; no physical operation.
    Nested,
    /// The outermost boundary: run the physical operation, then confirm it.
    Physical,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionState {
    depth: u32,
    force_write_transaction: bool,
    force_write_next: bool,
    force_write_always: bool,
}

impl TransactionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unmatched `begin` calls.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    /// Plan a `begin`. Nested begins are recorded immediately.
    pub fn begin(&mut self) -> TransactionStep {
        if self.depth > 0 {
            self.depth += 1;
            trace!(depth = self.depth, "nested begin");
            TransactionStep::Nested
        } else {
            TransactionStep::Physical
        }
    }

    /// Record a successful physical `BEGIN`.
    pub fn opened(&mut self, force_write: bool) {
        self.depth = 1;
        self.force_write_transaction = force_write;
        trace!(force_write, "transaction opened");
    }

    /// Plan a `commit` or `rollback`. Inner ends are recorded immediately.
    pub fn end(&mut self) -> TransactionStep {
        match self.depth {
            0 => TransactionStep::Noop,
            1 => TransactionStep::Physical,
            _ => {
                self.depth -= 1;
                trace!(depth = self.depth, "nested end");
                TransactionStep::Nested
            }
        }
    }

    /// Record a successful physical `COMMIT` or `ROLLBACK`.
    pub fn closed(&mut self) {
        self.depth = 0;
        self.force_write_transaction = false;
        trace!("transaction closed");
    }

    /// Force the next statement (or every statement, with `always`) onto the write connection.
    ///
    /// `force_write(false)` also turns a previous `always` off after its one use.
    pub fn force_write(&mut self, always: bool) {
        self.force_write_next = true;
        self.force_write_always = always;
    }

    /// Apply the force-write flags to a classified role, consuming a one-shot flag.
    pub fn route(&mut self, classified: ConnectionRole) -> ConnectionRole {
        let forced =
            self.force_write_next || self.force_write_always || self.force_write_transaction;
        if !forced {
            return classified;
        }
        if !self.force_write_always {
            self.force_write_next = false;
        }
        ConnectionRole::Write
    }

    /// Drop all nesting and flags, e.g. after the connections were torn down.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
