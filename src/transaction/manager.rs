//! Transaction lifecycle bookkeeping.

use super::id::TransactionId;
use super::state::TransactionState;
use crate::error::{DbError, DbResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out transaction ids and tracks whether each is still active.
pub struct TransactionManager {
    next_id: AtomicU64,
    transactions: Mutex<HashMap<TransactionId, TransactionState>>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            transactions: Mutex::new(HashMap::new()),
        }
    }

    /// Begins a new transaction.
    pub fn begin(&self) -> TransactionId {
        let tid = TransactionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.transactions.lock().insert(tid, TransactionState::Active);
        tid
    }

    pub fn state(&self, tid: TransactionId) -> DbResult<TransactionState> {
        self.transactions
            .lock()
            .get(&tid)
            .copied()
            .ok_or_else(|| DbError::not_found(format!("transaction {}", tid)))
    }

    /// Fails with `NotFound` unless `tid` is active.
    pub fn ensure_active(&self, tid: TransactionId) -> DbResult<()> {
        match self.state(tid)? {
            TransactionState::Active => Ok(()),
            state => Err(DbError::not_found(format!(
                "active transaction {} (it is {})",
                tid, state
            ))),
        }
    }

    /// Record the outcome of an active transaction.
    pub fn finish(&self, tid: TransactionId, commit: bool) -> DbResult<()> {
        self.ensure_active(tid)?;
        let state = if commit {
            TransactionState::Committed
        } else {
            TransactionState::Aborted
        };
        self.transactions.lock().insert(tid, state);
        Ok(())
    }

    /// Returns the active transactions, ascending.
    pub fn active_transactions(&self) -> Vec<TransactionId> {
        let mut active: Vec<_> = self
            .transactions
            .lock()
            .iter()
            .filter(|(_, state)| state.is_active())
            .map(|(tid, _)| *tid)
            .collect();
        active.sort();
        active
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
