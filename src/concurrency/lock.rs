//! Page-level lock management.
//!
//! Pages are locked in shared mode for reads and exclusive mode for writes.
//! Locks are held until the owning transaction completes. A request that
//! would close a cycle in the wait-for graph aborts the requester instead of
//! blocking.

use crate::error::{DbError, DbResult};
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Lock modes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock for read operations.
    Shared,
    /// Exclusive lock for write operations.
    Exclusive,
}

impl LockMode {
    /// Checks if this lock mode is compatible with another.
    pub fn is_compatible_with(&self, other: &LockMode) -> bool {
        matches!((self, other), (LockMode::Shared, LockMode::Shared))
    }

    /// Whether holding `self` already satisfies a request for `requested`.
    fn covers(&self, requested: LockMode) -> bool {
        *self == LockMode::Exclusive || requested == LockMode::Shared
    }
}

/// Granted holders of one page lock.
#[derive(Debug)]
struct LockInfo {
    mode: LockMode,
    holders: HashSet<TransactionId>,
}

/// Wait-for graph used to detect deadlocks.
#[derive(Debug, Default)]
struct DeadlockDetector {
    /// waiter -> transactions it is waiting for
    wait_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl DeadlockDetector {
    fn set_edges(&mut self, waiter: TransactionId, holders: HashSet<TransactionId>) {
        self.wait_for.insert(waiter, holders);
    }

    fn remove_transaction(&mut self, tid: TransactionId) {
        self.wait_for.remove(&tid);
    }

    /// Whether `waiter` can reach itself through the wait-for graph.
    fn would_cause_deadlock(&self, waiter: TransactionId) -> bool {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<TransactionId> = self
            .wait_for
            .get(&waiter)
            .map(|holders| holders.iter().copied().collect())
            .unwrap_or_default();

        while let Some(current) = queue.pop_front() {
            if current == waiter {
                return true;
            }
            if visited.insert(current) {
                if let Some(next) = self.wait_for.get(&current) {
                    queue.extend(next.iter().copied());
                }
            }
        }

        false
    }
}

struct LockTable<P: PageId> {
    locks: HashMap<P, LockInfo>,
    transaction_locks: HashMap<TransactionId, HashSet<P>>,
    detector: DeadlockDetector,
}

impl<P: PageId> LockTable<P> {
    /// Try to grant `mode` on `pid` to `tid`. On failure returns the
    /// transactions that block the request.
    fn try_grant(
        &mut self,
        tid: TransactionId,
        pid: P,
        mode: LockMode,
    ) -> Result<(), HashSet<TransactionId>> {
        let Some(info) = self.locks.get_mut(&pid) else {
            self.locks.insert(
                pid,
                LockInfo {
                    mode,
                    holders: HashSet::from([tid]),
                },
            );
            self.transaction_locks.entry(tid).or_default().insert(pid);
            return Ok(());
        };

        if info.holders.contains(&tid) {
            if info.mode.covers(mode) {
                return Ok(());
            }
            // Upgrade shared -> exclusive when we are the only holder
            if info.holders.len() == 1 {
                info.mode = LockMode::Exclusive;
                return Ok(());
            }
        } else if info.mode.is_compatible_with(&mode) {
            info.holders.insert(tid);
            self.transaction_locks.entry(tid).or_default().insert(pid);
            return Ok(());
        }

        Err(info.holders.iter().copied().filter(|h| *h != tid).collect())
    }

    fn release(&mut self, tid: TransactionId, pid: P) {
        if let Some(info) = self.locks.get_mut(&pid) {
            info.holders.remove(&tid);
            if info.holders.is_empty() {
                self.locks.remove(&pid);
            }
        }
        if let Some(pages) = self.transaction_locks.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.transaction_locks.remove(&tid);
            }
        }
    }
}

/// Lock manager for pages of type `P`.
pub struct LockManager<P: PageId> {
    table: Mutex<LockTable<P>>,
    released: Condvar,
    timeout: Option<Duration>,
}

impl<P: PageId> LockManager<P> {
    /// Creates a lock manager. Blocked requests give up after `timeout`;
    /// `None` waits until granted or a deadlock is detected.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            table: Mutex::new(LockTable {
                locks: HashMap::new(),
                transaction_locks: HashMap::new(),
                detector: DeadlockDetector::default(),
            }),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Acquires a lock on `pid` for `tid`, blocking while it conflicts.
    ///
    /// Fails with `TransactionAborted` on deadlock or timeout; the caller is
    /// expected to abort the transaction.
    pub fn acquire_lock(&self, tid: TransactionId, pid: P, mode: LockMode) -> DbResult<()> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut table = self.table.lock();

        loop {
            let blockers = match table.try_grant(tid, pid, mode) {
                Ok(()) => {
                    table.detector.remove_transaction(tid);
                    return Ok(());
                }
                Err(blockers) => blockers,
            };

            table.detector.set_edges(tid, blockers);
            if table.detector.would_cause_deadlock(tid) {
                table.detector.remove_transaction(tid);
                warn!("{} aborted: deadlock on {:?} ({:?})", tid, pid, mode);
                return Err(DbError::TransactionAborted {
                    tid,
                    reason: format!("deadlock acquiring {:?} lock on {:?}", mode, pid),
                });
            }

            debug!("{} waiting for {:?} lock on {:?}", tid, mode, pid);
            match deadline {
                Some(deadline) => {
                    if self.released.wait_until(&mut table, deadline).timed_out() {
                        // One last attempt before giving up
                        if table.try_grant(tid, pid, mode).is_ok() {
                            table.detector.remove_transaction(tid);
                            return Ok(());
                        }
                        table.detector.remove_transaction(tid);
                        warn!("{} aborted: timed out waiting for {:?}", tid, pid);
                        return Err(DbError::TransactionAborted {
                            tid,
                            reason: format!("timed out waiting for {:?} lock on {:?}", mode, pid),
                        });
                    }
                }
                None => self.released.wait(&mut table),
            }
        }
    }

    /// Releases one lock held by a transaction.
    pub fn release_lock(&self, tid: TransactionId, pid: P) {
        self.table.lock().release(tid, pid);
        self.released.notify_all();
    }

    /// Releases all locks held by a transaction.
    pub fn release_all_locks(&self, tid: TransactionId) {
        {
            let mut table = self.table.lock();
            let pages = table.transaction_locks.remove(&tid).unwrap_or_default();
            for pid in pages {
                table.release(tid, pid);
            }
            table.detector.remove_transaction(tid);
        }
        self.released.notify_all();
    }

    /// Gets all pages locked by a transaction.
    pub fn get_transaction_locks(&self, tid: TransactionId) -> Vec<P> {
        self.table
            .lock()
            .transaction_locks
            .get(&tid)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Checks if a transaction holds a lock on `pid` at least as strong as `mode`.
    pub fn has_lock(&self, tid: TransactionId, pid: P, mode: LockMode) -> bool {
        self.table
            .lock()
            .locks
            .get(&pid)
            .is_some_and(|info| info.holders.contains(&tid) && info.mode.covers(mode))
    }
}

impl<P: PageId> Default for LockManager<P> {
    fn default() -> Self {
        Self::new(None)
    }
}
