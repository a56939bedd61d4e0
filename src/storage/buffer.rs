pub mod lru;
pub mod replacer;

use crate::access::file::DbFile;
use crate::access::tuple::Tuple;
use crate::catalog::{Catalog, TableId};
use crate::concurrency::{LockManager, LockMode};
use crate::config::BufferPoolConfig;
use crate::error::{DbError, DbResult};
use crate::storage::page::{HeapPage, HeapPageId, Page, PageId};
use crate::transaction::TransactionId;
use dashmap::DashMap;
use log::{debug, info};
use lru::LruReplacer;
use parking_lot::{Mutex, RwLock};
use replacer::Replacer;
use std::sync::Arc;

/// Shared handle to a resident page
pub type PageHandle = Arc<RwLock<HeapPage>>;

/// Access mode requested when fetching a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

impl Permissions {
    fn lock_mode(self) -> LockMode {
        match self {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        }
    }
}

/// Page access on behalf of a transaction.
///
/// Heap files and scans only see this trait, never the concrete pool.
pub trait PageCache: Send + Sync {
    /// Lock `pid` for `tid` in the mode implied by `perm` and return the page.
    /// Blocks while the lock conflicts; fails with `TransactionAborted` on
    /// deadlock or lock timeout.
    fn fetch_page(&self, tid: TransactionId, pid: HeapPageId, perm: Permissions)
        -> DbResult<PageHandle>;

    /// Release `tid`'s lock on `pid` before the transaction completes.
    fn release_page(&self, tid: TransactionId, pid: HeapPageId);

    fn holds_lock(&self, tid: TransactionId, pid: HeapPageId) -> bool;
}

#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    page_table: DashMap<HeapPageId, PageHandle>,
    replacer: Mutex<Box<dyn Replacer<HeapPageId>>>,
    lock_manager: LockManager<HeapPageId>,
    catalog: Arc<Catalog>,
    max_pages: usize,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, config: BufferPoolConfig) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                page_table: DashMap::with_capacity(config.max_pages),
                replacer: Mutex::new(Box::new(LruReplacer::new(config.max_pages))),
                lock_manager: LockManager::new(config.lock_timeout),
                catalog,
                max_pages: config.max_pages,
            }),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    pub fn num_cached_pages(&self) -> usize {
        self.inner.page_table.len()
    }

    pub fn is_cached(&self, pid: HeapPageId) -> bool {
        self.inner.page_table.contains_key(&pid)
    }

    /// Insert `tuple` into table `table_id` on behalf of `tid`.
    /// Every page the heap file touched is marked dirty by `tid`.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: TableId, tuple: Tuple) -> DbResult<()> {
        let file = self.inner.catalog.file(table_id)?;
        let pages = file.insert_tuple(self, tid, tuple)?;
        for page in pages {
            page.write().mark_dirty(true, tid);
        }
        Ok(())
    }

    /// Remove `tuple` from the table its record id points into.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> DbResult<()> {
        let record_id = tuple
            .record_id()
            .ok_or_else(|| DbError::not_found("tuple has no record id"))?;
        let file = self.inner.catalog.file(record_id.page_id.table_id())?;
        let pages = file.delete_tuple(self, tid, tuple)?;
        for page in pages {
            page.write().mark_dirty(true, tid);
        }
        Ok(())
    }

    /// Write `pid` back to its file if it is dirty. Non-resident pages are
    /// ignored.
    pub fn flush_page(&self, pid: HeapPageId) -> DbResult<()> {
        let Some(handle) = self.inner.page_table.get(&pid).map(|e| e.value().clone()) else {
            return Ok(());
        };

        let mut page = handle.write();
        if let Some(dirtier) = page.dirtied_by() {
            let file = self.inner.catalog.file(pid.table_id())?;
            file.write_page(&page)?;
            page.mark_dirty(false, dirtier);
            debug!("Flushed {:?} dirtied by {}", pid, dirtier);
        }
        Ok(())
    }

    pub fn flush_all_pages(&self) -> DbResult<()> {
        for pid in self.resident_pages() {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Flush every page dirtied by `tid`.
    pub fn flush_pages(&self, tid: TransactionId) -> DbResult<()> {
        for pid in self.pages_dirtied_by(tid) {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Drop `pid` from the cache without writing it back.
    pub fn discard_page(&self, pid: HeapPageId) {
        self.inner.page_table.remove(&pid);
        self.inner.replacer.lock().remove(&pid);
    }

    /// Finish `tid`: on commit its dirty pages are written, on abort they are
    /// discarded so the next fetch re-reads the on-disk image. All of its
    /// page locks are released either way.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> DbResult<()> {
        let result = if commit {
            self.flush_pages(tid)
        } else {
            for pid in self.pages_dirtied_by(tid) {
                self.discard_page(pid);
            }
            Ok(())
        };

        self.inner.lock_manager.release_all_locks(tid);
        info!(
            "{} {}",
            tid,
            if commit { "committed" } else { "aborted" }
        );
        result
    }

    /// Pages currently locked by `tid`
    pub fn locked_pages(&self, tid: TransactionId) -> Vec<HeapPageId> {
        self.inner.lock_manager.get_transaction_locks(tid)
    }

    fn resident_pages(&self) -> Vec<HeapPageId> {
        self.inner.page_table.iter().map(|e| *e.key()).collect()
    }

    fn pages_dirtied_by(&self, tid: TransactionId) -> Vec<HeapPageId> {
        self.inner
            .page_table
            .iter()
            .filter(|e| e.value().read().dirtied_by() == Some(tid))
            .map(|e| *e.key())
            .collect()
    }

    /// Make room for one more page by dropping the least recently used page
    /// that is clean and not referenced outside the cache.
    fn evict_page(&self) -> DbResult<()> {
        let page_table = &self.inner.page_table;
        let evictable = |pid: &HeapPageId| {
            page_table
                .get(pid)
                .is_some_and(|entry| is_evictable(entry.value()))
        };

        let mut replacer = self.inner.replacer.lock();
        let victim = replacer.evict(&evictable).ok_or(DbError::BufferPoolFull)?;

        // The page may have been picked up between the check and now
        if page_table
            .remove_if(&victim, |_, handle| is_evictable(handle))
            .is_none()
        {
            replacer.record_access(victim);
            return Err(DbError::BufferPoolFull);
        }
        debug!("Evicted {:?}", victim);
        Ok(())
    }

    fn load_page(&self, pid: HeapPageId) -> DbResult<PageHandle> {
        if self.inner.page_table.len() >= self.inner.max_pages {
            self.evict_page()?;
        }

        let file = self.inner.catalog.file(pid.table_id())?;
        let page = file.read_page(pid)?;
        debug!("Loaded {:?} from {}", pid, file.path().display());

        // Another thread may have loaded the same page meanwhile; keep theirs.
        let handle = self
            .inner
            .page_table
            .entry(pid)
            .or_insert_with(|| Arc::new(RwLock::new(page)))
            .value()
            .clone();
        Ok(handle)
    }
}

fn is_evictable(handle: &PageHandle) -> bool {
    Arc::strong_count(handle) == 1
        && handle
            .try_read()
            .is_some_and(|page| page.dirtied_by().is_none())
}

impl PageCache for BufferPool {
    fn fetch_page(
        &self,
        tid: TransactionId,
        pid: HeapPageId,
        perm: Permissions,
    ) -> DbResult<PageHandle> {
        self.inner
            .lock_manager
            .acquire_lock(tid, pid, perm.lock_mode())?;

        let cached = self.inner.page_table.get(&pid).map(|e| e.value().clone());
        let handle = match cached {
            Some(handle) => handle,
            None => self.load_page(pid)?,
        };

        self.inner.replacer.lock().record_access(pid);
        Ok(handle)
    }

    fn release_page(&self, tid: TransactionId, pid: HeapPageId) {
        self.inner.lock_manager.release_lock(tid, pid);
    }

    fn holds_lock(&self, tid: TransactionId, pid: HeapPageId) -> bool {
        self.inner
            .lock_manager
            .has_lock(tid, pid, LockMode::Shared)
    }
}
