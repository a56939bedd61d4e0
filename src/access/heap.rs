use crate::access::file::DbFile;
use crate::access::scan::HeapFileIterator;
use crate::access::schema::Schema;
use crate::access::tuple::Tuple;
use crate::catalog::TableId;
use crate::error::{DbError, DbResult};
use crate::storage::buffer::{PageCache, PageHandle, Permissions};
use crate::storage::disk::{PageManager, PAGE_SIZE};
use crate::storage::page::{HeapPage, HeapPageId, Page, PageId};
use crate::transaction::TransactionId;
use log::debug;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A table stored as an unordered sequence of fixed-slot pages.
///
/// Cloning is cheap; clones share the same file handle.
#[derive(Clone)]
pub struct HeapFile {
    inner: Arc<HeapFileInner>,
}

struct HeapFileInner {
    page_manager: Mutex<PageManager>,
    path: PathBuf,
    schema: Arc<Schema>,
    id: TableId,
}

impl HeapFile {
    /// Open the heap file at `path`, creating it empty if it does not exist.
    pub fn open(path: &Path, schema: Arc<Schema>, id: TableId) -> DbResult<Self> {
        schema.check_fits_page()?;
        let page_manager = PageManager::open_or_create(path)?;
        Ok(Self {
            inner: Arc::new(HeapFileInner {
                page_manager: Mutex::new(page_manager),
                path: path.to_path_buf(),
                schema,
                id,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn check_owner(&self, pid: HeapPageId) -> DbResult<()> {
        if pid.table_id() != self.inner.id {
            return Err(DbError::not_found(format!(
                "{:?} does not belong to table {}",
                pid, self.inner.id
            )));
        }
        Ok(())
    }

    /// Append an empty page to the file
    fn append_page(&self) -> DbResult<HeapPageId> {
        let page_number = self.inner.page_manager.lock().allocate_page()?;
        debug!(
            "Appended page {} to {}",
            page_number,
            self.inner.path.display()
        );
        Ok(HeapPageId::new(self.inner.id, page_number))
    }
}

impl DbFile for HeapFile {
    type Iter = HeapFileIterator;

    fn id(&self) -> TableId {
        self.inner.id
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    fn num_pages(&self) -> DbResult<u32> {
        self.inner.page_manager.lock().num_pages()
    }

    fn read_page(&self, pid: HeapPageId) -> DbResult<HeapPage> {
        self.check_owner(pid)?;

        let mut buf = vec![0u8; PAGE_SIZE];
        self.inner
            .page_manager
            .lock()
            .read_page(pid.page_number(), &mut buf)?;
        HeapPage::from_bytes(pid, Arc::clone(&self.inner.schema), &buf)
    }

    fn write_page(&self, page: &HeapPage) -> DbResult<()> {
        let pid = page.id();
        self.check_owner(pid)?;

        let data = page.page_data()?;
        self.inner
            .page_manager
            .lock()
            .write_page(pid.page_number(), &data)
    }

    fn insert_tuple(
        &self,
        cache: &dyn PageCache,
        tid: TransactionId,
        tuple: Tuple,
    ) -> DbResult<Vec<PageHandle>> {
        if **tuple.schema() != *self.inner.schema {
            return Err(DbError::SchemaMismatch(format!(
                "tuple schema ({}) does not match table {} ({})",
                tuple.schema(),
                self.inner.id,
                self.inner.schema
            )));
        }
        if tuple.fields().any(|f| f.is_none()) {
            return Err(DbError::SchemaMismatch(
                "cannot insert a tuple with unset fields".to_string(),
            ));
        }

        for page_number in 0..self.num_pages()? {
            let pid = HeapPageId::new(self.inner.id, page_number);
            let already_locked = cache.holds_lock(tid, pid);

            let has_room = {
                let handle = cache.fetch_page(tid, pid, Permissions::ReadOnly)?;
                let page = handle.read();
                page.num_empty_slots() > 0
            };
            if !has_room {
                // Only give back locks this search took
                if !already_locked {
                    cache.release_page(tid, pid);
                }
                continue;
            }

            let handle = cache.fetch_page(tid, pid, Permissions::ReadWrite)?;
            handle.write().insert_tuple(tuple)?;
            return Ok(vec![handle]);
        }

        let pid = self.append_page()?;
        let handle = cache.fetch_page(tid, pid, Permissions::ReadWrite)?;
        handle.write().insert_tuple(tuple)?;
        Ok(vec![handle])
    }

    fn delete_tuple(
        &self,
        cache: &dyn PageCache,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> DbResult<Vec<PageHandle>> {
        let record_id = tuple
            .record_id()
            .ok_or_else(|| DbError::not_found("tuple has no record id"))?;
        self.check_owner(record_id.page_id)?;

        let handle = cache.fetch_page(tid, record_id.page_id, Permissions::ReadWrite)?;
        handle.write().delete_tuple(tuple)?;
        Ok(vec![handle])
    }

    fn iterator(&self, cache: Arc<dyn PageCache>, tid: TransactionId) -> HeapFileIterator {
        HeapFileIterator::new(self.clone(), cache, tid)
    }
}
