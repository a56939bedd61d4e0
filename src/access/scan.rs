//! Sequential scan over a heap file.

use crate::access::file::{DbFile, DbFileIterator};
use crate::access::heap::HeapFile;
use crate::access::tuple::Tuple;
use crate::error::{DbError, DbResult};
use crate::storage::buffer::{PageCache, Permissions};
use crate::storage::page::HeapPageId;
use crate::transaction::TransactionId;
use std::sync::Arc;
use std::vec;

enum ScanState {
    Closed,
    Open {
        /// Next page to fetch once `tuples` runs dry
        next_page: u32,
        /// Page count observed when the scan was opened
        num_pages: u32,
        tuples: vec::IntoIter<Tuple>,
    },
}

/// Yields every resident row of a heap file, page by page in ascending
/// order and by slot within a page.
///
/// Pages are fetched read-only through the page cache, so the transaction
/// accumulates shared locks on everything it has scanned.
pub struct HeapFileIterator {
    file: HeapFile,
    cache: Arc<dyn PageCache>,
    tid: TransactionId,
    state: ScanState,
}

impl HeapFileIterator {
    pub fn new(file: HeapFile, cache: Arc<dyn PageCache>, tid: TransactionId) -> Self {
        Self {
            file,
            cache,
            tid,
            state: ScanState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ScanState::Open { .. })
    }

    fn load_page(&self, page_number: u32) -> DbResult<vec::IntoIter<Tuple>> {
        let pid = HeapPageId::new(self.file.id(), page_number);
        let handle = self.cache.fetch_page(self.tid, pid, Permissions::ReadOnly)?;
        let page = handle.read();
        Ok(page.tuples().cloned().collect::<Vec<_>>().into_iter())
    }

    fn start(&self) -> DbResult<ScanState> {
        let num_pages = self.file.num_pages()?;
        let tuples = if num_pages > 0 {
            self.load_page(0)?
        } else {
            Vec::new().into_iter()
        };

        Ok(ScanState::Open {
            next_page: 1,
            num_pages,
            tuples,
        })
    }
}

impl DbFileIterator for HeapFileIterator {
    fn open(&mut self) -> DbResult<()> {
        match self.start() {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    fn has_next(&mut self) -> DbResult<bool> {
        loop {
            let page_number = match &mut self.state {
                ScanState::Closed => return Ok(false),
                ScanState::Open { tuples, .. } if !tuples.as_slice().is_empty() => {
                    return Ok(true)
                }
                ScanState::Open {
                    next_page,
                    num_pages,
                    ..
                } => {
                    if *next_page >= *num_pages {
                        return Ok(false);
                    }
                    *next_page += 1;
                    *next_page - 1
                }
            };

            match self.load_page(page_number) {
                Ok(loaded) => {
                    if let ScanState::Open { tuples, .. } = &mut self.state {
                        *tuples = loaded;
                    }
                }
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            }
        }
    }

    fn next(&mut self) -> DbResult<Tuple> {
        if !self.has_next()? {
            return Err(DbError::not_found("no more tuples"));
        }

        match &mut self.state {
            ScanState::Open { tuples, .. } => tuples
                .next()
                .ok_or_else(|| DbError::not_found("no more tuples")),
            ScanState::Closed => Err(DbError::not_found("iterator is closed")),
        }
    }

    fn close(&mut self) {
        self.state = ScanState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::schema::Schema;
    use crate::access::value::{Field, Type};
    use crate::catalog::Catalog;
    use crate::config::BufferPoolConfig;
    use crate::storage::buffer::{BufferPool, PageHandle};
    use crate::storage::page::HeapPage;
    use anyhow::Result;
    use parking_lot::Mutex;
    use std::io;
    use std::path::Path;
    use tempfile::tempdir;

    type Failure = fn(TransactionId) -> DbError;

    fn aborted(tid: TransactionId) -> DbError {
        DbError::TransactionAborted {
            tid,
            reason: "injected".to_string(),
        }
    }

    fn short_read(_: TransactionId) -> DbError {
        DbError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "short read"))
    }

    /// Records every fetch before delegating to a real pool
    struct RecordingCache {
        pool: BufferPool,
        fetched: Mutex<Vec<u32>>,
        fail_on: Option<(u32, Failure)>,
    }

    impl PageCache for RecordingCache {
        fn fetch_page(
            &self,
            tid: TransactionId,
            pid: HeapPageId,
            perm: Permissions,
        ) -> DbResult<PageHandle> {
            use crate::storage::page::PageId;
            self.fetched.lock().push(pid.page_number());
            if let Some((page_number, failure)) = self.fail_on {
                if page_number == pid.page_number() {
                    return Err(failure(tid));
                }
            }
            self.pool.fetch_page(tid, pid, perm)
        }

        fn release_page(&self, tid: TransactionId, pid: HeapPageId) {
            self.pool.release_page(tid, pid)
        }

        fn holds_lock(&self, tid: TransactionId, pid: HeapPageId) -> bool {
            self.pool.holds_lock(tid, pid)
        }
    }

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::with_names(&[Type::Int], &["id"]).unwrap())
    }

    /// Write one page per entry of `pages`, each holding the given ids
    fn build_file(dir: &Path, pages: &[&[i32]]) -> Result<(BufferPool, HeapFile)> {
        let catalog = Arc::new(Catalog::new());
        let id = catalog.add_table(&dir.join("scan.dat"), "scan", (*schema()).clone())?;
        let file = catalog.file(id)?;

        for (n, ids) in pages.iter().enumerate() {
            let mut page = HeapPage::empty(HeapPageId::new(id, n as u32), schema());
            for v in ids.iter() {
                page.insert_tuple(Tuple::from_fields(schema(), vec![Field::Int(*v)])?)?;
            }
            file.write_page(&page)?;
        }

        Ok((BufferPool::new(catalog, BufferPoolConfig::default()), file))
    }

    fn recording(pool: BufferPool, fail_on: Option<(u32, Failure)>) -> Arc<RecordingCache> {
        Arc::new(RecordingCache {
            pool,
            fetched: Mutex::new(Vec::new()),
            fail_on,
        })
    }

    fn drain(iter: &mut HeapFileIterator) -> Result<Vec<i32>> {
        let mut out = Vec::new();
        while iter.has_next()? {
            match iter.next()?.field(0)? {
                Some(Field::Int(v)) => out.push(*v),
                other => anyhow::bail!("unexpected field {:?}", other),
            }
        }
        Ok(out)
    }

    #[test]
    fn test_closed_iterator() -> Result<()> {
        let dir = tempdir()?;
        let (pool, file) = build_file(dir.path(), &[&[1]])?;
        let mut iter = file.iterator(Arc::new(pool), TransactionId::new(1));

        assert!(!iter.is_open());
        assert!(!iter.has_next()?);
        assert!(matches!(iter.next(), Err(DbError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_scan_order_skips_empty_pages() -> Result<()> {
        let dir = tempdir()?;
        let (pool, file) = build_file(dir.path(), &[&[1, 2], &[], &[3], &[]])?;
        let cache = recording(pool, None);
        let mut iter = file.iterator(cache.clone(), TransactionId::new(1));

        iter.open()?;
        assert_eq!(drain(&mut iter)?, vec![1, 2, 3]);
        assert!(matches!(iter.next(), Err(DbError::NotFound(_))));

        // Every page was fetched exactly once, in order
        assert_eq!(*cache.fetched.lock(), vec![0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_rewind_reproduces_sequence() -> Result<()> {
        let dir = tempdir()?;
        let (pool, file) = build_file(dir.path(), &[&[5, 6], &[7]])?;
        let mut iter = file.iterator(Arc::new(pool), TransactionId::new(1));

        iter.open()?;
        let first = drain(&mut iter)?;
        iter.rewind()?;
        assert_eq!(drain(&mut iter)?, first);
        assert_eq!(first, vec![5, 6, 7]);
        Ok(())
    }

    #[test]
    fn test_close_mid_scan() -> Result<()> {
        let dir = tempdir()?;
        let (pool, file) = build_file(dir.path(), &[&[1, 2, 3]])?;
        let mut iter = file.iterator(Arc::new(pool), TransactionId::new(1));

        iter.open()?;
        iter.next()?;
        iter.close();
        assert!(!iter.has_next()?);
        assert!(matches!(iter.next(), Err(DbError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_empty_file() -> Result<()> {
        let dir = tempdir()?;
        let (pool, file) = build_file(dir.path(), &[])?;
        let cache = recording(pool, None);
        let mut iter = file.iterator(cache.clone(), TransactionId::new(1));

        iter.open()?;
        assert!(iter.is_open());
        assert!(!iter.has_next()?);
        assert!(cache.fetched.lock().is_empty());
        Ok(())
    }

    #[test]
    fn test_fetch_error_closes_iterator() -> Result<()> {
        let dir = tempdir()?;
        let (pool, file) = build_file(dir.path(), &[&[1], &[2]])?;
        let cache = recording(pool, Some((1, aborted as Failure)));
        let mut iter = file.iterator(cache, TransactionId::new(1));

        iter.open()?;
        assert_eq!(iter.next()?.to_string(), "1\n");
        let err = iter.has_next().unwrap_err();
        assert!(err.is_abort());
        assert!(!iter.is_open());
        assert!(!iter.has_next()?);
        Ok(())
    }

    #[test]
    fn test_io_error_reaches_caller() -> Result<()> {
        let dir = tempdir()?;
        let (pool, file) = build_file(dir.path(), &[&[1], &[2], &[3]])?;
        let cache = recording(pool, Some((2, short_read as Failure)));
        let mut iter = file.iterator(cache, TransactionId::new(1));

        iter.open()?;
        assert_eq!(iter.next()?.to_string(), "1\n");
        assert_eq!(iter.next()?.to_string(), "2\n");
        let result = iter.has_next();
        assert!(matches!(result, Err(DbError::Io(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof));
        assert!(!iter.is_open());
        Ok(())
    }

    #[test]
    fn test_io_error_on_open_leaves_iterator_closed() -> Result<()> {
        let dir = tempdir()?;
        let (pool, file) = build_file(dir.path(), &[&[1]])?;
        let cache = recording(pool, Some((0, short_read as Failure)));
        let mut iter = file.iterator(cache, TransactionId::new(1));

        assert!(matches!(iter.open(), Err(DbError::Io(_))));
        assert!(!iter.is_open());
        assert!(!iter.has_next()?);
        Ok(())
    }

    #[test]
    fn test_truncated_file_fails_the_scan() -> Result<()> {
        let dir = tempdir()?;
        let (pool, file) = build_file(dir.path(), &[&[1], &[2]])?;
        let mut iter = file.iterator(Arc::new(pool), TransactionId::new(1));

        iter.open()?;
        std::fs::OpenOptions::new()
            .write(true)
            .open(file.path())?
            .set_len(0)?;

        assert_eq!(iter.next()?.to_string(), "1\n");
        assert!(matches!(iter.has_next(), Err(DbError::NotFound(_))));
        assert!(!iter.is_open());
        Ok(())
    }

    #[test]
    fn test_scan_takes_shared_locks() -> Result<()> {
        let dir = tempdir()?;
        let (pool, file) = build_file(dir.path(), &[&[1], &[2]])?;
        let tid = TransactionId::new(1);
        let mut iter = file.iterator(Arc::new(pool.clone()), tid);

        iter.open()?;
        drain(&mut iter)?;
        iter.close();

        // Closing does not release locks; completing the transaction does
        assert_eq!(pool.locked_pages(tid).len(), 2);
        pool.transaction_complete(tid, true)?;
        assert!(pool.locked_pages(tid).is_empty());
        Ok(())
    }
}
