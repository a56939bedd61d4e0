//! Table storage abstractions.

use crate::access::schema::Schema;
use crate::access::tuple::Tuple;
use crate::catalog::TableId;
use crate::error::DbResult;
use crate::storage::buffer::{PageCache, PageHandle};
use crate::storage::page::{HeapPage, HeapPageId};
use crate::transaction::TransactionId;
use std::sync::Arc;

/// A table's on-disk storage.
///
/// Byte-level page I/O goes straight to the file; everything that works on
/// rows goes through a `PageCache` so that it is locked on behalf of `tid`.
pub trait DbFile: Send + Sync {
    type Iter: DbFileIterator;

    /// Registry-assigned identity, stable for the life of the process
    fn id(&self) -> TableId;

    fn schema(&self) -> &Arc<Schema>;

    fn num_pages(&self) -> DbResult<u32>;

    fn read_page(&self, pid: HeapPageId) -> DbResult<HeapPage>;

    fn write_page(&self, page: &HeapPage) -> DbResult<()>;

    /// Store `tuple`, returning the pages that were modified or created.
    fn insert_tuple(
        &self,
        cache: &dyn PageCache,
        tid: TransactionId,
        tuple: Tuple,
    ) -> DbResult<Vec<PageHandle>>;

    /// Free the slot `tuple` occupies, returning the modified page.
    fn delete_tuple(
        &self,
        cache: &dyn PageCache,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> DbResult<Vec<PageHandle>>;

    fn iterator(&self, cache: Arc<dyn PageCache>, tid: TransactionId) -> Self::Iter;
}

/// Resettable forward cursor over every row of a file.
///
/// A fresh cursor is closed. `has_next` is false and `next` fails with
/// `NotFound` whenever the cursor is closed or exhausted.
pub trait DbFileIterator: Send {
    fn open(&mut self) -> DbResult<()>;

    fn has_next(&mut self) -> DbResult<bool>;

    fn next(&mut self) -> DbResult<Tuple>;

    /// Start over from the first page
    fn rewind(&mut self) -> DbResult<()> {
        self.close();
        self.open()
    }

    fn close(&mut self);
}
