pub mod heap_page;

use crate::catalog::TableId;
use crate::transaction::TransactionId;
use std::fmt::Debug;
use std::hash::Hash;

/// Identity of a page inside some table's file.
///
/// Page caches, lock tables and replacers only ever key on this trait, so a
/// file organization with its own page numbering can plug in a new identity
/// type without touching them.
pub trait PageId: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    fn table_id(&self) -> TableId;

    fn page_number(&self) -> u32;

    /// Stable two-integer form, usable as a cache or log key
    fn serialize(&self) -> [u32; 2] {
        [self.table_id().0, self.page_number()]
    }
}

/// Identity of one page of a heap file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapPageId {
    table_id: TableId,
    page_number: u32,
}

impl HeapPageId {
    pub fn new(table_id: TableId, page_number: u32) -> Self {
        Self {
            table_id,
            page_number,
        }
    }
}

impl PageId for HeapPageId {
    fn table_id(&self) -> TableId {
        self.table_id
    }

    fn page_number(&self) -> u32 {
        self.page_number
    }
}

/// A decoded page held by the page cache
pub trait Page: Send + Sync {
    type Id: PageId;

    fn id(&self) -> Self::Id;

    /// Encode the page into exactly `PAGE_SIZE` bytes
    fn page_data(&self) -> crate::error::DbResult<Vec<u8>>;

    /// The transaction that last dirtied this page, if it is dirty
    fn dirtied_by(&self) -> Option<TransactionId>;

    fn mark_dirty(&mut self, dirty: bool, tid: TransactionId);
}

pub use heap_page::HeapPage;
