//! Executor layer.
//!
//! Operators follow the iterator model: each produces tuples one at a time
//! and exposes the schema of what it produces. Table scans are the only
//! operator so far.

use crate::access::schema::Schema;
use crate::access::tuple::Tuple;
use crate::catalog::Catalog;
use crate::error::DbResult;
use crate::storage::buffer::PageCache;
use std::sync::Arc;

pub mod seq_scan;

pub use seq_scan::SeqScan;

/// Trait for all query operators
pub trait OpIterator: Send {
    /// Prepare the operator. Must be called before `has_next()`/`next()`.
    fn open(&mut self) -> DbResult<()>;

    fn has_next(&mut self) -> DbResult<bool>;

    /// Get the next tuple. Fails with `NotFound` once exhausted or closed.
    fn next(&mut self) -> DbResult<Tuple>;

    fn rewind(&mut self) -> DbResult<()>;

    fn close(&mut self);

    /// Schema of the tuples this operator produces
    fn schema(&self) -> &Schema;
}

/// Shared resources an operator needs to reach table data
#[derive(Clone)]
pub struct ExecutionContext {
    pub catalog: Arc<Catalog>,
    pub cache: Arc<dyn PageCache>,
}

impl ExecutionContext {
    pub fn new(catalog: Arc<Catalog>, cache: Arc<dyn PageCache>) -> Self {
        Self { catalog, cache }
    }
}
