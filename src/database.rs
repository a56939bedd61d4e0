use crate::access::schema::Schema;
use crate::access::tuple::Tuple;
use crate::catalog::{Catalog, TableId};
use crate::config::BufferPoolConfig;
use crate::error::{DbError, DbResult};
use crate::executor::{ExecutionContext, SeqScan};
use crate::storage::buffer::BufferPool;
use crate::transaction::{TransactionId, TransactionManager};
use std::path::Path;
use std::sync::Arc;

/// High-level interface that ties the catalog, page cache and transactions
/// together.
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: BufferPool,
    transactions: TransactionManager,
}

impl Database {
    pub fn new(config: BufferPoolConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = BufferPool::new(Arc::clone(&catalog), config);
        Self {
            catalog,
            buffer_pool,
            transactions: TransactionManager::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    /// Register the heap file at `path` as table `name`
    pub fn add_table(&self, path: &Path, name: &str, schema: Schema) -> DbResult<TableId> {
        self.catalog.add_table(path, name, schema)
    }

    /// Register every table listed in a text catalog file
    pub fn load_schema(&self, path: &Path) -> DbResult<Vec<TableId>> {
        self.catalog.load_schema(path)
    }

    pub fn begin(&self) -> TransactionId {
        self.transactions.begin()
    }

    /// Flush `tid`'s changes and release its locks
    pub fn commit(&self, tid: TransactionId) -> DbResult<()> {
        self.complete(tid, true)
    }

    /// Discard `tid`'s changes and release its locks
    pub fn abort(&self, tid: TransactionId) -> DbResult<()> {
        self.complete(tid, false)
    }

    fn complete(&self, tid: TransactionId, commit: bool) -> DbResult<()> {
        self.transactions.ensure_active(tid)?;
        let result = self.buffer_pool.transaction_complete(tid, commit);
        self.transactions.finish(tid, commit)?;
        result
    }

    pub fn insert(&self, tid: TransactionId, table_id: TableId, tuple: Tuple) -> DbResult<()> {
        self.transactions.ensure_active(tid)?;
        self.buffer_pool.insert_tuple(tid, table_id, tuple)
    }

    pub fn delete(&self, tid: TransactionId, tuple: &Tuple) -> DbResult<()> {
        self.transactions.ensure_active(tid)?;
        self.buffer_pool.delete_tuple(tid, tuple)
    }

    /// Sequential scan of `table_id` on behalf of `tid`. The returned scan is
    /// closed; call `open()` before reading.
    pub fn scan(&self, tid: TransactionId, table_id: TableId, alias: Option<&str>) -> DbResult<SeqScan> {
        self.transactions.ensure_active(tid)?;
        let context = ExecutionContext::new(
            Arc::clone(&self.catalog),
            Arc::new(self.buffer_pool.clone()),
        );
        SeqScan::new(context, tid, table_id, alias)
    }

    /// Abort `tid` if `result` carries a lock abort, then hand the result back
    pub fn abort_on_conflict<T>(&self, tid: TransactionId, result: DbResult<T>) -> DbResult<T> {
        if let Err(DbError::TransactionAborted { .. }) = &result {
            self.abort(tid)?;
        }
        result
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(BufferPoolConfig::default())
    }
}
