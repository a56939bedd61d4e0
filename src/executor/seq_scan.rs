//! Sequential scan operator.

use crate::access::file::{DbFile, DbFileIterator};
use crate::access::scan::HeapFileIterator;
use crate::access::schema::Schema;
use crate::access::tuple::Tuple;
use crate::catalog::TableId;
use crate::error::DbResult;
use crate::executor::{ExecutionContext, OpIterator};
use crate::transaction::TransactionId;

/// Scans every row of one table on behalf of a transaction.
///
/// The exposed schema prefixes each field name with the table alias
/// (`alias.name`, or `alias.null` for unnamed fields). Rows themselves are
/// passed through untouched.
pub struct SeqScan {
    context: ExecutionContext,
    tid: TransactionId,
    table_id: TableId,
    alias: String,
    schema: Schema,
    iter: HeapFileIterator,
}

impl SeqScan {
    /// Create a scan of `table_id`. Without an alias the table's registered
    /// name is used.
    pub fn new(
        context: ExecutionContext,
        tid: TransactionId,
        table_id: TableId,
        alias: Option<&str>,
    ) -> DbResult<Self> {
        let (alias, schema, iter) = Self::target(&context, tid, table_id, alias)?;
        Ok(Self {
            context,
            tid,
            table_id,
            alias,
            schema,
            iter,
        })
    }

    /// Point this scan at another table. The scan is left closed.
    pub fn reset(&mut self, table_id: TableId, alias: Option<&str>) -> DbResult<()> {
        let (alias, schema, iter) = Self::target(&self.context, self.tid, table_id, alias)?;
        self.iter.close();
        self.table_id = table_id;
        self.alias = alias;
        self.schema = schema;
        self.iter = iter;
        Ok(())
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn table_name(&self) -> DbResult<String> {
        self.context.catalog.table_name(self.table_id)
    }

    fn target(
        context: &ExecutionContext,
        tid: TransactionId,
        table_id: TableId,
        alias: Option<&str>,
    ) -> DbResult<(String, Schema, HeapFileIterator)> {
        let info = context.catalog.table_info(table_id)?;
        let alias = alias.map(str::to_string).unwrap_or(info.table_name);
        let schema = info.schema.with_alias(&alias);
        let iter = info.file.iterator(context.cache.clone(), tid);
        Ok((alias, schema, iter))
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> DbResult<()> {
        self.iter.open()
    }

    fn has_next(&mut self) -> DbResult<bool> {
        self.iter.has_next()
    }

    fn next(&mut self) -> DbResult<Tuple> {
        self.iter.next()
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.iter.rewind()
    }

    fn close(&mut self) {
        self.iter.close()
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}
