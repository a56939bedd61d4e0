//! Table information and metadata structures.

use crate::access::heap::HeapFile;
use crate::access::schema::Schema;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
pub struct TableInfo {
    pub table_id: TableId,
    pub table_name: String,
    pub schema: Arc<Schema>,
    /// Name of the primary-key field, if one was declared
    pub primary_key: Option<String>,
    pub file: HeapFile,
}

impl fmt::Debug for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableInfo")
            .field("table_id", &self.table_id)
            .field("table_name", &self.table_name)
            .field("schema", &self.schema.to_string())
            .field("primary_key", &self.primary_key)
            .field("path", &self.file.path())
            .finish()
    }
}
