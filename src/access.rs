//! Access layer for row-oriented operations.
//!
//! - **Schema**: ordered, typed field descriptions shared by every row of a table
//! - **Tuple**: one row of field values plus its record id
//! - **HeapFile**: a table stored as a sequence of fixed-slot pages
//! - **HeapFileIterator**: page-ordered scan of a heap file through the page cache
//! - **encoder**: bulk conversion of delimited text into heap files

pub mod encoder;
pub mod file;
pub mod heap;
pub mod scan;
pub mod schema;
pub mod tuple;
pub mod value;

pub use file::{DbFile, DbFileIterator};
pub use heap::HeapFile;
pub use scan::HeapFileIterator;
pub use schema::{Schema, SchemaField};
pub use tuple::{RecordId, Tuple};
pub use value::{Field, Type};
