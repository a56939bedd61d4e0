//! Error types shared by every layer of the heap store.

use crate::transaction::TransactionId;
use thiserror::Error;

/// Errors that can occur while reading, writing or scanning heap files.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Index {index} out of range (field count: {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Transaction {tid} aborted: {reason}")]
    TransactionAborted { tid: TransactionId, reason: String },

    #[error("Page is full: no empty slot left")]
    PageFull,

    #[error("Buffer pool is full: every cached page is dirty")]
    BufferPoolFull,

    #[error("Corrupt page data: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DbError::NotFound(what.into())
    }

    /// Returns true if this error should unwind the owning transaction.
    pub fn is_abort(&self) -> bool {
        matches!(self, DbError::TransactionAborted { .. })
    }
}

/// Result type for heap store operations.
pub type DbResult<T> = Result<T, DbError>;
