//! Transaction identity and lifecycle.
//!
//! The page cache keys page locks and dirty tracking on a [`TransactionId`].
//! [`TransactionManager`] records which transactions are still active;
//! commit and abort themselves are carried out by
//! [`crate::storage::BufferPool::transaction_complete`].

pub mod id;
pub mod manager;
pub mod state;

pub use id::TransactionId;
pub use manager::TransactionManager;
pub use state::TransactionState;
