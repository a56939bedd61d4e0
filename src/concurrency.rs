//! Concurrency control.
//!
//! Page-granularity shared/exclusive locks with deadlock detection, used by
//! the buffer pool to mediate concurrent scans and mutations.

pub mod lock;

pub use lock::{LockManager, LockMode};
