//! Disk I/O for fixed-size pages.

pub mod page_manager;

pub use page_manager::{PageManager, PAGE_SIZE};
