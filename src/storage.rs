//! Storage layer.
//!
//! - **PageManager**: whole-page reads and writes against one file
//! - **HeapPage**: fixed-slot page format with an occupancy bitmap
//! - **BufferPool**: shared cache of decoded pages, locked per transaction

pub mod buffer;
pub mod disk;
pub mod page;

pub use buffer::{BufferPool, PageCache, PageHandle, Permissions};
pub use disk::{PageManager, PAGE_SIZE};
pub use page::{HeapPage, HeapPageId, Page, PageId};
