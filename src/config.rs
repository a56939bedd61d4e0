use std::time::Duration;

/// Default number of pages the buffer pool keeps resident.
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Buffer pool configuration.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Maximum number of resident pages.
    pub max_pages: usize,
    /// How long a page-lock request may block before the requesting
    /// transaction is aborted. `None` waits until granted or deadlocked.
    pub lock_timeout: Option<Duration>,
}

impl BufferPoolConfig {
    pub fn with_max_pages(max_pages: usize) -> Self {
        BufferPoolConfig {
            max_pages,
            ..Default::default()
        }
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        BufferPoolConfig {
            max_pages: DEFAULT_MAX_PAGES,
            lock_timeout: Some(Duration::from_secs(1)),
        }
    }
}
