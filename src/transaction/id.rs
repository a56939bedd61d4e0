use std::fmt;

/// Token naming the transaction a page is fetched for. The buffer pool keys
/// page locks and dirty marks on it, so a committed page can be traced back
/// to the transaction that changed it.
///
/// Ids are issued by [`super::TransactionManager`] starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn{}", self.0)
    }
}
