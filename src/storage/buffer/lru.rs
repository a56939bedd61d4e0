use super::replacer::Replacer;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;

#[derive(Debug)]
pub struct LruReplacer<K> {
    /// Tracked keys, least recently used at front
    lru_list: VecDeque<K>,
}

impl<K> LruReplacer<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            lru_list: VecDeque::with_capacity(capacity),
        }
    }
}

impl<K> Replacer<K> for LruReplacer<K>
where
    K: Copy + Eq + Hash + Debug + Send + Sync,
{
    fn record_access(&mut self, key: K) {
        self.remove(&key);
        self.lru_list.push_back(key);
    }

    fn remove(&mut self, key: &K) {
        if let Some(idx) = self.lru_list.iter().position(|k| k == key) {
            self.lru_list.remove(idx);
        }
    }

    fn evict(&mut self, evictable: &dyn Fn(&K) -> bool) -> Option<K> {
        let idx = self.lru_list.iter().position(|k| evictable(k))?;
        self.lru_list.remove(idx)
    }

    fn size(&self) -> usize {
        self.lru_list.len()
    }
}
