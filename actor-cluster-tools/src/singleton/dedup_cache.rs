use std::fmt::{Debug, Formatter};

use quick_cache::unsync::Cache;

/// Responses by idempotency key, bounded to about `capacity` entries. A capacity of zero
/// disables caching.
pub(crate) struct DedupCache {
    responses: Option<Cache<String, Vec<u8>>>,
}

impl Debug for DedupCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupCache")
            .field("len", &self.len())
            .finish()
    }
}

impl DedupCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let responses = (capacity > 0).then(|| Cache::new(capacity));
        Self { responses }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Vec<u8>> {
        self.responses.as_ref()?.get(key)
    }

    pub(crate) fn insert(&mut self, key: String, response: Vec<u8>) {
        if let Some(responses) = &mut self.responses {
            responses.insert(key, response);
        }
    }

    pub(crate) fn clear(&mut self) {
        if let Some(responses) = &mut self.responses {
            responses.clear();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.responses.as_ref().map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use crate::singleton::dedup_cache::DedupCache;

    #[test]
    fn test_bounded_by_capacity() {
        let mut cache = DedupCache::new(8);
        for i in 0..64u8 {
            cache.insert(format!("key-{}", i), vec![i]);
        }
        assert!(cache.len() <= 8);
        assert_eq!(cache.get("key-63"), Some(&vec![63]));
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get("key-63"), None);
    }

    #[test]
    fn test_overwrite_keeps_latest_response() {
        let mut cache = DedupCache::new(4);
        cache.insert("a".to_string(), vec![1]);
        cache.insert("a".to_string(), vec![2]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(&vec![2]));
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let mut cache = DedupCache::new(0);
        cache.insert("a".to_string(), vec![1]);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 0);
    }
}
