//! Bounded in-memory answer cache

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use rab_core::AnswerResponse;

/// In-memory cache of completed answers, keyed by normalized query text
///
/// Only non-degraded responses are cached; degraded answers are retried in
/// full once the index is back. Eviction is oldest-first at capacity.
pub struct AnswerCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    map: HashMap<String, AnswerResponse>,
    order: VecDeque<String>,
}

impl AnswerCache {
    /// Create a cache holding at most `capacity` answers
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(CacheInner::default()),
        }
    }

    /// Look up a cached answer
    pub fn get(&self, query: &str) -> Option<AnswerResponse> {
        let key = cache_key(query);
        let inner = self.inner.read().ok()?;
        inner.map.get(&key).cloned()
    }

    /// Store a completed answer; degraded responses are skipped
    pub fn put(&self, query: &str, response: &AnswerResponse) {
        if response.degraded || self.capacity == 0 {
            return;
        }

        let key = cache_key(query);
        let Ok(mut inner) = self.inner.write() else {
            return;
        };

        if !inner.map.contains_key(&key) {
            while inner.order.len() >= self.capacity {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.map.remove(&oldest);
                }
            }
            inner.order.push_back(key.clone());
        }
        inner.map.insert(key, response.clone());
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cache_key(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(answer: &str, degraded: bool) -> AnswerResponse {
        AnswerResponse {
            answer: answer.to_string(),
            citations: Vec::new(),
            trace_id: "t".to_string(),
            degraded,
        }
    }

    #[test]
    fn test_hit_is_key_normalized() {
        let cache = AnswerCache::new(4);
        cache.put("How do cats behave?", &response("they nap", false));

        assert!(cache.get("  how do CATS   behave?  ").is_some());
        assert!(cache.get("how do dogs behave?").is_none());
    }

    #[test]
    fn test_degraded_responses_not_cached() {
        let cache = AnswerCache::new(4);
        cache.put("q", &response("partial", true));
        assert!(cache.get("q").is_none());
    }

    #[test]
    fn test_eviction_is_oldest_first() {
        let cache = AnswerCache::new(2);
        cache.put("first", &response("1", false));
        cache.put("second", &response("2", false));
        cache.put("third", &response("3", false));

        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());
        assert!(cache.get("third").is_some());
        assert_eq!(cache.len(), 2);
    }
}
