//! Short-TTL route decision cache (§4.2): avoids re-scoring every candidate
//! on every request when load hasn't meaningfully changed, generalized from
//! the teacher's deployment index caching pattern onto `RouteDecision`.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use crate::core::types::RouteDecision;

struct Entry {
    decision: RouteDecision,
    inserted_at: Instant,
}

pub struct RouteCache {
    inner: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
}

impl RouteCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap())),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<RouteDecision> {
        let mut inner = self.inner.lock();
        match inner.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => Some(entry.decision.clone()),
            Some(_) => {
                inner.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, decision: RouteDecision) {
        self.inner.lock().put(
            key,
            Entry {
                decision,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop a cached decision that's gone stale (selected model no longer
    /// routable, or its circuit has since opened) so the next lookup
    /// recomputes instead of returning it again.
    pub fn invalidate(&self, key: &str) {
        self.inner.lock().pop(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn decision() -> RouteDecision {
        RouteDecision {
            request_id: Uuid::new_v4(),
            selected_model: "m1".into(),
            fallback_chain: vec![],
            score: 1.0,
            strategy: "weighted".into(),
        }
    }

    #[test]
    fn expires_after_ttl() {
        let cache = RouteCache::new(8, Duration::from_millis(10));
        cache.put("k".into(), decision());
        assert!(cache.get("k").is_some());
        std::thread::sleep(Duration::from_millis(15));
        assert!(cache.get("k").is_none());
    }
}
