use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A cached inference result plus the bookkeeping needed for TTL expiry and
/// LRU promotion (§3.1, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub text: String,
    pub model_id: String,
    #[serde(skip, default = "Instant::now")]
    pub inserted_at: Instant,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub l3_hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn total_hits(&self) -> u64 {
        self.l1_hits + self.l2_hits + self.l3_hits
    }

    pub fn total_lookups(&self) -> u64 {
        self.total_hits() + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.total_lookups();
        if total == 0 {
            0.0
        } else {
            self.total_hits() as f64 / total as f64
        }
    }
}
