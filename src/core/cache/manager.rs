//! Multi-tier cache manager (§4.6): L1 in-memory LRU, L2 on-disk, optional
//! L3 distributed tier. Mirrors the teacher's `CacheManager` tier
//! structure: L1 behind `parking_lot::RwLock<LruCache>` for promote-on-hit,
//! L2 generalized from an in-memory DashMap to bincode files on disk so a
//! restart doesn't cold-start every cache entry.

use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::CacheConfig;
use crate::core::cache::l3::DistributedTier;
use crate::core::cache::types::{CacheEntry, CacheStats};
use crate::utils::error::Result;

pub struct CacheManager {
    l1: RwLock<LruCache<String, CacheEntry>>,
    l2_dir: Option<PathBuf>,
    l2_ttl_secs: u64,
    l3: Option<Arc<dyn DistributedTier>>,
    l1_hits: AtomicU64,
    l2_hits: AtomicU64,
    l3_hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheManager {
    pub fn new(config: &CacheConfig, l3: Option<Arc<dyn DistributedTier>>) -> Arc<Self> {
        let capacity = NonZeroUsize::new(config.l1_capacity.max(1)).unwrap();
        let l2_dir = if config.l2_enabled {
            Some(PathBuf::from(&config.l2_dir))
        } else {
            None
        };
        Arc::new(Self {
            l1: RwLock::new(LruCache::new(capacity)),
            l2_dir,
            l2_ttl_secs: config.l2_ttl_secs,
            l3,
            l1_hits: AtomicU64::new(0),
            l2_hits: AtomicU64::new(0),
            l3_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Look up a fingerprint, checking tiers in order and promoting hits up
    /// to faster tiers as it goes (§4.6 "promote on hit").
    pub async fn get(&self, fingerprint: &str) -> Option<CacheEntry> {
        if let Some(entry) = self.get_l1(fingerprint) {
            self.l1_hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry);
        }

        if let Some(entry) = self.get_l2(fingerprint) {
            self.l2_hits.fetch_add(1, Ordering::Relaxed);
            self.put_l1(entry.clone());
            return Some(entry);
        }

        if let Some(tier) = &self.l3 {
            if let Ok(Some(raw)) = tier.get(fingerprint).await {
                if let Ok(entry) = serde_json::from_str::<CacheEntry>(&raw) {
                    self.l3_hits.fetch_add(1, Ordering::Relaxed);
                    self.put_l1(entry.clone());
                    self.put_l2(&entry);
                    return Some(entry);
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub async fn put(&self, entry: CacheEntry) -> Result<()> {
        self.put_l1(entry.clone());
        self.put_l2(&entry);
        if let Some(tier) = &self.l3 {
            if let Ok(raw) = serde_json::to_string(&entry) {
                let _ = tier.set(&entry.fingerprint, &raw, self.l2_ttl_secs).await;
            }
        }
        Ok(())
    }

    fn get_l1(&self, fingerprint: &str) -> Option<CacheEntry> {
        let mut l1 = self.l1.write();
        match l1.get(fingerprint) {
            Some(entry) if !entry.is_expired() => Some(entry.clone()),
            Some(_) => {
                l1.pop(fingerprint);
                None
            }
            None => None,
        }
    }

    fn put_l1(&self, entry: CacheEntry) {
        self.l1.write().put(entry.fingerprint.clone(), entry);
    }

    fn get_l2(&self, fingerprint: &str) -> Option<CacheEntry> {
        let dir = self.l2_dir.as_ref()?;
        let path = dir.join(format!("{fingerprint}.bin"));
        let bytes = std::fs::read(path).ok()?;
        let entry: CacheEntry = bincode::deserialize(&bytes).ok()?;
        if entry.is_expired() {
            None
        } else {
            Some(entry)
        }
    }

    fn put_l2(&self, entry: &CacheEntry) {
        let Some(dir) = &self.l2_dir else { return };
        if std::fs::create_dir_all(dir).is_err() {
            return;
        }
        let path = dir.join(format!("{}.bin", entry.fingerprint));
        if let Ok(bytes) = bincode::serialize(entry) {
            let _ = std::fs::write(path, bytes);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_hits: self.l1_hits.load(Ordering::Relaxed),
            l2_hits: self.l2_hits.load(Ordering::Relaxed),
            l3_hits: self.l3_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn invalidate(&self, fingerprint: &str) {
        self.l1.write().pop(fingerprint);
        if let Some(dir) = &self.l2_dir {
            let _ = std::fs::remove_file(dir.join(format!("{fingerprint}.bin")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fp: &str) -> CacheEntry {
        CacheEntry {
            fingerprint: fp.to_string(),
            text: "hello".into(),
            model_id: "m1".into(),
            inserted_at: std::time::Instant::now(),
            ttl_secs: 60,
        }
    }

    #[tokio::test]
    async fn l1_hit_after_put() {
        let config = CacheConfig {
            l2_enabled: false,
            ..Default::default()
        };
        let mgr = CacheManager::new(&config, None);
        mgr.put(entry("fp1")).await.unwrap();
        assert!(mgr.get("fp1").await.is_some());
        assert_eq!(mgr.stats().l1_hits, 1);
    }

    #[tokio::test]
    async fn miss_increments_counter() {
        let config = CacheConfig {
            l2_enabled: false,
            ..Default::default()
        };
        let mgr = CacheManager::new(&config, None);
        assert!(mgr.get("missing").await.is_none());
        assert_eq!(mgr.stats().misses, 1);
    }
}
