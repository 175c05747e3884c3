//! Memory manager (§4.5): tracks an allocation ledger against a configured
//! budget and evicts the lowest-priority loaded model once the high-water
//! mark would otherwise be crossed, generalizing the teacher's
//! `ObjectPool`/`BufferPool` idiom from a single buffer type to an
//! arbitrary per-model allocation ledger.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::MemoryConfig;
use crate::core::types::ModelId;
use crate::utils::error::{OrchestratorError, Result};

#[derive(Debug, Clone, Copy)]
struct LedgerEntry {
    size_mb: u64,
    priority: u8,
}

pub struct MemoryManager {
    config: MemoryConfig,
    used_mb: AtomicU64,
    ledger: DashMap<ModelId, LedgerEntry>,
}

impl MemoryManager {
    pub fn new(config: MemoryConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            used_mb: AtomicU64::new(0),
            ledger: DashMap::new(),
        })
    }

    pub fn high_water_mark_mb(&self) -> u64 {
        (self.config.total_budget_mb as f64 * self.config.high_water_mark_ratio) as u64
    }

    pub fn used_mb(&self) -> u64 {
        self.used_mb.load(Ordering::Acquire)
    }

    pub fn budget_mb(&self) -> u64 {
        self.config.total_budget_mb
    }

    /// Whether the given model (by its declared footprint) can be loaded
    /// without crossing the high-water mark (§4.5 invariant).
    pub fn can_allocate(&self, size_mb: u64) -> bool {
        self.used_mb() + size_mb <= self.high_water_mark_mb()
    }

    /// Reserve memory for a model, evicting lowest-priority loaded models
    /// (lowest `priority` value first) until the allocation fits or there is
    /// nothing left to evict. Returns the ids of models evicted to make
    /// room, in eviction order, so the caller can transition their
    /// lifecycle back to `Registered` and unload their loader. Errors with
    /// `OutOfMemory` only when the allocation still doesn't fit after every
    /// evictable model has been freed.
    pub fn allocate(&self, model_id: &str, size_mb: u64, priority: u8) -> Result<Vec<ModelId>> {
        if self.ledger.contains_key(model_id) {
            return Ok(Vec::new());
        }

        let mut evicted = Vec::new();
        while !self.can_allocate(size_mb) {
            match self.lowest_priority_evictable(model_id) {
                Some(candidate) => {
                    self.release(&candidate);
                    evicted.push(candidate);
                }
                None => {
                    return Err(OrchestratorError::OutOfMemory {
                        message: format!(
                            "allocating {size_mb}MB for {model_id} would exceed high water mark {}MB (used {}MB / budget {}MB) and no lower-priority model is left to evict",
                            self.high_water_mark_mb(),
                            self.used_mb(),
                            self.budget_mb(),
                        ),
                    });
                }
            }
        }

        self.ledger.insert(model_id.to_string(), LedgerEntry { size_mb, priority });
        self.used_mb.fetch_add(size_mb, Ordering::AcqRel);
        Ok(evicted)
    }

    pub fn release(&self, model_id: &str) {
        if let Some((_, entry)) = self.ledger.remove(model_id) {
            self.used_mb.fetch_sub(entry.size_mb, Ordering::AcqRel);
        }
    }

    /// Whether the manager is currently under memory pressure, i.e. past
    /// the high-water mark.
    pub fn under_pressure(&self) -> bool {
        self.used_mb() >= self.high_water_mark_mb()
    }

    /// Pick the lowest-priority eviction candidate among loaded models other
    /// than `exclude`; ties broken by lexically smallest id for determinism.
    fn lowest_priority_evictable(&self, exclude: &str) -> Option<ModelId> {
        self.ledger
            .iter()
            .filter(|e| e.key() != exclude)
            .min_by(|a, b| {
                a.value()
                    .priority
                    .cmp(&b.value().priority)
                    .then_with(|| a.key().cmp(b.key()))
            })
            .map(|e| e.key().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Arc<MemoryManager> {
        MemoryManager::new(MemoryConfig {
            total_budget_mb: 1000,
            high_water_mark_ratio: 0.9,
            pool_slab_size: 16,
        })
    }

    #[test]
    fn allocate_rejects_past_high_water_mark_with_nothing_to_evict() {
        let mgr = manager();
        mgr.allocate("a", 500, 5).unwrap();
        mgr.allocate("b", 350, 5).unwrap();
        let err = mgr.allocate("c", 100, 5).unwrap_err();
        assert!(matches!(err, OrchestratorError::OutOfMemory { .. }));
    }

    #[test]
    fn release_frees_budget() {
        let mgr = manager();
        mgr.allocate("a", 800, 5).unwrap();
        assert!(mgr.under_pressure());
        mgr.release("a");
        assert_eq!(mgr.used_mb(), 0);
        assert!(!mgr.under_pressure());
    }

    #[test]
    fn allocate_evicts_lowest_priority_to_make_room() {
        let mgr = manager();
        mgr.allocate("big", 500, 1).unwrap();
        mgr.allocate("small", 350, 5).unwrap();
        let evicted = mgr.allocate("new", 300, 3).unwrap();
        assert_eq!(evicted, vec!["big".to_string()]);
        assert_eq!(mgr.used_mb(), 350 + 300);
        assert!(mgr.ledger.contains_key("small"));
        assert!(mgr.ledger.contains_key("new"));
        assert!(!mgr.ledger.contains_key("big"));
    }

    #[test]
    fn lowest_priority_evictable_skips_excluded() {
        let mgr = manager();
        mgr.allocate("a", 100, 1).unwrap();
        mgr.allocate("b", 400, 5).unwrap();
        assert_eq!(mgr.lowest_priority_evictable("a"), Some("b".to_string()));
    }
}
