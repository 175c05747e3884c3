//! Model registry (§4.1).
//!
//! `DashMap` gives lock-free concurrent reads/writes per shard, the same
//! pattern the router's deployment table uses for its candidate index.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use crate::core::types::{Lifecycle, Model, ModelId, ModelRecord};
use crate::utils::error::{OrchestratorError, Result};

pub struct Registry {
    records: DashMap<ModelId, ModelRecord>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Register a new model. Fails if a model with the same id already
    /// exists (§4.1 invariant: ids are unique).
    pub fn register(&self, model: Model) -> Result<()> {
        if self.records.contains_key(&model.id) {
            return Err(OrchestratorError::AlreadyExists { id: model.id });
        }
        let record = ModelRecord {
            model,
            lifecycle: Lifecycle::Registered,
            active_requests: 0,
            registered_at: Utc::now(),
        };
        self.records.insert(record.model.id.clone(), record);
        Ok(())
    }

    pub fn deregister(&self, id: &str) -> Result<ModelRecord> {
        self.records
            .remove(id)
            .map(|(_, record)| record)
            .ok_or_else(|| OrchestratorError::ModelUnavailable {
                model_id: id.to_string(),
            })
    }

    pub fn get(&self, id: &str) -> Option<ModelRecord> {
        self.records.get(id).map(|entry| entry.clone())
    }

    pub fn set_lifecycle(&self, id: &str, lifecycle: Lifecycle) -> Result<()> {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| OrchestratorError::ModelUnavailable {
                model_id: id.to_string(),
            })?;
        entry.lifecycle = lifecycle;
        Ok(())
    }

    /// Pull a model out of rotation after a `ModelCorrupt` error (§4.8).
    /// Quarantined models are never routable and never picked for eviction.
    pub fn quarantine(&self, id: &str) -> Result<()> {
        self.set_lifecycle(id, Lifecycle::Quarantined)
    }

    /// Increment the in-flight request counter, used by the router's load
    /// scoring feature.
    pub fn begin_request(&self, id: &str) -> Result<()> {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| OrchestratorError::ModelUnavailable {
                model_id: id.to_string(),
            })?;
        entry.active_requests += 1;
        Ok(())
    }

    pub fn end_request(&self, id: &str) {
        if let Some(mut entry) = self.records.get_mut(id) {
            entry.active_requests = entry.active_requests.saturating_sub(1);
        }
    }

    /// All models currently in the `Ready` lifecycle state (routable).
    pub fn ready_models(&self) -> Vec<ModelRecord> {
        self.records
            .iter()
            .filter(|e| e.lifecycle.routable())
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn all(&self) -> Vec<ModelRecord> {
        self.records.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub type SharedRegistry = Arc<Registry>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Tier;

    fn sample_model(id: &str) -> Model {
        Model {
            id: id.to_string(),
            display_name: id.to_string(),
            tier: Tier::Standard,
            max_context_tokens: 4096,
            cost_per_1k_tokens: 0.01,
            average_latency_ms: 100,
            quality_score: 0.5,
            memory_footprint_mb: 512,
            priority: 5,
            tags: vec!["chat".into()],
            metadata: Default::default(),
        }
    }

    #[test]
    fn register_is_idempotent_guard() {
        let registry = Registry::new();
        registry.register(sample_model("m1")).unwrap();
        let err = registry.register(sample_model("m1")).unwrap_err();
        assert!(matches!(err, OrchestratorError::AlreadyExists { .. }));
    }

    #[test]
    fn ready_models_filters_lifecycle() {
        let registry = Registry::new();
        registry.register(sample_model("m1")).unwrap();
        assert!(registry.ready_models().is_empty());
        registry.set_lifecycle("m1", Lifecycle::Ready).unwrap();
        assert_eq!(registry.ready_models().len(), 1);
    }

    #[test]
    fn request_counters_track_load() {
        let registry = Registry::new();
        registry.register(sample_model("m1")).unwrap();
        registry.begin_request("m1").unwrap();
        registry.begin_request("m1").unwrap();
        assert_eq!(registry.get("m1").unwrap().active_requests, 2);
        registry.end_request("m1");
        assert_eq!(registry.get("m1").unwrap().active_requests, 1);
    }
}
