//! Router (§4.2): filters registered models by request constraints and
//! circuit-breaker state, orders the survivors via the configured strategy,
//! and records the decision (with a short-TTL cache keyed on the request
//! fingerprint plus constraints).

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::RouterConfig;
use crate::core::registry::SharedRegistry;
use crate::core::types::{InferenceRequest, Lifecycle, ModelId, ModelRecord, RequestConstraints, RouteDecision};
use crate::utils::error::recovery::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::utils::error::{OrchestratorError, Result};

use super::fallback::fallback_chain;
use super::route_cache::RouteCache;
use super::strategy::Strategy;

pub struct Router {
    registry: SharedRegistry,
    config: RouterConfig,
    strategy: Strategy,
    route_cache: RouteCache,
    breakers: DashMap<ModelId, Arc<CircuitBreaker>>,
    breaker_config: CircuitBreakerConfig,
}

impl Router {
    pub fn new(registry: SharedRegistry, config: RouterConfig, breaker_config: CircuitBreakerConfig) -> Self {
        let route_cache = RouteCache::new(config.route_cache_size, Duration::from_secs(config.route_cache_ttl_secs));
        let strategy = Strategy::from_name(&config.strategy);
        Self {
            registry,
            config,
            strategy,
            route_cache,
            breakers: DashMap::new(),
            breaker_config,
        }
    }

    pub fn breaker_for(&self, model_id: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(model_id.to_string())
            .or_insert_with(|| CircuitBreaker::new(self.breaker_config.clone()))
            .clone()
    }

    fn satisfies(&self, record: &ModelRecord, constraints: &RequestConstraints) -> bool {
        if constraints.excluded_models.contains(&record.model.id) {
            return false;
        }
        if let Some(min_tier) = constraints.min_tier {
            if record.model.tier < min_tier {
                return false;
            }
        }
        if let Some(max_cost) = constraints.max_cost_per_1k_tokens {
            if record.model.cost_per_1k_tokens > max_cost {
                return false;
            }
        }
        if let Some(min_context) = constraints.min_context_tokens {
            if record.model.max_context_tokens < min_context {
                return false;
            }
        }
        constraints
            .required_tags
            .iter()
            .all(|tag| record.model.has_tag(tag))
    }

    /// Whether a cached decision's selected model is still safe to hand
    /// back without re-scoring: still `Ready` in the registry and its
    /// breaker hasn't tripped open since the decision was cached.
    fn still_valid(&self, decision: &RouteDecision) -> bool {
        match self.registry.get(&decision.selected_model) {
            Some(record) if record.lifecycle == Lifecycle::Ready => {
                !matches!(self.breaker_for(&decision.selected_model).state(), CircuitState::Open)
            }
            _ => false,
        }
    }

    /// Produce a routing decision for the given request. Does not itself
    /// dispatch inference; the pipeline consumes the decision.
    pub fn route(&self, request: &InferenceRequest) -> Result<RouteDecision> {
        let cache_key = format!("{}:{:?}", request.fingerprint(), request.constraints.excluded_models);
        if let Some(cached) = self.route_cache.get(&cache_key) {
            if self.still_valid(&cached) {
                return Ok(RouteDecision {
                    request_id: request.id,
                    ..cached
                });
            }
            self.route_cache.invalidate(&cache_key);
        }

        let candidates: Vec<ModelRecord> = self
            .registry
            .ready_models()
            .into_iter()
            .filter(|r| self.satisfies(r, &request.constraints))
            .filter(|r| self.breaker_for(&r.model.id).allow())
            .collect();

        if candidates.is_empty() {
            return Err(OrchestratorError::NoCandidates);
        }

        if let Some(preferred) = &request.constraints.preferred_model {
            if !candidates.iter().any(|r| &r.model.id == preferred) {
                return Err(OrchestratorError::ModelUnavailable {
                    model_id: preferred.clone(),
                });
            }
        }

        let failure_rates: HashMap<ModelId, f64> = candidates
            .iter()
            .map(|r| (r.model.id.clone(), self.breaker_for(&r.model.id).failure_ratio()))
            .collect();

        let mut ordered = self.strategy.order(&candidates, &self.config, request, &failure_rates);
        if let Some(preferred) = &request.constraints.preferred_model {
            if let Some(pos) = ordered.iter().position(|(r, _)| &r.model.id == preferred) {
                let preferred_entry = ordered.remove(pos);
                ordered.insert(0, preferred_entry);
            }
        }

        let ids: Vec<ModelId> = ordered.iter().map(|(r, _)| r.model.id.clone()).collect();
        let top_score = ordered.first().map(|(_, score)| *score).unwrap_or(0.0);

        let decision = RouteDecision {
            request_id: request.id,
            selected_model: ids[0].clone(),
            fallback_chain: fallback_chain(&ids),
            score: top_score,
            strategy: self.strategy.name().to_string(),
        };

        self.route_cache.put(
            cache_key,
            RouteDecision {
                request_id: Uuid::nil(),
                ..decision.clone()
            },
        );

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Registry;
    use crate::core::types::{Lifecycle, Model, Tier};

    fn model(id: &str) -> Model {
        Model {
            id: id.into(),
            display_name: id.into(),
            tier: Tier::Standard,
            max_context_tokens: 4096,
            cost_per_1k_tokens: 0.01,
            average_latency_ms: 100,
            quality_score: 0.5,
            memory_footprint_mb: 100,
            priority: 5,
            tags: vec!["chat".into()],
            metadata: Default::default(),
        }
    }

    fn ready_registry(ids: &[&str]) -> SharedRegistry {
        let registry = Arc::new(Registry::new());
        for id in ids {
            registry.register(model(id)).unwrap();
            registry.set_lifecycle(id, Lifecycle::Ready).unwrap();
        }
        registry
    }

    #[test]
    fn errors_when_no_candidates() {
        let registry = ready_registry(&[]);
        let router = Router::new(registry, RouterConfig::default(), CircuitBreakerConfig::default());
        let request = InferenceRequest::new("hi");
        assert!(matches!(router.route(&request), Err(OrchestratorError::NoCandidates)));
    }

    #[test]
    fn excludes_open_circuit_models() {
        let registry = ready_registry(&["a", "b"]);
        let router = Router::new(
            registry,
            RouterConfig::default(),
            CircuitBreakerConfig {
                failure_threshold: 1,
                ..Default::default()
            },
        );
        let breaker = router.breaker_for("a");
        breaker.record_failure();
        let request = InferenceRequest::new("hi");
        let decision = router.route(&request).unwrap();
        assert_eq!(decision.selected_model, "b");
    }

    #[test]
    fn preferred_model_wins_when_eligible() {
        let registry = ready_registry(&["a", "b"]);
        let router = Router::new(registry, RouterConfig::default(), CircuitBreakerConfig::default());
        let mut request = InferenceRequest::new("hi");
        request.constraints.preferred_model = Some("b".into());
        let decision = router.route(&request).unwrap();
        assert_eq!(decision.selected_model, "b");
    }

    #[test]
    fn preferred_model_unavailable_surfaces_error_instead_of_silent_fallback() {
        let registry = ready_registry(&["a"]);
        let router = Router::new(registry, RouterConfig::default(), CircuitBreakerConfig::default());
        let mut request = InferenceRequest::new("hi");
        request.constraints.preferred_model = Some("missing".into());
        let err = router.route(&request).unwrap_err();
        assert!(matches!(err, OrchestratorError::ModelUnavailable { model_id } if model_id == "missing"));
    }

    #[test]
    fn stale_cached_decision_is_revalidated_after_circuit_opens() {
        let registry = ready_registry(&["a", "b"]);
        let router = Router::new(
            registry.clone(),
            RouterConfig::default(),
            CircuitBreakerConfig {
                failure_threshold: 1,
                ..Default::default()
            },
        );
        let request = InferenceRequest::new("hi");
        let first = router.route(&request).unwrap();

        router.breaker_for(&first.selected_model).record_failure();
        let second = router.route(&request).unwrap();
        assert_ne!(second.selected_model, first.selected_model);
    }
}
