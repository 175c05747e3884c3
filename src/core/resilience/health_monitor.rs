//! Self-healing monitor (§4.9): tracks real success/failure counters, a
//! rolling latency window, and a rolling outcome window per model, derives a
//! `HealthStatus` from the circuit breaker state, and publishes transitions
//! onto the event bus. Mirrors the teacher's `HealthMonitor`
//! background-task-plus-snapshot-map pattern.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::core::registry::SharedRegistry;
use crate::core::router::Router;
use crate::core::types::{HealthRecord, HealthStatus, ModelId, OrchestratorEvent};
use crate::utils::error::recovery::CircuitState;
use crate::utils::error::ErrorKind;

pub struct HealthMonitor {
    registry: SharedRegistry,
    router: Arc<Router>,
    records: DashMap<ModelId, HealthRecord>,
    events: broadcast::Sender<OrchestratorEvent>,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(
        registry: SharedRegistry,
        router: Arc<Router>,
        events: broadcast::Sender<OrchestratorEvent>,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            router,
            records: DashMap::new(),
            events,
            interval,
        })
    }

    fn ensure_record(&self, model_id: &str) {
        self.records
            .entry(model_id.to_string())
            .or_insert_with(|| HealthRecord::new(model_id.to_string()));
    }

    pub fn note_failure(&self, model_id: &str) {
        self.ensure_record(model_id);
        if let Some(mut record) = self.records.get_mut(model_id) {
            record.consecutive_failures += 1;
            record.failure_count += 1;
            record.push_outcome(false);
        }
        self.sample(model_id);
    }

    pub fn note_success(&self, model_id: &str) {
        self.note_success_with_latency(model_id, 0);
    }

    /// Like `note_success`, but also folds the observed latency into the
    /// rolling latency window.
    pub fn note_success_with_latency(&self, model_id: &str, latency_ms: u64) {
        self.ensure_record(model_id);
        if let Some(mut record) = self.records.get_mut(model_id) {
            record.consecutive_failures = 0;
            record.success_count += 1;
            record.push_outcome(true);
            if latency_ms > 0 {
                record.push_latency(latency_ms);
            }
        }
        self.sample(model_id);
    }

    /// Record the `ErrorKind` of the most recent failure, surfaced on the
    /// health snapshot for operator triage (§4.9).
    pub fn note_error_class(&self, model_id: &str, kind: ErrorKind) {
        self.ensure_record(model_id);
        if let Some(mut record) = self.records.get_mut(model_id) {
            record.last_error_class = Some(kind);
        }
    }

    /// Recompute and store the status half of the health record for one
    /// model, deriving it from circuit breaker state and consecutive
    /// failures, and publish a transition event if it changed.
    pub fn sample(&self, model_id: &str) {
        self.ensure_record(model_id);
        let breaker = self.router.breaker_for(model_id);
        let consecutive_failures = self
            .records
            .get(model_id)
            .map(|r| r.consecutive_failures)
            .unwrap_or(0);

        let status = match breaker.state() {
            CircuitState::Open => HealthStatus::Unhealthy,
            CircuitState::HalfOpen => HealthStatus::Degraded,
            CircuitState::Closed if consecutive_failures > 0 => HealthStatus::Degraded,
            CircuitState::Closed => HealthStatus::Healthy,
        };

        let previous = self.records.get(model_id).map(|r| r.status);
        if let Some(mut record) = self.records.get_mut(model_id) {
            record.status = status;
            record.last_checked = Utc::now();
        }

        if previous != Some(status) {
            let event = match status {
                HealthStatus::Unhealthy => OrchestratorEvent::CircuitOpened {
                    model_id: model_id.to_string(),
                },
                HealthStatus::Healthy if matches!(previous, Some(HealthStatus::Unhealthy) | Some(HealthStatus::Degraded)) => {
                    OrchestratorEvent::CircuitClosed {
                        model_id: model_id.to_string(),
                    }
                }
                _ => return,
            };
            let _ = self.events.send(event);
        }
    }

    pub fn snapshot(&self, model_id: &str) -> Option<HealthRecord> {
        self.records.get(model_id).map(|r| r.clone())
    }

    pub fn all_snapshots(&self) -> Vec<HealthRecord> {
        self.records.iter().map(|e| e.value().clone()).collect()
    }

    /// Spawn the periodic sampling loop. Returns the task handle so callers
    /// can abort it on shutdown.
    pub fn spawn_loop(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                for record in self.registry.all() {
                    self.sample(&record.model.id);
                }
            }
        })
    }
}
