//! Dispatcher (§4.3): the request pipeline. Stages run in sequence for each
//! request, mirroring the teacher's `Router::complete` stage chain: cache
//! lookup, route, single-flight-coalesced inference with per-candidate
//! retry/fallback, cache population, event emission.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_stream::wrappers::ReceiverStream;

use crate::core::cache::{CacheEntry, CacheManager, SingleFlight};
use crate::core::loader::SharedLoader;
use crate::core::registry::SharedRegistry;
use crate::core::resilience::{Disposition, ErrorHandler, HealthMonitor};
use crate::core::router::Router;
use crate::core::streaming::StreamProcessor;
use crate::core::types::{InferenceRequest, InferenceResult, OrchestratorEvent, StreamChunk};
use crate::utils::error::recovery::RetryPolicy;
use crate::utils::error::{OrchestratorError, Result};

pub struct Dispatcher {
    registry: SharedRegistry,
    router: Arc<Router>,
    loaders: dashmap::DashMap<String, SharedLoader>,
    cache: Arc<CacheManager>,
    single_flight: Arc<SingleFlight>,
    error_handler: ErrorHandler,
    retry_policy: RetryPolicy,
    health_monitor: Arc<HealthMonitor>,
    stream_processor: StreamProcessor,
    events: broadcast::Sender<OrchestratorEvent>,
    cache_ttl_secs: u64,
}

pub struct DispatcherDeps {
    pub registry: SharedRegistry,
    pub router: Arc<Router>,
    pub cache: Arc<CacheManager>,
    pub error_handler: ErrorHandler,
    pub retry_policy: RetryPolicy,
    pub health_monitor: Arc<HealthMonitor>,
    pub stream_processor: StreamProcessor,
    pub events: broadcast::Sender<OrchestratorEvent>,
    pub cache_ttl_secs: u64,
}

impl Dispatcher {
    pub fn new(deps: DispatcherDeps) -> Self {
        Self {
            registry: deps.registry,
            router: deps.router,
            loaders: dashmap::DashMap::new(),
            cache: deps.cache,
            single_flight: Arc::new(SingleFlight::new()),
            error_handler: deps.error_handler,
            retry_policy: deps.retry_policy,
            health_monitor: deps.health_monitor,
            stream_processor: deps.stream_processor,
            events: deps.events,
            cache_ttl_secs: deps.cache_ttl_secs,
        }
    }

    pub fn register_loader(&self, model_id: impl Into<String>, loader: SharedLoader) {
        self.loaders.insert(model_id.into(), loader);
    }

    pub fn loader_for(&self, model_id: &str) -> Result<SharedLoader> {
        self.loaders
            .get(model_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| OrchestratorError::ModelUnavailable {
                model_id: model_id.to_string(),
            })
    }

    /// Remove a model's loader from the registered set, returning it so the
    /// caller can run `Loader::unload` before dropping it (§4.4).
    pub fn remove_loader(&self, model_id: &str) -> Option<SharedLoader> {
        self.loaders.remove(model_id).map(|(_, loader)| loader)
    }

    /// Run one (possibly retried) attempt against a single model.
    async fn try_model(&self, model_id: &str, request: &InferenceRequest) -> Result<InferenceResult> {
        let breaker = self.router.breaker_for(model_id);
        if !breaker.allow() {
            return Err(OrchestratorError::ModelUnavailable {
                model_id: model_id.to_string(),
            });
        }

        let loader = self.loader_for(model_id)?;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.registry.begin_request(model_id).ok();
            let outcome = loader.infer(request).await;
            self.registry.end_request(model_id);

            match outcome {
                Ok(mut result) => {
                    result.attempts = attempt;
                    breaker.record_success();
                    self.health_monitor.note_success_with_latency(model_id, result.latency_ms);
                    let _ = self.events.send(OrchestratorEvent::InferenceSucceeded {
                        request_id: request.id,
                        model_id: model_id.to_string(),
                        latency_ms: result.latency_ms,
                    });
                    return Ok(result);
                }
                Err(err) => {
                    breaker.record_failure();
                    self.health_monitor.note_failure(model_id);
                    self.health_monitor.note_error_class(model_id, err.kind());
                    let _ = self.events.send(OrchestratorEvent::InferenceFailed {
                        request_id: request.id,
                        model_id: model_id.to_string(),
                        kind: err.kind(),
                    });

                    if matches!(err, OrchestratorError::ModelCorrupt { .. }) {
                        self.registry.quarantine(model_id).ok();
                        let _ = self.events.send(OrchestratorEvent::ModelQuarantined {
                            model_id: model_id.to_string(),
                        });
                    }

                    match self.error_handler.classify(&err, attempt) {
                        Disposition::RetrySameModel if breaker.allow() => {
                            sleep(self.retry_policy.delay_for_attempt(attempt)).await;
                            continue;
                        }
                        _ => return Err(err),
                    }
                }
            }
        }
    }

    /// Run a complete (non-streaming) inference request through the full
    /// pipeline: cache, single-flight, route, dispatch with fallback.
    pub async fn dispatch(&self, request: InferenceRequest) -> Result<InferenceResult> {
        let fingerprint = request.fingerprint();

        if !request.stream && request.is_deterministic() {
            if let Some(entry) = self.cache.get(&fingerprint).await {
                let _ = self.events.send(OrchestratorEvent::CacheHit {
                    request_id: request.id,
                });
                return Ok(InferenceResult {
                    request_id: request.id,
                    model_id: entry.model_id,
                    text: entry.text,
                    usage: crate::core::types::TokenUsage {
                        prompt_tokens: 0,
                        completion_tokens: 0,
                    },
                    latency_ms: 0,
                    cache_hit: true,
                    attempts: 0,
                });
            }
        }

        let decision = self.router.route(&request)?;
        let _ = self.events.send(OrchestratorEvent::RouteDecided {
            request_id: request.id,
            model_id: decision.selected_model.clone(),
        });

        let single_flight = self.single_flight.clone();
        let chain: Vec<String> = std::iter::once(decision.selected_model.clone())
            .chain(decision.fallback_chain.clone())
            .collect();

        let cache = self.cache.clone();
        let cache_ttl_secs = self.cache_ttl_secs;
        let result = single_flight
            .execute(&fingerprint, || async {
                let start = Instant::now();
                let mut last_err = None;
                for model_id in &chain {
                    match self.try_model(model_id, &request).await {
                        Ok(mut result) => {
                            result.latency_ms = start.elapsed().as_millis() as u64;
                            if !request.stream && request.is_deterministic() {
                                cache
                                    .put(CacheEntry {
                                        fingerprint: request.fingerprint(),
                                        text: result.text.clone(),
                                        model_id: result.model_id.clone(),
                                        inserted_at: Instant::now(),
                                        ttl_secs: cache_ttl_secs,
                                    })
                                    .await
                                    .ok();
                            }
                            return Ok(result);
                        }
                        Err(err) => last_err = Some(err),
                    }
                }
                Err(last_err.unwrap_or(OrchestratorError::AllOpen))
            })
            .await?;

        Ok((*result).clone())
    }

    /// Stream a request's output. Bypasses cache and single-flight: each
    /// streamed request gets its own token sequence.
    pub fn dispatch_stream(
        &self,
        request: InferenceRequest,
    ) -> Result<ReceiverStream<StreamChunk>> {
        let decision = self.router.route(&request)?;
        let loader = self.loader_for(&decision.selected_model)?;
        Ok(self.stream_processor.start(loader, request))
    }
}
