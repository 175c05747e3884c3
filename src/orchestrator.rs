//! Orchestrator (§6): the composition root. Holds every subsystem and
//! exposes the external operations (register/deregister, complete, stream,
//! health, metrics) without any subsystem reaching for a global singleton —
//! generalized from the teacher's `Gateway` struct, minus its HTTP server
//! field.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::OrchestratorConfig;
use crate::core::cache::CacheManager;
use crate::core::loader::SharedLoader;
use crate::core::memory::MemoryManager;
use crate::core::pipeline::{Dispatcher, DispatcherDeps};
use crate::core::pool::WorkerPool;
use crate::core::registry::{Registry, SharedRegistry};
use crate::core::resilience::{ErrorHandler, HealthMonitor};
use crate::core::router::Router;
use crate::core::streaming::StreamProcessor;
use crate::core::types::{
    HealthRecord, InferenceRequest, InferenceResult, Lifecycle, Model, ModelRecord,
    OrchestratorEvent, StreamChunk,
};
use crate::utils::error::recovery::{CircuitBreakerConfig, RetryPolicy};
use crate::utils::error::Result;
use crate::utils::metrics::Metrics;

pub struct Orchestrator {
    registry: SharedRegistry,
    router: Arc<Router>,
    dispatcher: Arc<Dispatcher>,
    memory: Arc<MemoryManager>,
    cache: Arc<CacheManager>,
    pool: Arc<WorkerPool>,
    health_monitor: Arc<HealthMonitor>,
    events: broadcast::Sender<OrchestratorEvent>,
    metrics: Arc<Metrics>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        let registry = Arc::new(Registry::new());
        let breaker_config = CircuitBreakerConfig {
            failure_threshold: config.resilience.failure_threshold,
            success_threshold: config.resilience.success_threshold,
            cooldown: config.resilience.cooldown(),
            max_cooldown: config.resilience.max_cooldown(),
        };
        let router = Arc::new(Router::new(registry.clone(), config.router.clone(), breaker_config));
        let memory = MemoryManager::new(config.memory.clone());
        let cache = CacheManager::new(&config.cache, None);
        let pool = WorkerPool::new(config.pool.clone());
        let (events, _rx) = broadcast::channel(1024);

        let health_monitor = HealthMonitor::new(
            registry.clone(),
            router.clone(),
            events.clone(),
            config.resilience.health_check_interval(),
        );

        let error_handler = ErrorHandler::new(config.resilience.clone());
        let retry_policy = RetryPolicy {
            max_attempts: config.resilience.max_attempts,
            base_delay: config.resilience.base_delay(),
            max_delay: config.resilience.max_delay(),
            jitter_ratio: 0.2,
        };
        let stream_processor = StreamProcessor::new(config.streaming.clone());

        let dispatcher = Arc::new(Dispatcher::new(DispatcherDeps {
            registry: registry.clone(),
            router: router.clone(),
            cache: cache.clone(),
            error_handler,
            retry_policy,
            health_monitor: health_monitor.clone(),
            stream_processor,
            events: events.clone(),
            cache_ttl_secs: config.cache.l1_ttl_secs,
        }));

        Self {
            registry,
            router,
            dispatcher,
            memory,
            cache,
            pool,
            health_monitor,
            events,
            metrics: Arc::new(Metrics::new()),
            config,
        }
    }

    /// Start the background health-monitor sampling loop.
    pub fn spawn_background_tasks(&self) -> tokio::task::JoinHandle<()> {
        self.health_monitor.clone().spawn_loop()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    /// Register a model and bind its loader. The model starts in
    /// `Registered` lifecycle; `load_model` transitions it to `Ready`.
    pub fn register_model(&self, model: Model, loader: SharedLoader) -> Result<()> {
        let model_id = model.id.clone();
        self.registry.register(model)?;
        self.dispatcher.register_loader(&model_id, loader);
        let _ = self.events.send(OrchestratorEvent::ModelRegistered {
            model_id: model_id.clone(),
        });
        Ok(())
    }

    /// Reserve memory (evicting lower-priority loaded models if the budget
    /// requires it, §4.5) and run the loader's warmup, transitioning the
    /// model to `Ready` on success.
    pub async fn load_model(&self, model_id: &str, loader: &SharedLoader) -> Result<()> {
        let record = self
            .registry
            .get(model_id)
            .ok_or_else(|| crate::utils::error::OrchestratorError::ModelUnavailable {
                model_id: model_id.to_string(),
            })?;
        if !loader.probe().await? {
            return Err(crate::utils::error::OrchestratorError::ModelUnavailable {
                model_id: model_id.to_string(),
            });
        }
        self.registry.set_lifecycle(model_id, Lifecycle::Loading)?;
        let evicted = self
            .memory
            .allocate(model_id, record.model.memory_footprint_mb, record.model.priority)?;
        for evicted_id in evicted {
            if let Some(evicted_loader) = self.dispatcher.loader_for(&evicted_id).ok() {
                let _ = evicted_loader.unload().await;
            }
            let _ = self.registry.set_lifecycle(&evicted_id, Lifecycle::Registered);
            let _ = self.events.send(OrchestratorEvent::ModelEvicted {
                model_id: evicted_id,
            });
        }
        loader.load().await?;
        self.registry.set_lifecycle(model_id, Lifecycle::Ready)?;
        let _ = self.events.send(OrchestratorEvent::ModelLifecycleChanged {
            model_id: model_id.to_string(),
            to: Lifecycle::Ready,
        });
        Ok(())
    }

    /// Unload a model's backend, release its memory allocation, and remove
    /// it from the registry (§4.1, §4.4).
    pub async fn deregister_model(&self, model_id: &str) -> Result<ModelRecord> {
        if let Some(loader) = self.dispatcher.remove_loader(model_id) {
            loader.unload().await?;
        }
        self.memory.release(model_id);
        self.registry.deregister(model_id)
    }

    pub fn model(&self, model_id: &str) -> Option<ModelRecord> {
        self.registry.get(model_id)
    }

    pub fn list_models(&self) -> Vec<ModelRecord> {
        self.registry.all()
    }

    pub async fn complete(&self, request: InferenceRequest) -> Result<InferenceResult> {
        self.dispatcher.dispatch(request).await
    }

    pub fn stream(&self, request: InferenceRequest) -> Result<ReceiverStream<StreamChunk>> {
        self.dispatcher.dispatch_stream(request)
    }

    pub fn health(&self, model_id: &str) -> Option<HealthRecord> {
        self.health_monitor.snapshot(model_id)
    }

    pub fn all_health(&self) -> Vec<HealthRecord> {
        self.health_monitor.all_snapshots()
    }

    pub fn memory_usage_mb(&self) -> u64 {
        self.memory.used_mb()
    }

    pub fn cache_stats(&self) -> crate::core::cache::CacheStats {
        self.cache.stats()
    }

    pub fn worker_pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Refresh the exported gauges from current subsystem state and render
    /// them in Prometheus text exposition format. A no-op empty string when
    /// the `metrics` feature is disabled.
    pub fn render_metrics(&self) -> String {
        self.metrics.set_memory_used_mb(self.memory.used_mb());
        self.metrics.set_cache_hit_rate(self.cache.stats().hit_rate());
        let active_requests: u64 = self
            .registry
            .all()
            .iter()
            .map(|r| r.active_requests as u64)
            .sum();
        self.metrics.set_active_requests(active_requests);
        self.metrics.render()
    }
}
