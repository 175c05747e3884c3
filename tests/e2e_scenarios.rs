//! End-to-end scenarios exercising the orchestrator's public surface the way
//! a caller would: register models, load them, then route/dispatch
//! requests and observe the outcome.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use model_orchestration_core::config::OrchestratorConfig;
use model_orchestration_core::core::loader::{MockLoader, SharedLoader, SimpleLoader};
use model_orchestration_core::core::types::{InferenceRequest, Lifecycle, Model, RequestConstraints, Tier};
use model_orchestration_core::Orchestrator;

fn model(id: &str) -> Model {
    Model {
        id: id.into(),
        display_name: id.into(),
        tier: Tier::Standard,
        max_context_tokens: 4096,
        cost_per_1k_tokens: 0.01,
        average_latency_ms: 5,
        quality_score: 0.5,
        memory_footprint_mb: 32,
        priority: 5,
        tags: vec!["chat".into()],
        metadata: Default::default(),
    }
}

async fn register_and_load(orchestrator: &Orchestrator, id: &str, loader: SharedLoader) {
    orchestrator.register_model(model(id), loader.clone()).unwrap();
    orchestrator.load_model(id, &loader).await.unwrap();
}

#[tokio::test]
async fn happy_path_returns_deterministic_result() {
    let orchestrator = Orchestrator::new(OrchestratorConfig::default());
    let loader: SharedLoader = Arc::new(MockLoader::new("m1"));
    register_and_load(&orchestrator, "m1", loader).await;

    let result = orchestrator.complete(InferenceRequest::new("abcd")).await.unwrap();
    assert_eq!(result.text, "dcba");
    assert_eq!(result.model_id, "m1");
    assert!(!result.cache_hit);
}

#[tokio::test]
async fn falls_back_to_next_model_on_transient_failure() {
    let mut config = OrchestratorConfig::default();
    config.resilience.max_attempts = 1;
    let orchestrator = Orchestrator::new(config);

    let failing: SharedLoader = Arc::new(MockLoader::always_failing("bad"));
    let healthy: SharedLoader = Arc::new(MockLoader::new("good"));
    register_and_load(&orchestrator, "bad", failing).await;
    register_and_load(&orchestrator, "good", healthy).await;

    let mut request = InferenceRequest::new("hello");
    request.constraints = RequestConstraints {
        preferred_model: Some("bad".into()),
        ..Default::default()
    };

    let result = orchestrator.complete(request).await.unwrap();
    assert_eq!(result.model_id, "good");
}

#[tokio::test]
async fn circuit_opens_after_repeated_failures_and_excludes_model() {
    let mut config = OrchestratorConfig::default();
    config.resilience.failure_threshold = 2;
    config.resilience.max_attempts = 1;
    let orchestrator = Orchestrator::new(config);

    let failing: SharedLoader = Arc::new(MockLoader::always_failing("bad"));
    let healthy: SharedLoader = Arc::new(MockLoader::new("good"));
    register_and_load(&orchestrator, "bad", failing).await;
    register_and_load(&orchestrator, "good", healthy).await;

    for i in 0..3 {
        let mut request = InferenceRequest::new(format!("req-{i}"));
        request.constraints.preferred_model = Some("bad".into());
        let _ = orchestrator.complete(request).await;
    }

    let record = orchestrator.health("bad");
    assert!(record.is_some());

    let mut request = InferenceRequest::new("after-open");
    request.constraints.excluded_models = vec!["good".into()];
    let outcome = orchestrator.complete(request).await;
    assert!(outcome.is_err(), "bad model should be circuit-open and excluded");
}

#[tokio::test]
async fn concurrent_identical_requests_coalesce_into_one_inference() {
    let orchestrator = Arc::new(Orchestrator::new(OrchestratorConfig::default()));
    let loader: SharedLoader = Arc::new(SimpleLoader::new("m1", Duration::from_millis(50)));
    register_and_load(&orchestrator, "m1", loader).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.complete(InferenceRequest::new("same prompt")).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn dropping_stream_receiver_does_not_hang() {
    let orchestrator = Orchestrator::new(OrchestratorConfig::default());
    let loader: SharedLoader = Arc::new(SimpleLoader::new("m1", Duration::from_millis(5)));
    register_and_load(&orchestrator, "m1", loader).await;

    let request = InferenceRequest::new("one two three four five").with_stream(true);
    let mut stream = orchestrator.stream(request).unwrap();
    let first = stream.next().await;
    assert!(first.is_some());
    drop(stream);
}

#[tokio::test]
async fn memory_pressure_evicts_lowest_priority_loaded_model() {
    // Budget 100MB, high water mark 90MB.
    let mut config = OrchestratorConfig::default();
    config.memory.total_budget_mb = 100;
    config.memory.high_water_mark_ratio = 0.9;
    let orchestrator = Orchestrator::new(config);

    let mut m_big = model("m-big");
    m_big.memory_footprint_mb = 60;
    m_big.priority = 1;
    let big_loader: SharedLoader = Arc::new(MockLoader::new("m-big"));
    orchestrator.register_model(m_big, big_loader.clone()).unwrap();
    orchestrator.load_model("m-big", &big_loader).await.unwrap();

    let mut m_small = model("m-small");
    m_small.memory_footprint_mb = 25;
    m_small.priority = 5;
    let small_loader: SharedLoader = Arc::new(MockLoader::new("m-small"));
    orchestrator.register_model(m_small, small_loader.clone()).unwrap();
    orchestrator.load_model("m-small", &small_loader).await.unwrap();

    assert_eq!(orchestrator.memory_usage_mb(), 85);

    // m-new (pri 3, 35MB) doesn't fit alongside both (85 + 35 > 90), so the
    // lowest-priority loaded model (m-big, pri 1) is evicted to make room;
    // m-small (pri 5) is protected and stays loaded.
    let mut m_new = model("m-new");
    m_new.memory_footprint_mb = 35;
    m_new.priority = 3;
    let new_loader: SharedLoader = Arc::new(MockLoader::new("m-new"));
    orchestrator.register_model(m_new, new_loader.clone()).unwrap();
    orchestrator.load_model("m-new", &new_loader).await.unwrap();

    assert_eq!(orchestrator.memory_usage_mb(), 25 + 35);

    let big_record = orchestrator.model("m-big").unwrap();
    assert_eq!(big_record.lifecycle, Lifecycle::Registered);

    let small_record = orchestrator.model("m-small").unwrap();
    assert_eq!(small_record.lifecycle, Lifecycle::Ready);
}
