use std::sync::Arc;
use std::time::Duration;

use model_orchestration_core::config::{self, OrchestratorConfig};
use model_orchestration_core::core::loader::{SharedLoader, SimpleLoader};
use model_orchestration_core::core::types::{InferenceRequest, Model, Tier};
use model_orchestration_core::utils::logging;
use model_orchestration_core::Orchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();

    let config_path = std::env::var("ORCHESTRATOR_CONFIG").unwrap_or_else(|_| "config/orchestrator.yaml".into());
    let orchestrator_config = match std::fs::metadata(&config_path) {
        Ok(_) => config::load_from_file(&config_path)?,
        Err(_) => OrchestratorConfig::default(),
    };

    logging::init(orchestrator_config.observability.json_logs);
    tracing::info!(config = ?orchestrator_config, "starting orchestrator");

    let orchestrator = Orchestrator::new(orchestrator_config);
    orchestrator.spawn_background_tasks();

    let default_loader: SharedLoader = Arc::new(SimpleLoader::new("default", Duration::from_millis(20)));
    orchestrator.register_model(
        Model {
            id: "default".into(),
            display_name: "Default echo model".into(),
            tier: Tier::Standard,
            max_context_tokens: 4096,
            cost_per_1k_tokens: 0.0,
            average_latency_ms: 20,
            quality_score: 0.5,
            memory_footprint_mb: 128,
            priority: 5,
            tags: vec!["chat".into()],
            metadata: Default::default(),
        },
        default_loader.clone(),
    )?;
    orchestrator.load_model("default", &default_loader).await?;

    let result = orchestrator
        .complete(InferenceRequest::new("hello from the orchestration core"))
        .await?;
    tracing::info!(model_id = %result.model_id, text = %result.text, "inference complete");

    Ok(())
}
