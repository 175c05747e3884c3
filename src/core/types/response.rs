use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::ModelId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Decision made by the router for a single request (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    pub request_id: Uuid,
    pub selected_model: ModelId,
    pub fallback_chain: Vec<ModelId>,
    pub score: f64,
    pub strategy: String,
}

/// Result of a completed (non-streaming) inference (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    pub request_id: Uuid,
    pub model_id: ModelId,
    pub text: String,
    pub usage: TokenUsage,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub attempts: u32,
}

/// A single chunk of a streamed inference (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub request_id: Uuid,
    pub sequence: u64,
    pub delta: String,
    pub finished: bool,
}
