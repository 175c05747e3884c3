use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique model identifier, e.g. `"gpt-mini-v2"`.
pub type ModelId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Registered,
    Loading,
    Ready,
    Draining,
    Unloaded,
    Failed,
    /// Pulled out of rotation after a `ModelCorrupt` error (§4.8); stays
    /// quarantined until an operator re-registers/reloads it. Never chosen
    /// by routing and never an eviction target (there's nothing left to
    /// evict memory-wise; the loader already failed it).
    Quarantined,
}

impl Lifecycle {
    /// Whether a model in this state can accept new routed requests.
    pub fn routable(self) -> bool {
        matches!(self, Lifecycle::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Economy,
    Standard,
    Premium,
}

/// Declarative capability/cost profile for a model, set at registration and
/// otherwise immutable (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub display_name: String,
    pub tier: Tier,
    pub max_context_tokens: u32,
    pub cost_per_1k_tokens: f64,
    pub average_latency_ms: u32,
    /// Static quality signal (e.g. an eval-suite score, 0..1) folded into
    /// the router's `quality_first`/`weighted` scoring (§4.2).
    #[serde(default)]
    pub quality_score: f64,
    pub memory_footprint_mb: u64,
    /// Eviction priority (§4.5): lower survives worse. Models with a lower
    /// value are evicted first under memory pressure; raise this for models
    /// that should be protected.
    #[serde(default)]
    pub priority: u8,
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Model {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Mutable runtime record tracked by the registry alongside a `Model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model: Model,
    pub lifecycle: Lifecycle,
    pub active_requests: u32,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}
