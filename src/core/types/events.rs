use serde::{Deserialize, Serialize};

use super::model::ModelId;
use crate::utils::error::ErrorKind;

/// Events emitted on the orchestrator's broadcast bus (§6, "Events
/// emitted"). Subscribers that lag behind are tolerated; they simply miss
/// intervening events rather than stalling the publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrchestratorEvent {
    ModelRegistered { model_id: ModelId },
    ModelLifecycleChanged { model_id: ModelId, to: super::model::Lifecycle },
    RouteDecided { request_id: uuid::Uuid, model_id: ModelId },
    InferenceSucceeded { request_id: uuid::Uuid, model_id: ModelId, latency_ms: u64 },
    InferenceFailed { request_id: uuid::Uuid, model_id: ModelId, kind: ErrorKind },
    CircuitOpened { model_id: ModelId },
    CircuitClosed { model_id: ModelId },
    CacheHit { request_id: uuid::Uuid },
    CacheEvicted { key: String },
    MemoryPressure { used_mb: u64, limit_mb: u64 },
    /// A model was pulled out of rotation after a `ModelCorrupt` error
    /// (§4.8) and moved to `Lifecycle::Quarantined`.
    ModelQuarantined { model_id: ModelId },
    /// A model was unloaded and returned to `Lifecycle::Registered` to make
    /// room for a higher-priority allocation (§4.5).
    ModelEvicted { model_id: ModelId },
}
