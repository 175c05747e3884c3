pub mod events;
pub mod health;
pub mod model;
pub mod request;
pub mod response;

pub use events::OrchestratorEvent;
pub use health::{HealthRecord, HealthStatus};
pub use model::{Lifecycle, Model, ModelId, ModelRecord, Tier};
pub use request::{InferenceRequest, Priority, RequestConstraints};
pub use response::{InferenceResult, RouteDecision, StreamChunk, TokenUsage};
