pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{load_dotenv, load_from_file, load_from_str};
pub use models::{
    CacheConfig, MemoryConfig, ObservabilityConfig, OrchestratorConfig, PoolConfig,
    RedisTierConfig, ResilienceConfig, RouterConfig, StreamingConfig,
};
