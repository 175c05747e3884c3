use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub strategy: String,
    pub weight_latency: f64,
    pub weight_cost: f64,
    pub weight_load: f64,
    pub weight_quality: f64,
    pub weight_failure_rate: f64,
    pub weight_capability: f64,
    pub weight_format_preference: f64,
    pub route_cache_size: usize,
    pub route_cache_ttl_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strategy: "weighted".into(),
            weight_latency: 0.25,
            weight_cost: 0.2,
            weight_load: 0.15,
            weight_quality: 0.2,
            weight_failure_rate: 0.1,
            weight_capability: 0.06,
            weight_format_preference: 0.04,
            route_cache_size: 1024,
            route_cache_ttl_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub l1_capacity: usize,
    pub l1_ttl_secs: u64,
    pub l2_enabled: bool,
    pub l2_dir: String,
    pub l2_ttl_secs: u64,
    #[serde(rename = "redis_tier")]
    pub l3: Option<RedisTierConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_capacity: 512,
            l1_ttl_secs: 300,
            l2_enabled: true,
            l2_dir: "./data/cache".into(),
            l2_ttl_secs: 3600,
            l3: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisTierConfig {
    pub url: String,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub total_budget_mb: u64,
    pub high_water_mark_ratio: f64,
    pub pool_slab_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            total_budget_mb: 16_384,
            high_water_mark_ratio: 0.9,
            pool_slab_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub cooldown_ms: u64,
    pub max_cooldown_ms: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub health_check_interval_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            cooldown_ms: 30_000,
            max_cooldown_ms: 600_000,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 5_000,
            health_check_interval_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 0, // 0 => derive from num_cpus at startup
            queue_capacity: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub channel_capacity: usize,
    pub high_water_mark: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            high_water_mark: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    #[serde(default = "default_true")]
    pub json_logs: bool,
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            metrics_enabled: cfg!(feature = "metrics"),
        }
    }
}

/// Root configuration document, loaded from YAML + environment overlay
/// (§6, "Configuration").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub router: RouterConfig,
    pub cache: CacheConfig,
    pub memory: MemoryConfig,
    pub resilience: ResilienceConfig,
    pub pool: PoolConfig,
    pub streaming: StreamingConfig,
    pub observability: ObservabilityConfig,
}

impl ResilienceConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
    pub fn max_cooldown(&self) -> Duration {
        Duration::from_millis(self.max_cooldown_ms)
    }
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
}
