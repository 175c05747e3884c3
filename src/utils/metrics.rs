//! Optional Prometheus metrics surface, gated behind the `metrics` feature
//! (on by default, matching the teacher's stack). Kept separate from the
//! hot-path counters in `core::cache`/`core::streaming` so those stay
//! dependency-free when the feature is off.

#[cfg(feature = "metrics")]
pub use enabled::Metrics;

#[cfg(not(feature = "metrics"))]
pub use disabled::Metrics;

#[cfg(feature = "metrics")]
mod enabled {
    use prometheus::{Encoder, Gauge, Registry, TextEncoder};
    use sysinfo::System;

    pub struct Metrics {
        registry: Registry,
        memory_used_mb: Gauge,
        cache_hit_rate: Gauge,
        active_requests: Gauge,
        system: parking_lot::Mutex<System>,
    }

    impl Metrics {
        pub fn new() -> Self {
            let registry = Registry::new();
            let memory_used_mb = Gauge::new("orchestrator_memory_used_mb", "Allocated model memory in MB").unwrap();
            let cache_hit_rate = Gauge::new("orchestrator_cache_hit_rate", "Cache hit rate, 0..1").unwrap();
            let active_requests = Gauge::new("orchestrator_active_requests", "In-flight inference requests").unwrap();
            registry.register(Box::new(memory_used_mb.clone())).unwrap();
            registry.register(Box::new(cache_hit_rate.clone())).unwrap();
            registry.register(Box::new(active_requests.clone())).unwrap();
            Self {
                registry,
                memory_used_mb,
                cache_hit_rate,
                active_requests,
                system: parking_lot::Mutex::new(System::new()),
            }
        }

        pub fn set_memory_used_mb(&self, value: u64) {
            self.memory_used_mb.set(value as f64);
        }

        pub fn set_cache_hit_rate(&self, value: f64) {
            self.cache_hit_rate.set(value);
        }

        pub fn set_active_requests(&self, value: u64) {
            self.active_requests.set(value as f64);
        }

        /// Refresh the host-level sample (used to sanity-check that the
        /// process isn't itself starving the box it runs on).
        pub fn host_memory_used_mb(&self) -> u64 {
            let mut system = self.system.lock();
            system.refresh_memory();
            system.used_memory() / 1024 / 1024
        }

        pub fn render(&self) -> String {
            let encoder = TextEncoder::new();
            let metric_families = self.registry.gather();
            let mut buffer = Vec::new();
            encoder.encode(&metric_families, &mut buffer).unwrap();
            String::from_utf8(buffer).unwrap_or_default()
        }
    }

    impl Default for Metrics {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(not(feature = "metrics"))]
mod disabled {
    #[derive(Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self {
            Self
        }
        pub fn set_memory_used_mb(&self, _value: u64) {}
        pub fn set_cache_hit_rate(&self, _value: f64) {}
        pub fn set_active_requests(&self, _value: u64) {}
        pub fn host_memory_used_mb(&self) -> u64 {
            0
        }
        pub fn render(&self) -> String {
            String::new()
        }
    }
}
