//! Circuit breaker for the self-healing monitor (§4.9).
//!
//! Closed -> Open on `failure_threshold` consecutive failures within the
//! rolling window. Open -> HalfOpen after `cooldown`. HalfOpen allows a
//! single probe; success closes, failure reopens and doubles the cooldown up
//! to `max_cooldown`.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl From<u8> for CircuitState {
    fn from(v: u8) -> Self {
        match v {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            _ => CircuitState::HalfOpen,
        }
    }
}

impl From<CircuitState> for u8 {
    fn from(s: CircuitState) -> Self {
        match s {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub cooldown: Duration,
    pub max_cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            cooldown: Duration::from_secs(30),
            max_cooldown: Duration::from_secs(600),
        }
    }
}

/// Per-model circuit breaker. Lock-free: all state lives in atomics so the
/// hot path (`allow`/`record_*`) never blocks on a mutex.
pub struct CircuitBreaker {
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
    opened_at_millis: AtomicU64,
    current_cooldown_millis: AtomicU64,
    epoch: Instant,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Arc<Self> {
        let cooldown_millis = config.cooldown.as_millis() as u64;
        Arc::new(Self {
            state: AtomicU8::new(CircuitState::Closed.into()),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            opened_at_millis: AtomicU64::new(0),
            current_cooldown_millis: AtomicU64::new(cooldown_millis),
            epoch: Instant::now(),
            config,
        })
    }

    fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn state(&self) -> CircuitState {
        self.maybe_transition_to_half_open();
        self.state.load(Ordering::Acquire).into()
    }

    fn maybe_transition_to_half_open(&self) {
        if CircuitState::from(self.state.load(Ordering::Acquire)) != CircuitState::Open {
            return;
        }
        let opened_at = self.opened_at_millis.load(Ordering::Acquire);
        let cooldown = self.current_cooldown_millis.load(Ordering::Acquire);
        if self.now_millis().saturating_sub(opened_at) >= cooldown {
            let _ = self.state.compare_exchange(
                CircuitState::Open.into(),
                CircuitState::HalfOpen.into(),
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    /// Whether a request is currently allowed through this breaker.
    pub fn allow(&self) -> bool {
        !matches!(self.state(), CircuitState::Open)
    }

    /// Recent failure rate in `[0, 1]`, derived from consecutive
    /// failures against the configured threshold. Feeds the router's
    /// `recent_failure_rate` scoring feature (§4.2).
    pub fn failure_ratio(&self) -> f64 {
        let failures = self.consecutive_failures.load(Ordering::Acquire) as f64;
        let threshold = self.config.failure_threshold.max(1) as f64;
        (failures / threshold).min(1.0)
    }

    pub fn record_success(&self) {
        match self.state() {
            CircuitState::HalfOpen => {
                let successes = self.consecutive_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.success_threshold {
                    self.close();
                }
            }
            _ => {
                self.consecutive_failures.store(0, Ordering::Release);
            }
        }
    }

    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::HalfOpen => self.reopen_with_backoff(),
            _ => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    self.open();
                }
            }
        }
    }

    fn open(&self) {
        self.state.store(CircuitState::Open.into(), Ordering::Release);
        self.opened_at_millis.store(self.now_millis(), Ordering::Release);
    }

    fn reopen_with_backoff(&self) {
        let current = self.current_cooldown_millis.load(Ordering::Acquire);
        let max = self.config.max_cooldown.as_millis() as u64;
        let next = (current.saturating_mul(2)).min(max.max(current));
        self.current_cooldown_millis.store(next, Ordering::Release);
        self.consecutive_successes.store(0, Ordering::Release);
        self.open();
    }

    fn close(&self) {
        self.state.store(CircuitState::Closed.into(), Ordering::Release);
        self.consecutive_failures.store(0, Ordering::Release);
        self.consecutive_successes.store(0, Ordering::Release);
        self.current_cooldown_millis
            .store(self.config.cooldown.as_millis() as u64, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> Arc<CircuitBreaker> {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 1,
            cooldown: Duration::from_millis(20),
            max_cooldown: Duration::from_secs(1),
        })
    }

    #[test]
    fn opens_after_threshold_failures() {
        let cb = breaker();
        assert!(cb.allow());
        cb.record_failure();
        cb.record_failure();
        assert!(cb.allow());
        cb.record_failure();
        assert!(!cb.allow());
    }

    #[test]
    fn half_opens_after_cooldown_and_closes_on_success() {
        let cb = breaker();
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();
        assert!(!cb.allow());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cb.allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn failed_probe_doubles_cooldown() {
        let cb = breaker();
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(30));
        assert!(cb.allow());
        cb.record_failure();
        assert!(!cb.allow());
        assert_eq!(cb.current_cooldown_millis.load(Ordering::Acquire), 40);
    }
}
