//! Idempotent `tracing` subscriber setup.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Initialize the global tracing subscriber. Safe to call more than once;
/// only the first call has effect.
pub fn init(json: bool) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,model_orchestration_core=debug"));
        let subscriber = fmt().with_env_filter(filter).with_target(true);
        if json {
            subscriber.json().init();
        } else {
            subscriber.init();
        }
    });
}
