use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct StreamMonitor {
    chunks_sent: AtomicU64,
}

impl StreamMonitor {
    pub fn record_sent(&self) {
        self.chunks_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent.load(Ordering::Relaxed)
    }
}
