//! Stream processor (§4.6): forwards loader-produced chunks to the caller
//! over an mpsc channel, generalized from the teacher's `StreamingHandler`
//! (spawn a forwarding task, `ReceiverStream` on the consumer side,
//! drop-to-cancel semantics). The inner channel the loader writes into is
//! sized to the configured high-water mark, so a slow/stalled caller applies
//! real backpressure all the way back to the loader's own `send().await`
//! instead of chunks being silently dropped once a mark is crossed.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::StreamingConfig;
use crate::core::loader::SharedLoader;
use crate::core::types::{InferenceRequest, StreamChunk};
use crate::utils::error::Result;

use super::types::StreamMonitor;

pub struct StreamProcessor {
    config: StreamingConfig,
    monitor: Arc<StreamMonitor>,
}

impl StreamProcessor {
    pub fn new(config: StreamingConfig) -> Self {
        Self {
            config,
            monitor: Arc::new(StreamMonitor::default()),
        }
    }

    pub fn monitor(&self) -> Arc<StreamMonitor> {
        self.monitor.clone()
    }

    /// Start streaming inference from `loader`, returning a `ReceiverStream`
    /// of chunks. Dropping the returned stream closes the channel, which the
    /// loader observes as a send failure and treats as cancellation.
    pub fn start(
        &self,
        loader: SharedLoader,
        request: InferenceRequest,
    ) -> ReceiverStream<StreamChunk> {
        let capacity = self.config.channel_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let monitor = self.monitor.clone();
        let inner_capacity = self.config.high_water_mark.max(1);

        tokio::spawn(async move {
            let (inner_tx, mut inner_rx) = mpsc::channel(inner_capacity);
            let infer_task = tokio::spawn({
                let request = request.clone();
                async move { loader.infer_stream(&request, inner_tx).await }
            });

            // `inner_tx` is bounded at `high_water_mark`: once the caller
            // stops draining `rx`, this loop suspends on `tx.send`, which
            // stops draining `inner_rx`, which fills `inner_tx` and suspends
            // the loader's own `send().await` in `infer_stream`.
            while let Some(chunk) = inner_rx.recv().await {
                if tx.send(chunk).await.is_err() {
                    break;
                }
                monitor.record_sent();
            }

            let _ = infer_task.await;
        });

        ReceiverStream::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::MockLoader;
    use futures::StreamExt;

    #[tokio::test]
    async fn streams_chunks_until_finished() {
        let processor = StreamProcessor::new(StreamingConfig::default());
        let loader: SharedLoader = Arc::new(MockLoader::new("m1"));
        let request = InferenceRequest::new("hello world").with_stream(true);
        let mut stream = processor.start(loader, request);
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk);
        }
        assert!(!chunks.is_empty());
        assert!(chunks.last().unwrap().finished);
    }

    #[tokio::test]
    async fn slow_consumer_suspends_instead_of_dropping_chunks() {
        use crate::core::loader::SimpleLoader;
        use std::time::Duration;

        let mut config = StreamingConfig::default();
        config.channel_capacity = 1;
        config.high_water_mark = 1;
        let processor = StreamProcessor::new(config);
        let loader: SharedLoader = Arc::new(SimpleLoader::new("m1", Duration::from_millis(1)));
        let request = InferenceRequest::new("one two three four five").with_stream(true);
        let monitor = processor.monitor();

        let mut stream = processor.start(loader, request);
        // Don't drain yet; give the producer time to fill the tiny buffers
        // and block on send rather than dropping anything.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(monitor.chunks_sent(), 0);

        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk);
        }
        assert_eq!(chunks.len(), 5);
        assert_eq!(monitor.chunks_sent(), 5);
    }

    #[tokio::test]
    async fn dropping_receiver_cancels_producer() {
        let processor = StreamProcessor::new(StreamingConfig::default());
        let loader: SharedLoader = Arc::new(MockLoader::new("m1"));
        let request = InferenceRequest::new("a b c").with_stream(true);
        let stream = processor.start(loader, request);
        drop(stream);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
