//! Bounded CPU-bound worker pool (§4.10), used for work that shouldn't run
//! on the async executor's own threads (ensemble combination, tokenization).
//! `ArrayQueue` gives lock-free push/pop; `Notify` wakes idle workers
//! instead of spinning.

use crossbeam_queue::ArrayQueue;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::config::PoolConfig;
use crate::utils::error::{OrchestratorError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    queue: Arc<ArrayQueue<Job>>,
    notify: Arc<Notify>,
    worker_count: usize,
    shutdown: Arc<Notify>,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Arc<Self> {
        let worker_count = if config.worker_count == 0 {
            num_cpus::get()
        } else {
            config.worker_count
        };
        let pool = Arc::new(Self {
            queue: Arc::new(ArrayQueue::new(config.queue_capacity.max(1))),
            notify: Arc::new(Notify::new()),
            worker_count,
            shutdown: Arc::new(Notify::new()),
        });
        pool.clone().spawn_workers();
        pool
    }

    fn spawn_workers(self: Arc<Self>) {
        for _ in 0..self.worker_count {
            let queue = self.queue.clone();
            let notify = self.notify.clone();
            let shutdown = self.shutdown.clone();
            tokio::task::spawn_blocking(move || loop {
                match queue.pop() {
                    Some(job) => job(),
                    None => {
                        let wait = notify.notified();
                        let shutdown_wait = shutdown.notified();
                        tokio::runtime::Handle::current().block_on(async {
                            tokio::select! {
                                _ = wait => {}
                                _ = shutdown_wait => {}
                            }
                        });
                        if queue.is_empty() {
                            continue;
                        }
                    }
                }
            });
        }
    }

    /// Submit a CPU-bound closure. Errors with `ResourceBusy` if the queue
    /// is full rather than blocking the caller.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue
            .push(Box::new(job))
            .map_err(|_| OrchestratorError::ResourceBusy {
                message: "worker pool queue is full".into(),
            })?;
        self.notify.notify_one();
        Ok(())
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}
