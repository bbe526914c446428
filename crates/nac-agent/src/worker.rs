//! Blocking pool for ABE work
//!
//! Pairing arithmetic takes milliseconds per attribute, far too long for the
//! reactor. Jobs run on tokio's blocking threads, bounded by a semaphore.

use nac_core::{NacError, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bounded executor for CPU-heavy jobs
#[derive(Debug, Clone)]
pub struct CryptoWorker {
    permits: Arc<Semaphore>,
}

impl CryptoWorker {
    /// Worker running at most `max_concurrent` jobs at once
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run `job` off the async threads and wait for its result
    pub async fn run<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| NacError::internal("crypto worker closed"))?;
        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| NacError::internal(format!("crypto job failed: {e}")))?
    }

    /// Run `job` in the background and hand its result to `continuation`
    pub fn submit<T, F, C>(&self, job: F, continuation: C)
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
        C: FnOnce(Result<T>) + Send + 'static,
    {
        let worker = self.clone();
        tokio::spawn(async move {
            continuation(worker.run(job).await);
        });
    }

    /// Jobs that could start right now
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
