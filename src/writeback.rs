//! Background write-back of fetched records
//!
//! A fixed pool of tokio workers drains a bounded queue of store writes.
//! Submitting never waits: when the queue is full the write is dropped and
//! the next request for that part simply misses the cache again. Outcomes are
//! logged, never reported to the submitter.

use crate::store::{CacheKey, Store};
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, info, warn};

/// Configuration for the write-back pool
#[derive(Debug, Clone)]
pub struct WriteBackConfig {
    /// Number of worker tasks
    pub workers: usize,
    /// Maximum queued writes
    pub queue_size: usize,
}

impl Default for WriteBackConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_size: 256,
        }
    }
}

/// Write queued for a worker
struct WriteJob {
    key: CacheKey,
    data: Bytes,
}

/// Jobs submitted but not yet finished
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Handle to the write-back pool; cheap to clone
#[derive(Clone)]
pub struct WriteBack {
    job_tx: mpsc::Sender<WriteJob>,
    pending: Arc<Pending>,
}

impl WriteBack {
    /// Start the worker pool. Must be called inside a tokio runtime.
    pub fn new(store: Arc<dyn Store>, config: WriteBackConfig) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<WriteJob>(config.queue_size.max(1));
        let job_rx = Arc::new(Mutex::new(job_rx));
        let pending = Arc::new(Pending {
            count: AtomicUsize::new(0),
            idle: Notify::new(),
        });

        let workers = config.workers.max(1);
        for worker_id in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let store = Arc::clone(&store);
            let pending = Arc::clone(&pending);
            tokio::spawn(async move {
                worker_task(worker_id, job_rx, store, pending).await;
            });
        }

        info!(workers, queue_size = config.queue_size, "Write-back pool started");

        Self { job_tx, pending }
    }

    /// Queue a write without waiting for it.
    ///
    /// Returns `false` if the write was dropped (queue full or pool stopped).
    pub fn submit(&self, key: CacheKey, data: Bytes) -> bool {
        self.pending.count.fetch_add(1, Ordering::SeqCst);
        match self.job_tx.try_send(WriteJob { key, data }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(key = %job.key, "Write-back queue full, dropping write");
                self.pending.finish();
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(key = %job.key, "Write-back pool stopped, dropping write");
                self.pending.finish();
                false
            }
        }
    }

    /// Number of writes submitted and not yet finished
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    /// Wait until every submitted write has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.pending.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

async fn worker_task(
    worker_id: usize,
    job_rx: Arc<Mutex<mpsc::Receiver<WriteJob>>>,
    store: Arc<dyn Store>,
    pending: Arc<Pending>,
) {
    loop {
        let job = {
            let mut rx = job_rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            debug!(worker_id, "Write-back worker exiting");
            return;
        };

        match store.put(&job.key, job.data).await {
            Ok(()) => debug!(worker_id, key = %job.key, "Write-back persisted"),
            Err(e) => warn!(worker_id, key = %job.key, error = %e, "Write-back failed"),
        }
        pending.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{MemoryStore, Namespace};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[tokio::test]
    async fn test_submit_then_wait_idle() {
        let store = Arc::new(MemoryStore::new());
        let writeback = WriteBack::new(store.clone(), WriteBackConfig::default());

        for i in 0..10 {
            assert!(writeback.submit(
                CacheKey::extended(&format!("BBa_{}", i)),
                Bytes::from_static(b"{}")
            ));
        }
        writeback.wait_idle().await;

        assert_eq!(writeback.pending(), 0);
        assert_eq!(store.len().await, 10);
    }

    #[tokio::test]
    async fn test_failed_write_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let writeback = WriteBack::new(store.clone(), WriteBackConfig::default());

        assert!(writeback.submit(CacheKey::extended("BBa_B0034"), Bytes::from_static(b"{}")));
        writeback.wait_idle().await;

        store.set_failing(false);
        assert!(store.is_empty().await);
    }

    /// Store whose writes wait until the test opens the gate
    struct GatedStore {
        inner: MemoryStore,
        gate: Semaphore,
    }

    #[async_trait]
    impl Store for GatedStore {
        async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StoreError> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &CacheKey, value: Bytes) -> Result<(), StoreError> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            self.inner.put(key, value).await
        }

        async fn get_all(&self, namespace: &Namespace) -> Result<Vec<Bytes>, StoreError> {
            self.inner.get_all(namespace).await
        }

        async fn delete_all(&self, namespace: &Namespace) -> Result<(), StoreError> {
            self.inner.delete_all(namespace).await
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_write() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            gate: Semaphore::new(0),
        });
        let writeback = WriteBack::new(
            store.clone(),
            WriteBackConfig {
                workers: 1,
                queue_size: 1,
            },
        );

        // One job can sit in the worker and one in the queue, no more
        let accepted = (0..3)
            .filter(|i| {
                writeback.submit(
                    CacheKey::extended(&format!("BBa_{}", i)),
                    Bytes::from_static(b"{}"),
                )
            })
            .count();
        assert!(accepted < 3);
        assert_eq!(writeback.pending(), accepted);

        tokio::task::yield_now().await;
        assert_eq!(writeback.pending(), accepted);

        store.gate.add_permits(1);
        tokio::time::timeout(Duration::from_secs(5), writeback.wait_idle())
            .await
            .expect("write-back did not drain");

        assert_eq!(writeback.pending(), 0);
        assert_eq!(store.inner.len().await, accepted);
    }

    #[tokio::test]
    async fn test_wait_idle_without_jobs() {
        let writeback = WriteBack::new(Arc::new(MemoryStore::new()), WriteBackConfig::default());
        writeback.wait_idle().await;
    }
}
