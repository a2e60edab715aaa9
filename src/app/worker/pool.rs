//! Worker pool lifecycle
//!
//! Spawns the configured number of [`FetchWorker`] tasks, owns the shutdown
//! flag they observe, and on shutdown joins every task and collects the
//! counters each worker published on exit into a map keyed by worker id.
//! Joining before the map is read is what makes the unlocked read safe.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::client::TileFetcher;
use crate::app::queue::WorkQueue;
use crate::app::server::ServerSpec;
use crate::constants::workers;
use crate::errors::QueueError;

use super::core::FetchWorker;
use super::stats::WorkerStats;

/// Settings shared by all workers in a pool
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent workers
    pub worker_count: usize,
    /// Root directory for the zoom/column/row tree
    pub output_root: PathBuf,
    /// Overwrite existing tiles instead of skipping them
    pub force: bool,
    /// Bounded wait used by workers on an empty queue
    pub dequeue_timeout: Duration,
}

impl WorkerConfig {
    pub fn new(worker_count: usize, output_root: PathBuf, force: bool) -> Self {
        Self {
            worker_count,
            output_root,
            force,
            dequeue_timeout: workers::DEQUEUE_TIMEOUT,
        }
    }
}

/// Pool of fetch workers sharing one queue and one shutdown flag
pub struct WorkerPool {
    handles: Vec<JoinHandle<(usize, WorkerStats)>>,
    shutdown_tx: watch::Sender<bool>,
}

impl WorkerPool {
    /// Spawn `config.worker_count` workers immediately
    pub fn spawn(
        config: &WorkerConfig,
        queue: Arc<WorkQueue>,
        fetcher: Arc<dyn TileFetcher>,
        server: Arc<ServerSpec>,
        extension: &str,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        info!("Starting {} fetch workers", config.worker_count);
        let mut handles = Vec::with_capacity(config.worker_count);
        for id in 0..config.worker_count {
            let worker = FetchWorker::new(
                id,
                queue.clone(),
                fetcher.clone(),
                server.clone(),
                config.output_root.clone(),
                extension.to_string(),
                config.force,
                config.dequeue_timeout,
                shutdown_tx.subscribe(),
            );
            handles.push(tokio::spawn(worker.run()));
        }

        Self {
            handles,
            shutdown_tx,
        }
    }

    /// Number of spawned workers
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Signal workers to stop, wait for all of them to exit, and collect
    /// their published counters keyed by worker id.
    ///
    /// Setting the flag is idempotent; workers with buffered items still
    /// drain them before exiting.
    pub async fn shutdown(self) -> Result<HashMap<usize, WorkerStats>, QueueError> {
        let _ = self.shutdown_tx.send(true);

        let joined = futures::future::join_all(self.handles).await;
        let mut results = HashMap::with_capacity(joined.len());
        for (index, outcome) in joined.into_iter().enumerate() {
            match outcome {
                Ok((id, stats)) => {
                    results.insert(id, stats);
                }
                Err(e) => {
                    warn!("Worker {} lost before publishing stats: {}", index, e);
                    return Err(QueueError::WorkerLost { worker_id: index });
                }
            }
        }

        info!("All {} workers joined", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{BoundingBox, FetchRequest, TileCoordinate};
    use crate::errors::FetchResult;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    struct OkFetcher;

    #[async_trait]
    impl TileFetcher for OkFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _params: &BTreeMap<String, String>,
        ) -> FetchResult<Vec<u8>> {
            Ok(b"tile".to_vec())
        }
    }

    fn test_server() -> Arc<ServerSpec> {
        let json = r#"{
            "url": "https://maps.example.com/wms",
            "parameter": {"format": "image/png", "srs": "EPSG:3857"},
            "concurrency": 3
        }"#;
        Arc::new(serde_json::from_str(json).unwrap())
    }

    #[tokio::test]
    async fn test_pool_spawns_and_joins_all_workers() {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(WorkQueue::new());
        let mut config = WorkerConfig::new(3, dir.path().to_path_buf(), false);
        config.dequeue_timeout = Duration::from_millis(10);

        let pool = WorkerPool::spawn(
            &config,
            queue.clone(),
            Arc::new(OkFetcher),
            test_server(),
            "png",
        );
        assert_eq!(pool.worker_count(), 3);

        for column in 0..10 {
            queue
                .enqueue(FetchRequest::new(
                    TileCoordinate::new(column, 0, 4),
                    BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                ))
                .await;
        }

        queue.wait_until_drained().await;
        let results = pool.shutdown().await.unwrap();

        // Every worker publishes exactly once, keyed by its own id
        assert_eq!(results.len(), 3);
        assert!(results.keys().all(|id| *id < 3));

        let total: u64 = results.values().map(|s| s.total_seen).sum();
        let succeeded: u64 = results.values().map(|s| s.succeeded).sum();
        assert_eq!(total, 10);
        assert_eq!(succeeded, 10);
    }

    #[tokio::test]
    async fn test_pool_shutdown_with_no_work() {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(WorkQueue::new());
        let mut config = WorkerConfig::new(2, dir.path().to_path_buf(), false);
        config.dequeue_timeout = Duration::from_millis(10);

        let pool = WorkerPool::spawn(&config, queue, Arc::new(OkFetcher), test_server(), "png");
        let results = pool.shutdown().await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.values().all(|s| *s == WorkerStats::default()));
    }
}
