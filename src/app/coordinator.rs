//! Pipeline orchestration
//!
//! The coordinator is the dispatcher and shutdown authority. It walks the
//! state machine `Starting -> Running -> Draining -> Stopped`: spawn the
//! worker pool, enqueue the lazy source in order, wait for the queue to
//! drain, set the shutdown flag, join every worker, and only then fold the
//! published counters into the final report. The join is the happens-before
//! edge that makes the unlocked statistics read safe.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::constants::progress;
use crate::errors::{Result, SourceError};

use super::client::TileFetcher;
use super::queue::WorkQueue;
use super::server::ServerSpec;
use super::tiles::TileSourceIter;
use super::worker::{AggregateResult, WorkerConfig, WorkerPool, WorkerStats};

/// Dispatcher lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Workers are being spawned
    Starting,
    /// The source is being enumerated and enqueued
    Running,
    /// Source exhausted; waiting for outstanding items
    Draining,
    /// Shutdown signalled, workers joined
    Stopped,
}

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Settings passed to every worker
    pub worker: WorkerConfig,
    /// Render a drain progress bar on stderr
    pub show_progress: bool,
}

/// Final report of one pipeline run
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// Folded outcome across all workers
    pub aggregate: AggregateResult,
    /// Counters as published by each worker, keyed by worker id
    pub per_worker: HashMap<usize, WorkerStats>,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

/// Dispatcher and shutdown coordinator for one fetch run
pub struct Coordinator {
    config: CoordinatorConfig,
    queue: Arc<WorkQueue>,
    fetcher: Arc<dyn TileFetcher>,
    server: Arc<ServerSpec>,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        queue: Arc<WorkQueue>,
        fetcher: Arc<dyn TileFetcher>,
        server: Arc<ServerSpec>,
    ) -> Self {
        Self {
            config,
            queue,
            fetcher,
            server,
        }
    }

    /// Run the pipeline over the given source to completion.
    ///
    /// A source enumeration error stops intake but still drains the items
    /// already enqueued and joins all workers before the error is returned;
    /// tiles fetched up to that point remain on disk.
    pub async fn run(self, source: TileSourceIter) -> Result<FetchReport> {
        let started = Instant::now();
        let mut state = PipelineState::Starting;
        debug!("Pipeline state: {:?}", state);

        let extension = self.server.file_extension()?;
        let pool = WorkerPool::spawn(
            &self.config.worker,
            self.queue.clone(),
            self.fetcher.clone(),
            self.server.clone(),
            extension,
        );

        let (progress_stop_tx, progress_stop_rx) = watch::channel(false);
        let progress_handle = self
            .config
            .show_progress
            .then(|| spawn_progress_task(self.queue.clone(), progress_stop_rx));

        state = PipelineState::Running;
        debug!("Pipeline state: {:?}", state);

        let mut source_error: Option<SourceError> = None;
        for item in source {
            match item {
                Ok(request) => self.queue.enqueue(request).await,
                Err(e) => {
                    warn!("Tile source failed, stopping intake: {}", e);
                    source_error = Some(e);
                    break;
                }
            }
        }

        state = PipelineState::Draining;
        debug!("Pipeline state: {:?}", state);
        self.queue.wait_until_drained().await;

        state = PipelineState::Stopped;
        debug!("Pipeline state: {:?}", state);

        let _ = progress_stop_tx.send(true);
        if let Some(handle) = progress_handle {
            let _ = handle.await;
        }

        // Join first, read after: workers publish their counters at exit
        let per_worker = pool.shutdown().await?;
        let aggregate = AggregateResult::from_worker_map(&per_worker);

        let duration = started.elapsed();
        info!("Pipeline finished in {:?}: {}", duration, aggregate);

        if let Some(e) = source_error {
            return Err(e.into());
        }

        Ok(FetchReport {
            aggregate,
            per_worker,
            duration,
        })
    }
}

/// Background task refreshing a progress bar from queue counters
fn spawn_progress_task(
    queue: Arc<WorkQueue>,
    mut stop_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{pos}/{len} tiles [{elapsed}] {wide_bar}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        loop {
            let stats = queue.stats().await;
            bar.set_length(stats.total_enqueued);
            bar.set_position(stats.total_enqueued - stats.outstanding);

            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(progress::UPDATE_INTERVAL) => {}
            }
        }

        let stats = queue.stats().await;
        bar.set_length(stats.total_enqueued);
        bar.set_position(stats.total_enqueued - stats.outstanding);
        bar.finish_and_clear();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{BoundingBox, FetchRequest, TileCoordinate};
    use crate::errors::{AppError, FetchError, FetchResult};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::TempDir;

    /// Fetcher that fails every N-th request
    struct PatternFetcher {
        calls: AtomicU64,
        fail_every: u64,
    }

    #[async_trait]
    impl TileFetcher for PatternFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _params: &BTreeMap<String, String>,
        ) -> FetchResult<Vec<u8>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_every > 0 && call % self.fail_every == 0 {
                Err(FetchError::Status { status: 503 })
            } else {
                Ok(b"tile".to_vec())
            }
        }
    }

    fn test_server() -> Arc<ServerSpec> {
        let json = r#"{
            "url": "https://maps.example.com/wms",
            "parameter": {"format": "image/png", "srs": "EPSG:4326"},
            "concurrency": 2
        }"#;
        Arc::new(serde_json::from_str(json).unwrap())
    }

    fn requests(count: u32) -> TileSourceIter {
        Box::new((0..count).map(|column| {
            Ok(FetchRequest::new(
                TileCoordinate::new(column, 0, 8),
                BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            ))
        }))
    }

    fn coordinator(dir: &TempDir, fail_every: u64) -> Coordinator {
        let mut worker = WorkerConfig::new(2, dir.path().to_path_buf(), false);
        worker.dequeue_timeout = Duration::from_millis(10);
        Coordinator::new(
            CoordinatorConfig {
                worker,
                show_progress: false,
            },
            Arc::new(WorkQueue::new()),
            Arc::new(PatternFetcher {
                calls: AtomicU64::new(0),
                fail_every,
            }),
            test_server(),
        )
    }

    #[tokio::test]
    async fn test_run_to_completion() {
        let dir = TempDir::new().unwrap();
        let report = coordinator(&dir, 0).run(requests(20)).await.unwrap();

        assert_eq!(report.aggregate.total, 20);
        assert_eq!(report.aggregate.succeeded, 20);
        assert_eq!(report.aggregate.failed, 0);
        assert_eq!(report.aggregate.skipped, 0);
        assert_eq!(report.per_worker.len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_fatal() {
        let dir = TempDir::new().unwrap();
        let report = coordinator(&dir, 4).run(requests(20)).await.unwrap();

        assert_eq!(report.aggregate.total, 20);
        assert_eq!(report.aggregate.failed, 5);
        assert_eq!(report.aggregate.succeeded, 15);
    }

    #[tokio::test]
    async fn test_empty_source_yields_zero_report() {
        let dir = TempDir::new().unwrap();
        let report = coordinator(&dir, 0).run(requests(0)).await.unwrap();

        assert_eq!(report.aggregate, AggregateResult::default());
        // Every worker still publishes a (zero) contribution
        assert_eq!(report.per_worker.len(), 2);
    }

    #[tokio::test]
    async fn test_source_error_drains_then_propagates() {
        let dir = TempDir::new().unwrap();

        let source: TileSourceIter = Box::new(
            (0..5u32)
                .map(|column| {
                    Ok(FetchRequest::new(
                        TileCoordinate::new(column, 0, 8),
                        BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                    ))
                })
                .chain(std::iter::once(Err(SourceError::InvalidZoomSpec {
                    spec: "bogus".to_string(),
                }))),
        );

        let result = coordinator(&dir, 0).run(source).await;
        assert!(matches!(result, Err(AppError::Source(_))));

        // Items enqueued before the error were still processed to disk
        assert!(dir.path().join("8/0/0.png").is_file());
        assert!(dir.path().join("8/4/0.png").is_file());
    }
}
