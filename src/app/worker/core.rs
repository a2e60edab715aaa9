//! Fetch worker loop
//!
//! One [`FetchWorker`] is one concurrent execution unit. It pulls requests
//! from the shared queue with a bounded wait, applies the skip-if-exists
//! policy, fetches through the [`TileFetcher`] capability, writes the tile,
//! and marks the item done whatever the outcome. A fetch failure is a
//! counted event, not an error to the caller; the loop simply continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::app::client::TileFetcher;
use crate::app::models::FetchRequest;
use crate::app::queue::WorkQueue;
use crate::app::server::ServerSpec;
use crate::errors::FetchError;

use super::stats::WorkerStats;

/// A single fetch worker
pub struct FetchWorker {
    id: usize,
    queue: Arc<WorkQueue>,
    fetcher: Arc<dyn TileFetcher>,
    server: Arc<ServerSpec>,
    output_root: PathBuf,
    /// File extension derived from the server's declared format
    extension: String,
    force: bool,
    dequeue_timeout: Duration,
    shutdown_rx: watch::Receiver<bool>,
    stats: WorkerStats,
}

impl FetchWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        queue: Arc<WorkQueue>,
        fetcher: Arc<dyn TileFetcher>,
        server: Arc<ServerSpec>,
        output_root: PathBuf,
        extension: String,
        force: bool,
        dequeue_timeout: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            queue,
            fetcher,
            server,
            output_root,
            extension,
            force,
            dequeue_timeout,
            shutdown_rx,
            stats: WorkerStats::default(),
        }
    }

    /// Run until the shutdown flag is set and the queue is idle.
    ///
    /// Returns the worker's final counters; the pool keys them by worker id
    /// once the task is joined, which is the only publication point.
    pub async fn run(mut self) -> (usize, WorkerStats) {
        info!("Worker {} starting", self.id);

        loop {
            // Exit only when told to stop AND nothing is ready; a set flag
            // with items still buffered means keep consuming
            if *self.shutdown_rx.borrow() && self.queue.is_empty().await {
                break;
            }

            match self.queue.dequeue(self.dequeue_timeout).await {
                Some(request) => self.process(request).await,
                // Timed out: loop back to re-check the shutdown flag
                None => continue,
            }
        }

        info!(
            "Worker {} exiting: {} seen, {} attempted, {} ok",
            self.id, self.stats.total_seen, self.stats.attempted, self.stats.succeeded
        );
        (self.id, self.stats)
    }

    /// Handle one dequeued request; always ends in `mark_done`
    async fn process(&mut self, request: FetchRequest) {
        self.stats.record_seen();

        let tile = request.coordinate;
        let out_file = tile.output_path(&self.output_root, &self.extension);

        // Skip-if-exists: counted in total_seen but not attempted
        if !self.force && tile_exists(&out_file).await {
            debug!("Worker {} skipping existing tile {}", self.id, tile);
            self.queue.mark_done();
            return;
        }

        self.stats.record_attempt();

        // Request-scoped parameter copy; the shared template stays untouched
        let params = self.server.request_parameters(&request.bbox);

        match self.fetcher.fetch(&self.server.url, &params).await {
            Ok(body) => {
                // Concurrent workers may race to create the same column
                // directory; create_dir_all treats "already exists" as success
                let out_dir = tile.output_dir(&self.output_root);
                let write_result = async {
                    tokio::fs::create_dir_all(&out_dir).await?;
                    tokio::fs::write(&out_file, &body).await
                }
                .await
                .map_err(|source| FetchError::Write {
                    path: out_file.clone(),
                    source,
                });

                match write_result {
                    Ok(()) => {
                        debug!("Worker {} wrote {} ({} bytes)", self.id, tile, body.len());
                        self.stats.record_success();
                    }
                    Err(e) => {
                        // Treated like a failed fetch: attempted, not succeeded
                        warn!("Worker {}: {} for {}", self.id, e, tile);
                    }
                }
            }
            Err(e) => {
                debug!("Worker {} fetch failed for {}: {}", self.id, tile, e);
            }
        }

        self.queue.mark_done();
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

/// Non-blocking existence check for the skip policy
async fn tile_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}
