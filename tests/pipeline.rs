//! End-to-end tests for the fetch pipeline
//!
//! These tests drive the coordinator with stub fetchers and verify the
//! accounting identities, the skip policy, and the on-disk tile tree.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use wms_fetcher::app::tiles::{from_list_files, TileSourceIter};
use wms_fetcher::app::{
    BoundingBox, Coordinator, CoordinatorConfig, FetchReport, FetchRequest, ServerSpec,
    TileCoordinate, TileFetcher, WorkQueue, WorkerConfig,
};
use wms_fetcher::errors::{FetchError, FetchResult};

/// Stub fetcher that fails for tile columns listed in `failing_columns`.
///
/// The column is recovered from the `bbox` query parameter, which the
/// sources below encode as `column,0,0,0`.
struct ColumnFetcher {
    failing_columns: Vec<u32>,
    delay: Duration,
}

#[async_trait]
impl TileFetcher for ColumnFetcher {
    async fn fetch(&self, _url: &str, params: &BTreeMap<String, String>) -> FetchResult<Vec<u8>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let column: u32 = params
            .get("bbox")
            .and_then(|b| b.split(',').next())
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);

        if self.failing_columns.contains(&column) {
            Err(FetchError::Status { status: 500 })
        } else {
            Ok(format!("tile-{}", column).into_bytes())
        }
    }
}

/// Server spec with two workers, pointing nowhere real
fn test_server() -> Arc<ServerSpec> {
    let json = r#"{
        "url": "https://maps.example.com/wms",
        "parameter": {"format": "image/png", "srs": "EPSG:4326"},
        "concurrency": 2
    }"#;
    Arc::new(serde_json::from_str(json).unwrap())
}

/// Source of `count` distinct tiles at zoom 5, one per column.
///
/// Each request carries its column in the bbox so the stub fetcher can
/// make per-tile decisions.
fn tile_source(count: u32) -> TileSourceIter {
    Box::new((0..count).map(|column| {
        Ok(FetchRequest::new(
            TileCoordinate::new(column, 0, 5),
            BoundingBox::new(column as f64, 0.0, 0.0, 0.0),
        ))
    }))
}

/// Run one pipeline over `source` against `output`
async fn run_pipeline(
    output: &Path,
    force: bool,
    fetcher: ColumnFetcher,
    source: TileSourceIter,
) -> FetchReport {
    let mut worker = WorkerConfig::new(2, output.to_path_buf(), force);
    worker.dequeue_timeout = Duration::from_millis(10);

    let coordinator = Coordinator::new(
        CoordinatorConfig {
            worker,
            show_progress: false,
        },
        Arc::new(WorkQueue::new()),
        Arc::new(fetcher),
        test_server(),
    );

    coordinator.run(source).await.unwrap()
}

fn fetcher(failing_columns: Vec<u32>) -> ColumnFetcher {
    ColumnFetcher {
        failing_columns,
        delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_mixed_outcomes_are_accounted_exactly() {
    let dir = TempDir::new().unwrap();

    let report = run_pipeline(dir.path(), false, fetcher(vec![1]), tile_source(3)).await;

    assert_eq!(report.aggregate.total, 3);
    assert_eq!(report.aggregate.succeeded, 2);
    assert_eq!(report.aggregate.failed, 1);
    assert_eq!(report.aggregate.skipped, 0);
    assert_eq!(
        report.aggregate.to_string(),
        "Total: 3, Ok: 2, Failed: 1, Skipped: 0"
    );

    // Only the successful tiles exist on disk
    assert!(dir.path().join("5/0/0.png").is_file());
    assert!(!dir.path().join("5/1/0.png").exists());
    assert!(dir.path().join("5/2/0.png").is_file());
}

#[tokio::test]
async fn test_existing_tiles_are_skipped_without_a_request() {
    let dir = TempDir::new().unwrap();

    // Pre-create tile for column 1 with sentinel content
    let existing = dir.path().join("5/1/0.png");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, b"sentinel").unwrap();

    let report = run_pipeline(dir.path(), false, fetcher(vec![]), tile_source(3)).await;

    assert_eq!(report.aggregate.total, 3);
    assert_eq!(report.aggregate.succeeded, 2);
    assert_eq!(report.aggregate.skipped, 1);

    let attempted: u64 = report.per_worker.values().map(|s| s.attempted).sum();
    assert_eq!(attempted, 2);

    // Skipping means the file was not touched
    assert_eq!(std::fs::read(&existing).unwrap(), b"sentinel");
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let dir = TempDir::new().unwrap();

    let first = run_pipeline(dir.path(), false, fetcher(vec![]), tile_source(5)).await;
    assert_eq!(first.aggregate.succeeded, 5);

    let second = run_pipeline(dir.path(), false, fetcher(vec![]), tile_source(5)).await;

    assert_eq!(second.aggregate.total, 5);
    assert_eq!(second.aggregate.skipped, 5);
    let attempted: u64 = second.per_worker.values().map(|s| s.attempted).sum();
    assert_eq!(attempted, 0);
}

#[tokio::test]
async fn test_force_refetches_every_tile() {
    let dir = TempDir::new().unwrap();

    run_pipeline(dir.path(), false, fetcher(vec![]), tile_source(5)).await;
    let forced = run_pipeline(dir.path(), true, fetcher(vec![]), tile_source(5)).await;

    assert_eq!(forced.aggregate.skipped, 0);
    let attempted: u64 = forced.per_worker.values().map(|s| s.attempted).sum();
    assert_eq!(attempted, 5);
}

#[tokio::test]
async fn test_drain_waits_for_slow_workers() {
    let dir = TempDir::new().unwrap();

    let slow = ColumnFetcher {
        failing_columns: vec![],
        delay: Duration::from_millis(25),
    };
    let report = run_pipeline(dir.path(), false, slow, tile_source(8)).await;

    // The run only returns once every tile is on disk
    assert_eq!(report.aggregate.succeeded, 8);
    for column in 0..8 {
        assert!(dir.path().join(format!("5/{}/0.png", column)).is_file());
    }
}

#[tokio::test]
async fn test_list_file_source_end_to_end() {
    let dir = TempDir::new().unwrap();

    let list = dir.path().join("tiles.lst");
    std::fs::write(
        &list,
        "3,7,9,0.0,0.0,1.0,1.0\n4,7,9,1.0,0.0,2.0,1.0\n\n5,7,9,2.0,0.0,3.0,1.0\n",
    )
    .unwrap();

    let output = dir.path().join("out");
    let report = run_pipeline(&output, false, fetcher(vec![]), from_list_files(vec![list])).await;

    assert_eq!(report.aggregate.total, 3);
    assert_eq!(report.aggregate.succeeded, 3);
    assert!(output.join("9/3/7.png").is_file());
    assert!(output.join("9/4/7.png").is_file());
    assert!(output.join("9/5/7.png").is_file());
}
