//! Command handler wiring the CLI to the fetch pipeline
//!
//! Loads and validates the server spec, builds the lazy tile source for the
//! selected mode, assembles the pipeline, and prints the final summary line.

use std::sync::Arc;

use tracing::{debug, info};

use crate::app::tiles::{self, PolygonArea};
use crate::app::{
    Coordinator, CoordinatorConfig, FetchReport, HttpTileFetcher, ServerSpec, TileSourceIter,
    WorkQueue, WorkerConfig,
};
use crate::errors::Result;

use super::args::{FetchArgs, SourceMode};

/// Run one fetch over the tiles the arguments select.
///
/// The summary line is printed on stdout even in quiet mode; the progress
/// bar is suppressed when `quiet` is set.
pub async fn handle_fetch(args: &FetchArgs, quiet: bool) -> Result<FetchReport> {
    let mode = args.validate()?;

    let server = ServerSpec::load(&args.server)?;
    info!(
        "Fetching tiles from {} with {} workers into {}",
        server.url,
        server.concurrency,
        args.output.display()
    );

    let source = build_source(args, mode, &server)?;

    let worker = WorkerConfig::new(server.concurrency, args.output.clone(), args.force);
    let coordinator = Coordinator::new(
        CoordinatorConfig {
            worker,
            show_progress: !quiet,
        },
        Arc::new(WorkQueue::new()),
        Arc::new(HttpTileFetcher::new()?),
        Arc::new(server),
    );

    let report = coordinator.run(source).await?;

    // The summary line is the tool's contract with scripted callers
    println!("{}", report.aggregate);

    Ok(report)
}

/// Build the lazy request source for the selected mode
fn build_source(args: &FetchArgs, mode: SourceMode, server: &ServerSpec) -> Result<TileSourceIter> {
    match mode {
        SourceMode::ListFiles => {
            debug!("Tile source: {} list file(s)", args.tiles.len());
            Ok(tiles::from_list_files(args.tiles.clone()))
        }
        SourceMode::Bboxes => {
            let srs = server.srs()?;
            let zooms = tiles::parse_zoom_specs(&args.zooms)?;
            let bboxes = args
                .bboxes
                .iter()
                .map(|arg| tiles::parse_bbox_arg(arg))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            debug!(
                "Tile source: {} bbox(es) at zoom levels {:?}",
                bboxes.len(),
                zooms
            );
            Ok(tiles::from_bboxes(bboxes, zooms, srs))
        }
        SourceMode::Polygons => {
            let srs = server.srs()?;
            let zooms = tiles::parse_zoom_specs(&args.zooms)?;
            let mut polygons: Vec<PolygonArea> = Vec::new();
            for path in &args.geojson {
                polygons.extend(tiles::polygons_from_geojson(path)?);
            }
            debug!(
                "Tile source: {} polygon(s) at zoom levels {:?}",
                polygons.len(),
                zooms
            );
            Ok(tiles::from_polygons(polygons, zooms, srs))
        }
    }
}
