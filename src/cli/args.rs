//! Command-line argument parsing for the WMS tile fetcher
//!
//! Defines the CLI surface using clap derive macros. Tile selection has
//! three mutually exclusive modes: explicit tile list files, zoom levels
//! with bounding boxes, or zoom levels with GeoJSON polygon areas. The
//! structural conflicts are encoded in clap; [`FetchArgs::validate`]
//! handles what clap cannot express.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::errors::ConfigError;

/// WMS tile fetcher - bulk-download map tiles from a WMS server
#[derive(Parser, Debug)]
#[command(
    name = "wms_fetcher",
    version,
    about = "Fetch map tiles from a WMS server into a zoom/column/row tree",
    long_about = "Fetches map tiles concurrently from a WMS server described by a JSON spec
file. Tiles are selected from explicit list files, from bounding boxes, or
from GeoJSON polygon areas, and stored as <output>/<zoom>/<column>/<row>.<ext>."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Fetch options
    #[command(flatten)]
    pub fetch: FetchArgs,
}

/// Global arguments
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Arguments selecting the server, output tree, and tiles to fetch
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// JSON file describing the WMS server
    #[arg(short, long, value_name = "FILE")]
    pub server: PathBuf,

    /// Root directory of the output tile tree
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Fetch tiles even when the output file already exists
    #[arg(short, long)]
    pub force: bool,

    /// Tile list file (repeatable), one tile definition per line
    #[arg(
        short = 't',
        long = "tiles",
        value_name = "FILE",
        conflicts_with_all = ["zooms", "bboxes", "geojson"]
    )]
    pub tiles: Vec<PathBuf>,

    /// Zoom level or range like "12" or "10-14" (repeatable)
    #[arg(short = 'z', long = "zoom", value_name = "ZOOM")]
    pub zooms: Vec<String>,

    /// Bounding box "lon_min,lat_min,lon_max,lat_max" in degrees (repeatable)
    #[arg(
        short = 'b',
        long = "bbox",
        value_name = "BBOX",
        requires = "zooms",
        conflicts_with = "geojson"
    )]
    pub bboxes: Vec<String>,

    /// GeoJSON file with polygon areas to cover (repeatable)
    #[arg(short = 'g', long = "geojson", value_name = "FILE", requires = "zooms")]
    pub geojson: Vec<PathBuf>,
}

/// Which of the three tile selection modes the arguments resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Enumerate tile definitions from list files
    ListFiles,
    /// Cover explicit bounding boxes at the given zooms
    Bboxes,
    /// Cover GeoJSON polygon areas at the given zooms
    Polygons,
}

impl FetchArgs {
    /// Resolve the selection mode, rejecting argument sets clap cannot.
    pub fn validate(&self) -> Result<SourceMode, ConfigError> {
        if !self.tiles.is_empty() {
            return Ok(SourceMode::ListFiles);
        }
        if !self.bboxes.is_empty() {
            return Ok(SourceMode::Bboxes);
        }
        if !self.geojson.is_empty() {
            return Ok(SourceMode::Polygons);
        }
        // Zoom levels alone select nothing
        Err(ConfigError::NoModeSelected)
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}
