//! Core fetch pipeline
//!
//! The pipeline is a work queue feeding a pool of fetch workers, supervised
//! by a coordinator that owns startup, drain detection, and shutdown. Tile
//! sources enumerate requests lazily; the server spec describes the WMS
//! endpoint the workers talk to.

pub mod client;
pub mod coordinator;
pub mod models;
pub mod queue;
pub mod server;
pub mod tiles;
pub mod worker;

pub use client::{ClientConfig, HttpTileFetcher, TileFetcher};
pub use coordinator::{Coordinator, CoordinatorConfig, FetchReport, PipelineState};
pub use models::{BoundingBox, FetchRequest, TileCoordinate};
pub use queue::{QueueStats, WorkQueue};
pub use server::{ServerSpec, Srs};
pub use tiles::TileSourceIter;
pub use worker::{AggregateResult, WorkerConfig, WorkerPool, WorkerStats};
