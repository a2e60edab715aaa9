//! WMS Tile Fetcher Library
//!
//! A Rust library for bulk-downloading map tiles from WMS servers.
//! Provides a concurrent fetch pipeline with drain-based completion
//! tracking, skip-if-exists semantics, and lazy tile enumeration from
//! lists, bounding boxes, or GeoJSON polygon areas.

pub mod app;
pub mod cli;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
