//! Core data models for the tile pipeline
//!
//! A [`TileCoordinate`] addresses a tile in the standard web-map tiling
//! scheme (column 0 at the antimeridian increasing east, row 0 at the north
//! edge increasing south). A [`FetchRequest`] pairs a coordinate with the
//! geographic bounding box sent to the server, and knows where its output
//! file lives under the output root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Position of a tile in the web-map tiling scheme. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoordinate {
    /// Column (x), increasing eastwards
    pub column: u32,
    /// Row (y), increasing southwards
    pub row: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoordinate {
    pub fn new(column: u32, row: u32, zoom: u8) -> Self {
        Self { column, row, zoom }
    }

    /// Output path for this tile: `<root>/<zoom>/<column>/<row>.<ext>`
    pub fn output_path(&self, output_root: &Path, extension: &str) -> PathBuf {
        output_root
            .join(self.zoom.to_string())
            .join(self.column.to_string())
            .join(format!("{}.{}", self.row, extension))
    }

    /// Parent directory of the output file, created on demand by workers
    pub fn output_dir(&self, output_root: &Path) -> PathBuf {
        output_root
            .join(self.zoom.to_string())
            .join(self.column.to_string())
    }
}

impl std::fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
    }
}

/// Geographic bounding box `[xmin, ymin, xmax, ymax]` in the server's SRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Serialize as the comma-joined decimal form used in WMS `bbox`
    /// query parameters
    pub fn to_query_value(&self) -> String {
        format!("{},{},{},{}", self.xmin, self.ymin, self.xmax, self.ymax)
    }

    /// Whether this box overlaps `other` (shared edges count as overlap)
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }

    /// Whether the point lies inside or on the boundary
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }
}

/// One unit of work: a tile plus the bbox to request for it.
///
/// Created by a tile source, consumed exactly once by exactly one worker.
/// The pipeline never retries or re-enqueues a request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub coordinate: TileCoordinate,
    pub bbox: BoundingBox,
}

impl FetchRequest {
    pub fn new(coordinate: TileCoordinate, bbox: BoundingBox) -> Self {
        Self { coordinate, bbox }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_layout() {
        let tile = TileCoordinate::new(42, 17, 9);
        let path = tile.output_path(Path::new("/tiles"), "png");
        assert_eq!(path, PathBuf::from("/tiles/9/42/17.png"));
        assert_eq!(tile.output_dir(Path::new("/tiles")), PathBuf::from("/tiles/9/42"));
    }

    #[test]
    fn test_bbox_query_value() {
        let bbox = BoundingBox::new(-180.0, -85.5, 180.0, 85.5);
        assert_eq!(bbox.to_query_value(), "-180,-85.5,180,85.5");
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(11.0, 11.0, 12.0, 12.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));

        // Shared edge counts as intersection
        let d = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert!(a.intersects(&d));
    }

    #[test]
    fn test_tile_display() {
        let tile = TileCoordinate::new(1, 0, 1);
        assert_eq!(tile.to_string(), "1/1/0");
    }
}
