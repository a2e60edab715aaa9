//! Web-map tile arithmetic
//!
//! Implements the standard slippy tiling scheme: at zoom `z` the world is a
//! `2^z` by `2^z` grid, column 0 at 180°W increasing east, row 0 at the
//! north edge increasing south. Selection input (bboxes, polygon vertices)
//! is always geographic lon/lat degrees; tile extents can be expressed in
//! spherical-mercator meters (EPSG:3857) or geographic degrees (EPSG:4326),
//! matching the SRS the server expects in its `bbox` parameter.

use crate::app::models::{BoundingBox, TileCoordinate};
use crate::app::server::Srs;

/// Half the extent of the mercator world in projected meters
pub const MERCATOR_EXTENT: f64 = 20_037_508.342_789_244;

/// Latitude bound of the square mercator world
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Highest zoom the tile arithmetic supports; zoom specs beyond this are
/// rejected at parse time so the grid size stays within `u32`
pub const MAX_ZOOM: u8 = 30;

/// Number of tiles along one axis at the given zoom (`zoom <= MAX_ZOOM`)
fn tile_count(zoom: u8) -> u32 {
    1u32 << zoom
}

/// Column containing the given longitude
pub fn longitude_to_column(lon: f64, zoom: u8) -> u32 {
    let n = tile_count(zoom) as f64;
    let column = ((lon + 180.0) / 360.0 * n).floor();
    (column.max(0.0) as u32).min(tile_count(zoom) - 1)
}

/// Row containing the given latitude
pub fn latitude_to_row(lat: f64, zoom: u8) -> u32 {
    let n = tile_count(zoom) as f64;
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let lat_rad = lat.to_radians();
    let row = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0
        * n)
        .floor();
    (row.max(0.0) as u32).min(tile_count(zoom) - 1)
}

/// Geographic extent of a tile in degrees
fn tile_bbox_geographic(tile: TileCoordinate) -> BoundingBox {
    let n = tile_count(tile.zoom) as f64;
    let lon_west = tile.column as f64 / n * 360.0 - 180.0;
    let lon_east = (tile.column + 1) as f64 / n * 360.0 - 180.0;

    let lat_of_row = |row: f64| {
        let y = std::f64::consts::PI * (1.0 - 2.0 * row / n);
        y.sinh().atan().to_degrees()
    };
    let lat_north = lat_of_row(tile.row as f64);
    let lat_south = lat_of_row((tile.row + 1) as f64);

    BoundingBox::new(lon_west, lat_south, lon_east, lat_north)
}

/// Mercator extent of a tile in projected meters
fn tile_bbox_mercator(tile: TileCoordinate) -> BoundingBox {
    let n = tile_count(tile.zoom) as f64;
    let span = 2.0 * MERCATOR_EXTENT / n;
    let xmin = -MERCATOR_EXTENT + tile.column as f64 * span;
    let ymax = MERCATOR_EXTENT - tile.row as f64 * span;
    BoundingBox::new(xmin, ymax - span, xmin + span, ymax)
}

/// Extent of a tile in the requested SRS
pub fn tile_bbox(tile: TileCoordinate, srs: Srs) -> BoundingBox {
    match srs {
        Srs::WebMercator => tile_bbox_mercator(tile),
        Srs::Geographic => tile_bbox_geographic(tile),
    }
}

/// Inclusive tile range covering a geographic lon/lat bbox at one zoom.
///
/// Selection input is always geographic degrees; the server's SRS only
/// affects the outgoing per-tile bbox computed by [`tile_bbox`]. Returns
/// `(column_min..=column_max, row_min..=row_max)`; tiles that merely touch
/// the bbox boundary are included.
pub fn covering_range(
    bbox: &BoundingBox,
    zoom: u8,
) -> (
    std::ops::RangeInclusive<u32>,
    std::ops::RangeInclusive<u32>,
) {
    let column_min = longitude_to_column(bbox.xmin, zoom);
    let column_max = longitude_to_column(bbox.xmax, zoom);
    // Row 0 is at the north edge, so north maps to the smaller row
    let row_min = latitude_to_row(bbox.ymax, zoom);
    let row_max = latitude_to_row(bbox.ymin, zoom);

    (column_min..=column_max, row_min..=row_max)
}
