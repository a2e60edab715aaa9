//! Tile enumeration: slippy-map arithmetic, polygon areas, and the lazy
//! request sources that feed the fetch pipeline.

pub mod area;
pub mod mercator;
pub mod source;

pub use area::{polygons_from_geojson, PolygonArea};
pub use source::{
    from_bboxes, from_list_files, from_polygons, parse_bbox_arg, parse_zoom_specs, TileSourceIter,
};
