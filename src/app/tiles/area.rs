//! Polygon areas from GeoJSON documents
//!
//! Supports FeatureCollection, Feature, and bare geometry documents holding
//! `Polygon` or `MultiPolygon` geometries; other geometry types are ignored.
//! Coordinates are geographic lon/lat degrees per RFC 7946; tile extents
//! are computed in the same system for the intersection test, whatever SRS
//! the server itself expects.

use std::path::Path;

use serde_json::Value;

use crate::app::models::BoundingBox;
use crate::errors::SourceError;

/// One polygon with its rings (exterior first, holes after)
#[derive(Debug, Clone)]
pub struct PolygonArea {
    rings: Vec<Vec<(f64, f64)>>,
    bbox: BoundingBox,
}

impl PolygonArea {
    /// Build from GeoJSON-style ring arrays; returns `None` for degenerate
    /// input (no exterior ring or fewer than three vertices)
    pub fn from_rings(mut rings: Vec<Vec<(f64, f64)>>) -> Option<Self> {
        // A ring needs at least three vertices to enclose anything
        rings.retain(|ring| ring.len() >= 3);
        let exterior = rings.first()?;

        let (mut xmin, mut ymin) = (f64::INFINITY, f64::INFINITY);
        let (mut xmax, mut ymax) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in exterior {
            xmin = xmin.min(x);
            ymin = ymin.min(y);
            xmax = xmax.max(x);
            ymax = ymax.max(y);
        }

        Some(Self {
            rings,
            bbox: BoundingBox::new(xmin, ymin, xmax, ymax),
        })
    }

    /// Bounding box of the exterior ring
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Even-odd point-in-polygon over all rings (holes are excluded)
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        for ring in &self.rings {
            let mut j = ring.len() - 1;
            for i in 0..ring.len() {
                let (xi, yi) = ring[i];
                let (xj, yj) = ring[j];
                if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                    inside = !inside;
                }
                j = i;
            }
        }
        inside
    }

    /// Whether this polygon intersects the given rectangle
    pub fn intersects_bbox(&self, rect: &BoundingBox) -> bool {
        if !self.bbox.intersects(rect) {
            return false;
        }

        // Any polygon vertex inside the rectangle
        for ring in &self.rings {
            if ring.iter().any(|&(x, y)| rect.contains(x, y)) {
                return true;
            }
        }

        // Any rectangle corner inside the polygon (covers rect-in-polygon)
        let corners = [
            (rect.xmin, rect.ymin),
            (rect.xmin, rect.ymax),
            (rect.xmax, rect.ymin),
            (rect.xmax, rect.ymax),
        ];
        if corners.iter().any(|&(x, y)| self.contains_point(x, y)) {
            return true;
        }

        // Any polygon edge crossing a rectangle edge
        let rect_edges = [
            ((rect.xmin, rect.ymin), (rect.xmax, rect.ymin)),
            ((rect.xmax, rect.ymin), (rect.xmax, rect.ymax)),
            ((rect.xmax, rect.ymax), (rect.xmin, rect.ymax)),
            ((rect.xmin, rect.ymax), (rect.xmin, rect.ymin)),
        ];
        for ring in &self.rings {
            for window in 0..ring.len() {
                let a = ring[window];
                let b = ring[(window + 1) % ring.len()];
                if rect_edges
                    .iter()
                    .any(|&(c, d)| segments_intersect(a, b, c, d))
                {
                    return true;
                }
            }
        }

        false
    }
}

/// Proper or touching intersection of segments `ab` and `cd`
fn segments_intersect(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64)) -> bool {
    fn orient(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> f64 {
        (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
    }
    fn on_segment(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> bool {
        r.0 >= p.0.min(q.0) && r.0 <= p.0.max(q.0) && r.1 >= p.1.min(q.1) && r.1 <= p.1.max(q.1)
    }

    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);

    if (o1 > 0.0) != (o2 > 0.0) && (o3 > 0.0) != (o4 > 0.0) && o1 != 0.0 && o2 != 0.0 {
        return true;
    }

    (o1 == 0.0 && on_segment(a, b, c))
        || (o2 == 0.0 && on_segment(a, b, d))
        || (o3 == 0.0 && on_segment(c, d, a))
        || (o4 == 0.0 && on_segment(c, d, b))
}

/// Load all polygons from a GeoJSON document
pub fn polygons_from_geojson(path: &Path) -> Result<Vec<PolygonArea>, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::GeoJsonNotReadable {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Value = serde_json::from_str(&content).map_err(|e| SourceError::InvalidGeoJson {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut polygons = Vec::new();
    collect_polygons(&doc, &mut polygons);

    if polygons.is_empty() {
        return Err(SourceError::InvalidGeoJson {
            path: path.to_path_buf(),
            reason: "no polygon features found".to_string(),
        });
    }
    Ok(polygons)
}

/// Recursively collect polygon geometries from a GeoJSON value
fn collect_polygons(value: &Value, out: &mut Vec<PolygonArea>) {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            if let Some(features) = value.get("features").and_then(Value::as_array) {
                for feature in features {
                    collect_polygons(feature, out);
                }
            }
        }
        Some("Feature") => {
            if let Some(geometry) = value.get("geometry") {
                collect_polygons(geometry, out);
            }
        }
        Some("Polygon") => {
            if let Some(rings) = parse_rings(value.get("coordinates")) {
                out.extend(PolygonArea::from_rings(rings));
            }
        }
        Some("MultiPolygon") => {
            if let Some(coordinates) = value.get("coordinates").and_then(Value::as_array) {
                for polygon in coordinates {
                    if let Some(rings) = parse_rings(Some(polygon)) {
                        out.extend(PolygonArea::from_rings(rings));
                    }
                }
            }
        }
        _ => {}
    }
}

/// Parse GeoJSON ring arrays `[[[x, y], ...], ...]`
fn parse_rings(value: Option<&Value>) -> Option<Vec<Vec<(f64, f64)>>> {
    let rings = value?.as_array()?;
    let mut parsed = Vec::with_capacity(rings.len());
    for ring in rings {
        let positions = ring.as_array()?;
        let mut points = Vec::with_capacity(positions.len());
        for position in positions {
            let coords = position.as_array()?;
            let x = coords.first()?.as_f64()?;
            let y = coords.get(1)?.as_f64()?;
            points.push((x, y));
        }
        parsed.push(points);
    }
    Some(parsed)
}
