//! Lazy tile request sources
//!
//! Three mutually exclusive enumeration modes feed the pipeline, mirroring
//! the CLI surface: explicit tile-list files, bounding boxes with zoom
//! specifications, and GeoJSON polygon areas with zoom specifications. All
//! of them yield [`FetchRequest`]s one at a time so arbitrarily large areas
//! never materialize in memory.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::models::{BoundingBox, FetchRequest, TileCoordinate};
use crate::app::server::Srs;
use crate::errors::{SourceError, SourceResult};

use super::area::PolygonArea;
use super::mercator::{covering_range, tile_bbox, MAX_ZOOM};

/// Boxed lazy request stream consumed by the dispatcher
pub type TileSourceIter = Box<dyn Iterator<Item = SourceResult<FetchRequest>> + Send>;

/// Expand zoom specifications of the form `Z` or `Zlo-Zhi` (inclusive).
///
/// Zoom levels above [`MAX_ZOOM`] are rejected here so the tile grid
/// arithmetic downstream never overflows.
pub fn parse_zoom_specs(specs: &[String]) -> Result<Vec<u8>, SourceError> {
    let mut zooms = Vec::new();
    for spec in specs {
        let invalid = || SourceError::InvalidZoomSpec { spec: spec.clone() };

        match spec.split_once('-') {
            Some((lo, hi)) => {
                let lo: u8 = lo.trim().parse().map_err(|_| invalid())?;
                let hi: u8 = hi.trim().parse().map_err(|_| invalid())?;
                if lo > hi || hi > MAX_ZOOM {
                    return Err(invalid());
                }
                zooms.extend(lo..=hi);
            }
            None => {
                let zoom: u8 = spec.trim().parse().map_err(|_| invalid())?;
                if zoom > MAX_ZOOM {
                    return Err(invalid());
                }
                zooms.push(zoom);
            }
        }
    }
    Ok(zooms)
}

/// Parse a `xmin,ymin,xmax,ymax` bbox argument
pub fn parse_bbox_arg(arg: &str) -> Result<BoundingBox, SourceError> {
    let invalid = || SourceError::InvalidBbox {
        bbox: arg.to_string(),
    };

    let parts: Vec<f64> = arg
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;
    match parts.as_slice() {
        &[xmin, ymin, xmax, ymax] => Ok(BoundingBox::new(xmin, ymin, xmax, ymax)),
        _ => Err(invalid()),
    }
}

/// Requests from explicit tile-list files.
///
/// Each line is `column,row,zoom,xmin,ymin,xmax,ymax`; blank lines are
/// ignored. Files are opened lazily, one at a time.
pub fn from_list_files(paths: Vec<PathBuf>) -> TileSourceIter {
    Box::new(ListFileIter {
        paths: paths.into_iter(),
        current: None,
    })
}

struct ListFileIter {
    paths: std::vec::IntoIter<PathBuf>,
    current: Option<(PathBuf, Lines<BufReader<File>>, usize)>,
}

impl Iterator for ListFileIter {
    type Item = SourceResult<FetchRequest>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((path, lines, line_number)) = self.current.as_mut() {
                match lines.next() {
                    Some(Ok(line)) => {
                        *line_number += 1;
                        if line.trim().is_empty() {
                            continue;
                        }
                        return Some(parse_list_line(path, *line_number, &line));
                    }
                    Some(Err(source)) => {
                        let path = path.clone();
                        self.current = None;
                        return Some(Err(SourceError::ListNotReadable { path, source }));
                    }
                    None => self.current = None,
                }
            } else {
                let path = self.paths.next()?;
                match File::open(&path) {
                    Ok(file) => {
                        self.current = Some((path, BufReader::new(file).lines(), 0));
                    }
                    Err(source) => return Some(Err(SourceError::ListNotReadable { path, source })),
                }
            }
        }
    }
}

fn parse_list_line(
    path: &std::path::Path,
    line_number: usize,
    line: &str,
) -> SourceResult<FetchRequest> {
    let malformed = || SourceError::MalformedLine {
        path: path.to_path_buf(),
        line: line_number,
        content: line.to_string(),
    };

    let parts: Vec<&str> = line.trim().split(',').collect();
    if parts.len() != 7 {
        return Err(malformed());
    }

    let column: u32 = parts[0].trim().parse().map_err(|_| malformed())?;
    let row: u32 = parts[1].trim().parse().map_err(|_| malformed())?;
    let zoom: u8 = parts[2].trim().parse().map_err(|_| malformed())?;
    let mut bbox = [0f64; 4];
    for (slot, part) in bbox.iter_mut().zip(&parts[3..]) {
        *slot = part.trim().parse().map_err(|_| malformed())?;
    }

    Ok(FetchRequest::new(
        TileCoordinate::new(column, row, zoom),
        BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
    ))
}

/// Requests for every tile touching any bbox at every requested zoom.
///
/// Input bboxes are geographic lon/lat; `srs` only shapes the per-tile
/// bbox sent to the server.
pub fn from_bboxes(bboxes: Vec<BoundingBox>, zooms: Vec<u8>, srs: Srs) -> TileSourceIter {
    let iter = zooms.into_iter().flat_map(move |zoom| {
        let bboxes = bboxes.clone();
        bboxes.into_iter().flat_map(move |bbox| {
            let (columns, rows) = covering_range(&bbox, zoom);
            columns.flat_map(move |column| {
                rows.clone().map(move |row| {
                    let tile = TileCoordinate::new(column, row, zoom);
                    Ok(FetchRequest::new(tile, tile_bbox(tile, srs)))
                })
            })
        })
    });
    Box::new(iter)
}

/// Requests for every tile whose extent intersects any polygon, at every
/// requested zoom.
///
/// Polygon vertices are geographic lon/lat (RFC 7946), so the intersection
/// test runs against the tile's geographic extent; `srs` only shapes the
/// per-tile bbox sent to the server.
pub fn from_polygons(polygons: Vec<PolygonArea>, zooms: Vec<u8>, srs: Srs) -> TileSourceIter {
    let polygons = Arc::new(polygons);
    let iter = zooms.into_iter().flat_map(move |zoom| {
        let polygons = polygons.clone();
        (0..polygons.len()).flat_map(move |index| {
            let polygons = polygons.clone();
            let (columns, rows) = covering_range(&polygons[index].bbox(), zoom);
            columns.flat_map(move |column| {
                let polygons = polygons.clone();
                rows.clone().filter_map(move |row| {
                    let tile = TileCoordinate::new(column, row, zoom);
                    let geo_extent = tile_bbox(tile, Srs::Geographic);
                    polygons[index]
                        .intersects_bbox(&geo_extent)
                        .then(|| Ok(FetchRequest::new(tile, tile_bbox(tile, srs))))
                })
            })
        })
    });
    Box::new(iter)
}
