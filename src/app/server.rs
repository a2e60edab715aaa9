//! WMS server specification
//!
//! The server spec is a JSON document loaded once at startup and shared
//! read-only by all workers:
//!
//! ```json
//! {
//!     "url": "https://maps.example.com/wms",
//!     "parameter": {
//!         "service": "WMS",
//!         "request": "GetMap",
//!         "format": "image/png",
//!         "srs": "EPSG:3857",
//!         "width": "256",
//!         "height": "256"
//!     },
//!     "concurrency": 8
//! }
//! ```
//!
//! The base parameter map is never mutated; each request derives a fresh
//! copy with the computed `bbox` value injected.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{formats, srs, workers};
use crate::errors::ConfigError;

use super::models::BoundingBox;

/// Supported coordinate reference systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Srs {
    /// EPSG:3857, spherical mercator projected meters
    WebMercator,
    /// EPSG:4326, geographic longitude/latitude degrees
    Geographic,
}

impl Srs {
    /// Parse a supported SRS identifier
    pub fn from_identifier(id: &str) -> Result<Self, ConfigError> {
        match id {
            srs::WEB_MERCATOR => Ok(Srs::WebMercator),
            srs::GEOGRAPHIC => Ok(Srs::Geographic),
            other => Err(ConfigError::UnsupportedSrs {
                srs: other.to_string(),
            }),
        }
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            Srs::WebMercator => srs::WEB_MERCATOR,
            Srs::Geographic => srs::GEOGRAPHIC,
        }
    }
}

/// Server definition, read-only for the whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSpec {
    /// Base GetMap endpoint
    pub url: String,

    /// Base query parameters; must include `srs` and `format`
    pub parameter: BTreeMap<String, String>,

    /// Number of concurrent fetch workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    workers::DEFAULT_CONCURRENCY
}

impl ServerSpec {
    /// Load and validate a server spec from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::SpecNotReadable {
                path: path.to_path_buf(),
                source,
            })?;
        let spec: ServerSpec = serde_json::from_str(&content)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Validate URL, SRS, format and concurrency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = Url::parse(&self.url).map_err(|_| ConfigError::InvalidUrl {
            url: self.url.clone(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
            });
        }

        self.srs()?;
        self.file_extension()?;

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency { value: 0 });
        }

        Ok(())
    }

    /// Coordinate reference system declared in the parameter map
    pub fn srs(&self) -> Result<Srs, ConfigError> {
        let id = self
            .parameter
            .get("srs")
            .ok_or_else(|| ConfigError::MissingParameter {
                name: "srs".to_string(),
            })?;
        Srs::from_identifier(id)
    }

    /// File extension derived from the declared response format
    pub fn file_extension(&self) -> Result<&'static str, ConfigError> {
        let format = self
            .parameter
            .get("format")
            .ok_or_else(|| ConfigError::MissingParameter {
                name: "format".to_string(),
            })?;
        formats::EXTENSIONS
            .iter()
            .find(|(content_type, _)| *content_type == format.as_str())
            .map(|(_, ext)| *ext)
            .ok_or_else(|| ConfigError::UnknownFormat {
                format: format.clone(),
            })
    }

    /// Request-scoped parameter copy with the bbox injected.
    ///
    /// The base map is shared by all workers and never mutated; the returned
    /// copy is exclusively owned by the request being built.
    pub fn request_parameters(&self, bbox: &BoundingBox) -> BTreeMap<String, String> {
        let mut params = self.parameter.clone();
        params.insert("bbox".to_string(), bbox.to_query_value());
        params
    }
}
