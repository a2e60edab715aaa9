//! Application constants, grouped by functional domain.

use std::time::Duration;

/// HTTP client configuration
pub mod http {
    use super::Duration;

    /// User agent sent with every tile request
    pub const USER_AGENT: &str = concat!("wms-fetcher/", env!("CARGO_PKG_VERSION"));

    /// Overall request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host
    pub const POOL_MAX_PER_HOST: usize = 16;
}

/// Worker and queue configuration
pub mod workers {
    use super::Duration;

    /// Default worker count when the server spec omits `concurrency`
    pub const DEFAULT_CONCURRENCY: usize = 4;

    /// How long a worker blocks on an empty queue before re-checking the
    /// shutdown flag
    pub const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(1);

    /// Queue capacity; enqueue applies backpressure beyond this
    pub const QUEUE_CAPACITY: usize = 4096;
}

/// Coordinate reference systems accepted in server specs
pub mod srs {
    /// Spherical mercator, projected meters
    pub const WEB_MERCATOR: &str = "EPSG:3857";

    /// Geographic longitude/latitude degrees
    pub const GEOGRAPHIC: &str = "EPSG:4326";
}

/// Response image formats and their file extensions
pub mod formats {
    /// Content type to extension table for tile responses
    pub const EXTENSIONS: &[(&str, &str)] = &[
        ("image/png", "png"),
        ("image/jpeg", "jpg"),
        ("image/gif", "gif"),
        ("image/tiff", "tif"),
    ];
}

/// Progress reporting
pub mod progress {
    use super::Duration;

    /// How often the drain progress bar is refreshed
    pub const UPDATE_INTERVAL: Duration = Duration::from_millis(200);
}

// Re-export commonly used constants for convenience
pub use http::USER_AGENT;
pub use srs::{GEOGRAPHIC, WEB_MERCATOR};
pub use workers::{DEFAULT_CONCURRENCY, DEQUEUE_TIMEOUT, QUEUE_CAPACITY};
