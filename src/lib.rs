//! # Route Matrix
//!
//! Batched, rate-limited distance/duration matrices and route polylines on top
//! of a mapping provider with hard per-request limits.
//!
//! This library provides:
//! - Partitioning of an `O × D` matrix request into provider-compliant sub-requests
//! - Greedy batching of sub-requests into waves under a per-second element budget
//! - Concurrent execution with bounded parallelism and cancel-on-first-error
//! - Reassembly of sub-responses into full distance and duration matrices
//! - Per-leg and overview polylines for long waypoint paths
//!
//! ## Features
//!
//! - **`http`** - Enable [`GoogleMapsClient`], an HTTP provider client (default)
//! - **`serde`** - Derive `Serialize`/`Deserialize` on public data types
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use route_matrix::{GpsPoint, HaversineClient, distance_duration_matrices};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), route_matrix::Error> {
//! let client = Arc::new(HaversineClient::default());
//! let origins = vec![GpsPoint::new(51.5074, -0.1278), GpsPoint::new(51.5080, -0.1290)];
//! let destinations = vec![GpsPoint::new(48.8566, 2.3522)];
//!
//! let (distances, durations) =
//!     distance_duration_matrices(client, &origins, &destinations).await?;
//! assert_eq!(distances.len(), 2);
//! assert_eq!(durations[0].len(), 1);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod polyline;

pub mod provider;
pub use provider::{
    Avoid, DirectionsRequest, Leg, MapsClient, MatrixElement, MatrixRequest, MatrixResponse,
    MatrixRow, RequestOptions, Route, Step, TravelMode, Units,
};

pub mod partition;
pub use partition::{split, MatrixSubRequest, MatrixSubResponse, Reference};

pub mod batch;
pub use batch::group;

pub mod rate_limit;
pub use rate_limit::ElementRateLimiter;

pub mod executor;

pub mod matrix;
pub use matrix::{distance_duration_matrices, BatchedClient, Matrix, MatrixAssembler};

pub mod directions;
pub use directions::polylines;

pub mod haversine;
pub use haversine::HaversineClient;

#[cfg(test)]
mod test_support;

// HTTP client for a Google-Maps-compatible provider
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::GoogleMapsClient;

// ============================================================================
// Provider Limits
// ============================================================================

/// Maximum number of origins or destinations in a single matrix request.
pub const MAX_ADDRESSES: usize = 25;

/// Maximum number of origin × destination elements in a single matrix request.
pub const MAX_ELEMENTS: usize = 100;

/// Maximum number of matrix elements the provider accepts per second.
pub const MAX_ELEMENTS_PER_SECOND: usize = 1000;

/// Maximum number of path edges covered by a single directions request.
pub const MAX_WAYPOINTS: usize = 25;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use route_matrix::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

impl std::fmt::Display for GpsPoint {
    /// Formats as `lat,lng`, the location syntax mapping providers accept.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Configuration for request partitioning, batching, and execution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BatchConfig {
    /// Maximum origins or destinations per matrix sub-request.
    /// Default: [`MAX_ADDRESSES`] (25)
    pub max_addresses: usize,

    /// Maximum origin × destination elements per matrix sub-request.
    /// Default: [`MAX_ELEMENTS`] (100)
    pub max_elements: usize,

    /// Element budget per `rate_window`. Bounds the size of one wave.
    /// Default: [`MAX_ELEMENTS_PER_SECOND`] (1000)
    pub max_elements_per_second: usize,

    /// Maximum path edges per directions sub-request.
    /// Default: [`MAX_WAYPOINTS`] (25)
    pub max_waypoints: usize,

    /// Maximum requests in flight at once, across a wave.
    /// Default: 50
    pub max_concurrency: usize,

    /// Window over which `max_elements_per_second` is replenished.
    /// Default: 1 second
    pub rate_window: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_addresses: MAX_ADDRESSES,
            max_elements: MAX_ELEMENTS,
            max_elements_per_second: MAX_ELEMENTS_PER_SECOND,
            max_waypoints: MAX_WAYPOINTS,
            max_concurrency: 50,
            rate_window: Duration::from_secs(1),
        }
    }
}

impl BatchConfig {
    /// Reject limits that would make partitioning or execution impossible.
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("max_addresses", self.max_addresses),
            ("max_elements", self.max_elements),
            ("max_elements_per_second", self.max_elements_per_second),
            ("max_waypoints", self.max_waypoints),
            ("max_concurrency", self.max_concurrency),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if self.rate_window.is_zero() {
            return Err(Error::InvalidConfig("rate_window must be positive".to_string()));
        }
        Ok(())
    }
}
