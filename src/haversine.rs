//! Offline [`MapsClient`] answering from great-circle geometry.
//!
//! Distances are haversine distances between the points, durations assume a
//! constant speed, and every leg is a straight segment. Useful for demos,
//! tests, and as a fallback when no provider is reachable.

use geo::{Distance, Haversine, Point};

use crate::polyline;
use crate::provider::{
    DirectionsRequest, Leg, MapsClient, MatrixElement, MatrixRequest, MatrixResponse, MatrixRow,
    Route, Step,
};
use crate::{GpsPoint, Result};

/// Calculate the great-circle distance between two GPS points in meters.
///
/// # Example
///
/// ```rust
/// use route_matrix::{GpsPoint, haversine};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = haversine::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Great-circle provider travelling at a constant speed.
#[derive(Debug, Clone)]
pub struct HaversineClient {
    /// Travel speed in meters per second.
    /// Default: 10.0 (36 km/h)
    pub speed: f64,
}

impl Default for HaversineClient {
    fn default() -> Self {
        Self { speed: 10.0 }
    }
}

impl HaversineClient {
    pub fn new(speed: f64) -> Self {
        Self { speed }
    }

    fn element(&self, from: &GpsPoint, to: &GpsPoint) -> MatrixElement {
        let distance = haversine_distance(from, to);
        let duration = if self.speed > 0.0 { distance / self.speed } else { 0.0 };
        MatrixElement {
            distance_meters: distance,
            duration_seconds: duration,
        }
    }
}

impl MapsClient for HaversineClient {
    async fn distance_matrix(&self, request: &MatrixRequest) -> Result<MatrixResponse> {
        let rows = request
            .origins
            .iter()
            .map(|origin| MatrixRow {
                elements: request
                    .destinations
                    .iter()
                    .map(|destination| self.element(origin, destination))
                    .collect(),
            })
            .collect();
        Ok(MatrixResponse { rows })
    }

    async fn directions(&self, request: &DirectionsRequest) -> Result<Vec<Route>> {
        let points = request.points();
        let legs = points
            .windows(2)
            .map(|pair| Leg {
                steps: vec![Step {
                    polyline: polyline::encode(pair),
                }],
            })
            .collect();

        Ok(vec![Route {
            legs,
            overview_polyline: polyline::encode(&points),
        }])
    }
}
