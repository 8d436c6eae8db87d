//! Provider boundary: the request/response types exchanged with a mapping
//! provider and the [`MapsClient`] trait the batching core is generic over.
//!
//! The types mirror the shape every distance-matrix/directions provider shares
//! (rows of elements, routes made of legs made of steps) without committing to
//! any wire format. Concrete clients translate them to and from their API.

use std::future::Future;

use crate::{GpsPoint, Result};

/// Mode of transport used for matrix and directions requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Transit => "transit",
        }
    }
}

/// Road features a route should avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Avoid {
    Tolls,
    Highways,
    Ferries,
    Indoor,
}

impl Avoid {
    pub fn as_str(&self) -> &'static str {
        match self {
            Avoid::Tolls => "tolls",
            Avoid::Highways => "highways",
            Avoid::Ferries => "ferries",
            Avoid::Indoor => "indoor",
        }
    }
}

/// Unit system for human-readable text in provider responses.
///
/// Numeric values are always meters and seconds regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

/// Options shared by every sub-request derived from one logical request.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RequestOptions {
    pub mode: TravelMode,
    pub avoid: Vec<Avoid>,
    pub units: Units,
    /// Language code for returned text, e.g. `"en"`.
    pub language: Option<String>,
    /// Region bias as a ccTLD, e.g. `"co"`.
    pub region: Option<String>,
    /// Departure time as seconds since the Unix epoch.
    pub departure_time: Option<u64>,
}

/// A distance matrix request between every origin and every destination.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatrixRequest {
    pub origins: Vec<GpsPoint>,
    pub destinations: Vec<GpsPoint>,
    pub options: RequestOptions,
}

impl MatrixRequest {
    pub fn new(origins: Vec<GpsPoint>, destinations: Vec<GpsPoint>) -> Self {
        Self {
            origins,
            destinations,
            options: RequestOptions::default(),
        }
    }

    /// Number of origin × destination cells this request asks for.
    pub fn elements(&self) -> usize {
        self.origins.len() * self.destinations.len()
    }
}

/// One cell of a matrix response, in provider-native units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatrixElement {
    /// Distance in meters.
    pub distance_meters: f64,
    /// Duration in seconds.
    pub duration_seconds: f64,
}

/// One row of a matrix response: the elements for a single origin.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatrixRow {
    pub elements: Vec<MatrixElement>,
}

/// A matrix response: one row per requested origin, one element per destination.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatrixResponse {
    pub rows: Vec<MatrixRow>,
}

/// A directions request from `origin` to `destination` through `waypoints`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectionsRequest {
    pub origin: GpsPoint,
    pub destination: GpsPoint,
    pub waypoints: Vec<GpsPoint>,
    pub options: RequestOptions,
}

impl DirectionsRequest {
    pub fn new(origin: GpsPoint, destination: GpsPoint, waypoints: Vec<GpsPoint>) -> Self {
        Self {
            origin,
            destination,
            waypoints,
            options: RequestOptions::default(),
        }
    }

    /// The full ordered path: origin, waypoints, destination.
    pub fn points(&self) -> Vec<GpsPoint> {
        let mut points = Vec::with_capacity(self.waypoints.len() + 2);
        points.push(self.origin);
        points.extend_from_slice(&self.waypoints);
        points.push(self.destination);
        points
    }
}

/// One step of a leg, carrying its compact encoded polyline.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step {
    pub polyline: String,
}

/// The portion of a route between two consecutive path points.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Leg {
    pub steps: Vec<Step>,
}

/// A route returned by a directions request.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    pub legs: Vec<Leg>,
    /// Encoded polyline approximating the whole route.
    pub overview_polyline: String,
}

/// A mapping provider able to answer single, limit-compliant requests.
///
/// Implementations are shared across concurrently running tasks, so they must
/// be `Send + Sync` and their futures `Send`. Limits are enforced by the
/// caller: a client only ever sees requests that fit in [`crate::BatchConfig`].
pub trait MapsClient: Send + Sync + 'static {
    /// Answer a single distance matrix request.
    fn distance_matrix(
        &self,
        request: &MatrixRequest,
    ) -> impl Future<Output = Result<MatrixResponse>> + Send;

    /// Answer a single directions request. Returns at least one route on success.
    fn directions(
        &self,
        request: &DirectionsRequest,
    ) -> impl Future<Output = Result<Vec<Route>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directions_points_order() {
        let request = DirectionsRequest::new(
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(3.0, 3.0),
            vec![GpsPoint::new(1.0, 1.0), GpsPoint::new(2.0, 2.0)],
        );
        let points = request.points();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], request.origin);
        assert_eq!(points[3], request.destination);
        assert_eq!(points[1].latitude, 1.0);
    }

    #[test]
    fn test_matrix_request_elements() {
        let request = MatrixRequest::new(vec![GpsPoint::new(0.0, 0.0); 3], vec![GpsPoint::new(1.0, 1.0); 7]);
        assert_eq!(request.elements(), 21);
    }

    #[test]
    fn test_option_strings() {
        assert_eq!(TravelMode::default().as_str(), "driving");
        assert_eq!(Avoid::Tolls.as_str(), "tolls");
        assert_eq!(Units::Imperial.as_str(), "imperial");
    }
}
