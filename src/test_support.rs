//! Deterministic in-memory provider used by the unit tests.

use std::sync::Mutex;
use std::time::Duration;

use crate::polyline;
use crate::provider::{
    DirectionsRequest, Leg, MapsClient, MatrixElement, MatrixRequest, MatrixResponse, MatrixRow,
    Route, Step,
};
use crate::{Error, GpsPoint, Result};

/// Matrix cells encode their own coordinates: origin `i` sits at latitude
/// `i`, destination `j` at longitude `j`, and the returned distance is
/// `1000 * i + j`, the duration `i + j / 2`.
pub fn matrix_points(num_origins: usize, num_destinations: usize) -> (Vec<GpsPoint>, Vec<GpsPoint>) {
    let origins = (0..num_origins).map(|i| GpsPoint::new(i as f64 * 0.5, 0.0)).collect();
    let destinations = (0..num_destinations).map(|j| GpsPoint::new(0.0, j as f64 * 0.5)).collect();
    (origins, destinations)
}

pub fn expected_distance(i: usize, j: usize) -> f64 {
    1000.0 * i as f64 + j as f64
}

pub fn expected_duration(i: usize, j: usize) -> f64 {
    i as f64 + j as f64 / 2.0
}

/// Path point `k` of a test route.
pub fn path_point(k: usize) -> GpsPoint {
    GpsPoint::new(k as f64 * 0.1, k as f64 * 0.1)
}

/// Midpoint inserted in every mock leg between its two endpoints.
pub fn leg_midpoint(a: &GpsPoint, b: &GpsPoint) -> GpsPoint {
    GpsPoint::new((a.latitude + b.latitude) / 2.0, (a.longitude + b.longitude) / 2.0)
}

#[derive(Default)]
pub struct MockClient {
    pub matrix_calls: Mutex<Vec<MatrixRequest>>,
    pub directions_calls: Mutex<Vec<DirectionsRequest>>,
    /// Origin latitude that makes the matrix call fail.
    pub fail_matrix_at: Option<f64>,
    /// Return one row fewer than requested.
    pub drop_matrix_row: bool,
    /// Requests starting further along the path finish first.
    pub reverse_delay: bool,
    /// Replace every step polyline with this string.
    pub step_polyline_override: Option<String>,
    /// Fail directions requests that carry no waypoints.
    pub fail_overview: bool,
}

impl MapsClient for MockClient {
    async fn distance_matrix(&self, request: &MatrixRequest) -> Result<MatrixResponse> {
        self.matrix_calls
            .lock()
            .map_err(|_| Error::MalformedResponse("poisoned".to_string()))?
            .push(request.clone());

        if let Some(lat) = self.fail_matrix_at {
            if request.origins.iter().any(|o| o.latitude == lat) {
                return Err(Error::Provider {
                    status: "OVER_QUERY_LIMIT".to_string(),
                    message: "quota exceeded".to_string(),
                });
            }
        }

        let mut rows: Vec<MatrixRow> = request
            .origins
            .iter()
            .map(|o| MatrixRow {
                elements: request
                    .destinations
                    .iter()
                    .map(|d| {
                        let (i, j) = ((o.latitude * 2.0) as usize, (d.longitude * 2.0) as usize);
                        MatrixElement {
                            distance_meters: expected_distance(i, j),
                            duration_seconds: expected_duration(i, j),
                        }
                    })
                    .collect(),
            })
            .collect();

        if self.drop_matrix_row {
            rows.pop();
        }

        Ok(MatrixResponse { rows })
    }

    async fn directions(&self, request: &DirectionsRequest) -> Result<Vec<Route>> {
        self.directions_calls
            .lock()
            .map_err(|_| Error::MalformedResponse("poisoned".to_string()))?
            .push(request.clone());

        if self.fail_overview && request.waypoints.is_empty() {
            return Err(Error::Provider {
                status: "ZERO_RESULTS".to_string(),
                message: "no route".to_string(),
            });
        }

        if self.reverse_delay {
            let delay = 1000.0 - request.origin.latitude * 100.0;
            tokio::time::sleep(Duration::from_millis(delay.max(0.0) as u64)).await;
        }

        let points = request.points();
        let legs = points
            .windows(2)
            .map(|pair| {
                let mid = leg_midpoint(&pair[0], &pair[1]);
                let steps = match &self.step_polyline_override {
                    Some(polyline) => vec![Step { polyline: polyline.clone() }],
                    None => vec![
                        Step { polyline: polyline::encode(&[pair[0], mid]) },
                        Step { polyline: polyline::encode(&[mid, pair[1]]) },
                    ],
                };
                Leg { steps }
            })
            .collect();

        Ok(vec![Route {
            legs,
            overview_polyline: polyline::encode(&points),
        }])
    }
}
