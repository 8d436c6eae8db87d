//! # Route Polylines
//!
//! Per-leg and overview polylines for a path longer than one directions
//! request can carry.
//!
//! The path is cut into runs of at most `max_waypoints` edges. Consecutive runs
//! share their boundary point, so together they cover every edge exactly once:
//!
//! ```text
//! points:  0   1   2   3   4   5   6      (max_waypoints = 3)
//! run 0:   0---1---2---3
//! run 1:               3---4---5---6
//! ```
//!
//! Runs are fetched concurrently and tagged with their submission index. After
//! collection they are sorted back into path order and every leg is written to
//! a pre-sized slot addressed by its global edge number, then re-encoded. The
//! overview polyline comes from one extra origin → destination request.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};

use crate::executor::execute;
use crate::matrix::{validate_points, BatchedClient};
use crate::polyline;
use crate::provider::{DirectionsRequest, MapsClient, Route};
use crate::{Error, GpsPoint, Result};

/// One run of the path, covering edges `first_leg..first_leg + num_legs`.
#[derive(Debug, Clone)]
pub struct DirectionSubRequest {
    pub request: DirectionsRequest,
    /// Submission order.
    pub index: usize,
    pub first_leg: usize,
    pub num_legs: usize,
}

/// Routes returned for a [`DirectionSubRequest`], carrying its position.
#[derive(Debug, Clone)]
pub struct DirectionSubResponse {
    pub routes: Vec<Route>,
    pub index: usize,
    pub first_leg: usize,
    pub num_legs: usize,
}

/// Cut the path of `request` into runs of at most `max_waypoints` edges.
///
/// Produces `ceil((points - 1) / max_waypoints)` sub-requests. Each keeps the
/// options of `request`; the last point of a run is the first of the next.
pub fn split_path(request: &DirectionsRequest, max_waypoints: usize) -> Vec<DirectionSubRequest> {
    let points = request.points();
    let num_edges = points.len() - 1;
    if max_waypoints == 0 {
        return Vec::new();
    }

    (0..num_edges)
        .step_by(max_waypoints)
        .enumerate()
        .map(|(index, start)| {
            let end = (start + max_waypoints).min(num_edges);
            let mut sub = request.clone();
            sub.origin = points[start];
            sub.destination = points[end];
            sub.waypoints = points[start + 1..end].to_vec();
            DirectionSubRequest {
                request: sub,
                index,
                first_leg: start,
                num_legs: end - start,
            }
        })
        .collect()
}

/// Decode every leg of `responses` into its slot and re-encode one polyline per leg.
///
/// `responses` may arrive in any order; they are sorted by submission index
/// first. Each response must provide exactly the legs its run covers.
pub fn stitch_legs(mut responses: Vec<DirectionSubResponse>, num_legs: usize) -> Result<Vec<String>> {
    responses.sort_by_key(|r| r.index);

    let mut legs: Vec<Option<Vec<GpsPoint>>> = vec![None; num_legs];
    for response in &responses {
        let route = response.routes.first().ok_or_else(|| {
            Error::MalformedResponse(format!("no route for path run {}", response.index))
        })?;
        if route.legs.len() != response.num_legs {
            return Err(Error::MalformedResponse(format!(
                "path run {} expected {} legs, got {}",
                response.index,
                response.num_legs,
                route.legs.len()
            )));
        }

        for (offset, leg) in route.legs.iter().enumerate() {
            let slot = legs.get_mut(response.first_leg + offset).ok_or_else(|| {
                Error::MalformedResponse(format!(
                    "leg {} beyond the {} legs of the path",
                    response.first_leg + offset,
                    num_legs
                ))
            })?;

            let mut points = Vec::new();
            for step in &leg.steps {
                points.extend(polyline::decode(&step.polyline)?);
            }
            *slot = Some(points);
        }
    }

    legs.into_iter()
        .enumerate()
        .map(|(i, leg)| {
            leg.map(|points| polyline::encode(&points))
                .ok_or_else(|| Error::MalformedResponse(format!("leg {} missing from responses", i)))
        })
        .collect()
}

impl<C: MapsClient> BatchedClient<C> {
    /// Return `(overview, legs)`: one polyline for the whole route and one per
    /// edge of the path.
    ///
    /// Any failing request or undecodable polyline fails the whole call.
    pub async fn polylines(&self, request: &DirectionsRequest) -> Result<(String, Vec<String>)> {
        let points = request.points();
        validate_points("path point", &points)?;

        let start = Instant::now();
        let num_legs = points.len() - 1;
        let runs = split_path(request, self.config.max_waypoints);

        info!(
            "[RouteStitcher] Path of {} points: {} direction requests + 1 overview",
            points.len(),
            runs.len()
        );

        let mut overview_request = request.clone();
        overview_request.waypoints.clear();

        let (legs, overview) = futures::try_join!(
            self.fetch_legs(runs, num_legs),
            self.fetch_overview(&overview_request)
        )?;

        debug!(
            "[RouteStitcher] Stitched {} legs in {:.2}s",
            legs.len(),
            start.elapsed().as_secs_f64()
        );

        Ok((overview, legs))
    }

    async fn fetch_legs(&self, runs: Vec<DirectionSubRequest>, num_legs: usize) -> Result<Vec<String>> {
        let client = Arc::clone(&self.client);
        let responses = execute(runs, self.config.max_concurrency, &self.cancel, move |run: DirectionSubRequest| {
            let client = Arc::clone(&client);
            async move {
                let routes = client.directions(&run.request).await?;
                Ok(DirectionSubResponse {
                    routes,
                    index: run.index,
                    first_leg: run.first_leg,
                    num_legs: run.num_legs,
                })
            }
        })
        .await?;

        stitch_legs(responses, num_legs)
    }

    async fn fetch_overview(&self, request: &DirectionsRequest) -> Result<String> {
        let routes = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            routes = self.client.directions(request) => routes?,
        };
        routes
            .into_iter()
            .next()
            .map(|route| route.overview_polyline)
            .ok_or_else(|| Error::MalformedResponse("no route for overview request".to_string()))
    }
}

/// Fetch overview and per-leg polylines for `points` with the default limits.
///
/// `points` is the full ordered path (origin, waypoints, destination) and must
/// hold at least two points.
pub async fn polylines<C: MapsClient>(client: Arc<C>, points: &[GpsPoint]) -> Result<(String, Vec<String>)> {
    let (origin, destination) = match points {
        [origin, .., destination] => (*origin, *destination),
        _ => {
            return Err(Error::InvalidInput(format!(
                "a path needs at least two points, got {}",
                points.len()
            )))
        }
    };
    let request = DirectionsRequest::new(origin, destination, points[1..points.len() - 1].to_vec());
    BatchedClient::new(client).polylines(&request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Leg, Step};
    use crate::test_support::{leg_midpoint, path_point, MockClient};
    use crate::BatchConfig;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn path(num_points: usize) -> Vec<GpsPoint> {
        (0..num_points).map(path_point).collect()
    }

    fn request(num_points: usize) -> DirectionsRequest {
        let points = path(num_points);
        DirectionsRequest::new(points[0], points[num_points - 1], points[1..num_points - 1].to_vec())
    }

    fn approx_eq(a: &GpsPoint, b: &GpsPoint) -> bool {
        (a.latitude - b.latitude).abs() < 1e-5 && (a.longitude - b.longitude).abs() < 1e-5
    }

    #[test]
    fn test_split_path_continuity() {
        for num_points in 2..80 {
            for block in [1, 2, 3, 7, 25] {
                let points = path(num_points);
                let runs = split_path(&request(num_points), block);

                assert_eq!(runs.len(), (num_points - 1).div_ceil(block));
                assert_eq!(runs[0].request.origin, points[0]);
                assert_eq!(runs.last().unwrap().request.destination, points[num_points - 1]);

                let mut edges = 0;
                for (k, run) in runs.iter().enumerate() {
                    assert_eq!(run.index, k);
                    assert_eq!(run.first_leg, edges);
                    assert!(run.num_legs >= 1 && run.num_legs <= block);
                    assert_eq!(run.request.waypoints.len(), run.num_legs - 1);
                    assert_eq!(run.request.origin, points[run.first_leg]);
                    edges += run.num_legs;
                }
                assert_eq!(edges, num_points - 1);

                for pair in runs.windows(2) {
                    assert_eq!(pair[0].request.destination, pair[1].request.origin);
                }
            }
        }
    }

    #[test]
    fn test_split_path_two_points() {
        let runs = split_path(&request(2), 25);
        assert_eq!(runs.len(), 1);
        assert!(runs[0].request.waypoints.is_empty());
    }

    #[test]
    fn test_stitch_legs_rejects_missing_leg() {
        let response = DirectionSubResponse {
            routes: vec![Route {
                legs: vec![Leg { steps: vec![Step { polyline: polyline::encode(&path(2)) }] }],
                overview_polyline: String::new(),
            }],
            index: 0,
            first_leg: 0,
            num_legs: 2,
        };
        let err = stitch_legs(vec![response], 2).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polylines_stitches_out_of_order_responses() {
        let client = Arc::new(MockClient {
            reverse_delay: true,
            ..MockClient::default()
        });
        let points = path(60);

        let (overview, legs) = polylines(Arc::clone(&client), &points).await.unwrap();

        // 59 edges in runs of 25 plus the overview request.
        assert_eq!(client.directions_calls.lock().unwrap().len(), 4);
        assert_eq!(legs.len(), 59);
        // The overview request carries no waypoints.
        assert_eq!(overview, polyline::encode(&[points[0], points[59]]));

        for (k, leg) in legs.iter().enumerate() {
            let decoded = polyline::decode(leg).unwrap();
            let mid = leg_midpoint(&points[k], &points[k + 1]);
            let expected = [points[k], mid, mid, points[k + 1]];
            assert_eq!(decoded.len(), expected.len(), "leg {}", k);
            for (got, want) in decoded.iter().zip(&expected) {
                assert!(approx_eq(got, want), "leg {}: {:?} vs {:?}", k, got, want);
            }
        }
    }

    #[tokio::test]
    async fn test_polylines_two_points_single_leg_request() {
        let client = Arc::new(MockClient::default());
        let (_, legs) = polylines(Arc::clone(&client), &path(2)).await.unwrap();

        assert_eq!(legs.len(), 1);
        let calls = client.directions_calls.lock().unwrap();
        // One leg request and one overview request.
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.waypoints.is_empty()));
    }

    #[tokio::test]
    async fn test_polylines_custom_block_size() {
        let client = Arc::new(MockClient::default());
        let config = BatchConfig {
            max_waypoints: 4,
            ..BatchConfig::default()
        };
        let batched = BatchedClient::with_config(Arc::clone(&client), config).unwrap();

        let (_, legs) = batched.polylines(&request(10)).await.unwrap();
        assert_eq!(legs.len(), 9);

        let calls = client.directions_calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|c| c.waypoints.len() <= 3));
    }

    #[tokio::test]
    async fn test_polylines_propagates_decode_error() {
        let client = Arc::new(MockClient {
            step_polyline_override: Some("_p~iF ~ps|U".to_string()),
            ..MockClient::default()
        });

        let err = polylines(client, &path(5)).await.unwrap_err();
        assert!(matches!(err, Error::PolylineDecode { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_polylines_propagates_overview_error() {
        let client = Arc::new(MockClient {
            fail_overview: true,
            ..MockClient::default()
        });

        let err = polylines(client, &path(5)).await.unwrap_err();
        assert!(matches!(err, Error::Provider { .. }), "{:?}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polylines_cancelled_in_flight() {
        let client = Arc::new(MockClient {
            reverse_delay: true,
            ..MockClient::default()
        });
        let token = CancellationToken::new();
        let batched = BatchedClient::new(Arc::clone(&client)).with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        let start = tokio::time::Instant::now();
        let err = batched.polylines(&request(60)).await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, Error::Cancelled), "{:?}", err);
        // Every request was still sleeping when the token fired.
        assert!(start.elapsed() < Duration::from_millis(500), "elapsed {:?}", start.elapsed());
        assert_eq!(client.directions_calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_polylines_requires_two_points() {
        let client = Arc::new(MockClient::default());
        let err = polylines(Arc::clone(&client), &path(1)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(client.directions_calls.lock().unwrap().is_empty());
    }
}
