//! HTTP client for Google-Maps-compatible Distance Matrix and Directions APIs.
//!
//! This module provides a [`MapsClient`] over HTTP with:
//! - Connection pooling for concurrent sub-requests of a wave
//! - Request timeouts so a stuck call cannot hold a wave forever
//! - Mapping of HTTP and API-level statuses onto [`Error`]
//!
//! It sends exactly one HTTP request per call. Splitting, batching, and rate
//! limiting are done by [`crate::BatchedClient`].

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::provider::{
    DirectionsRequest, Leg, MapsClient, MatrixElement, MatrixRequest, MatrixResponse, MatrixRow,
    RequestOptions, Route, Step,
};
use crate::{Error, GpsPoint, Result};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";
const DISTANCE_MATRIX_PATH: &str = "/maps/api/distancematrix/json";
const DIRECTIONS_PATH: &str = "/maps/api/directions/json";
const MAX_IDLE_CONNECTIONS: usize = 100;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API response for the distance matrix endpoint
#[derive(Debug, Deserialize)]
struct MatrixApiResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<ApiRow>,
}

#[derive(Debug, Deserialize)]
struct ApiRow {
    elements: Vec<ApiElement>,
}

#[derive(Debug, Deserialize)]
struct ApiElement {
    status: String,
    distance: Option<ApiValue>,
    duration: Option<ApiValue>,
}

#[derive(Debug, Deserialize)]
struct ApiValue {
    value: f64,
}

/// API response for the directions endpoint
#[derive(Debug, Deserialize)]
struct DirectionsApiResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    overview_polyline: ApiPolyline,
    #[serde(default)]
    legs: Vec<ApiLeg>,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    #[serde(default)]
    steps: Vec<ApiStep>,
}

#[derive(Debug, Deserialize)]
struct ApiStep {
    polyline: ApiPolyline,
}

#[derive(Debug, Deserialize)]
struct ApiPolyline {
    points: String,
}

/// Client for a Google-Maps-compatible provider.
pub struct GoogleMapsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleMapsClient {
    /// Create a client for the public Google Maps endpoints.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client for a compatible provider rooted at `base_url`.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, mut query: Vec<(&'static str, String)>) -> Result<T> {
        query.push(("key", self.api_key.clone()));
        let url = format!("{}{}", self.base_url, path);
        let req_start = Instant::now();

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();
        let headers_elapsed = req_start.elapsed();

        let bytes = response.bytes().await?;
        if !status.is_success() {
            warn!("[GoogleMapsClient] {} returned HTTP {} after {:?}", path, status, headers_elapsed);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let json_start = Instant::now();
        let data = serde_json::from_slice(&bytes)
            .map_err(|e| Error::MalformedResponse(format!("JSON parse error: {}", e)))?;

        debug!(
            "[GoogleMapsClient] {} headers={:?} body={:.1}KB json={:?} total={:?}",
            path,
            headers_elapsed,
            bytes.len() as f64 / 1024.0,
            json_start.elapsed(),
            req_start.elapsed()
        );

        Ok(data)
    }
}

fn join_locations(points: &[GpsPoint]) -> String {
    points.iter().map(GpsPoint::to_string).collect::<Vec<_>>().join("|")
}

fn push_options(options: &RequestOptions, query: &mut Vec<(&'static str, String)>) {
    query.push(("mode", options.mode.as_str().to_string()));
    query.push(("units", options.units.as_str().to_string()));
    if !options.avoid.is_empty() {
        let avoid: Vec<&str> = options.avoid.iter().map(|a| a.as_str()).collect();
        query.push(("avoid", avoid.join("|")));
    }
    if let Some(language) = &options.language {
        query.push(("language", language.clone()));
    }
    if let Some(region) = &options.region {
        query.push(("region", region.clone()));
    }
    if let Some(departure_time) = options.departure_time {
        query.push(("departure_time", departure_time.to_string()));
    }
}

fn check_status(status: &str, error_message: Option<String>) -> Result<()> {
    if status == "OK" {
        return Ok(());
    }
    Err(Error::Provider {
        status: status.to_string(),
        message: error_message.unwrap_or_default(),
    })
}

impl MapsClient for GoogleMapsClient {
    async fn distance_matrix(&self, request: &MatrixRequest) -> Result<MatrixResponse> {
        let mut query = vec![
            ("origins", join_locations(&request.origins)),
            ("destinations", join_locations(&request.destinations)),
        ];
        push_options(&request.options, &mut query);

        let data: MatrixApiResponse = self.get_json(DISTANCE_MATRIX_PATH, query).await?;
        check_status(&data.status, data.error_message)?;

        let rows = data
            .rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| MatrixRow {
                elements: row
                    .elements
                    .into_iter()
                    .enumerate()
                    .map(|(j, element)| {
                        if element.status != "OK" {
                            // Unroutable pairs keep zero cells.
                            warn!(
                                "[GoogleMapsClient] Element ({}, {}) status {}",
                                i, j, element.status
                            );
                        }
                        MatrixElement {
                            distance_meters: element.distance.map_or(0.0, |d| d.value),
                            duration_seconds: element.duration.map_or(0.0, |d| d.value),
                        }
                    })
                    .collect(),
            })
            .collect();

        info!(
            "[GoogleMapsClient] Distance matrix {}x{} OK",
            request.origins.len(),
            request.destinations.len()
        );

        Ok(MatrixResponse { rows })
    }

    async fn directions(&self, request: &DirectionsRequest) -> Result<Vec<Route>> {
        let mut query = vec![
            ("origin", request.origin.to_string()),
            ("destination", request.destination.to_string()),
        ];
        if !request.waypoints.is_empty() {
            query.push(("waypoints", join_locations(&request.waypoints)));
        }
        push_options(&request.options, &mut query);

        let data: DirectionsApiResponse = self.get_json(DIRECTIONS_PATH, query).await?;
        check_status(&data.status, data.error_message)?;

        let routes: Vec<Route> = data
            .routes
            .into_iter()
            .map(|route| Route {
                overview_polyline: route.overview_polyline.points,
                legs: route
                    .legs
                    .into_iter()
                    .map(|leg| Leg {
                        steps: leg
                            .steps
                            .into_iter()
                            .map(|step| Step {
                                polyline: step.polyline.points,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        if routes.is_empty() {
            return Err(Error::MalformedResponse("directions response without routes".to_string()));
        }

        info!(
            "[GoogleMapsClient] Directions with {} waypoints OK",
            request.waypoints.len()
        );

        Ok(routes)
    }
}
