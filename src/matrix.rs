//! # Distance/Duration Matrices
//!
//! Orchestrates the full matrix pipeline:
//!
//! 1. [`split`] the request into limit-compliant sub-requests
//! 2. [`group`] them into waves that fit the per-second element budget
//! 3. per wave, sequentially: wait for the rate limiter, [`execute`] the wave
//!    concurrently, then write the sub-responses into the output matrices
//!
//! Waves write disjoint cells, so assembling after each wave is equivalent to
//! assembling once at the end.
//!
//! [`split`]: crate::partition::split
//! [`group`]: crate::batch::group
//! [`execute`]: crate::executor::execute

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::batch::{group, wave_elements};
use crate::executor::execute;
use crate::partition::{split, MatrixSubRequest, MatrixSubResponse};
use crate::provider::{MapsClient, MatrixRequest};
use crate::rate_limit::ElementRateLimiter;
use crate::{BatchConfig, Error, GpsPoint, Result};

/// Row-major matrix indexed `[origin][destination]`.
pub type Matrix = Vec<Vec<f64>>;

/// Writes sub-responses into full-size distance and duration matrices.
pub struct MatrixAssembler {
    distances: Matrix,
    durations: Matrix,
}

impl MatrixAssembler {
    /// Create zero-filled `num_origins × num_destinations` matrices.
    pub fn new(num_origins: usize, num_destinations: usize) -> Self {
        Self {
            distances: vec![vec![0.0; num_destinations]; num_origins],
            durations: vec![vec![0.0; num_destinations]; num_origins],
        }
    }

    /// Copy the cells of one sub-response to their absolute positions.
    ///
    /// Fails with [`Error::MalformedResponse`] if the response shape does not
    /// match its references or the references fall outside the matrices.
    pub fn add(&mut self, sub: &MatrixSubResponse) -> Result<()> {
        let rows = &sub.response.rows;
        if rows.len() != sub.origins.count {
            return Err(Error::MalformedResponse(format!(
                "expected {} rows for origins {}..{}, got {}",
                sub.origins.count,
                sub.origins.start,
                sub.origins.end(),
                rows.len()
            )));
        }
        if sub.origins.end() > self.distances.len()
            || sub.destinations.end() > self.distances.first().map_or(0, Vec::len)
        {
            return Err(Error::MalformedResponse(format!(
                "references {:?}/{:?} outside the output matrix",
                sub.origins, sub.destinations
            )));
        }

        for (i, row) in rows.iter().enumerate() {
            if row.elements.len() != sub.destinations.count {
                return Err(Error::MalformedResponse(format!(
                    "expected {} elements in row {}, got {}",
                    sub.destinations.count,
                    sub.origins.start + i,
                    row.elements.len()
                )));
            }

            let from = sub.origins.start + i;
            for (j, element) in row.elements.iter().enumerate() {
                let to = sub.destinations.start + j;
                self.distances[from][to] = element.distance_meters;
                self.durations[from][to] = element.duration_seconds;
            }
        }

        Ok(())
    }

    /// Return `(distances, durations)`.
    pub fn finish(self) -> (Matrix, Matrix) {
        (self.distances, self.durations)
    }
}

/// A [`MapsClient`] wrapped with partitioning, batching, and rate limiting.
///
/// Calls made through the same `BatchedClient` share one element budget, so
/// back-to-back matrices do not overrun the provider's per-second limit.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use route_matrix::{BatchedClient, GpsPoint, HaversineClient, MatrixRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), route_matrix::Error> {
/// let batched = BatchedClient::new(Arc::new(HaversineClient::default()));
/// let points: Vec<GpsPoint> = (0..30).map(|i| GpsPoint::new(51.5 + i as f64 * 0.001, -0.12)).collect();
///
/// let request = MatrixRequest::new(points.clone(), points);
/// let (distances, _durations) = batched.distance_duration_matrices(&request).await?;
/// assert_eq!(distances.len(), 30);
/// assert_eq!(distances[3][3], 0.0);
/// # Ok(())
/// # }
/// ```
pub struct BatchedClient<C> {
    pub(crate) client: Arc<C>,
    pub(crate) config: BatchConfig,
    pub(crate) rate_limiter: Arc<ElementRateLimiter>,
    pub(crate) cancel: CancellationToken,
}

impl<C: MapsClient> BatchedClient<C> {
    /// Wrap `client` with the default provider limits.
    pub fn new(client: Arc<C>) -> Self {
        Self::from_parts(client, BatchConfig::default())
    }

    /// Wrap `client` with custom limits.
    pub fn with_config(client: Arc<C>, config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(client, config))
    }

    fn from_parts(client: Arc<C>, config: BatchConfig) -> Self {
        let rate_limiter = Arc::new(ElementRateLimiter::new(
            config.max_elements_per_second,
            config.rate_window,
        ));
        Self {
            client,
            config,
            rate_limiter,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight and future calls when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Compute full distance (meters) and duration (seconds) matrices.
    ///
    /// The request is split and batched so that no provider call exceeds the
    /// configured limits. Any failing sub-request fails the whole call.
    pub async fn distance_duration_matrices(&self, request: &MatrixRequest) -> Result<(Matrix, Matrix)> {
        validate_points("origin", &request.origins)?;
        validate_points("destination", &request.destinations)?;

        let num_origins = request.origins.len();
        let num_destinations = request.destinations.len();
        let start = Instant::now();

        let requests = split(request, self.config.max_addresses, self.config.max_elements);
        let num_requests = requests.len();
        let waves = group(requests, self.config.max_elements_per_second);
        let num_waves = waves.len();

        info!(
            "[BatchedClient] Matrix {}x{}: {} sub-requests in {} waves",
            num_origins, num_destinations, num_requests, num_waves
        );

        let mut assembler = MatrixAssembler::new(num_origins, num_destinations);
        for (wave_index, wave) in waves.into_iter().enumerate() {
            let elements = wave_elements(&wave);
            let waited = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                waited = self.rate_limiter.acquire(elements) => waited,
            };

            let wave_start = Instant::now();
            let wave_size = wave.len();
            let responses = self.execute_wave(wave).await?;
            for response in &responses {
                assembler.add(response)?;
            }

            debug!(
                "[BatchedClient] Wave {}/{}: {} requests, {} elements, waited {:?}, took {:.2}s ({} elements reserved so far)",
                wave_index + 1,
                num_waves,
                wave_size,
                elements,
                waited,
                wave_start.elapsed().as_secs_f64(),
                self.rate_limiter.reserved_total()
            );
        }

        info!(
            "[BatchedClient] Matrix {}x{} done in {:.2}s",
            num_origins,
            num_destinations,
            start.elapsed().as_secs_f64()
        );

        Ok(assembler.finish())
    }

    async fn execute_wave(&self, wave: Vec<MatrixSubRequest>) -> Result<Vec<MatrixSubResponse>> {
        let client = Arc::clone(&self.client);
        execute(wave, self.config.max_concurrency, &self.cancel, move |sub: MatrixSubRequest| {
            let client = Arc::clone(&client);
            async move {
                let response = client.distance_matrix(&sub.request).await?;
                Ok(MatrixSubResponse {
                    response,
                    origins: sub.origins,
                    destinations: sub.destinations,
                })
            }
        })
        .await
    }
}

pub(crate) fn validate_points(kind: &str, points: &[GpsPoint]) -> Result<()> {
    if points.is_empty() {
        return Err(Error::InvalidInput(format!("at least one {} is required", kind)));
    }
    if let Some((index, point)) = points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
        return Err(Error::InvalidInput(format!(
            "{} {} has invalid coordinates {:?}",
            kind, index, point
        )));
    }
    Ok(())
}

/// Compute distance and duration matrices with the default provider limits.
///
/// Shorthand for [`BatchedClient::distance_duration_matrices`] on a fresh
/// [`BatchedClient`].
pub async fn distance_duration_matrices<C: MapsClient>(
    client: Arc<C>,
    origins: &[GpsPoint],
    destinations: &[GpsPoint],
) -> Result<(Matrix, Matrix)> {
    let request = MatrixRequest::new(origins.to_vec(), destinations.to_vec());
    BatchedClient::new(client).distance_duration_matrices(&request).await
}
