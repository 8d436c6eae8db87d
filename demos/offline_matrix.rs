//! Builds a distance/duration matrix and route polylines for a small city grid
//! using the offline great-circle provider.
//!
//! Run with `RUST_LOG=debug cargo run --example offline_matrix` to see the
//! partitioning and wave scheduling.

use std::sync::Arc;
use std::time::Instant;

use route_matrix::{polyline, BatchConfig, BatchedClient, GpsPoint, HaversineClient, MatrixRequest};

#[tokio::main]
async fn main() -> Result<(), route_matrix::Error> {
    env_logger::init();

    let points: Vec<GpsPoint> = (0..40)
        .map(|i| GpsPoint::new(4.60 + (i / 8) as f64 * 0.01, -74.10 + (i % 8) as f64 * 0.01))
        .collect();

    let config = BatchConfig {
        max_elements_per_second: 400,
        ..BatchConfig::default()
    };
    let client = BatchedClient::with_config(Arc::new(HaversineClient::new(8.0)), config)?;

    let start = Instant::now();
    let request = MatrixRequest::new(points.clone(), points.clone());
    let (distances, durations) = client.distance_duration_matrices(&request).await?;
    println!(
        "{}x{} matrix in {:?}",
        distances.len(),
        distances[0].len(),
        start.elapsed()
    );
    println!(
        "corner to corner: {:.0} m, {:.0} s",
        distances[0][points.len() - 1],
        durations[0][points.len() - 1]
    );

    let (overview, legs) = route_matrix::polylines(client.client().clone(), &points).await?;
    let overview_points = polyline::decode(&overview)?;
    println!(
        "path of {} points: {} legs, overview with {} points",
        points.len(),
        legs.len(),
        overview_points.len()
    );

    Ok(())
}
