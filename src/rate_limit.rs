//! Element-budget rate limiting between matrix waves.
//!
//! A token bucket holding up to `capacity` elements, refilled continuously at
//! `capacity` per `window`. Each wave reserves its element count before it is
//! dispatched; when the bucket would go negative the caller sleeps until the
//! deficit has been refilled. Reservation happens under the lock, waiting
//! happens outside it, so concurrent callers queue up in reservation order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::debug;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Bucket {
    available: f64,
    last_refill: Instant,
}

/// Token bucket measured in matrix elements.
pub struct ElementRateLimiter {
    bucket: Mutex<Bucket>,
    capacity: f64,
    window: Duration,
    reserved_total: AtomicU64,
}

impl ElementRateLimiter {
    /// Create a limiter allowing `capacity` elements per `window`, starting full.
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                available: capacity as f64,
                last_refill: Instant::now(),
            }),
            capacity: capacity as f64,
            window,
            reserved_total: AtomicU64::new(0),
        }
    }

    /// Wait until `elements` can be spent, then spend them.
    ///
    /// Requests larger than the capacity are charged as a full bucket so an
    /// oversized wave waits for at most one window instead of forever.
    /// Returns how long the caller waited.
    pub async fn acquire(&self, elements: usize) -> Duration {
        let charge = (elements as f64).min(self.capacity);

        let wait = {
            let mut bucket = self.bucket.lock().await;
            let now = Instant::now();

            let elapsed = now.saturating_duration_since(bucket.last_refill);
            let refill = elapsed.as_secs_f64() / self.window.as_secs_f64() * self.capacity;
            bucket.available = (bucket.available + refill).min(self.capacity);
            bucket.last_refill = now;

            bucket.available -= charge;
            self.reserved_total.fetch_add(elements as u64, Ordering::Relaxed);

            if bucket.available < 0.0 {
                self.window.mul_f64(-bucket.available / self.capacity)
            } else {
                Duration::ZERO
            }
        };

        if !wait.is_zero() {
            debug!("[ElementRateLimiter] Waiting {:?} for {} elements", wait, elements);
            tokio::time::sleep(wait).await;
        }

        wait
    }

    /// Total elements reserved since creation.
    pub fn reserved_total(&self) -> u64 {
        self.reserved_total.load(Ordering::Relaxed)
    }
}
