//! # Request Partitioning
//!
//! Splits one logical distance matrix request into sub-requests that each fit
//! the provider's per-request limits, tagging every sub-request with the
//! [`Reference`]s that locate it inside the full origin × destination grid.
//!
//! ## Algorithm
//!
//! Origins are walked in chunks of at most `max_addresses`. For each origin
//! chunk, destinations are walked in chunks sized so that
//! `origins × destinations ≤ max_elements` (and never more than
//! `max_addresses`). Every (origin chunk, destination chunk) pair becomes one
//! sub-request, so the produced references tile the grid exactly once.
//!
//! ```text
//! 30 origins × 8 destinations, 25 addresses / 100 elements:
//!
//!             dest 0..4   dest 4..8
//! orig 0..25  [ 25×4 ]    [ 25×4 ]
//! orig 25..30 [        5×8        ]
//! ```

use crate::provider::{MatrixRequest, MatrixResponse};

/// A contiguous `[start, start + count)` slice of an origin or destination axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reference {
    pub start: usize,
    pub count: usize,
}

impl Reference {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// One past the last index covered.
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// A limit-compliant slice of a matrix request.
///
/// `request` is a copy of the original with only origins and destinations
/// replaced by the sliced ranges.
#[derive(Debug, Clone)]
pub struct MatrixSubRequest {
    pub request: MatrixRequest,
    pub origins: Reference,
    pub destinations: Reference,
}

impl MatrixSubRequest {
    /// Number of matrix cells this sub-request covers.
    pub fn elements(&self) -> usize {
        self.origins.count * self.destinations.count
    }
}

/// A provider response paired with the references of the request that produced it.
#[derive(Debug, Clone)]
pub struct MatrixSubResponse {
    pub response: MatrixResponse,
    pub origins: Reference,
    pub destinations: Reference,
}

/// Split `request` into sub-requests honoring both per-request limits.
///
/// Every sub-request satisfies `origins ≤ max_addresses`,
/// `destinations ≤ max_addresses` and `origins × destinations ≤ max_elements`.
/// An empty origin or destination list produces no sub-requests. Zero limits
/// also produce no sub-requests; callers validate [`crate::BatchConfig`] first.
///
/// # Example
///
/// ```
/// use route_matrix::{split, GpsPoint, MatrixRequest, Reference};
///
/// let request = MatrixRequest::new(vec![GpsPoint::new(0.0, 0.0); 30], vec![GpsPoint::new(1.0, 1.0); 8]);
/// let parts = split(&request, 25, 100);
///
/// assert_eq!(parts.len(), 3);
/// assert_eq!(parts[2].origins, Reference::new(25, 5));
/// assert_eq!(parts[2].destinations, Reference::new(0, 8));
/// ```
pub fn split(request: &MatrixRequest, max_addresses: usize, max_elements: usize) -> Vec<MatrixSubRequest> {
    let num_origins = request.origins.len();
    let num_destinations = request.destinations.len();
    let mut requests = Vec::new();

    if max_addresses == 0 || max_elements == 0 {
        return requests;
    }

    // An origin chunk wider than max_elements would leave no room for a
    // single destination.
    let origin_limit = max_addresses.min(max_elements);

    let mut origins_start = 0;
    while origins_start < num_origins {
        let origins_count = origin_limit.min(num_origins - origins_start);
        let origins = Reference::new(origins_start, origins_count);
        let destination_limit = (max_elements / origins_count).min(max_addresses);

        let mut destinations_start = 0;
        while destinations_start < num_destinations {
            let destinations_count = destination_limit.min(num_destinations - destinations_start);
            let destinations = Reference::new(destinations_start, destinations_count);

            let mut sub = request.clone();
            sub.origins = request.origins[origins.start..origins.end()].to_vec();
            sub.destinations = request.destinations[destinations.start..destinations.end()].to_vec();

            requests.push(MatrixSubRequest {
                request: sub,
                origins,
                destinations,
            });

            destinations_start += destinations_count;
        }

        origins_start += origins_count;
    }

    requests
}
