//! Greedy grouping of sub-requests into rate-limited waves.

use crate::partition::MatrixSubRequest;

/// Group `requests` into waves whose element totals fit `max_elements_per_wave`.
///
/// Single pass in input order: a request joins the current wave while the
/// wave's total stays within budget, otherwise it starts a new wave. A request
/// that alone exceeds the budget forms its own wave. Order is preserved both
/// across and within waves.
pub fn group(requests: Vec<MatrixSubRequest>, max_elements_per_wave: usize) -> Vec<Vec<MatrixSubRequest>> {
    let mut waves = Vec::new();
    let mut wave: Vec<MatrixSubRequest> = Vec::new();
    let mut wave_elements = 0;

    for request in requests {
        let elements = request.elements();
        if !wave.is_empty() && wave_elements + elements > max_elements_per_wave {
            waves.push(std::mem::take(&mut wave));
            wave_elements = 0;
        }
        wave_elements += elements;
        wave.push(request);
    }

    if !wave.is_empty() {
        waves.push(wave);
    }

    waves
}

/// Total element count of a wave.
pub fn wave_elements(wave: &[MatrixSubRequest]) -> usize {
    wave.iter().map(MatrixSubRequest::elements).sum()
}
