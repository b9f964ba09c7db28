//! Ratio normalizer
//!
//! Rescales a producer's connectivity ratios to sum to 1 while keeping each
//! link at or below `1 − last_ratio`.

/// Per-link ceiling `1 − last_ratio`, with a missing value read as 0.
pub fn cap_for(last_ratio: Option<f64>) -> f64 {
    1.0 - last_ratio.unwrap_or(0.0)
}

/// Divide every value by the sum. No-op on a zero (or non-finite) sum.
pub fn scale_to_unit_sum(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

/// Scale to a unit sum, clip at the caps, and rescale once if anything was
/// clipped.
///
/// There is a single re-scaling pass, not a fixed-point iteration, so a
/// value can end slightly above its cap when several links are clipped.
/// Returns whether any value was clipped.
pub fn normalize(values: &mut [f64], caps: &[f64]) -> bool {
    debug_assert_eq!(values.len(), caps.len());

    scale_to_unit_sum(values);

    let mut clipped = false;
    for (v, cap) in values.iter_mut().zip(caps) {
        if *v > *cap {
            *v = *cap;
            clipped = true;
        }
    }

    if clipped {
        scale_to_unit_sum(values);
    }
    clipped
}
