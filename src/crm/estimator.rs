//! Connectivity estimator
//!
//! Raw injector -> producer influence coefficient:
//!
//! ratio_raw = (kh_i × q_i / (q_p + ε)) / (d² × M × J_p)
//!
//! Where:
//! - kh = permeability × thickness of each side
//! - M = (kh_p / μ_p) / (kh_i / μ_i), the mobility ratio
//! - d = inter-well distance (m)
//! - J_p = producer productivity index

use crate::config::defaults::RATE_RATIO_EPSILON;
use crate::config::SmoothingConfig;
use crate::physics_engine::productivity_index_for;

use super::ResolvedParameters;

/// Everything the ratio formula needs for one link.
#[derive(Debug, Clone, Copy)]
pub struct ConnectivityInputs {
    pub producer: ResolvedParameters,
    pub injector: ResolvedParameters,
    pub distance_m: f64,
    /// Latest monthly producer rate
    pub producer_rate: f64,
    /// Latest monthly injector rate
    pub injector_rate: f64,
    /// Latest producer skin factor
    pub producer_skin: f64,
}

/// Mobility ratio (kh_p/μ_p) / (kh_i/μ_i).
pub fn mobility_ratio(producer: &ResolvedParameters, injector: &ResolvedParameters) -> f64 {
    (producer.kh() / producer.viscosity) / (injector.kh() / injector.viscosity)
}

/// Injector over producer rate, with ε keeping the denominator non-zero.
pub fn rate_ratio(injector_rate: f64, producer_rate: f64) -> f64 {
    injector_rate / (producer_rate + RATE_RATIO_EPSILON)
}

/// Unblended ratio, or `None` when either kh product is not positive.
///
/// 0/0 collapses to 0; a zero distance yields +∞, which the final clamp
/// turns into 1.
pub fn raw_ratio(inputs: &ConnectivityInputs) -> Option<f64> {
    let kh_producer = inputs.producer.kh();
    let kh_injector = inputs.injector.kh();
    if kh_producer <= 0.0 || kh_injector <= 0.0 {
        return None;
    }

    let mobility = mobility_ratio(&inputs.producer, &inputs.injector);
    let j = productivity_index_for(&inputs.producer, inputs.producer_skin);
    let numerator = kh_injector * rate_ratio(inputs.injector_rate, inputs.producer_rate);
    let denominator = inputs.distance_m.powi(2) * mobility * j;

    let raw = numerator / denominator;
    Some(if raw.is_nan() { 0.0 } else { raw })
}

/// Blend with the persisted ratio when one is present and positive.
///
/// `0.75 × raw + 0.15 × last_ratio` with the default weights.
pub fn blend_with_last_ratio(raw: f64, last_ratio: Option<f64>, smoothing: &SmoothingConfig) -> f64 {
    match last_ratio {
        Some(last) if last > 0.0 => smoothing.raw_weight * raw + smoothing.last_ratio_weight * last,
        _ => raw,
    }
}

/// Final per-link ratio in [0, 1].
pub fn connectivity_ratio(
    inputs: &ConnectivityInputs,
    last_ratio: Option<f64>,
    smoothing: &SmoothingConfig,
) -> f64 {
    match raw_ratio(inputs) {
        Some(raw) => blend_with_last_ratio(raw, last_ratio, smoothing).clamp(0.0, 1.0),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: f64, h: f64, mu: f64) -> ResolvedParameters {
        ResolvedParameters {
            drainage_radius: 500.0,
            well_radius: 0.1,
            permeability: k,
            porosity: 0.15,
            thickness: h,
            viscosity: mu,
            compressibility: 0.0005,
        }
    }

    fn inputs(distance_m: f64) -> ConnectivityInputs {
        ConnectivityInputs {
            producer: params(100.0, 10.0, 1.0),
            injector: params(100.0, 10.0, 1.0),
            distance_m,
            producer_rate: 100.0,
            injector_rate: 200.0,
            producer_skin: 0.0,
        }
    }

    #[test]
    fn test_raw_ratio_formula() {
        let i = inputs(20.0);
        let j = productivity_index_for(&i.producer, 0.0);
        let expected = (1000.0 * 200.0 / (100.0 + RATE_RATIO_EPSILON)) / (400.0 * 1.0 * j);
        let raw = raw_ratio(&i).unwrap();
        assert!((raw - expected).abs() < 1e-12, "raw {raw} expected {expected}");
    }

    #[test]
    fn test_mobility_ratio() {
        let p = params(100.0, 10.0, 2.0);
        let i = params(50.0, 10.0, 1.0);
        // (1000/2) / (500/1) = 1
        assert!((mobility_ratio(&p, &i) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_positive_kh_gives_zero() {
        let mut i = inputs(300.0);
        i.injector.permeability = 0.0;
        assert!(raw_ratio(&i).is_none());
        assert_eq!(connectivity_ratio(&i, Some(0.5), &SmoothingConfig::default()), 0.0);
    }

    #[test]
    fn test_zero_distance_saturates() {
        let r = connectivity_ratio(&inputs(0.0), None, &SmoothingConfig::default());
        assert_eq!(r, 1.0);
    }

    #[test]
    fn test_zero_injection_at_zero_distance_is_zero() {
        let mut i = inputs(0.0);
        i.injector_rate = 0.0;
        assert_eq!(raw_ratio(&i), Some(0.0));
    }

    #[test]
    fn test_blend_weights_sum_to_point_nine() {
        let s = SmoothingConfig::default();
        assert!((blend_with_last_ratio(0.4, Some(0.2), &s) - (0.3 + 0.03)).abs() < 1e-12);
        assert_eq!(blend_with_last_ratio(0.4, None, &s), 0.4);
        assert_eq!(blend_with_last_ratio(0.4, Some(0.0), &s), 0.4);
        // Same input on both sides lands at 90 %
        assert!((blend_with_last_ratio(1.0, Some(1.0), &s) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_always_in_unit_interval() {
        let s = SmoothingConfig::default();
        for d in [0.0, 1.0, 10.0, 100.0, 1_000.0, 10_000.0] {
            for last in [None, Some(0.0), Some(0.3), Some(1.0)] {
                for q_i in [0.0, 1.0, 1e6] {
                    let mut i = inputs(d);
                    i.injector_rate = q_i;
                    let r = connectivity_ratio(&i, last, &s);
                    assert!((0.0..=1.0).contains(&r), "d {d} last {last:?} q_i {q_i}: {r}");
                }
            }
        }
    }
}
