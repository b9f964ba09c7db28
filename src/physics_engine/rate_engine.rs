//! One-step CRM rate integration
//!
//! Both updates are implicit-Euler steps of the first-order response
//! `τ dQ/dt = I_w − Q`, so the new rate always lies between the previous
//! rate and the forcing term.

use std::collections::BTreeMap;

use crate::config::defaults::FALLBACK_TIME_CONSTANT;
use crate::types::{WellDatum, WellId, YearMonth};

/// A monthly rate observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    pub period: YearMonth,
    pub rate: f64,
}

/// Monthly samples that carry a rate, oldest first. Samples without a rate
/// are skipped.
pub fn rate_samples(data: &[WellDatum]) -> Vec<RateSample> {
    let mut samples: Vec<RateSample> = data
        .iter()
        .filter_map(|d| {
            d.rate.map(|rate| RateSample {
                period: d.period(),
                rate,
            })
        })
        .collect();
    samples.sort_by_key(|s| s.period);
    samples
}

/// Whole months between two samples' periods.
pub fn months_between(earlier: YearMonth, later: YearMonth) -> i64 {
    earlier.months_until(later)
}

/// Step length in months, never below 1.
fn step_months(previous: &RateSample, current: &RateSample) -> f64 {
    months_between(previous.period, current.period).max(1) as f64
}

fn usable_tau(tau: f64) -> f64 {
    if tau.is_finite() && tau > 0.0 {
        tau
    } else {
        FALLBACK_TIME_CONSTANT
    }
}

fn last_two(samples: &[RateSample]) -> Option<(&RateSample, &RateSample)> {
    match samples {
        [.., previous, current] => Some((previous, current)),
        _ => None,
    }
}

/// Next production rate of a producer.
///
/// - fewer than two production samples: the single rate, or 0
/// - otherwise each injector with at least two samples contributes
///   `ratio × avg(I_current, I_previous)` to the forcing term and
///   `Q_new = (Q_prev + forcing·Δt/τ) / (1 + Δt/τ)`
/// - when no injector contributes, the latest rate is carried forward
pub fn next_production_rate(
    production: &[RateSample],
    injections: &BTreeMap<WellId, Vec<RateSample>>,
    ratios: &BTreeMap<WellId, f64>,
    tau: f64,
) -> f64 {
    let Some((previous, current)) = last_two(production) else {
        return production.last().map_or(0.0, |s| s.rate);
    };

    let mut total_weighted_injection = 0.0;
    let mut contributors = 0usize;
    for (injector_id, history) in injections {
        if let Some((inj_prev, inj_cur)) = last_two(history) {
            let ratio = ratios.get(injector_id).copied().unwrap_or(0.0);
            total_weighted_injection += ratio * (inj_cur.rate + inj_prev.rate) / 2.0;
            contributors += 1;
        }
    }

    if contributors == 0 {
        return current.rate;
    }

    let step = step_months(previous, current) / usable_tau(tau);
    (previous.rate + total_weighted_injection * step) / (1.0 + step)
}

/// Next injection rate of an injector as seen through one link.
///
/// `I_new = (I_prev + ratio·I_current·Δt/τ) / (1 + Δt/τ)` over the
/// injector's own two latest samples; fewer than two returns the single
/// rate, or 0.
pub fn next_injection_rate(history: &[RateSample], ratio: f64, tau: f64) -> f64 {
    let Some((previous, current)) = last_two(history) else {
        return history.last().map_or(0.0, |s| s.rate);
    };

    let step = step_months(previous, current) / usable_tau(tau);
    (previous.rate + ratio * current.rate * step) / (1.0 + step)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(year: i32, month: u32, rate: f64) -> RateSample {
        RateSample {
            period: YearMonth::new(year, month),
            rate,
        }
    }

    #[test]
    fn test_short_history() {
        let none = BTreeMap::new();
        assert_eq!(next_production_rate(&[], &none, &BTreeMap::new(), 2.0), 0.0);
        assert_eq!(next_production_rate(&[s(2024, 1, 42.0)], &none, &BTreeMap::new(), 2.0), 42.0);
        assert_eq!(next_injection_rate(&[], 0.5, 2.0), 0.0);
        assert_eq!(next_injection_rate(&[s(2024, 1, 7.0)], 0.5, 2.0), 7.0);
    }

    #[test]
    fn test_production_step() {
        let production = vec![s(2024, 1, 100.0), s(2024, 2, 90.0)];
        let mut injections = BTreeMap::new();
        injections.insert(7, vec![s(2024, 1, 200.0), s(2024, 2, 300.0)]);
        injections.insert(8, vec![s(2024, 2, 1000.0)]); // one sample: ignored
        let mut ratios = BTreeMap::new();
        ratios.insert(7, 0.4);
        ratios.insert(8, 0.6);

        // forcing = 0.4 × 250 = 100; Δt = 1; τ = 2
        // Q = (100 + 100 × 0.5) / 1.5 = 100
        let q = next_production_rate(&production, &injections, &ratios, 2.0);
        assert!((q - 100.0).abs() < 1e-9, "got {q}");

        ratios.insert(7, 0.2);
        // forcing = 50; Q = (100 + 50 × 0.5) / 1.5 = 83.33
        let q = next_production_rate(&production, &injections, &ratios, 2.0);
        assert!((q - 250.0 / 3.0).abs() < 1e-9, "got {q}");
    }

    #[test]
    fn test_production_lies_between_previous_and_forcing() {
        let production = vec![s(2023, 10, 40.0), s(2024, 1, 55.0)];
        let mut injections = BTreeMap::new();
        injections.insert(1, vec![s(2023, 12, 120.0), s(2024, 1, 180.0)]);
        for ratio in [0.0, 0.1, 0.5, 1.0] {
            for tau in [0.01, 0.5, 3.0, 100.0] {
                let ratios = BTreeMap::from([(1, ratio)]);
                let forcing = ratio * 150.0;
                let q = next_production_rate(&production, &injections, &ratios, tau);
                let (lo, hi) = if forcing < 40.0 { (forcing, 40.0) } else { (40.0, forcing) };
                assert!(q >= lo - 1e-9 && q <= hi + 1e-9, "ratio {ratio} tau {tau}: {q}");
            }
        }
    }

    #[test]
    fn test_no_contributing_injector_holds_rate() {
        let production: Vec<_> = (1..=12).map(|m| s(2024, m, 100.0)).collect();
        let q = next_production_rate(&production, &BTreeMap::new(), &BTreeMap::new(), 5.0);
        assert_eq!(q, 100.0);
    }

    #[test]
    fn test_step_is_at_least_one_month() {
        // Same period twice: Δt clamps to 1
        let production = vec![s(2024, 3, 10.0), s(2024, 3, 20.0)];
        let injections = BTreeMap::from([(1, vec![s(2024, 2, 40.0), s(2024, 3, 40.0)])]);
        let ratios = BTreeMap::from([(1, 1.0)]);
        let q = next_production_rate(&production, &injections, &ratios, 1.0);
        assert!((q - 25.0).abs() < 1e-9, "got {q}");
    }

    #[test]
    fn test_injection_step() {
        // (100 + 0.5 × 120 × 2/4) / (1 + 0.5) = 130 / 1.5
        let history = vec![s(2024, 1, 100.0), s(2024, 3, 120.0)];
        let i = next_injection_rate(&history, 0.5, 4.0);
        assert!((i - 130.0 / 1.5).abs() < 1e-9, "got {i}");
    }

    #[test]
    fn test_invalid_tau_uses_fallback() {
        let history = vec![s(2024, 1, 100.0), s(2024, 2, 100.0)];
        assert_eq!(
            next_injection_rate(&history, 1.0, 0.0),
            next_injection_rate(&history, 1.0, FALLBACK_TIME_CONSTANT)
        );
    }

    #[test]
    fn test_rate_samples_skip_missing_rates() {
        let data = vec![
            WellDatum { id: 1, well_id: 1, year: 2024, month: 2, rate: None, pressure: Some(80.0) },
            WellDatum { id: 2, well_id: 1, year: 2024, month: 1, rate: Some(5.0), pressure: None },
            WellDatum { id: 3, well_id: 1, year: 2024, month: 3, rate: Some(6.0), pressure: None },
        ];
        let samples = rate_samples(&data);
        assert_eq!(samples, vec![s(2024, 1, 5.0), s(2024, 3, 6.0)]);
    }
}
