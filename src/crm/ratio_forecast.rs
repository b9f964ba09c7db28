//! Ratio forecaster
//!
//! Projects each link's connectivity ratio one step ahead.
//!
//! Per link:
//! - with ≥ 3 historical points: 0.3 × SMA(last 3) + 0.7 × (last + OLS slope),
//!   confidence weight 1.5
//! - otherwise: the calculated ratio, confidence weight 0.8
//! - the projection is kept at least 5 % of the calculated ratio away from it
//!
//! Across links the confidence-weighted projections are turned into shares,
//! capped at `1 − last_ratio`, topped up by weight, and rescaled to sum to 1.

use statrs::statistics::Statistics;

use crate::config::defaults::{MIN_POINTS_FOR_TREND, SMA_POINTS};
use crate::config::ForecastConfig;

/// Projection of a single link before set-level normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkForecast {
    pub value: f64,
    pub weight: f64,
}

/// Per-link input to [`forecast_ratios`].
#[derive(Debug, Clone, Copy)]
pub struct ForecastInput<'a> {
    /// Historical ratios, oldest first
    pub history: &'a [f64],
    /// Normalized calculated ratio
    pub calculated: f64,
    /// `1 − last_ratio`
    pub cap: f64,
}

/// Ordinary-least-squares slope of `series` against indices 0..n−1.
///
/// 0 for fewer than two points.
pub fn ols_slope(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let x: Vec<f64> = (0..series.len()).map(|i| i as f64).collect();
    let var_x = x.iter().variance();
    if var_x == 0.0 || !var_x.is_finite() {
        return 0.0;
    }
    x.iter().covariance(series.iter()) / var_x
}

/// Push `value` at least `fraction × calculated` away from `calculated`,
/// keeping the side it was on (upward when equal).
pub fn apply_min_deviation(value: f64, calculated: f64, fraction: f64) -> f64 {
    let floor = fraction * calculated;
    if (value - calculated).abs() < floor {
        if value >= calculated {
            calculated + floor
        } else {
            calculated - floor
        }
    } else {
        value
    }
}

/// Project one link.
pub fn project_link(history: &[f64], calculated: f64, cfg: &ForecastConfig) -> LinkForecast {
    let (value, weight) = if history.len() >= MIN_POINTS_FOR_TREND {
        let sma = history[history.len() - SMA_POINTS..].iter().mean();
        let last = history[history.len() - 1];
        let trend = last + ols_slope(history);
        (
            cfg.sma_weight * sma + cfg.trend_weight * trend,
            cfg.trend_confidence,
        )
    } else {
        (calculated, cfg.fallback_confidence)
    };

    LinkForecast {
        value: apply_min_deviation(value, calculated, cfg.min_deviation_fraction),
        weight,
    }
}

/// Forecast the whole ratio set of a producer.
///
/// Returns `None` when the weighted projections do not add up to anything
/// positive; no forecast is emitted in that case.
pub fn forecast_ratios(inputs: &[ForecastInput<'_>], cfg: &ForecastConfig) -> Option<Vec<f64>> {
    let projections: Vec<LinkForecast> = inputs
        .iter()
        .map(|i| project_link(i.history, i.calculated, cfg))
        .collect();

    let weighted: Vec<f64> = projections
        .iter()
        .map(|p| (p.value * p.weight).max(0.0))
        .collect();
    let total: f64 = weighted.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }

    let mut shares: Vec<f64> = weighted
        .iter()
        .zip(inputs)
        .map(|(w, input)| (w / total).min(input.cap.max(0.0)))
        .collect();

    let remainder = 1.0 - shares.iter().sum::<f64>();
    if remainder > 0.0 {
        let open_weight: f64 = shares
            .iter()
            .zip(&projections)
            .filter(|(s, _)| **s > 0.0)
            .map(|(_, p)| p.weight)
            .sum();
        if open_weight > 0.0 {
            for (s, p) in shares.iter_mut().zip(&projections) {
                if *s > 0.0 {
                    *s += remainder * p.weight / open_weight;
                }
            }
        }
    }

    let sum: f64 = shares.iter().sum();
    if sum > 0.0 {
        for s in shares.iter_mut() {
            *s /= sum;
        }
    }
    Some(shares)
}
