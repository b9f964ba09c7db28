//! Production forecaster
//!
//! Extrapolates a producer's monthly rate history through a
//! [`SeriesForecaster`]. Failures never reach the caller: they are logged and
//! the forecast is empty.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::defaults::MIN_PRODUCTION_SAMPLES;
use crate::config::ForecastConfig;
use crate::forecasting::SeriesForecaster;
use crate::physics_engine::{months_between, RateSample};
use crate::types::YearMonth;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Actual,
    Forecast,
}

/// One point of a production chart series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductionPoint {
    pub date: YearMonth,
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: PointKind,
}

/// Stored history as chart points.
pub fn historical_points(history: &[RateSample]) -> Vec<ProductionPoint> {
    history
        .iter()
        .map(|s| ProductionPoint {
            date: s.period,
            value: s.rate,
            kind: PointKind::Actual,
        })
        .collect()
}

/// Forecast monthly production from the end of `history` up to `today`.
///
/// Uses the trailing `history_months` samples; returns an empty vector when
/// fewer than three remain or the forecaster fails.
pub fn forecast_production(
    history: &[RateSample],
    forecaster: &dyn SeriesForecaster,
    cfg: &ForecastConfig,
    today: YearMonth,
) -> Vec<ProductionPoint> {
    let start = history.len().saturating_sub(cfg.history_months);
    let recent = &history[start..];
    let Some(last) = recent.last() else {
        return Vec::new();
    };
    if recent.len() < MIN_PRODUCTION_SAMPLES {
        debug!(samples = recent.len(), "Too few production samples to forecast");
        return Vec::new();
    }

    let horizon = usize::try_from(months_between(last.period, today).max(1)).unwrap_or(1);
    let series: Vec<f64> = recent.iter().map(|s| s.rate).collect();

    match forecaster.forecast(&series, cfg.window, horizon, cfg.confidence) {
        Ok(values) => values
            .into_iter()
            .enumerate()
            .map(|(i, value)| ProductionPoint {
                date: last.period.plus_months(u32::try_from(i + 1).unwrap_or(u32::MAX)),
                value,
                kind: PointKind::Forecast,
            })
            .collect(),
        Err(e) => {
            warn!(
                error = %e,
                forecaster = forecaster.name(),
                samples = series.len(),
                horizon,
                "Production forecast failed, returning empty forecast"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecasting::{ForecastError, LastValueForecaster, MovingAverageForecaster};

    fn monthly(year: i32, rates: &[f64]) -> Vec<RateSample> {
        rates
            .iter()
            .enumerate()
            .map(|(i, &rate)| RateSample {
                period: YearMonth::new(year, 1).plus_months(i as u32),
                rate,
            })
            .collect()
    }

    #[test]
    fn test_constant_history_forecasts_constant() {
        let history = monthly(2024, &[100.0; 12]);
        let out = forecast_production(
            &history,
            &MovingAverageForecaster,
            &ForecastConfig::default(),
            YearMonth::new(2025, 3),
        );
        // Last sample 2024-12, today 2025-03: three months
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].date, YearMonth::new(2025, 1));
        assert_eq!(out[2].date, YearMonth::new(2025, 3));
        for p in &out {
            assert!((p.value - 100.0).abs() < 1e-9);
            assert_eq!(p.kind, PointKind::Forecast);
        }
    }

    #[test]
    fn test_horizon_is_at_least_one() {
        let history = monthly(2024, &[1.0, 2.0, 3.0]);
        let out = forecast_production(
            &history,
            &LastValueForecaster,
            &ForecastConfig::default(),
            YearMonth::new(2023, 1),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date, YearMonth::new(2024, 4));
        assert_eq!(out[0].value, 3.0);
    }

    #[test]
    fn test_short_history_is_empty() {
        let history = monthly(2024, &[1.0, 2.0]);
        let out = forecast_production(
            &history,
            &LastValueForecaster,
            &ForecastConfig::default(),
            YearMonth::new(2025, 1),
        );
        assert!(out.is_empty());
        assert!(forecast_production(&[], &LastValueForecaster, &ForecastConfig::default(), YearMonth::new(2025, 1)).is_empty());
    }

    #[test]
    fn test_only_trailing_window_is_used() {
        struct Recorder;
        impl SeriesForecaster for Recorder {
            fn forecast(&self, series: &[f64], _: usize, _: usize, _: f64) -> Result<Vec<f64>, ForecastError> {
                Ok(vec![series.len() as f64, series[0]])
            }
            fn name(&self) -> &'static str {
                "recorder"
            }
        }

        let rates: Vec<f64> = (0..30).map(f64::from).collect();
        let history = monthly(2020, &rates);
        let out = forecast_production(&history, &Recorder, &ForecastConfig::default(), YearMonth::new(2030, 1));
        assert_eq!(out[0].value, 24.0);
        assert_eq!(out[1].value, 6.0);
    }

    #[test]
    fn test_forecaster_failure_is_empty() {
        struct Failing;
        impl SeriesForecaster for Failing {
            fn forecast(&self, _: &[f64], _: usize, _: usize, _: f64) -> Result<Vec<f64>, ForecastError> {
                Err(ForecastError::Failed("boom".into()))
            }
            fn name(&self) -> &'static str {
                "failing"
            }
        }

        let history = monthly(2024, &[5.0; 6]);
        let out = forecast_production(&history, &Failing, &ForecastConfig::default(), YearMonth::new(2025, 6));
        assert!(out.is_empty());
    }

    #[test]
    fn test_point_serialization() {
        let p = historical_points(&monthly(2024, &[7.5]));
        let json = serde_json::to_value(p[0]).unwrap();
        assert_eq!(json, serde_json::json!({ "date": "2024-01", "value": 7.5, "type": "actual" }));
    }
}
