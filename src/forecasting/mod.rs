//! Short-series forecasting
//!
//! The production forecaster only depends on [`SeriesForecaster`]:
//! given a series, a window size, a horizon and a confidence level, return
//! one point forecast per future step.
//!
//! - `MovingAverageForecaster`: recursive simple moving average
//! - `LastValueForecaster`: repeats the last observation (deterministic stub)
//! - `TimeoutForecaster`: bounds any forecaster by wall-clock time

use statrs::statistics::Statistics;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// Forecast capability.
pub trait SeriesForecaster: Send + Sync {
    /// Point forecasts for steps `1..=horizon` after the end of `series`.
    ///
    /// `confidence` is accepted for interval-producing implementations; the
    /// point forecasts do not depend on it.
    fn forecast(
        &self,
        series: &[f64],
        window: usize,
        horizon: usize,
        confidence: f64,
    ) -> Result<Vec<f64>, ForecastError>;

    /// Name for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    #[error("insufficient data: need {needed}, have {available}")]
    InsufficientData { needed: usize, available: usize },
    #[error("invalid window: {0}")]
    InvalidWindow(usize),
    #[error("series contains non-finite values")]
    NonFinite,
    #[error("forecaster timed out after {0:?}")]
    TimedOut(Duration),
    #[error("forecaster failed: {0}")]
    Failed(String),
}

fn check_series(series: &[f64], needed: usize) -> Result<(), ForecastError> {
    if series.len() < needed {
        return Err(ForecastError::InsufficientData {
            needed,
            available: series.len(),
        });
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::NonFinite);
    }
    Ok(())
}

/// Recursive simple moving average.
///
/// Each step forecasts the mean of the trailing `window` values, then
/// appends that forecast to the rolling window for the next step.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovingAverageForecaster;

impl SeriesForecaster for MovingAverageForecaster {
    fn forecast(
        &self,
        series: &[f64],
        window: usize,
        horizon: usize,
        _confidence: f64,
    ) -> Result<Vec<f64>, ForecastError> {
        if window == 0 {
            return Err(ForecastError::InvalidWindow(window));
        }
        check_series(series, window)?;

        let mut rolling: Vec<f64> = series[series.len() - window..].to_vec();
        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let next = rolling.iter().mean();
            out.push(next);
            rolling.remove(0);
            rolling.push(next);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "moving_average"
    }
}

/// Repeats the last observation for every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastValueForecaster;

impl SeriesForecaster for LastValueForecaster {
    fn forecast(
        &self,
        series: &[f64],
        _window: usize,
        horizon: usize,
        _confidence: f64,
    ) -> Result<Vec<f64>, ForecastError> {
        check_series(series, 1)?;
        let last = series[series.len() - 1];
        Ok(vec![last; horizon])
    }

    fn name(&self) -> &'static str {
        "last_value"
    }
}

/// Runs the inner forecaster on a worker thread and gives up after `limit`.
///
/// A timed-out call is reported as [`ForecastError::TimedOut`]; the worker
/// is left to finish on its own and its result is dropped.
pub struct TimeoutForecaster {
    inner: Arc<dyn SeriesForecaster>,
    limit: Duration,
}

impl TimeoutForecaster {
    pub fn new(inner: Arc<dyn SeriesForecaster>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

impl SeriesForecaster for TimeoutForecaster {
    fn forecast(
        &self,
        series: &[f64],
        window: usize,
        horizon: usize,
        confidence: f64,
    ) -> Result<Vec<f64>, ForecastError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let owned = series.to_vec();
        std::thread::Builder::new()
            .name("series-forecast".into())
            .spawn(move || {
                let _ = tx.send(inner.forecast(&owned, window, horizon, confidence));
            })
            .map_err(|e| ForecastError::Failed(e.to_string()))?;

        match rx.recv_timeout(self.limit) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ForecastError::TimedOut(self.limit)),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ForecastError::Failed("forecast worker exited without a result".into()))
            }
        }
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Default forecaster for the service, bounded by `timeout_ms` when non-zero.
pub fn default_forecaster(timeout_ms: u64) -> Arc<dyn SeriesForecaster> {
    let base: Arc<dyn SeriesForecaster> = Arc::new(MovingAverageForecaster);
    if timeout_ms == 0 {
        base
    } else {
        Arc::new(TimeoutForecaster::new(base, Duration::from_millis(timeout_ms)))
    }
}
