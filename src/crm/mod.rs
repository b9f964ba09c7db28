//! Capacitance-Resistance Model core
//!
//! ## Components
//!
//! - `defaulting`: field averages and per-well parameter resolution
//! - `estimator`: raw injector -> producer connectivity ratio
//! - `normalizer`: unit-sum scaling under `1 − last_ratio` caps
//! - `ratio_forecast`: one-step SMA / trend projection of each ratio
//! - `production`: production history extrapolation
//! - `engine`: request-level orchestration over a repository

pub mod defaulting;
pub mod engine;
mod error;
pub mod estimator;
pub mod normalizer;
pub mod production;
pub mod ratio_forecast;

pub use defaulting::{compute_field_averages, resolve_parameters, FieldAverages, Resolution, ResolvedParameters};
pub use engine::{CrmEngine, HistoricalRatio, LinkRatio, ProductionReport, RatiosReport};
pub use error::CrmError;
pub use production::{PointKind, ProductionPoint};
