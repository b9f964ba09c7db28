//! Reservoir physics for the CRM pipeline
//!
//! - `geodesy`: haversine distance between wells
//! - `productivity`: radial-flow productivity index and time constant
//! - `rate_engine`: implicit-Euler production / injection rate steps

pub mod geodesy;
pub mod productivity;
pub mod rate_engine;

pub use geodesy::{distance, haversine_m};
pub use productivity::{drainage_area, productivity_index, productivity_index_for, time_constant};
pub use rate_engine::{
    months_between, next_injection_rate, next_production_rate, rate_samples, RateSample,
};
