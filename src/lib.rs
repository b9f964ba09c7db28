//! CRM Engine: injector/producer connectivity and production forecasting
//!
//! Capacitance-Resistance Model service for waterflood fields.
//!
//! ## Architecture
//!
//! - **Storage**: read-only repository over wells, horizons, links and their series
//! - **Codec**: decryption of stored well coordinates
//! - **Physics Engine**: distance, productivity index, time constant, rate steps
//! - **CRM**: defaulting, connectivity estimation, normalization, forecasting
//! - **API**: axum endpoints over the engine

pub mod api;
pub mod codec;
pub mod config;
pub mod crm;
pub mod forecasting;
pub mod physics_engine;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::CrmConfig;

// Re-export the engine surface
pub use crm::{
    CrmEngine, CrmError, FieldAverages, LinkRatio, ProductionPoint, ProductionReport, RatiosReport,
    ResolvedParameters,
};

// Re-export collaborators
pub use codec::{ChaChaCoordinateCodec, CoordinateCodec, PlainCoordinateCodec};
pub use forecasting::{ForecastError, LastValueForecaster, MovingAverageForecaster, SeriesForecaster};
pub use storage::{CrmRepository, Dataset, InMemoryRepository, SledRepository, StoreError};

// Re-export record types
pub use types::{
    AppliedDefault, Horizon, HorizonStatus, Link, LinkStatus, Measuring, MissingDataRequest,
    Parameter, SkinFactor, Well, WellDatum, WellType, YearMonth,
};
