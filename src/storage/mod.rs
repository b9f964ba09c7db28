//! Record Storage
//!
//! Read-only access to wells, horizons, links and their time series, plus
//! dataset import into the embedded sled store.

mod dataset;
pub mod persistence;
pub mod sled_store;

pub use dataset::Dataset;
pub use persistence::{CrmRepository, InMemoryRepository, StoreError};
pub use sled_store::SledRepository;
