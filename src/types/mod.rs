//! Domain types shared by the estimator, storage and API layers.

mod audit;
mod records;

pub use audit::*;
pub use records::*;
