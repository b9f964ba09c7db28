//! JSON dataset used to seed a store.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{Horizon, Link, Measuring, SkinFactor, Well, WellDatum};

/// Every record kind the engine reads, as one JSON document:
/// `{ "wells": [...], "horizons": [...], "links": [...], "measurings": [...],
///    "wellData": [...], "skinFactors": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub wells: Vec<Well>,
    #[serde(default)]
    pub horizons: Vec<Horizon>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub measurings: Vec<Measuring>,
    #[serde(default)]
    pub well_data: Vec<WellDatum>,
    #[serde(default)]
    pub skin_factors: Vec<SkinFactor>,
}

impl Dataset {
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))
    }

    pub fn record_count(&self) -> usize {
        self.wells.len()
            + self.horizons.len()
            + self.links.len()
            + self.measurings.len()
            + self.well_data.len()
            + self.skin_factors.len()
    }
}
