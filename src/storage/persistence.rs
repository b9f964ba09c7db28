//! CrmRepository trait — pluggable read-only record store
//!
//! Abstracts record access so the estimator never sees a storage backend:
//! - `InMemoryRepository`: In-memory store for testing and minimal deployments
//! - `SledRepository`: embedded sled database (see `sled_store`)

use std::sync::{PoisonError, RwLock};
use tracing::warn;

use crate::types::{
    Horizon, Link, LinkId, Measuring, SkinFactor, Well, WellDatum, WellId,
};

/// Trait for pluggable record backends
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across request handlers. Every method returns owned value structs.
pub trait CrmRepository: Send + Sync {
    /// Get a well by id
    fn well(&self, id: WellId) -> Result<Option<Well>, StoreError>;

    /// All wells
    fn wells(&self) -> Result<Vec<Well>, StoreError>;

    /// Horizons belonging to a well, in id order
    fn horizons_for_well(&self, well_id: WellId) -> Result<Vec<Horizon>, StoreError>;

    /// All horizons
    fn horizons(&self) -> Result<Vec<Horizon>, StoreError>;

    /// Active links whose producer is `producer_id`, in id order
    fn active_links_for_producer(&self, producer_id: WellId) -> Result<Vec<Link>, StoreError>;

    /// Ratio samples of a link, oldest first
    fn measurings_for_link(&self, link_id: LinkId) -> Result<Vec<Measuring>, StoreError>;

    /// Monthly samples of a well, oldest first
    fn well_data(&self, well_id: WellId) -> Result<Vec<WellDatum>, StoreError>;

    /// Skin factor samples of a well
    fn skin_factors_for_well(&self, well_id: WellId) -> Result<Vec<SkinFactor>, StoreError>;

    /// All skin factor samples
    fn skin_factors(&self) -> Result<Vec<SkinFactor>, StoreError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub(crate) fn sort_measurings(items: &mut [Measuring]) {
    items.sort_by_key(|m| (m.date, m.id));
}

pub(crate) fn sort_well_data(items: &mut [WellDatum]) {
    items.sort_by_key(|d| (d.year, d.month, d.id));
}

#[derive(Default)]
struct Tables {
    wells: Vec<Well>,
    horizons: Vec<Horizon>,
    links: Vec<Link>,
    measurings: Vec<Measuring>,
    well_data: Vec<WellDatum>,
    skin_factors: Vec<SkinFactor>,
}

fn upsert<T>(rows: &mut Vec<T>, row: T, id: impl Fn(&T) -> i64) {
    let key = id(&row);
    match rows.iter_mut().find(|r| id(r) == key) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

/// In-memory repository for testing and minimal deployments
///
/// Thread-safe via `RwLock`. Not durable — data lost on restart.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from a whole dataset.
    pub fn from_dataset(dataset: &super::Dataset) -> Self {
        Self {
            tables: RwLock::new(Tables {
                wells: dataset.wells.clone(),
                horizons: dataset.horizons.clone(),
                links: dataset.links.clone(),
                measurings: dataset.measurings.clone(),
                well_data: dataset.well_data.clone(),
                skin_factors: dataset.skin_factors.clone(),
            }),
        }
    }

    /// Writes go through even when a previous writer panicked. Reads keep
    /// reporting the poisoned lock as a `StoreError`.
    fn write<F: FnOnce(&mut Tables)>(&self, f: F) {
        let mut t = self.tables.write().unwrap_or_else(|e| {
            warn!("InMemory tables lock poisoned by an earlier panic, writing anyway");
            PoisonError::into_inner(e)
        });
        f(&mut t);
    }

    // Inserts replace any record with the same id, as a sled `insert` does.

    pub fn insert_well(&self, well: Well) -> &Self {
        self.write(|t| upsert(&mut t.wells, well, |r| r.id));
        self
    }

    pub fn insert_horizon(&self, horizon: Horizon) -> &Self {
        self.write(|t| upsert(&mut t.horizons, horizon, |r| r.id));
        self
    }

    pub fn insert_link(&self, link: Link) -> &Self {
        self.write(|t| upsert(&mut t.links, link, |r| r.id));
        self
    }

    pub fn insert_measuring(&self, measuring: Measuring) -> &Self {
        self.write(|t| upsert(&mut t.measurings, measuring, |r| r.id));
        self
    }

    pub fn insert_well_datum(&self, datum: WellDatum) -> &Self {
        self.write(|t| upsert(&mut t.well_data, datum, |r| r.id));
        self
    }

    pub fn insert_skin_factor(&self, skin: SkinFactor) -> &Self {
        self.write(|t| upsert(&mut t.skin_factors, skin, |r| r.id));
        self
    }

    fn read<T, F: FnOnce(&Tables) -> T>(&self, f: F) -> Result<T, StoreError> {
        let t = self
            .tables
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(f(&t))
    }
}

impl CrmRepository for InMemoryRepository {
    fn well(&self, id: WellId) -> Result<Option<Well>, StoreError> {
        self.read(|t| t.wells.iter().find(|w| w.id == id).cloned())
    }

    fn wells(&self) -> Result<Vec<Well>, StoreError> {
        self.read(|t| t.wells.clone())
    }

    fn horizons_for_well(&self, well_id: WellId) -> Result<Vec<Horizon>, StoreError> {
        self.read(|t| {
            let mut hs: Vec<_> = t
                .horizons
                .iter()
                .filter(|h| h.well_id == well_id)
                .cloned()
                .collect();
            hs.sort_by_key(|h| h.id);
            hs
        })
    }

    fn horizons(&self) -> Result<Vec<Horizon>, StoreError> {
        self.read(|t| t.horizons.clone())
    }

    fn active_links_for_producer(&self, producer_id: WellId) -> Result<Vec<Link>, StoreError> {
        self.read(|t| {
            let mut links: Vec<_> = t
                .links
                .iter()
                .filter(|l| l.producer_id == producer_id && l.is_active())
                .cloned()
                .collect();
            links.sort_by_key(|l| l.id);
            links
        })
    }

    fn measurings_for_link(&self, link_id: LinkId) -> Result<Vec<Measuring>, StoreError> {
        self.read(|t| {
            let mut ms: Vec<_> = t
                .measurings
                .iter()
                .filter(|m| m.link_id == link_id)
                .cloned()
                .collect();
            sort_measurings(&mut ms);
            ms
        })
    }

    fn well_data(&self, well_id: WellId) -> Result<Vec<WellDatum>, StoreError> {
        self.read(|t| {
            let mut ds: Vec<_> = t
                .well_data
                .iter()
                .filter(|d| d.well_id == well_id)
                .cloned()
                .collect();
            sort_well_data(&mut ds);
            ds
        })
    }

    fn skin_factors_for_well(&self, well_id: WellId) -> Result<Vec<SkinFactor>, StoreError> {
        self.read(|t| {
            t.skin_factors
                .iter()
                .filter(|s| s.well_id == well_id)
                .cloned()
                .collect()
        })
    }

    fn skin_factors(&self) -> Result<Vec<SkinFactor>, StoreError> {
        self.read(|t| t.skin_factors.clone())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LinkStatus, WellType};
    use chrono::NaiveDate;

    fn well(id: WellId) -> Well {
        Well {
            id,
            name: format!("W-{id}"),
            latitude: "0".into(),
            longitude: "0".into(),
            drainage_radius: None,
            well_radius: None,
            well_type: WellType::Producer,
            workshop_id: None,
        }
    }

    #[test]
    fn test_in_memory_store_and_retrieve() {
        let repo = InMemoryRepository::new();
        repo.insert_well(well(1)).insert_well(well(2));

        assert_eq!(repo.well(2).unwrap().map(|w| w.id), Some(2));
        assert!(repo.well(3).unwrap().is_none());
        assert_eq!(repo.wells().unwrap().len(), 2);
    }

    #[test]
    fn test_only_active_links_returned() {
        let repo = InMemoryRepository::new();
        for (id, status) in [(2, LinkStatus::Active), (1, LinkStatus::Inactive), (3, LinkStatus::Active)] {
            repo.insert_link(Link {
                id,
                producer_id: 10,
                injector_id: 20 + id,
                status,
                last_ratio: None,
            });
        }
        let ids: Vec<_> = repo
            .active_links_for_producer(10)
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_series_come_back_ordered() {
        let repo = InMemoryRepository::new();
        repo.insert_well_datum(WellDatum { id: 1, well_id: 5, year: 2024, month: 3, rate: Some(3.0), pressure: None })
            .insert_well_datum(WellDatum { id: 2, well_id: 5, year: 2023, month: 12, rate: Some(1.0), pressure: None })
            .insert_well_datum(WellDatum { id: 3, well_id: 5, year: 2024, month: 1, rate: Some(2.0), pressure: None });
        let rates: Vec<_> = repo.well_data(5).unwrap().iter().filter_map(|d| d.rate).collect();
        assert_eq!(rates, vec![1.0, 2.0, 3.0]);

        let d = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
        repo.insert_measuring(Measuring { id: 1, link_id: 9, date: d(4), ratio: 0.4 })
            .insert_measuring(Measuring { id: 2, link_id: 9, date: d(2), ratio: 0.2 });
        let ratios: Vec<_> = repo.measurings_for_link(9).unwrap().iter().map(|m| m.ratio).collect();
        assert_eq!(ratios, vec![0.2, 0.4]);
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let repo = InMemoryRepository::new();
        repo.insert_well(well(1)).insert_well(Well {
            name: "renamed".into(),
            ..well(1)
        });
        assert_eq!(repo.wells().unwrap().len(), 1);
        assert_eq!(repo.well(1).unwrap().unwrap().name, "renamed");
    }

    #[test]
    fn test_from_dataset_loads_every_table() {
        let dataset = crate::storage::Dataset {
            wells: vec![well(1), well(2)],
            ..Default::default()
        };
        let repo = InMemoryRepository::from_dataset(&dataset);
        assert_eq!(repo.wells().unwrap().len(), 2);
        assert!(repo.horizons().unwrap().is_empty());
    }

    #[test]
    fn test_insert_after_poisoned_lock_is_kept() {
        let repo = InMemoryRepository::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            repo.write(|_| panic!("writer died"));
        }));
        assert!(outcome.is_err());

        repo.insert_well(well(3));
        assert!(matches!(repo.wells(), Err(StoreError::Storage(_))));
        let t = repo.tables.read().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(t.wells.len(), 1);
        assert_eq!(t.wells[0].id, 3);
    }

    #[test]
    fn test_trait_object() {
        let repo: Box<dyn CrmRepository> = Box::new(InMemoryRepository::new());
        assert_eq!(repo.backend_name(), "InMemory");
        assert!(repo.wells().unwrap().is_empty());
    }
}
