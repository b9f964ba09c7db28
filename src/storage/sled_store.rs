//! sled-backed record store.
//!
//! One tree per record kind. Key: record id as big-endian bytes.
//! Value: JSON-serialized record.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::persistence::{sort_measurings, sort_well_data, CrmRepository, StoreError};
use super::Dataset;
use crate::types::{
    Horizon, Link, LinkId, Measuring, SkinFactor, Well, WellDatum, WellId,
};

const WELLS: &str = "wells";
const HORIZONS: &str = "horizons";
const LINKS: &str = "links";
const MEASURINGS: &str = "measurings";
const WELL_DATA: &str = "well_data";
const SKIN_FACTORS: &str = "skin_factors";

/// Persistent record store
#[derive(Clone)]
pub struct SledRepository {
    db: Arc<sled::Db>,
}

impl SledRepository {
    /// Open or create the store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        info!(path = %path_ref.display(), "CRM record store opened");
        Ok(Self { db: Arc::new(db) })
    }

    /// Write every record of a dataset, replacing records with the same id.
    ///
    /// Returns the number of records written.
    pub fn import_dataset(&self, dataset: &Dataset) -> Result<usize, StoreError> {
        let mut written = 0;
        written += self.put_all(WELLS, &dataset.wells, |w| w.id)?;
        written += self.put_all(HORIZONS, &dataset.horizons, |h| h.id)?;
        written += self.put_all(LINKS, &dataset.links, |l| l.id)?;
        written += self.put_all(MEASURINGS, &dataset.measurings, |m| m.id)?;
        written += self.put_all(WELL_DATA, &dataset.well_data, |d| d.id)?;
        written += self.put_all(SKIN_FACTORS, &dataset.skin_factors, |s| s.id)?;
        self.db.flush()?;
        info!(records = written, "Dataset imported");
        Ok(written)
    }

    /// Clear all trees
    pub fn clear(&self) -> Result<(), StoreError> {
        for name in [WELLS, HORIZONS, LINKS, MEASURINGS, WELL_DATA, SKIN_FACTORS] {
            self.db.open_tree(name)?.clear()?;
        }
        self.db.flush()?;
        Ok(())
    }

    fn put_all<T, F>(&self, tree: &str, items: &[T], id_of: F) -> Result<usize, StoreError>
    where
        T: Serialize,
        F: Fn(&T) -> i64,
    {
        let tree = self.db.open_tree(tree)?;
        for item in items {
            tree.insert(id_of(item).to_be_bytes(), serde_json::to_vec(item)?)?;
        }
        Ok(items.len())
    }

    fn get<T: DeserializeOwned>(&self, tree: &str, id: i64) -> Result<Option<T>, StoreError> {
        let tree = self.db.open_tree(tree)?;
        match tree.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Scan a tree, keeping the records that match `keep`.
    ///
    /// Records that fail to deserialize are skipped with a warning so one
    /// bad row does not take down every request.
    fn scan<T, F>(&self, tree_name: &str, keep: F) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let tree = self.db.open_tree(tree_name)?;
        let mut out = Vec::new();
        for item in tree.iter() {
            let (key, value) = item?;
            match serde_json::from_slice::<T>(&value) {
                Ok(record) if keep(&record) => out.push(record),
                Ok(_) => {}
                Err(e) => {
                    warn!(tree = tree_name, key = ?key, error = %e, "Skipping unreadable record");
                }
            }
        }
        debug!(tree = tree_name, matched = out.len(), "Scanned tree");
        Ok(out)
    }
}

impl CrmRepository for SledRepository {
    fn well(&self, id: WellId) -> Result<Option<Well>, StoreError> {
        self.get(WELLS, id)
    }

    fn wells(&self) -> Result<Vec<Well>, StoreError> {
        self.scan(WELLS, |_: &Well| true)
    }

    fn horizons_for_well(&self, well_id: WellId) -> Result<Vec<Horizon>, StoreError> {
        let mut hs = self.scan(HORIZONS, |h: &Horizon| h.well_id == well_id)?;
        hs.sort_by_key(|h| h.id);
        Ok(hs)
    }

    fn horizons(&self) -> Result<Vec<Horizon>, StoreError> {
        self.scan(HORIZONS, |_: &Horizon| true)
    }

    fn active_links_for_producer(&self, producer_id: WellId) -> Result<Vec<Link>, StoreError> {
        let mut links = self.scan(LINKS, |l: &Link| l.producer_id == producer_id && l.is_active())?;
        links.sort_by_key(|l| l.id);
        Ok(links)
    }

    fn measurings_for_link(&self, link_id: LinkId) -> Result<Vec<Measuring>, StoreError> {
        let mut ms = self.scan(MEASURINGS, |m: &Measuring| m.link_id == link_id)?;
        sort_measurings(&mut ms);
        Ok(ms)
    }

    fn well_data(&self, well_id: WellId) -> Result<Vec<WellDatum>, StoreError> {
        let mut ds = self.scan(WELL_DATA, |d: &WellDatum| d.well_id == well_id)?;
        sort_well_data(&mut ds);
        Ok(ds)
    }

    fn skin_factors_for_well(&self, well_id: WellId) -> Result<Vec<SkinFactor>, StoreError> {
        self.scan(SKIN_FACTORS, |s: &SkinFactor| s.well_id == well_id)
    }

    fn skin_factors(&self) -> Result<Vec<SkinFactor>, StoreError> {
        self.scan(SKIN_FACTORS, |_: &SkinFactor| true)
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}
