//! Stored record types.
//!
//! Plain value structs keyed by numeric ids. Relations are resolved by id
//! through [`crate::storage::CrmRepository`]; no record holds a reference to
//! another.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type WellId = i64;
pub type HorizonId = i64;
pub type LinkId = i64;

// ============================================================================
// Well
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellType {
    Producer,
    Injector,
}

impl std::fmt::Display for WellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WellType::Producer => write!(f, "producer"),
            WellType::Injector => write!(f, "injector"),
        }
    }
}

/// A producing or injecting well.
///
/// `latitude` and `longitude` hold the stored (usually encrypted) strings;
/// they only become numbers through a [`crate::codec::CoordinateCodec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Well {
    pub id: WellId,
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    /// Drainage radius (m)
    #[serde(default)]
    pub drainage_radius: Option<f64>,
    /// Well-bore radius (m)
    #[serde(default)]
    pub well_radius: Option<f64>,
    pub well_type: WellType,
    #[serde(default)]
    pub workshop_id: Option<i64>,
}

// ============================================================================
// Horizon
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonStatus {
    Open,
    Closed,
    PartiallyOpen,
}

impl HorizonStatus {
    /// Open and partially-open horizons take part in calculations.
    pub fn is_eligible(self) -> bool {
        matches!(self, HorizonStatus::Open | HorizonStatus::PartiallyOpen)
    }
}

/// A producing interval of a well with its rock and fluid properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Horizon {
    pub id: HorizonId,
    pub well_id: WellId,
    #[serde(default)]
    pub name: String,
    /// Fraction, 0-1
    #[serde(default)]
    pub porosity: Option<f64>,
    /// Net thickness (m)
    #[serde(default)]
    pub thickness: Option<f64>,
    /// cP
    #[serde(default)]
    pub viscosity: Option<f64>,
    /// mD
    #[serde(default)]
    pub permeability: Option<f64>,
    /// 1/bar
    #[serde(default)]
    pub compressibility: Option<f64>,
    pub status: HorizonStatus,
}

/// Pick the horizon a well is calculated on: the eligible one with the
/// lowest id.
pub fn select_horizon(horizons: &[Horizon]) -> Option<&Horizon> {
    horizons
        .iter()
        .filter(|h| h.status.is_eligible())
        .min_by_key(|h| h.id)
}

// ============================================================================
// Link
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Active,
    Inactive,
}

/// Directed producer <- injector pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: LinkId,
    pub producer_id: WellId,
    pub injector_id: WellId,
    pub status: LinkStatus,
    /// Most recently persisted connectivity ratio, 0-1
    #[serde(default)]
    pub last_ratio: Option<f64>,
}

impl Link {
    pub fn is_active(&self) -> bool {
        self.status == LinkStatus::Active
    }
}

// ============================================================================
// Time series samples
// ============================================================================

/// Historical ratio sample of a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measuring {
    pub id: i64,
    pub link_id: LinkId,
    pub date: NaiveDate,
    pub ratio: f64,
}

/// Monthly rate / pressure sample of a well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellDatum {
    pub id: i64,
    pub well_id: WellId,
    pub year: i32,
    /// 1-12
    pub month: u32,
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
}

impl WellDatum {
    pub fn period(&self) -> YearMonth {
        YearMonth::new(self.year, self.month)
    }
}

/// Near-wellbore skin factor measured at a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinFactor {
    pub id: i64,
    pub well_id: WellId,
    pub date: NaiveDate,
    pub value: f64,
}

/// Latest skin factor by date, ties broken by id.
pub fn latest_skin_factor(samples: &[SkinFactor]) -> Option<&SkinFactor> {
    samples.iter().max_by_key(|s| (s.date, s.id))
}

// ============================================================================
// Calendar month
// ============================================================================

/// A (year, month) pair; months are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self::new(date.year(), date.month())
    }

    /// Whole months from `self` to `later` (negative when `later` is earlier).
    pub fn months_until(self, later: YearMonth) -> i64 {
        (i64::from(later.year) - i64::from(self.year)) * 12 + i64::from(later.month) - i64::from(self.month)
    }

    /// The month `n` months after this one.
    pub fn plus_months(self, n: u32) -> Self {
        let zero_based = i64::from(self.month) - 1 + i64::from(n);
        let year = i64::from(self.year) + zero_based.div_euclid(12);
        let month = zero_based.rem_euclid(12) + 1;
        Self::new(
            i32::try_from(year).unwrap_or(i32::MAX),
            u32::try_from(month).unwrap_or(12),
        )
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
