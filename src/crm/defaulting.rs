//! Parameter defaulting
//!
//! Stored wells and horizons often miss rock or fluid properties. Before any
//! ratio math runs, each missing or non-positive value is replaced with the
//! field-wide average and the substitution is recorded. The result is a
//! separate [`ResolvedParameters`] value; stored records are never touched.

use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::{debug, warn};

use crate::config::FieldDefaultsConfig;
use crate::storage::CrmRepository;
use crate::types::{Horizon, LinkId, MissingDataRequest, Parameter, Well, WellType};

// ============================================================================
// Field averages
// ============================================================================

/// Mean of every positive stored sample per parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAverages {
    pub porosity: f64,
    pub thickness: f64,
    pub viscosity: f64,
    pub permeability: f64,
    pub compressibility: f64,
    pub drainage_radius: f64,
    pub well_radius: f64,
    pub skin_factor: f64,
}

impl FieldAverages {
    /// The configured constants, used when nothing can be read.
    pub fn fallback(cfg: &FieldDefaultsConfig) -> Self {
        Self {
            porosity: cfg.porosity,
            thickness: cfg.thickness,
            viscosity: cfg.viscosity,
            permeability: cfg.permeability,
            compressibility: cfg.compressibility,
            drainage_radius: cfg.drainage_radius,
            well_radius: cfg.well_radius,
            skin_factor: cfg.skin_factor,
        }
    }

    pub fn value(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::DrainageRadius => self.drainage_radius,
            Parameter::WellRadius => self.well_radius,
            Parameter::Permeability => self.permeability,
            Parameter::Porosity => self.porosity,
            Parameter::Thickness => self.thickness,
            Parameter::Viscosity => self.viscosity,
            Parameter::Compressibility => self.compressibility,
        }
    }
}

fn positive_mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let positive: Vec<f64> = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    if positive.is_empty() {
        None
    } else {
        Some(positive.iter().mean())
    }
}

/// Compute field averages from the store.
///
/// Each parameter without a positive sample keeps its fallback constant.
/// If the store cannot be read, the whole fallback table is returned.
pub fn compute_field_averages(
    repo: &dyn CrmRepository,
    fallback: &FieldDefaultsConfig,
) -> FieldAverages {
    let base = FieldAverages::fallback(fallback);

    let read = || -> Result<FieldAverages, crate::storage::StoreError> {
        let wells = repo.wells()?;
        let horizons = repo.horizons()?;
        let skins = repo.skin_factors()?;

        Ok(FieldAverages {
            porosity: positive_mean(horizons.iter().map(|h| h.porosity)).unwrap_or(base.porosity),
            thickness: positive_mean(horizons.iter().map(|h| h.thickness)).unwrap_or(base.thickness),
            viscosity: positive_mean(horizons.iter().map(|h| h.viscosity)).unwrap_or(base.viscosity),
            permeability: positive_mean(horizons.iter().map(|h| h.permeability))
                .unwrap_or(base.permeability),
            compressibility: positive_mean(horizons.iter().map(|h| h.compressibility))
                .unwrap_or(base.compressibility),
            drainage_radius: positive_mean(wells.iter().map(|w| w.drainage_radius))
                .unwrap_or(base.drainage_radius),
            well_radius: positive_mean(wells.iter().map(|w| w.well_radius)).unwrap_or(base.well_radius),
            skin_factor: positive_mean(skins.iter().map(|s| Some(s.value))).unwrap_or(base.skin_factor),
        })
    };

    match read() {
        Ok(averages) => {
            debug!(?averages, backend = repo.backend_name(), "Field averages computed");
            averages
        }
        Err(e) => {
            warn!(error = %e, backend = repo.backend_name(), "Field averages unavailable, using fallback constants");
            base
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Physical parameters of one well after defaulting. Every value is either
/// a stored positive value or a recorded field average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedParameters {
    pub drainage_radius: f64,
    pub well_radius: f64,
    pub permeability: f64,
    pub porosity: f64,
    pub thickness: f64,
    pub viscosity: f64,
    pub compressibility: f64,
}

impl ResolvedParameters {
    /// Permeability-thickness product k·h.
    pub fn kh(&self) -> f64 {
        self.permeability * self.thickness
    }
}

/// Resolved parameters together with the substitutions that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub params: ResolvedParameters,
    pub requests: Vec<MissingDataRequest>,
}

struct Resolver<'a> {
    well: &'a Well,
    averages: &'a FieldAverages,
    role: WellType,
    link_id: Option<LinkId>,
    requests: Vec<MissingDataRequest>,
}

impl Resolver<'_> {
    fn take(&mut self, parameter: Parameter, stored: Option<f64>) -> f64 {
        match stored {
            Some(v) if v > 0.0 => v,
            _ => {
                let default_value = self.averages.value(parameter);
                debug!(
                    well_id = self.well.id,
                    link_id = ?self.link_id,
                    parameter = %parameter,
                    default_value,
                    "Parameter missing, using field average"
                );
                self.requests.push(MissingDataRequest {
                    parameter,
                    description: parameter.description().to_string(),
                    default_value,
                    critical: true,
                    well_id: self.well.id,
                    well_name: self.well.name.clone(),
                    link_id: self.link_id,
                    role: self.role,
                });
                default_value
            }
        }
    }
}

/// Fill a well's parameters from its stored record and selected horizon.
pub fn resolve_parameters(
    well: &Well,
    horizon: &Horizon,
    averages: &FieldAverages,
    role: WellType,
    link_id: Option<LinkId>,
) -> Resolution {
    let mut r = Resolver {
        well,
        averages,
        role,
        link_id,
        requests: Vec::new(),
    };

    let params = ResolvedParameters {
        drainage_radius: r.take(Parameter::DrainageRadius, well.drainage_radius),
        well_radius: r.take(Parameter::WellRadius, well.well_radius),
        permeability: r.take(Parameter::Permeability, horizon.permeability),
        porosity: r.take(Parameter::Porosity, horizon.porosity),
        thickness: r.take(Parameter::Thickness, horizon.thickness),
        viscosity: r.take(Parameter::Viscosity, horizon.viscosity),
        compressibility: r.take(Parameter::Compressibility, horizon.compressibility),
    };

    Resolution {
        params,
        requests: r.requests,
    }
}
