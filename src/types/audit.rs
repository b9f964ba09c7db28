//! Audit records for parameters that were filled from field averages.

use serde::Serialize;

use super::records::{LinkId, WellId, WellType};

/// Physical parameters that can be defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    DrainageRadius,
    WellRadius,
    Permeability,
    Porosity,
    Thickness,
    Viscosity,
    Compressibility,
}

impl Parameter {
    pub fn as_str(self) -> &'static str {
        match self {
            Parameter::DrainageRadius => "drainage_radius",
            Parameter::WellRadius => "well_radius",
            Parameter::Permeability => "permeability",
            Parameter::Porosity => "porosity",
            Parameter::Thickness => "thickness",
            Parameter::Viscosity => "viscosity",
            Parameter::Compressibility => "compressibility",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Parameter::DrainageRadius => "Drainage radius (m)",
            Parameter::WellRadius => "Well-bore radius (m)",
            Parameter::Permeability => "Horizon permeability (mD)",
            Parameter::Porosity => "Horizon porosity (fraction)",
            Parameter::Thickness => "Horizon net thickness (m)",
            Parameter::Viscosity => "Fluid viscosity (cP)",
            Parameter::Compressibility => "Total compressibility (1/bar)",
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One substitution made while resolving a well's parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingDataRequest {
    pub parameter: Parameter,
    pub description: String,
    pub default_value: f64,
    pub critical: bool,
    pub well_id: WellId,
    pub well_name: String,
    pub link_id: Option<LinkId>,
    pub role: WellType,
}

/// API projection of a [`MissingDataRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDefault {
    pub parameter: Parameter,
    pub value: f64,
    pub source: &'static str,
    pub well_id: WellId,
    pub well_name: String,
}

impl From<&MissingDataRequest> for AppliedDefault {
    fn from(req: &MissingDataRequest) -> Self {
        Self {
            parameter: req.parameter,
            value: req.default_value,
            source: "field_average",
            well_id: req.well_id,
            well_name: req.well_name.clone(),
        }
    }
}
