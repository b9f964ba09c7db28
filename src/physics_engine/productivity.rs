//! Radial-flow productivity index and producer time constant.

use std::f64::consts::PI;

use crate::config::defaults::{MIN_PRODUCTIVITY_INDEX, PRODUCTIVITY_UNIT_CONSTANT};
use crate::crm::ResolvedParameters;

/// Steady-state radial-flow productivity index.
///
/// Formula: J = (2π × k × h) / (μ × (ln(rd / rw) + S)) × C
///
/// Where:
/// - k = permeability (mD)
/// - h = net thickness (m)
/// - μ = viscosity (cP)
/// - rd, rw = drainage and well-bore radius (m)
/// - S = skin factor
/// - C = 0.008527 unit conversion
///
/// Inputs are expected to be defaulted upstream; rd <= rw or μ <= 0 are not
/// guarded here.
pub fn productivity_index(
    permeability: f64,
    thickness: f64,
    viscosity: f64,
    drainage_radius: f64,
    well_radius: f64,
    skin: f64,
) -> f64 {
    (2.0 * PI * permeability * thickness)
        / (viscosity * ((drainage_radius / well_radius).ln() + skin))
        * PRODUCTIVITY_UNIT_CONSTANT
}

/// Productivity index of a resolved parameter set.
pub fn productivity_index_for(params: &ResolvedParameters, skin: f64) -> f64 {
    productivity_index(
        params.permeability,
        params.thickness,
        params.viscosity,
        params.drainage_radius,
        params.well_radius,
        skin,
    )
}

/// Drainage area π × rd² (m²).
pub fn drainage_area(drainage_radius: f64) -> f64 {
    PI * drainage_radius * drainage_radius
}

/// Producer time constant τ = c_t × V_p / max(J, 0.001).
///
/// V_p = drainage area × h × φ.
pub fn time_constant(params: &ResolvedParameters, skin: f64) -> f64 {
    let pore_volume = drainage_area(params.drainage_radius) * params.thickness * params.porosity;
    let j = productivity_index_for(params, skin);
    params.compressibility * pore_volume / j.max(MIN_PRODUCTIVITY_INDEX)
}
