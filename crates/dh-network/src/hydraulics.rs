//! Pipe hydraulics: design flow, velocity and Darcy-Weisbach friction.

use dh_core::units::{kgps, mps, pa, Length, MassRate, Power, Pressure, Velocity};
use dh_core::WaterProps;

/// Mass flows below this are treated as zero (kg/s)
pub const EPSILON_MDOT: f64 = 1e-9;

/// Laminar/turbulent transition Reynolds number.
pub const RE_CRITICAL: f64 = 2300.0;

/// Design mass flow for a heat load at a given temperature spread.
///
/// Zero or negative load (or spread) gives zero flow.
pub fn mass_flow_for_load(load: Power, cp_j_per_kg_k: f64, delta_t_k: f64) -> MassRate {
    let w = load.value;
    if w <= 0.0 || delta_t_k <= 0.0 || cp_j_per_kg_k <= 0.0 {
        return kgps(0.0);
    }
    kgps(w / (cp_j_per_kg_k * delta_t_k))
}

pub fn flow_area_m2(diameter_m: f64) -> f64 {
    std::f64::consts::PI * diameter_m * diameter_m / 4.0
}

/// Mean velocity for a mass flow through a circular bore.
pub fn mean_velocity(mdot: MassRate, density_kg_m3: f64, diameter: Length) -> Velocity {
    let (mdot, d) = (mdot.value, diameter.value);
    if mdot.abs() < EPSILON_MDOT || d <= 0.0 || density_kg_m3 <= 0.0 {
        return mps(0.0);
    }
    mps(mdot / (density_kg_m3 * flow_area_m2(d)))
}

pub fn reynolds(velocity: Velocity, diameter: Length, water: &WaterProps) -> f64 {
    if water.viscosity_pa_s <= 0.0 {
        return 0.0;
    }
    water.density_kg_m3 * velocity.value.abs() * diameter.value / water.viscosity_pa_s
}

/// Darcy friction factor: 64/Re when laminar, Swamee-Jain when turbulent.
pub fn friction_factor(reynolds: f64, roughness_m: f64, diameter_m: f64) -> f64 {
    if reynolds <= 0.0 {
        0.0
    } else if reynolds < RE_CRITICAL {
        64.0 / reynolds
    } else {
        let e_d = roughness_m / diameter_m;
        let a = e_d / 3.7;
        let b = 5.74 / reynolds.powf(0.9);
        let f = 0.25 / (a + b).log10().powi(2);
        f.max(0.0001)
    }
}

/// Frictional pressure gradient (Pa/m) for a mass flow.
pub fn pressure_gradient_pa_per_m(
    mdot: MassRate,
    diameter: Length,
    roughness: Length,
    water: &WaterProps,
) -> f64 {
    let v = mean_velocity(mdot, water.density_kg_m3, diameter);
    if v.value == 0.0 {
        return 0.0;
    }
    let d = diameter.value;
    let f = friction_factor(reynolds(v, diameter, water), roughness.value, d);
    f * 0.5 * water.density_kg_m3 * v.value * v.value / d
}

/// Frictional pressure drop over a whole pipe.
pub fn pressure_drop(
    length: Length,
    diameter: Length,
    roughness: Length,
    mdot: MassRate,
    water: &WaterProps,
) -> Pressure {
    pa(pressure_gradient_pa_per_m(mdot, diameter, roughness, water) * length.value)
}
