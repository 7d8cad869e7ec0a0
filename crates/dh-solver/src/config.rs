//! Repair loop bounds and fix-up pipe geometry.

use dh_core::units::{mm, Length};
use serde::{Deserialize, Serialize};

/// Bounds and fix-up geometry for the convergence/sanity repair loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Diagnose/fix/re-solve rounds after a failed direct solve
    pub max_repair_iterations: usize,
    /// Boundary escalations when pressures fall below the floor
    pub max_sanity_attempts: usize,
    pub pressure_floor_bar: f64,
    /// Multiplier on plant pressure and pump lift per escalation
    pub escalation_factor: f64,
    /// Highest acceptable pipe count at a trunk or tee junction
    pub max_trunk_degree: usize,
    /// Service lengths with a coefficient of variation below this look synthetic
    pub uniformity_cv_threshold: f64,
    /// Fewer service pipes than this are never flagged as uniform
    pub min_services_for_uniformity: usize,
    /// Relative half-width of the length perturbation
    pub perturbation_fraction: f64,
    pub bypass_length_m: f64,
    pub bypass_diameter_m: f64,
    pub bridge_diameter_m: f64,
    pub roughness_mm: f64,
    /// Seed for the perturbation RNG when the caller builds one from config
    pub rng_seed: u64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_repair_iterations: 3,
            max_sanity_attempts: 3,
            pressure_floor_bar: 1.0,
            escalation_factor: 1.25,
            max_trunk_degree: 3,
            uniformity_cv_threshold: 0.01,
            min_services_for_uniformity: 3,
            perturbation_fraction: 0.05,
            bypass_length_m: 1.0,
            bypass_diameter_m: 0.005,
            bridge_diameter_m: 0.05,
            roughness_mm: 0.1,
            rng_seed: 42,
        }
    }
}

impl RepairConfig {
    pub fn roughness(&self) -> Length {
        mm(self.roughness_mm)
    }
}
