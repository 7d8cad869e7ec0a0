//! Water properties at the network design point.
//!
//! The planner works with constant properties; temperature dependence is the
//! external solver's business.

/// Constant water properties used for sizing and heat-loss estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WaterProps {
    /// Density (kg/m³)
    pub density_kg_m3: f64,
    /// Specific heat capacity (J/(kg·K))
    pub cp_j_per_kg_k: f64,
    /// Dynamic viscosity (Pa·s)
    pub viscosity_pa_s: f64,
    /// Thermal conductivity (W/(m·K))
    pub conductivity_w_per_m_k: f64,
}

impl Default for WaterProps {
    /// Water at roughly 70 °C.
    fn default() -> Self {
        Self {
            density_kg_m3: 977.8,
            cp_j_per_kg_k: 4190.0,
            viscosity_pa_s: 4.04e-4,
            conductivity_w_per_m_k: 0.663,
        }
    }
}

impl WaterProps {
    /// Prandtl number cp·μ/k.
    pub fn prandtl(&self) -> f64 {
        self.cp_j_per_kg_k * self.viscosity_pa_s / self.conductivity_w_per_m_k
    }
}
