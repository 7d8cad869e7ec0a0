//! Heat-loss method selection and insulation layer defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ThermalError, ThermalResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatLossMethod {
    /// Reference loss rate per DN scaled by temperature difference.
    #[default]
    Linear,
    /// Series resistances from fluid to soil surface.
    ThermalResistance,
}

/// Loss area per metre of pipe used to turn a W/m figure into U.
///
/// `OuterDiameter` (A' = d_o) is what the downstream solver expects; switch to
/// `OuterCircumference` (A' = π d_o) only together with a solver that
/// multiplies U by the true surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaConvention {
    #[default]
    OuterDiameter,
    OuterCircumference,
}

impl AreaConvention {
    pub fn area_per_m(self, outer_diameter_m: f64) -> f64 {
        match self {
            AreaConvention::OuterDiameter => outer_diameter_m,
            AreaConvention::OuterCircumference => std::f64::consts::PI * outer_diameter_m,
        }
    }
}

/// Wall and insulation build-up used when no catalog geometry applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerDefaults {
    pub steel_wall_m: f64,
    pub insulation_thickness_m: f64,
    pub casing_thickness_m: f64,
    pub k_steel_w_per_m_k: f64,
    pub k_insulation_w_per_m_k: f64,
    pub k_casing_w_per_m_k: f64,
    /// Internal film coefficient when no velocity is known (W/m²K)
    pub h_internal_default_w_per_m2k: f64,
}

impl Default for LayerDefaults {
    fn default() -> Self {
        Self {
            steel_wall_m: 0.0032,
            insulation_thickness_m: 0.04,
            casing_thickness_m: 0.003,
            k_steel_w_per_m_k: 50.0,
            k_insulation_w_per_m_k: 0.027,
            k_casing_w_per_m_k: 0.43,
            h_internal_default_w_per_m2k: 3000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatLossConfig {
    pub method: HeatLossMethod,
    pub area_convention: AreaConvention,
    pub soil_temp_c: f64,
    /// Fluid temperature the linear reference rates were measured at (°C)
    pub reference_fluid_temp_c: f64,
    /// Soil temperature the linear reference rates were measured at (°C)
    pub reference_soil_temp_c: f64,
    /// Reference rate for trunk-class pipes without a table entry (W/m)
    pub trunk_default_w_per_m: f64,
    /// Reference rate for service pipes without a table entry (W/m)
    pub service_default_w_per_m: f64,
    /// Per-DN reference rates replacing the built-in table (W/m)
    pub dn_overrides_w_per_m: BTreeMap<u32, f64>,
    pub layers: LayerDefaults,
    /// Depth from surface to pipe axis (m)
    pub burial_depth_m: f64,
    pub soil_conductivity_w_per_m_k: f64,
    /// Loss multiplier for a pipe laid next to its circuit partner
    pub twin_pipe_factor: f64,
    pub cache_capacity: usize,
}

impl Default for HeatLossConfig {
    fn default() -> Self {
        Self {
            method: HeatLossMethod::Linear,
            area_convention: AreaConvention::OuterDiameter,
            soil_temp_c: 10.0,
            reference_fluid_temp_c: 80.0,
            reference_soil_temp_c: 10.0,
            trunk_default_w_per_m: 30.0,
            service_default_w_per_m: 18.0,
            dn_overrides_w_per_m: BTreeMap::new(),
            layers: LayerDefaults::default(),
            burial_depth_m: 1.0,
            soil_conductivity_w_per_m_k: 1.5,
            twin_pipe_factor: 0.9,
            cache_capacity: 512,
        }
    }
}

impl HeatLossConfig {
    pub fn reference_delta_t_k(&self) -> f64 {
        self.reference_fluid_temp_c - self.reference_soil_temp_c
    }

    pub fn validate(&self) -> ThermalResult<()> {
        let invalid = |what: String| Err(ThermalError::InvalidConfig { what });

        if !(self.reference_delta_t_k().is_finite() && self.reference_delta_t_k() > 0.0) {
            return invalid("reference fluid temperature must exceed reference soil temperature".into());
        }
        if !self.soil_temp_c.is_finite() {
            return invalid("soil temperature must be finite".into());
        }
        let positive = [
            ("trunk default loss", self.trunk_default_w_per_m),
            ("service default loss", self.service_default_w_per_m),
            ("burial depth", self.burial_depth_m),
            ("soil conductivity", self.soil_conductivity_w_per_m_k),
            ("steel conductivity", self.layers.k_steel_w_per_m_k),
            ("insulation conductivity", self.layers.k_insulation_w_per_m_k),
            ("casing conductivity", self.layers.k_casing_w_per_m_k),
            ("internal film coefficient", self.layers.h_internal_default_w_per_m2k),
        ];
        for (what, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return invalid(format!("{what} must be positive (got {v})"));
            }
        }
        let thickness = [
            self.layers.steel_wall_m,
            self.layers.insulation_thickness_m,
            self.layers.casing_thickness_m,
        ];
        if thickness.iter().any(|t| !(t.is_finite() && *t >= 0.0)) {
            return invalid("layer thicknesses must be non-negative".into());
        }
        if !(self.twin_pipe_factor > 0.0 && self.twin_pipe_factor <= 1.0) {
            return invalid(format!(
                "twin pipe factor must lie in (0, 1] (got {})",
                self.twin_pipe_factor
            ));
        }
        for (dn, q) in &self.dn_overrides_w_per_m {
            if !(q.is_finite() && *q >= 0.0) {
                return invalid(format!("override for DN {dn} must be non-negative"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(HeatLossConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_reference() {
        let cfg = HeatLossConfig {
            reference_soil_temp_c: 90.0,
            ..HeatLossConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_twin_factor_above_one() {
        let cfg = HeatLossConfig {
            twin_pipe_factor: 1.2,
            ..HeatLossConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ThermalError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn area_conventions_differ_by_pi() {
        let d = 0.2;
        let a = AreaConvention::OuterDiameter.area_per_m(d);
        let b = AreaConvention::OuterCircumference.area_per_m(d);
        assert!((b / a - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: HeatLossConfig =
            serde_json::from_str(r#"{"method":"thermal_resistance","dn_overrides_w_per_m":{"50":22.0}}"#)
                .unwrap();
        assert_eq!(cfg.method, HeatLossMethod::ThermalResistance);
        assert_eq!(cfg.cache_capacity, 512);
        assert_eq!(cfg.dn_overrides_w_per_m.get(&50), Some(&22.0));
    }
}
