//! Pure per-pipe heat-loss computation.

use std::f64::consts::PI;

use dh_core::units::{m, mps};
use dh_core::WaterProps;
use dh_network::hydraulics::{reynolds, RE_CRITICAL};
use dh_network::{Circuit, PipeRole};
use serde::{Deserialize, Serialize};

use crate::config::{HeatLossConfig, HeatLossMethod, LayerDefaults};
use crate::error::{ThermalError, ThermalResult};
use crate::tables;

/// Nusselt number for fully developed laminar flow at constant wall temperature.
const NU_LAMINAR: f64 = 3.66;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatLossInputs {
    #[serde(default)]
    pub dn: Option<u32>,
    pub inner_diameter_m: f64,
    pub length_m: f64,
    pub fluid_temp_k: f64,
    pub soil_temp_k: f64,
    pub role: PipeRole,
    pub circuit: Circuit,
    #[serde(default)]
    pub outer_diameter_m: Option<f64>,
    #[serde(default)]
    pub insulation_thickness_m: Option<f64>,
    /// Laid next to its supply/return partner
    #[serde(default)]
    pub paired: bool,
    #[serde(default)]
    pub velocity_m_s: Option<f64>,
}

impl HeatLossInputs {
    fn validate(&self) -> ThermalResult<()> {
        let bad = |what: &'static str, value: f64| Err(ThermalError::InvalidInput { what, value });
        if !(self.inner_diameter_m.is_finite() && self.inner_diameter_m > 0.0) {
            return bad("inner diameter", self.inner_diameter_m);
        }
        if !(self.length_m.is_finite() && self.length_m >= 0.0) {
            return bad("length", self.length_m);
        }
        if !self.fluid_temp_k.is_finite() {
            return bad("fluid temperature", self.fluid_temp_k);
        }
        if !self.soil_temp_k.is_finite() {
            return bad("soil temperature", self.soil_temp_k);
        }
        if let Some(d) = self.outer_diameter_m {
            if !(d.is_finite() && d > self.inner_diameter_m) {
                return bad("outer diameter", d);
            }
        }
        if let Some(t) = self.insulation_thickness_m {
            if !(t.is_finite() && t >= 0.0) {
                return bad("insulation thickness", t);
            }
        }
        if let Some(v) = self.velocity_m_s {
            if !v.is_finite() {
                return bad("velocity", v);
            }
        }
        Ok(())
    }
}

/// Where a linear reference rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    Override,
    Table,
    RoleDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatLossBreakdown {
    Linear {
        reference_w_per_m: f64,
        source: ReferenceSource,
        temperature_scale: f64,
    },
    /// Resistances per metre (m·K/W)
    ThermalResistance {
        h_internal_w_per_m2k: f64,
        r_internal: f64,
        r_steel: f64,
        r_insulation: f64,
        r_casing: f64,
        r_soil: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatLossResult {
    pub method: HeatLossMethod,
    pub loss_w_per_m: f64,
    pub loss_w: f64,
    pub u_w_per_m2k: f64,
    pub text_k: f64,
    pub loss_area_per_m: f64,
    pub outer_diameter_m: f64,
    pub interaction_factor: f64,
    pub breakdown: HeatLossBreakdown,
}

/// Loss multiplier for a pipe sharing a trench with its circuit partner.
pub fn twin_pipe_correction(paired: bool, factor: f64) -> f64 {
    if paired {
        factor.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Diameters (m) of each layer boundary, inside out.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Layers {
    inner: f64,
    steel: f64,
    insulation: f64,
    outer: f64,
}

fn resolve_layers(inputs: &HeatLossInputs, defaults: &LayerDefaults) -> Layers {
    let inner = inputs.inner_diameter_m;
    let table = inputs
        .dn
        .and_then(tables::casing_dimensions_m)
        .filter(|&(steel, _)| steel > inner);

    let steel = table.map_or(inner + 2.0 * defaults.steel_wall_m, |(s, _)| s);
    let outer = match (inputs.outer_diameter_m, inputs.insulation_thickness_m, table) {
        (Some(d), _, _) => d,
        (None, Some(ins), _) => steel + 2.0 * (ins + defaults.casing_thickness_m),
        (None, None, Some((_, casing))) => casing,
        (None, None, None) => {
            steel + 2.0 * (defaults.insulation_thickness_m + defaults.casing_thickness_m)
        }
    };
    let steel = steel.min(outer);
    let insulation = (outer - 2.0 * defaults.casing_thickness_m).clamp(steel, outer);
    Layers {
        inner,
        steel,
        insulation,
        outer,
    }
}

fn reference_rate(inputs: &HeatLossInputs, cfg: &HeatLossConfig) -> (f64, ReferenceSource) {
    if let Some(q) = inputs.dn.and_then(|dn| cfg.dn_overrides_w_per_m.get(&dn)) {
        return (*q, ReferenceSource::Override);
    }
    if let Some(q) = inputs.dn.and_then(tables::reference_loss_w_per_m) {
        return (q, ReferenceSource::Table);
    }
    let q = match inputs.role {
        PipeRole::Service | PipeRole::Bypass => cfg.service_default_w_per_m,
        PipeRole::Plant | PipeRole::Trunk | PipeRole::Bridge => cfg.trunk_default_w_per_m,
    };
    (q, ReferenceSource::RoleDefault)
}

fn internal_film_coefficient(
    velocity: Option<f64>,
    inner_d: f64,
    defaults: &LayerDefaults,
    water: &WaterProps,
) -> f64 {
    let Some(v) = velocity else {
        return defaults.h_internal_default_w_per_m2k;
    };
    let re = reynolds(mps(v), m(inner_d), water);
    let nu = if re >= RE_CRITICAL {
        0.023 * re.powf(0.8) * water.prandtl().powf(0.4)
    } else {
        NU_LAMINAR
    };
    nu * water.conductivity_w_per_m_k / inner_d
}

/// Cylindrical shell resistance per metre between two diameters.
fn shell(d_in: f64, d_out: f64, k: f64) -> f64 {
    if d_out <= d_in {
        return 0.0;
    }
    (d_out / d_in).ln() / (2.0 * PI * k)
}

/// Heat loss for one pipe. Deterministic in its inputs.
pub fn compute_heat_loss(
    inputs: &HeatLossInputs,
    cfg: &HeatLossConfig,
    water: &WaterProps,
) -> ThermalResult<HeatLossResult> {
    inputs.validate()?;

    let layers = resolve_layers(inputs, &cfg.layers);
    let area = cfg.area_convention.area_per_m(layers.outer);
    let factor = twin_pipe_correction(inputs.paired, cfg.twin_pipe_factor);
    let dt = inputs.fluid_temp_k - inputs.soil_temp_k;

    let (raw_w_per_m, breakdown) = match cfg.method {
        HeatLossMethod::Linear => {
            let (q_ref, source) = reference_rate(inputs, cfg);
            let scale = dt / cfg.reference_delta_t_k();
            (
                q_ref * scale,
                HeatLossBreakdown::Linear {
                    reference_w_per_m: q_ref,
                    source,
                    temperature_scale: scale,
                },
            )
        }
        HeatLossMethod::ThermalResistance => {
            let l = &cfg.layers;
            let h = internal_film_coefficient(inputs.velocity_m_s, layers.inner, l, water);
            let r_internal = 1.0 / (h * PI * layers.inner);
            let r_steel = shell(layers.inner, layers.steel, l.k_steel_w_per_m_k);
            let r_insulation = shell(layers.steel, layers.insulation, l.k_insulation_w_per_m_k);
            let r_casing = shell(layers.insulation, layers.outer, l.k_casing_w_per_m_k);
            // acosh is undefined below 1; a pipe not fully buried has no soil term
            let depth_ratio = (2.0 * cfg.burial_depth_m / layers.outer).max(1.0);
            let r_soil = depth_ratio.acosh() / (2.0 * PI * cfg.soil_conductivity_w_per_m_k);
            let r_total = r_internal + r_steel + r_insulation + r_casing + r_soil;
            (
                dt / r_total,
                HeatLossBreakdown::ThermalResistance {
                    h_internal_w_per_m2k: h,
                    r_internal,
                    r_steel,
                    r_insulation,
                    r_casing,
                    r_soil,
                },
            )
        }
    };

    let (loss_w_per_m, u) = if dt > 0.0 && area > 0.0 {
        let q = raw_w_per_m * factor;
        (q, q / (area * dt))
    } else {
        (0.0, 0.0)
    };

    Ok(HeatLossResult {
        method: cfg.method,
        loss_w_per_m,
        loss_w: loss_w_per_m * inputs.length_m,
        u_w_per_m2k: u,
        text_k: inputs.soil_temp_k,
        loss_area_per_m: area,
        outer_diameter_m: layers.outer,
        interaction_factor: factor,
        breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AreaConvention;

    fn inputs(dn: Option<u32>, inner: f64) -> HeatLossInputs {
        HeatLossInputs {
            dn,
            inner_diameter_m: inner,
            length_m: 100.0,
            fluid_temp_k: 353.15,
            soil_temp_k: 283.15,
            role: PipeRole::Trunk,
            circuit: Circuit::Supply,
            outer_diameter_m: None,
            insulation_thickness_m: None,
            paired: false,
            velocity_m_s: None,
        }
    }

    #[test]
    fn linear_at_reference_matches_table() {
        let cfg = HeatLossConfig::default();
        let r = compute_heat_loss(&inputs(Some(100), 0.1071), &cfg, &WaterProps::default()).unwrap();
        assert!((r.loss_w_per_m - 33.5).abs() < 1e-9);
        assert!((r.loss_w - 3350.0).abs() < 1e-6);
        // casing 200 mm, A' = d_o
        assert!((r.loss_area_per_m - 0.2).abs() < 1e-12);
        assert!((r.u_w_per_m2k - 33.5 / (0.2 * 70.0)).abs() < 1e-9);
    }

    #[test]
    fn override_wins_over_table() {
        let mut cfg = HeatLossConfig::default();
        cfg.dn_overrides_w_per_m.insert(100, 40.0);
        let r = compute_heat_loss(&inputs(Some(100), 0.1071), &cfg, &WaterProps::default()).unwrap();
        assert_eq!(r.loss_w_per_m, 40.0);
        assert!(matches!(
            r.breakdown,
            HeatLossBreakdown::Linear {
                source: ReferenceSource::Override,
                ..
            }
        ));
    }

    #[test]
    fn unsized_service_uses_role_default() {
        let cfg = HeatLossConfig::default();
        let mut i = inputs(None, 0.03);
        i.role = PipeRole::Service;
        let r = compute_heat_loss(&i, &cfg, &WaterProps::default()).unwrap();
        assert_eq!(r.loss_w_per_m, cfg.service_default_w_per_m);
        let expected_outer = 0.03 + 2.0 * (0.0032 + 0.04 + 0.003);
        assert!((r.outer_diameter_m - expected_outer).abs() < 1e-12);
    }

    #[test]
    fn loss_scales_with_temperature_difference() {
        let cfg = HeatLossConfig::default();
        let mut i = inputs(Some(50), 0.0545);
        i.fluid_temp_k = 318.15; // 45 °C, half the reference spread
        let r = compute_heat_loss(&i, &cfg, &WaterProps::default()).unwrap();
        assert!((r.loss_w_per_m - 12.5).abs() < 1e-9);
    }

    #[test]
    fn non_positive_spread_gives_zero() {
        for method in [HeatLossMethod::Linear, HeatLossMethod::ThermalResistance] {
            let cfg = HeatLossConfig {
                method,
                ..HeatLossConfig::default()
            };
            let mut i = inputs(Some(50), 0.0545);
            i.fluid_temp_k = 280.0;
            let r = compute_heat_loss(&i, &cfg, &WaterProps::default()).unwrap();
            assert_eq!(r.loss_w_per_m, 0.0);
            assert_eq!(r.u_w_per_m2k, 0.0);
        }
    }

    #[test]
    fn twin_factor_applies_to_both_methods() {
        for method in [HeatLossMethod::Linear, HeatLossMethod::ThermalResistance] {
            let cfg = HeatLossConfig {
                method,
                ..HeatLossConfig::default()
            };
            let single = inputs(Some(80), 0.0825);
            let twin = HeatLossInputs {
                paired: true,
                ..single.clone()
            };
            let w = WaterProps::default();
            let a = compute_heat_loss(&single, &cfg, &w).unwrap();
            let b = compute_heat_loss(&twin, &cfg, &w).unwrap();
            assert!((b.loss_w_per_m - 0.9 * a.loss_w_per_m).abs() < 1e-9);
            assert_eq!(b.interaction_factor, 0.9);
        }
    }

    #[test]
    fn circumference_convention_lowers_u() {
        let w = WaterProps::default();
        let a = compute_heat_loss(&inputs(Some(80), 0.0825), &HeatLossConfig::default(), &w).unwrap();
        let cfg = HeatLossConfig {
            area_convention: AreaConvention::OuterCircumference,
            ..HeatLossConfig::default()
        };
        let b = compute_heat_loss(&inputs(Some(80), 0.0825), &cfg, &w).unwrap();
        assert_eq!(a.loss_w_per_m, b.loss_w_per_m);
        assert!((a.u_w_per_m2k / b.u_w_per_m2k - PI).abs() < 1e-9);
    }

    #[test]
    fn resistance_method_is_plausible() {
        let cfg = HeatLossConfig {
            method: HeatLossMethod::ThermalResistance,
            ..HeatLossConfig::default()
        };
        let r = compute_heat_loss(&inputs(Some(100), 0.1071), &cfg, &WaterProps::default()).unwrap();
        // insulation dominates; loss lands in the tens of W/m
        assert!(r.loss_w_per_m > 5.0 && r.loss_w_per_m < 80.0, "{}", r.loss_w_per_m);
        let HeatLossBreakdown::ThermalResistance {
            r_insulation,
            r_steel,
            r_internal,
            ..
        } = r.breakdown
        else {
            panic!("expected resistance breakdown");
        };
        assert!(r_insulation > r_steel);
        assert!(r_insulation > r_internal);
    }

    #[test]
    fn turbulent_film_beats_laminar() {
        let w = WaterProps::default();
        let d = LayerDefaults::default();
        let turbulent = internal_film_coefficient(Some(1.0), 0.1, &d, &w);
        let laminar = internal_film_coefficient(Some(0.001), 0.1, &d, &w);
        assert!(turbulent > laminar);
        assert!((laminar - NU_LAMINAR * w.conductivity_w_per_m_k / 0.1).abs() < 1e-12);
        assert_eq!(
            internal_film_coefficient(None, 0.1, &d, &w),
            d.h_internal_default_w_per_m2k
        );
    }

    #[test]
    fn rejects_bad_inputs() {
        let cfg = HeatLossConfig::default();
        let w = WaterProps::default();
        assert!(compute_heat_loss(&inputs(None, 0.0), &cfg, &w).is_err());
        let mut i = inputs(None, 0.1);
        i.outer_diameter_m = Some(0.05);
        assert!(matches!(
            compute_heat_loss(&i, &cfg, &w),
            Err(ThermalError::InvalidInput {
                what: "outer diameter",
                ..
            })
        ));
    }

    #[test]
    fn explicit_insulation_thickness_sets_outer() {
        let mut i = inputs(None, 0.1);
        i.insulation_thickness_m = Some(0.06);
        let layers = resolve_layers(&i, &LayerDefaults::default());
        let steel = 0.1 + 2.0 * 0.0032;
        assert!((layers.steel - steel).abs() < 1e-12);
        assert!((layers.outer - (steel + 2.0 * 0.063)).abs() < 1e-12);
        assert!((layers.insulation - (layers.outer - 0.006)).abs() < 1e-12);
    }
}
