//! Serialized KPI report. Field names are part of the output contract.

use serde::{Deserialize, Serialize};

/// Summary statistics over one quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
}

impl Distribution {
    /// Nearest-rank percentiles; all zeros for no values.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        let rank = |q: f64| {
            let r = (q * n as f64).ceil() as usize;
            sorted[r.clamp(1, n) - 1]
        };
        Self {
            count: n,
            min: sorted[0],
            max: sorted[n - 1],
            mean: sorted.iter().sum::<f64>() / n as f64,
            p50: rank(0.5),
            p95: rank(0.95),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateKpis {
    pub buildings_served: usize,
    pub total_heat_demand_kw: f64,
    pub design_mass_flow_kg_s: f64,
    pub trunk_length_m: f64,
    pub service_length_m: f64,
    pub total_route_length_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydraulicKpis {
    pub velocity_m_s: Distribution,
    pub velocity_share_within_limit: f64,
    pub dp_bar_per_100m: Distribution,
    pub min_pressure_bar: f64,
    pub max_pressure_bar: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalKpis {
    pub plant_supply_temp_c: f64,
    pub plant_return_temp_c: f64,
    pub min_consumer_supply_temp_c: f64,
    /// Plant supply minus the coldest consumer supply (K)
    pub max_supply_temp_drop_k: f64,
    /// Per-pipe inlet minus outlet temperature (K)
    pub pipe_temp_drop_k: Distribution,
}

/// How each pipe's loss figure was obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossSourceCounts {
    pub solver_reported: usize,
    pub enthalpy_balance: usize,
    pub u_value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossKpis {
    pub total_loss_kw: f64,
    pub supply_loss_kw: f64,
    pub return_loss_kw: f64,
    pub loss_w_per_m: f64,
    /// Loss over delivered plus lost heat (%)
    pub loss_share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpKpis {
    pub mass_flow_kg_s: f64,
    pub deltap_bar: f64,
    pub hydraulic_power_kw: f64,
    pub electrical_power_kw: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    VelocityShareBelowThreshold,
    PressureDropAboveCeiling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compliance {
    pub feasible: bool,
    pub velocity_ok: bool,
    pub dp_ok: bool,
    pub velocity_limit_m_s: f64,
    pub velocity_share_within_limit: f64,
    pub velocity_share_threshold: f64,
    pub max_dp_bar_per_100m: f64,
    pub dp_ceiling_bar_per_100m: f64,
    pub reasons: Vec<ReasonCode>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeKpi {
    pub name: String,
    pub role: String,
    pub circuit: String,
    pub length_m: f64,
    #[serde(default)]
    pub dn: Option<u32>,
    pub velocity_m_s: f64,
    pub dp_bar_per_100m: f64,
    pub temp_drop_k: f64,
    pub loss_w: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionKpi {
    pub name: String,
    pub circuit: String,
    pub p_bar: f64,
    pub t_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerKpi {
    pub building_id: String,
    pub heat_demand_kw: f64,
    pub mdot_kg_s: f64,
    pub t_supply_c: f64,
    pub t_return_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedKpis {
    pub pipes: Vec<PipeKpi>,
    pub junctions: Vec<JunctionKpi>,
    pub consumers: Vec<ConsumerKpi>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub pipes_evaluated: usize,
    pub junctions_evaluated: usize,
    pub loss_sources: LossSourceCounts,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub cluster_id: String,
    #[serde(default)]
    pub design_hour: Option<String>,
    pub aggregate: AggregateKpis,
    pub hydraulics: HydraulicKpis,
    pub thermal: ThermalKpis,
    pub losses: LossKpis,
    pub pump: PumpKpis,
    pub en13941_compliance: Compliance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed: Option<DetailedKpis>,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_of_nothing_is_zero() {
        assert_eq!(Distribution::from_values(&[]), Distribution::default());
    }

    #[test]
    fn nearest_rank_percentiles() {
        let v: Vec<f64> = (1..=20).map(f64::from).collect();
        let d = Distribution::from_values(&v);
        assert_eq!(d.count, 20);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 20.0);
        assert_eq!(d.p50, 10.0);
        assert_eq!(d.p95, 19.0);
        assert!((d.mean - 10.5).abs() < 1e-12);
    }

    #[test]
    fn single_value() {
        let d = Distribution::from_values(&[0.7]);
        assert_eq!((d.p50, d.p95, d.min, d.max), (0.7, 0.7, 0.7, 0.7));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn percentiles_are_ordered(values in prop::collection::vec(0.0f64..10.0, 1..60)) {
                let d = Distribution::from_values(&values);
                prop_assert_eq!(d.count, values.len());
                prop_assert!(d.min <= d.p50 && d.p50 <= d.p95 && d.p95 <= d.max);
                prop_assert!(d.min <= d.mean + 1e-12 && d.mean <= d.max + 1e-12);
                prop_assert!(values.contains(&d.p50) && values.contains(&d.p95));
            }
        }
    }
}
