//! KPI extraction from converged solver results.

use dh_core::units::{bar, kelvin_to_celsius, kgps, w, w_to_kw, MassRate, Power, Pressure};
use dh_core::{ratio_or_zero, WaterProps};
use dh_network::hydraulics::EPSILON_MDOT;
use dh_network::{AssembledNetwork, Circuit, Pipe, PipeResult, PipeRole};
use tracing::{debug, info};

use crate::config::KpiConfig;
use crate::error::{KpiError, KpiResult};
use crate::report::*;

/// Identification and upstream messages carried into the report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiContext {
    pub cluster_id: String,
    pub design_hour: Option<String>,
    /// Non-fatal findings of earlier stages, forwarded as compliance warnings
    pub planning_warnings: Vec<String>,
    pub notes: Vec<String>,
}

impl KpiContext {
    pub fn new(cluster_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LossSource {
    Solver,
    Enthalpy,
    UValue,
}

/// Inlet and outlet temperature following the solved flow direction.
fn inlet_outlet_k(r: &PipeResult) -> (f64, f64) {
    if r.mdot_kg_s >= 0.0 {
        (r.t_from_k, r.t_to_k)
    } else {
        (r.t_to_k, r.t_from_k)
    }
}

/// Heat lost by one pipe (W): solver figure, else enthalpy balance, else U-value.
fn pipe_loss_w(p: &Pipe, r: &PipeResult, cp: f64) -> (f64, LossSource) {
    if let Some(q) = r.heat_loss_w.filter(|q| q.is_finite()) {
        return (q.max(0.0), LossSource::Solver);
    }
    if r.mdot_kg_s.abs() > EPSILON_MDOT {
        let (t_in, t_out) = inlet_outlet_k(r);
        return (
            (r.mdot_kg_s.abs() * cp * (t_in - t_out)).max(0.0),
            LossSource::Enthalpy,
        );
    }
    let t_mean = 0.5 * (r.t_from_k + r.t_to_k);
    let q = p.thermal.u_w_per_m2k
        * p.thermal.loss_area_per_m
        * p.length_m
        * (t_mean - p.thermal.text_k);
    (q.max(0.0), LossSource::UValue)
}

fn dp_bar_per_100m(p: &Pipe, r: &PipeResult) -> f64 {
    ratio_or_zero((r.p_from_bar - r.p_to_bar).abs() * 100.0, p.length_m)
}

/// Hydraulic power the pump adds to the flow (volume flow times lift).
pub fn pump_hydraulic_power(mdot: MassRate, deltap: Pressure, density_kg_m3: f64) -> Power {
    w(ratio_or_zero(mdot.value.abs(), density_kg_m3) * deltap.value)
}

/// Build the compliance report for a converged network.
pub fn extract_kpis(
    net: &AssembledNetwork,
    ctx: &KpiContext,
    cfg: &KpiConfig,
    water: &WaterProps,
) -> KpiResult<KpiReport> {
    cfg.validate()?;
    if !net.converged() {
        return Err(KpiError::NotConverged);
    }

    let mut junction_results = Vec::with_capacity(net.junctions().len());
    for j in net.junctions() {
        let r = j.result.ok_or_else(|| KpiError::MissingResults {
            what: "junction",
            name: j.name.clone(),
        })?;
        junction_results.push(r);
    }
    let mut pipes = Vec::with_capacity(net.pipes().len());
    for p in net.pipes() {
        let r = p.result.ok_or_else(|| KpiError::MissingResults {
            what: "pipe",
            name: p.name.clone(),
        })?;
        pipes.push((p, r));
    }
    let hydraulic: Vec<_> = pipes
        .iter()
        .filter(|(p, _)| p.role != PipeRole::Bypass)
        .collect();

    // hydraulics
    let velocities: Vec<f64> = hydraulic.iter().map(|(_, r)| r.v_mean_m_s.abs()).collect();
    let dps: Vec<f64> = hydraulic
        .iter()
        .map(|(p, r)| dp_bar_per_100m(p, r))
        .collect();
    let within = velocities
        .iter()
        .filter(|&&v| v <= cfg.velocity_limit().value)
        .count();
    let share = if velocities.is_empty() {
        1.0
    } else {
        within as f64 / velocities.len() as f64
    };
    let velocity = Distribution::from_values(&velocities);
    let dp = Distribution::from_values(&dps);
    let pressures = junction_results.iter().map(|r| r.p_bar);
    let hydraulics = HydraulicKpis {
        velocity_m_s: velocity,
        velocity_share_within_limit: share,
        dp_bar_per_100m: dp,
        min_pressure_bar: pressures.clone().fold(f64::INFINITY, f64::min),
        max_pressure_bar: pressures.fold(f64::NEG_INFINITY, f64::max),
    };

    // thermal
    let t_of = |j: dh_core::JunctionId| junction_results.get(j.slot()).map(|r| r.t_k);
    let plant_supply_k = t_of(net.source().junction).unwrap_or(net.design().supply_temp_k);
    let plant_return_k = t_of(net.pump().from).unwrap_or(net.design().return_temp_k);
    let consumer_supply_k: Vec<f64> = net
        .consumers()
        .iter()
        .filter_map(|c| c.result.map(|r| r.t_supply_k).or_else(|| t_of(c.from)))
        .collect();
    let min_consumer_k = consumer_supply_k
        .iter()
        .copied()
        .reduce(f64::min)
        .unwrap_or(plant_supply_k);
    let temp_drops: Vec<f64> = hydraulic
        .iter()
        .map(|(_, r)| {
            let (t_in, t_out) = inlet_outlet_k(r);
            t_in - t_out
        })
        .collect();
    let thermal = ThermalKpis {
        plant_supply_temp_c: kelvin_to_celsius(plant_supply_k),
        plant_return_temp_c: kelvin_to_celsius(plant_return_k),
        min_consumer_supply_temp_c: kelvin_to_celsius(min_consumer_k),
        max_supply_temp_drop_k: plant_supply_k - min_consumer_k,
        pipe_temp_drop_k: Distribution::from_values(&temp_drops),
    };

    // losses
    let mut sources = LossSourceCounts::default();
    let (mut supply_w, mut return_w) = (0.0, 0.0);
    let mut per_pipe_loss = Vec::with_capacity(pipes.len());
    for (p, r) in &pipes {
        let (q, source) = pipe_loss_w(p, r, water.cp_j_per_kg_k);
        match source {
            LossSource::Solver => sources.solver_reported += 1,
            LossSource::Enthalpy => sources.enthalpy_balance += 1,
            LossSource::UValue => sources.u_value += 1,
        }
        match p.circuit {
            Circuit::Supply => supply_w += q,
            Circuit::Return => return_w += q,
        }
        per_pipe_loss.push(q);
    }
    let total_loss_w = supply_w + return_w;

    let supply_length = |role: PipeRole| -> f64 {
        net.pipes_with_role(role)
            .filter(|p| p.circuit == Circuit::Supply)
            .map(|p| p.length_m)
            .sum()
    };
    let trunk_length_m = supply_length(PipeRole::Trunk);
    let service_length_m = supply_length(PipeRole::Service);
    let total_route_length_m = net
        .pipes()
        .iter()
        .filter(|p| p.circuit == Circuit::Supply && p.role != PipeRole::Bypass)
        .map(|p| p.length_m)
        .sum::<f64>();
    let demand_w: f64 = net.consumers().iter().map(|c| c.heat_demand_w).sum();

    let losses = LossKpis {
        total_loss_kw: w_to_kw(total_loss_w),
        supply_loss_kw: w_to_kw(supply_w),
        return_loss_kw: w_to_kw(return_w),
        loss_w_per_m: ratio_or_zero(total_loss_w, total_route_length_m),
        loss_share_pct: 100.0 * ratio_or_zero(total_loss_w, total_loss_w + demand_w),
    };

    let aggregate = AggregateKpis {
        buildings_served: net.consumers().len(),
        total_heat_demand_kw: w_to_kw(demand_w),
        design_mass_flow_kg_s: net.consumers().iter().map(|c| c.mdot_kg_s).sum(),
        trunk_length_m,
        service_length_m,
        total_route_length_m,
    };

    // pump
    let (pump_mdot, pump_dp_bar) = match net.pump_result() {
        Some(r) => (r.mdot_kg_s.abs(), r.deltap_bar),
        None => (aggregate.design_mass_flow_kg_s, net.pump().lift_bar),
    };
    let hydraulic_power =
        pump_hydraulic_power(kgps(pump_mdot), bar(pump_dp_bar), water.density_kg_m3);
    let pump = PumpKpis {
        mass_flow_kg_s: pump_mdot,
        deltap_bar: pump_dp_bar,
        hydraulic_power_kw: w_to_kw(hydraulic_power.value),
        electrical_power_kw: w_to_kw(hydraulic_power.value / cfg.pump_efficiency),
        efficiency: cfg.pump_efficiency,
    };

    // compliance
    let velocity_ok = share >= cfg.velocity_share_threshold;
    let dp_ok = dp.max <= cfg.max_dp_bar_per_100m;
    let mut reasons = Vec::new();
    if !velocity_ok {
        reasons.push(ReasonCode::VelocityShareBelowThreshold);
    }
    if !dp_ok {
        reasons.push(ReasonCode::PressureDropAboveCeiling);
    }

    let mut warnings = Vec::new();
    if losses.loss_share_pct > cfg.high_loss_share * 100.0 {
        warnings.push(format!(
            "heat loss share {:.1}% exceeds {:.1}%",
            losses.loss_share_pct,
            cfg.high_loss_share * 100.0
        ));
    }
    let near = cfg.velocity_warning_fraction * cfg.velocity_limit_m_s;
    if velocity.max > cfg.velocity_limit_m_s {
        warnings.push(format!(
            "{} of {} pipes above {:.2} m/s (max {:.2} m/s)",
            velocities.len() - within,
            velocities.len(),
            cfg.velocity_limit_m_s,
            velocity.max
        ));
    } else if velocity.max > near {
        warnings.push(format!(
            "max velocity {:.2} m/s close to the {:.2} m/s limit",
            velocity.max, cfg.velocity_limit_m_s
        ));
    }
    warnings.extend(ctx.planning_warnings.iter().cloned());

    let en13941_compliance = Compliance {
        feasible: velocity_ok && dp_ok,
        velocity_ok,
        dp_ok,
        velocity_limit_m_s: cfg.velocity_limit_m_s,
        velocity_share_within_limit: share,
        velocity_share_threshold: cfg.velocity_share_threshold,
        max_dp_bar_per_100m: dp.max,
        dp_ceiling_bar_per_100m: cfg.max_dp_bar_per_100m,
        reasons,
        warnings,
    };

    let detailed = cfg.detailed.then(|| DetailedKpis {
        pipes: pipes
            .iter()
            .zip(&per_pipe_loss)
            .map(|((p, r), &loss_w)| {
                let (t_in, t_out) = inlet_outlet_k(r);
                PipeKpi {
                    name: p.name.clone(),
                    role: p.role.as_str().to_string(),
                    circuit: p.circuit.as_str().to_string(),
                    length_m: p.length_m,
                    dn: p.dn,
                    velocity_m_s: r.v_mean_m_s.abs(),
                    dp_bar_per_100m: dp_bar_per_100m(p, r),
                    temp_drop_k: t_in - t_out,
                    loss_w,
                }
            })
            .collect(),
        junctions: net
            .junctions()
            .iter()
            .zip(&junction_results)
            .map(|(j, r)| JunctionKpi {
                name: j.name.clone(),
                circuit: j.circuit.as_str().to_string(),
                p_bar: r.p_bar,
                t_c: kelvin_to_celsius(r.t_k),
            })
            .collect(),
        consumers: net
            .consumers()
            .iter()
            .map(|c| {
                let t_supply = c.result.map(|r| r.t_supply_k).or_else(|| t_of(c.from));
                let t_return = c.result.map(|r| r.t_return_k).or_else(|| t_of(c.to));
                ConsumerKpi {
                    building_id: c.building_id.clone(),
                    heat_demand_kw: w_to_kw(c.heat_demand_w),
                    mdot_kg_s: c.result.map_or(c.mdot_kg_s, |r| r.mdot_kg_s),
                    t_supply_c: kelvin_to_celsius(t_supply.unwrap_or(plant_supply_k)),
                    t_return_c: kelvin_to_celsius(t_return.unwrap_or(plant_return_k)),
                }
            })
            .collect(),
    });

    debug!(?sources, "loss sources");
    info!(
        cluster = %ctx.cluster_id,
        feasible = en13941_compliance.feasible,
        max_velocity = velocity.max,
        max_dp = dp.max,
        loss_kw = losses.total_loss_kw,
        "KPIs extracted"
    );

    Ok(KpiReport {
        cluster_id: ctx.cluster_id.clone(),
        design_hour: ctx.design_hour.clone(),
        aggregate,
        hydraulics,
        thermal,
        losses,
        pump,
        en13941_compliance,
        detailed,
        diagnostics: Diagnostics {
            pipes_evaluated: hydraulic.len(),
            junctions_evaluated: junction_results.len(),
            loss_sources: sources,
            notes: ctx.notes.clone(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pump_power_from_flow_and_lift() {
        // 10 kg/s of 1000 kg/m3 water lifted 2 bar takes 2 kW
        let p = pump_hydraulic_power(kgps(10.0), bar(2.0), 1000.0);
        assert!((w_to_kw(p.value) - 2.0).abs() < 1e-9);
        let reverse = pump_hydraulic_power(kgps(-10.0), bar(2.0), 1000.0);
        assert_eq!(reverse.value, p.value);
        assert_eq!(pump_hydraulic_power(kgps(10.0), bar(2.0), 0.0).value, 0.0);
    }
}
