//! Limit-driven pipe sizing over the supply tree.

use std::collections::{HashMap, VecDeque};

use dh_core::units::{kw, m, Length, MassRate};
use dh_core::{JunctionId, PipeId, WaterProps};
use dh_network::hydraulics::{mass_flow_for_load, mean_velocity, pressure_gradient_pa_per_m};
use dh_network::{AssembledNetwork, Circuit, Pipe, PipeRole};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{CatalogEntry, PipeCatalog};
use crate::config::{RoleLimits, SizingConfig};
use crate::error::SizingResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingStatus {
    Ok,
    ExceedsAbsoluteVelocity,
    ExceedsPressureGradient,
    /// Largest candidate chosen; role velocity limit still exceeded.
    Fallback,
}

/// Sizing decision for one supply/return pipe pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingRecord {
    pub role: PipeRole,
    /// Segment name of the pair
    pub identifier: String,
    /// Supply-side pipe of the pair
    pub pipe: PipeId,
    #[serde(default)]
    pub building_id: Option<String>,
    pub length_m: f64,
    pub design_load_kw: f64,
    pub design_flow_kg_s: f64,
    pub dn: u32,
    pub inner_diameter_m: f64,
    pub velocity_m_s: f64,
    pub pressure_gradient_pa_per_m: f64,
    pub status: SizingStatus,
    /// Size synthesized beyond the catalog
    pub synthetic: bool,
    #[serde(default)]
    pub cost_per_m: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizingReport {
    /// Plant link, trunk (BFS order), then service (building order)
    pub records: Vec<SizingRecord>,
    pub warnings: Vec<String>,
    /// Σ cost per metre × route length; `None` when any size lacks a cost
    pub total_cost: Option<f64>,
}

impl SizingReport {
    pub fn records_with_role(&self, role: PipeRole) -> impl Iterator<Item = &SizingRecord> + '_ {
        self.records.iter().filter(move |r| r.role == role)
    }

    pub fn record(&self, identifier: &str) -> Option<&SizingRecord> {
        self.records.iter().find(|r| r.identifier == identifier)
    }

    pub fn violations(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status != SizingStatus::Ok)
            .count()
    }
}

struct Choice {
    entry: CatalogEntry,
    synthetic: bool,
    velocity: f64,
    gradient: f64,
    status: SizingStatus,
}

/// Smallest candidate from the role's minimum DN upward that satisfies both
/// limits, continuing into synthetic sizes when the catalog runs out.
fn choose_size(
    mdot: MassRate,
    roughness: Length,
    limits: &RoleLimits,
    catalog: &PipeCatalog,
    cfg: &SizingConfig,
    water: &WaterProps,
) -> Choice {
    let start = catalog
        .first_at_least(limits.min_dn)
        .unwrap_or(catalog.len() - 1);
    let real = catalog.entries()[start..].iter().map(|e| (*e, false));
    let synthetic = catalog
        .synthetic_sizes(cfg.max_synthetic_sizes)
        .into_iter()
        .map(|e| (e, true));

    let evaluate = |entry: CatalogEntry, synthetic: bool| {
        let d = m(entry.inner_diameter_m);
        Choice {
            entry,
            synthetic,
            velocity: mean_velocity(mdot, water.density_kg_m3, d).value,
            gradient: pressure_gradient_pa_per_m(mdot, d, roughness, water),
            status: SizingStatus::Ok,
        }
    };

    let mut last: Option<Choice> = None;
    for (entry, is_synthetic) in real.chain(synthetic) {
        let c = evaluate(entry, is_synthetic);
        if c.velocity <= limits.max_velocity_m_s
            && c.gradient <= limits.max_pressure_gradient_pa_per_m
        {
            return c;
        }
        last = Some(c);
    }

    let mut c = last.unwrap_or_else(|| evaluate(*catalog.largest(), false));
    c.status = if c.velocity > cfg.absolute_max_velocity_m_s {
        SizingStatus::ExceedsAbsoluteVelocity
    } else if c.gradient > limits.max_pressure_gradient_pa_per_m {
        SizingStatus::ExceedsPressureGradient
    } else {
        SizingStatus::Fallback
    };
    c
}

/// Downstream design load (kW) per junction, accumulated post-order over the
/// supply circuit from the plant.
fn downstream_loads(net: &AssembledNetwork, margin: f64) -> (Vec<f64>, Vec<PipeId>) {
    let n = net.junctions().len();
    let mut own = vec![0.0; n];
    for c in net.consumers() {
        own[c.from.slot()] += (c.heat_demand_w / 1000.0).max(0.0) * margin;
    }

    let mut children: HashMap<JunctionId, Vec<&Pipe>> = HashMap::new();
    for p in net
        .pipes()
        .iter()
        .filter(|p| p.circuit == Circuit::Supply && p.role.is_sized())
    {
        children.entry(p.from).or_default().push(p);
    }

    // BFS from the plant gives the trunk order; reversed it is a valid post-order
    let root = net.source().junction;
    let mut visited = vec![false; n];
    let mut order = vec![root];
    let mut pipe_order = Vec::new();
    let mut parent_of: Vec<Option<JunctionId>> = vec![None; n];
    let mut queue = VecDeque::from([root]);
    visited[root.slot()] = true;
    while let Some(u) = queue.pop_front() {
        for p in children.get(&u).into_iter().flatten() {
            if visited[p.to.slot()] {
                continue;
            }
            visited[p.to.slot()] = true;
            parent_of[p.to.slot()] = Some(u);
            pipe_order.push(p.id);
            order.push(p.to);
            queue.push_back(p.to);
        }
    }

    let mut load = own;
    for &j in order.iter().rev() {
        if let Some(parent) = parent_of[j.slot()] {
            load[parent.slot()] += load[j.slot()];
        }
    }
    (load, pipe_order)
}

/// Size every plant, trunk and service pipe pair of the network.
///
/// Mutates diameters through `AssembledNetwork::apply_sizing`; the return
/// pipe of each pair receives the supply pipe's size.
pub fn size_network(
    net: &mut AssembledNetwork,
    catalog: &PipeCatalog,
    cfg: &SizingConfig,
    water: &WaterProps,
) -> SizingResult<SizingReport> {
    let (loads, bfs_pipes) = downstream_loads(net, cfg.design_margin);
    let dt = net.design().delta_t_k();

    let mut ordered: Vec<PipeId> = Vec::new();
    for role in [PipeRole::Plant, PipeRole::Trunk] {
        ordered.extend(
            bfs_pipes
                .iter()
                .copied()
                .filter(|&id| net.pipe(id).map(|p| p.role) == Some(role)),
        );
    }
    for c in net.consumers() {
        let svc = net.pipes().iter().find(|p| {
            p.role == PipeRole::Service
                && p.circuit == Circuit::Supply
                && p.building_id.as_deref() == Some(c.building_id.as_str())
        });
        if let Some(p) = svc {
            ordered.push(p.id);
        }
    }

    let mut report = SizingReport::default();
    let mut sizes = Vec::with_capacity(ordered.len());
    for id in ordered {
        let Some(pipe) = net.pipe(id) else { continue };
        let load_kw = loads[pipe.to.slot()];
        let flow = mass_flow_for_load(kw(load_kw), water.cp_j_per_kg_k, dt);
        let mdot = flow.value;
        let limits = cfg.limits_for(pipe.role);
        let c = choose_size(flow, m(pipe.roughness_m), limits, catalog, cfg, water);

        debug!(
            pipe = %pipe.segment,
            role = pipe.role.as_str(),
            load_kw,
            mdot,
            dn = c.entry.dn,
            velocity = c.velocity,
            gradient = c.gradient,
            "size selected"
        );
        if c.synthetic {
            report.warnings.push(format!(
                "{}: requires theoretical DN {} beyond the catalog",
                pipe.segment, c.entry.dn
            ));
        }
        match c.status {
            SizingStatus::Ok => {}
            status => {
                warn!(pipe = %pipe.segment, ?status, "no size satisfies limits");
                report.warnings.push(format!(
                    "{}: {:?} at DN {} (v = {:.2} m/s, dp = {:.0} Pa/m)",
                    pipe.segment, status, c.entry.dn, c.velocity, c.gradient
                ));
            }
        }

        report.records.push(SizingRecord {
            role: pipe.role,
            identifier: pipe.segment.clone(),
            pipe: id,
            building_id: pipe.building_id.clone(),
            length_m: pipe.length_m,
            design_load_kw: load_kw,
            design_flow_kg_s: mdot,
            dn: c.entry.dn,
            inner_diameter_m: c.entry.inner_diameter_m,
            velocity_m_s: c.velocity,
            pressure_gradient_pa_per_m: c.gradient,
            status: c.status,
            synthetic: c.synthetic,
            cost_per_m: c.entry.cost_per_m,
        });
        sizes.push((id, c.entry.dn, c.entry.inner_diameter_m, c.velocity));
    }

    for (id, dn, d, v) in sizes {
        net.apply_sizing(id, Some(dn), d, v)?;
    }

    report.total_cost = report
        .records
        .iter()
        .map(|r| r.cost_per_m.map(|c| c * r.length_m))
        .sum::<Option<f64>>();
    info!(
        pipes = report.records.len(),
        violations = report.violations(),
        total_cost = ?report.total_cost,
        "network sized"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SizingMode;
    use dh_core::units::kgps;

    fn limits() -> RoleLimits {
        RoleLimits {
            min_dn: 25,
            max_velocity_m_s: 1.0,
            max_pressure_gradient_pa_per_m: 300.0,
        }
    }

    #[test]
    fn zero_flow_picks_minimum_size() {
        let c = choose_size(
            kgps(0.0),
            m(1e-4),
            &limits(),
            &PipeCatalog::default(),
            &SizingConfig::default(),
            &WaterProps::default(),
        );
        assert_eq!(c.entry.dn, 25);
        assert_eq!(c.velocity, 0.0);
        assert_eq!(c.gradient, 0.0);
        assert_eq!(c.status, SizingStatus::Ok);
    }

    #[test]
    fn selected_size_meets_limits() {
        let w = WaterProps::default();
        let c = choose_size(
            kgps(3.0),
            m(1e-4),
            &limits(),
            &PipeCatalog::default(),
            &SizingConfig::default(),
            &w,
        );
        assert_eq!(c.status, SizingStatus::Ok);
        assert!(c.velocity <= 1.0);
        assert!(c.gradient <= 300.0);
        // one size smaller must violate a limit
        let cat = PipeCatalog::default();
        let idx = cat.entries().iter().position(|e| e.dn == c.entry.dn).unwrap();
        let smaller = cat.entries()[idx - 1];
        let d = m(smaller.inner_diameter_m);
        let v = mean_velocity(kgps(3.0), w.density_kg_m3, d).value;
        let g = pressure_gradient_pa_per_m(kgps(3.0), d, m(1e-4), &w);
        assert!(v > 1.0 || g > 300.0);
    }

    #[test]
    fn huge_flow_uses_synthetic_sizes() {
        let cfg = SizingConfig {
            mode: SizingMode::Standard,
            ..SizingConfig::default()
        };
        let c = choose_size(
            kgps(400.0),
            m(1e-4),
            &limits(),
            &PipeCatalog::default(),
            &cfg,
            &WaterProps::default(),
        );
        assert!(c.synthetic);
        assert!(c.entry.dn > 400);
    }

    #[test]
    fn exhausted_sizes_classified() {
        let cfg = SizingConfig {
            max_synthetic_sizes: 0,
            ..SizingConfig::default()
        };
        let c = choose_size(
            kgps(2000.0),
            m(1e-4),
            &limits(),
            &PipeCatalog::default(),
            &cfg,
            &WaterProps::default(),
        );
        assert_eq!(c.entry.dn, 400);
        assert_eq!(c.status, SizingStatus::ExceedsAbsoluteVelocity);
    }
}
