//! Per-cluster planning pipeline.
//!
//! Synthesis, spur assignment, splitting, pruning, assembly, sizing and
//! heat loss run in [`plan_cluster`]. Solving with repair and KPI
//! extraction run in [`simulate_cluster`] against a caller-supplied solver.

use dh_core::StreetLine;
use dh_graph::{
    assign_spurs, prune_trunk, split_trunk_at_spurs, synthesize_trunk, SkippedBuilding,
    TopologyError, Trunk,
};
use dh_kpi::{extract_kpis, KpiContext, KpiReport};
use dh_network::{assemble_network, AssembledNetwork};
use dh_project::{ClusterDef, PlanningConfig};
use dh_sizing::{size_network, PipeCatalog, SizingReport};
use dh_solver::{run_with_repair, SimulationOutcome, Solver};
use dh_thermal::{apply_heat_loss, HeatLossModel, ThermalSummary};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Everything one cluster plan reads. Shared read-only across a batch.
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    pub streets: &'a [StreetLine],
    pub cluster: &'a ClusterDef,
    pub catalog: &'a PipeCatalog,
    pub config: &'a PlanningConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStats {
    pub street_nodes: usize,
    pub street_edges: usize,
    pub buffer_factor: f64,
    pub bridges_added: usize,
    pub trunk_edges: usize,
    pub internal_tees: usize,
    pub pruned_edges: usize,
    pub buildings_connected: usize,
    pub buildings_skipped: usize,
}

/// A sized, thermally parameterized network ready for the solver.
#[derive(Debug, Clone)]
pub struct ClusterPlan {
    pub cluster_id: String,
    pub design_hour: Option<String>,
    pub trunk: Trunk,
    pub network: AssembledNetwork,
    pub sizing: SizingReport,
    pub thermal: ThermalSummary,
    pub skipped: Vec<SkippedBuilding>,
    pub notes: Vec<String>,
    pub stats: PlanStats,
}

impl ClusterPlan {
    /// Non-fatal planning findings, in pipeline order.
    pub fn planning_warnings(&self) -> Vec<String> {
        self.skipped
            .iter()
            .map(|s| format!("building {} not connected: {}", s.building_id, s.reason))
            .chain(self.sizing.warnings.iter().cloned())
            .collect()
    }

    pub fn kpi_context(&self) -> KpiContext {
        KpiContext {
            cluster_id: self.cluster_id.clone(),
            design_hour: self.design_hour.clone(),
            planning_warnings: self.planning_warnings(),
            notes: self.notes.clone(),
        }
    }
}

/// Result of solving a planned cluster.
#[derive(Debug, Clone)]
pub struct ClusterSimulation {
    pub cluster_id: String,
    pub outcome: SimulationOutcome,
    /// Present only when the solve converged
    pub report: Option<KpiReport>,
}

impl ClusterSimulation {
    /// The KPI report, or [`AppError::NonConvergence`] if there is none.
    pub fn into_report(self) -> AppResult<KpiReport> {
        match self.report {
            Some(report) => Ok(report),
            None => Err(AppError::NonConvergence {
                reason: self
                    .outcome
                    .final_error
                    .map_or_else(|| "no result".to_string(), |e| e.to_string()),
                cluster: self.cluster_id,
                solver_calls: self.outcome.solver_calls,
            }),
        }
    }
}

/// Run the pre-solve pipeline for one cluster.
pub fn plan_cluster(input: &PlanInput) -> AppResult<ClusterPlan> {
    let cfg = input.config;
    let cluster = input.cluster;
    info!(
        cluster = %cluster.id,
        buildings = cluster.buildings.len(),
        streets = input.streets.len(),
        "planning cluster"
    );

    let synthesis = synthesize_trunk(
        input.streets,
        cluster.plant,
        &cluster.buildings,
        &cfg.trunk,
    )?;

    let mut spurs = assign_spurs(&synthesis.trunk, &cluster.buildings, &cfg.spur);
    if spurs.assignments.is_empty() {
        return Err(TopologyError::UnreachableTargets {
            unreachable: spurs.skipped.len(),
            total: cluster.buildings.len(),
        }
        .into());
    }
    let split = split_trunk_at_spurs(&synthesis.trunk, &mut spurs.assignments);
    let trunk = if cfg.prune {
        prune_trunk(&split.trunk, &spurs.tee_nodes())?
    } else {
        split.trunk.clone()
    };
    let pruned_edges = split.trunk.edges.len() - trunk.edges.len();
    // tees inside a street segment: inserted at synthesis or by the split
    let internal_tees =
        synthesis.tees_on_split_points(&spurs.assignments) + split.internal_tees;
    debug!(
        internal_tees,
        pruned_edges,
        "trunk split and pruned"
    );

    let mut network = assemble_network(
        &trunk,
        &spurs.assignments,
        &cluster.buildings,
        cluster.plant,
        &cfg.network,
        &cfg.water,
    )?;
    let sizing = size_network(&mut network, input.catalog, &cfg.sizing, &cfg.water)?;
    let mut model = HeatLossModel::new(cfg.heat_loss.clone(), cfg.water)?;
    let thermal = apply_heat_loss(&mut network, &mut model)?;

    let mut notes = spurs.notes();
    if synthesis.bridges_added > 0 {
        notes.push(format!(
            "{} synthetic bridge(s) joined disconnected streets",
            synthesis.bridges_added
        ));
    }
    if synthesis.buffer_factor > 1.0 {
        notes.push(format!(
            "street buffer expanded {}x to reach all buildings",
            synthesis.buffer_factor
        ));
    }

    let stats = PlanStats {
        street_nodes: synthesis.street_nodes,
        street_edges: synthesis.street_edges,
        buffer_factor: synthesis.buffer_factor,
        bridges_added: synthesis.bridges_added,
        trunk_edges: trunk.edges.len(),
        internal_tees,
        pruned_edges,
        buildings_connected: spurs.assignments.len(),
        buildings_skipped: spurs.skipped.len(),
    };
    info!(
        cluster = %cluster.id,
        connected = stats.buildings_connected,
        skipped = stats.buildings_skipped,
        pipes = network.pipes().len(),
        total_cost = ?sizing.total_cost,
        heat_loss_kw = thermal.total_loss_w / 1000.0,
        "cluster planned"
    );

    Ok(ClusterPlan {
        cluster_id: cluster.id.clone(),
        design_hour: cluster.design_hour.clone(),
        trunk,
        network,
        sizing,
        thermal,
        skipped: spurs.skipped,
        notes,
        stats,
    })
}

/// Solve a planned cluster with repair, then extract KPIs if it converged.
///
/// Non-convergence is not an error here: the outcome and its repair log
/// are returned either way. Use [`ClusterSimulation::into_report`] to
/// require a converged result.
pub fn simulate_cluster<S: Solver + ?Sized>(
    plan: &mut ClusterPlan,
    solver: &mut S,
    cfg: &PlanningConfig,
) -> AppResult<ClusterSimulation> {
    let mut rng = StdRng::seed_from_u64(cfg.repair.rng_seed);
    let outcome = run_with_repair(&mut plan.network, solver, &cfg.repair, &mut rng);
    if !outcome.converged {
        warn!(
            cluster = %plan.cluster_id,
            solver_calls = outcome.solver_calls,
            repairs = outcome.repair_log.len(),
            "simulation did not converge"
        );
        return Ok(ClusterSimulation {
            cluster_id: plan.cluster_id.clone(),
            outcome,
            report: None,
        });
    }

    let mut ctx = plan.kpi_context();
    if !outcome.pressure_floor_met {
        if let Some(p) = outcome.min_pressure_bar {
            ctx.planning_warnings.push(format!(
                "minimum pressure {p:.3} bar below the {:.3} bar floor after {} escalation(s)",
                cfg.repair.pressure_floor_bar, outcome.sanity_attempts
            ));
        }
    }
    ctx.notes.extend(
        outcome
            .repair_log
            .iter()
            .map(|e| format!("repair {}: {}", e.iteration, e.detail)),
    );
    let report = evaluate_network(&plan.network, &ctx, cfg)?;

    Ok(ClusterSimulation {
        cluster_id: plan.cluster_id.clone(),
        outcome,
        report: Some(report),
    })
}

/// KPI report for a network solved elsewhere.
pub fn evaluate_network(
    net: &AssembledNetwork,
    ctx: &KpiContext,
    cfg: &PlanningConfig,
) -> AppResult<KpiReport> {
    Ok(extract_kpis(net, ctx, &cfg.kpi, &cfg.water)?)
}
