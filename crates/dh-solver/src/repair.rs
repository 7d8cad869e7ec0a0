//! Convergence and pressure-sanity repair around an external solver.

use dh_core::JunctionId;
use dh_network::{AssembledNetwork, Circuit, PipeRole};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::boundary::Solver;
use crate::config::RepairConfig;
use crate::diagnose::{diagnose, TopologyIssue};
use crate::error::SolverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    TopologyRepair,
    PressureSanity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAction {
    AddBypass,
    AddBridge,
    PerturbLengths,
    /// Issue found without an automatic fix
    Report,
    EscalateBoundary,
    RestoreBest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairLogEntry {
    pub iteration: usize,
    pub stage: RepairStage,
    pub action: RepairAction,
    pub detail: String,
}

/// How a simulation attempt ended. Always produced, converged or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub converged: bool,
    pub repair_log: Vec<RepairLogEntry>,
    pub sanity_attempts: usize,
    /// Minimum junction pressure of the kept result (bar)
    pub min_pressure_bar: Option<f64>,
    /// Minimum pressure after each converged solve, in call order (bar)
    pub pressure_history_bar: Vec<f64>,
    pub pressure_floor_met: bool,
    pub solver_calls: usize,
    pub final_error: Option<SolverError>,
}

struct Run<'a, S: ?Sized> {
    solver: &'a mut S,
    cfg: &'a RepairConfig,
    log: Vec<RepairLogEntry>,
    calls: usize,
    history: Vec<f64>,
}

impl<S: Solver + ?Sized> Run<'_, S> {
    fn record(
        &mut self,
        iteration: usize,
        stage: RepairStage,
        action: RepairAction,
        detail: String,
    ) {
        match action {
            RepairAction::Report => warn!(iteration, ?stage, %detail, "unrepairable issue"),
            _ => info!(iteration, ?stage, ?action, %detail, "repair action"),
        }
        self.log.push(RepairLogEntry {
            iteration,
            stage,
            action,
            detail,
        });
    }

    /// Solve and write results into the network.
    fn solve(&mut self, net: &mut AssembledNetwork) -> Result<(), SolverError> {
        self.calls += 1;
        net.clear_results();
        let out = self.solver.solve(net)?;
        net.apply_results(out)?;
        if let Some(p) = net.min_pressure_bar() {
            self.history.push(p);
        }
        Ok(())
    }

    /// Apply fixes for the issues found. Returns how many changed the network.
    fn fix<R: Rng + ?Sized>(
        &mut self,
        net: &mut AssembledNetwork,
        issues: &[TopologyIssue],
        iteration: usize,
        rng: &mut R,
    ) -> usize {
        let stage = RepairStage::TopologyRepair;
        let mut applied = 0;
        for issue in issues {
            match issue {
                TopologyIssue::ExcessDegree { junction, degree } => {
                    let Some(partner) = net.partner_junction(*junction) else {
                        self.record(
                            iteration,
                            stage,
                            RepairAction::Report,
                            format!("junction {junction} (degree {degree}) has no return partner"),
                        );
                        continue;
                    };
                    match net.add_bypass(
                        *junction,
                        partner,
                        self.cfg.bypass_length_m,
                        self.cfg.bypass_diameter_m,
                        self.cfg.roughness().value,
                    ) {
                        Ok(id) => {
                            applied += 1;
                            self.record(
                                iteration,
                                stage,
                                RepairAction::AddBypass,
                                format!("bypass {id} at junction {junction} (degree {degree})"),
                            );
                        }
                        Err(e) => self.record(
                            iteration,
                            stage,
                            RepairAction::Report,
                            format!("bypass at junction {junction} failed: {e}"),
                        ),
                    }
                }
                TopologyIssue::Disconnected { components } => {
                    for component in components {
                        let Some((from, to, dist)) = nearest_link(net, component) else {
                            continue;
                        };
                        match net.add_bridge(
                            from,
                            to,
                            dist.max(self.cfg.bypass_length_m),
                            self.cfg.bridge_diameter_m,
                            self.cfg.roughness().value,
                        ) {
                            Ok(_) => {
                                applied += 1;
                                self.record(
                                    iteration,
                                    stage,
                                    RepairAction::AddBridge,
                                    format!("bridge {from} -> {to} ({dist:.1} m)"),
                                );
                            }
                            Err(e) => self.record(
                                iteration,
                                stage,
                                RepairAction::Report,
                                format!("bridge {from} -> {to} failed: {e}"),
                            ),
                        }
                    }
                }
                TopologyIssue::UniformServiceLengths { cv, services } => {
                    let changed = net.perturb_lengths(
                        rng,
                        PipeRole::Service,
                        self.cfg.perturbation_fraction,
                    );
                    if changed > 0 {
                        applied += 1;
                    }
                    self.record(
                        iteration,
                        stage,
                        RepairAction::PerturbLengths,
                        format!(
                            "{services} service lengths with cv {cv:.4}; {changed} pipes perturbed"
                        ),
                    );
                }
                other => {
                    self.record(iteration, stage, RepairAction::Report, format!("{other:?}"))
                }
            }
        }
        applied
    }

    /// Escalate plant boundaries while the minimum pressure is below the
    /// floor, keeping the best converged network.
    fn pressure_sanity(&mut self, net: &mut AssembledNetwork) -> usize {
        let floor = self.cfg.pressure_floor_bar;
        let mut best_min = net.min_pressure_bar().unwrap_or(f64::NEG_INFINITY);
        let mut best = net.clone();
        let mut current_min = best_min;
        let mut attempts = 0;

        while current_min < floor && attempts < self.cfg.max_sanity_attempts {
            attempts += 1;
            if let Err(e) = net.apply_boundary_escalation(self.cfg.escalation_factor) {
                self.record(
                    attempts,
                    RepairStage::PressureSanity,
                    RepairAction::Report,
                    format!("escalation rejected: {e}"),
                );
                break;
            }
            self.record(
                attempts,
                RepairStage::PressureSanity,
                RepairAction::EscalateBoundary,
                format!(
                    "min pressure {current_min:.3} bar below floor {floor:.3} bar; \
                     plant pressure now {:.3} bar, pump lift {:.3} bar",
                    net.source().pressure_bar,
                    net.pump().lift_bar
                ),
            );
            match self.solve(net) {
                Ok(()) => {
                    current_min = net.min_pressure_bar().unwrap_or(f64::NEG_INFINITY);
                    if current_min > best_min {
                        best_min = current_min;
                        best = net.clone();
                    }
                }
                Err(e) => {
                    warn!(error = %e, "re-solve after escalation failed");
                    break;
                }
            }
        }

        if *net != best {
            self.record(
                attempts,
                RepairStage::PressureSanity,
                RepairAction::RestoreBest,
                format!("restored result with min pressure {best_min:.3} bar"),
            );
            *net = best;
        }
        attempts
    }

    fn finish(
        self,
        net: &AssembledNetwork,
        sanity_attempts: usize,
        error: Option<SolverError>,
    ) -> SimulationOutcome {
        let converged = net.converged() && error.is_none();
        let min_pressure_bar = if converged { net.min_pressure_bar() } else { None };
        let outcome = SimulationOutcome {
            converged,
            pressure_floor_met: min_pressure_bar.is_some_and(|p| p >= self.cfg.pressure_floor_bar),
            min_pressure_bar,
            pressure_history_bar: self.history,
            sanity_attempts,
            solver_calls: self.calls,
            repair_log: self.log,
            final_error: error,
        };
        info!(
            converged = outcome.converged,
            solver_calls = outcome.solver_calls,
            repairs = outcome.repair_log.len(),
            min_pressure_bar = ?outcome.min_pressure_bar,
            "simulation finished"
        );
        outcome
    }
}

/// Shortest supply-circuit link from a detached component to the plant side.
fn nearest_link(
    net: &AssembledNetwork,
    component: &[JunctionId],
) -> Option<(JunctionId, JunctionId, f64)> {
    let attached: Vec<_> = net
        .junctions()
        .iter()
        .filter(|j| j.circuit == Circuit::Supply && !component.contains(&j.id))
        .collect();
    let mut best: Option<(JunctionId, JunctionId, f64)> = None;
    for &c in component {
        let Some(cj) = net.junction(c) else { continue };
        for a in &attached {
            let d = a.position.distance(&cj.position);
            if best.map_or(true, |(_, _, bd)| d < bd) {
                best = Some((a.id, c, d));
            }
        }
    }
    best
}

/// Solve with topology repair on failure and boundary escalation on
/// sub-floor pressures.
///
/// Terminates after at most `max_repair_iterations` repair rounds and
/// `max_sanity_attempts` escalations. A converged result is never thrown
/// away: if escalation makes things worse the best network is restored.
pub fn run_with_repair<S, R>(
    net: &mut AssembledNetwork,
    solver: &mut S,
    cfg: &RepairConfig,
    rng: &mut R,
) -> SimulationOutcome
where
    S: Solver + ?Sized,
    R: Rng + ?Sized,
{
    info!(solver = solver.name(), pipes = net.pipes().len(), "solving network");
    let mut run = Run {
        solver,
        cfg,
        log: Vec::new(),
        calls: 0,
        history: Vec::new(),
    };

    let mut last = match run.solve(net) {
        Ok(()) => {
            let attempts = run.pressure_sanity(net);
            return run.finish(net, attempts, None);
        }
        Err(e) => e,
    };

    for iteration in 1..=cfg.max_repair_iterations {
        if !last.is_repairable() {
            warn!(error = %last, "solver failure not repairable");
            break;
        }
        warn!(iteration, error = %last, "solve failed; diagnosing topology");

        let issues = diagnose(net, cfg);
        if issues.is_empty() {
            warn!(iteration, "no topology issue found");
            break;
        }
        if run.fix(net, &issues, iteration, rng) == 0 {
            break;
        }

        match run.solve(net) {
            Ok(()) => {
                let attempts = run.pressure_sanity(net);
                return run.finish(net, attempts, None);
            }
            Err(e) => last = e,
        }
    }

    net.clear_results();
    run.finish(net, 0, Some(last))
}
