//! Topology checks that explain a failed solve.

use std::collections::BTreeMap;

use dh_core::{coefficient_of_variation, JunctionId};
use dh_network::{AssembledNetwork, Circuit, JunctionKind, PipeRole};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use crate::config::RepairConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum TopologyIssue {
    /// Consumer junction not attached to exactly one pipe and one consumer.
    ConsumerDegree { junction: JunctionId, degree: usize },
    /// Tee junction without exactly one service pipe.
    TeeServiceCount { junction: JunctionId, services: usize },
    /// Trunk or tee junction above the degree bound.
    ExcessDegree { junction: JunctionId, degree: usize },
    /// Supply junction groups unreachable from the plant.
    Disconnected { components: Vec<Vec<JunctionId>> },
    /// Service lengths so alike they look generated.
    UniformServiceLengths { cv: f64, services: usize },
}

impl TopologyIssue {
    /// Whether the repair loop has a fix for this issue.
    pub fn is_fixable(&self) -> bool {
        matches!(
            self,
            TopologyIssue::ExcessDegree { .. }
                | TopologyIssue::Disconnected { .. }
                | TopologyIssue::UniformServiceLengths { .. }
        )
    }
}

fn has_bypass(net: &AssembledNetwork, j: JunctionId) -> bool {
    net.incident_pipes(j).any(|p| p.role == PipeRole::Bypass)
}

/// Supply-circuit junction groups not connected to the plant junction.
///
/// Bypass pipes do not count as connections.
pub fn detached_components(net: &AssembledNetwork) -> Vec<Vec<JunctionId>> {
    let n = net.junctions().len();
    let mut uf = UnionFind::<usize>::new(n);
    for p in net
        .pipes()
        .iter()
        .filter(|p| p.circuit == Circuit::Supply && p.role != PipeRole::Bypass)
    {
        uf.union(p.from.slot(), p.to.slot());
    }

    let root = uf.find(net.source().junction.slot());
    let mut groups: BTreeMap<usize, Vec<JunctionId>> = BTreeMap::new();
    for j in net
        .junctions()
        .iter()
        .filter(|j| j.circuit == Circuit::Supply)
    {
        let r = uf.find(j.id.slot());
        if r != root {
            groups.entry(r).or_default().push(j.id);
        }
    }
    groups.into_values().collect()
}

/// Run every check and report what is wrong, in a stable order.
pub fn diagnose(net: &AssembledNetwork, cfg: &RepairConfig) -> Vec<TopologyIssue> {
    let mut issues = Vec::new();

    for j in net.junctions() {
        match j.kind {
            JunctionKind::Consumer => {
                let degree = net.degree(j.id, false);
                if degree != 2 {
                    issues.push(TopologyIssue::ConsumerDegree {
                        junction: j.id,
                        degree,
                    });
                }
            }
            JunctionKind::Tee => {
                let services = net
                    .incident_pipes(j.id)
                    .filter(|p| p.role == PipeRole::Service)
                    .count();
                if services != 1 {
                    issues.push(TopologyIssue::TeeServiceCount {
                        junction: j.id,
                        services,
                    });
                }
            }
            _ => {}
        }
    }

    for j in net.junctions().iter().filter(|j| {
        j.circuit == Circuit::Supply && matches!(j.kind, JunctionKind::Trunk | JunctionKind::Tee)
    }) {
        if has_bypass(net, j.id) {
            continue;
        }
        let degree = net.degree(j.id, false);
        if degree > cfg.max_trunk_degree {
            issues.push(TopologyIssue::ExcessDegree {
                junction: j.id,
                degree,
            });
        }
    }

    let components = detached_components(net);
    if !components.is_empty() {
        issues.push(TopologyIssue::Disconnected { components });
    }

    let lengths: Vec<f64> = net
        .pipes_with_role(PipeRole::Service)
        .filter(|p| p.circuit == Circuit::Supply)
        .map(|p| p.length_m)
        .collect();
    if lengths.len() >= cfg.min_services_for_uniformity {
        let Some(cv) = coefficient_of_variation(&lengths) else {
            return issues;
        };
        if cv < cfg.uniformity_cv_threshold {
            issues.push(TopologyIssue::UniformServiceLengths {
                cv,
                services: lengths.len(),
            });
        }
    }

    issues
}
