//! Exclusive spur assignment and "tee on main" edge splitting.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use dh_core::geom::project_onto_segment;
use dh_core::{Building, NodeKey, Point};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::trunk::{Trunk, TrunkEdge};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpurConfig {
    /// Buildings farther than this from every trunk edge are skipped (m)
    pub max_spur_length_m: f64,
    /// Shift applied when a projection is already claimed (m)
    pub min_tee_spacing_m: f64,
    /// Shifts tried in each direction along an edge
    pub nudge_steps: usize,
}

impl Default for SpurConfig {
    fn default() -> Self {
        Self {
            max_spur_length_m: 50.0,
            min_tee_spacing_m: 1.0,
            nudge_steps: 3,
        }
    }
}

/// Exclusive attachment of one building to the trunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpurAssignment {
    pub building_id: String,
    /// Index into the unsplit trunk's edges; `None` when attached at the root
    /// of an edgeless trunk.
    pub edge: Option<usize>,
    pub attach_point: Point,
    pub building_point: Point,
    pub distance_m: f64,
    /// Linear position of `attach_point` along `edge`.
    pub position: f64,
    /// Trunk node the service pipe starts from; set by [`split_trunk_at_spurs`].
    pub trunk_attach_node: Option<NodeKey>,
}

/// A building that could not be attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedBuilding {
    pub building_id: String,
    pub nearest_distance_m: Option<f64>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct SpurOutcome {
    pub assignments: Vec<SpurAssignment>,
    pub skipped: Vec<SkippedBuilding>,
}

impl SpurOutcome {
    /// Trunk nodes carrying a service connection.
    pub fn tee_nodes(&self) -> BTreeSet<NodeKey> {
        self.assignments
            .iter()
            .filter_map(|a| a.trunk_attach_node)
            .collect()
    }

    /// Human-readable data-completeness notes for skipped buildings.
    pub fn notes(&self) -> Vec<String> {
        self.skipped
            .iter()
            .map(|s| format!("building {} not connected: {}", s.building_id, s.reason))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    edge: Option<usize>,
    point: Point,
    position: f64,
    distance: f64,
}

/// Assign every building (input order) the closest unclaimed trunk point
/// within the max spur length.
pub fn assign_spurs(trunk: &Trunk, buildings: &[Building], cfg: &SpurConfig) -> SpurOutcome {
    let tol = trunk.snap_tolerance;
    let mut claimed: HashSet<NodeKey> = HashSet::new();
    let mut out = SpurOutcome::default();

    for b in buildings {
        let mut best: Option<Candidate> = None;
        let mut nearest = f64::INFINITY;

        if trunk.edges.is_empty() {
            let d = trunk.root.distance(&b.centroid);
            nearest = d;
            if !claimed.contains(&trunk.root.key(tol)) {
                best = Some(Candidate {
                    edge: None,
                    point: trunk.root,
                    position: 0.0,
                    distance: d,
                });
            }
        }

        for (ei, edge) in trunk.edges.iter().enumerate() {
            let proj = project_onto_segment(&b.centroid, &edge.from, &edge.to);
            nearest = nearest.min(proj.distance);
            if proj.distance > cfg.max_spur_length_m {
                continue;
            }
            let Some(c) = first_unclaimed(ei, edge, proj.t, &b.centroid, &claimed, cfg, tol)
            else {
                continue;
            };
            if best.map_or(true, |bc| c.distance < bc.distance) {
                best = Some(c);
            }
        }

        match best {
            Some(c) if c.distance <= cfg.max_spur_length_m => {
                claimed.insert(c.point.key(tol));
                debug!(
                    building = %b.id,
                    edge = ?c.edge,
                    distance_m = c.distance,
                    "spur assigned"
                );
                out.assignments.push(SpurAssignment {
                    building_id: b.id.clone(),
                    edge: c.edge,
                    attach_point: c.point,
                    building_point: b.centroid,
                    distance_m: c.distance,
                    position: c.position,
                    trunk_attach_node: None,
                });
            }
            _ => {
                let nearest_distance_m = nearest.is_finite().then_some(nearest);
                let reason = match nearest_distance_m {
                    Some(d) if d > cfg.max_spur_length_m => format!(
                        "nearest trunk point {:.1} m away exceeds max spur length {:.1} m",
                        d, cfg.max_spur_length_m
                    ),
                    _ => "no unclaimed trunk point within max spur length".to_string(),
                };
                warn!(building = %b.id, %reason, "building skipped");
                out.skipped.push(SkippedBuilding {
                    building_id: b.id.clone(),
                    nearest_distance_m,
                    reason,
                });
            }
        }
    }
    out
}

/// The projection itself, then shifts of `min_tee_spacing_m` alternating
/// forward and backward along the edge.
fn first_unclaimed(
    ei: usize,
    edge: &TrunkEdge,
    t0: f64,
    centroid: &Point,
    claimed: &HashSet<NodeKey>,
    cfg: &SpurConfig,
    tol: f64,
) -> Option<Candidate> {
    let len = edge.from.distance(&edge.to);
    let step = if len > 0.0 {
        cfg.min_tee_spacing_m / len
    } else {
        0.0
    };
    let mut ts = vec![t0];
    if step > 0.0 {
        for k in 1..=cfg.nudge_steps {
            let shift = step * k as f64;
            ts.push(t0 + shift);
            ts.push(t0 - shift);
        }
    }
    ts.into_iter()
        .filter(|t| (0.0..=1.0).contains(t))
        .map(|t| {
            let point = edge.from.lerp(&edge.to, t);
            Candidate {
                edge: Some(ei),
                point,
                position: t,
                distance: point.distance(centroid),
            }
        })
        .find(|c| !claimed.contains(&c.point.key(tol)))
}

#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub trunk: Trunk,
    /// Attach points strictly inside an edge (new tee nodes).
    pub internal_tees: usize,
}

/// Split trunk edges at attach points so every spur starts at a trunk node.
///
/// Also fills `trunk_attach_node` on each assignment.
pub fn split_trunk_at_spurs(trunk: &Trunk, assignments: &mut [SpurAssignment]) -> SplitOutcome {
    let tol = trunk.snap_tolerance;
    let mut by_edge: BTreeMap<usize, Vec<(f64, Point)>> = BTreeMap::new();
    for a in assignments.iter_mut() {
        a.trunk_attach_node = Some(a.attach_point.key(tol));
        if let Some(ei) = a.edge {
            by_edge.entry(ei).or_default().push((a.position, a.attach_point));
        }
    }

    let mut internal_tees = 0;
    let mut edges: Vec<TrunkEdge> = Vec::with_capacity(trunk.edges.len() + assignments.len());
    for (ei, edge) in trunk.edges.iter().enumerate() {
        let Some(points) = by_edge.get_mut(&ei) else {
            edges.push(edge.clone());
            continue;
        };
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let end_key = edge.to.key(tol);
        let mut chain = vec![edge.from];
        for &(_, p) in points.iter() {
            let k = p.key(tol);
            let last_key = chain.last().map(|q| q.key(tol));
            if Some(k) == last_key || k == end_key {
                continue;
            }
            chain.push(p);
            internal_tees += 1;
        }
        chain.push(edge.to);
        for w in chain.windows(2) {
            edges.push(TrunkEdge::new(
                w[0],
                w[1],
                edge.street.clone(),
                edge.synthetic,
            ));
        }
    }

    let mut seen = HashSet::new();
    edges.retain(|e| seen.insert(e.undirected_key(tol)));

    SplitOutcome {
        trunk: Trunk {
            root: trunk.root,
            snap_tolerance: tol,
            edges,
        },
        internal_tees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn line_trunk() -> Trunk {
        let mut t = Trunk::new(p(0.0, 0.0), 0.01);
        t.edges.push(TrunkEdge::new(p(0.0, 0.0), p(100.0, 0.0), None, false));
        t.edges.push(TrunkEdge::new(p(100.0, 0.0), p(200.0, 0.0), None, false));
        t
    }

    #[test]
    fn projects_orthogonally() {
        let b = vec![Building::new("A", p(40.0, 12.0), 10.0)];
        let out = assign_spurs(&line_trunk(), &b, &SpurConfig::default());
        assert_eq!(out.assignments.len(), 1);
        let a = &out.assignments[0];
        assert_eq!(a.edge, Some(0));
        assert_eq!(a.attach_point, p(40.0, 0.0));
        assert!((a.distance_m - 12.0).abs() < 1e-12);
    }

    #[test]
    fn claimed_point_is_nudged() {
        let b = vec![
            Building::new("A", p(40.0, 12.0), 10.0),
            Building::new("B", p(40.0, -12.0), 10.0),
        ];
        let out = assign_spurs(&line_trunk(), &b, &SpurConfig::default());
        assert_eq!(out.assignments.len(), 2);
        let nudged = out.assignments[1].attach_point;
        assert!((nudged.x - 41.0).abs() < 1e-9 && nudged.y.abs() < 1e-12);
    }

    #[test]
    fn far_building_skipped() {
        let b = vec![Building::new("far", p(50.0, 80.0), 10.0)];
        let out = assign_spurs(&line_trunk(), &b, &SpurConfig::default());
        assert!(out.assignments.is_empty());
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].nearest_distance_m, Some(80.0));
        assert_eq!(out.notes().len(), 1);
    }

    #[test]
    fn edgeless_trunk_offers_root_once() {
        let t = Trunk::new(p(0.0, 0.0), 0.01);
        let b = vec![
            Building::new("A", p(3.0, 4.0), 10.0),
            Building::new("B", p(-3.0, 4.0), 10.0),
        ];
        let out = assign_spurs(&t, &b, &SpurConfig::default());
        assert_eq!(out.assignments.len(), 1);
        assert_eq!(out.assignments[0].edge, None);
        assert_eq!(out.skipped.len(), 1);
    }

    #[test]
    fn split_counts_internal_tees_only() {
        let t = line_trunk();
        let b = vec![
            Building::new("A", p(40.0, 12.0), 10.0),
            Building::new("B", p(100.0, 12.0), 10.0),
            Building::new("C", p(150.0, 12.0), 10.0),
        ];
        let mut out = assign_spurs(&t, &b, &SpurConfig::default());
        let split = split_trunk_at_spurs(&t, &mut out.assignments);
        // B lands on the shared endpoint (100, 0)
        assert_eq!(split.internal_tees, 2);
        assert_eq!(split.trunk.edges.len(), 4);
        assert!(split.trunk.tree().unwrap().is_tree());

        let keys = split.trunk.node_keys();
        for a in &out.assignments {
            assert!(keys.contains(&a.trunk_attach_node.unwrap()));
        }
        assert_eq!(out.tee_nodes().len(), 3);
    }
}
