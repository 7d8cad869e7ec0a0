//! Radial trunk synthesis over the street graph.

use std::collections::{BTreeSet, HashMap, HashSet};

use dh_core::{BBox, Building, NodeKey, Point, StreetLine};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{TopologyError, TopologyResult};
use crate::spur::SpurAssignment;
use crate::street::StreetGraph;
use crate::tree::TreeIndex;

/// One trunk segment, oriented as collected (not necessarily away from root).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrunkEdge {
    pub from: Point,
    pub to: Point,
    pub length_m: f64,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub synthetic: bool,
}

impl TrunkEdge {
    pub fn new(from: Point, to: Point, street: Option<String>, synthetic: bool) -> Self {
        Self {
            from,
            to,
            length_m: from.distance(&to),
            street,
            synthetic,
        }
    }

    /// Orientation-independent identity of the edge.
    pub fn undirected_key(&self, tolerance: f64) -> (NodeKey, NodeKey) {
        let a = self.from.key(tolerance);
        let b = self.to.key(tolerance);
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// The shared backbone from the plant attachment node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trunk {
    pub root: Point,
    pub snap_tolerance: f64,
    pub edges: Vec<TrunkEdge>,
}

impl Trunk {
    pub fn new(root: Point, snap_tolerance: f64) -> Self {
        Self {
            root,
            snap_tolerance,
            edges: Vec::new(),
        }
    }

    pub fn total_length_m(&self) -> f64 {
        self.edges.iter().map(|e| e.length_m).sum()
    }

    pub fn tree(&self) -> TopologyResult<TreeIndex> {
        TreeIndex::build(self)
    }

    pub fn node_keys(&self) -> BTreeSet<NodeKey> {
        let tol = self.snap_tolerance;
        let mut keys = BTreeSet::from([self.root.key(tol)]);
        for e in &self.edges {
            keys.insert(e.from.key(tol));
            keys.insert(e.to.key(tol));
        }
        keys
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrunkConfig {
    /// Coordinates closer than this are merged into one node (m)
    pub snap_tolerance_m: f64,
    /// Base clip margin around the cluster bounding box (m)
    pub buffer_m: f64,
    /// Multipliers of `buffer_m`, tried in order while targets are unreachable
    pub buffer_factors: Vec<f64>,
    /// Bridge disconnected components at the largest buffer
    pub allow_bridging: bool,
    /// Relative tolerance when matching a predecessor's distance gap
    pub tie_tolerance: f64,
}

impl Default for TrunkConfig {
    fn default() -> Self {
        Self {
            snap_tolerance_m: 0.01,
            buffer_m: 150.0,
            buffer_factors: vec![1.0, 2.0, 4.0, 8.0],
            allow_bridging: true,
            tie_tolerance: 1e-9,
        }
    }
}

/// Trunk plus the facts gathered while synthesizing it.
#[derive(Debug, Clone)]
pub struct TrunkSynthesis {
    pub trunk: Trunk,
    /// Street point nearest to each building centroid, in building order.
    pub target_nodes: Vec<Point>,
    /// Targets that fell inside a street segment and became new nodes.
    pub split_points: Vec<Point>,
    /// Buffer multiplier of the graph that produced the trunk.
    pub buffer_factor: f64,
    pub bridges_added: usize,
    pub street_nodes: usize,
    pub street_edges: usize,
}

impl TrunkSynthesis {
    /// Assignments whose tee sits on a point inserted inside a street segment.
    pub fn tees_on_split_points(&self, assignments: &[SpurAssignment]) -> usize {
        let tol = self.trunk.snap_tolerance;
        let keys: HashSet<NodeKey> = self.split_points.iter().map(|p| p.key(tol)).collect();
        assignments
            .iter()
            .filter(|a| keys.contains(&a.attach_point.key(tol)))
            .count()
    }
}

/// Plant node and per-building target nodes in one street graph.
struct Anchors {
    root: NodeIndex,
    targets: Vec<NodeIndex>,
    split_points: Vec<Point>,
}

impl Anchors {
    /// The root is the node nearest the plant; each target is the nearest
    /// street point, inserted as a node when it lies inside a segment.
    fn attach(graph: &mut StreetGraph, plant: Point, buildings: &[Building]) -> Option<Self> {
        let (root, _) = graph.nearest_node(&plant)?;
        let mut targets = Vec::with_capacity(buildings.len());
        let mut split_points = Vec::new();
        for b in buildings {
            let (n, inserted) = graph.attach_point(&b.centroid)?;
            if inserted {
                split_points.push(graph.point(n));
            }
            targets.push(n);
        }
        debug!(splits = split_points.len(), "targets attached to street graph");
        Some(Self {
            root,
            targets,
            split_points,
        })
    }
}

/// Build a minimal radial trunk connecting the plant to the street point
/// nearest every building.
pub fn synthesize_trunk(
    streets: &[StreetLine],
    plant: Point,
    buildings: &[Building],
    cfg: &TrunkConfig,
) -> TopologyResult<TrunkSynthesis> {
    if buildings.is_empty() {
        return Err(TopologyError::NoBuildings);
    }
    if !plant.is_finite() {
        return Err(TopologyError::InvalidGeometry {
            what: format!("plant coordinate {}", plant),
        });
    }
    if let Some(b) = buildings.iter().find(|b| !b.centroid.is_finite()) {
        return Err(TopologyError::InvalidGeometry {
            what: format!("centroid of building '{}'", b.id),
        });
    }

    let points: Vec<Point> = buildings
        .iter()
        .map(|b| b.centroid)
        .chain(std::iter::once(plant))
        .collect();
    let bbox = BBox::from_points(points.iter()).ok_or(TopologyError::NoBuildings)?;
    let factors = if cfg.buffer_factors.is_empty() {
        vec![1.0]
    } else {
        cfg.buffer_factors.clone()
    };
    let max_factor = factors.iter().copied().fold(1.0, f64::max);

    let mut last: Option<(StreetGraph, Anchors, f64, usize)> = None;
    for &factor in &factors {
        let clip = bbox.expanded(cfg.buffer_m * factor);
        let mut graph = StreetGraph::from_lines(streets, cfg.snap_tolerance_m, Some(&clip));
        let Some(anchors) = Anchors::attach(&mut graph, plant, buildings) else {
            debug!(factor, "no street segments within buffer");
            continue;
        };
        match shortest_path_tree(&graph, &anchors, cfg.tie_tolerance) {
            Ok(edges) => return Ok(finish(&graph, anchors, edges, factor, 0)),
            Err(unreachable) => {
                info!(factor, unreachable, "targets unreachable, expanding buffer");
                last = Some((graph, anchors, factor, unreachable));
            }
        }
    }

    let Some((mut graph, anchors, factor, unreachable)) = last else {
        return Err(TopologyError::NoStreetGraph {
            max_buffer_m: cfg.buffer_m * max_factor,
        });
    };
    if !cfg.allow_bridging {
        return Err(TopologyError::UnreachableTargets {
            unreachable,
            total: buildings.len(),
        });
    }

    let bridges = graph.bridge_components(anchors.root);
    warn!(bridges, "bridged disconnected street components");

    match shortest_path_tree(&graph, &anchors, cfg.tie_tolerance) {
        Ok(edges) => Ok(finish(&graph, anchors, edges, factor, bridges)),
        Err(unreachable) => Err(TopologyError::UnreachableTargets {
            unreachable,
            total: buildings.len(),
        }),
    }
}

/// Shortest-path tree restricted to the paths reaching the targets.
///
/// Returns the number of unreachable targets on failure.
fn shortest_path_tree(
    graph: &StreetGraph,
    anchors: &Anchors,
    tie_tolerance: f64,
) -> Result<Vec<(NodeIndex, NodeIndex)>, usize> {
    let root = anchors.root;
    let dist = graph.shortest_distances(root);
    let parents = select_parents(graph, &dist, root, tie_tolerance);

    let mut edges = Vec::new();
    let mut seen: HashSet<NodeIndex> = HashSet::new();
    let mut unreachable = 0;
    for &t in &anchors.targets {
        let mut path = Vec::new();
        let mut cur = t;
        let mut ok = true;
        while cur != root && !seen.contains(&cur) {
            match parents.get(&cur) {
                Some(&p) => {
                    path.push((p, cur));
                    cur = p;
                }
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if !ok {
            unreachable += 1;
            continue;
        }
        for &(p, c) in &path {
            seen.insert(c);
            edges.push((p, c));
        }
    }
    if unreachable > 0 {
        return Err(unreachable);
    }

    edges.sort_by(|a, b| {
        dist[&a.1]
            .total_cmp(&dist[&b.1])
            .then(a.1.index().cmp(&b.1.index()))
    });
    Ok(edges)
}

/// One predecessor per reachable node: strictly closer to the root, with the
/// edge closing the distance gap. Smaller distance wins, then lower index.
fn select_parents(
    graph: &StreetGraph,
    dist: &HashMap<NodeIndex, f64>,
    root: NodeIndex,
    tie_tolerance: f64,
) -> HashMap<NodeIndex, NodeIndex> {
    let mut parents = HashMap::new();
    for v in graph.graph().node_indices() {
        if v == root {
            continue;
        }
        let Some(&dv) = dist.get(&v) else { continue };
        let mut best: Option<(f64, NodeIndex)> = None;
        for (u, w) in graph.neighbors(v) {
            let Some(&du) = dist.get(&u) else { continue };
            if du >= dv || (du + w.length_m - dv).abs() > tie_tolerance * dv.max(1.0) {
                continue;
            }
            let better = match best {
                None => true,
                Some((bd, bu)) => du < bd || (du == bd && u.index() < bu.index()),
            };
            if better {
                best = Some((du, u));
            }
        }
        if let Some((_, u)) = best {
            parents.insert(v, u);
        }
    }
    parents
}

fn finish(
    graph: &StreetGraph,
    anchors: Anchors,
    edges: Vec<(NodeIndex, NodeIndex)>,
    buffer_factor: f64,
    bridges_added: usize,
) -> TrunkSynthesis {
    let mut trunk = Trunk::new(graph.point(anchors.root), graph.snap_tolerance());
    for (p, c) in edges {
        let (street, synthetic, length_m) = match graph.edge_between(p, c) {
            Some(e) => (e.street.clone(), e.synthetic, e.length_m),
            None => (None, true, graph.point(p).distance(&graph.point(c))),
        };
        trunk.edges.push(TrunkEdge {
            from: graph.point(p),
            to: graph.point(c),
            length_m,
            street,
            synthetic,
        });
    }
    info!(
        edges = trunk.edges.len(),
        length_m = trunk.total_length_m(),
        buffer_factor,
        bridges_added,
        "trunk synthesized"
    );
    TrunkSynthesis {
        target_nodes: anchors.targets.iter().map(|&n| graph.point(n)).collect(),
        split_points: anchors.split_points,
        trunk,
        buffer_factor,
        bridges_added,
        street_nodes: graph.node_count(),
        street_edges: graph.edge_count(),
    }
}
