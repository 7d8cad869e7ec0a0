//! Snapped street graph built from street centerlines.

use std::collections::{BTreeMap, HashMap};

use dh_core::geom::project_onto_segment;
use dh_core::{BBox, NodeKey, Point, StreetLine};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

/// Street segment weight.
#[derive(Debug, Clone, PartialEq)]
pub struct StreetEdge {
    pub length_m: f64,
    pub street: Option<String>,
    /// True for bridges inserted between disconnected components.
    pub synthetic: bool,
}

/// Result of a nearest-edge query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeHit {
    pub edge: EdgeIndex,
    pub point: Point,
    pub distance: f64,
}

/// Undirected street graph whose nodes are snapped coordinates.
#[derive(Debug, Clone)]
pub struct StreetGraph {
    graph: UnGraph<Point, StreetEdge>,
    index: HashMap<NodeKey, NodeIndex>,
    snap_tolerance: f64,
}

impl StreetGraph {
    pub fn new(snap_tolerance: f64) -> Self {
        Self {
            graph: UnGraph::default(),
            index: HashMap::new(),
            snap_tolerance,
        }
    }

    /// Build from polylines. Segments whose bounding box misses `clip` are
    /// dropped; zero-length and non-finite segments are skipped.
    pub fn from_lines(lines: &[StreetLine], snap_tolerance: f64, clip: Option<&BBox>) -> Self {
        let mut g = Self::new(snap_tolerance);
        for line in lines {
            for w in line.points.windows(2) {
                let (a, b) = (w[0], w[1]);
                if !a.is_finite() || !b.is_finite() {
                    continue;
                }
                if let Some(bbox) = clip {
                    if !bbox.overlaps_segment(&a, &b) {
                        continue;
                    }
                }
                g.add_segment(a, b, line.name.as_deref(), false);
            }
        }
        g
    }

    /// Insert a segment between two (snapped) points.
    ///
    /// Duplicate segments collapse to one edge carrying the shorter length.
    pub fn add_segment(
        &mut self,
        a: Point,
        b: Point,
        street: Option<&str>,
        synthetic: bool,
    ) -> Option<EdgeIndex> {
        let na = self.node_for(a);
        let nb = self.node_for(b);
        if na == nb {
            return None;
        }
        let length_m = self.graph[na].distance(&self.graph[nb]);
        if let Some(existing) = self.graph.find_edge(na, nb) {
            let weight = &mut self.graph[existing];
            if length_m < weight.length_m {
                weight.length_m = length_m;
            }
            return Some(existing);
        }
        Some(self.graph.add_edge(
            na,
            nb,
            StreetEdge {
                length_m,
                street: street.map(str::to_string),
                synthetic,
            },
        ))
    }

    fn node_for(&mut self, p: Point) -> NodeIndex {
        let key = p.key(self.snap_tolerance);
        if let Some(&ix) = self.index.get(&key) {
            return ix;
        }
        let ix = self.graph.add_node(p);
        self.index.insert(key, ix);
        ix
    }

    pub fn graph(&self) -> &UnGraph<Point, StreetEdge> {
        &self.graph
    }

    pub fn snap_tolerance(&self) -> f64 {
        self.snap_tolerance
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn point(&self, node: NodeIndex) -> Point {
        self.graph[node]
    }

    pub fn node_at(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    pub fn edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<&StreetEdge> {
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    /// Neighbours of `node` with the connecting edge weight.
    pub fn neighbors(
        &self,
        node: NodeIndex,
    ) -> impl Iterator<Item = (NodeIndex, &StreetEdge)> + '_ {
        self.graph.edges(node).map(move |e| {
            let other = if e.source() == node {
                e.target()
            } else {
                e.source()
            };
            (other, e.weight())
        })
    }

    /// Nearest node to `p`; ties go to the lower node index.
    pub fn nearest_node(&self, p: &Point) -> Option<(NodeIndex, f64)> {
        let mut best: Option<(NodeIndex, f64)> = None;
        for ix in self.graph.node_indices() {
            let d = self.graph[ix].distance(p);
            match best {
                Some((_, bd)) if d >= bd => {}
                _ => best = Some((ix, d)),
            }
        }
        best
    }

    /// Nearest point on any edge to `p`.
    pub fn nearest_edge(&self, p: &Point) -> Option<EdgeHit> {
        let mut best: Option<EdgeHit> = None;
        for e in self.graph.edge_references() {
            let a = self.graph[e.source()];
            let b = self.graph[e.target()];
            let proj = project_onto_segment(p, &a, &b);
            match best {
                Some(hit) if proj.distance >= hit.distance => {}
                _ => {
                    best = Some(EdgeHit {
                        edge: e.id(),
                        point: proj.point,
                        distance: proj.distance,
                    })
                }
            }
        }
        best
    }

    /// Replace `edge` by two halves meeting at `p` and return the new node.
    ///
    /// A point within the snap tolerance of an existing node returns that node
    /// and leaves the graph unchanged.
    pub fn split_edge(&mut self, edge: EdgeIndex, p: Point) -> Option<NodeIndex> {
        let (a, b) = self.graph.edge_endpoints(edge)?;
        for end in [a, b] {
            if self.graph[end].distance(&p) <= self.snap_tolerance {
                return Some(end);
            }
        }
        if let Some(existing) = self.node_at(&p.key(self.snap_tolerance)) {
            return Some(existing);
        }
        let weight = self.graph.remove_edge(edge)?;
        let mid = self.node_for(p);
        for end in [a, b] {
            self.graph.add_edge(
                end,
                mid,
                StreetEdge {
                    length_m: self.graph[end].distance(&p),
                    street: weight.street.clone(),
                    synthetic: weight.synthetic,
                },
            );
        }
        Some(mid)
    }

    /// Node at the street point nearest to `p`, splitting the edge it falls
    /// on. The flag is true when a node was inserted.
    pub fn attach_point(&mut self, p: &Point) -> Option<(NodeIndex, bool)> {
        let Some(hit) = self.nearest_edge(p) else {
            return self.nearest_node(p).map(|(n, _)| (n, false));
        };
        let before = self.graph.node_count();
        let node = self.split_edge(hit.edge, hit.point)?;
        Some((node, self.graph.node_count() > before))
    }

    /// Cumulative shortest-path length from `root` to every reachable node.
    pub fn shortest_distances(&self, root: NodeIndex) -> HashMap<NodeIndex, f64> {
        petgraph::algo::dijkstra(&self.graph, root, None, |e| e.weight().length_m)
            .into_iter()
            .collect()
    }

    /// Connected components, each sorted by node index, ordered by their
    /// smallest member.
    pub fn components(&self) -> Vec<Vec<NodeIndex>> {
        let n = self.graph.node_count();
        let mut uf = UnionFind::<usize>::new(n);
        for e in self.graph.edge_references() {
            uf.union(e.source().index(), e.target().index());
        }
        let mut groups: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
        for i in 0..n {
            groups.entry(uf.find(i)).or_default().push(NodeIndex::new(i));
        }
        let mut comps: Vec<Vec<NodeIndex>> = groups.into_values().collect();
        comps.sort_by_key(|c| c[0].index());
        comps
    }

    /// Connect every component to the one containing `root` with the shortest
    /// available synthetic edge. Returns the number of bridges inserted.
    pub fn bridge_components(&mut self, root: NodeIndex) -> usize {
        let mut comps = self.components();
        let Some(root_pos) = comps.iter().position(|c| c.contains(&root)) else {
            return 0;
        };
        let mut connected = comps.swap_remove(root_pos);
        let mut bridges = 0;

        while !comps.is_empty() {
            // (component position, connected node, component node, distance)
            let mut best: Option<(usize, NodeIndex, NodeIndex, f64)> = None;
            for (ci, comp) in comps.iter().enumerate() {
                for &a in &connected {
                    for &b in comp {
                        let d = self.graph[a].distance(&self.graph[b]);
                        match best {
                            Some((_, _, _, bd)) if d >= bd => {}
                            _ => best = Some((ci, a, b, d)),
                        }
                    }
                }
            }
            let Some((ci, a, b, d)) = best else { break };
            self.graph.add_edge(
                a,
                b,
                StreetEdge {
                    length_m: d,
                    street: None,
                    synthetic: true,
                },
            );
            tracing::debug!(
                from = %self.graph[a],
                to = %self.graph[b],
                length_m = d,
                "bridged street component"
            );
            connected.extend(comps.swap_remove(ci));
            bridges += 1;
        }
        bridges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64)]) -> StreetLine {
        StreetLine::new(
            Some("s"),
            points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        )
    }

    #[test]
    fn snaps_shared_endpoints() {
        let lines = vec![
            line(&[(0.0, 0.0), (10.0, 0.0)]),
            line(&[(10.001, 0.0), (10.0, 10.0)]),
        ];
        let g = StreetGraph::from_lines(&lines, 0.01, None);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn skips_zero_length_and_duplicates() {
        let lines = vec![
            line(&[(0.0, 0.0), (0.0, 0.0), (5.0, 0.0)]),
            line(&[(5.0, 0.0), (0.0, 0.0)]),
        ];
        let g = StreetGraph::from_lines(&lines, 0.01, None);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn clip_drops_far_segments() {
        let lines = vec![
            line(&[(0.0, 0.0), (10.0, 0.0)]),
            line(&[(1000.0, 0.0), (1010.0, 0.0)]),
        ];
        let bbox = BBox::from_points([Point::new(0.0, 0.0), Point::new(10.0, 0.0)].iter())
            .unwrap()
            .expanded(5.0);
        let g = StreetGraph::from_lines(&lines, 0.01, Some(&bbox));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn nearest_queries() {
        let g = StreetGraph::from_lines(&[line(&[(0.0, 0.0), (10.0, 0.0)])], 0.01, None);
        let (n, d) = g.nearest_node(&Point::new(8.0, 1.0)).unwrap();
        assert_eq!(g.point(n), Point::new(10.0, 0.0));
        assert!((d - 5f64.sqrt()).abs() < 1e-12);

        let hit = g.nearest_edge(&Point::new(4.0, 3.0)).unwrap();
        assert_eq!(hit.point, Point::new(4.0, 0.0));
        assert!((hit.distance - 3.0).abs() < 1e-12);
    }

    #[test]
    fn attach_splits_segment_interior() {
        let mut g = StreetGraph::from_lines(
            &[line(&[(0.0, 0.0), (100.0, 0.0), (200.0, 0.0)])],
            0.01,
            None,
        );
        let (mid, inserted) = g.attach_point(&Point::new(145.0, 48.0)).unwrap();
        assert!(inserted);
        assert_eq!(g.point(mid), Point::new(145.0, 0.0));
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 3);

        let a = g.node_at(&Point::new(100.0, 0.0).key(0.01)).unwrap();
        let b = g.node_at(&Point::new(200.0, 0.0).key(0.01)).unwrap();
        assert!(g.edge_between(a, b).is_none());
        assert!((g.edge_between(a, mid).unwrap().length_m - 45.0).abs() < 1e-12);
        assert!((g.edge_between(mid, b).unwrap().length_m - 55.0).abs() < 1e-12);
        assert_eq!(g.edge_between(mid, b).unwrap().street.as_deref(), Some("s"));

        // same point again, and a point past the end, reuse existing nodes
        assert_eq!(g.attach_point(&Point::new(145.0, -20.0)), Some((mid, false)));
        let (end, inserted) = g.attach_point(&Point::new(230.0, 5.0)).unwrap();
        assert!(!inserted);
        assert_eq!(end, b);
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn bridges_join_all_components() {
        let lines = vec![
            line(&[(0.0, 0.0), (10.0, 0.0)]),
            line(&[(20.0, 0.0), (30.0, 0.0)]),
            line(&[(0.0, 50.0), (10.0, 50.0)]),
        ];
        let mut g = StreetGraph::from_lines(&lines, 0.01, None);
        assert_eq!(g.components().len(), 3);

        let root = g.node_at(&Point::new(0.0, 0.0).key(0.01)).unwrap();
        let added = g.bridge_components(root);
        assert_eq!(added, 2);
        assert_eq!(g.components().len(), 1);

        let a = g.node_at(&Point::new(10.0, 0.0).key(0.01)).unwrap();
        let b = g.node_at(&Point::new(20.0, 0.0).key(0.01)).unwrap();
        let bridge = g.edge_between(a, b).unwrap();
        assert!(bridge.synthetic);
        assert!((bridge.length_m - 10.0).abs() < 1e-12);
    }

    #[test]
    fn dijkstra_distances() {
        let g = StreetGraph::from_lines(
            &[line(&[(0.0, 0.0), (3.0, 0.0), (3.0, 4.0)])],
            0.01,
            None,
        );
        let root = g.node_at(&Point::new(0.0, 0.0).key(0.01)).unwrap();
        let far = g.node_at(&Point::new(3.0, 4.0).key(0.01)).unwrap();
        let dist = g.shortest_distances(root);
        assert!((dist[&far] - 7.0).abs() < 1e-12);
    }
}
