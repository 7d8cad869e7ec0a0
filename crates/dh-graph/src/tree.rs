//! Rooted view over a trunk.

use std::collections::{HashMap, VecDeque};

use dh_core::{NodeKey, Point};

use crate::error::{TopologyError, TopologyResult};
use crate::trunk::Trunk;

/// Rooted index of a trunk: node interning, parent map, BFS order and
/// cumulative distance from the root.
///
/// Node 0 is always the root. Edge indices refer to `trunk.edges`.
#[derive(Debug, Clone)]
pub struct TreeIndex {
    points: Vec<Point>,
    keys: Vec<NodeKey>,
    lookup: HashMap<NodeKey, usize>,
    adjacency: Vec<Vec<(usize, usize)>>,
    parent: Vec<Option<(usize, usize)>>,
    order: Vec<usize>,
    depth_m: Vec<f64>,
    edge_count: usize,
}

impl TreeIndex {
    pub fn build(trunk: &Trunk) -> TopologyResult<Self> {
        let tol = trunk.snap_tolerance;
        let mut idx = TreeIndex {
            points: Vec::new(),
            keys: Vec::new(),
            lookup: HashMap::new(),
            adjacency: Vec::new(),
            parent: Vec::new(),
            order: Vec::new(),
            depth_m: Vec::new(),
            edge_count: trunk.edges.len(),
        };
        idx.intern(trunk.root, tol);
        for (ei, edge) in trunk.edges.iter().enumerate() {
            let a = idx.intern(edge.from, tol);
            let b = idx.intern(edge.to, tol);
            idx.adjacency[a].push((b, ei));
            idx.adjacency[b].push((a, ei));
        }
        if !trunk.edges.is_empty() && idx.adjacency[0].is_empty() {
            return Err(TopologyError::RootNotInTrunk);
        }

        let n = idx.points.len();
        idx.parent = vec![None; n];
        idx.depth_m = vec![0.0; n];
        let mut visited = vec![false; n];
        let mut queue = VecDeque::from([0usize]);
        visited[0] = true;
        while let Some(u) = queue.pop_front() {
            idx.order.push(u);
            for &(v, ei) in &idx.adjacency[u] {
                if visited[v] {
                    continue;
                }
                visited[v] = true;
                idx.parent[v] = Some((u, ei));
                idx.depth_m[v] = idx.depth_m[u] + trunk.edges[ei].length_m;
                queue.push_back(v);
            }
        }
        Ok(idx)
    }

    fn intern(&mut self, p: Point, tol: f64) -> usize {
        let key = p.key(tol);
        if let Some(&i) = self.lookup.get(&key) {
            return i;
        }
        let i = self.points.len();
        self.points.push(p);
        self.keys.push(key);
        self.adjacency.push(Vec::new());
        self.lookup.insert(key, i);
        i
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn node_count(&self) -> usize {
        self.points.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn point(&self, node: usize) -> Point {
        self.points[node]
    }

    pub fn key(&self, node: usize) -> NodeKey {
        self.keys[node]
    }

    pub fn node_of(&self, key: &NodeKey) -> Option<usize> {
        self.lookup.get(key).copied()
    }

    /// `(parent node, edge index)`; `None` for the root and unreached nodes.
    pub fn parent(&self, node: usize) -> Option<(usize, usize)> {
        self.parent[node]
    }

    /// Nodes reachable from the root in breadth-first order.
    pub fn bfs_order(&self) -> &[usize] {
        &self.order
    }

    /// Path length along the trunk from the root.
    pub fn depth_m(&self, node: usize) -> f64 {
        self.depth_m[node]
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    pub fn children(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[node]
            .iter()
            .filter(move |&&(v, ei)| self.parent[v] == Some((node, ei)))
            .map(|&(v, _)| v)
    }

    /// Connected, spanning and acyclic.
    pub fn is_tree(&self) -> bool {
        self.order.len() == self.points.len() && self.edge_count + 1 == self.points.len()
    }

    /// Edge indices from `node` up to the root.
    pub fn path_edges_to_root(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = node;
        while let Some((p, ei)) = self.parent[cur] {
            out.push(ei);
            cur = p;
        }
        out
    }

    /// Sum `values` (one per node) over every subtree.
    pub fn subtree_sums(&self, values: &[f64]) -> Vec<f64> {
        let mut acc = values.to_vec();
        acc.resize(self.points.len(), 0.0);
        for &n in self.order.iter().rev() {
            if let Some((p, _)) = self.parent[n] {
                acc[p] += acc[n];
            }
        }
        acc
    }
}
