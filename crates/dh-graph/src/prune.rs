//! Removal of trunk stubs that lead to no tee node.

use std::collections::BTreeSet;

use dh_core::NodeKey;
use tracing::{info, warn};

use crate::error::TopologyResult;
use crate::trunk::Trunk;

/// Keep only the trunk edges on some tee → root path, in original order.
///
/// An empty tee set leaves the trunk unchanged.
pub fn prune_trunk(trunk: &Trunk, tee_nodes: &BTreeSet<NodeKey>) -> TopologyResult<Trunk> {
    if tee_nodes.is_empty() {
        return Ok(trunk.clone());
    }
    let tree = trunk.tree()?;
    let mut keep = vec![false; trunk.edges.len()];
    for key in tee_nodes {
        let Some(mut cur) = tree.node_of(key) else {
            warn!(?key, "tee node not on trunk");
            continue;
        };
        while let Some((parent, ei)) = tree.parent(cur) {
            if keep[ei] {
                break;
            }
            keep[ei] = true;
            cur = parent;
        }
    }

    let edges: Vec<_> = trunk
        .edges
        .iter()
        .zip(&keep)
        .filter(|(_, &k)| k)
        .map(|(e, _)| e.clone())
        .collect();
    let removed = trunk.edges.len() - edges.len();
    if removed > 0 {
        info!(removed, kept = edges.len(), "pruned trunk stubs");
    }
    Ok(Trunk {
        root: trunk.root,
        snap_tolerance: trunk.snap_tolerance,
        edges,
    })
}
