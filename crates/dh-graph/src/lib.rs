//! dh-graph: street graph and radial trunk topology.
//!
//! Provides:
//! - Snapped, undirected street graph with nearest-node/edge queries
//! - Trunk synthesis via a single-source shortest-path tree
//! - Exclusive spur assignment and "tee on main" edge splitting
//! - Dead-stub pruning and a rooted tree index for downstream stages
//!
//! # Example
//!
//! ```
//! use dh_core::{Building, Point, StreetLine};
//! use dh_graph::{TrunkConfig, synthesize_trunk};
//!
//! let streets = vec![StreetLine::new(
//!     Some("Main"),
//!     vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(200.0, 0.0)],
//! )];
//! let buildings = vec![Building::new("B1", Point::new(190.0, 12.0), 40.0)];
//!
//! let synthesis =
//!     synthesize_trunk(&streets, Point::new(0.0, 0.0), &buildings, &TrunkConfig::default())
//!         .unwrap();
//! assert_eq!(synthesis.trunk.edges.len(), 2);
//! assert!(synthesis.trunk.tree().unwrap().is_tree());
//! ```

pub mod error;
pub mod prune;
pub mod spur;
pub mod street;
pub mod tree;
pub mod trunk;

// Re-exports for ergonomics
pub use error::{TopologyError, TopologyResult};
pub use prune::prune_trunk;
pub use spur::{
    assign_spurs, split_trunk_at_spurs, SkippedBuilding, SplitOutcome, SpurAssignment,
    SpurConfig, SpurOutcome,
};
pub use street::{EdgeHit, StreetEdge, StreetGraph};
pub use tree::TreeIndex;
pub use trunk::{synthesize_trunk, Trunk, TrunkConfig, TrunkEdge, TrunkSynthesis};
