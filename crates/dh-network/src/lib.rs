//! dh-network: the simulatable dual-circuit network.
//!
//! Provides:
//! - Junction/pipe/boundary element records with explicit role tags
//! - `AssembledNetwork`, mutated only through named operations
//! - `NetworkBuilder` with reference validation and orphan removal
//! - Assembly from a pruned trunk and spur assignments
//! - Pipe hydraulics (Darcy-Weisbach friction)

pub mod assemble;
pub mod builder;
pub mod error;
pub mod hydraulics;
pub mod model;
pub mod network;

pub use assemble::{assemble_network, NetworkConfig};
pub use builder::{NetworkBuilder, NewJunction, NewPipe};
pub use error::{NetworkError, NetworkResult};
pub use model::*;
pub use network::AssembledNetwork;
