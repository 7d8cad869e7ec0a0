//! Topology error types.

use dh_core::DhError;

/// Fatal topology errors: no usable trunk can be produced for the cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// The cluster has no buildings to connect.
    NoBuildings,

    /// No street segment lies within the largest search buffer.
    NoStreetGraph { max_buffer_m: f64 },

    /// Some building targets cannot be reached from the plant, even after
    /// buffer expansion and component bridging.
    UnreachableTargets { unreachable: usize, total: usize },

    /// The trunk root does not touch any trunk edge.
    RootNotInTrunk,

    /// Input coordinates are unusable.
    InvalidGeometry { what: String },
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::NoBuildings => write!(f, "Cluster has no buildings to connect"),
            TopologyError::NoStreetGraph { max_buffer_m } => write!(
                f,
                "No street graph obtainable within a {:.1} m buffer around the cluster",
                max_buffer_m
            ),
            TopologyError::UnreachableTargets { unreachable, total } => write!(
                f,
                "{} of {} building targets unreachable from the plant after bridging",
                unreachable, total
            ),
            TopologyError::RootNotInTrunk => {
                write!(f, "Trunk root is not an endpoint of any trunk edge")
            }
            TopologyError::InvalidGeometry { what } => write!(f, "Invalid geometry: {}", what),
        }
    }
}

impl std::error::Error for TopologyError {}

pub type TopologyResult<T> = Result<T, TopologyError>;

impl From<TopologyError> for DhError {
    fn from(err: TopologyError) -> Self {
        DhError::Invariant {
            what: err.to_string(),
        }
    }
}
