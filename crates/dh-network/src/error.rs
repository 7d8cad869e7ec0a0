//! Error types for network assembly and mutation.

use dh_core::{DhError, JunctionId, PipeId};
use dh_graph::TopologyError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Pipe {pipe} references unknown junction {junction}")]
    InvalidJunctionRef { pipe: PipeId, junction: JunctionId },

    #[error("Pipe {pipe} starts and ends at junction {junction}")]
    SelfLoop { pipe: PipeId, junction: JunctionId },

    #[error("Unknown pipe: {pipe}")]
    UnknownPipe { pipe: PipeId },

    #[error("Unknown junction: {junction}")]
    UnknownJunction { junction: JunctionId },

    #[error("Plant boundary conditions missing: {what}")]
    MissingPlant { what: &'static str },

    #[error("Building '{building}' attaches to a node absent from the trunk")]
    DetachedService { building: String },

    #[error("Result size mismatch for {what}: expected {expected}, got {actual}")]
    ResultMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid value for {what}: {value}")]
    InvalidValue { what: &'static str, value: f64 },

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl From<NetworkError> for DhError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::InvalidValue { what, value } => DhError::NonFinite { what, value },
            NetworkError::Topology(t) => t.into(),
            other => DhError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
