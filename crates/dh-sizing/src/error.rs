//! Error types for pipe sizing.

use dh_core::DhError;
use dh_network::NetworkError;
use thiserror::Error;

pub type SizingResult<T> = Result<T, SizingError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SizingError {
    #[error("Pipe catalog is empty")]
    EmptyCatalog,

    #[error("Duplicate catalog size DN {dn}")]
    DuplicateDn { dn: u32 },

    #[error("Catalog inner diameter must increase with DN (DN {dn} after DN {prev_dn})")]
    NonMonotonic { prev_dn: u32, dn: u32 },

    #[error("Invalid catalog entry DN {dn}: {what}")]
    InvalidEntry { dn: u32, what: &'static str },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl From<SizingError> for DhError {
    fn from(e: SizingError) -> Self {
        match e {
            SizingError::Network(n) => n.into(),
            other => DhError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
