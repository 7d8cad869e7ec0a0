//! Workspace-level error. Every crate's error converts into it.

use thiserror::Error;

pub type DhResult<T> = Result<T, DhError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DhError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}
