//! dh-sizing: discrete diameter selection for trunk and service pipes.
//!
//! - `PipeCatalog`: DN series with inner diameters and optional costs,
//!   including a built-in EN 253 steel series
//! - `size_network`: downstream load accumulation and limit-driven size
//!   selection with an ordered rationale

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;

pub use catalog::{CatalogEntry, PipeCatalog};
pub use config::{LimitSet, RoleLimits, SizingConfig, SizingMode};
pub use engine::{size_network, SizingRecord, SizingReport, SizingStatus};
pub use error::{SizingError, SizingResult};
