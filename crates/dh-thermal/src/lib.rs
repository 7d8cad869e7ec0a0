//! dh-thermal: per-pipe heat loss for the supply and return circuits.
//!
//! - `compute_heat_loss`: pure linear (EN 253 reference rates) or
//!   thermal-resistance model, with a twin-pipe interaction correction
//! - `HeatLossModel`: validated configuration plus a bounded result cache keyed
//!   by inputs and a SHA-256 configuration fingerprint
//! - `apply_heat_loss`: writes U, external temperature and loss area onto
//!   every pipe of an assembled network

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod tables;

pub use cache::{CacheKey, CacheStats, HeatLossCache};
pub use config::{AreaConvention, HeatLossConfig, HeatLossMethod, LayerDefaults};
pub use engine::{apply_heat_loss, HeatLossModel, ThermalSummary};
pub use error::{ThermalError, ThermalResult};
pub use model::{
    compute_heat_loss, twin_pipe_correction, HeatLossBreakdown, HeatLossInputs, HeatLossResult,
    ReferenceSource,
};
