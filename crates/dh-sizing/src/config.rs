//! Sizing mode and per-role velocity and pressure-gradient limits.

use dh_network::PipeRole;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    #[default]
    Standard,
    /// Lower velocity and gradient limits: larger pipes, less pumping.
    Eco,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleLimits {
    /// Smallest DN considered
    pub min_dn: u32,
    pub max_velocity_m_s: f64,
    pub max_pressure_gradient_pa_per_m: f64,
}

/// Limits for trunk-class pipes (plant link and trunk) and service pipes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitSet {
    pub trunk: RoleLimits,
    pub service: RoleLimits,
}

impl LimitSet {
    pub fn standard() -> Self {
        Self {
            trunk: RoleLimits {
                min_dn: 50,
                max_velocity_m_s: 1.5,
                max_pressure_gradient_pa_per_m: 200.0,
            },
            service: RoleLimits {
                min_dn: 25,
                max_velocity_m_s: 1.0,
                max_pressure_gradient_pa_per_m: 300.0,
            },
        }
    }

    pub fn eco() -> Self {
        Self {
            trunk: RoleLimits {
                min_dn: 50,
                max_velocity_m_s: 1.0,
                max_pressure_gradient_pa_per_m: 100.0,
            },
            service: RoleLimits {
                min_dn: 25,
                max_velocity_m_s: 0.7,
                max_pressure_gradient_pa_per_m: 150.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub mode: SizingMode,
    pub standard: LimitSet,
    pub eco: LimitSet,
    /// Hard velocity ceiling used to classify failures (m/s)
    pub absolute_max_velocity_m_s: f64,
    /// Multiplier on consumer design loads
    pub design_margin: f64,
    /// Theoretical sizes allowed past the largest catalog entry
    pub max_synthetic_sizes: usize,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            mode: SizingMode::Standard,
            standard: LimitSet::standard(),
            eco: LimitSet::eco(),
            absolute_max_velocity_m_s: 3.0,
            design_margin: 1.0,
            max_synthetic_sizes: 4,
        }
    }
}

impl SizingConfig {
    pub fn active(&self) -> &LimitSet {
        match self.mode {
            SizingMode::Standard => &self.standard,
            SizingMode::Eco => &self.eco,
        }
    }

    pub fn limits_for(&self, role: PipeRole) -> &RoleLimits {
        match role {
            PipeRole::Service => &self.active().service,
            _ => &self.active().trunk,
        }
    }
}
