//! Network element records and solver I/O.

use dh_core::{JunctionId, NodeKey, PipeId, Point};
use serde::{Deserialize, Serialize};

/// Outbound (hot) or inbound (cooled) flow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Circuit {
    Supply,
    Return,
}

impl Circuit {
    pub fn as_str(self) -> &'static str {
        match self {
            Circuit::Supply => "supply",
            Circuit::Return => "return",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunctionKind {
    Plant,
    Trunk,
    Tee,
    Consumer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeRole {
    /// Link between the plant junctions and the trunk root.
    Plant,
    Trunk,
    Service,
    /// High-resistance supply/return shortcut inserted by repair.
    Bypass,
    /// Synthetic link between disconnected components inserted by repair.
    Bridge,
}

impl PipeRole {
    pub fn as_str(self) -> &'static str {
        match self {
            PipeRole::Plant => "plant",
            PipeRole::Trunk => "trunk",
            PipeRole::Service => "service",
            PipeRole::Bypass => "bypass",
            PipeRole::Bridge => "bridge",
        }
    }

    /// Roles that go through catalog sizing.
    pub fn is_sized(self) -> bool {
        matches!(self, PipeRole::Plant | PipeRole::Trunk | PipeRole::Service)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JunctionResult {
    pub p_bar: f64,
    pub t_k: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub id: JunctionId,
    pub name: String,
    pub kind: JunctionKind,
    pub circuit: Circuit,
    pub position: Point,
    pub node_key: NodeKey,
    pub initial_pressure_bar: f64,
    pub temperature_k: f64,
    #[serde(default)]
    pub building_id: Option<String>,
    #[serde(default)]
    pub result: Option<JunctionResult>,
}

/// Heat-loss parameters handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipeThermal {
    /// Overall heat-transfer coefficient (W/m²K)
    pub u_w_per_m2k: f64,
    /// External (soil) temperature (K)
    pub text_k: f64,
    /// Loss area per metre of pipe under the active area convention (m²/m)
    pub loss_area_per_m: f64,
}

impl Default for PipeThermal {
    fn default() -> Self {
        Self {
            u_w_per_m2k: 0.0,
            text_k: 283.15,
            loss_area_per_m: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipeResult {
    pub mdot_kg_s: f64,
    pub v_mean_m_s: f64,
    pub p_from_bar: f64,
    pub p_to_bar: f64,
    pub t_from_k: f64,
    pub t_to_k: f64,
    /// Heat lost to the surroundings, when the solver reports it (W)
    #[serde(default)]
    pub heat_loss_w: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    pub id: PipeId,
    /// Display segment name shared by both pipes of a pair.
    pub segment: String,
    pub name: String,
    pub from: JunctionId,
    pub to: JunctionId,
    pub role: PipeRole,
    pub circuit: Circuit,
    pub length_m: f64,
    /// Inner diameter (m)
    pub diameter_m: f64,
    #[serde(default)]
    pub dn: Option<u32>,
    pub roughness_m: f64,
    /// Pairing id shared by the supply and return pipe of one segment.
    #[serde(default)]
    pub pair: Option<u32>,
    #[serde(default)]
    pub building_id: Option<String>,
    #[serde(default)]
    pub design_velocity_m_s: Option<f64>,
    #[serde(default)]
    pub thermal: PipeThermal,
    #[serde(default)]
    pub result: Option<PipeResult>,
}

/// Fixed-pressure boundary on the plant supply junction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureSource {
    pub junction: JunctionId,
    pub pressure_bar: f64,
    pub temperature_k: f64,
}

/// Differential-pressure pump from plant return to plant supply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CirculationPump {
    pub from: JunctionId,
    pub to: JunctionId,
    pub lift_bar: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsumerResult {
    pub mdot_kg_s: f64,
    pub t_supply_k: f64,
    pub t_return_k: f64,
}

/// Fixed heat extraction between a building's supply and return junctions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatConsumer {
    pub building_id: String,
    pub from: JunctionId,
    pub to: JunctionId,
    pub heat_demand_w: f64,
    pub mdot_kg_s: f64,
    #[serde(default)]
    pub result: Option<ConsumerResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PumpResult {
    pub mdot_kg_s: f64,
    pub deltap_bar: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignPoint {
    pub supply_temp_k: f64,
    pub return_temp_k: f64,
}

impl DesignPoint {
    pub fn delta_t_k(&self) -> f64 {
        self.supply_temp_k - self.return_temp_k
    }
}

impl Default for DesignPoint {
    fn default() -> Self {
        Self {
            supply_temp_k: 353.15,
            return_temp_k: 323.15,
        }
    }
}

/// Per-element results from one solver run, indexed by element slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutput {
    pub junctions: Vec<JunctionResult>,
    pub pipes: Vec<PipeResult>,
    #[serde(default)]
    pub consumers: Vec<ConsumerResult>,
    #[serde(default)]
    pub pump: Option<PumpResult>,
}
