//! Incremental network builder.

use dh_core::{JunctionId, NodeKey, PipeId, Point};
use tracing::debug;

use crate::error::{NetworkError, NetworkResult};
use crate::model::*;
use crate::network::AssembledNetwork;

/// Junction fields supplied by the caller; the builder assigns the id.
#[derive(Debug, Clone)]
pub struct NewJunction {
    pub name: String,
    pub kind: JunctionKind,
    pub circuit: Circuit,
    pub position: Point,
    pub node_key: NodeKey,
    pub initial_pressure_bar: f64,
    pub temperature_k: f64,
    pub building_id: Option<String>,
}

/// Pipe fields supplied by the caller; the builder assigns the id.
#[derive(Debug, Clone)]
pub struct NewPipe {
    pub segment: String,
    pub name: String,
    pub from: JunctionId,
    pub to: JunctionId,
    pub role: PipeRole,
    pub circuit: Circuit,
    pub length_m: f64,
    pub diameter_m: f64,
    pub roughness_m: f64,
    pub pair: Option<u32>,
    pub building_id: Option<String>,
}

/// Builder for constructing a network incrementally.
///
/// Add junctions, pipes and boundary elements, then call `build()` to
/// validate references, drop orphan junctions and compact ids.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    design: DesignPoint,
    junctions: Vec<Junction>,
    pipes: Vec<Pipe>,
    consumers: Vec<HeatConsumer>,
    source: Option<PressureSource>,
    pump: Option<CirculationPump>,
    next_pair: u32,
}

impl NetworkBuilder {
    pub fn new(design: DesignPoint) -> Self {
        Self {
            design,
            ..Self::default()
        }
    }

    pub fn add_junction(&mut self, j: NewJunction) -> JunctionId {
        let id = JunctionId::from_index(self.junctions.len() as u32);
        self.junctions.push(Junction {
            id,
            name: j.name,
            kind: j.kind,
            circuit: j.circuit,
            position: j.position,
            node_key: j.node_key,
            initial_pressure_bar: j.initial_pressure_bar,
            temperature_k: j.temperature_k,
            building_id: j.building_id,
            result: None,
        });
        id
    }

    /// Reserve a fresh pairing id for a supply/return pipe pair.
    pub fn next_pair_id(&mut self) -> u32 {
        let id = self.next_pair;
        self.next_pair += 1;
        id
    }

    pub fn add_pipe(&mut self, p: NewPipe) -> PipeId {
        let id = PipeId::from_index(self.pipes.len() as u32);
        self.pipes.push(Pipe {
            id,
            segment: p.segment,
            name: p.name,
            from: p.from,
            to: p.to,
            role: p.role,
            circuit: p.circuit,
            length_m: p.length_m,
            diameter_m: p.diameter_m,
            dn: None,
            roughness_m: p.roughness_m,
            pair: p.pair,
            building_id: p.building_id,
            design_velocity_m_s: None,
            thermal: PipeThermal::default(),
            result: None,
        });
        id
    }

    pub fn add_consumer(
        &mut self,
        building_id: impl Into<String>,
        from: JunctionId,
        to: JunctionId,
        heat_demand_w: f64,
        mdot_kg_s: f64,
    ) {
        self.consumers.push(HeatConsumer {
            building_id: building_id.into(),
            from,
            to,
            heat_demand_w,
            mdot_kg_s,
            result: None,
        });
    }

    pub fn set_source(&mut self, source: PressureSource) {
        self.source = Some(source);
    }

    pub fn set_pump(&mut self, pump: CirculationPump) {
        self.pump = Some(pump);
    }

    /// Validate and freeze into an `AssembledNetwork`.
    pub fn build(self) -> NetworkResult<AssembledNetwork> {
        let source = self.source.ok_or(NetworkError::MissingPlant {
            what: "pressure source",
        })?;
        let pump = self.pump.ok_or(NetworkError::MissingPlant {
            what: "circulation pump",
        })?;

        let n = self.junctions.len();
        let check = |pipe: PipeId, j: JunctionId| {
            if j.slot() >= n {
                Err(NetworkError::InvalidJunctionRef { pipe, junction: j })
            } else {
                Ok(())
            }
        };
        for p in &self.pipes {
            check(p.id, p.from)?;
            check(p.id, p.to)?;
            if p.from == p.to {
                return Err(NetworkError::SelfLoop {
                    pipe: p.id,
                    junction: p.from,
                });
            }
            if !(p.length_m.is_finite() && p.length_m > 0.0) {
                return Err(NetworkError::InvalidValue {
                    what: "pipe length",
                    value: p.length_m,
                });
            }
            if !(p.diameter_m.is_finite() && p.diameter_m > 0.0) {
                return Err(NetworkError::InvalidValue {
                    what: "pipe diameter",
                    value: p.diameter_m,
                });
            }
        }
        let referenced = [source.junction, pump.from, pump.to]
            .into_iter()
            .chain(self.consumers.iter().flat_map(|c| [c.from, c.to]));
        for j in referenced.clone() {
            if j.slot() >= n {
                return Err(NetworkError::UnknownJunction { junction: j });
            }
        }

        // Orphans: junctions touched by no pipe and no boundary element
        let mut used = vec![false; n];
        for p in &self.pipes {
            used[p.from.slot()] = true;
            used[p.to.slot()] = true;
        }
        for j in referenced {
            used[j.slot()] = true;
        }

        let mut remap: Vec<Option<JunctionId>> = vec![None; n];
        let mut junctions = Vec::with_capacity(n);
        for (old, mut j) in self.junctions.into_iter().enumerate() {
            if !used[old] {
                debug!(junction = %j.name, "dropping orphan junction");
                continue;
            }
            let id = JunctionId::from_index(junctions.len() as u32);
            remap[old] = Some(id);
            j.id = id;
            junctions.push(j);
        }
        // every referenced slot is marked used, so remapping cannot fail
        let map = |j: JunctionId| remap[j.slot()].unwrap_or(j);

        let mut pipes = self.pipes;
        for p in &mut pipes {
            p.from = map(p.from);
            p.to = map(p.to);
        }
        let mut consumers = self.consumers;
        for c in &mut consumers {
            c.from = map(c.from);
            c.to = map(c.to);
        }

        Ok(AssembledNetwork::from_parts(
            junctions,
            pipes,
            PressureSource {
                junction: map(source.junction),
                ..source
            },
            CirculationPump {
                from: map(pump.from),
                to: map(pump.to),
                ..pump
            },
            consumers,
            self.design,
            self.next_pair,
        ))
    }
}
