//! The mutable simulation aggregate.

use std::collections::BTreeMap;

use dh_core::{JunctionId, PipeId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NetworkError, NetworkResult};
use crate::model::*;

/// Dual-circuit network handed to the solver.
///
/// Elements are stored in vectors indexed by their ids. All mutation goes
/// through the named `apply_*`/`add_*` operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledNetwork {
    junctions: Vec<Junction>,
    pipes: Vec<Pipe>,
    source: PressureSource,
    pump: CirculationPump,
    consumers: Vec<HeatConsumer>,
    design: DesignPoint,
    converged: bool,
    #[serde(default)]
    pump_result: Option<PumpResult>,
    next_pair: u32,
}

impl AssembledNetwork {
    pub(crate) fn from_parts(
        junctions: Vec<Junction>,
        pipes: Vec<Pipe>,
        source: PressureSource,
        pump: CirculationPump,
        consumers: Vec<HeatConsumer>,
        design: DesignPoint,
        next_pair: u32,
    ) -> Self {
        Self {
            junctions,
            pipes,
            source,
            pump,
            consumers,
            design,
            converged: false,
            pump_result: None,
            next_pair,
        }
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    pub fn pipes(&self) -> &[Pipe] {
        &self.pipes
    }

    pub fn junction(&self, id: JunctionId) -> Option<&Junction> {
        self.junctions.get(id.slot())
    }

    pub fn pipe(&self, id: PipeId) -> Option<&Pipe> {
        self.pipes.get(id.slot())
    }

    pub fn source(&self) -> &PressureSource {
        &self.source
    }

    pub fn pump(&self) -> &CirculationPump {
        &self.pump
    }

    pub fn consumers(&self) -> &[HeatConsumer] {
        &self.consumers
    }

    pub fn design(&self) -> &DesignPoint {
        &self.design
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn pump_result(&self) -> Option<&PumpResult> {
        self.pump_result.as_ref()
    }

    pub fn pipes_with_role(&self, role: PipeRole) -> impl Iterator<Item = &Pipe> + '_ {
        self.pipes.iter().filter(move |p| p.role == role)
    }

    /// The other pipe of `pipe`'s supply/return pair.
    pub fn counterpart(&self, pipe: PipeId) -> Option<PipeId> {
        let p = self.pipe(pipe)?;
        let pair = p.pair?;
        self.pipes
            .iter()
            .find(|q| q.id != pipe && q.pair == Some(pair))
            .map(|q| q.id)
    }

    /// Pipes touching a junction.
    pub fn incident_pipes(&self, junction: JunctionId) -> impl Iterator<Item = &Pipe> + '_ {
        self.pipes
            .iter()
            .filter(move |p| p.from == junction || p.to == junction)
    }

    /// Number of pipes and heat consumers attached to a junction.
    pub fn degree(&self, junction: JunctionId, include_bypass: bool) -> usize {
        let pipes = self
            .incident_pipes(junction)
            .filter(|p| include_bypass || p.role != PipeRole::Bypass)
            .count();
        let consumers = self
            .consumers
            .iter()
            .filter(|c| c.from == junction || c.to == junction)
            .count();
        pipes + consumers
    }

    /// Junction of the other circuit at the same node.
    pub fn partner_junction(&self, junction: JunctionId) -> Option<JunctionId> {
        let j = self.junction(junction)?;
        self.junctions
            .iter()
            .find(|o| o.node_key == j.node_key && o.circuit != j.circuit && o.kind == j.kind)
            .map(|o| o.id)
    }

    /// Lowest solved junction pressure.
    pub fn min_pressure_bar(&self) -> Option<f64> {
        self.junctions
            .iter()
            .filter_map(|j| j.result.map(|r| r.p_bar))
            .reduce(f64::min)
    }

    /// Set the catalog size of a pipe and its pair counterpart.
    pub fn apply_sizing(
        &mut self,
        pipe: PipeId,
        dn: Option<u32>,
        diameter_m: f64,
        design_velocity_m_s: f64,
    ) -> NetworkResult<()> {
        if !(diameter_m.is_finite() && diameter_m > 0.0) {
            return Err(NetworkError::InvalidValue {
                what: "sized diameter",
                value: diameter_m,
            });
        }
        if pipe.slot() >= self.pipes.len() {
            return Err(NetworkError::UnknownPipe { pipe });
        }
        let targets = [Some(pipe), self.counterpart(pipe)];
        for id in targets.into_iter().flatten() {
            let p = &mut self.pipes[id.slot()];
            p.dn = dn;
            p.diameter_m = diameter_m;
            p.design_velocity_m_s = Some(design_velocity_m_s);
        }
        Ok(())
    }

    pub fn apply_heat_loss(&mut self, pipe: PipeId, thermal: PipeThermal) -> NetworkResult<()> {
        let p = self
            .pipes
            .get_mut(pipe.slot())
            .ok_or(NetworkError::UnknownPipe { pipe })?;
        p.thermal = thermal;
        Ok(())
    }

    /// Scale plant pressure and pump lift by `factor`.
    pub fn apply_boundary_escalation(&mut self, factor: f64) -> NetworkResult<()> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(NetworkError::InvalidValue {
                what: "escalation factor",
                value: factor,
            });
        }
        self.source.pressure_bar *= factor;
        self.pump.lift_bar *= factor;
        for j in &mut self.junctions {
            j.initial_pressure_bar *= factor;
        }
        debug!(
            factor,
            pressure_bar = self.source.pressure_bar,
            lift_bar = self.pump.lift_bar,
            "plant boundary escalated"
        );
        Ok(())
    }

    /// Store a solver run's results and mark the network converged.
    pub fn apply_results(&mut self, out: SolverOutput) -> NetworkResult<()> {
        if out.junctions.len() != self.junctions.len() {
            return Err(NetworkError::ResultMismatch {
                what: "junctions",
                expected: self.junctions.len(),
                actual: out.junctions.len(),
            });
        }
        if out.pipes.len() != self.pipes.len() {
            return Err(NetworkError::ResultMismatch {
                what: "pipes",
                expected: self.pipes.len(),
                actual: out.pipes.len(),
            });
        }
        if !out.consumers.is_empty() && out.consumers.len() != self.consumers.len() {
            return Err(NetworkError::ResultMismatch {
                what: "consumers",
                expected: self.consumers.len(),
                actual: out.consumers.len(),
            });
        }
        for (j, r) in self.junctions.iter_mut().zip(out.junctions) {
            j.result = Some(r);
        }
        for (p, r) in self.pipes.iter_mut().zip(out.pipes) {
            p.result = Some(r);
        }
        for (c, r) in self.consumers.iter_mut().zip(out.consumers) {
            c.result = Some(r);
        }
        self.pump_result = out.pump;
        self.converged = true;
        Ok(())
    }

    pub fn clear_results(&mut self) {
        for j in &mut self.junctions {
            j.result = None;
        }
        for p in &mut self.pipes {
            p.result = None;
        }
        for c in &mut self.consumers {
            c.result = None;
        }
        self.pump_result = None;
        self.converged = false;
    }

    fn push_pipe(&mut self, mut pipe: Pipe) -> NetworkResult<PipeId> {
        for junction in [pipe.from, pipe.to] {
            if junction.slot() >= self.junctions.len() {
                return Err(NetworkError::UnknownJunction { junction });
            }
        }
        let id = PipeId::from_index(self.pipes.len() as u32);
        if pipe.from == pipe.to {
            return Err(NetworkError::SelfLoop {
                pipe: id,
                junction: pipe.from,
            });
        }
        pipe.id = id;
        self.pipes.push(pipe);
        Ok(id)
    }

    /// Short high-resistance link from a supply junction to its return partner.
    pub fn add_bypass(
        &mut self,
        supply: JunctionId,
        ret: JunctionId,
        length_m: f64,
        diameter_m: f64,
        roughness_m: f64,
    ) -> NetworkResult<PipeId> {
        let name = format!("bypass_{}", supply);
        self.push_pipe(Pipe {
            id: PipeId::from_index(0),
            segment: name.clone(),
            name,
            from: supply,
            to: ret,
            role: PipeRole::Bypass,
            circuit: Circuit::Supply,
            length_m,
            diameter_m,
            dn: None,
            roughness_m,
            pair: None,
            building_id: None,
            design_velocity_m_s: None,
            thermal: PipeThermal::default(),
            result: None,
        })
    }

    /// Synthetic link between two junctions of the same circuit, mirrored in
    /// the other circuit when both ends have a partner junction.
    pub fn add_bridge(
        &mut self,
        from: JunctionId,
        to: JunctionId,
        length_m: f64,
        diameter_m: f64,
        roughness_m: f64,
    ) -> NetworkResult<Vec<PipeId>> {
        let circuit = self
            .junction(from)
            .ok_or(NetworkError::UnknownJunction { junction: from })?
            .circuit;
        let pair = self.next_pair;
        self.next_pair += 1;

        let mut ends = vec![(from, to, circuit)];
        if let (Some(pf), Some(pt)) = (self.partner_junction(from), self.partner_junction(to)) {
            let other = match circuit {
                Circuit::Supply => Circuit::Return,
                Circuit::Return => Circuit::Supply,
            };
            ends.push((pf, pt, other));
        }

        let segment = format!("bridge_{}", pair);
        let mut ids = Vec::with_capacity(ends.len());
        for (a, b, c) in ends {
            ids.push(self.push_pipe(Pipe {
                id: PipeId::from_index(0),
                segment: segment.clone(),
                name: format!("{}_{}", segment, c.as_str()),
                from: a,
                to: b,
                role: PipeRole::Bridge,
                circuit: c,
                length_m,
                diameter_m,
                dn: None,
                roughness_m,
                pair: Some(pair),
                building_id: None,
                design_velocity_m_s: None,
                thermal: PipeThermal::default(),
                result: None,
            })?);
        }
        Ok(ids)
    }

    /// Scale lengths of every `role` pipe pair by a random factor in
    /// `[1 - fraction, 1 + fraction]`. Both pipes of a pair get the same
    /// factor. Returns the number of pipes changed.
    pub fn perturb_lengths<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        role: PipeRole,
        fraction: f64,
    ) -> usize {
        let fraction = fraction.clamp(0.0, 0.9);
        if fraction == 0.0 {
            return 0;
        }
        let mut factors: BTreeMap<u32, f64> = BTreeMap::new();
        let mut changed = 0;
        for p in self.pipes.iter_mut().filter(|p| p.role == role) {
            let factor = match p.pair {
                Some(pair) => *factors
                    .entry(pair)
                    .or_insert_with(|| 1.0 + rng.gen_range(-fraction..=fraction)),
                None => 1.0 + rng.gen_range(-fraction..=fraction),
            };
            p.length_m *= factor;
            changed += 1;
        }
        changed
    }
}
