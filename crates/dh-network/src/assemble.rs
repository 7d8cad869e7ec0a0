//! Assembly of the dual-circuit network from a trunk and its spurs.

use std::collections::{BTreeSet, HashMap};

use dh_core::units::{bar, celsius, kw, m, mm, Length, Pressure, Temperature};
use dh_core::{Building, JunctionId, NodeKey, Point, WaterProps};
use dh_graph::{SpurAssignment, Trunk};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::builder::{NetworkBuilder, NewJunction, NewPipe};
use crate::error::{NetworkError, NetworkResult};
use crate::hydraulics::mass_flow_for_load;
use crate::model::*;
use crate::network::AssembledNetwork;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Plant supply pressure (bar)
    pub system_pressure_bar: f64,
    /// Circulation pump differential pressure (bar)
    pub pump_lift_bar: f64,
    /// Heuristic pressure drop used to seed initial junction pressures (bar/m)
    pub pressure_drop_per_m_bar: f64,
    /// Floor for seeded junction pressures (bar)
    pub min_initial_pressure_bar: f64,
    pub supply_temp_c: f64,
    pub return_temp_c: f64,
    /// Inner diameter before sizing (m)
    pub default_diameter_m: f64,
    /// Absolute wall roughness (mm)
    pub roughness_mm: f64,
    /// Shorter pipes are lengthened to this (m)
    pub min_pipe_length_m: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            system_pressure_bar: 6.0,
            pump_lift_bar: 3.0,
            pressure_drop_per_m_bar: 0.0015,
            min_initial_pressure_bar: 1.0,
            supply_temp_c: 80.0,
            return_temp_c: 50.0,
            default_diameter_m: 0.1,
            roughness_mm: 0.1,
            min_pipe_length_m: 1.0,
        }
    }
}

impl NetworkConfig {
    pub fn system_pressure(&self) -> Pressure {
        bar(self.system_pressure_bar)
    }

    pub fn pump_lift(&self) -> Pressure {
        bar(self.pump_lift_bar)
    }

    pub fn supply_temperature(&self) -> Temperature {
        celsius(self.supply_temp_c)
    }

    pub fn return_temperature(&self) -> Temperature {
        celsius(self.return_temp_c)
    }

    pub fn default_diameter(&self) -> Length {
        m(self.default_diameter_m)
    }

    pub fn roughness(&self) -> Length {
        mm(self.roughness_mm)
    }

    pub fn design_point(&self) -> DesignPoint {
        DesignPoint {
            supply_temp_k: self.supply_temperature().value,
            return_temp_k: self.return_temperature().value,
        }
    }

    fn supply_pressure(&self, distance_m: f64) -> f64 {
        (self.system_pressure_bar - self.pressure_drop_per_m_bar * distance_m)
            .max(self.min_initial_pressure_bar)
    }

    fn return_pressure(&self, distance_m: f64) -> f64 {
        (self.system_pressure_bar - self.pump_lift_bar + self.pressure_drop_per_m_bar * distance_m)
            .max(self.min_initial_pressure_bar)
    }
}

struct Assembly<'a> {
    b: NetworkBuilder,
    cfg: &'a NetworkConfig,
    design: DesignPoint,
    tol: f64,
}

impl Assembly<'_> {
    fn pair(
        &mut self,
        label: &str,
        kind: JunctionKind,
        position: Point,
        distance_m: f64,
        building_id: Option<&str>,
    ) -> (JunctionId, JunctionId) {
        let node_key = position.key(self.tol);
        let seeds = [
            (
                Circuit::Supply,
                self.cfg.supply_pressure(distance_m),
                self.design.supply_temp_k,
            ),
            (
                Circuit::Return,
                self.cfg.return_pressure(distance_m),
                self.design.return_temp_k,
            ),
        ];
        let [s, r] = seeds.map(|(circuit, p, t)| {
            self.b.add_junction(NewJunction {
                name: format!("{}_{}", label, circuit.as_str()),
                kind,
                circuit,
                position,
                node_key,
                initial_pressure_bar: p,
                temperature_k: t,
                building_id: building_id.map(str::to_string),
            })
        });
        (s, r)
    }

    /// Supply and return pipe sharing one pairing id, both oriented away
    /// from the plant.
    fn pipe_pair(
        &mut self,
        segment: String,
        role: PipeRole,
        from: (JunctionId, JunctionId),
        to: (JunctionId, JunctionId),
        length_m: f64,
        building_id: Option<&str>,
    ) {
        let pair = self.b.next_pair_id();
        let length_m = length_m.max(self.cfg.min_pipe_length_m);
        for (circuit, a, z) in [
            (Circuit::Supply, from.0, to.0),
            (Circuit::Return, from.1, to.1),
        ] {
            self.b.add_pipe(NewPipe {
                name: format!("{}_{}", segment, circuit.as_str()),
                segment: segment.clone(),
                from: a,
                to: z,
                role,
                circuit,
                length_m,
                diameter_m: self.cfg.default_diameter().value,
                roughness_m: self.cfg.roughness().value,
                pair: Some(pair),
                building_id: building_id.map(str::to_string),
            });
        }
    }
}

/// Build the simulatable network: plant boundary, trunk and service pipe
/// pairs, and one heat consumer per assigned building.
pub fn assemble_network(
    trunk: &Trunk,
    assignments: &[SpurAssignment],
    buildings: &[Building],
    plant: Point,
    cfg: &NetworkConfig,
    water: &WaterProps,
) -> NetworkResult<AssembledNetwork> {
    let tree = trunk.tree()?;
    let design = cfg.design_point();
    let mut a = Assembly {
        b: NetworkBuilder::new(design),
        cfg,
        design,
        tol: trunk.snap_tolerance,
    };

    let tee_keys: BTreeSet<NodeKey> = assignments
        .iter()
        .map(|s| {
            s.trunk_attach_node
                .unwrap_or_else(|| s.attach_point.key(trunk.snap_tolerance))
        })
        .collect();

    // Plant pair carries the pressure source and the circulation pump
    let plant_pair = a.pair("plant", JunctionKind::Plant, plant, 0.0, None);
    a.b.set_source(PressureSource {
        junction: plant_pair.0,
        pressure_bar: cfg.system_pressure_bar,
        temperature_k: design.supply_temp_k,
    });
    a.b.set_pump(CirculationPump {
        from: plant_pair.1,
        to: plant_pair.0,
        lift_bar: cfg.pump_lift_bar,
    });

    let plant_link_m = plant.distance(&trunk.root);
    let mut node_pairs: Vec<Option<(JunctionId, JunctionId)>> = vec![None; tree.node_count()];
    for &n in tree.bfs_order() {
        let kind = if tee_keys.contains(&tree.key(n)) {
            JunctionKind::Tee
        } else {
            JunctionKind::Trunk
        };
        let distance = plant_link_m + tree.depth_m(n);
        node_pairs[n] = Some(a.pair(&format!("node_{n}"), kind, tree.point(n), distance, None));
    }
    let root_pair = node_pairs[tree.root()].ok_or(NetworkError::Topology(
        dh_graph::TopologyError::RootNotInTrunk,
    ))?;
    a.pipe_pair(
        "plant".to_string(),
        PipeRole::Plant,
        plant_pair,
        root_pair,
        plant_link_m,
        None,
    );

    for &n in tree.bfs_order() {
        let Some((parent, ei)) = tree.parent(n) else {
            continue;
        };
        let (Some(from), Some(to)) = (node_pairs[parent], node_pairs[n]) else {
            continue;
        };
        a.pipe_pair(
            format!("trunk_{ei}"),
            PipeRole::Trunk,
            from,
            to,
            trunk.edges[ei].length_m,
            None,
        );
    }
    let unreached = tree.node_count() - tree.bfs_order().len();
    if unreached > 0 {
        warn!(unreached, "trunk nodes unreachable from root left out");
    }

    let loads: HashMap<&str, f64> = buildings
        .iter()
        .map(|b| (b.id.as_str(), b.design_load_kw))
        .collect();
    for s in assignments {
        let key = s
            .trunk_attach_node
            .unwrap_or_else(|| s.attach_point.key(trunk.snap_tolerance));
        let tee = tree
            .node_of(&key)
            .and_then(|n| node_pairs[n])
            .ok_or_else(|| NetworkError::DetachedService {
                building: s.building_id.clone(),
            })?;
        let tee_node = tree.node_of(&key).unwrap_or(tree.root());
        let distance = plant_link_m + tree.depth_m(tee_node) + s.distance_m;
        let bid = s.building_id.as_str();
        let consumer = a.pair(
            &format!("bldg_{bid}"),
            JunctionKind::Consumer,
            s.building_point,
            distance,
            Some(bid),
        );
        a.pipe_pair(
            format!("svc_{bid}"),
            PipeRole::Service,
            tee,
            consumer,
            s.distance_m,
            Some(bid),
        );

        let load_kw = loads.get(bid).copied().unwrap_or(0.0).max(0.0);
        let mdot = mass_flow_for_load(kw(load_kw), water.cp_j_per_kg_k, design.delta_t_k());
        a.b.add_consumer(bid, consumer.0, consumer.1, load_kw * 1000.0, mdot.value);
    }

    let net = a.b.build()?;
    info!(
        junctions = net.junctions().len(),
        pipes = net.pipes().len(),
        consumers = net.consumers().len(),
        "network assembled"
    );
    Ok(net)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_graph::{assign_spurs, split_trunk_at_spurs, SpurConfig, TrunkEdge};

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn sample() -> AssembledNetwork {
        let mut trunk = Trunk::new(p(0.0, 0.0), 0.01);
        trunk
            .edges
            .push(TrunkEdge::new(p(0.0, 0.0), p(100.0, 0.0), None, false));
        let buildings = vec![
            Building::new("A", p(30.0, 10.0), 50.0),
            Building::new("B", p(70.0, -10.0), 0.0),
        ];
        let mut spurs = assign_spurs(&trunk, &buildings, &SpurConfig::default());
        let split = split_trunk_at_spurs(&trunk, &mut spurs.assignments);
        assemble_network(
            &split.trunk,
            &spurs.assignments,
            &buildings,
            p(0.0, -5.0),
            &NetworkConfig::default(),
            &WaterProps::default(),
        )
        .unwrap()
    }

    #[test]
    fn element_counts() {
        let net = sample();
        // plant + 4 trunk nodes + 2 consumers, each a pair
        assert_eq!(net.junctions().len(), 14);
        // plant pair + 3 trunk pairs + 2 service pairs
        assert_eq!(net.pipes().len(), 12);
        assert_eq!(net.consumers().len(), 2);
    }

    #[test]
    fn config_quantities_are_si() {
        let cfg = NetworkConfig::default();
        assert!((cfg.system_pressure().value - 600_000.0).abs() < 1e-6);
        assert!((cfg.pump_lift().value - 300_000.0).abs() < 1e-6);
        assert!((cfg.default_diameter().value - 0.1).abs() < 1e-15);
        let d = cfg.design_point();
        assert!((d.supply_temp_k - 353.15).abs() < 1e-9);
        assert!((d.delta_t_k() - 30.0).abs() < 1e-9);

        let net = sample();
        assert!(net.pipes().iter().all(|p| (p.roughness_m - 1e-4).abs() < 1e-15));
    }

    #[test]
    fn pairs_share_ids_and_orientation() {
        let net = sample();
        for p in net.pipes() {
            let other = net.pipe(net.counterpart(p.id).unwrap()).unwrap();
            assert_ne!(p.circuit, other.circuit);
            assert_eq!(p.segment, other.segment);
            let (a, b) = (net.junction(p.from).unwrap(), net.junction(other.from).unwrap());
            assert_eq!(a.node_key, b.node_key);
        }
    }

    #[test]
    fn zero_load_consumer_has_zero_flow() {
        let net = sample();
        let b = net
            .consumers()
            .iter()
            .find(|c| c.building_id == "B")
            .unwrap();
        assert_eq!(b.mdot_kg_s, 0.0);
        let a = net
            .consumers()
            .iter()
            .find(|c| c.building_id == "A")
            .unwrap();
        assert!((a.mdot_kg_s - 50_000.0 / (4190.0 * 30.0)).abs() < 1e-9);
    }

    #[test]
    fn initial_pressures_follow_distance() {
        let net = sample();
        let cfg = NetworkConfig::default();
        for j in net.junctions() {
            assert!(j.initial_pressure_bar >= cfg.min_initial_pressure_bar);
            if j.kind == JunctionKind::Plant && j.circuit == Circuit::Supply {
                assert_eq!(j.initial_pressure_bar, cfg.system_pressure_bar);
            }
        }
        let far = net
            .junctions()
            .iter()
            .filter(|j| j.circuit == Circuit::Supply)
            .map(|j| j.initial_pressure_bar)
            .fold(f64::INFINITY, f64::min);
        assert!(far < cfg.system_pressure_bar);
    }

    #[test]
    fn consumer_and_tee_degrees() {
        let net = sample();
        for j in net.junctions() {
            match j.kind {
                JunctionKind::Consumer => assert_eq!(net.degree(j.id, false), 2),
                JunctionKind::Tee => {
                    let services = net
                        .incident_pipes(j.id)
                        .filter(|p| p.role == PipeRole::Service)
                        .count();
                    assert_eq!(services, 1);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn detached_service_rejected() {
        let trunk = Trunk::new(p(0.0, 0.0), 0.01);
        let stray = SpurAssignment {
            building_id: "X".into(),
            edge: None,
            attach_point: p(500.0, 500.0),
            building_point: p(505.0, 500.0),
            distance_m: 5.0,
            position: 0.0,
            trunk_attach_node: None,
        };
        let err = assemble_network(
            &trunk,
            &[stray],
            &[Building::new("X", p(505.0, 500.0), 10.0)],
            p(0.0, 0.0),
            &NetworkConfig::default(),
            &WaterProps::default(),
        )
        .unwrap_err();
        assert!(matches!(err, NetworkError::DetachedService { .. }));
    }
}
