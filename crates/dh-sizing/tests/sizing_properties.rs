use dh_core::{Building, Point, WaterProps};
use dh_graph::{assign_spurs, split_trunk_at_spurs, SpurConfig, Trunk, TrunkEdge};
use dh_network::{assemble_network, AssembledNetwork, NetworkConfig, PipeRole};
use dh_sizing::{size_network, PipeCatalog, SizingConfig, SizingMode, SizingStatus};
use proptest::prelude::*;

/// Straight trunk from the origin with one building per 40 m.
fn chain(loads_kw: &[f64]) -> AssembledNetwork {
    let len = 40.0 * (loads_kw.len() as f64 + 1.0);
    let mut trunk = Trunk::new(Point::new(0.0, 0.0), 0.01);
    trunk.edges.push(TrunkEdge::new(
        Point::new(0.0, 0.0),
        Point::new(len, 0.0),
        None,
        false,
    ));
    let buildings: Vec<_> = loads_kw
        .iter()
        .enumerate()
        .map(|(i, &kw)| Building::new(format!("B{i}"), Point::new(40.0 * (i as f64 + 1.0), 10.0), kw))
        .collect();
    let mut spurs = assign_spurs(&trunk, &buildings, &SpurConfig::default());
    let split = split_trunk_at_spurs(&trunk, &mut spurs.assignments);
    assemble_network(
        &split.trunk,
        &spurs.assignments,
        &buildings,
        Point::new(0.0, 0.0),
        &NetworkConfig::default(),
        &WaterProps::default(),
    )
    .unwrap()
}

#[test]
fn records_ordered_plant_trunk_service() {
    let mut net = chain(&[100.0, 200.0, 50.0]);
    let report = size_network(
        &mut net,
        &PipeCatalog::default(),
        &SizingConfig::default(),
        &WaterProps::default(),
    )
    .unwrap();

    let roles: Vec<_> = report.records.iter().map(|r| r.role).collect();
    let first_service = roles.iter().position(|&r| r == PipeRole::Service).unwrap();
    assert_eq!(roles[0], PipeRole::Plant);
    assert!(roles[1..first_service].iter().all(|&r| r == PipeRole::Trunk));
    assert!(roles[first_service..].iter().all(|&r| r == PipeRole::Service));

    let services: Vec<_> = report
        .records_with_role(PipeRole::Service)
        .map(|r| r.building_id.clone().unwrap())
        .collect();
    assert_eq!(services, vec!["B0", "B1", "B2"]);

    // plant link carries everything
    assert!((report.records[0].design_load_kw - 350.0).abs() < 1e-9);
    assert!(report.total_cost.unwrap() > 0.0);
}

#[test]
fn return_pipes_receive_supply_size() {
    let mut net = chain(&[120.0, 80.0]);
    size_network(
        &mut net,
        &PipeCatalog::default(),
        &SizingConfig::default(),
        &WaterProps::default(),
    )
    .unwrap();
    for p in net.pipes() {
        let other = net.pipe(net.counterpart(p.id).unwrap()).unwrap();
        assert_eq!(p.dn, other.dn);
        assert!(p.dn.is_some());
    }
}

#[test]
fn zero_load_gives_zero_flow_and_ok() {
    let mut net = chain(&[0.0, 0.0]);
    let report = size_network(
        &mut net,
        &PipeCatalog::default(),
        &SizingConfig::default(),
        &WaterProps::default(),
    )
    .unwrap();
    for r in &report.records {
        assert_eq!(r.design_flow_kg_s, 0.0);
        assert_eq!(r.velocity_m_s, 0.0);
        assert_eq!(r.pressure_gradient_pa_per_m, 0.0);
        assert!(!r.velocity_m_s.is_nan());
        assert_eq!(r.status, SizingStatus::Ok);
    }
}

#[test]
fn eco_mode_never_smaller() {
    let loads = [300.0, 250.0, 400.0, 150.0];
    let mut std_net = chain(&loads);
    let mut eco_net = chain(&loads);
    let water = WaterProps::default();
    let std = size_network(&mut std_net, &PipeCatalog::default(), &SizingConfig::default(), &water)
        .unwrap();
    let eco_cfg = SizingConfig {
        mode: SizingMode::Eco,
        ..SizingConfig::default()
    };
    let eco = size_network(&mut eco_net, &PipeCatalog::default(), &eco_cfg, &water).unwrap();
    for (s, e) in std.records.iter().zip(&eco.records) {
        assert_eq!(s.identifier, e.identifier);
        assert!(e.dn >= s.dn);
    }
}

proptest! {
    #[test]
    fn trunk_sizes_shrink_away_from_plant(
        loads in prop::collection::vec(1.0f64..2000.0, 2..7),
    ) {
        let mut net = chain(&loads);
        let report = size_network(
            &mut net,
            &PipeCatalog::default(),
            &SizingConfig::default(),
            &WaterProps::default(),
        )
        .unwrap();

        let trunk: Vec<_> = report.records_with_role(PipeRole::Trunk).collect();
        for w in trunk.windows(2) {
            prop_assert!(w[0].design_load_kw >= w[1].design_load_kw);
            prop_assert!(w[0].dn >= w[1].dn);
        }
        let plant = &report.records[0];
        prop_assert!(plant.dn >= trunk[0].dn);
    }
}
