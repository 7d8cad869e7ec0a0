use dh_core::{Building, Point, WaterProps};
use dh_graph::{assign_spurs, split_trunk_at_spurs, SpurConfig, Trunk, TrunkEdge};
use dh_kpi::*;
use dh_network::*;

fn network() -> AssembledNetwork {
    let mut trunk = Trunk::new(Point::new(0.0, 0.0), 0.01);
    trunk.edges.push(TrunkEdge::new(
        Point::new(0.0, 0.0),
        Point::new(120.0, 0.0),
        None,
        false,
    ));
    let buildings = vec![
        Building::new("A", Point::new(40.0, 12.0), 100.0),
        Building::new("B", Point::new(100.0, -20.0), 60.0),
    ];
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

/// Uniform results: `v` m/s everywhere, 0.1 bar/100 m, 0.2 K drop per pipe.
fn solved(v: f64, mdot: f64, heat_loss_w: Option<f64>) -> AssembledNetwork {
    let mut net = network();
    let out = SolverOutput {
        junctions: net
            .junctions()
            .iter()
            .map(|j| JunctionResult {
                p_bar: 3.0,
                t_k: match j.circuit {
                    Circuit::Supply => 352.0,
                    Circuit::Return => 323.0,
                },
            })
            .collect(),
        pipes: net
            .pipes()
            .iter()
            .map(|p| PipeResult {
                mdot_kg_s: mdot,
                v_mean_m_s: v,
                p_from_bar: 3.0 + 0.1 * p.length_m / 100.0,
                p_to_bar: 3.0,
                t_from_k: 350.2,
                t_to_k: 350.0,
                heat_loss_w,
            })
            .collect(),
        consumers: Vec::new(),
        pump: Some(PumpResult {
            mdot_kg_s: 1.27,
            deltap_bar: 2.0,
        }),
    };
    net.apply_results(out).unwrap();
    net
}

#[test]
fn unconverged_network_is_rejected() {
    let net = network();
    let err = extract_kpis(
        &net,
        &KpiContext::new("c1"),
        &KpiConfig::default(),
        &WaterProps::default(),
    )
    .unwrap_err();
    assert_eq!(err, KpiError::NotConverged);
}

#[test]
fn missing_pipe_result_is_rejected() {
    let net = solved(0.5, 0.4, None);
    let mut json = serde_json::to_value(&net).unwrap();
    json["pipes"][0]["result"] = serde_json::Value::Null;
    let broken: AssembledNetwork = serde_json::from_value(json).unwrap();
    assert!(matches!(
        extract_kpis(
            &broken,
            &KpiContext::new("c1"),
            &KpiConfig::default(),
            &WaterProps::default()
        ),
        Err(KpiError::MissingResults { what: "pipe", .. })
    ));
}

#[test]
fn report_uses_stable_field_names() {
    let net = solved(0.5, 0.4, None);
    let ctx = KpiContext {
        cluster_id: "cluster_7".into(),
        design_hour: Some("2023-01-15T07:00".into()),
        ..KpiContext::default()
    };
    let report = extract_kpis(&net, &ctx, &KpiConfig::default(), &WaterProps::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    for key in [
        "cluster_id",
        "design_hour",
        "aggregate",
        "hydraulics",
        "thermal",
        "losses",
        "pump",
        "en13941_compliance",
        "diagnostics",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert!(json.get("detailed").is_none());
    assert_eq!(json["cluster_id"], "cluster_7");
    let compliance = &json["en13941_compliance"];
    for key in ["feasible", "reasons", "warnings"] {
        assert!(compliance.get(key).is_some(), "missing {key}");
    }
    assert_eq!(compliance["feasible"], true);
    assert!(json["hydraulics"]["velocity_m_s"].get("p95").is_some());
}

#[test]
fn compliant_network_figures() {
    let net = solved(0.5, 0.4, None);
    let r = extract_kpis(
        &net,
        &KpiContext::new("c1"),
        &KpiConfig::default(),
        &WaterProps::default(),
    )
    .unwrap();

    assert_eq!(r.aggregate.buildings_served, 2);
    assert!((r.aggregate.total_heat_demand_kw - 160.0).abs() < 1e-9);
    assert_eq!(r.hydraulics.velocity_share_within_limit, 1.0);
    assert!((r.hydraulics.dp_bar_per_100m.max - 0.1).abs() < 1e-9);
    assert!((r.thermal.plant_supply_temp_c - (352.0 - 273.15)).abs() < 1e-9);
    assert!((r.thermal.max_supply_temp_drop_k).abs() < 1e-9);

    // enthalpy balance: 0.4 kg/s · cp · 0.2 K per pipe
    let per_pipe = 0.4 * 4190.0 * 0.2;
    let n = net.pipes().len();
    assert_eq!(r.diagnostics.loss_sources.enthalpy_balance, n);
    assert!((r.losses.total_loss_kw - per_pipe * n as f64 / 1000.0).abs() < 1e-6);

    // pump: 1.27 kg/s at 2 bar
    let hyd_kw = 1.27 / 977.8 * 2.0e5 / 1000.0;
    assert!((r.pump.hydraulic_power_kw - hyd_kw).abs() < 1e-9);
    assert!((r.pump.electrical_power_kw - hyd_kw / 0.7).abs() < 1e-9);

    let c = &r.en13941_compliance;
    assert!(c.feasible && c.velocity_ok && c.dp_ok);
    assert!(c.reasons.is_empty());
}

#[test]
fn fast_pipes_fail_velocity_criterion() {
    let net = solved(2.0, 0.4, None);
    let r = extract_kpis(
        &net,
        &KpiContext::new("c1"),
        &KpiConfig::default(),
        &WaterProps::default(),
    )
    .unwrap();
    let c = &r.en13941_compliance;
    assert!(!c.feasible);
    assert!(!c.velocity_ok);
    assert!(c.dp_ok);
    assert_eq!(c.reasons, vec![ReasonCode::VelocityShareBelowThreshold]);
    let json = serde_json::to_value(c).unwrap();
    assert_eq!(json["reasons"][0], "velocity_share_below_threshold");
}

#[test]
fn steep_gradient_fails_pressure_criterion() {
    let net = solved(0.5, 0.4, None);
    let cfg = KpiConfig {
        max_dp_bar_per_100m: 0.05,
        ..KpiConfig::default()
    };
    let r = extract_kpis(&net, &KpiContext::new("c1"), &cfg, &WaterProps::default()).unwrap();
    assert_eq!(
        r.en13941_compliance.reasons,
        vec![ReasonCode::PressureDropAboveCeiling]
    );
}

#[test]
fn solver_heat_loss_takes_priority() {
    let net = solved(0.5, 0.4, Some(250.0));
    let r = extract_kpis(
        &net,
        &KpiContext::new("c1"),
        &KpiConfig::default(),
        &WaterProps::default(),
    )
    .unwrap();
    let n = net.pipes().len();
    assert_eq!(r.diagnostics.loss_sources.solver_reported, n);
    assert!((r.losses.total_loss_kw - 0.25 * n as f64).abs() < 1e-9);
}

#[test]
fn stagnant_pipes_fall_back_to_u_value() {
    let mut net = network();
    let ids: Vec<_> = net.pipes().iter().map(|p| p.id).collect();
    for id in ids {
        net.apply_heat_loss(
            id,
            PipeThermal {
                u_w_per_m2k: 0.5,
                text_k: 283.15,
                loss_area_per_m: 0.2,
            },
        )
        .unwrap();
    }
    let out = SolverOutput {
        junctions: vec![JunctionResult { p_bar: 3.0, t_k: 350.0 }; net.junctions().len()],
        pipes: vec![
            PipeResult {
                mdot_kg_s: 0.0,
                v_mean_m_s: 0.0,
                p_from_bar: 3.0,
                p_to_bar: 3.0,
                t_from_k: 350.0,
                t_to_k: 350.0,
                heat_loss_w: None,
            };
            net.pipes().len()
        ],
        consumers: Vec::new(),
        pump: None,
    };
    net.apply_results(out).unwrap();

    let r = extract_kpis(
        &net,
        &KpiContext::new("c1"),
        &KpiConfig::default(),
        &WaterProps::default(),
    )
    .unwrap();
    assert_eq!(r.diagnostics.loss_sources.u_value, net.pipes().len());
    let total_len: f64 = net.pipes().iter().map(|p| p.length_m).sum();
    let expected_kw = 0.5 * 0.2 * total_len * (350.0 - 283.15) / 1000.0;
    assert!((r.losses.total_loss_kw - expected_kw).abs() < 1e-9);
    // no pump result: design flow at configured lift
    assert_eq!(r.pump.deltap_bar, net.pump().lift_bar);
}

#[test]
fn planning_warnings_and_details_are_carried() {
    let net = solved(1.4, 0.4, None);
    let ctx = KpiContext {
        cluster_id: "c1".into(),
        planning_warnings: vec!["building X skipped: no trunk within 50 m".into()],
        notes: vec!["1 building excluded".into()],
        ..KpiContext::default()
    };
    let cfg = KpiConfig {
        detailed: true,
        ..KpiConfig::default()
    };
    let r = extract_kpis(&net, &ctx, &cfg, &WaterProps::default()).unwrap();
    let w = &r.en13941_compliance.warnings;
    assert!(w.iter().any(|m| m.contains("close to the")));
    assert_eq!(w.last().unwrap(), "building X skipped: no trunk within 50 m");
    assert_eq!(r.diagnostics.notes, vec!["1 building excluded"]);

    let d = r.detailed.unwrap();
    assert_eq!(d.pipes.len(), net.pipes().len());
    assert_eq!(d.junctions.len(), net.junctions().len());
    assert_eq!(d.consumers.len(), 2);
    assert!(d.pipes.iter().any(|p| p.role == "service"));
}
