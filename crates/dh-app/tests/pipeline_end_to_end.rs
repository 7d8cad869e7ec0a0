use dh_app::*;
use dh_core::{Building, Point, StreetLine};
use dh_network::{
    AssembledNetwork, Circuit, JunctionResult, PipeResult, PipeRole, SolverOutput,
};
use dh_project::{ClusterDef, ProjectFile};
use dh_solver::{Solver, SolverError};

/// Straight street along y = 0 with nodes every 100 m, plant at the west end.
fn project() -> ProjectFile {
    let mut p = ProjectFile::new("end_to_end");
    p.streets.push(StreetLine::new(
        Some("Main"),
        vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(300.0, 0.0),
        ],
    ));
    p.clusters.push(ClusterDef {
        id: "main".to_string(),
        plant: Point::new(0.0, 0.0),
        design_hour: Some("2023-01-15T07:00".to_string()),
        buildings: vec![
            Building::new("A", Point::new(60.0, 20.0), 80.0),
            Building::new("B", Point::new(160.0, -20.0), 60.0),
            Building::new("C", Point::new(260.0, 20.0), 40.0),
            Building::new("far", Point::new(150.0, 80.0), 30.0),
        ],
    });
    p
}

fn plan(project: &ProjectFile) -> ClusterPlan {
    let catalog = project.pipe_catalog().unwrap();
    plan_cluster(&PlanInput {
        streets: &project.streets,
        cluster: &project.clusters[0],
        catalog: &catalog,
        config: &project.config,
    })
    .unwrap()
}

/// Uniform converged results at 3 bar.
struct FlatSolver {
    calls: usize,
}

impl Solver for FlatSolver {
    fn name(&self) -> &str {
        "flat"
    }

    fn solve(&mut self, net: &AssembledNetwork) -> Result<SolverOutput, SolverError> {
        self.calls += 1;
        Ok(SolverOutput {
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
                .map(|_| PipeResult {
                    mdot_kg_s: 0.3,
                    v_mean_m_s: 0.5,
                    p_from_bar: 3.0,
                    p_to_bar: 3.0,
                    t_from_k: 350.1,
                    t_to_k: 350.0,
                    heat_loss_w: None,
                })
                .collect(),
            consumers: Vec::new(),
            pump: None,
        })
    }
}

struct DivergingSolver;

impl Solver for DivergingSolver {
    fn solve(&mut self, _net: &AssembledNetwork) -> Result<SolverOutput, SolverError> {
        Err(SolverError::NonConvergence {
            what: "residual stalled".into(),
        })
    }
}

#[test]
fn far_building_is_skipped_and_reported() {
    let project = project();
    let plan = plan(&project);

    assert_eq!(plan.stats.buildings_connected, 3);
    assert_eq!(plan.stats.buildings_skipped, 1);
    assert_eq!(plan.skipped[0].building_id, "far");
    assert!(plan.planning_warnings()[0].contains("far"));
    assert!(plan
        .network
        .consumers()
        .iter()
        .all(|c| c.building_id != "far"));
    assert!(plan
        .sizing
        .records
        .iter()
        .all(|r| r.building_id.as_deref() != Some("far")));
}

#[test]
fn chain_is_split_sized_and_parameterized() {
    let plan = plan(&project());

    // tees at x = 60, 160, 260 inside street segments; the skipped building's
    // street point at x = 150 lies on the way and is kept, the street beyond
    // x = 260 is never reached
    assert_eq!(plan.stats.internal_tees, 3);
    assert_eq!(plan.stats.pruned_edges, 0);
    assert_eq!(plan.trunk.edges.len(), 6);
    assert!(plan.trunk.tree().is_ok());

    let services: Vec<_> = plan.sizing.records_with_role(PipeRole::Service).collect();
    assert_eq!(services.len(), 3);
    let trunk: Vec<_> = plan.sizing.records_with_role(PipeRole::Trunk).collect();
    assert_eq!(trunk.len(), 6);
    for w in trunk.windows(2) {
        assert!(w[0].design_load_kw >= w[1].design_load_kw - 1e-9);
        assert!(w[0].dn >= w[1].dn);
    }

    assert!(plan.network.pipes().iter().all(|p| p.dn.is_some()));
    assert_eq!(plan.thermal.pipes, plan.network.pipes().len());
    assert!(plan
        .network
        .pipes()
        .iter()
        .all(|p| p.thermal.u_w_per_m2k > 0.0));
}

#[test]
fn short_street_with_root_tee() {
    let mut p = ProjectFile::new("short");
    p.streets.push(StreetLine::new(
        None,
        vec![Point::new(0.0, 0.0), Point::new(200.0, 0.0)],
    ));
    p.clusters.push(ClusterDef {
        id: "short".to_string(),
        plant: Point::new(0.0, 0.0),
        design_hour: None,
        buildings: vec![
            Building::new("A", Point::new(60.0, 15.0), 80.0),
            Building::new("B", Point::new(140.0, -15.0), 60.0),
            Building::new("C", Point::new(-10.0, 10.0), 40.0),
        ],
    });
    let plan = plan(&p);

    assert_eq!(plan.stats.buildings_connected, 3);
    assert_eq!(plan.stats.internal_tees, 2);
    assert_eq!(plan.stats.pruned_edges, 0);
    assert_eq!(plan.trunk.edges.len(), 2);

    let trunk: Vec<_> = plan.sizing.records_with_role(PipeRole::Trunk).collect();
    assert_eq!(trunk.len(), 2);
    assert!((trunk[0].design_load_kw - 140.0 * p.config.sizing.design_margin).abs() < 1e-6);
    assert!(trunk[0].dn >= trunk[1].dn);
}

#[test]
fn building_beside_long_segment_is_connected() {
    let mut p = ProjectFile::new("sparse");
    p.streets.push(StreetLine::new(
        Some("Long"),
        vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(200.0, 0.0),
        ],
    ));
    p.clusters.push(ClusterDef {
        id: "sparse".to_string(),
        plant: Point::new(0.0, 0.0),
        design_hour: None,
        buildings: vec![
            Building::new("near", Point::new(20.0, 10.0), 30.0),
            // 48 m off the street, more than 65 m from either street vertex
            Building::new("mid", Point::new(145.0, 48.0), 50.0),
        ],
    });
    let plan = plan(&p);

    assert_eq!(plan.stats.buildings_connected, 2);
    assert!(plan.skipped.is_empty());
    assert_eq!(plan.stats.internal_tees, 2);

    let service = plan
        .network
        .pipes_with_role(PipeRole::Service)
        .find(|p| p.building_id.as_deref() == Some("mid"))
        .unwrap();
    assert!((service.length_m - 48.0).abs() < 1e-9);
    let tee = plan.network.junction(service.from).unwrap();
    assert!((tee.position.x - 145.0).abs() < 1e-9 && tee.position.y.abs() < 1e-9);
    assert!(tee.position.x > 100.0 && tee.position.x < 200.0);
    assert!((plan.trunk.total_length_m() - 145.0).abs() < 1e-9);
}

#[test]
fn converged_simulation_yields_report() {
    let project = project();
    let mut plan = plan(&project);
    let mut solver = FlatSolver { calls: 0 };
    let sim = simulate_cluster(&mut plan, &mut solver, &project.config).unwrap();

    assert!(sim.outcome.converged);
    assert_eq!(solver.calls, 1);
    let report = sim.into_report().unwrap();
    assert_eq!(report.cluster_id, "main");
    assert_eq!(report.design_hour.as_deref(), Some("2023-01-15T07:00"));
    assert_eq!(report.aggregate.buildings_served, 3);
    assert!((report.aggregate.total_heat_demand_kw - 180.0).abs() < 1e-9);
    assert!(report.en13941_compliance.feasible);
    assert!(report
        .en13941_compliance
        .warnings
        .iter()
        .any(|w| w.contains("building far")));
}

#[test]
fn diverging_solver_surfaces_non_convergence() {
    let project = project();
    let mut plan = plan(&project);
    let sim = simulate_cluster(&mut plan, &mut DivergingSolver, &project.config).unwrap();

    assert!(!sim.outcome.converged);
    assert!(sim.report.is_none());
    assert!(sim.outcome.solver_calls >= 1);
    let err = sim.into_report().unwrap_err();
    assert_eq!(err.kind(), FailureKind::Solver);
    assert!(matches!(err, AppError::NonConvergence { .. }));
}

#[test]
fn batch_reports_each_cluster() {
    let mut project = project();
    project.clusters.push(ClusterDef {
        id: "stranded".to_string(),
        plant: Point::new(0.0, 0.0),
        design_hour: None,
        buildings: vec![Building::new("S1", Point::new(200.0, 400.0), 10.0)],
    });

    let items = plan_batch(&project, None).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].cluster_id, "main");
    assert!(items[0].result.is_ok());
    assert_eq!(items[1].cluster_id, "stranded");
    let err = items[1].result.as_ref().unwrap_err();
    assert_eq!(err.kind(), FailureKind::Topology);

    let only = plan_batch(&project, Some("main")).unwrap();
    assert_eq!(only.len(), 1);
    assert!(matches!(
        plan_batch(&project, Some("nope")),
        Err(AppError::ClusterNotFound(_))
    ));
}

#[test]
fn plan_store_roundtrip() {
    let project = project();
    let plan = plan(&project);
    let catalog = project.pipe_catalog().unwrap();
    let hash = config_hash(&project.config, &catalog);

    let root = std::env::temp_dir().join(format!("dh_app_store_{}", std::process::id()));
    let store = PlanStore::new(root.clone()).unwrap();
    let manifest = PlanManifest::new(&plan, &project.name, &hash, &project.config.crs);
    store.save_plan(&manifest, &plan).unwrap();

    assert!(store.has_plan("main"));
    let loaded = store.load_manifest("main").unwrap();
    assert_eq!(loaded, manifest);
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(chrono::DateTime::parse_from_rfc3339(&loaded.timestamp).is_ok());
    assert_eq!(loaded.tool_version, TOOL_VERSION);
    assert_eq!(store.load_network("main").unwrap(), plan.network);
    assert_eq!(store.load_sizing("main").unwrap(), plan.sizing);
    assert!(matches!(
        store.load_report("main"),
        Err(AppError::Results(_))
    ));
    assert_eq!(store.list_plans().unwrap().len(), 1);

    let network = read_network(&store.cluster_dir("main").join("network.json")).unwrap();
    assert_eq!(network.pipes().len(), plan.network.pipes().len());

    let _ = std::fs::remove_dir_all(root);
}
