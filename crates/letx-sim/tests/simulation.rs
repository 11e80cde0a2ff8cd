//! End-to-end runs of the simulation.

use letx_core::etx::ETX_MAX;
use letx_core::metric::is_unreachable;
use letx_sim::config::SimConfig;
use letx_sim::network::Simulation;

fn run(cfg: SimConfig) -> serde_json::Value {
    let report = Simulation::new(cfg).run();
    serde_json::to_value(&report).unwrap()
}

#[test]
fn same_seed_same_report() {
    let cfg = SimConfig {
        seed: 17,
        nodes: 6,
        steps: 40,
        ..Default::default()
    };
    assert_eq!(run(cfg.clone()), run(cfg));
}

#[test]
fn different_seeds_diverge() {
    let base = SimConfig {
        nodes: 6,
        steps: 20,
        ..Default::default()
    };
    let a = run(SimConfig { seed: 1, ..base.clone() });
    let b = run(SimConfig { seed: 2, ..base });
    assert_ne!(a, b);
}

#[test]
fn dense_static_cluster_builds_routes() {
    // Everyone within a few units of each other and not moving: links are
    // near-perfect and LET is the static lifetime.
    let cfg = SimConfig {
        seed: 5,
        nodes: 3,
        steps: 30,
        arena: 5.0,
        max_speed: 0.0,
        base_delivery: 1.0,
        ..Default::default()
    };
    let report = Simulation::new(cfg).run();

    for node in &report.nodes {
        assert_eq!(node.summary.neighbors, 2, "node {}", node.address);
        assert_eq!(node.summary.usable, 2);
        assert_eq!(node.valid_routes, 2);
        assert_eq!(node.expiring_links(), 0);
        for n in &node.neighbors {
            assert!(n.etx >= 10_000 && n.etx != ETX_MAX, "etx {}", n.etx);
            assert_eq!(n.let_s, 1000.0);
            assert_eq!(n.hybrid, n.etx);
        }
    }
    let last = report.steps.last().unwrap();
    assert_eq!(last.usable_links, 6);
    assert_eq!(last.routes_invalidated, 0);
}

#[test]
fn report_json_shape() {
    let cfg = SimConfig {
        nodes: 2,
        steps: 3,
        ..Default::default()
    };
    let json = run(cfg);
    assert_eq!(json["seed"], 1);
    assert_eq!(json["steps"].as_array().unwrap().len(), 3);
    assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
    assert!(json["nodes"][0]["summary"]["neighbors"].is_u64());
}

#[test]
fn unusable_links_are_never_routed() {
    let cfg = SimConfig {
        seed: 23,
        nodes: 10,
        steps: 50,
        arena: 400.0,
        max_speed: 30.0,
        ..Default::default()
    };
    let mut sim = Simulation::new(cfg);
    for _ in 0..50 {
        sim.step();
    }
    for node in sim.nodes() {
        for route in node.routes.iter() {
            let metric = node.neighbors.hybrid_metric(route.destination, &node.kinematics);
            if is_unreachable(metric) {
                assert!(node.routes.lookup_valid_route(route.destination).is_none());
            }
        }
    }
}
