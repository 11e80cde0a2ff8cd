//! # Simulation Driver
//!
//! Broadcast medium and step loop. Each step is one probe period:
//!
//! 1. nodes move (from the second step on),
//! 2. every node encodes its link probe,
//! 3. every other node within range decodes it with probability
//!    `base_delivery * (1 - distance / range)`,
//! 4. every table rotates,
//! 5. every node refreshes its one-hop routes from the hybrid metric.
//!
//! Between steps the routing tables agree with the neighbor tables.

use std::time::Duration;

use bytes::Bytes;
use letx_core::metric::is_unreachable;
use letx_core::stats::TableSummary;
use rand::rngs::StdRng;
use rand::RngExt as _;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::mobility::RandomWalk;
use crate::node::SimNode;
use crate::report::{NodeReport, SimReport, StepRecord};

#[derive(Debug)]
pub struct Simulation {
    cfg: SimConfig,
    rng: StdRng,
    walk: RandomWalk,
    nodes: Vec<SimNode>,
    step: u64,
}

impl Simulation {
    pub fn new(cfg: SimConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let walk = RandomWalk::new(cfg.arena, cfg.max_speed);
        let nodes = (0..cfg.nodes)
            .map(|i| SimNode::new(i, walk.spawn(&mut rng), &cfg.engine))
            .collect();
        Self {
            cfg,
            rng,
            walk,
            nodes,
            step: 0,
        }
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    /// Simulated time at the end of the current step.
    pub fn now(&self) -> Duration {
        self.cfg.engine.probe_interval.mul_f64(self.step as f64)
    }

    /// Chance that a probe crosses `distance`; zero at or beyond range.
    pub fn delivery_probability(&self, distance: f64) -> f64 {
        let range = self.cfg.engine.transmission_range;
        if distance >= range {
            return 0.0;
        }
        self.cfg.base_delivery * (1.0 - distance / range)
    }

    /// Run one probe period.
    pub fn step(&mut self) -> StepRecord {
        self.step += 1;
        let mut record = StepRecord {
            step: self.step,
            ..Default::default()
        };

        if self.step > 1 {
            let dt = self.cfg.engine.probe_interval.as_secs_f64();
            for node in &mut self.nodes {
                node.kinematics = self.walk.step(&mut self.rng, &node.kinematics, dt);
            }
        }

        let frames: Vec<Bytes> = self.nodes.iter_mut().map(SimNode::probe).collect();
        for (from, frame) in frames.iter().enumerate() {
            for to in 0..self.nodes.len() {
                if from == to {
                    continue;
                }
                let distance = self.nodes[from]
                    .kinematics
                    .distance_to(&self.nodes[to].kinematics);
                let p = self.delivery_probability(distance);
                let sender = self.nodes[from].addr;
                if p > 0.0
                    && self.rng.random::<f64>() < p
                    && self.nodes[to].receive(sender, frame.clone())
                {
                    record.deliveries += 1;
                }
            }
        }

        for node in &mut self.nodes {
            node.rotate();
        }

        let now = self.now();
        for node in &mut self.nodes {
            let refresh = node.refresh_routes(now);
            record.routes_stored += refresh.stored;
            record.routes_invalidated += refresh.invalidated;
        }

        for node in &self.nodes {
            for report in node.neighbors.reports(&node.kinematics) {
                if report.is_usable() {
                    record.usable_links += 1;
                } else if !is_unreachable(report.etx) {
                    record.expiring_links += 1;
                }
            }
        }

        debug!(
            step = record.step,
            deliveries = record.deliveries,
            usable = record.usable_links,
            expiring = record.expiring_links,
            "step complete"
        );
        record
    }

    /// Run every configured step and collect the report.
    pub fn run(&mut self) -> SimReport {
        info!(
            seed = self.cfg.seed,
            nodes = self.cfg.nodes,
            steps = self.cfg.steps,
            range = self.cfg.engine.transmission_range,
            "simulation starting"
        );
        let steps = (0..self.cfg.steps).map(|_| self.step()).collect();
        let report = SimReport {
            seed: self.cfg.seed,
            steps,
            nodes: self.node_reports(),
        };
        info!(deliveries = report.total_deliveries(), "simulation finished");
        report
    }

    pub fn node_reports(&self) -> Vec<NodeReport> {
        let now = self.now();
        self.nodes
            .iter()
            .map(|node| {
                let neighbors = node.neighbors.reports(&node.kinematics);
                NodeReport {
                    address: node.addr,
                    kinematics: node.kinematics,
                    summary: TableSummary::from_reports(&neighbors),
                    valid_routes: node.valid_routes(now),
                    neighbors,
                }
            })
            .collect()
    }
}
