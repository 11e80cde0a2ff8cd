//! JSON-serializable simulation output.

use std::net::Ipv4Addr;

use letx_core::kinematics::Kinematics;
use letx_core::metric::is_unreachable;
use letx_core::stats::{NeighborReport, TableSummary};
use serde::Serialize;

/// Counters for one probe period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepRecord {
    pub step: u64,
    /// Probes delivered across all node pairs.
    pub deliveries: usize,
    /// Neighbor relations with a usable hybrid metric.
    pub usable_links: usize,
    /// Links whose ETX was usable but LET forced the sentinel.
    pub expiring_links: usize,
    pub routes_stored: usize,
    pub routes_invalidated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub address: Ipv4Addr,
    pub kinematics: Kinematics,
    pub summary: TableSummary,
    pub valid_routes: usize,
    pub neighbors: Vec<NeighborReport>,
}

impl NodeReport {
    pub fn expiring_links(&self) -> usize {
        self.neighbors
            .iter()
            .filter(|n| !is_unreachable(n.etx) && is_unreachable(n.hybrid))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimReport {
    pub seed: u64,
    pub steps: Vec<StepRecord>,
    pub nodes: Vec<NodeReport>,
}

impl SimReport {
    pub fn total_deliveries(&self) -> usize {
        self.steps.iter().map(|s| s.deliveries).sum()
    }
}
