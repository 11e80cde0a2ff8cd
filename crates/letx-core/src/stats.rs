//! # Neighbor Reports
//!
//! Serializable per-neighbor snapshots for logging and JSON export.

use std::net::Ipv4Addr;

use serde::Serialize;

use crate::metric::is_unreachable;
use crate::window::SETTLED_SLOTS;

/// One neighbor as seen from the local node at report time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborReport {
    pub address: Ipv4Addr,
    /// Raw 12-bit reception window.
    pub window: u16,
    /// Settled receptions in the window.
    pub receptions: u8,
    /// Reverse count last reported by the neighbor.
    pub reverse: u8,
    pub etx: u32,
    /// Predicted link expiration time.
    pub let_s: f64,
    /// Fused route metric.
    pub hybrid: u32,
}

impl NeighborReport {
    /// Whether the fused metric allows routing through this neighbor.
    pub fn is_usable(&self) -> bool {
        !is_unreachable(self.hybrid)
    }

    /// Fraction of settled slots with a reception each way, 0.0–1.0.
    pub fn delivery_ratio(&self) -> f64 {
        let forward = self.receptions as f64 / SETTLED_SLOTS as f64;
        let reverse = (self.reverse as f64 / SETTLED_SLOTS as f64).min(1.0);
        forward * reverse
    }
}

/// Aggregate view over a set of reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableSummary {
    pub neighbors: usize,
    pub usable: usize,
    /// Lowest usable hybrid metric, if any.
    pub best_metric: Option<u32>,
    /// Mean LET over usable neighbors.
    pub mean_let_s: Option<f64>,
}

impl TableSummary {
    pub fn from_reports(reports: &[NeighborReport]) -> Self {
        let usable: Vec<&NeighborReport> = reports.iter().filter(|r| r.is_usable()).collect();
        let best_metric = usable.iter().map(|r| r.hybrid).min();
        let mean_let_s = if usable.is_empty() {
            None
        } else {
            Some(usable.iter().map(|r| r.let_s).sum::<f64>() / usable.len() as f64)
        };
        TableSummary {
            neighbors: reports.len(),
            usable: usable.len(),
            best_metric,
            mean_let_s,
        }
    }
}
