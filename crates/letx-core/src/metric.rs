//! # Hybrid Metric
//!
//! Fuses ETX and LET into the single value used to rank routes. ETX passes
//! through unchanged unless LET predicts the link breaks within
//! `break_threshold`, in which case the link is reported as unreachable
//! regardless of its loss history.

use crate::etx::ETX_MAX;
use crate::expiry::ExpiryModel;
use crate::kinematics::Kinematics;

/// Default LET below which a link counts as about to break.
pub const DEFAULT_BREAK_THRESHOLD: f64 = 1.0;

/// Whether `metric` is the unreachable sentinel.
#[inline]
pub fn is_unreachable(metric: u32) -> bool {
    metric == ETX_MAX
}

/// ETX + LET fuser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridMetric {
    pub expiry: ExpiryModel,
    pub break_threshold: f64,
}

impl Default for HybridMetric {
    fn default() -> Self {
        HybridMetric {
            expiry: ExpiryModel::default(),
            break_threshold: DEFAULT_BREAK_THRESHOLD,
        }
    }
}

impl HybridMetric {
    pub fn new(expiry: ExpiryModel, break_threshold: f64) -> Self {
        HybridMetric {
            expiry,
            break_threshold,
        }
    }

    /// Combine an ETX value with a predicted LET.
    pub fn fuse(&self, etx: u32, let_s: f64) -> u32 {
        if let_s < self.break_threshold {
            ETX_MAX
        } else {
            etx
        }
    }

    /// LET between the two snapshots, then [`fuse`](Self::fuse) with `etx`.
    pub fn evaluate(&self, etx: u32, local: &Kinematics, neighbor: &Kinematics) -> (u32, f64) {
        let let_s = self.expiry.link_expiration_time(local, neighbor);
        (self.fuse(etx, let_s), let_s)
    }
}
