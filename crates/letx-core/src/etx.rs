//! # ETX Estimator
//!
//! Expected Transmission Count from the forward reception count (how many
//! of the neighbor's probes we saw in the settled window) and the reverse
//! count (how many of ours the neighbor reports having seen).
//!
//! The value is scaled by [`ETX_SCALE`] and inverted on the product of the
//! two counts, so perfect bidirectional reception (10 × 10) gives 10 000 and
//! sparser reception gives larger numbers. Lower is better.

use crate::window::{ReceptionWindow, TimeSlot};

/// Sentinel for "no usable estimate / unreachable".
pub const ETX_MAX: u32 = u32::MAX;

/// Numerator of the scaled ETX.
pub const ETX_SCALE: f64 = 1_000_000.0;

/// Settled receptions recorded in `window`, given the shared cursor.
#[inline]
pub fn count_receptions(window: ReceptionWindow, cursor: TimeSlot) -> u8 {
    window.settled_count(cursor)
}

/// `round(ETX_SCALE / (forward × reverse))`, or [`ETX_MAX`] when either count is zero.
pub fn scaled_etx(forward: u8, reverse: u8) -> u32 {
    if forward == 0 || reverse == 0 {
        return ETX_MAX;
    }
    let product = forward as u32 * reverse as u32;
    (ETX_SCALE / product as f64).round() as u32
}

/// ETX of a neighbor record.
pub fn etx_for(window: ReceptionWindow, reverse: u8, cursor: TimeSlot) -> u32 {
    scaled_etx(count_receptions(window, cursor), reverse)
}
