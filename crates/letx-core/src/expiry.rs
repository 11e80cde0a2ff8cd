//! # Link Expiration Time
//!
//! Predicts how long two nodes stay within transmission range, assuming
//! both keep their current velocity.
//!
//! With relative velocity `(a, c)` and relative position `(b, d)` (neighbor
//! minus local), the distance equals the range `r` when
//!
//! ```text
//!   (a² + c²)·t² + 2(ab + cd)·t + (b² + d² − r²) = 0
//!
//!   LET = ( −(ab + cd) + √((a² + c²)·r² − (ad − bc)²) ) / (a² + c²)
//! ```
//!
//! Only the larger root (exit time) is used. Motion is planar: `z` is ignored.

use crate::kinematics::Kinematics;

/// Default transmission radius, in distance units.
pub const DEFAULT_TRANSMISSION_RANGE: f64 = 250.0;

/// Default LET for a pair with no relative motion.
pub const DEFAULT_STATIC_LIFETIME: f64 = 1000.0;

/// Parameters of the LET predictor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpiryModel {
    /// Transmission radius `r`.
    pub range: f64,
    /// Returned when the relative velocity is zero.
    pub static_lifetime: f64,
}

impl Default for ExpiryModel {
    fn default() -> Self {
        ExpiryModel {
            range: DEFAULT_TRANSMISSION_RANGE,
            static_lifetime: DEFAULT_STATIC_LIFETIME,
        }
    }
}

/// Intermediate terms of one LET evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpiryTerms {
    /// `a² + c²`.
    pub denom: f64,
    /// `(a² + c²)·r² − (ad − bc)²`.
    pub discriminant: f64,
    /// `−(ab + cd)`.
    pub closing: f64,
}

impl ExpiryModel {
    pub fn new(range: f64, static_lifetime: f64) -> Self {
        ExpiryModel {
            range,
            static_lifetime,
        }
    }

    /// Quadratic terms for the pair.
    pub fn terms(&self, local: &Kinematics, neighbor: &Kinematics) -> ExpiryTerms {
        let dv = neighbor.velocity.sub(local.velocity);
        let dp = neighbor.position.sub(local.position);
        let (a, b, c, d) = (dv.x, dp.x, dv.y, dp.y);

        let denom = a * a + c * c;
        let cross = a * d - b * c;
        ExpiryTerms {
            denom,
            discriminant: denom * self.range * self.range - cross * cross,
            closing: -(a * b + c * d),
        }
    }

    /// Predicted time until the neighbor leaves range; never negative.
    ///
    /// Returns `static_lifetime` for zero relative velocity and `0.0` when
    /// the trajectories never bring the pair within range.
    pub fn link_expiration_time(&self, local: &Kinematics, neighbor: &Kinematics) -> f64 {
        let t = self.terms(local, neighbor);
        if t.denom == 0.0 {
            return self.static_lifetime;
        }
        if t.discriminant < 0.0 {
            return 0.0;
        }
        let exit = (t.closing + t.discriminant.sqrt()) / t.denom;
        exit.max(0.0)
    }
}

/// LET with the default range and static lifetime.
pub fn link_expiration_time(local: &Kinematics, neighbor: &Kinematics) -> f64 {
    ExpiryModel::default().link_expiration_time(local, neighbor)
}
