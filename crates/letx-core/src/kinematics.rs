//! # Kinematic Snapshot
//!
//! A node's position and velocity at the moment a probe or route-control
//! message was built. Snapshots are plain values: a neighbor record copies
//! the latest one in and replaces it wholesale on the next update.
//!
//! ## Wire form (24 bytes)
//!
//! ```text
//! | px i32 | py i32 | pz i32 | vx i32 | vy i32 | vz i32 |
//! ```
//!
//! Each component is multiplied by [`KINEMATIC_SCALE`] and rounded, so with
//! metre units the wire carries millimetres and millimetres per second.

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;

/// Fixed-point scale applied to every kinematic component on the wire.
pub const KINEMATIC_SCALE: f64 = 1000.0;

/// Encoded size of a [`Kinematics`] snapshot.
pub const KINEMATICS_WIRE_LEN: usize = 24;

/// Three-component vector (x, y, z).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3 { x, y, z }
    }

    /// Component-wise `self - other`.
    pub fn sub(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Planar (x, y) Euclidean norm.
    pub fn planar_norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i32(to_fixed(self.x));
        buf.put_i32(to_fixed(self.y));
        buf.put_i32(to_fixed(self.z));
    }

    fn decode(buf: &mut impl Buf) -> Self {
        Vector3 {
            x: from_fixed(buf.get_i32()),
            y: from_fixed(buf.get_i32()),
            z: from_fixed(buf.get_i32()),
        }
    }
}

/// Position and velocity of one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kinematics {
    pub position: Vector3,
    pub velocity: Vector3,
}

impl Kinematics {
    pub const fn new(position: Vector3, velocity: Vector3) -> Self {
        Kinematics { position, velocity }
    }

    /// A node standing still at `position`.
    pub const fn stationary(position: Vector3) -> Self {
        Kinematics {
            position,
            velocity: Vector3::ZERO,
        }
    }

    /// Position after `dt` time units of uniform motion.
    pub fn advanced(&self, dt: f64) -> Self {
        Kinematics {
            position: Vector3::new(
                self.position.x + self.velocity.x * dt,
                self.position.y + self.velocity.y * dt,
                self.position.z + self.velocity.z * dt,
            ),
            velocity: self.velocity,
        }
    }

    /// Planar distance between two snapshots' positions.
    pub fn distance_to(&self, other: &Kinematics) -> f64 {
        other.position.sub(self.position).planar_norm()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        self.position.encode(buf);
        self.velocity.encode(buf);
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < KINEMATICS_WIRE_LEN {
            return None;
        }
        let position = Vector3::decode(buf);
        let velocity = Vector3::decode(buf);
        Some(Kinematics { position, velocity })
    }
}

// `as` saturates at the i32 bounds and maps NaN to 0.
fn to_fixed(v: f64) -> i32 {
    (v * KINEMATIC_SCALE).round() as i32
}

fn from_fixed(raw: i32) -> f64 {
    raw as f64 / KINEMATIC_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_len_is_24_bytes() {
        let k = Kinematics::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(-1.0, 0.5, 0.0));
        let mut buf = BytesMut::new();
        k.encode(&mut buf);
        assert_eq!(buf.len(), KINEMATICS_WIRE_LEN);
    }

    #[test]
    fn wire_is_millimetre_fixed_point() {
        let k = Kinematics::new(Vector3::new(1.5, -2.25, 0.0), Vector3::new(0.001, 0.0, 0.0));
        let mut buf = BytesMut::new();
        k.encode(&mut buf);
        assert_eq!(&buf[0..4], &1500i32.to_be_bytes());
        assert_eq!(&buf[4..8], &(-2250i32).to_be_bytes());
        assert_eq!(&buf[12..16], &1i32.to_be_bytes());

        let decoded = Kinematics::decode(&mut buf).unwrap();
        assert_eq!(decoded, k);
    }

    #[test]
    fn sub_millimetre_values_round() {
        let k = Kinematics::stationary(Vector3::new(0.0004, 0.0006, 0.0));
        let mut buf = BytesMut::new();
        k.encode(&mut buf);
        let decoded = Kinematics::decode(&mut buf).unwrap();
        assert_eq!(decoded.position.x, 0.0);
        assert_eq!(decoded.position.y, 0.001);
    }

    #[test]
    fn out_of_range_saturates() {
        let k = Kinematics::stationary(Vector3::new(1e12, -1e12, f64::NAN));
        let mut buf = BytesMut::new();
        k.encode(&mut buf);
        let decoded = Kinematics::decode(&mut buf).unwrap();
        assert_eq!(decoded.position.x, i32::MAX as f64 / KINEMATIC_SCALE);
        assert_eq!(decoded.position.y, i32::MIN as f64 / KINEMATIC_SCALE);
        assert_eq!(decoded.position.z, 0.0);
    }

    #[test]
    fn decode_truncated_fails() {
        let mut buf = BytesMut::from(&[0u8; KINEMATICS_WIRE_LEN - 1][..]);
        assert!(Kinematics::decode(&mut buf).is_none());
    }

    #[test]
    fn advanced_moves_along_velocity() {
        let k = Kinematics::new(Vector3::new(10.0, 0.0, 0.0), Vector3::new(2.0, -1.0, 0.0));
        let later = k.advanced(5.0);
        assert_eq!(later.position, Vector3::new(20.0, -5.0, 0.0));
        assert_eq!(later.velocity, k.velocity);
    }

    #[test]
    fn distance_ignores_altitude() {
        let a = Kinematics::stationary(Vector3::new(0.0, 0.0, 0.0));
        let b = Kinematics::stationary(Vector3::new(3.0, 4.0, 100.0));
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
