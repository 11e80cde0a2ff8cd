//! Seeded random-walk mobility in a square arena.
//!
//! Every step moves each node along its velocity, reflects it off the
//! arena walls and then nudges the velocity by a bounded random amount,
//! so LET predictions are valid only for the current period.

use letx_core::kinematics::{Kinematics, Vector3};
use rand::rngs::StdRng;
use rand::RngExt as _;

/// Largest velocity change per step, as a fraction of `max_speed`.
const TURN_FRACTION: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
pub struct RandomWalk {
    pub arena: f64,
    pub max_speed: f64,
}

impl RandomWalk {
    pub fn new(arena: f64, max_speed: f64) -> Self {
        RandomWalk { arena, max_speed }
    }

    /// Uniform position in the arena with a random planar velocity.
    pub fn spawn(&self, rng: &mut StdRng) -> Kinematics {
        let position = Vector3::new(
            rng.random::<f64>() * self.arena,
            rng.random::<f64>() * self.arena,
            0.0,
        );
        let velocity = Vector3::new(
            rand_signed(rng, self.max_speed),
            rand_signed(rng, self.max_speed),
            0.0,
        );
        Kinematics::new(position, velocity)
    }

    /// Advance `current` by `dt` seconds.
    pub fn step(&self, rng: &mut StdRng, current: &Kinematics, dt: f64) -> Kinematics {
        let moved = current.advanced(dt);
        let (x, vx) = reflect(moved.position.x, moved.velocity.x, self.arena);
        let (y, vy) = reflect(moved.position.y, moved.velocity.y, self.arena);

        let turn = self.max_speed * TURN_FRACTION;
        let vx = (vx + rand_signed(rng, turn)).clamp(-self.max_speed, self.max_speed);
        let vy = (vy + rand_signed(rng, turn)).clamp(-self.max_speed, self.max_speed);

        Kinematics::new(Vector3::new(x, y, 0.0), Vector3::new(vx, vy, 0.0))
    }
}

/// Fold a coordinate back into `[0, arena]`, flipping the velocity
/// component when it crossed a wall.
fn reflect(pos: f64, vel: f64, arena: f64) -> (f64, f64) {
    if pos < 0.0 {
        ((-pos).min(arena), vel.abs())
    } else if pos > arena {
        ((2.0 * arena - pos).max(0.0), -vel.abs())
    } else {
        (pos, vel)
    }
}

fn rand_signed(rng: &mut StdRng, max_step: f64) -> f64 {
    if max_step <= 0.0 {
        return 0.0;
    }
    let mag = rng.random::<f64>() * max_step;
    if rng.random::<bool>() {
        mag
    } else {
        -mag
    }
}
