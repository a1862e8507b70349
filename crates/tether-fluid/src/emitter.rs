//! Continuous particle sources.

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tether_integrate::perpendicular;

use crate::solver::FluidSolver;

/// Spawns particles at a steady rate, spread across a nozzle.
///
/// Fractional particles carry over between calls, so the long-run rate is
/// exact for any step size. Offsets across the nozzle follow a golden-ratio
/// sequence, which keeps the stream deterministic without stacking particles
/// on one spot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Emitter {
    /// Nozzle center.
    pub position: Vec2,
    /// Initial velocity of emitted particles; also the emission direction.
    pub velocity: Vec2,
    /// Particles per second.
    pub rate: f32,
    /// Nozzle width across the emission direction.
    pub width: f32,
    accumulator: f32,
    sequence: u32,
}

impl Emitter {
    /// Creates an emitter with a point nozzle.
    pub fn new(position: Vec2, velocity: Vec2, rate: f32) -> Self {
        Self {
            position,
            velocity,
            rate,
            width: 0.0,
            accumulator: 0.0,
            sequence: 0,
        }
    }

    /// Sets the nozzle width.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Fraction of a particle owed from earlier calls.
    pub fn pending(&self) -> f32 {
        self.accumulator
    }

    fn next_offset(&mut self) -> f32 {
        const GOLDEN: f32 = 0.618_034;
        let t = (self.sequence as f32 * GOLDEN).fract();
        self.sequence = self.sequence.wrapping_add(1);
        (t - 0.5) * self.width
    }
}

impl FluidSolver {
    /// Emits the particles `emitter` owes for `dt` seconds.
    ///
    /// Particles that do not fit in the solver are dropped; only the
    /// fractional remainder carries over. Returns the number spawned.
    pub fn emit(&mut self, emitter: &mut Emitter, dt: f32) -> usize {
        if !(dt > 0.0 && dt.is_finite() && emitter.rate > 0.0 && emitter.rate.is_finite()) {
            return 0;
        }
        emitter.accumulator += emitter.rate * dt;
        let due = emitter.accumulator.floor();
        emitter.accumulator -= due;

        let across = perpendicular(emitter.velocity)
            .try_normalize()
            .unwrap_or(Vec2::X);
        let mut spawned = 0;
        for _ in 0..due as usize {
            let position = emitter.position + across * emitter.next_offset();
            if self.spawn(position, emitter.velocity).is_none() {
                break;
            }
            spawned += 1;
        }
        spawned
    }
}
