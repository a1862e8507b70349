//! Integration math shared by the tether simulations.
//!
//! Everything here is a pure function over `Vec2`/`f32` so the rope, spring
//! mesh and fluid solvers all step their state the same way:
//!
//! - [`verlet_step`] - position Verlet with an implicit velocity
//! - [`implied_velocity`] - velocity recovered from two positions
//! - [`semi_implicit_euler`] - velocity-first Euler used by the fluid solver
//! - [`damped_spring_acceleration`] - spring + damper along a displacement
//! - [`quadratic_drag`] - drag opposing motion, proportional to speed squared
//! - [`reflect_velocity`] - elastic/inelastic bounce off a surface
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use tether_integrate::{implied_velocity, verlet_step};
//!
//! let dt = 1.0 / 60.0;
//! let position = Vec2::new(0.0, 1.0);
//! let last = position;
//! let next = verlet_step(position, last, Vec2::new(0.0, -9.81), dt, 0.0);
//!
//! assert!(next.y < position.y);
//! assert!(implied_velocity(next, position, dt).y < 0.0);
//! ```

use glam::Vec2;

/// Lengths and speeds below this are treated as zero.
pub const EPSILON: f32 = 1e-6;

/// Advances a point one step with position Verlet.
///
/// `x' = x + (x - x_prev) * (1 - damping) + a * dt²`
///
/// The caller is responsible for moving `position` into `last_position`
/// afterwards; velocity is never stored separately.
#[inline]
pub fn verlet_step(
    position: Vec2,
    last_position: Vec2,
    acceleration: Vec2,
    dt: f32,
    damping: f32,
) -> Vec2 {
    let displacement = (position - last_position) * (1.0 - damping);
    position + displacement + acceleration * dt * dt
}

/// Velocity implied by two consecutive Verlet positions.
///
/// Returns zero for a non-positive `dt`.
#[inline]
pub fn implied_velocity(position: Vec2, last_position: Vec2, dt: f32) -> Vec2 {
    if dt <= 0.0 {
        return Vec2::ZERO;
    }
    (position - last_position) / dt
}

/// Semi-implicit Euler: velocity first, then position with the new velocity.
#[inline]
pub fn semi_implicit_euler(
    position: Vec2,
    velocity: Vec2,
    acceleration: Vec2,
    dt: f32,
) -> (Vec2, Vec2) {
    let velocity = velocity + acceleration * dt;
    (position + velocity * dt, velocity)
}

/// Acceleration of a damped spring.
///
/// `a = -k * displacement - c * (relative_velocity projected on displacement)`
///
/// `displacement` is the deviation from rest (not the raw separation), and
/// `relative_velocity` is the velocity of the accelerated end relative to the
/// other one. A zero displacement produces only the damping term along the
/// relative velocity's own direction, which is zero as well.
#[inline]
pub fn damped_spring_acceleration(
    displacement: Vec2,
    relative_velocity: Vec2,
    stiffness: f32,
    damping: f32,
) -> Vec2 {
    let length_sq = displacement.length_squared();
    if length_sq < EPSILON * EPSILON {
        return Vec2::ZERO;
    }
    let along = displacement * (relative_velocity.dot(displacement) / length_sq);
    -stiffness * displacement - damping * along
}

/// Drag force `-drag * |v| * v`; divide by mass for the acceleration.
#[inline]
pub fn quadratic_drag(velocity: Vec2, drag: f32) -> Vec2 {
    let speed = velocity.length();
    if speed < EPSILON {
        return Vec2::ZERO;
    }
    -drag * speed * velocity
}

/// Reflects the normal component of `velocity` scaled by `bounciness`.
///
/// Only velocities heading into the surface (`v · n < 0`) are changed;
/// `normal` must be unit length and point away from the surface.
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2, bounciness: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn >= 0.0 {
        return velocity;
    }
    velocity - (1.0 + bounciness) * vn * normal
}

/// Limits the length of `v` to `max`.
#[inline]
pub fn clamp_length(v: Vec2, max: f32) -> Vec2 {
    let length_sq = v.length_squared();
    if length_sq > max * max && length_sq > 0.0 {
        v * (max / length_sq.sqrt())
    } else {
        v
    }
}

/// Counter-clockwise perpendicular of `v`.
#[inline]
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
