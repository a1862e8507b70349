//! Collider shapes and their point/segment queries.

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tether_integrate::{EPSILON, perpendicular};

/// A collider's geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Solid disc.
    Circle {
        /// Center position.
        center: Vec2,
        /// Radius.
        radius: f32,
    },
    /// Solid axis-aligned box.
    Aabb {
        /// Minimum corner.
        min: Vec2,
        /// Maximum corner.
        max: Vec2,
    },
    /// Segment swept by a disc. A zero radius gives a thin segment.
    Capsule {
        /// Start of the axis.
        start: Vec2,
        /// End of the axis.
        end: Vec2,
        /// Radius around the axis.
        radius: f32,
    },
    /// Half-space `(p - point) · normal <= 0`.
    Plane {
        /// Point on the boundary line.
        point: Vec2,
        /// Unit normal pointing out of the solid side.
        normal: Vec2,
    },
}

impl Shape {
    /// Creates a circle.
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self::Circle { center, radius }
    }

    /// Creates a box from two opposite corners in any order.
    pub fn aabb(a: Vec2, b: Vec2) -> Self {
        Self::Aabb {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a capsule.
    pub fn capsule(start: Vec2, end: Vec2, radius: f32) -> Self {
        Self::Capsule { start, end, radius }
    }

    /// Creates a thin segment.
    pub fn segment(start: Vec2, end: Vec2) -> Self {
        Self::Capsule {
            start,
            end,
            radius: 0.0,
        }
    }

    /// Creates a half-space; `normal` is normalized (falls back to `+Y`).
    pub fn plane(point: Vec2, normal: Vec2) -> Self {
        Self::Plane {
            point,
            normal: normal.try_normalize().unwrap_or(Vec2::Y),
        }
    }

    /// Ground half-space below `y = height`.
    pub fn ground(height: f32) -> Self {
        Self::plane(Vec2::new(0.0, height), Vec2::Y)
    }

    /// Closest surface point to `point`.
    pub fn closest_point(&self, point: Vec2) -> SurfacePoint {
        match *self {
            Shape::Circle { center, radius } => round_point(center, point, radius, Vec2::Y),
            Shape::Capsule { start, end, radius } => {
                let axis_point = closest_on_segment(start, end, point);
                let fallback = perpendicular(end - start).try_normalize().unwrap_or(Vec2::Y);
                round_point(axis_point, point, radius, fallback)
            }
            Shape::Aabb { min, max } => {
                let clamped = point.clamp(min, max);
                let delta = point - clamped;
                let distance = delta.length();
                if distance > EPSILON {
                    return SurfacePoint {
                        point: clamped,
                        normal: delta / distance,
                        distance,
                    };
                }

                // Inside (or on the surface): exit through the nearest face
                let to_min = point - min;
                let to_max = max - point;
                let faces = [
                    (to_min.x, Vec2::NEG_X),
                    (to_max.x, Vec2::X),
                    (to_min.y, Vec2::NEG_Y),
                    (to_max.y, Vec2::Y),
                ];
                let (depth, normal) = faces
                    .into_iter()
                    .fold((f32::INFINITY, Vec2::Y), |best, face| {
                        if face.0 < best.0 { face } else { best }
                    });
                SurfacePoint {
                    point: point + normal * depth,
                    normal,
                    distance: -depth,
                }
            }
            Shape::Plane {
                point: origin,
                normal,
            } => {
                let distance = (point - origin).dot(normal);
                SurfacePoint {
                    point: point - normal * distance,
                    normal,
                    distance,
                }
            }
        }
    }

    /// Signed distance from `point` to the surface (negative inside).
    pub fn distance(&self, point: Vec2) -> f32 {
        self.closest_point(point).distance
    }

    /// Returns whether a disc at `center` with `radius` touches the shape.
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        self.distance(center) <= radius
    }

    /// Smallest enclosing circle, `None` for unbounded shapes.
    pub fn bounding_circle(&self) -> Option<BoundingCircle> {
        match *self {
            Shape::Circle { center, radius } => Some(BoundingCircle { center, radius }),
            Shape::Aabb { min, max } => Some(BoundingCircle {
                center: (min + max) * 0.5,
                radius: (max - min).length() * 0.5,
            }),
            Shape::Capsule { start, end, radius } => Some(BoundingCircle {
                center: (start + end) * 0.5,
                radius: start.distance(end) * 0.5 + radius,
            }),
            Shape::Plane { .. } => None,
        }
    }

    /// First intersection of the segment `start -> end` with the shape.
    ///
    /// Returns `(fraction, normal)` with `fraction` in `[0, 1]`. A segment
    /// starting inside the shape hits at fraction zero.
    pub fn linecast(&self, start: Vec2, end: Vec2) -> Option<(f32, Vec2)> {
        let surface = self.closest_point(start);
        if surface.distance <= 0.0 {
            return Some((0.0, surface.normal));
        }
        let direction = end - start;
        if direction.length_squared() < EPSILON * EPSILON {
            return None;
        }

        match *self {
            Shape::Circle { center, radius } => ray_circle(start, direction, center, radius),
            Shape::Aabb { min, max } => ray_aabb(start, direction, min, max),
            Shape::Capsule {
                start: a,
                end: b,
                radius,
            } => ray_capsule(start, direction, a, b, radius),
            Shape::Plane {
                point: origin,
                normal,
            } => {
                let denom = direction.dot(normal);
                if denom >= 0.0 {
                    return None;
                }
                let t = (origin - start).dot(normal) / denom;
                (0.0..=1.0).contains(&t).then_some((t, normal))
            }
        }
    }
}

/// Result of a closest-point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// Closest point on the surface.
    pub point: Vec2,
    /// Unit normal at `point`, pointing out of the collider.
    pub normal: Vec2,
    /// Signed distance from the query point, negative inside.
    pub distance: f32,
}

/// Circle enclosing a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingCircle {
    /// Center.
    pub center: Vec2,
    /// Radius.
    pub radius: f32,
}

fn round_point(core: Vec2, point: Vec2, radius: f32, fallback: Vec2) -> SurfacePoint {
    let delta = point - core;
    let length = delta.length();
    let normal = if length > EPSILON {
        delta / length
    } else {
        fallback
    };
    SurfacePoint {
        point: core + normal * radius,
        normal,
        distance: length - radius,
    }
}

/// Closest point to `point` on the segment `a -> b`.
pub fn closest_on_segment(a: Vec2, b: Vec2, point: Vec2) -> Vec2 {
    let axis = b - a;
    let length_sq = axis.length_squared();
    if length_sq < EPSILON * EPSILON {
        return a;
    }
    let t = ((point - a).dot(axis) / length_sq).clamp(0.0, 1.0);
    a + axis * t
}

fn ray_circle(origin: Vec2, direction: Vec2, center: Vec2, radius: f32) -> Option<(f32, Vec2)> {
    let m = origin - center;
    let a = direction.dot(direction);
    let b = m.dot(direction);
    let c = m.dot(m) - radius * radius;
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()) / a;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    let hit = origin + direction * t;
    let normal = (hit - center).try_normalize().unwrap_or(-direction.normalize());
    Some((t, normal))
}

fn ray_aabb(origin: Vec2, direction: Vec2, min: Vec2, max: Vec2) -> Option<(f32, Vec2)> {
    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;
    let mut normal = Vec2::ZERO;

    for axis in 0..2 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (mut near, mut far) = ((min[axis] - o) * inv, (max[axis] - o) * inv);
        let mut face = Vec2::ZERO;
        face[axis] = -d.signum();
        if near > far {
            std::mem::swap(&mut near, &mut far);
        }
        if near > t_enter {
            t_enter = near;
            normal = face;
        }
        t_exit = t_exit.min(far);
        if t_enter > t_exit {
            return None;
        }
    }

    (normal != Vec2::ZERO).then_some((t_enter, normal))
}

fn ray_capsule(
    origin: Vec2,
    direction: Vec2,
    a: Vec2,
    b: Vec2,
    radius: f32,
) -> Option<(f32, Vec2)> {
    let mut best: Option<(f32, Vec2)> = None;
    let mut consider = |hit: Option<(f32, Vec2)>| {
        if let Some(hit) = hit {
            if best.is_none_or(|current| hit.0 < current.0) {
                best = Some(hit);
            }
        }
    };

    if radius > EPSILON {
        consider(ray_circle(origin, direction, a, radius));
        consider(ray_circle(origin, direction, b, radius));
    }

    let side = perpendicular(b - a).try_normalize().unwrap_or(Vec2::Y);
    for offset in [side * radius, -side * radius] {
        if let Some(t) = segment_intersection(origin, direction, a + offset, b - a) {
            let normal = if side.dot(direction) < 0.0 { side } else { -side };
            consider(Some((t, normal)));
        }
    }

    best
}

/// Intersection of `p + t*r` with `q + u*s`, returning `t` when both
/// parameters lie in `[0, 1]`.
fn segment_intersection(p: Vec2, r: Vec2, q: Vec2, s: Vec2) -> Option<f32> {
    let denom = r.perp_dot(s);
    if denom.abs() < EPSILON {
        return None;
    }
    let qp = q - p;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    ((0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)).then_some(t)
}
