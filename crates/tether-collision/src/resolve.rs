//! Velocity-aware push-out of a Verlet point against a [`CollisionQuery`].

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tether_integrate::reflect_velocity;

use crate::layer::{Layer, LayerMask};
use crate::query::{CandidateBuffer, ColliderHandle, CollisionQuery};

/// Penetration below this depth is left alone, so resolved contacts stay put.
pub const CONTACT_SLOP: f32 = 1e-4;

/// How a point responds to contact.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactSettings {
    /// Collision radius of the point.
    pub radius: f32,
    /// Fraction of the normal speed kept after a bounce (0 = inelastic).
    pub bounciness: f32,
    /// Fraction of tangential speed removed on impact, in `[0, 1]`.
    pub friction: f32,
    /// Per-step displacement below which the point counts as resting.
    pub rest_displacement: f32,
}

impl Default for ContactSettings {
    fn default() -> Self {
        Self {
            radius: 0.05,
            bounciness: 0.0,
            friction: 0.0,
            rest_displacement: 1e-4,
        }
    }
}

impl ContactSettings {
    /// Sets the collision radius.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the bounciness.
    pub fn with_bounciness(mut self, bounciness: f32) -> Self {
        self.bounciness = bounciness;
        self
    }

    /// Sets the friction.
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }
}

/// A collider touched by a point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Contact {
    /// Collider touched.
    pub collider: ColliderHandle,
    /// Closest surface point at the time of contact.
    pub point: Vec2,
    /// Unit surface normal, pointing away from the collider.
    pub normal: Vec2,
    /// Layer of the collider.
    pub layer: Layer,
    /// Signed surface distance when last examined, before that pass moved
    /// the point.
    pub distance: f32,
}

/// Upper bound on push-out passes per call.
pub const MAX_CONTACT_PASSES: usize = 8;

/// Line a point must stay `radius` in front of: surface point and normal.
#[derive(Clone, Copy)]
struct Support {
    point: Vec2,
    normal: Vec2,
}

impl Support {
    fn distance(&self, p: Vec2) -> f32 {
        (p - self.point).dot(self.normal)
    }
}

/// Pushes a Verlet point out of every collider it penetrates.
///
/// A point closer than `settings.radius - CONTACT_SLOP` to a surface is moved
/// along the surface normal until it sits exactly `settings.radius` away.
/// If it was moving into the surface, `last_position` is rebuilt from the
/// reflected velocity so the implied velocity bounces with
/// `settings.bounciness` and loses `settings.friction` of its tangential
/// part; otherwise both positions are translated together.
///
/// Candidates are gathered again after every pass that moved the point, and
/// passes repeat until none corrects anything, up to [`MAX_CONTACT_PASSES`].
/// When a push out of one collider lands the point back inside an earlier
/// one, the two surfaces are solved together, so a point wedged in a crevice
/// settles in one call. Points resting within the slop band still report
/// the contact without being moved, so calling this twice without motion
/// changes nothing.
///
/// Returns the last contact of the final pass in candidate order.
pub fn resolve_point<Q: CollisionQuery + ?Sized>(
    query: &Q,
    position: &mut Vec2,
    last_position: &mut Vec2,
    settings: &ContactSettings,
    mask: LayerMask,
    buffer: &mut CandidateBuffer,
) -> Option<Contact> {
    let radius = settings.radius;
    let mut contact = None;

    for pass in 0..MAX_CONTACT_PASSES {
        buffer.clear();
        query.overlap_circle(*position, radius + CONTACT_SLOP, mask, buffer);
        if buffer.truncated() {
            log::trace!(
                "contact candidates truncated to {} at {:?}",
                buffer.capacity(),
                position
            );
        }

        contact = None;
        let mut first: Option<Support> = None;
        let mut last: Option<Support> = None;
        for &collider in buffer.as_slice() {
            let Some(surface) = query.closest_point(collider, *position) else {
                continue;
            };
            if surface.distance >= radius + CONTACT_SLOP {
                continue;
            }

            let displacement = *position - *last_position;
            let normal = surface
                .normal
                .try_normalize()
                .or_else(|| (-displacement).try_normalize())
                .unwrap_or(Vec2::Y);

            if surface.distance < radius - CONTACT_SLOP {
                let push = normal * (radius - surface.distance);
                let into_surface = displacement.dot(normal) < 0.0
                    && displacement.length() > settings.rest_displacement;

                *position += push;
                if into_surface {
                    let bounced = reflect_velocity(displacement, normal, settings.bounciness);
                    let along = normal * bounced.dot(normal);
                    let tangent = (bounced - along) * (1.0 - settings.friction.clamp(0.0, 1.0));
                    *last_position = *position - (along + tangent);
                } else {
                    *last_position += push;
                }

                let support = Support {
                    point: *position - normal * radius,
                    normal,
                };
                if first.is_none() {
                    first = Some(support);
                } else {
                    last = Some(support);
                }
            }

            contact = Some(Contact {
                collider,
                point: surface.point,
                normal,
                layer: query.layer(collider).unwrap_or_default(),
                distance: surface.distance,
            });
        }

        let Some(first) = first else {
            break;
        };
        if let Some(last) = last {
            if first.distance(*position) < radius - CONTACT_SLOP {
                if let Some(target) = wedge_point(first, last, radius) {
                    let shift = target - *position;
                    *position += shift;
                    *last_position += shift;
                }
            }
        }
        if pass + 1 == MAX_CONTACT_PASSES {
            log::trace!("contact passes exhausted at {:?}", position);
        }
    }

    debug_assert!(position.is_finite() && last_position.is_finite());
    contact
}

/// Point exactly `radius` in front of both supports, if they are not parallel.
fn wedge_point(a: Support, b: Support, radius: f32) -> Option<Vec2> {
    let det = a.normal.perp_dot(b.normal);
    if det.abs() < 1e-3 {
        return None;
    }
    let ca = a.normal.dot(a.point) + radius;
    let cb = b.normal.dot(b.point) + radius;
    Some(Vec2::new(
        (ca * b.normal.y - a.normal.y * cb) / det,
        (a.normal.x * cb - ca * b.normal.x) / det,
    ))
}
