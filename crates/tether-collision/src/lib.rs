//! Collision queries and contact resolution for point masses.
//!
//! The simulations never own scene geometry. They talk to it through the
//! [`CollisionQuery`] trait, which answers four questions: which colliders
//! overlap a disc, where the closest surface point is, what a segment hits
//! first, and which [`Layer`] a collider lives on. [`ColliderSet`] is a
//! small brute-force implementation for tests, demos and sparse scenes.
//!
//! [`resolve_point`] is the shared push-out used by ropes and spring meshes.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use tether_collision::{
//!     CandidateBuffer, ColliderSet, ContactSettings, Layer, LayerMask, Shape, resolve_point,
//! };
//!
//! let mut world = ColliderSet::new();
//! world.insert(Shape::ground(0.0), Layer::new(1));
//!
//! let mut position = Vec2::new(0.0, -0.2);
//! let mut last = Vec2::new(0.0, 0.1);
//! let mut buffer = CandidateBuffer::new(8);
//! let settings = ContactSettings::default().with_radius(0.1);
//!
//! let contact = resolve_point(&world, &mut position, &mut last, &settings, LayerMask::ALL, &mut buffer);
//! assert!(contact.is_some());
//! assert!(position.y >= 0.1 - 1e-5);
//! ```

mod layer;
mod query;
mod resolve;
mod shape;

pub use layer::{Layer, LayerMask};
pub use query::{
    CandidateBuffer, ColliderHandle, ColliderSet, CollisionQuery, LinecastHit, NoColliders,
};
pub use resolve::{CONTACT_SLOP, Contact, ContactSettings, MAX_CONTACT_PASSES, resolve_point};
pub use shape::{BoundingCircle, Shape, SurfacePoint, closest_on_segment};
