//! Verlet-integrated constrained nodes: ropes and spring meshes.
//!
//! Both containers own their nodes in a flat `Vec` and refer to them by
//! index. Each node carries an explicit [`NodeState`], so integration,
//! relaxation and collision all branch on the same enum.
//!
//! - [`Rope`] - chain of distance constraints relaxed iteratively, with
//!   terminus anchoring and runtime reeling
//! - [`SpringMesh`] - quad grid of damped springs with pinned borders
//!
//! Collisions go through [`tether_collision::CollisionQuery`], so the same
//! rope runs against a [`tether_collision::ColliderSet`] or any other scene.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use tether_collision::NoColliders;
//! use tether_nodes::{Rope, RopeConfig};
//!
//! let config = RopeConfig::default().with_node_count(8).with_node_spacing(0.25);
//! let mut rope = Rope::new(config, Vec2::ZERO, Vec2::X).unwrap();
//!
//! for _ in 0..60 {
//!     rope.step(1.0 / 60.0, &NoColliders);
//! }
//!
//! // Node 0 starts anchored
//! assert_eq!(rope.positions()[0], Vec2::ZERO);
//! assert!(rope.positions()[7].y < 0.0);
//! ```

mod error;
mod mesh;
mod node;
mod rope;

pub use error::{NodeError, NodeResult};
pub use mesh::{MeshFreeze, SpringMesh, SpringMeshConfig};
pub use node::{AxisMask, DistanceConstraint, Node, NodeState, Spring};
pub use rope::{Rope, RopeConfig, StepReport};
