//! Real-time 2D physics for particles and constrained nodes.
//!
//! This crate re-exports the tether crates under one roof:
//!
//! - [`integrate`] - Verlet and semi-implicit Euler steps, spring and drag terms
//! - [`spatial`] - counting-sort hash grid for neighbor search
//! - [`collision`] - shapes, collider sets, layer masks and point resolution
//! - [`nodes`] - ropes and spring meshes
//! - [`fluid`] - SPH fluid
//!
//! Most programs only need the [`prelude`].
//!
//! # Example
//!
//! ```
//! use tether::prelude::*;
//!
//! let mut world = ColliderSet::new();
//! world.insert(Shape::ground(-2.0), Layer::DEFAULT);
//!
//! let mut rope = Rope::new(RopeConfig::default(), Vec2::ZERO, Vec2::X).unwrap();
//! let mut fluid = FluidSolver::new(FluidConfig::default().with_capacity(64)).unwrap();
//! fluid.spawn_block(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.5), 0.25);
//!
//! for _ in 0..10 {
//!     rope.step(1.0 / 60.0, &world);
//!     fluid.step(1.0 / 60.0, &world);
//! }
//! assert!(rope.positions().iter().all(|p| p.y >= -2.0));
//! ```

pub use glam;
pub use tether_collision as collision;
pub use tether_fluid as fluid;
pub use tether_integrate as integrate;
pub use tether_nodes as nodes;
pub use tether_spatial as spatial;

/// Common imports.
pub mod prelude {
    pub use glam::Vec2;
    pub use tether_collision::{
        ColliderHandle, ColliderSet, CollisionQuery, Contact, ContactSettings, Layer, LayerMask,
        NoColliders, Shape,
    };
    pub use tether_fluid::{Emitter, FluidConfig, FluidSolver, ObstacleConfig};
    pub use tether_nodes::{
        AxisMask, MeshFreeze, NodeState, Rope, RopeConfig, SpringMesh, SpringMeshConfig,
    };
    pub use tether_spatial::{GridConfig, SpatialHashGrid};
}
