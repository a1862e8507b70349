//! 2D smoothed-particle hydrodynamics.
//!
//! [`FluidSolver`] runs a position-predicting SPH step with two pressure
//! terms: the usual density pressure pulling the fluid towards a rest
//! density, and a near-density pressure that keeps particles from clumping.
//! Viscosity smooths relative velocities. Neighbors come from a
//! [`tether_spatial::SpatialHashGrid`] rebuilt every substep.
//!
//! Colliders reached through [`tether_collision::CollisionQuery`] act as
//! soft circular obstacles, and the container walls reflect particles with
//! a configurable bounciness.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use tether_fluid::{FluidConfig, FluidSolver};
//!
//! let config = FluidConfig::default()
//!     .with_capacity(256)
//!     .with_bounds(Vec2::new(-2.0, -2.0), Vec2::new(2.0, 2.0));
//! let mut fluid = FluidSolver::new(config).unwrap();
//! fluid.spawn_block(Vec2::new(-0.5, -0.5), Vec2::new(0.5, 0.5), 0.1);
//!
//! for _ in 0..30 {
//!     fluid.step_isolated(1.0 / 60.0);
//! }
//!
//! assert!(fluid.positions().iter().all(|p| p.y >= -2.0 && p.y <= 2.0));
//! ```

mod config;
mod emitter;
mod error;
mod kernel;
mod solver;
mod surface;

pub use config::{FluidConfig, ObstacleConfig};
pub use emitter::Emitter;
pub use error::{FluidError, FluidResult};
pub use kernel::Kernels;
pub use solver::{FluidSolver, StepStats};
pub use surface::SurfaceHeights;
