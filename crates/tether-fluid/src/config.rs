//! Solver configuration.

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tether_collision::LayerMask;

use crate::error::{FluidError, FluidResult};

/// Repulsion from external colliders.
///
/// Each tick the solver gathers up to `capacity` colliders on `mask` that
/// overlap the domain and treats each as its bounding circle. A particle at
/// surface distance `d < range` is pushed out with acceleration
/// `strength * (1 - d / range)^falloff`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObstacleConfig {
    /// Layers treated as obstacles; empty disables obstacles.
    pub mask: LayerMask,
    /// Maximum obstacles per tick. Extra colliders are ignored.
    pub capacity: usize,
    /// Acceleration at the obstacle surface.
    pub strength: f32,
    /// Distance from the surface at which repulsion reaches zero.
    pub range: f32,
    /// Falloff exponent.
    pub falloff: f32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            mask: LayerMask::NONE,
            capacity: 8,
            strength: 60.0,
            range: 0.3,
            falloff: 2.0,
        }
    }
}

impl ObstacleConfig {
    /// Obstacles on `mask` with default tuning.
    pub fn on(mask: LayerMask) -> Self {
        Self {
            mask,
            ..Self::default()
        }
    }
}

/// SPH solver parameters, fixed per instance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FluidConfig {
    /// Maximum number of particles.
    pub capacity: usize,
    /// Lower-left corner of the container.
    pub bounds_min: Vec2,
    /// Upper-right corner of the container.
    pub bounds_max: Vec2,
    /// Kernel support radius; also the neighbor grid cell size.
    pub smoothing_radius: f32,
    /// Mass of every particle.
    pub particle_mass: f32,
    /// Density the pressure term drives towards.
    pub rest_density: f32,
    /// Pressure per unit of excess density.
    pub pressure_stiffness: f32,
    /// Pressure per unit of near-density.
    pub near_pressure_stiffness: f32,
    /// Viscosity strength.
    pub viscosity: f32,
    /// Gravity acceleration.
    pub gravity: Vec2,
    /// Fraction of normal speed kept when bouncing off a wall.
    pub bounciness: f32,
    /// Particle radius; walls are inset by it.
    pub particle_radius: f32,
    /// Substeps per [`step`](crate::FluidSolver::step).
    pub substeps: usize,
    /// Optional speed cap.
    pub max_speed: Option<f32>,
    /// Obstacle repulsion.
    pub obstacles: ObstacleConfig,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            bounds_min: Vec2::new(-8.0, -4.5),
            bounds_max: Vec2::new(8.0, 4.5),
            smoothing_radius: 0.35,
            particle_mass: 1.0,
            rest_density: 55.0,
            pressure_stiffness: 500.0,
            near_pressure_stiffness: 18.0,
            viscosity: 0.06,
            gravity: Vec2::new(0.0, -9.81),
            bounciness: 0.5,
            particle_radius: 0.05,
            substeps: 3,
            max_speed: Some(25.0),
            obstacles: ObstacleConfig::default(),
        }
    }
}

impl FluidConfig {
    /// Sets the particle capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the container.
    pub fn with_bounds(mut self, min: Vec2, max: Vec2) -> Self {
        self.bounds_min = min;
        self.bounds_max = max;
        self
    }

    /// Sets the smoothing radius.
    pub fn with_smoothing_radius(mut self, h: f32) -> Self {
        self.smoothing_radius = h;
        self
    }

    /// Sets the rest density.
    pub fn with_rest_density(mut self, rest_density: f32) -> Self {
        self.rest_density = rest_density;
        self
    }

    /// Sets both pressure stiffnesses.
    pub fn with_pressure(mut self, stiffness: f32, near_stiffness: f32) -> Self {
        self.pressure_stiffness = stiffness;
        self.near_pressure_stiffness = near_stiffness;
        self
    }

    /// Sets the viscosity strength.
    pub fn with_viscosity(mut self, viscosity: f32) -> Self {
        self.viscosity = viscosity;
        self
    }

    /// Sets gravity.
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Sets the substep count.
    pub fn with_substeps(mut self, substeps: usize) -> Self {
        self.substeps = substeps;
        self
    }

    /// Sets the speed cap.
    pub fn with_max_speed(mut self, max_speed: Option<f32>) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Sets obstacle repulsion.
    pub fn with_obstacles(mut self, obstacles: ObstacleConfig) -> Self {
        self.obstacles = obstacles;
        self
    }

    /// Checks every field.
    pub fn validate(&self) -> FluidResult<()> {
        if self.capacity == 0 {
            return Err(FluidError::ZeroCapacity);
        }
        if self.substeps == 0 {
            return Err(FluidError::ZeroSubsteps);
        }
        let h = self.smoothing_radius;
        if !(h > 0.0 && h.is_finite()) {
            return Err(FluidError::InvalidSmoothingRadius(h));
        }
        let (min, max) = (self.bounds_min, self.bounds_max);
        let inset = Vec2::splat(self.particle_radius.max(0.0));
        if !(min.is_finite() && max.is_finite() && (min + inset).cmplt(max - inset).all()) {
            return Err(FluidError::InvalidBounds {
                min: min.to_array(),
                max: max.to_array(),
            });
        }

        positive("particle_mass", self.particle_mass)?;
        non_negative("rest_density", self.rest_density)?;
        non_negative("pressure_stiffness", self.pressure_stiffness)?;
        non_negative("near_pressure_stiffness", self.near_pressure_stiffness)?;
        non_negative("viscosity", self.viscosity)?;
        non_negative("bounciness", self.bounciness)?;
        non_negative("particle_radius", self.particle_radius)?;
        if let Some(max_speed) = self.max_speed {
            positive("max_speed", max_speed)?;
        }
        if !self.gravity.is_finite() {
            return Err(FluidError::InvalidParameter {
                field: "gravity",
                value: self.gravity.length(),
            });
        }

        let obstacles = &self.obstacles;
        non_negative("obstacles.strength", obstacles.strength)?;
        positive("obstacles.range", obstacles.range)?;
        non_negative("obstacles.falloff", obstacles.falloff)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> FluidResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FluidError::InvalidParameter { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> FluidResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FluidError::InvalidParameter { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FluidConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = FluidConfig::default().with_smoothing_radius(0.0);
        assert_eq!(config.validate(), Err(FluidError::InvalidSmoothingRadius(0.0)));

        let config = FluidConfig::default().with_capacity(0);
        assert_eq!(config.validate(), Err(FluidError::ZeroCapacity));

        let config = FluidConfig::default().with_bounds(Vec2::ONE, Vec2::ZERO);
        assert!(matches!(config.validate(), Err(FluidError::InvalidBounds { .. })));

        let config = FluidConfig::default().with_viscosity(-1.0);
        assert_eq!(
            config.validate(),
            Err(FluidError::InvalidParameter {
                field: "viscosity",
                value: -1.0
            })
        );
    }

    #[test]
    fn test_zero_range_obstacles_rejected() {
        let mut obstacles = ObstacleConfig::on(LayerMask::ALL);
        obstacles.range = 0.0;
        let config = FluidConfig::default().with_obstacles(obstacles);
        assert!(config.validate().is_err());
    }
}
