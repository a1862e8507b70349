//! The SPH pipeline.

use glam::Vec2;
use tether_collision::{BoundingCircle, CandidateBuffer, CollisionQuery};
use tether_integrate::{EPSILON, clamp_length, reflect_velocity, semi_implicit_euler};
use tether_spatial::{GridConfig, SpatialHashGrid};

use crate::config::FluidConfig;
use crate::error::FluidResult;
use crate::kernel::Kernels;
use crate::surface::SurfaceHeights;

/// Summary of the last [`FluidSolver::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    /// Substeps run.
    pub substeps: usize,
    /// Obstacles considered this tick.
    pub obstacles: usize,
    /// Whether more obstacles overlapped the domain than the capacity allows.
    pub obstacles_truncated: bool,
    /// Highest particle density in the last substep.
    pub max_density: f32,
    /// Mean particle density in the last substep.
    pub mean_density: f32,
}

/// 2D SPH fluid with density and near-density pressure.
///
/// Particle state is kept as parallel arrays indexed by particle. Each
/// [`step`](Self::step) runs `substeps` passes of predict, bucket, density,
/// forces, integrate and wall collision.
#[derive(Debug, Clone)]
pub struct FluidSolver {
    config: FluidConfig,
    kernels: Kernels,
    positions: Vec<Vec2>,
    predicted: Vec<Vec2>,
    velocities: Vec<Vec2>,
    accelerations: Vec<Vec2>,
    densities: Vec<f32>,
    near_densities: Vec<f32>,
    grid: SpatialHashGrid,
    /// Whether the grid buckets the current `positions`.
    grid_current: bool,
    obstacles: Vec<BoundingCircle>,
    candidates: CandidateBuffer,
    surface: SurfaceHeights,
    stats: StepStats,
}

impl FluidSolver {
    /// Creates an empty solver with buffers sized to `config.capacity`.
    pub fn new(config: FluidConfig) -> FluidResult<Self> {
        config.validate()?;
        let h = config.smoothing_radius;
        let margin = Vec2::splat(2.0 * h);
        let grid_config =
            GridConfig::covering(config.bounds_min - margin, config.bounds_max + margin, h)?;
        let grid = SpatialHashGrid::new(grid_config, config.capacity)?;
        let capacity = config.capacity;

        log::debug!(
            "fluid solver created: capacity {}, {}x{} grid cells, h = {}",
            capacity,
            grid_config.width,
            grid_config.height,
            h
        );

        Ok(Self {
            kernels: Kernels::new(h),
            positions: Vec::with_capacity(capacity),
            predicted: Vec::with_capacity(capacity),
            velocities: Vec::with_capacity(capacity),
            accelerations: Vec::with_capacity(capacity),
            densities: Vec::with_capacity(capacity),
            near_densities: Vec::with_capacity(capacity),
            grid,
            grid_current: false,
            obstacles: Vec::with_capacity(config.obstacles.capacity),
            candidates: CandidateBuffer::new(config.obstacles.capacity * 2),
            surface: SurfaceHeights::new(config.bounds_min.x, config.bounds_max.x, h),
            stats: StepStats::default(),
            config,
        })
    }

    /// Adds a particle. Returns its index, or `None` when full or the
    /// position is not finite.
    pub fn spawn(&mut self, position: Vec2, velocity: Vec2) -> Option<usize> {
        if self.positions.len() >= self.config.capacity
            || !position.is_finite()
            || !velocity.is_finite()
        {
            return None;
        }
        self.positions.push(position);
        self.predicted.push(position);
        self.velocities.push(velocity);
        self.accelerations.push(Vec2::ZERO);
        self.densities.push(0.0);
        self.near_densities.push(0.0);
        self.grid_current = false;
        Some(self.positions.len() - 1)
    }

    /// Fills the box `[min, max]` with resting particles on a square lattice,
    /// row by row from `min`, until the box or the capacity is exhausted.
    ///
    /// Returns the number of particles added.
    pub fn spawn_block(&mut self, min: Vec2, max: Vec2, spacing: f32) -> usize {
        if !(spacing > 0.0 && spacing.is_finite()) || !min.is_finite() || !max.is_finite() {
            return 0;
        }
        let size = max - min;
        if size.x < 0.0 || size.y < 0.0 {
            return 0;
        }
        let columns = (size.x / spacing).floor() as usize + 1;
        let rows = (size.y / spacing).floor() as usize + 1;

        let mut spawned = 0;
        'fill: for row in 0..rows {
            for column in 0..columns {
                let position = min + Vec2::new(column as f32, row as f32) * spacing;
                if self.spawn(position, Vec2::ZERO).is_none() {
                    break 'fill;
                }
                spawned += 1;
            }
        }
        log::debug!("spawned a block of {spawned} particles");
        spawned
    }

    /// Keeps only the first `count` particles.
    pub fn truncate(&mut self, count: usize) {
        if count >= self.positions.len() {
            return;
        }
        self.positions.truncate(count);
        self.predicted.truncate(count);
        self.velocities.truncate(count);
        self.accelerations.truncate(count);
        self.densities.truncate(count);
        self.near_densities.truncate(count);
        self.grid_current = false;
    }

    /// Removes every particle.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Advances the fluid by `dt`, repelled by obstacles from `query`.
    ///
    /// Non-positive or non-finite steps are ignored.
    pub fn step<Q: CollisionQuery + ?Sized>(&mut self, dt: f32, query: &Q) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        self.gather_obstacles(query);
        self.advance(dt);
    }

    /// Advances the fluid by `dt` without obstacles.
    pub fn step_isolated(&mut self, dt: f32) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        self.obstacles.clear();
        self.stats.obstacles = 0;
        self.stats.obstacles_truncated = false;
        self.advance(dt);
    }

    /// Rebuilds the obstacle table from colliders overlapping the domain.
    ///
    /// Unbounded colliders have no bounding circle and are skipped without
    /// taking an obstacle slot; twice the obstacle capacity is examined to
    /// leave room for them.
    fn gather_obstacles<Q: CollisionQuery + ?Sized>(&mut self, query: &Q) {
        self.obstacles.clear();
        self.candidates.clear();
        let settings = self.config.obstacles;
        let mut truncated = false;
        if !settings.mask.is_empty() {
            let (min, max) = (self.config.bounds_min, self.config.bounds_max);
            let center = (min + max) * 0.5;
            let radius = (max - min).length() * 0.5 + settings.range;
            query.overlap_circle(center, radius, settings.mask, &mut self.candidates);

            truncated = self.candidates.truncated();
            for &collider in self.candidates.as_slice() {
                let Some(circle) = query.bounding_circle(collider) else {
                    continue;
                };
                if self.obstacles.len() == settings.capacity {
                    truncated = true;
                    break;
                }
                self.obstacles.push(circle);
            }
            if truncated {
                log::debug!(
                    "obstacle list truncated to the first {} colliders",
                    settings.capacity
                );
            }
        }
        self.stats.obstacles = self.obstacles.len();
        self.stats.obstacles_truncated = truncated;
    }

    fn advance(&mut self, dt: f32) {
        let substeps = self.config.substeps;
        let sub_dt = dt / substeps as f32;
        for _ in 0..substeps {
            self.substep(sub_dt);
        }
        self.stats.substeps = substeps;

        self.grid.rebuild(&self.positions);
        self.grid_current = true;
        self.surface.update(&self.positions, self.config.particle_radius);

        let count = self.densities.len();
        self.stats.max_density = self.densities.iter().copied().fold(0.0, f32::max);
        self.stats.mean_density = if count > 0 {
            self.densities.iter().sum::<f32>() / count as f32
        } else {
            0.0
        };
        log::trace!(
            "fluid step: {} particles, mean density {:.3}, {} obstacles",
            count,
            self.stats.mean_density,
            self.stats.obstacles
        );
    }

    fn substep(&mut self, dt: f32) {
        if self.positions.is_empty() {
            return;
        }
        for ((predicted, &position), &velocity) in self
            .predicted
            .iter_mut()
            .zip(&self.positions)
            .zip(&self.velocities)
        {
            *predicted = position + velocity * dt;
        }
        self.grid.rebuild(&self.predicted);
        self.grid_current = false;

        self.compute_densities();
        self.compute_accelerations();
        self.integrate(dt);
    }

    fn compute_densities(&mut self) {
        let h = self.kernels.radius();
        let mass = self.config.particle_mass;

        for i in 0..self.predicted.len() {
            let p = self.predicted[i];
            let mut density = 0.0;
            let mut near_density = 0.0;
            for j in self.grid.neighbors_of(i, h) {
                let r = p.distance(self.predicted[j]);
                if r < h {
                    density += mass * self.kernels.density(r);
                    near_density += mass * self.kernels.near_density(r);
                }
            }
            self.densities[i] = density;
            self.near_densities[i] = near_density;
        }
    }

    fn pressure(&self, density: f32) -> f32 {
        (density - self.config.rest_density) * self.config.pressure_stiffness
    }

    fn near_pressure(&self, near_density: f32) -> f32 {
        near_density * self.config.near_pressure_stiffness
    }

    fn compute_accelerations(&mut self) {
        let h = self.kernels.radius();
        let mass = self.config.particle_mass;

        for i in 0..self.predicted.len() {
            let p = self.predicted[i];
            let density = self.densities[i];
            let mut acceleration = self.config.gravity + self.obstacle_acceleration(p);

            // A particle without density has no pressure to share
            if density > EPSILON {
                let pressure = self.pressure(density);
                let near_pressure = self.near_pressure(self.near_densities[i]);
                let mut pressure_force = Vec2::ZERO;
                let mut viscosity_force = Vec2::ZERO;

                for j in self.grid.neighbors_of(i, h) {
                    if j == i {
                        continue;
                    }
                    let offset = self.predicted[j] - p;
                    let r = offset.length();
                    if r >= h {
                        continue;
                    }
                    // Coincident particles separate along a fixed axis,
                    // opposite for each side of the pair
                    let direction = if r > EPSILON {
                        offset / r
                    } else if i < j {
                        Vec2::X
                    } else {
                        Vec2::NEG_X
                    };

                    let neighbor_density = self.densities[j];
                    if neighbor_density > EPSILON {
                        let shared = (pressure + self.pressure(neighbor_density)) * 0.5;
                        pressure_force += direction
                            * (self.kernels.density_derivative(r) * shared * mass
                                / neighbor_density);
                    }
                    let neighbor_near = self.near_densities[j];
                    if neighbor_near > EPSILON {
                        let shared = (near_pressure + self.near_pressure(neighbor_near)) * 0.5;
                        pressure_force += direction
                            * (self.kernels.near_density_derivative(r) * shared * mass
                                / neighbor_near);
                    }

                    viscosity_force +=
                        (self.velocities[j] - self.velocities[i]) * self.kernels.viscosity(r);
                }

                acceleration += pressure_force / density + viscosity_force * self.config.viscosity;
            }

            self.accelerations[i] = acceleration;
        }
    }

    /// Repulsion from every obstacle whose surface is within range of `p`.
    fn obstacle_acceleration(&self, p: Vec2) -> Vec2 {
        let settings = &self.config.obstacles;
        let mut acceleration = Vec2::ZERO;
        for obstacle in &self.obstacles {
            let offset = p - obstacle.center;
            let distance = offset.length();
            let surface_distance = (distance - obstacle.radius).max(0.0);
            if surface_distance >= settings.range {
                continue;
            }
            let normal = if distance > EPSILON {
                offset / distance
            } else {
                Vec2::Y
            };
            let falloff = (1.0 - surface_distance / settings.range).powf(settings.falloff);
            acceleration += normal * (settings.strength * falloff);
        }
        acceleration
    }

    fn integrate(&mut self, dt: f32) {
        let inset = Vec2::splat(self.config.particle_radius);
        let min = self.config.bounds_min + inset;
        let max = self.config.bounds_max - inset;
        let bounciness = self.config.bounciness;

        for i in 0..self.positions.len() {
            let start = self.positions[i];
            let (mut position, mut velocity) =
                semi_implicit_euler(start, self.velocities[i], self.accelerations[i], dt);
            if let Some(max_speed) = self.config.max_speed {
                let capped = clamp_length(velocity, max_speed);
                if capped != velocity {
                    velocity = capped;
                    position = start + velocity * dt;
                }
            }

            for (axis, normal) in [(0, Vec2::X), (1, Vec2::Y)] {
                if position[axis] < min[axis] {
                    position[axis] = min[axis];
                    velocity = reflect_velocity(velocity, normal, bounciness);
                } else if position[axis] > max[axis] {
                    position[axis] = max[axis];
                    velocity = reflect_velocity(velocity, -normal, bounciness);
                }
            }

            debug_assert!(position.is_finite() && velocity.is_finite());
            self.positions[i] = position;
            self.velocities[i] = velocity;
        }
    }

    /// Kernel-weighted density at an arbitrary point.
    pub fn density_at(&self, point: Vec2) -> f32 {
        let h = self.kernels.radius();
        let mass = self.config.particle_mass;
        let contribution = |q: Vec2| mass * self.kernels.density(point.distance(q));
        if self.grid_current {
            self.grid
                .neighbors(point, h)
                .map(|j| contribution(self.positions[j]))
                .sum()
        } else {
            self.positions.iter().map(|&q| contribution(q)).sum()
        }
    }

    /// Surface height table from the last step, one entry per column.
    pub fn surface_heights(&self) -> &[Option<f32>] {
        self.surface.heights()
    }

    /// Fluid surface height at `x` as of the last step.
    pub fn height_at(&self, x: f32) -> Option<f32> {
        self.surface.height_at(x)
    }

    /// Width of one surface column.
    pub fn surface_column_width(&self) -> f32 {
        self.surface.column_width()
    }

    /// Particle positions.
    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// Particle velocities.
    pub fn velocities(&self) -> &[Vec2] {
        &self.velocities
    }

    /// Particle densities from the last substep.
    pub fn densities(&self) -> &[f32] {
        &self.densities
    }

    /// Particle near-densities from the last substep.
    pub fn near_densities(&self) -> &[f32] {
        &self.near_densities
    }

    /// Obstacles used in the last tick.
    pub fn obstacles(&self) -> &[BoundingCircle] {
        &self.obstacles
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if there are no particles.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Maximum number of particles.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Summary of the last step.
    pub fn stats(&self) -> &StepStats {
        &self.stats
    }

    /// Configuration in effect.
    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    /// Kernels for the configured smoothing radius.
    pub fn kernels(&self) -> &Kernels {
        &self.kernels
    }
}
