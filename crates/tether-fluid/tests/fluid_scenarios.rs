//! Multi-step fluid scenarios.

use glam::Vec2;
use proptest::prelude::*;
use tether_collision::{ColliderSet, Layer, LayerMask, Shape};
use tether_fluid::{Emitter, FluidConfig, FluidSolver, ObstacleConfig};

const DT: f32 = 1.0 / 60.0;

fn packed() -> FluidConfig {
    FluidConfig::default()
        .with_bounds(Vec2::splat(-5.0), Vec2::splat(5.0))
        .with_smoothing_radius(1.0)
        .with_rest_density(2.0)
        .with_pressure(20.0, 1.0)
        .with_gravity(Vec2::ZERO)
        .with_capacity(16)
}

fn pairwise(positions: &[Vec2]) -> Vec<f32> {
    let mut out = Vec::new();
    for i in 0..positions.len() {
        for j in i + 1..positions.len() {
            out.push(positions[i].distance(positions[j]));
        }
    }
    out
}

#[test]
fn test_packed_particles_push_apart() {
    let mut fluid = FluidSolver::new(packed()).unwrap();
    for p in [
        Vec2::new(0.0, 0.0),
        Vec2::new(0.3, 0.0),
        Vec2::new(0.0, 0.3),
        Vec2::new(0.3, 0.3),
    ] {
        fluid.spawn(p, Vec2::ZERO).unwrap();
    }
    let before = pairwise(fluid.positions());

    fluid.step_isolated(DT);
    assert!(fluid.densities().iter().all(|&d| d > 2.0));

    for _ in 0..20 {
        fluid.step_isolated(DT);
    }
    let after = pairwise(fluid.positions());
    for (b, a) in before.iter().zip(&after) {
        assert!(a > b, "pair did not separate: {b} -> {a}");
    }
    // Symmetric start stays centered
    let centroid = fluid.positions().iter().copied().sum::<Vec2>() / 4.0;
    assert!(centroid.distance(Vec2::splat(0.15)) < 1e-3);
}

#[test]
fn test_dam_break_spreads_along_floor() {
    let config = FluidConfig::default()
        .with_capacity(400)
        .with_bounds(Vec2::new(-4.0, -2.0), Vec2::new(4.0, 2.0));
    let mut fluid = FluidSolver::new(config).unwrap();
    fluid.spawn_block(Vec2::new(-3.9, -1.9), Vec2::new(-2.5, 0.5), 0.15);
    let initial_right = fluid.positions().iter().map(|p| p.x).fold(f32::MIN, f32::max);

    for _ in 0..180 {
        fluid.step_isolated(DT);
        for p in fluid.positions() {
            assert!(p.x >= -4.0 && p.x <= 4.0 && p.y >= -2.0 && p.y <= 2.0);
        }
    }

    let right = fluid.positions().iter().map(|p| p.x).fold(f32::MIN, f32::max);
    assert!(right > initial_right + 0.5, "front stayed at {right}");
    assert!(fluid.height_at(-3.5).is_some());
    assert!(fluid.stats().mean_density > 0.0);
}

#[test]
fn test_obstacle_keeps_fluid_out_of_its_core() {
    let mut world = ColliderSet::new();
    let rock = Layer::new(3);
    world.insert(Shape::circle(Vec2::new(0.0, -1.0), 0.5), rock);

    let obstacles = ObstacleConfig {
        strength: 400.0,
        range: 0.4,
        ..ObstacleConfig::on(LayerMask::from(rock))
    };
    let config = packed()
        .with_gravity(Vec2::new(0.0, -10.0))
        .with_obstacles(obstacles);
    let mut fluid = FluidSolver::new(config).unwrap();
    fluid.spawn_block(Vec2::new(-0.5, 0.5), Vec2::new(0.5, 1.0), 0.5);

    for _ in 0..120 {
        fluid.step(DT, &world);
        for p in fluid.positions() {
            assert!(p.distance(Vec2::new(0.0, -1.0)) > 0.25, "particle inside obstacle at {p:?}");
        }
    }
    assert_eq!(fluid.stats().obstacles, 1);
}

#[test]
fn test_emitter_fills_container() {
    let config = packed().with_gravity(Vec2::new(0.0, -10.0)).with_capacity(40);
    let mut fluid = FluidSolver::new(config).unwrap();
    let mut emitter = Emitter::new(Vec2::new(0.0, 4.0), Vec2::new(0.0, -1.0), 30.0).with_width(1.0);

    for _ in 0..240 {
        fluid.emit(&mut emitter, DT);
        fluid.step_isolated(DT);
    }
    assert_eq!(fluid.len(), 40);
    assert!(fluid.height_at(0.0).is_some());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_particles_stay_in_bounds(
        seeds in prop::collection::vec((-3.0f32..3.0, -3.0f32..3.0, -20.0f32..20.0, -20.0f32..20.0), 1..40),
        steps in 1usize..40,
    ) {
        let config = FluidConfig::default()
            .with_capacity(64)
            .with_bounds(Vec2::splat(-3.0), Vec2::splat(3.0));
        let mut fluid = FluidSolver::new(config).unwrap();
        for (x, y, vx, vy) in seeds {
            fluid.spawn(Vec2::new(x, y), Vec2::new(vx, vy));
        }

        let inner_min = Vec2::splat(-3.0 + config.particle_radius) - Vec2::splat(1e-4);
        let inner_max = Vec2::splat(3.0 - config.particle_radius) + Vec2::splat(1e-4);
        for _ in 0..steps {
            fluid.step_isolated(DT);
            for (p, v) in fluid.positions().iter().zip(fluid.velocities()) {
                prop_assert!(p.cmpge(inner_min).all() && p.cmple(inner_max).all(), "escaped: {:?}", p);
                prop_assert!(v.length() <= 25.0 * (1.0 + config.bounciness) + 1e-3);
            }
        }
    }
}
