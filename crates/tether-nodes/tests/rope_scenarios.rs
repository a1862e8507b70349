//! Rope and spring mesh scenarios run over many steps.

use glam::Vec2;
use proptest::prelude::*;
use tether_collision::{ColliderSet, ContactSettings, Layer, NoColliders, Shape};
use tether_nodes::{Rope, RopeConfig, SpringMesh, SpringMeshConfig};

const DT: f32 = 1.0 / 60.0;

#[test]
fn test_two_node_pendulum_settles_below_anchor() {
    let config = RopeConfig::default()
        .with_node_count(2)
        .with_node_spacing(1.0)
        .with_drag(2.0);
    let mut rope = Rope::new(config, Vec2::ZERO, Vec2::X).unwrap();

    for _ in 0..1800 {
        rope.step(DT, &NoColliders);
    }

    let [anchor, bob] = [rope.positions()[0], rope.positions()[1]];
    assert_eq!(anchor, Vec2::ZERO);
    assert!((anchor.distance(bob) - 1.0).abs() <= config.tolerance + 1e-5);
    assert!(bob.x.abs() < 0.05, "bob still swinging: {bob:?}");
    assert!(bob.y < -0.99);
}

#[test]
fn test_anchored_node_never_moves() {
    let mut world = ColliderSet::new();
    world.insert(Shape::circle(Vec2::new(1.0, -1.0), 0.4), Layer::DEFAULT);
    let config = RopeConfig::default().with_node_count(10).with_node_spacing(0.3);
    let mut rope = Rope::new(config, Vec2::ZERO, Vec2::new(1.0, 0.2)).unwrap();
    rope.anchor(5).unwrap();
    let pinned = rope.positions()[5];

    for _ in 0..300 {
        rope.step(DT, &world);
        assert_eq!(rope.positions()[0], Vec2::ZERO);
        assert_eq!(rope.positions()[5], pinned);
    }
}

#[test]
fn test_rope_drapes_over_circle() {
    let mut world = ColliderSet::new();
    world.insert(Shape::circle(Vec2::new(0.0, -1.0), 0.5), Layer::DEFAULT);
    let config = RopeConfig::default()
        .with_node_count(12)
        .with_node_spacing(0.2)
        .with_anchor_start(false)
        .with_drag(0.5)
        .with_contact(ContactSettings::default().with_radius(0.05));
    let mut rope = Rope::new(config, Vec2::new(-1.1, 0.0), Vec2::X).unwrap();

    for _ in 0..240 {
        rope.step(DT, &world);
        for p in rope.positions() {
            assert!(p.distance(Vec2::new(0.0, -1.0)) >= 0.5 + 0.05 - 1e-3);
        }
    }
}

#[test]
fn test_mesh_rests_on_ground() {
    let mut world = ColliderSet::new();
    world.insert(Shape::ground(0.0), Layer::new(1));
    let config = SpringMeshConfig::default()
        .with_size(4, 3)
        .with_freeze(tether_nodes::MeshFreeze::NONE)
        .with_collisions(Layer::new(1).mask(), ContactSettings::default().with_radius(0.05));
    let mut mesh = SpringMesh::new(config, Vec2::new(0.0, 1.0)).unwrap();

    for _ in 0..600 {
        mesh.step(1.0 / 120.0, &world);
    }
    for p in mesh.positions() {
        assert!(p.y >= 0.05 - 1e-3);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_step_displacement_is_bounded(
        node_count in 2usize..12,
        spacing in 0.05f32..0.5,
        max_speed in 0.5f32..20.0,
        angle in 0.0f32..std::f32::consts::TAU,
        steps in 1usize..60,
    ) {
        let mut world = ColliderSet::new();
        world.insert(Shape::ground(-1.0), Layer::DEFAULT);
        let config = RopeConfig::default()
            .with_node_count(node_count)
            .with_node_spacing(spacing)
            .with_max_speed(max_speed);
        let direction = Vec2::from_angle(angle);
        let mut rope = Rope::new(config, Vec2::ZERO, direction).unwrap();

        for _ in 0..steps {
            rope.step(DT, &world);
            for node in rope.nodes() {
                let moved = node.displacement().length();
                prop_assert!(moved <= max_speed * DT * (1.0 + 1e-4) + 1e-6);
            }
            prop_assert_eq!(rope.positions()[0], Vec2::ZERO);
        }
    }

    #[test]
    fn test_free_rope_segments_within_tolerance(
        node_count in 2usize..7,
        spacing in 0.1f32..0.5,
        steps in 1usize..30,
    ) {
        let config = RopeConfig::default()
            .with_node_count(node_count)
            .with_node_spacing(spacing)
            .with_constraint_iterations(200);
        let mut rope = Rope::new(config, Vec2::ZERO, Vec2::X).unwrap();

        for _ in 0..steps {
            rope.step(DT, &NoColliders);
        }
        prop_assert!(rope.max_constraint_error() <= config.tolerance + 1e-4);
    }
}
