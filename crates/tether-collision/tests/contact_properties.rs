//! Property tests for contact resolution.
//!
//! - resolving twice without motion changes nothing
//! - a resolved point ends outside every collider it was pushed from
//! - a point wedged between two surfaces settles in one call

use glam::Vec2;
use proptest::prelude::*;
use tether_collision::{
    CONTACT_SLOP, CandidateBuffer, ColliderHandle, ColliderSet, CollisionQuery, ContactSettings,
    Layer, LayerMask, Shape, resolve_point,
};

fn vec2(range: f32) -> impl Strategy<Value = Vec2> {
    (-range..range, -range..range).prop_map(|(x, y)| Vec2::new(x, y))
}

fn shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        (vec2(4.0), 0.2f32..2.0).prop_map(|(c, r)| Shape::circle(c, r)),
        (vec2(4.0), vec2(4.0)).prop_map(|(a, b)| Shape::aabb(a, b + Vec2::splat(0.5))),
        (vec2(4.0), vec2(4.0), 0.0f32..1.0).prop_map(|(a, b, r)| Shape::capsule(a, b, r)),
        (-3.0f32..3.0).prop_map(Shape::ground),
    ]
}

fn settings() -> ContactSettings {
    ContactSettings::default().with_radius(0.1).with_bounciness(0.3).with_friction(0.2)
}

fn wedge(left: Vec2, right: Vec2) -> ColliderSet {
    let mut world = ColliderSet::new();
    world.insert(Shape::plane(Vec2::ZERO, left), Layer::DEFAULT);
    world.insert(Shape::plane(Vec2::ZERO, right), Layer::DEFAULT);
    world
}

#[test]
fn test_point_in_crevice_settles_in_one_call() {
    let world = wedge(Vec2::new(0.94, 0.34), Vec2::new(-0.94, 0.34));
    let mut buffer = CandidateBuffer::new(4);
    let mut p = Vec2::new(0.0, 0.05);
    let mut last = p;

    resolve_point(&world, &mut p, &mut last, &settings(), LayerMask::ALL, &mut buffer);
    let (p1, last1) = (p, last);
    let again = resolve_point(&world, &mut p, &mut last, &settings(), LayerMask::ALL, &mut buffer);

    assert!((p - p1).length() < 1e-5, "moved from {p1:?} to {p:?}");
    assert!((last - last1).length() < 1e-5);
    assert!(again.is_some());
    // Symmetric crevice: the point rises straight up between the walls
    assert!(p.x.abs() < 1e-4);
    for handle in [ColliderHandle(0), ColliderHandle(1)] {
        let surface = world.closest_point(handle, p).unwrap();
        assert!(surface.distance >= settings().radius - CONTACT_SLOP);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_single_collider_resolution_is_idempotent(
        shape in shape(),
        position in vec2(5.0),
        motion in vec2(0.5),
    ) {
        let mut world = ColliderSet::new();
        world.insert(shape, Layer::DEFAULT);
        let mut buffer = CandidateBuffer::new(4);

        let mut p = position;
        let mut last = position - motion;
        resolve_point(&world, &mut p, &mut last, &settings(), LayerMask::ALL, &mut buffer);

        let (p1, last1) = (p, last);
        resolve_point(&world, &mut p, &mut last, &settings(), LayerMask::ALL, &mut buffer);

        prop_assert!((p - p1).length() < 1e-4);
        prop_assert!((last - last1).length() < 1e-4);
    }

    #[test]
    fn test_resolved_point_clears_convex_collider(
        center in vec2(3.0),
        radius in 0.2f32..2.0,
        position in vec2(5.0),
    ) {
        let mut world = ColliderSet::new();
        let handle = world.insert(Shape::circle(center, radius), Layer::DEFAULT);
        let mut buffer = CandidateBuffer::new(4);

        let mut p = position;
        let mut last = position;
        resolve_point(&world, &mut p, &mut last, &settings(), LayerMask::ALL, &mut buffer);

        let surface = world.closest_point(handle, p).unwrap();
        prop_assert!(surface.distance >= settings().radius - CONTACT_SLOP - 1e-4);
    }

    #[test]
    fn test_two_surface_resolution_is_idempotent(
        left in -1.3f32..1.3,
        right in -1.3f32..1.3,
        left_point in vec2(1.0),
        right_point in vec2(1.0),
        position in vec2(1.5),
        motion in vec2(0.3),
    ) {
        let mut world = ColliderSet::new();
        let up = |angle: f32| Vec2::new(angle.sin(), angle.cos());
        world.insert(Shape::plane(left_point, up(left)), Layer::DEFAULT);
        world.insert(Shape::plane(right_point, up(right)), Layer::DEFAULT);
        let mut buffer = CandidateBuffer::new(4);

        let mut p = position;
        let mut last = position - motion;
        resolve_point(&world, &mut p, &mut last, &settings(), LayerMask::ALL, &mut buffer);

        let (p1, last1) = (p, last);
        resolve_point(&world, &mut p, &mut last, &settings(), LayerMask::ALL, &mut buffer);

        prop_assert!((p - p1).length() < 1e-4, "moved from {:?} to {:?}", p1, p);
        prop_assert!((last - last1).length() < 1e-4);
        for handle in [ColliderHandle(0), ColliderHandle(1)] {
            let surface = world.closest_point(handle, p).unwrap();
            prop_assert!(surface.distance >= settings().radius - CONTACT_SLOP - 1e-4);
        }
    }
}
