//! Headless demo: a rope, a spring mesh and a fluid tank sharing one scene.
//!
//! A rope hangs from the ceiling and drapes over a rock, a soft pad sits on
//! the floor, and water pours from a nozzle onto both. Every half second the
//! demo prints a short status line.
//!
//! Run with: `RUST_LOG=debug cargo run -p tether --example tank_demo`

use tether::prelude::*;

const DT: f32 = 1.0 / 60.0;
const SECONDS: usize = 6;

fn main() {
    env_logger::init();

    let rock = Layer::new(1);
    let mut world = ColliderSet::new();
    world.insert(Shape::ground(-3.0), Layer::DEFAULT);
    world.insert(Shape::circle(Vec2::new(0.5, -1.0), 0.6), rock);
    world.insert(Shape::aabb(Vec2::new(-4.0, -3.0), Vec2::new(-3.0, -1.5)), Layer::DEFAULT);

    let rope_config = RopeConfig::default()
        .with_node_count(24)
        .with_node_spacing(0.15)
        .with_drag(0.3)
        .with_auto_anchor(LayerMask::from(rock));
    let mut rope = match Rope::new(rope_config, Vec2::new(-0.5, 2.5), Vec2::X) {
        Ok(rope) => rope,
        Err(e) => {
            eprintln!("Invalid rope: {}", e);
            return;
        }
    };

    let mesh_config = SpringMeshConfig::default()
        .with_size(10, 4)
        .with_spacing(0.2)
        .with_collisions(LayerMask::ALL, ContactSettings::default());
    let mut pad = match SpringMesh::new(mesh_config, Vec2::new(2.0, -3.0)) {
        Ok(mesh) => mesh,
        Err(e) => {
            eprintln!("Invalid mesh: {}", e);
            return;
        }
    };

    let fluid_config = FluidConfig::default()
        .with_capacity(1200)
        .with_bounds(Vec2::new(-4.5, -3.0), Vec2::new(4.5, 3.0))
        .with_obstacles(ObstacleConfig::on(LayerMask::from(rock)));
    let mut fluid = match FluidSolver::new(fluid_config) {
        Ok(fluid) => fluid,
        Err(e) => {
            eprintln!("Invalid fluid: {}", e);
            return;
        }
    };
    let mut nozzle = Emitter::new(Vec2::new(0.4, 2.5), Vec2::new(0.0, -3.0), 200.0).with_width(0.4);

    let steps = SECONDS * 60;
    for step in 1..=steps {
        fluid.emit(&mut nozzle, DT);
        fluid.step(DT, &world);
        rope.step(DT, &world);
        pad.step(DT, &world);

        if step % 30 == 0 {
            let report = rope.last_report();
            let stats = fluid.stats();
            println!(
                "t={:.1}s rope: length {:.2}/{:.2} error {:.4} contacts {} | fluid: {} particles, mean density {:.1}, surface at x=0: {}",
                step as f32 * DT,
                rope.current_length(),
                rope.rest_length(),
                report.max_error,
                report.contacts,
                fluid.len(),
                stats.mean_density,
                fluid
                    .height_at(0.0)
                    .map_or_else(|| "-".to_string(), |h| format!("{:.2}", h)),
            );
        }
    }

    // Splash the pad and let it recover
    let hit = pad.apply_impulse(Vec2::new(2.9, -2.4), 0.5, Vec2::new(0.0, -2.0));
    for _ in 0..60 {
        pad.step(DT, &world);
    }
    println!("Impulse moved {} pad nodes", hit);
}
