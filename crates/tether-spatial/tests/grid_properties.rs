//! Property tests for the counting-sort grid.
//!
//! - every point lands in exactly one cell
//! - a neighbor query never misses a point inside the query radius
//! - points sharing a position see each other

use glam::Vec2;
use proptest::prelude::*;
use tether_spatial::{GridConfig, SpatialHashGrid};

const EXTENT: f32 = 20.0;
const CELL: f32 = 1.5;

fn point() -> impl Strategy<Value = Vec2> {
    // Slightly wider than the grid so clamping is exercised too
    (-2.0f32..EXTENT + 2.0, -2.0f32..EXTENT + 2.0).prop_map(|(x, y)| Vec2::new(x, y))
}

fn grid_for(points: &[Vec2]) -> SpatialHashGrid {
    let config = GridConfig::covering(Vec2::ZERO, Vec2::splat(EXTENT), CELL).unwrap();
    let mut grid = SpatialHashGrid::new(config, points.len()).unwrap();
    grid.rebuild(points);
    grid
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_every_point_bucketed_once(points in prop::collection::vec(point(), 0..200)) {
        let grid = grid_for(&points);
        let mut seen = vec![0u32; points.len()];
        for cell in 0..grid.cell_count() as u32 {
            for &i in grid.cell_points(cell) {
                seen[i as usize] += 1;
            }
        }
        prop_assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_neighbors_cover_radius(
        points in prop::collection::vec(point(), 1..150),
        radius in 0.1f32..4.0,
    ) {
        let grid = grid_for(&points);
        for (i, &p) in points.iter().enumerate() {
            let found: Vec<usize> = grid.neighbors_of(i, radius).collect();
            for (j, &q) in points.iter().enumerate() {
                // Clamped points are only guaranteed inside the grid domain
                let inside = |v: Vec2| v.x >= 0.0 && v.y >= 0.0 && v.x < EXTENT && v.y < EXTENT;
                if inside(p) && inside(q) && p.distance(q) <= radius {
                    prop_assert!(found.contains(&j), "point {} missed neighbor {}", i, j);
                }
            }
        }
    }

    #[test]
    fn test_identical_points_find_each_other(at in point(), count in 1usize..20) {
        let points = vec![at; count];
        let grid = grid_for(&points);
        for i in 0..count {
            let mut found: Vec<usize> = grid.neighbors_of(i, CELL).collect();
            found.sort_unstable();
            prop_assert_eq!(found, (0..count).collect::<Vec<_>>());
        }
    }
}
