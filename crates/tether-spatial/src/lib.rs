//! Counting-sort spatial hash grid for 2D neighbor search.
//!
//! Space is divided into a fixed `width x height` grid of square cells. Every
//! rebuild assigns each point a cell id, counts points per cell, turns the
//! counts into start offsets with a prefix sum, and scatters point indices into
//! one flat array ordered by cell. Neighbor queries then walk a small block of
//! cells and yield indices; callers filter by actual distance.
//!
//! Positions outside the grid are clamped into the nearest border cell, so the
//! grid never rejects a point.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use tether_spatial::{GridConfig, SpatialHashGrid};
//!
//! let config = GridConfig::covering(Vec2::ZERO, Vec2::splat(10.0), 1.0).unwrap();
//! let mut grid = SpatialHashGrid::new(config, 3).unwrap();
//!
//! let points = [Vec2::new(0.5, 0.5), Vec2::new(0.6, 0.4), Vec2::new(8.0, 8.0)];
//! grid.rebuild(&points);
//!
//! let near: Vec<usize> = grid.neighbors(Vec2::new(0.5, 0.5), 1.0).collect();
//! assert!(near.contains(&0) && near.contains(&1));
//! assert!(!near.contains(&2));
//! ```

mod error;

pub use error::{GridError, GridResult};

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dimensions of a [`SpatialHashGrid`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridConfig {
    /// World position of the grid's minimum corner.
    pub origin: Vec2,
    /// Edge length of a cell. Use the query radius (e.g. the SPH smoothing
    /// radius) so one ring of neighbor cells covers it.
    pub cell_size: f32,
    /// Cells along x.
    pub width: u32,
    /// Cells along y.
    pub height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            cell_size: 1.0,
            width: 64,
            height: 64,
        }
    }
}

impl GridConfig {
    /// Creates a config whose cells cover the box `[min, max]`.
    pub fn covering(min: Vec2, max: Vec2, cell_size: f32) -> GridResult<Self> {
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        let size = max - min;
        if !(size.x > 0.0 && size.y > 0.0) || !size.is_finite() {
            return Err(GridError::InvalidBounds {
                min: min.to_array(),
                max: max.to_array(),
            });
        }
        let cells = (size / cell_size).ceil();
        Ok(Self {
            origin: min,
            cell_size,
            width: (cells.x as u32).max(1),
            height: (cells.y as u32).max(1),
        })
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Checks that the config describes a usable grid.
    pub fn validate(&self) -> GridResult<()> {
        if !(self.cell_size > 0.0 && self.cell_size.is_finite()) {
            return Err(GridError::InvalidCellSize(self.cell_size));
        }
        if self.width == 0 || self.height == 0 {
            return Err(GridError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        if (self.width as u64) * (self.height as u64) >= u32::MAX as u64 {
            return Err(GridError::TooManyCells {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// A uniform 2D grid rebuilt from scratch every step.
#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    config: GridConfig,
    inv_cell_size: f32,
    /// Points per cell from the last rebuild.
    cell_counts: Vec<u32>,
    /// Exclusive prefix sum of `cell_counts`, one extra trailing entry.
    cell_starts: Vec<u32>,
    /// Point indices ordered by cell.
    sorted: Vec<u32>,
    /// Cell id of each point.
    point_cells: Vec<u32>,
    /// Scatter cursors, reused between rebuilds.
    cursors: Vec<u32>,
    len: usize,
}

impl SpatialHashGrid {
    /// Creates a grid with buffers sized for `capacity` points.
    pub fn new(config: GridConfig, capacity: usize) -> GridResult<Self> {
        config.validate()?;
        let cells = config.cell_count();
        log::debug!(
            "spatial grid {}x{} cells of {} for {} points",
            config.width,
            config.height,
            config.cell_size,
            capacity
        );
        Ok(Self {
            config,
            inv_cell_size: 1.0 / config.cell_size,
            cell_counts: vec![0; cells],
            cell_starts: vec![0; cells + 1],
            sorted: vec![0; capacity],
            point_cells: vec![0; capacity],
            cursors: vec![0; cells],
            len: 0,
        })
    }

    /// Returns the grid dimensions.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Returns the cell size.
    pub fn cell_size(&self) -> f32 {
        self.config.cell_size
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cell_counts.len()
    }

    /// Number of points bucketed by the last rebuild.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the last rebuild held no points.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cell coordinates containing `position`, clamped into the grid.
    pub fn cell_coords(&self, position: Vec2) -> (u32, u32) {
        let local = (position - self.config.origin) * self.inv_cell_size;
        (
            clamp_axis(local.x, self.config.width),
            clamp_axis(local.y, self.config.height),
        )
    }

    /// Cell id `x + width * y` of the cell containing `position`.
    pub fn cell_id(&self, position: Vec2) -> u32 {
        let (x, y) = self.cell_coords(position);
        x + self.config.width * y
    }

    /// Cell id assigned to point `index` by the last rebuild.
    pub fn cell_of(&self, index: usize) -> Option<u32> {
        (index < self.len).then(|| self.point_cells[index])
    }

    /// Re-buckets all points. Must run before any query in a step.
    pub fn rebuild(&mut self, positions: &[Vec2]) {
        let n = positions.len();
        if n > self.sorted.len() {
            log::debug!(
                "spatial grid grows from {} to {} points",
                self.sorted.len(),
                n
            );
            self.sorted.resize(n, 0);
            self.point_cells.resize(n, 0);
        }
        self.len = n;

        self.cell_counts.fill(0);
        for (i, &position) in positions.iter().enumerate() {
            let cell = self.cell_id(position);
            self.point_cells[i] = cell;
            self.cell_counts[cell as usize] += 1;
        }

        let mut running = 0;
        for (start, &count) in self.cell_starts.iter_mut().zip(&self.cell_counts) {
            *start = running;
            running += count;
        }
        let cells = self.cell_counts.len();
        self.cell_starts[cells] = running;

        // Stable scatter: indices land in ascending order within each cell
        self.cursors.copy_from_slice(&self.cell_starts[..cells]);
        for i in 0..n {
            let cell = self.point_cells[i] as usize;
            let slot = self.cursors[cell] as usize;
            self.sorted[slot] = i as u32;
            self.cursors[cell] += 1;
        }
    }

    /// Point indices bucketed into `cell`.
    pub fn cell_points(&self, cell: u32) -> &[u32] {
        let cell = cell as usize;
        if cell >= self.cell_counts.len() {
            return &[];
        }
        let start = self.cell_starts[cell] as usize;
        let end = self.cell_starts[cell + 1] as usize;
        &self.sorted[start..end]
    }

    /// Iterates candidate neighbors of `position` within `radius`.
    ///
    /// Covers the block of cells `ceil(radius / cell_size)` rings around the
    /// containing cell (at least one ring). Candidates are not distance
    /// filtered and include any point sharing the position.
    pub fn neighbors(&self, position: Vec2, radius: f32) -> Neighbors<'_> {
        let (cx, cy) = self.cell_coords(position);
        self.neighbors_around(cx, cy, radius)
    }

    /// Iterates candidate neighbors of point `index` from the last rebuild.
    ///
    /// The point itself is included. An index beyond the last rebuild yields
    /// nothing.
    pub fn neighbors_of(&self, index: usize, radius: f32) -> Neighbors<'_> {
        match self.cell_of(index) {
            Some(cell) => {
                let cx = cell % self.config.width;
                let cy = cell / self.config.width;
                self.neighbors_around(cx, cy, radius)
            }
            None => Neighbors::empty(self),
        }
    }

    fn neighbors_around(&self, cx: u32, cy: u32, radius: f32) -> Neighbors<'_> {
        let rings = if radius.is_finite() && radius > 0.0 {
            ((radius * self.inv_cell_size).ceil() as u32).max(1)
        } else {
            1
        };
        let x0 = cx.saturating_sub(rings);
        let x1 = cx.saturating_add(rings).min(self.config.width - 1);
        let y0 = cy.saturating_sub(rings);
        let y1 = cy.saturating_add(rings).min(self.config.height - 1);

        let mut iter = Neighbors {
            grid: self,
            x0,
            x1,
            y1,
            x: x0,
            y: y0,
            slot: 0,
            end: 0,
            done: false,
        };
        iter.load_cell();
        iter
    }
}

#[inline]
fn clamp_axis(local: f32, cells: u32) -> u32 {
    if local.is_nan() || local < 0.0 {
        return 0;
    }
    (local.floor() as u64).min(cells as u64 - 1) as u32
}

/// Iterator over candidate neighbor indices, produced by
/// [`SpatialHashGrid::neighbors`].
#[derive(Debug, Clone)]
pub struct Neighbors<'a> {
    grid: &'a SpatialHashGrid,
    x0: u32,
    x1: u32,
    y1: u32,
    x: u32,
    y: u32,
    slot: usize,
    end: usize,
    done: bool,
}

impl<'a> Neighbors<'a> {
    fn empty(grid: &'a SpatialHashGrid) -> Self {
        Self {
            grid,
            x0: 0,
            x1: 0,
            y1: 0,
            x: 0,
            y: 0,
            slot: 0,
            end: 0,
            done: true,
        }
    }

    fn load_cell(&mut self) {
        let cell = (self.x + self.grid.config.width * self.y) as usize;
        self.slot = self.grid.cell_starts[cell] as usize;
        self.end = self.grid.cell_starts[cell + 1] as usize;
    }

    fn advance_cell(&mut self) -> bool {
        if self.x < self.x1 {
            self.x += 1;
        } else if self.y < self.y1 {
            self.x = self.x0;
            self.y += 1;
        } else {
            self.done = true;
            return false;
        }
        self.load_cell();
        true
    }
}

impl Iterator for Neighbors<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        loop {
            if self.slot < self.end {
                let index = self.grid.sorted[self.slot];
                self.slot += 1;
                return Some(index as usize);
            }
            if !self.advance_cell() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid(size: u32) -> SpatialHashGrid {
        let config = GridConfig {
            origin: Vec2::ZERO,
            cell_size: 1.0,
            width: size,
            height: size,
        };
        SpatialHashGrid::new(config, 16).unwrap()
    }

    #[test]
    fn test_covering_config() {
        let config = GridConfig::covering(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 4.0), 0.5).unwrap();
        assert_eq!(config.width, 20);
        assert_eq!(config.height, 8);
        assert_eq!(config.origin, Vec2::new(-5.0, 0.0));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            GridConfig::covering(Vec2::ZERO, Vec2::ONE, 0.0),
            Err(GridError::InvalidCellSize(_))
        ));
        assert!(matches!(
            GridConfig::covering(Vec2::ONE, Vec2::ZERO, 1.0),
            Err(GridError::InvalidBounds { .. })
        ));
        let config = GridConfig {
            width: 0,
            ..GridConfig::default()
        };
        assert!(matches!(
            SpatialHashGrid::new(config, 4),
            Err(GridError::EmptyGrid { .. })
        ));
        let config = GridConfig {
            cell_size: f32::NAN,
            ..GridConfig::default()
        };
        assert!(SpatialHashGrid::new(config, 4).is_err());
    }

    #[test]
    fn test_cell_id_layout() {
        let grid = unit_grid(4);
        assert_eq!(grid.cell_id(Vec2::new(0.5, 0.5)), 0);
        assert_eq!(grid.cell_id(Vec2::new(1.5, 0.5)), 1);
        assert_eq!(grid.cell_id(Vec2::new(0.5, 1.5)), 4);
        assert_eq!(grid.cell_id(Vec2::new(3.9, 3.9)), 15);
    }

    #[test]
    fn test_out_of_grid_positions_clamp() {
        let grid = unit_grid(4);
        assert_eq!(grid.cell_coords(Vec2::new(-10.0, -3.0)), (0, 0));
        assert_eq!(grid.cell_coords(Vec2::new(100.0, 2.5)), (3, 2));
        assert_eq!(grid.cell_coords(Vec2::new(f32::NAN, 1e30)), (0, 3));
    }

    #[test]
    fn test_rebuild_counts_and_order() {
        let mut grid = unit_grid(4);
        let points = [
            Vec2::new(2.5, 2.5),
            Vec2::new(0.5, 0.5),
            Vec2::new(2.2, 2.7),
            Vec2::new(0.1, 0.9),
        ];
        grid.rebuild(&points);

        assert_eq!(grid.len(), 4);
        assert_eq!(grid.cell_points(0), [1u32, 3].as_slice());
        assert_eq!(grid.cell_points(10), [0u32, 2].as_slice());
        assert!(grid.cell_points(5).is_empty());
        assert!(grid.cell_points(999).is_empty());
    }

    #[test]
    fn test_identical_positions_all_neighbors() {
        let mut grid = unit_grid(4);
        let points = [Vec2::splat(1.5); 5];
        grid.rebuild(&points);

        for i in 0..points.len() {
            let mut found: Vec<usize> = grid.neighbors_of(i, 1.0).collect();
            found.sort_unstable();
            assert_eq!(found, vec![0, 1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_neighbors_span_adjacent_cells() {
        let mut grid = unit_grid(8);
        let points = [
            Vec2::new(3.9, 3.9),
            Vec2::new(4.1, 4.1),
            Vec2::new(2.1, 4.0),
            Vec2::new(6.5, 6.5),
        ];
        grid.rebuild(&points);

        let found: Vec<usize> = grid.neighbors(points[0], 1.0).collect();
        assert!(found.contains(&0));
        assert!(found.contains(&1));
        assert!(found.contains(&2));
        assert!(!found.contains(&3));
    }

    #[test]
    fn test_larger_radius_widens_search() {
        let mut grid = unit_grid(8);
        let points = [Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5)];
        grid.rebuild(&points);

        assert!(!grid.neighbors(points[0], 1.0).any(|i| i == 1));
        assert!(grid.neighbors(points[0], 2.0).any(|i| i == 1));
    }

    #[test]
    fn test_rebuild_clears_previous_state() {
        let mut grid = unit_grid(4);
        grid.rebuild(&[Vec2::new(0.5, 0.5), Vec2::new(0.5, 0.5)]);
        grid.rebuild(&[Vec2::new(3.5, 3.5)]);

        assert_eq!(grid.len(), 1);
        assert!(grid.cell_points(0).is_empty());
        assert_eq!(grid.cell_points(15), [0u32].as_slice());
        assert_eq!(grid.neighbors_of(1, 1.0).count(), 0);
    }

    #[test]
    fn test_rebuild_grows_past_capacity() {
        let config = GridConfig {
            width: 2,
            height: 2,
            ..GridConfig::default()
        };
        let mut grid = SpatialHashGrid::new(config, 1).unwrap();
        grid.rebuild(&[Vec2::ZERO, Vec2::ONE, Vec2::new(1.5, 0.2)]);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.neighbors(Vec2::ZERO, 1.0).count(), 3);
    }

    #[test]
    fn test_empty_rebuild() {
        let mut grid = unit_grid(2);
        grid.rebuild(&[]);
        assert!(grid.is_empty());
        assert_eq!(grid.neighbors(Vec2::ZERO, 1.0).count(), 0);
    }
}
