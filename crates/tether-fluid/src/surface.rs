//! Column height table of the fluid's free surface.

use glam::Vec2;

/// Highest particle in each vertical column of the container.
///
/// Columns tile `[min_x, max_x]` with a width close to the smoothing radius.
/// Empty columns have no height.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceHeights {
    min_x: f32,
    max_x: f32,
    column_width: f32,
    heights: Vec<Option<f32>>,
}

impl SurfaceHeights {
    /// Creates an empty table over `[min_x, max_x]` with columns about
    /// `target_width` wide.
    pub fn new(min_x: f32, max_x: f32, target_width: f32) -> Self {
        let span = (max_x - min_x).max(0.0);
        let columns = ((span / target_width).ceil() as usize).max(1);
        Self {
            min_x,
            max_x,
            column_width: span / columns as f32,
            heights: vec![None; columns],
        }
    }

    /// Recomputes every column from `positions`, lifted by `radius`.
    pub fn update(&mut self, positions: &[Vec2], radius: f32) {
        self.heights.fill(None);
        if self.column_width <= 0.0 {
            return;
        }
        let last = self.heights.len() - 1;
        for p in positions {
            let column = (((p.x - self.min_x) / self.column_width).floor().max(0.0) as usize).min(last);
            let top = p.y + radius;
            let slot = &mut self.heights[column];
            *slot = Some(slot.map_or(top, |h| h.max(top)));
        }
    }

    /// Per-column heights, left to right.
    pub fn heights(&self) -> &[Option<f32>] {
        &self.heights
    }

    /// Width of one column.
    pub fn column_width(&self) -> f32 {
        self.column_width
    }

    /// Surface height at `x`, linearly interpolated between column centers.
    ///
    /// `None` outside the container or where no nearby column holds fluid.
    /// When only one of the two bracketing columns holds fluid, its height is
    /// returned as is.
    pub fn height_at(&self, x: f32) -> Option<f32> {
        if !(x >= self.min_x && x <= self.max_x) || self.column_width <= 0.0 {
            return None;
        }
        let last = self.heights.len() - 1;
        let t = (x - self.min_x) / self.column_width - 0.5;
        let left = (t.floor().max(0.0) as usize).min(last);
        let right = (left + 1).min(last);
        let frac = (t - left as f32).clamp(0.0, 1.0);

        match (self.heights[left], self.heights[right]) {
            (Some(a), Some(b)) => Some(a + (b - a) * frac),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_tile_the_span() {
        let surface = SurfaceHeights::new(0.0, 10.0, 3.0);
        assert_eq!(surface.heights().len(), 4);
        assert!((surface.column_width() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_update_takes_highest_particle() {
        let mut surface = SurfaceHeights::new(0.0, 4.0, 1.0);
        surface.update(
            &[Vec2::new(0.5, 1.0), Vec2::new(0.7, 2.0), Vec2::new(3.5, 0.5)],
            0.0,
        );
        assert_eq!(surface.heights(), &[Some(2.0), None, None, Some(0.5)]);
    }

    #[test]
    fn test_height_at_interpolates() {
        let mut surface = SurfaceHeights::new(0.0, 2.0, 1.0);
        surface.update(&[Vec2::new(0.5, 1.0), Vec2::new(1.5, 3.0)], 0.0);

        assert_eq!(surface.height_at(0.5), Some(1.0));
        assert_eq!(surface.height_at(1.0), Some(2.0));
        assert_eq!(surface.height_at(1.5), Some(3.0));
        // Beyond the outer column centers the edge value holds
        assert_eq!(surface.height_at(0.1), Some(1.0));
        assert_eq!(surface.height_at(1.9), Some(3.0));
        assert_eq!(surface.height_at(2.5), None);
    }

    #[test]
    fn test_height_at_with_gaps() {
        let mut surface = SurfaceHeights::new(0.0, 3.0, 1.0);
        surface.update(&[Vec2::new(0.5, 1.0)], 0.0);
        assert_eq!(surface.height_at(1.0), Some(1.0));
        assert_eq!(surface.height_at(2.5), None);
    }
}
