//! Error types for tether-spatial.

use thiserror::Error;

/// Errors raised when a grid is configured with unusable dimensions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Cell size is zero, negative or not finite.
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),

    /// Grid has no cells along one axis.
    #[error("grid must have at least one cell per axis, got {width}x{height}")]
    EmptyGrid {
        /// Cells along x.
        width: u32,
        /// Cells along y.
        height: u32,
    },

    /// Cell count does not fit the `u32` cell id space.
    #[error("grid of {width}x{height} cells overflows the cell id range")]
    TooManyCells {
        /// Cells along x.
        width: u32,
        /// Cells along y.
        height: u32,
    },

    /// Grid bounds are inverted or degenerate.
    #[error("grid bounds are empty: min {min:?}, max {max:?}")]
    InvalidBounds {
        /// Minimum corner.
        min: [f32; 2],
        /// Maximum corner.
        max: [f32; 2],
    },
}

/// Result type for grid construction.
pub type GridResult<T> = Result<T, GridError>;
