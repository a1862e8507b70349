//! Error types for tether-fluid.

use tether_spatial::GridError;
use thiserror::Error;

/// Errors raised when a fluid solver is configured with unusable values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FluidError {
    /// Smoothing radius is zero, negative or not finite.
    #[error("smoothing radius must be positive and finite, got {0}")]
    InvalidSmoothingRadius(f32),

    /// Simulation bounds are inverted, empty or not finite.
    #[error("fluid bounds are empty: min {min:?}, max {max:?}")]
    InvalidBounds {
        /// Minimum corner.
        min: [f32; 2],
        /// Maximum corner.
        max: [f32; 2],
    },

    /// Particle capacity is zero.
    #[error("particle capacity must be at least 1")]
    ZeroCapacity,

    /// Substep count is zero.
    #[error("substeps must be at least 1")]
    ZeroSubsteps,

    /// A material constant is out of its valid range.
    #[error("{field} is out of range or not finite: {value}")]
    InvalidParameter {
        /// Offending config field.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// The neighbor grid could not be built for these bounds.
    #[error("neighbor grid: {0}")]
    Grid(#[from] GridError),
}

/// Result type for fluid construction.
pub type FluidResult<T> = Result<T, FluidError>;
