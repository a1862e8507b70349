//! Error types for tether-nodes.

use thiserror::Error;

/// Errors raised by rope and spring mesh construction or mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    /// Not enough nodes to form a single segment or quad.
    #[error("need at least {min} nodes, got {count}")]
    TooFewNodes {
        /// Requested node count.
        count: usize,
        /// Minimum accepted count.
        min: usize,
    },

    /// Mesh dimensions cannot form a single quad.
    #[error("spring mesh needs at least 2x2 nodes, got {columns}x{rows}")]
    InvalidGrid {
        /// Nodes per row.
        columns: usize,
        /// Nodes per column.
        rows: usize,
    },

    /// Spacing is zero, negative or not finite.
    #[error("node spacing must be positive and finite, got {0}")]
    InvalidSpacing(f32),

    /// Reel limits are inverted or non-positive.
    #[error("spacing range [{min}, {max}] is empty or non-positive")]
    InvalidSpacingRange {
        /// Minimum segment length.
        min: f32,
        /// Maximum segment length.
        max: f32,
    },

    /// A segment length falls outside the reel limits.
    #[error("segment length {spacing} is outside the spacing range [{min}, {max}]")]
    SpacingOutOfRange {
        /// Rejected segment length.
        spacing: f32,
        /// Minimum segment length.
        min: f32,
        /// Maximum segment length.
        max: f32,
    },

    /// A mass is zero, negative or not finite.
    #[error("{field} must be positive and finite, got {value}")]
    InvalidMass {
        /// Offending config field.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// A material constant or limit is out of its valid range.
    #[error("{field} is out of range or not finite: {value}")]
    InvalidParameter {
        /// Offending config field.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// Constraint relaxation needs at least one round.
    #[error("constraint_iterations must be at least 1")]
    NoIterations,

    /// Collision candidate buffer must hold at least one collider.
    #[error("candidate_capacity must be at least 1")]
    NoCandidateCapacity,

    /// A node index past the end of the container.
    #[error("node {index} out of range for {len} nodes")]
    NodeOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of nodes.
        len: usize,
    },
}

/// Result type for node operations.
pub type NodeResult<T> = Result<T, NodeError>;

pub(crate) fn check_mass(field: &'static str, value: f32) -> NodeResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NodeError::InvalidMass { field, value })
    }
}

pub(crate) fn check_non_negative(field: &'static str, value: f32) -> NodeResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NodeError::InvalidParameter { field, value })
    }
}

pub(crate) fn check_positive(field: &'static str, value: f32) -> NodeResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NodeError::InvalidParameter { field, value })
    }
}
