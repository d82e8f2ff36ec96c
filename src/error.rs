//! Error types for surface extraction

use thiserror::Error;

/// Result type for surface extraction operations
pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Errors that can occur while building or solving a surface problem
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// Cost volume has the wrong number of dimensions
    #[error("Expected a {expected}-dimensional cost volume, got {actual} dimensions")]
    DimensionMismatch {
        /// Dimensionality the builder was created for
        expected: usize,
        /// Dimensionality of the offending volume
        actual: usize,
    },

    /// Cost volume shape differs from the shape registered by an earlier surface
    #[error("Cost volume shape {actual:?} does not match registered shape {expected:?}")]
    ShapeMismatch {
        /// Shape recorded when the first surface was registered
        expected: Vec<usize>,
        /// Shape of the offending volume
        actual: Vec<usize>,
    },

    /// A volume axis has zero length
    #[error("Degenerate volume shape {0:?}: every axis must be non-empty")]
    DegenerateShape(Vec<usize>),

    /// Surface id outside `[1, surface_count]`
    #[error("Invalid surface id {id} (surfaces registered: {count})")]
    InvalidSurface {
        /// The offending 1-based surface id
        id: usize,
        /// Number of surfaces registered so far
        count: usize,
    },

    /// Inconsistent parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Solve was requested with no surface graph registered
    #[error("No surface graph registered")]
    EmptyProblem,

    /// Combined node space does not fit the solver's 32-bit label set
    #[error("Node space exceeds solver capacity: {nodes} nodes")]
    CapacityExceeded {
        /// Total node count that was requested
        nodes: usize,
    },

    /// Resampling ratio is not a positive finite value, or collapses an axis
    #[error("Invalid resampling ratio {0}")]
    InvalidRatio(f32),

    /// Shape conversion failed while assembling an output array
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SurfaceError::DimensionMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Expected a 3-dimensional cost volume, got 2 dimensions"
        );

        let err = SurfaceError::InvalidSurface { id: 4, count: 2 };
        assert_eq!(err.to_string(), "Invalid surface id 4 (surfaces registered: 2)");

        let err = SurfaceError::EmptyProblem;
        assert_eq!(err.to_string(), "No surface graph registered");
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = SurfaceError::ShapeMismatch {
            expected: vec![4, 4, 8],
            actual: vec![4, 5, 8],
        };
        assert!(err.to_string().contains("[4, 5, 8]"));
        assert!(err.to_string().contains("[4, 4, 8]"));
    }
}
