//! Cost volume geometry
//!
//! A cost volume is a dense D-dimensional array with axis order
//! `(base axes..., altitude axis)`: the altitude axis is always last. A
//! *column* is the set of voxels sharing one base-grid position; the solved
//! surface assigns one transition altitude per column.
//!
//! All node and voxel addressing in this crate uses C-order flat indices
//! over that axis order, so the altitude axis has stride 1 and the voxel
//! directly below `(p, a)` is always at `flat - 1`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurfaceError};

/// Scalar type of cost volumes and height maps
pub type Cost = f32;

/// Shape of a cost volume, with flat-index arithmetic over its voxels
///
/// Base axes come first, the altitude axis is last. Shapes are validated on
/// construction: at least two axes, all non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeShape {
    dims: Vec<usize>,
}

impl VolumeShape {
    /// Validate and record a volume shape
    pub fn new(dims: &[usize]) -> Result<Self> {
        if dims.len() < 2 {
            return Err(SurfaceError::DimensionMismatch {
                expected: 2,
                actual: dims.len(),
            });
        }
        if dims.iter().any(|&d| d == 0) {
            return Err(SurfaceError::DegenerateShape(dims.to_vec()));
        }
        Ok(Self {
            dims: dims.to_vec(),
        })
    }

    /// Number of axes, altitude included
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Number of base axes
    pub fn base_ndim(&self) -> usize {
        self.dims.len() - 1
    }

    /// All axis lengths, altitude last
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Lengths of the base axes
    pub fn base_dims(&self) -> &[usize] {
        &self.dims[..self.dims.len() - 1]
    }

    /// Length of the altitude axis
    pub fn n_alt(&self) -> usize {
        self.dims[self.dims.len() - 1]
    }

    /// Total number of voxels
    pub fn voxel_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Number of base-grid positions (columns)
    pub fn base_len(&self) -> usize {
        self.base_dims().iter().product()
    }

    /// Flat voxel index of `(base position, altitude)`
    #[inline]
    pub fn flat(&self, base_flat: usize, altitude: usize) -> usize {
        base_flat * self.n_alt() + altitude
    }

    /// Stride of base axis `axis` in base-flat units
    #[inline]
    pub fn base_stride(&self, axis: usize) -> usize {
        self.base_dims()[axis + 1..].iter().product()
    }

    /// Stride of base axis `axis` in voxel-flat units
    #[inline]
    pub fn voxel_stride(&self, axis: usize) -> usize {
        self.base_stride(axis) * self.n_alt()
    }

    /// Coordinate of a base-flat index along base axis `axis`
    #[inline]
    pub fn base_coord(&self, base_flat: usize, axis: usize) -> usize {
        (base_flat / self.base_stride(axis)) % self.base_dims()[axis]
    }
}
