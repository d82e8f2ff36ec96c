//! Solved cut problems and result decoding
//!
//! A [`CutSolution`] is the frozen outcome of one max-flow computation:
//! the flow value plus the source side of the minimum cut, stored as a
//! bitmap over the shared node space. Decoding is pure: height maps and
//! masks can be derived any number of times and always agree.

use ndarray::{ArrayD, IxDyn};
use roaring::RoaringBitmap;

use crate::error::{Result, SurfaceError};
use crate::graph::{NodeId, NodeSpace, SurfaceId, Weight};
use crate::solver::Terminal;
use crate::volume::VolumeShape;

/// Immutable result of a solved surface cut problem
#[derive(Debug, Clone)]
pub struct CutSolution {
    shape: VolumeShape,
    surface_count: usize,
    space: NodeSpace,
    max_flow: Weight,
    source_side: RoaringBitmap,
}

impl CutSolution {
    pub(crate) fn new(
        shape: VolumeShape,
        surface_count: usize,
        max_flow: Weight,
        source_side: RoaringBitmap,
    ) -> Self {
        let space = NodeSpace::new(shape.voxel_count());
        Self {
            shape,
            surface_count,
            space,
            max_flow,
            source_side,
        }
    }

    /// The maximum flow, equal to the minimum cut value
    pub fn max_flow(&self) -> Weight {
        self.max_flow
    }

    /// Number of surfaces that were solved together
    pub fn surface_count(&self) -> usize {
        self.surface_count
    }

    /// Shape of the cost volumes the surfaces were built from
    pub fn shape(&self) -> &VolumeShape {
        &self.shape
    }

    /// Terminal side of a node of the shared address space
    pub fn terminal(&self, node: NodeId) -> Terminal {
        if self.source_side.contains(node as u32) {
            Terminal::Source
        } else {
            Terminal::Sink
        }
    }

    fn check_surface(&self, surface: SurfaceId) -> Result<()> {
        if surface == 0 || surface > self.surface_count {
            return Err(SurfaceError::InvalidSurface {
                id: surface,
                count: self.surface_count,
            });
        }
        Ok(())
    }

    /// Decode the height map of one surface
    ///
    /// For every base position, the height is the number of source-side
    /// nodes in the column. The monotonicity arcs make the source side a
    /// contiguous run from altitude 0, so this count is the transition
    /// altitude: the first sink-side voxel. The voxel whose cost the cut
    /// pays sits directly below, at `height - 1`.
    pub fn height_map(&self, surface: SurfaceId) -> Result<ArrayD<f32>> {
        self.check_surface(surface)?;
        let mut out = ArrayD::<f32>::zeros(IxDyn(self.shape.base_dims()));
        let heights = out
            .as_slice_mut()
            .expect("freshly allocated arrays are contiguous");
        let n_alt = self.shape.n_alt();
        for (base_flat, height) in heights.iter_mut().enumerate() {
            let mut count = 0u32;
            for a in 0..n_alt {
                let node = self.space.node_id(surface, self.shape.flat(base_flat, a));
                if self.source_side.contains(node as u32) {
                    count += 1;
                }
            }
            *height = count as f32;
        }
        Ok(out)
    }

    /// Decode one surface as a full-volume binary mask
    ///
    /// Voxels on the source side of the cut (at or below the surface) are
    /// 255, all others 0.
    pub fn surface_mask(&self, surface: SurfaceId) -> Result<ArrayD<u8>> {
        self.check_surface(surface)?;
        let mut out = ArrayD::<u8>::zeros(IxDyn(self.shape.dims()));
        let mask = out
            .as_slice_mut()
            .expect("freshly allocated arrays are contiguous");
        let offset = self.space.surface_range(surface).start;
        for (voxel, value) in mask.iter_mut().enumerate() {
            if self.source_side.contains((offset + voxel) as u32) {
                *value = 255;
            }
        }
        Ok(out)
    }
}
