//! End-to-end detection pipelines
//!
//! Convenience entry points that chain the whole processing sequence:
//! optional anti-aliased down-sampling of the cost volume, graph
//! construction, the max-flow solve, height-map decoding, up-sampling back
//! to the original base resolution, and rescaling of the height values by
//! the inverse altitude sampling ratio.

use ndarray::{Array1, Array2, ArrayD, ArrayView2, ArrayView3, ArrayViewD, Ix1, Ix2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::builder::SurfaceGraphBuilder;
use crate::constraint::SeparationSpec;
use crate::error::Result;
use crate::resample::{downsample, upsample_to, Interpolator};
use crate::tile::{solve_tiled, SurfaceSpec, TilingConfig};
use crate::volume::Cost;

/// Parameters of a single-surface detection run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Down-sampling ratio for every base axis (1.0 = no resampling)
    pub downsample_base: f32,
    /// Down-sampling ratio for the altitude axis (1.0 = no resampling)
    pub downsample_alt: f32,
    /// Maximum altitude change between lateral neighbors, in down-sampled
    /// voxels
    pub max_delta: usize,
    /// Positive cost multiplier
    pub weight_factor: f32,
    /// Interpolation used to restore the original base resolution
    pub interpolator: Interpolator,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            downsample_base: 1.0,
            downsample_alt: 1.0,
            max_delta: 1,
            weight_factor: 1.0,
            interpolator: Interpolator::Linear,
        }
    }
}

/// Parameters of a coupled two-surface detection run
///
/// The first detected surface is the upper one; the second is weighted by
/// `relative_weight` and held `min_dist..=max_dist` altitude steps below
/// the first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwoSurfaceConfig {
    /// Shared single-surface parameters
    pub detection: DetectionConfig,
    /// Cost multiplier of the second surface, balancing intensities
    /// between the two structures
    pub relative_weight: f32,
    /// Minimum separation between the surfaces (down-sampled voxels)
    pub min_dist: usize,
    /// Maximum separation between the surfaces (down-sampled voxels)
    pub max_dist: usize,
}

impl Default for TwoSurfaceConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            relative_weight: 1.0,
            min_dist: 1,
            max_dist: 1,
        }
    }
}

/// Down-sample a cost volume, skipping the pass entirely at unit ratios
fn prepare(cost: ArrayViewD<'_, Cost>, ratios: &[f32]) -> Result<ArrayD<Cost>> {
    if ratios.iter().all(|&r| r == 1.0) {
        Ok(cost.to_owned())
    } else {
        downsample(cost, ratios)
    }
}

/// Up-sample a height map to the original base grid and undo the altitude
/// sampling ratio
fn restore_height_map(
    map: ArrayD<f32>,
    out_base: &[usize],
    alt_ratio: f32,
    interpolator: Interpolator,
) -> Result<ArrayD<f32>> {
    let mut map = if map.shape() == out_base {
        map
    } else {
        upsample_to(map.view(), out_base, interpolator)?
    };
    if alt_ratio != 1.0 {
        map.mapv_inplace(|h| h / alt_ratio);
    }
    Ok(map)
}

/// Detect the minimum-cost curve in a 2-dimensional cost image
///
/// Returns one height value per image column, at the image's original
/// base resolution.
pub fn detect_curve(cost: ArrayView2<'_, Cost>, config: &DetectionConfig) -> Result<Array1<f32>> {
    let dims = cost.shape().to_vec();
    let ratios = [config.downsample_base, config.downsample_alt];
    let ds = prepare(cost.into_dyn(), &ratios)?;

    let mut builder = SurfaceGraphBuilder::for_curves();
    let curve = builder.add_surface(ds.view(), config.max_delta, config.weight_factor)?;
    let solution = builder.solve()?;
    info!(max_flow = solution.max_flow(), "curve detected");

    let map = solution.height_map(curve)?;
    let restored = restore_height_map(map, &dims[..1], config.downsample_alt, config.interpolator)?;
    Ok(restored.into_dimensionality::<Ix1>()?)
}

/// Detect the minimum-cost surface in a 3-dimensional cost volume
pub fn detect_surface(cost: ArrayView3<'_, Cost>, config: &DetectionConfig) -> Result<Array2<f32>> {
    let dims = cost.shape().to_vec();
    let ratios = [
        config.downsample_base,
        config.downsample_base,
        config.downsample_alt,
    ];
    let ds = prepare(cost.into_dyn(), &ratios)?;

    let mut builder = SurfaceGraphBuilder::for_surfaces();
    let surface = builder.add_surface(ds.view(), config.max_delta, config.weight_factor)?;
    let solution = builder.solve()?;
    info!(max_flow = solution.max_flow(), "surface detected");

    let map = solution.height_map(surface)?;
    let restored = restore_height_map(map, &dims[..2], config.downsample_alt, config.interpolator)?;
    Ok(restored.into_dimensionality::<Ix2>()?)
}

/// Detect two coupled surfaces in one 3-dimensional cost volume
///
/// Returns `(upper, lower)` height maps; the lower surface is constrained
/// to `min_dist..=max_dist` altitude steps below the upper one.
pub fn detect_two_surfaces(
    cost: ArrayView3<'_, Cost>,
    config: &TwoSurfaceConfig,
) -> Result<(Array2<f32>, Array2<f32>)> {
    let dims = cost.shape().to_vec();
    let det = &config.detection;
    let ratios = [det.downsample_base, det.downsample_base, det.downsample_alt];
    let ds = prepare(cost.into_dyn(), &ratios)?;

    let mut builder = SurfaceGraphBuilder::for_surfaces();
    let upper = builder.add_surface(ds.view(), det.max_delta, det.weight_factor)?;
    let lower = builder.add_surface(ds.view(), det.max_delta, config.relative_weight)?;
    builder.add_separation_constraint(lower, upper, config.min_dist, config.max_dist)?;
    let solution = builder.solve()?;
    info!(max_flow = solution.max_flow(), "two coupled surfaces detected");

    let upper_map = restore_height_map(
        solution.height_map(upper)?,
        &dims[..2],
        det.downsample_alt,
        det.interpolator,
    )?;
    let lower_map = restore_height_map(
        solution.height_map(lower)?,
        &dims[..2],
        det.downsample_alt,
        det.interpolator,
    )?;
    Ok((
        upper_map.into_dimensionality::<Ix2>()?,
        lower_map.into_dimensionality::<Ix2>()?,
    ))
}

/// Tiled variant of [`detect_surface`]
///
/// Partitions the down-sampled volume into `tile_count` bands solved on
/// parallel workers; smoothness is not enforced across band boundaries.
pub fn detect_surface_tiled(
    cost: ArrayView3<'_, Cost>,
    config: &DetectionConfig,
    tile_count: usize,
) -> Result<Array2<f32>> {
    let dims = cost.shape().to_vec();
    let ratios = [
        config.downsample_base,
        config.downsample_base,
        config.downsample_alt,
    ];
    let ds = prepare(cost.into_dyn(), &ratios)?;

    let tiling = TilingConfig {
        tile_count,
        surfaces: vec![SurfaceSpec {
            max_delta: config.max_delta,
            weight_factor: config.weight_factor,
        }],
        separations: Vec::new(),
    };
    let mut maps = solve_tiled(ds.view(), &tiling)?;
    let map = maps.pop().expect("one surface configured");
    let restored = restore_height_map(map, &dims[..2], config.downsample_alt, config.interpolator)?;
    Ok(restored.into_dimensionality::<Ix2>()?)
}

/// Tiled variant of [`detect_two_surfaces`]
pub fn detect_two_surfaces_tiled(
    cost: ArrayView3<'_, Cost>,
    config: &TwoSurfaceConfig,
    tile_count: usize,
) -> Result<(Array2<f32>, Array2<f32>)> {
    let dims = cost.shape().to_vec();
    let det = &config.detection;
    let ratios = [det.downsample_base, det.downsample_base, det.downsample_alt];
    let ds = prepare(cost.into_dyn(), &ratios)?;

    let tiling = TilingConfig {
        tile_count,
        surfaces: vec![
            SurfaceSpec {
                max_delta: det.max_delta,
                weight_factor: det.weight_factor,
            },
            SurfaceSpec {
                max_delta: det.max_delta,
                weight_factor: config.relative_weight,
            },
        ],
        separations: vec![SeparationSpec {
            lower: 2,
            upper: 1,
            min_dist: config.min_dist,
            max_dist: config.max_dist,
        }],
    };
    let mut maps = solve_tiled(ds.view(), &tiling)?.into_iter();
    let upper_map = maps.next().expect("two surfaces configured");
    let lower_map = maps.next().expect("two surfaces configured");

    let upper_map =
        restore_height_map(upper_map, &dims[..2], det.downsample_alt, det.interpolator)?;
    let lower_map =
        restore_height_map(lower_map, &dims[..2], det.downsample_alt, det.interpolator)?;
    Ok((
        upper_map.into_dimensionality::<Ix2>()?,
        lower_map.into_dimensionality::<Ix2>()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn trough_image(width: usize, n_alt: usize, trough: usize) -> Array2<f32> {
        let mut image = Array2::<f32>::ones((width, n_alt));
        for x in 0..width {
            image[[x, trough]] = 0.1;
        }
        image
    }

    #[test]
    fn test_detect_curve_follows_trough() {
        let image = trough_image(5, 6, 2);
        let heights = detect_curve(image.view(), &DetectionConfig::default()).unwrap();
        assert_eq!(heights.len(), 5);
        // the transition altitude sits just above the minimum-cost voxel
        for &h in heights.iter() {
            assert_eq!(h, 3.0);
        }
    }

    #[test]
    fn test_detect_surface_follows_trough() {
        let mut volume = Array3::<f32>::ones((3, 4, 5));
        for x in 0..3 {
            for y in 0..4 {
                volume[[x, y, 1]] = 0.2;
            }
        }
        let heights = detect_surface(volume.view(), &DetectionConfig::default()).unwrap();
        assert_eq!(heights.dim(), (3, 4));
        for &h in heights.iter() {
            assert_eq!(h, 2.0);
        }
    }

    #[test]
    fn test_tiled_matches_untiled_on_uniform_trough() {
        let mut volume = Array3::<f32>::ones((4, 6, 5));
        for x in 0..4 {
            for y in 0..6 {
                volume[[x, y, 2]] = 0.1;
            }
        }
        let config = DetectionConfig::default();
        let single = detect_surface(volume.view(), &config).unwrap();
        let tiled = detect_surface_tiled(volume.view(), &config, 3).unwrap();
        assert_eq!(single, tiled);
    }

    #[test]
    fn test_downsampled_output_keeps_original_base_shape() {
        let volume = Array3::<f32>::ones((8, 8, 6));
        let config = DetectionConfig {
            downsample_base: 0.5,
            downsample_alt: 0.5,
            ..DetectionConfig::default()
        };
        let heights = detect_surface(volume.view(), &config).unwrap();
        assert_eq!(heights.dim(), (8, 8));
        // altitude values are rescaled back to the original sampling
        for &h in heights.iter() {
            assert!(h >= 0.0 && h <= 6.0 / 0.5);
        }
    }
}
