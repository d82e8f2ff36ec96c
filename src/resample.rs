//! Volume resampling and reslicing
//!
//! Pre- and post-processing around the cut machinery: anti-aliased
//! down-sampling of cost volumes before graph construction, interpolated
//! up-sampling of height maps back to the original base resolution, and
//! reslicing of an auxiliary volume into a fixed-thickness excerpt that
//! follows a height map.

use ndarray::{Array3, ArrayD, ArrayView2, ArrayView3, ArrayViewD, Axis, Dimension, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SurfaceError};

/// Window half-width of the Lanczos kernel
const LANCZOS_A: isize = 3;

/// Interpolation scheme for up-sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolator {
    /// Nearest-neighbor lookup
    NearestNeighbor,
    /// N-linear interpolation
    #[default]
    Linear,
    /// Lanczos-3 windowed sinc
    Lanczos,
}

/// Down-sample a volume by a per-axis ratio
///
/// Each axis `i` shrinks to `floor(dim_i * ratio_i)` samples. Axes with a
/// ratio below 1 are first blurred with a Gaussian of
/// `sigma = 1 / (2 * ratio)` (mirror boundary) to suppress aliasing, then
/// decimated by coordinate scaling; axes with ratio >= 1 are decimated
/// as-is. Ratios must be positive and finite and must not collapse an
/// axis to zero length.
pub fn downsample(input: ArrayViewD<'_, f32>, ratio: &[f32]) -> Result<ArrayD<f32>> {
    if ratio.len() != input.ndim() {
        return Err(SurfaceError::InvalidParameter(format!(
            "got {} ratios for a {}-dimensional volume",
            ratio.len(),
            input.ndim()
        )));
    }
    let mut out_dims = Vec::with_capacity(ratio.len());
    for (&dim, &r) in input.shape().iter().zip(ratio) {
        if !(r.is_finite() && r > 0.0) {
            return Err(SurfaceError::InvalidRatio(r));
        }
        let out_dim = (dim as f32 * r) as usize;
        if out_dim == 0 {
            return Err(SurfaceError::InvalidRatio(r));
        }
        out_dims.push(out_dim);
    }

    let sigmas: Vec<f32> = ratio
        .iter()
        .map(|&r| if r < 1.0 { 1.0 / (2.0 * r) } else { 0.0 })
        .collect();
    let smoothed = gaussian_smooth(&input, &sigmas);

    let mut out = ArrayD::<f32>::zeros(IxDyn(&out_dims));
    let mut src = vec![0usize; out_dims.len()];
    for (pattern, value) in out.indexed_iter_mut() {
        for (s, (&p, &r)) in src.iter_mut().zip(pattern.slice().iter().zip(ratio)) {
            *s = (p as f32 / r) as usize;
        }
        for (s, &dim) in src.iter_mut().zip(smoothed.shape()) {
            *s = (*s).min(dim - 1);
        }
        *value = smoothed[IxDyn(&src)];
    }
    Ok(out)
}

/// Up-sample a volume to an explicit output size
pub fn upsample_to(
    input: ArrayViewD<'_, f32>,
    out_size: &[usize],
    interpolator: Interpolator,
) -> Result<ArrayD<f32>> {
    if out_size.len() != input.ndim() {
        return Err(SurfaceError::InvalidParameter(format!(
            "got {} output sizes for a {}-dimensional volume",
            out_size.len(),
            input.ndim()
        )));
    }
    if out_size.iter().any(|&d| d == 0) {
        return Err(SurfaceError::DegenerateShape(out_size.to_vec()));
    }
    if input.shape().iter().any(|&d| d == 0) {
        return Err(SurfaceError::DegenerateShape(input.shape().to_vec()));
    }

    let factors: Vec<f32> = out_size
        .iter()
        .zip(input.shape())
        .map(|(&o, &i)| o as f32 / i as f32)
        .collect();
    let mut out = ArrayD::<f32>::zeros(IxDyn(out_size));
    let mut coords = vec![0.0f32; out_size.len()];
    for (pattern, value) in out.indexed_iter_mut() {
        for (c, (&p, &f)) in coords.iter_mut().zip(pattern.slice().iter().zip(&factors)) {
            *c = p as f32 / f;
        }
        *value = match interpolator {
            Interpolator::NearestNeighbor => sample_nearest(&input, &coords),
            Interpolator::Linear => sample_linear(&input, &coords),
            Interpolator::Lanczos => sample_lanczos(&input, &coords),
        };
    }
    Ok(out)
}

/// Up-sample a volume by a per-axis factor
pub fn upsample(
    input: ArrayViewD<'_, f32>,
    factors: &[f32],
    interpolator: Interpolator,
) -> Result<ArrayD<f32>> {
    if factors.len() != input.ndim() {
        return Err(SurfaceError::InvalidParameter(format!(
            "got {} factors for a {}-dimensional volume",
            factors.len(),
            input.ndim()
        )));
    }
    let mut out_size = Vec::with_capacity(factors.len());
    for (&dim, &f) in input.shape().iter().zip(factors) {
        if !(f.is_finite() && f > 0.0) {
            return Err(SurfaceError::InvalidRatio(f));
        }
        let out_dim = (dim as f32 * f) as usize;
        if out_dim == 0 {
            return Err(SurfaceError::InvalidRatio(f));
        }
        out_size.push(out_dim);
    }
    upsample_to(input, &out_size, interpolator)
}

/// Cut a fixed-thickness excerpt of a volume around a height map
///
/// The output has `slices_above + slices_below + 1` altitude samples; its
/// slice `k` holds, for every base position, the input voxel at altitude
/// `height_map - slices_above + k` (truncated to an integer altitude,
/// clamped to the volume). Slice `slices_above` follows the surface
/// itself.
pub fn reslice_along_height_map(
    input: ArrayView3<'_, f32>,
    height_map: ArrayView2<'_, f32>,
    slices_above: usize,
    slices_below: usize,
) -> Result<Array3<f32>> {
    let (nx, ny, nz) = input.dim();
    if height_map.dim() != (nx, ny) {
        return Err(SurfaceError::ShapeMismatch {
            expected: vec![nx, ny],
            actual: height_map.shape().to_vec(),
        });
    }
    let thickness = slices_above + slices_below + 1;
    let mut out = Array3::<f32>::zeros((nx, ny, thickness));
    for x in 0..nx {
        for y in 0..ny {
            let z_map = height_map[[x, y]] as isize;
            for k in 0..thickness {
                let z = z_map + k as isize - slices_above as isize;
                out[[x, y, k]] = input[[x, y, clamp_index(z, nz)]];
            }
        }
    }
    Ok(out)
}

/// Separable Gaussian smoothing with mirror boundary handling
///
/// Axes with a non-positive sigma are left untouched.
fn gaussian_smooth(input: &ArrayViewD<'_, f32>, sigma: &[f32]) -> ArrayD<f32> {
    let mut data = input.to_owned();
    let mut scratch: Vec<f32> = Vec::new();
    for (axis, &s) in sigma.iter().enumerate() {
        if s <= 0.0 {
            continue;
        }
        let kernel = gaussian_kernel(s);
        let radius = (kernel.len() / 2) as isize;
        for mut lane in data.lanes_mut(Axis(axis)) {
            scratch.clear();
            scratch.extend(lane.iter().copied());
            let len = scratch.len();
            for i in 0..len {
                let mut acc = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let j = mirror_index(i as isize + k as isize - radius, len);
                    acc += w * scratch[j];
                }
                lane[i] = acc;
            }
        }
    }
    data
}

/// Normalized Gaussian kernel truncated at three sigma
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let mut kernel = Vec::with_capacity(2 * radius + 1);
    for k in 0..=2 * radius {
        let x = k as f32 - radius as f32;
        kernel.push((-0.5 * (x / sigma).powi(2)).exp());
    }
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Mirror an index into `[0, len)` (half-sample symmetric boundary)
fn mirror_index(mut i: isize, len: usize) -> usize {
    let len = len as isize;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= len {
            i = 2 * len - i - 1;
        } else {
            return i as usize;
        }
    }
}

#[inline]
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

fn sample_nearest(input: &ArrayViewD<'_, f32>, coords: &[f32]) -> f32 {
    let idx: Vec<usize> = coords
        .iter()
        .zip(input.shape())
        .map(|(&c, &len)| clamp_index((c + 0.5).floor() as isize, len))
        .collect();
    input[IxDyn(&idx)]
}

fn sample_linear(input: &ArrayViewD<'_, f32>, coords: &[f32]) -> f32 {
    let ndim = coords.len();
    let mut acc = 0.0f32;
    let mut idx = vec![0usize; ndim];
    for corner in 0..(1usize << ndim) {
        let mut w = 1.0f32;
        for d in 0..ndim {
            let base = coords[d].floor();
            let frac = coords[d] - base;
            let bit = (corner >> d) & 1;
            w *= if bit == 1 { frac } else { 1.0 - frac };
            idx[d] = clamp_index(base as isize + bit as isize, input.shape()[d]);
        }
        if w > 0.0 {
            acc += w * input[IxDyn(&idx)];
        }
    }
    acc
}

fn lanczos_weight(x: f32) -> f32 {
    let a = LANCZOS_A as f32;
    if x.abs() < 1e-6 {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }
    let pix = std::f32::consts::PI * x;
    a * pix.sin() * (pix / a).sin() / (pix * pix)
}

fn sample_lanczos(input: &ArrayViewD<'_, f32>, coords: &[f32]) -> f32 {
    let ndim = coords.len();
    let mut taps: Vec<Vec<(usize, f32)>> = Vec::with_capacity(ndim);
    for d in 0..ndim {
        let base = coords[d].floor() as isize;
        let mut dim_taps = Vec::with_capacity(2 * LANCZOS_A as usize);
        for t in base - LANCZOS_A + 1..=base + LANCZOS_A {
            let w = lanczos_weight(coords[d] - t as f32);
            if w != 0.0 {
                dim_taps.push((clamp_index(t, input.shape()[d]), w));
            }
        }
        if dim_taps.is_empty() {
            dim_taps.push((clamp_index(base, input.shape()[d]), 1.0));
        }
        taps.push(dim_taps);
    }

    // walk the full tap window; weights are re-normalized so that constant
    // inputs are reproduced exactly
    let mut counters = vec![0usize; ndim];
    let mut idx = vec![0usize; ndim];
    let mut acc = 0.0f32;
    let mut weight_sum = 0.0f32;
    loop {
        let mut w = 1.0f32;
        for d in 0..ndim {
            let (i, tap_w) = taps[d][counters[d]];
            idx[d] = i;
            w *= tap_w;
        }
        acc += w * input[IxDyn(&idx)];
        weight_sum += w;

        let mut d = 0;
        loop {
            counters[d] += 1;
            if counters[d] < taps[d].len() {
                break;
            }
            counters[d] = 0;
            d += 1;
            if d == ndim {
                return if weight_sum.abs() > 1e-12 {
                    acc / weight_sum
                } else {
                    acc
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2, Array2, Array3};

    #[test]
    fn test_gaussian_kernel_is_normalized() {
        for sigma in [0.5f32, 1.0, 2.3] {
            let kernel = gaussian_kernel(sigma);
            assert_eq!(kernel.len() % 2, 1);
            let sum: f32 = kernel.iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_mirror_index() {
        assert_eq!(mirror_index(0, 4), 0);
        assert_eq!(mirror_index(-1, 4), 0);
        assert_eq!(mirror_index(-2, 4), 1);
        assert_eq!(mirror_index(3, 4), 3);
        assert_eq!(mirror_index(4, 4), 3);
        assert_eq!(mirror_index(6, 4), 1);
    }

    #[test]
    fn test_downsample_shape_and_constant() {
        let input = Array2::<f32>::from_elem((8, 6), 3.5);
        let out = downsample(input.view().into_dyn(), &[0.5, 0.5]).unwrap();
        assert_eq!(out.shape(), &[4, 3]);
        for &v in out.iter() {
            assert_relative_eq!(v, 3.5, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_downsample_rejects_bad_ratios() {
        let input = Array2::<f32>::zeros((4, 4));
        assert!(downsample(input.view().into_dyn(), &[0.5]).is_err());
        assert!(downsample(input.view().into_dyn(), &[0.0, 0.5]).is_err());
        assert!(downsample(input.view().into_dyn(), &[0.5, 0.1]).is_err());
    }

    #[test]
    fn test_upsample_nearest() {
        let input = arr1(&[1.0f32, 5.0]);
        let out = upsample_to(input.view().into_dyn(), &[4], Interpolator::NearestNeighbor).unwrap();
        assert_eq!(out.shape(), &[4]);
        assert_eq!(out[[0]], 1.0);
        assert_eq!(out[[3]], 5.0);
    }

    #[test]
    fn test_upsample_linear_interpolates() {
        let input = arr1(&[0.0f32, 2.0]);
        let out = upsample_to(input.view().into_dyn(), &[3], Interpolator::Linear).unwrap();
        assert_relative_eq!(out[[0]], 0.0, epsilon = 1e-5);
        assert_relative_eq!(out[[1]], 2.0 * 2.0 / 3.0, epsilon = 1e-5);
        assert_relative_eq!(out[[2]], 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_upsample_lanczos_preserves_constant() {
        let input = Array2::<f32>::from_elem((4, 3), 2.0);
        let out = upsample_to(input.view().into_dyn(), &[9, 7], Interpolator::Lanczos).unwrap();
        assert_eq!(out.shape(), &[9, 7]);
        for &v in out.iter() {
            assert_relative_eq!(v, 2.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_upsample_factor_wrapper() {
        let input = Array2::<f32>::zeros((3, 4));
        let out = upsample(input.view().into_dyn(), &[2.0, 2.0], Interpolator::Linear).unwrap();
        assert_eq!(out.shape(), &[6, 8]);
        assert!(upsample(input.view().into_dyn(), &[0.0, 2.0], Interpolator::Linear).is_err());
    }

    #[test]
    fn test_reslice_follows_height_map() {
        // input[x, y, z] = z; flat height map at altitude 3
        let mut input = Array3::<f32>::zeros((2, 2, 8));
        for z in 0..8 {
            input
                .slice_axis_mut(Axis(2), ndarray::Slice::from(z..z + 1))
                .fill(z as f32);
        }
        let height_map = Array2::<f32>::from_elem((2, 2), 3.0);
        let out = reslice_along_height_map(input.view(), height_map.view(), 1, 2).unwrap();
        assert_eq!(out.dim(), (2, 2, 4));
        assert_eq!(out[[0, 0, 0]], 2.0);
        assert_eq!(out[[0, 0, 1]], 3.0);
        assert_eq!(out[[1, 1, 3]], 5.0);
    }

    #[test]
    fn test_reslice_clamps_at_volume_edges() {
        let input = Array3::<f32>::from_shape_fn((1, 1, 3), |(_, _, z)| z as f32);
        let height_map = arr2(&[[0.0f32]]);
        let out = reslice_along_height_map(input.view(), height_map.view(), 2, 0).unwrap();
        assert_eq!(out[[0, 0, 0]], 0.0);
        assert_eq!(out[[0, 0, 1]], 0.0);
        assert_eq!(out[[0, 0, 2]], 0.0);
    }

    #[test]
    fn test_reslice_shape_mismatch() {
        let input = Array3::<f32>::zeros((2, 2, 3));
        let height_map = Array2::<f32>::zeros((2, 3));
        assert!(matches!(
            reslice_along_height_map(input.view(), height_map.view(), 1, 1),
            Err(SurfaceError::ShapeMismatch { .. })
        ));
    }
}
