//! End-to-end tests for surface and curve extraction

use mincost_surface::{SurfaceError, SurfaceGraphBuilder, SurfaceSpec, TilingConfig};
use ndarray::{Array2, Array3};

/// Cost image with one cheap voxel per column at the given altitudes.
///
/// Altitude 0 costs 0.5 so the telescoped flow is non-trivial; the trough
/// voxel costs 0.25, everything else 1.0.
fn trough_image(troughs: &[usize], n_alt: usize) -> Array2<f32> {
    let mut image = Array2::<f32>::ones((troughs.len(), n_alt));
    for (x, &a) in troughs.iter().enumerate() {
        image[[x, 0]] = 0.5;
        image[[x, a]] = 0.25;
    }
    image
}

#[test]
fn trough_curve_follows_minimum() {
    // troughs vary by at most one step, so the smoothness bound is inactive
    let troughs = [2usize, 3, 3, 4, 3, 2];
    let image = trough_image(&troughs, 7);

    let mut builder = SurfaceGraphBuilder::for_curves();
    let curve = builder.add_surface(image.view(), 1, 1.0).unwrap();
    let solution = builder.solve().unwrap();

    let heights = solution.height_map(curve).unwrap();
    for (x, &a) in troughs.iter().enumerate() {
        // decoded height is the transition altitude: the cut pays the
        // voxel at height - 1, which is the trough itself
        assert_eq!(heights[[x]], (a + 1) as f32, "column {x}");
    }

    // telescoped flow: per column, cost(trough) - cost(0) + sum of the
    // negative cost steps = 0.25 - 0.5 + 0.75
    let expected_flow = 0.5 * troughs.len() as f64;
    assert!(
        (solution.max_flow() - expected_flow).abs() < 1e-6,
        "flow {} != {}",
        solution.max_flow(),
        expected_flow
    );
}

#[test]
fn labels_form_contiguous_column_prefixes() {
    let image = trough_image(&[1, 2, 3, 3, 2], 6);
    let mut builder = SurfaceGraphBuilder::for_curves();
    let curve = builder.add_surface(image.view(), 1, 1.0).unwrap();
    let solution = builder.solve().unwrap();

    let heights = solution.height_map(curve).unwrap();
    let mask = solution.surface_mask(curve).unwrap();
    for x in 0..5 {
        let h = heights[[x]] as usize;
        assert!(h >= 1, "altitude 0 can never be excluded");
        for a in 0..6 {
            let expected = if a < h { 255 } else { 0 };
            assert_eq!(mask[[x, a]], expected, "column {x}, altitude {a}");
        }
    }
}

#[test]
fn smoothness_bound_clamps_jagged_minima() {
    // minima jump by the full altitude range; the smoothness arcs must
    // keep adjacent heights within max_delta regardless
    let mut image = Array2::<f32>::ones((5, 8));
    for (x, &a) in [0usize, 7, 0, 7, 0].iter().enumerate() {
        image[[x, a]] = 0.0;
    }
    let mut builder = SurfaceGraphBuilder::for_curves();
    let curve = builder.add_surface(image.view(), 1, 1.0).unwrap();
    let solution = builder.solve().unwrap();

    let heights = solution.height_map(curve).unwrap();
    for x in 0..4 {
        let delta = (heights[[x]] - heights[[x + 1]]).abs();
        assert!(delta <= 1.0, "|h({x}) - h({})| = {delta}", x + 1);
    }
}

#[test]
fn decoding_is_idempotent() {
    let image = trough_image(&[2, 3, 2], 5);
    let mut builder = SurfaceGraphBuilder::for_curves();
    let curve = builder.add_surface(image.view(), 1, 1.0).unwrap();
    let solution = builder.solve().unwrap();

    assert_eq!(
        solution.height_map(curve).unwrap(),
        solution.height_map(curve).unwrap()
    );
    assert_eq!(
        solution.surface_mask(curve).unwrap(),
        solution.surface_mask(curve).unwrap()
    );
}

/// Coupled surfaces over a 3x3x5 volume: the lower surface is pinned to
/// altitude transition 1, the upper one is pulled toward the top but
/// clamped by the maximum separation.
#[test]
fn coupled_surfaces_respect_separation_range() {
    let mut lower_cost = Array3::<f32>::from_elem((3, 3, 5), 2.0);
    let mut upper_cost = Array3::<f32>::zeros((3, 3, 5));
    for x in 0..3 {
        for y in 0..3 {
            lower_cost[[x, y, 0]] = 0.0;
            for a in 0..5 {
                upper_cost[[x, y, a]] = 1.0 + 0.1 * (4 - a) as f32;
            }
        }
    }

    let mut builder = SurfaceGraphBuilder::for_surfaces();
    let lower = builder.add_surface(lower_cost.view(), 1, 1.0).unwrap();
    let upper = builder.add_surface(upper_cost.view(), 1, 1.0).unwrap();
    builder.add_separation_constraint(lower, upper, 1, 3).unwrap();
    let solution = builder.solve().unwrap();

    let lower_heights = solution.height_map(lower).unwrap();
    let upper_heights = solution.height_map(upper).unwrap();
    for x in 0..3 {
        for y in 0..3 {
            let hl = lower_heights[[x, y]];
            let hu = upper_heights[[x, y]];
            assert_eq!(hl, 1.0, "lower surface at ({x}, {y})");
            // unconstrained optimum is 5; max_dist clamps it to 4
            assert_eq!(hu, 4.0, "upper surface at ({x}, {y})");
            let sep = hu - hl;
            assert!((1.0..=3.0).contains(&sep), "separation {sep}");
        }
    }
}

#[test]
fn minimum_separation_pushes_upper_surface_up() {
    // both surfaces want transition 1; min_dist forces the upper one to 2
    let mut lower_cost = Array3::<f32>::from_elem((2, 2, 5), 2.0);
    let mut upper_cost = Array3::<f32>::zeros((2, 2, 5));
    for x in 0..2 {
        for y in 0..2 {
            lower_cost[[x, y, 0]] = 0.0;
            for a in 0..5 {
                upper_cost[[x, y, a]] = 1.0 + 0.05 * a as f32;
            }
        }
    }

    let mut builder = SurfaceGraphBuilder::for_surfaces();
    let lower = builder.add_surface(lower_cost.view(), 1, 1.0).unwrap();
    let upper = builder.add_surface(upper_cost.view(), 1, 1.0).unwrap();
    builder.add_separation_constraint(lower, upper, 1, 3).unwrap();
    let solution = builder.solve().unwrap();

    let lower_heights = solution.height_map(lower).unwrap();
    let upper_heights = solution.height_map(upper).unwrap();
    for x in 0..2 {
        for y in 0..2 {
            assert_eq!(lower_heights[[x, y]], 1.0);
            assert_eq!(upper_heights[[x, y]], 2.0);
        }
    }
}

#[test]
fn failed_preconditions_leave_builder_usable() {
    let mut builder = SurfaceGraphBuilder::for_curves();
    let image = Array2::<f32>::ones((4, 5));

    // wrong dimensionality, then wrong shape: both rejected cleanly
    assert!(builder
        .add_surface(Array3::<f32>::zeros((2, 2, 2)).view(), 1, 1.0)
        .is_err());
    builder.add_surface(image.view(), 1, 1.0).unwrap();
    assert!(builder
        .add_surface(Array2::<f32>::zeros((4, 6)).view(), 1, 1.0)
        .is_err());
    assert!(builder.add_separation_constraint(1, 2, 0, 1).is_err());
    assert_eq!(builder.surface_count(), 1);

    // the surviving problem still solves
    let solution = builder.solve().unwrap();
    assert_eq!(solution.surface_count(), 1);
}

#[test]
fn earlier_solutions_stay_frozen_when_builder_grows() {
    let image = trough_image(&[2, 2, 2], 5);
    let mut builder = SurfaceGraphBuilder::for_curves();
    builder.add_surface(image.view(), 1, 1.0).unwrap();
    let first = builder.solve().unwrap();
    let first_heights = first.height_map(1).unwrap();

    builder.add_surface(image.view(), 1, 1.0).unwrap();
    let second = builder.solve().unwrap();

    assert_eq!(first.surface_count(), 1);
    assert!(matches!(
        first.height_map(2),
        Err(SurfaceError::InvalidSurface { .. })
    ));
    assert_eq!(second.surface_count(), 2);
    assert_eq!(first.height_map(1).unwrap(), first_heights);
}

#[test]
fn tiled_solve_matches_single_tile_on_columnwise_minima() {
    // every column has the same strong minimum, so each band's optimum is
    // the global one and the stitched result is exact everywhere
    let mut volume = Array3::<f32>::ones((6, 8, 5));
    for x in 0..6 {
        for y in 0..8 {
            volume[[x, y, 2]] = 0.1;
        }
    }

    let config = TilingConfig {
        tile_count: 1,
        surfaces: vec![SurfaceSpec {
            max_delta: 1,
            weight_factor: 1.0,
        }],
        separations: Vec::new(),
    };
    let single = mincost_surface::solve_tiled(volume.view().into_dyn(), &config).unwrap();

    let tiled_config = TilingConfig {
        tile_count: 3,
        ..config
    };
    let tiled = mincost_surface::solve_tiled(volume.view().into_dyn(), &tiled_config).unwrap();

    assert_eq!(single.len(), 1);
    assert_eq!(tiled.len(), 1);
    assert_eq!(single[0], tiled[0]);
    for &h in tiled[0].iter() {
        assert_eq!(h, 3.0);
    }
}

#[test]
fn tile_count_exceeding_band_length_is_clamped() {
    let mut volume = Array3::<f32>::ones((3, 4, 5));
    for x in 0..3 {
        for y in 0..4 {
            volume[[x, y, 1]] = 0.2;
        }
    }
    let config = TilingConfig {
        tile_count: 64,
        surfaces: vec![SurfaceSpec::default()],
        separations: Vec::new(),
    };
    let maps = mincost_surface::solve_tiled(volume.view().into_dyn(), &config).unwrap();
    assert_eq!(maps[0].shape(), &[3, 4]);
    for &h in maps[0].iter() {
        assert_eq!(h, 2.0);
    }
}

#[test]
fn tiled_two_surface_problem_keeps_ordering_per_band() {
    let mut lower_is_cheap = Array3::<f32>::from_elem((3, 6, 5), 1.0);
    for x in 0..3 {
        for y in 0..6 {
            lower_is_cheap[[x, y, 0]] = 0.0;
        }
    }
    let config = TilingConfig {
        tile_count: 2,
        surfaces: vec![SurfaceSpec::default(), SurfaceSpec::default()],
        separations: vec![mincost_surface::SeparationSpec {
            lower: 2,
            upper: 1,
            min_dist: 1,
            max_dist: 2,
        }],
    };
    let maps = mincost_surface::solve_tiled(lower_is_cheap.view().into_dyn(), &config).unwrap();
    let (upper, lower) = (&maps[0], &maps[1]);
    for x in 0..3 {
        for y in 0..6 {
            let sep = upper[[x, y]] - lower[[x, y]];
            assert!((1.0..=2.0).contains(&sep), "separation {sep} at ({x}, {y})");
        }
    }
}
