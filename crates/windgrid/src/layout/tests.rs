use super::*;
use crate::error::LayoutError;
use crate::grid::GridSpec;
use crate::raster::{GridRaster, RasterSource};
use geo::{polygon, Geometry, MultiPoint, Point, Polygon};
use nalgebra::{vector, Vector2};
use proptest::prelude::*;
use std::sync::Arc;

fn square3() -> GridSpec {
    GridSpec::builder()
        .rows(3)
        .cols(3)
        .row_step(1.0)
        .col_step(1.0)
        .build()
        .unwrap()
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
}

fn square(cx: f64, cy: f64, half: f64) -> Polygon<f64> {
    rect(cx - half, cy - half, cx + half, cy + half)
}

/// Depths over the 3×3 unit grid, stored as negative elevations.
///
/// After negation (rows north to south):
///   y= 1:  10  20  30
///   y= 0:  40  50  70
///   y=-1: NaN   5 100
fn depth_raster() -> GridRaster {
    let band = vec![
        -10.0, -20.0, -30.0, //
        -40.0, -50.0, -70.0, //
        f64::NAN, -5.0, -100.0,
    ];
    GridRaster::new(3, 3, -1.5, 1.5, 1.0, vec![band]).unwrap()
}

const DEPTH_ASC: &str = "\
ncols 3
nrows 3
xllcorner -1.5
yllcorner -1.5
cellsize 1
nodata_value -9999
-10 -20 -30
-40 -50 -70
-9999 -5 -100
";

fn assert_subset(layout: &Layout) {
    let idx = layout.visible_indices();
    assert!(idx.windows(2).all(|w| w[0] < w[1]));
    assert!(idx.iter().all(|&i| i < layout.raw_coordinates().len()));
}

#[test]
fn unconstrained_layout_shows_raw_points() {
    let layout = Layout::from_grid(&square3()).unwrap();
    assert!(layout.has_geom());
    assert!(!layout.is_constrained());
    assert_eq!(layout.n_points(), 9);
    assert_eq!(layout.coordinates(), layout.raw_coordinates());
    assert_eq!(layout.grid(), Some(&square3()));
}

#[test]
fn clip_to_centered_square_keeps_origin() {
    let mut layout = Layout::from_grid(&square3()).unwrap();
    layout
        .clip_to_area(square(0.0, 0.0, 0.5), ConstraintMode::Append)
        .unwrap();
    assert!(layout.is_constrained());
    assert!(layout.has_area());
    assert_eq!(layout.coordinates(), vec![vector![0.0, 0.0]]);
}

#[test]
fn exclusion_then_reset_restores_area_result() {
    let mut layout = Layout::from_grid(&square3()).unwrap();
    layout
        .clip_to_area(square(0.0, 0.0, 0.5), ConstraintMode::Append)
        .unwrap()
        .avoid_exclusions(square(0.0, 0.0, 0.1), ConstraintMode::Append)
        .unwrap();
    assert_eq!(layout.n_points(), 0);
    layout.reset_exclusion().unwrap();
    assert!(!layout.has_exclusion());
    assert!(layout.has_area());
    assert_eq!(layout.coordinates(), vec![vector![0.0, 0.0]]);
}

#[test]
fn construction_applies_area_then_exclusion() {
    let area = Region::from(rect(-1.5, -0.5, 1.5, 1.5)); // rows y=0 and y=1
    let exclusion = Region::from(square(1.0, 1.0, 0.2));
    let layout = Layout::new(Some(&square3()), Some(area), Some(exclusion)).unwrap();
    assert!(layout.is_constrained());
    assert_eq!(layout.n_points(), 5);
    assert!(!layout.coordinates().contains(&vector![1.0, 1.0]));
    assert_subset(&layout);
}

#[test]
fn constraints_without_geometry_fail() {
    let area = Region::from(square(0.0, 0.0, 1.0));
    assert!(matches!(
        Layout::new(None, Some(area.clone()), None),
        Err(LayoutError::EmptyGeometry)
    ));
    let mut empty = Layout::empty();
    assert!(!empty.has_geom());
    assert!(matches!(
        empty.clip_to_area(area.clone(), ConstraintMode::Append),
        Err(LayoutError::EmptyGeometry)
    ));
    assert!(matches!(
        empty.avoid_exclusions(area, ConstraintMode::Overwrite),
        Err(LayoutError::EmptyGeometry)
    ));
    let raster: Arc<dyn RasterSource> = Arc::new(depth_raster());
    assert!(matches!(
        empty.apply_bathymetry(raster, BathymetryParams::default()),
        Err(LayoutError::EmptyGeometry)
    ));
    assert_eq!(empty.n_points(), 0);
    assert!(empty.coordinates().is_empty());
}

#[test]
fn append_unions_and_overwrite_replaces_area() {
    let mut layout = Layout::from_grid(&square3()).unwrap();
    layout
        .clip_to_area(square(-1.0, -1.0, 0.1), ConstraintMode::Append)
        .unwrap()
        .clip_to_area(square(1.0, 1.0, 0.1), ConstraintMode::Append)
        .unwrap();
    assert_eq!(
        layout.coordinates(),
        vec![vector![-1.0, -1.0], vector![1.0, 1.0]]
    );
    layout
        .clip_to_area(square(0.0, 1.0, 0.1), ConstraintMode::Overwrite)
        .unwrap();
    assert_eq!(layout.coordinates(), vec![vector![0.0, 1.0]]);
}

#[test]
fn area_append_reapplies_exclusion() {
    let mut layout = Layout::from_grid(&square3()).unwrap();
    layout
        .avoid_exclusions(square(0.0, 0.0, 0.1), ConstraintMode::Append)
        .unwrap()
        .clip_to_area(square(0.0, 0.0, 0.5), ConstraintMode::Append)
        .unwrap();
    assert_eq!(layout.n_points(), 0);
    layout
        .clip_to_area(square(1.0, 0.0, 0.3), ConstraintMode::Append)
        .unwrap();
    assert_eq!(layout.coordinates(), vec![vector![1.0, 0.0]]);
}

#[test]
fn exclusion_modes() {
    let mut layout = Layout::from_grid(&square3()).unwrap();
    layout
        .avoid_exclusions(square(-1.0, -1.0, 0.1), ConstraintMode::Append)
        .unwrap()
        .avoid_exclusions(square(1.0, 1.0, 0.1), ConstraintMode::Append)
        .unwrap();
    assert_eq!(layout.n_points(), 7);
    layout
        .avoid_exclusions(square(0.0, 0.0, 0.1), ConstraintMode::Overwrite)
        .unwrap();
    assert_eq!(layout.n_points(), 8);
    assert!(!layout.coordinates().contains(&vector![0.0, 0.0]));
}

#[test]
fn reset_area_keeps_exclusion() {
    let mut layout = Layout::from_grid(&square3()).unwrap();
    layout
        .clip_to_area(rect(-1.5, -1.5, 0.5, 1.5), ConstraintMode::Append)
        .unwrap()
        .avoid_exclusions(square(0.0, 0.0, 0.1), ConstraintMode::Append)
        .unwrap();
    assert_eq!(layout.n_points(), 5);
    layout.reset_area().unwrap();
    assert!(!layout.has_area());
    assert!(layout.is_constrained());
    assert_eq!(layout.n_points(), 8);
    // resetting an absent layer is a no-op
    layout.reset_area().unwrap();
    assert_eq!(layout.n_points(), 8);
}

#[test]
fn reset_geom_drops_every_layer() {
    let mut layout = Layout::from_grid(&square3()).unwrap();
    layout
        .clip_to_area(square(0.0, 0.0, 0.5), ConstraintMode::Append)
        .unwrap()
        .avoid_exclusions(square(0.0, 0.0, 0.1), ConstraintMode::Append)
        .unwrap()
        .apply_bathymetry(Arc::new(depth_raster()), BathymetryParams::default())
        .unwrap();
    layout.reset_geom();
    assert!(!layout.is_constrained());
    assert!(!layout.has_area() && !layout.has_exclusion() && !layout.has_bathymetry());
    assert_eq!(layout.coordinates(), layout.raw_coordinates());
}

#[test]
fn bathymetry_keeps_in_range_and_nan() {
    let mut layout = Layout::from_grid(&square3()).unwrap();
    layout
        .apply_bathymetry(Arc::new(depth_raster()), BathymetryParams::default())
        .unwrap();
    assert!(layout.has_bathymetry());
    assert!(layout.is_constrained());
    assert_eq!(layout.visible_indices(), &[0, 1, 3, 4, 6, 7, 8]);

    let params = BathymetryParams {
        drop_na: true,
        ..BathymetryParams::default()
    };
    layout.apply_bathymetry(Arc::new(depth_raster()), params).unwrap();
    // a second application replaces the first
    assert_eq!(layout.visible_indices(), &[1, 3, 4, 6, 7, 8]);
    assert!(layout.bathymetry().unwrap().params().drop_na);
    assert!(layout.bathymetry().unwrap().path().is_none());
}

#[test]
fn bathymetry_sign_and_limits() {
    let mut layout = Layout::from_grid(&square3()).unwrap();
    let params = BathymetryParams {
        sign: DepthSign::Positive,
        limits: (-45.0, -15.0),
        drop_na: true,
        ..BathymetryParams::default()
    };
    layout.apply_bathymetry(Arc::new(depth_raster()), params).unwrap();
    // raw elevations -20, -30, -40 survive
    assert_eq!(layout.visible_indices(), &[3, 7, 8]);

    let inverted = BathymetryParams {
        limits: (10.0, 0.0),
        ..BathymetryParams::default()
    };
    assert!(matches!(
        layout.apply_bathymetry(Arc::new(depth_raster()), inverted),
        Err(LayoutError::InvalidParameter(_))
    ));
    let bad_band = BathymetryParams {
        band: 2,
        ..BathymetryParams::default()
    };
    assert!(matches!(
        layout.apply_bathymetry(Arc::new(depth_raster()), bad_band),
        Err(LayoutError::BandOutOfRange { band: 2, count: 1 })
    ));
    // failed calls leave the previous layer in place
    assert_eq!(layout.visible_indices(), &[3, 7, 8]);
}

#[test]
fn resets_preserve_bathymetry() {
    let mut layout = Layout::from_grid(&square3()).unwrap();
    layout
        .apply_bathymetry(Arc::new(depth_raster()), BathymetryParams::default())
        .unwrap()
        .clip_to_area(rect(0.5, -1.5, 1.5, 1.5), ConstraintMode::Append)
        .unwrap();
    // right column: 100 and 70 fail, 30 passes
    assert_eq!(layout.coordinates(), vec![vector![1.0, 1.0]]);
    layout.reset_area().unwrap();
    assert_eq!(layout.n_points(), 7);
    layout
        .avoid_exclusions(rect(-1.5, 0.5, 1.5, 1.5), ConstraintMode::Append)
        .unwrap();
    assert_eq!(layout.visible_indices(), &[0, 1, 3, 4]);
    layout.reset_bathymetry().unwrap();
    assert!(!layout.has_bathymetry());
    assert_eq!(layout.visible_indices(), &[0, 1, 2, 3, 4, 5]);
}

#[test]
fn closed_dataset_rejected_and_layout_untouched() {
    let raster = Arc::new(depth_raster());
    raster.close();
    let mut layout = Layout::from_grid(&square3()).unwrap();
    assert!(matches!(
        layout.apply_bathymetry(raster, BathymetryParams::default()),
        Err(LayoutError::ClosedDataset)
    ));
    assert!(!layout.has_bathymetry());

    let raster = Arc::new(depth_raster());
    layout
        .apply_bathymetry(raster.clone(), BathymetryParams::default())
        .unwrap()
        .clip_to_area(square(0.0, 0.0, 0.5), ConstraintMode::Append)
        .unwrap();
    raster.close();
    assert!(matches!(layout.reset_area(), Err(LayoutError::ClosedDataset)));
    assert!(layout.has_area());
    assert_eq!(layout.coordinates(), vec![vector![0.0, 0.0]]);
    // dropping the bathymetry layer needs no sampling
    layout.reset_bathymetry().unwrap();
    assert_eq!(layout.coordinates(), vec![vector![0.0, 0.0]]);
}

#[test]
fn load_bathymetry_from_file_records_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("depth.asc");
    std::fs::write(&path, DEPTH_ASC).unwrap();
    let mut layout = Layout::from_grid(&square3()).unwrap();
    layout
        .load_bathymetry(&path, BathymetryParams::default())
        .unwrap();
    assert_eq!(layout.visible_indices(), &[0, 1, 3, 4, 6, 7, 8]);
    let layer = layout.bathymetry().unwrap();
    assert_eq!(layer.path(), Some(path.as_path()));
    assert_eq!(layer.params().sign, DepthSign::Negative);

    assert!(matches!(
        layout.load_bathymetry(dir.path().join("nope.asc"), BathymetryParams::default()),
        Err(LayoutError::Io(_))
    ));
    assert_eq!(layout.n_points(), 7);
}

#[test]
fn mode_and_sign_tokens() {
    assert_eq!("a".parse::<ConstraintMode>().unwrap(), ConstraintMode::Append);
    assert_eq!("W".parse::<ConstraintMode>().unwrap(), ConstraintMode::Overwrite);
    assert_eq!(
        ConstraintMode::try_from("Append").unwrap(),
        ConstraintMode::Append
    );
    assert!(matches!(
        "x".parse::<ConstraintMode>(),
        Err(LayoutError::InvalidMode(m)) if m == "x"
    ));
    assert_eq!("-".parse::<DepthSign>().unwrap(), DepthSign::Negative);
    assert_eq!(DepthSign::try_from("+").unwrap(), DepthSign::Positive);
    assert!(matches!(
        "neg".parse::<DepthSign>(),
        Err(LayoutError::InvalidSign(_))
    ));
    assert_eq!(DepthSign::Negative.to_string(), "-");
}

#[test]
fn external_points_and_geometries() {
    let layout = Layout::from_points([vector![1.0, 2.0], vector![3.0, 4.0]]);
    assert!(layout.has_geom());
    assert!(layout.grid().is_none());
    assert_eq!(layout.x_coordinates(), vec![1.0, 3.0]);
    assert_eq!(layout.y_coordinates(), vec![2.0, 4.0]);

    let geoms = vec![
        Geometry::Point(Point::new(0.0, 0.0)),
        Geometry::MultiPoint(MultiPoint::new(vec![
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ])),
    ];
    let mut layout = Layout::from_geometries(geoms).unwrap();
    assert_eq!(layout.n_points(), 3);
    layout
        .clip_to_area(square(1.5, 1.5, 0.6), ConstraintMode::Append)
        .unwrap();
    assert_eq!(layout.to_multipoint().0.len(), 2);

    let err = Layout::from_geometries(vec![Geometry::Polygon(square(0.0, 0.0, 1.0))])
        .unwrap_err();
    assert!(matches!(err, LayoutError::UnsupportedGeometry("Polygon")));
}

fn arb_rect() -> impl Strategy<Value = Polygon<f64>> {
    (-6.0f64..6.0, -6.0f64..6.0, 0.3f64..6.0, 0.3f64..6.0)
        .prop_map(|(x, y, w, h)| rect(x, y, x + w, y + h))
}

fn grid_5x5() -> GridSpec {
    GridSpec::builder()
        .rows(5)
        .cols(5)
        .row_step(2.0)
        .col_step(2.0)
        .angle(17.0)
        .build()
        .unwrap()
}

fn coords(layout: &Layout) -> Vec<Vector2<f64>> {
    layout.coordinates()
}

proptest! {
    #[test]
    fn append_is_union(a in arb_rect(), b in arb_rect()) {
        let mut two_steps = Layout::from_grid(&grid_5x5()).unwrap();
        two_steps
            .clip_to_area(a.clone(), ConstraintMode::Append).unwrap()
            .clip_to_area(b.clone(), ConstraintMode::Append).unwrap();
        let mut one_step = Layout::from_grid(&grid_5x5()).unwrap();
        one_step
            .clip_to_area(Region::union_of([a, b]), ConstraintMode::Overwrite)
            .unwrap();
        prop_assert_eq!(coords(&two_steps), coords(&one_step));
    }

    #[test]
    fn overwrite_is_idempotent(a in arb_rect(), e in arb_rect()) {
        let mut once = Layout::from_grid(&grid_5x5()).unwrap();
        once.avoid_exclusions(e.clone(), ConstraintMode::Append).unwrap();
        once.clip_to_area(a.clone(), ConstraintMode::Overwrite).unwrap();
        let mut twice = once.clone();
        twice.clip_to_area(a, ConstraintMode::Overwrite).unwrap();
        prop_assert_eq!(coords(&once), coords(&twice));
    }

    #[test]
    fn visible_stays_subset_and_reset_recovers(
        ops in proptest::collection::vec((0u8..6, arb_rect()), 1..8)
    ) {
        let mut layout = Layout::from_grid(&grid_5x5()).unwrap();
        for (op, r) in ops {
            match op {
                0 => { layout.clip_to_area(r, ConstraintMode::Append).unwrap(); }
                1 => { layout.clip_to_area(r, ConstraintMode::Overwrite).unwrap(); }
                2 => { layout.avoid_exclusions(r, ConstraintMode::Append).unwrap(); }
                3 => { layout.avoid_exclusions(r, ConstraintMode::Overwrite).unwrap(); }
                4 => { layout.reset_area().unwrap(); }
                _ => { layout.reset_exclusion().unwrap(); }
            }
            let idx = layout.visible_indices();
            prop_assert!(idx.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(idx.iter().all(|&i| i < 25));
            prop_assert_eq!(
                layout.is_constrained(),
                layout.has_area() || layout.has_exclusion()
            );
        }
        layout.reset_geom();
        prop_assert!(!layout.is_constrained());
        prop_assert_eq!(layout.coordinates(), layout.raw_coordinates().to_vec());
    }
}
