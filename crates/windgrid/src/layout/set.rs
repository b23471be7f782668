//! `Layout`: a raw point set plus layered constraints.
//!
//! Invariants:
//! - `raw` is an owned snapshot fixed at construction; nothing mutates it.
//! - `visible` holds strictly increasing indices into `raw`, so the visible
//!   set is always a subset of the raw set and keeps raw order.
//! - `visible == derive_visible(raw, layers)` after every public call. The
//!   layer order is area → exclusion → bathymetry and lives only in
//!   `derive_visible`.
//! - Updates are transactional: layers are staged, the visible set derived,
//!   and only then both are committed. A failed call leaves the layout as it was.

use std::path::Path;
use std::sync::Arc;

use geo::{Geometry, MultiPoint, Point};
use nalgebra::Vector2;

use super::layers::{BathymetryLayer, BathymetryParams, ConstraintMode};
use super::region::Region;
use crate::error::{LayoutError, Result};
use crate::grid::{CoordinateSynthesizer, GridSpec};
use crate::raster::{GridRaster, RasterSource};

#[derive(Clone, Debug, Default)]
struct Layers {
    area: Option<Region>,
    exclusion: Option<Region>,
    bathymetry: Option<BathymetryLayer>,
}

impl Layers {
    #[inline]
    fn any(&self) -> bool {
        self.area.is_some() || self.exclusion.is_some() || self.bathymetry.is_some()
    }
}

/// Apply every present layer to `raw`, in fixed order.
fn derive_visible(raw: &[Vector2<f64>], layers: &Layers) -> Result<Vec<usize>> {
    let mut visible: Vec<usize> = (0..raw.len()).collect();
    if let Some(area) = &layers.area {
        visible.retain(|&i| area.contains(raw[i]));
    }
    if let Some(exclusion) = &layers.exclusion {
        visible.retain(|&i| !exclusion.contains(raw[i]));
    }
    if let Some(bathymetry) = &layers.bathymetry {
        bathymetry.retain(raw, &mut visible)?;
    }
    Ok(visible)
}

#[derive(Clone, Debug, Default)]
pub struct Layout {
    grid: Option<GridSpec>,
    raw: Option<Vec<Vector2<f64>>>,
    visible: Vec<usize>,
    layers: Layers,
}

impl Layout {
    /// Layout without geometry; every constraint call fails with `EmptyGeometry`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Grid layout, clipped to `area` and then cut by `exclusion` when given.
    pub fn new(
        grid: Option<&GridSpec>,
        area: Option<Region>,
        exclusion: Option<Region>,
    ) -> Result<Self> {
        let layers = Layers {
            area,
            exclusion,
            bathymetry: None,
        };
        match grid {
            Some(grid) => {
                let raw = grid.coordinates()?;
                Self::assemble(Some(grid.clone()), Some(raw), layers)
            }
            None if layers.any() => Err(LayoutError::EmptyGeometry),
            None => Ok(Self::empty()),
        }
    }

    pub fn from_grid(grid: &GridSpec) -> Result<Self> {
        Self::new(Some(grid), None, None)
    }

    /// Like `new`, reusing a synthesizer's matrix cache; regions are cloned in.
    pub fn from_grid_with(
        grid: &GridSpec,
        synth: &mut CoordinateSynthesizer,
        area: Option<&Region>,
        exclusion: Option<&Region>,
    ) -> Result<Self> {
        let raw = grid.coordinates_with(synth)?;
        let layers = Layers {
            area: area.cloned(),
            exclusion: exclusion.cloned(),
            bathymetry: None,
        };
        Self::assemble(Some(grid.clone()), Some(raw), layers)
    }

    /// Unconstrained layout over externally loaded points.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vector2<f64>>,
    {
        let raw: Vec<Vector2<f64>> = points.into_iter().collect();
        Self {
            grid: None,
            visible: (0..raw.len()).collect(),
            raw: Some(raw),
            layers: Layers::default(),
        }
    }

    /// Unconstrained layout from point-like geometries.
    ///
    /// Fails with `UnsupportedGeometry` on anything other than `Point`/`MultiPoint`.
    pub fn from_geometries<I>(geoms: I) -> Result<Self>
    where
        I: IntoIterator<Item = Geometry<f64>>,
    {
        let mut points = Vec::new();
        for g in geoms {
            match g {
                Geometry::Point(p) => points.push(Vector2::new(p.x(), p.y())),
                Geometry::MultiPoint(mp) => {
                    points.extend(mp.0.iter().map(|p| Vector2::new(p.x(), p.y())))
                }
                other => return Err(LayoutError::UnsupportedGeometry(geometry_name(&other))),
            }
        }
        Ok(Self::from_points(points))
    }

    fn assemble(
        grid: Option<GridSpec>,
        raw: Option<Vec<Vector2<f64>>>,
        layers: Layers,
    ) -> Result<Self> {
        let mut layout = Self {
            grid,
            raw,
            visible: Vec::new(),
            layers: Layers::default(),
        };
        layout.commit(layers)?;
        Ok(layout)
    }

    /// Derive the visible set for `layers`; commit both only on success.
    fn commit(&mut self, layers: Layers) -> Result<()> {
        let visible = match &self.raw {
            Some(raw) => derive_visible(raw, &layers)?,
            None => Vec::new(),
        };
        self.visible = visible;
        self.layers = layers;
        Ok(())
    }

    fn require_geom(&self) -> Result<()> {
        if self.has_geom() {
            Ok(())
        } else {
            Err(LayoutError::EmptyGeometry)
        }
    }

    /// Keep only points inside `area`.
    ///
    /// `Append` unions with any existing area; `Overwrite` replaces it.
    pub fn clip_to_area(
        &mut self,
        area: impl Into<Region>,
        mode: ConstraintMode,
    ) -> Result<&mut Self> {
        self.require_geom()?;
        let area = area.into();
        let mut layers = self.layers.clone();
        layers.area = Some(match (mode, layers.area.take()) {
            (ConstraintMode::Append, Some(existing)) => existing.union(&area),
            _ => area,
        });
        self.commit(layers)?;
        Ok(self)
    }

    /// Drop points inside `exclusion`.
    ///
    /// `Append` unions with any existing exclusion; `Overwrite` replaces it.
    pub fn avoid_exclusions(
        &mut self,
        exclusion: impl Into<Region>,
        mode: ConstraintMode,
    ) -> Result<&mut Self> {
        self.require_geom()?;
        let exclusion = exclusion.into();
        let mut layers = self.layers.clone();
        layers.exclusion = Some(match (mode, layers.exclusion.take()) {
            (ConstraintMode::Append, Some(existing)) => existing.union(&exclusion),
            _ => exclusion,
        });
        self.commit(layers)?;
        Ok(self)
    }

    /// Open an ESRI ASCII grid and filter points by depth.
    ///
    /// The layout keeps the loaded raster, so later resets re-sample without I/O.
    pub fn load_bathymetry<P: AsRef<Path>>(
        &mut self,
        path: P,
        params: BathymetryParams,
    ) -> Result<&mut Self> {
        let path = path.as_ref();
        let raster: Arc<dyn RasterSource> = Arc::new(GridRaster::from_ascii_grid(path)?);
        self.set_bathymetry(raster, Some(path.to_path_buf()), params)
    }

    /// Filter points by depth sampled from an open dataset owned by the caller.
    ///
    /// The dataset is never closed here. If the caller closes it, later
    /// recomputes that need it fail with `ClosedDataset`.
    pub fn apply_bathymetry(
        &mut self,
        dataset: Arc<dyn RasterSource>,
        params: BathymetryParams,
    ) -> Result<&mut Self> {
        self.set_bathymetry(dataset, None, params)
    }

    fn set_bathymetry(
        &mut self,
        raster: Arc<dyn RasterSource>,
        path: Option<std::path::PathBuf>,
        params: BathymetryParams,
    ) -> Result<&mut Self> {
        let layer = BathymetryLayer::new(raster, path, params)?;
        self.require_geom()?;
        let mut layers = self.layers.clone();
        layers.bathymetry = Some(layer);
        self.commit(layers)?;
        Ok(self)
    }

    /// Remove the area layer; exclusion and bathymetry are re-applied to the raw points.
    pub fn reset_area(&mut self) -> Result<&mut Self> {
        if self.layers.area.is_some() {
            let mut layers = self.layers.clone();
            layers.area = None;
            self.commit(layers)?;
        }
        Ok(self)
    }

    /// Remove the exclusion layer; area and bathymetry are re-applied to the raw points.
    pub fn reset_exclusion(&mut self) -> Result<&mut Self> {
        if self.layers.exclusion.is_some() {
            let mut layers = self.layers.clone();
            layers.exclusion = None;
            self.commit(layers)?;
        }
        Ok(self)
    }

    /// Remove the bathymetry layer; area and exclusion are re-applied to the raw points.
    pub fn reset_bathymetry(&mut self) -> Result<&mut Self> {
        if self.layers.bathymetry.is_some() {
            let mut layers = self.layers.clone();
            layers.bathymetry = None;
            self.commit(layers)?;
        }
        Ok(self)
    }

    /// Drop every layer and show the raw points again.
    pub fn reset_geom(&mut self) -> &mut Self {
        self.layers = Layers::default();
        self.visible = self.raw.as_ref().map_or(Vec::new(), |raw| (0..raw.len()).collect());
        self
    }

    #[inline]
    pub fn is_constrained(&self) -> bool {
        self.layers.any()
    }
    #[inline]
    pub fn has_area(&self) -> bool {
        self.layers.area.is_some()
    }
    #[inline]
    pub fn has_exclusion(&self) -> bool {
        self.layers.exclusion.is_some()
    }
    #[inline]
    pub fn has_bathymetry(&self) -> bool {
        self.layers.bathymetry.is_some()
    }
    #[inline]
    pub fn has_geom(&self) -> bool {
        self.raw.is_some()
    }

    /// Number of visible points.
    #[inline]
    pub fn n_points(&self) -> usize {
        self.visible.len()
    }

    pub fn grid(&self) -> Option<&GridSpec> {
        self.grid.as_ref()
    }
    pub fn area(&self) -> Option<&Region> {
        self.layers.area.as_ref()
    }
    pub fn exclusion(&self) -> Option<&Region> {
        self.layers.exclusion.as_ref()
    }
    pub fn bathymetry(&self) -> Option<&BathymetryLayer> {
        self.layers.bathymetry.as_ref()
    }

    /// Indices of the visible points within `raw_coordinates()`.
    pub fn visible_indices(&self) -> &[usize] {
        &self.visible
    }

    /// Visible points, in raw order.
    pub fn coordinates(&self) -> Vec<Vector2<f64>> {
        match &self.raw {
            Some(raw) => self.visible.iter().map(|&i| raw[i]).collect(),
            None => Vec::new(),
        }
    }

    /// The unconstrained baseline.
    pub fn raw_coordinates(&self) -> &[Vector2<f64>] {
        self.raw.as_deref().unwrap_or(&[])
    }

    pub fn x_coordinates(&self) -> Vec<f64> {
        self.coordinates().iter().map(|p| p.x).collect()
    }

    pub fn y_coordinates(&self) -> Vec<f64> {
        self.coordinates().iter().map(|p| p.y).collect()
    }

    pub fn to_multipoint(&self) -> MultiPoint<f64> {
        MultiPoint::new(
            self.coordinates()
                .into_iter()
                .map(|p| Point::new(p.x, p.y))
                .collect(),
        )
    }
}

fn geometry_name(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
