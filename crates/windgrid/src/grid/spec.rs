//! `GridSpec`: validated grid parameters in physical space.
//!
//! A spec is the lattice (rows, columns, steps, offset, angle, shears) plus a
//! `scale` converting non-dimensional steps to physical units and an `origin`
//! the grid is centered on. Specs are values: `rescale`/`translate`/`rotate`
//! return new specs; the `*_in_place` variants mutate an owned spec explicitly.

use geo::{MultiPoint, Point};
use nalgebra::Vector2;

use super::synth::{synthesize, CoordinateSynthesizer, LatticeParams};
use crate::error::{LayoutError, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct GridSpec {
    lattice: LatticeParams,
    origin: Vector2<f64>,
    scale: f64,
}

impl Default for GridSpec {
    /// 10×10 grid, steps of 6, no offset or shear, angle 0, origin (0, 0), scale 1.
    fn default() -> Self {
        Self {
            lattice: LatticeParams {
                angle: Some(0.0),
                ..LatticeParams::new(10, 10, 6.0, 6.0)
            },
            origin: Vector2::zeros(),
            scale: 1.0,
        }
    }
}

impl GridSpec {
    pub fn builder() -> GridSpecBuilder {
        GridSpecBuilder::default()
    }

    /// Validate and wrap lattice parameters. A missing angle is stored as 0.
    pub fn from_lattice(
        mut lattice: LatticeParams,
        origin: Vector2<f64>,
        scale: f64,
    ) -> Result<Self> {
        lattice.angle = Some(lattice.angle.unwrap_or(0.0));
        lattice.validate()?;
        check_scale(scale)?;
        check_finite("origin", origin.x)?;
        check_finite("origin", origin.y)?;
        Ok(Self {
            lattice,
            origin,
            scale,
        })
    }

    #[inline]
    pub fn lattice(&self) -> &LatticeParams {
        &self.lattice
    }
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.lattice.n_rows
    }
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.lattice.n_cols
    }
    #[inline]
    pub fn row_step(&self) -> f64 {
        self.lattice.row_step
    }
    #[inline]
    pub fn col_step(&self) -> f64 {
        self.lattice.col_step
    }
    #[inline]
    pub fn row_offset(&self) -> bool {
        self.lattice.row_offset
    }
    #[inline]
    pub fn col_offset(&self) -> bool {
        self.lattice.col_offset
    }
    /// Clockwise angle in degrees.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.lattice.angle.unwrap_or(0.0)
    }
    #[inline]
    pub fn x_shear(&self) -> Option<f64> {
        self.lattice.x_shear
    }
    #[inline]
    pub fn y_shear(&self) -> Option<f64> {
        self.lattice.y_shear
    }
    #[inline]
    pub fn origin(&self) -> Vector2<f64> {
        self.origin
    }
    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }
    #[inline]
    pub fn n_points(&self) -> usize {
        self.lattice.n_points()
    }

    /// Physical coordinates: synthesized lattice × `scale` + `origin`.
    pub fn coordinates(&self) -> Result<Vec<Vector2<f64>>> {
        let pts = synthesize(&self.lattice)?;
        Ok(self.place(pts))
    }

    /// Same as `coordinates`, reusing the synthesizer's matrix cache.
    pub fn coordinates_with(
        &self,
        synth: &mut CoordinateSynthesizer,
    ) -> Result<Vec<Vector2<f64>>> {
        let pts = synth.synthesize(&self.lattice)?;
        Ok(self.place(pts))
    }

    fn place(&self, mut pts: Vec<Vector2<f64>>) -> Vec<Vector2<f64>> {
        for p in pts.iter_mut() {
            *p = *p * self.scale + self.origin;
        }
        pts
    }

    pub fn x_coordinates(&self) -> Result<Vec<f64>> {
        Ok(self.coordinates()?.iter().map(|p| p.x).collect())
    }

    pub fn y_coordinates(&self) -> Result<Vec<f64>> {
        Ok(self.coordinates()?.iter().map(|p| p.y).collect())
    }

    pub fn to_points(&self) -> Result<Vec<Point<f64>>> {
        Ok(self
            .coordinates()?
            .into_iter()
            .map(|p| Point::new(p.x, p.y))
            .collect())
    }

    pub fn to_multipoint(&self) -> Result<MultiPoint<f64>> {
        Ok(MultiPoint::new(self.to_points()?))
    }

    /// New spec with `scale` replaced.
    #[must_use = "rescale returns a new spec; use rescale_in_place to mutate"]
    pub fn rescale(&self, scale: f64) -> Result<GridSpec> {
        let mut out = self.clone();
        out.rescale_in_place(scale)?;
        Ok(out)
    }

    /// New spec with the origin shifted by `(dx, dy)`.
    #[must_use = "translate returns a new spec; use translate_in_place to mutate"]
    pub fn translate(&self, dx: f64, dy: f64) -> Result<GridSpec> {
        let mut out = self.clone();
        out.translate_in_place(dx, dy)?;
        Ok(out)
    }

    /// New spec with `delta` degrees added to the clockwise angle.
    #[must_use = "rotate returns a new spec; use rotate_in_place to mutate"]
    pub fn rotate(&self, delta: f64) -> Result<GridSpec> {
        let mut out = self.clone();
        out.rotate_in_place(delta)?;
        Ok(out)
    }

    pub fn rescale_in_place(&mut self, scale: f64) -> Result<()> {
        check_scale(scale)?;
        self.scale = scale;
        Ok(())
    }

    pub fn translate_in_place(&mut self, dx: f64, dy: f64) -> Result<()> {
        let origin = self.origin + Vector2::new(dx, dy);
        check_finite("origin", origin.x)?;
        check_finite("origin", origin.y)?;
        self.origin = origin;
        Ok(())
    }

    pub fn rotate_in_place(&mut self, delta: f64) -> Result<()> {
        let angle = self.angle() + delta;
        check_finite("angle", angle)?;
        self.lattice.angle = Some(angle);
        Ok(())
    }
}

fn check_scale(scale: f64) -> Result<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(LayoutError::invalid(format!(
            "scale must be finite and > 0, got {scale}"
        )));
    }
    Ok(())
}

fn check_finite(name: &str, v: f64) -> Result<()> {
    if !v.is_finite() {
        return Err(LayoutError::invalid(format!("{name} must be finite, got {v}")));
    }
    Ok(())
}

/// Builder with the same defaults as `GridSpec::default()`.
#[derive(Clone, Debug)]
pub struct GridSpecBuilder {
    lattice: LatticeParams,
    origin: Vector2<f64>,
    scale: f64,
}

impl Default for GridSpecBuilder {
    fn default() -> Self {
        let spec = GridSpec::default();
        Self {
            lattice: spec.lattice,
            origin: spec.origin,
            scale: spec.scale,
        }
    }
}

impl GridSpecBuilder {
    pub fn rows(mut self, n_rows: usize) -> Self {
        self.lattice.n_rows = n_rows;
        self
    }
    pub fn cols(mut self, n_cols: usize) -> Self {
        self.lattice.n_cols = n_cols;
        self
    }
    pub fn row_step(mut self, step: f64) -> Self {
        self.lattice.row_step = step;
        self
    }
    pub fn col_step(mut self, step: f64) -> Self {
        self.lattice.col_step = step;
        self
    }
    pub fn row_offset(mut self, on: bool) -> Self {
        self.lattice.row_offset = on;
        self
    }
    pub fn col_offset(mut self, on: bool) -> Self {
        self.lattice.col_offset = on;
        self
    }
    /// Clockwise, degrees.
    pub fn angle(mut self, angle: f64) -> Self {
        self.lattice.angle = Some(angle);
        self
    }
    pub fn x_shear(mut self, shear: impl Into<Option<f64>>) -> Self {
        self.lattice.x_shear = shear.into();
        self
    }
    pub fn y_shear(mut self, shear: impl Into<Option<f64>>) -> Self {
        self.lattice.y_shear = shear.into();
        self
    }
    pub fn origin(mut self, x: f64, y: f64) -> Self {
        self.origin = Vector2::new(x, y);
        self
    }
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn build(self) -> Result<GridSpec> {
        GridSpec::from_lattice(self.lattice, self.origin, self.scale)
    }
}
