//! Coordinate synthesis: centered lattice, brick offset, shear, rotation.
//!
//! - `LatticeParams`: raw, non-dimensional grid parameters (no scale/origin).
//! - `rotation_matrix` / `shear_matrix`: pure matrix functions of their angles.
//! - `CoordinateSynthesizer`: owns a bounded `MatrixCache` and produces point arrays.
//!
//! Conventions
//! - Points are ordered row-major: rows from lowest to highest y, columns from
//!   lowest to highest x within a row.
//! - `angle` is clockwise-positive (wind-direction convention), so the
//!   rotation applied is `rotation_matrix(-angle)`.
//! - Shear is applied to the lattice before rotation.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use nalgebra::{Matrix2, Vector2};

use super::cfg::{DEFAULT_CACHE_CAPACITY, SHEAR_POLE_EPS};
use crate::error::{LayoutError, Result};

/// Non-dimensional lattice parameters consumed by the synthesizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeParams {
    pub n_rows: usize,
    pub n_cols: usize,
    pub row_step: f64,
    pub col_step: f64,
    /// Shift every second row (starting with the first) by `col_step / 2` along x.
    pub row_offset: bool,
    /// Shift every second column (starting with the first) by `row_step / 2` along y.
    pub col_offset: bool,
    /// Clockwise rotation in degrees.
    pub angle: Option<f64>,
    /// Horizontal shear angle in degrees.
    pub x_shear: Option<f64>,
    /// Vertical shear angle in degrees.
    pub y_shear: Option<f64>,
}

impl LatticeParams {
    /// Plain rectangular lattice: no offset, shear or rotation.
    pub fn new(n_rows: usize, n_cols: usize, row_step: f64, col_step: f64) -> Self {
        Self {
            n_rows,
            n_cols,
            row_step,
            col_step,
            row_offset: false,
            col_offset: false,
            angle: None,
            x_shear: None,
            y_shear: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_rows == 0 || self.n_cols == 0 {
            return Err(LayoutError::invalid(format!(
                "grid dimensions must be positive, got {}x{}",
                self.n_rows, self.n_cols
            )));
        }
        if self.n_rows.checked_mul(self.n_cols).is_none() {
            return Err(LayoutError::invalid(format!(
                "grid of {}x{} points overflows",
                self.n_rows, self.n_cols
            )));
        }
        for (name, step) in [("row_step", self.row_step), ("col_step", self.col_step)] {
            if !step.is_finite() || step <= 0.0 {
                return Err(LayoutError::invalid(format!(
                    "{name} must be finite and > 0, got {step}"
                )));
            }
        }
        if self.row_offset && self.col_offset {
            return Err(LayoutError::invalid(
                "row_offset and col_offset cannot both be true",
            ));
        }
        if let Some(angle) = self.angle {
            if !angle.is_finite() {
                return Err(LayoutError::invalid(format!("angle must be finite, got {angle}")));
            }
        }
        for shear in [self.x_shear, self.y_shear].into_iter().flatten() {
            shear_tangent(shear)?;
        }
        Ok(())
    }

    #[inline]
    fn has_shear(&self) -> bool {
        self.x_shear.is_some() || self.y_shear.is_some()
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.n_rows.saturating_mul(self.n_cols)
    }
}

/// Rotation by `angle` degrees, positive anticlockwise.
#[inline]
pub fn rotation_matrix(angle: f64) -> Matrix2<f64> {
    let (s, c) = angle.to_radians().sin_cos();
    Matrix2::new(c, -s, s, c)
}

/// Shear `[[1, tan(x_shear)], [tan(y_shear), 1]]` from angles in degrees.
///
/// Fails with `InvalidParameter` when a tangent is undefined (±90° mod 180°).
pub fn shear_matrix(x_shear: f64, y_shear: f64) -> Result<Matrix2<f64>> {
    let tx = shear_tangent(x_shear)?;
    let ty = shear_tangent(y_shear)?;
    Ok(Matrix2::new(1.0, tx, ty, 1.0))
}

fn shear_tangent(angle: f64) -> Result<f64> {
    if !angle.is_finite() {
        return Err(LayoutError::invalid(format!("shear angle must be finite, got {angle}")));
    }
    // f64 tan(90°) is ~1.6e16, not infinity, so the pole is checked on the angle itself.
    if (angle.rem_euclid(180.0) - 90.0).abs() < SHEAR_POLE_EPS {
        return Err(LayoutError::invalid(format!(
            "shear angle {angle} has an undefined tangent"
        )));
    }
    let t = angle.to_radians().tan();
    if !t.is_finite() {
        return Err(LayoutError::invalid(format!(
            "shear angle {angle} has a non-finite tangent"
        )));
    }
    Ok(t)
}

/// Centered rectangular lattice with optional brick offset (no shear/rotation).
pub fn base_lattice(params: &LatticeParams) -> Vec<Vector2<f64>> {
    let x0 = (params.n_cols as f64 - 1.0) / 2.0;
    let y0 = (params.n_rows as f64 - 1.0) / 2.0;
    let mut out = Vec::with_capacity(params.n_points());
    for r in 0..params.n_rows {
        let y = (r as f64 - y0) * params.row_step;
        for c in 0..params.n_cols {
            let x = (c as f64 - x0) * params.col_step;
            let mut p = Vector2::new(x, y);
            if params.row_offset && r % 2 == 0 {
                p.x += params.col_step / 2.0;
            } else if params.col_offset && c % 2 == 0 {
                p.y += params.row_step / 2.0;
            }
            out.push(p);
        }
    }
    out
}

/// Uncached synthesis; identical output to `CoordinateSynthesizer::synthesize`.
pub fn synthesize(params: &LatticeParams) -> Result<Vec<Vector2<f64>>> {
    CoordinateSynthesizer::with_capacity(0).synthesize(params)
}

/// Bounded map with first-in-first-out eviction.
#[derive(Clone, Debug)]
struct BoundedCache<K> {
    capacity: usize,
    map: HashMap<K, Matrix2<f64>>,
    order: VecDeque<K>,
}

impl<K: Copy + Eq + Hash> BoundedCache<K> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::with_capacity(capacity.min(64)),
            order: VecDeque::with_capacity(capacity.min(64)),
        }
    }

    fn get(&self, key: &K) -> Option<Matrix2<f64>> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: K, m: Matrix2<f64>) -> Matrix2<f64> {
        if self.capacity == 0 || self.map.contains_key(&key) {
            return m;
        }
        if self.order.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            }
        }
        self.map.insert(key, m);
        self.order.push_back(key);
        m
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}

/// Exact bit key; `0.0` and `-0.0` are distinct entries.
#[inline]
fn angle_key(angle: f64) -> u64 {
    angle.to_bits()
}

/// Memoized rotation and shear matrices, keyed by exact angle bits.
#[derive(Clone, Debug)]
pub struct MatrixCache {
    rotations: BoundedCache<u64>,
    shears: BoundedCache<(u64, u64)>,
}

impl MatrixCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rotations: BoundedCache::new(capacity),
            shears: BoundedCache::new(capacity),
        }
    }

    /// Anticlockwise rotation matrix for `angle` degrees.
    pub fn rotation(&mut self, angle: f64) -> Matrix2<f64> {
        let key = angle_key(angle);
        match self.rotations.get(&key) {
            Some(m) => m,
            None => self.rotations.insert(key, rotation_matrix(angle)),
        }
    }

    pub fn shear(&mut self, x_shear: f64, y_shear: f64) -> Result<Matrix2<f64>> {
        let key = (angle_key(x_shear), angle_key(y_shear));
        if let Some(m) = self.shears.get(&key) {
            return Ok(m);
        }
        let m = shear_matrix(x_shear, y_shear)?;
        Ok(self.shears.insert(key, m))
    }

    pub fn rotations_len(&self) -> usize {
        self.rotations.len()
    }

    pub fn shears_len(&self) -> usize {
        self.shears.len()
    }

    pub fn clear(&mut self) {
        self.rotations.clear();
        self.shears.clear();
    }
}

impl Default for MatrixCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

/// Turns lattice parameters into point arrays centered on the origin.
#[derive(Clone, Debug, Default)]
pub struct CoordinateSynthesizer {
    cache: MatrixCache,
}

impl CoordinateSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `capacity == 0` disables memoization.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: MatrixCache::with_capacity(capacity),
        }
    }

    pub fn cache(&self) -> &MatrixCache {
        &self.cache
    }

    /// Lattice → shear → clockwise rotation.
    pub fn synthesize(&mut self, params: &LatticeParams) -> Result<Vec<Vector2<f64>>> {
        params.validate()?;
        let mut pts = base_lattice(params);
        if params.has_shear() {
            let m = self
                .cache
                .shear(params.x_shear.unwrap_or(0.0), params.y_shear.unwrap_or(0.0))?;
            apply_linear(&mut pts, &m);
        }
        if let Some(angle) = params.angle {
            let m = self.cache.rotation(-angle);
            apply_linear(&mut pts, &m);
        }
        Ok(pts)
    }
}

#[inline]
fn apply_linear(pts: &mut [Vector2<f64>], m: &Matrix2<f64>) {
    for p in pts.iter_mut() {
        *p = m * *p;
    }
}
