//! Raster sources for bathymetry sampling.
//!
//! - `RasterSource`: point sampler with an open/closed lifecycle. Bands are
//!   1-based (GDAL convention); missing data reads as NaN.
//! - `GridRaster`: north-up, square-cell, in-memory raster. Loads ESRI ASCII
//!   grids (`.asc`), the plain-text interchange format most GIS tools export.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{LayoutError, Result};

/// A sampled raster dataset. The owner controls `close`; samplers only observe it.
pub trait RasterSource: Send + Sync + fmt::Debug {
    fn is_closed(&self) -> bool;

    fn band_count(&self) -> usize;

    /// Value of `band` (1-based) at `(x, y)`; NaN for nodata or outside the extent.
    fn sample(&self, x: f64, y: f64, band: usize) -> f64;
}

/// In-memory raster: `bands[b][row * ncols + col]`, row 0 is the northern edge.
#[derive(Debug)]
pub struct GridRaster {
    ncols: usize,
    nrows: usize,
    x_min: f64,
    y_max: f64,
    cell_size: f64,
    bands: Vec<Vec<f64>>,
    closed: AtomicBool,
}

impl GridRaster {
    /// `x_min`/`y_max` is the upper-left corner of the upper-left cell.
    pub fn new(
        ncols: usize,
        nrows: usize,
        x_min: f64,
        y_max: f64,
        cell_size: f64,
        bands: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if ncols == 0 || nrows == 0 {
            return Err(LayoutError::RasterFormat(format!(
                "raster must have at least one cell, got {ncols}x{nrows}"
            )));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(LayoutError::RasterFormat(format!(
                "cell size must be finite and > 0, got {cell_size}"
            )));
        }
        if !(x_min.is_finite() && y_max.is_finite()) {
            return Err(LayoutError::RasterFormat("raster corner must be finite".into()));
        }
        if bands.is_empty() {
            return Err(LayoutError::RasterFormat("raster has no bands".into()));
        }
        let n_cells = ncols.checked_mul(nrows).ok_or_else(|| {
            LayoutError::RasterFormat(format!("raster of {ncols}x{nrows} cells overflows"))
        })?;
        for (i, b) in bands.iter().enumerate() {
            if b.len() != n_cells {
                return Err(LayoutError::RasterFormat(format!(
                    "band {} has {} values, expected {n_cells}",
                    i + 1,
                    b.len(),
                )));
            }
        }
        Ok(Self {
            ncols,
            nrows,
            x_min,
            y_max,
            cell_size,
            bands,
            closed: AtomicBool::new(false),
        })
    }

    /// Read an ESRI ASCII grid from disk.
    pub fn from_ascii_grid<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let raster = Self::parse_ascii_grid(&text)?;
        tracing::debug!(
            path = %path.display(),
            ncols = raster.ncols,
            nrows = raster.nrows,
            cell_size = raster.cell_size,
            "loaded ascii grid"
        );
        Ok(raster)
    }

    /// Parse ESRI ASCII grid text (single band).
    ///
    /// Header keys are case-insensitive: `ncols`, `nrows`, `xllcorner|xllcenter`,
    /// `yllcorner|yllcenter`, `cellsize`, optional `nodata_value`.
    pub fn parse_ascii_grid(text: &str) -> Result<Self> {
        let mut ncols = None;
        let mut nrows = None;
        let mut xll: Option<(f64, bool)> = None;
        let mut yll: Option<(f64, bool)> = None;
        let mut cell_size = None;
        let mut nodata = None;

        let mut lines = text.lines().peekable();
        while let Some(&line) = lines.peek() {
            let mut parts = line.split_whitespace();
            let Some(key) = parts.next() else {
                lines.next();
                continue;
            };
            if key.parse::<f64>().is_ok() {
                break;
            }
            let value = parts
                .next()
                .ok_or_else(|| LayoutError::RasterFormat(format!("header {key} has no value")))?;
            let num = |v: &str| {
                v.parse::<f64>()
                    .map_err(|_| LayoutError::RasterFormat(format!("bad header value {key}={v}")))
            };
            let count = |v: &str| {
                v.parse::<usize>()
                    .map_err(|_| LayoutError::RasterFormat(format!("bad header value {key}={v}")))
            };
            match key.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(count(value)?),
                "nrows" => nrows = Some(count(value)?),
                "xllcorner" => xll = Some((num(value)?, false)),
                "xllcenter" => xll = Some((num(value)?, true)),
                "yllcorner" => yll = Some((num(value)?, false)),
                "yllcenter" => yll = Some((num(value)?, true)),
                "cellsize" => cell_size = Some(num(value)?),
                "nodata_value" => nodata = Some(num(value)?),
                other => {
                    return Err(LayoutError::RasterFormat(format!("unknown header {other}")))
                }
            }
            lines.next();
        }

        let missing = |k: &str| LayoutError::RasterFormat(format!("missing header {k}"));
        let ncols = ncols.ok_or_else(|| missing("ncols"))?;
        let nrows = nrows.ok_or_else(|| missing("nrows"))?;
        let cell_size = cell_size.ok_or_else(|| missing("cellsize"))?;
        let (x, x_center) = xll.ok_or_else(|| missing("xllcorner"))?;
        let (y, y_center) = yll.ok_or_else(|| missing("yllcorner"))?;
        let x_min = if x_center { x - cell_size / 2.0 } else { x };
        let y_min = if y_center { y - cell_size / 2.0 } else { y };
        let y_max = y_min + nrows as f64 * cell_size;

        if ncols.checked_mul(nrows).is_none() {
            return Err(LayoutError::RasterFormat(format!(
                "raster of {ncols}x{nrows} cells overflows"
            )));
        }
        let mut values = Vec::new();
        for line in lines {
            for tok in line.split_whitespace() {
                let v: f64 = tok
                    .parse()
                    .map_err(|_| LayoutError::RasterFormat(format!("bad cell value {tok:?}")))?;
                values.push(match nodata {
                    Some(nd) if v == nd => f64::NAN,
                    _ => v,
                });
            }
        }
        Self::new(ncols, nrows, x_min, y_max, cell_size, vec![values])
    }

    /// Mark the dataset closed. Later samples through layouts fail with `ClosedDataset`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// `(x_min, y_min, x_max, y_max)`.
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let w = self.ncols as f64 * self.cell_size;
        let h = self.nrows as f64 * self.cell_size;
        (self.x_min, self.y_max - h, self.x_min + w, self.y_max)
    }

    fn cell_index(&self, x: f64, y: f64) -> Option<usize> {
        let col = ((x - self.x_min) / self.cell_size).floor();
        let row = ((self.y_max - y) / self.cell_size).floor();
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.ncols || row >= self.nrows {
            return None;
        }
        Some(row * self.ncols + col)
    }
}

impl RasterSource for GridRaster {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn sample(&self, x: f64, y: f64, band: usize) -> f64 {
        let Some(values) = band.checked_sub(1).and_then(|b| self.bands.get(b)) else {
            return f64::NAN;
        };
        self.cell_index(x, y).map_or(f64::NAN, |i| values[i])
    }
}
