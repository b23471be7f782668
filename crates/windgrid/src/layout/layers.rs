//! Constraint layer records: how new constraints combine with existing ones,
//! and everything needed to re-run a bathymetry filter.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use nalgebra::Vector2;

use crate::error::{LayoutError, Result};
use crate::raster::RasterSource;

/// How new polygons combine with an existing layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConstraintMode {
    /// Union with the existing layer (`"a"`).
    #[default]
    Append,
    /// Replace the existing layer (`"w"`).
    Overwrite,
}

impl FromStr for ConstraintMode {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "append" => Ok(Self::Append),
            "w" | "overwrite" => Ok(Self::Overwrite),
            _ => Err(LayoutError::InvalidMode(s.to_string())),
        }
    }
}

impl TryFrom<&str> for ConstraintMode {
    type Error = LayoutError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

/// Sign convention of depths in the raster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DepthSign {
    /// Depths stored as negative elevations (`"-"`); samples are negated.
    #[default]
    Negative,
    /// Depths stored as positive values (`"+"`).
    Positive,
}

impl DepthSign {
    #[inline]
    pub fn factor(self) -> f64 {
        match self {
            Self::Negative => -1.0,
            Self::Positive => 1.0,
        }
    }
}

impl FromStr for DepthSign {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "-" => Ok(Self::Negative),
            "+" => Ok(Self::Positive),
            _ => Err(LayoutError::InvalidSign(s.to_string())),
        }
    }
}

impl TryFrom<&str> for DepthSign {
    type Error = LayoutError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for DepthSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Negative => "-",
            Self::Positive => "+",
        })
    }
}

/// Bathymetry filter settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BathymetryParams {
    pub sign: DepthSign,
    /// 1-based raster band.
    pub band: usize,
    /// Inclusive `(min, max)` depth, after applying `sign`.
    pub limits: (f64, f64),
    /// Treat NaN samples as invalid.
    pub drop_na: bool,
}

impl Default for BathymetryParams {
    fn default() -> Self {
        Self {
            sign: DepthSign::Negative,
            band: 1,
            limits: (0.0, 60.0),
            drop_na: false,
        }
    }
}

impl BathymetryParams {
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.limits;
        if lo.is_nan() || hi.is_nan() || lo > hi {
            return Err(LayoutError::invalid(format!(
                "bathymetry limits must satisfy min <= max, got ({lo}, {hi})"
            )));
        }
        Ok(())
    }

    /// `min <= depth <= max`, or NaN when NaNs are kept.
    #[inline]
    pub fn accepts(&self, depth: f64) -> bool {
        if depth.is_nan() {
            return !self.drop_na;
        }
        self.limits.0 <= depth && depth <= self.limits.1
    }
}

/// An applied bathymetry constraint: the raster it samples plus its settings.
#[derive(Clone, Debug)]
pub struct BathymetryLayer {
    raster: Arc<dyn RasterSource>,
    path: Option<PathBuf>,
    params: BathymetryParams,
}

impl BathymetryLayer {
    pub(crate) fn new(
        raster: Arc<dyn RasterSource>,
        path: Option<PathBuf>,
        params: BathymetryParams,
    ) -> Result<Self> {
        params.validate()?;
        let layer = Self {
            raster,
            path,
            params,
        };
        layer.check_open()?;
        Ok(layer)
    }

    fn check_open(&self) -> Result<()> {
        if self.raster.is_closed() {
            return Err(LayoutError::ClosedDataset);
        }
        let count = self.raster.band_count();
        if self.params.band == 0 || self.params.band > count {
            return Err(LayoutError::BandOutOfRange {
                band: self.params.band,
                count,
            });
        }
        Ok(())
    }

    /// Keep the indices whose sampled depth passes the filter.
    pub(crate) fn retain(&self, raw: &[Vector2<f64>], visible: &mut Vec<usize>) -> Result<()> {
        self.check_open()?;
        let sign = self.params.sign.factor();
        let band = self.params.band;
        visible.retain(|&i| {
            let p = raw[i];
            let depth = self.raster.sample(p.x, p.y, band) * sign;
            self.params.accepts(depth)
        });
        Ok(())
    }

    /// Source file, when loaded via `Layout::load_bathymetry`.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn params(&self) -> &BathymetryParams {
        &self.params
    }

    pub fn raster(&self) -> &Arc<dyn RasterSource> {
        &self.raster
    }
}
