//! Error type shared by grids, layouts, rasters and generators.
//!
//! All variants are caller-input errors: they are raised synchronously and
//! never retried internally.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, Error)]
pub enum LayoutError {
    /// Conflicting offsets, non-finite angles, non-positive dimensions or steps.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("mode must be 'a' (append) or 'w' (overwrite), got {0:?}")]
    InvalidMode(String),

    #[error("layout has no geometry to constrain")]
    EmptyGeometry,

    #[error("sign must be '-' or '+', got {0:?}")]
    InvalidSign(String),

    #[error("bathymetry dataset is closed")]
    ClosedDataset,

    #[error("geometry type must be Point or MultiPoint, not {0}")]
    UnsupportedGeometry(&'static str),

    #[error("band {band} out of range, raster has {count} band(s)")]
    BandOutOfRange { band: usize, count: usize },

    #[error("raster format: {0}")]
    RasterFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LayoutError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameter(reason.into())
    }
}
