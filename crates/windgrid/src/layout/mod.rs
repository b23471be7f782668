//! Constrained point sets.
//!
//! Purpose
//! - Hold a recoverable raw point set and up to three constraint layers
//!   (area, exclusion, bathymetry), with the visible set always re-derivable
//!   from raw + layers in that fixed order.
//! - Allow any one layer to be appended, overwritten or reset without losing
//!   the others.
//!
//! Code cross-refs: `Layout`, `Region`, `BathymetryLayer`, `crate::raster::RasterSource`.

mod layers;
mod region;
mod set;

pub use layers::{BathymetryLayer, BathymetryParams, ConstraintMode, DepthSign};
pub use region::Region;
pub use set::Layout;

#[cfg(test)]
mod tests;
