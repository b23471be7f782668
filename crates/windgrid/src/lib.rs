//! Gridded turbine layouts and their geometric constraints.
//!
//! Pipeline
//! - `grid`: parametric lattice → shear → rotation → scale → translate.
//! - `layout`: a point set plus layered area / exclusion / bathymetry
//!   constraints, always re-derivable from the unconstrained baseline.
//! - `generator`: Cartesian sweeps over grid parameters, one layout per combination.
//!
//! API Policy
//! - The crate is consumed by the workspace CLI and notebooks. Breaking changes
//!   are fine when they make the constraint model clearer.

pub mod error;
pub mod generator;
pub mod grid;
pub mod layout;
pub mod raster;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{LayoutError, Result};
pub use nalgebra::{Matrix2 as Mat2, Vector2 as Vec2};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::error::{LayoutError, Result};
    pub use crate::generator::{Candidates, Combination, GridInstructions, LayoutGenerator};
    pub use crate::grid::{CoordinateSynthesizer, GridSpec, GridSpecBuilder, LatticeParams};
    pub use crate::layout::{BathymetryParams, ConstraintMode, DepthSign, Layout, Region};
    pub use crate::raster::{GridRaster, RasterSource};
    pub use nalgebra::{Matrix2 as Mat2, Vector2 as Vec2};
}
