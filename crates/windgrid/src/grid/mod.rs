//! Parametric point grids.
//!
//! Purpose
//! - Turn a handful of grid parameters into turbine coordinates:
//!   lattice → brick offset → shear → rotation → scale → translate.
//! - Keep the synthesizer pure apart from an explicit, bounded matrix cache.
//!
//! Code cross-refs: `LatticeParams`, `CoordinateSynthesizer`, `GridSpec`.

mod cfg;
mod spec;
pub mod synth;

pub use cfg::DEFAULT_CACHE_CAPACITY;
pub use spec::{GridSpec, GridSpecBuilder};
pub use synth::{
    base_lattice, rotation_matrix, shear_matrix, synthesize, CoordinateSynthesizer,
    LatticeParams, MatrixCache,
};
