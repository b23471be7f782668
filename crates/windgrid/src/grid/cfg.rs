//! Tolerance and sizing defaults for grid synthesis (internal).
//!
//! Policy
//! - Fixed constants, no runtime knobs. Callers that need a different cache
//!   size construct `CoordinateSynthesizer::with_capacity` directly.

/// Shear angles closer than this (degrees) to ±90° mod 180° are rejected.
pub(crate) const SHEAR_POLE_EPS: f64 = 1e-9;
/// Default number of matrices kept per cache (rotation and shear separately).
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
