//! Combinatorial layout generation.
//!
//! A `LayoutGenerator` sweeps the Cartesian product of grid parameter
//! candidates and builds one `Layout` per combination against a shared area
//! and exclusion.
//!
//! Enumeration
//! - Axes, in order: `row_steps`, `col_steps`, `angles`, `x_shears`,
//!   `y_shears`, `origins`, `scales`. The last axis varies fastest, so output
//!   order is lexicographic over the candidate indices.
//! - `n_rows`, `n_cols`, `row_offset`, `col_offset` stay fixed for the run.
//! - Each combination has a linear index; `combination(index)` replays it.
//!   Sequences are re-iterable and deterministic.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::grid::{CoordinateSynthesizer, GridSpec};
use crate::layout::{Layout, Region};

/// A single value or a list of candidate values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Candidates<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Candidates<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Candidates::One(v) => std::slice::from_ref(v),
            Candidates::Many(vs) => vs,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> From<Vec<T>> for Candidates<T> {
    fn from(vs: Vec<T>) -> Self {
        Candidates::Many(vs)
    }
}

/// Parameter sweep definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridInstructions {
    pub n_rows: usize,
    pub n_cols: usize,
    pub row_steps: Candidates<f64>,
    pub col_steps: Candidates<f64>,
    pub row_offset: bool,
    pub col_offset: bool,
    pub angles: Candidates<f64>,
    pub x_shears: Candidates<f64>,
    pub y_shears: Candidates<f64>,
    pub origins: Candidates<(f64, f64)>,
    pub scales: Candidates<f64>,
}

impl Default for GridInstructions {
    /// 10×10, steps 5.0..=10.0 by 0.5, angle 0, no shear, origin (0, 0), scale 250.
    fn default() -> Self {
        let steps: Vec<f64> = (0..=10).map(|i| 5.0 + 0.5 * i as f64).collect();
        Self {
            n_rows: 10,
            n_cols: 10,
            row_steps: Candidates::Many(steps.clone()),
            col_steps: Candidates::Many(steps),
            row_offset: false,
            col_offset: false,
            angles: Candidates::One(0.0),
            x_shears: Candidates::One(0.0),
            y_shears: Candidates::One(0.0),
            origins: Candidates::One((0.0, 0.0)),
            scales: Candidates::One(250.0),
        }
    }
}

impl GridInstructions {
    /// Candidate counts per axis, in enumeration order.
    fn radices(&self) -> [usize; 7] {
        [
            self.row_steps.len(),
            self.col_steps.len(),
            self.angles.len(),
            self.x_shears.len(),
            self.y_shears.len(),
            self.origins.len(),
            self.scales.len(),
        ]
    }

    /// Check the fixed parameters. Per-combination values are checked when
    /// each grid is built.
    pub fn validate(&self) -> Result<()> {
        if self.n_rows == 0 || self.n_cols == 0 {
            return Err(LayoutError::invalid(format!(
                "grid dimensions must be positive, got {}x{}",
                self.n_rows, self.n_cols
            )));
        }
        if self.row_offset && self.col_offset {
            return Err(LayoutError::invalid(
                "row_offset and col_offset cannot both be true",
            ));
        }
        self.radices()
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| LayoutError::invalid("combination count overflows usize"))?;
        Ok(())
    }
}

/// One point of the sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Combination {
    /// Linear index in enumeration order.
    pub index: usize,
    pub row_step: f64,
    pub col_step: f64,
    pub angle: f64,
    pub x_shear: f64,
    pub y_shear: f64,
    pub origin: (f64, f64),
    pub scale: f64,
}

pub struct LayoutGenerator {
    instructions: GridInstructions,
    total: usize,
    target: Option<usize>,
    area: Option<Region>,
    exclusion: Option<Region>,
}

impl LayoutGenerator {
    pub fn new(instructions: GridInstructions) -> Result<Self> {
        instructions.validate()?;
        let total = instructions.radices().iter().product();
        Ok(Self {
            instructions,
            total,
            target: None,
            area: None,
            exclusion: None,
        })
    }

    /// Keep only layouts with exactly `n_points` visible points.
    pub fn with_target(mut self, n_points: usize) -> Self {
        self.target = Some(n_points);
        self
    }

    /// Shared buildable area; repeated calls union.
    pub fn with_area(mut self, area: impl Into<Region>) -> Self {
        let area = area.into();
        self.area = Some(match self.area.take() {
            Some(existing) => existing.union(&area),
            None => area,
        });
        self
    }

    /// Shared exclusion zones; repeated calls union.
    pub fn with_exclusion(mut self, exclusion: impl Into<Region>) -> Self {
        let exclusion = exclusion.into();
        self.exclusion = Some(match self.exclusion.take() {
            Some(existing) => existing.union(&exclusion),
            None => exclusion,
        });
        self
    }

    pub fn instructions(&self) -> &GridInstructions {
        &self.instructions
    }
    pub fn target(&self) -> Option<usize> {
        self.target
    }
    pub fn area(&self) -> Option<&Region> {
        self.area.as_ref()
    }
    pub fn exclusion(&self) -> Option<&Region> {
        self.exclusion.as_ref()
    }

    /// Number of combinations (before target filtering).
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Decode a linear index into its combination; `None` past the end.
    pub fn combination(&self, index: usize) -> Option<Combination> {
        if index >= self.total {
            return None;
        }
        let radices = self.instructions.radices();
        let mut digits = [0usize; 7];
        let mut rest = index;
        for axis in (0..radices.len()).rev() {
            digits[axis] = rest % radices[axis];
            rest /= radices[axis];
        }
        let ins = &self.instructions;
        Some(Combination {
            index,
            row_step: ins.row_steps.as_slice()[digits[0]],
            col_step: ins.col_steps.as_slice()[digits[1]],
            angle: ins.angles.as_slice()[digits[2]],
            x_shear: ins.x_shears.as_slice()[digits[3]],
            y_shear: ins.y_shears.as_slice()[digits[4]],
            origin: ins.origins.as_slice()[digits[5]],
            scale: ins.scales.as_slice()[digits[6]],
        })
    }

    /// Fresh pass over every combination.
    pub fn combinations(&self) -> Combinations<'_> {
        Combinations {
            generator: self,
            next: 0,
        }
    }

    /// Grid spec for a combination, with the run's fixed parameters.
    pub fn grid_for(&self, c: &Combination) -> Result<GridSpec> {
        let ins = &self.instructions;
        GridSpec::builder()
            .rows(ins.n_rows)
            .cols(ins.n_cols)
            .row_offset(ins.row_offset)
            .col_offset(ins.col_offset)
            .row_step(c.row_step)
            .col_step(c.col_step)
            .angle(c.angle)
            .x_shear(c.x_shear)
            .y_shear(c.y_shear)
            .origin(c.origin.0, c.origin.1)
            .scale(c.scale)
            .build()
    }

    /// One grid spec per combination, in enumeration order.
    pub fn grids(&self) -> impl Iterator<Item = Result<GridSpec>> + '_ {
        self.combinations().map(move |c| self.grid_for(&c))
    }

    /// Lazily built layouts, filtered by target when set.
    ///
    /// Each call starts a new run with its own matrix cache.
    pub fn layouts(&self) -> Layouts<'_> {
        tracing::debug!(
            total = self.total,
            target = ?self.target,
            has_area = self.area.is_some(),
            has_exclusion = self.exclusion.is_some(),
            "layout generation started"
        );
        Layouts {
            generator: self,
            combinations: self.combinations(),
            synth: CoordinateSynthesizer::new(),
        }
    }

    /// Every (target-matching) layout, in enumeration order. Stops at the first error.
    pub fn generate_layouts(&self) -> Result<Vec<Layout>> {
        let layouts = self.layouts().collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            total = self.total,
            kept = layouts.len(),
            "layout generation finished"
        );
        Ok(layouts)
    }

    fn build_layout(&self, c: &Combination, synth: &mut CoordinateSynthesizer) -> Result<Layout> {
        let grid = self.grid_for(c)?;
        Layout::from_grid_with(&grid, synth, self.area.as_ref(), self.exclusion.as_ref())
    }
}

/// Iterator over a generator's combinations.
#[derive(Clone)]
pub struct Combinations<'a> {
    generator: &'a LayoutGenerator,
    next: usize,
}

impl Iterator for Combinations<'_> {
    type Item = Combination;

    fn next(&mut self) -> Option<Combination> {
        let c = self.generator.combination(self.next)?;
        self.next += 1;
        Some(c)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.generator.total.saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Combinations<'_> {}

/// Iterator over generated layouts; see `LayoutGenerator::layouts`.
pub struct Layouts<'a> {
    generator: &'a LayoutGenerator,
    combinations: Combinations<'a>,
    synth: CoordinateSynthesizer,
}

impl Layouts<'_> {
    pub fn synthesizer(&self) -> &CoordinateSynthesizer {
        &self.synth
    }
}

impl Iterator for Layouts<'_> {
    type Item = Result<Layout>;

    fn next(&mut self) -> Option<Result<Layout>> {
        for c in self.combinations.by_ref() {
            let layout = match self.generator.build_layout(&c, &mut self.synth) {
                Ok(layout) => layout,
                Err(e) => return Some(Err(e)),
            };
            match self.generator.target {
                Some(n) if layout.n_points() != n => {
                    tracing::debug!(index = c.index, n_points = layout.n_points(), "skipped");
                }
                _ => return Some(Ok(layout)),
            }
        }
        None
    }
}
