//! JSON run configuration shared by `generate` and `filter`.

use anyhow::{Context, Result};
use geo::{LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use windgrid::prelude::*;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub instructions: GridInstructions,
    /// Keep only layouts with exactly this many points.
    pub target: Option<usize>,
    pub areas: Vec<PolygonSpec>,
    pub exclusions: Vec<PolygonSpec>,
    pub bathymetry: Option<BathymetryConfig>,
}

/// Polygon as an exterior ring of `[x, y]` pairs plus optional holes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolygonSpec {
    pub exterior: Vec<[f64; 2]>,
    #[serde(default)]
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl PolygonSpec {
    pub fn to_polygon(&self) -> Result<Polygon<f64>> {
        anyhow::ensure!(
            self.exterior.len() >= 3,
            "polygon exterior needs at least 3 vertices, got {}",
            self.exterior.len()
        );
        let holes = self
            .holes
            .iter()
            .map(|ring| LineString::from(ring.clone()))
            .collect();
        Ok(Polygon::new(LineString::from(self.exterior.clone()), holes))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BathymetryConfig {
    /// ESRI ASCII grid; relative paths resolve against the config file.
    pub path: PathBuf,
    #[serde(default = "default_sign")]
    pub sign: String,
    #[serde(default = "default_band")]
    pub band: usize,
    #[serde(default = "default_limits")]
    pub limits: (f64, f64),
    #[serde(default)]
    pub drop_na: bool,
}

fn default_sign() -> String {
    "-".to_string()
}
fn default_band() -> usize {
    1
}
fn default_limits() -> (f64, f64) {
    (0.0, 60.0)
}

impl BathymetryConfig {
    pub fn params(&self) -> Result<BathymetryParams> {
        let sign: DepthSign = self.sign.parse()?;
        let params = BathymetryParams {
            sign,
            band: self.band,
            limits: self.limits,
            drop_na: self.drop_na,
        };
        params.validate()?;
        Ok(params)
    }
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut cfg: RunConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if let (Some(bathy), Some(dir)) = (cfg.bathymetry.as_mut(), path.parent()) {
            if bathy.path.is_relative() {
                bathy.path = dir.join(&bathy.path);
            }
        }
        Ok(cfg)
    }

    pub fn area(&self) -> Result<Option<Region>> {
        union_of(&self.areas)
    }

    pub fn exclusion(&self) -> Result<Option<Region>> {
        union_of(&self.exclusions)
    }
}

fn union_of(specs: &[PolygonSpec]) -> Result<Option<Region>> {
    if specs.is_empty() {
        return Ok(None);
    }
    let polys = specs
        .iter()
        .map(PolygonSpec::to_polygon)
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(Region::union_of(polys)))
}
