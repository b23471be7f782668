use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;
use windgrid::prelude::*;

mod config;
mod provenance;
mod table;

use config::RunConfig;
use provenance::Sidecar;

#[derive(Parser)]
#[command(name = "windgrid")]
#[command(about = "Gridded turbine layouts: export, sweep and constrain")]
struct Cmd {
    /// Also show the library's debug events
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Write the coordinates of a single grid
    Grid {
        #[command(flatten)]
        grid: GridArgs,
        #[arg(long)]
        out: PathBuf,
    },
    /// Sweep grid parameters from a JSON config and write every kept layout
    Generate {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Constrain an x/y point table with the areas, exclusions and bathymetry of a config
    Filter {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print a small provenance JSON block
    Report,
}

#[derive(Args, Debug, Serialize)]
struct GridArgs {
    #[arg(long, default_value_t = 10)]
    rows: usize,
    #[arg(long, default_value_t = 10)]
    cols: usize,
    #[arg(long, default_value_t = 6.0)]
    row_step: f64,
    #[arg(long, default_value_t = 6.0)]
    col_step: f64,
    #[arg(long)]
    row_offset: bool,
    #[arg(long)]
    col_offset: bool,
    /// Clockwise, degrees
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    angle: f64,
    #[arg(long, allow_hyphen_values = true)]
    x_shear: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    y_shear: Option<f64>,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    origin_x: f64,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    origin_y: f64,
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
}

impl GridArgs {
    fn spec(&self) -> Result<GridSpec> {
        Ok(GridSpec::builder()
            .rows(self.rows)
            .cols(self.cols)
            .row_step(self.row_step)
            .col_step(self.col_step)
            .row_offset(self.row_offset)
            .col_offset(self.col_offset)
            .angle(self.angle)
            .x_shear(self.x_shear)
            .y_shear(self.y_shear)
            .origin(self.origin_x, self.origin_y)
            .scale(self.scale)
            .build()?)
    }
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    let level = if cmd.verbose { Level::DEBUG } else { Level::INFO };
    SubscriberBuilder::default()
        .with_target(false)
        .with_max_level(level)
        .init();
    match cmd.action {
        Action::Grid { grid, out } => export_grid(&grid, &out),
        Action::Generate { config, out } => generate(&config, &out),
        Action::Filter { input, config, out } => filter(&input, &config, &out),
        Action::Report => report(),
    }
}

fn export_grid(args: &GridArgs, out: &Path) -> Result<()> {
    let spec = args.spec().context("invalid grid parameters")?;
    let layout = Layout::from_grid(&spec)?;
    tracing::info!(
        rows = spec.n_rows(),
        cols = spec.n_cols(),
        n_points = layout.n_points(),
        out = %out.display(),
        "grid"
    );
    let mut df = table::layouts_frame([(0, &layout)])?;
    table::write_frame(out, &mut df)?;
    Sidecar::new(serde_json::to_value(args)?).write(out)?;
    Ok(())
}

fn generate(config: &Path, out: &Path) -> Result<()> {
    let cfg = RunConfig::load(config)?;
    let mut gen =
        LayoutGenerator::new(cfg.instructions.clone()).context("invalid grid instructions")?;
    if let Some(area) = cfg.area()? {
        gen = gen.with_area(area);
    }
    if let Some(exclusion) = cfg.exclusion()? {
        gen = gen.with_exclusion(exclusion);
    }
    let bathymetry = match &cfg.bathymetry {
        Some(b) => {
            let raster = GridRaster::from_ascii_grid(&b.path)
                .with_context(|| format!("loading bathymetry {}", b.path.display()))?;
            let raster: Arc<dyn RasterSource> = Arc::new(raster);
            Some((raster, b.params()?))
        }
        None => None,
    };
    // bathymetry changes point counts, so the target is checked after it
    if let (Some(n), None) = (cfg.target, &bathymetry) {
        gen = gen.with_target(n);
    }
    tracing::info!(
        config = %config.display(),
        combinations = gen.total(),
        target = ?cfg.target,
        bathymetry = bathymetry.is_some(),
        "generate"
    );

    let mut kept: Vec<Layout> = Vec::new();
    for layout in gen.layouts() {
        let mut layout = layout?;
        if let Some((raster, params)) = &bathymetry {
            layout.apply_bathymetry(Arc::clone(raster), *params)?;
            if cfg.target.is_some_and(|n| layout.n_points() != n) {
                continue;
            }
        }
        kept.push(layout);
    }
    tracing::info!(kept = kept.len(), "generate done");

    let rows = kept
        .iter()
        .enumerate()
        .map(|(i, layout)| Ok((u32::try_from(i)?, layout)))
        .collect::<Result<Vec<_>>>()?;
    let mut df = table::layouts_frame(rows)?;
    table::write_frame(out, &mut df)?;

    let summary: Vec<_> = kept
        .iter()
        .enumerate()
        .filter_map(|(i, layout)| layout.grid().map(|g| (i, g, layout.n_points())))
        .map(|(i, g, n_points)| {
            json!({
                "layout": i,
                "row_step": g.row_step(),
                "col_step": g.col_step(),
                "angle": g.angle(),
                "x_shear": g.x_shear(),
                "y_shear": g.y_shear(),
                "origin": [g.origin().x, g.origin().y],
                "scale": g.scale(),
                "n_points": n_points,
            })
        })
        .collect();
    let params = json!({
        "instructions": cfg.instructions,
        "target": cfg.target,
        "combinations": gen.total(),
        "layouts": summary,
    });
    let mut sidecar = Sidecar::new(params).with_input(config);
    if let Some(b) = &cfg.bathymetry {
        sidecar = sidecar.with_input(&b.path);
    }
    sidecar.write(out)?;
    Ok(())
}

fn filter(input: &Path, config: &Path, out: &Path) -> Result<()> {
    let cfg = RunConfig::load(config)?;
    let points = table::read_points(input)?;
    let mut layout = Layout::from_points(points);
    if let Some(area) = cfg.area()? {
        layout.clip_to_area(area, ConstraintMode::Append)?;
    }
    if let Some(exclusion) = cfg.exclusion()? {
        layout.avoid_exclusions(exclusion, ConstraintMode::Append)?;
    }
    if let Some(b) = &cfg.bathymetry {
        layout
            .load_bathymetry(&b.path, b.params()?)
            .with_context(|| format!("applying bathymetry {}", b.path.display()))?;
    }
    tracing::info!(
        input = %input.display(),
        raw = layout.raw_coordinates().len(),
        kept = layout.n_points(),
        "filter"
    );
    let mut df = table::layouts_frame([(0, &layout)])?;
    table::write_frame(out, &mut df)?;
    let params = json!({
        "raw": layout.raw_coordinates().len(),
        "kept": layout.n_points(),
        "area": layout.has_area(),
        "exclusion": layout.has_exclusion(),
        "bathymetry": layout.has_bathymetry(),
    });
    let mut sidecar = Sidecar::new(params).with_input(input).with_input(config);
    if let Some(b) = &cfg.bathymetry {
        sidecar = sidecar.with_input(&b.path);
    }
    sidecar.write(out)?;
    Ok(())
}

fn report() -> Result<()> {
    let doc = Sidecar::new(json!({})).document(&[]);
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
