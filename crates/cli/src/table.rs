//! Point tables via Polars: read `x`/`y` columns, write `layout`/`x`/`y` rows.
//!
//! Format is picked by extension: `.parquet` or CSV for anything else.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use windgrid::layout::Layout;
use windgrid::Vec2;

fn is_parquet(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("parquet"))
}

/// Read the `x` and `y` columns of a point table. Nulls are rejected.
pub fn read_points(path: &Path) -> Result<Vec<Vec2<f64>>> {
    let lf = if is_parquet(path) {
        LazyFrame::scan_parquet(path, ScanArgsParquet::default())?
    } else {
        LazyCsvReader::new(path)
            .with_infer_schema_length(Some(100))
            .finish()?
    };
    let df = lf
        .select([
            col("x").cast(DataType::Float64),
            col("y").cast(DataType::Float64),
        ])
        .collect()
        .with_context(|| format!("reading x/y columns from {}", path.display()))?;
    let xs = df.column("x")?.f64()?;
    let ys = df.column("y")?.f64()?;
    xs.into_iter()
        .zip(ys)
        .enumerate()
        .map(|(row, pair)| match pair {
            (Some(x), Some(y)) => Ok(Vec2::new(x, y)),
            _ => anyhow::bail!("row {row}: missing x or y in {}", path.display()),
        })
        .collect()
}

/// One row per visible point, tagged with the index of its layout.
pub fn layouts_frame<'a, I>(layouts: I) -> Result<DataFrame>
where
    I: IntoIterator<Item = (u32, &'a Layout)>,
{
    let mut ids = Vec::new();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (id, layout) in layouts {
        for p in layout.coordinates() {
            ids.push(id);
            xs.push(p.x);
            ys.push(p.y);
        }
    }
    Ok(df!("layout" => ids, "x" => xs, "y" => ys)?)
}

pub fn write_frame(path: &Path, df: &mut DataFrame) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    if is_parquet(path) {
        ParquetWriter::new(file).finish(df)?;
    } else {
        CsvWriter::new(file).include_header(true).finish(df)?;
    }
    Ok(())
}
