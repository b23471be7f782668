//! Sweep row/column spacing over a lease area and print the layouts that hit a
//! turbine count.
//!
//! Usage:
//!   cargo run -p windgrid --example generate_layouts -- [target]
//!
//! Without a target, every combination is printed with its point count.

use geo::{polygon, LineString, Polygon};
use windgrid::prelude::*;

fn main() -> Result<()> {
    let target = std::env::args().nth(1).and_then(|s| s.parse::<usize>().ok());

    // 12 × 9 km lease with a cable corridor cut out along the middle.
    let lease = Polygon::new(
        LineString::from(vec![
            (-6_000.0, -4_500.0),
            (6_000.0, -4_500.0),
            (6_000.0, 4_500.0),
            (-6_000.0, 4_500.0),
        ]),
        vec![],
    );
    let corridor = polygon![
        (x: -6_500.0, y: -200.0),
        (x: 6_500.0, y: -200.0),
        (x: 6_500.0, y: 200.0),
        (x: -6_500.0, y: 200.0)
    ];

    let instructions = GridInstructions {
        n_rows: 8,
        n_cols: 10,
        row_steps: vec![5.0, 6.0, 7.0].into(),
        col_steps: vec![5.0, 6.0, 7.0].into(),
        angles: vec![0.0, 30.0].into(),
        scales: Candidates::One(200.0),
        ..GridInstructions::default()
    };
    let mut gen = LayoutGenerator::new(instructions)?
        .with_area(lease)
        .with_exclusion(corridor);
    if let Some(n) = target {
        gen = gen.with_target(n);
    }

    println!("{} combinations", gen.total());
    for layout in gen.layouts() {
        let layout = layout?;
        if let Some(g) = layout.grid() {
            println!(
                "row_step={:<4} col_step={:<4} angle={:<4} -> {} points",
                g.row_step(),
                g.col_step(),
                g.angle(),
                layout.n_points()
            );
        }
    }
    Ok(())
}
