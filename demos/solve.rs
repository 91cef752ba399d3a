//! Solve one query on a map file and print the result.
//!
//! ```text
//! solve maps/arena.map --start 3,4 --target 90,60 --smooth --check
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use hpa_core::Point;
use hpa_grid::{GridMap, PathSmoother};
use hpa_hier::{AbsConfig, build_abstraction, run_query};
use hpa_search::{AStar, SearchEngine};

#[derive(Parser, Debug)]
#[command(about = "Hierarchical point-to-point search on a tile map")]
struct Args {
    /// Map file (type/width/height header, then `.`/`@` rows)
    map: PathBuf,
    /// Start cell as x,y
    #[arg(long)]
    start: String,
    /// Target cell as x,y
    #[arg(long)]
    target: String,
    #[arg(long, default_value_t = 10)]
    cluster_size: i32,
    #[arg(long, default_value_t = 2)]
    max_level: usize,
    /// Apply the ray-splice smoother to the result
    #[arg(long)]
    smooth: bool,
    /// Cross-check the cost against a direct low-level A*
    #[arg(long)]
    check: bool,
}

fn parse_cell(grid: &GridMap, text: &str) -> Result<Point> {
    let Some((x, y)) = text.split_once(',') else {
        bail!("expected x,y but got {text:?}");
    };
    let p = Point::new(x.trim().parse()?, y.trim().parse()?);
    if !grid.bounds().contains(p) {
        bail!("{p} is outside the {}x{} map", grid.cols(), grid.rows());
    }
    if grid.is_obstacle(p) {
        bail!("{p} is an obstacle");
    }
    Ok(p)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let file = File::open(&args.map)
        .with_context(|| format!("cannot open {}", args.map.display()))?;
    let grid = GridMap::from_reader(BufReader::new(file))
        .with_context(|| format!("cannot parse {}", args.map.display()))?;
    let start = grid.node_id(parse_cell(&grid, &args.start)?);
    let target = grid.node_id(parse_cell(&grid, &args.target)?);

    let config = AbsConfig {
        cluster_size: args.cluster_size,
        max_level: args.max_level,
        ..AbsConfig::default()
    };
    let build_started = Instant::now();
    let mut abs = build_abstraction(&grid, &config);
    log::info!("abstraction built in {:.3}s", build_started.elapsed().as_secs_f64());

    let mut engine = AStar::new(false);
    let result = run_query(&mut abs, &grid, &mut engine, start, target);
    let Some(cost) = result.cost else {
        println!("no path");
        return Ok(());
    };

    let mut path = result.path;
    println!("path cost {cost} ({} cells)", path.len());
    if args.smooth {
        let mut smoother = PathSmoother::new(&grid);
        path = smoother.smooth(&path);
        println!("smoothed cost {} ({} cells)", grid.path_cost(&path), path.len());
    }
    if args.check {
        let mut direct = AStar::new(true);
        let outcome = direct.find_path(&grid, start, target);
        match outcome.cost() {
            Some(optimal) => println!(
                "direct A* cost {optimal} (overhead {:.2}%)",
                100.0 * (grid.path_cost(&path) - optimal) as f64 / optimal as f64
            ),
            None => println!("direct A* found no path"),
        }
    }
    print!("{}", grid.render_with_path(&path));
    Ok(())
}
