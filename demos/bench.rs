//! Randomized benchmark: many queries against one abstraction.
//!
//! Either loads a map file or generates a random one, then runs N
//! random connected queries, comparing the hierarchical results with a
//! direct low-level search and printing aggregated statistics.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use hpa_core::StatsCollection;
use hpa_grid::{GridMap, PathSmoother, Topology};
use hpa_hier::{AbsConfig, build_abstraction, run_query};
use hpa_search::{AStar, IdaStar, SearchEngine, SearchUtils};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EngineKind {
    Astar,
    Idastar,
}

#[derive(Parser, Debug)]
#[command(about = "Benchmark hierarchical search on random queries")]
struct Args {
    /// Map file; omit to generate a random map
    #[arg(long)]
    map: Option<PathBuf>,
    #[arg(long, default_value_t = 128)]
    rows: i32,
    #[arg(long, default_value_t = 128)]
    cols: i32,
    /// Obstacle percentage for generated maps (0.0-1.0)
    #[arg(long, default_value_t = 0.2)]
    obstacles: f32,
    #[arg(long, default_value_t = 100)]
    runs: usize,
    #[arg(long, default_value_t = 10)]
    cluster_size: i32,
    #[arg(long, default_value_t = 2)]
    max_level: usize,
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Engine used for the direct low-level comparison
    #[arg(long, value_enum, default_value = "astar")]
    engine: EngineKind,
    /// Node-visit limit for the direct comparison search
    #[arg(long)]
    node_limit: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let grid = match &args.map {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
            GridMap::from_reader(BufReader::new(file))
                .with_context(|| format!("cannot parse {}", path.display()))?
        }
        None => {
            let mut grid = GridMap::new(Topology::Octile, args.rows, args.cols);
            let placed = grid.scatter_obstacles(args.obstacles, true, &mut rng);
            log::info!("generated {}x{} map with {placed} obstacles", args.rows, args.cols);
            grid
        }
    };
    log::info!("grid storage:\n{}", grid.storage_stats());

    let config = AbsConfig {
        cluster_size: args.cluster_size,
        max_level: args.max_level,
        ..AbsConfig::default()
    };
    let build_started = Instant::now();
    let mut abs = build_abstraction(&grid, &config);
    println!(
        "abstraction: {} nodes, built in {:.3}s",
        abs.graph().node_count(),
        build_started.elapsed().as_secs_f64()
    );

    let mut direct: Box<dyn SearchEngine> = match args.engine {
        EngineKind::Astar => Box::new(AStar::new(true)),
        EngineKind::Idastar => Box::new(IdaStar::new()),
    };
    direct.set_node_limit(args.node_limit);

    let mut engine = AStar::new(false);
    let mut smoother = PathSmoother::new(&grid);
    let mut utils = SearchUtils::new();
    let mut summary = StatsCollection::with_names(&[
        "direct_cost",
        "hier_cost",
        "hier_time",
        "overhead_pct",
        "smooth_cost",
    ]);
    let mut aborted = 0usize;

    for run in 0..args.runs {
        let (start, target) = utils.random_connected_pair(&grid, &mut rng);
        let query_started = Instant::now();
        let result = run_query(&mut abs, &grid, &mut engine, start, target);
        summary
            .get_mut("hier_time")
            .add(query_started.elapsed().as_secs_f64());
        let Some(cost) = result.cost else {
            log::warn!("run {run}: no hierarchical route for a connected pair");
            continue;
        };
        summary.get_mut("hier_cost").add(cost as f64);

        let smoothed = smoother.smooth(&result.path);
        let smooth_cost = grid.path_cost(&smoothed);
        summary.get_mut("smooth_cost").add(smooth_cost as f64);

        match direct.find_path(&grid, start, target).cost() {
            Some(optimal) => {
                summary.get_mut("direct_cost").add(optimal as f64);
                summary
                    .get_mut("overhead_pct")
                    .add(100.0 * (smooth_cost - optimal) as f64 / optimal as f64);
            }
            None => aborted += 1,
        }
    }

    println!("{summary}");
    if aborted > 0 {
        println!("{aborted} direct searches hit the node limit");
    }
    for level in 0..=args.max_level {
        println!("-- level {level} storage --\n{}", abs.storage_stats(level));
    }
    println!("-- smoothing --\n{}", smoother.stats());
    Ok(())
}
