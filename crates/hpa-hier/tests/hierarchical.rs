//! End-to-end properties of the abstraction and hierarchical search.

use hpa_core::{COST_SQRT2, Environment, Point, UNREACHABLE};
use hpa_grid::{GridMap, PathSmoother, Topology};
use hpa_hier::{AbsConfig, AbsGraph, EntranceStyle, Orientation, build_abstraction, run_query};
use hpa_search::{AStar, IdaStar, SearchEngine, SearchUtils};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn config(cluster_size: i32, max_level: usize) -> AbsConfig {
    AbsConfig {
        cluster_size,
        max_level,
        entrance_style: EntranceStyle::Ends,
        max_entrance_width: 6,
        diagonal_entrances: false,
    }
}

/// Observable state of the permanent abstraction: node count, node
/// levels, per-node edge multisets, per-cluster entrance counts.
type Snapshot = (usize, Vec<usize>, Vec<Vec<(usize, i32, usize, bool)>>, Vec<usize>);

fn snapshot(abs: &AbsGraph) -> Snapshot {
    let graph = abs.graph();
    let levels = (0..graph.node_count())
        .map(|id| graph.info(id).level)
        .collect();
    let edges = (0..graph.node_count())
        .map(|id| {
            let mut list: Vec<_> = graph
                .out_edges(id)
                .iter()
                .map(|e| (e.target, e.info.cost, e.info.level, e.info.inter))
                .collect();
            list.sort_unstable();
            list
        })
        .collect();
    let entrances = abs.clusters().iter().map(|c| c.entrance_count()).collect();
    (graph.node_count(), levels, edges, entrances)
}

// ---------------------------------------------------------------------------
// The 4x4 reference scenario
// ---------------------------------------------------------------------------

#[test]
fn four_by_four_scenario() {
    let grid = GridMap::new(Topology::Octile, 4, 4);
    let mut abs = build_abstraction(&grid, &config(2, 2));

    // Two entrances share the (2,2) center cell; they collapse to one
    // abstract node, so the lower-right cluster has a single entrance.
    assert_eq!(abs.graph().node_count(), 7);
    let shared_cell = grid.node_id(Point::new(2, 2));
    let shared = abs.abs_node_at(shared_cell).expect("node at (2,2)");
    assert_eq!(abs.graph().info(shared).level, 1);
    assert_eq!(abs.clusters()[3].entrance_count(), 1);
    assert_eq!(
        abs.entrances()
            .iter()
            .filter(|e| e.center2_id == shared_cell)
            .count(),
        2
    );

    let start = grid.node_id(Point::new(0, 0));
    let target = grid.node_id(Point::new(3, 3));
    let mut engine = AStar::new(false);
    let result = run_query(&mut abs, &grid, &mut engine, start, target);
    // Through the entrance centers: four straight steps plus the final
    // diagonal into the corner.
    assert_eq!(result.cost, Some(542));
    assert_eq!(result.path.first(), Some(&start));
    assert_eq!(result.path.last(), Some(&target));

    // Smoothing recovers the pure-diagonal optimum, matching direct A*.
    let mut smoother = PathSmoother::new(&grid);
    let smoothed = smoother.smooth(&result.path);
    assert_eq!(grid.path_cost(&smoothed), 3 * COST_SQRT2);
    let mut direct = AStar::new(true);
    let outcome = direct.find_path(&grid, start, target);
    assert_eq!(outcome.cost(), Some(3 * COST_SQRT2));
}

#[test]
fn engines_are_interchangeable() {
    let grid = GridMap::new(Topology::Octile, 4, 4);
    let mut abs = build_abstraction(&grid, &config(2, 2));
    let start = grid.node_id(Point::new(0, 0));
    let target = grid.node_id(Point::new(3, 3));
    let mut astar = AStar::new(false);
    let with_astar = run_query(&mut abs, &grid, &mut astar, start, target);
    let mut ida = IdaStar::new();
    let with_ida = run_query(&mut abs, &grid, &mut ida, start, target);
    assert_eq!(with_astar.cost, with_ida.cost);
}

// ---------------------------------------------------------------------------
// Walls, gaps, and the unreachable sentinel
// ---------------------------------------------------------------------------

#[test]
fn wall_with_single_gap_yields_one_entrance() {
    // A wall along the cluster boundary column, crossable at y=2 only.
    let mut grid = GridMap::new(Topology::Octile, 4, 8);
    for y in [0, 1, 3] {
        grid.set_obstacle(Point::new(4, y), true);
    }
    let abs = build_abstraction(&grid, &config(4, 1));
    assert_eq!(abs.entrances().len(), 1);
    let entrance = &abs.entrances()[0];
    assert_eq!(entrance.orientation, Orientation::Vertical);
    assert_eq!(entrance.center1, Point::new(3, 2));
    assert_eq!(entrance.length, 1);
}

#[test]
fn split_cluster_uses_the_sentinel() {
    // Boundary wall with gaps at y=0 and y=3; the right cluster is also
    // split internally along row 1, so its two entrances cannot reach
    // each other without leaving the cluster.
    let mut grid = GridMap::new(Topology::Octile, 4, 8);
    for y in [1, 2] {
        grid.set_obstacle(Point::new(4, y), true);
    }
    for x in [5, 6, 7] {
        grid.set_obstacle(Point::new(x, 1), true);
    }
    let mut abs = build_abstraction(&grid, &config(4, 1));
    assert_eq!(abs.entrances().len(), 2);

    let right = &abs.clusters()[1];
    assert_eq!(right.entrance_count(), 2);
    assert!(!right.are_connected(0, 1));
    assert_eq!(right.distance(0, 1), UNREACHABLE);
    assert_eq!(right.distance(1, 0), UNREACHABLE);
    let left = &abs.clusters()[0];
    assert!(left.are_connected(0, 1));
    assert_eq!(left.distance(0, 1), left.distance(1, 0));

    // Crossing from the top-right pocket to the bottom-right one must
    // route back through the left cluster; the result matches direct
    // search.
    let start = grid.node_id(Point::new(7, 0));
    let target = grid.node_id(Point::new(7, 3));
    let mut engine = AStar::new(false);
    let result = run_query(&mut abs, &grid, &mut engine, start, target);
    let mut direct = AStar::new(true);
    let outcome = direct.find_path(&grid, start, target);
    assert!(result.cost.is_some());
    assert!(result.cost.unwrap() >= outcome.cost().unwrap());
}

#[test]
fn disconnected_query_reports_no_path() {
    let mut grid = GridMap::new(Topology::Octile, 8, 8);
    for y in 0..8 {
        grid.set_obstacle(Point::new(4, y), true);
    }
    let mut abs = build_abstraction(&grid, &config(4, 1));
    let before = snapshot(&abs);
    let mut engine = AStar::new(false);
    let result = run_query(
        &mut abs,
        &grid,
        &mut engine,
        grid.node_id(Point::new(0, 0)),
        grid.node_id(Point::new(7, 7)),
    );
    assert_eq!(result.cost, None);
    assert!(result.path.is_empty());
    assert_eq!(snapshot(&abs), before);
}

// ---------------------------------------------------------------------------
// Transient insertion and removal
// ---------------------------------------------------------------------------

#[test]
fn queries_leave_the_abstraction_untouched() {
    let mut grid = GridMap::new(Topology::Octile, 16, 16);
    let mut rng = StdRng::seed_from_u64(99);
    grid.scatter_obstacles(0.2, true, &mut rng);
    let mut abs = build_abstraction(&grid, &config(4, 2));
    let before = snapshot(&abs);
    let mut engine = AStar::new(false);
    let mut utils = SearchUtils::new();

    // Synthesized branch: random free cells rarely coincide with
    // entrance centers.
    for _ in 0..5 {
        let (start, target) = utils.random_connected_pair(&grid, &mut rng);
        run_query(&mut abs, &grid, &mut engine, start, target);
        assert_eq!(snapshot(&abs), before);
    }

    // Reused branch: query directly between two entrance centers.
    let a = abs.graph().info(0).center_id;
    let b = abs.graph().info(abs.graph().node_count() - 1).center_id;
    let result = run_query(&mut abs, &grid, &mut engine, a, b);
    assert_eq!(snapshot(&abs), before);
    if let Some(cost) = result.cost {
        assert!(cost >= grid.heuristic(a, b));
    }
}

// ---------------------------------------------------------------------------
// Entrance deduplication with level maximization
// ---------------------------------------------------------------------------

#[test]
fn shared_center_keeps_the_maximum_level() {
    // Obstacles trim two boundary runs so that a level-1 vertical
    // entrance and a level-2 horizontal entrance share the crossing
    // cell (1,3).
    let mut grid = GridMap::new(Topology::Octile, 8, 8);
    grid.set_obstacle(Point::new(0, 4), true);
    grid.set_obstacle(Point::new(2, 2), true);
    let abs = build_abstraction(&grid, &config(2, 2));

    let shared_cell = grid.node_id(Point::new(1, 3));
    let contributing: Vec<_> = abs
        .entrances()
        .iter()
        .filter(|e| e.center1_id == shared_cell || e.center2_id == shared_cell)
        .collect();
    assert_eq!(contributing.len(), 2);
    assert!(contributing.iter().any(|e| e.orientation == Orientation::Vertical));
    assert!(contributing.iter().any(|e| e.orientation == Orientation::Horizontal));

    let node = abs.abs_node_at(shared_cell).expect("shared node");
    assert_eq!(abs.graph().info(node).level, 2);
    // Its horizontal partner is also a level-2 boundary node; the
    // vertical partner stays at level 1.
    let below = abs.abs_node_at(grid.node_id(Point::new(1, 4))).unwrap();
    assert_eq!(abs.graph().info(below).level, 2);
    let beside = abs.abs_node_at(grid.node_id(Point::new(2, 3))).unwrap();
    assert_eq!(abs.graph().info(beside).level, 1);
}

// ---------------------------------------------------------------------------
// Hierarchical cost against direct search
// ---------------------------------------------------------------------------

#[test]
fn hierarchical_costs_bound_direct_costs() {
    let mut grid = GridMap::new(Topology::Octile, 20, 20);
    let mut rng = StdRng::seed_from_u64(7);
    grid.scatter_obstacles(0.1, true, &mut rng);
    let mut abs = build_abstraction(&grid, &config(5, 2));
    let mut engine = AStar::new(false);
    let mut direct = AStar::new(true);
    let mut smoother = PathSmoother::new(&grid);
    let mut utils = SearchUtils::new();

    for _ in 0..12 {
        let (start, target) = utils.random_connected_pair(&grid, &mut rng);
        let result = run_query(&mut abs, &grid, &mut engine, start, target);
        let optimal = direct
            .find_path(&grid, start, target)
            .cost()
            .expect("pair is connected");
        let hier = result.cost.expect("hierarchical route exists");
        assert!(hier >= optimal, "hierarchical {hier} below optimal {optimal}");

        let smoothed = smoother.smooth(&result.path);
        let smoothed_cost = grid.path_cost(&smoothed);
        assert!(smoothed_cost <= hier);
        assert!(smoothed_cost >= optimal);
        // Smoothing is idempotent.
        assert_eq!(smoother.smooth(&smoothed), smoothed);
    }
}

#[test]
fn cluster_matrices_are_symmetric_with_sentinel_for_unreachable() {
    let mut grid = GridMap::new(Topology::Octile, 24, 24);
    let mut rng = StdRng::seed_from_u64(21);
    grid.scatter_obstacles(0.3, false, &mut rng);
    let abs = build_abstraction(&grid, &config(6, 2));
    for cluster in abs.clusters() {
        let n = cluster.entrance_count();
        for i in 0..n {
            assert_eq!(cluster.distance(i, i), 0);
            for j in 0..n {
                assert_eq!(cluster.distance(i, j), cluster.distance(j, i));
                assert_eq!(
                    cluster.are_connected(i, j),
                    cluster.distance(i, j) != UNREACHABLE
                );
            }
        }
    }
}
