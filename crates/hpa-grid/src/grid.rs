//! The tiling search environment.

use hpa_core::{COST_ONE, COST_SQRT2, Environment, Graph, Point, Range, StatsCollection, Successor};
use rand::{Rng, RngExt};

/// Movement model of a [`GridMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Topology {
    /// 4-way movement, unit cost.
    Tile,
    /// 8-way movement, diagonals cost √2.
    Octile,
    /// 8-way movement, diagonals cost the same as straight steps.
    OctileUnicost,
    /// 6-way hex movement (columns offset), unit cost.
    Hex,
}

impl Topology {
    /// Maximum out-degree of a node under this movement model.
    pub fn max_edges(self) -> usize {
        match self {
            Topology::Tile => 4,
            Topology::Octile | Topology::OctileUnicost => 8,
            Topology::Hex => 6,
        }
    }

    /// Whether this model has diagonal moves.
    pub fn has_diagonals(self) -> bool {
        matches!(self, Topology::Octile | Topology::OctileUnicost)
    }
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    pos: Point,
    obstacle: bool,
}

/// A rectangular grid of free/blocked cells with a full adjacency graph.
///
/// Node ids are dense and row-major: `id = y * width + x`. The adjacency
/// graph is built eagerly at construction; obstacles only filter
/// successor generation, so toggling a cell never rewires edges.
#[derive(Debug, Clone)]
pub struct GridMap {
    topology: Topology,
    rows: i32,
    cols: i32,
    graph: Graph<Cell, i32>,
}

impl GridMap {
    /// Create an obstacle-free grid.
    pub fn new(topology: Topology, rows: i32, cols: i32) -> Self {
        assert!(rows > 0 && cols > 0, "grid dimensions must be positive");
        let mut grid = Self {
            topology,
            rows,
            cols,
            graph: Graph::new(),
        };
        grid.create_nodes();
        grid.create_edges();
        grid
    }

    /// Create a sub-grid covering `rng`, copying this grid's obstacle
    /// flags into a freshly built local graph. Node ids in the sub-grid
    /// are local (row-major within `rng`).
    pub fn window(&self, rng: Range) -> GridMap {
        assert!(
            !rng.is_empty() && rng.intersect(self.bounds()) == rng,
            "window {rng} outside grid bounds"
        );
        let mut local = GridMap::new(self.topology, rng.height(), rng.width());
        for p in rng.iter() {
            if self.is_obstacle(p) {
                local.set_obstacle(p - rng.min, true);
            }
        }
        local
    }

    fn create_nodes(&mut self) {
        for y in 0..self.rows {
            for x in 0..self.cols {
                self.graph.push_node(Cell {
                    pos: Point::new(x, y),
                    obstacle: false,
                });
            }
        }
    }

    fn create_edges(&mut self) {
        let diag_cost = match self.topology {
            Topology::Octile => COST_SQRT2,
            _ => COST_ONE,
        };
        for y in 0..self.rows {
            for x in 0..self.cols {
                let id = self.node_id(Point::new(x, y));
                self.add_out_edge(id, x, y - 1, COST_ONE);
                self.add_out_edge(id, x, y + 1, COST_ONE);
                self.add_out_edge(id, x - 1, y, COST_ONE);
                self.add_out_edge(id, x + 1, y, COST_ONE);
                match self.topology {
                    Topology::Octile | Topology::OctileUnicost => {
                        self.add_out_edge(id, x + 1, y + 1, diag_cost);
                        self.add_out_edge(id, x - 1, y + 1, diag_cost);
                        self.add_out_edge(id, x + 1, y - 1, diag_cost);
                        self.add_out_edge(id, x - 1, y - 1, diag_cost);
                    }
                    Topology::Hex => {
                        // Offset columns: even columns connect upward,
                        // odd columns downward.
                        if x % 2 == 0 {
                            self.add_out_edge(id, x + 1, y - 1, COST_ONE);
                            self.add_out_edge(id, x - 1, y - 1, COST_ONE);
                        } else {
                            self.add_out_edge(id, x + 1, y + 1, COST_ONE);
                            self.add_out_edge(id, x - 1, y + 1, COST_ONE);
                        }
                    }
                    Topology::Tile => {}
                }
            }
        }
    }

    fn add_out_edge(&mut self, from: usize, x: i32, y: i32, cost: i32) {
        if x < 0 || x >= self.cols || y < 0 || y >= self.rows {
            return;
        }
        let to = self.node_id(Point::new(x, y));
        self.graph.add_edge(from, to, cost);
    }

    // -----------------------------------------------------------------------
    // Geometry and cell access
    // -----------------------------------------------------------------------

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    pub fn rows(&self) -> i32 {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> i32 {
        self.cols
    }

    /// Bounding range `[0,0)..[cols,rows)`.
    #[inline]
    pub fn bounds(&self) -> Range {
        Range::new(0, 0, self.cols, self.rows)
    }

    /// Row-major node id of a point.
    #[inline]
    pub fn node_id(&self, p: Point) -> usize {
        assert!(self.bounds().contains(p), "point {p} outside grid");
        (p.y * self.cols + p.x) as usize
    }

    /// Point of a node id.
    #[inline]
    pub fn point(&self, id: usize) -> Point {
        self.graph.info(id).pos
    }

    pub fn is_obstacle(&self, p: Point) -> bool {
        self.graph.info(self.node_id(p)).obstacle
    }

    pub fn is_obstacle_id(&self, id: usize) -> bool {
        self.graph.info(id).obstacle
    }

    pub fn set_obstacle(&mut self, p: Point, obstacle: bool) {
        let id = self.node_id(p);
        self.graph.info_mut(id).obstacle = obstacle;
    }

    /// Unblock every cell.
    pub fn clear_obstacles(&mut self) {
        for id in 0..self.graph.node_count() {
            self.graph.info_mut(id).obstacle = false;
        }
    }

    // -----------------------------------------------------------------------
    // Movement rules
    // -----------------------------------------------------------------------

    /// Whether two node ids share a row or a column.
    pub fn are_aligned(&self, a: usize, b: usize) -> bool {
        let w = self.cols as usize;
        a % w == b % w || a / w == b / w
    }

    /// The no-corner-cutting rule: a diagonal step between `a` and `b`
    /// is legal unless both flanking orthogonal cells are blocked.
    /// Non-diagonal steps are always legal.
    pub fn can_jump(&self, a: usize, b: usize) -> bool {
        if !self.topology.has_diagonals() || self.are_aligned(a, b) {
            return true;
        }
        let w = self.cols as usize;
        let corner1 = (a / w) * w + b % w;
        let corner2 = (b / w) * w + a % w;
        !(self.is_obstacle_id(corner1) && self.is_obstacle_id(corner2))
    }

    /// Prune successors that only step back toward the previous node:
    /// the previous node itself and (except on 4-way tiles) anything
    /// adjacent to it.
    fn prune_node(&self, target: usize, last: usize) -> bool {
        if target == last {
            return true;
        }
        if self.topology == Topology::Tile {
            return false;
        }
        self.graph.out_edges(last).iter().any(|e| e.target == target)
    }

    // -----------------------------------------------------------------------
    // Costs
    // -----------------------------------------------------------------------

    /// Total fixed-point cost of a node-id path.
    pub fn path_cost(&self, path: &[usize]) -> i32 {
        if path.len() < 2 {
            return 0;
        }
        match self.topology {
            Topology::Tile | Topology::OctileUnicost | Topology::Hex => {
                COST_ONE * (path.len() as i32 - 1)
            }
            Topology::Octile => path
                .windows(2)
                .map(|w| {
                    if self.are_aligned(w[0], w[1]) {
                        COST_ONE
                    } else {
                        COST_SQRT2
                    }
                })
                .sum(),
        }
    }

    // -----------------------------------------------------------------------
    // Random obstacles
    // -----------------------------------------------------------------------

    /// Block a random `percentage` (0.0–1.0) of the cells.
    ///
    /// With `avoid_diag` set, placements that would create an obstacle
    /// diagonally opposite another obstacle with both shared orthogonal
    /// neighbors free are rejected; such "squeezed diagonal"
    /// configurations make topologically different grids behave alike.
    pub fn scatter_obstacles(
        &mut self,
        percentage: f32,
        avoid_diag: bool,
        rng: &mut impl Rng,
    ) -> usize {
        assert!((0.0..1.0).contains(&percentage), "percentage out of range");
        self.clear_obstacles();
        let total = self.graph.node_count();
        let wanted = (percentage * total as f32) as usize;
        let mut placed = 0;
        while placed < wanted {
            let id = rng.random_range(0..total);
            if self.is_obstacle_id(id) {
                continue;
            }
            let p = self.point(id);
            if avoid_diag
                && (self.conflict_diag(p, -1, -1)
                    || self.conflict_diag(p, -1, 1)
                    || self.conflict_diag(p, 1, -1)
                    || self.conflict_diag(p, 1, 1))
            {
                continue;
            }
            self.graph.info_mut(id).obstacle = true;
            placed += 1;
        }
        placed
    }

    fn conflict_diag(&self, p: Point, dy: i32, dx: i32) -> bool {
        let diag = p.shift(dx, dy);
        if !self.bounds().contains(diag) {
            return false;
        }
        self.is_obstacle(diag)
            && !self.is_obstacle(Point::new(diag.x, p.y))
            && !self.is_obstacle(Point::new(p.x, diag.y))
    }

    // -----------------------------------------------------------------------
    // Storage telemetry
    // -----------------------------------------------------------------------

    /// Count free cells and traversable directed edges.
    pub fn storage_stats(&self) -> StatsCollection {
        let mut stats = StatsCollection::with_names(&["nodes", "edges"]);
        for id in 0..self.graph.node_count() {
            if self.is_obstacle_id(id) {
                continue;
            }
            stats.get_mut("nodes").add(1.0);
            for e in self.graph.out_edges(id) {
                if !self.is_obstacle_id(e.target) {
                    stats.get_mut("edges").add(1.0);
                }
            }
        }
        stats
    }
}

impl Environment for GridMap {
    fn heuristic(&self, start: usize, target: usize) -> i32 {
        let w = self.cols;
        let (sx, sy) = ((start as i32) % w, (start as i32) / w);
        let (tx, ty) = ((target as i32) % w, (target as i32) / w);
        let diff_col = (tx - sx).abs();
        let diff_row = (ty - sy).abs();
        match self.topology {
            Topology::Tile => (diff_col + diff_row) * COST_ONE,
            Topology::OctileUnicost => diff_col.max(diff_row) * COST_ONE,
            Topology::Octile => {
                let diag = diff_col.min(diff_row);
                let straight = diff_col.max(diff_row) - diag;
                diag * COST_SQRT2 + straight * COST_ONE
            }
            Topology::Hex => {
                // Vancouver distance (P. Yap, Grid-based Path-Finding,
                // LNAI 2338), with the off-by-one in the published
                // formula corrected.
                let mut correction = 0;
                if diff_col % 2 != 0 {
                    if ty < sy {
                        correction = tx % 2;
                    } else if ty > sy {
                        correction = sx % 2;
                    }
                }
                let dist = (diff_row - diff_col / 2 - correction).max(0) + diff_col;
                dist * COST_ONE
            }
        }
    }

    fn max_cost(&self) -> i32 {
        match self.topology {
            Topology::Octile => COST_SQRT2,
            _ => COST_ONE,
        }
    }

    fn min_cost(&self) -> i32 {
        COST_ONE
    }

    fn num_nodes(&self) -> usize {
        (self.rows * self.cols) as usize
    }

    fn successors(&self, node: usize, last: Option<usize>, out: &mut Vec<Successor>) {
        out.clear();
        out.reserve(self.topology.max_edges());
        if self.is_obstacle_id(node) {
            return;
        }
        for e in self.graph.out_edges(node) {
            if !self.can_jump(e.target, node) {
                continue;
            }
            if self.is_obstacle_id(e.target) {
                continue;
            }
            if let Some(last) = last {
                if self.prune_node(e.target, last) {
                    continue;
                }
            }
            out.push(Successor::new(e.target, e.info));
        }
    }

    fn is_valid_node_id(&self, node: usize) -> bool {
        node < self.num_nodes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn node_ids_are_row_major() {
        let g = GridMap::new(Topology::Octile, 4, 5);
        assert_eq!(g.node_id(Point::new(0, 0)), 0);
        assert_eq!(g.node_id(Point::new(4, 0)), 4);
        assert_eq!(g.node_id(Point::new(0, 1)), 5);
        assert_eq!(g.point(7), Point::new(2, 1));
    }

    #[test]
    fn octile_heuristic() {
        let g = GridMap::new(Topology::Octile, 8, 8);
        let a = g.node_id(Point::new(0, 0));
        let b = g.node_id(Point::new(3, 1));
        // one diagonal + two straight
        assert_eq!(g.heuristic(a, b), COST_SQRT2 + 2 * COST_ONE);
    }

    #[test]
    fn tile_heuristic_is_manhattan() {
        let g = GridMap::new(Topology::Tile, 8, 8);
        let a = g.node_id(Point::new(1, 1));
        let b = g.node_id(Point::new(4, 3));
        assert_eq!(g.heuristic(a, b), 5 * COST_ONE);
    }

    #[test]
    fn successors_exclude_obstacles() {
        let mut g = GridMap::new(Topology::Tile, 3, 3);
        g.set_obstacle(Point::new(1, 0), true);
        let mut out = Vec::new();
        g.successors(g.node_id(Point::new(1, 1)), None, &mut out);
        let targets: Vec<_> = out.iter().map(|s| s.target).collect();
        assert_eq!(targets.len(), 3);
        assert!(!targets.contains(&g.node_id(Point::new(1, 0))));
    }

    #[test]
    fn corner_cutting_blocked_both_sides() {
        let mut g = GridMap::new(Topology::Octile, 3, 3);
        // Block the two cells flanking the (0,0)-(1,1) diagonal.
        g.set_obstacle(Point::new(1, 0), true);
        g.set_obstacle(Point::new(0, 1), true);
        let a = g.node_id(Point::new(0, 0));
        let b = g.node_id(Point::new(1, 1));
        assert!(!g.can_jump(b, a));
        let mut out = Vec::new();
        g.successors(a, None, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn corner_cutting_allowed_one_side_free() {
        let mut g = GridMap::new(Topology::Octile, 3, 3);
        g.set_obstacle(Point::new(1, 0), true);
        let a = g.node_id(Point::new(0, 0));
        let b = g.node_id(Point::new(1, 1));
        assert!(g.can_jump(b, a));
    }

    #[test]
    fn predecessor_pruning() {
        let g = GridMap::new(Topology::Octile, 3, 3);
        let center = g.node_id(Point::new(1, 1));
        let corner = g.node_id(Point::new(0, 0));
        let mut out = Vec::new();
        g.successors(center, Some(corner), &mut out);
        // From the center coming from a corner, at most 5 moves remain.
        assert!(out.len() <= 5);
        assert!(out.iter().all(|s| s.target != corner));
    }

    #[test]
    fn window_copies_obstacles_locally() {
        let mut g = GridMap::new(Topology::Octile, 6, 6);
        g.set_obstacle(Point::new(3, 2), true);
        let sub = g.window(Range::new(2, 2, 4, 4));
        assert_eq!(sub.rows(), 2);
        assert_eq!(sub.cols(), 2);
        assert!(sub.is_obstacle(Point::new(1, 0)));
        assert!(!sub.is_obstacle(Point::new(0, 0)));
    }

    #[test]
    fn octile_path_cost_mixes_step_kinds() {
        let g = GridMap::new(Topology::Octile, 4, 4);
        let path = [
            g.node_id(Point::new(0, 0)),
            g.node_id(Point::new(1, 1)),
            g.node_id(Point::new(2, 1)),
        ];
        assert_eq!(g.path_cost(&path), COST_SQRT2 + COST_ONE);
    }

    #[test]
    fn scatter_respects_percentage() {
        let mut g = GridMap::new(Topology::Octile, 10, 10);
        let mut rng = StdRng::seed_from_u64(7);
        let placed = g.scatter_obstacles(0.2, false, &mut rng);
        assert_eq!(placed, 20);
        let blocked = (0..100).filter(|&id| g.is_obstacle_id(id)).count();
        assert_eq!(blocked, 20);
    }

    #[test]
    fn scatter_avoid_diag_leaves_no_squeezed_diagonals() {
        let mut g = GridMap::new(Topology::Octile, 12, 12);
        let mut rng = StdRng::seed_from_u64(11);
        g.scatter_obstacles(0.3, true, &mut rng);
        for y in 0..11 {
            for x in 0..11 {
                let a = Point::new(x, y);
                let d = Point::new(x + 1, y + 1);
                let f1 = Point::new(x + 1, y);
                let f2 = Point::new(x, y + 1);
                // No obstacle pair on a diagonal with both flanks free.
                assert!(
                    !(g.is_obstacle(a)
                        && g.is_obstacle(d)
                        && !g.is_obstacle(f1)
                        && !g.is_obstacle(f2)),
                    "squeezed diagonal at {a}"
                );
            }
        }
    }

    #[test]
    fn storage_stats_count_free_cells() {
        let mut g = GridMap::new(Topology::Tile, 2, 2);
        g.set_obstacle(Point::new(0, 0), true);
        let stats = g.storage_stats();
        assert_eq!(stats.get("nodes").count(), 3.0);
        // Edges between the three free cells: (1,0)-(1,1) and (0,1)-(1,1).
        assert_eq!(stats.get("edges").count(), 4.0);
    }
}
