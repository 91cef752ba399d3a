//! Path smoothing: remove detours by splicing straight rays.

use hpa_core::{COST_ONE, COST_SQRT2, Environment, StatsCollection};

use crate::grid::{GridMap, Topology};

/// One of the eight ray directions, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

impl Direction {
    /// All eight directions, cardinals first.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::NorthWest,
    ];

    /// The four cardinal directions.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// (dx, dy) step, with y growing down.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
            Direction::NorthWest => (-1, -1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NorthEast
                | Direction::SouthEast
                | Direction::SouthWest
                | Direction::NorthWest
        )
    }
}

/// Post-processes low-level paths by replacing detours with straight
/// rays of free cells.
///
/// Passes repeat until no pass lowers the cost, so smoothing an
/// already-smoothed path returns it unchanged. The result never costs
/// more than the input and never less than the optimal cost between
/// the same endpoints (each ray is itself an optimal path between its
/// own endpoints).
pub struct PathSmoother<'a> {
    grid: &'a GridMap,
    /// 1-based position of each node on the current path; 0 = not on it.
    path_index: Vec<u32>,
    stats: StatsCollection,
}

impl<'a> PathSmoother<'a> {
    pub fn new(grid: &'a GridMap) -> Self {
        assert!(
            grid.topology() != Topology::Hex,
            "path smoothing is not supported on hex grids"
        );
        Self {
            grid,
            path_index: vec![0; grid.num_nodes()],
            stats: StatsCollection::with_names(&[
                "improvement",
                "nr_improvements",
                "number_runs",
                "path_cost",
            ]),
        }
    }

    /// Statistics accumulated over all [`smooth`](Self::smooth) calls.
    pub fn stats(&self) -> &StatsCollection {
        &self.stats
    }

    /// Smooth a path (node ids in start→target order).
    pub fn smooth(&mut self, path: &[usize]) -> Vec<usize> {
        let mut current = path.to_vec();
        if current.len() >= 3 {
            let start = current[0];
            let target = *current.last().expect("non-empty path");
            loop {
                // A path matching the heuristic bound is already optimal.
                if self.grid.path_cost(&current) == self.grid.heuristic(start, target) {
                    break;
                }
                let next = self.smooth_pass(&current);
                if self.grid.path_cost(&next) >= self.grid.path_cost(&current) {
                    break;
                }
                current = next;
            }
        }
        self.stats
            .get_mut("path_cost")
            .add(self.grid.path_cost(&current) as f64);
        current
    }

    /// One left-to-right splice pass over the path.
    fn smooth_pass(&mut self, path: &[usize]) -> Vec<usize> {
        for (i, &id) in path.iter().enumerate() {
            self.path_index[id] = i as u32 + 1;
        }
        self.stats.get_mut("number_runs").add(1.0);

        let directions: &[Direction] = if self.grid.topology() == Topology::Tile {
            &Direction::CARDINAL
        } else {
            &Direction::ALL
        };

        let mut smoothed: Vec<usize> = Vec::with_capacity(path.len());
        let mut j = 0;
        while j < path.len() {
            let cur = path[j];
            if smoothed.last() != Some(&cur) {
                smoothed.push(cur);
            }
            let mut spliced = false;
            for &dir in directions {
                let Some(seen) = self.sight_node(cur, dir) else {
                    continue;
                };
                if j > 0 && seen == path[j - 1] {
                    continue;
                }
                if j + 1 < path.len() && seen == path[j + 1] {
                    continue;
                }
                let seen_idx = (self.path_index[seen] - 1) as usize;
                let old_cost = self.grid.path_cost(&path[j..=seen_idx]);
                let new_cost = self.push_ray(cur, seen, dir, &mut smoothed);
                self.stats.get_mut("nr_improvements").add(1.0);
                self.stats
                    .get_mut("improvement")
                    .add((old_cost - new_cost) as f64);
                j = seen_idx;
                spliced = true;
                break;
            }
            if !spliced {
                j += 1;
            }
        }

        for &id in path {
            self.path_index[id] = 0;
        }
        smoothed
    }

    /// Step one cell in `dir`, or `None` at the map border.
    fn advance(&self, node: usize, dir: Direction) -> Option<usize> {
        let (dx, dy) = dir.offset();
        let next = self.grid.point(node).shift(dx, dy);
        if !self.grid.bounds().contains(next) {
            return None;
        }
        Some(self.grid.node_id(next))
    }

    /// Cast a ray of free, corner-legal cells from `origin`; return the
    /// first path node strictly later in the path than `origin`.
    fn sight_node(&self, origin: usize, dir: Direction) -> Option<usize> {
        let mut last = origin;
        loop {
            let node = self.advance(last, dir)?;
            if !self.grid.can_jump(node, last) {
                return None;
            }
            if self.path_index[node] != 0 && self.path_index[node] > self.path_index[origin] {
                return Some(node);
            }
            if self.grid.is_obstacle_id(node) {
                return None;
            }
            last = node;
        }
    }

    /// Append the ray cells between `origin` (exclusive) and `last_node`
    /// (inclusive); return the ray's cost.
    fn push_ray(
        &self,
        origin: usize,
        last_node: usize,
        dir: Direction,
        out: &mut Vec<usize>,
    ) -> i32 {
        let step_cost = if dir.is_diagonal() && self.grid.topology() == Topology::Octile {
            COST_SQRT2
        } else {
            COST_ONE
        };
        let mut cost = 0;
        let mut node = self.advance(origin, dir).expect("ray leaves the map");
        while node != last_node {
            out.push(node);
            cost += step_cost;
            node = self.advance(node, dir).expect("ray leaves the map");
        }
        out.push(last_node);
        cost + step_cost
    }
}
