//! Clusters: rectangular sub-regions with local entrance bookkeeping.

use hpa_core::{Point, Range, StatsCollection, UNREACHABLE};
use hpa_grid::GridMap;
use hpa_search::{AStar, SearchEngine, SearchUtils};

/// An entrance crossing point as seen from its owning cluster.
#[derive(Debug, Clone)]
pub struct LocalEntrance {
    /// Grid node id of the crossing cell (map coordinates).
    pub center_id: usize,
    /// Id of the abstract node this entrance backs.
    pub abs_node_id: usize,
    /// Index of this record in the owning cluster's entrance list.
    pub local_idx: usize,
    /// Crossing cell in cluster-local coordinates.
    pub center: Point,
    /// Length of the boundary run the entrance represents.
    pub length: i32,
}

impl LocalEntrance {
    pub fn new(center_id: usize, abs_node_id: usize, center: Point, length: i32) -> Self {
        Self {
            center_id,
            abs_node_id,
            local_idx: 0, // assigned when added to a cluster
            center,
            length,
        }
    }
}

/// A rectangular sub-region of the map.
///
/// Owns a copy of its part of the grid (a bounded search space for
/// intra-cluster work), the ordered list of local entrances, and the
/// symmetric entrance-to-entrance distance matrix. Matrix entries are
/// [`UNREACHABLE`] for pairs with no route inside the cluster.
#[derive(Debug, Clone)]
pub struct Cluster {
    id: usize,
    /// Position in the cluster grid (not map coordinates).
    row: i32,
    col: i32,
    /// Top-left corner in map coordinates.
    origin: Point,
    width: i32,
    height: i32,
    grid: GridMap,
    entrances: Vec<LocalEntrance>,
    distances: Vec<Vec<i32>>,
}

impl Cluster {
    pub fn new(map: &GridMap, id: usize, row: i32, col: i32, origin: Point, width: i32, height: i32) -> Self {
        let rng = Range::new(origin.x, origin.y, origin.x + width, origin.y + height);
        Self {
            id,
            row,
            col,
            origin,
            width,
            height,
            grid: map.window(rng),
            entrances: Vec::new(),
            distances: Vec::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn row(&self) -> i32 {
        self.row
    }

    pub fn col(&self) -> i32 {
        self.col
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Whether a map coordinate falls inside this cluster.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x
            && p.x < self.origin.x + self.width
            && p.y >= self.origin.y
            && p.y < self.origin.y + self.height
    }

    pub fn entrances(&self) -> &[LocalEntrance] {
        &self.entrances
    }

    pub fn entrance_count(&self) -> usize {
        self.entrances.len()
    }

    /// Append a local entrance and return its index.
    pub fn add_entrance(&mut self, mut entrance: LocalEntrance) -> usize {
        entrance.local_idx = self.entrances.len();
        self.entrances.push(entrance);
        self.entrances.len() - 1
    }

    /// Drop the most recently added entrance and its matrix row/column.
    pub fn remove_last_entrance(&mut self) {
        assert!(!self.entrances.is_empty(), "no entrance record to remove");
        self.entrances.pop();
        let n = self.entrances.len();
        self.distances.truncate(n);
        for row in &mut self.distances {
            row.truncate(n);
        }
    }

    /// Local grid node id of an entrance's crossing cell.
    pub fn local_center_id(&self, local_idx: usize) -> usize {
        let c = self.entrance(local_idx).center;
        (c.y * self.width + c.x) as usize
    }

    fn entrance(&self, local_idx: usize) -> &LocalEntrance {
        assert!(local_idx < self.entrances.len(), "entrance index {local_idx} out of range");
        &self.entrances[local_idx]
    }

    /// Map a local grid node id back to a map grid node id.
    pub fn to_global_id(&self, local_id: usize, map_cols: i32) -> usize {
        let local_row = local_id as i32 / self.width;
        let local_col = local_id as i32 % self.width;
        ((local_row + self.origin.y) * map_cols + (local_col + self.origin.x)) as usize
    }

    // -----------------------------------------------------------------------
    // Distance matrix
    // -----------------------------------------------------------------------

    pub fn distance(&self, a: usize, b: usize) -> i32 {
        assert!(a < self.entrances.len() && b < self.entrances.len());
        self.distances[a][b]
    }

    pub fn are_connected(&self, a: usize, b: usize) -> bool {
        self.distance(a, b) != UNREACHABLE
    }

    /// Compute the full pairwise distance matrix by exhaustive local
    /// search; `stats` accumulates the per-pair search statistics.
    pub fn compute_distances(&mut self, stats: &mut StatsCollection) {
        let n = self.entrances.len();
        self.distances = vec![vec![UNREACHABLE; n]; n];
        for i in 0..n {
            self.distances[i][i] = 0;
        }
        for i in 0..n {
            for j in i + 1..n {
                let d = self.compute_distance(i, j, stats);
                self.distances[i][j] = d;
                self.distances[j][i] = d;
            }
        }
    }

    /// Extend the matrix for a newly appended entrance: one search from
    /// it to every older entrance.
    pub fn extend_distances(&mut self, stats: &mut StatsCollection) {
        let n = self.entrances.len();
        assert_eq!(self.distances.len(), n - 1, "inconsistent entrance bookkeeping");
        for row in &mut self.distances {
            row.push(UNREACHABLE);
        }
        self.distances.push(vec![UNREACHABLE; n]);
        let new = n - 1;
        self.distances[new][new] = 0;
        for old in 0..new {
            let d = self.compute_distance(new, old, stats);
            self.distances[new][old] = d;
            self.distances[old][new] = d;
        }
    }

    fn compute_distance(&self, a: usize, b: usize, stats: &mut StatsCollection) -> i32 {
        let start = self.local_center_id(a);
        let target = self.local_center_id(b);
        if start == target {
            return 0;
        }
        // Cheap reachability probe before paying for a full search.
        let mut utils = SearchUtils::new();
        if !utils.path_exists(&self.grid, start, target) {
            return UNREACHABLE;
        }
        let mut search = AStar::new(true);
        let outcome = search.find_path(&self.grid, start, target);
        stats.merge(search.stats());
        outcome.cost().unwrap_or(UNREACHABLE)
    }

    /// Shortest intra-cluster path between two local grid node ids,
    /// in start→target order. Used when expanding an abstract path.
    pub fn compute_path(
        &self,
        start: usize,
        target: usize,
        stats: &mut StatsCollection,
    ) -> Vec<usize> {
        let mut search = AStar::new(true);
        search.find_path(&self.grid, start, target);
        stats.merge(search.stats());
        search.path().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpa_core::{COST_ONE, COST_SQRT2};
    use hpa_grid::Topology;

    fn astar_stats() -> StatsCollection {
        let mut stats = AStar::new(true).stats().clone();
        stats.clear();
        stats
    }

    fn open_cluster() -> Cluster {
        let map = GridMap::new(Topology::Octile, 8, 8);
        let mut cluster = Cluster::new(&map, 0, 0, 0, Point::new(0, 0), 4, 4);
        cluster.add_entrance(LocalEntrance::new(0, 0, Point::new(0, 0), 1));
        cluster.add_entrance(LocalEntrance::new(3, 1, Point::new(3, 0), 1));
        cluster.add_entrance(LocalEntrance::new(15, 2, Point::new(3, 3), 1));
        cluster
    }

    #[test]
    fn distances_are_symmetric() {
        let mut cluster = open_cluster();
        let mut stats = astar_stats();
        cluster.compute_distances(&mut stats);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(cluster.distance(i, j), cluster.distance(j, i));
            }
            assert_eq!(cluster.distance(i, i), 0);
        }
        assert_eq!(cluster.distance(0, 1), 3 * COST_ONE);
        assert_eq!(cluster.distance(0, 2), 3 * COST_SQRT2);
    }

    #[test]
    fn unreachable_pairs_use_the_sentinel() {
        let mut map = GridMap::new(Topology::Octile, 4, 8);
        // Wall splitting the left 4x4 block vertically.
        for y in 0..4 {
            map.set_obstacle(Point::new(2, y), true);
        }
        let mut cluster = Cluster::new(&map, 0, 0, 0, Point::new(0, 0), 4, 4);
        cluster.add_entrance(LocalEntrance::new(0, 0, Point::new(0, 0), 1));
        cluster.add_entrance(LocalEntrance::new(3, 1, Point::new(3, 0), 1));
        let mut stats = astar_stats();
        cluster.compute_distances(&mut stats);
        assert!(!cluster.are_connected(0, 1));
        assert_eq!(cluster.distance(0, 1), UNREACHABLE);
        assert_eq!(cluster.distance(1, 0), UNREACHABLE);
    }

    #[test]
    fn extend_and_remove_round_trip() {
        let mut cluster = open_cluster();
        let mut stats = astar_stats();
        cluster.compute_distances(&mut stats);
        let before = cluster.clone();

        cluster.add_entrance(LocalEntrance::new(5, 3, Point::new(1, 1), 1));
        cluster.extend_distances(&mut stats);
        assert_eq!(cluster.entrance_count(), 4);
        assert_eq!(cluster.distance(3, 0), COST_SQRT2);
        assert_eq!(cluster.distance(0, 3), COST_SQRT2);

        cluster.remove_last_entrance();
        assert_eq!(cluster.entrance_count(), before.entrance_count());
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(cluster.distance(i, j), before.distance(i, j));
            }
        }
    }

    #[test]
    fn local_paths_stay_inside_the_cluster() {
        let map = GridMap::new(Topology::Octile, 8, 8);
        let cluster = Cluster::new(&map, 0, 0, 0, Point::new(4, 4), 4, 4);
        let mut stats = astar_stats();
        let path = cluster.compute_path(0, 15, &mut stats);
        assert_eq!(path.len(), 4); // three diagonal steps in the 4x4 window
        assert_eq!(cluster.to_global_id(path[0], 8), map.node_id(Point::new(4, 4)));
        assert_eq!(cluster.to_global_id(path[3], 8), map.node_id(Point::new(7, 7)));
    }
}
