//! One-time construction of the abstraction from a grid.

use hpa_core::Point;
use hpa_grid::GridMap;

use crate::abs_graph::AbsGraph;
use crate::cluster::Cluster;
use crate::entrance::{Entrance, Orientation};

/// What to do with a boundary run wider than the entrance width limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntranceStyle {
    /// Always one entrance at the run's midpoint.
    Middle,
    /// Wide runs get two entrances, one at each end.
    Ends,
}

/// Abstraction build parameters.
#[derive(Debug, Clone)]
pub struct AbsConfig {
    /// Linear size of a level-1 cluster.
    pub cluster_size: i32,
    /// Number of hierarchy levels (1 = flat abstraction).
    pub max_level: usize,
    pub entrance_style: EntranceStyle,
    /// Runs wider than this split under [`EntranceStyle::Ends`].
    pub max_entrance_width: i32,
    /// Also detect crossings through blocked boundary diagonals.
    /// Off by default; straight entrances cover the common case.
    pub diagonal_entrances: bool,
}

impl Default for AbsConfig {
    fn default() -> Self {
        Self {
            cluster_size: 10,
            max_level: 2,
            entrance_style: EntranceStyle::Ends,
            max_entrance_width: 6,
            diagonal_entrances: false,
        }
    }
}

/// Decompose a grid into clusters and entrances and assemble the
/// abstract graph, including the hierarchical levels.
pub fn build_abstraction(grid: &GridMap, config: &AbsConfig) -> AbsGraph {
    let mut builder = Builder {
        grid,
        config,
        abs: AbsGraph::new(
            grid.topology(),
            config.cluster_size,
            config.max_level,
            grid.rows(),
            grid.cols(),
        ),
        next_entrance_id: 0,
    };
    builder.create_entrances_and_clusters();
    log::info!(
        "abstraction: {} clusters, {} entrances, {} abstract nodes",
        builder.abs.clusters().len(),
        builder.abs.entrances().len(),
        builder.abs.graph().node_count()
    );
    builder.abs.compute_cluster_paths();
    builder.abs.create_edges();
    builder.abs.create_hier_edges();
    builder.abs
}

struct Builder<'a> {
    grid: &'a GridMap,
    config: &'a AbsConfig,
    abs: AbsGraph,
    next_entrance_id: usize,
}

impl Builder<'_> {
    fn create_entrances_and_clusters(&mut self) {
        log::debug!("creating entrances and clusters");
        let size = self.config.cluster_size;
        let (rows, cols) = (self.grid.rows(), self.grid.cols());
        let mut cluster_row = 0;
        let mut y = 0;
        while y < rows {
            let height = size.min(rows - y);
            let mut cluster_col = 0;
            let mut x = 0;
            while x < cols {
                let width = size.min(cols - x);
                let cluster = Cluster::new(
                    self.grid,
                    self.abs.clusters().len(),
                    cluster_row,
                    cluster_col,
                    Point::new(x, y),
                    width,
                    height,
                );
                self.abs.add_cluster(cluster);
                if y > 0 {
                    self.scan_horiz(x, x + width - 1, y - 1, cluster_row, cluster_col);
                    if self.config.diagonal_entrances {
                        self.scan_horiz_diag(x, x + width - 2, y - 1, cluster_row, cluster_col);
                    }
                }
                if x > 0 {
                    self.scan_vert(y, y + height - 1, x - 1, cluster_row, cluster_col);
                    if self.config.diagonal_entrances {
                        self.scan_vert_diag(y, y + height - 2, x - 1, cluster_row, cluster_col);
                    }
                }
                cluster_col += 1;
                x += size;
            }
            cluster_row += 1;
            y += size;
        }
        self.abs.add_abs_nodes();
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_entrance_id;
        self.next_entrance_id += 1;
        id
    }

    fn blocked(&self, x: i32, y: i32) -> bool {
        self.grid.is_obstacle(Point::new(x, y))
    }

    fn add_entrance(
        &mut self,
        center1: Point,
        length: i32,
        orientation: Orientation,
        cluster1_id: usize,
        cluster2_id: usize,
    ) {
        let id = self.next_id();
        let entrance = Entrance {
            id,
            cluster1_id,
            cluster2_id,
            center1,
            center1_id: self.grid.node_id(center1),
            center2_id: 0, // filled below, once center2 is known
            length,
            orientation,
        };
        let center2 = entrance.center2();
        self.abs.add_entrance(Entrance {
            center2_id: self.grid.node_id(center2),
            ..entrance
        });
    }

    /// Scan one horizontal boundary (between rows `latitude` and
    /// `latitude + 1`) for maximal crossable runs over the columns
    /// `start..=end`.
    fn scan_horiz(&mut self, start: i32, end: i32, latitude: i32, cluster_row: i32, cluster_col: i32) {
        let cluster1 = self.abs.cluster_grid_id(cluster_row - 1, cluster_col);
        let cluster2 = self.abs.cluster_grid_id(cluster_row, cluster_col);
        let mut i = start;
        while i <= end {
            if self.blocked(i, latitude) || self.blocked(i, latitude + 1) {
                i += 1;
                continue;
            }
            let run_start = i;
            while i <= end && !self.blocked(i, latitude) && !self.blocked(i, latitude + 1) {
                i += 1;
            }
            let run_end = i - 1;
            let length = run_end - run_start + 1;
            if self.config.entrance_style == EntranceStyle::Ends
                && length > self.config.max_entrance_width
            {
                self.add_entrance(
                    Point::new(run_start, latitude),
                    1,
                    Orientation::Horizontal,
                    cluster1,
                    cluster2,
                );
                self.add_entrance(
                    Point::new(run_end, latitude),
                    1,
                    Orientation::Horizontal,
                    cluster1,
                    cluster2,
                );
            } else {
                self.add_entrance(
                    Point::new((run_start + run_end) / 2, latitude),
                    length,
                    Orientation::Horizontal,
                    cluster1,
                    cluster2,
                );
            }
        }
    }

    /// Scan one vertical boundary (between columns `meridian` and
    /// `meridian + 1`) over the rows `start..=end`.
    fn scan_vert(&mut self, start: i32, end: i32, meridian: i32, cluster_row: i32, cluster_col: i32) {
        let cluster1 = self.abs.cluster_grid_id(cluster_row, cluster_col - 1);
        let cluster2 = self.abs.cluster_grid_id(cluster_row, cluster_col);
        let mut i = start;
        while i <= end {
            if self.blocked(meridian, i) || self.blocked(meridian + 1, i) {
                i += 1;
                continue;
            }
            let run_start = i;
            while i <= end && !self.blocked(meridian, i) && !self.blocked(meridian + 1, i) {
                i += 1;
            }
            let run_end = i - 1;
            let length = run_end - run_start + 1;
            if self.config.entrance_style == EntranceStyle::Ends
                && length > self.config.max_entrance_width
            {
                self.add_entrance(
                    Point::new(meridian, run_start),
                    1,
                    Orientation::Vertical,
                    cluster1,
                    cluster2,
                );
                self.add_entrance(
                    Point::new(meridian, run_end),
                    1,
                    Orientation::Vertical,
                    cluster1,
                    cluster2,
                );
            } else {
                self.add_entrance(
                    Point::new(meridian, (run_start + run_end) / 2),
                    length,
                    Orientation::Vertical,
                    cluster1,
                    cluster2,
                );
            }
        }
    }

    /// Detect crossings through a blocked diagonal pair on a horizontal
    /// boundary (only with [`AbsConfig::diagonal_entrances`]).
    fn scan_horiz_diag(&mut self, start: i32, end: i32, latitude: i32, cluster_row: i32, cluster_col: i32) {
        let cluster1 = self.abs.cluster_grid_id(cluster_row - 1, cluster_col);
        let cluster2 = self.abs.cluster_grid_id(cluster_row, cluster_col);
        for i in start..=end {
            let nw = self.blocked(i, latitude);
            let ne = self.blocked(i + 1, latitude);
            let sw = self.blocked(i, latitude + 1);
            let se = self.blocked(i + 1, latitude + 1);
            if nw && !ne && !sw && se {
                self.add_entrance(
                    Point::new(i + 1, latitude),
                    2,
                    Orientation::HDiag2,
                    cluster1,
                    cluster2,
                );
            } else if !nw && ne && sw && !se {
                self.add_entrance(
                    Point::new(i, latitude),
                    2,
                    Orientation::HDiag1,
                    cluster1,
                    cluster2,
                );
            }
        }
    }

    /// Diagonal crossings on a vertical boundary.
    fn scan_vert_diag(&mut self, start: i32, end: i32, meridian: i32, cluster_row: i32, cluster_col: i32) {
        let cluster1 = self.abs.cluster_grid_id(cluster_row, cluster_col - 1);
        let cluster2 = self.abs.cluster_grid_id(cluster_row, cluster_col);
        for i in start..=end {
            let nw = self.blocked(meridian, i);
            let ne = self.blocked(meridian + 1, i);
            let sw = self.blocked(meridian, i + 1);
            let se = self.blocked(meridian + 1, i + 1);
            if nw && !ne && !sw && se {
                self.add_entrance(
                    Point::new(meridian, i + 1),
                    2,
                    Orientation::VDiag2,
                    cluster1,
                    cluster2,
                );
            } else if !nw && ne && sw && !se {
                self.add_entrance(
                    Point::new(meridian, i),
                    2,
                    Orientation::VDiag1,
                    cluster1,
                    cluster2,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpa_grid::Topology;

    #[test]
    fn partitions_with_clipped_edge_clusters() {
        let grid = GridMap::new(Topology::Octile, 10, 7);
        let abs = build_abstraction(
            &grid,
            &AbsConfig {
                cluster_size: 4,
                max_level: 1,
                ..AbsConfig::default()
            },
        );
        // 3 cluster rows x 2 cluster cols.
        assert_eq!(abs.clusters().len(), 6);
        let last = &abs.clusters()[5];
        assert_eq!(last.width(), 3);
        assert_eq!(last.height(), 2);
    }

    #[test]
    fn open_boundary_yields_one_middle_entrance() {
        let grid = GridMap::new(Topology::Octile, 8, 8);
        let abs = build_abstraction(
            &grid,
            &AbsConfig {
                cluster_size: 4,
                max_level: 1,
                entrance_style: EntranceStyle::Middle,
                ..AbsConfig::default()
            },
        );
        // 4 boundaries, each one full-width run.
        assert_eq!(abs.entrances().len(), 4);
        assert!(abs.entrances().iter().all(|e| e.length == 4));
    }

    #[test]
    fn wide_runs_split_under_ends_style() {
        // One 8-wide horizontal boundary and no vertical ones.
        let grid = GridMap::new(Topology::Octile, 16, 8);
        let abs = build_abstraction(
            &grid,
            &AbsConfig {
                cluster_size: 8,
                max_level: 1,
                entrance_style: EntranceStyle::Ends,
                max_entrance_width: 6,
                ..AbsConfig::default()
            },
        );
        // The run splits into two single-cell entrances at its ends.
        assert_eq!(abs.entrances().len(), 2);
        assert!(abs.entrances().iter().all(|e| e.length == 1));
        let cols: Vec<i32> = abs.entrances().iter().map(|e| e.center1.x).collect();
        assert_eq!(cols, vec![0, 7]);
    }

    #[test]
    fn blocked_boundary_yields_no_entrance() {
        let mut grid = GridMap::new(Topology::Octile, 8, 8);
        for x in 0..8 {
            grid.set_obstacle(Point::new(x, 4), true);
        }
        let abs = build_abstraction(
            &grid,
            &AbsConfig {
                cluster_size: 4,
                max_level: 1,
                ..AbsConfig::default()
            },
        );
        assert!(
            abs.entrances()
                .iter()
                .all(|e| e.orientation != Orientation::Horizontal)
        );
    }

    #[test]
    fn diagonal_scan_is_off_by_default() {
        let mut grid = GridMap::new(Topology::Octile, 8, 8);
        // A blocked diagonal pair straddling the horizontal boundary.
        grid.set_obstacle(Point::new(2, 3), true);
        grid.set_obstacle(Point::new(3, 4), true);
        let config = AbsConfig {
            cluster_size: 4,
            max_level: 1,
            ..AbsConfig::default()
        };
        let without = build_abstraction(&grid, &config);
        assert!(without.entrances().iter().all(|e| !e.is_diagonal()));
        let with = build_abstraction(
            &grid,
            &AbsConfig {
                diagonal_entrances: true,
                ..config
            },
        );
        assert!(with.entrances().iter().any(|e| e.is_diagonal()));
    }
}
