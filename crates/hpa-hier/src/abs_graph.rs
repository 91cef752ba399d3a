//! The abstract graph and its multi-level extension.

use hpa_core::{
    COST_ONE, COST_SQRT2, Environment, Graph, Point, Range, StatsCollection, Successor,
};
use hpa_grid::Topology;
use hpa_search::{AStar, SearchEngine, SearchOutcome};

use crate::cluster::{Cluster, LocalEntrance};
use crate::entrance::Entrance;

/// Upper bound on a single abstract edge cost (an intra-cluster path).
const MAX_ABS_COST: i32 = 200 * COST_ONE;

/// Payload of an abstract node: an entrance crossing point.
#[derive(Debug, Clone, Copy)]
pub struct AbsNodeInfo {
    pub id: usize,
    /// Coarsest level at which this node still participates in search.
    pub level: usize,
    pub cluster_id: usize,
    /// Crossing cell in map coordinates.
    pub center: Point,
    /// Grid node id of the crossing cell.
    pub center_id: usize,
    /// Index in the owning cluster's local entrance list.
    pub local_idx: usize,
}

/// Payload of an abstract edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsEdgeInfo {
    pub cost: i32,
    pub level: usize,
    /// Inter-cluster (entrance crossing) vs intra-cluster edge.
    pub inter: bool,
}

/// Which endpoint of a query a transient node backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySlot {
    Start,
    Target,
}

impl QuerySlot {
    fn index(self) -> usize {
        match self {
            QuerySlot::Start => 0,
            QuerySlot::Target => 1,
        }
    }
}

/// Bookkeeping to undo one transient insertion exactly.
#[derive(Debug, Clone, Default)]
struct TransientState {
    /// The query cell coincided with a permanent abstract node.
    reused: bool,
    /// Saved level of the reused node.
    level: usize,
    /// Saved out-edge set of the reused node.
    edges: Vec<(usize, AbsEdgeInfo)>,
}

/// The cluster abstraction of one grid map.
///
/// Level 1 holds one node per entrance crossing point, intra edges from
/// the cluster distance matrices and inter edges across entrances.
/// Levels 2..=max link nodes that share progressively larger cluster
/// windows. The struct also implements [`Environment`], restricted to
/// the window and level configured by the current search phase, so the
/// ordinary engines run on it unchanged.
pub struct AbsGraph {
    topology: Topology,
    rows: i32,
    cols: i32,
    cluster_size: i32,
    max_level: usize,
    graph: Graph<AbsNodeInfo, AbsEdgeInfo>,
    clusters: Vec<Cluster>,
    entrances: Vec<Entrance>,
    /// Dense cell → abstract node lookup, sized rows × cols.
    abs_node_for_cell: Vec<Option<u32>>,
    // Successor restriction state for the search phase in progress.
    current_level: usize,
    window: Range,
    transient: [TransientState; 2],
    // Telemetry, indexed by level (entry 0 covers low-level work).
    storage_stats: Vec<StatsCollection>,
    build_stats: Vec<StatsCollection>,
    query_stats: Vec<StatsCollection>,
}

fn search_stats_template() -> StatsCollection {
    let mut stats = AStar::new(false).stats().clone();
    stats.clear();
    stats
}

impl AbsGraph {
    pub fn new(topology: Topology, cluster_size: i32, max_level: usize, rows: i32, cols: i32) -> Self {
        assert!(topology != Topology::Hex, "abstraction requires a tile or octile grid");
        assert!(cluster_size > 0, "cluster size must be positive");
        assert!(max_level >= 1, "at least one level is required");
        let storage = StatsCollection::with_names(&["inter_edges", "intra_edges", "nodes"]);
        Self {
            topology,
            rows,
            cols,
            cluster_size,
            max_level,
            graph: Graph::new(),
            clusters: Vec::new(),
            entrances: Vec::new(),
            abs_node_for_cell: vec![None; (rows * cols) as usize],
            current_level: max_level,
            window: Range::new(0, 0, cols, rows),
            transient: [TransientState::default(), TransientState::default()],
            storage_stats: vec![storage; max_level + 1],
            build_stats: vec![search_stats_template(); max_level + 1],
            query_stats: vec![search_stats_template(); max_level + 1],
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn cluster_size(&self) -> i32 {
        self.cluster_size
    }

    pub fn graph(&self) -> &Graph<AbsNodeInfo, AbsEdgeInfo> {
        &self.graph
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn entrances(&self) -> &[Entrance] {
        &self.entrances
    }

    /// Abstract node backing a grid cell, if any.
    pub fn abs_node_at(&self, cell: usize) -> Option<usize> {
        self.abs_node_for_cell[cell].map(|id| id as usize)
    }

    /// Per-level node/edge counts gathered during construction.
    pub fn storage_stats(&self, level: usize) -> &StatsCollection {
        assert!(level <= self.max_level, "level {level} out of range");
        &self.storage_stats[level]
    }

    /// Per-level search statistics from abstraction construction.
    pub fn build_stats(&self, level: usize) -> &StatsCollection {
        assert!(level <= self.max_level, "level {level} out of range");
        &self.build_stats[level]
    }

    /// Per-level search statistics from queries (level 0 holds the
    /// low-level cluster searches done for insertion and expansion).
    pub fn query_stats(&self, level: usize) -> &StatsCollection {
        assert!(level <= self.max_level, "level {level} out of range");
        &self.query_stats[level]
    }

    pub fn clear_query_stats(&mut self) {
        for stats in &mut self.query_stats {
            stats.clear();
        }
    }

    // -----------------------------------------------------------------------
    // Assembly (driven by the builder)
    // -----------------------------------------------------------------------

    pub(crate) fn add_cluster(&mut self, cluster: Cluster) {
        assert_eq!(cluster.id(), self.clusters.len(), "cluster ids must be dense");
        self.clusters.push(cluster);
    }

    pub(crate) fn add_entrance(&mut self, entrance: Entrance) {
        assert_eq!(entrance.id, self.entrances.len(), "entrance ids must be dense");
        self.entrances.push(entrance);
    }

    /// Id of the cluster at (cluster_row, cluster_col).
    pub(crate) fn cluster_grid_id(&self, cluster_row: i32, cluster_col: i32) -> usize {
        let mut ccols = self.cols / self.cluster_size;
        if self.cols % self.cluster_size != 0 {
            ccols += 1;
        }
        (cluster_row * ccols + cluster_col) as usize
    }

    /// Level of a boundary coordinate: how many times the boundary's
    /// cluster index halves evenly, capped at the maximum level. Works
    /// like a trailing-zero count, so coarse-level boundaries get
    /// higher levels.
    pub(crate) fn determine_level(&self, coordinate: i32) -> usize {
        let mut coordinate = coordinate;
        if coordinate % self.cluster_size != 0 {
            coordinate += 1;
        }
        let mut cluster_index = coordinate / self.cluster_size;
        let mut level = 1;
        while cluster_index % 2 == 0 && level < self.max_level {
            cluster_index /= 2;
            level += 1;
        }
        level.min(self.max_level)
    }

    /// Create one abstract node per distinct entrance center cell.
    ///
    /// Both centers of every entrance are candidates; duplicates
    /// collapse onto the existing node, keeping the maximum level.
    pub(crate) fn add_abs_nodes(&mut self) {
        let mut pending: Vec<AbsNodeInfo> = Vec::new();
        for entrance_idx in 0..self.entrances.len() {
            let entrance = self.entrances[entrance_idx].clone();
            let level = self.entrance_level(&entrance);
            let sides = [
                (entrance.center1_id, entrance.center1, entrance.cluster1_id),
                (
                    entrance.center2_id,
                    entrance.center2(),
                    entrance.cluster2_id,
                ),
            ];
            for (center_id, center, cluster_id) in sides {
                match self.abs_node_for_cell[center_id] {
                    Some(existing) => {
                        let node = &mut pending[existing as usize];
                        node.level = node.level.max(level);
                    }
                    None => {
                        let id = pending.len();
                        self.abs_node_for_cell[center_id] = Some(id as u32);
                        let cluster = &mut self.clusters[cluster_id];
                        let local_idx = cluster.add_entrance(LocalEntrance::new(
                            center_id,
                            id,
                            center - cluster.origin(),
                            entrance.length,
                        ));
                        pending.push(AbsNodeInfo {
                            id,
                            level,
                            cluster_id,
                            center,
                            center_id,
                            local_idx,
                        });
                    }
                }
            }
        }
        for info in pending {
            self.storage_stats[info.level].get_mut("nodes").add(1.0);
            self.graph.push_node(info);
        }
    }

    fn entrance_level(&self, entrance: &Entrance) -> usize {
        use crate::entrance::Orientation;
        match entrance.orientation {
            Orientation::Horizontal | Orientation::HDiag1 | Orientation::HDiag2 => {
                self.determine_level(entrance.center1.y)
            }
            Orientation::Vertical | Orientation::VDiag1 | Orientation::VDiag2 => {
                self.determine_level(entrance.center1.x)
            }
        }
    }

    /// Fill every cluster's local distance matrix.
    pub(crate) fn compute_cluster_paths(&mut self) {
        log::debug!("computing intra-cluster distance matrices");
        for cluster in &mut self.clusters {
            cluster.compute_distances(&mut self.build_stats[0]);
        }
    }

    fn add_edge_pair(&mut self, a: usize, b: usize, cost: i32, level: usize, inter: bool) {
        let info = AbsEdgeInfo { cost, level, inter };
        self.graph.add_edge(a, b, info);
        self.graph.add_edge(b, a, info);
    }

    /// Level-1 edges: intra edges from the cluster distance matrices,
    /// inter edges across every entrance.
    pub(crate) fn create_edges(&mut self) {
        for cluster_idx in 0..self.clusters.len() {
            let n = self.clusters[cluster_idx].entrance_count();
            for k in 0..n {
                for l in k + 1..n {
                    if !self.clusters[cluster_idx].are_connected(k, l) {
                        continue;
                    }
                    let cluster = &self.clusters[cluster_idx];
                    let (a, b) = (
                        cluster.entrances()[k].abs_node_id,
                        cluster.entrances()[l].abs_node_id,
                    );
                    let cost = cluster.distance(k, l);
                    self.add_edge_pair(a, b, cost, 1, false);
                    self.storage_stats[1].get_mut("intra_edges").add(1.0);
                }
            }
        }
        for entrance_idx in 0..self.entrances.len() {
            let entrance = self.entrances[entrance_idx].clone();
            let level = self.entrance_level(&entrance);
            let cost = if self.topology == Topology::Octile && entrance.is_diagonal() {
                COST_SQRT2
            } else {
                COST_ONE
            };
            let a = self.abs_node_for_cell[entrance.center1_id].expect("entrance without node") as usize;
            let b = self.abs_node_for_cell[entrance.center2_id].expect("entrance without node") as usize;
            self.add_edge_pair(a, b, cost, level, true);
            self.storage_stats[level].get_mut("inter_edges").add(1.0);
        }
    }

    /// Edges for levels 2..=max: within every level-sized window,
    /// connect each pair of nodes of sufficient level by a search
    /// restricted to the levels below.
    pub(crate) fn create_hier_edges(&mut self) {
        let mut search = AStar::new(false);
        for level in 2..=self.max_level {
            log::debug!("adding level {level} edges");
            let offset = self.window_size(level);
            let mut row = 0;
            while row < self.rows {
                let mut col = 0;
                while col < self.cols {
                    self.set_window(col, row, offset);
                    self.current_level = level - 1;
                    let nodes = self.nodes_in_window(level);
                    for i in 0..nodes.len() {
                        for j in i + 1..nodes.len() {
                            let outcome = search.find_path(&*self, nodes[i], nodes[j]);
                            self.build_stats[level].merge(search.stats());
                            if let SearchOutcome::Found { cost } = outcome {
                                self.add_edge_pair(nodes[i], nodes[j], cost, level, false);
                                self.storage_stats[level].get_mut("intra_edges").add(1.0);
                            }
                        }
                    }
                    col += offset;
                }
                row += offset;
            }
        }
    }

    /// Abstract nodes inside the current window at `min_level` or above.
    fn nodes_in_window(&self, min_level: usize) -> Vec<usize> {
        (0..self.graph.node_count())
            .filter(|&id| {
                let info = self.graph.info(id);
                info.level >= min_level && self.window.contains(info.center)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Cluster windows
    // -----------------------------------------------------------------------

    /// Linear size of a level's cluster window (doubles per level).
    fn window_size(&self, level: usize) -> i32 {
        self.cluster_size * (1 << (level - 1))
    }

    fn set_window(&mut self, col: i32, row: i32, offset: i32) {
        self.window = Range::new(
            col,
            row,
            (col + offset).min(self.cols),
            (row + offset).min(self.rows),
        );
    }

    /// Restrict the window to the level-sized cluster window containing
    /// a grid cell; a level above the maximum selects the whole map.
    fn set_window_for_cell(&mut self, cell: usize, level: usize) {
        if level > self.max_level {
            self.window = Range::new(0, 0, self.cols, self.rows);
            return;
        }
        let offset = self.window_size(level);
        let row = cell as i32 / self.cols;
        let col = cell as i32 % self.cols;
        self.set_window(col - col % offset, row - row % offset, offset);
    }

    /// Whether two abstract nodes share a cluster window at `level`.
    fn same_window(&self, a: usize, b: usize, level: usize) -> bool {
        let offset = self.window_size(level);
        let ca = self.graph.info(a).center;
        let cb = self.graph.info(b).center;
        ca.x - ca.x % offset == cb.x - cb.x % offset && ca.y - ca.y % offset == cb.y - cb.y % offset
    }

    // -----------------------------------------------------------------------
    // Transient query nodes
    // -----------------------------------------------------------------------

    /// Materialize an abstract node for a query cell.
    ///
    /// If the cell already backs a permanent node, that node is reused
    /// after snapshotting its level and edges; otherwise a node is
    /// synthesized in the owning cluster. Either way the node is raised
    /// to the maximum level and wired into every window above its old
    /// level, so coarse searches can reach it. Returns the abstract
    /// node id.
    pub fn insert_transient(&mut self, cell: usize, slot: QuerySlot) -> usize {
        assert!(cell < self.abs_node_for_cell.len(), "invalid grid cell {cell}");
        let abs_id = match self.abs_node_for_cell[cell] {
            Some(existing) => {
                let existing = existing as usize;
                let state = &mut self.transient[slot.index()];
                state.reused = true;
                state.level = self.graph.info(existing).level;
                state.edges = self
                    .graph
                    .out_edges(existing)
                    .iter()
                    .map(|e| (e.target, e.info))
                    .collect();
                existing
            }
            None => {
                self.transient[slot.index()].reused = false;
                self.synthesize_node(cell)
            }
        };
        self.add_transient_window_edges(abs_id);
        abs_id
    }

    /// Create a brand-new abstract node for a cell with no entrance.
    fn synthesize_node(&mut self, cell: usize) -> usize {
        let center = Point::new(cell as i32 % self.cols, cell as i32 / self.cols);
        let cluster_id = self
            .clusters
            .iter()
            .position(|c| c.contains(center))
            .expect("query cell outside every cluster");
        let abs_id = self.graph.node_count();
        let cluster = &mut self.clusters[cluster_id];
        let local_idx =
            cluster.add_entrance(LocalEntrance::new(cell, abs_id, center - cluster.origin(), 1));
        cluster.extend_distances(&mut self.query_stats[0]);
        self.graph.push_node(AbsNodeInfo {
            id: abs_id,
            level: 1,
            cluster_id,
            center,
            center_id: cell,
            local_idx,
        });
        // Intra edges from the fresh distance-matrix row.
        let new_idx = self.clusters[cluster_id].entrance_count() - 1;
        for old_idx in 0..new_idx {
            if !self.clusters[cluster_id].are_connected(new_idx, old_idx) {
                continue;
            }
            let cluster = &self.clusters[cluster_id];
            let other = cluster.entrances()[old_idx].abs_node_id;
            let cost = cluster.distance(new_idx, old_idx);
            self.add_edge_pair(abs_id, other, cost, 1, false);
        }
        self.abs_node_for_cell[cell] = Some(abs_id as u32);
        abs_id
    }

    /// Raise a transient node to the top level and connect it inside
    /// every window between its old level and the top.
    fn add_transient_window_edges(&mut self, abs_id: usize) {
        let old_level = self.graph.info(abs_id).level;
        let cell = self.graph.info(abs_id).center_id;
        self.graph.info_mut(abs_id).level = self.max_level;
        let mut search = AStar::new(false);
        for level in old_level + 1..=self.max_level {
            self.current_level = level - 1;
            self.set_window_for_cell(cell, level);
            let candidates: Vec<usize> = self
                .nodes_in_window(level)
                .into_iter()
                .filter(|&id| id != abs_id)
                .collect();
            for other in candidates {
                let outcome = search.find_path(&*self, abs_id, other);
                self.query_stats[level].merge(search.stats());
                if let SearchOutcome::Found { cost } = outcome {
                    self.add_edge_pair(abs_id, other, cost, level, false);
                }
            }
        }
    }

    /// Undo one [`insert_transient`](Self::insert_transient) exactly.
    ///
    /// Transient nodes must be removed in LIFO order with respect to
    /// their insertion; violating that order is a caller bug.
    pub fn remove_transient(&mut self, abs_id: usize, slot: QuerySlot) {
        let state = std::mem::take(&mut self.transient[slot.index()]);
        if state.reused {
            self.graph.info_mut(abs_id).level = state.level;
            self.graph.remove_node_edges(abs_id);
            for (target, info) in state.edges {
                self.graph.add_edge(abs_id, target, info);
                self.graph.add_edge(target, abs_id, info);
            }
        } else {
            assert_eq!(
                abs_id,
                self.graph.node_count() - 1,
                "transient nodes must be removed in LIFO order"
            );
            let info = *self.graph.info(abs_id);
            self.clusters[info.cluster_id].remove_last_entrance();
            self.abs_node_for_cell[info.center_id] = None;
            self.graph.remove_node_edges(abs_id);
            self.graph.pop_node();
        }
    }

    // -----------------------------------------------------------------------
    // Hierarchical search
    // -----------------------------------------------------------------------

    /// One search phase: restrict successors to `level` within the
    /// window of `start` at `level + 1` (the whole map for the main,
    /// top-level phase), then run the engine.
    fn do_search(
        &mut self,
        engine: &mut dyn SearchEngine,
        start: usize,
        target: usize,
        level: usize,
        main_search: bool,
    ) -> Option<Vec<usize>> {
        self.current_level = level;
        let start_cell = self.graph.info(start).center_id;
        if main_search {
            self.set_window_for_cell(start_cell, self.max_level + 1);
        } else {
            self.set_window_for_cell(start_cell, level + 1);
        }
        let outcome = engine.find_path(&*self, start, target);
        self.query_stats[level].merge(engine.stats());
        match outcome {
            SearchOutcome::Found { .. } => Some(engine.path().to_vec()),
            _ => None,
        }
    }

    /// Coarse-to-fine point-to-point search between two abstract nodes.
    ///
    /// Searches the top level over the full node set, then refines each
    /// same-window pair of consecutive nodes one level down until the
    /// path is expressed at level 1. Returns `None` when no route
    /// exists.
    pub fn hierarchical_search(
        &mut self,
        engine: &mut dyn SearchEngine,
        start: usize,
        target: usize,
    ) -> Option<Vec<usize>> {
        assert!(self.graph.is_valid_node_id(start), "invalid abstract node {start}");
        assert!(self.graph.is_valid_node_id(target), "invalid abstract node {target}");
        let mut path = self.do_search(engine, start, target, self.max_level, true)?;
        for level in (2..=self.max_level).rev() {
            path = self.refine_path(engine, &path, level);
        }
        Some(path)
    }

    /// Replace every same-window pair at `level` with a search one
    /// level down; pairs in different windows are already connected at
    /// the finer level and pass through untouched.
    fn refine_path(
        &mut self,
        engine: &mut dyn SearchEngine,
        path: &[usize],
        level: usize,
    ) -> Vec<usize> {
        let mut result = vec![path[0]];
        for pair in path.windows(2) {
            if self.same_window(pair[0], pair[1], level) {
                let sub = self
                    .do_search(engine, pair[0], pair[1], level - 1, false)
                    .expect("level edge without a finer route");
                for id in sub {
                    if *result.last().expect("seeded") != id {
                        result.push(id);
                    }
                }
            } else if *result.last().expect("seeded") != pair[1] {
                result.push(pair[1]);
            }
        }
        result
    }

    /// Expand an abstract path to a low-level grid path: same-cluster
    /// hops insert the cluster's shortest internal path, cross-entrance
    /// hops step directly between the two crossing cells. Repeated
    /// junction cells are deduplicated.
    pub fn to_grid_path(&mut self, abs_path: &[usize]) -> Vec<usize> {
        let Some(&first) = abs_path.first() else {
            return Vec::new();
        };
        let mut result = vec![self.graph.info(first).center_id];
        for pair in abs_path.windows(2) {
            let last = *self.graph.info(pair[0]);
            let cur = *self.graph.info(pair[1]);
            if last.cluster_id == cur.cluster_id {
                let cluster = &self.clusters[last.cluster_id];
                let from = cluster.local_center_id(last.local_idx);
                let to = cluster.local_center_id(cur.local_idx);
                if from == to {
                    continue;
                }
                let local_path = cluster.compute_path(from, to, &mut self.query_stats[0]);
                assert!(local_path.len() > 1, "intra edge without a cluster route");
                for local_id in local_path {
                    let global = cluster.to_global_id(local_id, self.cols);
                    if *result.last().expect("seeded") != global {
                        result.push(global);
                    }
                }
            } else {
                if *result.last().expect("seeded") != last.center_id {
                    result.push(last.center_id);
                }
                if *result.last().expect("seeded") != cur.center_id {
                    result.push(cur.center_id);
                }
            }
        }
        result
    }
}

impl Environment for AbsGraph {
    fn heuristic(&self, start: usize, target: usize) -> i32 {
        let a = self.graph.info(start).center;
        let b = self.graph.info(target).center;
        let diff_col = (b.x - a.x).abs();
        let diff_row = (b.y - a.y).abs();
        match self.topology {
            Topology::Tile => (diff_col + diff_row) * COST_ONE,
            Topology::OctileUnicost => diff_col.max(diff_row) * COST_ONE,
            Topology::Octile => {
                let diag = diff_col.min(diff_row);
                let straight = diff_col.max(diff_row) - diag;
                diag * COST_SQRT2 + straight * COST_ONE
            }
            Topology::Hex => unreachable!("hex grids are rejected at construction"),
        }
    }

    fn max_cost(&self) -> i32 {
        MAX_ABS_COST
    }

    fn min_cost(&self) -> i32 {
        0
    }

    fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Successors restricted to the current level and window: inter
    /// edges pass at their level or above, intra edges only at exactly
    /// their level, and targets must be high-level enough and inside
    /// the window. With a known predecessor, targets sharing its window
    /// are pruned (they were reachable a step earlier).
    fn successors(&self, node: usize, last: Option<usize>, out: &mut Vec<Successor>) {
        out.clear();
        for edge in self.graph.out_edges(node) {
            if edge.info.inter {
                if edge.info.level < self.current_level {
                    continue;
                }
            } else if edge.info.level != self.current_level {
                continue;
            }
            let target_info = self.graph.info(edge.target);
            if target_info.level < self.current_level {
                continue;
            }
            if !self.window.contains(target_info.center) {
                continue;
            }
            if let Some(last) = last {
                if self.same_window(edge.target, last, self.current_level) {
                    continue;
                }
            }
            out.push(Successor::new(edge.target, edge.info.cost));
        }
    }

    fn is_valid_node_id(&self, node: usize) -> bool {
        self.graph.is_valid_node_id(node)
    }
}
