//! Best-first (A*) search.

use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use hpa_core::{Environment, StatsCollection, Successor};

use crate::engine::{SearchEngine, SearchOutcome};

const NO_PARENT: usize = usize::MAX;

#[derive(Debug, Clone, Copy, Default)]
struct AStarNode {
    id: usize,
    parent: usize,
    g: i32,
    f: i32,
}

impl AStarNode {
    fn new(id: usize, parent: usize, g: i32, h: i32) -> Self {
        Self {
            id,
            parent,
            g,
            f: g + h,
        }
    }
}

// ---------------------------------------------------------------------------
// Open list
// ---------------------------------------------------------------------------

/// Heap entry ordered so the best node pops first: lowest f, ties broken
/// by highest g (deeper nodes first, which reduces reopen churn).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f: i32,
    g: i32,
    id: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .f
            .cmp(&self.f)
            .then(self.g.cmp(&other.g))
            .then(other.id.cmp(&self.id))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue with O(1) membership via a node-indexed marker table.
///
/// Removal is lazy: superseded heap entries stay behind and are skipped
/// on pop when they no longer match the recorded node state.
#[derive(Default)]
struct OpenList {
    heap: BinaryHeap<OpenEntry>,
    marker: Vec<bool>,
    nodes: Vec<AStarNode>,
    live: usize,
}

impl OpenList {
    fn init(&mut self, num_nodes: usize) {
        self.heap.clear();
        self.marker.clear();
        self.marker.resize(num_nodes, false);
        self.nodes.clear();
        self.nodes.resize(num_nodes, AStarNode::default());
        self.live = 0;
    }

    fn insert(&mut self, node: AStarNode) {
        if !self.marker[node.id] {
            self.live += 1;
        }
        self.marker[node.id] = true;
        self.nodes[node.id] = node;
        self.heap.push(OpenEntry {
            f: node.f,
            g: node.g,
            id: node.id,
        });
    }

    fn pop(&mut self) -> Option<AStarNode> {
        while let Some(entry) = self.heap.pop() {
            let node = self.nodes[entry.id];
            if !self.marker[entry.id] || node.f != entry.f || node.g != entry.g {
                continue; // stale entry
            }
            self.marker[entry.id] = false;
            self.live -= 1;
            return Some(node);
        }
        None
    }

    fn remove(&mut self, id: usize) -> bool {
        if !self.marker[id] {
            return false;
        }
        self.marker[id] = false;
        self.live -= 1;
        true
    }

    fn get(&self, id: usize) -> Option<&AStarNode> {
        self.marker[id].then(|| &self.nodes[id])
    }

    fn len(&self) -> usize {
        self.live
    }

    fn is_empty(&self) -> bool {
        self.live == 0
    }
}

// ---------------------------------------------------------------------------
// Closed store
// ---------------------------------------------------------------------------

/// Explored-node store in one of two flavors: a hash map for arbitrary
/// id spaces, or a dense marker/slot array ("perfect hash") when ids
/// are small and contiguous, as in grid search.
enum ClosedStore {
    Hashed(HashMap<usize, AStarNode>),
    Dense {
        marker: Vec<bool>,
        nodes: Vec<AStarNode>,
    },
}

impl ClosedStore {
    fn init(&mut self, num_nodes: usize) {
        match self {
            ClosedStore::Hashed(map) => map.clear(),
            ClosedStore::Dense { marker, nodes } => {
                marker.clear();
                marker.resize(num_nodes, false);
                nodes.clear();
                nodes.resize(num_nodes, AStarNode::default());
            }
        }
    }

    fn add(&mut self, node: AStarNode) {
        match self {
            ClosedStore::Hashed(map) => {
                map.insert(node.id, node);
            }
            ClosedStore::Dense { marker, nodes } => {
                marker[node.id] = true;
                nodes[node.id] = node;
            }
        }
    }

    fn remove(&mut self, id: usize) {
        match self {
            ClosedStore::Hashed(map) => {
                map.remove(&id);
            }
            ClosedStore::Dense { marker, .. } => marker[id] = false,
        }
    }

    fn get(&self, id: usize) -> Option<&AStarNode> {
        match self {
            ClosedStore::Hashed(map) => map.get(&id),
            ClosedStore::Dense { marker, nodes } => marker[id].then(|| &nodes[id]),
        }
    }

    /// Walk parent pointers from `target` back to `start`; return the
    /// path in start→target order.
    fn construct_path(&self, start: usize, target: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut id = target;
        loop {
            path.push(id);
            if id == start {
                break;
            }
            let node = self.get(id).expect("broken parent chain");
            id = node.parent;
        }
        path.reverse();
        path
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Best-first search engine.
pub struct AStar {
    open: OpenList,
    closed: ClosedStore,
    path: Vec<usize>,
    path_cost: Option<i32>,
    visited: Vec<u8>,
    stats: StatsCollection,
    node_limit: Option<u64>,
    successors: Vec<Successor>,
}

impl AStar {
    /// Create an engine. With `dense_closed`, the closed store is a
    /// dense array indexed by node id — preferable when the environment
    /// has a small contiguous id space (grids); otherwise a hash map is
    /// used.
    pub fn new(dense_closed: bool) -> Self {
        Self {
            open: OpenList::default(),
            closed: if dense_closed {
                ClosedStore::Dense {
                    marker: Vec::new(),
                    nodes: Vec::new(),
                }
            } else {
                ClosedStore::Hashed(HashMap::new())
            },
            path: Vec::new(),
            path_cost: None,
            visited: Vec::new(),
            stats: StatsCollection::with_names(&[
                "branching_factor",
                "cpu_time",
                "nodes_expanded",
                "nodes_visited",
                "open_length",
                "open_max",
                "path_cost",
                "path_length",
            ]),
            node_limit: None,
            successors: Vec::new(),
        }
    }
}

impl SearchEngine for AStar {
    fn find_path(&mut self, env: &dyn Environment, start: usize, target: usize) -> SearchOutcome {
        assert!(env.is_valid_node_id(start), "invalid start node {start}");
        assert!(env.is_valid_node_id(target), "invalid target node {target}");

        let start_time = Instant::now();
        self.stats.clear();
        self.path.clear();
        self.path_cost = None;
        let num_nodes = env.num_nodes();
        self.visited.clear();
        self.visited.resize(num_nodes, b' ');
        self.open.init(num_nodes);
        self.closed.init(num_nodes);

        let mut expanded: u64 = 0;
        let mut visited_count: u64 = 0;
        let mut open_max = 0usize;

        let h = env.heuristic(start, target);
        self.open.insert(AStarNode::new(start, NO_PARENT, 0, h));

        let mut successors = std::mem::take(&mut self.successors);
        let outcome = loop {
            self.stats.get_mut("open_length").add(self.open.len() as f64);
            open_max = open_max.max(self.open.len());

            let Some(node) = self.open.pop() else {
                break SearchOutcome::NoPath;
            };
            visited_count += 1;
            self.visited[node.id] = b'+';
            if self.node_limit.is_some_and(|limit| visited_count > limit) {
                break SearchOutcome::Aborted;
            }
            if node.id == target {
                self.closed.add(node);
                break SearchOutcome::Found { cost: node.f };
            }

            expanded += 1;
            env.successors(node.id, None, &mut successors);
            self.stats
                .get_mut("branching_factor")
                .add(successors.len() as f64);
            for s in &successors {
                let new_g = node.g + s.cost;
                let known_g = self
                    .open
                    .get(s.target)
                    .or_else(|| self.closed.get(s.target))
                    .map(|n| n.g);
                if let Some(g) = known_g {
                    if new_g >= g {
                        continue;
                    }
                    // Strictly better: pull it out of wherever it is.
                    if !self.open.remove(s.target) {
                        self.closed.remove(s.target);
                    }
                }
                let h = env.heuristic(s.target, target);
                self.open.insert(AStarNode::new(s.target, node.id, new_g, h));
            }
            self.closed.add(node);
        };
        self.successors = successors;

        if let SearchOutcome::Found { cost } = outcome {
            self.path = self.closed.construct_path(start, target);
            self.path_cost = Some(cost);
            self.stats.get_mut("path_cost").add(cost as f64);
        }
        self.stats
            .get_mut("cpu_time")
            .add(start_time.elapsed().as_secs_f64());
        self.stats.get_mut("nodes_expanded").add(expanded as f64);
        self.stats.get_mut("nodes_visited").add(visited_count as f64);
        self.stats.get_mut("open_max").add(open_max as f64);
        self.stats
            .get_mut("path_length")
            .add(self.path.len() as f64);
        outcome
    }

    fn path(&self) -> &[usize] {
        &self.path
    }

    fn path_cost(&self) -> Option<i32> {
        self.path_cost
    }

    fn visited(&self) -> &[u8] {
        &self.visited
    }

    fn stats(&self) -> &StatsCollection {
        &self.stats
    }

    fn set_node_limit(&mut self, limit: Option<u64>) {
        self.node_limit = limit;
    }
}
