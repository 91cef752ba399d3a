//! Iterative-deepening (IDA*) search.

use std::time::Instant;

use hpa_core::{Environment, StatsCollection, Successor};

use crate::engine::{SearchEngine, SearchOutcome};

/// Hard ceiling on the depth-first recursion; deeper probes fail closed.
const MAX_DEPTH: usize = 10_000;

/// Iterative-deepening search engine.
///
/// Each iteration is a depth-first traversal pruning nodes whose
/// f = g + h exceeds the current bound; the minimum excess becomes the
/// next bound. Per-depth successor buffers are allocated once and
/// reused across iterations.
pub struct IdaStar {
    path: Vec<usize>,
    path_cost: Option<i32>,
    visited: Vec<u8>,
    stats: StatsCollection,
    node_limit: Option<u64>,
    successor_stack: Vec<Vec<Successor>>,
    // per-call state
    target: usize,
    f_limit: i32,
    next_f_limit: i64,
    nodes_expanded: u64,
    nodes_visited: u64,
    aborted: bool,
}

impl Default for IdaStar {
    fn default() -> Self {
        Self::new()
    }
}

impl IdaStar {
    pub fn new() -> Self {
        Self {
            path: Vec::new(),
            path_cost: None,
            visited: Vec::new(),
            stats: StatsCollection::with_names(&[
                "aborted",
                "branching_factor",
                "cpu_time",
                "nodes_expanded",
                "nodes_visited",
                "path_cost",
            ]),
            node_limit: None,
            successor_stack: Vec::new(),
            target: 0,
            f_limit: 0,
            next_f_limit: 0,
            nodes_expanded: 0,
            nodes_visited: 0,
            aborted: false,
        }
    }

    fn iterate(&mut self, env: &dyn Environment, start: usize) {
        let max_f_limit = env.num_nodes() as i64 * env.max_cost() as i64;
        let heuristic = env.heuristic(start, self.target);
        self.f_limit = heuristic;
        let expected_depth = (heuristic / env.min_cost().max(1)) as usize;
        if self.successor_stack.len() < expected_depth {
            self.successor_stack.resize_with(expected_depth, Vec::new);
        }
        let mut iteration = 0;
        loop {
            log::trace!("f-limit {}", self.f_limit);
            self.next_f_limit = i64::MAX;
            self.dfs(env, iteration, start, None, 0, 0);
            if !self.path.is_empty() || self.aborted {
                break;
            }
            if self.next_f_limit > max_f_limit {
                break; // no path below the cost of visiting every node
            }
            self.f_limit = self.next_f_limit as i32;
            iteration += 1;
        }
    }

    /// One depth-first probe. Returns true once the target is reached;
    /// the path is collected on the way back up.
    fn dfs(
        &mut self,
        env: &dyn Environment,
        iteration: u32,
        node: usize,
        last: Option<usize>,
        depth: usize,
        g: i32,
    ) -> bool {
        self.nodes_visited += 1;
        if self.visited[node] == b' ' {
            self.visited[node] = iteration_label(iteration);
        }
        if self.node_limit.is_some_and(|limit| self.nodes_visited > limit) {
            self.aborted = true;
            return false;
        }
        if depth >= MAX_DEPTH {
            return false; // fail closed rather than exhaust the stack
        }
        let f = g + env.heuristic(node, self.target);
        if f > self.f_limit {
            self.next_f_limit = self.next_f_limit.min(f as i64);
            return false;
        }
        if node == self.target {
            self.path_cost = Some(f);
            self.stats.get_mut("path_cost").add(f as f64);
            self.path.push(node);
            return true;
        }

        self.nodes_expanded += 1;
        if self.successor_stack.len() < depth + 1 {
            self.successor_stack.resize_with(depth + 1, Vec::new);
        }
        let mut successors = std::mem::take(&mut self.successor_stack[depth]);
        env.successors(node, last, &mut successors);
        self.stats
            .get_mut("branching_factor")
            .add(successors.len() as f64);

        let found = 'probe: {
            for &successor in &successors {
                if Some(successor.target) == last {
                    continue;
                }
                if self.dfs(
                    env,
                    iteration,
                    successor.target,
                    Some(node),
                    depth + 1,
                    g + successor.cost,
                ) {
                    self.path.push(node);
                    break 'probe true;
                }
                if self.aborted {
                    break 'probe false;
                }
            }
            false
        };
        self.successor_stack[depth] = successors;
        found
    }
}

fn iteration_label(iteration: u32) -> u8 {
    match iteration {
        0..=9 => b'0' + iteration as u8,
        10..=35 => b'a' + (iteration - 10) as u8,
        _ => b'+',
    }
}

impl SearchEngine for IdaStar {
    fn find_path(&mut self, env: &dyn Environment, start: usize, target: usize) -> SearchOutcome {
        assert!(env.is_valid_node_id(start), "invalid start node {start}");
        assert!(env.is_valid_node_id(target), "invalid target node {target}");

        let start_time = Instant::now();
        self.stats.clear();
        self.path.clear();
        self.path_cost = None;
        self.aborted = false;
        self.nodes_expanded = 0;
        self.nodes_visited = 0;
        self.target = target;
        self.visited.clear();
        self.visited.resize(env.num_nodes(), b' ');

        self.iterate(env, start);
        // The probe collects the path on unwind, target first.
        self.path.reverse();

        self.stats
            .get_mut("aborted")
            .add(if self.aborted { 1.0 } else { 0.0 });
        self.stats
            .get_mut("cpu_time")
            .add(start_time.elapsed().as_secs_f64());
        self.stats
            .get_mut("nodes_expanded")
            .add(self.nodes_expanded as f64);
        self.stats
            .get_mut("nodes_visited")
            .add(self.nodes_visited as f64);

        if self.aborted {
            self.path.clear();
            self.path_cost = None;
            SearchOutcome::Aborted
        } else if let Some(cost) = self.path_cost {
            SearchOutcome::Found { cost }
        } else {
            SearchOutcome::NoPath
        }
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
