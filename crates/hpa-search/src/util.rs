//! Search helpers shared by drivers and the abstraction builder.

use hpa_core::{Environment, Successor};
use rand::{Rng, RngExt};

/// Reusable scratch for reachability queries and random pair drawing.
#[derive(Default)]
pub struct SearchUtils {
    mark: Vec<bool>,
    stack: Vec<usize>,
    successors: Vec<Successor>,
}

impl SearchUtils {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any route connects `start` to `target`.
    ///
    /// Depth-first flood fill over an explicit stack; cheaper than a
    /// full search when only existence matters.
    pub fn path_exists(&mut self, env: &dyn Environment, start: usize, target: usize) -> bool {
        assert!(env.is_valid_node_id(start), "invalid start node {start}");
        assert!(env.is_valid_node_id(target), "invalid target node {target}");
        self.mark.clear();
        self.mark.resize(env.num_nodes(), false);
        self.stack.clear();
        self.stack.push(start);
        self.mark[start] = true;
        while let Some(node) = self.stack.pop() {
            if node == target {
                return true;
            }
            env.successors(node, None, &mut self.successors);
            for i in 0..self.successors.len() {
                let next = self.successors[i].target;
                if !self.mark[next] {
                    self.mark[next] = true;
                    self.stack.push(next);
                }
            }
        }
        false
    }

    /// Draw a uniformly random connected (start, target) pair.
    ///
    /// Keeps drawing until the two cells are distinct and a route exists
    /// between them; the environment must contain at least one connected
    /// pair or this never returns.
    pub fn random_connected_pair(
        &mut self,
        env: &dyn Environment,
        rng: &mut impl Rng,
    ) -> (usize, usize) {
        let num_nodes = env.num_nodes();
        loop {
            let start = rng.random_range(0..num_nodes);
            let target = rng.random_range(0..num_nodes);
            if start != target && self.path_exists(env, start, target) {
                return (start, target);
            }
        }
    }
}
