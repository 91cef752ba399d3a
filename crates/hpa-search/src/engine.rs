//! The search engine contract.

use hpa_core::{Environment, StatsCollection};

/// How a search call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A least-cost path was found.
    Found { cost: i32 },
    /// The search completed without finding a route.
    NoPath,
    /// The node-expansion limit was hit before the search completed.
    Aborted,
}

impl SearchOutcome {
    pub fn is_found(self) -> bool {
        matches!(self, SearchOutcome::Found { .. })
    }

    /// The path cost, if a path was found.
    pub fn cost(self) -> Option<i32> {
        match self {
            SearchOutcome::Found { cost } => Some(cost),
            _ => None,
        }
    }
}

/// A point-to-point search engine.
///
/// Engines own their scratch state and may be reused across sequential
/// calls; each call reports its own statistics.
pub trait SearchEngine {
    /// Find a least-cost path from `start` to `target`.
    ///
    /// Passing an invalid node id is a contract violation and panics.
    fn find_path(&mut self, env: &dyn Environment, start: usize, target: usize) -> SearchOutcome;

    /// The path of the last search, in start→target order (empty unless
    /// the last outcome was [`SearchOutcome::Found`]).
    fn path(&self) -> &[usize];

    /// Cost of the last path, if one was found.
    fn path_cost(&self) -> Option<i32>;

    /// Per-node labels of the last search (`b' '` = not visited);
    /// other values depend on the engine.
    fn visited(&self) -> &[u8];

    /// Statistics of the last search call.
    fn stats(&self) -> &StatsCollection;

    /// Limit the number of node visits per call (`None` = unlimited).
    /// Exceeding the limit aborts the call with
    /// [`SearchOutcome::Aborted`].
    fn set_node_limit(&mut self, limit: Option<u64>);
}
