//! The per-query cycle: insert, search, expand, remove.

use hpa_grid::GridMap;
use hpa_search::SearchEngine;

use crate::abs_graph::{AbsGraph, QuerySlot};

/// Result of one hierarchical query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Abstract node ids of the refined level-1 path (empty if none).
    pub abs_path: Vec<usize>,
    /// Low-level grid node ids, start→target (empty if no route).
    pub path: Vec<usize>,
    /// Cost of `path`, `None` when no route exists.
    pub cost: Option<i32>,
}

impl QueryResult {
    fn no_path() -> Self {
        Self {
            abs_path: Vec::new(),
            path: Vec::new(),
            cost: None,
        }
    }
}

/// Run one point-to-point query through the abstraction.
///
/// Inserts transient nodes for the start and target cells, searches
/// coarse-to-fine, expands to a grid path, and removes the transient
/// nodes in LIFO order — the permanent abstraction is left exactly as
/// it was. Queries must run one at a time against an [`AbsGraph`].
pub fn run_query(
    abs: &mut AbsGraph,
    grid: &GridMap,
    engine: &mut dyn SearchEngine,
    start_cell: usize,
    target_cell: usize,
) -> QueryResult {
    if start_cell == target_cell {
        return QueryResult {
            abs_path: Vec::new(),
            path: vec![start_cell],
            cost: Some(0),
        };
    }

    let start_abs = abs.insert_transient(start_cell, QuerySlot::Start);
    let target_abs = abs.insert_transient(target_cell, QuerySlot::Target);

    let result = match abs.hierarchical_search(engine, start_abs, target_abs) {
        Some(abs_path) => {
            let path = abs.to_grid_path(&abs_path);
            let cost = grid.path_cost(&path);
            QueryResult {
                abs_path,
                path,
                cost: Some(cost),
            }
        }
        None => QueryResult::no_path(),
    };

    abs.remove_transient(target_abs, QuerySlot::Target);
    abs.remove_transient(start_abs, QuerySlot::Start);
    result
}
