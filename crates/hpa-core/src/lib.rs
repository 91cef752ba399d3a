//! Core types for hierarchical grid pathfinding.
//!
//! This crate holds the pieces shared by every layer of the engine:
//!
//! - [`Point`] / [`Range`] integer geometry
//! - [`Graph`], a dense-array adjacency-list graph used both for the
//!   low-level grid and for the abstract cluster graph
//! - the [`Environment`] capability trait that search engines operate
//!   through (heuristic, successor generation, validity)
//! - fixed-point cost constants ([`COST_ONE`], [`COST_SQRT2`]) and the
//!   [`UNREACHABLE`] sentinel
//! - [`Statistics`] / [`StatsCollection`] mean-variance accumulators fed
//!   by searches and builders

mod cost;
mod env;
mod geom;
mod graph;
mod stats;

pub use cost::{COST_ONE, COST_SQRT2, UNREACHABLE};
pub use env::{Environment, Successor};
pub use geom::{Point, Range, RangeIter};
pub use graph::{Edge, Graph};
pub use stats::{Statistics, StatsCollection};
