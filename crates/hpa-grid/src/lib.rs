//! Grid search environment with obstacles.
//!
//! A [`GridMap`] is a rectangular tiling of free and blocked cells with
//! an eagerly built adjacency graph. Four movement models are supported
//! ([`Topology`]): 4-way tiles, octiles with √2 diagonals, octiles with
//! unit-cost diagonals, and hexes. The crate also provides:
//!
//! - the text map format parser and renderers ([`GridMap::from_reader`],
//!   [`GridMap::render`], [`MapError`])
//! - random obstacle scattering ([`GridMap::scatter_obstacles`])
//! - the ray-splice path post-process ([`PathSmoother`])

mod grid;
mod mapfile;
mod smooth;

pub use grid::{GridMap, Topology};
pub use mapfile::{MAX_LINE, MapError};
pub use smooth::{Direction, PathSmoother};
