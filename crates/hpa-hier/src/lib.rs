//! Cluster abstraction and multi-level ("hierarchical") search.
//!
//! A grid is partitioned once into fixed-size clusters; crossable
//! boundary runs between adjacent clusters become *entrances* whose
//! crossing points form an abstract graph ([`AbsGraph`]). Coarser
//! levels add edges between nodes sharing progressively larger cluster
//! windows. Per query, the start and target cells are inserted as
//! *transient* abstract nodes, searched coarse-to-fine, expanded back
//! to a low-level path, and removed again — leaving the permanent
//! structure untouched.
//!
//! Build with [`build_abstraction`], query with [`run_query`].

mod abs_graph;
mod builder;
mod cluster;
mod entrance;
mod runner;

pub use abs_graph::{AbsEdgeInfo, AbsGraph, AbsNodeInfo, QuerySlot};
pub use builder::{AbsConfig, EntranceStyle, build_abstraction};
pub use cluster::{Cluster, LocalEntrance};
pub use entrance::{Entrance, Orientation};
pub use runner::{QueryResult, run_query};
