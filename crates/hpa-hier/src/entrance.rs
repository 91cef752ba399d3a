//! Entrances: crossable boundary runs between adjacent clusters.

use hpa_core::Point;

/// Which cluster boundary an entrance straddles.
///
/// The diagonal variants describe crossings through a blocked diagonal
/// pair at a boundary; they are detected only when explicitly enabled
/// and are off by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Boundary between a cluster and the one below it.
    Horizontal,
    /// Boundary between a cluster and the one to its right.
    Vertical,
    HDiag1,
    HDiag2,
    VDiag1,
    VDiag2,
}

/// A crossable run on one cluster boundary.
///
/// `center1` is the crossing cell on the first (upper or left) cluster;
/// the matching cell on the second cluster is derived from the
/// orientation.
#[derive(Debug, Clone)]
pub struct Entrance {
    pub id: usize,
    pub cluster1_id: usize,
    pub cluster2_id: usize,
    /// Crossing cell on the first cluster, in map coordinates.
    pub center1: Point,
    /// Grid node id of `center1`.
    pub center1_id: usize,
    /// Grid node id of the matching cell on the second cluster.
    pub center2_id: usize,
    /// Number of cell-pairs in the run this entrance represents.
    pub length: i32,
    pub orientation: Orientation,
}

impl Entrance {
    /// Crossing cell on the second cluster, in map coordinates.
    pub fn center2(&self) -> Point {
        let c = self.center1;
        match self.orientation {
            Orientation::Horizontal => Point::new(c.x, c.y + 1),
            Orientation::Vertical => Point::new(c.x + 1, c.y),
            Orientation::HDiag1 => Point::new(c.x + 1, c.y + 1),
            Orientation::HDiag2 => Point::new(c.x - 1, c.y + 1),
            Orientation::VDiag1 => Point::new(c.x + 1, c.y + 1),
            Orientation::VDiag2 => Point::new(c.x + 1, c.y - 1),
        }
    }

    /// Per-step crossing cost class: straight boundaries cross with an
    /// orthogonal step, diagonal ones with a diagonal step.
    pub fn is_diagonal(&self) -> bool {
        !matches!(
            self.orientation,
            Orientation::Horizontal | Orientation::Vertical
        )
    }
}
