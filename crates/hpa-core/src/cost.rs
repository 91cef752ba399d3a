//! Fixed-point movement costs.
//!
//! Costs are integers scaled by 100 so that diagonal steps stay exact:
//! one orthogonal step costs [`COST_ONE`], one diagonal step costs
//! [`COST_SQRT2`] (≈ √2 · 100).

/// Cost of one orthogonal step.
pub const COST_ONE: i32 = 100;

/// Cost of one diagonal step (√2 in fixed-point).
pub const COST_SQRT2: i32 = 142;

/// Sentinel distance for "no route exists". Never stored as an edge cost.
pub const UNREACHABLE: i32 = i32::MAX;
