use crate::core::geometry::Aabb;

/// Aggregate figures of a layout, maintained incrementally by the placement graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutMetrics {
    pub piece_count: usize,
    /// Sum of piece run lengths in mm.
    pub total_length: f64,
    /// Run length contributed by straight pieces.
    pub straight_length: f64,
    /// Sum of footprint areas in mm².
    pub footprint_area: f64,
    /// Independent cycles in the track graph.
    pub loop_count: usize,
    /// Maximal chains of connected straights.
    pub straight_run_count: usize,
    /// Length of the longest such chain in mm.
    pub longest_straight_run: f64,
    pub open_ends: usize,
    pub bounds: Option<Aabb>,
}
