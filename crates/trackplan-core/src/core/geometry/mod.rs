//! Planar geometry for track pieces and boards.
//!
//! Everything here is pure and deterministic. Lengths are millimetres and angles
//! are degrees measured counter-clockwise from +x.

pub mod polygon;
pub mod shapes;
pub mod transform;

pub use nalgebra::Point2;
pub use polygon::Polygon;
pub use shapes::{Aabb, ConvexPart, Footprint, overlaps, within};
pub use transform::{Pose, WorldPort, pose_aligning, ports_align, transform};

use serde::{Deserialize, Serialize};

/// Snapping and overlap tolerances shared by the graph, generator and validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Tolerances {
    /// Maximum distance between two mated ports.
    pub position_eps_mm: f64,
    /// Maximum deviation from exactly opposed headings.
    pub angle_eps_deg: f64,
    /// Penetration depth up to which footprints are considered touching.
    pub overlap_eps_mm: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            position_eps_mm: 3.0,
            angle_eps_deg: 5.0,
            overlap_eps_mm: 1.0,
        }
    }
}
