use crate::core::geometry::{Aabb, Footprint, Polygon, within};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interior points are searched on a grid of this many cells per axis when the
/// centroid falls outside a concave outline.
const INTERIOR_GRID_CELLS: usize = 64;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoardError {
    #[error("{ring} has {count} vertices, at least 3 are required")]
    TooFewVertices { ring: String, count: usize },
    #[error("{ring} has a non-finite coordinate at vertex {index}")]
    NonFiniteCoordinate { ring: String, index: usize },
    #[error("{ring} encloses no area")]
    ZeroArea { ring: String },
    #[error("{ring} is self-intersecting (edges {first} and {second})")]
    SelfIntersecting {
        ring: String,
        first: usize,
        second: usize,
    },
    #[error("Hole {index} does not lie inside the board outline")]
    HoleOutsideBoard { index: usize },
}

/// Unvalidated board input: the outline and optional exclusion holes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardOutline {
    #[serde(default)]
    pub description: String,
    pub polygon: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl BoardOutline {
    pub fn new(polygon: Vec<[f64; 2]>) -> Self {
        Self {
            description: String::new(),
            polygon,
            holes: Vec::new(),
        }
    }

    /// Axis-aligned rectangle with its corner at the origin.
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self {
            description: format!("Rectangle {} x {} mm", fmt_mm(width), fmt_mm(height)),
            polygon: vec![[0.0, 0.0], [width, 0.0], [width, height], [0.0, height]],
            holes: Vec::new(),
        }
    }

    /// L-shaped board: a `long_leg` run along x and a `short_leg` run along y,
    /// both `depth` deep.
    pub fn l_shape(long_leg: f64, short_leg: f64, depth: f64) -> Self {
        Self {
            description: format!(
                "L-shape {} x {} mm, {} mm deep",
                fmt_mm(long_leg),
                fmt_mm(short_leg),
                fmt_mm(depth)
            ),
            polygon: vec![
                [0.0, 0.0],
                [long_leg, 0.0],
                [long_leg, depth],
                [depth, depth],
                [depth, short_leg],
                [0.0, short_leg],
            ],
            holes: Vec::new(),
        }
    }

    pub fn with_hole(mut self, hole: Vec<[f64; 2]>) -> Self {
        self.holes.push(hole);
        self
    }

    /// Translates outline and holes so the minimum coordinate sits at the origin.
    pub fn normalised(&self) -> Self {
        let min_x = self.polygon.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        let min_y = self.polygon.iter().map(|p| p[1]).fold(f64::INFINITY, f64::min);
        if !min_x.is_finite() || !min_y.is_finite() {
            return self.clone();
        }
        let shift = |ring: &[[f64; 2]]| -> Vec<[f64; 2]> {
            ring.iter().map(|p| [p[0] - min_x, p[1] - min_y]).collect()
        };
        Self {
            description: self.description.clone(),
            polygon: shift(&self.polygon),
            holes: self.holes.iter().map(|h| shift(h)).collect(),
        }
    }
}

/// A validated board: simple outline with positive area and holes inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    description: String,
    outline: Polygon,
    holes: Vec<Polygon>,
    area: f64,
}

impl Board {
    pub fn from_outline(input: &BoardOutline) -> Result<Self, BoardError> {
        let outline = validate_ring(&input.polygon, "Board outline")?;
        let mut holes = Vec::with_capacity(input.holes.len());
        for (index, raw) in input.holes.iter().enumerate() {
            let hole = validate_ring(raw, &format!("Hole {}", index))?;
            let inside = hole
                .vertices()
                .iter()
                .all(|v| outline.contains_point(v, 1e-9))
                && !hole.edges().any(|(a, b)| {
                    outline.edges().any(|(c, d)| {
                        crate::core::geometry::polygon::segments_properly_intersect(a, b, c, d)
                    })
                });
            if !inside {
                return Err(BoardError::HoleOutsideBoard { index });
            }
            holes.push(hole);
        }
        let area = outline.area() - holes.iter().map(Polygon::area).sum::<f64>();
        Ok(Self {
            description: input.description.clone(),
            outline,
            holes,
            area,
        })
    }

    pub fn rectangle(width: f64, height: f64) -> Result<Self, BoardError> {
        Self::from_outline(&BoardOutline::rectangle(width, height))
    }

    pub fn l_shape(long_leg: f64, short_leg: f64, depth: f64) -> Result<Self, BoardError> {
        Self::from_outline(&BoardOutline::l_shape(long_leg, short_leg, depth))
    }

    pub fn outline(&self) -> &Polygon {
        &self.outline
    }

    pub fn holes(&self) -> &[Polygon] {
        &self.holes
    }

    /// Usable area: outline minus holes, in mm².
    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.outline.bounds()
    }

    pub fn contains(&self, footprint: &Footprint, eps: f64) -> bool {
        within(footprint, &self.outline, &self.holes, eps)
    }

    /// Whether a point is usable board surface (inside the outline, outside holes).
    pub fn contains_point(&self, point: &Point2<f64>) -> bool {
        self.outline.contains_point_strict(point, 0.0)
            && !self.holes.iter().any(|h| h.contains_point(point, 0.0))
    }

    /// The centroid when it is usable surface, otherwise the usable grid point
    /// closest to it.
    pub fn interior_point(&self) -> Option<Point2<f64>> {
        let bounds = self.bounds()?;
        let target = self.outline.centroid().unwrap_or_else(|| bounds.center());
        if self.contains_point(&target) {
            return Some(target);
        }
        let step = Vector2::new(
            bounds.width() / INTERIOR_GRID_CELLS as f64,
            bounds.height() / INTERIOR_GRID_CELLS as f64,
        );
        let mut best: Option<(f64, Point2<f64>)> = None;
        for i in 0..INTERIOR_GRID_CELLS {
            for j in 0..INTERIOR_GRID_CELLS {
                let p = Point2::new(
                    bounds.min.x + step.x * (i as f64 + 0.5),
                    bounds.min.y + step.y * (j as f64 + 0.5),
                );
                if !self.contains_point(&p) {
                    continue;
                }
                let d = (p - target).norm_squared();
                if best.is_none_or(|(bd, _)| d < bd) {
                    best = Some((d, p));
                }
            }
        }
        best.map(|(_, p)| p)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Human summary including the usable area.
    pub fn describe(&self) -> String {
        let (w, h) = self
            .bounds()
            .map(|b| (b.width(), b.height()))
            .unwrap_or((0.0, 0.0));
        let label = if self.description.is_empty() {
            format!("{}-sided board", self.outline.len())
        } else {
            self.description.clone()
        };
        let holes = match self.holes.len() {
            0 => String::new(),
            1 => ", 1 hole".to_string(),
            n => format!(", {} holes", n),
        };
        format!(
            "{} ({} x {} mm extent, {:.2} m² usable{})",
            label,
            fmt_mm(w),
            fmt_mm(h),
            self.area / 1_000_000.0,
            holes
        )
    }

    /// Converts back to the serialisable outline form.
    pub fn to_outline(&self) -> BoardOutline {
        let ring = |p: &Polygon| p.vertices().iter().map(|v| [v.x, v.y]).collect();
        BoardOutline {
            description: self.description.clone(),
            polygon: ring(&self.outline),
            holes: self.holes.iter().map(ring).collect(),
        }
    }
}

fn validate_ring(raw: &[[f64; 2]], ring: &str) -> Result<Polygon, BoardError> {
    if raw.len() < 3 {
        return Err(BoardError::TooFewVertices {
            ring: ring.to_string(),
            count: raw.len(),
        });
    }
    if let Some(index) = raw.iter().position(|p| !p[0].is_finite() || !p[1].is_finite()) {
        return Err(BoardError::NonFiniteCoordinate {
            ring: ring.to_string(),
            index,
        });
    }
    let polygon = Polygon::from_pairs(raw);
    if polygon.area() <= f64::EPSILON {
        return Err(BoardError::ZeroArea {
            ring: ring.to_string(),
        });
    }
    if let Some((first, second)) = polygon.self_intersection() {
        return Err(BoardError::SelfIntersecting {
            ring: ring.to_string(),
            first,
            second,
        });
    }
    Ok(polygon)
}

fn fmt_mm(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.1}", v)
    }
}
