use super::CatalogueError;
use crate::core::geometry::{ConvexPart, Footprint};
use crate::core::geometry::transform::{angle_difference, normalize_degrees};
use nalgebra::{Point2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Connector tag carried by every built-in set-track port.
pub const DEFAULT_CONNECTOR: &str = "oo-setrack";

/// Curves are tessellated so that no footprint segment spans more than this.
const MAX_SEGMENT_SWEEP_DEG: f64 = 7.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PieceKind {
    Straight,
    Curve,
    Point,
    Crossing,
    Buffer,
}

impl PieceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::Straight => "straight",
            PieceKind::Curve => "curve",
            PieceKind::Point => "point",
            PieceKind::Crossing => "crossing",
            PieceKind::Buffer => "buffer",
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PieceKind {
    type Err = CatalogueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "straight" => Ok(PieceKind::Straight),
            "curve" => Ok(PieceKind::Curve),
            "point" | "turnout" => Ok(PieceKind::Point),
            "crossing" | "crossover" => Ok(PieceKind::Crossing),
            "buffer" => Ok(PieceKind::Buffer),
            other => Err(CatalogueError::InvalidPiece {
                code: String::new(),
                reason: format!("unknown piece kind '{}'", other),
            }),
        }
    }
}

/// Which way the diverging road of a point leaves the straight road.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Divergence {
    #[default]
    Left,
    Right,
    /// Both roads diverge symmetrically by half the frog angle.
    Wye,
}

/// The serialisable description of a piece type, as found in catalogue files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PieceDefinition {
    pub code: String,
    pub name: String,
    pub kind: PieceKind,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divergence: Option<Divergence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "default_connector")]
    pub connector: String,
}

fn default_connector() -> String {
    DEFAULT_CONNECTOR.to_string()
}

/// A connection point in the piece's local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub offset: Point2<f64>,
    /// Outward heading in degrees.
    pub heading: f64,
    pub connector: String,
}

/// An immutable catalogue entry with its derived geometry.
///
/// Straights, points, crossings and buffers are centred on the origin with the
/// running axis along +x. Curves have their origin at the arc centre and the arc
/// is symmetric about +x.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceType {
    pub code: String,
    pub name: String,
    pub kind: PieceKind,
    pub length: f64,
    pub radius: f64,
    pub angle: f64,
    pub divergence: Option<Divergence>,
    pub notes: Option<String>,
    pub ports: Vec<Port>,
    pub routes: Vec<(usize, usize)>,
    pub footprint: Footprint,
    pub run_length: f64,
    /// Mirroring the piece reproduces the same port set.
    pub mirror_symmetric: bool,
}

impl PieceType {
    pub fn build(def: &PieceDefinition, track_width: f64) -> Result<Self, CatalogueError> {
        let invalid = |reason: String| CatalogueError::InvalidPiece {
            code: def.code.clone(),
            reason,
        };

        if def.code.trim().is_empty() {
            return Err(invalid("piece code must not be empty".into()));
        }
        if !(def.length.is_finite() && def.radius.is_finite() && def.angle.is_finite()) {
            return Err(invalid("dimensions must be finite".into()));
        }
        if !(track_width.is_finite() && track_width > 0.0) {
            return Err(invalid(format!("track width {} must be positive", track_width)));
        }

        let half_width = track_width / 2.0;
        let connector = def.connector.as_str();

        let (ports, routes, parts, run_length) = match def.kind {
            PieceKind::Straight => {
                if def.length <= 0.0 {
                    return Err(invalid("straight length must be positive".into()));
                }
                let half = def.length / 2.0;
                let ports = vec![
                    port(-half, 0.0, 180.0, connector),
                    port(half, 0.0, 0.0, connector),
                ];
                let parts = vec![rectangle(def.length, track_width, 0.0)];
                (ports, vec![(0, 1)], parts, def.length)
            }
            PieceKind::Curve => {
                if def.radius <= half_width {
                    return Err(invalid(format!(
                        "curve radius {} must exceed half the track width",
                        def.radius
                    )));
                }
                if def.angle <= 0.0 || def.angle > 180.0 {
                    return Err(invalid(format!(
                        "curve angle {} must be in (0, 180]",
                        def.angle
                    )));
                }
                let half_sweep = def.angle / 2.0;
                let start = polar(def.radius, -half_sweep);
                let end = polar(def.radius, half_sweep);
                let ports = vec![
                    port(start.x, start.y, -half_sweep - 90.0, connector),
                    port(end.x, end.y, half_sweep + 90.0, connector),
                ];
                let parts = annular_sector(
                    Point2::origin(),
                    def.radius,
                    -half_sweep,
                    def.angle,
                    half_width,
                );
                let run = 2.0 * std::f64::consts::PI * def.radius * def.angle / 360.0;
                (ports, vec![(0, 1)], parts, run)
            }
            PieceKind::Point => {
                if def.length <= 0.0 {
                    return Err(invalid("point length must be positive".into()));
                }
                if def.angle <= 0.0 || def.angle >= 90.0 {
                    return Err(invalid(format!(
                        "point angle {} must be in (0, 90)",
                        def.angle
                    )));
                }
                point_geometry(def, track_width, connector)
            }
            PieceKind::Crossing => {
                if def.length <= 0.0 {
                    return Err(invalid("crossing length must be positive".into()));
                }
                if def.angle <= 0.0 || def.angle > 90.0 {
                    return Err(invalid(format!(
                        "crossing angle {} must be in (0, 90]",
                        def.angle
                    )));
                }
                let half = def.length / 2.0;
                let rot = Rotation2::new(def.angle.to_radians());
                let b0 = rot * Point2::new(-half, 0.0);
                let b1 = rot * Point2::new(half, 0.0);
                let ports = vec![
                    port(-half, 0.0, 180.0, connector),
                    port(half, 0.0, 0.0, connector),
                    port(b0.x, b0.y, 180.0 + def.angle, connector),
                    port(b1.x, b1.y, def.angle, connector),
                ];
                let parts = vec![
                    rectangle(def.length, track_width, 0.0),
                    rectangle(def.length, track_width, def.angle),
                ];
                (ports, vec![(0, 1), (2, 3)], parts, def.length)
            }
            PieceKind::Buffer => {
                if def.length <= 0.0 {
                    return Err(invalid("buffer length must be positive".into()));
                }
                let ports = vec![port(-def.length / 2.0, 0.0, 180.0, connector)];
                let parts = vec![rectangle(def.length, track_width, 0.0)];
                (ports, Vec::new(), parts, def.length)
            }
        };

        let mirror_symmetric = is_mirror_symmetric(&ports);

        Ok(Self {
            code: def.code.clone(),
            name: def.name.clone(),
            kind: def.kind,
            length: def.length,
            radius: def.radius,
            angle: def.angle,
            divergence: match def.kind {
                PieceKind::Point => Some(def.divergence.unwrap_or_default()),
                _ => None,
            },
            notes: def.notes.clone(),
            ports,
            routes,
            footprint: Footprint::new(parts),
            run_length,
            mirror_symmetric,
        })
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn is_straight(&self) -> bool {
        self.kind == PieceKind::Straight
    }

    /// The definition this piece was built from.
    pub fn definition(&self) -> PieceDefinition {
        PieceDefinition {
            code: self.code.clone(),
            name: self.name.clone(),
            kind: self.kind,
            length: self.length,
            radius: self.radius,
            angle: self.angle,
            divergence: self.divergence,
            notes: self.notes.clone(),
            connector: self
                .ports
                .first()
                .map(|p| p.connector.clone())
                .unwrap_or_else(default_connector),
        }
    }
}

type Geometry = (Vec<Port>, Vec<(usize, usize)>, Vec<ConvexPart>, f64);

fn point_geometry(def: &PieceDefinition, track_width: f64, connector: &str) -> Geometry {
    let half = def.length / 2.0;
    let half_width = track_width / 2.0;
    let toe = Point2::new(-half, 0.0);
    let divergence = def.divergence.unwrap_or_default();

    // Diverging roads leave the toe tangentially and end level with the straight
    // exit, which fixes their radius.
    let branch = |turn_deg: f64| -> (Port, Vec<ConvexPart>) {
        let radius = def.length / turn_deg.abs().to_radians().sin();
        let side = turn_deg.signum();
        let centre = Point2::new(-half, side * radius);
        let start = -side * 90.0;
        let exit = Point2::new(
            -half + radius * turn_deg.abs().to_radians().sin(),
            side * radius * (1.0 - turn_deg.to_radians().cos()),
        );
        let parts = annular_sector(centre, radius, start, turn_deg, half_width);
        (port(exit.x, exit.y, turn_deg, connector), parts)
    };

    let mut ports = vec![port(toe.x, toe.y, 180.0, connector)];
    let mut parts = Vec::new();
    match divergence {
        Divergence::Left | Divergence::Right => {
            let sign = if divergence == Divergence::Left { 1.0 } else { -1.0 };
            ports.push(port(half, 0.0, 0.0, connector));
            parts.push(rectangle(def.length, track_width, 0.0));
            let (diverging, arc) = branch(sign * def.angle);
            ports.push(diverging);
            parts.extend(arc);
        }
        Divergence::Wye => {
            for sign in [1.0, -1.0] {
                let (exit, arc) = branch(sign * def.angle / 2.0);
                ports.push(exit);
                parts.extend(arc);
            }
        }
    }
    (ports, vec![(0, 1), (0, 2)], parts, def.length)
}

fn port(x: f64, y: f64, heading: f64, connector: &str) -> Port {
    Port {
        offset: Point2::new(x, y),
        heading: normalize_degrees(heading),
        connector: connector.to_string(),
    }
}

fn polar(radius: f64, angle_deg: f64) -> Point2<f64> {
    let a = angle_deg.to_radians();
    Point2::new(radius * a.cos(), radius * a.sin())
}

/// Rectangle centred on the origin, `length` along its axis, rotated by `angle_deg`.
fn rectangle(length: f64, width: f64, angle_deg: f64) -> ConvexPart {
    let rot = Rotation2::new(angle_deg.to_radians());
    let (hl, hw) = (length / 2.0, width / 2.0);
    ConvexPart::new(
        [(-hl, -hw), (hl, -hw), (hl, hw), (-hl, hw)]
            .iter()
            .map(|&(x, y)| Point2::from(rot * Vector2::new(x, y)))
            .collect(),
    )
}

/// Splits a band of half-width `half_width` around an arc into convex quads.
///
/// The arc starts at polar angle `start_deg` about `centre` and sweeps
/// `sweep_deg` (negative for clockwise).
fn annular_sector(
    centre: Point2<f64>,
    radius: f64,
    start_deg: f64,
    sweep_deg: f64,
    half_width: f64,
) -> Vec<ConvexPart> {
    let segments = (sweep_deg.abs() / MAX_SEGMENT_SWEEP_DEG).ceil().max(1.0) as usize;
    let step = sweep_deg / segments as f64;
    let inner = radius - half_width;
    let outer = radius + half_width;
    (0..segments)
        .map(|i| {
            let a = start_deg + step * i as f64;
            let b = a + step;
            ConvexPart::new(vec![
                centre + polar(inner, a).coords,
                centre + polar(outer, a).coords,
                centre + polar(outer, b).coords,
                centre + polar(inner, b).coords,
            ])
        })
        .collect()
}

fn is_mirror_symmetric(ports: &[Port]) -> bool {
    ports.iter().all(|p| {
        let mirrored = Point2::new(p.offset.x, -p.offset.y);
        let heading = -p.heading;
        ports.iter().any(|q| {
            (q.offset - mirrored).norm() < 1e-6
                && angle_difference(q.heading, heading).abs() < 1e-6
                && q.connector == p.connector
        })
    })
}
