use super::piece::{Divergence, PieceDefinition, PieceKind};
use phf::{Map, phf_map};

/// OO gauge, the width used for built-in footprints.
pub const OO_TRACK_WIDTH_MM: f64 = 16.5;

pub struct BuiltinPiece {
    pub name: &'static str,
    pub kind: PieceKind,
    pub length: f64,
    pub radius: f64,
    pub angle: f64,
    pub divergence: Option<Divergence>,
    pub notes: Option<&'static str>,
}

const fn straight(name: &'static str, length: f64, notes: Option<&'static str>) -> BuiltinPiece {
    BuiltinPiece {
        name,
        kind: PieceKind::Straight,
        length,
        radius: 0.0,
        angle: 0.0,
        divergence: None,
        notes,
    }
}

const fn curve(name: &'static str, radius: f64, angle: f64, notes: Option<&'static str>) -> BuiltinPiece {
    BuiltinPiece {
        name,
        kind: PieceKind::Curve,
        length: 0.0,
        radius,
        angle,
        divergence: None,
        notes,
    }
}

const fn point(name: &'static str, radius: f64, divergence: Divergence) -> BuiltinPiece {
    BuiltinPiece {
        name,
        kind: PieceKind::Point,
        length: 168.0,
        radius,
        angle: 12.0,
        divergence: Some(divergence),
        notes: None,
    }
}

const fn crossing(name: &'static str, length: f64, angle: f64) -> BuiltinPiece {
    BuiltinPiece {
        name,
        kind: PieceKind::Crossing,
        length,
        radius: 0.0,
        angle,
        divergence: None,
        notes: None,
    }
}

/// Hornby OO set-track range. Curved points and slips are not modelled.
#[rustfmt::skip]
pub static HORNBY_OO: Map<&'static str, BuiltinPiece> = phf_map! {
    // Straights
    "R600"  => straight("Standard Straight", 168.0, None),
    "R601"  => straight("Double Straight", 335.5, None),
    "R602"  => straight("Short Straight", 112.0, None),
    "R603"  => straight("Half Straight", 83.5, None),
    "R604"  => straight("Quarter Straight", 41.75, None),
    "R605"  => straight("Power Track", 168.0, Some("Insulated, power feed")),
    "R617"  => straight("Level Crossing", 168.0, None),
    "R622"  => straight("Isolating Track", 168.0, None),
    "R8201" => straight("Power Track (DCC)", 168.0, None),
    "R8202" => straight("Link Wire Track", 168.0, None),

    // Curves
    "R606"  => curve("1st Radius Curve (45°)", 371.0, 45.0, None),
    "R607"  => curve("2nd Radius Curve (45°)", 438.0, 45.0, None),
    "R608"  => curve("3rd Radius Curve (45°)", 505.0, 45.0, None),
    "R609"  => curve("4th Radius Curve (45°)", 572.0, 45.0, None),
    "R610"  => curve("1st Radius Curve (22.5°)", 371.0, 22.5, None),
    "R611"  => curve("2nd Radius Curve (22.5°)", 438.0, 22.5, None),
    "R612"  => curve("3rd Radius Curve (22.5°)", 505.0, 22.5, None),
    "R613"  => curve("4th Radius Curve (22.5°)", 572.0, 22.5, None),
    "R615"  => curve("Double Curve (22.5°)", 438.0, 22.5, Some("Superelevated")),
    "R620"  => curve("Half Curve (22.5°)", 371.0, 22.5, None),

    // Points
    "R8072" => point("Left-hand Point", 438.0, Divergence::Left),
    "R8073" => point("Right-hand Point", 438.0, Divergence::Right),
    "R8074" => point("Y Point", 505.0, Divergence::Wye),

    // Crossings
    "R614"  => crossing("90° Crossing", 168.0, 90.0),
    "R8077" => crossing("Diamond Crossing (12°)", 185.0, 12.0),

    // Terminators
    "R618"  => BuiltinPiece {
        name: "Buffer Stop",
        kind: PieceKind::Buffer,
        length: 30.0,
        radius: 0.0,
        angle: 0.0,
        divergence: None,
        notes: None,
    },
};

/// Built-in definitions sorted by code.
pub fn definitions() -> Vec<PieceDefinition> {
    let mut defs: Vec<PieceDefinition> = HORNBY_OO
        .entries()
        .map(|(code, piece)| PieceDefinition {
            code: (*code).to_string(),
            name: piece.name.to_string(),
            kind: piece.kind,
            length: piece.length,
            radius: piece.radius,
            angle: piece.angle,
            divergence: piece.divergence,
            notes: piece.notes.map(str::to_string),
            connector: super::piece::DEFAULT_CONNECTOR.to_string(),
        })
        .collect();
    defs.sort_by(|a, b| a.code.cmp(&b.code));
    defs
}
