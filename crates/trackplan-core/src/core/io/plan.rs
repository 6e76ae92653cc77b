use crate::core::catalogue::Catalogue;
use crate::core::models::board::BoardOutline;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid plan JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Layout JSON must contain a list of placements")]
    MissingPlacements,
    #[error("No valid placements were found among {count} entries")]
    NoValidPlacements { count: usize },
    #[error("Malformed board section: {0}")]
    InvalidBoard(String),
}

/// One placed piece as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub id: String,
    pub code: String,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    #[serde(default)]
    pub flipped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardRecord {
    #[serde(default)]
    pub description: String,
    pub polygon: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<[f64; 2]>>,
    /// Display rotation of the board, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Value>,
}

impl BoardRecord {
    pub fn from_outline(outline: &BoardOutline) -> Self {
        Self {
            description: outline.description.clone(),
            polygon: outline.polygon.clone(),
            holes: outline.holes.clone(),
            orientation: None,
        }
    }

    pub fn to_outline(&self) -> BoardOutline {
        BoardOutline {
            description: self.description.clone(),
            polygon: self.polygon.clone(),
            holes: self.holes.clone(),
        }
    }
}

/// The persisted plan, in the JSON shape the planner front end reads and writes.
///
/// `zoom`, `circles` and the board's `orientation` belong to the drawing surface
/// and are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanDocument {
    pub placements: Vec<PlacementRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub circles: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<Value>,
}

impl PlanDocument {
    pub fn read_from(reader: impl Read) -> Result<Self, PlanError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Reads any payload the planner has ever written, see [`normalise_payload`].
    pub fn read_lenient(reader: impl Read) -> Result<Self, PlanError> {
        let value: Value = serde_json::from_reader(reader)?;
        Ok(normalise_payload(&value)?.into_document())
    }

    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), PlanError> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn to_json_string_pretty(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A guide circle drawn on the planning canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideCircle {
    pub id: String,
    pub radius: f64,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Result of lenient import.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalisedPayload {
    pub placements: Vec<PlacementRecord>,
    /// Raw circle entries, kept for pass-through.
    pub raw_circles: Vec<Value>,
    /// Circles that could be read, with defaults filled in.
    pub circles: Vec<GuideCircle>,
    pub zoom: Option<Value>,
    pub board: Option<BoardRecord>,
}

impl NormalisedPayload {
    pub fn into_document(self) -> PlanDocument {
        PlanDocument {
            placements: self.placements,
            circles: self.raw_circles,
            board: self.board,
            zoom: self.zoom,
        }
    }
}

/// Leniently extracts placements from a parsed payload.
///
/// Accepts a bare list or an object with `placements`. Numbers may be given as
/// strings; unreadable numbers become zero. Entries without a code are skipped
/// and a missing id becomes `placement-<index>`.
pub fn normalise_payload(value: &Value) -> Result<NormalisedPayload, PlanError> {
    let (items, object) = match value {
        Value::Array(items) => (items, None),
        Value::Object(map) => match map.get("placements") {
            Some(Value::Array(items)) => (items, Some(map)),
            _ => return Err(PlanError::MissingPlacements),
        },
        _ => return Err(PlanError::MissingPlacements),
    };

    let placements: Vec<PlacementRecord> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let entry = item.as_object()?;
            let code = entry.get("code")?.as_str().filter(|c| !c.is_empty())?;
            let id = entry
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("placement-{}", idx));
            Some(PlacementRecord {
                id,
                code: code.to_string(),
                x: lenient_f64(entry.get("x")),
                y: lenient_f64(entry.get("y")),
                rotation: lenient_f64(entry.get("rotation")),
                flipped: entry.get("flipped").is_some_and(truthy),
            })
        })
        .collect();

    if !items.is_empty() && placements.is_empty() {
        return Err(PlanError::NoValidPlacements { count: items.len() });
    }

    let mut payload = NormalisedPayload {
        placements,
        ..Default::default()
    };

    if let Some(map) = object {
        if let Some(Value::Array(circles)) = map.get("circles") {
            payload.raw_circles = circles.clone();
            payload.circles = circles
                .iter()
                .enumerate()
                .filter_map(|(idx, c)| guide_circle(idx, c))
                .collect();
        }
        payload.zoom = map.get("zoom").filter(|z| !z.is_null()).cloned();
        if let Some(board) = map.get("board").filter(|b| !b.is_null()) {
            payload.board = Some(
                serde_json::from_value(board.clone())
                    .map_err(|e| PlanError::InvalidBoard(e.to_string()))?,
            );
        }
    }

    Ok(payload)
}

fn guide_circle(idx: usize, value: &Value) -> Option<GuideCircle> {
    let entry = value.as_object()?;
    let radius = lenient_f64(entry.get("radius"));
    if radius <= 0.0 {
        return None;
    }
    let text = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Some(GuideCircle {
        id: text("id").unwrap_or_else(|| format!("circle-{}", idx)),
        radius,
        x: lenient_f64(entry.get("x")),
        y: lenient_f64(entry.get("y")),
        color: text("color"),
        label: text("label"),
    })
}

fn lenient_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// Piece counts of a plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Inventory {
    pub counts: BTreeMap<String, usize>,
    pub total_pieces: usize,
    /// Sum of run lengths of the pieces the catalogue knows.
    pub total_run_length: f64,
    /// Codes not present in the catalogue.
    pub unknown_codes: Vec<String>,
}

impl Inventory {
    pub fn from_records(records: &[PlacementRecord], catalogue: &Catalogue) -> Self {
        let mut inventory = Inventory::default();
        for record in records {
            *inventory.counts.entry(record.code.clone()).or_insert(0) += 1;
            inventory.total_pieces += 1;
            match catalogue.by_code(&record.code) {
                Some(piece) => inventory.total_run_length += piece.run_length,
                None => {
                    if !inventory.unknown_codes.contains(&record.code) {
                        inventory.unknown_codes.push(record.code.clone());
                    }
                }
            }
        }
        inventory
    }

    pub fn unique_items(&self) -> usize {
        self.counts.len()
    }
}
