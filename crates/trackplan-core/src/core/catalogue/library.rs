use super::CatalogueError;
use super::hornby::{self, OO_TRACK_WIDTH_MM};
use super::piece::{PieceDefinition, PieceKind, PieceType};
use crate::core::models::ids::PieceKey;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::HashMap;

/// On-disk layout of a custom catalogue.
///
/// ```toml
/// track-width = 16.5
///
/// [[piece]]
/// code = "X100"
/// name = "Short Straight"
/// kind = "straight"
/// length = 100.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CatalogueFile {
    #[serde(default = "default_track_width")]
    pub track_width: f64,
    #[serde(default, rename = "piece")]
    pub pieces: Vec<PieceDefinition>,
}

fn default_track_width() -> f64 {
    OO_TRACK_WIDTH_MM
}

/// A display row for catalogue listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogueRow {
    pub code: String,
    pub name: String,
    pub kind: PieceKind,
    pub run_length: f64,
}

/// Read-only registry of piece types, built once and shared through `Arc`.
///
/// Iteration always follows ascending piece code so that search order does not
/// depend on how the catalogue was assembled.
#[derive(Debug, Clone)]
pub struct Catalogue {
    pieces: SlotMap<PieceKey, PieceType>,
    by_code: HashMap<String, PieceKey>,
    order: Vec<PieceKey>,
    track_width: f64,
}

impl Catalogue {
    pub fn new(track_width: f64) -> Self {
        Self {
            pieces: SlotMap::with_key(),
            by_code: HashMap::new(),
            order: Vec::new(),
            track_width,
        }
    }

    /// The built-in Hornby OO set-track range.
    pub fn hornby() -> Result<Self, CatalogueError> {
        Self::from_definitions(hornby::definitions(), OO_TRACK_WIDTH_MM)
    }

    pub fn from_definitions<I>(definitions: I, track_width: f64) -> Result<Self, CatalogueError>
    where
        I: IntoIterator<Item = PieceDefinition>,
    {
        let mut catalogue = Self::new(track_width);
        for def in definitions {
            catalogue.insert(&def)?;
        }
        Ok(catalogue)
    }

    /// Parses a TOML catalogue; `origin` names the source in error messages.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, CatalogueError> {
        let file: CatalogueFile =
            toml::from_str(content).map_err(|e| CatalogueError::Toml {
                origin: origin.to_string(),
                source: e,
            })?;
        Self::from_definitions(file.pieces, file.track_width)
    }

    pub fn to_toml_string(&self) -> Result<String, CatalogueError> {
        let file = CatalogueFile {
            track_width: self.track_width,
            pieces: self.iter().map(|(_, p)| p.definition()).collect(),
        };
        toml::to_string_pretty(&file).map_err(CatalogueError::Serialize)
    }

    pub fn insert(&mut self, def: &PieceDefinition) -> Result<PieceKey, CatalogueError> {
        if self.by_code.contains_key(&def.code) {
            return Err(CatalogueError::DuplicateCode(def.code.clone()));
        }
        let piece = PieceType::build(def, self.track_width)?;
        let key = self.pieces.insert(piece);
        self.by_code.insert(def.code.clone(), key);
        let pieces = &self.pieces;
        let pos = self
            .order
            .partition_point(|k| pieces[*k].code.as_str() < def.code.as_str());
        self.order.insert(pos, key);
        Ok(key)
    }

    /// A new catalogue restricted to `codes`.
    pub fn subset<S: AsRef<str>>(&self, codes: &[S]) -> Result<Self, CatalogueError> {
        let mut subset = Self::new(self.track_width);
        for code in codes {
            let code = code.as_ref();
            if subset.by_code.contains_key(code) {
                continue;
            }
            let piece = self
                .by_code(code)
                .ok_or_else(|| CatalogueError::UnknownCode(code.to_string()))?;
            subset.insert(&piece.definition())?;
        }
        Ok(subset)
    }

    #[inline]
    pub fn get(&self, key: PieceKey) -> Option<&PieceType> {
        self.pieces.get(key)
    }

    #[inline]
    pub fn key_of(&self, code: &str) -> Option<PieceKey> {
        self.by_code.get(code).copied()
    }

    pub fn by_code(&self, code: &str) -> Option<&PieceType> {
        self.key_of(code).and_then(|k| self.pieces.get(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PieceKey, &PieceType)> {
        self.order.iter().map(move |&k| (k, &self.pieces[k]))
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn track_width(&self) -> f64 {
        self.track_width
    }

    pub fn by_kind(&self, kind: PieceKind) -> Vec<&PieceType> {
        self.iter()
            .map(|(_, p)| p)
            .filter(|p| p.kind == kind)
            .collect()
    }

    pub fn rows(&self) -> Vec<CatalogueRow> {
        self.iter()
            .map(|(_, p)| CatalogueRow {
                code: p.code.clone(),
                name: p.name.clone(),
                kind: p.kind,
                run_length: p.run_length,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hornby_catalogue_contains_the_standard_range() {
        let catalogue = Catalogue::hornby().unwrap();
        assert_eq!(catalogue.len(), 26);
        assert_eq!(catalogue.by_code("R600").unwrap().length, 168.0);
        assert_eq!(catalogue.by_code("R618").unwrap().kind, PieceKind::Buffer);
        assert!(catalogue.by_code("R8078").is_none());
    }

    #[test]
    fn iteration_follows_code_order() {
        let catalogue = Catalogue::hornby().unwrap();
        let codes: Vec<_> = catalogue.iter().map(|(_, p)| p.code.clone()).collect();
        let mut sorted = codes.clone();
        sorted.sort();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let mut catalogue = Catalogue::hornby().unwrap();
        let def = catalogue.by_code("R600").unwrap().definition();
        assert!(matches!(
            catalogue.insert(&def),
            Err(CatalogueError::DuplicateCode(code)) if code == "R600"
        ));
    }

    #[test]
    fn subset_keeps_only_requested_codes() {
        let catalogue = Catalogue::hornby().unwrap();
        let subset = catalogue.subset(&["R606", "R600", "R600"]).unwrap();
        assert_eq!(subset.len(), 2);
        let codes: Vec<_> = subset.iter().map(|(_, p)| p.code.as_str()).collect();
        assert_eq!(codes, vec!["R600", "R606"]);
        assert!(matches!(
            catalogue.subset(&["NOPE"]),
            Err(CatalogueError::UnknownCode(_))
        ));
    }

    #[test]
    fn by_kind_filters_pieces() {
        let catalogue = Catalogue::hornby().unwrap();
        assert_eq!(catalogue.by_kind(PieceKind::Point).len(), 3);
        assert_eq!(catalogue.by_kind(PieceKind::Crossing).len(), 2);
    }

    #[test]
    fn from_toml_str_parses_custom_pieces() {
        let content = r#"
track-width = 20.0

[[piece]]
code = "X1"
name = "Long"
kind = "straight"
length = 500.0

[[piece]]
code = "X2"
name = "Tight"
kind = "curve"
radius = 250.0
angle = 30.0
"#;
        let catalogue = Catalogue::from_toml_str(content, "inline").unwrap();
        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue.track_width(), 20.0);
        assert_eq!(catalogue.by_code("X2").unwrap().kind, PieceKind::Curve);
    }

    #[test]
    fn from_toml_str_reports_unknown_fields() {
        let content = r#"
[[piece]]
code = "X1"
name = "Long"
kind = "straight"
length = 500.0
colour = "red"
"#;
        assert!(matches!(
            Catalogue::from_toml_str(content, "inline"),
            Err(CatalogueError::Toml { origin, .. }) if origin == "inline"
        ));
    }

    #[test]
    fn catalogue_round_trips_through_toml() {
        let catalogue = Catalogue::hornby().unwrap().subset(&["R600", "R8073"]).unwrap();
        let text = catalogue.to_toml_string().unwrap();
        let reloaded = Catalogue::from_toml_str(&text, "round-trip").unwrap();
        assert_eq!(reloaded.rows(), catalogue.rows());
        assert_eq!(
            reloaded.by_code("R8073").unwrap().ports,
            catalogue.by_code("R8073").unwrap().ports
        );
    }
}
