//! Piece catalogue: the track pieces a layout can be built from.
//!
//! A [`Catalogue`] is assembled either from the built-in Hornby OO range or
//! from TOML definitions, and derives ports, routes and footprints for every
//! entry up front.

pub mod hornby;
pub mod library;
pub mod piece;

pub use library::{Catalogue, CatalogueFile, CatalogueRow};
pub use piece::{Divergence, PieceDefinition, PieceKind, PieceType, Port};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("TOML parsing error for '{origin}': {source}")]
    Toml {
        origin: String,
        source: toml::de::Error,
    },
    #[error("Failed to serialize catalogue: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Duplicate piece code '{0}'")]
    DuplicateCode(String),
    #[error("Unknown piece code '{0}'")]
    UnknownCode(String),
    #[error("Invalid definition for piece '{code}': {reason}")]
    InvalidPiece { code: String, reason: String },
}
