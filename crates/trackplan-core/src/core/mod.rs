//! # Core Module
//!
//! Stateless building blocks of the layout planner.
//!
//! - **Catalogue** ([`catalogue`]) - piece types with their ports, routes and footprints
//! - **Geometry** ([`geometry`]) - poses, polygons, footprint overlap and containment
//! - **Models** ([`models`]) - boards, placements, connections and layout metrics
//! - **Scoring** ([`scoring`]) - objective presets and the pure layout scorer
//! - **Plan records** ([`io`]) - the persisted plan shape and inventory summary

pub mod catalogue;
pub mod geometry;
pub mod io;
pub mod models;
pub mod scoring;
