//! # Trackplan Core Library
//!
//! Generates model-railway track layouts that fit a board outline, using a
//! catalogue of standard set-track pieces and a weighted choice of priorities
//! (track density, long straights, closed loops, few open ends).
//!
//! ## Architecture
//!
//! The library is split into three layers:
//!
//! - **[`core`]: The Foundation.** Stateless models and pure functions: the
//!   geometry kernel, the board model, the piece catalogue (with the built-in
//!   Hornby OO range), layout scoring and the plan record format.
//!
//! - **[`engine`]: The Search Machinery.** The persistent placement graph
//!   with incremental loop and straight-run tracking, generator
//!   configuration, progress reporting and the seeding, expansion and
//!   conflict-detection tasks.
//!
//! - **[`workflows`]: The Public API.** [`workflows::generate::run`] produces
//!   ranked candidate layouts and [`workflows::validate::run`] checks a saved
//!   one.
//!
//! The library never touches the file system. Catalogue TOML and plan JSON are
//! parsed from strings or readers supplied by the caller.

pub mod core;
pub mod engine;
pub mod workflows;
