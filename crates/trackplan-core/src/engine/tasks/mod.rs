//! Units of work the workflows are assembled from.
//!
//! Seeding and expansion drive the beam search; conflict detection checks an
//! existing layout for overlaps and pieces off the board.

pub mod conflict_detection;
pub mod expansion;
pub mod seeding;
