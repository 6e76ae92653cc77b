//! # Workflows Module
//!
//! High-level entry points that tie the [`engine`](crate::engine) and
//! [`core`](crate::core) layers together into complete procedures.
//!
//! - **Generation** ([`generate`]) seeds single-piece layouts on the board,
//!   grows them by beam search and returns the best-scoring candidates.
//! - **Validation** ([`validate`]) loads a saved placement list as-is and
//!   reports every geometric problem without repairing it.
//!
//! Both validate the board first and fail with
//! [`EngineError::InvalidBoard`](crate::engine::error::EngineError::InvalidBoard)
//! before doing any work on a malformed outline.

pub mod generate;
pub mod validate;
