//! Persisted plan records and their lenient import.
//!
//! The core only converts between layouts and these records; reading and
//! writing files is left to the caller, which hands in any `Read`/`Write`.

pub mod plan;
