//! Small data structures shared by the engine.

pub mod union_find;
