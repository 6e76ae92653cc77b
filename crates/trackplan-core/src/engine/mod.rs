//! # Engine Module
//!
//! The stateful layer of the planner: persistent layout graphs and the tasks
//! that grow and check them.
//!
//! - **Configuration** ([`config`]) - search and seeding parameters with a validating builder
//! - **Layout graph** ([`graph`]) - placements, connections, loop and run tracking
//! - **State** ([`state`]) - scored candidate snapshots and search statistics
//! - **Progress** ([`progress`]) - phase and task events for front ends
//! - **Errors** ([`error`]) - the error type returned by the workflows

pub mod config;
pub(crate) mod context;
pub mod error;
pub mod graph;
pub mod progress;
pub mod state;
pub(crate) mod tasks;
pub(crate) mod utils;
