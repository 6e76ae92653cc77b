pub mod board;
pub mod ids;
pub mod metrics;
pub mod placement;
