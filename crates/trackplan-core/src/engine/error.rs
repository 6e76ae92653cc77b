use thiserror::Error;

use super::config::ConfigError;
use super::graph::GraphError;
use crate::core::catalogue::CatalogueError;
use crate::core::io::plan::PlanError;
use crate::core::models::board::BoardError;
use crate::core::scoring::ScoringError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid board: {source}")]
    InvalidBoard {
        #[from]
        source: BoardError,
    },

    #[error("Catalogue error: {source}")]
    Catalogue {
        #[from]
        source: CatalogueError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Scoring error: {source}")]
    Scoring {
        #[from]
        source: ScoringError,
    },

    #[error("Plan error: {source}")]
    Plan {
        #[from]
        source: PlanError,
    },

    #[error("Layout graph error: {source}")]
    Graph {
        #[from]
        source: GraphError,
    },
}
