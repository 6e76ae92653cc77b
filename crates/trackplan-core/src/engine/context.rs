use super::config::GeneratorConfig;
use super::progress::ProgressReporter;
use crate::core::catalogue::Catalogue;
use crate::core::models::board::Board;
use crate::core::scoring::ObjectivePreset;
use std::sync::Arc;
use std::time::Instant;

/// Read-only state shared by every task of one generation run.
#[derive(Clone, Copy)]
pub struct GenerationContext<'a> {
    pub board: &'a Arc<Board>,
    pub catalogue: &'a Arc<Catalogue>,
    pub config: &'a GeneratorConfig,
    pub preset: &'a ObjectivePreset,
    pub reporter: &'a ProgressReporter<'a>,
    pub deadline: Option<Instant>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        board: &'a Arc<Board>,
        catalogue: &'a Arc<Catalogue>,
        config: &'a GeneratorConfig,
        preset: &'a ObjectivePreset,
        reporter: &'a ProgressReporter<'a>,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            board,
            catalogue,
            config,
            preset,
            reporter,
            deadline,
        }
    }

    /// Whether the time budget has run out.
    #[inline]
    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
