use super::graph::PlacementGraph;
use crate::core::io::plan::{BoardRecord, PlacementRecord, PlanDocument};
use crate::core::models::metrics::LayoutMetrics;
use crate::core::models::placement::Connection;
use crate::core::scoring::{ObjectivePreset, Scorable, ScoreBreakdown, breakdown, compare_ranked};
use serde_json::Value;
use std::cmp::Ordering;
use std::time::Duration;

/// A finished, immutable layout with its score.
#[derive(Debug, Clone)]
pub struct CandidateLayout {
    graph: PlacementGraph,
    score: f64,
    breakdown: ScoreBreakdown,
}

impl CandidateLayout {
    pub fn new(graph: PlacementGraph, preset: &ObjectivePreset) -> Self {
        let breakdown = breakdown(graph.metrics(), graph.board().area(), preset);
        Self {
            score: breakdown.total,
            graph,
            breakdown,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }

    pub fn graph(&self) -> &PlacementGraph {
        &self.graph
    }

    pub fn connections(&self) -> &[Connection] {
        self.graph.connections()
    }

    pub fn to_records(&self) -> Vec<PlacementRecord> {
        self.graph.to_records()
    }

    /// The plan document for this layout on its board.
    pub fn export(&self, zoom: Option<Value>) -> PlanDocument {
        PlanDocument {
            placements: self.to_records(),
            circles: Vec::new(),
            board: Some(BoardRecord::from_outline(&self.graph.board().to_outline())),
            zoom,
        }
    }

    /// Ranking order, best first.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        compare_ranked(
            (self.score, self.graph.metrics()),
            (other.score, other.graph.metrics()),
        )
    }
}

impl Scorable for CandidateLayout {
    fn metrics(&self) -> &LayoutMetrics {
        self.graph.metrics()
    }

    fn board_area(&self) -> f64 {
        self.graph.board().area()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    pub rounds: usize,
    pub seeds: usize,
    pub expanded: usize,
    /// Children merged away as geometric duplicates.
    pub duplicates: usize,
    pub completed: usize,
    pub timed_out: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationResult {
    /// Ranked best first.
    pub candidates: Vec<CandidateLayout>,
    pub stats: SearchStats,
}

impl GenerationResult {
    pub fn best(&self) -> Option<&CandidateLayout> {
        self.candidates.first()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
