use crate::core::catalogue::Catalogue;
use crate::core::models::board::{Board, BoardOutline};
use crate::core::scoring::{ObjectivePreset, breakdown, closure_bonus, compare_ranked};
use crate::engine::config::GeneratorConfig;
use crate::engine::context::GenerationContext;
use crate::engine::error::EngineError;
use crate::engine::graph::PlacementGraph;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{CandidateLayout, GenerationResult, SearchStats};
use crate::engine::tasks::{expansion, seeding};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A beam member with the keys it is ranked by.
struct BeamEntry {
    graph: PlacementGraph,
    /// Partial score plus the loop-closure bonus.
    priority: f64,
    tie_break: u64,
    signature: u64,
}

/// Generates ranked candidate layouts for `outline` by constrained beam search.
///
/// An invalid board fails before any search. An empty catalogue, or one whose
/// pieces cannot be placed at all, yields an empty result rather than an error.
#[instrument(skip_all, name = "generate_workflow")]
pub fn run(
    outline: &BoardOutline,
    catalogue: &Arc<Catalogue>,
    preset: &ObjectivePreset,
    config: &GeneratorConfig,
    reporter: &ProgressReporter,
) -> Result<GenerationResult, EngineError> {
    let started = Instant::now();
    let board = Arc::new(Board::from_outline(outline)?);
    let deadline = config.search.time_budget.map(|budget| started + budget);
    let context = GenerationContext::new(&board, catalogue, config, preset, reporter, deadline);
    let mut stats = SearchStats::default();

    info!(
        board = %board.describe(),
        pieces = catalogue.len(),
        beam_width = config.search.beam_width,
        max_pieces = config.search.max_pieces,
        "Starting layout generation."
    );

    if catalogue.is_empty() {
        warn!("Catalogue is empty; no layouts can be generated.");
        return Ok(GenerationResult::default());
    }

    // === Phase 1: Seeding ===
    reporter.report(Progress::PhaseStart { name: "Seeding" });
    let seeds = seeding::run(&context);
    reporter.report(Progress::PhaseFinish);
    stats.seeds = seeds.len();

    if seeds.is_empty() {
        warn!("No catalogue piece fits on the board; returning no candidates.");
        stats.elapsed = started.elapsed();
        return Ok(GenerationResult {
            candidates: Vec::new(),
            stats,
        });
    }

    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let mut beam = select(dedupe(seeds, &mut stats), &context, &mut rng);
    let mut completed: Vec<PlacementGraph> = Vec::new();

    // === Phase 2: Beam search ===
    reporter.report(Progress::PhaseStart { name: "Beam Search" });
    while !beam.is_empty() {
        if context.expired() {
            info!(round = stats.rounds, "Time budget exhausted; stopping search.");
            stats.timed_out = true;
            break;
        }

        let (full, growing): (Vec<_>, Vec<_>) = beam
            .into_iter()
            .partition(|g| g.len() >= config.search.max_pieces);
        completed.extend(full);
        if growing.is_empty() {
            beam = Vec::new();
            break;
        }

        stats.rounds += 1;
        reporter.report(Progress::TaskStart {
            total_steps: growing.len() as u64,
        });
        let expansions = expand_all(&growing, &context);
        reporter.report(Progress::TaskFinish);

        let mut pool = Vec::new();
        for (branch, children) in growing.into_iter().zip(expansions) {
            if children.is_empty() {
                completed.push(branch);
            } else {
                stats.expanded += children.len();
                pool.extend(children);
            }
        }

        beam = select(dedupe(pool, &mut stats), &context, &mut rng);
        reporter.report(Progress::RoundFinished {
            round: stats.rounds,
            beam: beam.len(),
            completed: completed.len(),
            best_score: beam.first().map(|g| score_of(g, &context)),
        });
        debug!(
            round = stats.rounds,
            beam = beam.len(),
            completed = completed.len(),
            "Beam round finished."
        );
    }
    completed.extend(beam);
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Ranking ===
    reporter.report(Progress::PhaseStart { name: "Ranking" });
    stats.completed = completed.len();
    let mut seen = HashSet::new();
    let mut candidates: Vec<(u64, CandidateLayout)> = completed
        .into_iter()
        .filter_map(|graph| {
            let signature = graph.signature();
            seen.insert(signature)
                .then(|| (signature, CandidateLayout::new(graph, preset)))
        })
        .collect();
    candidates.sort_by(|(sa, a), (sb, b)| a.rank_cmp(b).then(sa.cmp(sb)));
    candidates.truncate(config.search.num_candidates);
    reporter.report(Progress::PhaseFinish);

    stats.elapsed = started.elapsed();
    let candidates: Vec<CandidateLayout> = candidates.into_iter().map(|(_, c)| c).collect();
    info!(
        candidates = candidates.len(),
        best_score = candidates.first().map(|c| c.score()),
        rounds = stats.rounds,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "Layout generation finished."
    );

    Ok(GenerationResult { candidates, stats })
}

fn expand_all(branches: &[PlacementGraph], context: &GenerationContext) -> Vec<Vec<PlacementGraph>> {
    #[cfg(not(feature = "parallel"))]
    let iterator = branches.iter();

    #[cfg(feature = "parallel")]
    let iterator = branches.par_iter();

    iterator
        .map(|branch| {
            let children = expansion::expand(branch, context);
            context.reporter.report(Progress::TaskIncrement);
            children
        })
        .collect()
}

/// Keeps the first of every group of geometrically identical layouts.
fn dedupe(graphs: Vec<PlacementGraph>, stats: &mut SearchStats) -> Vec<PlacementGraph> {
    let before = graphs.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<_> = graphs
        .into_iter()
        .filter(|g| seen.insert(g.signature()))
        .collect();
    stats.duplicates += before - unique.len();
    unique
}

/// Ranks a pool and keeps the best `beam_width` branches.
///
/// Branches are ordered by their partial score plus a bonus for open ends that
/// are turning towards each other. Ties fall back to fewer open ends, longer
/// track, a seeded random key and finally the geometric signature, so the
/// result is fully deterministic.
fn select(pool: Vec<PlacementGraph>, context: &GenerationContext, rng: &mut StdRng) -> Vec<PlacementGraph> {
    let mut entries: Vec<BeamEntry> = pool
        .into_iter()
        .map(|graph| BeamEntry {
            priority: priority_of(&graph, context),
            tie_break: rng.r#gen::<u64>(),
            signature: graph.signature(),
            graph,
        })
        .collect();
    entries.sort_by(|a, b| {
        compare_ranked((a.priority, a.graph.metrics()), (b.priority, b.graph.metrics()))
            .then(a.tie_break.cmp(&b.tie_break))
            .then(a.signature.cmp(&b.signature))
    });
    entries.truncate(context.config.search.beam_width);
    entries.into_iter().map(|e| e.graph).collect()
}

fn score_of(graph: &PlacementGraph, context: &GenerationContext) -> f64 {
    breakdown(graph.metrics(), graph.board().area(), context.preset).total
}

fn priority_of(graph: &PlacementGraph, context: &GenerationContext) -> f64 {
    let score = score_of(graph, context);
    let closure = graph.closure_estimate();
    score + closure_bonus(graph.metrics(), closure, context.preset)
}
