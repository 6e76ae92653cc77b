use crate::core::geometry::shapes::overlaps;
use crate::engine::graph::PlacementGraph;
use crate::engine::progress::{Progress, ProgressReporter};
use itertools::Itertools;
use tracing::{info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Geometric problems found in a layout, by placement index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conflicts {
    pub overlapping: Vec<(usize, usize)>,
    pub out_of_bounds: Vec<usize>,
}

#[instrument(skip_all, name = "conflict_detection_task")]
pub fn run(graph: &PlacementGraph, reporter: &ProgressReporter) -> Conflicts {
    let eps = graph.tolerances().overlap_eps_mm;
    let pieces = graph.pieces();
    info!(placements = pieces.len(), "Detecting layout conflicts.");
    reporter.report(Progress::Message("Detecting conflicts...".to_string()));

    let out_of_bounds: Vec<usize> = pieces
        .iter()
        .enumerate()
        .filter(|(_, p)| !graph.board().contains(&p.footprint, eps))
        .map(|(i, _)| i)
        .collect();

    let pairs: Vec<_> = (0..pieces.len()).combinations(2).collect();
    if pairs.is_empty() {
        return Conflicts {
            overlapping: Vec::new(),
            out_of_bounds,
        };
    }

    reporter.report(Progress::TaskStart {
        total_steps: pairs.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = pairs.iter();

    #[cfg(feature = "parallel")]
    let iterator = pairs.par_iter();

    let mut overlapping: Vec<(usize, usize)> = iterator
        .filter_map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            reporter.report(Progress::TaskIncrement);
            overlaps(&pieces[a].footprint, &pieces[b].footprint, eps).then_some((a, b))
        })
        .collect();
    overlapping.sort_unstable();

    reporter.report(Progress::TaskFinish);
    info!(
        overlaps = overlapping.len(),
        out_of_bounds = out_of_bounds.len(),
        "Conflict detection finished."
    );

    Conflicts {
        overlapping,
        out_of_bounds,
    }
}
