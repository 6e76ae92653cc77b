use crate::engine::context::GenerationContext;
use crate::engine::graph::PlacementGraph;
use crate::engine::progress::Progress;
use nalgebra::{Rotation2, Vector2};
use std::collections::HashSet;
use tracing::{debug, info, instrument, trace};

/// Builds the single-piece layouts the beam starts from.
///
/// Each piece is centred on the seed point (its footprint's bounding-box centre
/// lands there) at every seed rotation, and additionally mirrored when mirroring
/// changes its geometry. Seeds that do not fit are dropped, and seeds that are
/// geometrically identical are kept once.
#[instrument(skip_all, name = "seeding_task")]
pub fn run(context: &GenerationContext) -> Vec<PlacementGraph> {
    let seeding = &context.config.seeding;
    let Some(anchor) = seeding
        .seed_position
        .or_else(|| context.board.interior_point())
    else {
        return Vec::new();
    };

    let steps = ((360.0 / seeding.rotation_step_deg).round() as usize).max(1);
    info!(x = anchor.x, y = anchor.y, rotations = steps, "Seeding layouts.");
    context.reporter.report(Progress::TaskStart {
        total_steps: context.catalogue.len() as u64,
    });

    let empty = PlacementGraph::new(
        context.board.clone(),
        context.catalogue.clone(),
        context.config.tolerances,
    );
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for (_, piece) in context.catalogue.iter() {
        let centre = piece.footprint.bounds().center().coords;
        let flips: &[bool] = if piece.mirror_symmetric {
            &[false]
        } else {
            &[false, true]
        };
        for step in 0..steps {
            let rotation = step as f64 * seeding.rotation_step_deg;
            for &flipped in flips {
                let local = if flipped {
                    Vector2::new(centre.x, -centre.y)
                } else {
                    centre
                };
                let position = anchor - Rotation2::new(rotation.to_radians()) * local;
                let mut graph = empty.clone();
                match graph.add_placement(&piece.code, position, rotation, flipped) {
                    Ok(_) => {
                        if seen.insert(graph.signature()) {
                            seeds.push(graph);
                        }
                    }
                    Err(e) => trace!(code = %piece.code, rotation, flipped, error = %e, "Seed rejected."),
                }
            }
        }
        context.reporter.report(Progress::TaskIncrement);
    }
    context.reporter.report(Progress::TaskFinish);

    debug!(count = seeds.len(), "Seeding finished.");
    seeds
}
