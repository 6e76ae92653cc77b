use crate::engine::context::GenerationContext;
use crate::engine::graph::PlacementGraph;
use tracing::trace;

/// Every legal one-piece extension of `branch`, in a fixed order.
///
/// Children are produced per open port (ascending), then per catalogue piece
/// (code order), then per mating port of that piece, then unmirrored before
/// mirrored. Mirrored variants are skipped for mirror-symmetric pieces since
/// they reproduce the same geometry. Stops early once the deadline passes.
pub fn expand(branch: &PlacementGraph, context: &GenerationContext) -> Vec<PlacementGraph> {
    let mut children = Vec::new();
    let targets: Vec<_> = branch.open_ports().collect();

    for target in targets {
        if context.expired() {
            trace!("Deadline reached during expansion.");
            break;
        }
        for (_, piece) in context.catalogue.iter() {
            let flips: &[bool] = if piece.mirror_symmetric {
                &[false]
            } else {
                &[false, true]
            };
            for port in 0..piece.port_count() {
                for &flipped in flips {
                    match branch.attach(&piece.code, port, flipped, target) {
                        Ok((child, _)) => children.push(child),
                        Err(e) => trace!(
                            code = %piece.code,
                            port,
                            flipped,
                            target = ?target,
                            error = %e,
                            "Expansion rejected."
                        ),
                    }
                }
            }
        }
    }
    children
}
