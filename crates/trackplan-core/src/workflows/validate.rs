use crate::core::catalogue::Catalogue;
use crate::core::geometry::{Pose, Tolerances};
use crate::core::io::plan::PlacementRecord;
use crate::core::models::board::{Board, BoardOutline};
use crate::core::models::metrics::LayoutMetrics;
use crate::core::models::placement::Connection;
use crate::engine::error::EngineError;
use crate::engine::graph::{GraphError, JointFault, PlacementGraph};
use crate::engine::progress::ProgressReporter;
use crate::engine::tasks::conflict_detection;
use nalgebra::Point2;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    UnknownPiece { id: String, code: String },
    DuplicateId { id: String },
    OutOfBounds { id: String },
    Overlap { a: String, b: String },
    /// Two ports sit on top of each other without facing each other.
    MisalignedJoint {
        a: String,
        port_a: usize,
        b: String,
        port_b: usize,
    },
    /// Two ports face each other but belong to different track systems.
    IncompatibleConnector {
        a: String,
        port_a: usize,
        connector_a: String,
        b: String,
        port_b: usize,
        connector_b: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPiece { id, code } => {
                write!(f, "{id}: unknown piece code '{code}'")
            }
            Self::DuplicateId { id } => write!(f, "{id}: id is used more than once"),
            Self::OutOfBounds { id } => write!(f, "{id}: does not fit within the board"),
            Self::Overlap { a, b } => write!(f, "{a} overlaps {b}"),
            Self::MisalignedJoint { a, port_a, b, port_b } => write!(
                f,
                "{a} port {port_a} meets {b} port {port_b} at the wrong angle"
            ),
            Self::IncompatibleConnector {
                a,
                port_a,
                connector_a,
                b,
                port_b,
                connector_b,
            } => write!(
                f,
                "{a} port {port_a} ({connector_a}) cannot join {b} port {port_b} ({connector_b})"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    pub metrics: LayoutMetrics,
    pub connections: Vec<Connection>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Checks a saved layout against a board and catalogue without repairing it.
///
/// Records that cannot be placed at all (unknown code, repeated id) are
/// reported and left out; everything else is inserted as-is before
/// connections are derived and conflicts collected.
#[instrument(skip_all, name = "validate_workflow")]
pub fn run(
    outline: &BoardOutline,
    catalogue: &Arc<Catalogue>,
    records: &[PlacementRecord],
    tolerances: Tolerances,
) -> Result<ValidationReport, EngineError> {
    let board = Arc::new(Board::from_outline(outline)?);
    info!(placements = records.len(), board = %board.describe(), "Validating layout.");

    let mut graph = PlacementGraph::new(board, catalogue.clone(), tolerances);
    let mut violations = Vec::new();

    for record in records {
        let pose = Pose::new(Point2::new(record.x, record.y), record.rotation, record.flipped);
        match graph.insert_unchecked(&record.id, &record.code, pose) {
            Ok(_) => {}
            Err(GraphError::UnknownPiece(code)) => violations.push(Violation::UnknownPiece {
                id: record.id.clone(),
                code,
            }),
            Err(GraphError::DuplicateId(id)) => violations.push(Violation::DuplicateId { id }),
            Err(e) => return Err(e.into()),
        }
    }

    let joined = graph.derive_connections();
    debug!(connections = joined, "Derived connections.");

    let conflicts = conflict_detection::run(&graph, &ProgressReporter::new());
    let id_of = |index: usize| graph.pieces()[index].id().to_string();
    violations.extend(
        conflicts
            .out_of_bounds
            .iter()
            .map(|&i| Violation::OutOfBounds { id: id_of(i) }),
    );
    violations.extend(
        conflicts
            .overlapping
            .iter()
            .map(|&(a, b)| Violation::Overlap {
                a: id_of(a),
                b: id_of(b),
            }),
    );
    let connector_of = |port| graph.connector(port).unwrap_or_default().to_string();
    violations.extend(graph.faulty_joints().into_iter().map(|(a, b, fault)| match fault {
        JointFault::Misaligned => Violation::MisalignedJoint {
            a: id_of(a.placement),
            port_a: a.port,
            b: id_of(b.placement),
            port_b: b.port,
        },
        JointFault::IncompatibleConnector => Violation::IncompatibleConnector {
            a: id_of(a.placement),
            port_a: a.port,
            connector_a: connector_of(a),
            b: id_of(b.placement),
            port_b: b.port,
            connector_b: connector_of(b),
        },
    }));

    if violations.is_empty() {
        info!("Layout is valid.");
    } else {
        warn!(violations = violations.len(), "Layout has violations.");
    }

    Ok(ValidationReport {
        violations,
        metrics: graph.metrics().clone(),
        connections: graph.connections().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, code: &str, x: f64, y: f64, rotation: f64) -> PlacementRecord {
        PlacementRecord {
            id: id.to_string(),
            code: code.to_string(),
            x,
            y,
            rotation,
            flipped: false,
        }
    }

    fn hornby() -> Arc<Catalogue> {
        Arc::new(Catalogue::hornby().unwrap())
    }

    #[test]
    fn joined_straights_are_valid() {
        let records = vec![
            record("a", "R600", 500.0, 500.0, 0.0),
            record("b", "R600", 668.0, 500.0, 0.0),
        ];
        let report = run(
            &BoardOutline::rectangle(1200.0, 1000.0),
            &hornby(),
            &records,
            Tolerances::default(),
        )
        .unwrap();
        assert!(report.is_valid(), "{:?}", report.violations);
        assert_eq!(report.connections.len(), 1);
        assert_eq!(report.metrics.piece_count, 2);
        assert_eq!(report.metrics.open_ends, 2);
    }

    #[test]
    fn every_kind_of_violation_is_reported() {
        let records = vec![
            record("a", "R600", 500.0, 500.0, 0.0),
            record("a", "R600", 100.0, 100.0, 0.0),
            record("b", "X999", 300.0, 300.0, 0.0),
            record("c", "R600", 500.0, 500.0, 90.0),
            record("d", "R600", 1190.0, 100.0, 0.0),
        ];
        let report = run(
            &BoardOutline::rectangle(1200.0, 1000.0),
            &hornby(),
            &records,
            Tolerances::default(),
        )
        .unwrap();
        let v = &report.violations;
        assert!(v.contains(&Violation::DuplicateId { id: "a".into() }));
        assert!(v.contains(&Violation::UnknownPiece {
            id: "b".into(),
            code: "X999".into()
        }));
        assert!(v.contains(&Violation::Overlap {
            a: "a".into(),
            b: "c".into()
        }));
        assert!(v.contains(&Violation::OutOfBounds { id: "d".into() }));
        assert!(!report.is_valid());
    }

    #[test]
    fn ports_meeting_at_right_angles_are_misaligned() {
        // The second straight's end sits on the first's end at a right angle.
        let records = vec![
            record("a", "R600", 500.0, 500.0, 0.0),
            record("b", "R600", 584.0, 584.0, 90.0),
        ];
        let report = run(
            &BoardOutline::rectangle(1200.0, 1000.0),
            &hornby(),
            &records,
            Tolerances::default(),
        )
        .unwrap();
        assert!(report.violations.iter().any(|v| matches!(
            v,
            Violation::MisalignedJoint { a, b, .. } if a == "a" && b == "b"
        )));
        assert!(report.connections.is_empty());
    }

    #[test]
    fn straights_of_different_gauges_do_not_join() {
        let content = r#"
[[piece]]
code = "OO168"
name = "OO Straight"
kind = "straight"
length = 168.0
connector = "oo"

[[piece]]
code = "N168"
name = "N Straight"
kind = "straight"
length = 168.0
connector = "n-gauge"
"#;
        let catalogue = Arc::new(Catalogue::from_toml_str(content, "inline").unwrap());
        let records = vec![
            record("a", "OO168", 500.0, 500.0, 0.0),
            record("b", "N168", 668.0, 500.0, 0.0),
        ];
        let report = run(
            &BoardOutline::rectangle(1200.0, 1000.0),
            &catalogue,
            &records,
            Tolerances::default(),
        )
        .unwrap();
        assert!(!report.is_valid());
        assert!(report.connections.is_empty());
        assert_eq!(
            report.violations,
            vec![Violation::IncompatibleConnector {
                a: "a".into(),
                port_a: 1,
                connector_a: "oo".into(),
                b: "b".into(),
                port_b: 0,
                connector_b: "n-gauge".into(),
            }]
        );
        assert_eq!(
            report.violations[0].to_string(),
            "a port 1 (oo) cannot join b port 0 (n-gauge)"
        );
    }

    #[test]
    fn invalid_board_is_rejected() {
        let outline = BoardOutline::new(vec![[0.0, 0.0], [1.0, 1.0]]);
        let err = run(&outline, &hornby(), &[], Tolerances::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidBoard { .. }));
    }

    #[test]
    fn violations_read_as_sentences() {
        let v = Violation::Overlap {
            a: "placement-1".into(),
            b: "placement-2".into(),
        };
        assert_eq!(v.to_string(), "placement-1 overlaps placement-2");
    }
}
