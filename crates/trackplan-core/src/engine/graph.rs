use super::utils::union_find::DisjointSet;
use crate::core::catalogue::{Catalogue, PieceKind, PieceType};
use crate::core::geometry::shapes::overlaps;
use crate::core::geometry::transform::{angle_difference, headings_oppose, ports_coincide};
use crate::core::geometry::{Footprint, Pose, Tolerances, WorldPort, pose_aligning, ports_align};
use crate::core::io::plan::PlacementRecord;
use crate::core::models::board::Board;
use crate::core::models::ids::PieceKey;
use crate::core::models::metrics::LayoutMetrics;
use crate::core::models::placement::{Connection, Placement, PortRef};
use nalgebra::Point2;
use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// Quantisation steps of the geometric signature.
const SIGNATURE_POSITION_MM: f64 = 0.5;
const SIGNATURE_HEADING_DEG: f64 = 0.5;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("Piece {code} would overlap placement '{other}'")]
    GeometryConflict { code: String, other: String },
    #[error("Piece {code} does not fit within the board")]
    OutOfBounds { code: String },
    #[error("Ports {a:?} and {b:?} are not aligned")]
    PortMismatch { a: PortRef, b: PortRef },
    #[error("Port {0:?} is already connected")]
    PortOccupied(PortRef),
    #[error("Unknown piece code '{0}'")]
    UnknownPiece(String),
    #[error("Unknown placement index {0}")]
    UnknownPlacement(usize),
    #[error("Piece {code} has no port {port} (it has {count})")]
    PortOutOfRange {
        code: String,
        port: usize,
        count: usize,
    },
    #[error("Placement id '{0}' is already in use")]
    DuplicateId(String),
}

/// Why two coincident open ports were left unjoined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointFault {
    /// The headings are not opposed.
    Misaligned,
    /// The ports face each other but their connector tags differ.
    IncompatibleConnector,
}

/// A placement together with its world-frame geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPiece {
    pub placement: Placement,
    pub kind: PieceKind,
    pub run_length: f64,
    pub footprint: Footprint,
    pub ports: Vec<WorldPort>,
    signature: u64,
}

impl PlacedPiece {
    fn new(id: String, key: PieceKey, piece: &PieceType, pose: Pose) -> Self {
        let ports: Vec<WorldPort> = piece
            .ports
            .iter()
            .map(|p| WorldPort {
                position: pose.apply_point(&p.offset),
                heading: pose.apply_heading(p.heading),
            })
            .collect();
        let signature = piece_signature(&piece.code, &ports);
        Self {
            placement: Placement {
                id,
                code: piece.code.clone(),
                piece: key,
                pose,
            },
            kind: piece.kind,
            run_length: piece.run_length,
            footprint: piece.footprint.transformed(&pose),
            ports,
            signature,
        }
    }

    pub fn id(&self) -> &str {
        &self.placement.id
    }

    pub fn code(&self) -> &str {
        &self.placement.code
    }

    pub fn to_record(&self) -> PlacementRecord {
        let pose = &self.placement.pose;
        PlacementRecord {
            id: self.placement.id.clone(),
            code: self.placement.code.clone(),
            x: pose.position.x,
            y: pose.position.y,
            rotation: pose.rotation,
            flipped: pose.flipped,
        }
    }
}

/// A persistent candidate layout.
///
/// Cloning is cheap: placed pieces are shared through `Arc`, and only the
/// bookkeeping vectors are copied. Every mutating operation either leaves the
/// graph untouched (on error) or applies completely.
#[derive(Debug, Clone)]
pub struct PlacementGraph {
    board: Arc<Board>,
    catalogue: Arc<Catalogue>,
    tolerances: Tolerances,
    pieces: Vec<Arc<PlacedPiece>>,
    /// Global index of each placement's first port.
    port_base: Vec<usize>,
    links: Vec<Option<PortRef>>,
    connections: Vec<Connection>,
    open: BTreeSet<PortRef>,
    port_sets: DisjointSet,
    runs: DisjointSet,
    run_lengths: Vec<f64>,
    metrics: LayoutMetrics,
    next_serial: usize,
}

impl PlacementGraph {
    pub fn new(board: Arc<Board>, catalogue: Arc<Catalogue>, tolerances: Tolerances) -> Self {
        Self {
            board,
            catalogue,
            tolerances,
            pieces: Vec::new(),
            port_base: Vec::new(),
            links: Vec::new(),
            connections: Vec::new(),
            open: BTreeSet::new(),
            port_sets: DisjointSet::new(),
            runs: DisjointSet::new(),
            run_lengths: Vec::new(),
            metrics: LayoutMetrics::default(),
            next_serial: 0,
        }
    }

    /// Rebuilds a layout from records without legality checks and derives its
    /// connections by port alignment.
    pub fn from_records(
        board: Arc<Board>,
        catalogue: Arc<Catalogue>,
        tolerances: Tolerances,
        records: &[PlacementRecord],
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new(board, catalogue, tolerances);
        for record in records {
            graph.insert_unchecked(
                &record.id,
                &record.code,
                Pose::new(Point2::new(record.x, record.y), record.rotation, record.flipped),
            )?;
        }
        graph.derive_connections();
        Ok(graph)
    }

    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    pub fn catalogue(&self) -> &Arc<Catalogue> {
        &self.catalogue
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn pieces(&self) -> &[Arc<PlacedPiece>] {
        &self.pieces
    }

    pub fn piece(&self, index: usize) -> Option<&PlacedPiece> {
        self.pieces.get(index).map(Arc::as_ref)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// Ports without a connection, in ascending order.
    pub fn open_ports(&self) -> impl Iterator<Item = PortRef> + '_ {
        self.open.iter().copied()
    }

    pub fn world_port(&self, port: PortRef) -> Option<&WorldPort> {
        self.pieces.get(port.placement)?.ports.get(port.port)
    }

    pub fn link(&self, port: PortRef) -> Option<PortRef> {
        let base = *self.port_base.get(port.placement)?;
        if port.port >= self.pieces[port.placement].ports.len() {
            return None;
        }
        self.links[base + port.port]
    }

    pub fn to_records(&self) -> Vec<PlacementRecord> {
        self.pieces.iter().map(|p| p.to_record()).collect()
    }

    /// Places a piece after checking it fits the board and overlaps nothing.
    pub fn add_placement(
        &mut self,
        code: &str,
        position: Point2<f64>,
        rotation: f64,
        flipped: bool,
    ) -> Result<&Placement, GraphError> {
        let pose = Pose::new(position, rotation, flipped);
        let key = self
            .catalogue
            .key_of(code)
            .ok_or_else(|| GraphError::UnknownPiece(code.to_string()))?;
        let placed = self.check_placement(key, pose)?;
        let index = self.commit(placed);
        Ok(&self.pieces[index].placement)
    }

    /// Inserts a placement verbatim, for importing saved layouts.
    pub fn insert_unchecked(&mut self, id: &str, code: &str, pose: Pose) -> Result<usize, GraphError> {
        if self.pieces.iter().any(|p| p.id() == id) {
            return Err(GraphError::DuplicateId(id.to_string()));
        }
        let key = self
            .catalogue
            .key_of(code)
            .ok_or_else(|| GraphError::UnknownPiece(code.to_string()))?;
        let piece = self
            .catalogue
            .get(key)
            .ok_or_else(|| GraphError::UnknownPiece(code.to_string()))?;
        let placed = PlacedPiece::new(id.to_string(), key, piece, pose);
        Ok(self.commit(placed))
    }

    /// Joins two open ports that coincide and face each other.
    pub fn connect(
        &mut self,
        a: usize,
        port_a: usize,
        b: usize,
        port_b: usize,
    ) -> Result<Connection, GraphError> {
        let (ra, rb) = (PortRef::new(a, port_a), PortRef::new(b, port_b));
        let wa = *self.checked_port(ra)?;
        let wb = *self.checked_port(rb)?;
        if ra == rb {
            return Err(GraphError::PortMismatch { a: ra, b: rb });
        }
        for r in [ra, rb] {
            if self.link(r).is_some() {
                return Err(GraphError::PortOccupied(r));
            }
        }
        if !ports_align(&wa, &wb, &self.tolerances) {
            return Err(GraphError::PortMismatch { a: ra, b: rb });
        }
        Ok(self.join(ra, rb))
    }

    /// Returns a new graph with `code` attached by its `port` to the open port
    /// `target`, plus the index of the new placement.
    ///
    /// Any other port of the new piece that lands on an open port is connected
    /// as well, which is how loops close.
    pub fn attach(
        &self,
        code: &str,
        port: usize,
        flipped: bool,
        target: PortRef,
    ) -> Result<(PlacementGraph, usize), GraphError> {
        let pose = self.attach_pose(code, port, flipped, target)?;
        let key = self
            .catalogue
            .key_of(code)
            .ok_or_else(|| GraphError::UnknownPiece(code.to_string()))?;
        let placed = self.check_placement(key, pose)?;

        let mut next = self.clone();
        let index = next.commit(placed);
        next.join(PortRef::new(index, port), target);
        next.auto_connect(index);
        Ok((next, index))
    }

    /// Solves the pose that mates `port` of `code` with `target`, checking the
    /// target is open and the connectors match.
    pub fn attach_pose(
        &self,
        code: &str,
        port: usize,
        flipped: bool,
        target: PortRef,
    ) -> Result<Pose, GraphError> {
        let world = *self.checked_port(target)?;
        if self.link(target).is_some() {
            return Err(GraphError::PortOccupied(target));
        }
        let piece = self
            .catalogue
            .by_code(code)
            .ok_or_else(|| GraphError::UnknownPiece(code.to_string()))?;
        let local = piece.ports.get(port).ok_or_else(|| GraphError::PortOutOfRange {
            code: code.to_string(),
            port,
            count: piece.ports.len(),
        })?;
        if self.connector(target) != Some(local.connector.as_str()) {
            return Err(GraphError::PortMismatch {
                a: PortRef::new(self.pieces.len(), port),
                b: target,
            });
        }
        Ok(pose_aligning(&local.offset, local.heading, flipped, &world))
    }

    /// Connects every pair of open ports that align. Returns how many joints were made.
    pub fn derive_connections(&mut self) -> usize {
        let mut made = 0;
        let open: Vec<PortRef> = self.open.iter().copied().collect();
        for (i, &a) in open.iter().enumerate() {
            if !self.open.contains(&a) {
                continue;
            }
            for &b in &open[i + 1..] {
                if a.placement == b.placement || !self.open.contains(&b) {
                    continue;
                }
                if self.ports_mate(a, b) {
                    self.join(a, b);
                    made += 1;
                    break;
                }
            }
        }
        made
    }

    /// Open port pairs that coincide but could not be joined, with the reason.
    pub fn faulty_joints(&self) -> Vec<(PortRef, PortRef, JointFault)> {
        let open: Vec<PortRef> = self.open.iter().copied().collect();
        let mut found = Vec::new();
        for (i, &a) in open.iter().enumerate() {
            for &b in &open[i + 1..] {
                if a.placement == b.placement {
                    continue;
                }
                let wa = &self.pieces[a.placement].ports[a.port];
                let wb = &self.pieces[b.placement].ports[b.port];
                if !ports_coincide(wa, wb, &self.tolerances) {
                    continue;
                }
                let fault = if !headings_oppose(wa.heading, wb.heading, &self.tolerances) {
                    JointFault::Misaligned
                } else if self.connector(a) != self.connector(b) {
                    JointFault::IncompatibleConnector
                } else {
                    continue;
                };
                found.push((a, b, fault));
            }
        }
        found
    }

    /// How nearly two open ends are heading into each other, in `[0, 1)`.
    ///
    /// For a pair of open ports on different placements, the facing term is one
    /// minus the angles between each port's outward heading and the direction to
    /// the other port, taken over 360°. It is damped by the gap relative to the
    /// board's size. The best pair wins; fewer than two open ends give zero.
    pub fn closure_estimate(&self) -> f64 {
        let scale = self.board.area().sqrt();
        if scale <= 0.0 {
            return 0.0;
        }
        let open: Vec<PortRef> = self.open.iter().copied().collect();
        let mut best = 0.0_f64;
        for (i, &a) in open.iter().enumerate() {
            for &b in &open[i + 1..] {
                if a.placement == b.placement {
                    continue;
                }
                let wa = &self.pieces[a.placement].ports[a.port];
                let wb = &self.pieces[b.placement].ports[b.port];
                let gap = wb.position - wa.position;
                let distance = gap.norm();
                // Coincident but unjoined ports cannot close anything.
                if distance <= self.tolerances.position_eps_mm {
                    continue;
                }
                let towards_b = gap.y.atan2(gap.x).to_degrees();
                let misfit = angle_difference(wa.heading, towards_b).abs()
                    + angle_difference(wb.heading, towards_b + 180.0).abs();
                let facing = 1.0 - misfit / 360.0;
                best = best.max(facing * scale / (scale + distance));
            }
        }
        best
    }

    /// Connector tag of a port, from the catalogue entry of its piece.
    pub fn connector(&self, port: PortRef) -> Option<&str> {
        self.piece_type(port.placement)?
            .ports
            .get(port.port)
            .map(|p| p.connector.as_str())
    }

    /// Length of every maximal chain of connected straights, longest first.
    ///
    /// Built on demand from the run roots; the metrics only track the count
    /// and the longest run.
    pub fn straight_runs(&self) -> Vec<f64> {
        let mut runs: Vec<f64> = (0..self.pieces.len())
            .filter(|&i| self.pieces[i].kind == PieceKind::Straight && self.runs.root(i) == i)
            .map(|i| self.run_lengths[i])
            .collect();
        runs.sort_by(|a, b| b.total_cmp(a));
        runs
    }

    /// Order-independent hash of the layout geometry, used to merge duplicates.
    pub fn signature(&self) -> u64 {
        let mut sigs: Vec<u64> = self.pieces.iter().map(|p| p.signature).collect();
        sigs.sort_unstable();
        let mut hasher = DefaultHasher::new();
        sigs.hash(&mut hasher);
        hasher.finish()
    }

    fn piece_type(&self, index: usize) -> Option<&PieceType> {
        self.catalogue.get(self.pieces.get(index)?.placement.piece)
    }

    fn checked_port(&self, port: PortRef) -> Result<&WorldPort, GraphError> {
        let piece = self
            .pieces
            .get(port.placement)
            .ok_or(GraphError::UnknownPlacement(port.placement))?;
        piece.ports.get(port.port).ok_or_else(|| GraphError::PortOutOfRange {
            code: piece.code().to_string(),
            port: port.port,
            count: piece.ports.len(),
        })
    }

    fn ports_mate(&self, a: PortRef, b: PortRef) -> bool {
        let (Some(wa), Some(wb)) = (self.world_port(a), self.world_port(b)) else {
            return false;
        };
        let connectors_match = matches!(
            (self.connector(a), self.connector(b)),
            (Some(ca), Some(cb)) if ca == cb
        );
        connectors_match && ports_align(wa, wb, &self.tolerances)
    }

    fn check_placement(&self, key: PieceKey, pose: Pose) -> Result<PlacedPiece, GraphError> {
        let piece = self
            .catalogue
            .get(key)
            .ok_or_else(|| GraphError::UnknownPiece(format!("{:?}", key)))?;
        let placed = PlacedPiece::new(self.generate_id(), key, piece, pose);
        if !self.board.contains(&placed.footprint, self.tolerances.overlap_eps_mm) {
            return Err(GraphError::OutOfBounds {
                code: piece.code.clone(),
            });
        }
        if let Some(other) = self
            .pieces
            .iter()
            .find(|p| overlaps(&p.footprint, &placed.footprint, self.tolerances.overlap_eps_mm))
        {
            return Err(GraphError::GeometryConflict {
                code: piece.code.clone(),
                other: other.id().to_string(),
            });
        }
        Ok(placed)
    }

    fn generate_id(&self) -> String {
        let mut serial = self.next_serial;
        loop {
            let id = format!("placement-{}", serial);
            if !self.pieces.iter().any(|p| p.id() == id) {
                return id;
            }
            serial += 1;
        }
    }

    fn commit(&mut self, placed: PlacedPiece) -> usize {
        let index = self.pieces.len();
        let base = self.links.len();
        let port_count = placed.ports.len();

        for port in 0..port_count {
            self.links.push(None);
            self.port_sets.make_set();
            self.open.insert(PortRef::new(index, port));
        }
        if let Some(piece) = self.catalogue.get(placed.placement.piece) {
            for &(x, y) in &piece.routes {
                self.port_sets.union(base + x, base + y);
            }
        }
        self.runs.make_set();
        let straight = placed.kind == PieceKind::Straight;
        self.run_lengths.push(if straight { placed.run_length } else { 0.0 });

        let m = &mut self.metrics;
        m.piece_count += 1;
        m.total_length += placed.run_length;
        if straight {
            m.straight_length += placed.run_length;
            m.straight_run_count += 1;
            m.longest_straight_run = m.longest_straight_run.max(placed.run_length);
        }
        m.footprint_area += placed.footprint.area();
        m.open_ends += port_count;
        let bounds = *placed.footprint.bounds();
        m.bounds = Some(m.bounds.map_or(bounds, |b| b.union(&bounds)));

        if let Some(serial) = placed
            .placement
            .id
            .strip_prefix("placement-")
            .and_then(|s| s.parse::<usize>().ok())
        {
            self.next_serial = self.next_serial.max(serial + 1);
        }
        self.port_base.push(base);
        self.pieces.push(Arc::new(placed));
        index
    }

    fn join(&mut self, a: PortRef, b: PortRef) -> Connection {
        let ga = self.port_base[a.placement] + a.port;
        let gb = self.port_base[b.placement] + b.port;
        self.links[ga] = Some(b);
        self.links[gb] = Some(a);
        self.open.remove(&a);
        self.open.remove(&b);
        self.metrics.open_ends -= 2;

        if !self.port_sets.union(ga, gb) {
            self.metrics.loop_count += 1;
        }
        let (pa, pb) = (&self.pieces[a.placement], &self.pieces[b.placement]);
        if pa.kind == PieceKind::Straight && pb.kind == PieceKind::Straight {
            let (ra, rb) = (self.runs.find(a.placement), self.runs.find(b.placement));
            // Runs only ever merge, so the longest run can only grow.
            if self.runs.union(ra, rb) {
                let root = self.runs.find(ra);
                let merged = self.run_lengths[ra] + self.run_lengths[rb];
                self.run_lengths[root] = merged;
                self.metrics.straight_run_count -= 1;
                self.metrics.longest_straight_run = self.metrics.longest_straight_run.max(merged);
            }
        }

        let connection = Connection::new(a, b);
        self.connections.push(connection);
        connection
    }

    fn auto_connect(&mut self, index: usize) {
        let own: Vec<PortRef> = self
            .open
            .iter()
            .filter(|p| p.placement == index)
            .copied()
            .collect();
        for port in own {
            if !self.open.contains(&port) {
                continue;
            }
            let partner = self
                .open
                .iter()
                .copied()
                .find(|&other| other.placement != index && self.ports_mate(port, other));
            if let Some(other) = partner {
                self.join(port, other);
            }
        }
    }
}

fn piece_signature(code: &str, ports: &[WorldPort]) -> u64 {
    let mut quantised: Vec<(i64, i64, i64)> = ports
        .iter()
        .map(|p| {
            let heading_steps = (360.0 / SIGNATURE_HEADING_DEG) as i64;
            (
                (p.position.x / SIGNATURE_POSITION_MM).round() as i64,
                (p.position.y / SIGNATURE_POSITION_MM).round() as i64,
                ((p.heading / SIGNATURE_HEADING_DEG).round() as i64).rem_euclid(heading_steps),
            )
        })
        .collect();
    quantised.sort_unstable();
    let mut hasher = DefaultHasher::new();
    code.hash(&mut hasher);
    quantised.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(codes: &[&str]) -> PlacementGraph {
        let catalogue = Catalogue::hornby().unwrap().subset(codes).unwrap();
        let board = Board::rectangle(3000.0, 3000.0).unwrap();
        PlacementGraph::new(Arc::new(board), Arc::new(catalogue), Tolerances::default())
    }

    fn centre() -> Point2<f64> {
        Point2::new(1500.0, 1500.0)
    }

    #[test]
    fn add_placement_assigns_sequential_ids_and_counts_open_ends() {
        let mut graph = setup(&["R600"]);
        let id = graph.add_placement("R600", centre(), 0.0, false).unwrap().id.clone();
        assert_eq!(id, "placement-0");
        assert_eq!(graph.metrics().open_ends, 2);
        assert_eq!(graph.metrics().total_length, 168.0);
        assert_eq!(graph.straight_runs(), vec![168.0]);
        assert_eq!(graph.metrics().straight_run_count, 1);
        assert_eq!(graph.metrics().longest_straight_run, 168.0);
    }

    #[test]
    fn add_placement_rejects_unknown_pieces() {
        let mut graph = setup(&["R600"]);
        assert_eq!(
            graph.add_placement("R999", centre(), 0.0, false).unwrap_err(),
            GraphError::UnknownPiece("R999".into())
        );
    }

    #[test]
    fn add_placement_rejects_overlap() {
        let mut graph = setup(&["R600"]);
        graph.add_placement("R600", centre(), 0.0, false).unwrap();
        let err = graph
            .add_placement("R600", centre(), 90.0, false)
            .unwrap_err();
        assert!(matches!(err, GraphError::GeometryConflict { .. }));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn add_placement_rejects_pieces_off_the_board() {
        let mut graph = setup(&["R600"]);
        let err = graph
            .add_placement("R600", Point2::new(10.0, 10.0), 0.0, false)
            .unwrap_err();
        assert_eq!(err, GraphError::OutOfBounds { code: "R600".into() });
    }

    #[test]
    fn connect_joins_abutting_straights_into_one_run() {
        let mut graph = setup(&["R600"]);
        graph.add_placement("R600", centre(), 0.0, false).unwrap();
        graph
            .add_placement("R600", Point2::new(1668.0, 1500.0), 0.0, false)
            .unwrap();
        let c = graph.connect(0, 1, 1, 0).unwrap();
        assert_eq!(c, Connection::new(PortRef::new(0, 1), PortRef::new(1, 0)));
        assert_eq!(graph.metrics().open_ends, 2);
        assert_eq!(graph.straight_runs(), vec![336.0]);
        assert_eq!(graph.metrics().straight_run_count, 1);
        assert_eq!(graph.metrics().longest_straight_run, 336.0);
        assert_eq!(graph.connections().len(), 1);
    }

    #[test]
    fn connect_reports_mismatch_and_occupied_ports() {
        let mut graph = setup(&["R600"]);
        graph.add_placement("R600", centre(), 0.0, false).unwrap();
        graph
            .add_placement("R600", Point2::new(1668.0, 1500.0), 0.0, false)
            .unwrap();
        graph
            .add_placement("R600", Point2::new(1500.0, 1700.0), 0.0, false)
            .unwrap();
        assert!(matches!(
            graph.connect(0, 1, 2, 0),
            Err(GraphError::PortMismatch { .. })
        ));
        graph.connect(0, 1, 1, 0).unwrap();
        assert_eq!(
            graph.connect(1, 0, 2, 0).unwrap_err(),
            GraphError::PortOccupied(PortRef::new(1, 0))
        );
        assert_eq!(
            graph.connect(7, 0, 1, 1).unwrap_err(),
            GraphError::UnknownPlacement(7)
        );
    }

    #[test]
    fn attach_leaves_the_original_graph_untouched() {
        let mut graph = setup(&["R600", "R606"]);
        graph.add_placement("R600", centre(), 0.0, false).unwrap();
        let (next, index) = graph.attach("R606", 0, false, PortRef::new(0, 1)).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(next.len(), 2);
        assert_eq!(index, 1);
        assert_eq!(next.connections().len(), 1);
        let joined = next.world_port(PortRef::new(1, 0)).unwrap();
        let target = next.world_port(PortRef::new(0, 1)).unwrap();
        assert!(ports_align(joined, target, next.tolerances()));
        assert_eq!(next.metrics().open_ends, 2);
    }

    #[test]
    fn attach_rejects_occupied_target() {
        let mut graph = setup(&["R600"]);
        graph.add_placement("R600", centre(), 0.0, false).unwrap();
        let (next, _) = graph.attach("R600", 0, false, PortRef::new(0, 1)).unwrap();
        assert_eq!(
            next.attach("R600", 0, false, PortRef::new(0, 1)).unwrap_err(),
            GraphError::PortOccupied(PortRef::new(0, 1))
        );
        assert!(matches!(
            next.attach("R600", 5, false, PortRef::new(1, 1)),
            Err(GraphError::PortOutOfRange { port: 5, .. })
        ));
    }

    #[test]
    fn eight_curves_close_a_circle_with_one_loop() {
        let mut graph = setup(&["R606"]);
        graph.add_placement("R606", centre(), 0.0, false).unwrap();
        for _ in 0..7 {
            let last = graph.len() - 1;
            let (next, _) = graph.attach("R606", 0, false, PortRef::new(last, 1)).unwrap();
            graph = next;
        }
        assert_eq!(graph.len(), 8);
        assert_eq!(graph.metrics().loop_count, 1);
        assert_eq!(graph.metrics().open_ends, 0);
        assert_eq!(graph.connections().len(), 8);
    }

    #[test]
    fn from_records_derives_connections() {
        let mut graph = setup(&["R600", "R606"]);
        graph.add_placement("R600", centre(), 0.0, false).unwrap();
        let (graph, _) = graph.attach("R606", 0, false, PortRef::new(0, 1)).unwrap();
        let records = graph.to_records();
        let rebuilt = PlacementGraph::from_records(
            graph.board().clone(),
            graph.catalogue().clone(),
            *graph.tolerances(),
            &records,
        )
        .unwrap();
        assert_eq!(rebuilt.to_records(), records);
        assert_eq!(rebuilt.connections(), graph.connections());
        assert_eq!(rebuilt.signature(), graph.signature());
    }

    #[test]
    fn insert_unchecked_rejects_duplicate_ids() {
        let mut graph = setup(&["R600"]);
        graph.insert_unchecked("a", "R600", Pose::new(centre(), 0.0, false)).unwrap();
        assert_eq!(
            graph
                .insert_unchecked("a", "R600", Pose::new(centre(), 0.0, false))
                .unwrap_err(),
            GraphError::DuplicateId("a".into())
        );
    }

    #[test]
    fn generated_ids_skip_imported_ones() {
        let mut graph = setup(&["R600"]);
        graph
            .insert_unchecked("placement-0", "R600", Pose::new(centre(), 0.0, false))
            .unwrap();
        let id = graph
            .add_placement("R600", Point2::new(1500.0, 1000.0), 0.0, false)
            .unwrap()
            .id
            .clone();
        assert_eq!(id, "placement-1");
    }

    #[test]
    fn signature_ignores_insertion_order() {
        let mut a = setup(&["R600"]);
        a.add_placement("R600", centre(), 0.0, false).unwrap();
        a.add_placement("R600", Point2::new(1500.0, 1000.0), 0.0, false).unwrap();
        let mut b = setup(&["R600"]);
        b.add_placement("R600", Point2::new(1500.0, 1000.0), 0.0, false).unwrap();
        b.add_placement("R600", centre(), 180.0, false).unwrap();
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn misaligned_joints_are_listed() {
        let mut graph = setup(&["R600"]);
        graph.add_placement("R600", centre(), 0.0, false).unwrap();
        // Second straight meets the first end-on at a right angle.
        graph
            .insert_unchecked("b", "R600", Pose::new(Point2::new(1584.0, 1584.0), 90.0, false))
            .unwrap();
        assert_eq!(graph.derive_connections(), 0);
        assert_eq!(
            graph.faulty_joints(),
            vec![(PortRef::new(0, 1), PortRef::new(1, 0), JointFault::Misaligned)]
        );
    }

    #[test]
    fn abutting_ports_with_different_connectors_stay_open() {
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
        let catalogue = Catalogue::from_toml_str(content, "inline").unwrap();
        let board = Board::rectangle(3000.0, 3000.0).unwrap();
        let mut graph = PlacementGraph::new(Arc::new(board), Arc::new(catalogue), Tolerances::default());
        graph.add_placement("OO168", centre(), 0.0, false).unwrap();
        graph
            .add_placement("N168", Point2::new(1668.0, 1500.0), 0.0, false)
            .unwrap();
        assert_eq!(graph.derive_connections(), 0);
        assert_eq!(graph.connector(PortRef::new(1, 0)), Some("n-gauge"));
        assert_eq!(
            graph.faulty_joints(),
            vec![(PortRef::new(0, 1), PortRef::new(1, 0), JointFault::IncompatibleConnector)]
        );
    }

    #[test]
    fn closure_estimate_grows_as_an_arc_curls_back() {
        let mut graph = setup(&["R606"]);
        graph.add_placement("R606", centre(), 0.0, false).unwrap();
        let mut estimates = vec![graph.closure_estimate()];
        for _ in 0..6 {
            let last = graph.len() - 1;
            let (next, _) = graph.attach("R606", 0, false, PortRef::new(last, 1)).unwrap();
            graph = next;
            estimates.push(graph.closure_estimate());
        }
        for pair in estimates.windows(2) {
            assert!(pair[1] > pair[0], "{:?}", estimates);
        }
        assert!(estimates.iter().all(|&e| (0.0..1.0).contains(&e)));
    }

    #[test]
    fn closure_estimate_is_low_for_a_straight_line() {
        let mut graph = setup(&["R600"]);
        graph.add_placement("R600", centre(), 0.0, false).unwrap();
        let (graph, _) = graph.attach("R600", 0, false, PortRef::new(0, 1)).unwrap();
        assert!(graph.closure_estimate() < 1e-9);
    }

    #[test]
    fn straight_runs_stay_separate_across_a_curve() {
        let mut graph = setup(&["R600", "R606"]);
        graph.add_placement("R600", centre(), 0.0, false).unwrap();
        let (graph, _) = graph.attach("R606", 0, false, PortRef::new(0, 1)).unwrap();
        let (graph, _) = graph.attach("R600", 0, false, PortRef::new(1, 1)).unwrap();
        let (graph, _) = graph.attach("R600", 0, false, PortRef::new(2, 1)).unwrap();
        assert_eq!(graph.metrics().straight_run_count, 2);
        assert_eq!(graph.metrics().longest_straight_run, 336.0);
        assert_eq!(graph.straight_runs(), vec![336.0, 168.0]);
    }
}
