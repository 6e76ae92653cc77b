use super::ids::PieceKey;
use crate::core::geometry::Pose;
use serde::{Deserialize, Serialize};

/// A catalogue piece fixed on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: String,
    pub code: String,
    pub piece: PieceKey,
    pub pose: Pose,
}

/// Identifies one port of one placement, by placement index within a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRef {
    pub placement: usize,
    pub port: usize,
}

impl PortRef {
    pub fn new(placement: usize, port: usize) -> Self {
        Self { placement, port }
    }
}

/// An undirected joint between two ports, stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    pub a: PortRef,
    pub b: PortRef,
}

impl Connection {
    pub fn new(x: PortRef, y: PortRef) -> Self {
        if x <= y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }

    pub fn involves(&self, port: PortRef) -> bool {
        self.a == port || self.b == port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_orders_its_endpoints() {
        let c = Connection::new(PortRef::new(3, 1), PortRef::new(0, 2));
        assert_eq!(c.a, PortRef::new(0, 2));
        assert_eq!(c.b, PortRef::new(3, 1));
        assert_eq!(c, Connection::new(PortRef::new(0, 2), PortRef::new(3, 1)));
        assert!(c.involves(PortRef::new(3, 1)));
    }
}
