//! Node: one grid point and its classification bounds.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Class label. Classes are `0..num_classes`.
pub type ClassId = u32;

/// A grid point: one value per attribute. Inline up to eight attributes.
pub type Point = SmallVec<[u32; 8]>;

/// Arena index of a node. Equal to the mixed-radix index of its point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction along the covering relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards dominating points (one coordinate + 1).
    Up,
    /// Towards dominated points (one coordinate - 1).
    Down,
}

/// A lattice node.
///
/// `lower` and `upper` bracket the class the point may still take.
/// The node is confirmed once they meet; after that neither moves.
/// Neighbor slots hold arena indices, never owning references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub point: Point,
    pub lower: ClassId,
    pub upper: ClassId,
    /// `up[i]`: the node with attribute `i` one greater, if in range.
    pub up: SmallVec<[Option<NodeId>; 8]>,
    /// `down[i]`: the node with attribute `i` one less, if in range.
    pub down: SmallVec<[Option<NodeId>; 8]>,
}

impl Node {
    pub fn new(id: NodeId, point: Point, num_classes: u32) -> Self {
        let dims = point.len();
        Self {
            id,
            point,
            lower: 0,
            upper: num_classes.saturating_sub(1),
            up: SmallVec::from_elem(None, dims),
            down: SmallVec::from_elem(None, dims),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.lower == self.upper
    }

    /// The final class, once confirmed.
    pub fn class(&self) -> Option<ClassId> {
        self.is_confirmed().then_some(self.lower)
    }

    /// Whether `class` is still possible for this point.
    pub fn admits(&self, class: ClassId) -> bool {
        self.lower <= class && class <= self.upper
    }

    /// Neighbors in one direction, skipping absent slots.
    pub fn neighbors(&self, dir: Direction) -> impl Iterator<Item = NodeId> + '_ {
        let slots = match dir {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        };
        slots.iter().flatten().copied()
    }

    /// Sum of coordinates; the rank of the point in the grid order.
    pub fn rank(&self) -> u64 {
        self.point.iter().map(|&v| u64::from(v)).sum()
    }

    /// Coordinate-wise `self <= other`.
    pub fn dominated_by(&self, other: &Node) -> bool {
        dominates(&other.point, &self.point)
    }
}

/// Coordinate-wise `lo <= hi`.
pub fn dominates(hi: &[u32], lo: &[u32]) -> bool {
    hi.len() == lo.len() && hi.iter().zip(lo).all(|(h, l)| h >= l)
}
