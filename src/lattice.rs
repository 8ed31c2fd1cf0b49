//! # Grid Lattice
//!
//! Owns every node of the product grid `∏ [0, k_i)` in a flat arena.
//!
//! Node ids are the positional mixed-radix index of the point,
//! `Σ value_i · Π_{j<i} k_j`, so coordinate → node lookup is a bijective
//! O(d) computation and neighbor slots are plain indices into the arena.
//!
//! ```text
//!   k = [3, 2]          id = x0 + 3·x1
//!
//!   (0,1)=3 ─ (1,1)=4 ─ (2,1)=5
//!     │         │         │
//!   (0,0)=0 ─ (1,0)=1 ─ (2,0)=2
//! ```

use smallvec::{SmallVec, smallvec};

use crate::model::*;
use crate::parallel;
use crate::{Error, Result};

// ============================================================================
// Mixed-radix encoding
// ============================================================================

/// Shape of the grid plus the positional encoding of its points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Radix {
    k_values: SmallVec<[u32; 8]>,
    strides: SmallVec<[u64; 8]>,
    size: u32,
}

impl Radix {
    pub fn new(k_values: &[u32]) -> Result<Self> {
        if k_values.is_empty() {
            return Err(Error::Config("at least one attribute is required".into()));
        }
        let mut strides = SmallVec::with_capacity(k_values.len());
        let mut size: u64 = 1;
        for (i, &k) in k_values.iter().enumerate() {
            if k == 0 {
                return Err(Error::Config(format!("attribute {i} has cardinality 0")));
            }
            strides.push(size);
            size = size
                .checked_mul(u64::from(k))
                .filter(|s| *s <= u64::from(u32::MAX))
                .ok_or_else(|| Error::Config(format!(
                    "grid {k_values:?} has more points than node ids can address"
                )))?;
        }
        Ok(Self {
            k_values: k_values.into(),
            strides,
            size: size as u32,
        })
    }

    pub fn dims(&self) -> usize {
        self.k_values.len()
    }

    pub fn len(&self) -> usize {
        self.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn k_values(&self) -> &[u32] {
        &self.k_values
    }

    /// Stride of attribute `i`: the id distance between points that differ
    /// by one in that attribute only.
    pub fn stride(&self, i: usize) -> u32 {
        self.strides[i] as u32
    }

    /// Point → id. `None` when the point is outside the grid.
    pub fn encode(&self, point: &[u32]) -> Option<NodeId> {
        if point.len() != self.k_values.len() {
            return None;
        }
        let mut index: u64 = 0;
        for ((&v, &k), &stride) in point.iter().zip(&self.k_values).zip(&self.strides) {
            if v >= k {
                return None;
            }
            index += u64::from(v) * stride;
        }
        Some(NodeId(index as u32))
    }

    /// Id → point.
    pub fn decode(&self, id: NodeId) -> Option<Point> {
        if id.0 >= self.size {
            return None;
        }
        let mut rest = id.0;
        Some(self.k_values.iter().map(|&k| {
            let v = rest % k;
            rest /= k;
            v
        }).collect())
    }

    /// Resolve the covering neighbors of `node` by coordinate lookup.
    fn wire(&self, node: &mut Node) {
        let mut probe = node.point.clone();
        for i in 0..self.dims() {
            let v = node.point[i];
            if v + 1 < self.k_values[i] {
                probe[i] = v + 1;
                node.up[i] = self.encode(&probe);
            }
            if v > 0 {
                probe[i] = v - 1;
                node.down[i] = self.encode(&probe);
            }
            probe[i] = v;
        }
    }
}

// ============================================================================
// Lattice
// ============================================================================

/// Every grid point as a [`Node`], wired along the covering relation.
///
/// Built once per run and never resized. Only node bounds mutate afterwards.
#[derive(Debug, Clone)]
pub struct Lattice {
    radix: Radix,
    num_classes: u32,
    nodes: Vec<Node>,
}

impl Lattice {
    /// Enumerate the grid (odometer order, attribute 0 fastest) and wire neighbors.
    pub fn build(k_values: &[u32], num_classes: u32) -> Result<Self> {
        if num_classes < 2 {
            return Err(Error::Config(format!(
                "at least 2 classes are required, got {num_classes}"
            )));
        }
        let radix = Radix::new(k_values)?;
        let dims = radix.dims();

        let mut nodes = Vec::with_capacity(radix.len());
        let mut point: Point = smallvec![0; dims];
        for index in 0..radix.size {
            debug_assert_eq!(radix.encode(&point), Some(NodeId(index)));
            nodes.push(Node::new(NodeId(index), point.clone(), num_classes));
            for i in 0..dims {
                point[i] += 1;
                if point[i] < radix.k_values[i] {
                    break;
                }
                point[i] = 0;
            }
        }

        parallel::for_each_mut(&mut nodes, |node| radix.wire(node));

        tracing::info!(
            dims,
            nodes = nodes.len(),
            num_classes,
            "lattice built"
        );

        Ok(Self { radix, num_classes, nodes })
    }

    pub fn radix(&self) -> &Radix {
        &self.radix
    }

    pub fn dims(&self) -> usize {
        self.radix.dims()
    }

    pub fn k_values(&self) -> &[u32] {
        self.radix.k_values()
    }

    pub fn num_classes(&self) -> u32 {
        self.num_classes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node by id. Ids come from this lattice, so indexing cannot miss.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn id_of(&self, point: &[u32]) -> Option<NodeId> {
        self.radix.encode(point)
    }

    pub fn node_at(&self, point: &[u32]) -> Option<&Node> {
        self.id_of(point).map(|id| self.node(id))
    }

    pub fn unconfirmed(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|n| !n.is_confirmed())
    }

    pub fn confirmed_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_confirmed()).count()
    }

    pub fn is_fully_confirmed(&self) -> bool {
        self.nodes.iter().all(Node::is_confirmed)
    }

    /// Confirmed class per node, in id order.
    pub fn classes(&self) -> Vec<Option<ClassId>> {
        self.nodes.iter().map(Node::class).collect()
    }

    /// Forget every answer: all bounds back to `[0, num_classes - 1]`.
    pub fn reset_bounds(&mut self) {
        let top = self.num_classes - 1;
        for node in &mut self.nodes {
            node.lower = 0;
            node.upper = top;
        }
    }

    /// Audit the bound invariants over every covering pair `p ⋖ q`:
    /// `lower(p) <= upper(p)`, `lower(p) <= lower(q)`, `upper(p) <= upper(q)`.
    /// Covering pairs suffice; the order is their transitive closure.
    pub fn verify_bounds(&self) -> Result<()> {
        for node in &self.nodes {
            if node.lower > node.upper || node.upper >= self.num_classes {
                return Err(Error::InvariantViolation(format!(
                    "node {:?} has bounds [{}, {}]",
                    node.point.as_slice(), node.lower, node.upper
                )));
            }
            for above in node.neighbors(Direction::Up).map(|id| self.node(id)) {
                if node.lower > above.lower || node.upper > above.upper {
                    return Err(Error::InvariantViolation(format!(
                        "bounds of {:?} [{}, {}] exceed those of {:?} [{}, {}]",
                        node.point.as_slice(), node.lower, node.upper,
                        above.point.as_slice(), above.lower, above.upper,
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
