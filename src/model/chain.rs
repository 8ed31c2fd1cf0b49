//! Chain: an ordered run of nodes, each one up-step above the last.

use serde::{Deserialize, Serialize};
use super::NodeId;

/// A saturated chain in the lattice.
///
/// Consecutive nodes differ by exactly one unit in exactly one coordinate,
/// lowest node first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub nodes: Vec<NodeId>,
}

impl Chain {
    pub fn single(node: NodeId) -> Self {
        Self { nodes: vec![node] }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bottom(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn top(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Extend the chain upwards.
    pub fn append(&mut self, node: NodeId) {
        self.nodes.push(node);
    }

    /// Remove and return the top node.
    pub fn pop_top(&mut self) -> Option<NodeId> {
        self.nodes.pop()
    }
}
