//! Ranking statistics over the unconfirmed subgraph.
//!
//! Recomputed after every answer: confirming nodes changes reachability.
//! Per-node sweeps only read the lattice, so they fan out over the
//! worker pool against one consistent snapshot.

use std::cmp::Ordering;
use std::collections::VecDeque;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;
use crate::model::*;
use crate::parallel;

/// Unconfirmed points reachable from a node, excluding the node itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Umbrella {
    /// Reachable via up-edges.
    pub above: usize,
    /// Reachable via down-edges.
    pub below: usize,
}

impl Umbrella {
    pub fn total(&self) -> usize {
        self.above + self.below
    }

    pub fn imbalance(&self) -> usize {
        self.above.abs_diff(self.below)
    }
}

/// Count unconfirmed nodes reachable from `start` along `dir`.
pub fn reach(lattice: &Lattice, start: NodeId, dir: Direction) -> usize {
    let mut visited: HashSet<NodeId> = HashSet::new();
    visited.insert(start);
    let mut queue = VecDeque::from([start]);
    let mut count = 0;

    while let Some(id) = queue.pop_front() {
        for next in lattice.node(id).neighbors(dir) {
            if lattice.node(next).is_confirmed() || !visited.insert(next) {
                continue;
            }
            count += 1;
            queue.push_back(next);
        }
    }
    count
}

pub fn umbrella(lattice: &Lattice, id: NodeId) -> Umbrella {
    Umbrella {
        above: reach(lattice, id, Direction::Up),
        below: reach(lattice, id, Direction::Down),
    }
}

/// Umbrellas for every node of `frontier`, in frontier order.
pub fn umbrellas(lattice: &Lattice, frontier: &[NodeId]) -> Vec<Umbrella> {
    parallel::map(frontier, |&id| umbrella(lattice, id))
}

/// Index of the best item under `cmp` (`Greater` = better); the first
/// one wins ties, so selection is deterministic in frontier order.
pub(crate) fn best_index<T, F>(items: &[T], mut cmp: F) -> Option<usize>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut best: Option<usize> = None;
    for (i, item) in items.iter().enumerate() {
        match best {
            Some(b) if cmp(item, &items[b]) != Ordering::Greater => {}
            _ => best = Some(i),
        }
    }
    best
}
