//! Query-selection strategies.
//!
//! A [`Strategy`] is chosen once per run and turned into a [`Selector`],
//! which ranks the unconfirmed frontier and names the next point to ask.
//!
//! | Strategy | Picks |
//! |----------|-------|
//! | `ChainMidpoint` | midpoint of the largest unconfirmed chain chunk |
//! | `LongestPath` | midpoint of the longest unconfirmed up-path |
//! | `Minimax` | node with the best worst-case number of confirmations |
//! | `Umbrella*` | node with the largest / most balanced umbrella |

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;
use crate::model::*;
use crate::parallel;
use crate::propagate;
use super::ratio::BalanceRatio;
use super::stats::{self, Umbrella, best_index};

// ============================================================================
// Strategy
// ============================================================================

/// How the interviewer picks its next question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Binary search along Hansel chains.
    #[default]
    ChainMidpoint,
    /// Binary search along the longest unconfirmed up-path.
    LongestPath,
    /// Maximize the guaranteed number of confirmations; ties by `ratio`.
    Minimax {
        #[serde(default)]
        ratio: BalanceRatio,
    },
    /// Largest `above + below`.
    UmbrellaTotal,
    /// Largest `above`.
    UmbrellaAbove,
    /// Largest `below`.
    UmbrellaBelow,
    /// Smallest `|above - below|`; ties by largest total.
    UmbrellaBalanced,
    /// Highest balance ratio.
    UmbrellaRatio {
        #[serde(default)]
        ratio: BalanceRatio,
    },
}

impl Strategy {
    /// Every strategy, each ratio-driven one once per ratio.
    pub fn all() -> Vec<Strategy> {
        let mut all = vec![
            Self::ChainMidpoint,
            Self::LongestPath,
            Self::UmbrellaTotal,
            Self::UmbrellaAbove,
            Self::UmbrellaBelow,
            Self::UmbrellaBalanced,
        ];
        for ratio in BalanceRatio::ALL {
            all.push(Self::Minimax { ratio });
            all.push(Self::UmbrellaRatio { ratio });
        }
        all
    }

    /// Build the selector for one run over `chains`.
    pub fn selector(self, chains: &[Chain]) -> Box<dyn Selector> {
        match self {
            Self::ChainMidpoint => Box::new(ChainMidpoint::new(chains)),
            Self::LongestPath => Box::new(LongestPath),
            Self::Minimax { ratio } => Box::new(Minimax { ratio }),
            Self::UmbrellaTotal => Box::new(UmbrellaSort { key: UmbrellaKey::Total }),
            Self::UmbrellaAbove => Box::new(UmbrellaSort { key: UmbrellaKey::Above }),
            Self::UmbrellaBelow => Box::new(UmbrellaSort { key: UmbrellaKey::Below }),
            Self::UmbrellaBalanced => Box::new(UmbrellaSort { key: UmbrellaKey::Balanced }),
            Self::UmbrellaRatio { ratio } => {
                Box::new(UmbrellaSort { key: UmbrellaKey::Ratio(ratio) })
            }
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChainMidpoint => write!(f, "chain-midpoint"),
            Self::LongestPath => write!(f, "longest-path"),
            Self::Minimax { ratio } => write!(f, "minimax({ratio})"),
            Self::UmbrellaTotal => write!(f, "umbrella-total"),
            Self::UmbrellaAbove => write!(f, "umbrella-above"),
            Self::UmbrellaBelow => write!(f, "umbrella-below"),
            Self::UmbrellaBalanced => write!(f, "umbrella-balanced"),
            Self::UmbrellaRatio { ratio } => write!(f, "umbrella-ratio({ratio})"),
        }
    }
}

// ============================================================================
// Selector
// ============================================================================

/// Per-run selection state.
///
/// `frontier` always holds exactly the unconfirmed nodes, in id order.
pub trait Selector: Send {
    /// Next node to query, or `None` when nothing is left to ask.
    fn select(&mut self, lattice: &Lattice, frontier: &[NodeId]) -> Option<NodeId>;

    /// Called after every answer with the nodes it confirmed.
    fn observe(&mut self, _lattice: &Lattice, _confirmed: &[NodeId]) {}
}

// ============================================================================
// Chain midpoint
// ============================================================================

/// Binary search over chain chunks: runs of unconfirmed nodes within one chain.
pub struct ChainMidpoint {
    chunks: Vec<Vec<NodeId>>,
    primed: bool,
}

impl ChainMidpoint {
    pub fn new(chains: &[Chain]) -> Self {
        Self {
            chunks: chains.iter().map(|c| c.nodes.clone()).collect(),
            primed: false,
        }
    }

    pub fn chunks(&self) -> &[Vec<NodeId>] {
        &self.chunks
    }

    /// Cut every chunk at its confirmed nodes, keeping the runs between them.
    fn split(&mut self, lattice: &Lattice) {
        let mut next = Vec::with_capacity(self.chunks.len());
        for chunk in self.chunks.drain(..) {
            let mut run = Vec::new();
            for id in chunk {
                if lattice.node(id).is_confirmed() {
                    if !run.is_empty() {
                        next.push(std::mem::take(&mut run));
                    }
                } else {
                    run.push(id);
                }
            }
            if !run.is_empty() {
                next.push(run);
            }
        }
        self.chunks = next;
        self.primed = true;
    }
}

impl Selector for ChainMidpoint {
    fn select(&mut self, lattice: &Lattice, _frontier: &[NodeId]) -> Option<NodeId> {
        if !self.primed {
            self.split(lattice);
        }
        let largest = best_index(&self.chunks, |a, b| a.len().cmp(&b.len()))?;
        let chunk = &self.chunks[largest];
        Some(chunk[chunk.len() / 2])
    }

    fn observe(&mut self, lattice: &Lattice, _confirmed: &[NodeId]) {
        self.split(lattice);
    }
}

// ============================================================================
// Longest expansion path
// ============================================================================

/// Midpoint of the longest directed up-path through unconfirmed nodes.
pub struct LongestPath;

impl LongestPath {
    /// Longest unconfirmed up-path, lowest node first.
    pub fn path(lattice: &Lattice, frontier: &[NodeId]) -> Vec<NodeId> {
        // length[i]: nodes on the longest path starting at i; 0 = confirmed.
        let mut length = vec![0u32; lattice.len()];
        let mut next: Vec<Option<NodeId>> = vec![None; lattice.len()];

        // Up-edges raise rank by one, so a sweep in descending rank sees every
        // neighbor settled before the node itself: one pass is the fixpoint.
        let mut order = frontier.to_vec();
        order.sort_by_key(|&id| (std::cmp::Reverse(lattice.node(id).rank()), id));

        for &id in &order {
            let mut best: Option<NodeId> = None;
            for up in lattice.node(id).neighbors(Direction::Up) {
                let len = length[up.index()];
                if len == 0 {
                    continue;
                }
                match best {
                    Some(b) if length[b.index()] >= len => {}
                    _ => best = Some(up),
                }
            }
            length[id.index()] = 1 + best.map_or(0, |b| length[b.index()]);
            next[id.index()] = best;
        }

        let Some(start) = best_index(frontier, |a, b| length[a.index()].cmp(&length[b.index()]))
            .map(|i| frontier[i])
        else {
            return Vec::new();
        };

        let mut path = vec![start];
        while let Some(up) = next[path[path.len() - 1].index()] {
            path.push(up);
        }
        path
    }
}

impl Selector for LongestPath {
    fn select(&mut self, lattice: &Lattice, frontier: &[NodeId]) -> Option<NodeId> {
        let path = Self::path(lattice, frontier);
        path.get(path.len() / 2).copied()
    }
}

// ============================================================================
// Minimax confirmed
// ============================================================================

/// Per-class confirmation counts for one candidate, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimaxScore {
    pub node: NodeId,
    pub counts: Vec<usize>,
    pub umbrella: Umbrella,
    pub ratio: f64,
}

impl MinimaxScore {
    /// Guaranteed confirmations: the smallest count over feasible classes.
    pub fn worst_case(&self) -> usize {
        self.counts.first().copied().unwrap_or(0)
    }
}

/// Maximize the number of confirmations the worst possible answer still yields.
pub struct Minimax {
    ratio: BalanceRatio,
}

impl Minimax {
    pub fn new(ratio: BalanceRatio) -> Self {
        Self { ratio }
    }

    /// Score every frontier node against every class it may still take.
    pub fn scores(&self, lattice: &Lattice, frontier: &[NodeId]) -> Vec<MinimaxScore> {
        let ratio = self.ratio;
        parallel::map(frontier, |&id| {
            let node = lattice.node(id);
            let mut counts: Vec<usize> = (node.lower..=node.upper)
                .filter_map(|class| propagate::plan(lattice, id, class).ok())
                .map(|plan| plan.confirms(lattice))
                .collect();
            counts.sort_unstable();
            let umbrella = stats::umbrella(lattice, id);
            MinimaxScore { node: id, counts, umbrella, ratio: ratio.score(&umbrella) }
        })
    }

    fn compare(a: &MinimaxScore, b: &MinimaxScore) -> Ordering {
        a.counts.cmp(&b.counts).then_with(|| a.ratio.total_cmp(&b.ratio))
    }
}

impl Selector for Minimax {
    fn select(&mut self, lattice: &Lattice, frontier: &[NodeId]) -> Option<NodeId> {
        let scores = self.scores(lattice, frontier);
        best_index(&scores, Self::compare).map(|i| scores[i].node)
    }
}

// ============================================================================
// Umbrella sort
// ============================================================================

/// Which umbrella statistic ranks the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UmbrellaKey {
    Total,
    Above,
    Below,
    Balanced,
    Ratio(BalanceRatio),
}

impl UmbrellaKey {
    /// `Greater` when `a` ranks better than `b`.
    fn compare(self, a: &Umbrella, b: &Umbrella) -> Ordering {
        match self {
            Self::Total => a.total().cmp(&b.total()),
            Self::Above => a.above.cmp(&b.above),
            Self::Below => a.below.cmp(&b.below),
            Self::Balanced => b.imbalance().cmp(&a.imbalance())
                .then_with(|| a.total().cmp(&b.total())),
            Self::Ratio(ratio) => ratio.score(a).total_cmp(&ratio.score(b)),
        }
    }
}

pub struct UmbrellaSort {
    key: UmbrellaKey,
}

impl UmbrellaSort {
    pub fn new(key: UmbrellaKey) -> Self {
        Self { key }
    }
}

impl Selector for UmbrellaSort {
    fn select(&mut self, lattice: &Lattice, frontier: &[NodeId]) -> Option<NodeId> {
        let umbrellas = stats::umbrellas(lattice, frontier);
        let key = self.key;
        best_index(&umbrellas, |a, b| key.compare(a, b)).map(|i| frontier[i])
    }
}

// ============================================================================
// Tests
// ============================================================================
