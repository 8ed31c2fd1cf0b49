//! Balance ratios: scoring an umbrella by how large and how evenly split it is.

use serde::{Deserialize, Serialize};

use super::stats::Umbrella;

/// Scoring function over a node's umbrella `(above, below, total)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceRatio {
    /// `total · min(above, below) / max(above, below)`.
    #[default]
    Unity,
    /// `total · H(above / total², below / total²)` with `H` the binary
    /// Shannon sum. The squared denominator is kept as is; it is not a
    /// probability normalization.
    Entropy,
    /// `total · (above / total) · (below / total)`.
    Quadratic,
}

impl BalanceRatio {
    pub const ALL: [BalanceRatio; 3] = [Self::Unity, Self::Entropy, Self::Quadratic];

    pub fn score(self, umbrella: &Umbrella) -> f64 {
        let above = umbrella.above as f64;
        let below = umbrella.below as f64;
        let total = umbrella.total() as f64;
        match self {
            Self::Unity => {
                if umbrella.below == 0 {
                    return f64::NEG_INFINITY;
                }
                total * above.min(below) / above.max(below)
            }
            Self::Entropy => {
                if umbrella.total() == 0 {
                    return 0.0;
                }
                let square = total * total;
                let p = above / square;
                let q = below / square;
                total * -(plog2p(p) + plog2p(q))
            }
            Self::Quadratic => {
                if umbrella.total() == 0 {
                    return 0.0;
                }
                total * (above / total) * (below / total)
            }
        }
    }
}

/// `p · log2 p`, with `0 · log2 0 = 0`.
fn plog2p(p: f64) -> f64 {
    if p > 0.0 { p * p.log2() } else { 0.0 }
}

impl std::fmt::Display for BalanceRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unity => write!(f, "unity"),
            Self::Entropy => write!(f, "entropy"),
            Self::Quadratic => write!(f, "quadratic"),
        }
    }
}
