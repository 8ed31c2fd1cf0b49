//! # Hansel Chain Decomposition
//!
//! Partitions the lattice into disjoint saturated chains, inductively over
//! the attributes.
//!
//! Folding attribute `i` (cardinality `k`) turns every current chain
//! `x_0 < … < x_m` into `k` copies, copy `j` having attribute `i` fixed to
//! `j`. The copies are then adjusted: for `j = 0, 1, …` copy `j` takes the
//! top node of each later copy `j' > j`, in order, and emptied copies are
//! dropped.
//!
//! ```text
//!   chain x0 < x1 < x2, k = 3
//!
//!   copy 0:  x0·0  x1·0  x2·0  x2·1  x2·2
//!   copy 1:  x0·1  x1·1  x1·2
//!   copy 2:  x0·2
//! ```
//!
//! Every adjusted chain still climbs one unit step at a time, so the
//! result is a symmetric chain decomposition of the grid.

use crate::lattice::Lattice;
use crate::model::*;
use crate::parallel;
use crate::{Error, Result};

/// Decompose `lattice` into Hansel chains and validate the result.
pub fn decompose(lattice: &Lattice) -> Result<Vec<Chain>> {
    let radix = lattice.radix();
    let mut chains = vec![Chain::single(NodeId(0))];

    for (i, &k) in radix.k_values().iter().enumerate() {
        let stride = radix.stride(i);
        let folded = parallel::map(&chains, |chain| fold(chain, k, stride));
        chains = folded.into_iter().flatten().collect();
        tracing::debug!(attribute = i, cardinality = k, chains = chains.len(), "attribute folded");
    }

    validate(lattice, &chains)?;

    tracing::info!(
        chains = chains.len(),
        longest = chains.iter().map(Chain::len).max().unwrap_or(0),
        "hansel chains built"
    );
    Ok(chains)
}

/// Fold one attribute into a single chain: `k` copies, then the adjustment.
fn fold(chain: &Chain, k: u32, stride: u32) -> Vec<Chain> {
    let mut copies: Vec<Chain> = (0..k)
        .map(|j| Chain {
            nodes: chain.nodes.iter().map(|id| NodeId(id.0 + j * stride)).collect(),
        })
        .collect();

    for j in 0..copies.len() {
        for donor in j + 1..copies.len() {
            if let Some(top) = copies[donor].pop_top() {
                copies[j].append(top);
            }
        }
    }

    copies.retain(|c| !c.is_empty());
    copies
}

/// Check that `chains` partition the lattice and that each chain is saturated:
/// every consecutive pair is a single up-step (Hamming distance 1).
pub fn validate(lattice: &Lattice, chains: &[Chain]) -> Result<()> {
    let mut seen = vec![false; lattice.len()];
    let mut covered = 0usize;

    for (c, chain) in chains.iter().enumerate() {
        if chain.is_empty() {
            return Err(Error::InvariantViolation(format!("chain {c} is empty")));
        }
        for &id in &chain.nodes {
            let slot = seen.get_mut(id.index()).ok_or_else(|| {
                Error::InvariantViolation(format!("chain {c} references unknown node {id}"))
            })?;
            if *slot {
                return Err(Error::InvariantViolation(format!(
                    "node {:?} appears in more than one chain",
                    lattice.node(id).point.as_slice()
                )));
            }
            *slot = true;
            covered += 1;
        }
        for pair in chain.nodes.windows(2) {
            let (lo, hi) = (lattice.node(pair[0]), lattice.node(pair[1]));
            if !lo.up.contains(&Some(hi.id)) {
                return Err(Error::InvariantViolation(format!(
                    "chain {c} is broken between {:?} and {:?}",
                    lo.point.as_slice(), hi.point.as_slice()
                )));
            }
        }
    }

    if covered != lattice.len() {
        return Err(Error::InvariantViolation(format!(
            "chains cover {covered} of {} nodes",
            lattice.len()
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
