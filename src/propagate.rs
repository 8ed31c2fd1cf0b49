//! # Bound Propagation
//!
//! Turns one confirmed answer into the minimal set of bound updates that
//! monotonicity forces:
//!
//! - **raise-up**: every unconfirmed point above the seed gets `lower >= class`
//! - **lower-down**: every unconfirmed point below the seed gets `upper <= class`
//!
//! Each pass is a breadth-first sweep with its own visited set seeded with
//! the seed node. A sweep does not cross nodes confirmed before it started
//! and does not cross nodes whose bound is already as tight as the new one:
//! by the bound invariant everything behind them is at least as tight too.
//!
//! Propagation is split into [`plan`] (read-only, used both for real answers
//! and for hypothetical ones while ranking) and [`apply`]. The two sweeps
//! touch disjoint node sets (dominators vs. dominated), so they run
//! concurrently against the same `&Lattice`.

use std::collections::VecDeque;

use hashbrown::HashSet;

use crate::lattice::Lattice;
use crate::model::*;
use crate::parallel;
use crate::{Error, Result};

/// Bound updates implied by assigning `class` to `seed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub seed: NodeId,
    pub class: ClassId,
    /// Nodes whose lower bound rises to `class`.
    pub raised: Vec<NodeId>,
    /// Nodes whose upper bound drops to `class`.
    pub lowered: Vec<NodeId>,
    /// Seed was already confirmed; the plan changes nothing.
    pub noop: bool,
}

impl Plan {
    /// How many currently unconfirmed nodes the plan would confirm,
    /// the seed included.
    pub fn confirms(&self, lattice: &Lattice) -> usize {
        if self.noop {
            return 0;
        }
        let up = self.raised.iter().filter(|&&id| lattice.node(id).upper == self.class).count();
        let down = self.lowered.iter().filter(|&&id| lattice.node(id).lower == self.class).count();
        1 + up + down
    }
}

/// Compute the propagation of `class` at `seed` without touching the lattice.
///
/// Fails with [`Error::OutOfBounds`] when `class` lies outside the seed's
/// current bounds: applying it would loosen an established bound.
pub fn plan(lattice: &Lattice, seed: NodeId, class: ClassId) -> Result<Plan> {
    let node = lattice.node(seed);
    if !node.admits(class) {
        return Err(Error::OutOfBounds {
            point: node.point.to_vec(),
            class,
            lower: node.lower,
            upper: node.upper,
        });
    }
    if node.is_confirmed() {
        return Ok(Plan { seed, class, raised: Vec::new(), lowered: Vec::new(), noop: true });
    }

    let (raised, lowered) = parallel::join(
        || sweep(lattice, seed, class, Direction::Up),
        || sweep(lattice, seed, class, Direction::Down),
    );
    Ok(Plan { seed, class, raised, lowered, noop: false })
}

/// Breadth-first sweep from `seed` collecting nodes whose bound tightens.
fn sweep(lattice: &Lattice, seed: NodeId, class: ClassId, dir: Direction) -> Vec<NodeId> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    visited.insert(seed);
    let mut queue = VecDeque::from([seed]);
    let mut touched = Vec::new();

    while let Some(id) = queue.pop_front() {
        for next in lattice.node(id).neighbors(dir) {
            if !visited.insert(next) {
                continue;
            }
            let node = lattice.node(next);
            if node.is_confirmed() {
                continue;
            }
            let tightens = match dir {
                Direction::Up => node.lower < class,
                Direction::Down => node.upper > class,
            };
            if tightens {
                touched.push(next);
                queue.push_back(next);
            }
        }
    }
    touched
}

/// Apply a plan computed against the current state of `lattice`.
///
/// The whole plan is checked before anything is written: a plan gone stale
/// (the lattice moved since it was computed) fails with
/// [`Error::InvariantViolation`] and leaves every bound as it was.
///
/// Returns the nodes confirmed by it, seed first.
pub fn apply(lattice: &mut Lattice, plan: &Plan) -> Result<Vec<NodeId>> {
    if plan.noop {
        return Ok(Vec::new());
    }
    check(lattice, plan)?;
    let class = plan.class;

    let seed = lattice.node_mut(plan.seed);
    seed.lower = class;
    seed.upper = class;
    let mut confirmed = vec![plan.seed];

    for &id in &plan.raised {
        let node = lattice.node_mut(id);
        node.lower = node.lower.max(class);
        if node.is_confirmed() {
            confirmed.push(id);
        }
    }

    for &id in &plan.lowered {
        let node = lattice.node_mut(id);
        node.upper = node.upper.min(class);
        if node.is_confirmed() {
            confirmed.push(id);
        }
    }

    Ok(confirmed)
}

/// Every write of `plan` must stay inside the target's current bounds.
fn check(lattice: &Lattice, plan: &Plan) -> Result<()> {
    let class = plan.class;
    let seed = lattice.node(plan.seed);
    if !seed.admits(class) {
        return Err(Error::InvariantViolation(format!(
            "stale plan: {:?} no longer admits {class}, bounds [{}, {}]",
            seed.point.as_slice(), seed.lower, seed.upper
        )));
    }
    if let Some(node) = plan.raised.iter().map(|&id| lattice.node(id)).find(|n| class > n.upper) {
        return Err(Error::InvariantViolation(format!(
            "raising {:?} to {class} crosses its upper bound {}",
            node.point.as_slice(), node.upper
        )));
    }
    if let Some(node) = plan.lowered.iter().map(|&id| lattice.node(id)).find(|n| class < n.lower) {
        return Err(Error::InvariantViolation(format!(
            "capping {:?} at {class} crosses its lower bound {}",
            node.point.as_slice(), node.lower
        )));
    }
    Ok(())
}

/// Confirm `seed` as `class` and propagate. Returns the newly confirmed nodes.
pub fn propagate(lattice: &mut Lattice, seed: NodeId, class: ClassId) -> Result<Vec<NodeId>> {
    let plan = plan(lattice, seed, class)?;
    apply(lattice, &plan)
}

// ============================================================================
// Tests
// ============================================================================
