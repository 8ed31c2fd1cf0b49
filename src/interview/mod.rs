//! # Interviewer
//!
//! Drives the query loop until every lattice point is confirmed:
//!
//! ```text
//!   rank frontier (strategy) → select node → oracle → propagate → shrink frontier
//!         ↑                                                          │
//!         └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop is strictly sequential: each selection depends on the state the
//! previous answer left. Fan-out happens only inside ranking and propagation,
//! which never overlap.

pub mod ratio;
pub mod stats;
pub mod strategy;

use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;
use crate::model::*;
use crate::oracle::Oracle;
use crate::propagate;
use crate::{Error, Result};

pub use ratio::BalanceRatio;
pub use stats::Umbrella;
pub use strategy::{Selector, Strategy};

/// What to do when the oracle answers outside a node's established bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyPolicy {
    /// Stop the run with [`Error::OutOfBounds`]; the answer is not applied.
    #[default]
    Reject,
    /// Clamp the answer into the node's bounds and carry on.
    Clamp,
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub node: NodeId,
    pub point: Point,
    /// Class returned by the oracle.
    pub answer: ClassId,
    /// Class actually assigned; differs from `answer` only when clamped.
    pub assigned: ClassId,
    /// Nodes confirmed by this answer, the queried node included.
    pub confirmed: usize,
}

impl QueryRecord {
    pub fn clamped(&self) -> bool {
        self.answer != self.assigned
    }
}

/// Result of a completed interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewOutcome {
    pub strategy: Strategy,
    pub queries: Vec<QueryRecord>,
    /// Selections skipped because the node was already confirmed.
    pub skipped: usize,
}

impl InterviewOutcome {
    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// Nodes confirmed without being asked.
    pub fn inferred_count(&self) -> usize {
        self.queries.iter().map(|q| q.confirmed.saturating_sub(1)).sum()
    }
}

/// The query loop over one lattice.
pub struct Interviewer<'a> {
    lattice: &'a mut Lattice,
    strategy: Strategy,
    selector: Box<dyn Selector>,
    policy: InconsistencyPolicy,
    /// Unconfirmed nodes, id order.
    frontier: Vec<NodeId>,
    queries: Vec<QueryRecord>,
    skipped: usize,
}

impl<'a> Interviewer<'a> {
    pub fn new(lattice: &'a mut Lattice, chains: &[Chain], strategy: Strategy) -> Self {
        let frontier = lattice.unconfirmed().map(|n| n.id).collect();
        Self {
            lattice,
            strategy,
            selector: strategy.selector(chains),
            policy: InconsistencyPolicy::default(),
            frontier,
            queries: Vec::new(),
            skipped: 0,
        }
    }

    pub fn with_policy(mut self, policy: InconsistencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the strategy's selector with a custom one. The strategy
    /// stays as the label in logs and in the outcome.
    pub fn with_selector(mut self, selector: Box<dyn Selector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn lattice(&self) -> &Lattice {
        self.lattice
    }

    pub fn frontier(&self) -> &[NodeId] {
        &self.frontier
    }

    pub fn queries(&self) -> &[QueryRecord] {
        &self.queries
    }

    pub fn is_done(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Ask one question and propagate its answer.
    ///
    /// Returns `None` once every node is confirmed.
    pub fn step<O: Oracle + ?Sized>(&mut self, oracle: &mut O) -> Result<Option<QueryRecord>> {
        let mut stale = 0usize;
        loop {
            if self.frontier.is_empty() {
                return Ok(None);
            }

            let id = self.selector.select(self.lattice, &self.frontier).ok_or_else(|| {
                Error::InvariantViolation(format!(
                    "{} selected nothing with {} nodes unconfirmed",
                    self.strategy,
                    self.frontier.len()
                ))
            })?;

            if self.lattice.node(id).is_confirmed() {
                stale += 1;
                self.skipped += 1;
                tracing::warn!(
                    node = %id,
                    strategy = %self.strategy,
                    "selected node already confirmed, skipping"
                );
                if stale > self.frontier.len() {
                    return Err(Error::InvariantViolation(format!(
                        "{} keeps selecting confirmed nodes",
                        self.strategy
                    )));
                }
                self.selector.observe(self.lattice, &[]);
                continue;
            }

            return self.ask(id, oracle).map(Some);
        }
    }

    fn ask<O: Oracle + ?Sized>(&mut self, id: NodeId, oracle: &mut O) -> Result<QueryRecord> {
        let node = self.lattice.node(id);
        let (point, lower, upper) = (node.point.clone(), node.lower, node.upper);

        let answer = oracle.classify(&point)?;
        let num_classes = self.lattice.num_classes();
        if answer >= num_classes {
            return Err(Error::InvalidClass { point: point.to_vec(), class: answer, num_classes });
        }

        let assigned = if (lower..=upper).contains(&answer) {
            answer
        } else {
            match self.policy {
                InconsistencyPolicy::Reject => {
                    return Err(Error::OutOfBounds {
                        point: point.to_vec(),
                        class: answer,
                        lower,
                        upper,
                    });
                }
                InconsistencyPolicy::Clamp => {
                    let clamped = answer.clamp(lower, upper);
                    tracing::warn!(
                        ?point,
                        answer,
                        lower,
                        upper,
                        clamped,
                        "oracle answer outside bounds, clamped"
                    );
                    clamped
                }
            }
        };

        let confirmed = propagate::propagate(self.lattice, id, assigned)?;
        let lattice = &*self.lattice;
        self.frontier.retain(|&n| !lattice.node(n).is_confirmed());
        self.selector.observe(lattice, &confirmed);

        tracing::debug!(
            ?point,
            class = assigned,
            confirmed = confirmed.len(),
            remaining = self.frontier.len(),
            "query answered"
        );

        let record = QueryRecord { node: id, point, answer, assigned, confirmed: confirmed.len() };
        self.queries.push(record.clone());
        Ok(record)
    }

    /// Query until every node is confirmed, then audit the bound invariants.
    pub fn run<O: Oracle + ?Sized>(mut self, oracle: &mut O) -> Result<InterviewOutcome> {
        while self.step(oracle)?.is_some() {}

        self.lattice.verify_bounds()?;
        if !self.lattice.is_fully_confirmed() {
            return Err(Error::InvariantViolation("interview ended with unconfirmed nodes".into()));
        }

        tracing::info!(
            strategy = %self.strategy,
            queries = self.queries.len(),
            nodes = self.lattice.len(),
            skipped = self.skipped,
            "interview complete"
        );

        Ok(InterviewOutcome {
            strategy: self.strategy,
            queries: self.queries,
            skipped: self.skipped,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::decompose;
    use crate::oracle::{TableOracle, from_fn};

    fn threshold(p: &[u32]) -> ClassId {
        u32::from(p.iter().sum::<u32>() >= 1)
    }

    #[test]
    fn test_two_by_two_scenario() {
        let mut lattice = Lattice::build(&[2, 2], 2).unwrap();
        let chains = decompose(&lattice).unwrap();
        let mut oracle = from_fn(threshold);
        let outcome = Interviewer::new(&mut lattice, &chains, Strategy::ChainMidpoint)
            .run(&mut oracle)
            .unwrap();

        assert!(outcome.query_count() <= 4);
        for node in lattice.nodes() {
            assert_eq!(node.class(), Some(threshold(&node.point)));
        }
    }

    #[test]
    fn test_every_strategy_terminates() {
        for strategy in Strategy::all() {
            let mut lattice = Lattice::build(&[3, 2, 3], 3).unwrap();
            let chains = decompose(&lattice).unwrap();
            let f = |p: &[u32]| (p[0] + p[1] + p[2]).min(5) / 2;
            let outcome = Interviewer::new(&mut lattice, &chains, strategy)
                .run(&mut from_fn(f))
                .unwrap();
            assert!(outcome.query_count() <= lattice.len(), "{strategy}");
            assert_eq!(
                outcome.query_count() + outcome.inferred_count(),
                lattice.len(),
                "{strategy}"
            );
            for node in lattice.nodes() {
                assert_eq!(node.class(), Some(f(&node.point)), "{strategy}");
            }
        }
    }

    #[test]
    fn test_step_by_step() {
        let mut lattice = Lattice::build(&[4], 2).unwrap();
        let chains = decompose(&lattice).unwrap();
        let mut oracle = from_fn(|p: &[u32]| u32::from(p[0] >= 2));
        let mut interviewer = Interviewer::new(&mut lattice, &chains, Strategy::ChainMidpoint);

        let first = interviewer.step(&mut oracle).unwrap().unwrap();
        assert_eq!(first.point.as_slice(), &[2]);
        assert_eq!(first.assigned, 1);
        assert_eq!(first.confirmed, 2);
        assert_eq!(interviewer.frontier().len(), 2);

        let second = interviewer.step(&mut oracle).unwrap().unwrap();
        assert_eq!(second.point.as_slice(), &[1]);
        assert_eq!(second.confirmed, 2);
        assert!(interviewer.is_done());
        assert!(interviewer.step(&mut oracle).unwrap().is_none());
        assert_eq!(interviewer.queries().len(), 2);
    }

    #[test]
    fn test_invalid_class_rejected() {
        let mut lattice = Lattice::build(&[2], 2).unwrap();
        let chains = decompose(&lattice).unwrap();
        let err = Interviewer::new(&mut lattice, &chains, Strategy::LongestPath)
            .run(&mut from_fn(|_: &[u32]| 7))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidClass { class: 7, num_classes: 2, .. }));
    }

    /// Non-monotone answers: (1) is 2 but (2) above it is 1.
    fn inconsistent() -> TableOracle {
        TableOracle::from_pairs([([0u32], 0), ([1u32], 2), ([2u32], 1)])
    }

    #[test]
    fn test_inconsistency_unseen_when_not_asked() {
        let mut lattice = Lattice::build(&[3], 3).unwrap();
        let chains = decompose(&lattice).unwrap();
        let mut interviewer = Interviewer::new(&mut lattice, &chains, Strategy::ChainMidpoint);
        let mut oracle = inconsistent();

        // Midpoint (1) answers 2, which confirms (2) as 2 without asking it.
        let first = interviewer.step(&mut oracle).unwrap().unwrap();
        assert_eq!(first.point.as_slice(), &[1]);
        assert_eq!(first.confirmed, 2);
        interviewer.step(&mut oracle).unwrap().unwrap();
        assert!(interviewer.is_done());
    }

    #[test]
    fn test_inconsistent_oracle_rejected() {
        let mut lattice = Lattice::build(&[3], 3).unwrap();
        let chains = decompose(&lattice).unwrap();
        // (2) is known to be 1, so (1) can be at most 1.
        propagate::propagate(&mut lattice, NodeId(2), 1).unwrap();
        let before = lattice.nodes().to_vec();

        let mut interviewer = Interviewer::new(&mut lattice, &chains, Strategy::ChainMidpoint);
        let err = interviewer.step(&mut inconsistent()).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { class: 2, lower: 0, upper: 1, .. }));
        drop(interviewer);
        assert_eq!(lattice.nodes(), before.as_slice());
    }

    #[test]
    fn test_inconsistent_oracle_clamped() {
        let mut lattice = Lattice::build(&[3], 3).unwrap();
        let chains = decompose(&lattice).unwrap();
        propagate::propagate(&mut lattice, NodeId(2), 1).unwrap();

        let outcome = Interviewer::new(&mut lattice, &chains, Strategy::ChainMidpoint)
            .with_policy(InconsistencyPolicy::Clamp)
            .run(&mut inconsistent())
            .unwrap();
        let clamped: Vec<&QueryRecord> = outcome.queries.iter().filter(|q| q.clamped()).collect();
        assert_eq!(clamped.len(), 1);
        assert_eq!((clamped[0].answer, clamped[0].assigned), (2, 1));
        assert_eq!(lattice.classes(), vec![Some(0), Some(1), Some(1)]);
    }

    /// Returns `stale` for the first `times` selections, then the frontier head.
    struct StaleSelector {
        stale: NodeId,
        times: usize,
    }

    impl Selector for StaleSelector {
        fn select(&mut self, _lattice: &Lattice, frontier: &[NodeId]) -> Option<NodeId> {
            if self.times > 0 {
                self.times -= 1;
                return Some(self.stale);
            }
            frontier.first().copied()
        }
    }

    #[test]
    fn test_confirmed_selection_is_skipped_without_asking() {
        let mut lattice = Lattice::build(&[3], 2).unwrap();
        let chains = decompose(&lattice).unwrap();
        propagate::propagate(&mut lattice, NodeId(2), 1).unwrap();

        let mut asked: Vec<Vec<u32>> = Vec::new();
        let mut oracle = from_fn(|p: &[u32]| {
            asked.push(p.to_vec());
            u32::from(p[0] >= 1)
        });
        let outcome = Interviewer::new(&mut lattice, &chains, Strategy::ChainMidpoint)
            .with_selector(Box::new(StaleSelector { stale: NodeId(2), times: 1 }))
            .run(&mut oracle)
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.query_count(), 2);
        assert_eq!(asked, vec![vec![0], vec![1]]);
        assert_eq!(lattice.classes(), vec![Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_selector_stuck_on_confirmed_node_fails() {
        let mut lattice = Lattice::build(&[3], 2).unwrap();
        let chains = decompose(&lattice).unwrap();
        propagate::propagate(&mut lattice, NodeId(2), 1).unwrap();

        let mut calls = 0usize;
        let mut oracle = from_fn(|_: &[u32]| {
            calls += 1;
            0
        });
        let err = Interviewer::new(&mut lattice, &chains, Strategy::ChainMidpoint)
            .with_selector(Box::new(StaleSelector { stale: NodeId(2), times: usize::MAX }))
            .run(&mut oracle)
            .unwrap_err();

        assert!(matches!(err, Error::InvariantViolation(_)));
        drop(oracle);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_already_classified_lattice_asks_nothing() {
        let mut lattice = Lattice::build(&[2, 2], 2).unwrap();
        let chains = decompose(&lattice).unwrap();
        propagate::propagate(&mut lattice, NodeId(0), 1).unwrap();
        let outcome = Interviewer::new(&mut lattice, &chains, Strategy::UmbrellaTotal)
            .run(&mut TableOracle::new())
            .unwrap();
        assert_eq!(outcome.query_count(), 0);
    }
}
