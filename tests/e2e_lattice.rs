//! End-to-end tests for the lattice, its chain decomposition and bound propagation.
//!
//! Each test exercises: build -> decompose -> propagate against a fresh `Lattice`.

use hansel::chains::{decompose, validate};
use hansel::propagate::{plan, propagate};
use hansel::{ClassId, Direction, Lattice, NodeId};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn id(lattice: &Lattice, point: &[u32]) -> NodeId {
    lattice.id_of(point).unwrap()
}

fn bounds(lattice: &Lattice, point: &[u32]) -> (ClassId, ClassId) {
    let node = lattice.node_at(point).unwrap();
    (node.lower, node.upper)
}

fn k_values() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..=4, 1..=4)
}

// ============================================================================
// 1. Construction: Π k_i nodes, neighbors exactly where coordinates allow
// ============================================================================

proptest! {
    #[test]
    fn test_lattice_shape(k in k_values()) {
        let lattice = Lattice::build(&k, 2).unwrap();
        let product: u32 = k.iter().product();
        prop_assert_eq!(lattice.len(), product as usize);

        for node in lattice.nodes() {
            prop_assert_eq!(lattice.id_of(&node.point), Some(node.id));
            for (i, &v) in node.point.iter().enumerate() {
                prop_assert_eq!(node.up[i].is_some(), v + 1 < k[i]);
                prop_assert_eq!(node.down[i].is_some(), v > 0);
                if let Some(up) = node.up[i] {
                    prop_assert_eq!(lattice.node(up).down[i], Some(node.id));
                }
            }
        }
    }
}

#[test]
fn test_single_point_lattice() {
    let lattice = Lattice::build(&[1, 1], 3).unwrap();
    assert_eq!(lattice.len(), 1);
    let chains = decompose(&lattice).unwrap();
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].nodes, vec![NodeId(0)]);
}

#[test]
fn test_rejects_bad_shapes() {
    assert!(matches!(Lattice::build(&[], 2), Err(hansel::Error::Config(_))));
    assert!(matches!(Lattice::build(&[3, 0], 2), Err(hansel::Error::Config(_))));
    assert!(matches!(Lattice::build(&[3, 3], 1), Err(hansel::Error::Config(_))));
    assert!(matches!(
        Lattice::build(&[u32::MAX, 2], 2),
        Err(hansel::Error::Config(_))
    ));
}

// ============================================================================
// 2. Chains: a partition into saturated chains
// ============================================================================

proptest! {
    #[test]
    fn test_chains_partition_the_lattice(k in k_values()) {
        let lattice = Lattice::build(&k, 2).unwrap();
        let chains = decompose(&lattice).unwrap();
        prop_assert!(validate(&lattice, &chains).is_ok());

        let mut seen: Vec<NodeId> = chains.iter().flat_map(|c| c.nodes.iter().copied()).collect();
        seen.sort();
        let all: Vec<NodeId> = lattice.nodes().iter().map(|n| n.id).collect();
        prop_assert_eq!(seen, all);

        for chain in &chains {
            for pair in chain.nodes.windows(2) {
                let (lo, hi) = (lattice.node(pair[0]), lattice.node(pair[1]));
                let distance: u32 = lo.point.iter().zip(&hi.point).map(|(a, b)| a.abs_diff(*b)).sum();
                prop_assert_eq!(distance, 1);
                prop_assert_eq!(hi.rank(), lo.rank() + 1);
            }
        }
    }
}

#[test]
fn test_chain_count_for_binary_cube() {
    // Sperner: the widest rank of {0,1}^4 has C(4,2) = 6 points.
    let lattice = Lattice::build(&[2, 2, 2, 2], 2).unwrap();
    let chains = decompose(&lattice).unwrap();
    assert_eq!(chains.len(), 6);
}

// ============================================================================
// 3. Propagation: the [2,2] scenario
// ============================================================================

#[test]
fn test_two_by_two_propagation_scenario() {
    let mut lattice = Lattice::build(&[2, 2], 2).unwrap();
    let points: Vec<Vec<u32>> = lattice.nodes().iter().map(|n| n.point.to_vec()).collect();
    assert_eq!(points, vec![vec![0, 0], vec![1, 0], vec![0, 1], vec![1, 1]]);

    // (0,0) = 0: nothing below, nothing above is raised.
    let target = id(&lattice, &[0, 0]);
    let confirmed = propagate(&mut lattice, target, 0).unwrap();
    assert_eq!(confirmed, vec![id(&lattice, &[0, 0])]);
    assert_eq!(bounds(&lattice, &[1, 0]), (0, 1));
    assert_eq!(bounds(&lattice, &[0, 1]), (0, 1));

    // (1,0) = 1 raises (1,1) to its ceiling: confirmed without a query.
    let target = id(&lattice, &[1, 0]);
    let confirmed = propagate(&mut lattice, target, 1).unwrap();
    assert_eq!(confirmed, vec![id(&lattice, &[1, 0]), id(&lattice, &[1, 1])]);
    assert_eq!(bounds(&lattice, &[1, 1]), (1, 1));
    assert_eq!(bounds(&lattice, &[0, 1]), (0, 1));
}

#[test]
fn test_propagation_is_idempotent() {
    let mut lattice = Lattice::build(&[3, 3], 3).unwrap();
    let seed = id(&lattice, &[1, 1]);
    propagate(&mut lattice, seed, 1).unwrap();
    let before = lattice.nodes().to_vec();

    let again = plan(&lattice, seed, 1).unwrap();
    assert!(again.noop);
    assert!(again.raised.is_empty() && again.lowered.is_empty());
    assert!(propagate(&mut lattice, seed, 1).unwrap().is_empty());
    assert_eq!(lattice.nodes(), before.as_slice());
}

#[test]
fn test_conflicting_answer_leaves_lattice_untouched() {
    let mut lattice = Lattice::build(&[3, 3], 3).unwrap();
    let target = id(&lattice, &[1, 1]);
    propagate(&mut lattice, target, 1).unwrap();
    let before = lattice.nodes().to_vec();

    let target = id(&lattice, &[2, 2]);
    let err = propagate(&mut lattice, target, 0).unwrap_err();
    assert!(matches!(err, hansel::Error::OutOfBounds { class: 0, lower: 1, upper: 2, .. }));
    assert_eq!(lattice.nodes(), before.as_slice());
}

// ============================================================================
// 4. Monotonicity under arbitrary consistent answers
// ============================================================================

proptest! {
    #[test]
    fn test_bounds_stay_monotone(
        k in k_values(),
        seeds in prop::collection::vec((any::<prop::sample::Index>(), 0u32..4), 1..12),
    ) {
        let mut lattice = Lattice::build(&k, 4).unwrap();
        for (index, class) in seeds {
            let seed = NodeId(index.index(lattice.len()) as u32);
            // Answers outside the current bounds are refused and change nothing.
            let _ = propagate(&mut lattice, seed, class);
            prop_assert!(lattice.verify_bounds().is_ok());

            for node in lattice.nodes() {
                for up in node.neighbors(Direction::Up).map(|u| lattice.node(u)) {
                    prop_assert!(node.lower <= up.lower);
                    prop_assert!(node.upper <= up.upper);
                }
            }
        }
    }
}
