//! # Grid Model
//!
//! Plain data shared by every stage of a run: lattice points, nodes and
//! chains. These types cross every boundary: lattice ↔ chains ↔ interview ↔ export.
//!
//! Design rule: no traversal, no oracle, no ranking here.
//! This module is pure data. No I/O, no parallelism.

pub mod node;
pub mod chain;

pub use node::{Node, NodeId, ClassId, Point, Direction};
pub use chain::Chain;
