//! # hansel: Monotone Function Reconstruction on k-valued Grids
//!
//! Recovers an unknown monotone classification `f: ∏ [0, k_i) → [0, c)` by
//! asking an oracle as few questions as possible. Every answer is pushed
//! through the grid order: a point answered `v` forces everything above it
//! to `>= v` and everything below it to `<= v`.
//!
//! ## Design Principles
//!
//! 1. **Flat arena**: nodes live in one `Vec`, indexed by the mixed-radix id of their point
//! 2. **Oracle-first**: `Oracle` is the contract between the interview and whoever answers
//! 3. **Plan, then apply**: propagation is computed read-only, so ranking can reuse it
//! 4. **Strategy chosen once**: a `Strategy` becomes a `Selector` for the whole run
//!
//! ## Quick Start
//!
//! ```rust
//! use hansel::{InterviewConfig, Session, Strategy, oracle};
//!
//! # fn example() -> hansel::Result<()> {
//! let config = InterviewConfig::new([3, 3], 2).with_strategy(Strategy::LongestPath);
//! let mut session = Session::new(config)?;
//!
//! let mut expert = oracle::from_fn(|p: &[u32]| u32::from(p[0] + p[1] >= 3));
//! let asked = session.interview(&mut expert)?.query_count();
//!
//! assert!(asked < session.lattice().len());
//! for (class, points) in session.low_units() {
//!     println!("class {class}: {points:?}");
//! }
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Strategies
//!
//! | Strategy | Selection |
//! |----------|-----------|
//! | `ChainMidpoint` | binary search along Hansel chains |
//! | `LongestPath` | binary search along the longest unconfirmed up-path |
//! | `Minimax` | best guaranteed number of confirmations |
//! | `Umbrella*` | largest / most balanced set of reachable unconfirmed points |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod lattice;
pub mod chains;
pub mod propagate;
pub mod interview;
pub mod oracle;
pub mod config;
pub mod export;
pub mod parallel;

use std::collections::BTreeMap;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{Node, NodeId, ClassId, Point, Chain, Direction};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use lattice::Lattice;
pub use interview::{
    Interviewer, InterviewOutcome, QueryRecord, InconsistencyPolicy,
    Strategy, Selector, BalanceRatio, Umbrella,
};
pub use oracle::{Oracle, FnOracle, TableOracle};
pub use config::InterviewConfig;
pub use export::RunReport;
pub use parallel::WorkerPool;

// ============================================================================
// Top-level Session handle
// ============================================================================

/// One reconstruction run: validated config, lattice, chains, the worker
/// pool all fan-out runs on and, once interviewed, the query log.
#[derive(Debug)]
pub struct Session {
    config: InterviewConfig,
    lattice: Lattice,
    chains: Vec<Chain>,
    outcome: Option<InterviewOutcome>,
    pool: WorkerPool,
}

impl Session {
    /// Validate `config`, start the worker pool, build the lattice and
    /// decompose it into chains.
    pub fn new(config: InterviewConfig) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.workers)?;
        let (lattice, chains) = pool.install(|| -> Result<_> {
            let lattice = Lattice::build(&config.k_values, config.num_classes)?;
            let chains = chains::decompose(&lattice)?;
            Ok((lattice, chains))
        })?;
        Ok(Self { config, lattice, chains, outcome: None, pool })
    }

    /// Run the configured strategy against `oracle` until every point is confirmed.
    ///
    /// A failed run leaves no outcome behind; call [`Session::reset`] before
    /// interviewing again.
    pub fn interview<O>(&mut self, oracle: &mut O) -> Result<&InterviewOutcome>
    where
        O: Oracle + Send + ?Sized,
    {
        self.outcome = None;
        let (lattice, chains, config) = (&mut self.lattice, &self.chains, &self.config);
        let outcome = self.pool.install(|| {
            Interviewer::new(lattice, chains, config.strategy)
                .with_policy(config.on_inconsistent)
                .run(oracle)
        })?;
        Ok(self.outcome.insert(outcome))
    }

    /// Forget all answers so the same grid can be interviewed again,
    /// e.g. with another strategy.
    pub fn reset(&mut self) {
        self.lattice.reset_bounds();
        self.outcome = None;
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.config.strategy = strategy;
    }

    pub fn config(&self) -> &InterviewConfig {
        &self.config
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    pub fn outcome(&self) -> Option<&InterviewOutcome> {
        self.outcome.as_ref()
    }

    /// Class of `point`, `None` while unconfirmed.
    pub fn class_of(&self, point: &[u32]) -> Result<Option<ClassId>> {
        self.lattice
            .node_at(point)
            .map(Node::class)
            .ok_or_else(|| Error::NotFound(format!("point {point:?} is outside the grid")))
    }

    /// Dominance-minimal boundary points per class.
    pub fn low_units(&self) -> BTreeMap<ClassId, Vec<Point>> {
        export::low_units(&self.lattice, &self.chains)
    }

    pub fn report(&self) -> RunReport {
        RunReport::from_session(self)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Class {class} for {point:?} lies outside its bounds [{lower}, {upper}]")]
    OutOfBounds { point: Vec<u32>, class: ClassId, lower: ClassId, upper: ClassId },

    #[error("Class {class} for {point:?} is not below the class count {num_classes}")]
    InvalidClass { point: Vec<u32>, class: ClassId, num_classes: u32 },

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
