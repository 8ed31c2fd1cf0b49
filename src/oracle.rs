//! # Oracle
//!
//! The contract between the interviewer and whatever answers its questions:
//! a human expert, a trained model, or a known function in tests.
//!
//! An oracle must be deterministic and monotone: if `p <= q` coordinate-wise
//! then `classify(p) <= classify(q)`. The interviewer asks each point at
//! most once and never has two questions in flight.

use hashbrown::HashMap;
use serde::Deserialize;

use crate::model::{ClassId, Point};
use crate::{Error, Result};

/// Answers one classification query per call.
pub trait Oracle {
    fn classify(&mut self, point: &[u32]) -> Result<ClassId>;
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn classify(&mut self, point: &[u32]) -> Result<ClassId> {
        (**self).classify(point)
    }
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn classify(&mut self, point: &[u32]) -> Result<ClassId> {
        (**self).classify(point)
    }
}

// ============================================================================
// FnOracle
// ============================================================================

/// Oracle backed by a closure.
pub struct FnOracle<F> {
    f: F,
}

impl<F> FnOracle<F>
where
    F: FnMut(&[u32]) -> ClassId,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Oracle for FnOracle<F>
where
    F: FnMut(&[u32]) -> ClassId,
{
    fn classify(&mut self, point: &[u32]) -> Result<ClassId> {
        Ok((self.f)(point))
    }
}

/// Wrap a closure as an [`Oracle`].
pub fn from_fn<F>(f: F) -> FnOracle<F>
where
    F: FnMut(&[u32]) -> ClassId,
{
    FnOracle::new(f)
}

// ============================================================================
// TableOracle
// ============================================================================

#[derive(Deserialize)]
struct RecordedAnswer {
    point: Vec<u32>,
    class: ClassId,
}

/// Oracle answering from a recorded point → class table, e.g. a previous
/// expert session. Asking for an unrecorded point is an error.
#[derive(Debug, Clone, Default)]
pub struct TableOracle {
    answers: HashMap<Point, ClassId>,
}

impl TableOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, ClassId)>,
        P: AsRef<[u32]>,
    {
        Self {
            answers: pairs
                .into_iter()
                .map(|(p, c)| (Point::from_slice(p.as_ref()), c))
                .collect(),
        }
    }

    /// Parse `[{"point": [..], "class": c}, ...]`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let recorded: Vec<RecordedAnswer> = serde_json::from_str(json)?;
        Ok(Self::from_pairs(recorded.into_iter().map(|r| (r.point, r.class))))
    }

    pub fn insert(&mut self, point: &[u32], class: ClassId) -> Option<ClassId> {
        self.answers.insert(Point::from_slice(point), class)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl Oracle for TableOracle {
    fn classify(&mut self, point: &[u32]) -> Result<ClassId> {
        self.answers
            .get(point)
            .copied()
            .ok_or_else(|| Error::Oracle(format!("no recorded answer for {point:?}")))
    }
}
