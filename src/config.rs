//! Run configuration.
//!
//! Loaded from JSON or built in code; validated before any lattice exists.
//!
//! ## Example
//!
//! ```json
//! {
//!   "k_values": [3, 2, 4],
//!   "num_classes": 3,
//!   "strategy": { "kind": "minimax", "ratio": "quadratic" },
//!   "attribute_names": ["income", "owns_home", "tenure"],
//!   "on_inconsistent": "clamp",
//!   "workers": 4
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::interview::{InconsistencyPolicy, Strategy};
use crate::lattice::Radix;
use crate::{Error, Result};

/// Everything one interview run needs besides the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewConfig {
    /// Cardinality of each attribute; attribute `i` takes values `0..k_values[i]`.
    pub k_values: Vec<u32>,
    pub num_classes: u32,
    #[serde(default)]
    pub strategy: Strategy,
    /// Display names, one per attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_names: Option<Vec<String>>,
    /// Relative attribute importance for downstream rule extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_weights: Option<Vec<f64>>,
    #[serde(default)]
    pub on_inconsistent: InconsistencyPolicy,
    /// Worker threads for the run's pool; 0 means one per core.
    #[serde(default)]
    pub workers: usize,
}

impl InterviewConfig {
    pub fn new(k_values: impl Into<Vec<u32>>, num_classes: u32) -> Self {
        Self {
            k_values: k_values.into(),
            num_classes,
            strategy: Strategy::default(),
            attribute_names: None,
            attribute_weights: None,
            on_inconsistent: InconsistencyPolicy::default(),
            workers: 0,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_attribute_names(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.attribute_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_attribute_weights(mut self, weights: impl Into<Vec<f64>>) -> Self {
        self.attribute_weights = Some(weights.into());
        self
    }

    pub fn with_policy(mut self, policy: InconsistencyPolicy) -> Self {
        self.on_inconsistent = policy;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Parse and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn dims(&self) -> usize {
        self.k_values.len()
    }

    /// Name of attribute `i`, falling back to `x{i}`.
    pub fn attribute_name(&self, i: usize) -> String {
        self.attribute_names
            .as_ref()
            .and_then(|names| names.get(i).cloned())
            .unwrap_or_else(|| format!("x{i}"))
    }

    pub fn validate(&self) -> Result<()> {
        Radix::new(&self.k_values)?;
        if self.num_classes < 2 {
            return Err(Error::Config(format!(
                "at least 2 classes are required, got {}",
                self.num_classes
            )));
        }
        if let Some(names) = &self.attribute_names {
            if names.len() != self.dims() {
                return Err(Error::Config(format!(
                    "{} attribute names for {} attributes",
                    names.len(),
                    self.dims()
                )));
            }
        }
        if let Some(weights) = &self.attribute_weights {
            if weights.len() != self.dims() {
                return Err(Error::Config(format!(
                    "{} attribute weights for {} attributes",
                    weights.len(),
                    self.dims()
                )));
            }
            if let Some(bad) = weights.iter().find(|w| !w.is_finite()) {
                return Err(Error::Config(format!("attribute weight {bad} is not finite")));
            }
        }
        Ok(())
    }
}
