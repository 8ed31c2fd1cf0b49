//! Export: the read-only view handed to rendering and rule extraction.
//!
//! Produces the classified lattice, the chain set and the per-class low
//! units, bundled as a JSON run report:
//!
//! ```text
//! Session → RunReport::from_session() → write_json()
//!   → plotting, chain rendering, decision-rule extraction
//! ```

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::InterviewConfig;
use crate::interview::{InterviewOutcome, QueryRecord};
use crate::lattice::Lattice;
use crate::model::node::dominates;
use crate::model::*;
use crate::{Result, Session};

/// Dominance-minimal first occurrences of each class along the chains.
///
/// For class `c`, every chain contributes its lowest node confirmed as `c`;
/// a candidate dominating another candidate of the same class is dropped.
/// Unconfirmed nodes never contribute. Every class gets an entry.
pub fn low_units(lattice: &Lattice, chains: &[Chain]) -> BTreeMap<ClassId, Vec<Point>> {
    let mut units = BTreeMap::new();
    for class in 0..lattice.num_classes() {
        let mut candidates: Vec<NodeId> = chains
            .iter()
            .filter_map(|chain| {
                chain.nodes.iter().copied().find(|&id| lattice.node(id).class() == Some(class))
            })
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        let minimal: Vec<Point> = candidates
            .iter()
            .map(|&id| &lattice.node(id).point)
            .filter(|point| {
                !candidates.iter().any(|&other| {
                    let other = &lattice.node(other).point;
                    other != *point && dominates(point, other)
                })
            })
            .cloned()
            .collect();
        units.insert(class, minimal);
    }
    units
}

/// One lattice point and its final class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedPoint {
    pub point: Point,
    pub class: Option<ClassId>,
}

/// Everything external consumers need from a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub config: InterviewConfig,
    pub nodes: usize,
    pub queries: usize,
    pub classes: Vec<ClassifiedPoint>,
    pub chains: Vec<Vec<Point>>,
    pub low_units: BTreeMap<ClassId, Vec<Point>>,
    pub query_log: Vec<QueryRecord>,
}

impl RunReport {
    pub fn new(
        config: &InterviewConfig,
        lattice: &Lattice,
        chains: &[Chain],
        outcome: Option<&InterviewOutcome>,
    ) -> Self {
        let query_log = outcome.map(|o| o.queries.clone()).unwrap_or_default();
        Self {
            generated_at: Utc::now(),
            config: config.clone(),
            nodes: lattice.len(),
            queries: query_log.len(),
            classes: lattice
                .nodes()
                .iter()
                .map(|n| ClassifiedPoint { point: n.point.clone(), class: n.class() })
                .collect(),
            chains: chains
                .iter()
                .map(|c| c.nodes.iter().map(|&id| lattice.node(id).point.clone()).collect())
                .collect(),
            low_units: low_units(lattice, chains),
            query_log,
        }
    }

    pub fn from_session(session: &Session) -> Self {
        Self::new(session.config(), session.lattice(), session.chains(), session.outcome())
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::decompose;
    use crate::propagate::propagate;
    use pretty_assertions::assert_eq;

    fn classify_all(lattice: &mut Lattice, f: impl Fn(&[u32]) -> ClassId) {
        for index in 0..lattice.len() {
            let id = NodeId(index as u32);
            if !lattice.node(id).is_confirmed() {
                let class = f(&lattice.node(id).point);
                propagate(lattice, id, class).unwrap();
            }
        }
    }

    fn sorted(points: &[Point]) -> Vec<Vec<u32>> {
        let mut v: Vec<Vec<u32>> = points.iter().map(|p| p.to_vec()).collect();
        v.sort();
        v
    }

    #[test]
    fn test_low_units_are_class_minima() {
        let mut lattice = Lattice::build(&[3, 3], 3).unwrap();
        let chains = decompose(&lattice).unwrap();
        classify_all(&mut lattice, |p| (p[0] + p[1]).min(3).saturating_sub(1).min(2));

        let units = low_units(&lattice, &chains);
        assert_eq!(sorted(&units[&0]), vec![vec![0, 0]]);
        assert_eq!(sorted(&units[&1]), vec![vec![0, 2], vec![1, 1], vec![2, 0]]);
        assert_eq!(sorted(&units[&2]), vec![vec![1, 2], vec![2, 1]]);
    }

    #[test]
    fn test_low_units_drop_dominated_candidates() {
        // Class 1 iff x0 >= 1. Chains: (0,0)(1,0)(1,1) and (0,1).
        // Class 0 starts both chains; (0,1) dominates (0,0) and is dropped.
        let mut lattice = Lattice::build(&[2, 2], 2).unwrap();
        let chains = decompose(&lattice).unwrap();
        classify_all(&mut lattice, |p| u32::from(p[0] >= 1));
        let units = low_units(&lattice, &chains);
        assert_eq!(sorted(&units[&0]), vec![vec![0, 0]]);
        assert_eq!(sorted(&units[&1]), vec![vec![1, 0]]);
    }

    #[test]
    fn test_low_units_ignore_unconfirmed() {
        let lattice = Lattice::build(&[2, 2], 2).unwrap();
        let chains = decompose(&lattice).unwrap();
        let units = low_units(&lattice, &chains);
        assert!(units.values().all(Vec::is_empty));
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn test_report_json() {
        let config = InterviewConfig::new([2, 2], 2);
        let mut lattice = Lattice::build(&config.k_values, config.num_classes).unwrap();
        let chains = decompose(&lattice).unwrap();
        classify_all(&mut lattice, |p| u32::from(p.iter().sum::<u32>() >= 1));

        let report = RunReport::new(&config, &lattice, &chains, None);
        assert_eq!(report.nodes, 4);
        assert_eq!(report.chains.len(), 2);

        let mut buf = Vec::new();
        report.write_json(&mut buf).unwrap();
        let parsed: RunReport = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, report);

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["low_units"]["1"], serde_json::json!([[1, 0], [0, 1]]));
    }
}
