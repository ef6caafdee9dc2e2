//! Run statistics.
//!
//! Each worker reports the set of [`Stat`] events its entity triggered; a set
//! cannot hold the same event twice, so every counter moves at most once per
//! entity. The aggregator folds those sets into a [`StatsSnapshot`].

use crate::{EnrichError, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stat {
    TotalClasses,
    CuiInSource,
    WithoutCui,
    CuiInAltLabel,
    CuiInMappings,
    CuiThroughCode,
    MatchedByRanking,
    RemainingWithoutCui,
    AmbiguousCui,
    MoreCuisThanTerminology,
    FewerCuisThanTerminology,
    TerminologyCodeFound,
    TuiFromCui,
    TuiFromMappings,
    RemainingWithoutTui,
    LookupFailure,
}

impl Stat {
    /// Report order.
    pub const ALL: [Stat; 16] = [
        Stat::TotalClasses,
        Stat::CuiInSource,
        Stat::WithoutCui,
        Stat::CuiInAltLabel,
        Stat::CuiInMappings,
        Stat::CuiThroughCode,
        Stat::MatchedByRanking,
        Stat::RemainingWithoutCui,
        Stat::AmbiguousCui,
        Stat::MoreCuisThanTerminology,
        Stat::FewerCuisThanTerminology,
        Stat::TerminologyCodeFound,
        Stat::TuiFromCui,
        Stat::TuiFromMappings,
        Stat::RemainingWithoutTui,
        Stat::LookupFailure,
    ];

    /// Counter name in the statistics report.
    pub fn name(self) -> &'static str {
        match self {
            Stat::TotalClasses => "totalClassCount",
            Stat::CuiInSource => "classesWithCUIInSource",
            Stat::WithoutCui => "classesWithoutCUI",
            Stat::CuiInAltLabel => "classesWithCUIInAltLabel",
            Stat::CuiInMappings => "classesWithCUIInMappings",
            Stat::CuiThroughCode => "classesWithCUIThroughCode",
            Stat::MatchedByRanking => "classesMatchedByRanking",
            Stat::RemainingWithoutCui => "classesRemainingWithoutCUI",
            Stat::AmbiguousCui => "classesWithAmbiguousCUI",
            Stat::MoreCuisThanTerminology => "classesWithMoreCUIsThanTerminology",
            Stat::FewerCuisThanTerminology => "classesWithLessCUIsThanTerminology",
            Stat::TerminologyCodeFound => "terminologyCodesFound",
            Stat::TuiFromCui => "classesWithTUIFromCUI",
            Stat::TuiFromMappings => "classesWithTUIFromMappings",
            Stat::RemainingWithoutTui => "classesRemainingWithoutTUI",
            Stat::LookupFailure => "lookupFailures",
        }
    }
}

/// Final counter values; every counter is present, zero or not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    counts: BTreeMap<Stat, u64>,
}

impl StatsSnapshot {
    /// Count one entity's events.
    pub fn record(&mut self, events: &BTreeSet<Stat>) {
        for stat in events {
            *self.counts.entry(*stat).or_insert(0) += 1;
        }
    }

    pub fn get(&self, stat: Stat) -> u64 {
        self.counts.get(&stat).copied().unwrap_or(0)
    }

    /// `(name, value)` pairs in report order.
    pub fn rows(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        Stat::ALL.into_iter().map(|stat| (stat.name(), self.get(stat)))
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json + "\n").map_err(|source| EnrichError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "wrote statistics");
        Ok(())
    }

    pub fn log_summary(&self) {
        for (name, value) in self.rows() {
            tracing::info!(counter = name, value, "statistics");
        }
    }
}

impl Serialize for StatsSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Stat::ALL.len()))?;
        for (name, value) in self.rows() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_keeps_fixed_counter_order() {
        let mut stats = StatsSnapshot::default();
        stats.record(&[Stat::TotalClasses, Stat::AmbiguousCui].into());
        stats.record(&[Stat::TotalClasses].into());

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.starts_with("{\"totalClassCount\":2,\"classesWithCUIInSource\":0,"));
        assert!(json.ends_with("\"lookupFailures\":0}"));
        assert_eq!(stats.get(Stat::AmbiguousCui), 1);

        let positions: Vec<usize> = Stat::ALL
            .iter()
            .map(|s| json.find(&format!("\"{}\"", s.name())).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
