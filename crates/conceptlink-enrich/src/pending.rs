//! Resolved but not yet committed changes.

use crate::mapping::Mapping;
use crate::orchestrator::EntityOutcome;
use crate::{EnrichError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Every mutation the commit stages will apply, keyed by entity IRI.
///
/// Ordered maps keep the serialized form and the commit order independent
/// of how resolution was scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingChangeSet {
    pub cuis: BTreeMap<String, BTreeSet<String>>,
    /// Entities that get a provenance note.
    pub notes: BTreeSet<String>,
    pub alt_label_purges: BTreeMap<String, BTreeSet<String>>,
    pub tuis: BTreeMap<String, BTreeSet<String>>,
    pub mappings: BTreeSet<Mapping>,
    pub codes: BTreeMap<String, String>,
}

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one entity's outcome in.
    pub fn merge(&mut self, outcome: &EntityOutcome) {
        let entity = &outcome.entity;
        let cui = &outcome.cui;
        if !cui.additions.is_empty() {
            self.cuis
                .entry(entity.clone())
                .or_default()
                .extend(cui.additions.iter().cloned());
        }
        if cui.needs_note() {
            self.notes.insert(entity.clone());
        }
        if !cui.alt_label_purges.is_empty() {
            self.alt_label_purges
                .entry(entity.clone())
                .or_default()
                .extend(cui.alt_label_purges.iter().cloned());
        }
        if !outcome.tui.additions.is_empty() {
            self.tuis
                .entry(entity.clone())
                .or_default()
                .extend(outcome.tui.additions.iter().cloned());
        }
        self.mappings.extend(cui.mappings.iter().cloned());
        if let Some(code) = &cui.code {
            self.codes.insert(entity.clone(), code.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cuis.is_empty()
            && self.notes.is_empty()
            && self.alt_label_purges.is_empty()
            && self.tuis.is_empty()
            && self.mappings.is_empty()
            && self.codes.is_empty()
    }

    /// Count of individual statements added or removed by the commit stages,
    /// excluding the duplicate-label sweep.
    pub fn change_count(&self) -> usize {
        self.cuis.values().map(BTreeSet::len).sum::<usize>()
            + self.notes.len()
            + self.alt_label_purges.values().map(BTreeSet::len).sum::<usize>()
            + self.tuis.values().map(BTreeSet::len).sum::<usize>()
            + self.mappings.len()
            + self.codes.len()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| EnrichError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), changes = self.change_count(), "saved pending changes");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| EnrichError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| EnrichError::PendingFormat {
            path: path.to_path_buf(),
            source,
        })
    }
}
