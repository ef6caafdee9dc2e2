//! Run options for resolution and write-back.

use crate::{EnrichError, Result};
use conceptlink_rdf::vocab;
use conceptlink_terminology::Language;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROVENANCE_NOTE: &str =
    "Le LIRMM a enrichi ce concept en CUI et TUI par un processus automatique";

/// Every option that changes what the engine resolves or writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolutionOptions {
    /// Language of entity labels and of terminology descriptions used for ranking.
    pub language: Language,
    /// Collapse an ambiguous CUI set to its best-ranked member.
    pub disambiguate: bool,
    /// Rank the whole terminology when no CUI is found anywhere.
    pub best_effort_match: bool,
    /// Rewrite the preferred label as `"<code> - <label>"`.
    pub add_code_to_pref_label: bool,
    /// Text of the provenance note attached to entities that received CUIs.
    pub provenance_note: String,
    /// Language tag of the provenance note.
    pub note_language: Language,
    /// Base IRI of semantic-type classes (`umls:hasSTY` objects).
    pub semantic_type_base: String,
    /// Resolution worker count; defaults to one per available core.
    pub workers: usize,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            language: Language::French,
            disambiguate: false,
            best_effort_match: false,
            add_code_to_pref_label: false,
            provenance_note: DEFAULT_PROVENANCE_NOTE.to_string(),
            note_language: Language::French,
            semantic_type_base: vocab::SEMANTIC_TYPE_BASE.to_string(),
            workers: default_workers(),
        }
    }
}

impl ResolutionOptions {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(EnrichError::Config("workers must be at least 1".into()));
        }
        if self.provenance_note.trim().is_empty() {
            return Err(EnrichError::Config("provenance_note must not be empty".into()));
        }
        if !(self.semantic_type_base.starts_with("http://")
            || self.semantic_type_base.starts_with("https://"))
        {
            return Err(EnrichError::Config(format!(
                "semantic_type_base must be an http(s) IRI, got {:?}",
                self.semantic_type_base
            )));
        }
        Ok(())
    }

    /// Worker count for the resolution pool, never zero.
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    /// IRI of the semantic-type class for `tui`.
    pub fn semantic_type_iri(&self, tui: &str) -> String {
        format!("{}{}/", self.semantic_type_base, tui)
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
