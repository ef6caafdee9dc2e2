//! Master terminology port.
//!
//! The terminology is a read-only relational store in the standard clinical
//! layout: `MRCONSO` holds concept names per language and source code,
//! `MRSTY` holds the semantic types of each concept.
//!
//! Consumers depend on [`TerminologySource`] only. [`SqlTerminology`] is the
//! database-backed implementation; [`CachedTerminology`] wraps any source
//! with the shared [`conceptlink_cache::CacheGateway`].

mod cached;
mod language;
mod sql;

pub use cached::CachedTerminology;
pub use language::Language;
pub use sql::SqlTerminology;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One name of a concept in one language.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConceptDescription {
    pub cui: String,
    pub description: String,
}

impl ConceptDescription {
    pub fn new(cui: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            cui: cui.into(),
            description: description.into(),
        }
    }
}

/// Synchronous, thread-safe access to the master terminology.
pub trait TerminologySource: Send + Sync {
    /// Semantic type identifiers of one concept.
    fn semantic_types(&self, cui: &str) -> Result<Vec<String>>;

    /// Concept names in `language`, restricted to `cuis` when given.
    ///
    /// `Some` of an empty set yields no descriptions; `None` means the whole
    /// terminology for that language.
    fn concept_descriptions(
        &self,
        language: Language,
        cuis: Option<&BTreeSet<String>>,
    ) -> Result<Vec<ConceptDescription>>;

    /// Concepts carrying source code `code`, optionally only in `language`.
    fn cuis_for_code(&self, code: &str, language: Option<Language>) -> Result<Vec<String>>;
}

impl<T: TerminologySource + ?Sized> TerminologySource for Arc<T> {
    fn semantic_types(&self, cui: &str) -> Result<Vec<String>> {
        (**self).semantic_types(cui)
    }

    fn concept_descriptions(
        &self,
        language: Language,
        cuis: Option<&BTreeSet<String>>,
    ) -> Result<Vec<ConceptDescription>> {
        (**self).concept_descriptions(language, cuis)
    }

    fn cuis_for_code(&self, code: &str, language: Option<Language>) -> Result<Vec<String>> {
        (**self).cuis_for_code(code, language)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TerminologyError {
    #[error("cannot connect to terminology database {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("terminology query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("unknown language code: {0}")]
    UnknownLanguage(String),
}

pub type Result<T> = std::result::Result<T, TerminologyError>;
