//! Concept (CUI) and semantic-type (TUI) enrichment of ontology classes.
//!
//! ```text
//!   Enricher ──(rayon pool, one task per class)──► EntityResolver
//!      │                                            ├─ CuiResolver  (cascade + ranking)
//!      │                                            └─ TuiResolver
//!      │◄──────────── EntityOutcome per class ──────┘
//!      ▼
//!   PendingChangeSet (merged in class order, single thread)
//!      ▼
//!   writeback::commit  (seven ordered stages, then persist)
//! ```
//!
//! Workers only read: the source, target and mappings graphs, the
//! terminology and the cache. Every task returns a value; nothing a task
//! produces is visible to another task, so the merged change set does not
//! depend on scheduling.

pub mod code;
pub mod cui;
pub mod lookup;
pub mod mapping;
pub mod options;
pub mod orchestrator;
pub mod pending;
pub mod ranker;
pub mod stats;
pub mod tui;
pub mod writeback;

#[cfg(test)]
mod testing;

pub use code::{CodeFinder, CompositeCodeFinder, PropertyCodeFinder, UriFragmentCodeFinder};
pub use cui::{CuiOrigin, CuiResolution, CuiResolver};
pub use lookup::{CachedGraph, GraphRole, Lookups};
pub use mapping::{Mapping, MappingGraph, MappingSource};
pub use options::ResolutionOptions;
pub use orchestrator::{
    replay, EntityOutcome, EntityResolver, Enricher, OutputPaths, ResolutionReport, RunState,
    RunSummary,
};
pub use pending::PendingChangeSet;
pub use ranker::{CandidateTerm, RankedCandidate, TverskyRanker};
pub use stats::{Stat, StatsSnapshot};
pub use tui::{TuiResolution, TuiResolver};
pub use writeback::CommitStage;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("graph error: {0}")]
    Graph(#[from] conceptlink_rdf::RdfError),

    #[error("terminology error: {0}")]
    Terminology(#[from] conceptlink_terminology::TerminologyError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pending change set {}: {source}", .path.display())]
    PendingFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot {action} while the run is {state:?}")]
    InvalidState {
        action: &'static str,
        state: RunState,
    },

    #[error("write-back failed ({source}); pending changes saved to {} for replay", .pending.display())]
    WriteBack {
        pending: PathBuf,
        #[source]
        source: conceptlink_rdf::RdfError,
    },
}

pub type Result<T> = std::result::Result<T, EnrichError>;
