//! Lookaside cache for repeated graph and terminology lookups.
//!
//! ```text
//!   worker ──► CacheGateway::get_or_load(key, loader)
//!                 │  hit (values)        ──► values
//!                 │  hit (empty marker)  ──► []
//!                 │  miss ──► per-key gate ──► loader() ──► put / mark_empty
//!                 ▼
//!            CacheStore (MemoryCache | RedisCache)
//! ```
//!
//! A key reaches its loader at most once per run: the first miss takes the
//! per-key gate, every concurrent miss for the same key waits on it and then
//! reads the stored result. Entries are never invalidated; the graphs and the
//! terminology are immutable for the duration of a run.

mod gateway;
pub mod memory;
pub mod redis_store;

pub use gateway::CacheGateway;
pub use memory::MemoryCache;
pub use redis_store::RedisCache;

use std::fmt;

/// Namespaced cache key.
///
/// Graph-scoped keys carry the graph name so the same IRI looked up in the
/// source and in the target graph never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Mappings whose source is `entity`.
    Mappings { graph: String, entity: String },
    /// Concept identifiers asserted on `entity`.
    Concepts { graph: String, entity: String },
    /// Semantic types asserted on `entity`.
    Types { graph: String, entity: String },
    /// Preferred label text of `entity`.
    PrefLabel { graph: String, entity: String },
    /// CUI-shaped alternate labels of `entity`.
    AltLabelConcepts { graph: String, entity: String },
    /// Generic `entity --predicate--> ?` values.
    Relation {
        graph: String,
        predicate: String,
        entity: String,
    },
    /// Semantic types of a concept in the terminology.
    SemanticTypes { cui: String },
    /// Concepts carrying a source code in the terminology.
    CodeConcepts {
        code: String,
        language: Option<String>,
    },
    /// Concept descriptions for a language, optionally restricted to some CUIs.
    ConceptNames {
        language: String,
        cuis: Option<Vec<String>>,
    },
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Mappings { graph, entity } => write!(f, "m|{graph}|{entity}"),
            CacheKey::Concepts { graph, entity } => write!(f, "c|{graph}|{entity}"),
            CacheKey::Types { graph, entity } => write!(f, "t|{graph}|{entity}"),
            CacheKey::PrefLabel { graph, entity } => write!(f, "pl|{graph}|{entity}"),
            CacheKey::AltLabelConcepts { graph, entity } => write!(f, "ac|{graph}|{entity}"),
            CacheKey::Relation {
                graph,
                predicate,
                entity,
            } => write!(f, "r|{graph}|{predicate}|{entity}"),
            CacheKey::SemanticTypes { cui } => write!(f, "sty|{cui}"),
            CacheKey::CodeConcepts { code, language } => match language {
                Some(lang) => write!(f, "code|{lang}|{code}"),
                None => write!(f, "code|*|{code}"),
            },
            CacheKey::ConceptNames { language, cuis } => match cuis {
                Some(cuis) => write!(f, "cn|{language}|{}", cuis.join(",")),
                None => write!(f, "cn|{language}|*"),
            },
        }
    }
}

/// Prefix of the explicit "known empty" marker stored next to a key.
pub const EMPTY_MARKER_PREFIX: &str = "e|";

/// Backing key-value service.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheError>;
    fn put(&self, key: &str, values: &[String]) -> Result<(), CacheError>;
    fn mark_empty(&self, key: &str) -> Result<(), CacheError>;
    fn is_marked_empty(&self, key: &str) -> Result<bool, CacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connect(String),
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_kind_and_graph() {
        let source = CacheKey::Concepts {
            graph: "cim10".into(),
            entity: "http://ex/E11".into(),
        };
        let target = CacheKey::Concepts {
            graph: "mesh".into(),
            entity: "http://ex/E11".into(),
        };
        assert_eq!(source.to_string(), "c|cim10|http://ex/E11");
        assert_ne!(source.to_string(), target.to_string());

        let names = CacheKey::ConceptNames {
            language: "FRE".into(),
            cuis: Some(vec!["C001".into(), "C002".into()]),
        };
        assert_eq!(names.to_string(), "cn|FRE|C001,C002");
    }
}
