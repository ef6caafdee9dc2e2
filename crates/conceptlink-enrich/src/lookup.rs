//! Cached read access to the graphs and the terminology.

use crate::mapping::{MappingGraph, MappingSource};
use conceptlink_cache::{CacheGateway, CacheKey};
use conceptlink_rdf::{vocab, GraphReader};
use conceptlink_terminology::{CachedTerminology, TerminologySource};
use regex::Regex;
use std::convert::Infallible;
use std::sync::{Arc, OnceLock};

/// A concept identifier: one uppercase letter followed by seven digits.
pub const CUI_PATTERN: &str = r"^[A-Z][0-9]{7}$";

fn cui_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CUI_PATTERN).expect("CUI pattern is a valid regex"))
}

/// Whether `text` (trimmed) is shaped like a concept identifier.
pub fn is_cui(text: &str) -> bool {
    cui_regex().is_match(text.trim())
}

/// The part a graph plays in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphRole {
    Source,
    Target,
    Mappings,
}

impl GraphRole {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphRole::Source => "source",
            GraphRole::Target => "target",
            GraphRole::Mappings => "mappings",
        }
    }

    /// Cache namespace of `graph` in this role. Two inputs sharing a file
    /// stem never share entries.
    pub fn namespace(self, graph: &dyn GraphReader) -> String {
        format!("{}:{}", self.as_str(), graph.name())
    }
}

/// One graph behind the shared cache, keyed under its role and name.
#[derive(Clone)]
pub struct CachedGraph {
    graph: Arc<dyn GraphReader>,
    name: String,
    cache: CacheGateway,
}

impl CachedGraph {
    pub fn new(role: GraphRole, graph: Arc<dyn GraphReader>, cache: CacheGateway) -> Self {
        let name = role.namespace(graph.as_ref());
        Self { graph, name, cache }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Arc<dyn GraphReader> {
        &self.graph
    }

    pub fn cache(&self) -> &CacheGateway {
        &self.cache
    }

    /// CUIs asserted on `entity` with `umls:cui`.
    pub fn concepts(&self, entity: &str) -> Vec<String> {
        let key = CacheKey::Concepts {
            graph: self.name.clone(),
            entity: entity.to_string(),
        };
        self.load(&key, || self.graph.asserted_values(entity, vocab::UMLS_CUI))
    }

    /// TUIs asserted on `entity` with `umls:tui`.
    pub fn types(&self, entity: &str) -> Vec<String> {
        let key = CacheKey::Types {
            graph: self.name.clone(),
            entity: entity.to_string(),
        };
        self.load(&key, || self.graph.asserted_values(entity, vocab::UMLS_TUI))
    }

    /// Label text used for ranking: every `skos:prefLabel` joined by a space,
    /// falling back to `rdfs:label`.
    pub fn pref_label(&self, entity: &str) -> String {
        let key = CacheKey::PrefLabel {
            graph: self.name.clone(),
            entity: entity.to_string(),
        };
        let label = self.load(&key, || {
            let mut texts = self.graph.asserted_values(entity, vocab::SKOS_PREF_LABEL);
            if texts.is_empty() {
                texts = self.graph.asserted_values(entity, vocab::RDFS_LABEL);
            }
            let joined = texts.join(" ");
            if joined.trim().is_empty() {
                Vec::new()
            } else {
                vec![joined]
            }
        });
        label.into_iter().next().unwrap_or_default()
    }

    /// Alternate labels of `entity` that are CUI-shaped, trimmed.
    pub fn alt_label_concepts(&self, entity: &str) -> Vec<String> {
        let key = CacheKey::AltLabelConcepts {
            graph: self.name.clone(),
            entity: entity.to_string(),
        };
        self.load(&key, || {
            self.graph
                .asserted_values(entity, vocab::SKOS_ALT_LABEL)
                .into_iter()
                .filter(|label| is_cui(label))
                .map(|label| label.trim().to_string())
                .collect()
        })
    }

    /// Values of an arbitrary `entity --predicate--> ?` relation.
    pub fn values(&self, entity: &str, predicate: &str) -> Vec<String> {
        let key = CacheKey::Relation {
            graph: self.name.clone(),
            predicate: predicate.to_string(),
            entity: entity.to_string(),
        };
        self.load(&key, || self.graph.asserted_values(entity, predicate))
    }

    fn load(&self, key: &CacheKey, read: impl FnOnce() -> Vec<String>) -> Vec<String> {
        match self.cache.get_or_load(key, || Ok::<_, Infallible>(read())) {
            Ok(values) => values,
            Err(never) => match never {},
        }
    }
}

/// Everything a resolution worker reads, each behind the shared cache.
#[derive(Clone)]
pub struct Lookups {
    pub source: CachedGraph,
    pub target: CachedGraph,
    pub mappings: Arc<dyn MappingSource>,
    pub terminology: Arc<dyn TerminologySource>,
}

impl Lookups {
    /// Wire the three graphs and the terminology through `cache`.
    pub fn new(
        source: Arc<dyn GraphReader>,
        target: Arc<dyn GraphReader>,
        mappings: Arc<dyn GraphReader>,
        terminology: Arc<dyn TerminologySource>,
        cache: CacheGateway,
    ) -> Self {
        Self {
            source: CachedGraph::new(GraphRole::Source, source, cache.clone()),
            target: CachedGraph::new(GraphRole::Target, target, cache.clone()),
            mappings: Arc::new(MappingGraph::new(mappings, cache.clone())),
            terminology: Arc::new(CachedTerminology::new(terminology, cache)),
        }
    }
}
