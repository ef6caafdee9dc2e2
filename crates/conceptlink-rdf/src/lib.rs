//! RDF/OWL graph access for conceptlink (boundary adapter).
//!
//! This crate owns the **knowledge graph port**:
//!
//! - It parses ontology files (untrusted) into a small, deterministic term model.
//! - It exposes narrow capability traits (`GraphReader`, `GraphWriter`) that
//!   the enrichment engine composes, instead of one wide "ontology" object.
//! - It persists the mutated graph as N-Triples (which is also valid Turtle).
//!
//! Parsing is delegated to **Sophia**:
//! - N-Triples (`.nt`)
//! - Turtle (`.ttl`)
//! - N-Quads (`.nq`, graph names are dropped)
//! - TriG (`.trig`, graph names are dropped)
//! - RDF/XML (`.rdf`, `.owl`, `.xml`)

pub mod graph;
mod parse;
mod serialize;
pub mod vocab;

pub use graph::{GraphReader, GraphStore, GraphWriter, OntologyGraph};
pub use parse::{parse_statements, RdfFormat};
pub use serialize::write_ntriples;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// RDF term model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RdfNode {
    Iri(String),
    BlankNode(String),
}

impl RdfNode {
    /// The string form used as the universal entity key (`_:` prefix for blank nodes).
    pub fn key(&self) -> String {
        match self {
            RdfNode::Iri(iri) => iri.clone(),
            RdfNode::BlankNode(bn) => format!("_:{bn}"),
        }
    }

    /// Inverse of [`RdfNode::key`].
    pub fn from_key(key: &str) -> Self {
        match key.strip_prefix("_:") {
            Some(bn) => RdfNode::BlankNode(bn.to_string()),
            None => RdfNode::Iri(key.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn tagged(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    /// Build a literal from an optional language tag.
    pub fn with_language(lexical: impl Into<String>, language: Option<&str>) -> Self {
        match language {
            Some(lang) => Self::tagged(lexical, lang),
            None => Self::plain(lexical),
        }
    }

    /// Whether this literal denotes `text` in `language`.
    ///
    /// `None` matches plain literals and `xsd:string` literals (RDF 1.1 treats
    /// them as the same term). Language tags compare case-insensitively.
    pub fn matches(&self, text: &str, language: Option<&str>) -> bool {
        if self.lexical != text {
            return false;
        }
        match (language, self.language.as_deref()) {
            (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
            (None, None) => self
                .datatype
                .as_deref()
                .map_or(true, |dt| dt == vocab::XSD_STRING),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RdfObject {
    Node(RdfNode),
    Literal(Literal),
}

impl RdfObject {
    /// Lexical value with any datatype or language annotation stripped.
    pub fn value(&self) -> String {
        match self {
            RdfObject::Node(node) => node.key(),
            RdfObject::Literal(lit) => lit.lexical.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdfStatement {
    pub subject: RdfNode,
    pub predicate: String,
    pub object: RdfObject,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RdfError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Unsupported format: .{0}")]
    UnsupportedFormat(String),
    #[error("no output path configured for graph")]
    NoOutputPath,
}

pub type Result<T> = std::result::Result<T, RdfError>;
