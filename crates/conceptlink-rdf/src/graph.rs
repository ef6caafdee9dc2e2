//! In-memory ontology graph and the capability traits the engine composes.
//!
//! Reads go through [`GraphReader`] (shared, concurrent), mutations through
//! [`GraphWriter`] (exclusive). A graph shared between workers is wrapped in
//! `parking_lot::RwLock`, which implements [`GraphReader`] by taking the read
//! lock for the duration of one lookup.

use crate::{parse, serialize, vocab, Literal, RdfError, RdfFormat, RdfNode, RdfObject, RdfStatement, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Read access to one RDF graph.
pub trait GraphReader: Send + Sync {
    /// Short name of the graph (file stem), used to namespace cache keys.
    fn name(&self) -> String;

    /// IRIs of all named classes, sorted.
    fn classes(&self) -> Vec<String>;

    /// Distinct object values of `subject --predicate--> ?`, sorted.
    ///
    /// Literal datatypes and language tags are stripped; blank nodes are
    /// rendered with their `_:` prefix.
    fn asserted_values(&self, subject: &str, predicate: &str) -> Vec<String>;

    /// Literal objects of `subject --predicate--> ?`, with language tags kept.
    fn literals(&self, subject: &str, predicate: &str) -> Vec<Literal>;
}

/// Mutation access to one RDF graph.
pub trait GraphWriter {
    fn add_statement(&mut self, subject: &str, predicate: &str, object: &str);

    fn add_literal(&mut self, subject: &str, predicate: &str, text: &str, language: Option<&str>);

    /// Remove every literal denoting `text` in `language`. Returns how many were removed.
    fn remove_literal(
        &mut self,
        subject: &str,
        predicate: &str,
        text: &str,
        language: Option<&str>,
    ) -> usize;

    /// Write the graph to its configured output location.
    fn persist(&self) -> Result<PathBuf>;
}

/// Something the write-back pipeline can both inspect and mutate.
pub trait GraphStore: GraphReader + GraphWriter {}

impl<T: GraphReader + GraphWriter + ?Sized> GraphStore for T {}

type PredicateObjects = BTreeMap<String, BTreeSet<RdfObject>>;

/// Subject-indexed triple store with deterministic iteration order.
#[derive(Debug, Clone)]
pub struct OntologyGraph {
    name: String,
    format: RdfFormat,
    output: Option<PathBuf>,
    triples: BTreeMap<RdfNode, PredicateObjects>,
    len: usize,
}

impl OntologyGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: RdfFormat::NTriples,
            output: None,
            triples: BTreeMap::new(),
            len: 0,
        }
    }

    /// Load a graph from a file; the format is chosen from the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let format = RdfFormat::from_path(path)?;
        let bytes = std::fs::read(path).map_err(|source| RdfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let statements = parse::parse_statements(&bytes, format)?;

        let mut graph = Self::from_statements(ontology_name(path), statements);
        graph.format = format;
        tracing::info!(
            path = %path.display(),
            triples = graph.len(),
            "loaded ontology graph"
        );
        Ok(graph)
    }

    pub fn from_statements(
        name: impl Into<String>,
        statements: impl IntoIterator<Item = RdfStatement>,
    ) -> Self {
        let mut graph = Self::new(name);
        for statement in statements {
            graph.insert(statement.subject, statement.predicate, statement.object);
        }
        graph
    }

    /// Parse an in-memory Turtle document (handy for fixtures).
    pub fn from_turtle(name: impl Into<String>, text: &str) -> Result<Self> {
        let statements = parse::parse_statements(text.as_bytes(), RdfFormat::Turtle)?;
        let mut graph = Self::from_statements(name, statements);
        graph.format = RdfFormat::Turtle;
        Ok(graph)
    }

    pub fn insert(&mut self, subject: RdfNode, predicate: String, object: RdfObject) -> bool {
        let inserted = self
            .triples
            .entry(subject)
            .or_default()
            .entry(predicate)
            .or_default()
            .insert(object);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    pub fn contains(&self, subject: &str, predicate: &str, object: &RdfObject) -> bool {
        self.objects(subject, predicate)
            .is_some_and(|objects| objects.contains(object))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn format(&self) -> RdfFormat {
        self.format
    }

    /// Set where [`GraphWriter::persist`] writes.
    pub fn set_output(&mut self, path: PathBuf) {
        self.output = Some(path);
    }

    /// `<dir>/<name>_<suffix>.<ext>`, the conventional enriched-output location.
    pub fn derived_output_path(&self, dir: &Path, suffix: &str) -> PathBuf {
        dir.join(format!(
            "{}_{}.{}",
            self.name,
            suffix,
            self.format.output_extension()
        ))
    }

    /// All statements in subject/predicate/object order.
    pub fn statements(&self) -> impl Iterator<Item = (&RdfNode, &str, &RdfObject)> + '_ {
        self.triples.iter().flat_map(|(subject, predicates)| {
            predicates.iter().flat_map(move |(predicate, objects)| {
                objects
                    .iter()
                    .map(move |object| (subject, predicate.as_str(), object))
            })
        })
    }

    fn objects(&self, subject: &str, predicate: &str) -> Option<&BTreeSet<RdfObject>> {
        self.triples
            .get(&RdfNode::from_key(subject))
            .and_then(|predicates| predicates.get(predicate))
    }
}

/// File stem up to the first `.` (`cim10.ttl` and `cim10.owl.xml` both give `cim10`).
fn ontology_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("ontology");
    file_name
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("ontology")
        .to_string()
}

impl GraphReader for OntologyGraph {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn classes(&self) -> Vec<String> {
        let class_types: BTreeSet<RdfObject> = vocab::CLASS_TYPES
            .iter()
            .map(|iri| RdfObject::Node(RdfNode::Iri(iri.to_string())))
            .collect();

        self.triples
            .iter()
            .filter_map(|(subject, predicates)| {
                let RdfNode::Iri(iri) = subject else {
                    return None;
                };
                predicates
                    .get(vocab::RDF_TYPE)
                    .filter(|types| types.iter().any(|t| class_types.contains(t)))
                    .map(|_| iri.clone())
            })
            .collect()
    }

    fn asserted_values(&self, subject: &str, predicate: &str) -> Vec<String> {
        let Some(objects) = self.objects(subject, predicate) else {
            return Vec::new();
        };
        let values: BTreeSet<String> = objects.iter().map(RdfObject::value).collect();
        values.into_iter().collect()
    }

    fn literals(&self, subject: &str, predicate: &str) -> Vec<Literal> {
        self.objects(subject, predicate)
            .map(|objects| {
                objects
                    .iter()
                    .filter_map(|o| match o {
                        RdfObject::Literal(lit) => Some(lit.clone()),
                        RdfObject::Node(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GraphWriter for OntologyGraph {
    fn add_statement(&mut self, subject: &str, predicate: &str, object: &str) {
        self.insert(
            RdfNode::from_key(subject),
            predicate.to_string(),
            RdfObject::Node(RdfNode::from_key(object)),
        );
    }

    fn add_literal(&mut self, subject: &str, predicate: &str, text: &str, language: Option<&str>) {
        self.insert(
            RdfNode::from_key(subject),
            predicate.to_string(),
            RdfObject::Literal(Literal::with_language(text, language)),
        );
    }

    fn remove_literal(
        &mut self,
        subject: &str,
        predicate: &str,
        text: &str,
        language: Option<&str>,
    ) -> usize {
        let Some(objects) = self
            .triples
            .get_mut(&RdfNode::from_key(subject))
            .and_then(|predicates| predicates.get_mut(predicate))
        else {
            return 0;
        };

        let before = objects.len();
        objects.retain(|o| match o {
            RdfObject::Literal(lit) => !lit.matches(text, language),
            RdfObject::Node(_) => true,
        });
        let removed = before - objects.len();
        self.len -= removed;
        removed
    }

    fn persist(&self) -> Result<PathBuf> {
        let path = self.output.clone().ok_or(RdfError::NoOutputPath)?;
        let file = std::fs::File::create(&path).map_err(|source| RdfError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = std::io::BufWriter::new(file);
        serialize::write_ntriples(self, &mut writer)
            .and_then(|_| std::io::Write::flush(&mut writer))
            .map_err(|source| RdfError::Io {
                path: path.clone(),
                source,
            })?;
        tracing::info!(path = %path.display(), triples = self.len(), "persisted graph");
        Ok(path)
    }
}

impl GraphReader for RwLock<OntologyGraph> {
    fn name(&self) -> String {
        self.read().name()
    }

    fn classes(&self) -> Vec<String> {
        self.read().classes()
    }

    fn asserted_values(&self, subject: &str, predicate: &str) -> Vec<String> {
        self.read().asserted_values(subject, predicate)
    }

    fn literals(&self, subject: &str, predicate: &str) -> Vec<Literal> {
        self.read().literals(subject, predicate)
    }
}
