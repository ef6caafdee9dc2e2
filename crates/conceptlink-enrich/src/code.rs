//! Source-terminology code discovery.
//!
//! An entity's code is looked up through several strategies in order; the
//! first one that yields something wins. A trailing `^^datatype` annotation is
//! stripped from whatever is found.

use crate::lookup::CachedGraph;
use conceptlink_rdf::vocab;

pub trait CodeFinder: Send + Sync {
    fn code(&self, entity: &str) -> Option<String>;
}

/// First value of one annotation property.
pub struct PropertyCodeFinder {
    graph: CachedGraph,
    predicate: String,
}

impl PropertyCodeFinder {
    pub fn new(graph: CachedGraph, predicate: impl Into<String>) -> Self {
        Self {
            graph,
            predicate: predicate.into(),
        }
    }
}

impl CodeFinder for PropertyCodeFinder {
    fn code(&self, entity: &str) -> Option<String> {
        self.graph
            .values(entity, &self.predicate)
            .into_iter()
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

/// IRI fragment up to the first `_` (`...#E11_1` gives `E11`).
#[derive(Debug, Default, Clone, Copy)]
pub struct UriFragmentCodeFinder;

impl CodeFinder for UriFragmentCodeFinder {
    fn code(&self, entity: &str) -> Option<String> {
        let (_, fragment) = entity.split_once('#')?;
        let code = fragment.split('_').next().unwrap_or_default();
        (!code.is_empty()).then(|| code.to_string())
    }
}

pub struct CompositeCodeFinder {
    finders: Vec<Box<dyn CodeFinder>>,
}

impl CompositeCodeFinder {
    pub fn new(finders: Vec<Box<dyn CodeFinder>>) -> Self {
        Self { finders }
    }

    /// `skos:notation`, the ICD-10 and ICPC-2 code annotations, then the IRI fragment.
    pub fn standard(graph: &CachedGraph) -> Self {
        Self::with_properties(
            graph,
            &[vocab::SKOS_NOTATION, vocab::ICD_CODE, vocab::ICPC_CODE],
        )
    }

    /// The given annotation properties in order, then the IRI fragment.
    pub fn with_properties(graph: &CachedGraph, properties: &[&str]) -> Self {
        let mut finders: Vec<Box<dyn CodeFinder>> = properties
            .iter()
            .map(|p| Box::new(PropertyCodeFinder::new(graph.clone(), *p)) as Box<dyn CodeFinder>)
            .collect();
        finders.push(Box::new(UriFragmentCodeFinder));
        Self::new(finders)
    }
}

impl CodeFinder for CompositeCodeFinder {
    fn code(&self, entity: &str) -> Option<String> {
        let raw = self.finders.iter().find_map(|finder| finder.code(entity))?;
        let code = match raw.split_once("^^") {
            Some((lexical, _)) => lexical.to_string(),
            None => raw,
        };
        (!code.is_empty()).then_some(code)
    }
}
