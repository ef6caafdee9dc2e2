//! Fixtures shared by the unit tests.

use crate::lookup::Lookups;
use conceptlink_cache::CacheGateway;
use conceptlink_rdf::OntologyGraph;
use conceptlink_terminology::{
    ConceptDescription, Language, Result, TerminologyError, TerminologySource,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub const PREFIXES: &str = r#"
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
@prefix umls: <http://bioportal.bioontology.org/ontologies/umls/> .
@prefix ex: <http://ex/> .
@prefix tgt: <http://tgt/> .
"#;

/// In-memory terminology that records every call.
#[derive(Default)]
pub struct FakeTerminology {
    pub types: BTreeMap<String, Vec<String>>,
    pub descriptions: Vec<(Language, ConceptDescription)>,
    pub codes: BTreeMap<String, Vec<String>>,
    pub failing: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeTerminology {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn call(&self, what: String) -> Result<()> {
        self.calls.lock().push(what);
        if self.failing {
            return Err(TerminologyError::Query(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl TerminologySource for FakeTerminology {
    fn semantic_types(&self, cui: &str) -> Result<Vec<String>> {
        self.call(format!("types {cui}"))?;
        Ok(self.types.get(cui).cloned().unwrap_or_default())
    }

    fn concept_descriptions(
        &self,
        language: Language,
        cuis: Option<&BTreeSet<String>>,
    ) -> Result<Vec<ConceptDescription>> {
        self.call(format!("descriptions {language}"))?;
        Ok(self
            .descriptions
            .iter()
            .filter(|(lang, d)| *lang == language && cuis.map_or(true, |set| set.contains(&d.cui)))
            .map(|(_, d)| d.clone())
            .collect())
    }

    fn cuis_for_code(&self, code: &str, _language: Option<Language>) -> Result<Vec<String>> {
        self.call(format!("code {code}"))?;
        Ok(self.codes.get(code).cloned().unwrap_or_default())
    }
}

pub fn graph(name: &str, body: &str) -> OntologyGraph {
    OntologyGraph::from_turtle(name, &format!("{PREFIXES}{body}")).unwrap()
}

pub fn lookups(source: &str, target: &str, mappings: &str, terminology: Arc<FakeTerminology>) -> Lookups {
    Lookups::new(
        Arc::new(graph("src", source)),
        Arc::new(graph("tgt", target)),
        Arc::new(graph("map", mappings)),
        terminology,
        CacheGateway::in_memory(),
    )
}
