use crate::{ConceptDescription, Language, Result, TerminologySource};
use conceptlink_cache::{CacheGateway, CacheKey};
use std::collections::BTreeSet;

/// Routes every terminology lookup through the shared cache.
///
/// Each distinct query reaches `inner` at most once per run; empty answers
/// are remembered as well.
pub struct CachedTerminology<T> {
    inner: T,
    cache: CacheGateway,
}

impl<T: TerminologySource> CachedTerminology<T> {
    pub fn new(inner: T, cache: CacheGateway) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: TerminologySource> TerminologySource for CachedTerminology<T> {
    fn semantic_types(&self, cui: &str) -> Result<Vec<String>> {
        let key = CacheKey::SemanticTypes {
            cui: cui.to_string(),
        };
        self.cache
            .get_or_load(&key, || self.inner.semantic_types(cui))
    }

    fn concept_descriptions(
        &self,
        language: Language,
        cuis: Option<&BTreeSet<String>>,
    ) -> Result<Vec<ConceptDescription>> {
        let key = CacheKey::ConceptNames {
            language: language.terminology_code().to_string(),
            cuis: cuis.map(|set| set.iter().cloned().collect()),
        };
        let encoded = self.cache.get_or_load(&key, || {
            self.inner
                .concept_descriptions(language, cuis)
                .map(|descriptions| descriptions.iter().map(encode).collect())
        })?;
        Ok(encoded.iter().filter_map(|value| decode(value)).collect())
    }

    fn cuis_for_code(&self, code: &str, language: Option<Language>) -> Result<Vec<String>> {
        let key = CacheKey::CodeConcepts {
            code: code.to_string(),
            language: language.map(|lang| lang.terminology_code().to_string()),
        };
        self.cache
            .get_or_load(&key, || self.inner.cuis_for_code(code, language))
    }
}

fn encode(description: &ConceptDescription) -> String {
    format!("{}\t{}", description.cui, description.description)
}

fn decode(value: &str) -> Option<ConceptDescription> {
    let (cui, description) = value.split_once('\t')?;
    Some(ConceptDescription::new(cui, description))
}
