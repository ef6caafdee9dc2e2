//! Concept identifier resolution for one entity.
//!
//! Sources are tried in order and the first non-empty one wins:
//!
//! 1. `umls:cui` already asserted on the entity in the source graph
//! 2. CUI-shaped `skos:altLabel` literals
//! 3. `umls:cui` asserted on mapped entities in the target graph
//! 4. the terminology, by the entity's source code
//! 5. optionally, the best-ranked concept of the whole terminology
//!
//! Whatever the origin, a set of more than one CUI is ambiguous and may be
//! collapsed to one by ranking.

use crate::code::CodeFinder;
use crate::lookup::Lookups;
use crate::mapping::Mapping;
use crate::options::ResolutionOptions;
use crate::ranker::TverskyRanker;
use crate::stats::Stat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CuiOrigin {
    Source,
    AltLabel,
    Mappings,
    Code,
    Ranking,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CuiResolution {
    /// Final CUI set of the entity.
    pub cuis: BTreeSet<String>,
    pub origin: CuiOrigin,
    /// CUIs to write at commit time (excludes CUIs already in the graph).
    pub additions: BTreeSet<String>,
    /// CUI-shaped alternate labels to purge once the CUIs are written.
    pub alt_label_purges: BTreeSet<String>,
    /// Source code of the entity, if one was recognised.
    pub code: Option<String>,
    /// Outgoing mappings of the entity.
    pub mappings: Vec<Mapping>,
    pub events: BTreeSet<Stat>,
}

impl CuiResolution {
    /// Whether the entity gets a provenance note.
    pub fn needs_note(&self) -> bool {
        !self.additions.is_empty()
    }
}

pub struct CuiResolver {
    lookups: Lookups,
    codes: Arc<dyn CodeFinder>,
    ranker: TverskyRanker,
    options: ResolutionOptions,
}

impl CuiResolver {
    pub fn new(
        lookups: Lookups,
        codes: Arc<dyn CodeFinder>,
        ranker: TverskyRanker,
        options: ResolutionOptions,
    ) -> Self {
        Self {
            lookups,
            codes,
            ranker,
            options,
        }
    }

    pub fn resolve(&self, entity: &str) -> CuiResolution {
        let mut events = BTreeSet::new();
        let mut alt_label_purges = BTreeSet::new();

        let mappings = self.lookups.mappings.mappings_from(entity);
        let code = self.codes.code(entity);
        if code.is_some() {
            events.insert(Stat::TerminologyCodeFound);
        }

        let asserted: BTreeSet<String> = self.lookups.source.concepts(entity).into_iter().collect();
        let (mut cuis, origin) = if asserted.is_empty() {
            events.insert(Stat::WithoutCui);
            self.cascade(
                entity,
                code.as_deref(),
                &mappings,
                &mut alt_label_purges,
                &mut events,
            )
        } else {
            tracing::debug!(entity, count = asserted.len(), "CUIs asserted in source");
            events.insert(Stat::CuiInSource);
            (asserted, CuiOrigin::Source)
        };

        let mut disambiguated = false;
        if cuis.len() > 1 {
            events.insert(Stat::AmbiguousCui);
            if let Some(code) = code.as_deref() {
                self.compare_with_terminology(entity, code, &cuis, &mut events);
            }
            if self.options.disambiguate {
                if let Some(best) = self.rank(entity, Some(&cuis), &mut events) {
                    tracing::debug!(entity, cui = %best, from = cuis.len(), "disambiguated");
                    cuis = BTreeSet::from([best]);
                    disambiguated = true;
                }
            }
        }

        let additions = match origin {
            CuiOrigin::Source if !disambiguated => BTreeSet::new(),
            _ => cuis.clone(),
        };

        CuiResolution {
            cuis,
            origin,
            additions,
            alt_label_purges,
            code,
            mappings,
            events,
        }
    }

    fn cascade(
        &self,
        entity: &str,
        code: Option<&str>,
        mappings: &[Mapping],
        alt_label_purges: &mut BTreeSet<String>,
        events: &mut BTreeSet<Stat>,
    ) -> (BTreeSet<String>, CuiOrigin) {
        let from_alt: BTreeSet<String> = self
            .lookups
            .source
            .alt_label_concepts(entity)
            .into_iter()
            .collect();
        if !from_alt.is_empty() {
            tracing::debug!(entity, count = from_alt.len(), "CUIs found in alternate labels");
            events.insert(Stat::CuiInAltLabel);
            alt_label_purges.extend(from_alt.iter().cloned());
            return (from_alt, CuiOrigin::AltLabel);
        }

        let targets: BTreeSet<&str> = mappings.iter().map(|m| m.target.as_str()).collect();
        let from_mappings: BTreeSet<String> = targets
            .into_iter()
            .flat_map(|target| self.lookups.target.concepts(target))
            .collect();
        if !from_mappings.is_empty() {
            tracing::debug!(entity, count = from_mappings.len(), "CUIs found through mappings");
            events.insert(Stat::CuiInMappings);
            return (from_mappings, CuiOrigin::Mappings);
        }

        if let Some(code) = code {
            let lookup = self.lookups.terminology.cuis_for_code(code, None);
            let from_code: BTreeSet<String> =
                recover(entity, "cuis_for_code", lookup, events).into_iter().collect();
            if !from_code.is_empty() {
                tracing::debug!(entity, code, count = from_code.len(), "CUIs found through code");
                events.insert(Stat::CuiThroughCode);
                return (from_code, CuiOrigin::Code);
            }
        }

        tracing::debug!(entity, "no CUI found");
        events.insert(Stat::RemainingWithoutCui);

        if self.options.best_effort_match {
            if let Some(best) = self.rank(entity, None, events) {
                tracing::debug!(entity, cui = %best, "matched by ranking");
                events.insert(Stat::MatchedByRanking);
                return (BTreeSet::from([best]), CuiOrigin::Ranking);
            }
        }
        (BTreeSet::new(), CuiOrigin::NotFound)
    }

    fn compare_with_terminology(
        &self,
        entity: &str,
        code: &str,
        cuis: &BTreeSet<String>,
        events: &mut BTreeSet<Stat>,
    ) {
        let lookup = self
            .lookups
            .terminology
            .cuis_for_code(code, Some(self.options.language));
        let known: BTreeSet<String> = recover(entity, "cuis_for_code", lookup, events)
            .into_iter()
            .collect();
        match known.len().cmp(&cuis.len()) {
            std::cmp::Ordering::Greater => {
                events.insert(Stat::FewerCuisThanTerminology);
            }
            std::cmp::Ordering::Less => {
                events.insert(Stat::MoreCuisThanTerminology);
            }
            std::cmp::Ordering::Equal => {}
        }
    }

    fn rank(
        &self,
        entity: &str,
        cuis: Option<&BTreeSet<String>>,
        events: &mut BTreeSet<Stat>,
    ) -> Option<String> {
        let label = self.lookups.source.pref_label(entity);
        let ranked = self.ranker.best_concept(
            self.lookups.terminology.as_ref(),
            self.options.language,
            cuis,
            &label,
        );
        recover(entity, "concept_descriptions", ranked, events)
    }
}

/// Log a failed lookup and continue with an empty result.
pub(crate) fn recover<T: Default>(
    entity: &str,
    lookup: &'static str,
    result: conceptlink_terminology::Result<T>,
    events: &mut BTreeSet<Stat>,
) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(entity, lookup, error = %err, "terminology lookup failed");
            events.insert(Stat::LookupFailure);
            T::default()
        }
    }
}
