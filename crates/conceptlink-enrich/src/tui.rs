//! Semantic type resolution for one entity.

use crate::cui::recover;
use crate::lookup::Lookups;
use crate::mapping::Mapping;
use crate::stats::Stat;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TuiResolution {
    /// TUIs to write at commit time.
    pub additions: BTreeSet<String>,
    pub events: BTreeSet<Stat>,
}

pub struct TuiResolver {
    lookups: Lookups,
}

impl TuiResolver {
    pub fn new(lookups: Lookups) -> Self {
        Self { lookups }
    }

    /// With CUIs, the types come from the terminology. Without, the entity's
    /// own types stand; failing those, the types of its mapped entities.
    pub fn resolve(&self, entity: &str, cuis: &BTreeSet<String>, mappings: &[Mapping]) -> TuiResolution {
        let mut events = BTreeSet::new();
        let asserted: BTreeSet<String> = self.lookups.source.types(entity).into_iter().collect();

        if !cuis.is_empty() {
            let mut derived = BTreeSet::new();
            for cui in cuis {
                let lookup = self.lookups.terminology.semantic_types(cui);
                derived.extend(recover(entity, "semantic_types", lookup, &mut events));
            }
            if !derived.is_empty() {
                events.insert(Stat::TuiFromCui);
            } else if asserted.is_empty() {
                events.insert(Stat::RemainingWithoutTui);
            }
            let additions: BTreeSet<String> = derived.difference(&asserted).cloned().collect();
            tracing::debug!(entity, count = additions.len(), "TUIs derived from CUIs");
            return TuiResolution { additions, events };
        }

        if !asserted.is_empty() {
            tracing::debug!(entity, count = asserted.len(), "TUIs asserted in source");
            return TuiResolution {
                additions: BTreeSet::new(),
                events,
            };
        }

        let targets: BTreeSet<&str> = mappings.iter().map(|m| m.target.as_str()).collect();
        let additions: BTreeSet<String> = targets
            .into_iter()
            .flat_map(|target| self.lookups.target.types(target))
            .collect();
        if additions.is_empty() {
            events.insert(Stat::RemainingWithoutTui);
        } else {
            tracing::debug!(entity, count = additions.len(), "TUIs found through mappings");
            events.insert(Stat::TuiFromMappings);
        }
        TuiResolution { additions, events }
    }
}
