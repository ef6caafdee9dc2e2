//! Cross-ontology mappings.

use crate::lookup::GraphRole;
use conceptlink_cache::{CacheGateway, CacheKey};
use conceptlink_rdf::{vocab, GraphReader};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

/// A directed `source --property--> target` correspondence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mapping {
    pub source: String,
    pub property: String,
    pub target: String,
}

impl Mapping {
    pub fn new(
        source: impl Into<String>,
        property: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            property: property.into(),
            target: target.into(),
        }
    }
}

/// Where mappings for a source entity come from.
pub trait MappingSource: Send + Sync {
    /// Mappings whose source is `entity`, in a stable order.
    fn mappings_from(&self, entity: &str) -> Vec<Mapping>;
}

/// Mappings stored as triples in a dedicated graph, read through the cache.
pub struct MappingGraph {
    graph: Arc<dyn GraphReader>,
    name: String,
    cache: CacheGateway,
}

impl MappingGraph {
    pub fn new(graph: Arc<dyn GraphReader>, cache: CacheGateway) -> Self {
        let name = GraphRole::Mappings.namespace(graph.as_ref());
        Self { graph, name, cache }
    }

    fn read(&self, entity: &str) -> Vec<String> {
        vocab::MAPPING_PREDICATES
            .iter()
            .flat_map(|predicate| {
                self.graph
                    .asserted_values(entity, predicate)
                    .into_iter()
                    .map(move |target| format!("{predicate}\t{target}"))
            })
            .collect()
    }
}

impl MappingSource for MappingGraph {
    fn mappings_from(&self, entity: &str) -> Vec<Mapping> {
        let key = CacheKey::Mappings {
            graph: self.name.clone(),
            entity: entity.to_string(),
        };
        let encoded = match self
            .cache
            .get_or_load(&key, || Ok::<_, Infallible>(self.read(entity)))
        {
            Ok(values) => values,
            Err(never) => match never {},
        };

        let mappings: Vec<Mapping> = encoded
            .iter()
            .filter_map(|value| {
                let (property, target) = value.split_once('\t')?;
                Some(Mapping::new(entity, property, target))
            })
            .collect();
        tracing::debug!(entity, count = mappings.len(), "found mappings");
        mappings
    }
}
