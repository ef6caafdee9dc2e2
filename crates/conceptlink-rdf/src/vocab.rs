//! IRIs of the vocabularies the enrichment pipeline reads and writes.

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

pub const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
pub const SKOS_ALT_LABEL: &str = "http://www.w3.org/2004/02/skos/core#altLabel";
pub const SKOS_NOTATION: &str = "http://www.w3.org/2004/02/skos/core#notation";
pub const SKOS_CHANGE_NOTE: &str = "http://www.w3.org/2004/02/skos/core#changeNote";
pub const SKOS_EXACT_MATCH: &str = "http://www.w3.org/2004/02/skos/core#exactMatch";
pub const SKOS_CLOSE_MATCH: &str = "http://www.w3.org/2004/02/skos/core#closeMatch";
pub const SKOS_RELATED_MATCH: &str = "http://www.w3.org/2004/02/skos/core#relatedMatch";
pub const SKOS_BROAD_MATCH: &str = "http://www.w3.org/2004/02/skos/core#broadMatch";

pub const GOLD_FREE_TRANSLATION: &str = "http://purl.org/linguistics/gold/freeTranslation";
pub const GOLD_TRANSLATION: &str = "http://purl.org/linguistics/gold/translation";

pub const UMLS_CUI: &str = "http://bioportal.bioontology.org/ontologies/umls/cui";
pub const UMLS_TUI: &str = "http://bioportal.bioontology.org/ontologies/umls/tui";
pub const UMLS_HAS_STY: &str = "http://bioportal.bioontology.org/ontologies/umls/hasSTY";

/// Default namespace of semantic-type classes referenced through `umls:hasSTY`.
pub const SEMANTIC_TYPE_BASE: &str = "http://purl.lirmm.fr/ontology/STY/";

/// ICD-10 (CIM-10) code annotation.
pub const ICD_CODE: &str = "http://chu-rouen.fr/cismef/CIM-10#cdCode";
/// ICPC-2 code annotation.
pub const ICPC_CODE: &str = "http://chu-rouen.fr/cismef/ICPC2P#ICPCCODE";

/// Types that mark a subject as an ontology class.
pub const CLASS_TYPES: [&str; 2] = [OWL_CLASS, RDFS_CLASS];

/// Predicates that link a source entity to a target entity in the mappings graph.
pub const MAPPING_PREDICATES: [&str; 6] = [
    SKOS_EXACT_MATCH,
    SKOS_CLOSE_MATCH,
    SKOS_RELATED_MATCH,
    SKOS_BROAD_MATCH,
    GOLD_FREE_TRANSLATION,
    GOLD_TRANSLATION,
];
