//! Integration tests for the complete enrichment pipeline
//!
//! These tests drive the real orchestrator over in-memory graphs:
//! - Graphs → Cascade → Pending change set → Ordered write-back → File
//! - Cache gateway shared by concurrent workers
//! - Failed write-back → Pending dump → Replay
//!
//! Run with: cargo test --test integration_tests

use conceptlink_cache::CacheGateway;
use conceptlink_enrich::{
    replay, EnrichError, EntityResolver, Enricher, Lookups, OutputPaths, PendingChangeSet,
    ResolutionOptions, ResolutionReport, Stat,
};
use conceptlink_rdf::{vocab, GraphReader, Literal, OntologyGraph};
use conceptlink_terminology::{ConceptDescription, Language, Result as TermResult, TerminologySource};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const PREFIXES: &str = r#"
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
@prefix umls: <http://bioportal.bioontology.org/ontologies/umls/> .
@prefix ex: <http://ex/> .
@prefix tgt: <http://tgt/> .
"#;

fn turtle(name: &str, body: &str) -> OntologyGraph {
    OntologyGraph::from_turtle(name, &format!("{PREFIXES}{body}")).expect("fixture parses")
}

// ============================================================================
// Counting fakes
// ============================================================================

/// Graph wrapper that counts reads per `(subject, predicate)`.
struct CountingGraph {
    inner: OntologyGraph,
    reads: Mutex<BTreeMap<(String, String), usize>>,
}

impl CountingGraph {
    fn new(inner: OntologyGraph) -> Self {
        Self {
            inner,
            reads: Mutex::new(BTreeMap::new()),
        }
    }

    fn reads(&self, subject: &str, predicate: &str) -> usize {
        self.reads
            .lock()
            .get(&(subject.to_string(), predicate.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn count(&self, subject: &str, predicate: &str) {
        *self
            .reads
            .lock()
            .entry((subject.to_string(), predicate.to_string()))
            .or_default() += 1;
    }
}

impl GraphReader for CountingGraph {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn classes(&self) -> Vec<String> {
        self.inner.classes()
    }

    fn asserted_values(&self, subject: &str, predicate: &str) -> Vec<String> {
        self.count(subject, predicate);
        self.inner.asserted_values(subject, predicate)
    }

    fn literals(&self, subject: &str, predicate: &str) -> Vec<Literal> {
        self.count(subject, predicate);
        self.inner.literals(subject, predicate)
    }
}

#[derive(Default)]
struct CountingTerminology {
    types: BTreeMap<String, Vec<String>>,
    descriptions: Vec<(Language, ConceptDescription)>,
    codes: BTreeMap<String, Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl CountingTerminology {
    fn calls_to(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }
}

impl TerminologySource for CountingTerminology {
    fn semantic_types(&self, cui: &str) -> TermResult<Vec<String>> {
        self.calls.lock().push(format!("types {cui}"));
        Ok(self.types.get(cui).cloned().unwrap_or_default())
    }

    fn concept_descriptions(
        &self,
        language: Language,
        cuis: Option<&BTreeSet<String>>,
    ) -> TermResult<Vec<ConceptDescription>> {
        self.calls.lock().push(format!("descriptions {language}"));
        Ok(self
            .descriptions
            .iter()
            .filter(|(lang, d)| *lang == language && cuis.map_or(true, |set| set.contains(&d.cui)))
            .map(|(_, d)| d.clone())
            .collect())
    }

    fn cuis_for_code(&self, code: &str, _language: Option<Language>) -> TermResult<Vec<String>> {
        self.calls.lock().push(format!("code {code}"));
        Ok(self.codes.get(code).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    source: Arc<RwLock<OntologyGraph>>,
    source_reads: Arc<CountingGraph>,
    target: Arc<CountingGraph>,
    terminology: Arc<CountingTerminology>,
    lookups: Lookups,
}

impl Harness {
    fn new(source: &str, target: &str, mappings: &str, terminology: CountingTerminology) -> Self {
        let source_reads = Arc::new(CountingGraph::new(turtle("src", source)));
        let target = Arc::new(CountingGraph::new(turtle("tgt", target)));
        let terminology = Arc::new(terminology);
        let lookups = Lookups::new(
            source_reads.clone(),
            target.clone(),
            Arc::new(turtle("map", mappings)),
            terminology.clone(),
            CacheGateway::in_memory(),
        );
        Self {
            source: Arc::new(RwLock::new(turtle("src", source))),
            source_reads,
            target,
            terminology,
            lookups,
        }
    }

    fn enricher(&self, options: ResolutionOptions) -> Enricher {
        let resolver = EntityResolver::standard(self.lookups.clone(), options.clone());
        Enricher::new(self.source.clone(), resolver, options)
    }

    fn resolve(&self, options: ResolutionOptions) -> ResolutionReport {
        self.enricher(options).resolve().expect("resolution runs")
    }
}

fn options(workers: usize) -> ResolutionOptions {
    ResolutionOptions {
        workers,
        ..ResolutionOptions::default()
    }
}

fn outputs(dir: &Path) -> OutputPaths {
    OutputPaths::derive(dir, "src", "enriched", "ttl")
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// ============================================================================
// Write-back ordering
// ============================================================================

#[test]
fn test_enriched_file_keeps_exactly_one_demoted_label() {
    let terminology = CountingTerminology {
        codes: [("E11".to_string(), vec!["C0011849".to_string()])].into(),
        types: [("C0011849".to_string(), vec!["T047".to_string()])].into(),
        ..CountingTerminology::default()
    };
    let harness = Harness::new(
        r#"
<http://ex/cim10#E11> a owl:Class ;
    skos:prefLabel "Diabetes"@fr ;
    skos:altLabel "diabetes"@fr, "E11"@fr .
"#,
        "",
        "",
        terminology,
    );
    let dir = tempdir().unwrap();
    let outputs = outputs(dir.path());
    let mut run_options = options(2);
    run_options.add_code_to_pref_label = true;

    let summary = harness.enricher(run_options).run(&outputs).unwrap();
    assert_eq!(summary.stats.get(Stat::CuiThroughCode), 1);

    let written = OntologyGraph::load(&outputs.graph).unwrap();
    let entity = "http://ex/cim10#E11";
    assert_eq!(
        written.literals(entity, vocab::SKOS_ALT_LABEL),
        vec![Literal::tagged("Diabetes", "fr")]
    );
    assert_eq!(
        written.literals(entity, vocab::SKOS_PREF_LABEL),
        vec![Literal::tagged("E11 - Diabetes", "fr")]
    );
    assert_eq!(written.asserted_values(entity, vocab::UMLS_CUI), vec!["C0011849"]);
    assert_eq!(written.asserted_values(entity, vocab::UMLS_TUI), vec!["T047"]);
    assert_eq!(written.asserted_values(entity, vocab::SKOS_NOTATION), vec!["E11"]);
}

// ============================================================================
// Ambiguity and ranking
// ============================================================================

const FLU_SOURCE: &str = r#"
ex:flu a owl:Class ; skos:prefLabel "grippe"@fr .
"#;
const FLU_TARGET: &str = r#"
tgt:flu umls:cui "C0000002", "C0000003" .
"#;
const FLU_MAPPINGS: &str = r#"
ex:flu skos:exactMatch tgt:flu .
"#;

fn flu_terminology() -> CountingTerminology {
    CountingTerminology {
        descriptions: vec![
            (Language::French, ConceptDescription::new("C0000002", "grippe saisonnière")),
            (Language::French, ConceptDescription::new("C0000003", "diabète")),
        ],
        ..CountingTerminology::default()
    }
}

#[test]
fn test_ambiguous_set_is_kept_without_disambiguation() {
    let harness = Harness::new(FLU_SOURCE, FLU_TARGET, FLU_MAPPINGS, flu_terminology());
    let report = harness.resolve(options(2));

    assert_eq!(report.pending.cuis["http://ex/flu"], set(&["C0000002", "C0000003"]));
    assert_eq!(report.stats.get(Stat::AmbiguousCui), 1);
    assert_eq!(report.stats.get(Stat::CuiInMappings), 1);
    assert_eq!(report.pending.mappings.len(), 1);
    assert_eq!(harness.terminology.calls_to("descriptions fr"), 0);
}

#[test]
fn test_disambiguation_keeps_the_best_ranked_cui() {
    let harness = Harness::new(FLU_SOURCE, FLU_TARGET, FLU_MAPPINGS, flu_terminology());
    let mut run_options = options(2);
    run_options.disambiguate = true;
    let report = harness.resolve(run_options);

    assert_eq!(report.pending.cuis["http://ex/flu"], set(&["C0000002"]));
    assert_eq!(report.stats.get(Stat::AmbiguousCui), 1);
    assert!(report.pending.notes.contains("http://ex/flu"));
}

#[test]
fn test_source_asserted_ambiguity_with_and_without_ranking() {
    let source = r#"
ex:amb a owl:Class ; skos:prefLabel "grippe"@fr ; umls:cui "C0000002", "C0000003" .
"#;
    let dir = tempdir().unwrap();

    let kept = Harness::new(source, "", "", flu_terminology());
    let outputs = outputs(dir.path());
    let summary = kept.enricher(options(2)).run(&outputs).unwrap();
    assert_eq!(summary.stats.get(Stat::AmbiguousCui), 1);
    assert_eq!(summary.changes, 0);
    let written = OntologyGraph::load(&outputs.graph).unwrap();
    assert_eq!(
        written.asserted_values("http://ex/amb", vocab::UMLS_CUI),
        vec!["C0000002", "C0000003"]
    );

    let ranked = Harness::new(source, "", "", flu_terminology());
    let mut run_options = options(2);
    run_options.disambiguate = true;
    let report = ranked.resolve(run_options);
    assert_eq!(report.stats.get(Stat::AmbiguousCui), 1);
    assert_eq!(report.pending.cuis["http://ex/amb"], set(&["C0000002"]));
}

#[test]
fn test_best_effort_match_ranks_english_descriptions() {
    let terminology = CountingTerminology {
        descriptions: vec![
            (Language::English, ConceptDescription::new("C0021400", "influenza")),
            (Language::English, ConceptDescription::new("C0011849", "diabetes mellitus")),
            (Language::French, ConceptDescription::new("C0011849", "diabète sucré")),
        ],
        ..CountingTerminology::default()
    };
    let harness = Harness::new(
        r#"ex:lost a owl:Class ; skos:prefLabel "diabetes"@en ."#,
        "",
        "",
        terminology,
    );
    let mut run_options = options(2);
    run_options.language = Language::English;
    run_options.best_effort_match = true;
    let report = harness.resolve(run_options);

    assert_eq!(report.pending.cuis["http://ex/lost"], set(&["C0011849"]));
    assert_eq!(report.stats.get(Stat::MatchedByRanking), 1);
    assert_eq!(report.stats.get(Stat::RemainingWithoutCui), 1);
    assert_eq!(report.without_cui, vec!["http://ex/lost"]);
}

// ============================================================================
// Fallback, short-circuit and caching
// ============================================================================

#[test]
fn test_unresolved_entity_is_listed_once_for_review() {
    let harness = Harness::new(
        r#"
ex:known a owl:Class ; umls:cui "C0000001" .
ex:lost a owl:Class ; skos:prefLabel "inconnu"@fr .
"#,
        "",
        "",
        CountingTerminology::default(),
    );
    let dir = tempdir().unwrap();
    let outputs = outputs(dir.path());
    let summary = harness.enricher(options(4)).run(&outputs).unwrap();

    assert_eq!(summary.without_cui, vec!["http://ex/lost"]);
    let review = std::fs::read_to_string(outputs.review_list.as_ref().unwrap()).unwrap();
    assert_eq!(review.lines().collect::<Vec<_>>(), vec!["http://ex/lost"]);

    assert_eq!(summary.stats.get(Stat::TotalClasses), 2);
    assert_eq!(summary.stats.get(Stat::WithoutCui), 1);
    assert_eq!(summary.stats.get(Stat::RemainingWithoutCui), 1);
    assert_eq!(summary.stats.get(Stat::CuiInSource), 1);
}

#[test]
fn test_source_cui_skips_every_later_step() {
    let harness = Harness::new(
        r#"
ex:known a owl:Class ; umls:cui "C0000001" ; skos:notation "K1" ;
    skos:altLabel "C0000099" .
"#,
        r#"tgt:k umls:cui "C0000098" ; umls:tui "T999" ."#,
        r#"ex:known skos:exactMatch tgt:k ."#,
        CountingTerminology::default(),
    );
    let report = harness.resolve(options(2));

    assert!(report.pending.cuis.is_empty());
    assert_eq!(harness.source_reads.reads("http://ex/known", vocab::SKOS_ALT_LABEL), 0);
    assert_eq!(harness.target.reads("http://tgt/k", vocab::UMLS_CUI), 0);
    assert_eq!(harness.target.reads("http://tgt/k", vocab::UMLS_TUI), 0);
    assert_eq!(harness.terminology.calls_to("code K1"), 0);
    // The mapping itself is still copied into the source graph.
    assert_eq!(report.pending.mappings.len(), 1);
}

#[test]
fn test_shared_target_is_queried_once_across_workers() {
    let classes: String = (0..32)
        .map(|i| format!("ex:e{i} a owl:Class .\n"))
        .collect();
    let mappings: String = (0..32)
        .map(|i| format!("ex:e{i} skos:exactMatch tgt:shared .\n"))
        .collect();
    let terminology = CountingTerminology {
        types: [("C0000009".to_string(), vec!["T047".to_string()])].into(),
        ..CountingTerminology::default()
    };
    let harness = Harness::new(
        &classes,
        r#"tgt:shared umls:cui "C0000009" ."#,
        &mappings,
        terminology,
    );
    let report = harness.resolve(options(8));

    assert_eq!(report.pending.cuis.len(), 32);
    assert_eq!(report.pending.tuis.len(), 32);
    assert_eq!(harness.target.reads("http://tgt/shared", vocab::UMLS_CUI), 1);
    assert_eq!(harness.terminology.calls_to("types C0000009"), 1);
}

#[test]
fn test_pending_changes_do_not_depend_on_worker_count() {
    let source = r#"
ex:a a owl:Class ; skos:altLabel "C0000001" .
ex:b a owl:Class ; umls:cui "C0000002" .
ex:c a owl:Class .
ex:d a owl:Class ; skos:prefLabel "grippe"@fr .
<http://ex/cim#J11_1> a owl:Class .
"#;
    let target = r#"tgt:c umls:cui "C0000003" ; umls:tui "T184" ."#;
    let mappings = r#"ex:c skos:closeMatch tgt:c ."#;
    let terminology = || CountingTerminology {
        codes: [("J11".to_string(), vec!["C0000004".to_string()])].into(),
        types: [("C0000001".to_string(), vec!["T047".to_string()])].into(),
        ..CountingTerminology::default()
    };

    let serial = Harness::new(source, target, mappings, terminology()).resolve(options(1));
    let parallel = Harness::new(source, target, mappings, terminology()).resolve(options(8));
    assert_eq!(serial, parallel);
    assert_eq!(serial.without_cui, vec!["http://ex/d"]);
    assert_eq!(serial.pending.cuis["http://ex/cim#J11_1"], set(&["C0000004"]));
}

// ============================================================================
// Failure and replay
// ============================================================================

#[test]
fn test_failed_write_back_saves_pending_changes_for_replay() {
    let source = r#"ex:a a owl:Class ; skos:altLabel "C0000001" ."#;
    let harness = Harness::new(source, "", "", CountingTerminology::default());
    let dir = tempdir().unwrap();
    let outputs = OutputPaths {
        graph: dir.path().join("missing").join("src_enriched.ttl"),
        review_list: None,
        statistics: None,
        pending: dir.path().join("src_pending.json"),
    };

    let err = harness.enricher(options(2)).run(&outputs).unwrap_err();
    assert!(matches!(err, EnrichError::WriteBack { ref pending, .. } if pending == &outputs.pending));
    assert!(err.to_string().contains("src_pending.json"));

    let saved = PendingChangeSet::load(&outputs.pending).unwrap();
    assert_eq!(saved.cuis["http://ex/a"], set(&["C0000001"]));

    let mut fresh = turtle("src", source);
    let output = dir.path().join("src_enriched.ttl");
    let written = replay(&mut fresh, &saved, &ResolutionOptions::default(), output.clone()).unwrap();
    assert_eq!(written, output);

    let reloaded = OntologyGraph::load(&output).unwrap();
    assert_eq!(reloaded.asserted_values("http://ex/a", vocab::UMLS_CUI), vec!["C0000001"]);
    assert!(reloaded.asserted_values("http://ex/a", vocab::SKOS_ALT_LABEL).is_empty());
}
