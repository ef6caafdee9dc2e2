//! Ordered write-back of a [`PendingChangeSet`] into the source graph.
//!
//! The stage order is load-bearing. The duplicate-label sweep compares
//! alternate labels with the preferred label, and the code stage rewrites
//! the preferred label and demotes its old text to an alternate label; run
//! the other way round, the demoted label and the original duplicate both
//! survive.

use crate::options::ResolutionOptions;
use crate::pending::PendingChangeSet;
use conceptlink_rdf::{vocab, GraphStore, Literal};
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    /// New `umls:cui` literals and provenance notes.
    Concepts,
    /// CUI-shaped alternate labels that the new CUIs replace.
    AltLabelPurge,
    /// New `umls:tui` literals and their `umls:hasSTY` class references.
    SemanticTypes,
    /// Mapping statements copied into the source graph.
    Mappings,
    /// Alternate labels identical to the preferred label.
    DuplicateAltLabels,
    /// `skos:notation` and the code-prefixed preferred label.
    Codes,
}

impl CommitStage {
    /// Graph edits in commit order; persisting the graph follows the last one.
    pub const ORDER: [CommitStage; 6] = [
        CommitStage::Concepts,
        CommitStage::AltLabelPurge,
        CommitStage::SemanticTypes,
        CommitStage::Mappings,
        CommitStage::DuplicateAltLabels,
        CommitStage::Codes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CommitStage::Concepts => "concepts",
            CommitStage::AltLabelPurge => "alt-label purge",
            CommitStage::SemanticTypes => "semantic types",
            CommitStage::Mappings => "mappings",
            CommitStage::DuplicateAltLabels => "duplicate alt labels",
            CommitStage::Codes => "codes",
        }
    }
}

/// Apply every stage in order, then persist. Returns where the graph was written.
pub fn commit(
    graph: &mut dyn GraphStore,
    pending: &PendingChangeSet,
    options: &ResolutionOptions,
) -> conceptlink_rdf::Result<PathBuf> {
    for (i, stage) in CommitStage::ORDER.into_iter().enumerate() {
        let changed = apply_stage(stage, graph, pending, options);
        tracing::info!(stage = i + 1, name = stage.name(), changed, "commit stage done");
    }
    let path = graph.persist()?;
    tracing::info!(stage = CommitStage::ORDER.len() + 1, name = "persist", path = %path.display(), "commit stage done");
    Ok(path)
}

/// Apply one stage; returns the number of statements added or removed.
pub fn apply_stage(
    stage: CommitStage,
    graph: &mut dyn GraphStore,
    pending: &PendingChangeSet,
    options: &ResolutionOptions,
) -> usize {
    match stage {
        CommitStage::Concepts => write_concepts(graph, pending, options),
        CommitStage::AltLabelPurge => purge_concept_alt_labels(graph, pending),
        CommitStage::SemanticTypes => write_semantic_types(graph, pending, options),
        CommitStage::Mappings => write_mappings(graph, pending),
        CommitStage::DuplicateAltLabels => remove_duplicate_alt_labels(graph),
        CommitStage::Codes => write_codes(graph, pending, options),
    }
}

fn write_concepts(
    graph: &mut dyn GraphStore,
    pending: &PendingChangeSet,
    options: &ResolutionOptions,
) -> usize {
    let mut changed = 0;
    for (entity, cuis) in &pending.cuis {
        for cui in cuis {
            graph.add_literal(entity, vocab::UMLS_CUI, cui, None);
            changed += 1;
        }
    }
    for entity in &pending.notes {
        graph.add_literal(
            entity,
            vocab::SKOS_CHANGE_NOTE,
            &options.provenance_note,
            Some(options.note_language.iso_code()),
        );
        changed += 1;
    }
    changed
}

fn purge_concept_alt_labels(graph: &mut dyn GraphStore, pending: &PendingChangeSet) -> usize {
    pending
        .alt_label_purges
        .iter()
        .map(|(entity, cuis)| {
            remove_alt_labels_where(graph, entity, |lit| cuis.contains(lit.lexical.trim()))
        })
        .sum()
}

fn write_semantic_types(
    graph: &mut dyn GraphStore,
    pending: &PendingChangeSet,
    options: &ResolutionOptions,
) -> usize {
    let mut changed = 0;
    for (entity, tuis) in &pending.tuis {
        for tui in tuis {
            graph.add_literal(entity, vocab::UMLS_TUI, tui, None);
            graph.add_statement(entity, vocab::UMLS_HAS_STY, &options.semantic_type_iri(tui));
            changed += 2;
        }
    }
    changed
}

fn write_mappings(graph: &mut dyn GraphStore, pending: &PendingChangeSet) -> usize {
    for mapping in &pending.mappings {
        graph.add_statement(&mapping.source, &mapping.property, &mapping.target);
    }
    pending.mappings.len()
}

fn remove_duplicate_alt_labels(graph: &mut dyn GraphStore) -> usize {
    let mut changed = 0;
    for entity in graph.classes() {
        let preferred: BTreeSet<String> = graph
            .literals(&entity, vocab::SKOS_PREF_LABEL)
            .iter()
            .map(|lit| normalize(&lit.lexical))
            .collect();
        if preferred.is_empty() {
            continue;
        }
        changed += remove_alt_labels_where(graph, &entity, |lit| {
            preferred.contains(&normalize(&lit.lexical))
        });
    }
    changed
}

fn write_codes(
    graph: &mut dyn GraphStore,
    pending: &PendingChangeSet,
    options: &ResolutionOptions,
) -> usize {
    let mut changed = 0;
    for (entity, code) in &pending.codes {
        changed += remove_alt_labels_where(graph, entity, |lit| lit.lexical.trim() == code);

        if graph.asserted_values(entity, vocab::SKOS_NOTATION).is_empty() {
            graph.add_literal(entity, vocab::SKOS_NOTATION, code, None);
            changed += 1;
        }

        if options.add_code_to_pref_label {
            changed += prefix_pref_label(graph, entity, code, options);
        }
    }
    changed
}

/// Rewrite the preferred label as `"<code> - <label>"` and keep the old text
/// as an alternate label in the same language.
fn prefix_pref_label(
    graph: &mut dyn GraphStore,
    entity: &str,
    code: &str,
    options: &ResolutionOptions,
) -> usize {
    let labels = graph.literals(entity, vocab::SKOS_PREF_LABEL);
    let wanted = options.language.iso_code();
    let Some(label) = labels
        .iter()
        .find(|lit| {
            lit.language
                .as_deref()
                .is_some_and(|lang| lang.eq_ignore_ascii_case(wanted))
        })
        .or_else(|| labels.first())
        .cloned()
    else {
        return 0;
    };

    let prefix = format!("{code} - ");
    if label.lexical.starts_with(&prefix) {
        return 0;
    }

    let language = label.language.as_deref();
    graph.remove_literal(entity, vocab::SKOS_PREF_LABEL, &label.lexical, language);
    graph.add_literal(
        entity,
        vocab::SKOS_PREF_LABEL,
        &format!("{prefix}{}", label.lexical),
        language,
    );
    graph.add_literal(entity, vocab::SKOS_ALT_LABEL, &label.lexical, language);
    3
}

fn remove_alt_labels_where(
    graph: &mut dyn GraphStore,
    entity: &str,
    matches: impl Fn(&Literal) -> bool,
) -> usize {
    let doomed: Vec<Literal> = graph
        .literals(entity, vocab::SKOS_ALT_LABEL)
        .into_iter()
        .filter(|lit| matches(lit))
        .collect();
    doomed
        .iter()
        .map(|lit| {
            graph.remove_literal(
                entity,
                vocab::SKOS_ALT_LABEL,
                &lit.lexical,
                lit.language.as_deref(),
            )
        })
        .sum()
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
