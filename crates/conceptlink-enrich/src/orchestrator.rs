//! Run driver: concurrent resolution, then single-threaded commit.
//!
//! ```text
//!   Idle ──resolve()──► Resolving ──commit()──► Committing ──► Done
//! ```

use crate::code::{CodeFinder, CompositeCodeFinder};
use crate::cui::{CuiResolution, CuiResolver};
use crate::lookup::Lookups;
use crate::options::ResolutionOptions;
use crate::pending::PendingChangeSet;
use crate::ranker::TverskyRanker;
use crate::stats::{Stat, StatsSnapshot};
use crate::tui::{TuiResolution, TuiResolver};
use crate::writeback;
use crate::{EnrichError, Result};
use conceptlink_rdf::{GraphReader, OntologyGraph};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Resolving,
    Committing,
    Done,
}

/// Everything resolution found out about one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityOutcome {
    pub entity: String,
    pub cui: CuiResolution,
    pub tui: TuiResolution,
}

impl EntityOutcome {
    /// Statistics events of this entity, including its contribution to the class total.
    pub fn events(&self) -> BTreeSet<Stat> {
        let mut events: BTreeSet<Stat> = self.cui.events.union(&self.tui.events).copied().collect();
        events.insert(Stat::TotalClasses);
        events
    }
}

/// Per-entity resolution: CUIs first, then TUIs from the result.
pub struct EntityResolver {
    cui: CuiResolver,
    tui: TuiResolver,
}

impl EntityResolver {
    pub fn new(lookups: Lookups, codes: Arc<dyn CodeFinder>, options: ResolutionOptions) -> Self {
        Self {
            cui: CuiResolver::new(lookups.clone(), codes, TverskyRanker::default(), options),
            tui: TuiResolver::new(lookups),
        }
    }

    /// Resolver with the standard code finder over the source graph.
    pub fn standard(lookups: Lookups, options: ResolutionOptions) -> Self {
        let codes = Arc::new(CompositeCodeFinder::standard(&lookups.source));
        Self::new(lookups, codes, options)
    }

    pub fn resolve(&self, entity: &str) -> EntityOutcome {
        let cui = self.cui.resolve(entity);
        let tui = self.tui.resolve(entity, &cui.cuis, &cui.mappings);
        EntityOutcome {
            entity: entity.to_string(),
            cui,
            tui,
        }
    }
}

/// Where a run writes its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub graph: PathBuf,
    pub review_list: Option<PathBuf>,
    pub statistics: Option<PathBuf>,
    /// Written only when persisting the graph fails.
    pub pending: PathBuf,
}

impl OutputPaths {
    /// Conventional names under `dir` for an ontology named `stem`.
    pub fn derive(dir: &Path, stem: &str, suffix: &str, extension: &str) -> Self {
        Self {
            graph: dir.join(format!("{stem}_{suffix}.{extension}")),
            review_list: Some(dir.join(format!("{stem}_concepts_without_cui.txt"))),
            statistics: Some(dir.join(format!("{stem}_statistics.json"))),
            pending: dir.join(format!("{stem}_pending.json")),
        }
    }
}

/// Result of the resolution phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionReport {
    pub pending: PendingChangeSet,
    pub stats: StatsSnapshot,
    /// Entities the cascade found no CUI for, in class order. A best-effort
    /// match does not take an entity off this list.
    pub without_cui: Vec<String>,
}

impl ResolutionReport {
    /// Merge per-entity outcomes in the order given.
    pub fn aggregate(outcomes: &[EntityOutcome]) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            report.pending.merge(outcome);
            let events = outcome.events();
            report.stats.record(&events);
            if events.contains(&Stat::RemainingWithoutCui) {
                report.without_cui.push(outcome.entity.clone());
            }
        }
        report
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub stats: StatsSnapshot,
    pub without_cui: Vec<String>,
    pub changes: usize,
}

pub struct Enricher {
    source: Arc<RwLock<OntologyGraph>>,
    resolver: EntityResolver,
    options: ResolutionOptions,
    state: RunState,
}

impl Enricher {
    pub fn new(
        source: Arc<RwLock<OntologyGraph>>,
        resolver: EntityResolver,
        options: ResolutionOptions,
    ) -> Self {
        Self {
            source,
            resolver,
            options,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Resolve every class of the source graph on a bounded worker pool.
    pub fn resolve(&mut self) -> Result<ResolutionReport> {
        self.expect_state(RunState::Idle, "resolve")?;
        self.state = RunState::Resolving;

        let classes = self.source.classes();
        let workers = self.options.worker_count();
        tracing::info!(classes = classes.len(), workers, "resolving classes");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("conceptlink-worker-{i}"))
            .build()?;
        let resolver = &self.resolver;
        let outcomes: Vec<EntityOutcome> = pool.install(|| {
            classes
                .par_iter()
                .map(|entity| resolver.resolve(entity))
                .collect()
        });

        let report = ResolutionReport::aggregate(&outcomes);
        tracing::info!(
            classes = outcomes.len(),
            changes = report.pending.change_count(),
            without_cui = report.without_cui.len(),
            "resolution done"
        );
        Ok(report)
    }

    /// Apply the resolved changes, persist, and write the run artifacts.
    ///
    /// If persisting fails the pending changes are saved to
    /// [`OutputPaths::pending`] and the error names that file.
    pub fn commit(&mut self, report: &ResolutionReport, outputs: &OutputPaths) -> Result<RunSummary> {
        self.expect_state(RunState::Resolving, "commit")?;
        self.state = RunState::Committing;
        tracing::info!(changes = report.pending.change_count(), "committing changes");

        let committed = {
            let mut graph = self.source.write();
            graph.set_output(outputs.graph.clone());
            writeback::commit(&mut *graph, &report.pending, &self.options)
        };
        let output = match committed {
            Ok(path) => path,
            Err(source) => {
                tracing::error!(error = %source, "write-back failed");
                report.pending.save(&outputs.pending)?;
                return Err(EnrichError::WriteBack {
                    pending: outputs.pending.clone(),
                    source,
                });
            }
        };

        if let Some(path) = &outputs.review_list {
            write_review_list(path, &report.without_cui)?;
        }
        if let Some(path) = &outputs.statistics {
            report.stats.write_json(path)?;
        }
        report.stats.log_summary();

        self.state = RunState::Done;
        Ok(RunSummary {
            output,
            stats: report.stats.clone(),
            without_cui: report.without_cui.clone(),
            changes: report.pending.change_count(),
        })
    }

    pub fn run(&mut self, outputs: &OutputPaths) -> Result<RunSummary> {
        let report = self.resolve()?;
        self.commit(&report, outputs)
    }

    fn expect_state(&self, expected: RunState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EnrichError::InvalidState {
                action,
                state: self.state,
            })
        }
    }
}

/// Re-run the commit stages of a saved change set against a freshly loaded graph.
pub fn replay(
    graph: &mut OntologyGraph,
    pending: &PendingChangeSet,
    options: &ResolutionOptions,
    output: PathBuf,
) -> Result<PathBuf> {
    tracing::info!(changes = pending.change_count(), "replaying pending changes");
    graph.set_output(output);
    Ok(writeback::commit(graph, pending, options)?)
}

fn write_review_list(path: &Path, entities: &[String]) -> Result<()> {
    let io_err = |source: std::io::Error| EnrichError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut out = std::io::BufWriter::new(file);
    for entity in entities {
        writeln!(out, "{entity}").map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    tracing::info!(path = %path.display(), entities = entities.len(), "wrote review list");
    Ok(())
}
