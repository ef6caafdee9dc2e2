//! Conceptlink CLI
//!
//! Enriches the classes of an ontology with UMLS concept identifiers (CUI)
//! and semantic types (TUI):
//! - `conceptlink enrich` resolves every class and writes the enriched graph,
//!   the review list and the statistics report
//! - `conceptlink replay` re-applies a pending change set saved by a failed run

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use conceptlink_cache::{CacheGateway, MemoryCache, RedisCache};
use conceptlink_enrich::{
    replay, CompositeCodeFinder, EntityResolver, Enricher, Lookups, OutputPaths,
    PendingChangeSet, RunSummary,
};
use conceptlink_rdf::{GraphReader, OntologyGraph};
use conceptlink_terminology::SqlTerminology;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

mod config;

use config::{AppConfig, CacheBackend, CacheConfig, Overrides};

#[derive(Parser)]
#[command(name = "conceptlink")]
#[command(
    author,
    version,
    about = "Conceptlink: UMLS concept and semantic type enrichment for ontologies"
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve CUIs and TUIs for every class and write the enriched graph.
    Enrich {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Apply a pending change set saved by a failed write-back.
    Replay {
        /// Pending change set (`<stem>_pending.json`)
        #[arg(long)]
        pending: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Enrich { overrides } => {
            config.apply(&overrides)?;
            cmd_enrich(&config)
        }
        Commands::Replay { pending, overrides } => {
            config.apply(&overrides)?;
            cmd_replay(&config, &pending)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// enrich
// ============================================================================

fn cmd_enrich(config: &AppConfig) -> Result<()> {
    config.validate_for_enrich()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let handle = runtime.handle().clone();

    let source = load_graph(config.source()?)?;
    let target = load_graph(config.target()?)?;
    let mappings = load_graph(config.mappings()?)?;
    let stem = source.name();
    let extension = source.format().output_extension();
    let source = Arc::new(RwLock::new(source));

    let terminology = Arc::new(
        SqlTerminology::connect(
            config.terminology_url()?,
            config.terminology.max_connections,
            handle.clone(),
        )
        .context("failed to open terminology database")?,
    );
    let cache = open_cache(&config.cache, handle)?;

    let lookups = Lookups::new(
        source.clone(),
        Arc::new(target),
        Arc::new(mappings),
        terminology.clone(),
        cache,
    );
    let options = config.resolution.clone();
    let resolver = if config.codes.properties.is_empty() {
        EntityResolver::standard(lookups, options.clone())
    } else {
        let properties: Vec<&str> = config.codes.properties.iter().map(String::as_str).collect();
        let codes = Arc::new(CompositeCodeFinder::with_properties(&lookups.source, &properties));
        EntityResolver::new(lookups, codes, options.clone())
    };

    let output_dir = &config.graphs.output_dir;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let mut outputs =
        OutputPaths::derive(output_dir, &stem, &config.graphs.output_suffix, extension);
    if !config.output.review_list {
        outputs.review_list = None;
    }
    if !config.output.statistics {
        outputs.statistics = None;
    }

    println!(
        "{} {} ({} workers)",
        "Enriching".green().bold(),
        stem,
        options.worker_count()
    );
    let mut enricher = Enricher::new(source, resolver, options);
    let result = enricher.run(&outputs);
    terminology.close();

    print_summary(&result?, &outputs);
    Ok(())
}

fn open_cache(config: &CacheConfig, handle: Handle) -> Result<CacheGateway> {
    match config.backend {
        CacheBackend::Memory => Ok(CacheGateway::new(Arc::new(MemoryCache::new()))),
        CacheBackend::Redis => {
            let url = config.url.as_deref().unwrap_or_default();
            let store = RedisCache::connect(url, handle).context("failed to open Redis cache")?;
            Ok(CacheGateway::new(Arc::new(store)))
        }
    }
}

fn print_summary(summary: &RunSummary, outputs: &OutputPaths) {
    println!(
        "{} {}",
        "wrote".green().bold(),
        summary.output.display().to_string().bold()
    );
    for path in [&outputs.review_list, &outputs.statistics].into_iter().flatten() {
        println!("{} {}", "wrote".green().bold(), path.display());
    }
    println!("  {} changes applied", summary.changes);
    for (name, count) in summary.stats.rows() {
        println!("  {name:<40} {count}");
    }
    if !summary.without_cui.is_empty() {
        println!(
            "{} {} classes listed for review",
            "info:".yellow().bold(),
            summary.without_cui.len()
        );
    }
}

// ============================================================================
// replay
// ============================================================================

fn cmd_replay(config: &AppConfig, pending: &Path) -> Result<()> {
    config.validate()?;
    let mut source = load_graph(config.source()?)?;
    let changes = PendingChangeSet::load(pending)?;

    let output_dir = &config.graphs.output_dir;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let output = source.derived_output_path(output_dir, &config.graphs.output_suffix);

    println!(
        "{} {} changes from {}",
        "Replaying".green().bold(),
        changes.change_count(),
        pending.display()
    );
    let written = replay(&mut source, &changes, &config.resolution, output)?;
    println!("{} {}", "wrote".green().bold(), written.display().to_string().bold());
    Ok(())
}

fn load_graph(path: &Path) -> Result<OntologyGraph> {
    OntologyGraph::load(path).with_context(|| format!("failed to load {}", path.display()))
}
