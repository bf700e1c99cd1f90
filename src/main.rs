use clap::Parser;
use docsearch_index::cli::{Cli, Commands};
use docsearch_index::script::{self, LoadDiagnostics};
use docsearch_index::{Config, Encoding, FinalizedRegistry, SearchRegistry, snapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    docsearch_index::tracing::init(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Inspect { sources, snapshot } => {
            let snapshot_path = snapshot.or_else(|| config.snapshot.path.clone());
            inspect(&config, &sources.paths, snapshot_path.as_deref())
        }
        Commands::Dump { sources, expanded } => {
            let (registry, diagnostics) = load(&config, &sources.paths)?;
            let encoding = if expanded {
                Encoding::Expanded
            } else {
                Encoding::Compact
            };
            print!("{}", script::render_script(&registry, encoding));
            for failure in &diagnostics.failures {
                eprintln!("✗ {}", failure);
            }
            Ok(())
        }
    }
}

fn inspect(config: &Config, sources: &[PathBuf], snapshot_path: Option<&Path>) -> anyhow::Result<()> {
    let Some(snapshot_path) = snapshot_path else {
        let (registry, diagnostics) = load(config, sources)?;
        report(&registry, &diagnostics);
        return Ok(());
    };

    let scripts = script::resolve_sources(sources);
    let fingerprint = snapshot::fingerprint_sources(&scripts, &config.decode)?;
    if let Some(cached) = snapshot::load(snapshot_path, fingerprint) {
        report(&cached.registry, &cached.diagnostics);
        return Ok(());
    }

    let (registry, diagnostics) = load(config, sources)?;
    snapshot::store(snapshot_path, &registry, &diagnostics, fingerprint)?;
    report(&registry, &diagnostics);
    Ok(())
}

/// Loads every script. A script that cannot be read is reported and skipped.
fn load(config: &Config, sources: &[PathBuf]) -> anyhow::Result<(Arc<FinalizedRegistry>, LoadDiagnostics)> {
    let scripts = script::resolve_sources(sources);
    if scripts.is_empty() {
        anyhow::bail!("No search-index scripts to load");
    }

    let registry = SearchRegistry::new(config.decode);
    let mut summaries = Vec::with_capacity(scripts.len());
    let mut errors = Vec::new();
    for path in &scripts {
        match script::load_script(&registry, path) {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                tracing::warn!("{}", e);
                errors.push(e);
            }
        }
    }

    Ok((registry.finalize(), LoadDiagnostics::collect(&summaries, &errors)))
}

fn report(registry: &FinalizedRegistry, diagnostics: &LoadDiagnostics) {
    print!("{}", registry.describe());
    for failure in &diagnostics.failures {
        println!("  ✗ {}", failure);
    }
    for path in &diagnostics.missing_init {
        println!("  ! {} never calls initSearch", path.display());
    }
}
