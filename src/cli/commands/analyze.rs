//! Analyze command — build the symbol graph and overwrite the snapshot.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;

use testsift::graph::SymbolGraph;
use testsift::{analyzer, build_graph, patch, vcs, Cache, Config, DepGraph, Dialect, Snapshot};

pub(crate) fn cmd_analyze(
    paths: &[PathBuf],
    facts_file: Option<&Path>,
    incremental: bool,
    config: &Config,
    cache: &Cache,
    root: &Path,
    quiet: bool,
) -> Result<()> {
    let _span = tracing::info_span!("cmd_analyze", incremental).entered();
    if incremental {
        return incremental_analyze(config, cache, root, quiet);
    }
    let paths = if paths.is_empty() {
        config.source_paths()
    } else {
        paths.to_vec()
    };
    full_analyze(&paths, facts_file, config, cache, quiet)
}

/// Full reanalyze: run the analyzer (or read a facts file), rebuild the
/// graph and hashes, and overwrite the snapshot. Never touches the baseline.
pub(crate) fn full_analyze(
    paths: &[PathBuf],
    facts_file: Option<&Path>,
    config: &Config,
    cache: &Cache,
    quiet: bool,
) -> Result<()> {
    let mut facts = match facts_file {
        Some(file) => analyzer::facts_from_file(file)
            .with_context(|| format!("Failed to load facts from {}", file.display()))?,
        None => analyzer::run_analyzer(config.analyzer_command.as_deref(), paths)
            .context("Analyzer failed; snapshot left untouched")?,
    };
    facts.retain_dialect(Dialect::Clj);

    let graph = build_graph(&facts, &config.test_macro_symbols());
    let content_hashes = testsift::hash::hash_graph(&graph);
    let dep = DepGraph::from_symbol_graph(&graph);
    let reverse_index = dep.reverse_index();

    let snapshot = Snapshot {
        analyzed_at: chrono::Utc::now().to_rfc3339(),
        paths: paths.to_vec(),
        graph,
        content_hashes,
        reverse_index: Some(reverse_index),
    };
    cache.save_snapshot(&snapshot)?;

    if !quiet {
        print_summary(&snapshot);
    }
    Ok(())
}

/// Patch the existing snapshot from git's uncommitted files: re-analyze the
/// modified files only, evict symbols from deleted ones, rehash.
fn incremental_analyze(config: &Config, cache: &Cache, root: &Path, quiet: bool) -> Result<()> {
    let Some(mut snapshot) = cache.load_snapshot() else {
        bail!("No analysis snapshot to patch. Run `testsift analyze` first");
    };

    let changes = vcs::uncommitted_files(root)?;
    if changes.is_empty() {
        if !quiet {
            println!("{}", "Working copy clean; snapshot unchanged.".dimmed());
        }
        return Ok(());
    }

    let subgraph = if changes.modified.is_empty() {
        SymbolGraph::default()
    } else {
        let modified: Vec<PathBuf> = changes.modified.iter().cloned().collect();
        let mut facts = analyzer::run_analyzer(config.analyzer_command.as_deref(), &modified)
            .context("Analyzer failed; snapshot left untouched")?;
        facts.retain_dialect(Dialect::Clj);
        build_graph(&facts, &config.test_macro_symbols())
    };

    let modified: BTreeSet<PathBuf> = changes.modified;
    patch::update_snapshot(&mut snapshot, subgraph, &modified, &changes.deleted);
    snapshot.analyzed_at = chrono::Utc::now().to_rfc3339();
    cache.save_snapshot(&snapshot)?;

    if !quiet {
        println!(
            "Patched {} modified, {} deleted file(s).",
            modified.len(),
            changes.deleted.len()
        );
        print_summary(&snapshot);
    }
    Ok(())
}

fn print_summary(snapshot: &Snapshot) {
    let tests = snapshot.graph.test_symbols().count();
    println!(
        "{} {} symbols, {} edges, {} tests across {} files.",
        "Analyzed:".bold(),
        snapshot.graph.nodes.len(),
        snapshot.graph.edges.len(),
        tests,
        snapshot.graph.files.len()
    );
}
