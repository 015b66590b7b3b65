//! CLI command handlers
//!
//! Each submodule handles one CLI subcommand.

mod analyze;
mod clear;
mod mark;
mod select;
mod status;
mod why;

pub(crate) use analyze::cmd_analyze;
pub(crate) use clear::cmd_clear;
pub(crate) use mark::{cmd_mark_all_verified, cmd_mark_verified};
pub(crate) use select::cmd_select;
pub(crate) use status::cmd_status;
pub(crate) use why::cmd_why;

use anyhow::{Context, Result};

use testsift::{Cache, Config, DepGraph, Selection, Snapshot};

/// A snapshot plus its dependency graph, ready to compute selections.
pub(crate) struct LoadedState {
    pub snapshot: Snapshot,
    pub dep: DepGraph,
}

impl LoadedState {
    pub(crate) fn select<'a>(&'a self, cache: &Cache, all_tests: bool) -> Selection<'a> {
        let baseline = cache.load_baseline();
        testsift::select(
            &self.snapshot.graph,
            &self.dep,
            &self.snapshot.content_hashes,
            self.snapshot.reverse_index.as_ref(),
            &baseline,
            all_tests,
        )
    }
}

/// Load the snapshot, analyzing first when it is missing.
///
/// A missing snapshot is recoverable (analyze as part of select); a missing
/// analyzer is not, and surfaces with guidance.
pub(crate) fn load_state(config: &Config, cache: &Cache, quiet: bool) -> Result<LoadedState> {
    let snapshot = match cache.load_snapshot() {
        Some(snapshot) => snapshot,
        None => {
            tracing::info!("No analysis snapshot; running a fresh analyze");
            analyze::full_analyze(&config.source_paths(), None, config, cache, quiet)
                .context("No analysis snapshot and the analyzer could not produce one. Run `testsift analyze` (or `testsift analyze --facts FILE`) first")?;
            cache
                .load_snapshot()
                .context("Analyze completed but produced no snapshot")?
        }
    };
    let dep = DepGraph::from_symbol_graph(&snapshot.graph);
    Ok(LoadedState { snapshot, dep })
}
