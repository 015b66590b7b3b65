//! # testsift - Selective Test Runner Engine
//!
//! Run only the Clojure tests whose behavior could have changed.
//! testsift combines a static symbol dependency graph, content-addressed
//! fingerprints that ignore docstrings and whitespace, and a persisted
//! baseline of last-known-good hashes to pick the minimum test set.
//!
//! ## How it works
//!
//! - **analyze**: an external analyzer (clj-kondo) emits definitions,
//!   usages, and namespaces; testsift builds a symbol graph, hashes every
//!   definition's normalized source, and snapshots the result.
//! - **select**: current hashes diff against the verified baseline; tests
//!   that can reach a changed symbol (plus unselective integration tests)
//!   are selected.
//! - **mark-verified**: after a green run, the changed hashes merge into
//!   the baseline, so those symbols stop selecting tests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use testsift::{build_graph, hash, Cache, DepGraph};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = testsift::Config::load(std::path::Path::new("."));
//! let facts = testsift::analyzer::facts_from_file(std::path::Path::new("facts.json"))?;
//! let graph = build_graph(&facts, &config.test_macro_symbols());
//! let hashes = hash::hash_graph(&graph);
//!
//! let cache = Cache::for_project(std::path::Path::new("."));
//! let baseline = cache.load_baseline();
//! let dep = DepGraph::from_symbol_graph(&graph);
//! let selection = testsift::select(&graph, &dep, &hashes, None, &baseline, false);
//! for test in &selection.tests {
//!     println!("{}", test.symbol);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod depgraph;
pub mod facts;
pub mod graph;
pub mod hash;
pub mod patch;
pub mod select;
pub mod symbol;
pub mod vcs;

pub use cache::{Cache, CacheStatus, Snapshot, STATE_DIR};
pub use config::Config;
pub use depgraph::{DepGraph, ReverseIndex};
pub use facts::{Dialect, Facts};
pub use graph::{build_graph, SymbolGraph};
pub use select::{
    mark_all_verified, mark_verified, select, MarkReport, Selection, SelectionReason, VerifyScope,
};
pub use symbol::Symbol;

use std::path::{Path, PathBuf};

/// Resolve the state directory for a project.
///
/// `TESTSIFT_DIR` overrides the default project-root dotdir, which keeps two
/// working copies of one project from sharing caches when a user wants that.
pub fn resolve_state_dir(project_root: &Path) -> PathBuf {
    std::env::var_os("TESTSIFT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| project_root.join(STATE_DIR))
}

/// Render a path relative to the project root for display.
pub fn rel_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
