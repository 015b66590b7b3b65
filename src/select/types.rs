//! Data types for test selection results.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::depgraph::DepGraph;
use crate::graph::SymbolGraph;
use crate::symbol::Symbol;

/// Why a test made it into the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionReason {
    /// No verified baseline exists; everything runs.
    NoBaseline,
    /// The caller asked for all tests.
    AllRequested,
    /// A changed symbol is reachable from this test.
    Dependency,
    /// One of the test's declared targets changed.
    Target,
    /// Unselective integration test; runs on any change.
    Integration,
    /// The test's own definition changed.
    SelfChanged,
}

impl std::fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SelectionReason::NoBaseline => "no baseline",
            SelectionReason::AllRequested => "all tests requested",
            SelectionReason::Dependency => "dependency changed",
            SelectionReason::Target => "target changed",
            SelectionReason::Integration => "integration (unselective)",
            SelectionReason::SelfChanged => "test changed",
        };
        f.write_str(s)
    }
}

/// A selected test with display-ready location.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SelectedTest {
    pub symbol: Symbol,
    pub file: PathBuf,
    pub line: Option<u32>,
    pub reason: SelectionReason,
}

/// Summary counts for a selection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SelectionStats {
    pub total_tests: usize,
    pub selected_tests: usize,
    pub changed_symbols: usize,
    pub untested_usages: usize,
    /// Selected tests as a percentage of all tests.
    pub selection_rate: f32,
}

/// Witness paths: selected test → (changed symbol → path between them).
pub type TraceMap = BTreeMap<Symbol, BTreeMap<Symbol, Vec<Symbol>>>;

/// The result of a selection run.
///
/// Owns its derived collections; borrows the graph it was computed from.
/// The trace is expensive and rarely consumed, so it materializes on first
/// access only.
pub struct Selection<'a> {
    /// Selected tests, ordered by symbol.
    pub tests: Vec<SelectedTest>,
    pub changed_symbols: BTreeSet<Symbol>,
    /// Current hashes of the changed symbols, for baseline updates.
    pub changed_hashes: BTreeMap<Symbol, String>,
    /// Changed symbol → direct users with no test coverage at all.
    pub untested_usages: BTreeMap<Symbol, BTreeSet<Symbol>>,
    pub stats: SelectionStats,
    pub(crate) graph: &'a SymbolGraph,
    pub(crate) dep: &'a DepGraph,
    pub(crate) trace_cell: OnceLock<TraceMap>,
}

impl<'a> Selection<'a> {
    pub fn graph(&self) -> &SymbolGraph {
        self.graph
    }

    /// Whether a given test was selected.
    pub fn is_selected(&self, symbol: &Symbol) -> bool {
        self.tests.iter().any(|t| &t.symbol == symbol)
    }

    /// Witness paths from each selected test to the changed symbols it
    /// reaches. Computed on first call, cached after.
    pub fn trace(&self) -> &TraceMap {
        self.trace_cell.get_or_init(|| {
            let _span = tracing::info_span!("selection_trace", tests = self.tests.len()).entered();
            let mut map = TraceMap::new();
            for test in &self.tests {
                let reach = self.dep.reachable(&test.symbol);
                let mut paths = BTreeMap::new();
                for changed in self.changed_symbols.intersection(&reach) {
                    if let Some(path) = self.dep.witness_path(&test.symbol, changed) {
                        paths.insert(changed.clone(), path);
                    }
                }
                if !paths.is_empty() {
                    map.insert(test.symbol.clone(), paths);
                }
            }
            map
        })
    }
}
