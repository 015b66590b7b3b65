//! Test selection — diff current hashes against the verified baseline and
//! compute the tests that could have changed behavior.

mod types;

pub use types::{SelectedTest, Selection, SelectionReason, SelectionStats, TraceMap};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use anyhow::Result;

use crate::cache::Cache;
use crate::depgraph::{DepGraph, ReverseIndex};
use crate::graph::{NodeKind, SymbolGraph, SymbolNode};
use crate::symbol::Symbol;

/// Which tests a successful run covered, for `mark_verified`.
#[derive(Debug, Clone)]
pub enum VerifyScope {
    /// The whole selection ran; verify every changed symbol.
    All,
    /// Only these tests ran; verify what they reach.
    Tests(Vec<Symbol>),
}

/// What `mark_verified` recorded.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MarkReport {
    pub verified: BTreeSet<Symbol>,
    /// Changed symbols not covered by any of the tests that ran; they stay
    /// unverified and will select again next time.
    pub skipped: BTreeSet<Symbol>,
}

/// Compute the selection for the current state against the baseline.
///
/// `reverse_index` is the precomputed index from the analysis snapshot when
/// available; without it the selector falls back to per-test reachability.
pub fn select<'a>(
    graph: &'a SymbolGraph,
    dep: &'a DepGraph,
    current_hashes: &BTreeMap<Symbol, String>,
    reverse_index: Option<&ReverseIndex>,
    baseline: &BTreeMap<Symbol, String>,
    all_tests: bool,
) -> Selection<'a> {
    let _span = tracing::info_span!(
        "select",
        symbols = current_hashes.len(),
        baseline = baseline.len(),
        all_tests
    )
    .entered();

    // Change detection runs in every mode so changed_hashes is always ready
    // for mark_verified. A symbol is changed when the baseline has no entry
    // or a different hash; baseline entries for deleted symbols are ignored.
    let mut changed_symbols = BTreeSet::new();
    let mut changed_hashes = BTreeMap::new();
    for (symbol, hash) in current_hashes {
        if baseline.get(symbol) != Some(hash) {
            changed_symbols.insert(symbol.clone());
            changed_hashes.insert(symbol.clone(), hash.clone());
        }
    }

    let test_nodes: Vec<&SymbolNode> = graph.test_symbols().collect();
    let total_tests = test_nodes.len();

    // Fast paths: everything runs, nothing to explain
    if all_tests || baseline.is_empty() {
        let reason = if all_tests {
            SelectionReason::AllRequested
        } else {
            SelectionReason::NoBaseline
        };
        let tests: Vec<SelectedTest> = test_nodes.iter().map(|&n| selected(n, reason)).collect();
        tracing::info!(tests = tests.len(), %reason, "Selected all tests");
        return finish(graph, dep, tests, changed_symbols, changed_hashes, BTreeMap::new(), total_tests);
    }

    if changed_symbols.is_empty() {
        tracing::info!("No symbols changed; nothing to run");
        return finish(graph, dep, Vec::new(), changed_symbols, changed_hashes, BTreeMap::new(), total_tests);
    }

    // Classify tests: targeted / unselective integration / regular
    let mut regular: BTreeSet<&Symbol> = BTreeSet::new();
    let mut reasons: BTreeMap<&Symbol, SelectionReason> = BTreeMap::new();
    for node in &test_nodes {
        if let Some(targets) = &node.metadata.test_targets {
            if !targets.is_disjoint(&changed_symbols) {
                reasons.insert(&node.symbol, SelectionReason::Target);
            }
        } else if node.metadata.is_integration {
            reasons.insert(&node.symbol, SelectionReason::Integration);
        } else {
            regular.insert(&node.symbol);
        }
    }

    // Regular tests: reverse-reachability from the changed set. A test's own
    // change selects it even when the reverse index (which excludes self)
    // says nothing about it.
    let fallback_reach: Option<BTreeMap<&Symbol, BTreeSet<Symbol>>> = match reverse_index {
        Some(rev) => {
            // The reason is decided per test, not by which changed symbol
            // reaches it first: a test whose own body changed is always
            // `SelfChanged`, even when another changed symbol also selects it
            let regular_reason = |sym: &Symbol| {
                if changed_symbols.contains(sym) {
                    SelectionReason::SelfChanged
                } else {
                    SelectionReason::Dependency
                }
            };
            for changed in &changed_symbols {
                if let Some(ancestors) = rev.get(changed) {
                    for ancestor in ancestors {
                        if let Some(&sym) = regular.get(ancestor) {
                            reasons.entry(sym).or_insert_with(|| regular_reason(sym));
                        }
                    }
                }
                if let Some(&sym) = regular.get(changed) {
                    reasons.entry(sym).or_insert(SelectionReason::SelfChanged);
                }
            }
            None
        }
        None => {
            let reach: BTreeMap<&Symbol, BTreeSet<Symbol>> = test_nodes
                .iter()
                .map(|n| (&n.symbol, dep.reachable(&n.symbol)))
                .collect();
            for &sym in &regular {
                if !reach[sym].is_disjoint(&changed_symbols) {
                    let reason = if changed_symbols.contains(sym) {
                        SelectionReason::SelfChanged
                    } else {
                        SelectionReason::Dependency
                    };
                    reasons.entry(sym).or_insert(reason);
                }
            }
            Some(reach)
        }
    };

    let untested_usages = untested_usages(
        graph,
        &changed_symbols,
        &test_nodes,
        reverse_index,
        fallback_reach.as_ref(),
    );

    let tests: Vec<SelectedTest> = test_nodes
        .iter()
        .filter_map(|&n| reasons.get(&n.symbol).map(|&r| selected(n, r)))
        .collect();

    tracing::info!(
        selected = tests.len(),
        total = total_tests,
        changed = changed_symbols.len(),
        "Selection complete"
    );
    finish(graph, dep, tests, changed_symbols, changed_hashes, untested_usages, total_tests)
}

/// Direct users of changed symbols that no test reaches — coverage gaps
/// worth surfacing alongside the selection.
fn untested_usages(
    graph: &SymbolGraph,
    changed: &BTreeSet<Symbol>,
    test_nodes: &[&SymbolNode],
    reverse_index: Option<&ReverseIndex>,
    fallback_reach: Option<&BTreeMap<&Symbol, BTreeSet<Symbol>>>,
) -> BTreeMap<Symbol, BTreeSet<Symbol>> {
    let preds_index = graph.direct_predecessors();
    let test_set: BTreeSet<&Symbol> = test_nodes.iter().map(|n| &n.symbol).collect();

    let reached_by_a_test = |pred: &Symbol| -> bool {
        match (reverse_index, fallback_reach) {
            (Some(rev), _) => rev
                .get(pred)
                .map(|ancestors| ancestors.iter().any(|a| test_set.contains(a)))
                .unwrap_or(false),
            (None, Some(reach)) => reach.values().any(|r| r.contains(pred)),
            (None, None) => false,
        }
    };

    let mut gaps_by_changed = BTreeMap::new();
    for changed_sym in changed {
        let Some(preds) = preds_index.get(changed_sym) else {
            continue;
        };
        let mut gaps = BTreeSet::new();
        for &pred in preds {
            let Some(node) = graph.nodes.get(pred) else {
                continue;
            };
            if node.is_test() || is_test_namespace(graph, node) {
                continue;
            }
            if !reached_by_a_test(pred) {
                gaps.insert(pred.clone());
            }
        }
        if !gaps.is_empty() {
            gaps_by_changed.insert(changed_sym.clone(), gaps);
        }
    }
    gaps_by_changed
}

/// A namespace node that fronts a test file: top-level usages in test files
/// attribute to it, and reporting those as coverage gaps would be noise.
fn is_test_namespace(graph: &SymbolGraph, node: &SymbolNode) -> bool {
    if node.kind != NodeKind::Namespace {
        return false;
    }
    if node.symbol.name().ends_with("-test") {
        return true;
    }
    graph
        .files
        .get(&node.file)
        .map(|record| {
            record
                .symbols
                .iter()
                .any(|s| graph.nodes.get(s).map(|n| n.is_test()).unwrap_or(false))
        })
        .unwrap_or(false)
}

fn selected(node: &SymbolNode, reason: SelectionReason) -> SelectedTest {
    SelectedTest {
        symbol: node.symbol.clone(),
        file: node.file.clone(),
        line: node.line,
        reason,
    }
}

fn finish<'a>(
    graph: &'a SymbolGraph,
    dep: &'a DepGraph,
    tests: Vec<SelectedTest>,
    changed_symbols: BTreeSet<Symbol>,
    changed_hashes: BTreeMap<Symbol, String>,
    untested_usages: BTreeMap<Symbol, BTreeSet<Symbol>>,
    total_tests: usize,
) -> Selection<'a> {
    let stats = SelectionStats {
        total_tests,
        selected_tests: tests.len(),
        changed_symbols: changed_symbols.len(),
        untested_usages: untested_usages.values().map(|s| s.len()).sum(),
        selection_rate: if total_tests == 0 {
            0.0
        } else {
            tests.len() as f32 / total_tests as f32 * 100.0
        },
    };
    Selection {
        tests,
        changed_symbols,
        changed_hashes,
        untested_usages,
        stats,
        graph,
        dep,
        trace_cell: OnceLock::new(),
    }
}

/// Record a successful run in the verified baseline.
///
/// `VerifyScope::All` merges every changed hash. An explicit test list
/// verifies only the changed symbols covered by the union of those tests'
/// reachable sets; the rest are reported as skipped and stay unverified.
pub fn mark_verified(cache: &Cache, selection: &Selection<'_>, scope: &VerifyScope) -> Result<MarkReport> {
    let _span = tracing::info_span!("mark_verified", changed = selection.changed_symbols.len()).entered();
    match scope {
        VerifyScope::All => {
            cache.update_baseline(&selection.changed_hashes)?;
            Ok(MarkReport {
                verified: selection.changed_symbols.clone(),
                skipped: BTreeSet::new(),
            })
        }
        VerifyScope::Tests(tests_run) => {
            let mut covered: BTreeSet<Symbol> = BTreeSet::new();
            for test in tests_run {
                if !selection.dep.contains(test) {
                    tracing::warn!(test = %test, "Unknown test in mark-verified list; it covers nothing");
                    continue;
                }
                covered.extend(selection.dep.reachable(test));
            }
            let verified: BTreeSet<Symbol> = selection
                .changed_symbols
                .intersection(&covered)
                .cloned()
                .collect();
            let partial: BTreeMap<Symbol, String> = selection
                .changed_hashes
                .iter()
                .filter(|(sym, _)| verified.contains(sym))
                .map(|(sym, hash)| (sym.clone(), hash.clone()))
                .collect();
            cache.update_baseline(&partial)?;
            let skipped: BTreeSet<Symbol> = selection
                .changed_symbols
                .difference(&verified)
                .cloned()
                .collect();
            if !skipped.is_empty() {
                tracing::info!(
                    skipped = skipped.len(),
                    "Partial verification left symbols unverified"
                );
            }
            Ok(MarkReport { verified, skipped })
        }
    }
}

/// Overwrite the baseline with the current hashes wholesale — the adoption
/// path for a legacy codebase where everything is assumed good as-is.
pub fn mark_all_verified(cache: &Cache, current_hashes: &BTreeMap<Symbol, String>) -> Result<()> {
    cache.save_baseline(current_hashes)
}
