//! Incremental updates: rehash a subset of files, or splice re-analyzed
//! files into an existing snapshot without a full reanalyze.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::cache::Snapshot;
use crate::depgraph::DepGraph;
use crate::graph::SymbolGraph;
use crate::hash;
use crate::symbol::Symbol;

/// Recompute hashes for `files` and merge over the existing map.
///
/// Structure (nodes, edges, files) is untouched, so this is only valid while
/// no definitions were added, removed, or renamed since the last analyze. A
/// definition that did appear will simply have no hash, which reads as
/// unchanged — the caller opts into that by using the fast path.
pub fn patch_hashes(
    graph: &SymbolGraph,
    hashes: &BTreeMap<Symbol, String>,
    files: &BTreeSet<PathBuf>,
) -> BTreeMap<Symbol, String> {
    let fresh = hash::rehash(graph, files);
    let mut merged = hashes.clone();
    merged.extend(fresh);
    merged
}

/// Remove every symbol defined in `files` from the graph, along with its
/// hash and file-index entry. Edges are left in place for the caller to
/// reconcile after any merge (see [`update_snapshot`]).
pub fn evict_files(
    graph: &mut SymbolGraph,
    hashes: &mut BTreeMap<Symbol, String>,
    files: &BTreeSet<PathBuf>,
) {
    for file in files {
        let Some(record) = graph.files.remove(file) else {
            continue;
        };
        for symbol in &record.symbols {
            graph.nodes.remove(symbol);
            hashes.remove(symbol);
        }
        tracing::debug!(
            file = %file.display(),
            evicted = record.symbols.len(),
            "Evicted symbols for file"
        );
    }
}

/// Splice externally re-analyzed files into a snapshot.
///
/// `subgraph` is the graph built from the changed (still existing) files'
/// facts; `changed` and `deleted` come from the VCS. Old symbols from both
/// sets of files are evicted, the subgraph is merged over the survivors,
/// edges whose usage site or endpoints went away are dropped, the changed
/// files are rehashed, and the reverse index is rebuilt if the snapshot
/// carried one.
pub fn update_snapshot(
    snapshot: &mut Snapshot,
    subgraph: SymbolGraph,
    changed: &BTreeSet<PathBuf>,
    deleted: &BTreeSet<PathBuf>,
) {
    let _span = tracing::info_span!(
        "update_snapshot",
        changed = changed.len(),
        deleted = deleted.len()
    )
    .entered();

    let evicted: BTreeSet<PathBuf> = changed.union(deleted).cloned().collect();
    evict_files(&mut snapshot.graph, &mut snapshot.content_hashes, &evicted);

    // Usage sites in evicted files no longer exist; their edges go now.
    // Edges *into* evicted files stay for the moment — if the re-analyzed
    // file still defines the target, the merge below revives the endpoint.
    snapshot.graph.edges.retain(|e| !evicted.contains(&e.file));

    snapshot.graph.nodes.extend(subgraph.nodes);
    snapshot.graph.edges.extend(subgraph.edges);

    // Drop edges left dangling by deletions
    let nodes = &snapshot.graph.nodes;
    snapshot
        .graph
        .edges
        .retain(|e| nodes.contains_key(&e.from) && nodes.contains_key(&e.to));
    snapshot.graph.edges.sort_by(|a, b| {
        (&a.file, a.line, &a.from, &a.to).cmp(&(&b.file, b.line, &b.from, &b.to))
    });
    snapshot.graph.edges.dedup();
    snapshot.graph.reindex_files();

    let fresh = hash::rehash(&snapshot.graph, changed);
    snapshot.content_hashes.extend(fresh);

    if snapshot.reverse_index.is_some() {
        let dep = DepGraph::from_symbol_graph(&snapshot.graph);
        snapshot.reverse_index = Some(dep.reverse_index());
    }
}
