//! Content-addressed fingerprints for definitions.
//!
//! A symbol's hash is the SHA-256 of its normalized source fragment, so
//! docstring and whitespace edits never change it and any other textual
//! change does. Every failure mode (missing file, out-of-range extent)
//! yields an *absent* hash rather than an error — an absent hash reads as
//! "changed" downstream, which over-selects tests but never under-selects.

mod normalize;

pub use normalize::normalize;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::graph::{SymbolGraph, SymbolNode};
use crate::symbol::Symbol;

/// SHA-256 of a normalized fragment, as 64 lowercase hex chars.
pub fn hash_content(normalized: &str) -> String {
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{:x}", digest)
}

/// Hash the extent `[start_line, end_line]` (1-indexed, inclusive) of a file
/// already split into lines. Out-of-range extents produce `None`.
pub fn hash_extent(lines: &[&str], start_line: u32, end_line: u32) -> Option<String> {
    if start_line == 0 || start_line > end_line || end_line as usize > lines.len() {
        return None;
    }
    let fragment = lines[(start_line - 1) as usize..end_line as usize].join("\n");
    Some(hash_content(&normalize(&fragment)))
}

/// Hash every symbol defined in one file, reading the file once.
///
/// Symbols without an extent (synthetic namespace nodes) and unreadable
/// files contribute nothing.
pub fn hash_file_symbols<'a>(
    path: &Path,
    nodes: impl IntoIterator<Item = &'a SymbolNode>,
) -> BTreeMap<Symbol, String> {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(
                file = %path.display(),
                error = %e,
                "Could not read file for hashing; its symbols will have no hash"
            );
            return BTreeMap::new();
        }
    };
    let lines: Vec<&str> = source.lines().collect();

    let mut hashes = BTreeMap::new();
    for node in nodes {
        if let Some((start, end)) = node.extent() {
            if let Some(hash) = hash_extent(&lines, start, end) {
                hashes.insert(node.symbol.clone(), hash);
            } else {
                tracing::debug!(
                    symbol = %node.symbol,
                    file = %path.display(),
                    start,
                    end,
                    "Extent out of range; symbol left unhashed"
                );
            }
        }
    }
    hashes
}

/// Hash every symbol in the graph, grouping by file and hashing files in
/// parallel. The merged result is a sorted map, so completion order is
/// unobservable.
pub fn hash_graph(graph: &SymbolGraph) -> BTreeMap<Symbol, String> {
    let _span = tracing::info_span!("hash_graph", files = graph.files.len()).entered();
    graph
        .files
        .par_iter()
        .map(|(path, record)| hash_file_record(graph, path, record.symbols.iter()))
        .reduce(BTreeMap::new, |mut acc, m| {
            acc.extend(m);
            acc
        })
}

/// Recompute hashes for the symbols defined in `files` only, from current
/// on-disk content. Files absent from the graph contribute nothing.
pub fn rehash(graph: &SymbolGraph, files: &BTreeSet<PathBuf>) -> BTreeMap<Symbol, String> {
    let _span = tracing::info_span!("rehash", files = files.len()).entered();
    files
        .par_iter()
        .filter_map(|path| graph.files.get_key_value(path))
        .map(|(path, record)| hash_file_record(graph, path, record.symbols.iter()))
        .reduce(BTreeMap::new, |mut acc, m| {
            acc.extend(m);
            acc
        })
}

fn hash_file_record<'a>(
    graph: &SymbolGraph,
    path: &Path,
    symbols: impl Iterator<Item = &'a Symbol>,
) -> BTreeMap<Symbol, String> {
    hash_file_symbols(path, symbols.filter_map(|s| graph.nodes.get(s)))
}
