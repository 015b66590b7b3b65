//! Symbol graph — nodes, usage edges, and the per-file symbol index.
//!
//! Built once per analyze from the filtered fact streams. Immutable for the
//! life of a selection; the incremental patcher produces a new graph rather
//! than mutating one in place under a consumer.

mod build;

pub use build::build_graph;
pub use macro_tests::{mangle_test_name, scan_macro_tests, MacroTest};

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

/// What a graph node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A top-level var definition (including `deftest` vars).
    Var,
    /// A namespace; also the attribution target for top-level usages.
    Namespace,
    /// A test synthesized from a test-declaring macro call.
    Test,
}

/// Reserved metadata carried by every node. The `extra` map keeps whatever
/// else the analyzer attached without the engine interpreting it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_test: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_integration: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_targets: Option<BTreeSet<Symbol>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub private: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not", rename = "macro")]
    pub is_macro: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A node in the symbol graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolNode {
    pub symbol: Symbol,
    pub kind: NodeKind,
    pub file: PathBuf,
    /// 1-indexed start line; absent for synthetic namespace nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// 1-indexed inclusive end line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    /// The macro that declared this node, e.g. `clojure.test/deftest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defined_by: Option<Symbol>,
    #[serde(default)]
    pub metadata: NodeMetadata,
}

impl SymbolNode {
    /// Whether this node is a test of any kind (deftest var or macro test).
    pub fn is_test(&self) -> bool {
        self.metadata.is_test
    }

    /// Source extent, when the node has one.
    pub fn extent(&self) -> Option<(u32, u32)> {
        match (self.line, self.end_line) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// A usage edge: code in `from` references `to`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UsageEdge {
    pub from: Symbol,
    pub to: Symbol,
    pub file: PathBuf,
    pub line: u32,
}

/// Symbols defined in one file, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub symbols: Vec<Symbol>,
}

/// The full symbol graph for one analyzed working copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolGraph {
    pub nodes: BTreeMap<Symbol, SymbolNode>,
    pub edges: Vec<UsageEdge>,
    pub files: BTreeMap<PathBuf, FileRecord>,
}

impl SymbolGraph {
    /// All test nodes (deftest vars and synthesized macro tests).
    pub fn test_symbols(&self) -> impl Iterator<Item = &SymbolNode> {
        self.nodes.values().filter(|n| n.is_test())
    }

    /// Direct predecessor index: `to → {from}` over the usage edges.
    pub fn direct_predecessors(&self) -> BTreeMap<&Symbol, BTreeSet<&Symbol>> {
        let mut preds: BTreeMap<&Symbol, BTreeSet<&Symbol>> = BTreeMap::new();
        for edge in &self.edges {
            preds.entry(&edge.to).or_default().insert(&edge.from);
        }
        preds
    }

    /// Rebuild the per-file index from the current node set.
    pub fn reindex_files(&mut self) {
        let mut files: BTreeMap<PathBuf, Vec<(u32, Symbol)>> = BTreeMap::new();
        for node in self.nodes.values() {
            files
                .entry(node.file.clone())
                .or_default()
                .push((node.line.unwrap_or(0), node.symbol.clone()));
        }
        self.files = files
            .into_iter()
            .map(|(path, mut syms)| {
                syms.sort();
                (
                    path,
                    FileRecord {
                        symbols: syms.into_iter().map(|(_, s)| s).collect(),
                    },
                )
            })
            .collect();
    }
}
