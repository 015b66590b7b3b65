//! Analyzer fact model — typed view of the external analyzer's output.
//!
//! The engine consumes structured analysis data in the shape clj-kondo emits:
//! three streams of var definitions, var usages, and namespace definitions.
//! Facts are filtered to a single source dialect before graph construction.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

/// Source dialect tag carried by each fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Clj,
    Cljs,
    Cljc,
}

/// File extension belonging to the excluded secondary dialect.
pub const EXCLUDED_EXTENSION: &str = "cljs";

/// One or more symbols, as analyzers emit them in metadata.
///
/// `:test-targets` may be a single symbol, a vector, or a set; all three
/// normalize to a set.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SymbolOrMany {
    One(Symbol),
    Many(Vec<Symbol>),
}

impl SymbolOrMany {
    fn into_set(self) -> BTreeSet<Symbol> {
        match self {
            SymbolOrMany::One(sym) => BTreeSet::from([sym]),
            SymbolOrMany::Many(syms) => syms.into_iter().collect(),
        }
    }
}

/// Open metadata map attached to a definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefMeta {
    #[serde(default)]
    pub integration: bool,
    #[serde(rename = "test-targets")]
    pub test_targets: Option<SymbolOrMany>,
    /// Singular spelling accepted as an alias.
    #[serde(rename = "test-target")]
    pub test_target: Option<SymbolOrMany>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DefMeta {
    /// Normalize `:test-targets` / `:test-target` to a set.
    ///
    /// Absence stays absence — an empty set would mean "targets nothing",
    /// which is a different selection policy than "untargeted".
    pub fn targets(&self) -> Option<BTreeSet<Symbol>> {
        self.test_targets
            .clone()
            .or_else(|| self.test_target.clone())
            .map(SymbolOrMany::into_set)
    }
}

/// A top-level var definition fact.
#[derive(Debug, Clone, Deserialize)]
pub struct VarDefinition {
    pub ns: String,
    pub name: String,
    pub filename: PathBuf,
    pub row: u32,
    #[serde(rename = "end-row")]
    pub end_row: Option<u32>,
    pub lang: Option<Dialect>,
    /// The macro that produced this definition, e.g. `clojure.test/deftest`.
    #[serde(rename = "defined-by")]
    pub defined_by: Option<Symbol>,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default, rename = "macro")]
    pub is_macro: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub meta: DefMeta,
}

impl VarDefinition {
    pub fn symbol(&self) -> Symbol {
        Symbol::qualified(&self.ns, &self.name)
    }
}

/// A var usage fact: some code in `from` (optionally inside `from-var`)
/// referenced `to/name`.
#[derive(Debug, Clone, Deserialize)]
pub struct VarUsage {
    /// Namespace the usage occurs in.
    pub from: String,
    /// Namespace of the used var, when resolved.
    pub to: Option<String>,
    /// Name of the used var.
    pub name: String,
    pub filename: PathBuf,
    pub row: u32,
    pub lang: Option<Dialect>,
    /// Enclosing top-level var, when the usage is not top-level.
    #[serde(rename = "from-var")]
    pub from_var: Option<String>,
}

impl VarUsage {
    /// Symbol of the used var, if the analyzer resolved its namespace.
    pub fn used_symbol(&self) -> Option<Symbol> {
        self.to.as_ref().map(|ns| Symbol::qualified(ns, &self.name))
    }

    /// Symbol of the enclosing var, if any.
    pub fn enclosing_symbol(&self) -> Option<Symbol> {
        self.from_var
            .as_ref()
            .map(|v| Symbol::qualified(&self.from, v))
    }
}

/// A namespace definition fact.
#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceDefinition {
    pub name: String,
    pub filename: PathBuf,
    pub row: Option<u32>,
    #[serde(rename = "end-row")]
    pub end_row: Option<u32>,
    pub lang: Option<Dialect>,
    #[serde(default)]
    pub meta: DefMeta,
}

impl NamespaceDefinition {
    pub fn symbol(&self) -> Symbol {
        Symbol::unqualified(&self.name)
    }
}

/// The analyzer's three fact streams.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Facts {
    #[serde(default, rename = "var-definitions")]
    pub var_definitions: Vec<VarDefinition>,
    #[serde(default, rename = "var-usages")]
    pub var_usages: Vec<VarUsage>,
    #[serde(default, rename = "namespace-definitions")]
    pub namespace_definitions: Vec<NamespaceDefinition>,
}

/// Keep a fact iff its dialect tag is the primary dialect (or absent) and its
/// file is not a secondary-dialect source file.
fn keep(lang: Option<Dialect>, filename: &std::path::Path, primary: Dialect) -> bool {
    if let Some(lang) = lang {
        if lang != primary {
            return false;
        }
    }
    filename
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e != EXCLUDED_EXTENSION)
        .unwrap_or(true)
}

impl Facts {
    /// Filter all three streams to a single dialect. Dropped facts are
    /// dropped silently; this never errors.
    pub fn retain_dialect(&mut self, primary: Dialect) {
        let before = self.var_definitions.len() + self.var_usages.len();
        self.var_definitions
            .retain(|d| keep(d.lang, &d.filename, primary));
        self.var_usages
            .retain(|u| keep(u.lang, &u.filename, primary));
        self.namespace_definitions
            .retain(|n| keep(n.lang, &n.filename, primary));
        let after = self.var_definitions.len() + self.var_usages.len();
        if after < before {
            tracing::debug!(
                dropped = before - after,
                ?primary,
                "Filtered facts to primary dialect"
            );
        }
    }
}
