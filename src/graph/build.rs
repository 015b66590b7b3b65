//! Symbol graph construction from filtered analyzer facts.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::facts::Facts;
use crate::symbol::Symbol;

use super::macro_tests::{scan_macro_tests, MacroCallSite, MacroTest};
use super::{NodeKind, NodeMetadata, SymbolGraph, SymbolNode, UsageEdge};

/// Namespace segment that marks integration tests (`app.integration.api`).
const INTEGRATION_SEGMENT: &str = "integration";

/// Whether a namespace name falls under the `*.integration.*` pattern.
fn integration_namespace(ns: &str) -> bool {
    ns.split('.').any(|seg| seg == INTEGRATION_SEGMENT)
}

/// Build the symbol graph from filtered facts.
///
/// `test_macros` is the configured set of test-declaring macros; a var whose
/// `defined-by` is in the set (or that the analyzer flagged as a test) becomes
/// a test var, and usages of a macro in the set become synthesized test nodes.
///
/// Iteration order over the fact streams never affects the result: nodes live
/// in a sorted map and edges are sorted and deduplicated before the graph is
/// returned.
pub fn build_graph(facts: &Facts, test_macros: &BTreeSet<Symbol>) -> SymbolGraph {
    let _span = tracing::info_span!(
        "build_graph",
        defs = facts.var_definitions.len(),
        usages = facts.var_usages.len()
    )
    .entered();

    let mut nodes: BTreeMap<Symbol, SymbolNode> = BTreeMap::new();

    // Var nodes
    for def in &facts.var_definitions {
        let symbol = def.symbol();
        let is_test = def.test
            || def
                .defined_by
                .as_ref()
                .map(|m| test_macros.contains(m))
                .unwrap_or(false);
        let metadata = NodeMetadata {
            is_test,
            is_integration: integration_namespace(&def.ns) || def.meta.integration,
            test_targets: if is_test { def.meta.targets() } else { None },
            test_name: None,
            private: def.private,
            is_macro: def.is_macro,
            deprecated: def.deprecated,
            extra: def.meta.extra.clone(),
        };
        nodes.insert(
            symbol.clone(),
            SymbolNode {
                symbol,
                kind: NodeKind::Var,
                file: def.filename.clone(),
                line: Some(def.row),
                end_line: def.end_row,
                defined_by: def.defined_by.clone(),
                metadata,
            },
        );
    }

    // Namespace nodes
    for ns_def in &facts.namespace_definitions {
        let symbol = ns_def.symbol();
        nodes.insert(
            symbol.clone(),
            SymbolNode {
                symbol,
                kind: NodeKind::Namespace,
                file: ns_def.filename.clone(),
                line: ns_def.row,
                end_line: ns_def.end_row,
                defined_by: None,
                metadata: NodeMetadata {
                    is_integration: integration_namespace(&ns_def.name)
                        || ns_def.meta.integration,
                    ..NodeMetadata::default()
                },
            },
        );
    }

    // Macro-test nodes: every usage of a test-declaring macro is a call site
    let mut sites: BTreeMap<PathBuf, Vec<MacroCallSite>> = BTreeMap::new();
    let mut seen_sites: BTreeSet<(PathBuf, u32)> = BTreeSet::new();
    for usage in &facts.var_usages {
        let Some(used) = usage.used_symbol() else {
            continue;
        };
        if !test_macros.contains(&used) {
            continue;
        }
        if !seen_sites.insert((usage.filename.clone(), usage.row)) {
            continue;
        }
        sites.entry(usage.filename.clone()).or_default().push(MacroCallSite {
            row: usage.row,
            ns: usage.from.clone(),
            defined_by: used,
        });
    }
    let macro_tests = scan_macro_tests(&sites);
    for test in &macro_tests {
        nodes.insert(
            test.symbol.clone(),
            SymbolNode {
                symbol: test.symbol.clone(),
                kind: NodeKind::Test,
                file: test.file.clone(),
                line: Some(test.line),
                end_line: Some(test.end_line),
                defined_by: Some(test.defined_by.clone()),
                metadata: NodeMetadata {
                    is_test: true,
                    is_integration: integration_namespace(
                        test.symbol.namespace().unwrap_or_default(),
                    ),
                    test_name: Some(test.test_name.clone()),
                    ..NodeMetadata::default()
                },
            },
        );
    }

    // Macro-test line ranges per file, for attributing usages inside them
    let mut ranges_by_file: BTreeMap<&PathBuf, Vec<&MacroTest>> = BTreeMap::new();
    for test in &macro_tests {
        ranges_by_file.entry(&test.file).or_default().push(test);
    }

    // Usage edges; either endpoint missing drops the edge
    let mut edges: Vec<UsageEdge> = Vec::new();
    for usage in &facts.var_usages {
        let Some(to) = usage.used_symbol() else {
            continue;
        };
        if !nodes.contains_key(&to) {
            continue;
        }
        let from = match usage.enclosing_symbol() {
            Some(enclosing) => enclosing,
            None => ranges_by_file
                .get(&usage.filename)
                .and_then(|tests| {
                    tests
                        .iter()
                        .find(|t| t.covers_line(usage.row))
                        .map(|t| t.symbol.clone())
                })
                .unwrap_or_else(|| Symbol::unqualified(&usage.from)),
        };
        if !nodes.contains_key(&from) {
            continue;
        }
        edges.push(UsageEdge {
            from,
            to,
            file: usage.filename.clone(),
            line: usage.row,
        });
    }
    edges.sort_by(|a, b| {
        (&a.file, a.line, &a.from, &a.to).cmp(&(&b.file, b.line, &b.from, &b.to))
    });
    edges.dedup();

    let mut graph = SymbolGraph {
        nodes,
        edges,
        files: BTreeMap::new(),
    };
    graph.reindex_files();

    tracing::info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        macro_tests = macro_tests.len(),
        files = graph.files.len(),
        "Symbol graph built"
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{DefMeta, NamespaceDefinition, VarDefinition, VarUsage};

    fn var_def(ns: &str, name: &str, file: &str, row: u32, end_row: u32) -> VarDefinition {
        VarDefinition {
            ns: ns.to_string(),
            name: name.to_string(),
            filename: PathBuf::from(file),
            row,
            end_row: Some(end_row),
            lang: None,
            defined_by: Some(Symbol::parse("clojure.core/defn")),
            test: false,
            private: false,
            is_macro: false,
            deprecated: false,
            meta: DefMeta::default(),
        }
    }

    fn ns_def(name: &str, file: &str) -> NamespaceDefinition {
        NamespaceDefinition {
            name: name.to_string(),
            filename: PathBuf::from(file),
            row: Some(1),
            end_row: Some(1),
            lang: None,
            meta: DefMeta::default(),
        }
    }

    fn usage(from: &str, from_var: Option<&str>, to: &str, name: &str, file: &str, row: u32) -> VarUsage {
        VarUsage {
            from: from.to_string(),
            to: Some(to.to_string()),
            name: name.to_string(),
            filename: PathBuf::from(file),
            row,
            lang: None,
            from_var: from_var.map(|s| s.to_string()),
        }
    }

    fn default_macros() -> BTreeSet<Symbol> {
        BTreeSet::from([
            Symbol::parse("clojure.test/deftest"),
            Symbol::parse("fulcro-spec.core/specification"),
        ])
    }

    #[test]
    fn test_var_and_namespace_nodes() {
        let facts = Facts {
            var_definitions: vec![var_def("app.core", "handler", "src/app/core.clj", 3, 7)],
            namespace_definitions: vec![ns_def("app.core", "src/app/core.clj")],
            ..Facts::default()
        };
        let graph = build_graph(&facts, &default_macros());
        assert_eq!(graph.nodes.len(), 2);

        let var = &graph.nodes[&Symbol::parse("app.core/handler")];
        assert_eq!(var.kind, NodeKind::Var);
        assert_eq!(var.extent(), Some((3, 7)));

        let ns = &graph.nodes[&Symbol::parse("app.core")];
        assert_eq!(ns.kind, NodeKind::Namespace);
    }

    #[test]
    fn test_deftest_var_is_test() {
        let mut def = var_def("app.core-test", "handler-test", "test/app/core_test.clj", 4, 9);
        def.defined_by = Some(Symbol::parse("clojure.test/deftest"));
        def.test = true;
        let facts = Facts {
            var_definitions: vec![def],
            ..Facts::default()
        };
        let graph = build_graph(&facts, &default_macros());
        let node = &graph.nodes[&Symbol::parse("app.core-test/handler-test")];
        assert!(node.metadata.is_test);
        assert_eq!(node.kind, NodeKind::Var);
    }

    #[test]
    fn test_integration_marker_from_namespace_pattern() {
        let facts = Facts {
            var_definitions: vec![var_def(
                "app.integration.api-test",
                "roundtrip-test",
                "test/app/integration/api_test.clj",
                3,
                10,
            )],
            ..Facts::default()
        };
        let graph = build_graph(&facts, &default_macros());
        let node = &graph.nodes[&Symbol::parse("app.integration.api-test/roundtrip-test")];
        assert!(node.metadata.is_integration);
    }

    #[test]
    fn test_integration_marker_from_metadata() {
        let mut def = var_def("app.api-test", "slow-test", "test/app/api_test.clj", 3, 10);
        def.meta.integration = true;
        def.test = true;
        let facts = Facts {
            var_definitions: vec![def],
            ..Facts::default()
        };
        let graph = build_graph(&facts, &default_macros());
        assert!(
            graph.nodes[&Symbol::parse("app.api-test/slow-test")]
                .metadata
                .is_integration
        );
    }

    #[test]
    fn test_edge_from_enclosing_var() {
        let facts = Facts {
            var_definitions: vec![
                var_def("app.core", "handler", "src/app/core.clj", 3, 7),
                var_def("app.core", "helper", "src/app/core.clj", 9, 12),
            ],
            var_usages: vec![usage(
                "app.core",
                Some("handler"),
                "app.core",
                "helper",
                "src/app/core.clj",
                5,
            )],
            ..Facts::default()
        };
        let graph = build_graph(&facts, &default_macros());
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].from, Symbol::parse("app.core/handler"));
        assert_eq!(graph.edges[0].to, Symbol::parse("app.core/helper"));
    }

    #[test]
    fn test_top_level_usage_attributed_to_namespace() {
        let facts = Facts {
            var_definitions: vec![var_def("app.core", "helper", "src/app/core.clj", 9, 12)],
            namespace_definitions: vec![ns_def("app.init", "src/app/init.clj")],
            var_usages: vec![usage(
                "app.init",
                None,
                "app.core",
                "helper",
                "src/app/init.clj",
                4,
            )],
            ..Facts::default()
        };
        let graph = build_graph(&facts, &default_macros());
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].from, Symbol::parse("app.init"));
    }

    #[test]
    fn test_edge_with_unknown_endpoint_dropped() {
        // clojure.core/println is used but never defined in the analyzed set
        let facts = Facts {
            var_definitions: vec![var_def("app.core", "handler", "src/app/core.clj", 3, 7)],
            var_usages: vec![usage(
                "app.core",
                Some("handler"),
                "clojure.core",
                "println",
                "src/app/core.clj",
                5,
            )],
            ..Facts::default()
        };
        let graph = build_graph(&facts, &default_macros());
        assert!(graph.edges.is_empty(), "unknown endpoints drop the edge, never invent nodes");
        assert_eq!(graph.nodes.len(), 1);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let facts = Facts {
            var_definitions: vec![
                var_def("app.core", "handler", "src/app/core.clj", 3, 7),
                var_def("app.core", "helper", "src/app/core.clj", 9, 12),
            ],
            var_usages: vec![
                usage("app.core", Some("handler"), "app.core", "helper", "src/app/core.clj", 5),
                usage("app.core", Some("handler"), "app.core", "helper", "src/app/core.clj", 5),
            ],
            ..Facts::default()
        };
        let graph = build_graph(&facts, &default_macros());
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_fact_order_does_not_change_graph() {
        let defs = vec![
            var_def("app.core", "handler", "src/app/core.clj", 3, 7),
            var_def("app.core", "helper", "src/app/core.clj", 9, 12),
            var_def("app.db", "persist", "src/app/db.clj", 3, 20),
        ];
        let usages = vec![
            usage("app.core", Some("handler"), "app.core", "helper", "src/app/core.clj", 5),
            usage("app.core", Some("helper"), "app.db", "persist", "src/app/core.clj", 10),
        ];

        let forward = Facts {
            var_definitions: defs.clone(),
            var_usages: usages.clone(),
            ..Facts::default()
        };
        let mut reversed_defs = defs;
        reversed_defs.reverse();
        let mut reversed_usages = usages;
        reversed_usages.reverse();
        let backward = Facts {
            var_definitions: reversed_defs,
            var_usages: reversed_usages,
            ..Facts::default()
        };

        let a = build_graph(&forward, &default_macros());
        let b = build_graph(&backward, &default_macros());
        assert_eq!(a, b, "graph must be insensitive to fact iteration order");
    }

    #[test]
    fn test_files_index_orders_symbols_by_line() {
        let facts = Facts {
            var_definitions: vec![
                var_def("app.core", "zeta", "src/app/core.clj", 20, 22),
                var_def("app.core", "alpha", "src/app/core.clj", 3, 7),
            ],
            ..Facts::default()
        };
        let graph = build_graph(&facts, &default_macros());
        let record = &graph.files[&PathBuf::from("src/app/core.clj")];
        assert_eq!(
            record.symbols,
            vec![Symbol::parse("app.core/alpha"), Symbol::parse("app.core/zeta")]
        );
    }

    #[test]
    fn test_macro_test_synthesis_and_edge_attribution() {
        use std::io::Write;
        let dir = tempfile::TempDir::new().unwrap();
        let test_file = dir.path().join("sift_test.clj");
        let mut f = std::fs::File::create(&test_file).unwrap();
        write!(
            f,
            "(ns app.sift-test)\n\
             (specification \"selects changed\"\n\
             \x20 (assertions (select) => :ok))\n"
        )
        .unwrap();
        let file_str = test_file.to_string_lossy().to_string();

        let facts = Facts {
            var_definitions: vec![var_def("app.core", "select", "src/app/core.clj", 3, 7)],
            var_usages: vec![
                // The macro call itself
                VarUsage {
                    from: "app.sift-test".to_string(),
                    to: Some("fulcro-spec.core".to_string()),
                    name: "specification".to_string(),
                    filename: test_file.clone(),
                    row: 2,
                    lang: None,
                    from_var: None,
                },
                // A usage inside the macro body, with no enclosing var
                usage("app.sift-test", None, "app.core", "select", &file_str, 3),
            ],
            ..Facts::default()
        };
        let graph = build_graph(&facts, &default_macros());

        let test_sym = Symbol::parse("app.sift-test/__selects-changed__");
        let node = graph.nodes.get(&test_sym).expect("synthesized test node");
        assert_eq!(node.kind, NodeKind::Test);
        assert!(node.metadata.is_test);
        assert_eq!(node.metadata.test_name.as_deref(), Some("selects changed"));
        assert_eq!(node.extent(), Some((2, 3)));

        // The body usage is attributed to the synthesized test, not the namespace
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].from, test_sym);
        assert_eq!(graph.edges[0].to, Symbol::parse("app.core/select"));
    }
}
