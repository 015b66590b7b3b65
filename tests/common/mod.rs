//! Shared fixture: a small Clojure project with matching analyzer facts.
//!
//! The same facts JSON drives both the library tests (absolute paths,
//! parsed straight into `Facts`) and the CLI tests (relative paths, written
//! to a facts file for `analyze --facts`).

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use testsift::facts::Facts;
use testsift::{build_graph, DepGraph, Symbol, SymbolGraph};

/// Project sources, path → content. Line numbers in [`FACTS_JSON`] must stay
/// in sync with these.
pub const SOURCES: &[(&str, &str)] = &[
    (
        "src/app/core.clj",
        "(ns app.core)\n\
         \n\
         (defn handler\n\
         \x20 \"Handles one request.\"\n\
         \x20 [req]\n\
         \x20 (respond (persist req)))\n\
         \n\
         (defn respond [r] r)\n",
    ),
    (
        "src/app/db.clj",
        "(ns app.db)\n\
         \n\
         (defn persist [r] r)\n",
    ),
    (
        "src/app/api.clj",
        "(ns app.api)\n\
         \n\
         (defn create [x]\n\
         \x20 (persist x))\n",
    ),
    (
        "src/app/jobs.clj",
        "(ns app.jobs)\n\
         \n\
         (defn cleanup []\n\
         \x20 (persist :old))\n",
    ),
    (
        "test/app/core_test.clj",
        "(ns app.core-test)\n\
         \n\
         (deftest handler-test\n\
         \x20 (is (= 1 (handler 1))))\n\
         \n\
         (specification \"handler round trip\"\n\
         \x20 (assertions\n\
         \x20   (handler {:x 1}) => {:x 1}))\n",
    ),
    (
        "test/app/integration/smoke_test.clj",
        "(ns app.integration.smoke-test)\n\
         \n\
         (deftest full-stack-test\n\
         \x20 (is (= 1 (handler 1))))\n",
    ),
    (
        "test/app/integration/api_test.clj",
        "(ns app.integration.api-test)\n\
         \n\
         (deftest create-flow-test\n\
         \x20 (is (= 1 (create 1))))\n",
    ),
];

/// Analyzer facts for [`SOURCES`], in clj-kondo's envelope shape, with
/// project-relative filenames.
pub const FACTS_JSON: &str = r#"{
  "analysis": {
    "var-definitions": [
      {"ns": "app.core", "name": "handler", "filename": "src/app/core.clj",
       "row": 3, "end-row": 6, "defined-by": "clojure.core/defn"},
      {"ns": "app.core", "name": "respond", "filename": "src/app/core.clj",
       "row": 8, "end-row": 8, "defined-by": "clojure.core/defn"},
      {"ns": "app.db", "name": "persist", "filename": "src/app/db.clj",
       "row": 3, "end-row": 3, "defined-by": "clojure.core/defn"},
      {"ns": "app.api", "name": "create", "filename": "src/app/api.clj",
       "row": 3, "end-row": 4, "defined-by": "clojure.core/defn"},
      {"ns": "app.jobs", "name": "cleanup", "filename": "src/app/jobs.clj",
       "row": 3, "end-row": 4, "defined-by": "clojure.core/defn"},
      {"ns": "app.core-test", "name": "handler-test", "filename": "test/app/core_test.clj",
       "row": 3, "end-row": 4, "defined-by": "clojure.test/deftest", "test": true},
      {"ns": "app.integration.smoke-test", "name": "full-stack-test",
       "filename": "test/app/integration/smoke_test.clj",
       "row": 3, "end-row": 4, "defined-by": "clojure.test/deftest", "test": true},
      {"ns": "app.integration.api-test", "name": "create-flow-test",
       "filename": "test/app/integration/api_test.clj",
       "row": 3, "end-row": 4, "defined-by": "clojure.test/deftest", "test": true,
       "meta": {"test-targets": "app.api/create"}}
    ],
    "var-usages": [
      {"from": "app.core", "from-var": "handler", "to": "app.core", "name": "respond",
       "filename": "src/app/core.clj", "row": 6},
      {"from": "app.core", "from-var": "handler", "to": "app.db", "name": "persist",
       "filename": "src/app/core.clj", "row": 6},
      {"from": "app.api", "from-var": "create", "to": "app.db", "name": "persist",
       "filename": "src/app/api.clj", "row": 4},
      {"from": "app.jobs", "from-var": "cleanup", "to": "app.db", "name": "persist",
       "filename": "src/app/jobs.clj", "row": 4},
      {"from": "app.core-test", "from-var": "handler-test", "to": "app.core", "name": "handler",
       "filename": "test/app/core_test.clj", "row": 4},
      {"from": "app.core-test", "to": "fulcro-spec.core", "name": "specification",
       "filename": "test/app/core_test.clj", "row": 6},
      {"from": "app.core-test", "to": "app.core", "name": "handler",
       "filename": "test/app/core_test.clj", "row": 8},
      {"from": "app.integration.smoke-test", "from-var": "full-stack-test",
       "to": "app.core", "name": "handler",
       "filename": "test/app/integration/smoke_test.clj", "row": 4},
      {"from": "app.integration.api-test", "from-var": "create-flow-test",
       "to": "app.api", "name": "create",
       "filename": "test/app/integration/api_test.clj", "row": 4}
    ],
    "namespace-definitions": [
      {"name": "app.core", "filename": "src/app/core.clj", "row": 1},
      {"name": "app.db", "filename": "src/app/db.clj", "row": 1},
      {"name": "app.api", "filename": "src/app/api.clj", "row": 1},
      {"name": "app.jobs", "filename": "src/app/jobs.clj", "row": 1},
      {"name": "app.core-test", "filename": "test/app/core_test.clj", "row": 1},
      {"name": "app.integration.smoke-test",
       "filename": "test/app/integration/smoke_test.clj", "row": 1},
      {"name": "app.integration.api-test",
       "filename": "test/app/integration/api_test.clj", "row": 1}
    ]
  }
}"#;

/// A project on disk plus its graph and hashes.
pub struct Fixture {
    pub dir: TempDir,
    pub graph: SymbolGraph,
    pub hashes: BTreeMap<Symbol, String>,
}

impl Fixture {
    /// Write the project and analyze it (facts with absolute paths).
    pub fn standard() -> Fixture {
        let dir = TempDir::new().expect("tempdir");
        write_project(dir.path());
        let facts = facts_for(dir.path());
        let graph = build_graph(&facts, &test_macros());
        let hashes = testsift::hash::hash_graph(&graph);
        Fixture { dir, graph, hashes }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Overwrite one source file; the caller keeps the line structure intact
    /// so the fact rows stay valid.
    pub fn rewrite(&self, rel: &str, content: &str) {
        std::fs::write(self.path(rel), content).expect("rewrite fixture file");
    }

    /// Recompute all hashes from current on-disk content.
    pub fn rehash(&self) -> BTreeMap<Symbol, String> {
        testsift::hash::hash_graph(&self.graph)
    }

    pub fn dep(&self) -> DepGraph {
        DepGraph::from_symbol_graph(&self.graph)
    }
}

/// Write the fixture sources under `root`.
pub fn write_project(root: &Path) {
    for (rel, content) in SOURCES {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
        std::fs::write(&path, content).expect("write fixture file");
    }
}

/// Parse [`FACTS_JSON`] with filenames rooted at `root`.
pub fn facts_for(root: &Path) -> Facts {
    let rooted = FACTS_JSON
        .replace("\"src/", &format!("\"{}/src/", root.display()))
        .replace("\"test/", &format!("\"{}/test/", root.display()));
    let envelope: serde_json::Value = serde_json::from_str(&rooted).expect("fixture facts JSON");
    serde_json::from_value(envelope["analysis"].clone()).expect("fixture facts")
}

pub fn test_macros() -> BTreeSet<Symbol> {
    BTreeSet::from([
        Symbol::parse("clojure.test/deftest"),
        Symbol::parse("fulcro-spec.core/specification"),
    ])
}

pub fn sym(s: &str) -> Symbol {
    Symbol::parse(s)
}

/// The synthesized symbol of the fixture's macro test.
pub fn spec_test() -> Symbol {
    sym("app.core-test/__handler-round-trip__")
}
