//! Configuration file support for testsift
//!
//! Config files are loaded in order (later overrides earlier):
//! 1. `~/.config/testsift/config.toml` (user defaults)
//! 2. `.testsift.toml` in project root (project overrides)
//!
//! CLI flags override all config file values.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::symbol::Symbol;

/// Test-declaring macros assumed when the config names none.
pub const DEFAULT_TEST_MACROS: &[&str] =
    &["clojure.test/deftest", "fulcro-spec.core/specification"];

/// Configuration options loaded from config files
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source paths handed to the analyzer (overridden by `analyze` args)
    pub paths: Option<Vec<PathBuf>>,
    /// Test-declaring macros, as fully-qualified symbols
    pub test_macros: Option<Vec<String>>,
    /// Analyzer command (program plus leading args)
    pub analyzer_command: Option<String>,
    /// Enable quiet mode by default
    pub quiet: Option<bool>,
    /// Enable verbose mode by default
    pub verbose: Option<bool>,
}

impl Config {
    /// Load configuration from user and project config files
    pub fn load(project_root: &Path) -> Self {
        let user_config = dirs::config_dir()
            .map(|d| d.join("testsift/config.toml"))
            .and_then(|p| Self::load_file(&p))
            .unwrap_or_default();

        let project_config =
            Self::load_file(&project_root.join(".testsift.toml")).unwrap_or_default();

        // Project overrides user
        user_config.merge(project_config)
    }

    /// Load configuration from a specific file
    fn load_file(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
                return None;
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge two configs (other overrides self where present)
    fn merge(self, other: Self) -> Self {
        Config {
            paths: other.paths.or(self.paths),
            test_macros: other.test_macros.or(self.test_macros),
            analyzer_command: other.analyzer_command.or(self.analyzer_command),
            quiet: other.quiet.or(self.quiet),
            verbose: other.verbose.or(self.verbose),
        }
    }

    /// The configured test macros (or the defaults) as symbols.
    pub fn test_macro_symbols(&self) -> BTreeSet<Symbol> {
        match &self.test_macros {
            Some(macros) => macros.iter().map(|m| Symbol::parse(m)).collect(),
            None => DEFAULT_TEST_MACROS.iter().map(|m| Symbol::parse(m)).collect(),
        }
    }

    /// Source paths for a full analyze, defaulting to `src` and `test`.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.paths
            .clone()
            .unwrap_or_else(|| vec![PathBuf::from("src"), PathBuf::from("test")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_test_macros() {
        let config = Config::default();
        let macros = config.test_macro_symbols();
        assert!(macros.contains(&Symbol::parse("clojure.test/deftest")));
        assert!(macros.contains(&Symbol::parse("fulcro-spec.core/specification")));
    }

    #[test]
    fn test_project_overrides_user() {
        let user = Config {
            analyzer_command: Some("clj-kondo".to_string()),
            quiet: Some(true),
            ..Config::default()
        };
        let project = Config {
            analyzer_command: Some("bb clj-kondo".to_string()),
            ..Config::default()
        };
        let merged = user.merge(project);
        assert_eq!(merged.analyzer_command.as_deref(), Some("bb clj-kondo"));
        assert_eq!(merged.quiet, Some(true));
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            paths = ["src", "test", "dev"]
            test_macros = ["clojure.test/deftest"]
            analyzer_command = "clj-kondo"
            "#,
        )
        .unwrap();
        assert_eq!(config.source_paths().len(), 3);
        assert_eq!(config.test_macro_symbols().len(), 1);
    }
}
