//! External analyzer integration.
//!
//! The engine does not parse Clojure itself; it consumes the analysis data
//! clj-kondo emits (`--config '{:analysis true :output {:format :json}}'`),
//! either by running the analyzer as a subprocess or by reading a
//! pre-computed facts file. Analyzer failure is the one error the engine
//! refuses to paper over: a selection computed from partial facts could
//! under-select, so the error carries the analyzer's own output and aborts.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;

use crate::facts::Facts;

/// Analyzer invoked when the config names none.
pub const DEFAULT_ANALYZER: &str = "clj-kondo";

const ANALYSIS_CONFIG: &str = "{:analysis true :output {:format :json}}";

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to launch analyzer `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("analyzer exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("analyzer output was not valid analysis JSON: {0}")]
    InvalidOutput(#[from] serde_json::Error),
    #[error("failed to read facts file {path}: {source}")]
    FactsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// clj-kondo wraps the analysis data in a report envelope.
#[derive(Debug, Deserialize)]
struct AnalysisReport {
    analysis: Facts,
}

/// Either the clj-kondo envelope or bare fact streams.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FactsDocument {
    // Envelope first: a bare-facts parse accepts almost anything because
    // every stream defaults to empty
    Report(AnalysisReport),
    Bare(Facts),
}

impl FactsDocument {
    fn into_facts(self) -> Facts {
        match self {
            FactsDocument::Report(report) => report.analysis,
            FactsDocument::Bare(facts) => facts,
        }
    }
}

/// Run the analyzer over `paths` and parse its fact streams.
///
/// `command` overrides the analyzer binary (whitespace-split into program
/// and leading args). Lint findings are expected and ignored — only
/// unparseable output is a failure, reported with the analyzer's stderr.
pub fn run_analyzer(command: Option<&str>, paths: &[PathBuf]) -> Result<Facts, AnalyzerError> {
    let command = command.unwrap_or(DEFAULT_ANALYZER);
    let _span = tracing::info_span!("run_analyzer", command, paths = paths.len()).entered();

    let mut parts = command.split_whitespace();
    let program = parts.next().unwrap_or(DEFAULT_ANALYZER);
    let mut cmd = Command::new(program);
    cmd.args(parts);
    cmd.arg("--lint");
    for path in paths {
        cmd.arg(path);
    }
    cmd.args(["--config", ANALYSIS_CONFIG]);

    let output = cmd.output().map_err(|source| AnalyzerError::Launch {
        command: command.to_string(),
        source,
    })?;

    match serde_json::from_slice::<AnalysisReport>(&output.stdout) {
        Ok(report) => {
            tracing::info!(
                defs = report.analysis.var_definitions.len(),
                usages = report.analysis.var_usages.len(),
                "Analyzer run complete"
            );
            Ok(report.analysis)
        }
        // clj-kondo exits non-zero on lint findings but still prints the
        // analysis; only unparseable output counts as failure
        Err(parse_err) if !output.status.success() => Err(AnalyzerError::Failed {
            status: output.status,
            stderr: if output.stderr.is_empty() {
                parse_err.to_string()
            } else {
                String::from_utf8_lossy(&output.stderr).into_owned()
            },
        }),
        Err(parse_err) => Err(AnalyzerError::InvalidOutput(parse_err)),
    }
}

/// Load facts from a JSON file (the clj-kondo envelope or bare streams).
pub fn facts_from_file(path: &Path) -> Result<Facts, AnalyzerError> {
    let content = std::fs::read_to_string(path).map_err(|source| AnalyzerError::FactsFile {
        path: path.to_path_buf(),
        source,
    })?;
    let document: FactsDocument = serde_json::from_str(&content)?;
    Ok(document.into_facts())
}
