//! Persistent caches under the project's `.testsift/` directory.
//!
//! Two stores with different lifecycles: the *analysis snapshot* is ephemeral
//! and fully overwritten on every analyze; the *verified baseline* is durable
//! and only ever touched by the mark-verified operations and `clear --all`.
//! Saves are write-to-temp-then-rename so a crash never leaves a torn file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::depgraph::ReverseIndex;
use crate::graph::SymbolGraph;
use crate::symbol::Symbol;

/// Name of the per-project state directory (created on first save).
pub const STATE_DIR: &str = ".testsift";

const SNAPSHOT_FILE: &str = "analysis.json";
const BASELINE_FILE: &str = "verified.json";

/// The full analysis snapshot regenerated by every analyze.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// ISO-8601 timestamp of the analyze that produced this snapshot.
    pub analyzed_at: String,
    /// Source paths the analyzer was pointed at.
    pub paths: Vec<PathBuf>,
    #[serde(flatten)]
    pub graph: SymbolGraph,
    pub content_hashes: BTreeMap<Symbol, String>,
    /// Materialized once at analyze time so selects don't recompute it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_index: Option<ReverseIndex>,
}

/// Existence and size of one cache file, for `testsift status`.
#[derive(Debug, Clone, Serialize)]
pub struct FileStatus {
    pub path: PathBuf,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub snapshot: FileStatus,
    pub baseline: FileStatus,
}

/// Handle to the two on-disk stores. Contents are never memoized here; every
/// load reads the file so `mark_verified` in one handle is visible to the
/// next load from another.
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Cache { dir: dir.into() }
    }

    /// Cache rooted at the default state directory of a project.
    pub fn for_project(root: &Path) -> Self {
        Cache::new(root.join(STATE_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn baseline_path(&self) -> PathBuf {
        self.dir.join(BASELINE_FILE)
    }

    /// Overwrite the analysis snapshot.
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot).context("Failed to serialize snapshot")?;
        write_atomic(&self.snapshot_path(), json.as_bytes())?;
        tracing::info!(path = %self.snapshot_path().display(), "Analysis snapshot saved");
        Ok(())
    }

    /// Load the snapshot; missing or corrupt files are absent. A corrupt
    /// snapshot only costs a reanalyze, so it is logged and tolerated.
    pub fn load_snapshot(&self) -> Option<Snapshot> {
        let path = self.snapshot_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read snapshot");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt analysis snapshot; treating as absent"
                );
                None
            }
        }
    }

    /// Load the verified baseline; absent or corrupt means empty.
    ///
    /// Keys are stored as the string form of the symbol — mangled macro-test
    /// names contain characters that are not valid symbol syntax for every
    /// reader, so the string form is the wire format — and decoded on load.
    pub fn load_baseline(&self) -> BTreeMap<Symbol, String> {
        let path = self.baseline_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read baseline");
                return BTreeMap::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(baseline) => baseline,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt verified baseline; treating as empty"
                );
                BTreeMap::new()
            }
        }
    }

    /// Overwrite the verified baseline.
    pub fn save_baseline(&self, baseline: &BTreeMap<Symbol, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(baseline).context("Failed to serialize baseline")?;
        write_atomic(&self.baseline_path(), json.as_bytes())?;
        tracing::info!(
            path = %self.baseline_path().display(),
            entries = baseline.len(),
            "Verified baseline saved"
        );
        Ok(())
    }

    /// Merge `partial` into the stored baseline (new entries win).
    pub fn update_baseline(&self, partial: &BTreeMap<Symbol, String>) -> Result<()> {
        let mut baseline = self.load_baseline();
        baseline.extend(partial.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.save_baseline(&baseline)
    }

    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            snapshot: file_status(self.snapshot_path()),
            baseline: file_status(self.baseline_path()),
        }
    }

    /// Delete the snapshot only. The baseline survives.
    pub fn clear_analysis(&self) -> Result<()> {
        remove_if_exists(&self.snapshot_path())
    }

    /// Delete both stores. Losing the baseline is not recoverable: the next
    /// select runs in no-baseline mode and returns every test.
    pub fn clear_all(&self) -> Result<()> {
        remove_if_exists(&self.snapshot_path())?;
        remove_if_exists(&self.baseline_path())
    }
}

/// Write a file atomically: temp sibling first, then rename over the target.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().context("Cache path has no parent directory")?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", tmp.display()))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Removed cache file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

fn file_status(path: PathBuf) -> FileStatus {
    match std::fs::metadata(&path) {
        Ok(meta) => FileStatus {
            exists: true,
            size_bytes: Some(meta.len()),
            modified: meta
                .modified()
                .ok()
                .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339()),
            path,
        },
        Err(_) => FileStatus {
            exists: false,
            size_bytes: None,
            modified: None,
            path,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn baseline_of(entries: &[(&str, &str)]) -> BTreeMap<Symbol, String> {
        entries
            .iter()
            .map(|(k, v)| (Symbol::parse(k), v.to_string()))
            .collect()
    }

    #[test]
    fn test_baseline_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join(STATE_DIR));
        let baseline = baseline_of(&[
            ("app.core/handler", "aa11"),
            ("app.sift-test/__selects-changed__", "bb22"),
        ]);
        cache.save_baseline(&baseline).unwrap();
        assert_eq!(cache.load_baseline(), baseline);
    }

    #[test]
    fn test_baseline_keys_are_strings_on_disk() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join(STATE_DIR));
        cache
            .save_baseline(&baseline_of(&[("a.b-test/__with spaces mangled__", "cc33")]))
            .unwrap();
        let raw = std::fs::read_to_string(cache.baseline_path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(parsed.as_object().unwrap().contains_key("a.b-test/__with spaces mangled__"));
    }

    #[test]
    fn test_missing_baseline_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join(STATE_DIR));
        assert!(cache.load_baseline().is_empty());
    }

    #[test]
    fn test_corrupt_baseline_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join(STATE_DIR));
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.baseline_path(), "{not json").unwrap();
        assert!(cache.load_baseline().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_absent() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join(STATE_DIR));
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.snapshot_path(), "]]]").unwrap();
        assert!(cache.load_snapshot().is_none());
    }

    #[test]
    fn test_update_baseline_merges() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join(STATE_DIR));
        cache
            .save_baseline(&baseline_of(&[("a/x", "h1"), ("a/y", "h2")]))
            .unwrap();
        cache
            .update_baseline(&baseline_of(&[("a/y", "h2-new"), ("a/z", "h3")]))
            .unwrap();
        let merged = cache.load_baseline();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[&Symbol::parse("a/y")], "h2-new");
        assert_eq!(merged[&Symbol::parse("a/x")], "h1");
    }

    #[test]
    fn test_clear_analysis_keeps_baseline() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join(STATE_DIR));
        cache.save_baseline(&baseline_of(&[("a/x", "h1")])).unwrap();
        std::fs::write(cache.snapshot_path(), "{}").unwrap();
        cache.clear_analysis().unwrap();
        assert!(!cache.snapshot_path().exists());
        assert!(cache.baseline_path().exists());
    }

    #[test]
    fn test_clear_all_removes_both() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join(STATE_DIR));
        cache.save_baseline(&baseline_of(&[("a/x", "h1")])).unwrap();
        cache.clear_all().unwrap();
        assert!(!cache.baseline_path().exists());
        // Idempotent on already-missing files
        cache.clear_all().unwrap();
    }

    #[test]
    fn test_status_reports_sizes() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().join(STATE_DIR));
        cache.save_baseline(&baseline_of(&[("a/x", "h1")])).unwrap();
        let status = cache.status();
        assert!(status.baseline.exists);
        assert!(status.baseline.size_bytes.unwrap() > 0);
        assert!(!status.snapshot.exists);
        assert!(status.snapshot.size_bytes.is_none());
    }
}
