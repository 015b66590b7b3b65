//! Git working-copy queries for the incremental analyze path.
//!
//! Optional collaborator: when git (or a repository) is absent the fast
//! path is simply unavailable and a full analyze still works.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Locally modified files, split by whether they still exist.
#[derive(Debug, Default)]
pub struct WorkingCopyChanges {
    /// Modified or untracked files present on disk.
    pub modified: BTreeSet<PathBuf>,
    /// Files deleted since the last commit.
    pub deleted: BTreeSet<PathBuf>,
}

impl WorkingCopyChanges {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Ask git for uncommitted changes under `root`.
///
/// Parses `git status --porcelain`; paths come back relative to `root` (the
/// same shape the analyzer reports), filtered to Clojure sources.
pub fn uncommitted_files(root: &Path) -> Result<WorkingCopyChanges> {
    let output = std::process::Command::new("git")
        .args(["status", "--porcelain"])
        .current_dir(root)
        .output()
        .context("Failed to run git; is it installed?")?;
    if !output.status.success() {
        bail!(
            "git status failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let mut changes = WorkingCopyChanges::default();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if line.len() < 4 {
            continue;
        }
        let (status, rest) = line.split_at(2);
        let path = match rest.trim_start().split_once(" -> ") {
            // Rename: the old name is gone, the new one is modified
            Some((old, new)) => {
                if clojure_source(old) {
                    changes.deleted.insert(PathBuf::from(old));
                }
                new
            }
            None => rest.trim_start(),
        };
        if !clojure_source(path) {
            continue;
        }
        if status.contains('D') {
            changes.deleted.insert(PathBuf::from(path));
        } else {
            changes.modified.insert(PathBuf::from(path));
        }
    }
    tracing::debug!(
        modified = changes.modified.len(),
        deleted = changes.deleted.len(),
        "Collected uncommitted files"
    );
    Ok(changes)
}

fn clojure_source(path: &str) -> bool {
    path.ends_with(".clj") || path.ends_with(".cljc")
}
