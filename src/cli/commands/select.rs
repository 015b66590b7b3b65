//! Select command — compute and print the tests to run.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use testsift::{Cache, Config, Snapshot};

use super::load_state;
use crate::cli::display;

pub(crate) fn cmd_select(
    all: bool,
    json: bool,
    config: &Config,
    cache: &Cache,
    root: &Path,
    quiet: bool,
) -> Result<()> {
    let _span = tracing::info_span!("cmd_select", all).entered();
    let state = load_state(config, cache, quiet)?;
    if !quiet && !json {
        warn_stale_snapshot(&state.snapshot);
    }

    let selection = state.select(cache, all);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&display::selection_to_json(&selection, root))?
        );
    } else {
        display::print_selection(&selection, root);
    }
    Ok(())
}

/// Warn (stderr, so JSON stays clean) when analyzed files changed on disk
/// after the snapshot was taken. Errors are swallowed — staleness checking
/// must never break a select.
fn warn_stale_snapshot(snapshot: &Snapshot) {
    let Ok(analyzed_at) = chrono::DateTime::parse_from_rfc3339(&snapshot.analyzed_at) else {
        return;
    };
    let stale: Vec<_> = snapshot
        .graph
        .files
        .keys()
        .filter(|path| {
            std::fs::metadata(path)
                .and_then(|m| m.modified())
                .map(|mtime| chrono::DateTime::<chrono::Utc>::from(mtime) > analyzed_at)
                .unwrap_or(false)
        })
        .collect();
    if !stale.is_empty() {
        eprintln!(
            "{} {} file(s) changed since last analyze. Run 'testsift analyze' to update.",
            "warning:".yellow().bold(),
            stale.len()
        );
        for path in stale.iter().take(5) {
            eprintln!("  {}", path.display().to_string().dimmed());
        }
    }
}
