//! Terminal and JSON rendering for CLI output.

use std::path::Path;

use colored::Colorize;

use testsift::cache::CacheStatus;
use testsift::Selection;

/// Terminal display of a selection with colored output (CLI-only)
pub(crate) fn print_selection(selection: &Selection<'_>, root: &Path) {
    let stats = &selection.stats;

    if !selection.changed_symbols.is_empty() {
        println!(
            "{} ({}):",
            "Changed".cyan(),
            selection.changed_symbols.len()
        );
        for symbol in &selection.changed_symbols {
            println!("  {}", symbol);
        }
        println!();
    }

    if selection.tests.is_empty() {
        println!("{}", "No tests to run.".dimmed());
    } else {
        println!(
            "{} ({}/{}, {:.0}%):",
            "Selected Tests".yellow(),
            stats.selected_tests,
            stats.total_tests,
            stats.selection_rate
        );
        for test in &selection.tests {
            let rel = testsift::rel_display(&test.file, root);
            let loc = match test.line {
                Some(line) => format!("{}:{}", rel, line),
                None => rel,
            };
            println!("  {} ({}) {}", test.symbol, loc, format!("[{}]", test.reason).dimmed());
        }
    }

    if !selection.untested_usages.is_empty() {
        println!();
        println!(
            "{} ({} callers with no test coverage):",
            "Untested Usages".yellow(),
            stats.untested_usages
        );
        for (changed, users) in &selection.untested_usages {
            for user in users {
                println!("  {} {} {}", user, "→".dimmed(), changed);
            }
        }
    }
}

/// JSON rendering of a selection, relativizing file paths against the root.
pub(crate) fn selection_to_json(selection: &Selection<'_>, root: &Path) -> serde_json::Value {
    let tests: Vec<_> = selection
        .tests
        .iter()
        .map(|t| {
            serde_json::json!({
                "symbol": t.symbol,
                "file": testsift::rel_display(&t.file, root),
                "line": t.line,
                "reason": t.reason,
            })
        })
        .collect();
    serde_json::json!({
        "tests": tests,
        "changed_symbols": selection.changed_symbols,
        "untested_usages": selection.untested_usages,
        "stats": selection.stats,
    })
}

pub(crate) fn print_status(status: &CacheStatus) {
    for (label, file) in [("snapshot", &status.snapshot), ("baseline", &status.baseline)] {
        if file.exists {
            let size = file.size_bytes.unwrap_or(0);
            let modified = file.modified.as_deref().unwrap_or("unknown");
            println!(
                "{}: {} ({} bytes, modified {})",
                label.bold(),
                file.path.display(),
                size,
                modified.dimmed()
            );
        } else {
            println!("{}: {}", label.bold(), "absent".dimmed());
        }
    }
}
