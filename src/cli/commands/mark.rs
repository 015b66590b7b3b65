//! Mark-verified commands — fold a successful run into the baseline.

use anyhow::Result;
use colored::Colorize;

use testsift::{mark_all_verified, mark_verified, Cache, Config, Symbol, VerifyScope};

use super::load_state;

pub(crate) fn cmd_mark_verified(
    tests: &[String],
    config: &Config,
    cache: &Cache,
    quiet: bool,
) -> Result<()> {
    let _span = tracing::info_span!("cmd_mark_verified", tests = tests.len()).entered();
    // The selection is a pure function of snapshot + baseline, so recomputing
    // it here sees exactly what the runner was handed
    let state = load_state(config, cache, quiet)?;
    let selection = state.select(cache, false);

    let scope = if tests.is_empty() {
        VerifyScope::All
    } else {
        VerifyScope::Tests(tests.iter().map(|t| Symbol::parse(t)).collect())
    };
    let report = mark_verified(cache, &selection, &scope)?;

    if !quiet {
        println!(
            "{} {} symbol(s) verified.",
            "Baseline updated:".bold(),
            report.verified.len()
        );
        if !report.skipped.is_empty() {
            println!(
                "{} {} changed symbol(s) not covered by the tests that ran:",
                "Skipped:".yellow(),
                report.skipped.len()
            );
            for symbol in &report.skipped {
                println!("  {}", symbol);
            }
        }
    }
    Ok(())
}

pub(crate) fn cmd_mark_all_verified(cache: &Cache, quiet: bool) -> Result<()> {
    let Some(snapshot) = cache.load_snapshot() else {
        anyhow::bail!("No analysis snapshot. Run `testsift analyze` first");
    };
    mark_all_verified(cache, &snapshot.content_hashes)?;
    if !quiet {
        println!(
            "{} baseline now covers {} symbol(s).",
            "Adopted:".bold(),
            snapshot.content_hashes.len()
        );
    }
    Ok(())
}
