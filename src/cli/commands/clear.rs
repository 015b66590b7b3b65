//! Clear command — remove cached state.

use anyhow::Result;
use colored::Colorize;

use testsift::Cache;

pub(crate) fn cmd_clear(all: bool, cache: &Cache, quiet: bool) -> Result<()> {
    if all {
        cache.clear_all()?;
        if !quiet {
            println!("Removed snapshot and baseline.");
            println!(
                "{}",
                "The next select will run every test (no baseline).".dimmed()
            );
        }
    } else {
        cache.clear_analysis()?;
        if !quiet {
            println!("Removed analysis snapshot. Baseline kept.");
        }
    }
    Ok(())
}
