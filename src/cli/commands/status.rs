//! Status command — report cache file state.

use anyhow::Result;

use testsift::Cache;

use crate::cli::display;

pub(crate) fn cmd_status(json: bool, cache: &Cache) -> Result<()> {
    let status = cache.status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        display::print_status(&status);
    }
    Ok(())
}
