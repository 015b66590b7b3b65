//! Why command — explain a selection with witness paths.

use anyhow::Result;
use colored::Colorize;

use testsift::{Cache, Config, Symbol};

use super::load_state;

pub(crate) fn cmd_why(test: &str, json: bool, config: &Config, cache: &Cache) -> Result<()> {
    let _span = tracing::info_span!("cmd_why", test).entered();
    let state = load_state(config, cache, true)?;
    let selection = state.select(cache, false);
    let symbol = Symbol::parse(test);

    let Some(selected) = selection.tests.iter().find(|t| t.symbol == symbol) else {
        if json {
            println!("{}", serde_json::json!({ "selected": false }));
        } else {
            println!("{} is not selected.", symbol);
        }
        return Ok(());
    };

    let paths = selection.trace().get(&symbol).cloned().unwrap_or_default();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "selected": true,
                "reason": selected.reason,
                "paths": paths,
            }))?
        );
    } else {
        println!(
            "{} {}",
            symbol.to_string().bold(),
            format!("[{}]", selected.reason).dimmed()
        );
        if paths.is_empty() {
            println!(
                "  {}",
                "No dependency path (selected by policy, not reachability).".dimmed()
            );
        }
        for (changed, path) in &paths {
            let rendered: Vec<String> = path.iter().map(|s| s.to_string()).collect();
            println!("  {} {}", changed, format!("via {}", rendered.join(" → ")).dimmed());
        }
    }
    Ok(())
}
