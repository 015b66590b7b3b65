//! CLI implementation for testsift

mod commands;
mod display;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use testsift::{Cache, Config};

#[derive(Parser)]
#[command(name = "testsift")]
#[command(about = "Run only the tests whose behavior could have changed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// State directory (default: .testsift/ in the project root)
    #[arg(long, global = true, env = "TESTSIFT_DIR")]
    dir: Option<PathBuf>,

    /// Suppress summary output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze sources and overwrite the analysis snapshot
    Analyze {
        /// Source paths (default: config paths, then src/ and test/)
        paths: Vec<PathBuf>,
        /// Read analyzer facts from a JSON file instead of running the analyzer
        #[arg(long)]
        facts: Option<PathBuf>,
        /// Patch the snapshot from uncommitted files instead of reanalyzing
        #[arg(long, conflicts_with = "facts")]
        incremental: bool,
    },
    /// Compute the tests to run from the snapshot and baseline
    Select {
        /// Select every test regardless of changes
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a successful run in the verified baseline
    MarkVerified {
        /// Tests that actually ran (default: verify the whole selection)
        #[arg(long, num_args = 1..)]
        tests: Vec<String>,
    },
    /// Overwrite the baseline with all current hashes (adopt a legacy codebase)
    MarkAllVerified,
    /// Remove the analysis snapshot
    Clear {
        /// Also remove the verified baseline
        #[arg(long)]
        all: bool,
    },
    /// Report cache file existence and sizes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Explain why a test was selected
    Why {
        /// Test symbol (ns/name)
        test: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let root = find_project_root();
    let config = Config::load(&root);
    let quiet = cli.quiet || config.quiet.unwrap_or(false);
    let cache = match &cli.dir {
        Some(dir) => Cache::new(dir.clone()),
        None => Cache::new(testsift::resolve_state_dir(&root)),
    };

    match cli.command {
        Commands::Analyze {
            paths,
            facts,
            incremental,
        } => commands::cmd_analyze(&paths, facts.as_deref(), incremental, &config, &cache, &root, quiet),
        Commands::Select { all, json } => {
            commands::cmd_select(all, json, &config, &cache, &root, quiet)
        }
        Commands::MarkVerified { tests } => {
            commands::cmd_mark_verified(&tests, &config, &cache, quiet)
        }
        Commands::MarkAllVerified => commands::cmd_mark_all_verified(&cache, quiet),
        Commands::Clear { all } => commands::cmd_clear(all, &cache, quiet),
        Commands::Status { json } => commands::cmd_status(json, &cache),
        Commands::Why { test, json } => commands::cmd_why(&test, json, &config, &cache),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "testsift",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

/// Find project root by looking for common markers
fn find_project_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut current = cwd.as_path();

    loop {
        // Clojure project markers, then VCS root as fallback
        let markers = ["deps.edn", "project.clj", "shadow-cljs.edn", "bb.edn", ".git"];
        for marker in &markers {
            if current.join(marker).exists() {
                return current.to_path_buf();
            }
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    tracing::debug!("No project root marker found, using current directory");
    cwd
}
