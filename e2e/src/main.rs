use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use e2e::cli;
use e2e::run::RunOptions;

#[derive(Parser)]
#[command(name = "e2e", version, about = "Hot-reload end-to-end harness for the dev server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available scenarios.
    List,
    /// Run a scenario against a freshly scaffolded fixture.
    Run {
        scenario: String,
        /// Harness config file (defaults apply when missing).
        #[arg(long, default_value = "e2e.toml")]
        config: PathBuf,
        /// Keep the fixture directory even when the run passes.
        #[arg(long)]
        keep: bool,
        /// Run the browser with a visible window.
        #[arg(long)]
        headed: bool,
    },
    /// Remove fixture workspaces and results for a scenario.
    Clean { scenario: String },
}

fn main() {
    harness::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let repo_root = std::env::current_dir()?;
    match cli.command {
        Command::List => cli::list_scenarios(),
        Command::Run {
            scenario,
            config,
            keep,
            headed,
        } => cli::run_scenario_by_name(
            &repo_root,
            &scenario,
            &config,
            &RunOptions {
                keep_fixture: keep,
                headed,
            },
        ),
        Command::Clean { scenario } => cli::clean_scenario(&repo_root, &scenario),
    }
}
