//! CLI command implementations.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::debug;

use harness::config::{HarnessConfig, load_config};

use crate::outcome::Outcome;
use crate::run::{RunOptions, run_scenario};
use crate::scenario::SCENARIO_HOT_RELOAD;

/// List all available scenarios.
pub fn list_scenarios() -> Result<()> {
    println!("{SCENARIO_HOT_RELOAD}");
    Ok(())
}

/// Run a scenario by name, printing a one-line result per run artifact.
pub fn run_scenario_by_name(
    repo_root: &Path,
    name: &str,
    config_path: &Path,
    options: &RunOptions,
) -> Result<()> {
    let config = load_config(config_path).context("load config")?;
    preflight(&config)?;
    debug!(scenario = name, config = %config_path.display(), "scenario configured");

    let outcome = run_scenario(repo_root, name, &config, options).context("run scenario")?;
    println!(
        "run: scenario={} run_id={} outcome={:?} results={}",
        name,
        outcome.run_id,
        outcome.outcome,
        outcome.results_dir.display()
    );
    for report in outcome.reports.iter().filter(|report| !report.passed) {
        println!(
            "step {}: {} failed: {}",
            report.index,
            report.label,
            report.detail.as_deref().unwrap_or("no detail")
        );
    }
    if outcome.outcome == Outcome::Fail {
        bail!(
            "scenario {} failed (fixture kept at {})",
            name,
            outcome.fixture_root.display()
        );
    }
    Ok(())
}

/// Remove fixture workspaces and results for a scenario.
pub fn clean_scenario(repo_root: &Path, name: &str) -> Result<()> {
    let workspaces_dir = repo_root.join("e2e").join("workspaces");
    let results_dir = repo_root.join("e2e").join("results");

    if workspaces_dir.exists() {
        for entry in std::fs::read_dir(&workspaces_dir)
            .with_context(|| format!("read {}", workspaces_dir.display()))?
        {
            let entry = entry.context("read entry")?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with(name) {
                std::fs::remove_dir_all(entry.path())
                    .with_context(|| format!("remove {}", entry.path().display()))?;
            }
        }
    }

    let scenario_results = results_dir.join(name);
    if scenario_results.exists() {
        std::fs::remove_dir_all(&scenario_results)
            .with_context(|| format!("remove {}", scenario_results.display()))?;
    }

    println!(
        "clean: scenario={} workspaces={} results={}",
        name,
        workspaces_dir.display(),
        scenario_results.display()
    );
    Ok(())
}

/// Whether an executable responds to `--version`.
pub fn command_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

fn preflight(config: &HarnessConfig) -> Result<()> {
    if !command_available(&config.node_command) {
        bail!(
            "{} is not runnable; install Node.js or set node_command in the config",
            config.node_command
        );
    }
    if config.webdriver_url.is_none() && !command_available(&config.chromedriver_command) {
        bail!(
            "{} is not runnable; install chromedriver or set webdriver_url in the config",
            config.chromedriver_command
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_is_not_available() {
        assert!(!command_available("definitely-not-a-real-binary-name"));
    }

    #[test]
    fn clean_removes_matching_workspaces_and_results() {
        let temp = tempfile::tempdir().expect("tempdir");
        let repo_root = temp.path();
        let workspaces = repo_root.join("e2e").join("workspaces");
        std::fs::create_dir_all(workspaces.join("hot-reload_20260807_abc123")).expect("workspace");
        std::fs::create_dir_all(workspaces.join("other_20260807_def456")).expect("other");
        std::fs::create_dir_all(repo_root.join("e2e/results/hot-reload/run-1")).expect("results");

        clean_scenario(repo_root, "hot-reload").expect("clean");

        assert!(!workspaces.join("hot-reload_20260807_abc123").exists());
        assert!(workspaces.join("other_20260807_def456").exists());
        assert!(!repo_root.join("e2e/results/hot-reload").exists());
    }
}
