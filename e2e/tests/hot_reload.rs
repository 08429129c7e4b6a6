//! Full-flow harness test: fixture → dev server → browser → edits → teardown.
//!
//! The live test needs real external tools and is skipped automatically when
//! they are missing:
//!
//! - `node` and `chromedriver` on the `PATH` (or overridden via config), and
//! - `E2E_TEMPLATE_DIR` pointing at a prepared npm project (package.json with
//!   the framework, Vite, express, and react installed) that fixtures overlay.
//!
//! ```sh
//! E2E_TEMPLATE_DIR=/path/to/template cargo test -p e2e --test hot_reload
//! ```

use std::path::PathBuf;

use e2e::cli::command_available;
use e2e::outcome::Outcome;
use e2e::run::{RunOptions, run_scenario};
use e2e::scenario::{SCENARIO_HOT_RELOAD, hot_reload_steps};
use harness::config::HarnessConfig;

/// Drives the whole hot-reload scenario against a real dev server:
/// initial render and hydration, an HMR edit that preserves input state, a
/// loader addition that resets it, an HDR edit that preserves it, and a
/// loader-field rename that resets it again.
#[test]
fn hot_reload_scenario_passes_end_to_end() {
    let Some(template_dir) = std::env::var_os("E2E_TEMPLATE_DIR") else {
        eprintln!("skipping hot_reload_scenario_passes_end_to_end: E2E_TEMPLATE_DIR not set");
        return;
    };
    let config = HarnessConfig {
        template_dir: Some(PathBuf::from(template_dir)),
        ..HarnessConfig::default()
    };
    if !command_available(&config.node_command) {
        eprintln!("skipping hot_reload_scenario_passes_end_to_end: node not installed");
        return;
    }
    if config.webdriver_url.is_none() && !command_available(&config.chromedriver_command) {
        eprintln!("skipping hot_reload_scenario_passes_end_to_end: chromedriver not installed");
        return;
    }

    let temp = tempfile::tempdir().expect("tempdir");
    let outcome = run_scenario(
        temp.path(),
        SCENARIO_HOT_RELOAD,
        &config,
        &RunOptions::default(),
    )
    .expect("run scenario");

    assert_eq!(
        outcome.outcome,
        Outcome::Pass,
        "step reports: {:#?}",
        outcome.reports
    );
    assert_eq!(outcome.reports.len(), hot_reload_steps().len());
    assert!(
        outcome.results_dir.join("report.json").exists(),
        "report must be captured"
    );
    assert!(
        outcome.results_dir.join("server.log").exists(),
        "server log must be captured"
    );
}

#[test]
fn rejected_scenario_reports_cleanly() {
    let temp = tempfile::tempdir().expect("tempdir");
    let err = run_scenario(
        temp.path(),
        "non-route-hdr",
        &HarnessConfig::default(),
        &RunOptions::default(),
    )
    .expect_err("scenario does not exist");
    assert!(err.to_string().contains("unknown scenario"));
}
