//! Scenario execution orchestration.
//!
//! Coordinates fixture creation, dev-server launch, browser driving, file
//! edits, and result capture. Everything is sequential: each step completes
//! before the next begins, and teardown runs even when a step fails (the
//! server and browser handles kill their children on drop).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use harness::browser::{Browser, open_session};
use harness::config::HarnessConfig;
use harness::fixture::{FixtureProject, create_fixture};
use harness::mutate::transform_file;
use harness::port;
use harness::server::{DevServer, LaunchOptions};

use crate::outcome::{Outcome, RunReport, StepReport, classify_outcome, write_report};
use crate::scenario::{self, SCENARIO_HOT_RELOAD, Step};

/// Per-invocation knobs on top of the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Keep the fixture directory even when the run passes.
    pub keep_fixture: bool,
    /// Run the browser with a visible window.
    pub headed: bool,
}

/// Result of running a single scenario.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub run_id: String,
    pub results_dir: PathBuf,
    pub fixture_root: PathBuf,
    pub outcome: Outcome,
    pub reports: Vec<StepReport>,
}

/// Run a scenario end-to-end: fixture, dev server, browser, steps, capture.
#[instrument(skip_all, fields(scenario = scenario_name))]
pub fn run_scenario(
    repo_root: &Path,
    scenario_name: &str,
    config: &HarnessConfig,
    options: &RunOptions,
) -> Result<ScenarioOutcome> {
    if scenario_name != SCENARIO_HOT_RELOAD {
        bail!("unknown scenario {scenario_name}");
    }
    config.validate()?;
    info!("scenario run started");

    let run_id = format!("run-{}", Utc::now().format("%Y%m%d_%H%M%S"));
    let results_dir = repo_root
        .join("e2e")
        .join("results")
        .join(scenario_name)
        .join(&run_id);
    fs::create_dir_all(&results_dir)
        .with_context(|| format!("create results dir {}", results_dir.display()))?;

    debug!("creating fixture");
    let workspaces = repo_root.join("e2e").join("workspaces");
    let fixture = create_fixture(
        &workspaces,
        scenario_name,
        &scenario::fixture_spec(),
        config.template_dir.as_deref(),
    )
    .context("create fixture")?;

    debug!("launching dev server");
    let server_port = port::free_port()?;
    let server = DevServer::launch(
        &fixture.root,
        &[format!("./{}", scenario::SERVER_ENTRY_FILE)],
        &LaunchOptions {
            node_command: config.node_command.clone(),
            port: server_port,
            log_dir: results_dir.clone(),
            startup_timeout: config.startup_timeout(),
            log_tail_bytes: config.server_log_tail_bytes,
        },
    )
    .context("launch dev server")?;

    debug!("opening browser session");
    let mut browser_config = config.clone();
    if options.headed {
        browser_config.headless = false;
    }
    let session = open_session(&browser_config).context("open browser session")?;

    let steps = scenario::hot_reload_steps();
    let reports = execute_steps(&session.browser, &fixture, &steps, server_port);

    let outcome = classify_outcome(steps.len(), &reports);
    write_report(
        &results_dir.join("report.json"),
        &RunReport {
            scenario: scenario_name.to_string(),
            run_id: run_id.clone(),
            outcome,
            steps: reports.clone(),
        },
    )
    .context("write report")?;

    session.browser.close().context("close browser session")?;
    server.terminate().context("terminate dev server")?;

    if !options.keep_fixture && outcome == Outcome::Pass {
        fs::remove_dir_all(&fixture.root)
            .with_context(|| format!("remove fixture {}", fixture.root.display()))?;
    }

    info!(outcome = ?outcome, results_dir = %results_dir.display(), "scenario run complete");
    Ok(ScenarioOutcome {
        run_id,
        results_dir,
        fixture_root: fixture.root,
        outcome,
        reports,
    })
}

/// Execute steps in order, stopping at the first failure: later steps depend
/// on the page state the failed step was meant to establish.
fn execute_steps(
    browser: &Browser,
    fixture: &FixtureProject,
    steps: &[Step],
    server_port: u16,
) -> Vec<StepReport> {
    let base_url = format!("http://127.0.0.1:{server_port}/");
    let mut reports = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let label = step.label();
        debug!(index, step = %label, "executing step");
        match execute_step(browser, fixture, step, &base_url) {
            Ok(()) => reports.push(StepReport {
                index,
                label,
                passed: true,
                detail: None,
            }),
            Err(err) => {
                let detail = format!("{err:#}");
                warn!(index, step = %label, err = %detail, "step failed");
                reports.push(StepReport {
                    index,
                    label,
                    passed: false,
                    detail: Some(detail),
                });
                break;
            }
        }
    }
    reports
}

fn execute_step(
    browser: &Browser,
    fixture: &FixtureProject,
    step: &Step,
    base_url: &str,
) -> Result<()> {
    match step {
        Step::Navigate => browser.goto(base_url),
        Step::AwaitNetworkIdle => browser.wait_for_network_idle(),
        Step::ExpectText { selector, expected } => browser.wait_until_text(selector, expected),
        Step::ExpectValue { selector, expected } => browser.wait_until_value(selector, expected),
        Step::TypeInto { selector, text } => browser.type_into(selector, text),
        Step::EditFile { path, edit } => {
            transform_file(&fixture.path(path), |contents| edit.apply(contents))
        }
    }
}
