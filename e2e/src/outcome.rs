//! Step reports and run outcome classification.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
}

/// Result of one executed scenario step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepReport {
    pub index: usize,
    pub label: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Everything captured about one scenario run.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario: String,
    pub run_id: String,
    pub outcome: Outcome,
    pub steps: Vec<StepReport>,
}

/// A run passes only if every planned step executed and passed.
pub fn classify_outcome(planned_steps: usize, reports: &[StepReport]) -> Outcome {
    if reports.len() == planned_steps && reports.iter().all(|report| report.passed) {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let contents = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passed(index: usize) -> StepReport {
        StepReport {
            index,
            label: format!("step {index}"),
            passed: true,
            detail: None,
        }
    }

    #[test]
    fn pass_requires_every_planned_step() {
        assert_eq!(classify_outcome(2, &[passed(0), passed(1)]), Outcome::Pass);
        // run stopped early
        assert_eq!(classify_outcome(3, &[passed(0), passed(1)]), Outcome::Fail);
    }

    #[test]
    fn any_failed_step_fails_the_run() {
        let mut failed = passed(1);
        failed.passed = false;
        failed.detail = Some("text mismatch".to_string());
        assert_eq!(classify_outcome(2, &[passed(0), failed]), Outcome::Fail);
    }

    #[test]
    fn report_round_trips_through_json() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("report.json");
        let report = RunReport {
            scenario: "hot-reload".to_string(),
            run_id: "run-20260807_120000".to_string(),
            outcome: Outcome::Pass,
            steps: vec![passed(0)],
        };
        write_report(&path, &report).expect("write");
        let loaded: RunReport =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(loaded.outcome, Outcome::Pass);
        assert_eq!(loaded.steps, report.steps);
    }
}
