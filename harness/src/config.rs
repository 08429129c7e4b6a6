//! Harness configuration loaded from a TOML file (by default `e2e.toml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Harness configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to values that work on a developer
/// machine with `node` and `chromedriver` on the `PATH`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Executable used to start the fixture's server entry.
    pub node_command: String,

    /// Executable used to start a WebDriver endpoint when none is given.
    pub chromedriver_command: String,

    /// Existing WebDriver endpoint to connect to instead of spawning
    /// `chromedriver_command` (e.g. `http://127.0.0.1:9515`).
    pub webdriver_url: Option<String>,

    /// Run the browser headless.
    pub headless: bool,

    /// Prepared npm project (package.json + installed node_modules) overlaid
    /// onto every fixture so the scaffolded app can actually run.
    pub template_dir: Option<PathBuf>,

    /// How long to wait for the dev server (and chromedriver) to accept
    /// connections after spawning.
    pub server_startup_timeout_secs: u64,

    /// Quiet window: the page counts as network-idle once its resource
    /// entries stop growing for this long.
    pub network_quiet_millis: u64,

    /// Upper bound on a single network-idle wait.
    pub network_idle_timeout_secs: u64,

    /// Upper bound on a single DOM assertion poll.
    pub assertion_timeout_secs: u64,

    /// In-memory tail of dev-server output kept for failure diagnostics.
    pub server_log_tail_bytes: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            chromedriver_command: "chromedriver".to_string(),
            webdriver_url: None,
            headless: true,
            template_dir: None,
            server_startup_timeout_secs: 30,
            network_quiet_millis: 500,
            network_idle_timeout_secs: 10,
            assertion_timeout_secs: 10,
            server_log_tail_bytes: 16 * 1024,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.node_command.trim().is_empty() {
            return Err(anyhow!("node_command must be non-empty"));
        }
        if self.webdriver_url.is_none() && self.chromedriver_command.trim().is_empty() {
            return Err(anyhow!(
                "chromedriver_command must be non-empty when webdriver_url is unset"
            ));
        }
        if self.server_startup_timeout_secs == 0 {
            return Err(anyhow!("server_startup_timeout_secs must be > 0"));
        }
        if self.network_quiet_millis == 0 {
            return Err(anyhow!("network_quiet_millis must be > 0"));
        }
        if self.network_idle_timeout_secs == 0 {
            return Err(anyhow!("network_idle_timeout_secs must be > 0"));
        }
        if self.assertion_timeout_secs == 0 {
            return Err(anyhow!("assertion_timeout_secs must be > 0"));
        }
        if self.server_log_tail_bytes == 0 {
            return Err(anyhow!("server_log_tail_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.server_startup_timeout_secs)
    }

    pub fn network_quiet(&self) -> Duration {
        Duration::from_millis(self.network_quiet_millis)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.network_idle_timeout_secs)
    }

    pub fn assertion_timeout(&self) -> Duration {
        Duration::from_secs(self.assertion_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, HarnessConfig::default());
    }

    #[test]
    fn loads_partial_file_over_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("e2e.toml");
        fs::write(&path, "headless = false\nnetwork_quiet_millis = 250\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert!(!cfg.headless);
        assert_eq!(cfg.network_quiet(), Duration::from_millis(250));
        assert_eq!(cfg.node_command, "node");
    }

    #[test]
    fn rejects_zero_timeouts() {
        let cfg = HarnessConfig {
            server_startup_timeout_secs: 0,
            ..HarnessConfig::default()
        };
        let err = cfg.validate().expect_err("zero timeout");
        assert!(err.to_string().contains("server_startup_timeout_secs"));
    }

    #[test]
    fn rejects_empty_chromedriver_without_external_url() {
        let cfg = HarnessConfig {
            chromedriver_command: String::new(),
            ..HarnessConfig::default()
        };
        cfg.validate().expect_err("empty chromedriver");

        let cfg = HarnessConfig {
            chromedriver_command: String::new(),
            webdriver_url: Some("http://127.0.0.1:9515".to_string()),
            ..HarnessConfig::default()
        };
        cfg.validate().expect("external url makes it valid");
    }
}
