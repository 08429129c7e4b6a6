//! Headless-browser driving over WebDriver.
//!
//! A chromedriver child (or an externally managed endpoint) provides the
//! WebDriver session; [`Browser`] wraps the async `fantoccini` client behind
//! a blocking facade so scenario code stays a single sequential thread. The
//! facade owns a dedicated current-thread runtime and blocks on one command
//! at a time.

use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Value, json};
use tokio::runtime::Runtime;
use tracing::{debug, instrument};

use crate::config::HarnessConfig;
use crate::port;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A managed `chromedriver` child bound to a free port. Killed on drop.
#[derive(Debug)]
pub struct ChromeDriver {
    child: Option<Child>,
    port: u16,
}

impl ChromeDriver {
    #[instrument(skip_all)]
    pub fn spawn(command: &str, startup_timeout: Duration) -> Result<Self> {
        let port = port::free_port()?;
        debug!(command, port, "starting chromedriver");
        let child = Command::new(command)
            .arg(format!("--port={port}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn {command}"))?;
        let driver = Self {
            child: Some(child),
            port,
        };
        port::wait_for_port(port, startup_timeout).context("chromedriver did not become ready")?;
        Ok(driver)
    }

    /// WebDriver endpoint URL.
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill() {
                debug!(err = %err, "chromedriver kill on drop failed");
            }
            let _ = child.wait();
        }
    }
}

/// A live browser session plus the chromedriver that backs it.
///
/// Field order matters: the session closes before its endpoint goes away.
#[derive(Debug)]
pub struct BrowserSession {
    pub browser: Browser,
    _driver: Option<ChromeDriver>,
}

/// Open a session per the config: connect to `webdriver_url` when set,
/// otherwise spawn and manage a chromedriver child.
pub fn open_session(config: &HarnessConfig) -> Result<BrowserSession> {
    let (driver, url) = match &config.webdriver_url {
        Some(url) => (None, url.clone()),
        None => {
            let driver = ChromeDriver::spawn(&config.chromedriver_command, config.startup_timeout())?;
            let url = driver.url();
            (Some(driver), url)
        }
    };
    let browser = Browser::connect(&url, config)?;
    Ok(BrowserSession {
        browser,
        _driver: driver,
    })
}

/// Chrome capability map for a new WebDriver session.
pub fn chrome_capabilities(headless: bool) -> serde_json::Map<String, Value> {
    let mut args = vec![
        "--disable-gpu".to_string(),
        "--window-size=1280,720".to_string(),
    ];
    if headless {
        args.insert(0, "--headless=new".to_string());
    }
    let mut caps = serde_json::Map::new();
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}

/// Blocking facade over a WebDriver client.
pub struct Browser {
    runtime: Runtime,
    client: Client,
    closed: bool,
    quiet: Duration,
    idle_timeout: Duration,
    assert_timeout: Duration,
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Browser {
    /// Start a session against the given WebDriver endpoint.
    #[instrument(skip_all, fields(webdriver_url))]
    pub fn connect(webdriver_url: &str, config: &HarnessConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("build webdriver runtime")?;
        let mut builder = ClientBuilder::rustls().context("init rustls webdriver connector")?;
        builder.capabilities(chrome_capabilities(config.headless));
        let client = runtime
            .block_on(builder.connect(webdriver_url))
            .with_context(|| format!("connect to webdriver at {webdriver_url}"))?;
        Ok(Self {
            runtime,
            client,
            closed: false,
            quiet: config.network_quiet(),
            idle_timeout: config.network_idle_timeout(),
            assert_timeout: config.assertion_timeout(),
        })
    }

    pub fn goto(&self, url: &str) -> Result<()> {
        debug!(url, "navigate");
        self.runtime
            .block_on(self.client.goto(url))
            .with_context(|| format!("navigate to {url}"))
    }

    pub fn title(&self) -> Result<String> {
        self.runtime.block_on(self.client.title()).context("read page title")
    }

    /// Visible text of the first element matching the CSS selector.
    pub fn text_of(&self, selector: &str) -> Result<String> {
        self.runtime
            .block_on(async {
                let element = self.client.find(Locator::Css(selector)).await?;
                element.text().await
            })
            .with_context(|| format!("read text of {selector}"))
    }

    /// Current `value` property of the first element matching the selector.
    pub fn value_of(&self, selector: &str) -> Result<String> {
        let value = self
            .runtime
            .block_on(async {
                let element = self.client.find(Locator::Css(selector)).await?;
                element.prop("value").await
            })
            .with_context(|| format!("read value of {selector}"))?;
        Ok(value.unwrap_or_default())
    }

    /// Send keystrokes to the first element matching the selector.
    pub fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        debug!(selector, text, "type");
        self.runtime
            .block_on(async {
                let element = self.client.find(Locator::Css(selector)).await?;
                element.send_keys(text).await
            })
            .with_context(|| format!("type into {selector}"))
    }

    pub fn click(&self, selector: &str) -> Result<()> {
        self.runtime
            .block_on(async {
                let element = self.client.find(Locator::Css(selector)).await?;
                element.click().await
            })
            .with_context(|| format!("click {selector}"))
    }

    /// Run a script in the page and return its result.
    pub fn execute(&self, script: &str) -> Result<Value> {
        self.runtime
            .block_on(self.client.execute(script, Vec::new()))
            .context("execute script")
    }

    /// Wait until the page stops issuing network requests.
    ///
    /// There is no push signal from the dev server, so idleness is inferred
    /// from the page's resource-timing entries: once the count stops growing
    /// for the quiet window, the page counts as idle.
    #[instrument(skip(self))]
    pub fn wait_for_network_idle(&self) -> Result<()> {
        let deadline = Instant::now() + self.idle_timeout;
        let mut tracker = IdleTracker::new(self.quiet);
        loop {
            let count = self.resource_count()?;
            if tracker.observe(count, Instant::now()) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                bail!(
                    "page network activity did not settle within {}s",
                    self.idle_timeout.as_secs()
                );
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Poll until the element's text equals `expected`.
    pub fn wait_until_text(&self, selector: &str, expected: &str) -> Result<()> {
        self.wait_until(selector, expected, "text", |browser| {
            browser.text_of(selector)
        })
    }

    /// Poll until the element's value equals `expected`.
    pub fn wait_until_value(&self, selector: &str, expected: &str) -> Result<()> {
        self.wait_until(selector, expected, "value", |browser| {
            browser.value_of(selector)
        })
    }

    fn wait_until<F>(&self, selector: &str, expected: &str, what: &str, read: F) -> Result<()>
    where
        F: Fn(&Browser) -> Result<String>,
    {
        let deadline = Instant::now() + self.assert_timeout;
        let mut last = read(self)?;
        loop {
            if last == expected {
                return Ok(());
            }
            if Instant::now() >= deadline {
                bail!(
                    "{what} of {selector} was {last:?}, expected {expected:?} after {}s",
                    self.assert_timeout.as_secs()
                );
            }
            thread::sleep(POLL_INTERVAL);
            last = read(self)?;
        }
    }

    /// End the WebDriver session.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.runtime
            .block_on(self.client.clone().close())
            .context("close webdriver session")
    }

    fn resource_count(&self) -> Result<u64> {
        let value =
            self.execute("return window.performance.getEntriesByType('resource').length;")?;
        value
            .as_u64()
            .ok_or_else(|| anyhow!("resource count was not a number: {value}"))
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.runtime.block_on(self.client.clone().close()) {
            debug!(err = %err, "webdriver session close on drop failed");
        }
    }
}

/// Decides when sampled resource counts have been stable long enough.
#[derive(Debug)]
pub struct IdleTracker {
    quiet: Duration,
    last_count: Option<u64>,
    stable_since: Option<Instant>,
}

impl IdleTracker {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_count: None,
            stable_since: None,
        }
    }

    /// Feed one sample; returns true once the count has been unchanged for
    /// the whole quiet window.
    pub fn observe(&mut self, count: u64, now: Instant) -> bool {
        match (self.last_count, self.stable_since) {
            (Some(last), Some(since)) if last == count => now.duration_since(since) >= self.quiet,
            _ => {
                self.last_count = Some(count);
                self.stable_since = Some(now);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_toggle_headless_flag() {
        let caps = chrome_capabilities(true);
        let args = caps["goog:chromeOptions"]["args"]
            .as_array()
            .expect("args array")
            .clone();
        assert_eq!(args[0], "--headless=new");

        let caps = chrome_capabilities(false);
        let args = caps["goog:chromeOptions"]["args"]
            .as_array()
            .expect("args array")
            .clone();
        assert!(!args.iter().any(|arg| arg == "--headless=new"));
    }

    #[test]
    fn idle_tracker_requires_full_quiet_window() {
        let quiet = Duration::from_millis(500);
        let start = Instant::now();
        let mut tracker = IdleTracker::new(quiet);

        assert!(!tracker.observe(3, start), "first sample starts the window");
        assert!(
            !tracker.observe(3, start + Duration::from_millis(200)),
            "stable but window not elapsed"
        );
        assert!(
            tracker.observe(3, start + Duration::from_millis(600)),
            "stable for the whole window"
        );
    }

    #[test]
    fn idle_tracker_resets_on_new_activity() {
        let quiet = Duration::from_millis(500);
        let start = Instant::now();
        let mut tracker = IdleTracker::new(quiet);

        tracker.observe(3, start);
        assert!(
            !tracker.observe(4, start + Duration::from_millis(400)),
            "new request resets the window"
        );
        assert!(
            !tracker.observe(4, start + Duration::from_millis(700)),
            "only 300ms stable since the reset"
        );
        assert!(tracker.observe(4, start + Duration::from_millis(900)));
    }
}
