//! Dev-server child process control.
//!
//! The server entry script is spawned as a plain child process; its
//! stdout/stderr are teed to a per-run log file (flushed line by line for
//! real-time observability) while a bounded in-memory tail is kept for
//! failure diagnostics. Readiness means the chosen TCP port accepts a
//! connection.

use std::collections::VecDeque;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, instrument, warn};
use wait_timeout::ChildExt;

use crate::port;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How to launch the server entry script.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Executable to run (usually `node`).
    pub node_command: String,
    /// Port the entry script is expected to listen on; exported as `PORT`.
    pub port: u16,
    /// Directory receiving `server.log`.
    pub log_dir: PathBuf,
    /// How long to wait for the port to open.
    pub startup_timeout: Duration,
    /// Bound on the in-memory output tail.
    pub log_tail_bytes: usize,
}

/// A running dev-server process.
///
/// The handle is terminable exactly once: [`DevServer::terminate`] consumes
/// it. Dropping a still-running handle kills the child so a failed run does
/// not leak processes.
#[derive(Debug)]
pub struct DevServer {
    child: Option<Child>,
    port: u16,
    log_path: PathBuf,
    tail: Arc<Mutex<OutputTail>>,
    drains: Vec<thread::JoinHandle<()>>,
}

impl DevServer {
    /// Spawn the entry script and wait until it listens on the chosen port.
    ///
    /// Fails (with the captured output tail) if the child exits before the
    /// port opens or the startup timeout passes.
    #[instrument(skip_all, fields(port = options.port))]
    pub fn launch(
        project_dir: &Path,
        entry_args: &[String],
        options: &LaunchOptions,
    ) -> Result<DevServer> {
        fs::create_dir_all(&options.log_dir)
            .with_context(|| format!("create log dir {}", options.log_dir.display()))?;
        let log_path = options.log_dir.join("server.log");
        let log_file = fs::File::create(&log_path)
            .with_context(|| format!("create log file {}", log_path.display()))?;
        let log_file = Arc::new(Mutex::new(BufWriter::new(log_file)));
        let tail = Arc::new(Mutex::new(OutputTail::new(options.log_tail_bytes)));

        let mut cmd = Command::new(&options.node_command);
        cmd.args(entry_args)
            .current_dir(project_dir)
            .env("PORT", options.port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(command = %options.node_command, args = ?entry_args, "spawning dev server");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn {} {:?}", options.node_command, entry_args))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;
        let drains = vec![
            spawn_drain(stdout, Arc::clone(&log_file), Arc::clone(&tail)),
            spawn_drain(stderr, Arc::clone(&log_file), Arc::clone(&tail)),
        ];

        let mut server = DevServer {
            child: Some(child),
            port: options.port,
            log_path,
            tail,
            drains,
        };
        server.wait_ready(options.startup_timeout)?;
        info!(port = server.port, "dev server ready");
        Ok(server)
    }

    /// Port the server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// OS process id, while the child is still owned.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Path of the captured server log.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Kill and reap the child. Consumes the handle, so termination can
    /// happen at most once.
    pub fn terminate(mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        debug!(port = self.port, "terminating dev server");
        child.kill().context("kill dev server")?;
        let status = child.wait().context("reap dev server")?;
        debug!(exit_code = ?status.code(), "dev server terminated");
        self.join_drains();
        Ok(())
    }

    fn wait_ready(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if port::probe(self.port) {
                return Ok(());
            }
            let child = self
                .child
                .as_mut()
                .ok_or_else(|| anyhow!("dev server child already taken"))?;
            // wait_timeout doubles as the poll sleep.
            if let Some(status) = child
                .wait_timeout(EXIT_POLL_INTERVAL)
                .context("poll dev server")?
            {
                self.join_drains();
                bail!(
                    "dev server exited with {:?} before listening on port {}\n{}",
                    status.code(),
                    self.port,
                    self.tail_text()
                );
            }
            if Instant::now() >= deadline {
                warn!(port = self.port, "dev server startup timed out");
                bail!(
                    "dev server did not listen on port {} within {}s\n{}",
                    self.port,
                    timeout.as_secs(),
                    self.tail_text()
                );
            }
        }
    }

    fn tail_text(&self) -> String {
        self.tail
            .lock()
            .map(|tail| tail.to_text())
            .unwrap_or_default()
    }

    fn join_drains(&mut self) {
        for handle in self.drains.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill() {
                debug!(err = %err, "dev server kill on drop failed");
            }
            let _ = child.wait();
        }
    }
}

/// Bounded byte tail of child output, oldest bytes dropped first.
#[derive(Debug)]
struct OutputTail {
    buf: VecDeque<u8>,
    limit: usize,
}

impl OutputTail {
    fn new(limit: usize) -> Self {
        Self {
            buf: VecDeque::new(),
            limit,
        }
    }

    fn push(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes);
        while self.buf.len() > self.limit {
            self.buf.pop_front();
        }
    }

    fn to_text(&self) -> String {
        let bytes = self.buf.iter().copied().collect::<Vec<_>>();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn spawn_drain<R: Read + Send + 'static>(
    reader: R,
    log_file: Arc<Mutex<BufWriter<fs::File>>>,
    tail: Arc<Mutex<OutputTail>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf_reader = BufReader::new(reader);
        loop {
            let mut line = Vec::new();
            let n = match buf_reader.read_until(b'\n', &mut line) {
                Ok(n) => n,
                Err(err) => {
                    warn!(err = %err, "dev server output read failed");
                    break;
                }
            };
            if n == 0 {
                break;
            }
            if let Ok(mut writer) = log_file.lock() {
                // Write and flush per line for real-time visibility.
                if let Err(err) = writer.write_all(&line) {
                    warn!(err = %err, "failed to write server log");
                } else if let Err(err) = writer.flush() {
                    warn!(err = %err, "failed to flush server log");
                }
            }
            if let Ok(mut tail) = tail.lock() {
                tail.push(&line);
            }
        }
    })
}
