//! End-to-end harness for a dev server's hot-reload behavior.
//!
//! The system under test is a Node.js development server (bundler, React
//! runtime, file watcher included) and stays a black box. This crate owns the
//! orchestration around it:
//!
//! - **[`fixture`]**: materialize a throwaway project tree into an isolated
//!   directory.
//! - **[`server`]**: start the project's server entry as a child process on a
//!   free port, capture its output, tear it down exactly once.
//! - **[`browser`]**: drive a real headless browser against the served pages
//!   over WebDriver.
//! - **[`mutate`]**: rewrite route source files on disk mid-run to trigger
//!   the dev server's watch/recompile pipeline.
//!
//! Control flow is strictly sequential; synchronization against the external
//! system is polling-based (TCP readiness, network quiet windows, bounded
//! DOM polls), never an explicit signal from the server.

pub mod browser;
pub mod config;
pub mod fixture;
pub mod logging;
pub mod mutate;
pub mod port;
pub mod server;
