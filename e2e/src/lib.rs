//! Hot-reload end-to-end scenarios for the dev server.
//!
//! Builds on the [`harness`] crate: [`scenario`] describes the fixture app
//! and the scripted step sequence, [`run`] executes one scenario end-to-end
//! (fixture → dev server → browser → edits → teardown), [`outcome`]
//! classifies and captures the result, and [`cli`] wires it all to the `e2e`
//! binary.

pub mod cli;
pub mod outcome;
pub mod run;
pub mod scenario;
