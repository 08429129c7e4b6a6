//! The hot-reload scenario: fixture sources, edits, and expected DOM state.
//!
//! The fixture app lives under `e2e/fixtures/` as literal files; the steps
//! here interleave browser assertions with on-disk edits of the index route.
//! The expected strings are load-bearing: state preservation is asserted
//! only for edits that keep the component's hook call sequence unchanged,
//! and a reset is expected whenever that sequence (or the destructuring of a
//! changed hook result) differs.

use std::collections::BTreeMap;

use anyhow::{Result, bail};

use harness::fixture::{Compiler, FixtureSpec};

pub const SCENARIO_HOT_RELOAD: &str = "hot-reload";

/// Relative path of the route file every edit targets.
pub const INDEX_ROUTE_FILE: &str = "app/routes/_index.tsx";
/// Relative path of the server entry handed to the process launcher.
pub const SERVER_ENTRY_FILE: &str = "server.mjs";

const VITE_CONFIG: &str = include_str!("../fixtures/vite.config.mjs");
const SERVER_ENTRY: &str = include_str!("../fixtures/server.mjs");
const ROOT_ROUTE: &str = include_str!("../fixtures/app/root.tsx");
const INDEX_ROUTE: &str = include_str!("../fixtures/app/routes/_index.tsx");
const INDEX_ROUTE_WITH_LOADER: &str =
    include_str!("../fixtures/app/routes/_index.with-loader.tsx");

const TITLE: &str = "#index [data-title]";
const MOUNTED: &str = "#index [data-mounted]";
const HMR_STATUS: &str = "#index [data-hmr]";
const INPUT: &str = "#index input";

/// A single on-disk edit of a fixture source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Replace every occurrence of each `(from, to)` pair, in order. Errors
    /// if any `from` is absent, so a drifted fixture fails loudly instead of
    /// silently skipping the edit.
    Replace { pairs: Vec<(String, String)> },
    /// Swap the whole file for new contents.
    Overwrite { contents: String },
}

impl Edit {
    pub fn apply(&self, contents: &str) -> Result<String> {
        match self {
            Edit::Replace { pairs } => {
                let mut next = contents.to_string();
                for (from, to) in pairs {
                    if !next.contains(from.as_str()) {
                        bail!("edit pattern {:?} not found in file", from);
                    }
                    next = next.replace(from.as_str(), to);
                }
                Ok(next)
            }
            Edit::Overwrite { contents } => Ok(contents.clone()),
        }
    }
}

/// One scripted interaction with the page or the fixture tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Load `/` and wait for the page to settle.
    Navigate,
    /// Wait until the page stops issuing network requests.
    AwaitNetworkIdle,
    /// Assert an element's visible text (polled up to the assertion timeout).
    ExpectText { selector: String, expected: String },
    /// Assert an input's value property (polled up to the assertion timeout).
    ExpectValue { selector: String, expected: String },
    /// Send keystrokes to an element.
    TypeInto { selector: String, text: String },
    /// Rewrite a fixture source file to trigger the watch pipeline.
    EditFile { path: String, edit: Edit },
}

impl Step {
    /// Short label used in step reports and logs.
    pub fn label(&self) -> String {
        match self {
            Step::Navigate => "navigate".to_string(),
            Step::AwaitNetworkIdle => "await network idle".to_string(),
            Step::ExpectText { selector, expected } => {
                format!("expect text {selector} == {expected:?}")
            }
            Step::ExpectValue { selector, expected } => {
                format!("expect value {selector} == {expected:?}")
            }
            Step::TypeInto { selector, text } => format!("type {text:?} into {selector}"),
            Step::EditFile { path, .. } => format!("edit {path}"),
        }
    }
}

/// File map for the scaffolded app.
pub fn fixture_spec() -> FixtureSpec {
    let mut files = BTreeMap::new();
    files.insert("vite.config.mjs".to_string(), VITE_CONFIG.to_string());
    files.insert(SERVER_ENTRY_FILE.to_string(), SERVER_ENTRY.to_string());
    files.insert("app/root.tsx".to_string(), ROOT_ROUTE.to_string());
    files.insert(INDEX_ROUTE_FILE.to_string(), INDEX_ROUTE.to_string());
    FixtureSpec {
        compiler: Compiler::Vite,
        files,
    }
}

/// The full scripted sequence for the hot-reload scenario.
pub fn hot_reload_steps() -> Vec<Step> {
    vec![
        // setup: initial render
        Step::Navigate,
        Step::AwaitNetworkIdle,
        expect_text(TITLE, "Index"),
        // setup: hydration
        expect_text(MOUNTED, "Mounted: yes"),
        // setup: browser state
        expect_text(HMR_STATUS, "HMR updated: no"),
        type_into(INPUT, "stateful"),
        // route: HMR, unrelated input state survives
        edit_index(replace(&[("HMR updated: no", "HMR updated: yes")])),
        Step::AwaitNetworkIdle,
        expect_text(HMR_STATUS, "HMR updated: yes"),
        expect_value(INPUT, "stateful"),
        // route: add loader; the hook set changes, so Fast Refresh drops
        // component state
        edit_index(Edit::Overwrite {
            contents: INDEX_ROUTE_WITH_LOADER.to_string(),
        }),
        Step::AwaitNetworkIdle,
        expect_text(HMR_STATUS, "hello"),
        expect_value(INPUT, ""),
        type_into(INPUT, "stateful"),
        // route: HDR, loader-only edit keeps the hook sequence intact
        edit_index(replace(&[("hello", "goodbye")])),
        Step::AwaitNetworkIdle,
        expect_text(HMR_STATUS, "goodbye"),
        expect_value(INPUT, "stateful"),
        // route: renaming the destructured loader field changes hook
        // identity, resetting state once more
        edit_index(replace(&[
            (r#"json({ message: "goodbye" })"#, r#"json({ msg: "gbye" })"#),
            (
                "const { message } = useLoaderData",
                "const { msg } = useLoaderData",
            ),
            ("<p data-hmr>{message}</p>", "<p data-hmr>{msg}</p>"),
        ])),
        Step::AwaitNetworkIdle,
        expect_text(HMR_STATUS, "gbye"),
        expect_value(INPUT, ""),
    ]
}

fn expect_text(selector: &str, expected: &str) -> Step {
    Step::ExpectText {
        selector: selector.to_string(),
        expected: expected.to_string(),
    }
}

fn expect_value(selector: &str, expected: &str) -> Step {
    Step::ExpectValue {
        selector: selector.to_string(),
        expected: expected.to_string(),
    }
}

fn type_into(selector: &str, text: &str) -> Step {
    Step::TypeInto {
        selector: selector.to_string(),
        text: text.to_string(),
    }
}

fn edit_index(edit: Edit) -> Step {
    Step::EditFile {
        path: INDEX_ROUTE_FILE.to_string(),
        edit,
    }
}

fn replace(pairs: &[(&str, &str)]) -> Edit {
    Edit::Replace {
        pairs: pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walks the scenario's edits over the actual fixture sources, the same
    /// way a run applies them on disk.
    fn apply_edits_in_order() -> Vec<String> {
        let mut contents = INDEX_ROUTE.to_string();
        let mut states = Vec::new();
        for step in hot_reload_steps() {
            if let Step::EditFile { edit, .. } = step {
                contents = edit.apply(&contents).expect("edit applies");
                states.push(contents.clone());
            }
        }
        states
    }

    #[test]
    fn fixture_spec_contains_the_app() {
        let spec = fixture_spec();
        spec.validate().expect("valid spec");
        assert_eq!(spec.compiler, Compiler::Vite);
        assert!(spec.files.contains_key("vite.config.mjs"));
        assert!(spec.files.contains_key(SERVER_ENTRY_FILE));
        assert!(spec.files[INDEX_ROUTE_FILE].contains("HMR updated: no"));
        assert!(spec.files[SERVER_ENTRY_FILE].contains("process.env.NODE_ENV"));
    }

    #[test]
    fn edits_apply_cleanly_to_fixture_sources() {
        let states = apply_edits_in_order();
        assert_eq!(states.len(), 4);

        assert!(states[0].contains("HMR updated: yes"));
        assert!(!states[0].contains("HMR updated: no"));

        assert!(states[1].contains(r#"json({ message: "hello" })"#));
        assert!(states[1].contains("useLoaderData"));

        assert!(states[2].contains(r#"json({ message: "goodbye" })"#));

        assert!(states[3].contains(r#"json({ msg: "gbye" })"#));
        assert!(states[3].contains("const { msg } = useLoaderData"));
        assert!(states[3].contains("<p data-hmr>{msg}</p>"));
        assert!(!states[3].contains("{message}"));
    }

    #[test]
    fn replace_rejects_missing_pattern() {
        let edit = Edit::Replace {
            pairs: vec![("not in the file".to_string(), "anything".to_string())],
        };
        let err = edit.apply(INDEX_ROUTE).expect_err("absent pattern");
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn state_assertions_follow_hook_identity_rule() {
        let steps = hot_reload_steps();
        let values = steps
            .iter()
            .filter_map(|step| match step {
                Step::ExpectValue { expected, .. } => Some(expected.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();
        // survives HMR, resets on loader add, survives HDR, resets on rename
        assert_eq!(values, ["stateful", "", "stateful", ""]);
    }
}
