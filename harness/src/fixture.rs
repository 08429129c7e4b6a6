//! Fixture project creation.
//!
//! Each run gets an isolated throwaway project: a uniquely named directory,
//! an optional prepared-template overlay (package.json + node_modules), and
//! the scenario's literal source files written over it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};

/// Which toolchain the scaffolded app is wired for.
///
/// Selects the matching subdirectory of the template dir when one exists
/// (`<template>/vite`, `<template>/classic`); otherwise the template dir is
/// used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compiler {
    /// The framework's built-in compiler.
    Classic,
    /// The Vite-based dev server.
    Vite,
}

impl Compiler {
    pub fn as_str(self) -> &'static str {
        match self {
            Compiler::Classic => "classic",
            Compiler::Vite => "vite",
        }
    }
}

/// What to materialize: a compiler selector plus relative path → literal
/// source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSpec {
    pub compiler: Compiler,
    pub files: BTreeMap<String, String>,
}

impl FixtureSpec {
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            bail!("fixture spec must contain at least one file");
        }
        for path in self.files.keys() {
            validate_relative_path(path)?;
        }
        Ok(())
    }
}

/// An isolated, materialized fixture project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureProject {
    /// Absolute path to the project root.
    pub root: PathBuf,
    /// Directory name (scenario, timestamp, and random suffix).
    pub name: String,
}

impl FixtureProject {
    /// Absolute path of a file inside the project.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn read_file(&self, relative: &str) -> Result<String> {
        let path = self.path(relative);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    pub fn write_file(&self, relative: &str, contents: &str) -> Result<()> {
        validate_relative_path(relative)?;
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

/// Create a fixture project under `base_dir` for the given scenario.
///
/// If `template` is given, its `package.json` (and lockfile, when present)
/// are copied in and `node_modules` is symlinked, so npm installs happen
/// once out-of-band rather than per run.
pub fn create_fixture(
    base_dir: &Path,
    scenario: &str,
    spec: &FixtureSpec,
    template: Option<&Path>,
) -> Result<FixtureProject> {
    spec.validate()?;
    fs::create_dir_all(base_dir)
        .with_context(|| format!("create fixtures dir {}", base_dir.display()))?;

    let timestamp = generate_timestamp();
    let short_id = generate_short_id();
    let name = build_fixture_name(scenario, &timestamp, &short_id);
    let root = base_dir.join(&name);
    fs::create_dir_all(&root)
        .with_context(|| format!("create fixture root {}", root.display()))?;

    if let Some(template) = template {
        let template = resolve_template(template, spec.compiler);
        overlay_template(&template, &root)
            .with_context(|| format!("overlay template {}", template.display()))?;
    }

    let project = FixtureProject { root, name };
    for (relative, contents) in &spec.files {
        project.write_file(relative, contents)?;
    }
    Ok(project)
}

pub fn build_fixture_name(scenario: &str, timestamp: &str, short_id: &str) -> String {
    format!("{scenario}_{timestamp}_{short_id}")
}

fn generate_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase()
}

fn resolve_template(template: &Path, compiler: Compiler) -> PathBuf {
    let per_compiler = template.join(compiler.as_str());
    if per_compiler.is_dir() {
        per_compiler
    } else {
        template.to_path_buf()
    }
}

fn overlay_template(template: &Path, root: &Path) -> Result<()> {
    if !template.is_dir() {
        bail!("template dir {} does not exist", template.display());
    }
    for manifest in ["package.json", "package-lock.json"] {
        let source = template.join(manifest);
        if source.exists() {
            fs::copy(&source, root.join(manifest))
                .with_context(|| format!("copy {}", source.display()))?;
        }
    }
    let node_modules = template.join("node_modules");
    if node_modules.is_dir() {
        link_dir(&node_modules, &root.join("node_modules"))?;
    }
    Ok(())
}

#[cfg(unix)]
fn link_dir(source: &Path, target: &Path) -> Result<()> {
    std::os::unix::fs::symlink(source, target)
        .with_context(|| format!("symlink {} -> {}", target.display(), source.display()))
}

#[cfg(not(unix))]
fn link_dir(source: &Path, _target: &Path) -> Result<()> {
    bail!(
        "template overlay requires symlink support (cannot link {})",
        source.display()
    )
}

fn validate_relative_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        bail!("fixture file path must be non-empty");
    }
    let parsed = Path::new(path);
    if parsed.is_absolute() {
        bail!("fixture file path {} must be relative", path);
    }
    if parsed
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        bail!("fixture file path {} must not contain '..'", path);
    }
    Ok(())
}
