//! On-disk source edits that drive the dev server's watch pipeline.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a file as text, apply a transform, and write the result back.
///
/// The write completes before this returns, so the dev server's watcher sees
/// the final content. No retries, no atomicity beyond the underlying write,
/// no concurrent-writer protection; read, write, and transform errors all
/// propagate to the caller.
pub fn transform_file<F>(path: &Path, transform: F) -> Result<()>
where
    F: FnOnce(&str) -> Result<String>,
{
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let next = transform(&contents)?;
    fs::write(path, next).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
