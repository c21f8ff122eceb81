//! Writes the final transfer map to disk.

use crate::model::TransferMap;
use anyhow::{Context, Result};
use std::path::Path;

/// Default output file name.
pub const DEFAULT_OUTPUT_FILE: &str = "transfers.json";

/// Serialize the map as pretty-printed JSON and write it to `path`.
///
/// Parent directories are created. Any failure is fatal to the run.
pub fn write_transfers(path: &Path, transfers: &TransferMap) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(transfers).context("couldn't serialize transfers")?;
    std::fs::write(path, json)
        .with_context(|| format!("couldn't write transfers to {}", path.display()))?;
    Ok(())
}
