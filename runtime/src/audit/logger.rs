//! JSONL run ledger: one line per completed harvest.

use crate::config::InitialData;
use crate::harvest::pipeline::HarvestOutcome;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A single completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub timestamp: String,
    pub target_institution: u32,
    pub year: u32,
    pub departments: usize,
    pub institutions: usize,
    pub courses: usize,
    pub equivalents: usize,
    pub institutions_skipped: usize,
    pub failed_departments: Vec<String>,
    pub duration_ms: u64,
    pub output: PathBuf,
}

impl RunRecord {
    pub fn from_outcome(
        initial: &InitialData,
        institutions: usize,
        outcome: &HarvestOutcome,
        elapsed: Duration,
        output: &Path,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            target_institution: initial.target_institution_id,
            year: initial.year_id,
            departments: initial.departments.len(),
            institutions,
            courses: outcome.transfers.len(),
            equivalents: outcome.transfers.equivalent_count(),
            institutions_skipped: outcome.institutions_skipped(),
            failed_departments: outcome.failed_departments.clone(),
            duration_ms: duration_ms(elapsed),
            output: output.to_path_buf(),
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Append-only JSONL ledger.
pub struct RunLedger {
    file: File,
}

impl RunLedger {
    /// Open or create the ledger file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open run ledger: {}", path.display()))?;

        Ok(Self { file })
    }

    /// Append one record.
    pub fn append(&mut self, record: &RunRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        writeln!(self.file, "{json}")?;
        Ok(())
    }
}
