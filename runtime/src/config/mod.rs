//! Run configuration: the institution/department data file and the
//! settings that shape how the remote API is queried.

use crate::model::Department;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default location of the data file.
pub const DEFAULT_DATA_FILE: &str = "assist-data.json";

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://assist.org";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Target institution, academic year, and the departments to harvest.
///
/// Loaded once at startup and shared read-only with every task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialData {
    /// Id of the receiving (target) institution.
    #[serde(rename = "ucsc_id", alias = "target_institution_id")]
    pub target_institution_id: u32,
    /// Academic year id used in agreement keys.
    #[serde(rename = "current_year", alias = "year_id")]
    pub year_id: u32,
    /// Department name -> department id.
    pub departments: HashMap<String, u32>,
}

impl InitialData {
    /// Load the data file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read data file: {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid data file: {}", path.display()))
    }

    /// Parse from a JSON string. An empty department map is valid.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("malformed JSON")
    }

    /// Configured departments, sorted by name for stable task launch order.
    pub fn departments(&self) -> Vec<Department> {
        let mut departments: Vec<Department> = self
            .departments
            .iter()
            .map(|(name, &id)| Department {
                name: name.clone(),
                id,
            })
            .collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        departments
    }
}

/// How the remote API is queried.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    /// API host, e.g. `https://assist.org`.
    pub base_url: Url,
    /// Per-request timeout. `None` leaves it to the transport.
    pub request_timeout: Option<Duration>,
    /// Cap on concurrent requests across all departments. `None` is unbounded.
    pub max_in_flight: Option<usize>,
    /// Minimum spacing between consecutive requests.
    pub request_delay: Duration,
}

impl HarvestSettings {
    /// Build settings from raw CLI values.
    ///
    /// A `timeout_secs` of zero disables the application-level timeout.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        max_in_flight: Option<usize>,
        delay_ms: u64,
    ) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid base URL: {base_url}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!("base URL must be http or https: {base_url}");
        }
        if max_in_flight == Some(0) {
            bail!("--max-in-flight must be at least 1");
        }

        Ok(Self {
            base_url,
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_in_flight,
            request_delay: Duration::from_millis(delay_ms),
        })
    }

    /// Institution directory endpoint.
    pub fn directory_url(&self) -> String {
        format!("{}/api/institutions", self.base())
    }

    /// Agreement endpoint for one sending institution and target department.
    pub fn agreement_url(
        &self,
        year_id: u32,
        sending_id: u32,
        target_id: u32,
        department_id: u32,
    ) -> String {
        format!(
            "{}/api/articulation/Agreements?Key={year_id}/{sending_id}/to/{target_id}/Department/{department_id}",
            self.base()
        )
    }

    fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}
