//! Sending-institution directory.

use super::http_client::HttpClient;
use crate::config::HarvestSettings;
use crate::error::FetchError;
use crate::model::Institution;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct DirectoryRecord {
    id: u32,
    #[serde(default)]
    names: Vec<NameVariant>,
}

#[derive(Debug, Deserialize)]
struct NameVariant {
    name: String,
}

/// Fetch every known sending institution.
///
/// The whole directory is required: any transport, status, or decode failure
/// is returned as-is with no partial result.
pub async fn fetch_institutions(
    client: &HttpClient,
    settings: &HarvestSettings,
) -> Result<Vec<Institution>, FetchError> {
    let url = settings.directory_url();
    let resp = client.get(&url).await?.error_for_status()?;
    let institutions = parse_directory(&resp.body).map_err(|source| FetchError::Decode {
        url: url.clone(),
        source,
    })?;

    info!(count = institutions.len(), "loaded institution directory");
    Ok(institutions)
}

/// Parse a directory body, taking each record's first name variant.
pub fn parse_directory(body: &str) -> Result<Vec<Institution>, serde_json::Error> {
    let records: Vec<DirectoryRecord> = serde_json::from_str(body)?;

    Ok(records
        .into_iter()
        .filter_map(|record| match record.names.into_iter().next() {
            Some(first) => Some(Institution {
                name: first.name,
                id: record.id,
            }),
            None => {
                warn!(id = record.id, "institution has no names, skipping");
                None
            }
        })
        .collect())
}
