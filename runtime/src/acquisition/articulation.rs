//! Articulation fetcher: one department, every sending institution.
//!
//! Institutions are visited sequentially. Any single institution failing
//! (transport error, non-200 status, undecodable body) is skipped and the
//! department carries on with the rest.

use super::http_client::HttpClient;
use super::payload::{self, AgreementEnvelope};
use crate::config::{HarvestSettings, InitialData};
use crate::error::FetchError;
use crate::harvest::pipeline::DepartmentSource;
use crate::harvest::rate_limiter::RateLimiter;
use crate::model::{Course, Department, Institution, TransferMap};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one department's fetch produced.
#[derive(Debug, Clone, Default)]
pub struct DepartmentHarvest {
    pub department: String,
    pub transfers: TransferMap,
    pub institutions_attempted: usize,
    pub institutions_skipped: usize,
}

/// Fetches and extracts articulation agreements over HTTP.
pub struct ArticulationFetcher {
    client: HttpClient,
    settings: Arc<HarvestSettings>,
    limiter: Arc<RateLimiter>,
}

impl ArticulationFetcher {
    pub fn new(client: HttpClient, settings: Arc<HarvestSettings>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            settings,
            limiter,
        }
    }

    /// Fetch one department's agreements from every institution.
    pub async fn fetch_for_department(
        &self,
        department: &Department,
        institutions: &[Institution],
        initial: &InitialData,
    ) -> DepartmentHarvest {
        let mut harvest = DepartmentHarvest {
            department: department.name.clone(),
            ..Default::default()
        };

        for institution in institutions {
            info!(
                department = %department.name,
                institution = %institution.name,
                "fetching agreement"
            );
            harvest.institutions_attempted += 1;

            match self.fetch_agreement(department, institution, initial).await {
                Ok(envelope) => {
                    let added = collect_equivalents(&envelope, institution, &mut harvest.transfers);
                    debug!(institution = %institution.name, added, "extracted equivalents");
                }
                Err(err @ FetchError::Decode { .. }) => {
                    warn!(
                        department = %department.name,
                        institution = %institution.name,
                        "couldn't decode agreement: {err}"
                    );
                    harvest.institutions_skipped += 1;
                }
                Err(err) => {
                    debug!(
                        department = %department.name,
                        institution = %institution.name,
                        kind = err.kind(),
                        "skipping institution: {err}"
                    );
                    harvest.institutions_skipped += 1;
                }
            }
        }

        info!(
            department = %department.name,
            attempted = harvest.institutions_attempted,
            skipped = harvest.institutions_skipped,
            courses = harvest.transfers.len(),
            "department complete"
        );
        harvest
    }

    async fn fetch_agreement(
        &self,
        department: &Department,
        institution: &Institution,
        initial: &InitialData,
    ) -> Result<AgreementEnvelope, FetchError> {
        let url = self.settings.agreement_url(
            initial.year_id,
            institution.id,
            initial.target_institution_id,
            department.id,
        );

        let resp = {
            let _slot = self.limiter.acquire().await;
            self.client.get(&url).await?
        };
        let resp = resp.error_for_status()?;

        payload::decode_agreement(&resp.body).map_err(|source| FetchError::Decode { url, source })
    }
}

#[async_trait]
impl DepartmentSource for ArticulationFetcher {
    async fn harvest(
        &self,
        department: &Department,
        institutions: &[Institution],
        initial: &InitialData,
    ) -> DepartmentHarvest {
        self.fetch_for_department(department, institutions, initial).await
    }
}

/// Record the course equivalents of one decoded agreement.
///
/// Only `Course` entries count, only their first equivalence group is read,
/// and only `Course` items inside it become records. Returns how many were
/// appended.
pub fn collect_equivalents(
    envelope: &AgreementEnvelope,
    institution: &Institution,
    into: &mut TransferMap,
) -> usize {
    let mut added = 0;

    for entry in envelope.result.articulations.iter().filter(|e| e.is_course()) {
        let Some(group) = entry.first_group() else {
            continue;
        };

        let target = entry.target_course_id();
        for item in group.items.iter().filter(|i| i.is_course()) {
            into.push(
                target.clone(),
                Course {
                    dept_code: item.prefix.clone().unwrap_or_default(),
                    course_number: item.course_number.clone().unwrap_or_default(),
                    name: item.course_title.clone().filter(|t| !t.is_empty()),
                    institution_name: institution.name.clone(),
                },
            );
            added += 1;
        }
    }

    added
}
