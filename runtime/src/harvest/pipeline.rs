//! Fan-out/fan-in aggregation across departments.
//!
//! One task per department, no bound on the number of tasks. Each task owns a
//! clone of the result sender and the coordinator drops its own, so the
//! channel closes exactly when every task has finished. The coordinator is the
//! only writer of the final map.

use crate::acquisition::articulation::DepartmentHarvest;
use crate::config::InitialData;
use crate::model::{Department, Institution, TransferMap};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Produces the partial map for one department.
#[async_trait]
pub trait DepartmentSource: Send + Sync + 'static {
    async fn harvest(
        &self,
        department: &Department,
        institutions: &[Institution],
        initial: &InitialData,
    ) -> DepartmentHarvest;
}

/// Per-department counts for the run summary.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DepartmentSummary {
    pub department: String,
    pub institutions_attempted: usize,
    pub institutions_skipped: usize,
    pub courses: usize,
    pub equivalents: usize,
}

/// Merged result of a whole run.
#[derive(Debug, Clone, Default)]
pub struct HarvestOutcome {
    pub transfers: TransferMap,
    /// Departments in the order their results were merged.
    pub departments: Vec<DepartmentSummary>,
    /// Departments whose task died without reporting.
    pub failed_departments: Vec<String>,
}

impl HarvestOutcome {
    pub fn institutions_skipped(&self) -> usize {
        self.departments.iter().map(|d| d.institutions_skipped).sum()
    }
}

/// Runs every configured department against a [`DepartmentSource`].
pub struct HarvestPipeline {
    source: Arc<dyn DepartmentSource>,
}

impl HarvestPipeline {
    pub fn new(source: Arc<dyn DepartmentSource>) -> Self {
        Self { source }
    }

    /// Fetch all departments concurrently and merge their partial maps.
    ///
    /// Returns once every department task has completed.
    pub async fn run(
        &self,
        initial: Arc<InitialData>,
        institutions: Arc<Vec<Institution>>,
    ) -> HarvestOutcome {
        let departments = initial.departments();
        let (tx, mut rx) = mpsc::channel::<DepartmentHarvest>(departments.len().max(1));

        info!(
            departments = departments.len(),
            institutions = institutions.len(),
            "launching department tasks"
        );

        let mut handles = Vec::with_capacity(departments.len());
        for department in departments {
            let tx = tx.clone();
            let source = Arc::clone(&self.source);
            let initial = Arc::clone(&initial);
            let institutions = Arc::clone(&institutions);
            let name = department.name.clone();

            let handle = tokio::spawn(async move {
                let harvest = source.harvest(&department, &institutions, &initial).await;
                // Receiver outlives every task; a send error means the
                // coordinator itself is gone.
                let _ = tx.send(harvest).await;
            });
            handles.push((name, handle));
        }
        drop(tx);

        let mut outcome = HarvestOutcome::default();
        while let Some(harvest) = rx.recv().await {
            outcome.departments.push(DepartmentSummary {
                department: harvest.department.clone(),
                institutions_attempted: harvest.institutions_attempted,
                institutions_skipped: harvest.institutions_skipped,
                courses: harvest.transfers.len(),
                equivalents: harvest.transfers.equivalent_count(),
            });
            outcome.transfers.merge(harvest.transfers);
        }

        let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        for (name, result) in names.into_iter().zip(join_all(handles).await) {
            if let Err(e) = result {
                warn!(department = %name, "department task failed: {e}");
                outcome.failed_departments.push(name);
            }
        }

        info!(
            courses = outcome.transfers.len(),
            equivalents = outcome.transfers.equivalent_count(),
            departments = outcome.departments.len(),
            failed = outcome.failed_departments.len(),
            skipped_institutions = outcome.institutions_skipped(),
            "harvest complete"
        );
        outcome
    }
}
