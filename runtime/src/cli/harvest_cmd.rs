//! `assist-transfers harvest`: fetch every department and write the map.

use crate::acquisition::articulation::ArticulationFetcher;
use crate::acquisition::directory;
use crate::acquisition::http_client::HttpClient;
use crate::audit::logger::{self, RunLedger, RunRecord};
use crate::cli::output::{self, Styled};
use crate::config::{HarvestSettings, InitialData};
use crate::harvest::pipeline::{HarvestOutcome, HarvestPipeline};
use crate::harvest::rate_limiter::RateLimiter;
use crate::persist;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Resolved inputs for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestArgs {
    pub config: PathBuf,
    pub output: PathBuf,
    pub settings: HarvestSettings,
    pub ledger: Option<PathBuf>,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub outcome: HarvestOutcome,
    pub institutions: usize,
    pub elapsed: Duration,
}

/// Load config, fetch the directory, harvest every department, write output.
///
/// Config, directory, and write failures abort before anything is written.
pub async fn execute(args: &HarvestArgs) -> Result<HarvestReport> {
    let start = Instant::now();

    let initial = Arc::new(InitialData::load(&args.config)?);
    info!(
        target_institution = initial.target_institution_id,
        year = initial.year_id,
        departments = initial.departments.len(),
        "loaded initial data"
    );

    let settings = Arc::new(args.settings.clone());
    let client = HttpClient::new(settings.request_timeout).context("failed to build HTTP client")?;

    let institutions = directory::fetch_institutions(&client, &settings)
        .await
        .context("failed to fetch institution directory")?;
    let institutions = Arc::new(institutions);

    let limiter = Arc::new(RateLimiter::from_settings(&settings));
    let fetcher = ArticulationFetcher::new(client, Arc::clone(&settings), limiter);
    let outcome = HarvestPipeline::new(Arc::new(fetcher))
        .run(Arc::clone(&initial), Arc::clone(&institutions))
        .await;

    persist::write_transfers(&args.output, &outcome.transfers)?;
    let elapsed = start.elapsed();
    info!(path = %args.output.display(), "wrote transfers");

    if let Some(path) = &args.ledger {
        let record =
            RunRecord::from_outcome(&initial, institutions.len(), &outcome, elapsed, &args.output);
        RunLedger::open(path)?.append(&record)?;
    }

    Ok(HarvestReport {
        outcome,
        institutions: institutions.len(),
        elapsed,
    })
}

/// Run the harvest command and print a summary.
pub async fn run(args: HarvestArgs) -> Result<()> {
    let report = execute(&args).await?;

    if output::is_json() {
        print_report_json(&report, &args);
        return Ok(());
    }
    if !output::is_quiet() {
        print_report(&Styled::new(), &report, &args);
    }
    Ok(())
}

fn print_report(s: &Styled, report: &HarvestReport, args: &HarvestArgs) {
    let outcome = &report.outcome;
    let skipped = outcome.institutions_skipped();

    eprintln!();
    eprintln!(
        "  Harvest complete in {}",
        output::format_duration(report.elapsed.as_secs())
    );
    eprintln!();
    output::print_check(
        s.ok_sym(),
        "Target courses:",
        &outcome.transfers.len().to_string(),
    );
    output::print_check(
        s.ok_sym(),
        "Equivalents:",
        &outcome.transfers.equivalent_count().to_string(),
    );
    output::print_check(
        s.ok_sym(),
        "Institutions:",
        &report.institutions.to_string(),
    );
    let skip_sym = if skipped > 0 { s.warn_sym() } else { s.ok_sym() };
    output::print_check(skip_sym, "Skipped fetches:", &skipped.to_string());
    if !outcome.failed_departments.is_empty() {
        output::print_check(
            s.fail_sym(),
            "Failed departments:",
            &s.red(&outcome.failed_departments.join(", ")),
        );
    }

    if output::is_verbose() {
        eprintln!();
        output::print_section(s, "Departments");
        let mut departments = outcome.departments.clone();
        departments.sort_by(|a, b| a.department.cmp(&b.department));
        for d in &departments {
            eprintln!(
                "    {:<10} {:>5} courses {:>6} equivalents  {}",
                d.department,
                d.courses,
                d.equivalents,
                s.dim(&format!(
                    "{}/{} institutions skipped",
                    d.institutions_skipped, d.institutions_attempted
                ))
            );
        }
    }

    eprintln!();
    eprintln!("  Wrote {}", s.green(&args.output.display().to_string()));
}

fn print_report_json(report: &HarvestReport, args: &HarvestArgs) {
    let outcome = &report.outcome;
    output::print_json(&serde_json::json!({
        "output": args.output,
        "courses": outcome.transfers.len(),
        "equivalents": outcome.transfers.equivalent_count(),
        "institutions": report.institutions,
        "institutions_skipped": outcome.institutions_skipped(),
        "departments": outcome.departments,
        "failed_departments": outcome.failed_departments,
        "duration_ms": logger::duration_ms(report.elapsed),
    }));
}
