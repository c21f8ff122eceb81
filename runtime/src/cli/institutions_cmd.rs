//! `assist-transfers institutions`: list the sending-institution directory.

use crate::acquisition::directory;
use crate::acquisition::http_client::HttpClient;
use crate::cli::output::{self, Styled};
use crate::config::HarvestSettings;
use anyhow::{Context, Result};

/// Fetch and print every known sending institution.
pub async fn run(settings: HarvestSettings) -> Result<()> {
    let client = HttpClient::new(settings.request_timeout).context("failed to build HTTP client")?;
    let mut institutions = directory::fetch_institutions(&client, &settings)
        .await
        .context("failed to fetch institution directory")?;
    institutions.sort_by(|a, b| a.name.cmp(&b.name));

    if output::is_json() {
        output::print_json(&serde_json::json!(institutions));
        return Ok(());
    }

    let s = Styled::new();
    if !output::is_quiet() {
        output::print_header(&s);
        output::print_section(&s, &format!("{} institutions", institutions.len()));
    }
    for inst in &institutions {
        println!("{:>6}  {}", inst.id, inst.name);
    }
    Ok(())
}
