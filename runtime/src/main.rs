use anyhow::Result;
use assist_transfers::cli::harvest_cmd::{self, HarvestArgs};
use assist_transfers::cli::{institutions_cmd, output};
use assist_transfers::config::{HarvestSettings, DEFAULT_BASE_URL, DEFAULT_DATA_FILE, DEFAULT_TIMEOUT_SECS};
use assist_transfers::persist::DEFAULT_OUTPUT_FILE;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "assist-transfers",
    version,
    about = "Harvest transfer articulations from assist.org into a per-course JSON map"
)]
struct Cli {
    /// Print a JSON summary to stdout and log as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Suppress the human-readable summary
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Show per-department detail
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every configured department and write the transfer map (default)
    Harvest(HarvestOpts),
    /// List the sending-institution directory
    Institutions(RemoteOpts),
}

#[derive(Args, Clone)]
struct RemoteOpts {
    /// API host
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout in seconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

#[derive(Args, Clone)]
struct HarvestOpts {
    /// Data file with target institution, year, and departments
    #[arg(long, short, default_value = DEFAULT_DATA_FILE)]
    config: PathBuf,

    /// Where to write the transfer map
    #[arg(long, short, default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    #[command(flatten)]
    remote: RemoteOpts,

    /// Cap on concurrent requests across all departments (default: unbounded)
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Minimum milliseconds between requests
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Append a JSONL record of this run to the given file
    #[arg(long)]
    ledger: Option<PathBuf>,
}

impl Default for HarvestOpts {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_DATA_FILE),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            remote: RemoteOpts {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            max_in_flight: None,
            delay_ms: 0,
            ledger: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Export global flags for cli::output
    if cli.json {
        std::env::set_var(output::JSON_ENV, "1");
    }
    if cli.quiet {
        std::env::set_var(output::QUIET_ENV, "1");
    }
    if cli.verbose {
        std::env::set_var(output::VERBOSE_ENV, "1");
    }
    if cli.no_color {
        std::env::set_var(output::NO_COLOR_ENV, "1");
    }

    init_tracing(cli.json);

    match cli.command.unwrap_or_else(|| Commands::Harvest(HarvestOpts::default())) {
        Commands::Harvest(opts) => {
            let settings = HarvestSettings::new(
                &opts.remote.base_url,
                opts.remote.timeout_secs,
                opts.max_in_flight,
                opts.delay_ms,
            )?;
            harvest_cmd::run(HarvestArgs {
                config: opts.config,
                output: opts.output,
                settings,
                ledger: opts.ledger,
            })
            .await
        }
        Commands::Institutions(opts) => {
            let settings = HarvestSettings::new(&opts.base_url, opts.timeout_secs, None, 0)?;
            institutions_cmd::run(settings).await
        }
    }
}

fn init_tracing(json: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = output::log_filter(rust_log.as_deref());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}
