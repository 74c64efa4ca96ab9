//! # Stuck Monitor CLI (`stuckmon`)
//!
//! Serves the stuck-item checks API and reads it back from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! stuckmon --config ./config/stuckmon.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stuckmon serve` | Start the HTTP checks server |
//! | `stuckmon report <stage>` | Print one stage's stuck links |
//! | `stuckmon export <stage>` | Write the displayed rows (or one row) to CSV |
//! | `stuckmon dashboard` | Summarize all stages, optionally re-polling |
//!
//! Stages: `source-channel-analysis`, `website-scraping`,
//! `general-file-parser`, `article-classifier`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use stuck_monitor::client::ChecksClient;
use stuck_monitor::config::{self, Config};
use stuck_monitor::stage::Stage;
use stuck_monitor::{cli, server};

/// Stuck Monitor: surfaces links stuck in each stage of the ingestion pipeline.
#[derive(Parser)]
#[command(
    name = "stuckmon",
    about = "Stuck Monitor: see which links are stuck in each ingestion pipeline stage",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Required by `serve`. Client commands fall back to built-in defaults
    /// when the file does not exist; a file that fails to parse is an error.
    #[arg(long, global = true, default_value = "./config/stuckmon.toml")]
    config: PathBuf,

    /// Base URL of a running checks server; overrides `[client].base_url`.
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP checks server.
    ///
    /// Binds to `[server].bind` and answers `GET /checks/stuck-in-<stage>`,
    /// `GET /checks/summary`, and `GET /health`.
    Serve,

    /// Print the stuck links for one stage.
    ///
    /// Shows the true total, the sampled rows, and a per-country breakdown.
    /// With `--country`, only sampled rows from that country are listed.
    Report {
        /// Stage name, e.g. `website-scraping`.
        stage: Stage,

        /// Only show rows whose source channel has this country code.
        #[arg(long)]
        country: Option<String>,
    },

    /// Export stuck links for one stage as CSV.
    ///
    /// Exports every displayed row, or a single row with `--link-yid`.
    /// Refuses to write a file when there is nothing to export.
    Export {
        /// Stage name, e.g. `general-file-parser`.
        stage: Stage,

        /// Only export rows whose source channel has this country code.
        #[arg(long)]
        country: Option<String>,

        /// Export just this link.
        #[arg(long)]
        link_yid: Option<String>,

        /// Directory for the CSV file; defaults to `[client].export_dir`.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Summarize all stages with a rolled-up health count.
    Dashboard {
        /// Re-poll every N seconds until interrupted.
        #[arg(long)]
        watch: Option<u64>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let cfg = config::load_config(&cli.config)?;
            server::run_server(&cfg).await
        }
        command => run_client(command, &cli.config, cli.server).await,
    }
}

async fn run_client(
    command: Commands,
    config_path: &Path,
    server: Option<String>,
) -> anyhow::Result<()> {
    // Client commands only need to know where the server is, so a missing
    // file falls back to defaults. A file that is present must be valid.
    let cfg = if config_path.exists() {
        config::load_config(config_path)?
    } else {
        Config::minimal()
    };
    let base_url = server.unwrap_or_else(|| cfg.base_url());
    let client = ChecksClient::new(base_url);

    match command {
        Commands::Serve => {}
        Commands::Report { stage, country } => {
            cli::run_report(&client, stage, country.as_deref()).await?;
        }
        Commands::Export {
            stage,
            country,
            link_yid,
            out_dir,
        } => {
            let out_dir = out_dir.unwrap_or_else(|| cfg.client.export_dir.clone());
            cli::run_export(
                &client,
                stage,
                country.as_deref(),
                link_yid.as_deref(),
                &out_dir,
            )
            .await?;
        }
        Commands::Dashboard { watch } => {
            cli::run_dashboard(&client, watch).await?;
        }
    }

    Ok(())
}
