//! Vigil Control - CLI for the Vigil audit engine

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};
use vigil_shared::{Category, ModuleStatus, Severity};
use vigilctl::client::DaemonClient;
use vigilctl::commands::{self, AuditOptions, ReportFilter};
use vigilctl::output;

#[derive(Parser)]
#[command(name = "vigilctl")]
#[command(about = "Vigil - module health audits with automated repair", long_about = None)]
#[command(version = vigil_shared::VERSION)]
struct Cli {
    /// Daemon address (host:port or URL)
    #[arg(long, global = true, env = "VIGIL_DAEMON", default_value = vigil_shared::DEFAULT_LISTEN_ADDR)]
    daemon: String,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one audit locally and print the report
    Audit {
        /// Config file (defaults to the standard locations)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Base URL module routes are probed against
        #[arg(long)]
        base_url: Option<String>,

        /// Seed for noise and repair outcomes, for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Modules probed at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Report only, do not attempt repairs
        #[arg(long)]
        no_repair: bool,
    },

    /// List the module catalog
    Modules {
        /// Config file to read the catalog from
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ask the daemon instead of reading local config
        #[arg(long)]
        remote: bool,
    },

    /// Show daemon health and the latest audit summary
    Status,

    /// Show items of the latest daemon audit
    Report {
        #[arg(long)]
        category: Option<Category>,

        #[arg(long)]
        status: Option<ModuleStatus>,

        #[arg(long)]
        severity: Option<Severity>,
    },

    /// Start an audit on the daemon
    Run {
        /// Wait for the audit to finish and print its report
        #[arg(long)]
        wait: bool,
    },

    /// Cancel the daemon's running audit
    Cancel,

    /// Write a default config file
    Init {
        #[arg(default_value = "vigil.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::display_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let json = cli.json;
    match cli.command {
        Commands::Audit {
            config,
            base_url,
            seed,
            concurrency,
            no_repair,
        } => {
            commands::audit(AuditOptions {
                config,
                base_url,
                seed,
                concurrency,
                no_repair,
                json,
            })
            .await
        }
        Commands::Modules { config, remote } => {
            let client = if remote {
                Some(DaemonClient::for_address(&cli.daemon)?)
            } else {
                None
            };
            commands::modules(config, client, json).await
        }
        Commands::Status => commands::status(&DaemonClient::for_address(&cli.daemon)?, json).await,
        Commands::Report {
            category,
            status,
            severity,
        } => {
            let filter = ReportFilter {
                category,
                status,
                severity,
            };
            commands::report(&DaemonClient::for_address(&cli.daemon)?, filter, json).await
        }
        Commands::Run { wait } => {
            commands::run(&DaemonClient::for_address(&cli.daemon)?, wait, json).await
        }
        Commands::Cancel => commands::cancel(&DaemonClient::for_address(&cli.daemon)?).await,
        Commands::Init { path, force } => commands::init(&path, force),
    }
}
