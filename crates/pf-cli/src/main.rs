//! panelforge CLI
//!
//! Single binary for provisioning operations:
//! - Run an installation in-process from a job file
//! - Submit jobs to a running orchestrator and follow them
//! - Inspect generated artifacts and configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use panelforge::commands;
use pf_core::config;
use pf_core::Tier;

#[derive(Parser)]
#[command(name = "panelforge")]
#[command(author, version, about = "Provision web administration panels on remote Linux hosts")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a host in this process
    Install {
        /// Job file (TOML) describing the target host and panel
        job: PathBuf,
        /// SSH password for the target host
        #[arg(short, long, env = "PANELFORGE_SSH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Submit a job to a running orchestrator
    Submit {
        /// Job file (TOML) describing the target host and panel
        job: PathBuf,
        /// SSH password for the target host
        #[arg(short, long, env = "PANELFORGE_SSH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Orchestrator address (defaults to the configured bind address)
        #[arg(short, long, env = "PANELFORGE_SERVER")]
        server: Option<String>,
        /// Follow the installation until it finishes
        #[arg(short, long)]
        wait: bool,
    },

    /// Show the status of a submitted installation
    Status {
        /// Installation id
        id: String,
        /// Orchestrator address (defaults to the configured bind address)
        #[arg(short, long, env = "PANELFORGE_SERVER")]
        server: Option<String>,
        /// Print the current report as JSON and exit
        #[arg(long)]
        json: bool,
    },

    /// Cancel a running installation
    Cancel {
        /// Installation id
        id: String,
        /// Orchestrator address (defaults to the configured bind address)
        #[arg(short, long, env = "PANELFORGE_SERVER")]
        server: Option<String>,
    },

    /// List the panel files generated for a tier
    Artifacts {
        /// Service tier (free, premium, enterprise)
        #[arg(short, long, default_value = "free")]
        tier: Tier,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Install { job, password } => {
            let config = config::load_or_default(config_path)
                .with_context(|| format!("Failed to load config from {:?}", config_path))?;
            commands::install_command(config, &job, password.as_deref(), cli.quiet).await
        }
        Commands::Submit {
            job,
            password,
            server,
            wait,
        } => {
            let server = resolve_server(server, config_path)?;
            commands::submit_command(&server, &job, password.as_deref(), wait).await
        }
        Commands::Status { id, server, json } => {
            let server = resolve_server(server, config_path)?;
            commands::status_command(&server, &id, json).await
        }
        Commands::Cancel { id, server } => {
            let server = resolve_server(server, config_path)?;
            commands::cancel_command(&server, &id).await
        }
        Commands::Artifacts { tier } => commands::artifacts_command(tier),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(config_path),
            ConfigAction::Path => commands::config_path(config_path),
            ConfigAction::Init { force } => commands::config_init(config_path, force),
        },
    }
}

/// Explicit server, else the bind address from the config
fn resolve_server(server: Option<String>, config_path: Option<&std::path::Path>) -> Result<String> {
    match server {
        Some(server) => Ok(server),
        None => {
            let config = config::load_or_default(config_path)
                .with_context(|| format!("Failed to load config from {:?}", config_path))?;
            Ok(config.bind_address)
        }
    }
}
