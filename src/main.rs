//! Change Notifier - subscription-filtered notifications for RDF data changes
//!
//! Runs the HTTP service that receives change batches, or flushes one
//! batched frequency from the command line (for cron-style schedulers).

use anyhow::{Context, Result};
use change_notifier::{
    config::NotifierConfig,
    gateway::{build_state, serve, shutdown_signal},
    subscription::Frequency,
};
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "change-notifier")]
#[command(version)]
#[command(about = "Subscription-filtered notifications and digests for RDF data changes")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "NOTIFIER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Host to bind to (overrides the configuration)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the configuration)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Deliver pending digests for one frequency
    Flush {
        /// Batched frequency to flush
        #[arg(value_parser = batched_frequency())]
        frequency: Frequency,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

/// Only frequencies that accumulate in the outbox can be flushed
fn batched_frequency() -> impl TypedValueParser<Value = Frequency> {
    PossibleValuesParser::new(Frequency::BATCHED.map(|f| f.as_str()))
        .try_map(|value| value.parse::<Frequency>())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("change_notifier={},tower_http={}", log_level, log_level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => NotifierConfig::load(path)?,
        None => NotifierConfig::default(),
    };
    if let Ok(endpoint) = std::env::var("MU_SPARQL_ENDPOINT") {
        config.sparql.endpoint = endpoint;
    }

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(config).await?;
        }
        Commands::Flush { frequency } => {
            run_flush(config, frequency).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_server(config: NotifierConfig) -> Result<()> {
    config.validate()?;
    tracing::info!(
        sparql = %config.sparql.endpoint,
        matcher = %config.matcher.endpoint,
        "Starting change notifier"
    );

    let state = build_state(&config)
        .await
        .context("Failed to initialize the notifier")?;
    serve(state, &config.server.host, config.server.port, shutdown_signal()).await?;
    Ok(())
}

async fn run_flush(config: NotifierConfig, frequency: Frequency) -> Result<()> {
    config.validate()?;
    let state = build_state(&config)
        .await
        .context("Failed to initialize the notifier")?;

    let report = state.flusher.flush(frequency).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn show_config(config: Option<&NotifierConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
