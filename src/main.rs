mod config;
mod error;
mod models;
mod pipeline;
mod publisher;
mod retry;
mod scrapers;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{Config, KafkaConfig};
use publisher::{KafkaConnector, Publisher};
use scrapers::{BlocketApi, Fetcher};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Blocket used-car listings to Kafka
#[derive(Parser, Debug)]
#[command(name = "car-scout", version, about = "Streams Blocket used-car listings to Kafka")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "car-scout.toml")]
    config: PathBuf,

    /// Kafka bootstrap servers, comma separated
    #[arg(long, value_delimiter = ',')]
    brokers: Option<Vec<String>>,

    /// Kafka topic to publish to
    #[arg(long)]
    topic: Option<String>,

    /// Log listings instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every search profile and publish the results (default)
    Run,
    /// Fetch one ad in full and publish it
    Detail {
        /// Blocket ad id
        ad_id: String,
    },
    /// Print the search profiles that would run
    Profiles,
}

/// Initialize logging; `RUST_LOG` wins over the verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();
}

/// Connect to Kafka, or fall back to dry-run mode when that fails
async fn open_publisher(config: &KafkaConfig, dry_run: bool) -> Option<Publisher> {
    if dry_run {
        info!("Dry run requested, not connecting to Kafka");
        return None;
    }

    match Publisher::connect(&KafkaConnector, config).await {
        Ok(publisher) => Some(publisher),
        Err(e) => {
            error!("Could not initialize Kafka producer: {}", e);
            info!("Running in dry-run mode (no Kafka)");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("🚗 Car Scout - Blocket used car scraper");

    let mut config = Config::load_or_default(&cli.config);
    if let Some(brokers) = cli.brokers {
        config.kafka.bootstrap_servers = brokers;
    }
    if let Some(topic) = cli.topic {
        config.kafka.topic = topic;
    }
    config.validate().context("Invalid configuration")?;

    let command = cli.command.unwrap_or(Command::Run);
    if let Command::Profiles = command {
        for (i, profile) in config.profiles.iter().enumerate() {
            println!("{}. {}", i + 1, profile.name);
            println!("   {}", toml::to_string(profile)?.trim().replace('\n', "\n   "));
            println!();
        }
        return Ok(());
    }

    let api = BlocketApi::new(&config.source).context("Failed to create Blocket client")?;
    let fetcher = Fetcher::new(api, config.source.home_location)
        .empty_on_error(config.source.empty_on_error);
    let publisher = open_publisher(&config.kafka, cli.dry_run).await;

    match command {
        Command::Detail { ad_id } => {
            if !pipeline::run_detail(&fetcher, publisher, &ad_id).await {
                anyhow::bail!("Ad {} was not published", ad_id);
            }
        }
        _ => {
            let summary =
                pipeline::run_profiles(&fetcher, publisher, &config.profiles, &config.run).await;
            summary.log();
            if summary.delivery_failed() {
                anyhow::bail!(
                    "None of {} fetched listings reached Kafka",
                    summary.fetched
                );
            }
        }
    }

    info!("Done!");
    Ok(())
}
