//! classkit - envelope inspection tool

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use classkit::SerializeConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Inspect serialized object envelopes
#[derive(Parser, Debug)]
#[command(name = "classkit", version, about = "Inspect serialized object envelopes")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate an envelope's structure and print a summary
    Inspect {
        /// Envelope JSON file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = SerializeConfig::load(args.config.as_deref()).context("Failed to load config")?;

    match args.command {
        Command::Inspect { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let envelope: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("Invalid JSON in {}", file.display()))?;

            let summary = classkit::inspect(&envelope)
                .with_context(|| format!("Invalid envelope in {}", file.display()))?;
            info!(file = %file.display(), nodes = summary.nodes, "envelope is well-formed");

            let out = if config.pretty {
                serde_json::to_string_pretty(&summary)?
            } else {
                serde_json::to_string(&summary)?
            };
            println!("{}", out);
        }
    }

    Ok(())
}
