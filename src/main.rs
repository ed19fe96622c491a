//! Local trigger for the dispute pipeline.
//!
//! ```text
//! dispute-backend populate <contact>
//! dispute-backend upload <contact> <file-url> [--format pdf]
//! dispute-backend rounds <contact>
//! dispute-backend strategy <contact>
//! dispute-backend letters <contact> [--round 2] [--all-tones]
//! ```

mod cli;

use anyhow::Context;
use clap::Parser;
use dispute_engine::{DisputeEngine, EngineConfig, telemetry};
use dispute_store::{JsonFileStore, LocalBlobStore};
use reasoning_service::ReasoningClient;
use serde::Serialize;
use tracing::{Level, info};
use tracing_subscriber::{Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv(dotenvy::dotenv())?;

    let env_filter = telemetry::env_filter_with_level("info", Level::INFO)?;
    let other_crates = filter::filter_fn(|meta| !meta.target().starts_with(telemetry::TARGET_PREFIX));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(telemetry::layer())
        .with(fmt::layer().with_target(false).with_filter(other_crates))
        .try_init()?;

    let cli = Cli::parse();

    let cfg = EngineConfig::from_env().context("engine config")?;
    let reasoning = ReasoningClient::from_env().context("reasoning client config")?;
    info!(
        command = cli.command.name(),
        contact_id = cli.command.contact(),
        model = reasoning.model(),
        data_dir = %cli.data_dir.display(),
        "dispute-backend starting"
    );

    let engine = DisputeEngine::new(JsonFileStore::new(&cli.data_dir), reasoning, cfg);

    match &cli.command {
        Command::Populate { contact } => print(&engine.populate_from_report(contact).await),
        Command::Upload {
            contact,
            file_url,
            format,
        } => {
            let blobs = LocalBlobStore::new(&cli.blob_dir);
            print(&engine.populate_from_upload(&blobs, contact, file_url, *format).await)
        }
        Command::Rounds { contact } => print(&engine.assign_rounds(contact).await),
        Command::Strategy { contact } => print(&engine.generate_strategy(contact).await),
        Command::Letters(args) => {
            print(&engine.generate_letters(&args.contact, args.request()).await)
        }
    }
}

/// A missing `.env` is fine; an unreadable or malformed one is not.
fn load_dotenv<T>(result: dotenvy::Result<T>) -> anyhow::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).context("loading .env"),
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dotenv_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let result = dotenvy::from_path(dir.path().join(".env"));
        assert!(load_dotenv(result).is_ok());
    }

    #[test]
    fn malformed_dotenv_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "DISPUTE_TEST_BROKEN='unterminated\n").unwrap();
        let result = dotenvy::from_path(&path);
        assert!(load_dotenv(result).is_err());
    }
}
