use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use ledger_abci::{app::TxOutcome, bin_utils::Service, config::AppConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replays a CSV transaction log through the account ledger and prints the resulting accounts.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// CSV file with `block,type,id,pub_key,sender,public_data,private_data` columns
    input: PathBuf,
    /// JSON application config
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => AppConfig::from_path(path)
            .with_context(|| format!("Failed to load config `{}`", path.display()))?,
        None => AppConfig::default(),
    };
    let file = File::open(&cli.input)
        .with_context(|| format!("Failed to open `{}`", cli.input.display()))?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        config,
        error_printer: Box::new(|line, outcome| match outcome {
            TxOutcome::Rejected(err) => eprintln!("Rejected at line {line}: {err}"),
            TxOutcome::Failed(err) => eprintln!("Failed at line {line}: {err}"),
        }),
    };
    if let Some(commit) = service.run()? {
        info!(height = commit.height, app_hash = %commit.app_hash_hex(), "replay finished");
    }
    Ok(())
}
