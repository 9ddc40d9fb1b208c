use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use appraisal_common::{load_config_or_default, Secrets};
use appraisal_connectors::ConnectorFactory;
use appraisal_equity::{EquityEngine, Resolver};
use appraisal_store::{PgPropertyStore, PropertyStore};

const DEFAULT_CONFIG: &str = "config/appraisal.toml";

#[derive(Parser)]
#[command(
    name = "appraisal-equity",
    about = "Resolve an account or address and select equity comparables"
)]
struct Cli {
    /// Account number or street address
    raw: String,

    /// Comparables to select (defaults to equity.comparables)
    #[arg(long)]
    comparables: Option<usize>,

    /// Retrieval deadline (defaults to connectors.timeout_secs)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Path to config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so stdout carries only the result.
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config_path = cli.config.clone().or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG);
        default.exists().then_some(default)
    });
    let config = load_config_or_default(config_path.as_deref())
        .with_context(|| format!("Failed to load config {:?}", config_path))?;
    let secrets = Secrets::from_env();

    let store: Arc<dyn PropertyStore> = Arc::new(
        PgPropertyStore::connect(secrets.require_database_url()?)
            .await
            .context("Failed to connect to Postgres")?,
    );
    let factory = ConnectorFactory::from_config(&config.connectors, &secrets, store.clone())?;
    let resolver = Resolver::new(factory, EquityEngine::new(store));

    let n = cli.comparables.unwrap_or(config.equity.comparables);
    let timeout = Duration::from_secs(cli.timeout_secs.unwrap_or(config.connectors.timeout_secs));
    let result = resolver
        .resolve_with_equity(&cli.raw, n, timeout)
        .await
        .with_context(|| format!("Equity analysis for {:?} failed", cli.raw))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
