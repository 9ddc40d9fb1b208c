use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use appraisal_common::{load_config_or_default, ConflictMode, District, Secrets};
use appraisal_ingest::{BulkIngestionPipeline, IngestOptions, IngestPlan, IngestSettings, Layout};
use appraisal_store::PgPropertyStore;

const DEFAULT_CONFIG: &str = "config/appraisal.toml";

#[derive(Parser)]
#[command(name = "appraisal-ingest", about = "Bulk-load a district's certified roll extract")]
struct Cli {
    /// District code (HCAD, DCAD, CCAD, TAD, TCAD)
    #[arg(long)]
    district: District,

    /// Primary extract, streamed row by row
    #[arg(long)]
    file: PathBuf,

    /// Auxiliary extracts joined by account, in plan order
    #[arg(long)]
    aux: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = Mode::Overwrite)]
    mode: Mode,

    /// Stop after this many imported rows
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    sample: Option<u64>,

    /// Import every property class, not just residential (HCAD)
    #[arg(long)]
    all_classes: bool,

    /// Merge only the state class into existing records
    #[arg(long)]
    state_class_only: bool,

    /// TOML layout descriptor replacing the built-in primary layout
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Path to config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run database migrations before importing
    #[arg(long)]
    migrate: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Overwrite,
    SkipExisting,
}

impl From<Mode> for ConflictMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Overwrite => ConflictMode::Overwrite,
            Mode::SkipExisting => ConflictMode::SkipExisting,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries only the summary.
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

    let settings = IngestSettings {
        appraisal_year: config.ingest.appraisal_year.clone(),
        all_classes: cli.all_classes,
    };
    let mut plan = IngestPlan::for_district(cli.district, &settings);
    if let Some(path) = &cli.layout {
        let layout = Layout::from_file(path)?;
        info!(layout = layout.name.as_str(), path = %path.display(), "Using layout descriptor");
        plan = plan.with_primary(layout);
    }

    let options = IngestOptions {
        mode: cli.mode.into(),
        sample: cli.sample,
        state_class_only: cli.state_class_only,
        ..IngestOptions::from_config(&config.ingest)
    };
    if options.state_class_only && options.mode == ConflictMode::SkipExisting {
        warn!("--mode skip-existing has no effect on state-class-only runs");
    }

    let store = PgPropertyStore::connect(secrets.require_database_url()?)
        .await
        .context("Failed to connect to Postgres")?;
    if cli.migrate {
        store.migrate().await.context("Migrations failed")?;
    }

    let pipeline = BulkIngestionPipeline::new(Arc::new(store), options);
    let summary = pipeline
        .ingest_paths(plan, &cli.file, &cli.aux)
        .await
        .with_context(|| format!("Ingestion of {} failed", cli.file.display()))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
