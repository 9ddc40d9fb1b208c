use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// TOML-backed tuning knobs. Every section and field has a default, so an
/// empty file (or no file) is valid. Secrets stay in env vars.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileConfig {
    pub ingest: IngestConfig,
    pub connectors: ConnectorsConfig,
    pub equity: EquityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IngestConfig {
    /// Records per upsert batch.
    pub batch_size: usize,
    /// DCAD extracts carry several years; only this one is imported.
    pub appraisal_year: String,
    /// Batches buffered between the reader thread and the store writer.
    pub channel_depth: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            appraisal_year: "2025".to_string(),
            channel_depth: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ConnectorsConfig {
    pub timeout_secs: u64,
    /// Rendered pages are written here for diagnostics when set.
    pub capture_dir: Option<PathBuf>,
    pub socrata_base_url: String,
    pub socrata_dataset: String,
    pub dcad_base_url: String,
    pub tad_base_url: String,
    pub tcad_base_url: String,
}

impl Default for ConnectorsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            capture_dir: None,
            socrata_base_url: "https://data.texas.gov".to_string(),
            socrata_dataset: "vffy-snc6".to_string(),
            dcad_base_url: "https://www.dallascad.org".to_string(),
            tad_base_url: "https://www.tad.org".to_string(),
            tcad_base_url: "https://travis.prodigycad.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EquityConfig {
    /// How many comparables to select when the caller does not say.
    pub comparables: usize,
}

impl Default for EquityConfig {
    fn default() -> Self {
        Self { comparables: 5 }
    }
}

impl FileConfig {
    fn validate(self) -> Result<Self> {
        if self.ingest.batch_size == 0 {
            return Err(ConfigError::Invalid("ingest.batch_size must be positive".into()));
        }
        if self.ingest.channel_depth == 0 {
            return Err(ConfigError::Invalid("ingest.channel_depth must be positive".into()));
        }
        if self.connectors.timeout_secs == 0 {
            return Err(ConfigError::Invalid("connectors.timeout_secs must be positive".into()));
        }
        Ok(self)
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content).map_err(|e| match e {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

pub fn parse_config(content: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: PathBuf::new(),
        source,
    })?;
    config.validate()
}

/// `load_config` when a path was given, defaults otherwise.
pub fn load_config_or_default(path: Option<&Path>) -> Result<FileConfig> {
    match path {
        Some(p) => load_config(p),
        None => Ok(FileConfig::default()),
    }
}

/// Secrets and endpoints loaded from the environment (and `.env`).
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub database_url: Option<String>,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub socrata_app_token: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let secrets = Self {
            database_url: non_empty_env("DATABASE_URL"),
            browserless_url: non_empty_env("BROWSERLESS_URL"),
            browserless_token: non_empty_env("BROWSERLESS_TOKEN"),
            socrata_app_token: non_empty_env("SOCRATA_APP_TOKEN"),
        };
        secrets.log_keys();
        secrets
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingEnv("DATABASE_URL"))
    }

    fn log_keys(&self) {
        fn preview(val: &Option<String>) -> String {
            match val {
                Some(v) => {
                    let n = v.char_indices().nth(5).map(|(i, _)| i).unwrap_or(v.len());
                    format!("{}...({} chars)", &v[..n], v.len())
                }
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Secrets loaded:");
        tracing::info!("  DATABASE_URL: {}", preview(&self.database_url));
        tracing::info!("  BROWSERLESS_URL: {}", preview(&self.browserless_url));
        tracing::info!("  BROWSERLESS_TOKEN: {}", preview(&self.browserless_token));
        tracing::info!("  SOCRATA_APP_TOKEN: {}", preview(&self.socrata_app_token));
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
