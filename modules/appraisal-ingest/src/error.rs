use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

/// Run-level ingestion failures. Per-row problems never surface here: bad
/// values degrade to defaults and failed batches are counted, not raised.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot open {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed delimited input: {0}")]
    Csv(#[from] csv::Error),

    #[error("layout {layout}: required column for {field} not found in header")]
    MissingColumn { layout: String, field: String },

    #[error("layout {layout}: {message}")]
    Layout { layout: String, message: String },

    #[error("invalid layout descriptor {path}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("reader task failed: {0}")]
    Reader(#[from] tokio::task::JoinError),
}

impl IngestError {
    pub(crate) fn layout(layout: &str, message: impl Into<String>) -> Self {
        IngestError::Layout {
            layout: layout.to_string(),
            message: message.into(),
        }
    }
}
