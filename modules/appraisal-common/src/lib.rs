pub mod classify;
pub mod config;
pub mod error;
pub mod normalize;
pub mod state_class;
pub mod types;

pub use classify::{AccountClassifier, Classification};
pub use config::{load_config, load_config_or_default, FileConfig, Secrets};
pub use error::ConfigError;
pub use normalize::{normalize_fields, Field, RawFields};
pub use state_class::map_state_class;
pub use types::*;
