use std::time::Duration;

use thiserror::Error;

use appraisal_common::types::UnknownDistrictCode;
use appraisal_store::StoreError;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Retrieval timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Unknown district: {0}")]
    UnknownDistrict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<browserless_client::BrowserlessError> for ConnectorError {
    fn from(err: browserless_client::BrowserlessError) -> Self {
        ConnectorError::UpstreamUnavailable(err.to_string())
    }
}

impl From<socrata_client::SocrataError> for ConnectorError {
    fn from(err: socrata_client::SocrataError) -> Self {
        ConnectorError::UpstreamUnavailable(err.to_string())
    }
}

impl From<UnknownDistrictCode> for ConnectorError {
    fn from(err: UnknownDistrictCode) -> Self {
        ConnectorError::UnknownDistrict(err.0)
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
