use thiserror::Error;

use appraisal_connectors::ConnectorError;
use appraisal_store::StoreError;

#[derive(Error, Debug)]
pub enum EquityError {
    #[error("Property {0} has no neighborhood code to compare within")]
    NotComparable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of the classify, retrieve, compare flow.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Could not determine a district for {0:?}")]
    Unknown(String),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Equity(#[from] EquityError),
}

pub type Result<T> = std::result::Result<T, EquityError>;
