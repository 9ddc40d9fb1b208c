// The retrieval contract every district variant implements, plus deadline
// wrappers. Callers are written once against `DistrictConnector`.

use std::time::Duration;

use async_trait::async_trait;

use appraisal_common::{District, Property};

use crate::error::{ConnectorError, Result};

#[async_trait]
pub trait DistrictConnector: Send + Sync {
    fn district(&self) -> District;

    /// Retrieve one canonical record. `NotFound` when the account does not
    /// resolve, `UpstreamUnavailable` when the source cannot be reached or parsed.
    async fn fetch_by_account(&self, account: &str) -> Result<Property>;

    /// Records on a street. Variants without a search surface report `Unsupported`.
    async fn find_by_street(&self, _street_name: &str) -> Result<Vec<Property>> {
        Err(ConnectorError::Unsupported("street search"))
    }

    /// Whether the upstream source answers at all.
    async fn check_service(&self) -> bool {
        true
    }
}

/// Deadline-bounded calls. An elapsed deadline drops the in-flight future,
/// which aborts the retrieval, and surfaces `Timeout`.
#[async_trait]
pub trait ConnectorExt: DistrictConnector {
    async fn fetch_within(&self, account: &str, timeout: Duration) -> Result<Property> {
        tokio::time::timeout(timeout, self.fetch_by_account(account))
            .await
            .map_err(|_| ConnectorError::Timeout(timeout))?
    }

    async fn find_by_street_within(
        &self,
        street_name: &str,
        timeout: Duration,
    ) -> Result<Vec<Property>> {
        tokio::time::timeout(timeout, self.find_by_street(street_name))
            .await
            .map_err(|_| ConnectorError::Timeout(timeout))?
    }
}

impl<T: DistrictConnector + ?Sized> ConnectorExt for T {}
