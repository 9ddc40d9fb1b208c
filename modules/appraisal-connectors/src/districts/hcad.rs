// HCAD has no live surface this system uses; its roll is bulk-loaded and
// read back from the store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use appraisal_common::normalize::normalize_account;
use appraisal_common::{District, Property, PropertyFilter};
use appraisal_store::PropertyStore;

use crate::connector::DistrictConnector;
use crate::error::{ConnectorError, Result};

const STREET_SEARCH_LIMIT: usize = 50;

pub struct HcadConnector {
    store: Arc<dyn PropertyStore>,
}

impl HcadConnector {
    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DistrictConnector for HcadConnector {
    fn district(&self) -> District {
        District::Hcad
    }

    async fn fetch_by_account(&self, account: &str) -> Result<Property> {
        let account = normalize_account(District::Hcad, account);
        info!(district = "HCAD", account = account.as_str(), "Fetching from store");
        self.store
            .get(District::Hcad, &account)
            .await?
            .ok_or(ConnectorError::NotFound(account))
    }

    async fn find_by_street(&self, street_name: &str) -> Result<Vec<Property>> {
        let filter = PropertyFilter::street(District::Hcad, street_name.trim())
            .with_limit(STREET_SEARCH_LIMIT);
        Ok(self.store.query(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appraisal_store::MemoryPropertyStore;

    fn store_with(accounts: &[(&str, &str)]) -> Arc<dyn PropertyStore> {
        let records = accounts.iter().map(|(acct, addr)| {
            let mut p = Property::new(District::Hcad, *acct);
            p.address = addr.to_string();
            p
        });
        Arc::new(MemoryPropertyStore::new().with_records(records))
    }

    #[tokio::test]
    async fn fetch_reads_the_store() {
        let connector = HcadConnector::new(store_with(&[("0660460450034", "1 MAIN ST")]));
        let p = connector.fetch_by_account("066-046-045-0034").await.unwrap();
        assert_eq!(p.address, "1 MAIN ST");
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let connector = HcadConnector::new(store_with(&[]));
        let err = connector.fetch_by_account("0660460450034").await.unwrap_err();
        assert!(matches!(err, ConnectorError::NotFound(a) if a == "0660460450034"));
    }

    #[tokio::test]
    async fn street_search_matches_substring() {
        let connector = HcadConnector::new(store_with(&[
            ("1", "10 LAMONTE LN, HOUSTON, TX, 77018"),
            ("2", "12 LAMONTE LN, HOUSTON, TX, 77018"),
            ("3", "5 ELM ST, HOUSTON, TX, 77018"),
        ]));
        let found = connector.find_by_street("lamonte ln").await.unwrap();
        assert_eq!(found.len(), 2);
    }
}
