// The persistence boundary. Ingestion writes through it, the equity engine
// and bulk-only connectors read through it.

use async_trait::async_trait;

use appraisal_common::{ConflictMode, District, Property, PropertyFilter, PropertyPatch};

use crate::error::{Result, StoreError};

#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Write one batch keyed by (district, account_number). The batch is
    /// atomic: either every record lands or none does. Returns the number of
    /// rows inserted or replaced.
    async fn upsert(&self, records: &[Property], mode: ConflictMode) -> Result<u64>;

    /// Whether `upsert_partial` merges field-by-field.
    fn supports_partial_upsert(&self) -> bool {
        false
    }

    /// Merge present patch fields into stored records, inserting new
    /// accounts with defaults for absent fields.
    async fn upsert_partial(&self, _patches: &[PropertyPatch]) -> Result<u64> {
        Err(StoreError::Unsupported("partial upsert"))
    }

    /// Records matching every set field of `filter`, in account order.
    async fn query(&self, filter: &PropertyFilter) -> Result<Vec<Property>>;

    async fn get(&self, district: District, account_number: &str) -> Result<Option<Property>> {
        let mut rows = self
            .query(&PropertyFilter::account(district, account_number).with_limit(1))
            .await?;
        Ok(rows.pop())
    }
}
