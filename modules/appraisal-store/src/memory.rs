// In-process PropertyStore. Backs the test suites and dry runs.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use appraisal_common::{ConflictMode, District, Property, PropertyFilter, PropertyPatch};

use crate::error::{Result, StoreError};
use crate::store::PropertyStore;

struct MemoryInner {
    records: BTreeMap<(District, String), Property>,
    /// Any batch touching one of these accounts fails as a whole.
    failing_accounts: HashSet<String>,
    partial_upsert: bool,
    upsert_calls: usize,
}

/// Thread-safe map keyed by (district, account_number).
pub struct MemoryPropertyStore {
    inner: Mutex<MemoryInner>,
}

impl Default for MemoryPropertyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                records: BTreeMap::new(),
                failing_accounts: HashSet::new(),
                partial_upsert: true,
                upsert_calls: 0,
            }),
        }
    }

    /// Pre-populate records.
    pub fn with_records(self, records: impl IntoIterator<Item = Property>) -> Self {
        {
            let mut inner = self.lock();
            for p in records {
                inner
                    .records
                    .insert((p.district, p.account_number.clone()), p);
            }
        }
        self
    }

    /// Report no partial-upsert support, forcing callers to read-modify-write.
    pub fn without_partial_upsert(self) -> Self {
        self.lock().partial_upsert = false;
        self
    }

    /// Fail every batch that contains `account_number`.
    pub fn failing_on_account(self, account_number: &str) -> Self {
        self.lock()
            .failing_accounts
            .insert(account_number.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored record, in (district, account) order.
    pub fn snapshot(&self) -> Vec<Property> {
        self.lock().records.values().cloned().collect()
    }

    pub fn upsert_calls(&self) -> usize {
        self.lock().upsert_calls
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_batch<'a>(
        inner: &MemoryInner,
        mut accounts: impl Iterator<Item = &'a str>,
    ) -> Result<()> {
        match accounts.find(|a| inner.failing_accounts.contains(*a)) {
            Some(acct) => Err(StoreError::Other(format!(
                "injected failure for account {acct}"
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PropertyStore for MemoryPropertyStore {
    async fn upsert(&self, records: &[Property], mode: ConflictMode) -> Result<u64> {
        let mut inner = self.lock();
        inner.upsert_calls += 1;
        Self::check_batch(&inner, records.iter().map(|r| r.account_number.as_str()))?;

        let mut written = 0;
        for record in records {
            let key = (record.district, record.account_number.clone());
            match mode {
                ConflictMode::SkipExisting if inner.records.contains_key(&key) => {}
                _ => {
                    inner.records.insert(key, record.clone());
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    fn supports_partial_upsert(&self) -> bool {
        self.lock().partial_upsert
    }

    async fn upsert_partial(&self, patches: &[PropertyPatch]) -> Result<u64> {
        let mut inner = self.lock();
        if !inner.partial_upsert {
            return Err(StoreError::Unsupported("partial upsert"));
        }
        inner.upsert_calls += 1;
        Self::check_batch(&inner, patches.iter().map(|p| p.account_number.as_str()))?;

        for patch in patches {
            let record = inner
                .records
                .entry((patch.district, patch.account_number.clone()))
                .or_insert_with(|| Property::new(patch.district, patch.account_number.clone()));
            patch.apply(record);
        }
        Ok(patches.len() as u64)
    }

    async fn query(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
        let inner = self.lock();
        let matched = inner.records.values().filter(|p| filter.matches(p)).cloned();
        Ok(match filter.limit {
            Some(n) => matched.take(n).collect(),
            None => matched.collect(),
        })
    }
}
