// In-memory lookups built from auxiliary extracts before the primary file
// streams. Keyed by the normalized account so both sides agree on format.

use std::collections::HashMap;

use tracing::info;

use appraisal_common::normalize::{normalize_account, parse_amount, parse_year};
use appraisal_common::{District, Field, RawFields};

use crate::error::Result;
use crate::plans::{Aggregate, AuxSource};
use crate::reader::{Input, RowReader};

#[derive(Debug)]
pub struct AuxLookup {
    name: String,
    district: District,
    aggregate: Aggregate,
    rows: HashMap<String, RawFields>,
}

impl AuxLookup {
    pub fn new(district: District, name: &str, aggregate: Aggregate) -> Self {
        Self {
            name: name.to_string(),
            district,
            aggregate,
            rows: HashMap::new(),
        }
    }

    /// Read a whole auxiliary file. Rows rejected by its filters or without
    /// an account are ignored.
    pub fn load(district: District, source: &AuxSource, input: Input) -> Result<Self> {
        let mut lookup = Self::new(district, &source.layout.name, source.aggregate);
        let mut scanned = 0u64;
        for row in RowReader::open(&source.layout, input)? {
            let row = row?;
            scanned += 1;
            if source.layout.keeps(&row) {
                lookup.insert(row);
            }
        }
        info!(
            file = lookup.name.as_str(),
            rows_scanned = scanned,
            accounts = lookup.len(),
            "Loaded auxiliary lookup"
        );
        Ok(lookup)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn key(&self, fields: &RawFields) -> String {
        normalize_account(self.district, fields.get(Field::AccountNumber))
    }

    pub fn insert(&mut self, row: RawFields) {
        let key = self.key(&row);
        if key.is_empty() {
            return;
        }
        if self.aggregate == Aggregate::MainImprovement {
            if let Some(existing) = self.rows.get_mut(&key) {
                fold_improvement(existing, &row);
                return;
            }
        }
        self.rows.insert(key, row);
    }

    /// Fill fields the primary row lacks from the matching auxiliary row.
    pub fn enrich(&self, primary: &mut RawFields) {
        if let Some(aux) = self.rows.get(&self.key(primary)) {
            primary.merge_missing(aux);
        }
    }

    pub fn get(&self, account: &str) -> Option<&RawFields> {
        self.rows.get(account)
    }
}

/// Largest area wins; the year is the earliest real one seen.
fn fold_improvement(existing: &mut RawFields, row: &RawFields) {
    if parse_amount(row.get(Field::BuildingArea)) > parse_amount(existing.get(Field::BuildingArea)) {
        existing.set(Field::BuildingArea, row.get(Field::BuildingArea));
    }
    match (parse_year(existing.get(Field::YearBuilt)), parse_year(row.get(Field::YearBuilt))) {
        (None, Some(year)) => existing.set(Field::YearBuilt, &year),
        (Some(current), Some(year)) if year < current => existing.set(Field::YearBuilt, &year),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn improvement(acct: &str, year: &str, area: &str) -> RawFields {
        RawFields::new()
            .with(Field::AccountNumber, acct)
            .with(Field::YearBuilt, year)
            .with(Field::BuildingArea, area)
    }

    #[test]
    fn main_improvement_keeps_largest_area_and_earliest_year() {
        let mut lookup = AuxLookup::new(District::Tcad, "imp", Aggregate::MainImprovement);
        lookup.insert(improvement("100", "0000", "400"));
        lookup.insert(improvement("100", "1998", "1850"));
        lookup.insert(improvement("100", "1985", "220"));

        let row = lookup.get("100").unwrap();
        assert_eq!(row.get(Field::BuildingArea), "1850");
        assert_eq!(row.get(Field::YearBuilt), "1985");
    }

    #[test]
    fn last_row_wins() {
        let mut lookup = AuxLookup::new(District::Dcad, "values", Aggregate::Last);
        lookup.insert(RawFields::new().with(Field::AccountNumber, "1").with(Field::MarketValue, "10"));
        lookup.insert(RawFields::new().with(Field::AccountNumber, "1").with(Field::MarketValue, "20"));
        assert_eq!(lookup.get("1").unwrap().get(Field::MarketValue), "20");
    }

    #[test]
    fn enrich_matches_normalized_keys() {
        let mut lookup = AuxLookup::new(District::Tad, "aux", Aggregate::Last);
        lookup.insert(RawFields::new().with(Field::AccountNumber, "0465-7837").with(Field::YearBuilt, "1962"));

        let mut primary = RawFields::new().with(Field::AccountNumber, "04657837");
        lookup.enrich(&mut primary);
        assert_eq!(primary.get(Field::YearBuilt), "1962");
    }

    #[test]
    fn rows_without_account_are_ignored() {
        let mut lookup = AuxLookup::new(District::Tcad, "imp", Aggregate::Last);
        lookup.insert(RawFields::new().with(Field::YearBuilt, "1990"));
        assert!(lookup.is_empty());
    }
}
