// Equity comparables: the nearest-valued neighbors of a subject within its
// neighborhood, and the median value they justify.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use appraisal_common::{EquityResult, Property, PropertyFilter};
use appraisal_store::PropertyStore;

use crate::error::{EquityError, Result};

pub const DEFAULT_COMPARABLES: usize = 5;

#[derive(Clone)]
pub struct EquityEngine {
    store: Arc<dyn PropertyStore>,
}

impl EquityEngine {
    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self { store }
    }

    /// Pick up to `n` comparables for `subject` from its own district and
    /// neighborhood, ranked by market-value closeness.
    pub async fn select_comparables(&self, subject: &Property, n: usize) -> Result<EquityResult> {
        let Some(code) = subject.cohort() else {
            return Err(EquityError::NotComparable(subject.account_number.clone()));
        };

        let candidates = self
            .store
            .query(&PropertyFilter::neighborhood(subject.district, code))
            .await?;
        debug!(
            district = %subject.district,
            neighborhood = code,
            candidates = candidates.len(),
            "Loaded neighborhood"
        );

        let comparables = rank_comparables(subject, candidates, n);
        let floor = justified_value_floor(subject, &comparables);

        info!(
            district = %subject.district,
            account = subject.account_number.as_str(),
            comparables = comparables.len(),
            justified_value_floor = floor,
            appraised_value = subject.appraised_value,
            "Equity analysis complete"
        );

        Ok(EquityResult {
            subject: subject.clone(),
            comparables,
            justified_value_floor: floor,
        })
    }
}

/// Drop the subject, other districts, unvalued records and repeated
/// accounts, then order by |market - subject market| with account as the
/// tie-break, keeping the first `n`.
pub fn rank_comparables(
    subject: &Property,
    candidates: impl IntoIterator<Item = Property>,
    n: usize,
) -> Vec<Property> {
    let mut seen = HashSet::new();
    let mut pool: Vec<Property> = candidates
        .into_iter()
        .filter(|c| {
            c.district == subject.district
                && c.account_number != subject.account_number
                && c.market_value > 0.0
        })
        .filter(|c| seen.insert(c.account_number.clone()))
        .collect();

    let distance = |p: &Property| (p.market_value - subject.market_value).abs();
    pool.sort_by(|a, b| {
        distance(a)
            .total_cmp(&distance(b))
            .then_with(|| a.account_number.cmp(&b.account_number))
    });
    pool.truncate(n);
    pool
}

/// Median of the values: the middle one, or the mean of the two middle ones.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    })
}

/// Median comparable market value, never above the subject's appraised
/// value. With no comparables the appraised value stands.
pub fn justified_value_floor(subject: &Property, comparables: &[Property]) -> f64 {
    let values: Vec<f64> = comparables.iter().map(|c| c.market_value).collect();
    match median(&values) {
        Some(m) => m.min(subject.appraised_value),
        None => subject.appraised_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appraisal_common::District;

    fn prop(account: &str, market: f64) -> Property {
        let mut p = Property::new(District::Hcad, account);
        p.market_value = market;
        p.neighborhood_code = Some("NB12".into());
        p
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn ties_break_by_account() {
        let subject = prop("S", 100.0);
        let ranked = rank_comparables(
            &subject,
            vec![prop("C", 110.0), prop("B", 90.0), prop("A", 110.0)],
            3,
        );
        let order: Vec<_> = ranked.iter().map(|p| p.account_number.as_str()).collect();
        assert_eq!(order, ["A", "B", "C"]);
    }

    #[test]
    fn subject_duplicates_and_unvalued_are_excluded() {
        let subject = prop("S", 100.0);
        let mut other_district = prop("X", 100.0);
        other_district.district = District::Tcad;
        let ranked = rank_comparables(
            &subject,
            vec![
                prop("S", 100.0),
                prop("A", 105.0),
                prop("A", 101.0),
                prop("Z", 0.0),
                other_district,
            ],
            5,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].market_value, 105.0);
    }

    #[test]
    fn floor_is_clamped_to_appraised() {
        let mut subject = prop("S", 100.0);
        subject.appraised_value = 95.0;
        assert_eq!(justified_value_floor(&subject, &[prop("A", 120.0)]), 95.0);
        assert_eq!(justified_value_floor(&subject, &[prop("A", 80.0)]), 80.0);
        assert_eq!(justified_value_floor(&subject, &[]), 95.0);
    }
}
