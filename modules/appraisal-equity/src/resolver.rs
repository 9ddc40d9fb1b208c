// Raw input → district → canonical record → comparables.

use std::time::Duration;

use tracing::info;

use appraisal_common::normalize::collapse_separators;
use appraisal_common::{AccountClassifier, Classification, EquityResult, Property};
use appraisal_connectors::{ConnectorError, ConnectorExt, ConnectorFactory};

use crate::engine::EquityEngine;
use crate::error::ResolveError;

pub type Result<T> = std::result::Result<T, ResolveError>;

pub struct Resolver {
    factory: ConnectorFactory,
    engine: EquityEngine,
}

/// The street line of a free-text address (before the first comma,
/// upper-cased) and its street name (house number removed).
pub fn street_parts(raw: &str) -> (String, String) {
    let line = collapse_separators(raw.split(',').next().unwrap_or("")).to_uppercase();
    let mut tokens = line.split_whitespace().peekable();
    if tokens
        .peek()
        .is_some_and(|t| t.chars().next().is_some_and(|c| c.is_ascii_digit()))
    {
        tokens.next();
    }
    let name = tokens.collect::<Vec<_>>().join(" ");
    (line, name)
}

impl Resolver {
    pub fn new(factory: ConnectorFactory, engine: EquityEngine) -> Self {
        Self { factory, engine }
    }

    /// Classify `raw` and retrieve its record within `timeout`. Account
    /// numbers are fetched directly; addresses go through street search.
    pub async fn resolve(&self, raw: &str, timeout: Duration) -> Result<Property> {
        match AccountClassifier::classify_detailed(raw) {
            Classification::Unknown => Err(ResolveError::Unknown(raw.to_string())),
            Classification::AccountFormat(district) => {
                info!(district = %district, input = raw, "Resolving account");
                let connector = self.factory.get_connector(district);
                Ok(connector.fetch_within(raw.trim(), timeout).await?)
            }
            Classification::CityName(district) => {
                let (line, street) = street_parts(raw);
                info!(district = %district, street = street.as_str(), "Resolving address");
                if street.is_empty() {
                    return Err(ConnectorError::NotFound(raw.to_string()).into());
                }
                let connector = self.factory.get_connector(district);
                let candidates = connector.find_by_street_within(&street, timeout).await?;
                candidates
                    .into_iter()
                    .find(|p| p.address.to_uppercase().starts_with(&line))
                    .ok_or_else(|| ConnectorError::NotFound(raw.to_string()).into())
            }
        }
    }

    pub async fn resolve_with_equity(
        &self,
        raw: &str,
        n: usize,
        timeout: Duration,
    ) -> Result<EquityResult> {
        let subject = self.resolve(raw, timeout).await?;
        Ok(self.engine.select_comparables(&subject, n).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn street_parts_drop_house_number() {
        assert_eq!(
            street_parts("1204  Lamonte Ln, Dallas, TX"),
            ("1204 LAMONTE LN".to_string(), "LAMONTE LN".to_string())
        );
        assert_eq!(
            street_parts("Main St, Houston"),
            ("MAIN ST".to_string(), "MAIN ST".to_string())
        );
    }
}
