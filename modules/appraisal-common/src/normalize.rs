// Field mapping from district-native fragments into the canonical Property.
//
// Every source family (delimited extracts, fixed-width extracts, rendered
// portal pages) produces a `RawFields` map first; `normalize_fields` is the
// single place that turns fragments into a record.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::state_class::map_state_class;
use crate::types::{District, Property};

/// A named source fragment. Layouts map columns or byte ranges onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    AccountNumber,
    RecordType,
    AppraisalYear,
    /// Pre-assembled street line, or a full address when it contains a comma.
    SitusAddress,
    StreetNumber,
    StreetHalfNumber,
    StreetPrefix,
    StreetName,
    StreetSuffix,
    Unit,
    City,
    /// "CITY, ST" text; the city is the part before the comma.
    CityState,
    Zip,
    OwnerName,
    AppraisedValue,
    MarketValue,
    LandValue,
    BuildingArea,
    YearBuilt,
    NeighborhoodCode,
    StateClass,
}

/// Trimmed, non-empty source fragments for one row or page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFields {
    values: HashMap<Field, String>,
}

impl RawFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a trimmed value. Blank values are treated as absent.
    pub fn set(&mut self, field: Field, value: &str) {
        let value = value.trim().trim_matches('"').trim();
        if value.is_empty() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value.to_string());
        }
    }

    pub fn with(mut self, field: Field, value: &str) -> Self {
        self.set(field, value);
        self
    }

    /// Set only when the field is not already present.
    pub fn set_if_absent(&mut self, field: Field, value: &str) {
        if !self.has(field) {
            self.set(field, value);
        }
    }

    /// The value, or "" when absent.
    pub fn get(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn has(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn merge_missing(&mut self, other: &RawFields) {
        for (field, value) in &other.values {
            self.values.entry(*field).or_insert_with(|| value.clone());
        }
    }
}

// --- Lenient scalar parsing ---

/// Currency/amount parse. Anything unparseable, non-finite or negative is 0.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Square footage. `None` when absent or not positive.
pub fn parse_area(raw: &str) -> Option<i64> {
    let v = parse_amount(raw).round();
    (v >= 1.0).then_some(v as i64)
}

/// Four-digit construction year. Zero placeholders are dropped.
pub fn parse_year(raw: &str) -> Option<String> {
    let t = raw.trim();
    let year = t.get(..4)?;
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if t.chars().nth(4).is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    (year != "0000").then(|| year.to_string())
}

/// Account keys: numeric districts drop separators, CCAD keeps its dashes.
pub fn normalize_account(district: District, raw: &str) -> String {
    let t = raw.trim().trim_matches('"').trim().to_ascii_uppercase();
    match district {
        District::Ccad => t,
        _ => t.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect(),
    }
}

// --- Addresses ---

static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse whitespace runs and repeated/empty comma separators.
pub fn collapse_separators(raw: &str) -> String {
    let spaced = SPACES_RE.replace_all(raw.trim(), " ");
    spaced
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Street line from fragments: "NUM[HALF] PREFIX NAME SUFFIX #UNIT".
pub fn street_line(fields: &RawFields) -> String {
    let situs = fields.get(Field::SitusAddress);
    if !situs.is_empty() {
        return collapse_separators(&situs.to_uppercase());
    }

    let number = format!(
        "{}{}",
        fields.get(Field::StreetNumber),
        fields.get(Field::StreetHalfNumber)
    );
    let mut street = [
        number.as_str(),
        fields.get(Field::StreetPrefix),
        fields.get(Field::StreetName),
        fields.get(Field::StreetSuffix),
    ]
    .iter()
    .filter(|p| !p.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ");

    let unit = fields.get(Field::Unit);
    if !unit.is_empty() && !street.is_empty() {
        street.push_str(" #");
        street.push_str(unit);
    }
    collapse_separators(&street.to_uppercase())
}

/// Single-line address "STREET, CITY, TX, ZIP5". Empty when there is no street;
/// just the street when neither city nor zip is known.
pub fn build_address(fields: &RawFields) -> String {
    let street = street_line(fields);
    if street.is_empty() {
        return String::new();
    }
    // A situs value with a comma already carries its city/state/zip.
    if street.contains(',') {
        return street;
    }

    let city = match fields.get(Field::City) {
        "" => fields
            .get(Field::CityState)
            .split_once(',')
            .map(|(city, _)| city)
            .unwrap_or(""),
        city => city,
    };
    let zip: String = fields.get(Field::Zip).chars().take(5).collect();
    if city.trim().is_empty() && zip.is_empty() {
        return street;
    }

    let city = city.trim().to_uppercase();
    collapse_separators(
        &[street.as_str(), city.as_str(), "TX", zip.as_str()]
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", "),
    )
}

static HCAD_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)HCAD\s*Account").expect("valid regex"));

/// Clean a user-typed address and make sure it names the district's city.
pub fn normalize_free_address(raw: &str, district: District) -> String {
    let stripped = HCAD_LABEL_RE.replace_all(raw.trim(), "");
    let cleaned = stripped.trim_start_matches(|c: char| !c.is_alphanumeric());
    if cleaned.is_empty() {
        return String::new();
    }

    let city = district.default_city();
    let tail = format!("{city}, TX");
    let mut out = collapse_separators(cleaned);
    if !out.to_lowercase().contains(&city.to_lowercase()) {
        out = format!("{out}, {tail}");
    }

    let doubled = format!(", {tail}, {tail}");
    if out.contains(&doubled) {
        out = out.replace(&doubled, &format!(", {tail}"));
    }
    out
}

/// Reject placeholders and account numbers posing as addresses.
pub fn is_real_address(address: &str) -> bool {
    const PLACEHOLDERS: &[&str] = &["HCAD Account", "Example St", "Placeholder", "00000"];

    let t = address.trim();
    if t.is_empty() || PLACEHOLDERS.iter().any(|p| t.contains(p)) {
        return false;
    }
    let first_token = t
        .split(',')
        .next()
        .and_then(|s| s.split_whitespace().next())
        .unwrap_or("");
    if first_token.len() >= 8 && first_token.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    t.chars().any(char::is_alphabetic)
}

// --- Record assembly ---

/// Build a canonical record. `None` only when the account field is empty.
pub fn normalize_fields(district: District, fields: &RawFields) -> Option<Property> {
    let account = normalize_account(district, fields.get(Field::AccountNumber));
    if account.is_empty() {
        return None;
    }

    let owner_name = Some(collapse_whitespace(fields.get(Field::OwnerName))).filter(|s| !s.is_empty());
    let neighborhood_code =
        Some(fields.get(Field::NeighborhoodCode).to_uppercase()).filter(|s| !s.is_empty());

    Some(Property {
        account_number: account,
        district,
        address: build_address(fields),
        owner_name,
        appraised_value: parse_amount(fields.get(Field::AppraisedValue)),
        market_value: parse_amount(fields.get(Field::MarketValue)),
        land_value: parse_amount(fields.get(Field::LandValue)),
        building_area: parse_area(fields.get(Field::BuildingArea)),
        year_built: parse_year(fields.get(Field::YearBuilt)),
        neighborhood_code,
        state_class: map_state_class(district, fields.get(Field::StateClass)),
        last_updated: Utc::now(),
    })
}

fn collapse_whitespace(raw: &str) -> String {
    SPACES_RE.replace_all(raw.trim(), " ").into_owned()
}
