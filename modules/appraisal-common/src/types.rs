use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Districts ---

/// The five Texas appraisal districts this system understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum District {
    Hcad,
    Dcad,
    Ccad,
    Tad,
    Tcad,
}

impl District {
    pub const ALL: [District; 5] = [
        District::Hcad,
        District::Dcad,
        District::Ccad,
        District::Tad,
        District::Tcad,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            District::Hcad => "HCAD",
            District::Dcad => "DCAD",
            District::Ccad => "CCAD",
            District::Tad => "TAD",
            District::Tcad => "TCAD",
        }
    }

    /// City appended to free-text addresses that omit one.
    pub fn default_city(&self) -> &'static str {
        match self {
            District::Hcad => "Houston",
            District::Dcad => "Dallas",
            District::Ccad => "Plano",
            District::Tad => "Fort Worth",
            District::Tcad => "Austin",
        }
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A district code outside the closed set of five.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown district code: {0}")]
pub struct UnknownDistrictCode(pub String);

impl FromStr for District {
    type Err = UnknownDistrictCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HCAD" => Ok(District::Hcad),
            "DCAD" => Ok(District::Dcad),
            "CCAD" => Ok(District::Ccad),
            "TAD" => Ok(District::Tad),
            "TCAD" => Ok(District::Tcad),
            _ => Err(UnknownDistrictCode(s.to_string())),
        }
    }
}

// --- Canonical property record ---

/// Coarse property type derived from the state class category letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Residential,
    Commercial,
    Unknown,
}

impl PropertyType {
    /// A/B are residential; vacant, agricultural, exempt and personal-property
    /// classes are grouped with commercial for comparable purposes.
    pub fn from_state_class(state_class: &str) -> Self {
        match state_class.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('A' | 'B') => PropertyType::Residential,
            Some('C' | 'D' | 'E' | 'F' | 'G' | 'H' | 'J' | 'K' | 'L' | 'X') => {
                PropertyType::Commercial
            }
            _ => PropertyType::Unknown,
        }
    }
}

/// The canonical property record every district is normalized into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub account_number: String,
    pub district: District,
    pub address: String,
    pub owner_name: Option<String>,
    pub appraised_value: f64,
    pub market_value: f64,
    pub land_value: f64,
    pub building_area: Option<i64>,
    pub year_built: Option<String>,
    pub neighborhood_code: Option<String>,
    pub state_class: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl Property {
    /// An empty record for `account_number`, every value at its default.
    pub fn new(district: District, account_number: impl Into<String>) -> Self {
        Self {
            account_number: account_number.into(),
            district,
            address: String::new(),
            owner_name: None,
            appraised_value: 0.0,
            market_value: 0.0,
            land_value: 0.0,
            building_area: None,
            year_built: None,
            neighborhood_code: None,
            state_class: None,
            last_updated: Utc::now(),
        }
    }

    pub fn value_per_sqft(&self) -> Option<f64> {
        match self.building_area {
            Some(area) if area > 0 => Some(self.appraised_value / area as f64),
            _ => None,
        }
    }

    pub fn property_type(&self) -> PropertyType {
        self.state_class
            .as_deref()
            .map(PropertyType::from_state_class)
            .unwrap_or(PropertyType::Unknown)
    }

    /// Neighborhood code usable as a comparable grouping key.
    pub fn cohort(&self) -> Option<&str> {
        self.neighborhood_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// A partial record. `None` fields leave the stored value untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyPatch {
    pub district: District,
    pub account_number: String,
    pub address: Option<String>,
    pub owner_name: Option<String>,
    pub appraised_value: Option<f64>,
    pub market_value: Option<f64>,
    pub land_value: Option<f64>,
    pub building_area: Option<i64>,
    pub year_built: Option<String>,
    pub neighborhood_code: Option<String>,
    pub state_class: Option<String>,
}

impl PropertyPatch {
    pub fn new(district: District, account_number: impl Into<String>) -> Self {
        Self {
            district,
            account_number: account_number.into(),
            address: None,
            owner_name: None,
            appraised_value: None,
            market_value: None,
            land_value: None,
            building_area: None,
            year_built: None,
            neighborhood_code: None,
            state_class: None,
        }
    }

    pub fn state_class_only(
        district: District,
        account_number: impl Into<String>,
        state_class: impl Into<String>,
    ) -> Self {
        Self {
            state_class: Some(state_class.into()),
            ..Self::new(district, account_number)
        }
    }

    /// Merge present fields into `target` and bump its timestamp.
    pub fn apply(&self, target: &mut Property) {
        if let Some(v) = &self.address {
            target.address = v.clone();
        }
        if let Some(v) = &self.owner_name {
            target.owner_name = Some(v.clone());
        }
        if let Some(v) = self.appraised_value {
            target.appraised_value = v;
        }
        if let Some(v) = self.market_value {
            target.market_value = v;
        }
        if let Some(v) = self.land_value {
            target.land_value = v;
        }
        if let Some(v) = self.building_area {
            target.building_area = Some(v);
        }
        if let Some(v) = &self.year_built {
            target.year_built = Some(v.clone());
        }
        if let Some(v) = &self.neighborhood_code {
            target.neighborhood_code = Some(v.clone());
        }
        if let Some(v) = &self.state_class {
            target.state_class = Some(v.clone());
        }
        target.last_updated = Utc::now();
    }
}

impl From<&Property> for PropertyPatch {
    fn from(p: &Property) -> Self {
        Self {
            district: p.district,
            account_number: p.account_number.clone(),
            address: Some(p.address.clone()),
            owner_name: p.owner_name.clone(),
            appraised_value: Some(p.appraised_value),
            market_value: Some(p.market_value),
            land_value: Some(p.land_value),
            building_area: p.building_area,
            year_built: p.year_built.clone(),
            neighborhood_code: p.neighborhood_code.clone(),
            state_class: p.state_class.clone(),
        }
    }
}

// --- Store contract shapes ---

/// Equality filters for store queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyFilter {
    pub district: Option<District>,
    pub neighborhood_code: Option<String>,
    pub account_number: Option<String>,
    /// Case-insensitive substring match against the address.
    pub street_contains: Option<String>,
    /// Maximum rows returned, in account order.
    pub limit: Option<usize>,
}

impl PropertyFilter {
    pub fn account(district: District, account_number: &str) -> Self {
        Self {
            district: Some(district),
            account_number: Some(account_number.to_string()),
            ..Default::default()
        }
    }

    pub fn neighborhood(district: District, neighborhood_code: &str) -> Self {
        Self {
            district: Some(district),
            neighborhood_code: Some(neighborhood_code.to_string()),
            ..Default::default()
        }
    }

    pub fn street(district: District, street: &str) -> Self {
        Self {
            district: Some(district),
            street_contains: Some(street.to_string()),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, p: &Property) -> bool {
        if self.district.is_some_and(|d| d != p.district) {
            return false;
        }
        if let Some(acct) = &self.account_number {
            if &p.account_number != acct {
                return false;
            }
        }
        if let Some(code) = &self.neighborhood_code {
            if p.neighborhood_code.as_deref() != Some(code.as_str()) {
                return false;
            }
        }
        if let Some(street) = &self.street_contains {
            if !p.address.to_uppercase().contains(&street.to_uppercase()) {
                return false;
            }
        }
        true
    }
}

/// What happens when an incoming record's key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictMode {
    /// Replace every field of the stored record.
    #[default]
    Overwrite,
    /// Insert only; existing accounts are left untouched.
    SkipExisting,
}

/// Outcome of one bulk ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Every data row pulled from the primary source.
    pub rows_read: u64,
    /// Rows normalized and handed to the store.
    pub rows_imported: u64,
    /// Rows rejected by an explicit filter (record type, class, year, situs).
    pub rows_filtered: u64,
    /// Batches whose upsert failed.
    pub batch_errors: u64,
}

// --- Equity ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityResult {
    pub subject: Property,
    pub comparables: Vec<Property>,
    pub justified_value_floor: f64,
}

impl EquityResult {
    pub fn has_equity_gap(&self) -> bool {
        self.justified_value_floor < self.subject.appraised_value
    }
}
