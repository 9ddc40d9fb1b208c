// Field-mapping tables: which column or byte range feeds which canonical
// field, and which rows are rejected before normalization. A layout is
// resolved once per file against its header, never per row.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use appraisal_common::normalize::{collapse_separators, street_line};
use appraisal_common::state_class::is_residential_class;
use appraisal_common::{Field, RawFields};

use crate::error::{IngestError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    pub name: String,
    pub format: SourceFormat,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub filters: Vec<RowFilter>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum SourceFormat {
    Delimited {
        delimiter: char,
        #[serde(default = "default_has_header")]
        has_header: bool,
    },
    FixedWidth,
}

fn default_has_header() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnSpec {
    pub field: Field,
    #[serde(flatten)]
    pub source: ColumnSource,
}

/// Where a field comes from: a header name, a zero-based column index, or
/// a half-open byte range for fixed-width lines.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ColumnSource {
    Name { name: String },
    Index { index: usize },
    Range { start: usize, end: usize },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum RowFilter {
    /// Keep rows whose field equals `value`, ignoring case.
    Equals { field: Field, value: String },
    /// Keep A*/B* state classes.
    ResidentialOnly,
    NonEmpty { field: Field },
    /// Keep rows with a situs street line (number, prefix, name and suffix,
    /// or a whole situs value) whose house number is not zero.
    NumberedStreet,
}

impl RowFilter {
    pub fn keeps(&self, fields: &RawFields) -> bool {
        match self {
            RowFilter::Equals { field, value } => fields.get(*field).eq_ignore_ascii_case(value),
            RowFilter::ResidentialOnly => is_residential_class(fields.get(Field::StateClass)),
            RowFilter::NonEmpty { field } => fields.has(*field),
            RowFilter::NumberedStreet => {
                let street = street_line(fields);
                match street.split_whitespace().next() {
                    None => false,
                    Some(number) => !number.chars().all(|c| c == '0'),
                }
            }
        }
    }
}

impl ColumnSpec {
    pub fn name(field: Field, name: &str) -> Self {
        Self {
            field,
            source: ColumnSource::Name { name: name.to_string() },
        }
    }

    pub fn range(field: Field, start: usize, end: usize) -> Self {
        Self {
            field,
            source: ColumnSource::Range { start, end },
        }
    }
}

impl Layout {
    pub fn delimited(name: &str, delimiter: char) -> Self {
        Self {
            name: name.to_string(),
            format: SourceFormat::Delimited {
                delimiter,
                has_header: true,
            },
            columns: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn fixed_width(name: &str) -> Self {
        Self {
            name: name.to_string(),
            format: SourceFormat::FixedWidth,
            columns: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn column(mut self, field: Field, name: &str) -> Self {
        self.columns.push(ColumnSpec::name(field, name));
        self
    }

    pub fn range(mut self, field: Field, start: usize, end: usize) -> Self {
        self.columns.push(ColumnSpec::range(field, start, end));
        self
    }

    pub fn filter(mut self, filter: RowFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Load an external descriptor.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| IngestError::Source {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| IngestError::Descriptor {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn keeps(&self, fields: &RawFields) -> bool {
        self.filters.iter().all(|f| f.keeps(fields))
    }

    /// Bind every column to a concrete position. `header` is the first
    /// record of a delimited file that has one.
    pub fn resolve(&self, header: Option<&[String]>) -> Result<ResolvedLayout> {
        if !self.columns.iter().any(|c| c.field == Field::AccountNumber) {
            return Err(IngestError::MissingColumn {
                layout: self.name.clone(),
                field: format!("{:?}", Field::AccountNumber),
            });
        }

        let mut extracts = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            let extract = match (&self.format, &col.source) {
                (SourceFormat::FixedWidth, ColumnSource::Range { start, end }) => {
                    if start >= end {
                        return Err(IngestError::layout(
                            &self.name,
                            format!("empty byte range {start}..{end} for {:?}", col.field),
                        ));
                    }
                    Extract::Bytes(*start, *end)
                }
                (SourceFormat::FixedWidth, _) => {
                    return Err(IngestError::layout(
                        &self.name,
                        format!("{:?} needs a byte range in a fixed-width layout", col.field),
                    ));
                }
                (SourceFormat::Delimited { .. }, ColumnSource::Range { .. }) => {
                    return Err(IngestError::layout(
                        &self.name,
                        format!("{:?} uses a byte range in a delimited layout", col.field),
                    ));
                }
                (SourceFormat::Delimited { .. }, ColumnSource::Index { index }) => {
                    Extract::Column(*index)
                }
                (SourceFormat::Delimited { .. }, ColumnSource::Name { name }) => {
                    let Some(header) = header else {
                        return Err(IngestError::layout(
                            &self.name,
                            format!("column {name} named but the file has no header"),
                        ));
                    };
                    match header.iter().position(|h| h.eq_ignore_ascii_case(name)) {
                        Some(index) => Extract::Column(index),
                        None if col.field == Field::AccountNumber => {
                            return Err(IngestError::MissingColumn {
                                layout: self.name.clone(),
                                field: name.clone(),
                            });
                        }
                        None => {
                            warn!(layout = self.name.as_str(), column = name.as_str(), "Column missing from header; field left at its default");
                            continue;
                        }
                    }
                }
            };
            extracts.push((col.field, extract));
        }

        Ok(ResolvedLayout {
            name: self.name.clone(),
            extracts,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    Column(usize),
    Bytes(usize, usize),
}

/// A layout bound to one file's header.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLayout {
    pub name: String,
    pub extracts: Vec<(Field, Extract)>,
}

impl ResolvedLayout {
    /// Map one row. `cell` yields the decoded text at a position, or ""
    /// when the row is too short. Repeated fields are joined with a space.
    pub fn map_row<'a>(&self, mut cell: impl FnMut(Extract) -> std::borrow::Cow<'a, str>) -> RawFields {
        let mut fields = RawFields::new();
        for (field, extract) in &self.extracts {
            let value = cell(*extract);
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if fields.has(*field) {
                let joined = format!("{} {}", fields.get(*field), value);
                fields.set(*field, &collapse_separators(&joined));
            } else {
                fields.set(*field, value);
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_names_match_case_insensitively() {
        let layout = Layout::delimited("t", ',')
            .column(Field::AccountNumber, "ACCT")
            .column(Field::MarketValue, "Tot_Mkt_Val");
        let resolved = layout.resolve(Some(&header(&["tot_mkt_val", "acct"]))).unwrap();
        assert_eq!(
            resolved.extracts,
            vec![
                (Field::AccountNumber, Extract::Column(1)),
                (Field::MarketValue, Extract::Column(0)),
            ]
        );
    }

    #[test]
    fn missing_optional_column_is_dropped() {
        let layout = Layout::delimited("t", ',')
            .column(Field::AccountNumber, "acct")
            .column(Field::YearBuilt, "yr_impr");
        let resolved = layout.resolve(Some(&header(&["acct"]))).unwrap();
        assert_eq!(resolved.extracts.len(), 1);
    }

    #[test]
    fn missing_key_column_fails() {
        let layout = Layout::delimited("t", ',').column(Field::AccountNumber, "acct");
        let err = layout.resolve(Some(&header(&["account"]))).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { .. }));
    }

    #[test]
    fn layout_without_key_fails() {
        let layout = Layout::fixed_width("t").range(Field::MarketValue, 0, 4);
        assert!(matches!(layout.resolve(None), Err(IngestError::MissingColumn { .. })));
    }

    #[test]
    fn ranges_only_in_fixed_width() {
        let layout = Layout::delimited("t", '|').range(Field::AccountNumber, 0, 12);
        assert!(matches!(layout.resolve(None), Err(IngestError::Layout { .. })));
        let layout = Layout::fixed_width("t").column(Field::AccountNumber, "acct");
        assert!(matches!(layout.resolve(None), Err(IngestError::Layout { .. })));
    }

    #[test]
    fn repeated_fields_are_joined() {
        let layout = Layout::delimited("t", ',')
            .column(Field::AccountNumber, "a")
            .column(Field::SitusAddress, "num")
            .column(Field::SitusAddress, "street");
        let resolved = layout.resolve(Some(&header(&["a", "num", "street"]))).unwrap();
        let row = ["1", " 12 ", "OAK  ST"];
        let fields = resolved.map_row(|e| match e {
            Extract::Column(i) => row.get(i).copied().unwrap_or("").into(),
            Extract::Bytes(..) => "".into(),
        });
        assert_eq!(fields.get(Field::SitusAddress), "12 OAK ST");
    }

    #[test]
    fn filters() {
        let row = RawFields::new()
            .with(Field::RecordType, "real")
            .with(Field::StateClass, "F1")
            .with(Field::StreetNumber, "0");
        assert!(RowFilter::Equals { field: Field::RecordType, value: "REAL".into() }.keeps(&row));
        assert!(!RowFilter::ResidentialOnly.keeps(&row));
        assert!(!RowFilter::NonEmpty { field: Field::SitusAddress }.keeps(&row));
        assert!(!RowFilter::NumberedStreet.keeps(&row));

        let situs = RawFields::new().with(Field::SitusAddress, "0 MAIN ST");
        assert!(!RowFilter::NumberedStreet.keeps(&situs));
        let situs = RawFields::new().with(Field::SitusAddress, "10 MAIN ST");
        assert!(RowFilter::NumberedStreet.keeps(&situs));
    }

    #[test]
    fn numbered_street_is_built_from_fragments() {
        let keeps = |pairs: &[(Field, &str)]| {
            let row = pairs
                .iter()
                .fold(RawFields::new(), |row, (field, value)| row.with(*field, value));
            RowFilter::NumberedStreet.keeps(&row)
        };
        // A number with no street name is still a street.
        assert!(keeps(&[(Field::StreetNumber, "1204")]));
        assert!(keeps(&[(Field::StreetName, "OAK HILL"), (Field::StreetSuffix, "DR")]));
        assert!(keeps(&[(Field::StreetNumber, "0012"), (Field::StreetName, "OAK")]));
        assert!(!keeps(&[(Field::StreetNumber, "00"), (Field::StreetName, "OAK")]));
        assert!(!keeps(&[(Field::StreetNumber, "0")]));
        assert!(!keeps(&[(Field::City, "AUSTIN")]));
    }

    #[test]
    fn descriptor_parses() {
        let layout: Layout = toml::from_str(
            r#"
            name = "tcad-prop"
            format = { kind = "fixed-width" }

            [[columns]]
            field = "account_number"
            start = 0
            end = 12

            [[columns]]
            field = "market_value"
            start = 4213
            end = 4227

            [[filters]]
            kind = "equals"
            field = "record_type"
            value = "R"
            "#,
        )
        .unwrap();
        assert_eq!(layout.format, SourceFormat::FixedWidth);
        assert_eq!(layout.columns[1], ColumnSpec::range(Field::MarketValue, 4213, 4227));
        assert_eq!(layout.filters.len(), 1);
    }
}
