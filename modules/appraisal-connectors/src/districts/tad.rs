// TAD: account pages with a per-year values table, and a search results
// table that doubles as the street search.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::info;
use url::Url;

use appraisal_common::normalize::normalize_account;
use appraisal_common::{normalize_fields, District, Field, Property, RawFields};

use crate::connector::DistrictConnector;
use crate::error::{ConnectorError, Result};
use crate::page_text::{
    after_colon, element_containing, element_text, next_element_sibling, select_text, selector,
};
use crate::renderer::{PageCapture, PageRenderer};

static H1_SEL: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static TITLE_H2_SEL: LazyLock<Selector> = LazyLock::new(|| selector("div.title-container h2"));
static P_SEL: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static A_SEL: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static VALUE_ROWS_SEL: LazyLock<Selector> = LazyLock::new(|| selector("table.values tbody tr"));
static RESULT_ROWS_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector("table.search-results tbody tr.property-header"));

/// Newer years show "Pending" until certified; only this many are checked.
const VALUE_YEARS_CHECKED: usize = 3;
const STREET_SEARCH_LIMIT: usize = 50;

pub struct TadConnector {
    renderer: Arc<dyn PageRenderer>,
    capture: PageCapture,
    base_url: String,
}

impl TadConnector {
    pub fn new(renderer: Arc<dyn PageRenderer>, capture: PageCapture, base_url: &str) -> Self {
        Self {
            renderer,
            capture,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        Url::parse_with_params(&format!("{}{}", self.base_url, path), params)
            .map(String::from)
            .map_err(|e| ConnectorError::UpstreamUnavailable(format!("bad TAD url: {e}")))
    }
}

/// "$638,920 (2025)" → "$638,920".
fn strip_year_note(cell: &str) -> &str {
    cell.split('(').next().unwrap_or("").trim()
}

/// Fragments from a rendered account page. `None` unless the page header
/// names an account.
pub fn parse_account_page(html: &str) -> Option<RawFields> {
    let doc = Html::parse_document(html);
    let header = doc
        .select(&H1_SEL)
        .map(element_text)
        .find(|t| t.contains("Account:"))?;
    let account = header.replace("Account:", "");

    let mut fields = RawFields::new().with(Field::AccountNumber, account.trim());

    if let Some(h2) = select_text(&doc, &TITLE_H2_SEL) {
        fields.set(Field::SitusAddress, &h2.replace("Address:", ""));
    }
    if let Some(owner) = element_containing(&doc, &P_SEL, "Current Owner:")
        .and_then(next_element_sibling)
        .map(element_text)
    {
        fields.set(Field::OwnerName, &owner);
    }
    if let Some(code) = element_containing(&doc, &P_SEL, "Neighborhood Code:")
        .and_then(|p| p.select(&A_SEL).next())
        .map(element_text)
    {
        fields.set(Field::NeighborhoodCode, &code);
    }

    for row in doc.select(&VALUE_ROWS_SEL).take(VALUE_YEARS_CHECKED) {
        let cells: Vec<String> = row.select(&TD_SEL).map(element_text).collect();
        let (Some(market), Some(appraised)) = (cells.get(3), cells.get(4)) else {
            continue;
        };
        if market.contains("Pending") {
            continue;
        }
        fields.set(Field::MarketValue, strip_year_note(market));
        fields.set(Field::AppraisedValue, strip_year_note(appraised));
        break;
    }

    if let Some(year) = element_containing(&doc, &P_SEL, "Year Built:").map(element_text) {
        fields.set(Field::YearBuilt, after_colon(&year));
    }
    if let Some(area) = element_containing(&doc, &P_SEL, "Gross Building Area").map(element_text) {
        fields.set(Field::BuildingArea, after_colon(&area));
    }
    Some(fields)
}

/// Rows of a rendered search results table, at most `limit`.
pub fn parse_search_results(html: &str, limit: usize) -> Vec<RawFields> {
    let doc = Html::parse_document(html);
    doc.select(&RESULT_ROWS_SEL)
        .take(limit)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&TD_SEL).map(element_text).collect();
            let account = cells.get(1)?;
            Some(
                RawFields::new()
                    .with(Field::AccountNumber, account)
                    .with(Field::SitusAddress, cells.get(2).map(String::as_str).unwrap_or(""))
                    .with(Field::OwnerName, cells.get(4).map(String::as_str).unwrap_or(""))
                    .with(
                        Field::MarketValue,
                        cells.get(5).map(|c| strip_year_note(c)).unwrap_or(""),
                    ),
            )
        })
        .collect()
}

#[async_trait]
impl DistrictConnector for TadConnector {
    fn district(&self) -> District {
        District::Tad
    }

    async fn fetch_by_account(&self, account: &str) -> Result<Property> {
        let account = normalize_account(District::Tad, account);
        let url = self.url("/property", &[("account", account.as_str())])?;
        info!(district = "TAD", account = account.as_str(), url = url.as_str(), "Fetching page");

        let html = self.renderer.render(&url, Some("h1")).await?;
        self.capture.save(District::Tad, &account, &html).await;

        let Some(mut fields) = parse_account_page(&html) else {
            return Err(ConnectorError::NotFound(account));
        };
        // The header account wins, but a blank header falls back to the request.
        fields.set_if_absent(Field::AccountNumber, &account);
        normalize_fields(District::Tad, &fields).ok_or(ConnectorError::NotFound(account))
    }

    async fn find_by_street(&self, street_name: &str) -> Result<Vec<Property>> {
        let street = street_name.trim();
        let url = self.url("/search-results", &[("query", street)])?;
        info!(district = "TAD", street, "Searching street");

        let html = self.renderer.render(&url, Some("table.search-results")).await?;
        Ok(parse_search_results(&html, STREET_SEARCH_LIMIT)
            .iter()
            .filter_map(|fields| normalize_fields(District::Tad, fields))
            .collect())
    }

    async fn check_service(&self) -> bool {
        self.renderer.render(&self.base_url, None).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT_PAGE: &str = r#"
        <html><body>
          <h1>Account: 04657837</h1>
          <div class="title-container"><h2>Address: 3204 WOSLEY DR</h2></div>
          <p>Current Owner:</p><p>DOE JOHN</p>
          <p>Neighborhood Code: <a href="/n/1">2C100A</a></p>
          <table class="values"><tbody>
            <tr><td>2026</td><td>-</td><td>-</td><td>Value Pending</td><td>Value Pending</td></tr>
            <tr><td>2025</td><td>$80,000</td><td>$400,000</td><td>$480,000 (2025)</td><td>$455,000</td></tr>
          </tbody></table>
          <p>Year Built: 1962</p>
          <p>Gross Building Area+++: 1,986</p>
        </body></html>"#;

    #[test]
    fn pending_year_is_skipped() {
        let fields = parse_account_page(ACCOUNT_PAGE).unwrap();
        let p = normalize_fields(District::Tad, &fields).unwrap();
        assert_eq!(p.account_number, "04657837");
        assert_eq!(p.address, "3204 WOSLEY DR");
        assert_eq!(p.owner_name.as_deref(), Some("DOE JOHN"));
        assert_eq!(p.neighborhood_code.as_deref(), Some("2C100A"));
        assert_eq!(p.market_value, 480_000.0);
        assert_eq!(p.appraised_value, 455_000.0);
        assert_eq!(p.year_built.as_deref(), Some("1962"));
        assert_eq!(p.building_area, Some(1986));
    }

    #[test]
    fn only_three_years_are_checked() {
        let pending = "<tr><td>y</td><td></td><td></td><td>Pending</td><td>Pending</td></tr>";
        let html = format!(
            "<h1>Account: 1</h1><table class=\"values\"><tbody>{pending}{pending}{pending}\
             <tr><td>y</td><td></td><td></td><td>$1</td><td>$1</td></tr></tbody></table>"
        );
        let fields = parse_account_page(&html).unwrap();
        assert!(!fields.has(Field::MarketValue));
    }

    #[test]
    fn page_without_account_header_is_none() {
        assert!(parse_account_page("<h1>Property Search</h1>").is_none());
    }

    #[test]
    fn search_results_are_capped() {
        let row = |i: usize| {
            format!(
                "<tr class=\"property-header\"><td></td><td>{i:08}</td><td>{i} OAK ST</td>\
                 <td>FORT WORTH</td><td>OWNER</td><td>$100,000</td></tr>"
            )
        };
        let rows: String = (1..=60).map(row).collect();
        let html = format!("<table class=\"search-results\"><tbody>{rows}</tbody></table>");
        let results = parse_search_results(&html, STREET_SEARCH_LIMIT);
        assert_eq!(results.len(), 50);
        assert_eq!(results[0].get(Field::AccountNumber), "00000001");
        assert_eq!(results[0].get(Field::MarketValue), "$100,000");
    }
}
