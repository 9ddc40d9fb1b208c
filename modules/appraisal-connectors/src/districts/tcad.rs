// TCAD: Prodigy CAD property-detail pages. The layout uses generated class
// names, so values are read from page text by label.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;

use appraisal_common::normalize::normalize_account;
use appraisal_common::{normalize_fields, District, Field, Property, RawFields};

use crate::connector::DistrictConnector;
use crate::error::{ConnectorError, Result};
use crate::page_text::{
    element_containing, element_text, first_match, first_nonzero_amount, max_amount, page_text,
    select_text, selector,
};
use crate::renderer::{PageCapture, PageRenderer};

static LOCATION_SEL: LazyLock<Selector> = LazyLock::new(|| selector(".sc-bMJoCw.eiwhdn"));
static SPAN_SEL: LazyLock<Selector> = LazyLock::new(|| selector("span"));

static MARKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Market\s*([\d,]+)").expect("valid regex"));
static APPRAISED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Appraised\s*([\d,]+)").expect("valid regex"));
static YEAR_BUILT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Year Built:?\s*(\d{4})").expect("valid regex"));
static NEIGHBORHOOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Neighborhood CD:?\s*([A-Z\d\.]+)").expect("valid regex"));
static MARKET_AREA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Market Area CD:?\s*([A-Z\d\.]+)").expect("valid regex"));
static AREA_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["Main Area", "Total Living Area", "Gross Area", "Building Area", "SQ FT"]
        .iter()
        .map(|label| Regex::new(&format!(r"(?i){label}[:\s]+([\d,]+)")).expect("valid regex"))
        .collect()
});

pub struct TcadConnector {
    renderer: Arc<dyn PageRenderer>,
    capture: PageCapture,
    base_url: String,
}

impl TcadConnector {
    pub fn new(renderer: Arc<dyn PageRenderer>, capture: PageCapture, base_url: &str) -> Self {
        Self {
            renderer,
            capture,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn detail_url(&self, account: &str) -> String {
        format!("{}/property-detail/{}", self.base_url, account)
    }
}

/// The header reads "PID 123456 | 1200 W 6TH ST AUSTIN TX 78703".
fn header_address(doc: &Html) -> Option<String> {
    let span = element_containing(doc, &SPAN_SEL, "PID")?;
    let text = element_text(span);
    let (_, addr) = text.rsplit_once('|')?;
    Some(addr.trim().to_string()).filter(|a| !a.is_empty())
}

/// Fragments from a rendered property-detail page. `None` when the page has
/// no address and no positive value.
pub fn parse_detail_page(html: &str, account: &str) -> Option<RawFields> {
    let doc = Html::parse_document(html);
    let text = page_text(html);

    let address = select_text(&doc, &LOCATION_SEL).or_else(|| header_address(&doc));
    let market = first_nonzero_amount(&text, &MARKET_RE);
    let appraised = first_nonzero_amount(&text, &APPRAISED_RE);
    if address.is_none() && market.is_none() && appraised.is_none() {
        return None;
    }

    let mut fields = RawFields::new().with(Field::AccountNumber, account);
    for (field, value) in [
        (Field::SitusAddress, address),
        (Field::MarketValue, market),
        (Field::AppraisedValue, appraised),
        (Field::YearBuilt, first_match(&text, &YEAR_BUILT_RE)),
        (Field::BuildingArea, max_amount(&text, &AREA_RES)),
        (
            Field::NeighborhoodCode,
            first_match(&text, &NEIGHBORHOOD_RE).or_else(|| first_match(&text, &MARKET_AREA_RE)),
        ),
    ] {
        if let Some(v) = value {
            fields.set(field, &v);
        }
    }
    Some(fields)
}

#[async_trait]
impl DistrictConnector for TcadConnector {
    fn district(&self) -> District {
        District::Tcad
    }

    async fn fetch_by_account(&self, account: &str) -> Result<Property> {
        let account = normalize_account(District::Tcad, account);
        let url = self.detail_url(&account);
        info!(district = "TCAD", account = account.as_str(), url = url.as_str(), "Fetching page");

        let html = self.renderer.render(&url, None).await?;
        self.capture.save(District::Tcad, &account, &html).await;

        parse_detail_page(&html, &account)
            .and_then(|fields| normalize_fields(District::Tcad, &fields))
            .ok_or(ConnectorError::NotFound(account))
    }

    async fn check_service(&self) -> bool {
        self.renderer.render(&self.base_url, None).await.is_ok()
    }
}
