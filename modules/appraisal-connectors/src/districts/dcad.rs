// DCAD: ASP.NET account detail pages with stable label ids.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;
use url::Url;

use appraisal_common::normalize::normalize_account;
use appraisal_common::{normalize_fields, District, Field, Property, RawFields};

use crate::connector::DistrictConnector;
use crate::error::{ConnectorError, Result};
use crate::page_text::{first_match, page_text, select_text, selector};
use crate::renderer::{PageCapture, PageRenderer};

static ADDRESS_SEL: LazyLock<Selector> = LazyLock::new(|| selector("#PropAddr1_lblPropAddr"));
static TOTAL_VALUE_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector("#ValueSummary1_pnlValue_lblTotalVal"));
static NEIGHBORHOOD_SEL: LazyLock<Selector> = LazyLock::new(|| selector("#lblNbhd"));

static YEAR_BUILT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Year Built:\s*(\d{4})").expect("valid regex"));
static TOTAL_AREA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total Area:\s*([\d,]+)").expect("valid regex"));

pub struct DcadConnector {
    renderer: Arc<dyn PageRenderer>,
    capture: PageCapture,
    base_url: String,
}

impl DcadConnector {
    pub fn new(renderer: Arc<dyn PageRenderer>, capture: PageCapture, base_url: &str) -> Self {
        Self {
            renderer,
            capture,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn detail_url(&self, account: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/AcctDetailRes.aspx", self.base_url),
            &[("ID", account)],
        )
        .map_err(|e| ConnectorError::UpstreamUnavailable(format!("bad DCAD url: {e}")))?;
        Ok(url.into())
    }
}

/// Fragments from a rendered account detail page. `None` when the page
/// carries neither an address nor a value.
pub fn parse_account_page(html: &str, account: &str) -> Option<RawFields> {
    let doc = Html::parse_document(html);
    let address = select_text(&doc, &ADDRESS_SEL);
    let total = select_text(&doc, &TOTAL_VALUE_SEL);
    if address.is_none() && total.is_none() {
        return None;
    }

    let mut fields = RawFields::new().with(Field::AccountNumber, account);
    if let Some(addr) = address {
        fields.set(Field::SitusAddress, &addr);
    }
    if let Some(total) = total {
        // The portal shows one certified total; it serves as both values.
        fields.set(Field::MarketValue, &total);
        fields.set(Field::AppraisedValue, &total);
    }
    if let Some(nbhd) = select_text(&doc, &NEIGHBORHOOD_SEL) {
        fields.set(Field::NeighborhoodCode, &nbhd);
    }

    let text = page_text(html);
    if let Some(year) = first_match(&text, &YEAR_BUILT_RE) {
        fields.set(Field::YearBuilt, &year);
    }
    if let Some(area) = first_match(&text, &TOTAL_AREA_RE) {
        fields.set(Field::BuildingArea, &area);
    }
    Some(fields)
}

#[async_trait]
impl DistrictConnector for DcadConnector {
    fn district(&self) -> District {
        District::Dcad
    }

    async fn fetch_by_account(&self, account: &str) -> Result<Property> {
        let account = normalize_account(District::Dcad, account);
        let url = self.detail_url(&account)?;
        info!(district = "DCAD", account = account.as_str(), url = url.as_str(), "Fetching page");

        let html = self.renderer.render(&url, Some("#PropAddr1_lblPropAddr")).await?;
        self.capture.save(District::Dcad, &account, &html).await;

        parse_account_page(&html, &account)
            .and_then(|fields| normalize_fields(District::Dcad, &fields))
            .ok_or(ConnectorError::NotFound(account))
    }

    async fn check_service(&self) -> bool {
        self.renderer.render(&self.base_url, None).await.is_ok()
    }
}
