//! Connector contract tests over mock renderers and open-data sources.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use appraisal_common::config::ConnectorsConfig;
use appraisal_common::{District, Property};
use appraisal_connectors::testing::{MockOpenData, MockRenderer};
use appraisal_connectors::{ConnectorError, ConnectorExt, ConnectorFactory};
use appraisal_store::MemoryPropertyStore;

const TAD_PAGE: &str = r##"
    <h1>Account: 04657837</h1>
    <div class="title-container"><h2>Address: 3204 WOSLEY DR</h2></div>
    <p>Neighborhood Code: <a href="#">2C100A</a></p>
    <table class="values"><tbody>
      <tr><td>2025</td><td></td><td></td><td>$480,000</td><td>$455,000</td></tr>
    </tbody></table>"##;

fn factory_with(renderer: MockRenderer, open_data: MockOpenData) -> ConnectorFactory {
    factory_with_config(renderer, open_data, ConnectorsConfig::default())
}

fn factory_with_config(
    renderer: MockRenderer,
    open_data: MockOpenData,
    config: ConnectorsConfig,
) -> ConnectorFactory {
    let mut hcad = Property::new(District::Hcad, "0660460450034");
    hcad.address = "1 MAIN ST, HOUSTON, TX".into();
    ConnectorFactory::new(
        Arc::new(MemoryPropertyStore::new().with_records([hcad])),
        Arc::new(renderer),
        Arc::new(open_data),
        config,
    )
}

#[tokio::test]
async fn tad_fetch_normalizes_the_page() {
    let factory = factory_with(
        MockRenderer::new().on_url("account=04657837", TAD_PAGE),
        MockOpenData::new(),
    );
    let p = factory
        .get_connector(District::Tad)
        .fetch_by_account("0465-7837")
        .await
        .unwrap();
    assert_eq!(p.district, District::Tad);
    assert_eq!(p.account_number, "04657837");
    assert_eq!(p.market_value, 480_000.0);
    assert_eq!(p.neighborhood_code.as_deref(), Some("2C100A"));
}

#[tokio::test]
async fn empty_page_is_not_found() {
    let factory = factory_with(MockRenderer::new(), MockOpenData::new());
    for district in [District::Dcad, District::Tad, District::Tcad] {
        let err = factory
            .get_connector(district)
            .fetch_by_account("12345678")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::NotFound(_)), "{district}: {err}");
    }
}

#[tokio::test]
async fn render_failure_is_upstream_unavailable() {
    let factory = factory_with(MockRenderer::new().failing(), MockOpenData::new());
    let err = factory
        .get_connector(District::Dcad)
        .fetch_by_account("00000776533000000")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn slow_fetch_times_out() {
    let factory = factory_with(
        MockRenderer::new()
            .on_url("account=04657837", TAD_PAGE)
            .with_delay(Duration::from_millis(500)),
        MockOpenData::new(),
    );
    let deadline = Duration::from_millis(20);
    let err = factory
        .get_connector(District::Tad)
        .fetch_within("04657837", deadline)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Timeout(d) if d == deadline));
}

#[tokio::test]
async fn fetch_within_passes_through_results() {
    let factory = factory_with(MockRenderer::new(), MockOpenData::new());
    let p = factory
        .get_connector(District::Hcad)
        .fetch_within("0660460450034", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(p.address, "1 MAIN ST, HOUSTON, TX");
}

#[tokio::test]
async fn ccad_falls_back_to_like() {
    let open_data = MockOpenData::new().on_where(
        "geoid like '%R-2815-00C-0100-1%'",
        vec![json!({
            "geoid": "R-2815-00C-0100-1",
            "situsconcat": "6201 Dove Creek Ln , Plano, TX 75093",
            "currvalappraised": "610000",
            "currvalmarket": "640000",
            "imprvmainarea": "3120",
            "imprvyearbuilt": "1996",
            "nbhdcode": "PL-12"
        })],
    );
    let factory = factory_with(MockRenderer::new(), open_data);
    let p = factory
        .get_connector(District::Ccad)
        .fetch_by_account("R-2815-00C-0100-1")
        .await
        .unwrap();
    assert_eq!(p.account_number, "R-2815-00C-0100-1");
    assert_eq!(p.address, "6201 DOVE CREEK LN, PLANO, TX 75093");
    assert_eq!(p.market_value, 640_000.0);
    assert_eq!(p.building_area, Some(3120));
}

#[tokio::test]
async fn ccad_street_search_queries_situs() {
    let open_data = Arc::new(MockOpenData::new().on_where(
        "upper(situsconcat) like '%DOVE CREEK%'",
        vec![json!({"geoid": "R-1", "situsconcat": "1 DOVE CREEK LN, PLANO, TX 75093"})],
    ));
    let factory = ConnectorFactory::new(
        Arc::new(MemoryPropertyStore::new()),
        Arc::new(MockRenderer::new()),
        open_data.clone(),
        ConnectorsConfig::default(),
    );
    let found = factory
        .get_connector(District::Ccad)
        .find_by_street("dove creek")
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        open_data.queries(),
        vec![("upper(situsconcat) like '%DOVE CREEK%'".to_string(), 20)]
    );
}

#[tokio::test]
async fn tad_street_search_reads_results_table() {
    let results = r#"<table class="search-results"><tbody>
        <tr class="property-header"><td></td><td>04657837</td><td>3204 WOSLEY DR</td>
            <td>FORT WORTH</td><td>DOE JOHN</td><td>$480,000</td></tr>
        <tr class="property-header"><td></td><td>04657845</td><td>3208 WOSLEY DR</td>
            <td>FORT WORTH</td><td>ROE JANE</td><td>$470,000</td></tr>
    </tbody></table>"#;
    let factory = factory_with(
        MockRenderer::new().on_url("search-results", results),
        MockOpenData::new(),
    );
    let found = factory
        .get_connector(District::Tad)
        .find_by_street_within("WOSLEY DR", Duration::from_secs(5))
        .await
        .unwrap();
    let accounts: Vec<_> = found.iter().map(|p| p.account_number.as_str()).collect();
    assert_eq!(accounts, ["04657837", "04657845"]);
}

#[tokio::test]
async fn page_scrapers_without_search_report_unsupported() {
    let factory = factory_with(MockRenderer::new(), MockOpenData::new());
    for district in [District::Dcad, District::Tcad] {
        let err = factory
            .get_connector(district)
            .find_by_street("MAIN")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Unsupported(_)));
    }
}

#[tokio::test]
async fn captures_do_not_change_results() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConnectorsConfig {
        capture_dir: Some(dir.path().to_path_buf()),
        ..ConnectorsConfig::default()
    };
    let factory = factory_with_config(
        MockRenderer::new().on_url("account=04657837", TAD_PAGE),
        MockOpenData::new(),
        config,
    );
    let p = factory
        .get_connector(District::Tad)
        .fetch_by_account("04657837")
        .await
        .unwrap();
    assert_eq!(p.market_value, 480_000.0);
    assert!(dir.path().join("TAD_04657837.html").exists());
}
