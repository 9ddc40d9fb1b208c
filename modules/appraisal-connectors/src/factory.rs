// District code → connector. Holds only shared, stateless dependencies and
// builds a fresh connector for every call.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use appraisal_common::config::ConnectorsConfig;
use appraisal_common::{District, Secrets};
use appraisal_store::PropertyStore;
use socrata_client::SocrataClient;

use crate::connector::DistrictConnector;
use crate::districts::{CcadConnector, DcadConnector, HcadConnector, TadConnector, TcadConnector};
use crate::error::Result;
use crate::open_data::{OpenDataSource, SocrataSource};
use crate::renderer::{BrowserlessRenderer, NoRenderer, PageCapture, PageRenderer};

#[derive(Clone)]
pub struct ConnectorFactory {
    store: Arc<dyn PropertyStore>,
    renderer: Arc<dyn PageRenderer>,
    open_data: Arc<dyn OpenDataSource>,
    capture: PageCapture,
    config: ConnectorsConfig,
}

impl ConnectorFactory {
    pub fn new(
        store: Arc<dyn PropertyStore>,
        renderer: Arc<dyn PageRenderer>,
        open_data: Arc<dyn OpenDataSource>,
        config: ConnectorsConfig,
    ) -> Self {
        let capture = PageCapture::new(config.capture_dir.clone());
        Self {
            store,
            renderer,
            open_data,
            capture,
            config,
        }
    }

    /// Wire the production renderer and open-data client from config and env.
    pub fn from_config(
        config: &ConnectorsConfig,
        secrets: &Secrets,
        store: Arc<dyn PropertyStore>,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let renderer: Arc<dyn PageRenderer> = match secrets.browserless_url.as_deref() {
            Some(url) => Arc::new(BrowserlessRenderer::new(
                url,
                secrets.browserless_token.as_deref(),
                timeout,
            )?),
            None => {
                warn!("BROWSERLESS_URL not set; live page retrieval is disabled");
                Arc::new(NoRenderer)
            }
        };

        let socrata = SocrataClient::new(
            &config.socrata_base_url,
            secrets.socrata_app_token.as_deref(),
            timeout,
        )?;
        let open_data = Arc::new(SocrataSource::new(socrata, &config.socrata_dataset));

        Ok(Self::new(store, renderer, open_data, config.clone()))
    }

    pub fn get_connector(&self, district: District) -> Box<dyn DistrictConnector> {
        match district {
            District::Hcad => Box::new(HcadConnector::new(self.store.clone())),
            District::Dcad => Box::new(DcadConnector::new(
                self.renderer.clone(),
                self.capture.clone(),
                &self.config.dcad_base_url,
            )),
            District::Ccad => Box::new(CcadConnector::new(self.open_data.clone())),
            District::Tad => Box::new(TadConnector::new(
                self.renderer.clone(),
                self.capture.clone(),
                &self.config.tad_base_url,
            )),
            District::Tcad => Box::new(TcadConnector::new(
                self.renderer.clone(),
                self.capture.clone(),
                &self.config.tcad_base_url,
            )),
        }
    }

    /// Parse a raw district code first. Codes outside the five fail with
    /// `UnknownDistrict`.
    pub fn get_connector_for_code(&self, code: &str) -> Result<Box<dyn DistrictConnector>> {
        let district: District = code.parse()?;
        Ok(self.get_connector(district))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;
    use crate::testing::{MockOpenData, MockRenderer};
    use appraisal_store::MemoryPropertyStore;

    fn factory() -> ConnectorFactory {
        ConnectorFactory::new(
            Arc::new(MemoryPropertyStore::new()),
            Arc::new(MockRenderer::new()),
            Arc::new(MockOpenData::new()),
            ConnectorsConfig::default(),
        )
    }

    #[test]
    fn every_district_has_a_connector() {
        let f = factory();
        for d in District::ALL {
            assert_eq!(f.get_connector(d).district(), d);
        }
    }

    #[test]
    fn codes_are_case_insensitive() {
        let c = factory().get_connector_for_code("tad").unwrap();
        assert_eq!(c.district(), District::Tad);
    }

    #[test]
    fn unknown_code_fails() {
        let err = factory().get_connector_for_code("BCAD").err().unwrap();
        assert!(matches!(err, ConnectorError::UnknownDistrict(code) if code == "BCAD"));
    }

    #[test]
    fn builds_without_browserless() {
        let f = ConnectorFactory::from_config(
            &ConnectorsConfig::default(),
            &Secrets::default(),
            Arc::new(MemoryPropertyStore::new()),
        );
        assert!(f.is_ok());
    }
}
