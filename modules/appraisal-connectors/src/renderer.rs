// Black-box page rendering and diagnostic page captures.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use appraisal_common::District;
use browserless_client::{BrowserlessClient, ContentOptions};

use crate::error::{ConnectorError, Result};

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Fully-rendered HTML for `url`. `wait_for` names a CSS selector the
    /// page should contain before it is returned.
    async fn render(&self, url: &str, wait_for: Option<&str>) -> Result<String>;
}

/// Renders through a Browserless `/content` endpoint.
pub struct BrowserlessRenderer {
    client: BrowserlessClient,
    navigation_timeout: Duration,
}

impl BrowserlessRenderer {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: BrowserlessClient::new(base_url, token, timeout)?,
            navigation_timeout: timeout,
        })
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn render(&self, url: &str, wait_for: Option<&str>) -> Result<String> {
        let opts = ContentOptions {
            wait_for_selector: wait_for.map(String::from),
            navigation_timeout_ms: Some(self.navigation_timeout.as_millis() as u64),
            block_heavy_resources: true,
        };
        Ok(self.client.content_with(url, &opts).await?)
    }
}

/// Stand-in when no rendering service is configured.
pub struct NoRenderer;

#[async_trait]
impl PageRenderer for NoRenderer {
    async fn render(&self, _url: &str, _wait_for: Option<&str>) -> Result<String> {
        Err(ConnectorError::UpstreamUnavailable(
            "BROWSERLESS_URL is not configured".to_string(),
        ))
    }
}

/// Writes rendered pages to `<dir>/<district>_<account>.html`. Failures are
/// logged and never reach the caller.
#[derive(Debug, Clone, Default)]
pub struct PageCapture {
    dir: Option<PathBuf>,
}

impl PageCapture {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn path_for(&self, district: District, account: &str) -> Option<PathBuf> {
        let safe: String = account
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir
            .as_ref()
            .map(|d| d.join(format!("{}_{}.html", district.code(), safe)))
    }

    pub async fn save(&self, district: District, account: &str, html: &str) {
        let Some(path) = self.path_for(district, account) else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %parent.display(), error = %e, "Failed to create capture dir");
                return;
            }
        }
        match tokio::fs::write(&path, html).await {
            Ok(()) => debug!(path = %path.display(), "Captured page"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to write page capture"),
        }
    }
}
