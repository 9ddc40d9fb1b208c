pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Per-request rendering options for `/content`.
#[derive(Debug, Clone, Default)]
pub struct ContentOptions {
    /// CSS selector the page must contain before the HTML is returned.
    pub wait_for_selector: Option<String>,
    /// Navigation timeout in milliseconds.
    pub navigation_timeout_ms: Option<u64>,
    /// Skip images, fonts and media while rendering.
    pub block_heavy_resources: bool,
}

impl ContentOptions {
    pub fn wait_for(selector: &str) -> Self {
        Self {
            wait_for_selector: Some(selector.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions {
    wait_until: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
}

#[derive(Serialize)]
struct WaitForSelector<'a> {
    selector: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    goto_options: GotoOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for_selector: Option<WaitForSelector<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reject_resource_types: Vec<&'static str>,
}

fn request_body(url: &str, opts: &ContentOptions) -> Value {
    let req = ContentRequest {
        url,
        goto_options: GotoOptions {
            wait_until: "networkidle2",
            timeout: opts.navigation_timeout_ms,
        },
        wait_for_selector: opts.wait_for_selector.as_deref().map(|selector| WaitForSelector {
            selector,
            timeout: opts.navigation_timeout_ms,
        }),
        reject_resource_types: if opts.block_heavy_resources {
            vec!["image", "font", "media"]
        } else {
            Vec::new()
        },
    };
    serde_json::to_value(req).unwrap_or(Value::Null)
}

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    /// Fetch fully-rendered HTML for a URL via the /content endpoint.
    pub async fn content(&self, url: &str) -> Result<String> {
        self.content_with(url, &ContentOptions::default()).await
    }

    pub async fn content_with(&self, url: &str, opts: &ContentOptions) -> Result<String> {
        let endpoint = format!("{}/content", self.base_url);
        let mut request = self.client.post(&endpoint).json(&request_body(url, opts));
        if let Some(ref token) = self.token {
            request = request.query(&[("token", token)]);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let html = resp.text().await?;
        debug!(url, bytes = html.len(), "Rendered page");
        if html.trim().is_empty() {
            return Err(BrowserlessError::EmptyPage(url.to_string()));
        }
        Ok(html)
    }
}
