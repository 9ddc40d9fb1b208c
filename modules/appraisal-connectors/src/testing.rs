// Test doubles for the network seams. No browser, no open-data portal.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ConnectorError, Result};
use crate::open_data::{OpenDataRow, OpenDataSource};
use crate::renderer::PageRenderer;

/// Renders canned pages by URL substring. Unmatched URLs render an empty body.
pub struct MockRenderer {
    pages: Vec<(String, String)>,
    delay: Option<Duration>,
    fail: bool,
    rendered: Mutex<Vec<String>>,
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            delay: None,
            fail: false,
            rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn on_url(mut self, url_contains: &str, html: &str) -> Self {
        self.pages.push((url_contains.to_string(), html.to_string()));
        self
    }

    /// Sleep before answering, to exercise deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn rendered_urls(&self) -> Vec<String> {
        self.rendered.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn render(&self, url: &str, _wait_for: Option<&str>) -> Result<String> {
        self.rendered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ConnectorError::UpstreamUnavailable("mock render failure".into()));
        }
        Ok(self
            .pages
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, html)| html.clone())
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }
}

/// Answers `$where` clauses from canned rows keyed by exact clause text.
pub struct MockOpenData {
    rows: HashMap<String, Vec<OpenDataRow>>,
    queries: Mutex<Vec<(String, u32)>>,
}

impl Default for MockOpenData {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOpenData {
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn on_where(mut self, clause: &str, rows: Vec<serde_json::Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();
        self.rows.insert(clause.to_string(), rows);
        self
    }

    pub fn queries(&self) -> Vec<(String, u32)> {
        self.queries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl OpenDataSource for MockOpenData {
    async fn rows(&self, where_clause: &str, limit: u32) -> Result<Vec<OpenDataRow>> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((where_clause.to_string(), limit));
        Ok(self
            .rows
            .get(where_clause)
            .map(|rows| rows.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}
