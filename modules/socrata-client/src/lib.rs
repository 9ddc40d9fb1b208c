pub mod error;
pub mod query;

pub use error::{Result, SocrataError};
pub use query::{quote, SoqlQuery};

use std::time::Duration;

use serde::de::DeserializeOwned;

pub struct SocrataClient {
    client: reqwest::Client,
    base_url: String,
    app_token: Option<String>,
}

impl SocrataClient {
    pub fn new(base_url: &str, app_token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_token: app_token.map(String::from),
        })
    }

    pub fn resource_url(&self, dataset: &str) -> String {
        format!("{}/resource/{}.json", self.base_url, dataset)
    }

    /// Run a SoQL query against a dataset and decode the rows.
    pub async fn query<T: DeserializeOwned>(&self, dataset: &str, q: &SoqlQuery) -> Result<Vec<T>> {
        let url = self.resource_url(dataset);
        let mut request = self.client.get(&url).query(&q.to_params());
        if let Some(ref token) = self.app_token {
            request = request.header("X-App-Token", token);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SocrataError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let rows: Vec<T> = serde_json::from_str(&body)?;
        tracing::debug!(dataset, rows = rows.len(), "Socrata query returned");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_url_uses_dataset_id() {
        let client =
            SocrataClient::new("https://data.texas.gov/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.resource_url("vffy-snc6"),
            "https://data.texas.gov/resource/vffy-snc6.json"
        );
    }
}
