// Open-data REST retrieval (CCAD publishes its roll on a Socrata portal).

use async_trait::async_trait;
use serde_json::{Map, Value};

use socrata_client::{SocrataClient, SoqlQuery};

use crate::error::Result;

/// One dataset row, keyed by lower-case column name.
pub type OpenDataRow = Map<String, Value>;

#[async_trait]
pub trait OpenDataSource: Send + Sync {
    /// Rows matching a SoQL `$where` expression.
    async fn rows(&self, where_clause: &str, limit: u32) -> Result<Vec<OpenDataRow>>;
}

pub struct SocrataSource {
    client: SocrataClient,
    dataset: String,
}

impl SocrataSource {
    pub fn new(client: SocrataClient, dataset: &str) -> Self {
        Self {
            client,
            dataset: dataset.to_string(),
        }
    }
}

#[async_trait]
impl OpenDataSource for SocrataSource {
    async fn rows(&self, where_clause: &str, limit: u32) -> Result<Vec<OpenDataRow>> {
        let query = SoqlQuery::new().filter(where_clause).limit(limit);
        Ok(self.client.query(&self.dataset, &query).await?)
    }
}

/// Column value as text. Socrata serializes numbers as strings, but not always.
pub fn column_text<'a>(row: &'a OpenDataRow, column: &str) -> std::borrow::Cow<'a, str> {
    match row.get(column) {
        Some(Value::String(s)) => std::borrow::Cow::Borrowed(s.as_str()),
        Some(Value::Number(n)) => std::borrow::Cow::Owned(n.to_string()),
        _ => std::borrow::Cow::Borrowed(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_and_strings_read_as_text() {
        let row: OpenDataRow = json!({"a": "12", "b": 3.5, "c": null})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(column_text(&row, "a"), "12");
        assert_eq!(column_text(&row, "b"), "3.5");
        assert_eq!(column_text(&row, "c"), "");
        assert_eq!(column_text(&row, "missing"), "");
    }
}
