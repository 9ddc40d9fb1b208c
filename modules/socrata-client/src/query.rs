/// A SoQL query rendered into `$`-prefixed URL parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoqlQuery {
    pub select: Option<String>,
    pub where_clause: Option<String>,
    pub order: Option<String>,
    pub limit: Option<u32>,
}

impl SoqlQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    /// Raw `$where` expression. Use `quote` for literals.
    pub fn filter(mut self, expr: impl Into<String>) -> Self {
        self.where_clause = Some(expr.into());
        self
    }

    pub fn order(mut self, order: &str) -> Self {
        self.order = Some(order.to_string());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(s) = &self.select {
            params.push(("$select", s.clone()));
        }
        if let Some(w) = &self.where_clause {
            params.push(("$where", w.clone()));
        }
        if let Some(o) = &self.order {
            params.push(("$order", o.clone()));
        }
        if let Some(l) = self.limit {
            params.push(("$limit", l.to_string()));
        }
        params
    }
}

/// Quote a string literal for SoQL. Single quotes are doubled.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_only_include_set_clauses() {
        let q = SoqlQuery::new().filter("geoid = 'R-1'").limit(1);
        assert_eq!(
            q.to_params(),
            vec![("$where", "geoid = 'R-1'".to_string()), ("$limit", "1".to_string())]
        );
        assert!(SoqlQuery::new().to_params().is_empty());
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quote("O'NEIL"), "'O''NEIL'");
    }
}
