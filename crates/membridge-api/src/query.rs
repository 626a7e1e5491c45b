//! List-endpoint query parameters.

use serde_json::Value;

/// Query parameters accepted by every collection endpoint: a JSON `where`
/// filter, page size, page number, and an `embedded` projection.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    filter: Option<Value>,
    max_results: Option<u32>,
    page: Option<u32>,
    embedded: Option<Value>,
}

impl ListQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `where` filter document.
    #[must_use]
    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the `embedded` projection, inflating related resources in place.
    #[must_use]
    pub fn embedded(mut self, embedded: Value) -> Self {
        self.embedded = Some(embedded);
        self
    }

    /// Render as key/value pairs for the request query string.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref filter) = self.filter {
            params.push(("where", filter.to_string()));
        }
        if let Some(max_results) = self.max_results {
            params.push(("max_results", max_results.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(ref embedded) = self.embedded {
            params.push(("embedded", embedded.to_string()));
        }
        params
    }

    /// Translate a limit/offset window into page-based parameters
    /// (the API paginates with `page`, not an offset).
    #[must_use]
    pub fn window(self, limit: Option<u32>, offset: u32) -> Self {
        let limit = limit.unwrap_or(25).max(1);
        let query = self.max_results(limit);
        if offset > 0 {
            query.page(offset / limit + 1)
        } else {
            query
        }
    }
}
