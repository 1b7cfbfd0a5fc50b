//! Socrata (NYC Open Data) row fetching.

use std::time::Duration;

use async_trait::async_trait;
use geoscope_filter_models::DatasetFilter;
use geoscope_http::{DEFAULT_TIMEOUT, send_json};
use serde_json::Value;

use crate::FilterError;

/// NYC Open Data portal.
pub const DEFAULT_DOMAIN: &str = "data.cityofnewyork.us";

/// Header carrying the optional Socrata app token.
const APP_TOKEN_HEADER: &str = "X-App-Token";

/// A tabular service that answers `SoQL` queries with JSON rows.
#[async_trait]
pub trait DatasetService: Send + Sync {
    /// Fetches rows of a dataset, optionally filtered and limited.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if the request fails or the response is
    /// not a row array.
    async fn fetch(
        &self,
        dataset_id: &str,
        where_clause: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Value>, FilterError>;

    /// Fetches the rows a built filter selects.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if the fetch fails.
    async fn fetch_filtered(&self, filter: &DatasetFilter) -> Result<Vec<Value>, FilterError> {
        self.fetch(
            &filter.dataset_id,
            filter.where_clause.as_deref(),
            Some(filter.limit),
        )
        .await
    }
}

/// Client for the Socrata resource API.
pub struct SocrataClient {
    client: reqwest::Client,
    domain: String,
    app_token: Option<String>,
}

impl SocrataClient {
    /// Client for `domain`, with an optional app token.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Http`] if the HTTP client cannot be built.
    pub fn new(
        domain: impl Into<String>,
        app_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FilterError> {
        Ok(Self {
            client: geoscope_http::client(timeout)?,
            domain: domain.into(),
            app_token: app_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Client for NYC Open Data with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Http`] if the HTTP client cannot be built.
    pub fn nyc(app_token: Option<String>) -> Result<Self, FilterError> {
        Self::new(DEFAULT_DOMAIN, app_token, DEFAULT_TIMEOUT)
    }

    /// Resource URL of a dataset.
    #[must_use]
    pub fn resource_url(&self, dataset_id: &str) -> String {
        format!(
            "https://{}/resource/{dataset_id}.json",
            self.domain.trim_end_matches('/')
        )
    }
}

/// `$where`/`$limit` query parameters.
#[must_use]
pub fn query_params(where_clause: Option<&str>, limit: Option<u32>) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(predicate) = where_clause {
        params.push(("$where", predicate.to_string()));
    }
    if let Some(limit) = limit {
        params.push(("$limit", limit.to_string()));
    }
    params
}

/// Takes the row array out of a response body.
///
/// # Errors
///
/// Returns [`FilterError::Response`] if the body is not an array.
pub fn parse_rows(body: Value, url: &str) -> Result<Vec<Value>, FilterError> {
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Object(map) if map.contains_key("error") || map.contains_key("message") => {
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("error response")
                .to_string();
            Err(FilterError::Response {
                url: url.to_string(),
                message,
            })
        }
        other => Err(FilterError::Response {
            url: url.to_string(),
            message: format!("expected a row array, got {}", kind_of(&other)),
        }),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl DatasetService for SocrataClient {
    async fn fetch(
        &self,
        dataset_id: &str,
        where_clause: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Value>, FilterError> {
        let url = self.resource_url(dataset_id);
        let params = query_params(where_clause, limit);
        log::debug!("Socrata {dataset_id}: {params:?}");

        let body = send_json(|| {
            let request = self.client.get(&url).query(&params);
            match &self.app_token {
                Some(token) => request.header(APP_TOKEN_HEADER, token),
                None => request,
            }
        })
        .await?;

        let rows = parse_rows(body, &url)?;
        log::info!("Fetched {} rows from {dataset_id}", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Recorder {
        calls: std::sync::Mutex<Vec<(String, Option<String>, Option<u32>)>>,
    }

    #[async_trait]
    impl DatasetService for Recorder {
        async fn fetch(
            &self,
            dataset_id: &str,
            where_clause: Option<&str>,
            limit: Option<u32>,
        ) -> Result<Vec<Value>, FilterError> {
            self.calls.lock().unwrap().push((
                dataset_id.to_string(),
                where_clause.map(str::to_string),
                limit,
            ));
            Ok(vec![json!({ "ok": true })])
        }
    }

    #[tokio::test]
    async fn fetch_filtered_passes_the_filter_through() {
        let service = Recorder {
            calls: std::sync::Mutex::new(Vec::new()),
        };
        let filter = DatasetFilter {
            dataset_id: "5uac-w243".to_string(),
            where_clause: Some("addr_pct_cd IN ('1')".to_string()),
            limit: 1000,
            kind: geoscope_filter_models::FilterKind::Scoped,
        };
        let rows = service.fetch_filtered(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            service.calls.lock().unwrap().as_slice(),
            &[(
                "5uac-w243".to_string(),
                Some("addr_pct_cd IN ('1')".to_string()),
                Some(1000)
            )]
        );
    }

    #[test]
    fn resource_urls() {
        let client = SocrataClient::nyc(None).unwrap();
        assert_eq!(
            client.resource_url("5uac-w243"),
            "https://data.cityofnewyork.us/resource/5uac-w243.json"
        );
    }

    #[test]
    fn blank_app_token_is_ignored() {
        let client = SocrataClient::nyc(Some("  ".to_string())).unwrap();
        assert!(client.app_token.is_none());
    }

    #[test]
    fn query_parameters() {
        assert_eq!(
            query_params(Some("addr_pct_cd IN ('18')"), Some(50)),
            vec![
                ("$where", "addr_pct_cd IN ('18')".to_string()),
                ("$limit", "50".to_string())
            ]
        );
        assert!(query_params(None, None).is_empty());
    }

    #[test]
    fn rows_from_an_array_body() {
        let rows = parse_rows(json!([{ "bbl": "1" }, { "bbl": "2" }]), "u").unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn error_bodies_surface_their_message() {
        let err = parse_rows(json!({ "error": true, "message": "no such column: bbl" }), "u")
            .unwrap_err();
        assert!(err.to_string().contains("no such column: bbl"));
        assert!(matches!(
            parse_rows(json!("nope"), "u"),
            Err(FilterError::Response { .. })
        ));
    }
}
