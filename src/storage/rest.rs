//! REST API repository backend using reqwest.
//!
//! # Feature flag
//!
//! This module is gated behind the `rest` feature flag:
//! ```toml
//! [dependencies]
//! repokit = { version = "0.1", features = ["rest"] }
//! ```
//!
//! # Query translation
//!
//! A remote API only understands URLs, so the translation is deliberately
//! narrow: an equality constraint on the id field becomes a path segment
//! (`{url}/{id}`), every other equality becomes a query parameter, and any
//! non-equality comparison fails with `Unsupported` at query time — the
//! repository cannot teach an arbitrary endpoint about ranges.
//!
//! Verb mapping: `insert` → POST, `query_update` → PATCH, `query_delete` →
//! DELETE, and the `query_replace` override → PUT. A 404 on a read is an
//! empty result, not an error; other non-success statuses surface as
//! `Storage` errors.

use crate::core::error::{RepoError, RepoResult};
use crate::core::filter::Filter;
use crate::core::model::Model;
use crate::core::oper::Oper;
use crate::core::repo::Repository;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Repository backed by a remote REST endpoint.
///
/// # Example
///
/// ```rust,ignore
/// let repo = RestRepo::<Car>::new("https://example.com/api/cars")
///     .with_id_field("registration")
///     .with_header("Authorization", format!("Bearer {}", token));
/// ```
#[derive(Clone, Debug)]
pub struct RestRepo<T> {
    client: reqwest::Client,
    url: String,
    id_field: Option<String>,
    url_params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    result_key: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

/// Render a JSON scalar as a URL path segment or parameter value.
fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<T> RestRepo<T> {
    /// Create a repository over the given base URL (no trailing slash, no
    /// query string — those are derived per request).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            id_field: None,
            url_params: Vec::new(),
            headers: Vec::new(),
            result_key: None,
            _marker: PhantomData,
        }
    }

    /// Use an externally configured client (connection pools, proxies,
    /// default headers). The client is shared, never rebuilt.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Declare the id field; its equality constraint becomes a path segment.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = Some(id_field.into());
        self
    }

    /// Add a query parameter sent with every request.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.url_params.push((key.into(), value.into()));
        self
    }

    /// Add a header sent with every request (e.g. authentication).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Read items from the given key of the response object instead of
    /// expecting a bare array (for APIs that envelope their results).
    pub fn with_result_key(mut self, key: impl Into<String>) -> Self {
        self.result_key = Some(key.into());
        self
    }

    /// Translate a filter into the request URL and query parameters.
    ///
    /// The URL looks like `{url}/{id}?{param}={value}`, with both parts
    /// optional.
    fn request_parts(&self, query: &Filter) -> RepoResult<(String, Vec<(String, String)>)> {
        let mut url = self.url.clone();
        let mut params = self.url_params.clone();
        for (field, oper) in query.iter() {
            let value = match oper {
                Oper::Equal(value) => value,
                other => {
                    return Err(RepoError::unsupported(
                        "rest",
                        format!(
                            "comparison operator {} for field '{}'",
                            other.kind_name(),
                            field
                        ),
                    ));
                }
            };
            if self.id_field.as_deref() == Some(field) {
                url = format!("{}/{}", url, param_text(value));
            } else {
                params.push((field.to_string(), param_text(value)));
            }
        }
        Ok((url, params))
    }

    fn apply_headers(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        request
    }
}

impl<T: Model> RestRepo<T> {
    /// Pull the record list out of a response payload, honoring the
    /// configured result key and accepting single-object responses.
    fn extract_records(&self, payload: Value) -> RepoResult<Vec<Value>> {
        let located = match &self.result_key {
            Some(key) => payload
                .get(key)
                .cloned()
                .ok_or_else(|| {
                    RepoError::storage(
                        "rest",
                        format!("response has no '{}' result key", key),
                    )
                })?,
            None => payload,
        };
        match located {
            Value::Array(records) => Ok(records),
            single => Ok(vec![single]),
        }
    }
}

#[async_trait]
impl<T: Model> Repository<T> for RestRepo<T> {
    fn backend_name(&self) -> &'static str {
        "rest"
    }

    fn id_field(&self) -> Option<&str> {
        self.id_field.as_deref()
    }

    async fn insert(&self, item: &T) -> RepoResult<()> {
        let record = self.item_to_data(item)?;
        let request = self.apply_headers(self.client.post(&self.url)).json(&record);
        request.send().await?.error_for_status()?;
        Ok(())
    }

    async fn query_data(&self, query: &Filter) -> RepoResult<Vec<Value>> {
        let (url, params) = self.request_parts(query)?;
        let request = self.apply_headers(self.client.get(&url)).query(&params);
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let payload: Value = response.error_for_status()?.json().await?;
        self.extract_records(payload)
    }

    async fn query_update(&self, query: &Filter, values: &Map<String, Value>) -> RepoResult<()> {
        let (url, params) = self.request_parts(query)?;
        let request = self
            .apply_headers(self.client.patch(&url))
            .query(&params)
            .json(values);
        request.send().await?.error_for_status()?;
        Ok(())
    }

    async fn query_delete(&self, query: &Filter) -> RepoResult<()> {
        let (url, params) = self.request_parts(query)?;
        let request = self.apply_headers(self.client.delete(&url)).query(&params);
        let response = request.send().await?;
        // Deleting something already gone is a no-op, like everywhere else.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status()?;
        Ok(())
    }

    /// Native replace: PUT the full record at the query URL.
    async fn query_replace(&self, query: &Filter, item: &T) -> RepoResult<()> {
        let (url, params) = self.request_parts(query)?;
        let record = self.item_to_data(item)?;
        let request = self
            .apply_headers(self.client.put(&url))
            .query(&params)
            .json(&record);
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oper::greater_than;
    use crate::filter;
    use serde_json::json;

    fn repo() -> RestRepo<Value> {
        RestRepo::new("https://example.com/api/cars").with_id_field("registration")
    }

    #[test]
    fn test_id_equality_becomes_path_segment() {
        let (url, params) = repo().request_parts(&filter!(registration: "ABC-123")).unwrap();
        assert_eq!(url, "https://example.com/api/cars/ABC-123");
        assert!(params.is_empty());
    }

    #[test]
    fn test_field_equalities_become_params() {
        let (url, params) = repo()
            .request_parts(&filter!(color: "red", milage: 2000))
            .unwrap();
        assert_eq!(url, "https://example.com/api/cars");
        assert_eq!(
            params,
            vec![
                ("color".to_string(), "red".to_string()),
                ("milage".to_string(), "2000".to_string())
            ]
        );
    }

    #[test]
    fn test_default_params_always_included() {
        let repo = repo().with_param("fields", "registration,color");
        let (_, params) = repo.request_parts(&filter!(color: "red")).unwrap();
        assert_eq!(params[0], ("fields".to_string(), "registration,color".to_string()));
    }

    #[test]
    fn test_comparison_kinds_are_unsupported() {
        let err = repo()
            .request_parts(&filter!(milage: greater_than(2000)))
            .unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_OPERATION");
        assert!(err.to_string().contains("greater_than"));
    }

    #[test]
    fn test_extract_records_with_result_key() {
        let repo: RestRepo<Value> = RestRepo::new("https://example.com/api").with_result_key("items");
        let records = repo
            .extract_records(json!({"items": [{"id": 1}, {"id": 2}]}))
            .unwrap();
        assert_eq!(records.len(), 2);

        let err = repo.extract_records(json!({"data": []})).unwrap_err();
        assert!(matches!(err, RepoError::Storage { .. }));
    }

    #[test]
    fn test_extract_single_object_response() {
        let repo: RestRepo<Value> = RestRepo::new("https://example.com/api");
        let records = repo.extract_records(json!({"id": 1})).unwrap();
        assert_eq!(records, vec![json!({"id": 1})]);
    }
}
