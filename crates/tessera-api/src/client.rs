//! HTTP client for OpenAI-compatible model servers.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tessera_types::CollaboratorError;

use crate::backoff::RetryConfig;

/// Per-request timeout. Local models can be slow on first load.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for one OpenAI-compatible base URL (e.g. `http://127.0.0.1:8080/v1`).
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retry_config: RetryConfig,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            retry_config: RetryConfig::default(),
        })
    }

    /// Set the retry configuration for transient errors (429, 529, 5xx, network).
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, CollaboratorError> {
        let response = self.post_json_raw(path, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
    }

    /// POST a JSON body and return the raw response bytes (e.g. audio).
    pub async fn post_json_bytes(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Bytes, CollaboratorError> {
        let response = self.post_json_raw(path, body).await?;
        response
            .bytes()
            .await
            .map_err(|e| CollaboratorError::Network(e.to_string()))
    }

    /// POST a multipart form and decode a JSON response.
    ///
    /// Forms cannot be cloned, so `make_form` is called once per attempt.
    pub async fn post_multipart<T, F>(&self, path: &str, make_form: F) -> Result<T, CollaboratorError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::multipart::Form,
    {
        let url = self.url(path);
        let headers = self.headers()?;
        let response = self
            .send_with_retry(&url, || {
                self.http
                    .post(&url)
                    .headers(headers.clone())
                    .multipart(make_form())
            })
            .await?;
        response
            .json::<T>()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
    }

    /// GET an absolute URL and return the body. No auth header is sent.
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes, CollaboratorError> {
        let response = self.send_with_retry(url, || self.http.get(url)).await?;
        response
            .bytes()
            .await
            .map_err(|e| CollaboratorError::Network(e.to_string()))
    }

    async fn post_json_raw(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Response, CollaboratorError> {
        let url = self.url(path);
        let headers = self.headers()?;
        let body = serde_json::to_vec(body).map_err(|e| CollaboratorError::BadRequest {
            message: format!("Failed to serialize request: {e}"),
        })?;
        self.send_with_retry(&url, || {
            self.http
                .post(&url)
                .headers(headers.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone())
        })
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn headers(&self) -> Result<HeaderMap, CollaboratorError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                    CollaboratorError::Auth {
                        message: "Invalid API key format".into(),
                    }
                })?,
            );
        }
        Ok(headers)
    }

    /// Send a request built by `build`, retrying transient failures.
    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response, CollaboratorError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut backoff = self.retry_config.schedule();
        let mut attempt = 1;
        loop {
            tracing::debug!("{url} (attempt {attempt})");

            let err = match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retry_after = parse_retry_after(response.headers());
                    let body_text = response.text().await.unwrap_or_default();
                    classify_error(status, &body_text, retry_after)
                }
                Err(e) if e.is_timeout() => CollaboratorError::Timeout,
                Err(e) => CollaboratorError::Network(e.to_string()),
            };

            let Some(delay) = backoff.next_delay(&err) else {
                return Err(err);
            };
            tracing::warn!(
                "{url} failed on attempt {attempt}: {err}. Retrying in {}ms",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Parse the `retry-after` header value as seconds and convert to milliseconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<f64>().ok())
        .map(|secs| (secs * 1000.0) as u64)
}

/// Classify an HTTP error response into a typed CollaboratorError.
fn classify_error(status: u16, body: &str, retry_after: Option<u64>) -> CollaboratorError {
    // OpenAI-style `{"error": {"message": ...}}`, or a bare `{"error": "..."}`
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
    }
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum ErrorDetail {
        Object { message: Option<String> },
        Text(String),
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| match e {
            ErrorDetail::Object { message } => message,
            ErrorDetail::Text(text) => Some(text),
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        401 | 403 => CollaboratorError::Auth { message },
        400 | 404 | 413 | 415 | 422 => CollaboratorError::BadRequest { message },
        429 => CollaboratorError::RateLimited {
            retry_after_ms: retry_after,
        },
        503 | 529 => CollaboratorError::Overloaded,
        _ => CollaboratorError::Server { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after(&headers), Some(1500));
    }

    #[test]
    fn parse_retry_after_missing_or_invalid() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn classify_openai_error_body() {
        let err = classify_error(500, r#"{"error":{"message":"model crashed"}}"#, None);
        match err {
            CollaboratorError::Server { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "model crashed");
            }
            _ => panic!("Expected Server, got {err:?}"),
        }
    }

    #[test]
    fn classify_plain_error_body() {
        let err = classify_error(400, r#"{"error":"unsupported audio"}"#, None);
        assert!(matches!(err, CollaboratorError::BadRequest { message } if message == "unsupported audio"));
    }

    #[test]
    fn classify_non_json_body_kept_verbatim() {
        let err = classify_error(502, "Bad Gateway", None);
        assert!(matches!(err, CollaboratorError::Server { message, .. } if message == "Bad Gateway"));
    }

    #[test]
    fn classify_status_families() {
        assert!(matches!(classify_error(401, "{}", None), CollaboratorError::Auth { .. }));
        assert!(matches!(classify_error(503, "{}", None), CollaboratorError::Overloaded));
        assert!(matches!(
            classify_error(429, "{}", Some(3000)),
            CollaboratorError::RateLimited { retry_after_ms: Some(3000) }
        ));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = HttpClient::new("http://localhost:8080/v1/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
        assert_eq!(
            client.url("/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn bearer_header_only_with_key() {
        let anon = HttpClient::new("http://localhost", None).unwrap();
        assert!(anon.headers().unwrap().get(AUTHORIZATION).is_none());

        let keyed = HttpClient::new("http://localhost", Some("sk-test".into())).unwrap();
        assert_eq!(
            keyed.headers().unwrap().get(AUTHORIZATION).unwrap(),
            "Bearer sk-test"
        );
    }
}
