use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use tradedesk_core::ApiError;

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for the backend REST client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiClientConfig {
    /// Scheme, host and port of the backend (no trailing path).
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
        }
    }
}

impl ApiClientConfig {
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP implementation of the backend traits.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    config: ApiClientConfig,
    http: Client,
}

impl HttpBackend {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    pub(crate) fn authed(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.request(method, path).bearer_auth(token)
    }

    /// Send `request` and decode a JSON body of type `T`.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = extract_error_message(&body);
            warn!(
                status = status.as_u16(),
                path = %url,
                message = message.as_deref().unwrap_or(""),
                "Backend rejected request"
            );
            return Err(ApiError::rejected(status.as_u16(), message));
        }

        debug!(status = status.as_u16(), path = %url, bytes = body.len(), "Backend response");
        serde_json::from_str(&body).map_err(|e| ApiError::Malformed(format!("{url}: {e}")))
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_decode() {
        ApiError::Malformed(err.to_string())
    } else if err.is_timeout() {
        ApiError::Transport(format!("request timed out: {err}"))
    } else if err.is_connect() {
        ApiError::Transport(format!("connection failed: {err}"))
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// Pull a human-readable reason out of an error body.
///
/// Handles `{"detail": "..."}`, validation lists
/// (`{"detail": [{"msg": "..."}]}`) and `{"message": "..."}`.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let field = value.get("detail").or_else(|| value.get("message"))?;
    let message = match field {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null => return None,
        other => other.to_string(),
    };
    Some(message).filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ApiClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 15);
    }

    #[test]
    fn test_config_builder() {
        let config = ApiClientConfig::default()
            .with_base_url("https://api.example.com/")
            .with_timeout_secs(5);
        assert_eq!(config.timeout_secs, 5);

        let backend = HttpBackend::new(config).unwrap();
        assert_eq!(
            backend.url("/api/accounts"),
            "https://api.example.com/api/accounts"
        );
    }

    #[test]
    fn test_extract_detail_string() {
        assert_eq!(
            extract_error_message(r#"{"detail":"Account not found"}"#).as_deref(),
            Some("Account not found")
        );
    }

    #[test]
    fn test_extract_validation_list() {
        let body = r#"{"detail":[{"loc":["body","RiskPercentage"],"msg":"Risk percentage cannot exceed 10%"},{"msg":"field required"}]}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Risk percentage cannot exceed 10%; field required")
        );
    }

    #[test]
    fn test_extract_message_field() {
        assert_eq!(
            extract_error_message(r#"{"message":"Trade already closed"}"#).as_deref(),
            Some("Trade already closed")
        );
    }

    #[test]
    fn test_extract_nothing_useful() {
        assert_eq!(extract_error_message("<html>502</html>"), None);
        assert_eq!(extract_error_message(r#"{"detail":null}"#), None);
        assert_eq!(extract_error_message(r#"{"detail":""}"#), None);
        assert_eq!(extract_error_message(r#"{"error":"x"}"#), None);
    }
}
