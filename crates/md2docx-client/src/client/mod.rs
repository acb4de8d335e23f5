//! Backend API client.
//!
//! One `ApiClient` call issues one HTTP request and yields one outcome.
//! Nothing is cached between calls except the base URL, which the session
//! swaps when the backend comes up on its final port.

mod configuration;
mod conversion;
mod pending;

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::{ApiClientConfig, normalize_base_url};
use crate::error::{ApiError, ApiResult};
use crate::http::{HttpBackend, RawResponse, ReqwestBackend};

pub use conversion::ConversionOutcome;
pub use pending::PendingReply;

/// Liveness endpoint.
pub const HEALTH_PATH: &str = "/health";
pub(crate) const CONFIG_PATH: &str = "/api/config";
pub(crate) const VALIDATE_PATH: &str = "/api/config/validate";
pub(crate) const CONVERT_SINGLE_PATH: &str = "/api/convert/single";
pub(crate) const CONVERT_BATCH_PATH: &str = "/api/convert/batch";

/// Asynchronous client for the conversion backend.
///
/// Cheap to clone; clones share the base URL, so re-pointing one re-points
/// all of them. Requests already in flight keep the URL they started with.
#[derive(Clone)]
pub struct ApiClient {
    backend: Arc<dyn HttpBackend>,
    base_url: Arc<RwLock<String>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client backed by reqwest.
    pub fn new(config: &ApiClientConfig) -> ApiResult<Self> {
        let backend = ReqwestBackend::new(config)
            .map_err(|e| ApiError::transport("client setup", e.detail))?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Create a client over a custom transport.
    pub fn with_backend(config: &ApiClientConfig, backend: Arc<dyn HttpBackend>) -> Self {
        Self {
            backend,
            base_url: Arc::new(RwLock::new(config.base_url.clone())),
        }
    }

    /// Current base URL, e.g. `http://localhost:8081`.
    pub fn base_url(&self) -> String {
        self.base_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Point subsequent calls at a different backend.
    pub fn set_base_url(&self, url: impl Into<String>) {
        let url = normalize_base_url(url.into());
        debug!(base_url = %url, "API client re-pointed");
        *self.base_url.write().unwrap_or_else(PoisonError::into_inner) = url;
    }

    /// Transport shared with this client.
    pub fn backend(&self) -> Arc<dyn HttpBackend> {
        Arc::clone(&self.backend)
    }

    /// GET the liveness endpoint. Any 2xx reply means online.
    pub async fn check_health(&self) -> bool {
        let url = match self.url("health check", HEALTH_PATH) {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %e, "Health check skipped");
                return false;
            }
        };
        match self.backend.get(&url, None).await {
            Ok(resp) => resp.is_success(),
            Err(e) => {
                debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    /// Join an absolute API path onto the base URL.
    fn url(&self, operation: &'static str, path: &str) -> ApiResult<String> {
        let base = self.base_url();
        Url::parse(&base)
            .and_then(|url| url.join(path))
            .map(String::from)
            .map_err(|e| ApiError::transport(operation, format!("invalid base URL {base}: {e}")))
    }

    pub(crate) async fn get_raw(
        &self,
        operation: &'static str,
        path: &str,
    ) -> ApiResult<RawResponse> {
        let url = self.url(operation, path)?;
        debug!(operation, %url, "GET");
        let resp = self
            .backend
            .get(&url, None)
            .await
            .map_err(|e| ApiError::transport(operation, e.detail))?;
        ensure_success(operation, resp)
    }

    pub(crate) async fn post_raw<B: Serialize + Sync>(
        &self,
        operation: &'static str,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<RawResponse> {
        let payload = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ApiError::transport(operation, format!("could not encode request: {e}")))?;
        let url = self.url(operation, path)?;
        debug!(operation, %url, "POST");
        let resp = self
            .backend
            .post_json(&url, payload)
            .await
            .map_err(|e| ApiError::transport(operation, e.detail))?;
        ensure_success(operation, resp)
    }
}

/// Classify a non-2xx reply as a transport failure.
fn ensure_success(operation: &'static str, resp: RawResponse) -> ApiResult<RawResponse> {
    if resp.is_success() {
        return Ok(resp);
    }
    Err(ApiError::Transport {
        operation,
        status: Some(resp.status),
        detail: error_detail(&resp),
    })
}

/// Best explanation for an error reply: the body's `error`/`message`
/// fields, else its text, else the bare status.
fn error_detail(resp: &RawResponse) -> String {
    let fields = serde_json::from_slice::<serde_json::Value>(&resp.body)
        .ok()
        .map(|v| {
            ["error", "message"]
                .iter()
                .filter_map(|key| v.get(*key).and_then(serde_json::Value::as_str))
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if !fields.is_empty() {
        return format!("HTTP {}: {}", resp.status, fields.join(" / "));
    }

    let text = resp.text();
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP {}", resp.status)
    } else {
        format!("HTTP {}: {text}", resp.status)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(
    operation: &'static str,
    resp: &RawResponse,
) -> ApiResult<T> {
    serde_json::from_slice(&resp.body).map_err(|e| ApiError::decode(operation, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorKind;
    use crate::http::{MockHttpBackend, SendError};

    pub(super) fn client_with(mock: MockHttpBackend) -> ApiClient {
        ApiClient::with_backend(
            &ApiClientConfig::new().with_base_url("http://backend:8081"),
            Arc::new(mock),
        )
    }

    #[tokio::test]
    async fn test_check_health_online() {
        let mut mock = MockHttpBackend::new();
        mock.expect_get()
            .withf(|url, _| url == "http://backend:8081/health")
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"status":"ok"}"#)));

        assert!(client_with(mock).check_health().await);
    }

    #[tokio::test]
    async fn test_check_health_offline_on_error_status_or_transport() {
        let mut mock = MockHttpBackend::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(503, "")));
        assert!(!client_with(mock).check_health().await);

        let mut mock = MockHttpBackend::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Err(SendError::new("connection refused")));
        assert!(!client_with(mock).check_health().await);
    }

    #[tokio::test]
    async fn test_set_base_url_repoints_clones() {
        let mut mock = MockHttpBackend::new();
        mock.expect_get()
            .withf(|url, _| url == "http://localhost:8085/health")
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, "")));

        let client = client_with(mock);
        let clone = client.clone();
        client.set_base_url("http://localhost:8085/");

        assert_eq!(clone.base_url(), "http://localhost:8085");
        assert!(clone.check_health().await);
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_transport_error() {
        let mut mock = MockHttpBackend::new();
        mock.expect_get().times(0);

        let client = client_with(mock);
        client.set_base_url("not a url");

        let err = client.get_raw("get config", CONFIG_PATH).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Transport);
        assert!(err.to_string().contains("invalid base URL"));
        assert!(!client.check_health().await);
    }

    #[test]
    fn test_url_joins_path_onto_authority() {
        let client = client_with(MockHttpBackend::new());
        assert_eq!(
            client.url("get config", CONFIG_PATH).unwrap(),
            "http://backend:8081/api/config"
        );

        client.set_base_url("http://[::1]:8090/");
        assert_eq!(
            client.url("health check", HEALTH_PATH).unwrap(),
            "http://[::1]:8090/health"
        );
    }

    #[test]
    fn test_error_status_is_transport_with_body_detail() {
        let resp = RawResponse::new(
            400,
            r#"{"success":false,"message":"Invalid request","error":"unexpected EOF"}"#,
        );
        let err = ensure_success("convert single", resp).unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Transport);
        assert_eq!(err.status(), Some(400));
        let msg = err.to_string();
        assert!(msg.contains("unexpected EOF"));
        assert!(msg.contains("Invalid request"));
    }

    #[test]
    fn test_error_detail_falls_back_to_text_and_status() {
        assert_eq!(
            error_detail(&RawResponse::new(405, "method not allowed\n")),
            "HTTP 405: method not allowed"
        );
        assert_eq!(error_detail(&RawResponse::new(502, "")), "HTTP 502");
    }
}
