//! Configuration endpoints: fetch, update, validate.

use md2docx_core::ConfigData;
use serde::Deserialize;
use tracing::{debug, info};

use super::{ApiClient, CONFIG_PATH, VALIDATE_PATH, decode};
use crate::error::{ApiError, ApiResult};

const DEFAULT_VALID_MESSAGE: &str = "Configuration is valid";
const DEFAULT_INVALID_MESSAGE: &str = "Configuration is invalid";

/// GET reply: the config fields plus an optional status envelope.
#[derive(Debug, Deserialize)]
struct ConfigEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    config: ConfigData,
}

/// Acknowledgement of a config update. Every field is optional.
#[derive(Debug, Default, Deserialize)]
struct UpdateAck {
    #[serde(default)]
    message: Option<String>,
}

/// Validation reply.
///
/// `valid` is authoritative. Backends that only report `success` are
/// accepted too. A reply with neither flag is a failure.
#[derive(Debug, Default, Deserialize)]
struct ValidationReply {
    #[serde(default)]
    valid: Option<bool>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ValidationReply {
    fn verdict(&self) -> bool {
        self.valid.or(self.success).unwrap_or(false)
    }

    fn into_result(self) -> ApiResult<String> {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        if self.verdict() {
            Ok(non_empty(self.message).unwrap_or_else(|| DEFAULT_VALID_MESSAGE.to_string()))
        } else {
            // On failure the specific error beats a generic status message
            let message = non_empty(self.error)
                .or_else(|| non_empty(self.message))
                .unwrap_or_else(|| DEFAULT_INVALID_MESSAGE.to_string());
            Err(ApiError::semantic(message))
        }
    }
}

impl ApiClient {
    /// Fetch the backend configuration.
    ///
    /// A missing `server_port` decodes as the default port.
    pub async fn get_config(&self) -> ApiResult<ConfigData> {
        const OP: &str = "get config";
        let resp = self.get_raw(OP, CONFIG_PATH).await?;
        let envelope: ConfigEnvelope = decode(OP, &resp)?;

        if envelope.success == Some(false) {
            let message = envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| "Backend refused to return its configuration".to_string());
            return Err(ApiError::semantic(message));
        }

        Ok(envelope.config)
    }

    /// Persist `config` on the backend.
    ///
    /// Success is decided by the HTTP status alone. The acknowledgement
    /// message is returned when the body carries one.
    pub async fn update_config(&self, config: &ConfigData) -> ApiResult<Option<String>> {
        const OP: &str = "update config";
        let resp = self.post_raw(OP, CONFIG_PATH, Some(config)).await?;

        let ack: UpdateAck = serde_json::from_slice(&resp.body).unwrap_or_default();
        info!(pandoc_path = %config.pandoc_path, "Backend configuration updated");
        Ok(ack.message.filter(|m| !m.is_empty()))
    }

    /// Ask the backend to validate its current configuration.
    ///
    /// Returns the backend's message. A reply declaring `valid: false`,
    /// or not declaring a verdict at all, is a [`ApiError::Semantic`]
    /// failure even though the request itself succeeded.
    pub async fn validate_config(&self) -> ApiResult<String> {
        const OP: &str = "validate config";
        let resp = self.post_raw::<()>(OP, VALIDATE_PATH, None).await?;

        let reply: ValidationReply = if resp.body.iter().all(u8::is_ascii_whitespace) {
            ValidationReply::default()
        } else {
            decode(OP, &resp)?
        };
        debug!(valid = reply.verdict(), "Validation reply");
        reply.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client_with;
    use crate::error::ApiErrorKind;
    use crate::http::{MockHttpBackend, RawResponse, SendError};

    fn get_returning(status: u16, body: &'static str) -> MockHttpBackend {
        let mut mock = MockHttpBackend::new();
        mock.expect_get()
            .withf(|url, _| url.ends_with("/api/config"))
            .times(1)
            .returning(move |_, _| Ok(RawResponse::new(status, body)));
        mock
    }

    fn post_returning(path: &'static str, status: u16, body: &'static str) -> MockHttpBackend {
        let mut mock = MockHttpBackend::new();
        mock.expect_post_json()
            .withf(move |url, _| url.ends_with(path))
            .times(1)
            .returning(move |_, _| Ok(RawResponse::new(status, body)));
        mock
    }

    #[tokio::test]
    async fn test_get_config_decodes_envelope() {
        let mock = get_returning(
            200,
            r#"{"success":true,"message":"ok","pandoc_path":"pandoc","template_file":"/t.docx"}"#,
        );
        let config = client_with(mock).get_config().await.unwrap();
        assert_eq!(config.pandoc_path, "pandoc");
        assert_eq!(config.template_file, "/t.docx");
        assert_eq!(config.server_port, 8080);
    }

    #[tokio::test]
    async fn test_get_config_distinguishes_transport_and_decode() {
        let mut mock = MockHttpBackend::new();
        mock.expect_get()
            .returning(|_, _| Err(SendError::new("connection refused")));
        let err = client_with(mock).get_config().await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Transport);

        let mock = get_returning(200, "<html>not json</html>");
        let err = client_with(mock).get_config().await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_get_config_envelope_failure_is_semantic() {
        let mock = get_returning(200, r#"{"success":false,"error":"config locked"}"#);
        let err = client_with(mock).get_config().await.unwrap_err();
        assert_eq!(err, ApiError::semantic("config locked"));
    }

    #[tokio::test]
    async fn test_update_config_sends_wire_shape() {
        let mut mock = MockHttpBackend::new();
        mock.expect_post_json()
            .withf(|url, body| {
                url == "http://backend:8081/api/config"
                    && body.as_ref().is_some_and(|b| {
                        b["pandoc_path"] == "/usr/bin/pandoc" && b["server_port"] == 8081
                    })
            })
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"success":true,"message":"saved"}"#)));

        let config = ConfigData {
            pandoc_path: "/usr/bin/pandoc".to_string(),
            template_file: String::new(),
            server_port: 8081,
        };
        let ack = client_with(mock).update_config(&config).await.unwrap();
        assert_eq!(ack.as_deref(), Some("saved"));
    }

    #[tokio::test]
    async fn test_update_config_tolerates_missing_body() {
        let mock = post_returning("/api/config", 204, "");
        let ack = client_with(mock)
            .update_config(&ConfigData::default())
            .await
            .unwrap();
        assert!(ack.is_none());
    }

    #[tokio::test]
    async fn test_validate_false_is_semantic_failure() {
        let mock = post_returning("/api/config/validate", 200, r#"{"valid":false,"message":"bad path"}"#);
        let err = client_with(mock).validate_config().await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Semantic);
        assert_eq!(err.to_string(), "bad path");
    }

    #[tokio::test]
    async fn test_validate_sends_empty_body() {
        let mut mock = MockHttpBackend::new();
        mock.expect_post_json()
            .withf(|_, body| body.is_none())
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"valid":true,"message":"all good"}"#)));
        let message = client_with(mock).validate_config().await.unwrap();
        assert_eq!(message, "all good");
    }

    #[tokio::test]
    async fn test_validate_success_flag_fallback() {
        let mock = post_returning(
            "/api/config/validate",
            200,
            r#"{"success":false,"message":"validated","error":"pandoc not found"}"#,
        );
        let err = client_with(mock).validate_config().await.unwrap_err();
        assert_eq!(err, ApiError::semantic("pandoc not found"));
    }

    #[tokio::test]
    async fn test_validate_without_verdict_is_semantic_failure() {
        let mock = post_returning("/api/config/validate", 200, r#"{"message":"pandoc missing"}"#);
        let err = client_with(mock).validate_config().await.unwrap_err();
        assert_eq!(err, ApiError::semantic("pandoc missing"));
    }

    #[tokio::test]
    async fn test_validate_empty_body_is_semantic_failure() {
        let mock = post_returning("/api/config/validate", 200, "");
        let err = client_with(mock).validate_config().await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Semantic);
        assert_eq!(err.to_string(), DEFAULT_INVALID_MESSAGE);
    }

    #[test]
    fn test_valid_flag_beats_success_flag() {
        let reply = ValidationReply {
            valid: Some(false),
            success: Some(true),
            ..Default::default()
        };
        assert!(!reply.verdict());
        assert_eq!(
            reply.into_result().unwrap_err(),
            ApiError::semantic(DEFAULT_INVALID_MESSAGE)
        );
    }
}
