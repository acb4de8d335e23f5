//! Conversion endpoints.

use md2docx_core::{BatchConversionRequest, ConversionRequest, ConversionResponse};
use tracing::{info, warn};

use super::{ApiClient, CONVERT_BATCH_PATH, CONVERT_SINGLE_PATH, decode};
use crate::error::{ApiError, ApiResult};
use crate::http::RawResponse;

/// Result of a conversion call.
///
/// `response` always has the same shape. When nothing usable came back
/// from the backend it is synthesized with `success = false` and the
/// failure text in `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub response: ConversionResponse,
    /// `None` when the backend reported success.
    pub error: Option<ApiError>,
}

impl ConversionOutcome {
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    fn synthesized(error: ApiError) -> Self {
        Self {
            response: ConversionResponse::transport_failure(error.to_string()),
            error: Some(error),
        }
    }

    fn from_reply(operation: &'static str, reply: ApiResult<RawResponse>) -> Self {
        let raw = match reply {
            Ok(raw) => raw,
            Err(e) => return Self::synthesized(e),
        };
        let response: ConversionResponse = match decode(operation, &raw) {
            Ok(response) => response,
            Err(e) => return Self::synthesized(e),
        };

        if response.success {
            Self {
                response,
                error: None,
            }
        } else {
            let error = ApiError::semantic(response.failure_message());
            Self {
                response,
                error: Some(error),
            }
        }
    }
}

impl ApiClient {
    /// Convert one file.
    pub async fn convert_single(&self, request: &ConversionRequest) -> ConversionOutcome {
        const OP: &str = "convert single";
        let reply = self.post_raw(OP, CONVERT_SINGLE_PATH, Some(request)).await;
        let outcome = ConversionOutcome::from_reply(OP, reply);

        match &outcome.error {
            None => info!(
                input = %request.input_file.display(),
                output = ?outcome.response.output_file,
                "Conversion succeeded"
            ),
            Some(e) => warn!(input = %request.input_file.display(), error = %e, "Conversion failed"),
        }
        outcome
    }

    /// Convert several files in one request.
    ///
    /// `response.results` holds one entry per input in whatever order the
    /// backend produced; use [`ConversionResponse::find_result`] to match
    /// them up. `response.success` is the backend's own aggregate verdict.
    pub async fn convert_batch(&self, request: &BatchConversionRequest) -> ConversionOutcome {
        const OP: &str = "convert batch";
        let reply = self.post_raw(OP, CONVERT_BATCH_PATH, Some(request)).await;
        let outcome = ConversionOutcome::from_reply(OP, reply);

        info!(
            files = request.input_files().len(),
            failed = outcome.response.failed_count(),
            success = outcome.response.success,
            "Batch conversion finished"
        );
        outcome
    }
}
