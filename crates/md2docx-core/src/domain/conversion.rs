//! Conversion request and response wire types.
//!
//! Field names follow the backend's snake_case JSON. Optional request
//! fields are omitted when absent so the backend applies its own defaults
//! (same directory, derived name, no template).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// Single-file conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub input_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Output file name without extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_file: Option<PathBuf>,
}

impl ConversionRequest {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            output_dir: None,
            output_name: None,
            template_file: None,
        }
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: Option<PathBuf>) -> Self {
        self.template_file = template;
        self
    }
}

/// Batch conversion request.
///
/// `input_files` is never empty and never contains duplicates; both are
/// enforced by [`BatchConversionRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConversionRequest {
    input_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_file: Option<PathBuf>,
}

impl BatchConversionRequest {
    /// Build a batch from `files`, dropping repeated paths (first occurrence wins).
    pub fn new<I, P>(files: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut input_files: Vec<PathBuf> = Vec::new();
        for file in files {
            let file = file.into();
            if !input_files.contains(&file) {
                input_files.push(file);
            }
        }

        if input_files.is_empty() {
            return Err(CoreError::EmptyBatch);
        }

        Ok(Self {
            input_files,
            output_dir: None,
            template_file: None,
        })
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: Option<PathBuf>) -> Self {
        self.template_file = template;
        self
    }

    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }
}

/// Outcome for one file of a batch.
///
/// `error` is only meaningful when `success` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub input_file: PathBuf,
    #[serde(default, deserialize_with = "empty_path_as_none")]
    pub output_file: Option<PathBuf>,
    #[serde(default)]
    pub success: bool,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

/// Response shared by single and batch conversion.
///
/// For single conversions `output_file` is authoritative and `results` is
/// empty. For batch conversions `results` is authoritative; its order is
/// whatever the backend produced and is not assumed to match the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(
        default,
        deserialize_with = "empty_path_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_file: Option<PathBuf>,
    #[serde(default, deserialize_with = "null_as_empty_vec")]
    pub results: Vec<ConversionResult>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

impl ConversionResponse {
    /// Failure shape used when no backend response could be obtained.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: String::new(),
            output_file: None,
            results: Vec::new(),
            error: Some(message.into()),
        }
    }

    /// Look up the batch entry for `input`, regardless of its position.
    pub fn find_result(&self, input: &Path) -> Option<&ConversionResult> {
        self.results.iter().find(|r| r.input_file == input)
    }

    /// Number of batch entries that failed.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    /// Best human-readable explanation of a failure.
    pub fn failure_message(&self) -> String {
        match (&self.error, self.message.is_empty()) {
            (Some(error), true) => error.clone(),
            (Some(error), false) => format!("{}: {error}", self.message),
            (None, false) => self.message.clone(),
            (None, true) => "conversion failed".to_string(),
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn empty_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(empty_string_as_none(deserializer)?.map(PathBuf::from))
}

fn null_as_empty_vec<'de, D>(deserializer: D) -> Result<Vec<ConversionResult>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ConversionResult>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_request_omits_absent_fields() {
        let req = ConversionRequest::new("/docs/readme.md");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"input_file": "/docs/readme.md"}));

        let req = ConversionRequest::new("/docs/readme.md")
            .with_output_dir("/out")
            .with_output_name("manual")
            .with_template(Some(PathBuf::from("/t/ref.docx")));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["output_dir"], "/out");
        assert_eq!(value["output_name"], "manual");
        assert_eq!(value["template_file"], "/t/ref.docx");
    }

    #[test]
    fn test_batch_rejects_empty() {
        let result = BatchConversionRequest::new(Vec::<PathBuf>::new());
        assert!(matches!(result, Err(CoreError::EmptyBatch)));
    }

    #[test]
    fn test_batch_deduplicates_preserving_order() {
        let batch = BatchConversionRequest::new(["b.md", "a.md", "b.md", "c.md", "a.md"]).unwrap();
        let names: Vec<_> = batch
            .input_files()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.md", "a.md", "c.md"]);
    }

    #[test]
    fn test_batch_wire_shape() {
        let batch = BatchConversionRequest::new(["a.md", "b.md"])
            .unwrap()
            .with_output_dir(Some(PathBuf::from("/out")));
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["input_files"], json!(["a.md", "b.md"]));
        assert_eq!(value["output_dir"], "/out");
        assert!(value.get("template_file").is_none());
    }

    #[test]
    fn test_response_decodes_backend_omissions() {
        // Backend omits output_file/results/error when empty
        let resp: ConversionResponse =
            serde_json::from_value(json!({"success": true, "message": "ok"})).unwrap();
        assert!(resp.success);
        assert!(resp.output_file.is_none());
        assert!(resp.results.is_empty());
        assert!(resp.error.is_none());

        let resp: ConversionResponse = serde_json::from_value(json!({
            "success": false, "message": "", "error": "", "results": null
        }))
        .unwrap();
        assert!(resp.error.is_none());
        assert!(resp.results.is_empty());
    }

    #[test]
    fn test_find_result_ignores_order() {
        let resp: ConversionResponse = serde_json::from_value(json!({
            "success": false,
            "message": "1 of 2 failed",
            "results": [
                {"input_file": "b.md", "output_file": "", "success": false, "error": "bad"},
                {"input_file": "a.md", "output_file": "a.docx", "success": true}
            ]
        }))
        .unwrap();

        let a = resp.find_result(Path::new("a.md")).unwrap();
        assert!(a.success);
        assert_eq!(a.output_file.as_deref(), Some(Path::new("a.docx")));

        let b = resp.find_result(Path::new("b.md")).unwrap();
        assert!(!b.success);
        assert!(b.output_file.is_none());
        assert_eq!(b.error.as_deref(), Some("bad"));
        assert_eq!(resp.failed_count(), 1);
    }

    #[test]
    fn test_transport_failure_shape() {
        let resp = ConversionResponse::transport_failure("connection refused");
        assert!(!resp.success);
        assert!(resp.results.is_empty());
        assert_eq!(resp.failure_message(), "connection refused");
    }

    #[test]
    fn test_failure_message_combines_fields() {
        let resp = ConversionResponse {
            message: "Conversion failed".to_string(),
            error: Some("pandoc not found".to_string()),
            ..Default::default()
        };
        assert_eq!(resp.failure_message(), "Conversion failed: pandoc not found");
    }
}
