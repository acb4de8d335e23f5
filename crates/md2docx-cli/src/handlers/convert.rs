//! Convert and batch command handlers.
//!
//! Both resolve the template against stored settings, run the request on
//! a ready session and remember the directories used.

use std::path::{Path, PathBuf};

use anyhow::Result;
use md2docx_client::ApiErrorKind;
use md2docx_core::{
    BatchConversionRequest, ConversionRequest, ConversionResponse, ConversionResult, SettingsStore,
};
use tracing::warn;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Arguments for a single conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertArgs {
    pub input: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub output_name: Option<String>,
    pub template: Option<PathBuf>,
    pub no_template: bool,
}

/// Arguments for a batch conversion.
#[derive(Debug, Clone, Default)]
pub struct BatchArgs {
    pub inputs: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub no_template: bool,
}

/// Execute the convert command.
pub async fn execute(ctx: &CliContext, args: ConvertArgs) -> Result<()> {
    let template = resolve_template(args.template, args.no_template, ctx.settings());
    let mut request = ConversionRequest::new(&args.input).with_template(template);
    if let Some(dir) = &args.output_dir {
        request = request.with_output_dir(dir);
    }
    if let Some(name) = &args.output_name {
        request = request.with_output_name(name);
    }

    let session = ctx.connect().await?;
    let outcome = session.client().map_err(CliError::from)?.convert_single(&request).await;
    session.stop().await;

    if let Some(err) = outcome.error {
        let err = match err.kind() {
            ApiErrorKind::Semantic => CliError::Conversion(outcome.response.failure_message()),
            _ => err.into(),
        };
        return Err(err.into());
    }

    record_conversion(ctx.settings(), &[args.input], args.output_dir.as_deref());
    match &outcome.response.output_file {
        Some(output) => println!("✓ {}", output.display()),
        None => println!("✓ {}", outcome.response.message),
    }
    Ok(())
}

/// Execute the batch command.
///
/// Prints one line per result. Fails when the backend's own verdict is
/// failure, even if some files converted.
pub async fn batch(ctx: &CliContext, args: BatchArgs) -> Result<()> {
    let template = resolve_template(args.template, args.no_template, ctx.settings());
    let request = BatchConversionRequest::new(args.inputs)
        .map_err(CliError::from)?
        .with_output_dir(args.output_dir.clone())
        .with_template(template);

    let session = ctx.connect().await?;
    let outcome = session.client().map_err(CliError::from)?.convert_batch(&request).await;
    session.stop().await;

    for line in result_lines(request.input_files(), &outcome.response) {
        println!("{line}");
    }
    println!("{}", summary_line(&outcome.response));

    if outcome.response.results.iter().any(|r| r.success) {
        record_batch(ctx.settings(), request.input_files(), args.output_dir.as_deref());
    }

    match outcome.error {
        Some(err) if outcome.response.results.is_empty() => Err(CliError::from(err).into()),
        Some(_) => Err(CliError::Conversion(outcome.response.failure_message()).into()),
        None => Ok(()),
    }
}

/// Explicit template, else the stored one when enabled.
pub fn resolve_template(
    explicit: Option<PathBuf>,
    no_template: bool,
    settings: &dyn SettingsStore,
) -> Option<PathBuf> {
    if no_template {
        return None;
    }
    explicit.or_else(|| {
        settings
            .use_template()
            .then(|| settings.template_file())
            .flatten()
    })
}

/// Remember the files and directories of a successful conversion.
///
/// Settings failures are logged, never fatal.
pub fn record_conversion(settings: &dyn SettingsStore, inputs: &[PathBuf], output_dir: Option<&Path>) {
    for input in inputs {
        if let Err(e) = settings.add_recent_file(input.clone()) {
            warn!(error = %e, "Failed to record recent file");
        }
    }
    if let Some(dir) = inputs.first().and_then(|f| f.parent()).filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = settings.set_last_input_dir(dir.to_path_buf()) {
            warn!(error = %e, "Failed to record input directory");
        }
    }
    if let Some(dir) = output_dir {
        if let Err(e) = settings.set_last_output_dir(dir.to_path_buf()) {
            warn!(error = %e, "Failed to record output directory");
        }
    }
}

fn record_batch(settings: &dyn SettingsStore, inputs: &[PathBuf], output_dir: Option<&Path>) {
    record_conversion(settings, inputs, output_dir);
    if let Some(dir) = inputs.first().and_then(|f| f.parent()).filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = settings.set_last_multi_input_dir(dir.to_path_buf()) {
            warn!(error = %e, "Failed to record batch input directory");
        }
    }
}

/// One line per requested file, in request order.
///
/// Results are matched by input path since the backend may reorder them;
/// entries for paths that were not requested are appended.
pub fn result_lines(requested: &[PathBuf], response: &ConversionResponse) -> Vec<String> {
    let mut lines: Vec<String> = requested
        .iter()
        .map(|input| match response.find_result(input) {
            Some(result) => format_result(result),
            None => format!("? {} (no result)", input.display()),
        })
        .collect();

    lines.extend(
        response
            .results
            .iter()
            .filter(|r| !requested.contains(&r.input_file))
            .map(format_result),
    );
    lines
}

fn format_result(result: &ConversionResult) -> String {
    if result.success {
        match &result.output_file {
            Some(output) => format!("✓ {} -> {}", result.input_file.display(), output.display()),
            None => format!("✓ {}", result.input_file.display()),
        }
    } else {
        format!(
            "✗ {}: {}",
            result.input_file.display(),
            result.error.as_deref().unwrap_or("unknown error")
        )
    }
}

pub fn summary_line(response: &ConversionResponse) -> String {
    let total = response.results.len();
    let failed = response.failed_count();
    let verdict = if response.success { "succeeded" } else { "failed" };
    if total == 0 {
        format!("Batch {verdict}: {}", response.failure_message())
    } else {
        format!("Batch {verdict}: {} of {total} converted", total - failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use md2docx_core::{MemorySettingsStore, SettingsData};

    fn result(input: &str, success: bool) -> ConversionResult {
        ConversionResult {
            input_file: PathBuf::from(input),
            output_file: success.then(|| PathBuf::from(input).with_extension("docx")),
            success,
            error: (!success).then(|| "pandoc exited with 1".to_string()),
        }
    }

    fn response(success: bool, results: Vec<ConversionResult>) -> ConversionResponse {
        ConversionResponse {
            success,
            message: String::new(),
            output_file: None,
            results,
            error: None,
        }
    }

    #[test]
    fn test_template_precedence() {
        let store = MemorySettingsStore::with_data(SettingsData {
            template_file: Some(PathBuf::from("/stored.docx")),
            use_template: true,
            ..SettingsData::default()
        });

        assert_eq!(
            resolve_template(Some(PathBuf::from("/flag.docx")), false, &store),
            Some(PathBuf::from("/flag.docx"))
        );
        assert_eq!(
            resolve_template(None, false, &store),
            Some(PathBuf::from("/stored.docx"))
        );
        assert_eq!(resolve_template(None, true, &store), None);

        store.set_use_template(false).unwrap();
        assert_eq!(resolve_template(None, false, &store), None);
    }

    #[test]
    fn test_record_conversion_updates_settings() {
        let store = MemorySettingsStore::new();
        record_conversion(
            &store,
            &[PathBuf::from("/docs/a.md")],
            Some(Path::new("/out")),
        );

        assert_eq!(store.recent_files(), vec![PathBuf::from("/docs/a.md")]);
        assert_eq!(store.last_input_dir(), PathBuf::from("/docs"));
        assert_eq!(store.last_output_dir(), PathBuf::from("/out"));
    }

    #[test]
    fn test_record_batch_sets_multi_input_dir() {
        let store = MemorySettingsStore::new();
        let inputs = [PathBuf::from("/notes/a.md"), PathBuf::from("/notes/b.md")];
        record_batch(&store, &inputs, None);

        assert_eq!(store.last_multi_input_dir(), PathBuf::from("/notes"));
        assert_eq!(store.recent_files()[0], PathBuf::from("/notes/b.md"));
    }

    #[test]
    fn test_result_lines_follow_request_order() {
        let requested = [
            PathBuf::from("a.md"),
            PathBuf::from("b.md"),
            PathBuf::from("c.md"),
        ];
        // Backend answered out of order
        let resp = response(
            false,
            vec![result("c.md", true), result("a.md", true), result("b.md", false)],
        );

        let lines = result_lines(&requested, &resp);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("✓ a.md"));
        assert_eq!(lines[1], "✗ b.md: pandoc exited with 1");
        assert!(lines[2].starts_with("✓ c.md"));
        assert_eq!(summary_line(&resp), "Batch failed: 2 of 3 converted");
    }

    #[test]
    fn test_missing_and_extra_results() {
        let requested = [PathBuf::from("a.md")];
        let resp = response(true, vec![result("z.md", true)]);

        let lines = result_lines(&requested, &resp);
        assert_eq!(lines[0], "? a.md (no result)");
        assert!(lines[1].starts_with("✓ z.md"));
    }

    #[test]
    fn test_summary_without_results_uses_failure_message() {
        let resp = ConversionResponse::transport_failure("connection refused");
        assert_eq!(summary_line(&resp), "Batch failed: connection refused");
    }
}
