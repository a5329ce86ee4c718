use anyhow::Result;
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::orchestrator::{ContentId, DiagnosticEntry, TranscriptResult};

/// JSON shape of a fetch outcome
#[derive(Debug, Serialize)]
pub struct TranscriptReport<'a> {
    pub content_id: &'a str,
    pub success: bool,
    /// Strategy tag, or "AllFailed"
    pub method: &'static str,
    pub method_label: &'static str,
    pub text: Option<&'a str>,
    pub reasons: &'a [DiagnosticEntry],
    pub fetched_at: DateTime<Utc>,
}

impl<'a> TranscriptReport<'a> {
    pub fn new(content_id: &'a ContentId, result: &'a TranscriptResult) -> Self {
        Self {
            content_id: content_id.as_str(),
            success: result.is_success(),
            method: result.method().as_str(),
            method_label: result.method().label(),
            text: result.text(),
            reasons: result.reasons(),
            fetched_at: Utc::now(),
        }
    }
}

/// Render the result in the requested format
pub fn render(
    content_id: &ContentId,
    result: &TranscriptResult,
    format: &OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(result)),
        OutputFormat::Json => format_as_json(content_id, result),
    }
}

/// Transcript text on success, the diagnostic trail on failure
pub fn format_as_text(result: &TranscriptResult) -> String {
    match result.text() {
        Some(text) => text.to_string(),
        None => format_diagnostics(result),
    }
}

pub fn format_as_json(content_id: &ContentId, result: &TranscriptResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&TranscriptReport::new(content_id, result))?)
}

/// One line per tier that did not produce a transcript
pub fn format_diagnostics(result: &TranscriptResult) -> String {
    let mut lines = vec![format!("{}:", result.method().label())];
    lines.extend(
        result
            .reasons()
            .iter()
            .enumerate()
            .map(|(index, entry)| format!("  {}. {}", index + 1, entry)),
    );
    lines.join("\n")
}

/// Print the diagnostic trail to stderr
pub fn print_diagnostics(result: &TranscriptResult) {
    if result.reasons().is_empty() {
        return;
    }

    if result.is_success() {
        eprintln!(
            "{} obtained via {} after:",
            style("Transcript").green(),
            result.method()
        );
    } else {
        eprintln!("{}", style(result.method().label()).red().bold());
    }

    for entry in result.reasons() {
        eprintln!("  {} {}", style("•").dim(), entry);
    }
}

/// Save transcription result to file
pub async fn save_to_file(
    content_id: &ContentId,
    result: &TranscriptResult,
    path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let content = render(content_id, result, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcription result to console
pub fn print_to_console(
    content_id: &ContentId,
    result: &TranscriptResult,
    format: &OutputFormat,
) -> Result<()> {
    let content = render(content_id, result, format)?;
    println!("{}", content);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{StrategyName, DURATION_SKIP_REASON, NO_CREDENTIALS_REASON};

    fn failure() -> TranscriptResult {
        TranscriptResult::Failure {
            reasons: vec![
                DiagnosticEntry::new(StrategyName::OfficialApi, NO_CREDENTIALS_REASON),
                DiagnosticEntry::new(StrategyName::UnofficialLibrary, "captions disabled"),
                DiagnosticEntry::new(StrategyName::AudioTranscription, DURATION_SKIP_REASON),
            ],
        }
    }

    #[test]
    fn test_text_output_of_success_is_transcript() {
        let result = TranscriptResult::Success {
            text: "auto-caption text".to_string(),
            method: StrategyName::UnofficialLibrary,
            reasons: vec![],
        };

        assert_eq!(format_as_text(&result), "auto-caption text");
    }

    #[test]
    fn test_text_output_of_failure_lists_reasons() {
        let text = format_as_text(&failure());

        assert_eq!(
            text,
            "All methods failed:\n  1. Official API: no credentials provided\n  2. Unofficial Library: captions disabled\n  3. Audio Transcription: skipped: duration exceeds threshold"
        );
    }

    #[test]
    fn test_json_report_fields() {
        let id = ContentId::new("kL8Bfl_c4dY");
        let json = format_as_json(&id, &failure()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["content_id"], "kL8Bfl_c4dY");
        assert_eq!(value["success"], false);
        assert_eq!(value["method"], "AllFailed");
        assert_eq!(value["method_label"], "All methods failed");
        assert!(value["text"].is_null());
        assert_eq!(value["reasons"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["reasons"][2]["strategy_name"], "AudioTranscription");
    }

    #[tokio::test]
    async fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let result = TranscriptResult::Success {
            text: "saved text".to_string(),
            method: StrategyName::OfficialApi,
            reasons: vec![],
        };

        save_to_file(&ContentId::new("dQw4w9WgXcQ"), &result, &path, &OutputFormat::Text)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "saved text");
    }
}
