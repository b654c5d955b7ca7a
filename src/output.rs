use crate::apply::ApplyReport;
use crate::component::ComponentInfo;
use crate::diff_generator::DiffResult;
use crate::error::ErrorPayload;
use crate::file_finder::{ElementQuery, FileCandidate};
use crate::session::SessionSummary;
use crate::types::ManifestSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version for output payloads.
pub const CANVAS_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum CanvasOutput {
    Sessions(SessionsOutput),
    Diff(DiffOutput),
    Apply(ApplyOutput),
    Locate(LocateOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsOutput {
    pub version: String,
    pub root: PathBuf,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffOutput {
    pub version: String,
    pub session_id: String,
    pub url: String,
    pub source: ManifestSource,
    pub change_count: usize,
    #[serde(flatten)]
    pub result: DiffResult,
    /// Unified diff of every file, concatenated.
    pub patch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutput {
    pub version: String,
    #[serde(flatten)]
    pub report: ApplyReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocateOutput {
    pub version: String,
    pub root: PathBuf,
    pub query: ElementQuery,
    pub candidates: Vec<FileCandidate>,
    /// Component enclosing the top candidate, scored against the query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn sessions_output_serializes() {
        let output = CanvasOutput::Sessions(SessionsOutput {
            version: CANVAS_OUTPUT_VERSION.to_string(),
            root: PathBuf::from(".canvas/sessions"),
            sessions: vec![SessionSummary {
                id: "ses-abc123".into(),
                url: "http://localhost:3000/".into(),
                host: Some("localhost".into()),
                selections: 2,
                edits: 3,
                has_save_request: true,
                modified: 1_700_000_000,
            }],
        });

        let json = serde_json::to_string(&output).expect("serialize sessions output");
        assert!(json.contains("\"mode\":\"sessions\""));
        assert!(json.contains("\"hasSaveRequest\":true"));
    }

    #[test]
    fn diff_output_flattens_result() {
        let output = CanvasOutput::Diff(DiffOutput {
            version: CANVAS_OUTPUT_VERSION.to_string(),
            session_id: "ses-1".into(),
            url: "http://localhost".into(),
            source: ManifestSource::SaveRequest,
            change_count: 0,
            result: DiffResult::default(),
            patch: String::new(),
        });

        let json = serde_json::to_string(&output).expect("serialize diff output");
        assert!(json.contains("\"mode\":\"diff\""));
        assert!(json.contains("\"fileDiffs\":[]"));
        assert!(json.contains("\"unmappedChanges\":[]"));
        assert!(json.contains("\"source\":\"save_request\""));
    }

    #[test]
    fn error_output_serializes() {
        let output = CanvasOutput::Error(ErrorOutput {
            version: CANVAS_OUTPUT_VERSION.to_string(),
            message: Some("Session not found: x".into()),
            error: ErrorPayload::new(
                ErrorCategory::Session,
                "Session not found: x".into(),
                "Available sessions: ses-1",
            ),
        });

        let json = serde_json::to_string(&output).expect("serialize error output");
        assert!(json.contains("\"mode\":\"error\""));
        assert!(json.contains("\"category\":\"session\""));
    }
}
