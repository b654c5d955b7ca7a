use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session not found: {id}")]
    SessionNotFound { id: String, available: Vec<String> },

    #[error("Invalid session {id}: {message}")]
    InvalidSession { id: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Apply blocked: {0}")]
    ApplyBlocked(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl CanvasError {
    pub fn session_not_found(id: impl Into<String>, available: Vec<String>) -> Self {
        CanvasError::SessionNotFound {
            id: id.into(),
            available,
        }
    }

    pub fn invalid_session(id: impl Into<String>, message: impl Into<String>) -> Self {
        CanvasError::InvalidSession {
            id: id.into(),
            message: message.into(),
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            CanvasError::Io(e) => ErrorPayload::new(
                ErrorCategory::Io,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            CanvasError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Session,
                e.to_string(),
                "Check that session.json is valid JSON; re-save the session from the overlay.",
            ),
            CanvasError::SessionNotFound { id, available } => {
                let remediation = if available.is_empty() {
                    "No sessions recorded yet; start an interactive session first.".to_string()
                } else {
                    let shown: Vec<&str> = available.iter().take(5).map(String::as_str).collect();
                    format!(
                        "Available sessions: {}{}",
                        shown.join(", "),
                        if available.len() > 5 { ", ..." } else { "" }
                    )
                };
                ErrorPayload::new(
                    ErrorCategory::Session,
                    format!("Session not found: {id}"),
                    remediation,
                )
            }
            CanvasError::InvalidSession { id, message } => ErrorPayload::new(
                ErrorCategory::Session,
                format!("Invalid session {id}: {message}"),
                "Inspect .canvas/sessions/<id>/session.json; run with --verbose for details.",
            ),
            CanvasError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("threshold") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "confidence_threshold must be between 0.0 and 1.0.",
                    )
                } else if lower.contains("extension") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "List at least one source extension (e.g., extensions = [\"tsx\", \"vue\"]).",
                    )
                } else if lower.contains("unsupported config format") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Use a .toml, .yaml or .yml config file.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags/paths and the config file passed with --config.",
                    )
                }
            }
            CanvasError::ApplyBlocked(msg) => ErrorPayload::new(
                ErrorCategory::Apply,
                msg.to_string(),
                "Review the diff with `canvas diff <id>`; pass --force to apply low-confidence changes.",
            ),
            CanvasError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, CanvasError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Io,
    Session,
    Apply,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
