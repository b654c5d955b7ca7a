//! End-to-end driver: session -> manifest -> diffs -> gated writes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::diff_generator::{DiffGenerator, DiffResult};
use crate::error::{CanvasError, Result};
use crate::session::SessionStore;
use crate::types::ChangeManifest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    pub dry_run: bool,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowConfidenceFile {
    pub file_path: PathBuf,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFailure {
    pub file_path: PathBuf,
    pub message: String,
}

/// Outcome of one apply run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub session_id: String,
    /// Files actually written.
    pub applied: usize,
    pub success: bool,
    pub dry_run: bool,
    pub forced: bool,
    /// Files the run intends to write, in order.
    pub planned: Vec<PathBuf>,
    pub low_confidence: Vec<LowConfidenceFile>,
    pub failures: Vec<WriteFailure>,
    pub threshold: f64,
    pub diff: DiffResult,
}

impl ApplyReport {
    pub fn blocked(&self) -> bool {
        !self.forced && !self.low_confidence.is_empty()
    }

    /// `Err` describing why the run did not succeed.
    pub fn check(&self) -> Result<()> {
        if self.success {
            return Ok(());
        }
        let reason = if self.blocked() {
            let files: Vec<String> = self
                .low_confidence
                .iter()
                .map(|f| format!("{} ({:.2})", f.file_path.display(), f.confidence))
                .collect();
            format!(
                "{} file(s) below confidence threshold {:.2}: {}",
                files.len(),
                self.threshold,
                files.join(", ")
            )
        } else if !self.failures.is_empty() {
            format!("{} file(s) could not be written", self.failures.len())
        } else {
            "no applicable changes".to_string()
        };
        Err(CanvasError::ApplyBlocked(reason))
    }
}

/// Drives a session through diff generation and writes the result.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Config,
    root: PathBuf,
    store: SessionStore,
}

impl Orchestrator {
    /// Orchestrator for the project at `root`, reading sessions from the
    /// configured sessions directory.
    pub fn new(config: &Config, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let store = SessionStore::new(config.sessions_root(&root));
        Self {
            config: config.clone(),
            root,
            store,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Manifest and diffs for a session without touching the source tree.
    pub fn preview(&self, session_id: &str) -> Result<(ChangeManifest, DiffResult)> {
        let manifest = self.store.parse_session(session_id)?;
        let diff = DiffGenerator::new(&self.config).generate_diffs(&manifest, &self.root);
        Ok((manifest, diff))
    }

    pub fn apply(&self, session_id: &str, options: ApplyOptions) -> Result<ApplyReport> {
        let (manifest, diff) = self.preview(session_id)?;
        Ok(self.apply_diffs(&manifest.session_id, diff, options))
    }

    /// Gate and write already generated diffs.
    ///
    /// Nothing is written when any file is below the confidence threshold
    /// and `force` is not set. Each file is written at most once; a failed
    /// write is recorded and the remaining files are still written.
    pub fn apply_diffs(&self, session_id: &str, diff: DiffResult, options: ApplyOptions) -> ApplyReport {
        let threshold = self.config.confidence_threshold;
        let planned: Vec<PathBuf> = diff.file_diffs.iter().map(|d| d.file_path.clone()).collect();
        let low_confidence: Vec<LowConfidenceFile> = diff
            .file_diffs
            .iter()
            .filter(|d| d.confidence < threshold)
            .map(|d| LowConfidenceFile {
                file_path: d.file_path.clone(),
                confidence: d.confidence,
            })
            .collect();

        let mut report = ApplyReport {
            session_id: session_id.to_string(),
            applied: 0,
            success: false,
            dry_run: options.dry_run,
            forced: options.force,
            planned,
            low_confidence,
            failures: Vec::new(),
            threshold,
            diff,
        };

        if report.blocked() {
            warn!(
                session = session_id,
                files = report.low_confidence.len(),
                threshold,
                "apply blocked by low-confidence diffs"
            );
            return report;
        }
        if report.planned.is_empty() {
            info!(session = session_id, "nothing to apply");
            return report;
        }
        if options.dry_run {
            info!(session = session_id, files = report.planned.len(), "dry run, no files written");
            report.success = true;
            return report;
        }

        for file in &report.diff.file_diffs {
            let target = self.root.join(&file.file_path);
            match std::fs::write(&target, &file.modified_content) {
                Ok(()) => {
                    debug!(path = %target.display(), changes = file.changes.len(), "wrote file");
                    report.applied += 1;
                }
                Err(err) => {
                    warn!(path = %target.display(), error = %err, "write failed");
                    report.failures.push(WriteFailure {
                        file_path: file.file_path.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
        report.success = report.failures.is_empty();
        info!(
            session = session_id,
            applied = report.applied,
            failed = report.failures.len(),
            "apply finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff_generator::{AppliedChange, ChangeKind, FileDiff};
    use tempfile::TempDir;

    fn file_diff(path: &str, original: &str, modified: &str, confidence: f64) -> FileDiff {
        FileDiff {
            file_path: PathBuf::from(path),
            original_content: original.into(),
            modified_content: modified.into(),
            changes: vec![AppliedChange {
                kind: ChangeKind::Style,
                selector: "button.cta".into(),
                description: "style color: red".into(),
                line: 1,
                confidence,
            }],
            confidence,
        }
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/App.tsx"), "<p>old</p>\n").unwrap();
        dir
    }

    fn diff_of(files: Vec<FileDiff>) -> DiffResult {
        DiffResult {
            file_diffs: files,
            ..DiffResult::default()
        }
    }

    #[test]
    fn low_confidence_blocks_every_write() {
        let dir = project();
        let orchestrator = Orchestrator::new(&Config::default(), dir.path());
        let diff = diff_of(vec![file_diff("src/App.tsx", "<p>old</p>\n", "<p>new</p>\n", 0.40)]);

        let report = orchestrator.apply_diffs("ses-d", diff, ApplyOptions::default());
        assert!(!report.success);
        assert!(report.blocked());
        assert_eq!(report.applied, 0);
        assert_eq!(report.low_confidence.len(), 1);
        assert_eq!(report.low_confidence[0].file_path, Path::new("src/App.tsx"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/App.tsx")).unwrap(),
            "<p>old</p>\n"
        );
        let err = report.check().unwrap_err();
        assert!(err.to_string().contains("src/App.tsx (0.40)"));
    }

    #[test]
    fn force_overrides_the_gate() {
        let dir = project();
        let orchestrator = Orchestrator::new(&Config::default(), dir.path());
        let diff = diff_of(vec![file_diff("src/App.tsx", "<p>old</p>\n", "<p>new</p>\n", 0.40)]);

        let report = orchestrator.apply_diffs(
            "ses-d",
            diff,
            ApplyOptions {
                force: true,
                ..ApplyOptions::default()
            },
        );
        assert!(report.success);
        assert_eq!(report.applied, 1);
        assert!(report.check().is_ok());
    }

    #[test]
    fn written_content_round_trips() {
        let dir = project();
        let orchestrator = Orchestrator::new(&Config::default(), dir.path());
        let modified = "<p style={{ color: \"red\" }}>néw ✓</p>\n";
        let diff = diff_of(vec![file_diff("src/App.tsx", "<p>old</p>\n", modified, 0.95)]);

        let report = orchestrator.apply_diffs("ses-r", diff, ApplyOptions::default());
        assert!(report.success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/App.tsx")).unwrap(),
            modified
        );
    }

    #[test]
    fn dry_run_reports_plan_without_writing() {
        let dir = project();
        let orchestrator = Orchestrator::new(&Config::default(), dir.path());
        let diff = diff_of(vec![file_diff("src/App.tsx", "<p>old</p>\n", "<p>new</p>\n", 0.9)]);

        let report = orchestrator.apply_diffs(
            "ses-dry",
            diff,
            ApplyOptions {
                dry_run: true,
                ..ApplyOptions::default()
            },
        );
        assert!(report.success);
        assert_eq!(report.applied, 0);
        assert_eq!(report.planned, vec![PathBuf::from("src/App.tsx")]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/App.tsx")).unwrap(),
            "<p>old</p>\n"
        );
    }

    #[test]
    fn failed_write_does_not_stop_other_files() {
        let dir = project();
        let orchestrator = Orchestrator::new(&Config::default(), dir.path());
        let diff = diff_of(vec![
            file_diff("missing/dir/Gone.tsx", "a", "b", 0.9),
            file_diff("src/App.tsx", "<p>old</p>\n", "<p>new</p>\n", 0.9),
        ]);

        let report = orchestrator.apply_diffs("ses-p", diff, ApplyOptions::default());
        assert!(!report.success);
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file_path, Path::new("missing/dir/Gone.tsx"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/App.tsx")).unwrap(),
            "<p>new</p>\n"
        );
    }

    #[test]
    fn nothing_applicable_is_not_success() {
        let dir = project();
        let orchestrator = Orchestrator::new(&Config::default(), dir.path());
        let report = orchestrator.apply_diffs("ses-e", DiffResult::default(), ApplyOptions::default());
        assert!(!report.success);
        assert!(!report.blocked());
        assert!(report.check().unwrap_err().to_string().contains("no applicable changes"));
    }

    #[test]
    fn apply_runs_a_recorded_session_end_to_end() {
        let dir = project();
        let root = dir.path();
        std::fs::write(
            root.join("src/App.tsx"),
            "export const App = () => <button className=\"cta\">Buy</button>;\n",
        )
        .unwrap();
        let session_dir = root.join(".canvas/sessions/ses-abc123");
        std::fs::create_dir_all(&session_dir).unwrap();
        std::fs::write(
            session_dir.join("session.json"),
            r##"{
                "sessionId": "ses-abc123",
                "url": "http://localhost:3000/",
                "events": {
                    "selections": [{"payload": {"element": {
                        "tagName": "BUTTON", "selector": "button.cta",
                        "classList": ["cta"], "textContent": "Buy"
                    }}}],
                    "edits": [{"type": "save_request", "changes": {
                        "styles": [{"selector": "button.cta", "property": "background-color", "newValue": "#ff0000"}],
                        "texts": []
                    }}]
                }
            }"##,
        )
        .unwrap();

        let orchestrator = Orchestrator::new(&Config::default(), root);
        let report = orchestrator.apply("abc123", ApplyOptions::default()).unwrap();
        assert!(report.success, "{report:?}");
        assert_eq!(report.session_id, "ses-abc123");
        assert_eq!(report.applied, 1);
        let written = std::fs::read_to_string(root.join("src/App.tsx")).unwrap();
        assert!(written.contains("style={{ backgroundColor: \"#ff0000\" }}>Buy"));

        let missing = orchestrator.apply("nope", ApplyOptions::default()).unwrap_err();
        assert!(matches!(missing, CanvasError::SessionNotFound { .. }));
    }
}
