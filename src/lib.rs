//! Canvas Library
//!
//! Maps edits recorded in a live browser page (style and text changes made
//! through an injected overlay) back to the source files that render the
//! page, and turns them into file diffs.
//!
//! # Module Overview
//!
//! - [`session`] - Session storage and normalization into a change manifest
//! - [`selector`] - Selector generation over DOM snapshots and selector parsing
//! - [`file_finder`] - Ranked source locations for an element description
//! - [`component`] - Framework/component detection used to break ties
//! - [`diff_generator`] - Text/style patching and unified diff rendering
//! - [`apply`] - End-to-end orchestration behind a confidence gate
//! - [`tokens`] - Design tokens and Tailwind utility suggestions
//! - [`config`] - Configuration file support
//! - [`types`] - Core data types
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use canvas_lib::{ApplyOptions, Config, Orchestrator};
//!
//! # fn example() -> canvas_lib::Result<()> {
//! let config = Config::default();
//! let orchestrator = Orchestrator::new(&config, "/path/to/project");
//!
//! // Preview first, then write behind the confidence gate.
//! let (_manifest, diff) = orchestrator.preview("abc123")?;
//! print!("{}", diff.patch(config.diff_context));
//! let report = orchestrator.apply("abc123", ApplyOptions::default())?;
//! report.check()?;
//! # Ok(())
//! # }
//! ```

pub mod apply;
pub mod component;
pub mod config;
pub mod diff_generator;
pub mod error;
pub mod file_finder;
pub mod output;
pub mod selector;
pub mod session;
pub mod tokens;
pub mod types;

pub use apply::{ApplyOptions, ApplyReport, Orchestrator};
pub use component::{detect_components, detect_framework, ComponentInfo, Framework};
pub use config::Config;
pub use diff_generator::{unified_diff, DiffGenerator, DiffResult, FileDiff};
pub use error::{CanvasError, Result};
pub use file_finder::{find_project_root, ElementQuery, FileCandidate, SourceIndex, SourceLocator};
pub use output::{
    ApplyOutput, CanvasOutput, DiffOutput, ErrorOutput, LocateOutput, SessionsOutput,
    CANVAS_OUTPUT_VERSION,
};
pub use selector::{generate_selector, parse_selector_hints, SelectorResult};
pub use session::{build_manifest, SessionStore, SessionSummary};
pub use tokens::{extract_css_tokens, suggest_tailwind_class, DesignToken, TailwindConfig, TailwindSuggestion};
pub use types::{ChangeManifest, ElementInfo, SelectorConfidence, StyleChange, TextChange};
