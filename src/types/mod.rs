//! Core types used throughout the canvas library.
//!
//! - [`dom`] - DOM snapshots the selector heuristics run over
//! - [`session`] - Raw persisted session documents
//! - [`manifest`] - Normalized change manifest and element metadata

pub mod dom;
pub mod manifest;
pub mod session;

pub use dom::{DomNode, DomSnapshot};
pub use manifest::{
    ChangeManifest, ElementInfo, ManifestSource, SelectorConfidence, StyleChange, TextChange,
    TRACKED_STYLE_PROPERTIES,
};
pub use session::{RawElement, SelectionEvent, Session, SessionEvents};
