//! Normalized change manifest derived from a recorded session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Computed style properties captured for each selected element.
pub const TRACKED_STYLE_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "font-size",
    "font-weight",
    "font-family",
    "line-height",
    "padding",
    "margin",
    "border-radius",
    "width",
    "height",
    "display",
    "opacity",
];

/// How certain the overlay was that a selector identifies one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectorConfidence {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for SelectorConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SelectorConfidence::High => "high",
            SelectorConfidence::Medium => "medium",
            SelectorConfidence::Low => "low",
        };
        f.write_str(s)
    }
}

/// Snapshot of one DOM element at selection time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub tag: String,
    pub selector: String,
    #[serde(default)]
    pub selector_confidence: SelectorConfidence,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub styles: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleChange {
    pub selector: String,
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    pub new_value: String,
    #[serde(default)]
    pub confidence: SelectorConfidence,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChange {
    pub selector: String,
    #[serde(default)]
    pub old_text: String,
    pub new_text: String,
    #[serde(default)]
    pub confidence: SelectorConfidence,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

/// Which input shape the changes were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestSource {
    SaveRequest,
    RawEdits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeManifest {
    pub session_id: String,
    pub url: String,
    pub source: ManifestSource,
    pub elements: BTreeMap<String, ElementInfo>,
    pub style_changes: Vec<StyleChange>,
    pub text_changes: Vec<TextChange>,
}

impl ChangeManifest {
    pub fn new(session_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            url: url.into(),
            source: ManifestSource::RawEdits,
            elements: BTreeMap::new(),
            style_changes: Vec::new(),
            text_changes: Vec::new(),
        }
    }

    pub fn change_count(&self) -> usize {
        self.style_changes.len() + self.text_changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }

    /// Selectors referenced by a change but missing from `elements`.
    pub fn orphan_selectors(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .style_changes
            .iter()
            .map(|c| c.selector.as_str())
            .chain(self.text_changes.iter().map(|c| c.selector.as_str()))
            .filter(|s| !self.elements.contains_key(*s))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}
