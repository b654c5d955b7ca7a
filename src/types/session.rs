//! Raw session documents as persisted by the browser overlay.
//!
//! The overlay has emitted a few field spellings over time, so the raw types
//! accept aliases and leave edit events as loose JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::manifest::{ElementInfo, SelectorConfidence, TRACKED_STYLE_PROPERTIES};

/// One recorded browser interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(alias = "id")]
    pub session_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_screenshot: Option<String>,
    #[serde(default)]
    pub events: SessionEvents,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionEvents {
    #[serde(default)]
    pub selections: Vec<SelectionEvent>,
    /// Edit events stay untyped: style, text and `save_request` shapes differ.
    #[serde(default)]
    pub edits: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionEvent {
    #[serde(default)]
    pub payload: SelectionPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eyes: Option<EyesSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<RawElement>,
}

/// Enriched snapshot from the visual-inspection pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EyesSnapshot {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<RawElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassList {
    List(Vec<String>),
    Text(String),
}

impl ClassList {
    fn into_vec(self) -> Vec<String> {
        match self {
            ClassList::List(items) => items
                .into_iter()
                .flat_map(|c| {
                    c.split_whitespace()
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .collect(),
            ClassList::Text(s) => s.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// DOM element snapshot as serialized by the overlay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawElement {
    #[serde(default, alias = "tagName")]
    pub tag: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default, alias = "confidence")]
    pub selector_confidence: Option<SelectorConfidence>,
    #[serde(default, alias = "alternativeSelectors")]
    pub alternatives: Vec<String>,
    #[serde(default, alias = "classList", alias = "className")]
    pub classes: Option<ClassList>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "dataTestid", alias = "dataTestId", alias = "data-testid")]
    pub test_id: Option<String>,
    #[serde(default, alias = "textContent", alias = "innerText")]
    pub text: Option<String>,
    #[serde(default, alias = "computedStyles", alias = "computedStyle")]
    pub styles: BTreeMap<String, Value>,
}

impl RawElement {
    /// Normalize into an [`ElementInfo`]; `None` without a selector.
    pub fn into_element_info(self) -> Option<ElementInfo> {
        let selector = self.selector.filter(|s| !s.trim().is_empty())?;
        let styles = self
            .styles
            .into_iter()
            .filter_map(|(key, value)| {
                let property = kebab_case(&key);
                if !TRACKED_STYLE_PROPERTIES.contains(&property.as_str()) {
                    return None;
                }
                let text = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((property, text))
            })
            .collect();

        Some(ElementInfo {
            tag: self
                .tag
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_default(),
            selector,
            selector_confidence: self.selector_confidence.unwrap_or_default(),
            alternatives: self.alternatives.into_iter().take(3).collect(),
            classes: self.classes.map(ClassList::into_vec).unwrap_or_default(),
            id: self.id.filter(|s| !s.trim().is_empty()),
            test_id: self.test_id.filter(|s| !s.trim().is_empty()),
            text: self
                .text
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            styles,
        })
    }
}

/// `backgroundColor` -> `background-color`; kebab input passes through.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
