//! Session storage and change-manifest normalization.
//!
//! Sessions live under `<project>/.canvas/sessions/<id>/session.json`. A
//! manifest is built either from the last `save_request` edit (what the user
//! explicitly saved) or, failing that, by folding the raw style/text edits
//! against the element snapshots captured at selection time.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CanvasError, Result};
use crate::types::{
    ChangeManifest, ElementInfo, ManifestSource, SelectorConfidence, Session, StyleChange,
    TextChange,
};
use crate::types::session::kebab_case;

pub const SESSION_FILE: &str = "session.json";
pub const SESSION_PREFIX: &str = "ses-";

/// Listing entry for one stored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub selections: usize,
    pub edits: usize,
    pub has_save_request: bool,
    /// Seconds since the Unix epoch of the last session.json write.
    pub modified: u64,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory names of all stored sessions, sorted.
    pub fn session_ids(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Resolve `id` by exact name, then `ses-<id>`, then substring.
    ///
    /// Several substring matches resolve to the first in sorted order; the
    /// rest are logged so the ambiguity is visible.
    pub fn resolve(&self, id: &str) -> Result<PathBuf> {
        let ids = self.session_ids()?;
        if ids.iter().any(|s| s == id) {
            return Ok(self.root.join(id));
        }
        let prefixed = format!("{SESSION_PREFIX}{id}");
        if ids.iter().any(|s| *s == prefixed) {
            return Ok(self.root.join(prefixed));
        }
        let matches: Vec<&String> = ids.iter().filter(|s| s.contains(id)).collect();
        match matches.as_slice() {
            [] => Err(CanvasError::session_not_found(id, ids.clone())),
            [only] => Ok(self.root.join(only.as_str())),
            [first, rest @ ..] => {
                warn!(
                    query = id,
                    chosen = first.as_str(),
                    others = ?rest,
                    "ambiguous session id; using first match"
                );
                Ok(self.root.join(first.as_str()))
            }
        }
    }

    pub fn load(&self, id: &str) -> Result<Session> {
        let dir = self.resolve(id)?;
        let path = dir.join(SESSION_FILE);
        debug!(path = %path.display(), "loading session");
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            CanvasError::invalid_session(id, format!("cannot read {}: {e}", path.display()))
        })?;
        let session: Session = serde_json::from_str(&raw)?;
        Ok(session)
    }

    /// Load and normalize a session into a [`ChangeManifest`].
    pub fn parse_session(&self, id: &str) -> Result<ChangeManifest> {
        let session = self.load(id)?;
        Ok(build_manifest(&session))
    }

    /// Summaries of every readable session, newest first.
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut out = Vec::new();
        for id in self.session_ids()? {
            let path = self.root.join(&id).join(SESSION_FILE);
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping session without session.json");
                    continue;
                }
            };
            let session: Session = match serde_json::from_str(&raw) {
                Ok(s) => s,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable session");
                    continue;
                }
            };
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            out.push(SessionSummary {
                host: url::Url::parse(&session.url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string)),
                url: session.url.clone(),
                selections: session.events.selections.len(),
                edits: session.events.edits.len(),
                has_save_request: session.events.edits.iter().any(is_save_request),
                modified,
                id,
            });
        }
        out.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}

/// Normalize a session into a manifest. Pure; no I/O.
pub fn build_manifest(session: &Session) -> ChangeManifest {
    let mut manifest = ChangeManifest::new(&session.session_id, &session.url);
    manifest.elements = collect_elements(session);

    match session.events.edits.iter().rev().find(|e| is_save_request(e)) {
        Some(save) => {
            manifest.source = ManifestSource::SaveRequest;
            let changes = field(save, "changes");
            manifest.style_changes = decode_list(changes.and_then(|c| c.get("styles")));
            manifest.text_changes = decode_list(changes.and_then(|c| c.get("texts")));
        }
        None => {
            manifest.source = ManifestSource::RawEdits;
            let (styles, texts) = synthesize_changes(&session.events.edits, &manifest.elements);
            manifest.style_changes = styles;
            manifest.text_changes = texts;
        }
    }
    debug!(
        session = %manifest.session_id,
        source = ?manifest.source,
        elements = manifest.elements.len(),
        styles = manifest.style_changes.len(),
        texts = manifest.text_changes.len(),
        "built change manifest"
    );
    manifest
}

fn collect_elements(session: &Session) -> BTreeMap<String, ElementInfo> {
    let mut elements = BTreeMap::new();
    for selection in &session.events.selections {
        let enriched = selection
            .eyes
            .as_ref()
            .filter(|eyes| eyes.success)
            .and_then(|eyes| eyes.element.clone());
        let raw = enriched.or_else(|| selection.payload.element.clone());
        let Some(info) = raw.and_then(|r| r.into_element_info()) else {
            continue;
        };
        elements.entry(info.selector.clone()).or_insert(info);
    }
    elements
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditKind {
    Style,
    Text,
    SaveRequest,
    Other,
}

fn edit_kind(event: &Value) -> EditKind {
    let tag = ["type", "event"]
        .iter()
        .find_map(|k| event.get(*k).and_then(Value::as_str))
        .unwrap_or("")
        .to_ascii_lowercase();
    if tag == "save_request" || tag == "save-request" {
        EditKind::SaveRequest
    } else if tag.contains("style") {
        EditKind::Style
    } else if tag.contains("text") {
        EditKind::Text
    } else {
        EditKind::Other
    }
}

fn is_save_request(event: &Value) -> bool {
    edit_kind(event) == EditKind::SaveRequest
}

/// Look `key` up on the event, then on its `payload`.
fn field<'a>(event: &'a Value, key: &str) -> Option<&'a Value> {
    event
        .get(key)
        .filter(|v| !v.is_null())
        .or_else(|| event.get("payload").and_then(|p| p.get(key)))
        .filter(|v| !v.is_null())
}

fn string_field(event: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match field(event, k)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn decode_list<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(v) => Some(v),
            Err(err) => {
                warn!(error = %err, "skipping malformed change in save_request");
                None
            }
        })
        .collect()
}

fn selector_meta(event: &Value) -> (SelectorConfidence, Vec<String>) {
    let confidence = field(event, "confidence")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    let alternatives = field(event, "alternatives")
        .and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok())
        .unwrap_or_default();
    (confidence, alternatives)
}

/// Fold raw edits into one change per (selector, property) and per selector
/// for text, diffed against the selection-time snapshot.
///
/// Style edits are kept even when the final value equals the initial one:
/// intermediate states are not tracked, so a revert cannot be told apart
/// from a deliberate re-set.
fn synthesize_changes(
    edits: &[Value],
    elements: &BTreeMap<String, ElementInfo>,
) -> (Vec<StyleChange>, Vec<TextChange>) {
    let mut styles: Vec<StyleChange> = Vec::new();
    let mut style_index: HashMap<(String, String), usize> = HashMap::new();
    let mut texts: Vec<TextChange> = Vec::new();
    let mut text_index: HashMap<String, usize> = HashMap::new();

    for edit in edits {
        let kind = edit_kind(edit);
        if !matches!(kind, EditKind::Style | EditKind::Text) {
            continue;
        }
        let Some(selector) = string_field(edit, &["selector"]) else {
            debug!("skipping edit without selector");
            continue;
        };
        let element = elements.get(&selector);
        let (confidence, alternatives) = selector_meta(edit);

        match kind {
            EditKind::Style => {
                let (Some(property), Some(new_value)) = (
                    string_field(edit, &["property"]),
                    string_field(edit, &["newValue", "value"]),
                ) else {
                    continue;
                };
                let property = kebab_case(&property);
                let initial = element
                    .and_then(|e| e.styles.get(&property).cloned())
                    .or_else(|| string_field(edit, &["oldValue"]));
                let key = (selector.clone(), property.clone());
                match style_index.get(&key) {
                    Some(&i) => styles[i].new_value = new_value,
                    None => {
                        style_index.insert(key, styles.len());
                        styles.push(StyleChange {
                            selector,
                            property,
                            old_value: initial,
                            new_value,
                            confidence,
                            alternatives,
                        });
                    }
                }
            }
            EditKind::Text => {
                let Some(new_text) = string_field(edit, &["newText", "text"]) else {
                    continue;
                };
                match text_index.get(&selector) {
                    Some(&i) => texts[i].new_text = new_text,
                    None => {
                        let old_text = element
                            .and_then(|e| e.text.clone())
                            .or_else(|| string_field(edit, &["oldText"]))
                            .unwrap_or_default();
                        text_index.insert(selector.clone(), texts.len());
                        texts.push(TextChange {
                            selector,
                            old_text,
                            new_text,
                            confidence,
                            alternatives,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    texts.retain(|t| t.new_text != t.old_text);
    (styles, texts)
}
