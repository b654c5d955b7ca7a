//! Selector heuristics shared by the overlay and the source locator.
//!
//! [`generate_selector`] reproduces the overlay's selector choice over a DOM
//! snapshot, so fixtures and the locator agree on what a selector means.
//! [`parse_selector_hints`] goes the other way and recovers tag, id, classes
//! and test-id from a selector string when no element snapshot was recorded.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::types::{DomNode, DomSnapshot, SelectorConfidence};

/// Maximum number of ancestors included in a structural path.
pub const MAX_PATH_DEPTH: usize = 5;
/// Maximum number of alternative selectors reported.
pub const MAX_ALTERNATIVES: usize = 3;

const INTERNAL_PREFIXES: &[&str] = &["canvas-", "__canvas", "data-canvas"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorResult {
    pub selector: String,
    pub confidence: SelectorConfidence,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

/// Generate a selector for `node_id`, trying id, test-id, class combination
/// and structural path in that order. Returns `None` for unknown nodes.
pub fn generate_selector(snapshot: &DomSnapshot, node_id: &str) -> Option<SelectorResult> {
    let node = snapshot.node(node_id)?;
    let tag = node.tag_name();
    let mut alternatives: Vec<String> = Vec::new();

    if let Some(id) = node.attr("id").filter(|id| !is_internal(id)) {
        let selector = format!("#{}", css_escape(id));
        let count = snapshot
            .nodes
            .iter()
            .filter(|n| n.attr("id") == Some(id))
            .count();
        if count == 1 {
            return Some(SelectorResult {
                selector,
                confidence: SelectorConfidence::High,
                alternatives,
            });
        }
        keep_alternative(&mut alternatives, selector);
    }

    for attr in ["data-testid", "data-cy"] {
        if let Some(value) = node.attr(attr) {
            let selector = format!("[{attr}=\"{}\"]", value.replace('"', "\\\""));
            let count = snapshot
                .nodes
                .iter()
                .filter(|n| n.attr(attr) == Some(value))
                .count();
            if count == 1 {
                return Some(SelectorResult {
                    selector,
                    confidence: SelectorConfidence::High,
                    alternatives,
                });
            }
            keep_alternative(&mut alternatives, selector);
        }
    }

    let classes: Vec<&str> = node
        .class_list()
        .into_iter()
        .filter(|c| !is_internal(c))
        .collect();
    if !classes.is_empty() {
        let selector = format!(
            "{}{}",
            tag,
            classes
                .iter()
                .map(|c| format!(".{}", css_escape(c)))
                .collect::<String>()
        );
        let count = snapshot
            .nodes
            .iter()
            .filter(|n| {
                n.tag_name() == tag && {
                    let list = n.class_list();
                    classes.iter().all(|c| list.contains(c))
                }
            })
            .count();
        if count == 1 {
            return Some(SelectorResult {
                selector,
                confidence: SelectorConfidence::Medium,
                alternatives,
            });
        }
        keep_alternative(&mut alternatives, selector);
    }

    let steps = structural_steps(snapshot, node);
    if !steps.is_empty() {
        let selector = steps
            .iter()
            .map(PathStep::render)
            .collect::<Vec<_>>()
            .join(" > ");
        let count = snapshot
            .nodes
            .iter()
            .filter(|n| matches_path(snapshot, n, &steps))
            .count();
        let confidence = if count == 1 {
            SelectorConfidence::Medium
        } else {
            SelectorConfidence::Low
        };
        return Some(SelectorResult {
            selector,
            confidence,
            alternatives,
        });
    }

    Some(SelectorResult {
        selector: tag,
        confidence: SelectorConfidence::Low,
        alternatives,
    })
}

fn keep_alternative(alternatives: &mut Vec<String>, selector: String) {
    if alternatives.len() < MAX_ALTERNATIVES && !alternatives.contains(&selector) {
        alternatives.push(selector);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PathStep {
    tag: String,
    nth_of_type: Option<usize>,
}

impl PathStep {
    fn render(&self) -> String {
        match self.nth_of_type {
            Some(k) => format!("{}:nth-of-type({})", self.tag, k),
            None => self.tag.clone(),
        }
    }
}

/// Steps from the outermost walked ancestor down to `node`.
fn structural_steps(snapshot: &DomSnapshot, node: &DomNode) -> Vec<PathStep> {
    let mut steps = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        let tag = n.tag_name();
        if tag == "body" || tag == "html" || steps.len() > MAX_PATH_DEPTH {
            break;
        }
        let nth_of_type = snapshot.parent_of(n).and_then(|parent| {
            let same: Vec<&DomNode> = snapshot
                .children_of(parent)
                .filter(|s| s.tag_name() == tag)
                .collect();
            if same.len() > 1 {
                same.iter().position(|s| s.id == n.id).map(|i| i + 1)
            } else {
                None
            }
        });
        steps.push(PathStep { tag, nth_of_type });
        current = snapshot.parent_of(n);
    }
    steps.reverse();
    steps
}

fn matches_path(snapshot: &DomSnapshot, node: &DomNode, steps: &[PathStep]) -> bool {
    let mut current = Some(node);
    for step in steps.iter().rev() {
        let Some(n) = current else {
            return false;
        };
        if n.tag_name() != step.tag {
            return false;
        }
        if let Some(k) = step.nth_of_type {
            let position = snapshot.parent_of(n).and_then(|parent| {
                snapshot
                    .children_of(parent)
                    .filter(|s| s.tag_name() == step.tag)
                    .position(|s| s.id == n.id)
                    .map(|i| i + 1)
            });
            if position != Some(k) {
                return false;
            }
        }
        current = snapshot.parent_of(n);
    }
    true
}

fn is_internal(name: &str) -> bool {
    name.starts_with(':') || INTERNAL_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn css_escape(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (i, ch) in ident.chars().enumerate() {
        let plain = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii();
        if !plain || (i == 0 && ch.is_ascii_digit()) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Fields recoverable from the last compound of a CSS selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorHints {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub test_id: Option<String>,
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\[(data-testid|data-cy)\s*=\s*["']?([^"'\]]+)["']?\s*\]"#)
            .expect("valid attribute selector regex")
    })
}

pub fn parse_selector_hints(selector: &str) -> SelectorHints {
    let compound = selector
        .rsplit(|c: char| c.is_whitespace() || c == '>' || c == '+' || c == '~')
        .find(|part| !part.is_empty())
        .unwrap_or("");

    let mut hints = SelectorHints::default();
    if let Some(caps) = attr_regex().captures(compound) {
        hints.test_id = Some(caps[2].to_string());
    }
    let stripped = attr_regex().replace_all(compound, "");

    let mut token = String::new();
    let mut kind = 't';
    let mut in_pseudo = 0usize;
    let flush = |kind: char, token: &mut String, hints: &mut SelectorHints| {
        if token.is_empty() {
            return;
        }
        let value = std::mem::take(token);
        match kind {
            't' if value != "*" => hints.tag = Some(value.to_ascii_lowercase()),
            '#' => hints.id = Some(value),
            '.' => hints.classes.push(value),
            _ => {}
        }
    };
    let mut chars = stripped.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_pseudo > 0 {
            match ch {
                '(' => in_pseudo += 1,
                ')' => in_pseudo -= 1,
                _ => {}
            }
            continue;
        }
        match ch {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    token.push(escaped);
                }
            }
            '#' | '.' => {
                flush(kind, &mut token, &mut hints);
                kind = ch;
            }
            ':' => {
                flush(kind, &mut token, &mut hints);
                kind = ':';
                while let Some(&next) = chars.peek() {
                    if next == '(' {
                        chars.next();
                        in_pseudo = 1;
                        break;
                    }
                    if next == '.' || next == '#' || next == ':' || next == '[' {
                        break;
                    }
                    chars.next();
                }
            }
            '[' | ']' => {
                flush(kind, &mut token, &mut hints);
                kind = '[';
            }
            _ => token.push(ch),
        }
    }
    flush(kind, &mut token, &mut hints);
    hints
}
