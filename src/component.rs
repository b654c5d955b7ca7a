//! Framework and component boundary detection.
//!
//! Regex scanning only: React function/arrow/class components, and one
//! component per Vue or Svelte single-file component. Each component records
//! the DOM tags, classes, ids and test-ids it renders so candidates can be
//! re-ranked toward the component that best matches a query.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::file_finder::{class_attr_regex, opening_tag_regex, ElementQuery, FileCandidate, SourceIndex};

pub const ID_WEIGHT: f64 = 1.0;
pub const TEST_ID_WEIGHT: f64 = 0.9;
pub const CLASS_WEIGHT: f64 = 0.7;
pub const TAG_WEIGHT: f64 = 0.3;

const TIE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    React,
    Vue,
    Svelte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Default,
    Named,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    pub name: String,
    pub framework: Framework,
    pub export_kind: ExportKind,
    /// 1-based declaration line.
    pub line: usize,
    /// Last line (inclusive) attributed to this component.
    pub end_line: usize,
    pub tags: BTreeSet<String>,
    pub class_names: BTreeSet<String>,
    pub ids: BTreeSet<String>,
    pub test_ids: BTreeSet<String>,
    /// Set only once scored against a query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ComponentInfo {
    fn new(name: String, framework: Framework, export_kind: ExportKind, line: usize) -> Self {
        Self {
            name,
            framework,
            export_kind,
            line,
            end_line: line,
            tags: BTreeSet::new(),
            class_names: BTreeSet::new(),
            ids: BTreeSet::new(),
            test_ids: BTreeSet::new(),
            confidence: None,
        }
    }

    pub fn contains_line(&self, line: usize) -> bool {
        (self.line..=self.end_line).contains(&line)
    }

    /// Weighted overlap with `query`, normalized by the weights evaluated.
    pub fn match_score(&self, query: &ElementQuery) -> f64 {
        let mut score = 0.0;
        let mut weight = 0.0;
        if let Some(id) = query.element_id.as_deref() {
            weight += ID_WEIGHT;
            if self.ids.contains(id) {
                score += ID_WEIGHT;
            }
        }
        if let Some(test_id) = query.data_testid.as_deref() {
            weight += TEST_ID_WEIGHT;
            if self.test_ids.contains(test_id) {
                score += TEST_ID_WEIGHT;
            }
        }
        if !query.class_names.is_empty() {
            weight += CLASS_WEIGHT;
            let shared = query
                .class_names
                .iter()
                .filter(|c| self.class_names.contains(c.as_str()))
                .count();
            score += CLASS_WEIGHT * shared as f64 / query.class_names.len() as f64;
        }
        if let Some(tag) = query.tag.as_deref() {
            weight += TAG_WEIGHT;
            if self.tags.contains(&tag.to_ascii_lowercase()) {
                score += TAG_WEIGHT;
            }
        }
        if weight == 0.0 {
            0.0
        } else {
            score / weight
        }
    }

    pub fn scored(mut self, query: &ElementQuery) -> Self {
        self.confidence = Some(self.match_score(query));
        self
    }
}

pub fn detect_framework(path: &Path, content: &str) -> Option<Framework> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)?;
    match ext.as_str() {
        "vue" => Some(Framework::Vue),
        "svelte" => Some(Framework::Svelte),
        "tsx" | "jsx" => Some(Framework::React),
        "js" | "ts" => {
            let imports_react = content.contains("from 'react'")
                || content.contains("from \"react\"")
                || content.contains("require('react')");
            (imports_react || jsx_return_regex().is_match(content)).then_some(Framework::React)
        }
        _ => None,
    }
}

fn jsx_return_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"return\s*\(?\s*<[A-Za-z]").expect("valid jsx return regex"))
}

fn react_decl_regexes() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"^\s*(export\s+(?:default\s+)?)?(?:async\s+)?function\s+([A-Z]\w*)\s*[(<]")
                .expect("valid function component regex"),
            Regex::new(
                r"^\s*(export\s+(?:default\s+)?)?(?:const|let|var)\s+([A-Z]\w*)\b[^=]*=\s*(?:React\.)?(?:memo|forwardRef)?\(?\s*(?:async\s+)?(?:\(|function\b|\w+\s*=>)",
            )
            .expect("valid arrow component regex"),
            Regex::new(
                r"^\s*(export\s+(?:default\s+)?)?class\s+([A-Z]\w*)\s+extends\s+(?:React\.)?(?:Pure)?Component\b",
            )
            .expect("valid class component regex"),
        ]
    })
}

fn default_export_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*export\s+default\s+(?:React\.)?(?:memo\()?([A-Z]\w*)")
            .expect("valid default export regex")
    })
}

fn id_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:^|[^\w-]):?id\s*=\s*\{?\s*["'`]([^"'`]+)["'`]"#).expect("valid id regex")
    })
}

fn test_id_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:^|[^\w-]):?data-(?:testid|test-id|cy)\s*=\s*\{?\s*["'`]([^"'`]+)["'`]"#)
            .expect("valid test-id regex")
    })
}

/// Components declared in `content`, in source order.
pub fn detect_components(path: &Path, content: &str) -> Vec<ComponentInfo> {
    let Some(framework) = detect_framework(path, content) else {
        return Vec::new();
    };
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut components = match framework {
        Framework::Vue | Framework::Svelte => {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let line = lines
                .iter()
                .position(|l| l.trim_start().starts_with("<template"))
                .map_or(1, |i| i + 1);
            let mut info = ComponentInfo::new(name, framework, ExportKind::Default, line);
            info.end_line = lines.len();
            vec![info]
        }
        Framework::React => detect_react_components(&lines),
    };

    for component in &mut components {
        collect_rendered(component, &lines);
    }
    components
}

fn detect_react_components(lines: &[&str]) -> Vec<ComponentInfo> {
    let mut components: Vec<ComponentInfo> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = react_decl_regexes().iter().find_map(|re| re.captures(line)) else {
            continue;
        };
        let export_kind = match caps.get(1).map(|m| m.as_str()) {
            Some(e) if e.contains("default") => ExportKind::Default,
            Some(_) => ExportKind::Named,
            None => ExportKind::None,
        };
        components.push(ComponentInfo::new(
            caps[2].to_string(),
            Framework::React,
            export_kind,
            idx + 1,
        ));
    }

    let starts: Vec<usize> = components.iter().map(|c| c.line).collect();
    for (i, component) in components.iter_mut().enumerate() {
        component.end_line = starts
            .get(i + 1)
            .map_or(lines.len(), |next| next.saturating_sub(1).max(component.line));
    }

    for line in lines {
        if let Some(caps) = default_export_regex().captures(line) {
            if let Some(c) = components.iter_mut().find(|c| c.name == caps[1]) {
                c.export_kind = ExportKind::Default;
            }
        }
    }
    components
}

fn collect_rendered(component: &mut ComponentInfo, lines: &[&str]) {
    let end = component.end_line.min(lines.len());
    for line in &lines[component.line.saturating_sub(1)..end] {
        for caps in opening_tag_regex().captures_iter(line) {
            let tag = &caps[1];
            if tag.chars().next().is_some_and(|c| c.is_ascii_lowercase()) && tag != "template" {
                component.tags.insert(tag.to_string());
            }
        }
        for caps in class_attr_regex().captures_iter(line) {
            component
                .class_names
                .extend(caps[1].split_whitespace().map(str::to_string));
        }
        for caps in id_attr_regex().captures_iter(line) {
            component.ids.insert(caps[1].to_string());
        }
        for caps in test_id_attr_regex().captures_iter(line) {
            component.test_ids.insert(caps[1].to_string());
        }
    }
}

/// Component enclosing `line` in the given file content, scored against
/// `query`.
pub fn component_at(path: &Path, content: &str, line: usize, query: &ElementQuery) -> Option<ComponentInfo> {
    detect_components(path, content)
        .into_iter()
        .find(|c| c.contains_line(line))
        .map(|c| c.scored(query))
}

/// Reorder runs of equally-confident candidates so the one inside the best
/// matching component comes first. Confidences are left untouched.
pub fn rerank_candidates(candidates: &mut [FileCandidate], query: &ElementQuery, index: &SourceIndex) {
    let mut start = 0;
    while start < candidates.len() {
        let mut end = start + 1;
        while end < candidates.len()
            && (candidates[end].confidence - candidates[start].confidence).abs() < TIE_EPSILON
        {
            end += 1;
        }
        if end - start > 1 {
            let scores: Vec<f64> = candidates[start..end]
                .iter()
                .map(|c| {
                    index
                        .file(&c.file_path)
                        .and_then(|f| component_at(&f.relative, &f.content, c.line, query))
                        .and_then(|info| info.confidence)
                        .unwrap_or(0.0)
                })
                .collect();
            let mut order: Vec<usize> = (0..scores.len()).collect();
            order.sort_by(|&a, &b| {
                scores[b]
                    .partial_cmp(&scores[a])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let run: Vec<FileCandidate> = order
                .iter()
                .map(|&i| candidates[start + i].clone())
                .collect();
            candidates[start..end].clone_from_slice(&run);
        }
        start = end;
    }
}
