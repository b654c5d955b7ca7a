//! Source location: map a DOM element description to likely source lines.
//!
//! Four independent text heuristics (id, test-id, class+tag, text) each score
//! their hits; hits on the same `(file, line)` are merged with a small bonus
//! for corroborating evidence. This is deliberately regex-based so it works
//! the same across JSX, Vue, Svelte and plain HTML.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::component;
use crate::config::Config;
use crate::selector::parse_selector_hints;
use crate::types::ElementInfo;

pub const ID_CONFIDENCE: f64 = 0.95;
pub const TEST_ID_CONFIDENCE: f64 = 0.90;
pub const CLASS_BASE_CONFIDENCE: f64 = 0.5;
pub const CLASS_RATIO_WEIGHT: f64 = 0.3;
pub const CLASS_TAG_BONUS: f64 = 0.15;
pub const CLASS_FULL_MATCH_BONUS: f64 = 0.05;
pub const CLASS_CAP: f64 = 0.95;
pub const TEXT_CONFIDENCE: f64 = 0.60;
pub const TEXT_TAG_BONUS: f64 = 0.20;
pub const MULTI_EVIDENCE_BONUS: f64 = 0.05;
pub const MERGED_CAP: f64 = 0.99;

/// Lines above a hit that are searched for the element's opening tag.
const TAG_LOOKBACK: usize = 3;
/// Longest text snippet used for the text fallback.
const MAX_TEXT_SNIPPET: usize = 80;

/// What is known about the element being searched for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_testid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementQuery {
    /// Query from a recorded element snapshot.
    pub fn from_element(info: &ElementInfo) -> Self {
        Self {
            selector: Some(info.selector.clone()),
            tag: Some(info.tag.clone()).filter(|t| !t.is_empty()),
            class_names: info.classes.clone(),
            element_id: info.id.clone(),
            data_testid: info.test_id.clone(),
            text: info.text.clone(),
        }
    }

    /// Query recovered from the selector string alone.
    pub fn from_selector(selector: &str) -> Self {
        let hints = parse_selector_hints(selector);
        Self {
            selector: Some(selector.to_string()),
            tag: hints.tag,
            class_names: hints.classes,
            element_id: hints.id,
            data_testid: hints.test_id,
            text: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.element_id.is_none()
            && self.data_testid.is_none()
            && self.class_names.is_empty()
            && self.text.as_deref().map_or(true, |t| t.trim().is_empty())
    }
}

/// A scored hypothesis for where an element is declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCandidate {
    /// Path relative to the project root.
    pub file_path: PathBuf,
    /// 1-based line.
    pub line: usize,
    /// 1-based column of the matched text.
    pub column: usize,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub matched_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl FileCandidate {
    /// Merge another hit on the same `(file, line)` into this one.
    ///
    /// The result is never below either input.
    pub fn merge(&mut self, other: FileCandidate) {
        let best = self.confidence.max(other.confidence);
        if other.confidence > self.confidence {
            self.column = other.column;
            self.matched_text = other.matched_text;
        }
        self.confidence = (best + MULTI_EVIDENCE_BONUS).min(MERGED_CAP).max(best);
        for reason in other.reasons {
            if !self.reasons.contains(&reason) {
                self.reasons.push(reason);
            }
        }
        if !self.reasons.iter().any(|r| r == "multiple evidence") {
            self.reasons.push("multiple evidence".to_string());
        }
    }
}

/// A readable source file held in memory for searching.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub relative: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn lines(&self) -> Vec<&str> {
        self.content.lines().collect()
    }
}

/// Walks a project and searches its source files.
#[derive(Debug, Clone)]
pub struct SourceLocator {
    config: Config,
}

impl SourceLocator {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Allowed source files under `root`, sorted, skipping vendored and
    /// generated directories.
    pub fn source_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !self
                        .config
                        .is_skipped_dir(&entry.file_name().to_string_lossy())
            })
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    debug!(error = %err, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && self.config.allows_extension(e.path()))
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }

    /// Read every source file under `root`; unreadable files are skipped.
    pub fn index(&self, root: &Path) -> SourceIndex {
        let files = self
            .source_files(root)
            .into_iter()
            .filter_map(|path| match std::fs::read_to_string(&path) {
                Ok(content) => Some(SourceFile {
                    relative: path.strip_prefix(root).unwrap_or(&path).to_path_buf(),
                    path,
                    content,
                }),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping unreadable file");
                    None
                }
            })
            .collect::<Vec<_>>();
        debug!(root = %root.display(), files = files.len(), "indexed source files");
        SourceIndex {
            root: root.to_path_buf(),
            files,
            context_lines: self.config.candidate_context,
        }
    }

    /// Ranked candidates for `query` under `root`, best first.
    pub fn find_element_in_source(&self, query: &ElementQuery, root: &Path) -> Vec<FileCandidate> {
        self.index(root).find(query)
    }
}

/// In-memory snapshot of a project's source files.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    root: PathBuf,
    files: Vec<SourceFile>,
    context_lines: usize,
}

impl SourceIndex {
    pub fn from_files(root: impl Into<PathBuf>, files: Vec<SourceFile>) -> Self {
        Self {
            root: root.into(),
            files,
            context_lines: 2,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, relative: &Path) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.relative == relative)
    }

    /// Run all strategies and merge their hits. Never fails; no hit yields
    /// an empty list.
    pub fn find(&self, query: &ElementQuery) -> Vec<FileCandidate> {
        let mut merged: BTreeMap<(PathBuf, usize), FileCandidate> = BTreeMap::new();

        for file in &self.files {
            let lines = file.lines();
            if let Some(id) = query.element_id.as_deref() {
                for hit in search_id(&lines, id) {
                    push_candidate(&mut merged, self.candidate(file, &lines, hit));
                }
            }
            if let Some(test_id) = query.data_testid.as_deref() {
                for hit in search_test_id(&lines, test_id) {
                    push_candidate(&mut merged, self.candidate(file, &lines, hit));
                }
            }
            if !query.class_names.is_empty() {
                for hit in search_classes(&lines, &query.class_names, query.tag.as_deref()) {
                    push_candidate(&mut merged, self.candidate(file, &lines, hit));
                }
            }
        }

        if merged.is_empty() {
            if let Some(text) = query.text.as_deref() {
                for file in &self.files {
                    let lines = file.lines();
                    for hit in search_text(&lines, text, query.tag.as_deref()) {
                        push_candidate(&mut merged, self.candidate(file, &lines, hit));
                    }
                }
            }
        }

        let mut candidates: Vec<FileCandidate> = merged.into_values().collect();
        sort_candidates(&mut candidates);
        component::rerank_candidates(&mut candidates, query, self);
        trace!(query = ?query, hits = candidates.len(), "source search finished");
        candidates
    }

    fn candidate(&self, file: &SourceFile, lines: &[&str], hit: Hit) -> FileCandidate {
        let idx = hit.line - 1;
        let start = idx.saturating_sub(self.context_lines);
        let end = (idx + self.context_lines + 1).min(lines.len());
        FileCandidate {
            file_path: file.relative.clone(),
            line: hit.line,
            column: hit.column,
            confidence: hit.confidence,
            reasons: vec![hit.reason],
            matched_text: hit.matched,
            context: lines[start..end].iter().map(|l| l.to_string()).collect(),
        }
    }
}

fn push_candidate(merged: &mut BTreeMap<(PathBuf, usize), FileCandidate>, candidate: FileCandidate) {
    let key = (candidate.file_path.clone(), candidate.line);
    match merged.get_mut(&key) {
        Some(existing) => existing.merge(candidate),
        None => {
            merged.insert(key, candidate);
        }
    }
}

/// Highest confidence first; ties by path then line.
pub fn sort_candidates(candidates: &mut [FileCandidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.line.cmp(&b.line))
    });
}

/// Walk up from `start` until a directory holds one of `markers`.
pub fn find_project_root(start: &Path, markers: &[String]) -> PathBuf {
    let mut current = Some(start);
    while let Some(dir) = current {
        if markers.iter().any(|m| dir.join(m).exists()) {
            return dir.to_path_buf();
        }
        current = dir.parent();
    }
    start.to_path_buf()
}

#[derive(Debug, Clone, PartialEq)]
struct Hit {
    line: usize,
    column: usize,
    confidence: f64,
    reason: String,
    matched: String,
}

fn attribute_value_regex(attr_pattern: &str, value: &str) -> Option<Regex> {
    let pattern = format!(
        r#"(?:^|[^\w-]){attr_pattern}\s*=\s*\{{?\s*["'`]['`]?{}['`]?["'`]"#,
        regex::escape(value)
    );
    Regex::new(&pattern).ok()
}

fn search_attribute(lines: &[&str], re: &Regex, confidence: f64, reason: &str) -> Vec<Hit> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let m = re.find(line)?;
            let matched = m
                .as_str()
                .trim_start_matches(|c: char| !c.is_alphanumeric() && c != ':');
            Some(Hit {
                line: i + 1,
                column: m.start() + (m.as_str().len() - matched.len()) + 1,
                confidence,
                reason: reason.to_string(),
                matched: matched.to_string(),
            })
        })
        .collect()
}

fn search_id(lines: &[&str], id: &str) -> Vec<Hit> {
    match attribute_value_regex(r":?id", id) {
        Some(re) => search_attribute(lines, &re, ID_CONFIDENCE, &format!("id match: {id}")),
        None => Vec::new(),
    }
}

fn search_test_id(lines: &[&str], test_id: &str) -> Vec<Hit> {
    match attribute_value_regex(r":?data-(?:testid|test-id|cy)", test_id) {
        Some(re) => search_attribute(
            lines,
            &re,
            TEST_ID_CONFIDENCE,
            &format!("test-id match: {test_id}"),
        ),
        None => Vec::new(),
    }
}

/// `class`, `className` and Vue `:class` string values.
pub(crate) fn class_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:^|[^\w-]):?(?:className|class)\s*=\s*\{?\s*(?:["'`])([^"'`]*)["'`]"#)
            .expect("valid class attribute regex")
    })
}

pub(crate) fn opening_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([A-Za-z][\w.-]*)").expect("valid tag regex"))
}

/// Whether `<tag` opens on line `idx` or up to [`TAG_LOOKBACK`] lines before.
fn tag_near(lines: &[&str], idx: usize, tag: &str) -> bool {
    let start = idx.saturating_sub(TAG_LOOKBACK);
    lines[start..=idx].iter().any(|line| {
        opening_tag_regex()
            .captures_iter(line)
            .any(|c| c[1].eq_ignore_ascii_case(tag))
    })
}

fn search_classes(lines: &[&str], targets: &[String], tag: Option<&str>) -> Vec<Hit> {
    let mut hits = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let best = class_attr_regex()
            .captures_iter(line)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let found: Vec<&str> = caps[1].split_whitespace().collect();
                let shared = targets
                    .iter()
                    .filter(|t| found.contains(&t.as_str()))
                    .count();
                (shared > 0).then(|| (shared, whole.start(), caps[1].to_string()))
            })
            .max_by_key(|(shared, _, _)| *shared);
        let Some((shared, start, matched)) = best else {
            continue;
        };

        let ratio = shared as f64 / targets.len() as f64;
        let mut confidence = CLASS_BASE_CONFIDENCE + CLASS_RATIO_WEIGHT * ratio;
        let mut reason = format!("class match: {shared}/{}", targets.len());
        if let Some(tag) = tag.filter(|t| tag_near(lines, idx, t)) {
            confidence += CLASS_TAG_BONUS;
            reason.push_str(&format!(" + <{tag}>"));
        }
        if shared == targets.len() {
            confidence += CLASS_FULL_MATCH_BONUS;
        }
        hits.push(Hit {
            line: idx + 1,
            column: start + 1,
            confidence: confidence.min(CLASS_CAP),
            reason,
            matched,
        });
    }
    hits
}

fn search_text(lines: &[&str], text: &str, tag: Option<&str>) -> Vec<Hit> {
    let first_line = text.lines().map(str::trim).find(|l| !l.is_empty());
    let Some(snippet) = first_line else {
        return Vec::new();
    };
    let snippet: String = snippet.chars().take(MAX_TEXT_SNIPPET).collect();
    if snippet.chars().count() < 2 {
        return Vec::new();
    }

    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let start = line.find(&snippet)?;
            let mut confidence = TEXT_CONFIDENCE;
            let mut reason = "text match".to_string();
            if let Some(tag) = tag.filter(|t| tag_near(lines, idx, t)) {
                confidence += TEXT_TAG_BONUS;
                reason.push_str(&format!(" + <{tag}>"));
            }
            Some(Hit {
                line: idx + 1,
                column: start + 1,
                confidence,
                reason,
                matched: snippet.clone(),
            })
        })
        .collect()
}
