//! Turn a change manifest into modified file contents and unified diffs.
//!
//! Every change ends up in exactly one of three places: a [`FileDiff`], the
//! unmapped list (nothing located it) or the warnings (located but could not
//! be applied). Edits to one file compose against the in-memory content.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use tracing::{debug, info};

use crate::config::Config;
use crate::file_finder::{opening_tag_regex, ElementQuery, FileCandidate, SourceIndex, SourceLocator};
use crate::tokens::{collect_design_tokens, suggest_tailwind_class, TailwindConfig, TailwindSuggestion};
use crate::types::{ChangeManifest, StyleChange, TextChange};

/// File confidence when no contributing change carries one.
pub const DEFAULT_FILE_CONFIDENCE: f64 = 0.5;

const JSX_EXTENSIONS: &[&str] = &["tsx", "jsx", "js", "ts", "mjs", "cjs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Style,
    Text,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::Style => "style",
            ChangeKind::Text => "text",
        })
    }
}

/// One manifest change that made it into a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedChange {
    pub kind: ChangeKind,
    pub selector: String,
    pub description: String,
    pub line: usize,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    /// Path relative to the project root.
    pub file_path: PathBuf,
    pub original_content: String,
    pub modified_content: String,
    pub changes: Vec<AppliedChange>,
    pub confidence: f64,
}

impl FileDiff {
    pub fn unified(&self, context: usize) -> String {
        unified_diff(
            &self.file_path,
            &self.original_content,
            &self.modified_content,
            context,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmappedChange {
    pub kind: ChangeKind,
    pub selector: String,
    pub description: String,
}

/// A change that was located but could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffWarning {
    pub kind: ChangeKind,
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for DiffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file_path, self.line) {
            (Some(path), Some(line)) => write!(
                f,
                "{} ({}) at {}:{}: {}",
                self.selector,
                self.kind,
                path.display(),
                line,
                self.message
            ),
            _ => write!(f, "{} ({}): {}", self.selector, self.kind, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub file_diffs: Vec<FileDiff>,
    pub unmapped_changes: Vec<UnmappedChange>,
    pub warnings: Vec<DiffWarning>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<TailwindSuggestion>,
}

impl DiffResult {
    pub fn has_unmapped(&self) -> bool {
        !self.unmapped_changes.is_empty()
    }

    /// All file diffs rendered as one patch.
    pub fn patch(&self, context: usize) -> String {
        self.file_diffs
            .iter()
            .map(|diff| diff.unified(context))
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug)]
struct WorkingFile {
    original: String,
    modified: String,
    changes: Vec<AppliedChange>,
    /// `(line, delta)` for each applied edit that changed the line count.
    line_shifts: Vec<(usize, isize)>,
}

impl WorkingFile {
    /// Where `line` of the original content sits in the modified content.
    fn current_line(&self, line: usize) -> usize {
        self.line_shifts.iter().fold(line, |current, &(at, delta)| {
            if current > at {
                current.saturating_add_signed(delta)
            } else {
                current
            }
        })
    }
}

/// Builds [`DiffResult`]s for manifests against a source tree.
#[derive(Debug, Clone)]
pub struct DiffGenerator {
    config: Config,
}

impl DiffGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn generate_diffs(&self, manifest: &ChangeManifest, root: &Path) -> DiffResult {
        let index = SourceLocator::new(&self.config).index(root);
        self.generate_with_index(manifest, &index)
    }

    pub fn generate_with_index(&self, manifest: &ChangeManifest, index: &SourceIndex) -> DiffResult {
        let mut result = DiffResult::default();
        let mut files: BTreeMap<PathBuf, WorkingFile> = BTreeMap::new();

        for change in &manifest.text_changes {
            self.apply_text(manifest, index, change, &mut files, &mut result);
        }

        let mut mapped_styles = Vec::new();
        for change in &manifest.style_changes {
            if self.apply_style(manifest, index, change, &mut files, &mut result) {
                mapped_styles.push(change);
            }
        }

        let tailwind = TailwindConfig::load(index.root());
        let tokens = collect_design_tokens(index.root(), &self.config);
        if tailwind.is_some() || !tokens.is_empty() {
            result.suggestions = mapped_styles
                .into_iter()
                .filter_map(|change| suggest_tailwind_class(change, tailwind.as_ref(), &tokens))
                .collect();
        }

        result.file_diffs = files
            .into_iter()
            .filter(|(_, work)| !work.changes.is_empty())
            .map(|(file_path, work)| {
                let confidence = mean_confidence(&work.changes);
                FileDiff {
                    file_path,
                    original_content: work.original,
                    modified_content: work.modified,
                    changes: work.changes,
                    confidence,
                }
            })
            .collect();

        info!(
            session = %manifest.session_id,
            files = result.file_diffs.len(),
            unmapped = result.unmapped_changes.len(),
            warnings = result.warnings.len(),
            "generated diffs"
        );
        result
    }

    fn apply_text(
        &self,
        manifest: &ChangeManifest,
        index: &SourceIndex,
        change: &TextChange,
        files: &mut BTreeMap<PathBuf, WorkingFile>,
        result: &mut DiffResult,
    ) {
        let description = format!("text {:?} -> {:?}", change.old_text, change.new_text);
        let Some(candidate) = locate(manifest, index, &change.selector, &change.alternatives) else {
            debug!(selector = %change.selector, "text change not located");
            result.unmapped_changes.push(UnmappedChange {
                kind: ChangeKind::Text,
                selector: change.selector.clone(),
                description,
            });
            return;
        };
        let Some(work) = working_file(files, index, &candidate.file_path) else {
            return;
        };

        let line = work.current_line(candidate.line);
        match find_text_near(&work.modified, line, &change.old_text) {
            Some(start) => {
                let at = work.modified[..start].matches('\n').count() + 1;
                let delta = change.new_text.matches('\n').count() as isize
                    - change.old_text.matches('\n').count() as isize;
                work.modified
                    .replace_range(start..start + change.old_text.len(), &change.new_text);
                if delta != 0 {
                    work.line_shifts.push((at, delta));
                }
                work.changes.push(AppliedChange {
                    kind: ChangeKind::Text,
                    selector: change.selector.clone(),
                    description,
                    line: candidate.line,
                    confidence: candidate.confidence,
                });
            }
            None => result.warnings.push(DiffWarning {
                kind: ChangeKind::Text,
                selector: change.selector.clone(),
                file_path: Some(candidate.file_path.clone()),
                line: Some(candidate.line),
                message: format!("text {:?} not found in file", change.old_text),
            }),
        }
    }

    fn apply_style(
        &self,
        manifest: &ChangeManifest,
        index: &SourceIndex,
        change: &StyleChange,
        files: &mut BTreeMap<PathBuf, WorkingFile>,
        result: &mut DiffResult,
    ) -> bool {
        let description = format!("style {}: {}", change.property, change.new_value);
        let Some(candidate) = locate(manifest, index, &change.selector, &change.alternatives) else {
            debug!(selector = %change.selector, property = %change.property, "style change not located");
            result.unmapped_changes.push(UnmappedChange {
                kind: ChangeKind::Style,
                selector: change.selector.clone(),
                description,
            });
            return false;
        };
        let Some(work) = working_file(files, index, &candidate.file_path) else {
            return false;
        };

        let target = StyleTarget {
            line: work.current_line(candidate.line),
            column: candidate.column,
            window: self.config.style_window,
            jsx: is_jsx(&candidate.file_path),
        };
        match apply_style_near(&work.modified, &target, &change.property, &change.new_value) {
            Ok(updated) => {
                work.modified = updated;
                work.changes.push(AppliedChange {
                    kind: ChangeKind::Style,
                    selector: change.selector.clone(),
                    description,
                    line: candidate.line,
                    confidence: candidate.confidence,
                });
                true
            }
            Err(skip) => {
                let message = match skip {
                    StyleSkip::NoTag => format!(
                        "no opening tag within {} lines of the located line",
                        self.config.style_window
                    ),
                    StyleSkip::UnsupportedStyle => {
                        "existing style attribute has a form that cannot be merged into".to_string()
                    }
                };
                result.warnings.push(DiffWarning {
                    kind: ChangeKind::Style,
                    selector: change.selector.clone(),
                    file_path: Some(candidate.file_path.clone()),
                    line: Some(candidate.line),
                    message,
                });
                false
            }
        }
    }
}

/// Top candidate for `selector`, then for each alternative selector.
fn locate(
    manifest: &ChangeManifest,
    index: &SourceIndex,
    selector: &str,
    alternatives: &[String],
) -> Option<FileCandidate> {
    let query = manifest
        .elements
        .get(selector)
        .map(ElementQuery::from_element)
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| ElementQuery::from_selector(selector));
    if let Some(top) = index.find(&query).into_iter().next() {
        return Some(top);
    }
    alternatives.iter().find_map(|alt| {
        let query = ElementQuery::from_selector(alt);
        if query.is_empty() {
            return None;
        }
        let top = index.find(&query).into_iter().next()?;
        debug!(selector, alternative = %alt, "located through alternative selector");
        Some(top)
    })
}

fn working_file<'w>(
    files: &'w mut BTreeMap<PathBuf, WorkingFile>,
    index: &SourceIndex,
    path: &Path,
) -> Option<&'w mut WorkingFile> {
    if !files.contains_key(path) {
        let source = index.file(path)?;
        files.insert(
            path.to_path_buf(),
            WorkingFile {
                original: source.content.clone(),
                modified: source.content.clone(),
                changes: Vec::new(),
                line_shifts: Vec::new(),
            },
        );
    }
    files.get_mut(path)
}

fn mean_confidence(changes: &[AppliedChange]) -> f64 {
    if changes.is_empty() {
        return DEFAULT_FILE_CONFIDENCE;
    }
    changes.iter().map(|c| c.confidence).sum::<f64>() / changes.len() as f64
}

fn is_jsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| JSX_EXTENSIONS.contains(&e))
}

/// Byte offset where 1-based `line` starts.
fn line_offset(content: &str, line: usize) -> usize {
    content
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum()
}

/// Replace the occurrence of `old` nearest to `line`.
///
/// Only occurrences that sit between tag delimiters (`>text<`, whitespace
/// allowed) or fill a quoted string literal are considered.
pub fn replace_text_near(content: &str, line: usize, old: &str, new: &str) -> Option<String> {
    let start = find_text_near(content, line, old)?;
    let mut updated = String::with_capacity(content.len() + new.len());
    updated.push_str(&content[..start]);
    updated.push_str(new);
    updated.push_str(&content[start + old.len()..]);
    Some(updated)
}

/// Byte offset of the delimited occurrence of `old` nearest to `line`.
fn find_text_near(content: &str, line: usize, old: &str) -> Option<usize> {
    if old.is_empty() {
        return None;
    }
    let target = line_offset(content, line);
    content
        .match_indices(old)
        .map(|(start, _)| start)
        .filter(|start| is_delimited(content, *start, start + old.len()))
        .min_by_key(|start| (start.abs_diff(target), *start))
}

fn is_delimited(content: &str, start: usize, end: usize) -> bool {
    let before = content[..start].chars().next_back();
    let after = content[end..].chars().next();
    if let (Some(b), Some(a)) = (before, after) {
        if b == a && matches!(b, '"' | '\'' | '`') {
            return true;
        }
    }
    content[..start].trim_end().ends_with('>') && content[end..].trim_start().starts_with('<')
}

/// Where a style change lands.
#[derive(Debug, Clone, Copy)]
pub struct StyleTarget {
    pub line: usize,
    pub column: usize,
    /// Lines searched around `line` for a tag or style attribute.
    pub window: usize,
    /// Emit `style={{ ... }}` objects instead of `style="..."` strings.
    pub jsx: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StyleSyntax {
    /// `style={{ ... }}`
    Object,
    /// `style={base}`, merged by spreading the expression.
    Expression,
    /// `style="..."` or `style='...'`, holding the quote.
    Inline(char),
    /// Any other `style=` value.
    Other,
}

#[derive(Debug, Clone)]
struct StyleSpan {
    body: Range<usize>,
    syntax: StyleSyntax,
}

/// Why a style change could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleSkip {
    /// No opening tag or style attribute near the located line.
    NoTag,
    /// The tag already has a style attribute that cannot be extended.
    UnsupportedStyle,
}

fn style_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[^\w:.-])style\s*=\s*").expect("valid style attribute regex"))
}

/// Merge `property: value` into the element's style near `target.line`.
///
/// An existing style attribute on the located tag is extended; otherwise a
/// new attribute is inserted before the tag's `>` or `/>`. A tag never gets
/// a second style attribute. Without a tag within the window, the nearest
/// style string or object in the window is used.
pub fn apply_style_near(
    content: &str,
    target: &StyleTarget,
    property: &str,
    value: &str,
) -> Result<String, StyleSkip> {
    if let Some(tag_start) = find_opening_tag(content, target) {
        let tag_close = tag_end(content, tag_start).ok_or(StyleSkip::NoTag)?;
        if let Some(style) = find_style(content, tag_start..tag_close, tag_start) {
            if style.syntax == StyleSyntax::Expression && !target.jsx {
                return Err(StyleSkip::UnsupportedStyle);
            }
            return merge_into(content, &style, property, value);
        }
        let insert_at = content[..tag_close].trim_end().len();
        let attribute = if target.jsx {
            format!(" style={{{{ {}: {} }}}}", camel_case(property), js_string(value))
        } else {
            format!(" style=\"{property}: {}\"", value.replace('"', "'"))
        };
        let mut updated = String::with_capacity(content.len() + attribute.len());
        updated.push_str(&content[..insert_at]);
        updated.push_str(&attribute);
        updated.push_str(&content[insert_at..]);
        return Ok(updated);
    }

    let first = target.line.saturating_sub(target.window).max(1);
    let window = line_offset(content, first)..line_offset(content, target.line + target.window + 1);
    let style = find_style(content, window, line_offset(content, target.line))
        .filter(|s| matches!(s.syntax, StyleSyntax::Object | StyleSyntax::Inline(_)))
        .ok_or(StyleSkip::NoTag)?;
    merge_into(content, &style, property, value)
}

/// Start of the `<Tag` owning the located line, looking back `window` lines.
fn find_opening_tag(content: &str, target: &StyleTarget) -> Option<usize> {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let idx = target.line.checked_sub(1).filter(|i| *i < lines.len())?;
    let first = idx.saturating_sub(target.window);
    (first..=idx).rev().find_map(|l| {
        let text = lines[l];
        let limit = if l == idx {
            target.column.saturating_sub(1).max(1)
        } else {
            text.len()
        };
        opening_tag_regex()
            .find_iter(text)
            .filter(|m| m.start() < limit)
            .last()
            .map(|m| line_offset(content, l + 1) + m.start())
    })
}

/// Offset of the `>` (or the `/` of `/>`) closing the tag opened at `start`.
fn tag_end(content: &str, start: usize) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    for i in start + 1..bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'<' if depth == 0 => return None,
            b'>' if depth == 0 => {
                return Some(if bytes[i - 1] == b'/' { i - 1 } else { i });
            }
            _ => {}
        }
    }
    None
}

/// Style attribute inside `range` whose start is nearest to `anchor`.
fn find_style(content: &str, range: Range<usize>, anchor: usize) -> Option<StyleSpan> {
    let end = range.end.min(content.len());
    let start = range.start.min(end);
    style_attr_regex()
        .find_iter(&content[start..end])
        .map(|m| (start + m.start(), classify_style(content, start + m.end())))
        .min_by_key(|(at, _)| (at.abs_diff(anchor), *at))
        .map(|(_, span)| span)
}

/// Body and syntax of the attribute value beginning at `value_start`.
fn classify_style(content: &str, value_start: usize) -> StyleSpan {
    let other = StyleSpan {
        body: value_start..value_start,
        syntax: StyleSyntax::Other,
    };
    match content[value_start..].chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let body_start = value_start + 1;
            match content[body_start..].find(quote) {
                Some(len) => StyleSpan {
                    body: body_start..body_start + len,
                    syntax: StyleSyntax::Inline(quote),
                },
                None => other,
            }
        }
        Some('{') => {
            let inner = value_start + 1;
            let rest = &content[inner..];
            let padding = rest.len() - rest.trim_start().len();
            if rest[padding..].starts_with('{') {
                let body_start = inner + padding + 1;
                object_end(content, body_start).map_or(other, |body_end| StyleSpan {
                    body: body_start..body_end,
                    syntax: StyleSyntax::Object,
                })
            } else {
                object_end(content, inner).map_or(other, |body_end| StyleSpan {
                    body: inner..body_end,
                    syntax: StyleSyntax::Expression,
                })
            }
        }
        _ => other,
    }
}

/// Offset of the `}` closing an object literal whose body starts at `from`.
fn object_end(content: &str, from: usize) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn merge_into(content: &str, style: &StyleSpan, property: &str, value: &str) -> Result<String, StyleSkip> {
    let body = &content[style.body.clone()];
    let merged = match style.syntax {
        StyleSyntax::Object => merge_style_object(body, &camel_case(property), &js_string(value)),
        StyleSyntax::Expression => format!(
            "{{ ...{}, {}: {} }}",
            body.trim(),
            camel_case(property),
            js_string(value)
        ),
        StyleSyntax::Inline(quote) => {
            let swap = if quote == '"' { "'" } else { "\"" };
            merge_inline_style(body, property, &value.replace(quote, swap))
        }
        StyleSyntax::Other => return Err(StyleSkip::UnsupportedStyle),
    };
    let mut updated = String::with_capacity(content.len() + merged.len());
    updated.push_str(&content[..style.body.start]);
    updated.push_str(&merged);
    updated.push_str(&content[style.body.end..]);
    Ok(updated)
}

/// Set `key` in the body of a JS object literal, replacing an existing entry.
fn merge_style_object(body: &str, key: &str, literal: &str) -> String {
    let pattern = format!(
        r#"(^|[\s,{{])({}\s*:\s*)("[^"]*"|'[^']*'|`[^`]*`|[^,}}\n]+)"#,
        regex::escape(key)
    );
    if let Ok(re) = Regex::new(&pattern) {
        if let Some(caps) = re.captures(body) {
            if let Some(old) = caps.get(3) {
                let trailing = &old.as_str()[old.as_str().trim_end().len()..];
                return format!("{}{literal}{trailing}{}", &body[..old.start()], &body[old.end()..]);
            }
        }
    }

    if body.trim().is_empty() {
        return format!(" {key}: {literal} ");
    }
    let content_end = body.trim_end().len();
    let (head, tail) = body.split_at(content_end);
    let separator = if head.ends_with(',') { " " } else { ", " };
    format!("{head}{separator}{key}: {literal}{tail}")
}

/// Set `property` in a CSS declaration list.
fn merge_inline_style(body: &str, property: &str, value: &str) -> String {
    let mut declarations: Vec<String> = body
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();
    let existing = declarations.iter_mut().find(|d| {
        d.split_once(':')
            .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case(property))
    });
    match existing {
        Some(decl) => *decl = format!("{property}: {value}"),
        None => declarations.push(format!("{property}: {value}")),
    }
    declarations.join("; ")
}

/// `background-color` -> `backgroundColor`, `-webkit-mask` -> `WebkitMask`.
pub fn camel_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len());
    let mut upper = false;
    for (i, c) in property.chars().enumerate() {
        if c == '-' {
            upper = i > 0 || property.starts_with("-webkit") || property.starts_with("-moz");
            continue;
        }
        if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn js_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Unified diff of `old` and `new` with `a/`/`b/` headers.
///
/// Empty when the contents are equal.
pub fn unified_diff(path: &Path, old: &str, new: &str, context: usize) -> String {
    let display = path.to_string_lossy().replace('\\', "/");
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(context)
        .header(&format!("a/{display}"), &format!("b/{display}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_finder::SourceFile;
    use crate::types::{ElementInfo, SelectorConfidence};
    use tempfile::TempDir;

    fn index(files: &[(&str, &str)]) -> SourceIndex {
        SourceIndex::from_files(
            "/nonexistent-canvas-project",
            files
                .iter()
                .map(|(path, content)| SourceFile {
                    path: Path::new("/nonexistent-canvas-project").join(path),
                    relative: PathBuf::from(path),
                    content: content.to_string(),
                })
                .collect(),
        )
    }

    fn element(selector: &str, tag: &str, classes: &[&str]) -> ElementInfo {
        ElementInfo {
            tag: tag.into(),
            selector: selector.into(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            ..ElementInfo::default()
        }
    }

    fn style(selector: &str, property: &str, value: &str) -> StyleChange {
        StyleChange {
            selector: selector.into(),
            property: property.into(),
            old_value: None,
            new_value: value.into(),
            confidence: SelectorConfidence::Medium,
            alternatives: vec![],
        }
    }

    fn text(selector: &str, old: &str, new: &str) -> TextChange {
        TextChange {
            selector: selector.into(),
            old_text: old.into(),
            new_text: new.into(),
            confidence: SelectorConfidence::Medium,
            alternatives: vec![],
        }
    }

    fn button_file(button: &str) -> String {
        let mut src = String::from("export function Hero() {\n  return (\n");
        for _ in 0..6 {
            src.push_str("    // layout\n");
        }
        src.push_str("    <section>\n");
        src.push_str(&format!("      {button}\n"));
        src.push_str("    </section>\n  );\n}\n");
        src
    }

    fn cta_manifest() -> ChangeManifest {
        let mut manifest = ChangeManifest::new("ses-a", "http://localhost:3000");
        manifest
            .elements
            .insert("button.cta".into(), element("button.cta", "button", &["cta"]));
        manifest
            .style_changes
            .push(style("button.cta", "background-color", "#ff0000"));
        manifest
    }

    fn line(content: &str, n: usize) -> &str {
        content.lines().nth(n - 1).unwrap()
    }

    #[test]
    fn inserts_style_object_on_located_tag() {
        let src = button_file("<button className=\"cta\">Buy</button>");
        assert_eq!(line(&src, 10).trim(), "<button className=\"cta\">Buy</button>");
        let idx = index(&[("src/Hero.tsx", &src)]);
        let result = DiffGenerator::new(&Config::default()).generate_with_index(&cta_manifest(), &idx);

        assert!(result.unmapped_changes.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.file_diffs.len(), 1);
        let diff = &result.file_diffs[0];
        assert_eq!(
            line(&diff.modified_content, 10),
            "      <button className=\"cta\" style={{ backgroundColor: \"#ff0000\" }}>Buy</button>"
        );
        assert_eq!(diff.changes[0].line, 10);
        assert!(diff.confidence >= 0.9);
        assert_eq!(diff.original_content, src);
    }

    #[test]
    fn appends_to_existing_style_object() {
        let src = button_file("<button className=\"cta\" style={{ color: \"blue\" }}>Buy</button>");
        let idx = index(&[("src/Hero.tsx", &src)]);
        let result = DiffGenerator::new(&Config::default()).generate_with_index(&cta_manifest(), &idx);

        let modified = &result.file_diffs[0].modified_content;
        assert_eq!(
            line(modified, 10).trim(),
            "<button className=\"cta\" style={{ color: \"blue\", backgroundColor: \"#ff0000\" }}>Buy</button>"
        );
        assert_eq!(modified.matches("style=").count(), 1);
    }

    #[test]
    fn existing_key_is_replaced_not_duplicated() {
        assert_eq!(
            merge_style_object(" color: \"blue\", padding: 4 ", "padding", "\"8px\""),
            " color: \"blue\", padding: \"8px\" "
        );
        assert_eq!(merge_style_object("", "color", "\"red\""), " color: \"red\" ");
        assert_eq!(merge_style_object(" a: 1, ", "b", "\"2\""), " a: 1, b: \"2\" ");
    }

    #[test]
    fn missing_text_is_warning_and_unlocated_selector_is_unmapped() {
        let idx = index(&[(
            "src/Intro.tsx",
            "<div>\n  <p className=\"subtitle\">Hello there</p>\n</div>\n",
        )]);
        let mut manifest = ChangeManifest::new("ses-c", "http://localhost");
        manifest
            .elements
            .insert("p.subtitle".into(), element("p.subtitle", "p", &["subtitle"]));
        manifest.text_changes.push(text("p.subtitle", "Welcome", "Hello"));
        manifest.text_changes.push(text("p.ghost", "Welcome", "Hello"));

        let result = DiffGenerator::new(&Config::default()).generate_with_index(&manifest, &idx);
        assert!(result.file_diffs.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].selector, "p.subtitle");
        assert_eq!(result.warnings[0].line, Some(2));
        assert_eq!(result.unmapped_changes.len(), 1);
        assert_eq!(result.unmapped_changes[0].selector, "p.ghost");
        assert!(result.has_unmapped());
    }

    #[test]
    fn text_replacement_targets_nearest_occurrence() {
        let mut src = String::from("const title = \"Welcome\";\n");
        for _ in 0..10 {
            src.push_str("// filler\n");
        }
        src.push_str("<p className=\"subtitle\">Welcome</p>\n");
        src.push_str("<h2>Welcome</h2>\n");
        let idx = index(&[("Page.jsx", &src)]);

        let mut manifest = ChangeManifest::new("ses-n", "http://localhost");
        manifest
            .elements
            .insert("p.subtitle".into(), element("p.subtitle", "p", &["subtitle"]));
        manifest.text_changes.push(text("p.subtitle", "Welcome", "Hello"));

        let result = DiffGenerator::new(&Config::default()).generate_with_index(&manifest, &idx);
        let modified = &result.file_diffs[0].modified_content;
        assert_eq!(line(modified, 1), "const title = \"Welcome\";");
        assert_eq!(line(modified, 12), "<p className=\"subtitle\">Hello</p>");
        assert_eq!(line(modified, 13), "<h2>Welcome</h2>");
    }

    #[test]
    fn text_inside_words_is_not_replaced() {
        assert_eq!(replace_text_near("<p>Welcome back</p>\n", 1, "Welcome", "Hi"), None);
        assert_eq!(
            replace_text_near("<p>\n  Welcome\n</p>\n", 2, "Welcome", "Hi").as_deref(),
            Some("<p>\n  Hi\n</p>\n")
        );
        assert_eq!(
            replace_text_near("label={'Welcome'}\n", 1, "Welcome", "Hi").as_deref(),
            Some("label={'Hi'}\n")
        );
    }

    #[test]
    fn changes_to_one_file_compose() {
        let src = "<button className=\"cta\">Buy</button>\n";
        let idx = index(&[("Cta.tsx", src)]);
        let mut manifest = cta_manifest();
        manifest.style_changes.push(style("button.cta", "color", "white"));
        manifest.text_changes.push(text("button.cta", "Buy", "Buy now"));

        let result = DiffGenerator::new(&Config::default()).generate_with_index(&manifest, &idx);
        assert_eq!(result.file_diffs.len(), 1);
        let diff = &result.file_diffs[0];
        assert_eq!(diff.changes.len(), 3);
        assert_eq!(
            diff.modified_content,
            "<button className=\"cta\" style={{ backgroundColor: \"#ff0000\", color: \"white\" }}>Buy now</button>\n"
        );
    }

    #[test]
    fn generation_is_deterministic() {
        let src = button_file("<button className=\"cta\">Buy</button>");
        let idx = index(&[("a/Hero.tsx", &src), ("b/Hero.tsx", &src)]);
        let generator = DiffGenerator::new(&Config::default());
        let first = generator.generate_with_index(&cta_manifest(), &idx);
        let second = generator.generate_with_index(&cta_manifest(), &idx);
        assert_eq!(first, second);
        assert_eq!(first.file_diffs[0].file_path, Path::new("a/Hero.tsx"));
    }

    #[test]
    fn self_closing_and_multiline_tags() {
        let target = StyleTarget {
            line: 3,
            column: 3,
            window: 5,
            jsx: true,
        };
        let src = "<img\n  src=\"/a.png\"\n  className=\"logo\"\n/>\n";
        assert_eq!(
            apply_style_near(src, &target, "border-radius", "8px").as_deref(),
            Ok("<img\n  src=\"/a.png\"\n  className=\"logo\" style={{ borderRadius: \"8px\" }}\n/>\n")
        );

        let src = "<button onClick={() => go(\">\")} className=\"cta\">Go</button>\n";
        let target = StyleTarget { line: 1, column: 33, ..target };
        assert_eq!(
            apply_style_near(src, &target, "color", "red").as_deref(),
            Ok("<button onClick={() => go(\">\")} className=\"cta\" style={{ color: \"red\" }}>Go</button>\n")
        );
    }

    #[test]
    fn markup_files_use_inline_style_strings() {
        let target = StyleTarget {
            line: 1,
            column: 5,
            window: 5,
            jsx: false,
        };
        assert_eq!(
            apply_style_near("<p class=\"lead\">x</p>\n", &target, "color", "red").as_deref(),
            Ok("<p class=\"lead\" style=\"color: red\">x</p>\n")
        );
        assert_eq!(
            apply_style_near("<p class=\"lead\" style=\"margin: 0;\">x</p>\n", &target, "color", "red")
                .as_deref(),
            Ok("<p class=\"lead\" style=\"margin: 0; color: red\">x</p>\n")
        );
        assert_eq!(
            apply_style_near("<p class=\"lead\" style='margin: 0'>x</p>\n", &target, "font-family", "\"Inter\"")
                .as_deref(),
            Ok("<p class=\"lead\" style='margin: 0; font-family: \"Inter\"'>x</p>\n")
        );
        assert_eq!(
            apply_style_near("<p class=\"lead\" style=margin:0>x</p>\n", &target, "color", "red"),
            Err(StyleSkip::UnsupportedStyle)
        );
        assert_eq!(
            apply_style_near("<p class=\"lead\" style={css}>x</p>\n", &target, "color", "red"),
            Err(StyleSkip::UnsupportedStyle)
        );
    }

    #[test]
    fn expression_style_is_spread_into_an_object() {
        let target = StyleTarget {
            line: 1,
            column: 9,
            window: 5,
            jsx: true,
        };
        let src = "<button className=\"cta\" style={base}>Buy</button>\n";
        let once = apply_style_near(src, &target, "color", "red").unwrap();
        assert_eq!(
            once,
            "<button className=\"cta\" style={{ ...base, color: \"red\" }}>Buy</button>\n"
        );
        let twice = apply_style_near(&once, &target, "padding", "8px").unwrap();
        assert_eq!(
            twice,
            "<button className=\"cta\" style={{ ...base, color: \"red\", padding: \"8px\" }}>Buy</button>\n"
        );
        assert_eq!(twice.matches("style=").count(), 1);
    }

    #[test]
    fn unsupported_style_attribute_is_warning_not_duplicate() {
        let src = "<p class=\"cta\" style=color:blue>Buy</p>\n";
        let idx = index(&[("index.html", src)]);
        let mut manifest = ChangeManifest::new("ses-h", "http://localhost");
        manifest.style_changes.push(style("p.cta", "color", "red"));
        let result = DiffGenerator::new(&Config::default()).generate_with_index(&manifest, &idx);
        assert!(result.file_diffs.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("cannot be merged"));
    }

    #[test]
    fn multiline_text_edit_keeps_later_style_on_its_tag() {
        let src = "<h1 className=\"title\">Hello</h1>\n<button className=\"cta\">Buy</button>\n";
        let idx = index(&[("src/Page.tsx", src)]);
        let mut manifest = cta_manifest();
        manifest
            .elements
            .insert("h1.title".into(), element("h1.title", "h1", &["title"]));
        manifest
            .text_changes
            .push(text("h1.title", "Hello", "Hello\n  there"));
        let result = DiffGenerator::new(&Config::default()).generate_with_index(&manifest, &idx);

        assert!(result.warnings.is_empty());
        assert_eq!(
            result.file_diffs[0].modified_content,
            "<h1 className=\"title\">Hello\n  there</h1>\n<button className=\"cta\" style={{ backgroundColor: \"#ff0000\" }}>Buy</button>\n"
        );
    }

    #[test]
    fn no_tag_in_window_is_warning() {
        let mut src = String::new();
        for _ in 0..8 {
            src.push_str("// nothing\n");
        }
        src.push_str("el.className = \"cta\";\n");
        let idx = index(&[("util.ts", &src)]);
        let manifest = cta_manifest();
        let result = DiffGenerator::new(&Config::default()).generate_with_index(&manifest, &idx);
        assert!(result.file_diffs.is_empty());
        assert!(result.unmapped_changes.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, ChangeKind::Style);
    }

    #[test]
    fn missing_element_info_falls_back_to_selector_hints() {
        let idx = index(&[("Cta.tsx", "<button className=\"cta\">Buy</button>\n")]);
        let mut manifest = ChangeManifest::new("ses-o", "http://localhost");
        manifest.style_changes.push(style("main > button.cta", "color", "red"));
        let result = DiffGenerator::new(&Config::default()).generate_with_index(&manifest, &idx);
        assert_eq!(result.file_diffs.len(), 1);
    }

    #[test]
    fn alternatives_are_tried_when_primary_selector_misses() {
        let idx = index(&[("Cta.tsx", "<button id=\"buy\">Buy</button>\n")]);
        let mut manifest = ChangeManifest::new("ses-alt", "http://localhost");
        let mut change = style("button.renamed", "color", "red");
        change.alternatives = vec!["#buy".into()];
        manifest.style_changes.push(change);
        let result = DiffGenerator::new(&Config::default()).generate_with_index(&manifest, &idx);
        assert!(result.unmapped_changes.is_empty());
        assert!((result.file_diffs[0].confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn camel_case_properties() {
        assert_eq!(camel_case("background-color"), "backgroundColor");
        assert_eq!(camel_case("color"), "color");
        assert_eq!(camel_case("-webkit-line-clamp"), "WebkitLineClamp");
    }

    #[test]
    fn unified_diff_renders_hunks_with_context() {
        let old = "a\nb\nc\nd\ne\nf\ng\nh\n";
        let new = "a\nb\nc\nD\ne\nf\ng\nh\n";
        let diff = unified_diff(Path::new("src/x.tsx"), old, new, 2);
        assert_eq!(
            diff,
            "--- a/src/x.tsx\n+++ b/src/x.tsx\n@@ -2,5 +2,5 @@\n b\n c\n-d\n+D\n e\n f\n"
        );
        assert!(unified_diff(Path::new("x"), old, old, 3).is_empty());
    }

    #[test]
    fn unified_diff_splits_distant_hunks_and_handles_insertions() {
        let old: String = (1..=20).map(|i| format!("{i}\n")).collect();
        let new = old.replacen("2\n", "two\n", 1).replacen("19\n", "19\nextra\n", 1);
        let diff = unified_diff(Path::new("f"), &old, &new, 1);
        assert_eq!(diff.matches("@@ -").count(), 2);
        assert!(diff.contains("@@ -1,3 +1,3 @@\n 1\n-2\n+two\n 3\n"));
        assert!(diff.contains("+extra\n"));

        let diff = unified_diff(Path::new("f"), "", "x\n", 3);
        assert!(diff.contains("@@ -0,0 +1 @@\n+x\n"));
    }

    #[test]
    fn unified_diff_handles_distant_edits_in_large_files() {
        let old: String = (1..=20_000).map(|i| format!("line {i}\n")).collect();
        let new = old
            .replacen("line 2\n", "line two\n", 1)
            .replacen("line 19999\n", "line 19,999\n", 1);
        let diff = unified_diff(Path::new("big.tsx"), &old, &new, 3);
        assert_eq!(diff.matches("@@ -").count(), 2);
        assert!(diff.contains("-line 19999\n+line 19,999\n"));
    }

    #[test]
    fn suggestions_come_from_project_tailwind_config() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(
            root.join("tailwind.config.js"),
            "module.exports = { theme: { extend: { colors: { brand: '#ff0000' } } } };\n",
        )
        .unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/Cta.tsx"), "<button className=\"cta\">Buy</button>\n").unwrap();

        let result = DiffGenerator::new(&Config::default()).generate_diffs(&cta_manifest(), root);
        assert_eq!(result.file_diffs.len(), 1);
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].class_name.as_deref(), Some("bg-brand"));
        // Suggestions never change the file.
        assert!(result.file_diffs[0].modified_content.contains("backgroundColor"));
        assert!(!result.patch(3).is_empty());
    }
}
