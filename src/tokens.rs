//! Design tokens and Tailwind utility suggestions.
//!
//! Side data for diff generation: when a style change sets a raw value that
//! a project token or Tailwind utility already expresses, the diff result
//! carries a suggestion next to the literal inline-style edit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use palette::{convert::FromColorUnclamped, Lab, Srgb};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::Config;
use crate::types::StyleChange;

const TAILWIND_CONFIG_FILES: &[&str] = &[
    "tailwind.config.js",
    "tailwind.config.ts",
    "tailwind.config.cjs",
    "tailwind.config.mjs",
];

const STYLESHEET_EXTENSIONS: &[&str] = &["css", "scss", "sass", "less", "pcss"];

/// Delta E above which two colors are not considered interchangeable.
const MAX_COLOR_DELTA: f32 = 12.0;

const DEFAULT_PALETTE: &[(&str, &str)] = &[
    ("white", "#ffffff"),
    ("black", "#000000"),
    ("gray-100", "#f3f4f6"),
    ("gray-300", "#d1d5db"),
    ("gray-500", "#6b7280"),
    ("gray-700", "#374151"),
    ("gray-900", "#111827"),
    ("red-100", "#fee2e2"),
    ("red-300", "#fca5a5"),
    ("red-500", "#ef4444"),
    ("red-700", "#b91c1c"),
    ("red-900", "#7f1d1d"),
    ("orange-100", "#ffedd5"),
    ("orange-300", "#fdba74"),
    ("orange-500", "#f97316"),
    ("orange-700", "#c2410c"),
    ("orange-900", "#7c2d12"),
    ("yellow-100", "#fef9c3"),
    ("yellow-300", "#fde047"),
    ("yellow-500", "#eab308"),
    ("yellow-700", "#a16207"),
    ("yellow-900", "#713f12"),
    ("green-100", "#dcfce7"),
    ("green-300", "#86efac"),
    ("green-500", "#22c55e"),
    ("green-700", "#15803d"),
    ("green-900", "#14532d"),
    ("blue-100", "#dbeafe"),
    ("blue-300", "#93c5fd"),
    ("blue-500", "#3b82f6"),
    ("blue-700", "#1d4ed8"),
    ("blue-900", "#1e3a8a"),
    ("indigo-100", "#e0e7ff"),
    ("indigo-300", "#a5b4fc"),
    ("indigo-500", "#6366f1"),
    ("indigo-700", "#4338ca"),
    ("indigo-900", "#312e81"),
    ("purple-100", "#f3e8ff"),
    ("purple-300", "#d8b4fe"),
    ("purple-500", "#a855f7"),
    ("purple-700", "#7e22ce"),
    ("purple-900", "#581c87"),
    ("pink-100", "#fce7f3"),
    ("pink-300", "#f9a8d4"),
    ("pink-500", "#ec4899"),
    ("pink-700", "#be185d"),
    ("pink-900", "#831843"),
];

const SPACING_SCALE: &[f32] = &[
    0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 14.0,
    16.0, 20.0, 24.0, 28.0, 32.0, 36.0, 40.0, 44.0, 48.0, 52.0, 56.0, 60.0, 64.0, 72.0, 80.0, 96.0,
];

const FONT_SIZES: &[(f32, &str)] = &[
    (12.0, "xs"),
    (14.0, "sm"),
    (16.0, "base"),
    (18.0, "lg"),
    (20.0, "xl"),
    (24.0, "2xl"),
    (30.0, "3xl"),
    (36.0, "4xl"),
    (48.0, "5xl"),
    (60.0, "6xl"),
];

const FONT_WEIGHTS: &[(&str, &str)] = &[
    ("100", "thin"),
    ("200", "extralight"),
    ("300", "light"),
    ("400", "normal"),
    ("500", "medium"),
    ("600", "semibold"),
    ("700", "bold"),
    ("800", "extrabold"),
    ("900", "black"),
];

const RADII: &[(f32, &str)] = &[
    (0.0, "rounded-none"),
    (2.0, "rounded-sm"),
    (4.0, "rounded"),
    (6.0, "rounded-md"),
    (8.0, "rounded-lg"),
    (12.0, "rounded-xl"),
    (16.0, "rounded-2xl"),
    (24.0, "rounded-3xl"),
    (9999.0, "rounded-full"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Color,
    Spacing,
    FontSize,
    FontWeight,
    Radius,
    Other,
}

/// A CSS custom property declared in a project stylesheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignToken {
    pub name: String,
    pub value: String,
    pub kind: TokenKind,
    pub source: PathBuf,
}

impl DesignToken {
    pub fn reference(&self) -> String {
        format!("var(--{})", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailwindSuggestion {
    pub selector: String,
    pub property: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub confidence: f64,
    pub reason: String,
}

/// Theme values read from a project's Tailwind config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailwindConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Flattened color names (`brand-500`) to hex values.
    pub colors: BTreeMap<String, String>,
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"--([A-Za-z0-9_-]+)\s*:\s*([^;}]+)[;}]").expect("valid custom property regex")
    })
}

fn config_entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"['"]?([A-Za-z0-9_-]+)['"]?\s*:\s*(\{|['"](#[0-9A-Fa-f]{3,8})['"])"#)
            .expect("valid tailwind entry regex")
    })
}

pub fn extract_css_tokens(css: &str, source: &Path) -> Vec<DesignToken> {
    token_regex()
        .captures_iter(css)
        .map(|caps| {
            let name = caps[1].to_string();
            let value = caps[2].trim().to_string();
            DesignToken {
                kind: classify_token(&name, &value),
                name,
                value,
                source: source.to_path_buf(),
            }
        })
        .collect()
}

fn classify_token(name: &str, value: &str) -> TokenKind {
    let lower = name.to_ascii_lowercase();
    if parse_color(value).is_some() || lower.contains("color") {
        TokenKind::Color
    } else if lower.contains("radius") || lower.contains("rounded") {
        TokenKind::Radius
    } else if lower.contains("weight") {
        TokenKind::FontWeight
    } else if lower.contains("font-size") || lower.starts_with("text-") {
        TokenKind::FontSize
    } else if lower.contains("space") || lower.contains("spacing") || lower.contains("gap") {
        TokenKind::Spacing
    } else {
        TokenKind::Other
    }
}

/// Custom properties from every stylesheet under `root`.
pub fn collect_design_tokens(root: &Path, config: &Config) -> Vec<DesignToken> {
    let mut tokens = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !config.is_skipped_dir(&e.file_name().to_string_lossy())
        })
        .filter_map(|e| e.ok());
    for entry in walker {
        let is_stylesheet = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| STYLESHEET_EXTENSIONS.contains(&e));
        if !entry.file_type().is_file() || !is_stylesheet {
            continue;
        }
        match std::fs::read_to_string(entry.path()) {
            Ok(css) => {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                tokens.extend(extract_css_tokens(&css, relative));
            }
            Err(err) => debug!(path = %entry.path().display(), error = %err, "skipping stylesheet"),
        }
    }
    tokens
}

impl TailwindConfig {
    /// Load the first Tailwind config at `root`, if any.
    pub fn load(root: &Path) -> Option<Self> {
        TAILWIND_CONFIG_FILES.iter().find_map(|name| {
            let path = root.join(name);
            let source = std::fs::read_to_string(&path).ok()?;
            let mut config = Self::parse(&source);
            config.path = Some(PathBuf::from(name));
            debug!(path = %path.display(), colors = config.colors.len(), "loaded tailwind config");
            Some(config)
        })
    }

    /// Collect hex colors from the config source, flattening nested keys.
    ///
    /// Wrapper keys (`theme`, `extend`, `colors`) do not contribute to names.
    pub fn parse(source: &str) -> Self {
        const WRAPPERS: &[&str] = &["module", "exports", "theme", "extend", "colors"];
        let mut colors = BTreeMap::new();
        let mut stack: Vec<Option<String>> = Vec::new();
        let mut cursor = 0;

        for caps in config_entry_regex().captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let between = &source[cursor..whole.start()];
            for _ in 0..between.matches('}').count() {
                stack.pop();
            }
            cursor = whole.end();

            let key = caps[1].to_string();
            if let Some(hex) = caps.get(3) {
                let mut parts: Vec<&str> = stack.iter().flatten().map(String::as_str).collect();
                if key != "DEFAULT" {
                    parts.push(&key);
                }
                if !parts.is_empty() {
                    colors.insert(parts.join("-"), hex.as_str().to_ascii_lowercase());
                }
            } else {
                let named = (!WRAPPERS.contains(&key.as_str())).then_some(key);
                stack.push(named);
            }
        }

        Self { path: None, colors }
    }

    fn palette(&self) -> impl Iterator<Item = (&str, &str)> {
        self.colors
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(DEFAULT_PALETTE.iter().copied())
    }
}

/// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()`/`rgba()` and a few names.
pub fn parse_color(value: &str) -> Option<[u8; 3]> {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "white" => return Some([255, 255, 255]),
        "black" => return Some([0, 0, 0]),
        "red" => return Some([255, 0, 0]),
        "green" => return Some([0, 128, 0]),
        "blue" => return Some([0, 0, 255]),
        _ => {}
    }
    if let Some(hex) = v.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let expanded: String = match hex.len() {
            3 | 4 => hex.chars().take(3).flat_map(|c| [c, c]).collect(),
            6 | 8 => hex[..6].to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        return Some([channel(0)?, channel(2)?, channel(4)?]);
    }
    let inner = v
        .strip_prefix("rgba(")
        .or_else(|| v.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<u8> = inner
        .split(|c: char| c == ',' || c.is_whitespace() || c == '/')
        .filter(|p| !p.is_empty())
        .take(3)
        .map(|p| p.parse::<f32>().ok().map(|n| n.clamp(0.0, 255.0).round() as u8))
        .collect::<Option<Vec<_>>>()?;
    (parts.len() == 3).then(|| [parts[0], parts[1], parts[2]])
}

fn to_lab(rgb: [u8; 3]) -> Lab {
    let srgb = Srgb::new(
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    );
    Lab::from_color_unclamped(srgb)
}

fn lab_distance(a: Lab, b: Lab) -> f32 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// Closest palette color to `value` as `(name, delta_e)`.
pub fn nearest_color<'a>(value: &str, config: &'a TailwindConfig) -> Option<(&'a str, f32)> {
    let target = to_lab(parse_color(value)?);
    config
        .palette()
        .filter_map(|(name, hex)| Some((name, lab_distance(target, to_lab(parse_color(hex)?)))))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Pixel value of a `px`/`rem`/unitless length.
fn parse_px(value: &str) -> Option<f32> {
    let v = value.trim();
    if let Some(rem) = v.strip_suffix("rem") {
        return rem.trim().parse::<f32>().ok().map(|r| r * 16.0);
    }
    v.strip_suffix("px").unwrap_or(v).trim().parse().ok()
}

fn spacing_prefix(property: &str) -> Option<&'static str> {
    Some(match property {
        "padding" => "p",
        "padding-top" => "pt",
        "padding-right" => "pr",
        "padding-bottom" => "pb",
        "padding-left" => "pl",
        "margin" => "m",
        "margin-top" => "mt",
        "margin-right" => "mr",
        "margin-bottom" => "mb",
        "margin-left" => "ml",
        "gap" => "gap",
        "width" => "w",
        "height" => "h",
        _ => return None,
    })
}

fn color_prefix(property: &str) -> Option<&'static str> {
    Some(match property {
        "color" => "text",
        "background-color" | "background" => "bg",
        "border-color" => "border",
        _ => return None,
    })
}

fn format_scale(step: f32) -> String {
    if step.fract() == 0.0 {
        format!("{}", step as u32)
    } else {
        format!("{step}")
    }
}

/// Utility class (and optionally token) expressing `change`'s new value.
pub fn suggest_tailwind_class(
    change: &StyleChange,
    config: Option<&TailwindConfig>,
    tokens: &[DesignToken],
) -> Option<TailwindSuggestion> {
    let property = change.property.as_str();
    let value = change.new_value.trim();
    let token = find_token(value, tokens).map(DesignToken::reference);

    let class = config.and_then(|cfg| tailwind_class_for(property, value, cfg));
    if class.is_none() && token.is_none() {
        return None;
    }
    let (class_name, confidence, reason) = match class {
        Some((name, confidence, reason)) => (Some(name), confidence, reason),
        None => (None, 0.9, "matches design token".to_string()),
    };
    Some(TailwindSuggestion {
        selector: change.selector.clone(),
        property: property.to_string(),
        value: value.to_string(),
        class_name,
        token,
        confidence,
        reason,
    })
}

fn tailwind_class_for(
    property: &str,
    value: &str,
    config: &TailwindConfig,
) -> Option<(String, f64, String)> {
    if let Some(prefix) = color_prefix(property) {
        let (name, delta) = nearest_color(value, config)?;
        if delta > MAX_COLOR_DELTA {
            return None;
        }
        let confidence = if delta <= 1.0 {
            0.95
        } else {
            (1.0 - f64::from(delta) / 30.0).max(0.3)
        };
        return Some((
            format!("{prefix}-{name}"),
            confidence,
            format!("nearest palette color (delta E {delta:.1})"),
        ));
    }
    if let Some(prefix) = spacing_prefix(property) {
        let px = parse_px(value)?;
        let step = px / 4.0;
        return Some(
            match SPACING_SCALE.iter().find(|s| (**s - step).abs() < f32::EPSILON) {
                Some(s) => (
                    format!("{prefix}-{}", format_scale(*s)),
                    0.9,
                    "on spacing scale".to_string(),
                ),
                None => (
                    format!("{prefix}-[{value}]"),
                    0.5,
                    "arbitrary value".to_string(),
                ),
            },
        );
    }
    match property {
        "font-size" => {
            let px = parse_px(value)?;
            FONT_SIZES
                .iter()
                .find(|(size, _)| (size - px).abs() < 0.01)
                .map(|(_, name)| (format!("text-{name}"), 0.9, "on type scale".to_string()))
        }
        "font-weight" => {
            let normalized = match value {
                "normal" => "400",
                "bold" => "700",
                other => other,
            };
            FONT_WEIGHTS
                .iter()
                .find(|(w, _)| *w == normalized)
                .map(|(_, name)| (format!("font-{name}"), 0.95, "font weight".to_string()))
        }
        "border-radius" => {
            let px = parse_px(value)?;
            RADII
                .iter()
                .find(|(r, _)| (r - px).abs() < 0.01)
                .map(|(_, name)| (name.to_string(), 0.9, "radius scale".to_string()))
        }
        _ => None,
    }
}

fn find_token<'a>(value: &str, tokens: &'a [DesignToken]) -> Option<&'a DesignToken> {
    let wanted = value.trim().to_ascii_lowercase();
    let wanted_color = parse_color(&wanted);
    tokens.iter().find(|t| {
        let v = t.value.trim().to_ascii_lowercase();
        v == wanted || (wanted_color.is_some() && parse_color(&v) == wanted_color)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SelectorConfidence;

    fn change(property: &str, value: &str) -> StyleChange {
        StyleChange {
            selector: "button.cta".into(),
            property: property.into(),
            old_value: None,
            new_value: value.into(),
            confidence: SelectorConfidence::High,
            alternatives: vec![],
        }
    }

    #[test]
    fn parses_color_forms() {
        assert_eq!(parse_color("#ff0000"), Some([255, 0, 0]));
        assert_eq!(parse_color("#F00"), Some([255, 0, 0]));
        assert_eq!(parse_color("#3b82f680"), Some([59, 130, 246]));
        assert_eq!(parse_color("rgb(59, 130, 246)"), Some([59, 130, 246]));
        assert_eq!(parse_color("rgba(0 0 0 / 50%)"), Some([0, 0, 0]));
        assert_eq!(parse_color("papayawhip"), None);
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("#aéaaa"), None);
        assert_eq!(parse_color("#ffé"), None);
        assert_eq!(parse_color("#gggggg"), None);
    }

    #[test]
    fn non_ascii_color_values_yield_no_suggestion() {
        let config = TailwindConfig::parse("colors: { brand: '#ff0000' }");
        assert!(suggest_tailwind_class(&change("color", "#aéaaa"), Some(&config), &[]).is_none());
    }

    #[test]
    fn extracts_custom_properties() {
        let css = ":root {\n  --brand-color: #ff0000;\n  --space-4: 16px;\n  --radius-lg: 8px }\n";
        let tokens = extract_css_tokens(css, Path::new("src/theme.css"));
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Color);
        assert_eq!(tokens[1].kind, TokenKind::Spacing);
        assert_eq!(tokens[2].kind, TokenKind::Radius);
        assert_eq!(tokens[0].reference(), "var(--brand-color)");
    }

    #[test]
    fn parses_nested_tailwind_colors() {
        let source = r##"module.exports = {
  theme: {
    extend: {
      colors: {
        brand: { DEFAULT: '#FF0000', 500: '#ee0000' },
        ink: "#111111",
      },
      spacing: { '128': '32rem' },
    },
  },
};"##;
        let config = TailwindConfig::parse(source);
        assert_eq!(config.colors.get("brand").map(String::as_str), Some("#ff0000"));
        assert_eq!(config.colors.get("brand-500").map(String::as_str), Some("#ee0000"));
        assert_eq!(config.colors.get("ink").map(String::as_str), Some("#111111"));
        assert_eq!(config.colors.len(), 3);
    }

    #[test]
    fn suggests_custom_color_before_default_palette() {
        let config = TailwindConfig::parse("colors: { brand: '#ff0000' }");
        let suggestion =
            suggest_tailwind_class(&change("background-color", "#ff0000"), Some(&config), &[])
                .unwrap();
        assert_eq!(suggestion.class_name.as_deref(), Some("bg-brand"));
        assert!((suggestion.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn suggests_default_palette_and_scales() {
        let config = TailwindConfig::default();
        let s = suggest_tailwind_class(&change("color", "#3b82f6"), Some(&config), &[]).unwrap();
        assert_eq!(s.class_name.as_deref(), Some("text-blue-500"));

        let s = suggest_tailwind_class(&change("padding", "16px"), Some(&config), &[]).unwrap();
        assert_eq!(s.class_name.as_deref(), Some("p-4"));
        let s = suggest_tailwind_class(&change("margin-top", "0.5rem"), Some(&config), &[]).unwrap();
        assert_eq!(s.class_name.as_deref(), Some("mt-2"));
        let s = suggest_tailwind_class(&change("padding", "13px"), Some(&config), &[]).unwrap();
        assert_eq!(s.class_name.as_deref(), Some("p-[13px]"));
        let s = suggest_tailwind_class(&change("font-weight", "bold"), Some(&config), &[]).unwrap();
        assert_eq!(s.class_name.as_deref(), Some("font-bold"));
        let s = suggest_tailwind_class(&change("font-size", "18px"), Some(&config), &[]).unwrap();
        assert_eq!(s.class_name.as_deref(), Some("text-lg"));
        let s = suggest_tailwind_class(&change("border-radius", "8px"), Some(&config), &[]).unwrap();
        assert_eq!(s.class_name.as_deref(), Some("rounded-lg"));
        assert!(suggest_tailwind_class(&change("cursor", "pointer"), Some(&config), &[]).is_none());
    }

    #[test]
    fn token_match_works_without_tailwind() {
        let tokens = extract_css_tokens("--brand: #FF0000;", Path::new("a.css"));
        let s = suggest_tailwind_class(&change("color", "rgb(255, 0, 0)"), None, &tokens).unwrap();
        assert!(s.class_name.is_none());
        assert_eq!(s.token.as_deref(), Some("var(--brand)"));
        assert!(suggest_tailwind_class(&change("color", "#00ff00"), None, &tokens).is_none());
    }
}
