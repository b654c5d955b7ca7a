use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default gate below which `apply` refuses to write without `--force`.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.70;

pub const DEFAULT_EXTENSIONS: &[&str] = &["tsx", "jsx", "js", "ts", "html", "vue", "svelte"];

pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".next",
    "dist",
    "build",
    "out",
    "coverage",
    ".canvas",
    ".svelte-kit",
    ".nuxt",
    "target",
];

pub const DEFAULT_ROOT_MARKERS: &[&str] = &[".canvas", "package.json", ".git", ".hg", ".svn"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub confidence_threshold: f64,
    pub extensions: Vec<String>,
    pub skip_dirs: Vec<String>,
    pub root_markers: Vec<String>,
    /// Session directory, relative to the project root unless absolute.
    pub sessions_dir: PathBuf,
    pub diff_context: usize,
    /// Lines searched around a candidate for an opening tag or style object.
    pub style_window: usize,
    /// Lines of surrounding source attached to each candidate.
    pub candidate_context: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            root_markers: DEFAULT_ROOT_MARKERS.iter().map(|s| s.to_string()).collect(),
            sessions_dir: PathBuf::from(".canvas").join("sessions"),
            diff_context: 3,
            style_window: 5,
            candidate_context: 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported config format '{0}'")]
    UnsupportedFormat(String),
    #[error("{0}")]
    Invalid(String),
}

impl Config {
    /// Location of the per-user config file, if a config dir exists.
    pub fn central_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("canvas").join("config.toml"))
    }

    /// Load from an explicit path, else the central config, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => match Self::central_config_path() {
                Some(central) if central.is_file() => Self::from_file(&central),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("toml")
            .to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Ok(toml::from_str(&raw)?),
            "yaml" | "yml" => Ok(serde_yaml::from_str(&raw)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be within 0.0..=1.0 (got {})",
                self.confidence_threshold
            )));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one source extension is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn allows_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    pub fn is_skipped_dir(&self, name: &str) -> bool {
        self.skip_dirs.iter().any(|d| d == name)
    }

    pub fn sessions_root(&self, project_root: &Path) -> PathBuf {
        if self.sessions_dir.is_absolute() {
            self.sessions_dir.clone()
        } else {
            project_root.join(&self.sessions_dir)
        }
    }
}
