use std::path::{Path, PathBuf};

use canvas_lib::file_finder::find_project_root;
use canvas_lib::{CanvasError, Config};
use tracing::debug;

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct DiffFlagSources {
    pub context: bool,
}

impl DiffFlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            context: flag_present(args, "--context"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Resolved settings after merging CLI args and config file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedDiffSettings {
    pub context: usize,
    pub threshold: f64,
}

/// Merge CLI arguments with config file, preferring CLI when flags are present.
pub fn resolve_diff_settings(
    cli_context: usize,
    cli_threshold: Option<f64>,
    config: &Config,
    flags: &DiffFlagSources,
) -> Result<ResolvedDiffSettings, CanvasError> {
    let threshold = cli_threshold.unwrap_or(config.confidence_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(CanvasError::Config(format!(
            "--threshold {threshold} out of range"
        )));
    }
    Ok(ResolvedDiffSettings {
        context: if flags.context {
            cli_context
        } else {
            config.diff_context
        },
        threshold,
    })
}

/// Load config from a file, central config, or return defaults.
/// Priority: explicit path > ~/.config/canvas/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, CanvasError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        CanvasError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        CanvasError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Project root: `--root` when given, else the nearest marked ancestor of
/// the working directory.
pub fn resolve_root(cli_root: Option<&Path>, config: &Config) -> Result<PathBuf, CanvasError> {
    match cli_root {
        Some(root) if root.is_dir() => Ok(root.to_path_buf()),
        Some(root) => Err(CanvasError::Config(format!(
            "project root {} is not a directory",
            root.display()
        ))),
        None => {
            let cwd = std::env::current_dir()?;
            Ok(find_project_root(&cwd, &config.root_markers))
        }
    }
}

/// Log effective config (visible with --verbose).
pub fn log_effective_config(config_path: Option<&Path>, root: &Path, config: &Config) {
    debug!(
        "{}",
        format_effective_config(config, root, config_path)
    );
}

/// Format effective config as a single-line string.
pub fn format_effective_config(config: &Config, root: &Path, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective config [{source}]: root={}, sessions={}, threshold={:.2}, context={}, extensions={}, skip_dirs={}",
        root.display(),
        config.sessions_root(root).display(),
        config.confidence_threshold,
        config.diff_context,
        config.extensions.join(","),
        config.skip_dirs.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_diff_settings_prefers_config_when_flags_absent() {
        let cfg = Config {
            diff_context: 7,
            confidence_threshold: 0.5,
            ..Config::default()
        };
        let resolved =
            resolve_diff_settings(3, None, &cfg, &DiffFlagSources::default()).unwrap();
        assert_eq!(resolved.context, 7);
        assert!((resolved.threshold - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn resolve_diff_settings_prefers_cli_when_flags_present() {
        let cfg = Config::default();
        let flags = DiffFlagSources::from_args(&["canvas".into(), "--context=1".into()]);
        let resolved = resolve_diff_settings(1, Some(0.9), &cfg, &flags).unwrap();
        assert_eq!(resolved.context, 1);
        assert!((resolved.threshold - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn resolve_diff_settings_rejects_out_of_range_threshold() {
        let err = resolve_diff_settings(3, Some(1.5), &Config::default(), &DiffFlagSources::default())
            .unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn format_effective_config_includes_fields() {
        let summary = format_effective_config(
            &Config::default(),
            Path::new("/work/app"),
            Some(Path::new("canvas.toml")),
        );
        assert!(summary.contains("root=/work/app"));
        assert!(summary.contains("sessions=/work/app/.canvas/sessions"));
        assert!(summary.contains("threshold=0.70"));
        assert!(summary.contains("context=3"));
        assert!(summary.contains("canvas.toml"));
    }

    #[test]
    fn explicit_root_must_exist() {
        let err = resolve_root(Some(Path::new("/definitely/not/here")), &Config::default())
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
