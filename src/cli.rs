use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "canvas")]
#[command(
    version,
    about = "Canvas - Map recorded browser edits back to source files",
    long_about = "Canvas\n\nCommands:\n- sessions: list recorded overlay sessions.\n- diff: locate each recorded style/text change in the source tree and preview it as a unified diff; --apply writes the files behind a confidence gate.\n- locate: rank source locations for an element description.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose (debug) logging on stderr")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML or YAML) for threshold/extensions/skip dirs; CLI flags override config"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Project root (defaults to the nearest ancestor with .canvas, package.json or a VCS directory)"
    )]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List recorded sessions, newest first
    Sessions {
        #[arg(long, value_enum, default_value = "pretty", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Preview (or apply) the source changes recorded in a session
    Diff {
        #[arg(help = "Session id (exact, without the ses- prefix, or any unique substring)")]
        session: String,

        #[arg(long, help = "Emit the full result as JSON instead of a unified diff")]
        json: bool,

        #[arg(
            long,
            default_value = "3",
            value_name = "N",
            help = "Context lines around each hunk"
        )]
        context: usize,

        #[arg(long, help = "Write the modified files")]
        apply: bool,

        #[arg(long, requires = "apply", help = "With --apply: report the files that would be written")]
        dry_run: bool,

        #[arg(long, requires = "apply", help = "With --apply: write files below the confidence threshold")]
        force: bool,

        #[arg(
            long,
            value_name = "SCORE",
            help = "Minimum file confidence for --apply (0.0-1.0; default 0.70)"
        )]
        threshold: Option<f64>,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Rank source locations for an element description
    Locate {
        #[arg(long, help = "CSS selector; its last compound supplies tag/id/classes/test-id")]
        selector: Option<String>,

        #[arg(long, help = "Tag name (e.g. button)")]
        tag: Option<String>,

        #[arg(long = "class", value_delimiter = ',', help = "Class names (comma-separated or repeated)")]
        classes: Vec<String>,

        #[arg(long, help = "Element id")]
        id: Option<String>,

        #[arg(long, help = "data-testid / data-cy value")]
        testid: Option<String>,

        #[arg(long, help = "Visible text (used only when nothing else matches)")]
        text: Option<String>,

        #[arg(long, default_value = "10", help = "Maximum candidates to show")]
        limit: usize,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, OutputFormat};
    use clap::Parser;

    #[test]
    fn diff_command_uses_defaults() {
        let cli = Cli::parse_from(["canvas", "diff", "abc123"]);

        assert!(!cli.verbose);
        assert!(cli.config.is_none());
        assert!(cli.root.is_none());

        match cli.command {
            Commands::Diff {
                session,
                json,
                context,
                apply,
                dry_run,
                force,
                threshold,
                output,
            } => {
                assert_eq!(session, "abc123");
                assert!(!json);
                assert_eq!(context, 3);
                assert!(!apply && !dry_run && !force);
                assert!(threshold.is_none());
                assert!(output.is_none());
            }
            _ => panic!("expected diff command"),
        }
    }

    #[test]
    fn diff_command_respects_overrides() {
        let cli = Cli::parse_from([
            "canvas",
            "diff",
            "ses-1",
            "--json",
            "--context",
            "5",
            "--apply",
            "--dry-run",
            "--force",
            "--threshold",
            "0.8",
            "--root",
            "web",
            "--config",
            "canvas.toml",
        ]);

        assert_eq!(cli.root.as_deref(), Some(std::path::Path::new("web")));
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("canvas.toml")));
        match cli.command {
            Commands::Diff {
                json,
                context,
                apply,
                dry_run,
                force,
                threshold,
                ..
            } => {
                assert!(json && apply && dry_run && force);
                assert_eq!(context, 5);
                assert_eq!(threshold, Some(0.8));
            }
            _ => panic!("expected diff command with overrides"),
        }
    }

    #[test]
    fn dry_run_requires_apply() {
        assert!(Cli::try_parse_from(["canvas", "diff", "x", "--dry-run"]).is_err());
        assert!(Cli::try_parse_from(["canvas", "diff", "x", "--force"]).is_err());
    }

    #[test]
    fn locate_collects_classes() {
        let cli = Cli::parse_from([
            "canvas",
            "--verbose",
            "locate",
            "--tag",
            "button",
            "--class",
            "cta,primary",
            "--class",
            "wide",
            "--format",
            "pretty",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Locate {
                tag,
                classes,
                selector,
                limit,
                format,
                ..
            } => {
                assert_eq!(tag.as_deref(), Some("button"));
                assert_eq!(classes, vec!["cta", "primary", "wide"]);
                assert!(selector.is_none());
                assert_eq!(limit, 10);
                assert_eq!(format, OutputFormat::Pretty);
            }
            _ => panic!("expected locate command"),
        }
    }

    #[test]
    fn sessions_defaults_to_pretty() {
        let cli = Cli::parse_from(["canvas", "sessions"]);
        match cli.command {
            Commands::Sessions { format, output } => {
                assert_eq!(format, OutputFormat::Pretty);
                assert!(output.is_none());
            }
            _ => panic!("expected sessions command"),
        }
    }
}
