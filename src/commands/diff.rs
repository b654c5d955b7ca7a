use std::path::PathBuf;
use std::process::ExitCode;

use canvas_lib::apply::{ApplyOptions, Orchestrator};
use canvas_lib::output::{ApplyOutput, DiffOutput, CANVAS_OUTPUT_VERSION};
use canvas_lib::{CanvasError, CanvasOutput};
use tracing::debug;

use crate::cli::OutputFormat;
use crate::formatting::{exit_code, format_pretty, render_error, write_output};
use crate::settings::{
    load_config, log_effective_config, resolve_diff_settings, resolve_root, DiffFlagSources,
};

/// Arguments of the diff command.
#[derive(Debug, Clone)]
pub struct DiffArgs {
    pub session: String,
    pub json: bool,
    pub context: usize,
    pub apply: bool,
    pub dry_run: bool,
    pub force: bool,
    pub threshold: Option<f64>,
    pub output: Option<PathBuf>,
}

/// Run the diff command: preview by default, write files with `--apply`.
pub fn run_diff(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    args: DiffArgs,
) -> ExitCode {
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Pretty
    };
    let output = args.output.clone();

    let mut config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let flags = DiffFlagSources::from_args(raw_args);
    let settings = match resolve_diff_settings(args.context, args.threshold, &config, &flags) {
        Ok(settings) => settings,
        Err(err) => return render_error(err, format, output),
    };
    config.confidence_threshold = settings.threshold;
    let root = match resolve_root(root.as_deref(), &config) {
        Ok(root) => root,
        Err(err) => return render_error(err, format, output),
    };
    log_effective_config(config_path.as_deref(), &root, &config);

    let orchestrator = Orchestrator::new(&config, &root);

    if args.apply {
        let options = ApplyOptions {
            dry_run: args.dry_run,
            force: args.force,
        };
        let report = match orchestrator.apply(&args.session, options) {
            Ok(report) => report,
            Err(err) => return render_error(err, format, output),
        };
        let unmapped = report.diff.has_unmapped();
        let check = report.check();
        let body = CanvasOutput::Apply(ApplyOutput {
            version: CANVAS_OUTPUT_VERSION.to_string(),
            report,
        });
        if let Err(err) = write_output(&body, format, output.clone()) {
            return render_error(CanvasError::Unknown(err.to_string()), format, output);
        }
        return match check {
            Err(err) if format == OutputFormat::Pretty => render_error(err, format, None),
            Err(err) => {
                debug!(error = %err, "apply did not succeed");
                exit_code(false)
            }
            Ok(()) => exit_code(!unmapped),
        };
    }

    let (manifest, result) = match orchestrator.preview(&args.session) {
        Ok(preview) => preview,
        Err(err) => return render_error(err, format, output),
    };
    let success = !result.has_unmapped();
    let patch = result.patch(settings.context);
    let body = CanvasOutput::Diff(DiffOutput {
        version: CANVAS_OUTPUT_VERSION.to_string(),
        session_id: manifest.session_id.clone(),
        url: manifest.url.clone(),
        source: manifest.source,
        change_count: manifest.change_count(),
        patch: patch.clone(),
        result,
    });

    if args.json {
        if let Err(err) = write_output(&body, format, output.clone()) {
            return render_error(CanvasError::Unknown(err.to_string()), format, output);
        }
        return exit_code(success);
    }

    // Plain mode: the patch on stdout (or the output file), the summary on stderr.
    let written = match &output {
        Some(path) => std::fs::write(path, &patch),
        None => {
            print!("{patch}");
            Ok(())
        }
    };
    if let Err(err) = written {
        return render_error(CanvasError::Io(err), format, None);
    }
    eprint!("{}", format_pretty(&body, false));
    exit_code(success)
}
