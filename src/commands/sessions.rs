use std::path::PathBuf;
use std::process::ExitCode;

use canvas_lib::output::{SessionsOutput, CANVAS_OUTPUT_VERSION};
use canvas_lib::session::SessionStore;
use canvas_lib::CanvasOutput;

use crate::cli::OutputFormat;
use crate::formatting::{exit_code, render_error, write_output};
use crate::settings::{load_config, log_effective_config, resolve_root};

/// Run the sessions command.
pub fn run_sessions(
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let root = match resolve_root(root.as_deref(), &config) {
        Ok(root) => root,
        Err(err) => return render_error(err, format, output),
    };
    log_effective_config(config_path.as_deref(), &root, &config);

    let store = SessionStore::new(config.sessions_root(&root));
    let sessions = match store.list() {
        Ok(sessions) => sessions,
        Err(err) => return render_error(err, format, output),
    };
    let body = CanvasOutput::Sessions(SessionsOutput {
        version: CANVAS_OUTPUT_VERSION.to_string(),
        root: store.root().to_path_buf(),
        sessions,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(canvas_lib::CanvasError::Unknown(err.to_string()), format, output);
    }
    exit_code(true)
}
