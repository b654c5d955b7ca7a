use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use canvas_lib::output::CANVAS_OUTPUT_VERSION;
use canvas_lib::{CanvasError, CanvasOutput, ErrorOutput};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &CanvasOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the failure exit code.
pub fn render_error(err: CanvasError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = CanvasOutput::Error(ErrorOutput {
        version: CANVAS_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            // Errors go to stderr so a piped patch never contains them.
            let colorize = output.is_none() && io::stderr().is_terminal();
            eprint!("{}", format_pretty(&payload, colorize));
        }
    };

    exit_code(false)
}

/// Write JSON output to file or stdout.
fn write_json_output(body: &CanvasOutput, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write human-readable output to file or stdout; colors only on a tty.
fn write_pretty_output(body: &CanvasOutput, output: Option<&Path>) -> io::Result<()> {
    let colorize = output.is_none() && io::stdout().is_terminal();
    let content = format_pretty(body, colorize);
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        print!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &CanvasOutput, colorize: bool) -> String {
    let mut buf = String::new();
    match body {
        CanvasOutput::Sessions(out) => {
            let header = color("[SESSIONS]", "36", colorize);
            writeln!(buf, "{} {} in {}", header, out.sessions.len(), out.root.display()).ok();
            if out.sessions.is_empty() {
                writeln!(buf, "No sessions recorded yet.").ok();
            }
            for s in &out.sessions {
                let save = if s.has_save_request { "saved" } else { "raw" };
                writeln!(
                    buf,
                    "- {:24} {:5} {:>3} sel {:>3} edits  {}",
                    s.id,
                    save,
                    s.selections,
                    s.edits,
                    s.host.as_deref().unwrap_or(&s.url)
                )
                .ok();
            }
        }
        CanvasOutput::Diff(out) => {
            let header = color("[DIFF]", "36", colorize);
            writeln!(
                buf,
                "{} {} ({} change(s), {} file(s))",
                header,
                out.session_id,
                out.change_count,
                out.result.file_diffs.len()
            )
            .ok();
            for file in &out.result.file_diffs {
                let conf = format_confidence(file.confidence, colorize);
                writeln!(buf, "- {} {}", file.file_path.display(), conf).ok();
                for change in &file.changes {
                    writeln!(buf, "    line {:<5} {}", change.line, change.description).ok();
                }
            }
            write_problems(&mut buf, &out.result, colorize);
        }
        CanvasOutput::Apply(out) => {
            let report = &out.report;
            let (status, code) = if report.success {
                ("APPLIED", "32")
            } else if report.blocked() {
                ("BLOCKED", "31")
            } else {
                ("FAILED", "31")
            };
            let verb = if report.dry_run { "would write" } else { "wrote" };
            let count = if report.dry_run {
                report.planned.len()
            } else {
                report.applied
            };
            writeln!(
                buf,
                "{} {} {} {} file(s)",
                color(status, code, colorize),
                report.session_id,
                verb,
                count
            )
            .ok();
            for path in &report.planned {
                writeln!(buf, "- {}", path.display()).ok();
            }
            if !report.low_confidence.is_empty() {
                writeln!(
                    buf,
                    "Below confidence threshold {:.2}{}:",
                    report.threshold,
                    if report.forced { " (forced)" } else { "" }
                )
                .ok();
                for file in &report.low_confidence {
                    writeln!(
                        buf,
                        "- {} {}",
                        file.file_path.display(),
                        format_confidence(file.confidence, colorize)
                    )
                    .ok();
                }
            }
            for failure in &report.failures {
                writeln!(buf, "Write failed: {} ({})", failure.file_path.display(), failure.message).ok();
            }
            write_problems(&mut buf, &report.diff, colorize);
        }
        CanvasOutput::Locate(out) => {
            let header = color("[LOCATE]", "34", colorize);
            writeln!(buf, "{} {} candidate(s)", header, out.candidates.len()).ok();
            for c in &out.candidates {
                writeln!(
                    buf,
                    "- {}:{}:{} {}  {}",
                    c.file_path.display(),
                    c.line,
                    c.column,
                    format_confidence(c.confidence, colorize),
                    c.reasons.join("; ")
                )
                .ok();
            }
            if let Some(component) = &out.component {
                writeln!(
                    buf,
                    "Component: {} ({:?}, line {})",
                    component.name, component.framework, component.line
                )
                .ok();
            }
        }
        CanvasOutput::Error(out) => {
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
        }
    }
    buf
}

/// Unmapped changes, warnings and suggestions of a diff run.
pub fn write_problems(buf: &mut String, result: &canvas_lib::DiffResult, colorize: bool) {
    if !result.unmapped_changes.is_empty() {
        writeln!(buf, "{}", color("Unmapped (no source location found):", "31", colorize)).ok();
        for change in &result.unmapped_changes {
            writeln!(buf, "- {} [{}] {}", change.selector, change.kind, change.description).ok();
        }
    }
    if !result.warnings.is_empty() {
        writeln!(buf, "{}", color("Warnings:", "33", colorize)).ok();
        for warning in &result.warnings {
            writeln!(buf, "- {warning}").ok();
        }
    }
    if !result.suggestions.is_empty() {
        writeln!(buf, "Suggestions:").ok();
        for s in &result.suggestions {
            let target = match (&s.class_name, &s.token) {
                (Some(class), Some(token)) => format!("{class} or {token}"),
                (Some(class), None) => class.clone(),
                (None, Some(token)) => token.clone(),
                (None, None) => continue,
            };
            writeln!(
                buf,
                "- {} {}: {} -> {} ({})",
                s.selector, s.property, s.value, target, s.reason
            )
            .ok();
        }
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

fn format_confidence(confidence: f64, colorize: bool) -> String {
    let code = if confidence >= 0.9 {
        "32" // green
    } else if confidence >= 0.7 {
        "33" // yellow
    } else {
        "31" // red
    };
    color(&format!("{:.2}", confidence), code, colorize)
}

/// Exit code for a finished command.
pub fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
