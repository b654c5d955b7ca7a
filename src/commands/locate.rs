use std::path::PathBuf;
use std::process::ExitCode;

use canvas_lib::component::component_at;
use canvas_lib::file_finder::{ElementQuery, SourceLocator};
use canvas_lib::output::{LocateOutput, CANVAS_OUTPUT_VERSION};
use canvas_lib::{CanvasError, CanvasOutput};

use crate::cli::OutputFormat;
use crate::formatting::{exit_code, render_error, write_output};
use crate::settings::{load_config, log_effective_config, resolve_root};

/// Arguments of the locate command.
#[derive(Debug, Clone, Default)]
pub struct LocateArgs {
    pub selector: Option<String>,
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub id: Option<String>,
    pub testid: Option<String>,
    pub text: Option<String>,
    pub limit: usize,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

impl LocateArgs {
    /// Selector hints first, explicit flags on top.
    pub fn query(&self) -> ElementQuery {
        let mut query = self
            .selector
            .as_deref()
            .map(ElementQuery::from_selector)
            .unwrap_or_default();
        if let Some(tag) = &self.tag {
            query.tag = Some(tag.to_ascii_lowercase());
        }
        if !self.classes.is_empty() {
            query.class_names = self.classes.clone();
        }
        if self.id.is_some() {
            query.element_id = self.id.clone();
        }
        if self.testid.is_some() {
            query.data_testid = self.testid.clone();
        }
        if self.text.is_some() {
            query.text = self.text.clone();
        }
        query
    }
}

/// Run the locate command.
pub fn run_locate(config_path: Option<PathBuf>, root: Option<PathBuf>, args: LocateArgs) -> ExitCode {
    let format = args.format;
    let output = args.output.clone();
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let root = match resolve_root(root.as_deref(), &config) {
        Ok(root) => root,
        Err(err) => return render_error(err, format, output),
    };
    log_effective_config(config_path.as_deref(), &root, &config);

    let query = args.query();
    if query.is_empty() {
        return render_error(
            CanvasError::Config(
                "locate needs at least one of --selector, --class, --id, --testid or --text"
                    .to_string(),
            ),
            format,
            output,
        );
    }

    let index = SourceLocator::new(&config).index(&root);
    let mut candidates = index.find(&query);
    let component = candidates.first().and_then(|top| {
        index
            .file(&top.file_path)
            .and_then(|file| component_at(&file.relative, &file.content, top.line, &query))
    });
    candidates.truncate(args.limit);
    let found = !candidates.is_empty();

    let body = CanvasOutput::Locate(LocateOutput {
        version: CANVAS_OUTPUT_VERSION.to_string(),
        root,
        query,
        candidates,
        component,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(CanvasError::Unknown(err.to_string()), format, output);
    }
    exit_code(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flags_override_selector_hints() {
        let args = LocateArgs {
            selector: Some("main > button.cta#buy".into()),
            tag: Some("A".into()),
            text: Some("Buy".into()),
            ..LocateArgs::default()
        };
        let query = args.query();
        assert_eq!(query.tag.as_deref(), Some("a"));
        assert_eq!(query.class_names, vec!["cta"]);
        assert_eq!(query.element_id.as_deref(), Some("buy"));
        assert_eq!(query.text.as_deref(), Some("Buy"));
    }

    #[test]
    fn bare_tag_is_an_empty_query() {
        let args = LocateArgs {
            tag: Some("div".into()),
            ..LocateArgs::default()
        };
        assert!(args.query().is_empty());
    }
}
