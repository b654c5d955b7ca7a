use canvas_lib::CanvasError;

#[test]
fn config_error_display_includes_message() {
    let err = CanvasError::Config("missing extensions".to_string());

    assert_eq!(format!("{}", err), "Configuration error: missing extensions");
}

#[test]
fn io_error_display_wraps_source() {
    let io_err = std::io::Error::other("disk full");
    let err: CanvasError = io_err.into();
    let rendered = format!("{}", err);

    assert!(rendered.starts_with("IO error: "));
    assert!(rendered.contains("disk full"));
}

#[test]
fn session_not_found_display_names_the_id() {
    let err = CanvasError::session_not_found("abc", vec!["ses-1".into()]);

    assert_eq!(format!("{}", err), "Session not found: abc");
}

#[test]
fn invalid_session_helper_includes_message() {
    let err = CanvasError::invalid_session("ses-1", "missing events");

    assert_eq!(format!("{}", err), "Invalid session ses-1: missing events");
}

#[test]
fn serialization_error_converts() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: CanvasError = json_err.into();

    assert!(format!("{}", err).starts_with("Serialization error: "));
}

#[test]
fn apply_blocked_display_uses_message() {
    let err = CanvasError::ApplyBlocked("no applicable changes".to_string());

    assert_eq!(format!("{}", err), "Apply blocked: no applicable changes");
}
