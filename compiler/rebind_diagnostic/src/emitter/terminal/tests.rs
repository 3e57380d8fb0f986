use super::*;
use crate::{ErrorCode, SourceLocation};
use rebind_ir::Span;

fn sample_diagnostic() -> Diagnostic {
    Diagnostic::error(ErrorCode::E2003)
        .with_message("macro `NNG_FLAG_BIG` does not fit in `int`")
        .with_location(SourceLocation::new("nng/nng.h", 40, 9))
        .with_label(Span::new(10, 15), "value 4294967296")
        .with_note("retyped by rule `NNG_FLAG_.*`")
        .with_suggestion("retype the macro as `long long`")
}

fn render(mode: ColorMode, f: impl FnOnce(&mut TerminalEmitter<&mut Vec<u8>>)) -> String {
    let mut output = Vec::new();
    let mut emitter = TerminalEmitter::with_color_mode(&mut output, mode, false);
    f(&mut emitter);
    emitter.flush();
    String::from_utf8(output).unwrap()
}

#[test]
fn test_terminal_emitter_no_color() {
    let text = render(ColorMode::Never, |e| e.emit(&sample_diagnostic()));
    assert!(text.starts_with("error[E2003]: macro `NNG_FLAG_BIG`"));
    assert!(text.contains("  --> nng/nng.h:40:9\n"));
    assert!(text.contains("   | value 4294967296\n"));
    assert!(text.contains("= note: retyped by rule"));
    assert!(text.contains("= help: retype the macro"));
    assert!(!text.contains("\x1b["));
}

#[test]
fn test_terminal_emitter_with_color() {
    let text = render(ColorMode::Always, |e| e.emit(&sample_diagnostic()));
    assert!(text.contains("\x1b[1;31merror\x1b[0m"));
    assert!(text.contains("\x1b[1m[E2003]\x1b[0m: macro"));
    assert!(text.contains("\x1b[1;32mhelp\x1b[0m: retype"));
}

#[test]
fn test_auto_mode_follows_tty() {
    assert!(ColorMode::Auto.should_use_colors(true));
    assert!(!ColorMode::Auto.should_use_colors(false));
    assert_eq!("never".parse::<ColorMode>(), Ok(ColorMode::Never));
    assert!("sometimes".parse::<ColorMode>().is_err());
}

#[test]
fn test_summary_errors_and_warnings() {
    let text = render(ColorMode::Never, |e| e.emit_summary(2, 1));
    assert_eq!(text, "error: generation failed with 2 errors and 1 warning\n");
}

#[test]
fn test_summary_warnings_only() {
    let text = render(ColorMode::Never, |e| e.emit_summary(0, 3));
    assert_eq!(text, "warning: 3 warnings\n");
}

#[test]
fn test_summary_single_error() {
    let text = render(ColorMode::Never, |e| e.emit_summary(1, 0));
    assert_eq!(text, "error: generation failed with 1 error\n");
}

#[test]
fn test_summary_clean_run_is_silent() {
    let text = render(ColorMode::Never, |e| e.emit_summary(0, 0));
    assert_eq!(text, "");
}

#[test]
fn test_emit_all() {
    let diagnostics = vec![
        Diagnostic::error(ErrorCode::E1001).with_message("error 1"),
        Diagnostic::warning(ErrorCode::W1001).with_message("warning 1"),
    ];
    let text = render(ColorMode::Never, |e| e.emit_all(&diagnostics));
    assert!(text.contains("error[E1001]: error 1"));
    assert!(text.contains("warning[W1001]: warning 1"));
}

#[test]
fn test_stderr_constructor_needs_no_annotation() {
    let emitter = TerminalEmitter::stderr(ColorMode::Always, false);
    assert!(emitter.palette.colors);
    let emitter = TerminalEmitter::stderr(ColorMode::Never, true);
    assert!(!emitter.palette.colors);
}
