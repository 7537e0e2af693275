use super::*;

// =============================================================================
// collapse_returns
// =============================================================================

#[test]
fn collapse_returns_keeps_plain_line() {
    assert_eq!(collapse_returns("[12:00:00 INFO]: Done"), "[12:00:00 INFO]: Done");
}

#[test]
fn collapse_returns_strips_one_leading_return() {
    assert_eq!(collapse_returns("\rloading"), "loading");
}

#[test]
fn collapse_returns_strips_one_trailing_return() {
    assert_eq!(collapse_returns("loading\r"), "loading");
}

#[test]
fn collapse_returns_keeps_last_segment_before_trailing_return() {
    assert_eq!(collapse_returns("abc\rdef\r"), "def");
}

#[test]
fn collapse_returns_prefers_leading_over_trailing() {
    // Leading \r removed, trailing one is then the last redraw marker.
    assert_eq!(collapse_returns("\rabc\r"), "");
}

#[test]
fn collapse_returns_keeps_text_after_last_redraw() {
    assert_eq!(collapse_returns("10%\r50%\r100%"), "100%");
}

// =============================================================================
// strip_ansi / parse_line
// =============================================================================

#[test]
fn strip_ansi_removes_color_codes() {
    assert_eq!(strip_ansi("\u{1b}[32mgreen\u{1b}[0m text"), "green text");
}

#[test]
fn strip_ansi_removes_osc_sequences() {
    assert_eq!(strip_ansi("\u{1b}]0;title\u{7}after"), "after");
}

#[test]
fn strip_ansi_leaves_plain_text() {
    assert_eq!(strip_ansi("no escapes [here]"), "no escapes [here]");
}

#[test]
fn parse_line_keeps_raw_and_cleans_display() {
    let line = parse_line("\u{1b}[33m[Server] hello\u{1b}[0m\r");
    assert_eq!(line.raw_line, "\u{1b}[33m[Server] hello\u{1b}[0m\r");
    assert_eq!(line.line, "[Server] hello");
}

#[test]
fn parse_line_collapses_before_stripping() {
    let line = parse_line("\u{1b}[1mPreparing 10%\r\u{1b}[1mPreparing 90%");
    assert_eq!(line.line, "Preparing 90%");
}
