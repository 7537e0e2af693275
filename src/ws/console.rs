//! Console stream payloads.
//!
//! Raw console output arrives one line per `line` frame and may contain
//! carriage-return progress redraws and ANSI escape sequences. [`parse_line`]
//! turns it into what a terminal would have left on screen.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::event::{ConsoleLine, StreamEvent};
use super::stream::{Link, StreamName};

pub(crate) const TYPE_LINE: &str = "line";
pub(crate) const TYPE_COMMAND: &str = "command";

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[\x1B\x{9B}][\[\]()#;?]*(?:(?:(?:[a-zA-Z\d]*(?:;[-a-zA-Z\d/#&.:=?%@~_]*)*)?\x07)|(?:(?:\d{1,4}(?:;\d{0,4})*)?[\dA-PR-TZcf-ntqry=><~]))",
    )
    .expect("invalid ANSI escape regex")
});

/// Keep only the text a terminal would show after carriage returns.
///
/// One leading `\r` is dropped, otherwise one trailing `\r` is dropped. Any
/// `\r` left means the line was redrawn, so only the part after the last one
/// survives.
#[must_use]
pub fn collapse_returns(line: &str) -> &str {
    let line = line.strip_prefix('\r').or_else(|| line.strip_suffix('\r')).unwrap_or(line);
    match line.rfind('\r') {
        Some(index) => &line[index + 1..],
        None => line,
    }
}

/// Remove ANSI escape sequences.
#[must_use]
pub fn strip_ansi(line: &str) -> String {
    ANSI_ESCAPE.replace_all(line, "").into_owned()
}

/// Build the display form of one raw console line.
#[must_use]
pub fn parse_line(raw_line: &str) -> ConsoleLine {
    ConsoleLine { raw_line: raw_line.to_owned(), line: strip_ansi(collapse_returns(raw_line)) }
}

pub(crate) fn on_data(kind: &str, data: Value, link: &Link<'_>) {
    if kind != TYPE_LINE {
        tracing::debug!(kind, "ws: console ignored frame");
        return;
    }
    let Value::String(raw_line) = &data else {
        tracing::warn!(kind, "ws: console line is not a string");
        return;
    };

    let line = parse_line(raw_line);
    let payload = serde_json::json!({ "rawLine": line.raw_line, "line": line.line });
    link.emit_payload(StreamName::Console, kind, StreamEvent::Line(line), payload);
}

#[cfg(test)]
#[path = "console_test.rs"]
mod tests;
