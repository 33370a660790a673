//! Turns cloud-config lines into quoted, comma-terminated string literals.
//!
//! Every source line `L` becomes `"L\n",`, which is one element of a JSON
//! array of strings. Concatenating the decoded elements reconstructs the
//! original file.

use serde_json::Value as JsonValue;
use std::borrow::Cow;

/// Suffix closing every formatted literal: an escaped newline, the closing quote and a comma.
pub const LITERAL_SUFFIX: &str = "\\n\",";

/// How a source line is escaped before being wrapped in quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Escaping {
    /// Only `"` is escaped (as `\"`). Backslashes and control characters pass through.
    #[default]
    Quotes,
    /// Full JSON string escaping: quotes, backslashes and control characters.
    Json,
}

pub fn escape_line(line: &str, escaping: Escaping) -> Cow<'_, str> {
    match escaping {
        Escaping::Quotes => {
            if line.contains('"') {
                Cow::Owned(line.replace('"', "\\\""))
            } else {
                Cow::Borrowed(line)
            }
        }
        Escaping::Json => {
            let quoted = JsonValue::String(line.to_owned()).to_string();
            Cow::Owned(quoted[1..quoted.len() - 1].to_owned())
        }
    }
}

/// Renders one source line as a formatted literal.
pub fn format_line(line: &str, escaping: Escaping) -> String {
    format!("\"{}{LITERAL_SUFFIX}", escape_line(line, escaping))
}

pub fn format_lines<S: AsRef<str>>(lines: &[S], escaping: Escaping) -> Vec<String> {
    lines
        .iter()
        .map(|line| format_line(line.as_ref(), escaping))
        .collect()
}

/// Recovers the source line from a formatted literal.
///
/// Returns `None` when `literal` was not produced by [`format_line`] with the
/// same escaping.
pub fn unformat_line(literal: &str, escaping: Escaping) -> Option<String> {
    match escaping {
        Escaping::Quotes => {
            let body = literal.strip_prefix('"')?.strip_suffix(LITERAL_SUFFIX)?;
            Some(unescape_quotes(body))
        }
        Escaping::Json => {
            let quoted = literal.strip_suffix(',')?;
            let decoded: String = serde_json::from_str(quoted).ok()?;
            decoded.strip_suffix('\n').map(str::to_owned)
        }
    }
}

fn unescape_quotes(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'"') {
            chars.next();
            out.push('"');
        } else {
            out.push(c);
        }
    }
    out
}
