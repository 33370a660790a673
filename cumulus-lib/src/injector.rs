//! Contains the logic for replacing a line range of a receiver with injected lines.

use crate::error::{CumulusError, Result};
use crate::formatter::LITERAL_SUFFIX;
use std::fmt;

/// A 1-indexed, inclusive range of receiver lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    start: usize,
    end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start == 0 {
            return Err(invalid_range(start, end, "line numbers start at 1"));
        }
        if start > end {
            return Err(invalid_range(start, end, "start is after end"));
        }
        Ok(Self { start, end })
    }

    /// Builds a range from the raw `<START>` and `<END>` command-line arguments.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_line_number("start", start)?, parse_line_number("end", end)?)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of receiver lines the range removes.
    pub fn removed_lines(&self) -> usize {
        self.end - self.start + 1
    }

    /// Fails unless the range lies within a receiver of `line_count` lines.
    pub fn check_within(&self, line_count: usize) -> Result<()> {
        if self.end > line_count {
            return Err(invalid_range(
                self.start,
                self.end,
                &format!("the receiver has only {line_count} lines"),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.start, self.end)
    }
}

fn parse_line_number(name: &'static str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| CumulusError::InvalidLineNumber {
            name,
            value: value.to_owned(),
        })
}

fn invalid_range(start: usize, end: usize, reason: &str) -> CumulusError {
    CumulusError::InvalidRange {
        start,
        end,
        reason: reason.to_owned(),
    }
}

/// What happens to the last injected line before it is spliced in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TailPolicy {
    /// Rewrite a trailing `\n",` on the last injected line into a closing `"`,
    /// so the block can end a JSON array.
    #[default]
    CloseArray,
    /// Inject lines exactly as read.
    Verbatim,
}

impl TailPolicy {
    pub fn apply(self, lines: &mut [Vec<u8>]) {
        if self == TailPolicy::CloseArray {
            close_array_tail(lines);
        }
    }
}

/// Turns the last literal `"...\n",` into `"..."`. Interior literals keep their commas.
///
/// Lines that do not end with a formatted-literal suffix are left untouched.
pub fn close_array_tail(lines: &mut [Vec<u8>]) {
    if let Some(last) = lines.last_mut() {
        if last.ends_with(LITERAL_SUFFIX.as_bytes()) {
            last.truncate(last.len() - LITERAL_SUFFIX.len());
            last.push(b'"');
        }
    }
}

/// Replaces `range` of `receiver` with `inject`.
///
/// The result is `receiver[..start - 1] ++ inject ++ receiver[end..]`; lines
/// outside the range keep their content and order.
pub fn splice_lines<T>(mut receiver: Vec<T>, range: LineRange, inject: Vec<T>) -> Result<Vec<T>> {
    range.check_within(receiver.len())?;
    receiver.splice(range.start - 1..range.end, inject);
    Ok(receiver)
}
