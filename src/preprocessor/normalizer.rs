//! Reference-format normalization.
//!
//! COBOL source arrives in one of three physical layouts; the normalizer
//! reduces all of them to a plain stream of logical lines before any
//! directive scanning happens:
//!
//! - **Fixed**: columns 1-6 sequence number, column 7 indicator, columns
//!   8-72 areas A and B, columns 73+ identification (discarded).
//! - **Variable**: like fixed but with no right margin.
//! - **Tandem**: column 1 indicator, everything after it is code.
//!
//! Comment lines (`*` or `/` indicator) are replaced by blank lines so the
//! physical line count, and with it every downstream line number, survives
//! normalization. Continuation lines (`-`) are folded into the previous
//! logical line, resuming inside an open literal when the previous line
//! ended mid-string. Debug lines (`D`) are comments unless debugging mode
//! is on.

use serde::{Deserialize, Serialize};

use crate::error::{AsgError, Result};
use crate::span::Location;

/// Physical layout of a COBOL source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceFormat {
    /// Fixed reference format (sequence, indicator, areas A/B, identification).
    #[default]
    Fixed,
    /// Fixed left margin, no right margin.
    Variable,
    /// Tandem format: indicator in column 1, code from column 2.
    Tandem,
}

impl SourceFormat {
    /// Number of columns stripped off the front of every line, used to map
    /// normalized-stream columns back to physical ones in diagnostics.
    pub fn area_offset(&self) -> u32 {
        match self {
            SourceFormat::Fixed | SourceFormat::Variable => 7,
            SourceFormat::Tandem => 1,
        }
    }
}

/// Column-7 (or column-1 for tandem) indicator values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Ordinary source line.
    Normal,
    /// Comment line, dropped from the logical stream.
    Comment,
    /// Continuation of the previous logical line.
    Continuation,
    /// Debugging line, included only in debugging mode.
    Debug,
}

impl Indicator {
    /// Classify an indicator character.
    pub fn from_char(ch: char) -> Self {
        match ch {
            '*' | '/' => Indicator::Comment,
            '-' => Indicator::Continuation,
            'D' | 'd' => Indicator::Debug,
            _ => Indicator::Normal,
        }
    }
}

/// Split one physical line into its indicator and code content.
fn split_line(line: &str, format: SourceFormat) -> (Indicator, String) {
    let chars: Vec<char> = line.chars().collect();

    let (indicator_col, content_start, content_end) = match format {
        SourceFormat::Fixed => (6, 7, 72),
        SourceFormat::Variable => (6, 7, usize::MAX),
        SourceFormat::Tandem => (0, 1, usize::MAX),
    };

    if chars.len() <= indicator_col {
        return (Indicator::Normal, String::new());
    }

    let indicator = Indicator::from_char(chars[indicator_col]);
    let end = chars.len().min(content_end);
    let content: String = if content_start < chars.len() {
        chars[content_start..end].iter().collect()
    } else {
        String::new()
    };

    (indicator, content)
}

/// Scan a logical line for an unterminated literal.
///
/// Returns the opening quote character when the line ends inside a string.
/// Doubled quotes inside a literal are the COBOL escape and do not close it.
fn open_literal(line: &str) -> Option<char> {
    let mut chars = line.chars().peekable();
    let mut open: Option<char> = None;

    while let Some(ch) = chars.next() {
        match open {
            None => {
                if ch == '\'' || ch == '"' {
                    open = Some(ch);
                }
            }
            Some(q) => {
                if ch == q {
                    if chars.peek() == Some(&q) {
                        chars.next();
                    } else {
                        open = None;
                    }
                }
            }
        }
    }

    open
}

/// Normalize raw source into logical lines.
///
/// The result has exactly one entry per physical line of input: comment and
/// continuation lines leave a blank entry behind so line numbers stay
/// stable. `origin` names the file for diagnostics.
pub fn normalize(
    text: &str,
    format: SourceFormat,
    debugging_mode: bool,
    origin: &str,
) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    let mut last_content: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let (indicator, content) = split_line(raw, format);
        let line_number = (idx + 1) as u32;

        match indicator {
            Indicator::Comment => out.push(String::new()),
            Indicator::Debug if !debugging_mode => out.push(String::new()),
            Indicator::Continuation => {
                let target = last_content.ok_or_else(|| AsgError::PreprocessorSyntax {
                    message: "continuation line has no preceding source line".to_string(),
                    location: Location::new(origin, line_number, 7),
                })?;

                match open_literal(&out[target]) {
                    Some(quote) => {
                        // Quote continuation: the literal resumes after the
                        // first quote character on the continuation line,
                        // everything beyond it is kept verbatim.
                        let resume =
                            content
                                .find(quote)
                                .ok_or_else(|| AsgError::PreprocessorSyntax {
                                    message: format!(
                                        "continuation of a literal must re-open it with {quote}"
                                    ),
                                    location: Location::new(origin, line_number, 8),
                                })?;
                        let tail = &content[resume + quote.len_utf8()..];
                        out[target].push_str(tail);
                    }
                    None => {
                        out[target].push_str(content.trim_start());
                    }
                }
                // Keep the physical line count stable.
                out.push(String::new());
            }
            Indicator::Normal | Indicator::Debug => {
                // Trailing spaces are significant when the line ends inside
                // an open literal: they belong to the string and must
                // survive into the continuation join.
                if open_literal(&content).is_some() {
                    out.push(content);
                } else {
                    out.push(content.trim_end().to_string());
                }
                last_content = Some(out.len() - 1);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(text: &str) -> Vec<String> {
        normalize(text, SourceFormat::Fixed, false, "test.cbl").unwrap()
    }

    #[test]
    fn fixed_strips_sequence_and_identification() {
        let lines = fixed(
            "000100 IDENTIFICATION DIVISION.                                        IDENT123",
        );
        assert_eq!(lines, vec!["IDENTIFICATION DIVISION."]);
    }

    #[test]
    fn comment_line_becomes_blank() {
        let lines = fixed("      * A COMMENT\n       DATA DIVISION.");
        assert_eq!(lines, vec!["", "DATA DIVISION."]);
    }

    #[test]
    fn slash_is_a_comment_too() {
        let lines = fixed("      / PAGE EJECT");
        assert_eq!(lines, vec![""]);
    }

    #[test]
    fn debug_line_dropped_without_debugging_mode() {
        let lines = fixed("      D    DISPLAY DEBUG-STATE.");
        assert_eq!(lines, vec![""]);
    }

    #[test]
    fn debug_line_kept_in_debugging_mode() {
        let lines =
            normalize("      D    DISPLAY X.", SourceFormat::Fixed, true, "t.cbl").unwrap();
        assert_eq!(lines, vec!["   DISPLAY X."]);
    }

    #[test]
    fn word_continuation_joins_without_space() {
        let lines = fixed("       MOVE LONG-NA\n      -    ME TO OUT.");
        assert_eq!(lines, vec!["MOVE LONG-NAME TO OUT.", ""]);
    }

    #[test]
    fn open_literal_keeps_trailing_spaces() {
        let lines = fixed("       DISPLAY \"HELLO   ");
        assert_eq!(lines, vec!["DISPLAY \"HELLO   "]);
    }

    #[test]
    fn literal_continuation_resumes_after_quote() {
        let lines = fixed("       DISPLAY \"HELLO \n      -    \"WORLD\".");
        assert_eq!(lines, vec!["DISPLAY \"HELLO WORLD\".", ""]);
    }

    #[test]
    fn literal_continuation_without_quote_is_an_error() {
        let err = normalize(
            "       DISPLAY \"HELLO \n      -    WORLD\".",
            SourceFormat::Fixed,
            false,
            "t.cbl",
        )
        .unwrap_err();
        assert!(matches!(err, AsgError::PreprocessorSyntax { .. }));
    }

    #[test]
    fn orphan_continuation_is_an_error() {
        let err = normalize("      -    ME.", SourceFormat::Fixed, false, "t.cbl").unwrap_err();
        assert!(matches!(err, AsgError::PreprocessorSyntax { .. }));
    }

    #[test]
    fn variable_format_has_no_right_margin() {
        let long = format!("       DISPLAY \"{}\".", "X".repeat(90));
        let lines = normalize(&long, SourceFormat::Variable, false, "t.cbl").unwrap();
        assert!(lines[0].len() > 72);
    }

    #[test]
    fn fixed_format_cuts_at_column_72() {
        let long = format!("       {}", "A".repeat(80));
        let lines = fixed(&long);
        // Columns 8-72 hold 65 characters; the rest is identification area.
        assert_eq!(lines[0].len(), 65);
    }

    #[test]
    fn tandem_indicator_in_column_one() {
        let lines = normalize(
            "*COMMENT LINE\n DISPLAY X.",
            SourceFormat::Tandem,
            false,
            "t.cbl",
        )
        .unwrap();
        assert_eq!(lines, vec!["", "DISPLAY X."]);
    }

    #[test]
    fn doubled_quote_does_not_close_literal() {
        assert_eq!(open_literal("DISPLAY \"A\"\"B\""), None);
        assert_eq!(open_literal("DISPLAY \"A\"\"B"), Some('"'));
        assert_eq!(open_literal("DISPLAY 'A'"), None);
        assert_eq!(open_literal("DISPLAY 'A"), Some('\''));
    }

    #[test]
    fn short_lines_survive() {
        let lines = fixed("\n   \n");
        assert_eq!(lines, vec!["", ""]);
    }
}
