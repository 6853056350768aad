//! EXEC block framing.
//!
//! `EXEC SQL` / `EXEC CICS` blocks carry foreign text the COBOL grammar
//! cannot tokenize line by line. After directive expansion, every block is
//! collapsed onto the line it starts on, with the embedded text joined by
//! single spaces, so the parser sees one statement-shaped run from `EXEC`
//! to `END-EXEC` and can stash the payload verbatim. Consumed lines leave
//! blanks behind to keep line numbers stable.

use crate::error::{AsgError, Result};
use crate::span::Location;

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | ':' | '_' | '$' | '#' | '@')
}

/// Find a standalone word outside any COBOL literal.
fn find_word(line: &str, word: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut pos = 0;
    let mut in_literal: Option<u8> = None;

    while pos < bytes.len() {
        let ch = bytes[pos];
        if let Some(quote) = in_literal {
            if ch == quote {
                if bytes.get(pos + 1) == Some(&quote) {
                    pos += 1;
                } else {
                    in_literal = None;
                }
            }
            pos += 1;
            continue;
        }
        if ch == b'\'' || ch == b'"' {
            in_literal = Some(ch);
            pos += 1;
            continue;
        }
        if is_word_char(ch as char) {
            let start = pos;
            while pos < bytes.len() && is_word_char(bytes[pos] as char) {
                pos += 1;
            }
            if line[start..pos].eq_ignore_ascii_case(word) {
                return Some(start);
            }
            continue;
        }
        pos += 1;
    }

    None
}

/// Whether a line contains `END-EXEC` as a standalone word.
///
/// The embedded text is not COBOL, so no literal tracking: a terminator
/// inside an embedded string would confuse any line-based scan equally.
fn contains_end_exec(line: &str) -> bool {
    let upper = line.to_ascii_uppercase();
    let mut from = 0;
    while let Some(found) = upper[from..].find("END-EXEC") {
        let at = from + found;
        let before_ok = at == 0
            || !is_word_char(upper[..at].chars().last().unwrap_or(' '));
        let after = upper[at + "END-EXEC".len()..].chars().next();
        let after_ok = after.map_or(true, |c| !is_word_char(c));
        if before_ok && after_ok {
            return true;
        }
        from = at + 1;
    }
    false
}

/// Collapse every multi-line EXEC block onto its first line.
pub fn collapse_exec_blocks(lines: &[String], origin: &str) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        let start = match find_word(line, "EXEC") {
            Some(s) => s,
            None => {
                out.push(line.clone());
                i += 1;
                continue;
            }
        };

        if contains_end_exec(&line[start..]) {
            out.push(line.clone());
            i += 1;
            continue;
        }

        let mut joined = line.trim_end().to_string();
        let mut k = i + 1;
        loop {
            if k >= lines.len() {
                return Err(AsgError::PreprocessorSyntax {
                    message: "EXEC block is not terminated by END-EXEC".to_string(),
                    location: Location::new(origin, (i + 1) as u32, start as u32 + 1),
                });
            }
            let next = lines[k].trim();
            if !next.is_empty() {
                joined.push(' ');
                joined.push_str(next);
            }
            if contains_end_exec(&lines[k]) {
                break;
            }
            k += 1;
        }

        out.push(joined);
        for _ in i + 1..=k {
            out.push(String::new());
        }
        i = k + 1;
    }

    Ok(out)
}
