//! Token-level replacement for COPY REPLACING and REPLACE.
//!
//! A replacement phrase maps a pattern (pseudo-text token sequence, single
//! COBOL word, or literal) to raw replacement text. Matching is token-based
//! after whitespace normalization: words compare case-insensitively,
//! literals compare exactly (quotes included), punctuation must match
//! verbatim. A pattern never crosses a statement-terminator period unless
//! the pattern itself contains one, which falls out of the tokenization (a
//! period is its own token). Phrases are tried in declared order and the
//! first match at a position wins; matching consumes and advances, so a
//! replacement never overlaps itself.
//!
//! Single-token patterns whose first or last character is not alphanumeric
//! (`:TAG:`, `DEBUG-`) additionally match *inside* a word, the partial-word
//! convention copybooks rely on for prefix stamping.

/// One `pattern BY replacement` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacePhrase {
    /// Raw pattern text: pseudo-text content, a word, or a quoted literal.
    pub pattern: String,
    /// Raw text spliced in place of each match. Empty deletes.
    pub replacement: String,
}

impl ReplacePhrase {
    /// Create a phrase.
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Classification of a source token for matching purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawKind {
    Word,
    Literal,
    Punct,
}

/// A token with its byte range in the original line.
#[derive(Debug, Clone)]
struct RawToken {
    kind: RawKind,
    start: usize,
    end: usize,
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | ':' | '_' | '$' | '#' | '@')
}

/// Tokenize a line of normalized COBOL text.
///
/// Literals keep their quotes and honor the doubled-quote escape. Anything
/// that is neither a word nor a literal is a single-character punctuation
/// token.
fn tokenize(line: &str) -> Vec<RawToken> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let ch = bytes[pos] as char;

        if ch == ' ' || ch == '\t' {
            pos += 1;
            continue;
        }

        let start = pos;
        if ch == '\'' || ch == '"' {
            let quote = bytes[pos];
            pos += 1;
            while pos < bytes.len() {
                if bytes[pos] == quote {
                    if pos + 1 < bytes.len() && bytes[pos + 1] == quote {
                        pos += 2;
                        continue;
                    }
                    pos += 1;
                    break;
                }
                pos += 1;
            }
            tokens.push(RawToken {
                kind: RawKind::Literal,
                start,
                end: pos,
            });
        } else if is_word_char(ch) {
            while pos < bytes.len() && is_word_char(bytes[pos] as char) {
                pos += 1;
            }
            tokens.push(RawToken {
                kind: RawKind::Word,
                start,
                end: pos,
            });
        } else {
            pos += 1;
            tokens.push(RawToken {
                kind: RawKind::Punct,
                start,
                end: pos,
            });
        }
    }

    tokens
}

fn text<'a>(line: &'a str, tok: &RawToken) -> &'a str {
    &line[tok.start..tok.end]
}

/// Whether a single-token pattern may match inside a word.
fn partial_word_eligible(pattern: &str) -> bool {
    let first = pattern.chars().next();
    let last = pattern.chars().last();
    match (first, last) {
        (Some(f), Some(l)) => !f.is_ascii_alphanumeric() || !l.is_ascii_alphanumeric(),
        _ => false,
    }
}

/// Replace every case-insensitive occurrence of `needle` inside `haystack`.
fn replace_within_word(haystack: &str, needle: &str, replacement: &str) -> Option<String> {
    let hay_upper = haystack.to_ascii_uppercase();
    let needle_upper = needle.to_ascii_uppercase();
    if needle_upper.is_empty() || !hay_upper.contains(&needle_upper) {
        return None;
    }

    let mut out = String::with_capacity(haystack.len());
    let mut pos = 0;
    while pos < haystack.len() {
        if let Some(found) = hay_upper[pos..].find(&needle_upper) {
            let at = pos + found;
            out.push_str(&haystack[pos..at]);
            out.push_str(replacement);
            pos = at + needle.len();
        } else {
            out.push_str(&haystack[pos..]);
            break;
        }
    }
    Some(out)
}

/// Try to match a pattern token sequence at `tokens[at..]`.
fn sequence_matches(line: &str, tokens: &[RawToken], at: usize, pattern: &str) -> Option<usize> {
    let ptoks = tokenize(pattern);
    if ptoks.is_empty() || at + ptoks.len() > tokens.len() {
        return None;
    }

    for (i, ptok) in ptoks.iter().enumerate() {
        let stok = &tokens[at + i];
        let ptext = text(pattern, ptok);
        let stext = text(line, stok);
        let ok = match ptok.kind {
            RawKind::Word => stok.kind == RawKind::Word && ptext.eq_ignore_ascii_case(stext),
            RawKind::Literal => stok.kind == RawKind::Literal && ptext == stext,
            RawKind::Punct => stok.kind == RawKind::Punct && ptext == stext,
        };
        if !ok {
            return None;
        }
    }

    Some(ptoks.len())
}

/// Apply replacement phrases to one logical line.
///
/// Text between tokens (spacing) is preserved verbatim outside matches.
pub fn apply_phrases(line: &str, phrases: &[ReplacePhrase]) -> String {
    if phrases.is_empty() {
        return line.to_string();
    }

    let tokens = tokenize(line);
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    let mut i = 0;

    while i < tokens.len() {
        let mut matched: Option<(usize, String)> = None;

        for phrase in phrases {
            if phrase.pattern.trim().is_empty() {
                continue;
            }
            if let Some(consumed) = sequence_matches(line, &tokens, i, &phrase.pattern) {
                matched = Some((consumed, phrase.replacement.clone()));
                break;
            }
            let ptoks = tokenize(&phrase.pattern);
            if ptoks.len() == 1
                && tokens[i].kind == RawKind::Word
                && partial_word_eligible(phrase.pattern.trim())
            {
                let ptext = text(&phrase.pattern, &ptoks[0]);
                if let Some(rewritten) =
                    replace_within_word(text(line, &tokens[i]), ptext, &phrase.replacement)
                {
                    matched = Some((1, rewritten));
                    break;
                }
            }
        }

        out.push_str(&line[cursor..tokens[i].start]);
        match matched {
            Some((consumed, replacement)) => {
                out.push_str(&replacement);
                cursor = tokens[i + consumed - 1].end;
                i += consumed;
            }
            None => {
                out.push_str(text(line, &tokens[i]));
                cursor = tokens[i].end;
                i += 1;
            }
        }
    }

    out.push_str(&line[cursor..]);
    out
}
