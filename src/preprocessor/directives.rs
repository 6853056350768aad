//! COPY and REPLACE directive scanning and expansion.
//!
//! The expander walks the normalized logical lines, copying ordinary text
//! through (with any active REPLACE phrases applied) and intercepting the
//! two directive kinds. Directives are collected to their terminating
//! period, which may sit several lines further down; literal quoting and
//! pseudo-text delimiters are respected while looking for it, so a period
//! inside `"..."` or `== ... ==` never ends a directive.
//!
//! COPY expansion recurses through the resolver, applies the REPLACING
//! phrases to the copybook's expansion, and splices the result. REPLACE
//! maintains the block-scoped active phrase set; the active set also covers
//! spliced copybook text, so `REPLACE X BY Y. COPY F.` and inlining F by
//! hand produce the same stream.

use tracing::debug;

use crate::error::{AsgError, Result};
use crate::preprocessor::copybook::CopybookResolver;
use crate::preprocessor::normalizer::{normalize, SourceFormat};
use crate::preprocessor::replacing::{apply_phrases, ReplacePhrase};
use crate::preprocessor::PreprocessorParams;
use crate::span::Location;
use crate::text::normalize_line_endings;

/// A parsed `COPY` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyDirective {
    /// Copybook name (quotes stripped when given as a literal).
    pub name: String,
    /// `OF`/`IN` library qualifier, currently informational.
    pub library: Option<String>,
    /// `REPLACING` phrases applied to the expansion.
    pub phrases: Vec<ReplacePhrase>,
}

/// A parsed `REPLACE` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceDirective {
    /// `REPLACE phrase...` — supersedes the previous active set.
    Set(Vec<ReplacePhrase>),
    /// `REPLACE OFF` — deactivates all phrases.
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Copy(CopyDirective),
    Replace(ReplaceDirective),
}

/// Expands directives over normalized lines.
#[derive(Debug)]
pub struct DirectiveExpander<'p> {
    params: &'p PreprocessorParams,
    resolver: CopybookResolver,
    active: Vec<ReplacePhrase>,
}

impl<'p> DirectiveExpander<'p> {
    /// Create an expander for one preprocessor invocation.
    pub fn new(params: &'p PreprocessorParams) -> Self {
        Self {
            resolver: CopybookResolver::new(
                params.copybook_dirs.clone(),
                params.copybook_extensions.clone(),
                params.max_copy_depth,
            ),
            params,
            active: Vec::new(),
        }
    }

    /// Expand all directives in the main source.
    pub fn expand(
        &mut self,
        lines: &[String],
        format: SourceFormat,
        origin: &str,
    ) -> Result<Vec<String>> {
        self.expand_level(lines, format, origin, true)
    }

    /// Expand one nesting level.
    ///
    /// Active REPLACE phrases are applied only at the top level (`top`), so
    /// a copybook's raw expansion stays cacheable and the caller controls
    /// the REPLACING-before-REPLACE ordering when splicing.
    fn expand_level(
        &mut self,
        lines: &[String],
        format: SourceFormat,
        origin: &str,
        top: bool,
    ) -> Result<Vec<String>> {
        let col_base = format.area_offset();
        let mut out: Vec<String> = Vec::new();
        let mut i = 0;
        let mut carry: Option<String> = None;

        while i < lines.len() || carry.is_some() {
            let line = match carry.take() {
                Some(c) => c,
                None => lines[i].clone(),
            };
            let line_no = (i + 1) as u32;

            let start = match find_directive(&line) {
                Some(s) => s,
                None => {
                    out.push(self.emit(&line, top));
                    i += 1;
                    continue;
                }
            };

            let location = Location::new(origin, line_no, start as u32 + col_base + 1);
            let rest = lines.get(i + 1..).unwrap_or(&[]);
            let (text, extra, end_col) = collect_directive(&line, start, rest, &location)?;
            let directive = parse_directive(&text, &location)?;

            // Text before the directive stands on its own line.
            let head = line[..start].trim_end();
            if head.is_empty() {
                out.push(String::new());
            } else {
                out.push(self.emit(head, top));
            }

            match directive {
                Directive::Replace(ReplaceDirective::Off) => {
                    self.active.clear();
                    for _ in 0..extra {
                        out.push(String::new());
                    }
                }
                Directive::Replace(ReplaceDirective::Set(phrases)) => {
                    debug!(count = phrases.len(), "activating REPLACE phrases");
                    self.active = phrases;
                    for _ in 0..extra {
                        out.push(String::new());
                    }
                }
                Directive::Copy(copy) => {
                    debug!(copybook = %copy.name, "expanding COPY");
                    let expansion = self.expand_copybook(&copy.name, format, &location)?;
                    for raw in expansion {
                        let spliced = apply_phrases(&raw, &copy.phrases);
                        out.push(self.emit(&spliced, top));
                    }
                }
            }

            let last = if extra == 0 { &line } else { &lines[i + extra] };
            let tail = last[end_col.min(last.len())..].trim_start();
            if tail.is_empty() {
                i += extra + 1;
            } else {
                carry = Some(tail.to_string());
                i += extra;
            }
        }

        Ok(out)
    }

    /// Pass an ordinary line through, applying active phrases at top level.
    fn emit(&self, line: &str, top: bool) -> String {
        if top && !self.active.is_empty() {
            apply_phrases(line, &self.active)
        } else {
            line.to_string()
        }
    }

    /// Resolve, load, and recursively expand one copybook.
    fn expand_copybook(
        &mut self,
        name: &str,
        format: SourceFormat,
        location: &Location,
    ) -> Result<Vec<String>> {
        self.resolver.push(name, location)?;

        let cached: Option<Vec<String>> = self.resolver.cached(name).map(|lines| lines.to_vec());
        let expanded = match cached {
            Some(lines) => lines,
            None => {
                let path = self.resolver.resolve(name, location)?;
                let raw = std::fs::read_to_string(&path).map_err(|e| AsgError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                let raw = normalize_line_endings(&raw);

                let cb_format = self
                    .params
                    .copybook_formats
                    .get(&name.to_ascii_lowercase())
                    .copied()
                    .unwrap_or(format);
                let cb_origin = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(name)
                    .to_string();

                let logical =
                    normalize(&raw, cb_format, self.params.debugging_mode, &cb_origin)?;
                let expanded = self.expand_level(&logical, cb_format, &cb_origin, false)?;
                self.resolver.insert_cache(name, expanded.clone());
                expanded
            }
        };

        self.resolver.pop();
        Ok(expanded)
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | ':' | '_' | '$' | '#' | '@')
}

/// Find the byte offset of the first standalone COPY or REPLACE word
/// outside any literal.
fn find_directive(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut pos = 0;
    let mut in_literal: Option<u8> = None;

    while pos < bytes.len() {
        let ch = bytes[pos];
        if let Some(quote) = in_literal {
            if ch == quote {
                if pos + 1 < bytes.len() && bytes[pos + 1] == quote {
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
            let word = &line[start..pos];
            if word.eq_ignore_ascii_case("COPY") || word.eq_ignore_ascii_case("REPLACE") {
                return Some(start);
            }
            continue;
        }
        pos += 1;
    }

    None
}

/// Collect directive text from its start to the terminating period.
///
/// Returns the text (lines joined by spaces), the number of extra lines
/// consumed, and the byte column just past the period in the final line.
fn collect_directive(
    first: &str,
    start: usize,
    rest: &[String],
    location: &Location,
) -> Result<(String, usize, usize)> {
    let mut text = String::new();
    let mut in_literal: Option<char> = None;
    let mut in_pseudo = false;

    let mut scan = |line: &str, from: usize, text: &mut String| -> Option<usize> {
        let chars: Vec<char> = line.chars().collect();
        let mut pos = from;
        while pos < chars.len() {
            let ch = chars[pos];
            text.push(ch);
            match in_literal {
                Some(q) => {
                    if ch == q {
                        if chars.get(pos + 1) == Some(&q) {
                            text.push(q);
                            pos += 1;
                        } else {
                            in_literal = None;
                        }
                    }
                }
                None => {
                    if ch == '\'' || ch == '"' {
                        in_literal = Some(ch);
                    } else if ch == '=' && chars.get(pos + 1) == Some(&'=') {
                        text.push('=');
                        pos += 1;
                        in_pseudo = !in_pseudo;
                    } else if ch == '.' && !in_pseudo {
                        return Some(pos + 1);
                    }
                }
            }
            pos += 1;
        }
        None
    };

    if let Some(end) = scan(first, start, &mut text) {
        return Ok((text, 0, byte_col(first, end)));
    }
    for (k, line) in rest.iter().enumerate() {
        text.push(' ');
        if let Some(end) = scan(line, 0, &mut text) {
            return Ok((text, k + 1, byte_col(line, end)));
        }
    }

    Err(AsgError::PreprocessorSyntax {
        message: "directive is not terminated by a period".to_string(),
        location: location.clone(),
    })
}

/// Convert a character index to a byte offset within a line.
fn byte_col(line: &str, char_idx: usize) -> usize {
    line.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(line.len())
}

/// Tokens of the directive sublanguage.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DirTok {
    Word(String),
    Literal(String),
    Pseudo(String),
    Period,
}

/// Tokenize collected directive text.
fn dir_tokens(text: &str, location: &Location) -> Result<Vec<DirTok>> {
    let chars: Vec<char> = text.chars().collect();
    let mut toks = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        if ch == ' ' || ch == '\t' {
            pos += 1;
            continue;
        }
        if ch == '=' && chars.get(pos + 1) == Some(&'=') {
            pos += 2;
            let start = pos;
            loop {
                if pos >= chars.len() {
                    return Err(AsgError::PreprocessorSyntax {
                        message: "unterminated pseudo-text (missing closing '==')".to_string(),
                        location: location.clone(),
                    });
                }
                if chars[pos] == '=' && chars.get(pos + 1) == Some(&'=') {
                    break;
                }
                pos += 1;
            }
            let content: String = chars[start..pos].iter().collect();
            toks.push(DirTok::Pseudo(content.trim().to_string()));
            pos += 2;
            continue;
        }
        if ch == '\'' || ch == '"' {
            let start = pos;
            pos += 1;
            loop {
                if pos >= chars.len() {
                    return Err(AsgError::PreprocessorSyntax {
                        message: "unterminated literal in directive".to_string(),
                        location: location.clone(),
                    });
                }
                if chars[pos] == ch {
                    if chars.get(pos + 1) == Some(&ch) {
                        pos += 2;
                        continue;
                    }
                    pos += 1;
                    break;
                }
                pos += 1;
            }
            toks.push(DirTok::Literal(chars[start..pos].iter().collect()));
            continue;
        }
        if ch == '.' {
            toks.push(DirTok::Period);
            pos += 1;
            continue;
        }
        if is_word_char(ch) {
            let start = pos;
            while pos < chars.len() && is_word_char(chars[pos]) {
                pos += 1;
            }
            toks.push(DirTok::Word(chars[start..pos].iter().collect()));
            continue;
        }
        return Err(AsgError::PreprocessorSyntax {
            message: format!("unexpected character '{ch}' in directive"),
            location: location.clone(),
        });
    }

    Ok(toks)
}

fn is_kw(tok: &DirTok, kw: &str) -> bool {
    matches!(tok, DirTok::Word(w) if w.eq_ignore_ascii_case(kw))
}

/// Raw pattern or replacement text for one side of a phrase.
fn operand_text(tok: &DirTok) -> Option<String> {
    match tok {
        DirTok::Word(w) => Some(w.clone()),
        DirTok::Literal(l) => Some(l.clone()),
        DirTok::Pseudo(p) => Some(p.clone()),
        DirTok::Period => None,
    }
}

/// Parse phrase pairs `pattern BY replacement ...` until the period.
fn parse_phrases(
    toks: &[DirTok],
    mut i: usize,
    location: &Location,
) -> Result<(Vec<ReplacePhrase>, usize)> {
    let mut phrases = Vec::new();

    while i < toks.len() && toks[i] != DirTok::Period {
        let pattern = operand_text(&toks[i]).ok_or_else(|| AsgError::PreprocessorSyntax {
            message: "expected a replacement pattern".to_string(),
            location: location.clone(),
        })?;
        i += 1;

        if i >= toks.len() || !is_kw(&toks[i], "BY") {
            return Err(AsgError::PreprocessorSyntax {
                message: "expected BY after replacement pattern".to_string(),
                location: location.clone(),
            });
        }
        i += 1;

        let replacement = toks
            .get(i)
            .and_then(operand_text)
            .ok_or_else(|| AsgError::PreprocessorSyntax {
                message: "expected replacement text after BY".to_string(),
                location: location.clone(),
            })?;
        i += 1;

        phrases.push(ReplacePhrase::new(pattern, replacement));
    }

    if phrases.is_empty() {
        return Err(AsgError::PreprocessorSyntax {
            message: "directive contains no replacement phrases".to_string(),
            location: location.clone(),
        });
    }

    Ok((phrases, i))
}

/// Parse a collected directive.
fn parse_directive(text: &str, location: &Location) -> Result<Directive> {
    let toks = dir_tokens(text, location)?;
    if toks.is_empty() {
        return Err(AsgError::PreprocessorSyntax {
            message: "empty directive".to_string(),
            location: location.clone(),
        });
    }

    if is_kw(&toks[0], "COPY") {
        let name = match toks.get(1) {
            Some(DirTok::Word(w)) => w.clone(),
            Some(DirTok::Literal(l)) => l.trim_matches(|c| c == '\'' || c == '"').to_string(),
            _ => {
                return Err(AsgError::PreprocessorSyntax {
                    message: "COPY is missing the copybook name".to_string(),
                    location: location.clone(),
                })
            }
        };
        let mut i = 2;

        let mut library = None;
        if toks.get(i).map(|t| is_kw(t, "OF") || is_kw(t, "IN")) == Some(true) {
            library = match toks.get(i + 1) {
                Some(DirTok::Word(w)) => Some(w.clone()),
                _ => {
                    return Err(AsgError::PreprocessorSyntax {
                        message: "expected a library name after OF/IN".to_string(),
                        location: location.clone(),
                    })
                }
            };
            i += 2;
        }

        let mut phrases = Vec::new();
        if toks.get(i).map(|t| is_kw(t, "REPLACING")) == Some(true) {
            let (parsed, next) = parse_phrases(&toks, i + 1, location)?;
            phrases = parsed;
            i = next;
        }

        if toks.get(i) != Some(&DirTok::Period) {
            return Err(AsgError::PreprocessorSyntax {
                message: "unexpected text in COPY directive".to_string(),
                location: location.clone(),
            });
        }

        return Ok(Directive::Copy(CopyDirective {
            name,
            library,
            phrases,
        }));
    }

    if is_kw(&toks[0], "REPLACE") {
        if toks.get(1).map(|t| is_kw(t, "OFF")) == Some(true) {
            return Ok(Directive::Replace(ReplaceDirective::Off));
        }
        let (phrases, i) = parse_phrases(&toks, 1, location)?;
        if toks.get(i) != Some(&DirTok::Period) {
            return Err(AsgError::PreprocessorSyntax {
                message: "unexpected text in REPLACE directive".to_string(),
                location: location.clone(),
            });
        }
        return Ok(Directive::Replace(ReplaceDirective::Set(phrases)));
    }

    Err(AsgError::PreprocessorSyntax {
        message: "expected COPY or REPLACE".to_string(),
        location: location.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location::new("t.cbl", 1, 8)
    }

    #[test]
    fn finds_directive_outside_literals() {
        assert_eq!(find_directive("COPY REC."), Some(0));
        assert_eq!(find_directive("    COPY REC."), Some(4));
        assert_eq!(find_directive("DISPLAY \"COPY REC\"."), None);
        assert_eq!(find_directive("MOVE COPY-FLAG TO X."), None);
        assert_eq!(find_directive("REPLACE OFF."), Some(0));
    }

    #[test]
    fn collects_single_line_directive() {
        let (text, extra, end) = collect_directive("COPY REC. MOVE A.", 0, &[], &loc()).unwrap();
        assert_eq!(text, "COPY REC.");
        assert_eq!(extra, 0);
        assert_eq!(&"COPY REC. MOVE A."[end..], " MOVE A.");
    }

    #[test]
    fn collects_across_lines() {
        let rest = vec!["BY ==WS==.".to_string()];
        let (text, extra, _) =
            collect_directive("REPLACE ==:P:==", 0, &rest, &loc()).unwrap();
        assert_eq!(text, "REPLACE ==:P:== BY ==WS==.");
        assert_eq!(extra, 1);
    }

    #[test]
    fn period_inside_pseudo_text_does_not_terminate() {
        let (text, _, _) =
            collect_directive("COPY R REPLACING ==A.B== BY ==C==.", 0, &[], &loc()).unwrap();
        assert!(text.ends_with("==C==."));
        assert!(text.contains("A.B"));
    }

    #[test]
    fn unterminated_directive_is_an_error() {
        let err = collect_directive("COPY REC", 0, &[], &loc()).unwrap_err();
        assert!(matches!(err, AsgError::PreprocessorSyntax { .. }));
    }

    #[test]
    fn parses_plain_copy() {
        let d = parse_directive("COPY CUSTREC.", &loc()).unwrap();
        assert_eq!(
            d,
            Directive::Copy(CopyDirective {
                name: "CUSTREC".to_string(),
                library: None,
                phrases: Vec::new(),
            })
        );
    }

    #[test]
    fn parses_copy_with_library_and_replacing() {
        let d = parse_directive(
            "COPY REC OF COPYLIB REPLACING ==:TAG:== BY CUST.",
            &loc(),
        )
        .unwrap();
        match d {
            Directive::Copy(copy) => {
                assert_eq!(copy.name, "REC");
                assert_eq!(copy.library.as_deref(), Some("COPYLIB"));
                assert_eq!(copy.phrases, vec![ReplacePhrase::new(":TAG:", "CUST")]);
            }
            other => panic!("unexpected directive: {other:?}"),
        }
    }

    #[test]
    fn parses_replace_set_and_off() {
        let set = parse_directive("REPLACE ==A== BY ==B== ==C== BY ==D==.", &loc()).unwrap();
        match set {
            Directive::Replace(ReplaceDirective::Set(phrases)) => {
                assert_eq!(phrases.len(), 2);
                assert_eq!(phrases[1], ReplacePhrase::new("C", "D"));
            }
            other => panic!("unexpected directive: {other:?}"),
        }

        let off = parse_directive("REPLACE OFF.", &loc()).unwrap();
        assert_eq!(off, Directive::Replace(ReplaceDirective::Off));
    }

    #[test]
    fn missing_by_is_a_syntax_error() {
        let err = parse_directive("REPLACE ==A== ==B==.", &loc()).unwrap_err();
        assert!(matches!(err, AsgError::PreprocessorSyntax { .. }));
    }

    #[test]
    fn empty_pseudo_text_deletes() {
        let d = parse_directive("REPLACE ==DEBUG-== BY ====.", &loc()).unwrap();
        match d {
            Directive::Replace(ReplaceDirective::Set(phrases)) => {
                assert_eq!(phrases[0].replacement, "");
            }
            other => panic!("unexpected directive: {other:?}"),
        }
    }
}
