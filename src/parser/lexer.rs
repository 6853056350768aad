//! Scanner for preprocessed COBOL text.
//!
//! Runs after the preprocessor, so the input is free of sequence numbers,
//! indicators, comments, and multi-line EXEC blocks. Commas and semicolons
//! are separator noise in COBOL and are skipped like whitespace. PICTURE
//! character strings get their own scanning mode: they may contain
//! parentheses and embedded periods that would otherwise tokenize as
//! punctuation. The text between `EXEC subsystem` and `END-EXEC` is
//! captured verbatim as a single [`TokenKind::RawText`] token.

use crate::error::{AsgError, Result};
use crate::parser::token::{Token, TokenKind};
use crate::span::{FileId, Location, Span};
use crate::text::LineIndex;

fn is_word_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, b'-' | b'_' | b'$' | b'#' | b'@')
}

/// State for the EXEC raw-text capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecState {
    None,
    SawExec,
    SawSubsystem,
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    file: FileId,
    origin: &'a str,
    lines: LineIndex,
    tokens: Vec<Token>,
    pending_picture: bool,
    exec: ExecState,
}

/// Tokenize preprocessed source text.
pub fn scan(text: &str, file: FileId, origin: &str) -> Result<Vec<Token>> {
    let mut scanner = Scanner {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        file,
        origin,
        lines: LineIndex::new(text),
        tokens: Vec::new(),
        pending_picture: false,
        exec: ExecState::None,
    };
    scanner.run()?;
    Ok(scanner.tokens)
}

impl<'a> Scanner<'a> {
    fn run(&mut self) -> Result<()> {
        while self.pos < self.bytes.len() {
            self.skip_separators();
            if self.pos >= self.bytes.len() {
                break;
            }

            if self.exec == ExecState::SawSubsystem {
                self.capture_exec_text()?;
                continue;
            }
            if self.pending_picture {
                self.scan_picture();
                continue;
            }

            let ch = self.bytes[self.pos];
            match ch {
                b'\'' | b'"' => self.scan_literal(ch)?,
                b'(' => self.punct(TokenKind::LParen),
                b')' => self.punct(TokenKind::RParen),
                b'.' => self.punct(TokenKind::Period),
                b'+' | b'-'
                    if self
                        .bytes
                        .get(self.pos + 1)
                        .is_some_and(|b| b.is_ascii_digit()) =>
                {
                    self.scan_number(true)
                }
                b'*' if self.bytes.get(self.pos + 1) == Some(&b'>') => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b'*' | b'/' | b'+' | b'-' | b'=' | b'<' | b'>' => self.scan_op(),
                b if b.is_ascii_digit() => self.scan_number(false),
                b if is_word_char(b) => self.scan_word(),
                other => {
                    return Err(self.err(
                        self.pos,
                        format!("unexpected character '{}'", other as char),
                    ))
                }
            }
        }

        if self.exec != ExecState::None {
            return Err(self.err(self.pos, "EXEC block is not terminated by END-EXEC".into()));
        }
        Ok(())
    }

    fn skip_separators(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b' ' | b'\t' | b'\n' | b',' | b';' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn emit(&mut self, kind: TokenKind, start: usize) {
        let text = &self.text[start..self.pos];
        let span = Span::new(self.file, start as u32, self.pos as u32);
        self.tokens.push(Token::new(kind, text, span));
    }

    fn punct(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 1;
        self.emit(kind, start);
    }

    fn err(&self, at: usize, message: String) -> AsgError {
        let (line, column) = self.lines.line_col_1(at as u32);
        AsgError::ParseError {
            message,
            location: Location::new(self.origin, line, column),
        }
    }

    fn scan_literal(&mut self, quote: u8) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        loop {
            if self.pos >= self.bytes.len() {
                return Err(self.err(start, "unterminated string literal".into()));
            }
            let b = self.bytes[self.pos];
            if b == quote {
                if self.bytes.get(self.pos + 1) == Some(&quote) {
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                break;
            }
            if b == b'\n' {
                return Err(self.err(start, "unterminated string literal".into()));
            }
            self.pos += 1;
        }
        self.emit(TokenKind::StringLit, start);
        Ok(())
    }

    fn scan_number(&mut self, signed: bool) {
        let start = self.pos;
        if signed {
            self.pos += 1;
        }
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }

        // A run that continues with word characters is a name like 1ST-PASS.
        if self.pos < self.bytes.len()
            && is_word_char(self.bytes[self.pos])
            && !signed
        {
            while self.pos < self.bytes.len() && is_word_char(self.bytes[self.pos]) {
                self.pos += 1;
            }
            self.emit(TokenKind::Word, start);
            self.after_word();
            return;
        }

        if self.bytes.get(self.pos) == Some(&b'.')
            && self
                .bytes
                .get(self.pos + 1)
                .is_some_and(|b| b.is_ascii_digit())
        {
            self.pos += 1;
            while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
            self.emit(TokenKind::Decimal, start);
        } else {
            self.emit(TokenKind::Integer, start);
        }
    }

    fn scan_word(&mut self) {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_word_char(self.bytes[self.pos]) {
            self.pos += 1;
        }
        self.emit(TokenKind::Word, start);
        self.after_word();
    }

    /// Update scanning modes after a word token.
    fn after_word(&mut self) {
        let text = &self.tokens.last().expect("just pushed").text;
        if text.eq_ignore_ascii_case("PIC") || text.eq_ignore_ascii_case("PICTURE") {
            self.pending_picture = true;
            return;
        }
        match self.exec {
            ExecState::None => {
                if text.eq_ignore_ascii_case("EXEC") {
                    self.exec = ExecState::SawExec;
                }
            }
            ExecState::SawExec => self.exec = ExecState::SawSubsystem,
            ExecState::SawSubsystem => {}
        }
    }

    /// Scan a PICTURE character string.
    fn scan_picture(&mut self) {
        let start = self.pos;

        // An intervening IS keeps picture mode pending.
        let probe_end = {
            let mut p = self.pos;
            while p < self.bytes.len() && is_word_char(self.bytes[p]) {
                p += 1;
            }
            p
        };
        if self.text[start..probe_end].eq_ignore_ascii_case("IS") {
            self.pos = probe_end;
            self.emit(TokenKind::Word, start);
            return;
        }

        while self.pos < self.bytes.len()
            && !matches!(self.bytes[self.pos], b' ' | b'\t' | b'\n')
        {
            self.pos += 1;
        }

        // A trailing period belongs to the sentence, not the picture.
        let mut end = self.pos;
        let mut trailing_period = false;
        if end > start && self.bytes[end - 1] == b'.' {
            end -= 1;
            trailing_period = true;
        }
        while end > start && matches!(self.bytes[end - 1], b',' | b';') {
            end -= 1;
        }

        let span = Span::new(self.file, start as u32, end as u32);
        self.tokens
            .push(Token::new(TokenKind::Picture, &self.text[start..end], span));
        if trailing_period {
            let pspan = Span::new(self.file, (self.pos - 1) as u32, self.pos as u32);
            self.tokens.push(Token::new(TokenKind::Period, ".", pspan));
        }
        self.pending_picture = false;
    }

    fn scan_op(&mut self) {
        let start = self.pos;
        let ch = self.bytes[self.pos];
        self.pos += 1;
        let next = self.bytes.get(self.pos).copied();
        let two = matches!(
            (ch, next),
            (b'*', Some(b'*')) | (b'<', Some(b'=')) | (b'>', Some(b'=')) | (b'<', Some(b'>'))
        );
        if two {
            self.pos += 1;
        }
        self.emit(TokenKind::Op, start);
    }

    /// Capture the raw text between `EXEC subsystem` and `END-EXEC`.
    fn capture_exec_text(&mut self) -> Result<()> {
        let upper = self.text.to_ascii_uppercase();
        let mut search = self.pos;
        let found = loop {
            match upper[search..].find("END-EXEC") {
                None => return Err(self.err(self.pos, "END-EXEC not found".into())),
                Some(off) => {
                    let at = search + off;
                    let before_ok = at == 0 || !is_word_char(self.bytes[at - 1]);
                    let after = self.bytes.get(at + "END-EXEC".len());
                    let after_ok = after.map_or(true, |b| !is_word_char(*b));
                    if before_ok && after_ok {
                        break at;
                    }
                    search = at + 1;
                }
            }
        };

        let raw = self.text[self.pos..found].trim();
        if !raw.is_empty() {
            let start = self.pos + (self.text[self.pos..found].len()
                - self.text[self.pos..found].trim_start().len());
            let span = Span::new(self.file, start as u32, (start + raw.len()) as u32);
            self.tokens.push(Token::new(TokenKind::RawText, raw, span));
        }
        self.pos = found;
        self.exec = ExecState::None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        scan(text, FileId::MAIN, "t.cbl")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn texts(text: &str) -> Vec<String> {
        scan(text, FileId::MAIN, "t.cbl")
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn words_and_periods() {
        assert_eq!(
            kinds("IDENTIFICATION DIVISION."),
            vec![TokenKind::Word, TokenKind::Word, TokenKind::Period]
        );
    }

    #[test]
    fn hyphenated_words_are_single_tokens() {
        assert_eq!(texts("WS-CUSTOMER-NAME."), vec!["WS-CUSTOMER-NAME", "."]);
    }

    #[test]
    fn string_literal_with_doubled_quote() {
        let toks = scan("DISPLAY \"IT\"\"S\".", FileId::MAIN, "t.cbl").unwrap();
        assert_eq!(toks[1].kind, TokenKind::StringLit);
        assert_eq!(toks[1].text, "\"IT\"\"S\"");
    }

    #[test]
    fn unterminated_literal_fails() {
        assert!(scan("DISPLAY \"OOPS.", FileId::MAIN, "t.cbl").is_err());
    }

    #[test]
    fn integer_and_decimal() {
        assert_eq!(
            kinds("MOVE 42 TO X"),
            vec![
                TokenKind::Word,
                TokenKind::Integer,
                TokenKind::Word,
                TokenKind::Word
            ]
        );
        assert_eq!(
            kinds("MOVE 3.14 TO X."),
            vec![
                TokenKind::Word,
                TokenKind::Decimal,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Period
            ]
        );
    }

    #[test]
    fn sentence_period_after_integer() {
        // "PERFORM 3 TIMES." must not absorb the period into the number.
        let toks = texts("PERFORM P 3 TIMES.");
        assert_eq!(toks, vec!["PERFORM", "P", "3", "TIMES", "."]);
    }

    #[test]
    fn signed_number() {
        let toks = scan("MOVE -5 TO X.", FileId::MAIN, "t.cbl").unwrap();
        assert_eq!(toks[1].kind, TokenKind::Integer);
        assert_eq!(toks[1].text, "-5");
    }

    #[test]
    fn picture_strings_keep_parens_and_period() {
        let toks = scan("05 AMT PIC S9(5)V99.", FileId::MAIN, "t.cbl").unwrap();
        let pic = toks.iter().find(|t| t.kind == TokenKind::Picture).unwrap();
        assert_eq!(pic.text, "S9(5)V99");
        assert_eq!(toks.last().unwrap().kind, TokenKind::Period);
    }

    #[test]
    fn picture_with_is_keyword() {
        let toks = scan("05 X PICTURE IS X(20).", FileId::MAIN, "t.cbl").unwrap();
        let pic = toks.iter().find(|t| t.kind == TokenKind::Picture).unwrap();
        assert_eq!(pic.text, "X(20)");
    }

    #[test]
    fn picture_with_embedded_period() {
        let toks = scan("05 P PIC 9.99.", FileId::MAIN, "t.cbl").unwrap();
        let pic = toks.iter().find(|t| t.kind == TokenKind::Picture).unwrap();
        assert_eq!(pic.text, "9.99");
    }

    #[test]
    fn commas_are_separators() {
        assert_eq!(texts("ADD A, B TO C."), vec!["ADD", "A", "B", "TO", "C", "."]);
    }

    #[test]
    fn exec_payload_is_raw() {
        let toks = scan(
            "EXEC SQL SELECT 1 FROM DUAL END-EXEC.",
            FileId::MAIN,
            "t.cbl",
        )
        .unwrap();
        let raw = toks.iter().find(|t| t.kind == TokenKind::RawText).unwrap();
        assert_eq!(raw.text, "SELECT 1 FROM DUAL");
        assert!(toks.iter().any(|t| t.is_word("END-EXEC")));
    }

    #[test]
    fn compute_operators() {
        let toks = texts("COMPUTE X = A + B ** 2.");
        assert_eq!(toks, vec!["COMPUTE", "X", "=", "A", "+", "B", "**", "2", "."]);
    }

    #[test]
    fn inline_comment_skipped() {
        assert_eq!(texts("MOVE A TO B. *> trailing note"), vec!["MOVE", "A", "TO", "B", "."]);
    }
}
