//! Token definitions for the grammar front-end.

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Kinds of tokens produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// A COBOL word: name, keyword, or figurative constant.
    Word,
    /// An unsigned or signed integer literal.
    Integer,
    /// A numeric literal with a decimal point.
    Decimal,
    /// A quoted string literal, quotes included.
    StringLit,
    /// A PICTURE character string (only after PIC/PICTURE).
    Picture,
    /// Foreign text between `EXEC subsystem` and `END-EXEC`.
    RawText,
    /// Statement-terminator period.
    Period,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// An arithmetic or relational operator.
    Op,
}

/// One token with its text and source span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    /// Create a token.
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// Case-insensitive word comparison.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(word)
    }

    /// Whether this token can stand as a literal operand.
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::StringLit | TokenKind::Integer | TokenKind::Decimal
        )
    }
}
