//! Recursive descent over the preprocessed token stream.
//!
//! Unlike a typed-AST parser, this grammar materializes a tree of
//! [`ContextKind`] contexts: each recognized production allocates a context,
//! attaches its terminal tokens, and nests its sub-productions. The ASG
//! builder consumes that tree through parent-link navigation, so fidelity of
//! the *shape* matters more than early semantic interpretation: clauses keep
//! their raw tokens and the builder passes decide what they mean.
//!
//! Unknown words inside an entry or sentence are attached to the innermost
//! open context and skipped, so an unrecognized clause never derails the
//! surrounding structure. Hard structural mismatches (a missing DIVISION
//! header, an unterminated entry) are [`AsgError::ParseError`]s and fatal
//! for the compilation unit.

use crate::error::{AsgError, Result};
use crate::parser::token::{Token, TokenKind};
use crate::parser::tree::{ContextId, ContextKind, ParseTree, TreeId};
use crate::span::Location;
use crate::text::LineIndex;

/// Parse a preprocessed text's token stream into a parse tree.
pub fn parse(text: &str, tokens: Vec<Token>, tree_id: TreeId, origin: &str) -> Result<ParseTree> {
    let tree = ParseTree::new(tree_id, tokens.clone());
    let mut parser = Parser {
        toks: tokens,
        pos: 0,
        tree,
        origin,
        lines: LineIndex::new(text),
    };
    parser.parse_start()?;
    Ok(parser.tree)
}

struct Parser<'a> {
    toks: Vec<Token>,
    pos: usize,
    tree: ParseTree,
    origin: &'a str,
    lines: LineIndex,
}

// ── Statement dispatch ─────────────────────────────────────────────────────
// The master verb table. Adding a statement means one line here plus its
// parse method; `is_verb` and `parse_statement` are generated from it.

macro_rules! for_statement_verbs {
    ($mac:ident) => {
        $mac! {
            "MOVE"       => parse_move_statement,
            "DISPLAY"    => parse_display_statement,
            "ACCEPT"     => parse_accept_statement,
            "PERFORM"    => parse_perform_statement,
            "IF"         => parse_if_statement,
            "EVALUATE"   => parse_evaluate_statement,
            "GO"         => parse_goto_statement,
            "CALL"       => parse_call_statement,
            "ADD"        => parse_add_statement,
            "SUBTRACT"   => parse_subtract_statement,
            "MULTIPLY"   => parse_multiply_statement,
            "DIVIDE"     => parse_divide_statement,
            "COMPUTE"    => parse_compute_statement,
            "OPEN"       => parse_open_statement,
            "CLOSE"      => parse_close_statement,
            "READ"       => parse_read_statement,
            "WRITE"      => parse_write_statement,
            "REWRITE"    => parse_rewrite_statement,
            "DELETE"     => parse_delete_statement,
            "START"      => parse_start_statement,
            "STOP"       => parse_stop_statement,
            "GOBACK"     => parse_goback_statement,
            "EXIT"       => parse_exit_statement,
            "CONTINUE"   => parse_continue_statement,
            "SET"        => parse_set_statement,
            "INITIALIZE" => parse_initialize_statement,
            "INSPECT"    => parse_inspect_statement,
            "STRING"     => parse_string_statement,
            "UNSTRING"   => parse_unstring_statement,
            "SEARCH"     => parse_search_statement,
            "SORT"       => parse_sort_statement,
            "MERGE"      => parse_merge_statement,
            "RELEASE"    => parse_release_statement,
            "RETURN"     => parse_return_statement,
            "CANCEL"     => parse_cancel_statement,
            "EXEC"       => parse_exec_statement,
        }
    };
}

macro_rules! gen_statement_dispatch {
    ( $($verb:literal => $f:ident),* $(,)? ) => {
        impl<'a> Parser<'a> {
            fn parse_statement(&mut self, parent: ContextId) -> Result<()> {
                $(
                    if self.at_word($verb) {
                        return self.$f(parent);
                    }
                )*
                // Not a verb after all: attach the token and move on.
                self.bump_into(parent);
                Ok(())
            }
        }

        fn is_verb(word: &str) -> bool {
            $(
                if word.eq_ignore_ascii_case($verb) {
                    return true;
                }
            )*
            false
        }
    };
}
for_statement_verbs!(gen_statement_dispatch);

const FIGURATIVE: &[&str] = &[
    "ZERO",
    "ZEROS",
    "ZEROES",
    "SPACE",
    "SPACES",
    "HIGH-VALUE",
    "HIGH-VALUES",
    "LOW-VALUE",
    "LOW-VALUES",
    "QUOTE",
    "QUOTES",
    "NULL",
    "NULLS",
    "ALL",
];

fn is_figurative(word: &str) -> bool {
    FIGURATIVE.iter().any(|f| word.eq_ignore_ascii_case(f))
}

const CONDITION_WORDS: &[&str] = &[
    "AND",
    "OR",
    "NOT",
    "IS",
    "ARE",
    "EQUAL",
    "EQUALS",
    "GREATER",
    "LESS",
    "THAN",
    "TO",
    "NUMERIC",
    "ALPHABETIC",
    "ALPHABETIC-LOWER",
    "ALPHABETIC-UPPER",
    "POSITIVE",
    "NEGATIVE",
    "OMITTED",
];

fn is_condition_word(word: &str) -> bool {
    CONDITION_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w))
}

const DATA_CLAUSE_WORDS: &[&str] = &[
    "REDEFINES",
    "PIC",
    "PICTURE",
    "USAGE",
    "VALUE",
    "VALUES",
    "OCCURS",
    "SIGN",
    "GLOBAL",
    "EXTERNAL",
    "JUSTIFIED",
    "JUST",
    "BLANK",
    "SYNCHRONIZED",
    "SYNC",
    "RENAMES",
    "COMP",
    "COMP-1",
    "COMP-2",
    "COMP-3",
    "COMP-4",
    "COMP-5",
    "COMPUTATIONAL",
    "COMPUTATIONAL-1",
    "COMPUTATIONAL-2",
    "COMPUTATIONAL-3",
    "COMPUTATIONAL-4",
    "COMPUTATIONAL-5",
    "BINARY",
    "PACKED-DECIMAL",
    "POINTER",
    "INDEX",
];

const USAGE_WORDS: &[&str] = &[
    "COMP",
    "COMP-1",
    "COMP-2",
    "COMP-3",
    "COMP-4",
    "COMP-5",
    "COMPUTATIONAL",
    "COMPUTATIONAL-1",
    "COMPUTATIONAL-2",
    "COMPUTATIONAL-3",
    "COMPUTATIONAL-4",
    "COMPUTATIONAL-5",
    "BINARY",
    "PACKED-DECIMAL",
    "DISPLAY",
    "POINTER",
    "INDEX",
];

const SELECT_CLAUSE_WORDS: &[&str] = &[
    "ASSIGN",
    "ORGANIZATION",
    "ACCESS",
    "RECORD",
    "ALTERNATE",
    "FILE",
    "STATUS",
    "RESERVE",
    "PADDING",
    "LOCK",
];

const ID_PARAGRAPHS: &[(&str, ContextKind)] = &[
    ("AUTHOR", ContextKind::AuthorParagraph),
    ("INSTALLATION", ContextKind::InstallationParagraph),
    ("DATE-WRITTEN", ContextKind::DateWrittenParagraph),
    ("DATE-COMPILED", ContextKind::DateCompiledParagraph),
    ("SECURITY", ContextKind::SecurityParagraph),
    ("REMARKS", ContextKind::RemarksParagraph),
];

impl<'a> Parser<'a> {
    // ── Token access ───────────────────────────────────────────────────

    fn cur(&self) -> Option<&Token> {
        self.toks.get(self.pos)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.cur().map(|t| t.kind) == Some(kind)
    }

    fn at_word(&self, word: &str) -> bool {
        self.cur().is_some_and(|t| t.is_word(word))
    }

    fn at_any_word(&self, words: &[&str]) -> bool {
        self.cur()
            .is_some_and(|t| t.kind == TokenKind::Word && words.iter().any(|w| t.is_word(w)))
    }

    fn peek(&self, n: usize) -> Option<&Token> {
        self.toks.get(self.pos + n)
    }

    fn peek_word(&self, n: usize, word: &str) -> bool {
        self.peek(n).is_some_and(|t| t.is_word(word))
    }

    fn cur_text(&self) -> &str {
        self.cur().map(|t| t.text.as_str()).unwrap_or("")
    }

    // ── Tree construction ──────────────────────────────────────────────

    fn open(&mut self, kind: ContextKind, parent: ContextId) -> ContextId {
        self.tree.push_context(kind, Some(parent))
    }

    fn seal(&mut self, ctx: ContextId) {
        if let Some(parent) = self.tree.parent(ctx) {
            let span = self.tree.span(ctx);
            self.tree.widen(parent, span);
        }
    }

    fn bump_into(&mut self, ctx: ContextId) {
        if self.pos < self.toks.len() {
            self.tree.attach_token(ctx, self.pos as u32);
            self.pos += 1;
        }
    }

    fn eat_word(&mut self, ctx: ContextId, word: &str) -> bool {
        if self.at_word(word) {
            self.bump_into(ctx);
            true
        } else {
            false
        }
    }

    fn eat_any_word(&mut self, ctx: ContextId, words: &[&str]) -> bool {
        if self.at_any_word(words) {
            self.bump_into(ctx);
            true
        } else {
            false
        }
    }

    fn eat_period(&mut self, ctx: ContextId) -> bool {
        if self.at_kind(TokenKind::Period) {
            self.bump_into(ctx);
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, ctx: ContextId, word: &str) -> Result<()> {
        if self.eat_word(ctx, word) {
            Ok(())
        } else {
            Err(self.err_here(format!("expected {word}, found '{}'", self.cur_text())))
        }
    }

    fn expect_period(&mut self, ctx: ContextId) -> Result<()> {
        if self.eat_period(ctx) {
            Ok(())
        } else {
            Err(self.err_here(format!("expected '.', found '{}'", self.cur_text())))
        }
    }

    fn err_here(&self, message: String) -> AsgError {
        let offset = self
            .cur()
            .map(|t| t.span.start)
            .or_else(|| self.toks.last().map(|t| t.span.end))
            .unwrap_or(0);
        let (line, column) = self.lines.line_col_1(offset);
        AsgError::ParseError {
            message,
            location: Location::new(self.origin, line, column),
        }
    }

    // ── Structure predicates ───────────────────────────────────────────

    fn at_division_start(&self) -> bool {
        (self.at_word("IDENTIFICATION")
            || self.at_word("ID")
            || self.at_word("ENVIRONMENT")
            || self.at_word("DATA")
            || self.at_word("PROCEDURE"))
            && self.peek_word(1, "DIVISION")
    }

    fn at_identification_start(&self) -> bool {
        (self.at_word("IDENTIFICATION") || self.at_word("ID")) && self.peek_word(1, "DIVISION")
    }

    fn at_end_program(&self) -> bool {
        self.at_word("END") && self.peek_word(1, "PROGRAM")
    }

    fn at_id_paragraph(&self) -> bool {
        self.at_word("PROGRAM-ID")
            || ID_PARAGRAPHS.iter().any(|(w, _)| self.at_word(w))
    }

    fn at_level_number(&self) -> bool {
        if !self.at_kind(TokenKind::Integer) {
            return false;
        }
        matches!(self.cur_text().parse::<u8>(), Ok(1..=49) | Ok(66) | Ok(77) | Ok(88))
    }

    fn at_statement_start(&self) -> bool {
        self.cur()
            .is_some_and(|t| t.kind == TokenKind::Word && is_verb(&t.text))
    }

    fn at_scope_terminator(&self) -> bool {
        self.cur().is_some_and(|t| {
            t.kind == TokenKind::Word
                && (t.text.to_ascii_uppercase().starts_with("END-")
                    || t.is_word("ELSE")
                    || t.is_word("WHEN"))
        })
    }

    fn at_procedure_end(&self) -> bool {
        self.at_end() || self.at_division_start() || self.at_end_program()
    }

    fn at_section_start(&self) -> bool {
        self.at_kind(TokenKind::Word) && self.peek_word(1, "SECTION")
    }

    fn at_paragraph_start(&self) -> bool {
        let name_like = matches!(
            self.cur().map(|t| t.kind),
            Some(TokenKind::Word) | Some(TokenKind::Integer)
        );
        name_like
            && !self.at_statement_start()
            && self.peek(1).map(|t| t.kind) == Some(TokenKind::Period)
    }

    fn at_operand_start(&self) -> bool {
        self.cur().is_some_and(|t| {
            t.is_literal()
                || (t.kind == TokenKind::Word && (is_figurative(&t.text) || !is_verb(&t.text)))
        }) && !self.at_scope_terminator()
    }

    fn at_name(&self) -> bool {
        self.cur()
            .is_some_and(|t| t.kind == TokenKind::Word && !is_verb(&t.text))
            && !self.at_scope_terminator()
    }

    // ── Operands ───────────────────────────────────────────────────────

    /// `name [OF/IN qualifier]... [( subscripts )]`
    fn parse_qualified_name(&mut self, parent: ContextId) -> Result<ContextId> {
        let ctx = self.open(ContextKind::QualifiedDataName, parent);
        if !self.at_kind(TokenKind::Word) {
            return Err(self.err_here(format!("expected a name, found '{}'", self.cur_text())));
        }
        self.bump_into(ctx);
        while (self.at_word("OF") || self.at_word("IN"))
            && self.peek(1).map(|t| t.kind) == Some(TokenKind::Word)
        {
            self.bump_into(ctx);
            self.bump_into(ctx);
        }
        if self.at_kind(TokenKind::LParen) {
            let mut depth = 0usize;
            loop {
                if self.at_kind(TokenKind::LParen) {
                    depth += 1;
                } else if self.at_kind(TokenKind::RParen) {
                    depth -= 1;
                }
                self.bump_into(ctx);
                if depth == 0 || self.at_end() {
                    break;
                }
            }
        }
        self.seal(ctx);
        Ok(ctx)
    }

    fn parse_literal(&mut self, parent: ContextId) -> ContextId {
        let ctx = self.open(ContextKind::Literal, parent);
        // ALL "x" and plain figurative constants both land here.
        if self.at_word("ALL") {
            self.bump_into(ctx);
        }
        self.bump_into(ctx);
        self.seal(ctx);
        ctx
    }

    fn parse_procedure_name(&mut self, parent: ContextId) -> Result<ContextId> {
        let ctx = self.open(ContextKind::ProcedureName, parent);
        if !matches!(
            self.cur().map(|t| t.kind),
            Some(TokenKind::Word) | Some(TokenKind::Integer)
        ) {
            return Err(self.err_here(format!(
                "expected a procedure name, found '{}'",
                self.cur_text()
            )));
        }
        self.bump_into(ctx);
        // SECTION-qualified form: name OF/IN section-name.
        while (self.at_word("OF") || self.at_word("IN"))
            && self.peek(1).map(|t| t.kind) == Some(TokenKind::Word)
        {
            self.bump_into(ctx);
            self.bump_into(ctx);
        }
        self.seal(ctx);
        Ok(ctx)
    }

    /// Literal, figurative constant, or qualified data name.
    fn parse_operand(&mut self, parent: ContextId) -> Result<()> {
        if self
            .cur()
            .is_some_and(|t| t.is_literal() || (t.kind == TokenKind::Word && is_figurative(&t.text)))
        {
            self.parse_literal(parent);
            Ok(())
        } else if self.at_kind(TokenKind::Word) {
            self.parse_qualified_name(parent)?;
            Ok(())
        } else {
            Err(self.err_here(format!("expected an operand, found '{}'", self.cur_text())))
        }
    }

    /// A relational condition as a token run with embedded operand contexts.
    fn parse_condition(&mut self, parent: ContextId) -> Result<()> {
        let ctx = self.open(ContextKind::Condition, parent);
        loop {
            if self.at_end()
                || self.at_kind(TokenKind::Period)
                || self.at_word("THEN")
                || self.at_word("ELSE")
                || self.at_statement_start()
                || self.at_scope_terminator()
                || self.at_procedure_end()
            {
                break;
            }
            let tok = self.cur().expect("not at end");
            if tok.is_literal() || (tok.kind == TokenKind::Word && is_figurative(&tok.text)) {
                self.parse_literal(ctx);
            } else if tok.kind == TokenKind::Word && is_condition_word(&tok.text) {
                self.bump_into(ctx);
            } else if tok.kind == TokenKind::Word {
                self.parse_qualified_name(ctx)?;
            } else {
                self.bump_into(ctx);
            }
        }
        self.seal(ctx);
        Ok(())
    }

    fn parse_statement_or_bump(&mut self, parent: ContextId) -> Result<()> {
        if self.at_statement_start() {
            self.parse_statement(parent)
        } else {
            self.bump_into(parent);
            Ok(())
        }
    }

    // ── Program structure ──────────────────────────────────────────────

    fn parse_start(&mut self) -> Result<()> {
        let root = self.tree.push_context(ContextKind::StartRule, None);
        while !self.at_end() {
            if !self.at_identification_start() {
                return Err(self.err_here(format!(
                    "expected IDENTIFICATION DIVISION, found '{}'",
                    self.cur_text()
                )));
            }
            self.parse_compilation_unit(root)?;
        }
        Ok(())
    }

    fn parse_compilation_unit(&mut self, parent: ContextId) -> Result<()> {
        let unit = self.open(ContextKind::CompilationUnit, parent);
        self.parse_program_unit(unit)?;
        if self.at_end_program() {
            let end = self.open(ContextKind::EndProgramStatement, unit);
            self.bump_into(end); // END
            self.bump_into(end); // PROGRAM
            if self.at_kind(TokenKind::Word) && !self.at_division_start() {
                self.bump_into(end);
            }
            self.eat_period(end);
            self.seal(end);
        }
        self.seal(unit);
        Ok(())
    }

    fn parse_program_unit(&mut self, unit: ContextId) -> Result<()> {
        let pu = self.open(ContextKind::ProgramUnit, unit);
        self.parse_identification_division(pu)?;
        if self.at_word("ENVIRONMENT") && self.peek_word(1, "DIVISION") {
            self.parse_environment_division(pu)?;
        }
        if self.at_word("DATA") && self.peek_word(1, "DIVISION") {
            self.parse_data_division(pu)?;
        }
        if self.at_word("PROCEDURE") && self.peek_word(1, "DIVISION") {
            self.parse_procedure_division(pu)?;
        }
        // Nested programs sit between the parent body and END PROGRAM.
        while self.at_identification_start() {
            self.parse_compilation_unit(pu)?;
        }
        self.seal(pu);
        Ok(())
    }

    // ── Identification division ────────────────────────────────────────

    fn parse_identification_division(&mut self, pu: ContextId) -> Result<()> {
        let div = self.open(ContextKind::IdentificationDivision, pu);
        self.bump_into(div); // IDENTIFICATION or ID
        self.expect_word(div, "DIVISION")?;
        self.expect_period(div)?;

        loop {
            if self.at_word("PROGRAM-ID") {
                let par = self.open(ContextKind::ProgramIdParagraph, div);
                self.bump_into(par);
                self.eat_period(par);
                if !self.at_kind(TokenKind::Word) {
                    return Err(self.err_here("expected a program name".to_string()));
                }
                self.bump_into(par);
                while self.at_kind(TokenKind::Word) && !self.at_division_start() {
                    self.bump_into(par);
                }
                self.eat_period(par);
                self.seal(par);
                continue;
            }

            let mapped = ID_PARAGRAPHS
                .iter()
                .find(|(w, _)| self.at_word(w))
                .map(|(_, k)| *k);
            if let Some(kind) = mapped {
                let par = self.open(kind, div);
                self.bump_into(par);
                self.eat_period(par);
                while !self.at_end()
                    && !self.at_division_start()
                    && !self.at_end_program()
                    && !self.at_id_paragraph()
                {
                    self.bump_into(par);
                }
                self.seal(par);
                continue;
            }

            break;
        }

        self.seal(div);
        Ok(())
    }

    // ── Environment division ───────────────────────────────────────────

    fn parse_environment_division(&mut self, pu: ContextId) -> Result<()> {
        let div = self.open(ContextKind::EnvironmentDivision, pu);
        self.bump_into(div); // ENVIRONMENT
        self.expect_word(div, "DIVISION")?;
        self.expect_period(div)?;

        loop {
            if self.at_word("CONFIGURATION") && self.peek_word(1, "SECTION") {
                self.parse_configuration_section(div)?;
            } else if self.at_word("INPUT-OUTPUT") && self.peek_word(1, "SECTION") {
                self.parse_input_output_section(div)?;
            } else {
                break;
            }
        }

        self.seal(div);
        Ok(())
    }

    fn parse_configuration_section(&mut self, div: ContextId) -> Result<()> {
        let sec = self.open(ContextKind::ConfigurationSection, div);
        self.bump_into(sec); // CONFIGURATION
        self.expect_word(sec, "SECTION")?;
        self.expect_period(sec)?;

        loop {
            if self.at_word("SOURCE-COMPUTER") {
                self.parse_computer_paragraph(sec, ContextKind::SourceComputerParagraph)?;
            } else if self.at_word("OBJECT-COMPUTER") {
                self.parse_computer_paragraph(sec, ContextKind::ObjectComputerParagraph)?;
            } else if self.at_word("SPECIAL-NAMES") {
                self.parse_special_names(sec)?;
            } else {
                break;
            }
        }

        self.seal(sec);
        Ok(())
    }

    fn parse_computer_paragraph(&mut self, sec: ContextId, kind: ContextKind) -> Result<()> {
        let par = self.open(kind, sec);
        self.bump_into(par);
        self.eat_period(par);
        while self.at_kind(TokenKind::Word) && !self.at_division_start() {
            // SOURCE-COMPUTER. IBM-370 WITH DEBUGGING MODE.
            if self.at_any_word(&["SPECIAL-NAMES", "OBJECT-COMPUTER", "INPUT-OUTPUT"]) {
                break;
            }
            self.bump_into(par);
        }
        self.eat_period(par);
        self.seal(par);
        Ok(())
    }

    fn parse_special_names(&mut self, sec: ContextId) -> Result<()> {
        let par = self.open(ContextKind::SpecialNamesParagraph, sec);
        self.bump_into(par); // SPECIAL-NAMES
        self.eat_period(par);

        while !self.at_end()
            && !self.at_kind(TokenKind::Period)
            && !self.at_division_start()
            && self
                .cur()
                .is_some_and(|t| matches!(t.kind, TokenKind::Word | TokenKind::StringLit))
        {
            let clause = self.open(ContextKind::SpecialNameClause, par);
            self.bump_into(clause);
            while !self.at_end() && !self.at_kind(TokenKind::Period) {
                // The next entry starts where a word is followed by IS.
                if self.at_kind(TokenKind::Word)
                    && self.peek_word(1, "IS")
                    && !self.at_word("IS")
                {
                    break;
                }
                if self.at_division_start() {
                    break;
                }
                self.bump_into(clause);
            }
            self.seal(clause);
        }

        self.eat_period(par);
        self.seal(par);
        Ok(())
    }

    fn parse_input_output_section(&mut self, div: ContextId) -> Result<()> {
        let sec = self.open(ContextKind::InputOutputSection, div);
        self.bump_into(sec); // INPUT-OUTPUT
        self.expect_word(sec, "SECTION")?;
        self.expect_period(sec)?;

        if self.at_word("FILE-CONTROL") {
            let fc = self.open(ContextKind::FileControlParagraph, sec);
            self.bump_into(fc);
            self.eat_period(fc);
            while self.at_word("SELECT") {
                self.parse_file_control_entry(fc)?;
            }
            self.seal(fc);
        }

        if self.at_word("I-O-CONTROL") {
            let ioc = self.open(ContextKind::IoControlParagraph, sec);
            self.bump_into(ioc);
            self.eat_period(ioc);
            while !self.at_end() && !self.at_division_start() && !self.at_end_program() {
                if self.at_kind(TokenKind::Word) && self.peek_word(1, "SECTION") {
                    break;
                }
                self.bump_into(ioc);
            }
            self.seal(ioc);
        }

        self.seal(sec);
        Ok(())
    }

    fn parse_file_control_entry(&mut self, fc: ContextId) -> Result<()> {
        let entry = self.open(ContextKind::FileControlEntry, fc);
        self.bump_into(entry); // SELECT
        self.eat_word(entry, "OPTIONAL");
        if !self.at_kind(TokenKind::Word) {
            return Err(self.err_here("expected a file name after SELECT".to_string()));
        }
        self.bump_into(entry); // file name

        while !self.at_end() && !self.at_kind(TokenKind::Period) {
            if self.at_word("ASSIGN") {
                let c = self.open(ContextKind::AssignClause, entry);
                self.bump_into(c);
                self.eat_word(c, "TO");
                while self
                    .cur()
                    .is_some_and(|t| matches!(t.kind, TokenKind::Word | TokenKind::StringLit))
                    && !self.at_any_word(SELECT_CLAUSE_WORDS)
                {
                    self.bump_into(c);
                }
                self.seal(c);
            } else if self.at_word("ORGANIZATION") {
                let c = self.open(ContextKind::OrganizationClause, entry);
                self.bump_into(c);
                self.eat_word(c, "IS");
                self.eat_word(c, "LINE");
                if self.at_kind(TokenKind::Word) {
                    self.bump_into(c);
                }
                self.seal(c);
            } else if self.at_word("ACCESS") {
                let c = self.open(ContextKind::AccessModeClause, entry);
                self.bump_into(c);
                self.eat_word(c, "MODE");
                self.eat_word(c, "IS");
                if self.at_kind(TokenKind::Word) {
                    self.bump_into(c);
                }
                self.seal(c);
            } else if self.at_word("RECORD") && self.peek_word(1, "KEY") {
                let c = self.open(ContextKind::RecordKeyClause, entry);
                self.bump_into(c);
                self.bump_into(c);
                self.eat_word(c, "IS");
                self.parse_qualified_name(c)?;
                self.seal(c);
            } else if self.at_word("ALTERNATE") {
                let c = self.open(ContextKind::AlternateRecordKeyClause, entry);
                self.bump_into(c);
                self.eat_word(c, "RECORD");
                self.eat_word(c, "KEY");
                self.eat_word(c, "IS");
                self.parse_qualified_name(c)?;
                self.eat_word(c, "WITH");
                self.eat_word(c, "DUPLICATES");
                self.seal(c);
            } else if (self.at_word("FILE") && self.peek_word(1, "STATUS")) || self.at_word("STATUS")
            {
                let c = self.open(ContextKind::FileStatusClause, entry);
                self.eat_word(c, "FILE");
                self.bump_into(c); // STATUS
                self.eat_word(c, "IS");
                self.parse_qualified_name(c)?;
                self.seal(c);
            } else if self.at_word("RESERVE") {
                let c = self.open(ContextKind::ReserveClause, entry);
                self.bump_into(c);
                if self.at_kind(TokenKind::Integer) {
                    self.bump_into(c);
                }
                self.eat_any_word(c, &["AREA", "AREAS"]);
                self.seal(c);
            } else if self.at_word("PADDING") {
                let c = self.open(ContextKind::PaddingCharacterClause, entry);
                self.bump_into(c);
                self.eat_word(c, "CHARACTER");
                self.eat_word(c, "IS");
                if self
                    .cur()
                    .is_some_and(|t| matches!(t.kind, TokenKind::Word | TokenKind::StringLit))
                {
                    self.bump_into(c);
                }
                self.seal(c);
            } else {
                self.bump_into(entry);
            }
        }

        self.expect_period(entry)?;
        self.seal(entry);
        Ok(())
    }

    // ── Data division ──────────────────────────────────────────────────

    fn parse_data_division(&mut self, pu: ContextId) -> Result<()> {
        let div = self.open(ContextKind::DataDivision, pu);
        self.bump_into(div); // DATA
        self.expect_word(div, "DIVISION")?;
        self.expect_period(div)?;

        loop {
            if self.at_word("FILE") && self.peek_word(1, "SECTION") {
                self.parse_file_section(div)?;
            } else if self.at_word("WORKING-STORAGE") && self.peek_word(1, "SECTION") {
                self.parse_storage_section(div, ContextKind::WorkingStorageSection)?;
            } else if self.at_word("LOCAL-STORAGE") && self.peek_word(1, "SECTION") {
                self.parse_storage_section(div, ContextKind::LocalStorageSection)?;
            } else if self.at_word("LINKAGE") && self.peek_word(1, "SECTION") {
                self.parse_storage_section(div, ContextKind::LinkageSection)?;
            } else {
                break;
            }
        }

        self.seal(div);
        Ok(())
    }

    fn parse_file_section(&mut self, div: ContextId) -> Result<()> {
        let sec = self.open(ContextKind::FileSection, div);
        self.bump_into(sec); // FILE
        self.expect_word(sec, "SECTION")?;
        self.expect_period(sec)?;

        while self.at_word("FD") || self.at_word("SD") {
            self.parse_file_description_entry(sec)?;
        }

        self.seal(sec);
        Ok(())
    }

    fn parse_file_description_entry(&mut self, sec: ContextId) -> Result<()> {
        let fd = self.open(ContextKind::FileDescriptionEntry, sec);
        self.bump_into(fd); // FD or SD
        if !self.at_kind(TokenKind::Word) {
            return Err(self.err_here("expected a file name after FD/SD".to_string()));
        }
        self.bump_into(fd); // file name

        while !self.at_end() && !self.at_kind(TokenKind::Period) {
            if self.at_word("BLOCK") {
                let c = self.open(ContextKind::BlockContainsClause, fd);
                self.bump_into(c);
                self.eat_word(c, "CONTAINS");
                while self.at_kind(TokenKind::Integer) || self.at_word("TO") {
                    self.bump_into(c);
                }
                self.eat_any_word(c, &["RECORDS", "CHARACTERS"]);
                self.seal(c);
            } else if self.at_word("RECORD") {
                let c = self.open(ContextKind::RecordContainsClause, fd);
                self.bump_into(c);
                self.eat_word(c, "CONTAINS");
                while self.at_kind(TokenKind::Integer)
                    || self.at_any_word(&["TO", "IS", "VARYING", "IN", "SIZE", "DEPENDING", "ON"])
                {
                    self.bump_into(c);
                }
                self.eat_word(c, "CHARACTERS");
                self.seal(c);
            } else if self.at_word("LABEL") {
                let c = self.open(ContextKind::LabelRecordsClause, fd);
                self.bump_into(c);
                self.eat_any_word(c, &["RECORD", "RECORDS"]);
                self.eat_any_word(c, &["IS", "ARE"]);
                self.eat_any_word(c, &["STANDARD", "OMITTED"]);
                self.seal(c);
            } else if self.at_word("DATA") && !self.peek_word(1, "DIVISION") {
                let c = self.open(ContextKind::DataRecordsClause, fd);
                self.bump_into(c);
                self.eat_any_word(c, &["RECORD", "RECORDS"]);
                self.eat_any_word(c, &["IS", "ARE"]);
                while self.at_kind(TokenKind::Word)
                    && !self.at_any_word(&["BLOCK", "RECORD", "LABEL", "DATA"])
                {
                    self.bump_into(c);
                }
                self.seal(c);
            } else {
                self.bump_into(fd);
            }
        }
        self.expect_period(fd)?;

        while self.at_level_number() {
            self.parse_data_description_entry(fd)?;
        }

        self.seal(fd);
        Ok(())
    }

    fn parse_storage_section(&mut self, div: ContextId, kind: ContextKind) -> Result<()> {
        let sec = self.open(kind, div);
        self.bump_into(sec); // section word
        self.expect_word(sec, "SECTION")?;
        self.expect_period(sec)?;

        while self.at_level_number() {
            self.parse_data_description_entry(sec)?;
        }

        self.seal(sec);
        Ok(())
    }

    fn parse_data_description_entry(&mut self, parent: ContextId) -> Result<()> {
        let entry = self.open(ContextKind::DataDescriptionEntry, parent);
        let level: u8 = self.cur_text().parse().unwrap_or(0);
        self.bump_into(entry); // level number

        if level == 66 {
            if self.at_kind(TokenKind::Word) {
                self.bump_into(entry);
            }
            let c = self.open(ContextKind::RenamesClause, entry);
            self.expect_word(c, "RENAMES")?;
            self.parse_qualified_name(c)?;
            if self.eat_any_word(c, &["THRU", "THROUGH"]) {
                self.parse_qualified_name(c)?;
            }
            self.seal(c);
            self.expect_period(entry)?;
            self.seal(entry);
            return Ok(());
        }

        if level == 88 {
            if self.at_kind(TokenKind::Word) {
                self.bump_into(entry);
            }
            let c = self.open(ContextKind::ConditionValueClause, entry);
            self.eat_any_word(c, &["VALUE", "VALUES"]);
            self.eat_any_word(c, &["IS", "ARE"]);
            while !self.at_end() && !self.at_kind(TokenKind::Period) {
                if self
                    .cur()
                    .is_some_and(|t| t.is_literal() || (t.kind == TokenKind::Word && is_figurative(&t.text)))
                {
                    self.parse_literal(c);
                } else if self.at_any_word(&["THRU", "THROUGH"]) {
                    self.bump_into(c);
                } else {
                    self.bump_into(c);
                }
            }
            self.seal(c);
            self.expect_period(entry)?;
            self.seal(entry);
            return Ok(());
        }

        // Entry name or FILLER; absent for anonymous entries.
        if self.at_kind(TokenKind::Word) && !self.at_any_word(DATA_CLAUSE_WORDS) {
            self.bump_into(entry);
        }

        while !self.at_end() && !self.at_kind(TokenKind::Period) {
            if self.at_word("REDEFINES") {
                let c = self.open(ContextKind::RedefinesClause, entry);
                self.bump_into(c);
                if self.at_kind(TokenKind::Word) {
                    self.bump_into(c);
                }
                self.seal(c);
            } else if self.at_word("PIC") || self.at_word("PICTURE") {
                let c = self.open(ContextKind::PictureClause, entry);
                self.bump_into(c);
                self.eat_word(c, "IS");
                if self.at_kind(TokenKind::Picture) {
                    self.bump_into(c);
                }
                self.seal(c);
            } else if self.at_word("USAGE") {
                let c = self.open(ContextKind::UsageClause, entry);
                self.bump_into(c);
                self.eat_word(c, "IS");
                if self.at_kind(TokenKind::Word) {
                    self.bump_into(c);
                }
                self.seal(c);
            } else if self.at_any_word(USAGE_WORDS) {
                let c = self.open(ContextKind::UsageClause, entry);
                self.bump_into(c);
                self.seal(c);
            } else if self.at_word("SIGN") {
                let c = self.open(ContextKind::SignClause, entry);
                self.bump_into(c);
                self.eat_word(c, "IS");
                self.eat_any_word(c, &["LEADING", "TRAILING"]);
                self.eat_word(c, "SEPARATE");
                self.eat_word(c, "CHARACTER");
                self.seal(c);
            } else if self.at_word("OCCURS") {
                let c = self.open(ContextKind::OccursClause, entry);
                self.bump_into(c);
                if self.at_kind(TokenKind::Integer) {
                    self.bump_into(c);
                }
                if self.eat_word(c, "TO") {
                    if self.at_kind(TokenKind::Integer) {
                        self.bump_into(c);
                    }
                }
                self.eat_word(c, "TIMES");
                if self.eat_word(c, "DEPENDING") {
                    self.eat_word(c, "ON");
                    self.parse_qualified_name(c)?;
                }
                while self.at_any_word(&["ASCENDING", "DESCENDING"]) {
                    self.bump_into(c);
                    self.eat_word(c, "KEY");
                    self.eat_word(c, "IS");
                    while self.at_kind(TokenKind::Word)
                        && !self.at_any_word(&["INDEXED", "ASCENDING", "DESCENDING"])
                        && !self.at_any_word(DATA_CLAUSE_WORDS)
                    {
                        self.bump_into(c);
                    }
                }
                if self.eat_word(c, "INDEXED") {
                    self.eat_word(c, "BY");
                    while self.at_kind(TokenKind::Word) && !self.at_any_word(DATA_CLAUSE_WORDS) {
                        self.bump_into(c);
                    }
                }
                self.seal(c);
            } else if self.at_word("VALUE") || self.at_word("VALUES") {
                let c = self.open(ContextKind::ValueClause, entry);
                self.bump_into(c);
                self.eat_any_word(c, &["IS", "ARE"]);
                while self.cur().is_some_and(|t| {
                    t.is_literal() || (t.kind == TokenKind::Word && is_figurative(&t.text))
                }) || self.at_any_word(&["THRU", "THROUGH"])
                {
                    self.bump_into(c);
                }
                self.seal(c);
            } else if self.at_word("GLOBAL") {
                let c = self.open(ContextKind::GlobalClause, entry);
                self.bump_into(c);
                self.seal(c);
            } else if self.at_word("EXTERNAL") {
                let c = self.open(ContextKind::ExternalClause, entry);
                self.bump_into(c);
                self.seal(c);
            } else {
                self.bump_into(entry);
            }
        }

        self.expect_period(entry)?;
        self.seal(entry);
        Ok(())
    }

    // ── Procedure division ─────────────────────────────────────────────

    fn parse_procedure_division(&mut self, pu: ContextId) -> Result<()> {
        let div = self.open(ContextKind::ProcedureDivision, pu);
        self.bump_into(div); // PROCEDURE
        self.expect_word(div, "DIVISION")?;

        if self.at_word("USING") || self.at_word("RETURNING") {
            let hdr = self.open(ContextKind::ProcedureDivisionHeader, div);
            if self.eat_word(hdr, "USING") {
                while self.at_kind(TokenKind::Word) && !self.at_word("RETURNING") {
                    if self.at_any_word(&["BY", "REFERENCE", "CONTENT", "VALUE"]) {
                        self.bump_into(hdr);
                        continue;
                    }
                    self.parse_qualified_name(hdr)?;
                }
            }
            if self.eat_word(hdr, "RETURNING") {
                self.parse_qualified_name(hdr)?;
            }
            self.seal(hdr);
        }
        self.expect_period(div)?;

        if self.at_word("DECLARATIVES") {
            let dec = self.open(ContextKind::Declaratives, div);
            self.bump_into(dec);
            self.eat_period(dec);
            while !self.at_end() && !(self.at_word("END") && self.peek_word(1, "DECLARATIVES")) {
                self.bump_into(dec);
            }
            self.eat_word(dec, "END");
            self.eat_word(dec, "DECLARATIVES");
            self.eat_period(dec);
            self.seal(dec);
        }

        while !self.at_procedure_end() {
            if self.at_section_start() {
                self.parse_procedure_section(div)?;
            } else if self.at_paragraph_start() {
                self.parse_paragraph(div)?;
            } else {
                self.parse_sentence(div)?;
            }
        }

        self.seal(div);
        Ok(())
    }

    fn parse_procedure_section(&mut self, div: ContextId) -> Result<()> {
        let sec = self.open(ContextKind::ProcedureSection, div);
        self.bump_into(sec); // name
        self.bump_into(sec); // SECTION
        if self.at_kind(TokenKind::Integer) {
            self.bump_into(sec); // segment priority
        }
        self.expect_period(sec)?;

        while !self.at_procedure_end() && !self.at_section_start() {
            if self.at_paragraph_start() {
                self.parse_paragraph(sec)?;
            } else {
                self.parse_sentence(sec)?;
            }
        }

        self.seal(sec);
        Ok(())
    }

    fn parse_paragraph(&mut self, parent: ContextId) -> Result<()> {
        let par = self.open(ContextKind::Paragraph, parent);
        self.bump_into(par); // name
        self.expect_period(par)?;

        while !self.at_procedure_end() && !self.at_section_start() && !self.at_paragraph_start() {
            self.parse_sentence(par)?;
        }

        self.seal(par);
        Ok(())
    }

    fn parse_sentence(&mut self, parent: ContextId) -> Result<()> {
        let sentence = self.open(ContextKind::Sentence, parent);
        while !self.at_kind(TokenKind::Period) && !self.at_procedure_end() {
            self.parse_statement_or_bump(sentence)?;
        }
        self.eat_period(sentence);
        self.seal(sentence);
        Ok(())
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn parse_move_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::MoveStatement, parent);
        self.bump_into(st); // MOVE
        self.eat_any_word(st, &["CORRESPONDING", "CORR"]);
        self.parse_operand(st)?;
        self.expect_word(st, "TO")?;
        while self.at_name() {
            self.parse_qualified_name(st)?;
        }
        self.seal(st);
        Ok(())
    }

    fn parse_display_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::DisplayStatement, parent);
        self.bump_into(st); // DISPLAY
        loop {
            if self.at_word("UPON") {
                self.bump_into(st);
                let m = self.open(ContextKind::MnemonicName, st);
                if self.at_kind(TokenKind::Word) {
                    self.bump_into(m);
                }
                self.seal(m);
            } else if self.at_any_word(&["WITH", "NO", "ADVANCING"]) {
                self.bump_into(st);
            } else if self
                .cur()
                .is_some_and(|t| t.is_literal() || (t.kind == TokenKind::Word && is_figurative(&t.text)))
            {
                self.parse_literal(st);
            } else if self.at_name() {
                self.parse_qualified_name(st)?;
            } else {
                break;
            }
        }
        self.seal(st);
        Ok(())
    }

    fn parse_accept_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::AcceptStatement, parent);
        self.bump_into(st); // ACCEPT
        if self.at_name() {
            self.parse_qualified_name(st)?;
        }
        if self.eat_word(st, "FROM") {
            if self.at_any_word(&["DATE", "DAY", "DAY-OF-WEEK", "TIME"]) {
                self.bump_into(st);
                self.eat_word(st, "YYYYMMDD");
                self.eat_word(st, "YYYYDDD");
            } else if self.at_kind(TokenKind::Word) {
                let m = self.open(ContextKind::MnemonicName, st);
                self.bump_into(m);
                self.seal(m);
            }
        }
        self.seal(st);
        Ok(())
    }

    fn parse_perform_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::PerformStatement, parent);
        self.bump_into(st); // PERFORM

        let procedure_form = self.cur().is_some_and(|t| {
            t.kind == TokenKind::Word
                && !is_verb(&t.text)
                && !t.is_word("UNTIL")
                && !t.is_word("VARYING")
                && !t.is_word("WITH")
                && !t.is_word("TEST")
                && !t.is_word("TIMES")
                && !t.text.to_ascii_uppercase().starts_with("END-")
        });

        if procedure_form {
            self.parse_procedure_name(st)?;
            if self.eat_any_word(st, &["THRU", "THROUGH"]) {
                self.parse_procedure_name(st)?;
            }
            if self.at_kind(TokenKind::Integer) && self.peek_word(1, "TIMES") {
                self.parse_literal(st);
                self.bump_into(st); // TIMES
            } else if self.at_name() && self.peek_word(1, "TIMES") {
                self.parse_qualified_name(st)?;
                self.bump_into(st); // TIMES
            }
            if self.eat_word(st, "UNTIL") {
                self.parse_condition(st)?;
            }
            self.seal(st);
            return Ok(());
        }

        // Inline form, with optional iteration phrases before the body.
        if self.eat_word(st, "WITH") {
            self.eat_word(st, "TEST");
            self.eat_any_word(st, &["BEFORE", "AFTER"]);
        }
        if self.at_kind(TokenKind::Integer) && self.peek_word(1, "TIMES") {
            self.parse_literal(st);
            self.bump_into(st);
        }
        if self.eat_word(st, "VARYING") {
            self.parse_qualified_name(st)?;
            if self.eat_word(st, "FROM") {
                self.parse_operand(st)?;
            }
            if self.eat_word(st, "BY") {
                self.parse_operand(st)?;
            }
        }
        if self.eat_word(st, "UNTIL") {
            self.parse_condition(st)?;
        }

        while !self.at_scope_terminator()
            && !self.at_kind(TokenKind::Period)
            && !self.at_procedure_end()
        {
            self.parse_statement_or_bump(st)?;
        }
        self.eat_word(st, "END-PERFORM");
        self.seal(st);
        Ok(())
    }

    fn parse_if_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::IfStatement, parent);
        self.bump_into(st); // IF
        self.parse_condition(st)?;
        self.eat_word(st, "THEN");

        while !self.at_scope_terminator()
            && !self.at_kind(TokenKind::Period)
            && !self.at_procedure_end()
        {
            self.parse_statement_or_bump(st)?;
        }
        if self.eat_word(st, "ELSE") {
            while !self.at_scope_terminator()
                && !self.at_kind(TokenKind::Period)
                && !self.at_procedure_end()
            {
                self.parse_statement_or_bump(st)?;
            }
        }
        self.eat_word(st, "END-IF");
        self.seal(st);
        Ok(())
    }

    fn parse_goto_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::GoToStatement, parent);
        self.bump_into(st); // GO
        self.eat_word(st, "TO");
        while matches!(
            self.cur().map(|t| t.kind),
            Some(TokenKind::Word) | Some(TokenKind::Integer)
        ) && !self.at_statement_start()
            && !self.at_scope_terminator()
            && !self.at_word("DEPENDING")
        {
            self.parse_procedure_name(st)?;
        }
        if self.eat_word(st, "DEPENDING") {
            self.eat_word(st, "ON");
            self.parse_qualified_name(st)?;
        }
        self.seal(st);
        Ok(())
    }

    fn parse_call_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::CallStatement, parent);
        self.bump_into(st); // CALL
        self.parse_operand(st)?;
        if self.eat_word(st, "USING") {
            loop {
                if self.at_any_word(&["BY", "REFERENCE", "CONTENT", "VALUE"]) {
                    self.bump_into(st);
                    continue;
                }
                if self.at_operand_start() {
                    self.parse_operand(st)?;
                    continue;
                }
                break;
            }
        }
        if self.eat_word(st, "RETURNING") {
            self.parse_qualified_name(st)?;
        }
        self.seal(st);
        Ok(())
    }

    fn parse_add_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::AddStatement, parent);
        self.bump_into(st); // ADD
        while self.at_operand_start() && !self.at_word("TO") && !self.at_word("GIVING") {
            self.parse_operand(st)?;
        }
        if self.eat_word(st, "TO") {
            while self.at_name() && !self.at_word("GIVING") {
                self.parse_qualified_name(st)?;
                self.eat_word(st, "ROUNDED");
            }
        }
        if self.eat_word(st, "GIVING") {
            while self.at_name() {
                self.parse_qualified_name(st)?;
                self.eat_word(st, "ROUNDED");
            }
        }
        self.seal(st);
        Ok(())
    }

    fn parse_subtract_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::SubtractStatement, parent);
        self.bump_into(st); // SUBTRACT
        while self.at_operand_start() && !self.at_word("FROM") {
            self.parse_operand(st)?;
        }
        if self.eat_word(st, "FROM") {
            while self.at_name() && !self.at_word("GIVING") {
                self.parse_qualified_name(st)?;
                self.eat_word(st, "ROUNDED");
            }
        }
        if self.eat_word(st, "GIVING") {
            while self.at_name() {
                self.parse_qualified_name(st)?;
                self.eat_word(st, "ROUNDED");
            }
        }
        self.seal(st);
        Ok(())
    }

    fn parse_multiply_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::MultiplyStatement, parent);
        self.bump_into(st); // MULTIPLY
        self.parse_operand(st)?;
        if self.eat_word(st, "BY") {
            self.parse_operand(st)?;
        }
        if self.eat_word(st, "GIVING") {
            while self.at_name() {
                self.parse_qualified_name(st)?;
                self.eat_word(st, "ROUNDED");
            }
        }
        self.seal(st);
        Ok(())
    }

    fn parse_divide_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::DivideStatement, parent);
        self.bump_into(st); // DIVIDE
        self.parse_operand(st)?;
        if self.eat_any_word(st, &["INTO", "BY"]) {
            self.parse_operand(st)?;
        }
        if self.eat_word(st, "GIVING") {
            while self.at_name() && !self.at_word("REMAINDER") {
                self.parse_qualified_name(st)?;
                self.eat_word(st, "ROUNDED");
            }
        }
        if self.eat_word(st, "REMAINDER") {
            self.parse_qualified_name(st)?;
        }
        self.seal(st);
        Ok(())
    }

    fn parse_compute_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::ComputeStatement, parent);
        self.bump_into(st); // COMPUTE
        while self.at_name() {
            self.parse_qualified_name(st)?;
            self.eat_word(st, "ROUNDED");
        }
        if self.at_kind(TokenKind::Op) && self.cur_text() == "=" {
            self.bump_into(st);
        } else if self.at_word("EQUAL") {
            self.bump_into(st);
            self.eat_word(st, "TO");
        }

        let expr = self.open(ContextKind::ArithmeticExpression, st);
        while !self.at_end()
            && !self.at_kind(TokenKind::Period)
            && !self.at_statement_start()
            && !self.at_scope_terminator()
            && !self.at_procedure_end()
        {
            let tok = self.cur().expect("not at end");
            if tok.is_literal() {
                self.parse_literal(expr);
            } else if tok.kind == TokenKind::Word && !is_verb(&tok.text) {
                self.parse_qualified_name(expr)?;
            } else {
                self.bump_into(expr);
            }
        }
        self.seal(expr);
        self.seal(st);
        Ok(())
    }

    fn parse_open_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::OpenStatement, parent);
        self.bump_into(st); // OPEN
        loop {
            if self.at_any_word(&["INPUT", "OUTPUT", "I-O", "EXTEND"]) {
                self.bump_into(st);
            } else if self.at_name() {
                self.parse_qualified_name(st)?;
            } else {
                break;
            }
        }
        self.seal(st);
        Ok(())
    }

    fn parse_close_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::CloseStatement, parent);
        self.bump_into(st); // CLOSE
        while self.at_name() {
            self.parse_qualified_name(st)?;
            self.eat_word(st, "WITH");
            self.eat_word(st, "LOCK");
        }
        self.seal(st);
        Ok(())
    }

    /// Conditional phrases (AT END, INVALID KEY, NOT ...) and the closing
    /// scope terminator shared by the file I/O statements.
    fn parse_io_tail(&mut self, st: ContextId, end_word: &str) -> Result<()> {
        loop {
            if self.at_word(end_word) {
                self.bump_into(st);
                break;
            }
            if self.at_kind(TokenKind::Period) || self.at_procedure_end() {
                break;
            }
            if self.at_any_word(&["AT", "END", "INVALID", "KEY", "NOT"]) {
                self.bump_into(st);
                continue;
            }
            // A foreign terminator (END-IF, ELSE, ...) closes this
            // statement implicitly and belongs to the enclosing one.
            if self.at_scope_terminator() {
                break;
            }
            self.parse_statement_or_bump(st)?;
        }
        Ok(())
    }

    fn parse_read_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::ReadStatement, parent);
        self.bump_into(st); // READ
        if self.at_name() {
            self.parse_qualified_name(st)?;
        }
        self.eat_word(st, "NEXT");
        self.eat_word(st, "RECORD");
        if self.eat_word(st, "INTO") {
            self.parse_qualified_name(st)?;
        }
        if self.eat_word(st, "KEY") {
            self.eat_word(st, "IS");
            self.parse_qualified_name(st)?;
        }
        self.parse_io_tail(st, "END-READ")?;
        self.seal(st);
        Ok(())
    }

    fn parse_write_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::WriteStatement, parent);
        self.bump_into(st); // WRITE
        if self.at_name() {
            self.parse_qualified_name(st)?;
        }
        if self.eat_word(st, "FROM") {
            self.parse_operand(st)?;
        }
        if self.at_any_word(&["BEFORE", "AFTER"]) {
            self.bump_into(st);
            self.eat_word(st, "ADVANCING");
            if self.at_kind(TokenKind::Integer) {
                self.parse_literal(st);
                self.eat_any_word(st, &["LINE", "LINES"]);
            } else if self.at_word("PAGE") {
                self.bump_into(st);
            } else if self.at_name() {
                self.parse_qualified_name(st)?;
                self.eat_any_word(st, &["LINE", "LINES"]);
            }
        }
        self.parse_io_tail(st, "END-WRITE")?;
        self.seal(st);
        Ok(())
    }

    fn parse_rewrite_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::RewriteStatement, parent);
        self.bump_into(st); // REWRITE
        if self.at_name() {
            self.parse_qualified_name(st)?;
        }
        if self.eat_word(st, "FROM") {
            self.parse_operand(st)?;
        }
        self.parse_io_tail(st, "END-REWRITE")?;
        self.seal(st);
        Ok(())
    }

    fn parse_delete_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::DeleteStatement, parent);
        self.bump_into(st); // DELETE
        if self.at_name() {
            self.parse_qualified_name(st)?;
        }
        self.eat_word(st, "RECORD");
        self.parse_io_tail(st, "END-DELETE")?;
        self.seal(st);
        Ok(())
    }

    fn parse_start_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::StartStatement, parent);
        self.bump_into(st); // START
        if self.at_name() {
            self.parse_qualified_name(st)?;
        }
        if self.eat_word(st, "KEY") {
            while self.at_any_word(&["IS", "EQUAL", "GREATER", "LESS", "THAN", "TO", "NOT", "OR"])
                || self.at_kind(TokenKind::Op)
            {
                self.bump_into(st);
            }
            if self.at_name() {
                self.parse_qualified_name(st)?;
            }
        }
        self.parse_io_tail(st, "END-START")?;
        self.seal(st);
        Ok(())
    }

    fn parse_stop_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::StopStatement, parent);
        self.bump_into(st); // STOP
        if self.at_word("RUN") {
            self.bump_into(st);
        } else if self.cur().is_some_and(|t| t.is_literal()) {
            self.parse_literal(st);
        }
        self.seal(st);
        Ok(())
    }

    fn parse_goback_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::GobackStatement, parent);
        self.bump_into(st);
        self.seal(st);
        Ok(())
    }

    fn parse_exit_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::ExitStatement, parent);
        self.bump_into(st); // EXIT
        self.eat_any_word(st, &["PROGRAM", "PARAGRAPH", "SECTION", "PERFORM"]);
        self.seal(st);
        Ok(())
    }

    fn parse_continue_statement(&mut self, parent: ContextId) -> Result<()> {
        let st = self.open(ContextKind::ContinueStatement, parent);
        self.bump_into(st);
        self.seal(st);
        Ok(())
    }

    fn parse_exec_statement(&mut self, parent: ContextId) -> Result<()> {
        let kind = if self.peek_word(1, "SQL") {
            ContextKind::ExecSqlStatement
        } else {
            ContextKind::ExecCicsStatement
        };
        let st = self.open(kind, parent);
        self.bump_into(st); // EXEC
        if self.at_kind(TokenKind::Word) {
            self.bump_into(st); // subsystem
        }
        if self.at_kind(TokenKind::RawText) {
            self.bump_into(st);
        }
        self.expect_word(st, "END-EXEC")?;
        self.seal(st);
        Ok(())
    }

    // Statements parsed as a shallow token run with operand contexts.

    fn parse_generic_statement(
        &mut self,
        parent: ContextId,
        kind: ContextKind,
        end_word: Option<&str>,
    ) -> Result<()> {
        let st = self.open(kind, parent);
        self.bump_into(st); // verb
        loop {
            if let Some(end) = end_word {
                if self.at_word(end) {
                    self.bump_into(st);
                    break;
                }
            }
            if self.at_end() || self.at_kind(TokenKind::Period) || self.at_procedure_end() {
                break;
            }
            if end_word.is_none() && (self.at_statement_start() || self.at_scope_terminator()) {
                break;
            }
            let tok = self.cur().expect("not at end");
            if tok.is_literal() || (tok.kind == TokenKind::Word && is_figurative(&tok.text)) {
                self.parse_literal(st);
            } else if tok.kind == TokenKind::Word
                && !is_verb(&tok.text)
                && !is_condition_word(&tok.text)
                && !is_generic_keyword(&tok.text)
            {
                self.parse_qualified_name(st)?;
            } else if end_word.is_some() && self.at_statement_start() {
                self.parse_statement(st)?;
            } else {
                self.bump_into(st);
            }
        }
        self.seal(st);
        Ok(())
    }

    fn parse_set_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::SetStatement, None)
    }
    fn parse_initialize_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::InitializeStatement, None)
    }
    fn parse_inspect_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::InspectStatement, None)
    }
    fn parse_string_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::StringStatement, Some("END-STRING"))
    }
    fn parse_unstring_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::UnstringStatement, Some("END-UNSTRING"))
    }
    fn parse_evaluate_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::EvaluateStatement, Some("END-EVALUATE"))
    }
    fn parse_search_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::SearchStatement, Some("END-SEARCH"))
    }
    fn parse_sort_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::SortStatement, None)
    }
    fn parse_merge_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::MergeStatement, None)
    }
    fn parse_release_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::ReleaseStatement, None)
    }
    fn parse_return_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::ReturnStatement, Some("END-RETURN"))
    }
    fn parse_cancel_statement(&mut self, p: ContextId) -> Result<()> {
        self.parse_generic_statement(p, ContextKind::CancelStatement, None)
    }
}

const GENERIC_KEYWORDS: &[&str] = &[
    "WHEN",
    "OTHER",
    "ALSO",
    "ANY",
    "TRUE",
    "FALSE",
    "THRU",
    "THROUGH",
    "LEADING",
    "TRAILING",
    "REPLACING",
    "CONVERTING",
    "TALLYING",
    "FOR",
    "CHARACTERS",
    "BEFORE",
    "AFTER",
    "INITIAL",
    "BY",
    "INTO",
    "FROM",
    "WITH",
    "POINTER",
    "OVERFLOW",
    "DELIMITED",
    "SIZE",
    "COUNT",
    "DELIMITER",
    "ON",
    "UP",
    "DOWN",
    "ASCENDING",
    "DESCENDING",
    "KEY",
    "DUPLICATES",
    "USING",
    "GIVING",
    "COLLATING",
    "SEQUENCE",
    "INPUT",
    "OUTPUT",
    "PROCEDURE",
    "AT",
    "END",
    "INVALID",
    "REFERENCE",
    "CONTENT",
    "VALUE",
    "TEST",
    "VARYING",
    "UNTIL",
    "INDEX",
];

fn is_generic_keyword(word: &str) -> bool {
    GENERIC_KEYWORDS.iter().any(|w| word.eq_ignore_ascii_case(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::scan;
    use crate::span::FileId;

    fn parse_text(text: &str) -> ParseTree {
        let tokens = scan(text, FileId::MAIN, "t.cbl").unwrap();
        parse(text, tokens, TreeId(0), "t.cbl").unwrap()
    }

    fn find_all(tree: &ParseTree, kind: ContextKind) -> Vec<ContextId> {
        tree.descendants(tree.root())
            .into_iter()
            .filter(|c| tree.kind(*c) == kind)
            .collect()
    }

    #[test]
    fn hello_program_shape() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. HELLO. PROCEDURE DIVISION. DISPLAY \"HI\".",
        );
        assert_eq!(find_all(&tree, ContextKind::CompilationUnit).len(), 1);
        assert_eq!(find_all(&tree, ContextKind::ProgramUnit).len(), 1);
        assert_eq!(find_all(&tree, ContextKind::IdentificationDivision).len(), 1);
        assert_eq!(find_all(&tree, ContextKind::ProcedureDivision).len(), 1);

        let display = find_all(&tree, ContextKind::DisplayStatement);
        assert_eq!(display.len(), 1);
        let lits = tree.children_of_kind(display[0], ContextKind::Literal);
        assert_eq!(lits.len(), 1);
        assert_eq!(tree.token_text(lits[0]), "\"HI\"");
    }

    #[test]
    fn program_id_name_is_captured() {
        let tree = parse_text("IDENTIFICATION DIVISION. PROGRAM-ID. PAYROLL.");
        let pid = find_all(&tree, ContextKind::ProgramIdParagraph)[0];
        let words = tree.words(pid);
        assert!(words.contains(&"PAYROLL"));
    }

    #[test]
    fn data_division_levels_nest_in_tree_order() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. T.\n\
             DATA DIVISION.\n\
             WORKING-STORAGE SECTION.\n\
             01 CUSTOMER.\n\
                05 CUST-NAME PIC X(20).\n\
                05 AMOUNT PIC 9(5).\n\
             77 COUNTER PIC 9(4).",
        );
        let entries = find_all(&tree, ContextKind::DataDescriptionEntry);
        assert_eq!(entries.len(), 4);
        let pics = find_all(&tree, ContextKind::PictureClause);
        assert_eq!(pics.len(), 3);
    }

    #[test]
    fn condition_value_entry() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. T.\n\
             DATA DIVISION. WORKING-STORAGE SECTION.\n\
             01 FLAG PIC X.\n\
                88 FLAG-ON VALUE \"Y\".\n\
                88 FLAG-OFF VALUE \"N\".",
        );
        assert_eq!(find_all(&tree, ContextKind::ConditionValueClause).len(), 2);
    }

    #[test]
    fn select_entry_clauses() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. T.\n\
             ENVIRONMENT DIVISION.\n\
             INPUT-OUTPUT SECTION.\n\
             FILE-CONTROL.\n\
                 SELECT CUST-FILE ASSIGN TO \"CUST.DAT\"\n\
                     ORGANIZATION IS INDEXED\n\
                     ACCESS MODE IS RANDOM\n\
                     RECORD KEY IS CUST-ID\n\
                     FILE STATUS IS WS-STATUS.",
        );
        let entries = find_all(&tree, ContextKind::FileControlEntry);
        assert_eq!(entries.len(), 1);
        assert!(tree.find_child(entries[0], ContextKind::AssignClause).is_some());
        assert!(tree.find_child(entries[0], ContextKind::OrganizationClause).is_some());
        assert!(tree.find_child(entries[0], ContextKind::AccessModeClause).is_some());
        assert!(tree.find_child(entries[0], ContextKind::RecordKeyClause).is_some());
        assert!(tree.find_child(entries[0], ContextKind::FileStatusClause).is_some());
    }

    #[test]
    fn fd_with_record_entries() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. T.\n\
             DATA DIVISION.\n\
             FILE SECTION.\n\
             FD CUST-FILE\n\
                 LABEL RECORDS ARE STANDARD.\n\
             01 CUST-REC.\n\
                05 CUST-ID PIC 9(6).",
        );
        let fds = find_all(&tree, ContextKind::FileDescriptionEntry);
        assert_eq!(fds.len(), 1);
        // Record entries nest inside the FD context (flat; levels nest in the ASG).
        let entries = tree.children_of_kind(fds[0], ContextKind::DataDescriptionEntry);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn qualified_name_with_of() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. T. PROCEDURE DIVISION.\n\
             MOVE AMOUNT OF CUSTOMER TO AMOUNT OF ORDER-REC.",
        );
        let names = find_all(&tree, ContextKind::QualifiedDataName);
        assert_eq!(names.len(), 2);
        assert_eq!(tree.token_text(names[0]), "AMOUNT OF CUSTOMER");
        assert_eq!(tree.token_text(names[1]), "AMOUNT OF ORDER-REC");
    }

    #[test]
    fn paragraphs_and_sections() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. T. PROCEDURE DIVISION.\n\
             MAIN-SECTION SECTION.\n\
             PARA-1.\n\
                 DISPLAY \"A\".\n\
             PARA-2.\n\
                 DISPLAY \"B\".\n\
                 STOP RUN.",
        );
        assert_eq!(find_all(&tree, ContextKind::ProcedureSection).len(), 1);
        assert_eq!(find_all(&tree, ContextKind::Paragraph).len(), 2);
        assert_eq!(find_all(&tree, ContextKind::StopStatement).len(), 1);
    }

    #[test]
    fn if_with_else_nests_statements() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. T. PROCEDURE DIVISION.\n\
             IF WS-X = 1\n\
                 DISPLAY \"ONE\"\n\
             ELSE\n\
                 DISPLAY \"OTHER\"\n\
             END-IF.",
        );
        let ifs = find_all(&tree, ContextKind::IfStatement);
        assert_eq!(ifs.len(), 1);
        assert!(tree.find_child(ifs[0], ContextKind::Condition).is_some());
        assert_eq!(
            tree.children_of_kind(ifs[0], ContextKind::DisplayStatement).len(),
            2
        );
    }

    #[test]
    fn exec_sql_keeps_payload() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. T. PROCEDURE DIVISION.\n\
             EXEC SQL SELECT 1 FROM DUAL END-EXEC.",
        );
        let execs = find_all(&tree, ContextKind::ExecSqlStatement);
        assert_eq!(execs.len(), 1);
        let raw = tree
            .child_tokens(execs[0])
            .find(|t| t.kind == TokenKind::RawText)
            .unwrap();
        assert_eq!(raw.text, "SELECT 1 FROM DUAL");
    }

    #[test]
    fn nested_program_units() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. OUTER.\n\
             PROCEDURE DIVISION.\n\
                 DISPLAY \"O\".\n\
             IDENTIFICATION DIVISION. PROGRAM-ID. INNER.\n\
             PROCEDURE DIVISION.\n\
                 DISPLAY \"I\".\n\
             END PROGRAM INNER.\n\
             END PROGRAM OUTER.",
        );
        let units = find_all(&tree, ContextKind::CompilationUnit);
        assert_eq!(units.len(), 2);
        // The inner unit is a descendant of the outer one.
        let outer = units[0];
        assert!(tree
            .descendants(outer)
            .iter()
            .filter(|c| tree.kind(**c) == ContextKind::CompilationUnit)
            .count()
            == 2);
    }

    #[test]
    fn multiple_top_level_units() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. FIRST-PROG.\n\
             PROCEDURE DIVISION. DISPLAY \"1\".\n\
             END PROGRAM FIRST-PROG.\n\
             IDENTIFICATION DIVISION. PROGRAM-ID. SECOND-PROG.\n\
             PROCEDURE DIVISION. DISPLAY \"2\".\n\
             END PROGRAM SECOND-PROG.",
        );
        let units = tree.children_of_kind(tree.root(), ContextKind::CompilationUnit);
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn perform_until_with_condition() {
        let tree = parse_text(
            "IDENTIFICATION DIVISION. PROGRAM-ID. T. PROCEDURE DIVISION.\n\
             MAIN-PARA.\n\
                 PERFORM WORK-PARA UNTIL WS-DONE = \"Y\".\n\
             WORK-PARA.\n\
                 CONTINUE.",
        );
        let performs = find_all(&tree, ContextKind::PerformStatement);
        assert_eq!(performs.len(), 1);
        assert!(tree.find_child(performs[0], ContextKind::ProcedureName).is_some());
        assert!(tree.find_child(performs[0], ContextKind::Condition).is_some());
    }

    #[test]
    fn garbage_fails_with_parse_error() {
        let tokens = scan("MOVE A TO B.", FileId::MAIN, "t.cbl").unwrap();
        let err = parse("MOVE A TO B.", tokens, TreeId(0), "t.cbl").unwrap_err();
        assert!(matches!(err, AsgError::ParseError { .. }));
    }
}
