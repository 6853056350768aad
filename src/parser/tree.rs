//! The parse tree the ASG builder consumes.
//!
//! The grammar front-end produces a tree of *contexts*, one per grammar
//! production it recognized, each holding its child contexts and terminal
//! tokens in source order. The ASG builder never looks at the grammar
//! itself: it walks contexts, asks for their [`ContextKind`], and navigates
//! upward through parent links to find the element that owns a clause.
//!
//! Contexts live in an arena owned by the tree; [`ContextId`] is the only
//! handle that crosses module boundaries, which keeps the tree cheaply
//! navigable in both directions and serializable.

use serde::{Deserialize, Serialize};

use crate::parser::token::Token;
use crate::span::Span;

/// Identifies one parse tree within a program (one per source file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TreeId(pub u32);

/// Index of a context within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub u32);

/// A child slot: either a nested context or a terminal token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseChild {
    Context(ContextId),
    Token(u32),
}

macro_rules! context_kinds {
    (
        @structural { $($s:ident),* $(,)? }
        @statement { $($v:ident),* $(,)? }
    ) => {
        /// Grammar production kinds.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum ContextKind {
            $($s,)*
            $($v,)*
        }

        impl ContextKind {
            /// Production name for diagnostics.
            pub fn name(self) -> &'static str {
                match self {
                    $(ContextKind::$s => stringify!($s),)*
                    $(ContextKind::$v => stringify!($v),)*
                }
            }

            /// Whether this production is a procedure-division statement.
            pub fn is_statement(self) -> bool {
                matches!(self, $(ContextKind::$v)|*)
            }
        }
    };
}

context_kinds! {
    @structural {
        StartRule,
        CompilationUnit,
        ProgramUnit,
        EndProgramStatement,

        IdentificationDivision,
        ProgramIdParagraph,
        AuthorParagraph,
        InstallationParagraph,
        DateWrittenParagraph,
        DateCompiledParagraph,
        SecurityParagraph,
        RemarksParagraph,

        EnvironmentDivision,
        ConfigurationSection,
        SourceComputerParagraph,
        ObjectComputerParagraph,
        SpecialNamesParagraph,
        SpecialNameClause,
        InputOutputSection,
        FileControlParagraph,
        FileControlEntry,
        AssignClause,
        OrganizationClause,
        AccessModeClause,
        RecordKeyClause,
        AlternateRecordKeyClause,
        FileStatusClause,
        ReserveClause,
        PaddingCharacterClause,
        IoControlParagraph,

        DataDivision,
        FileSection,
        WorkingStorageSection,
        LocalStorageSection,
        LinkageSection,
        FileDescriptionEntry,
        BlockContainsClause,
        RecordContainsClause,
        LabelRecordsClause,
        DataRecordsClause,
        DataDescriptionEntry,
        RedefinesClause,
        PictureClause,
        UsageClause,
        SignClause,
        OccursClause,
        ValueClause,
        GlobalClause,
        ExternalClause,
        RenamesClause,
        ConditionValueClause,

        ProcedureDivision,
        ProcedureDivisionHeader,
        Declaratives,
        ProcedureSection,
        Paragraph,
        Sentence,

        QualifiedDataName,
        ProcedureName,
        MnemonicName,
        Literal,
        Condition,
        ArithmeticExpression,
    }
    @statement {
        MoveStatement,
        DisplayStatement,
        AcceptStatement,
        PerformStatement,
        IfStatement,
        EvaluateStatement,
        GoToStatement,
        CallStatement,
        AddStatement,
        SubtractStatement,
        MultiplyStatement,
        DivideStatement,
        ComputeStatement,
        OpenStatement,
        CloseStatement,
        ReadStatement,
        WriteStatement,
        RewriteStatement,
        DeleteStatement,
        StartStatement,
        StopStatement,
        GobackStatement,
        ExitStatement,
        ContinueStatement,
        SetStatement,
        InitializeStatement,
        InspectStatement,
        StringStatement,
        UnstringStatement,
        SearchStatement,
        SortStatement,
        MergeStatement,
        ReleaseStatement,
        ReturnStatement,
        CancelStatement,
        ExecSqlStatement,
        ExecCicsStatement,
    }
}

/// One grammar context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub kind: ContextKind,
    pub parent: Option<ContextId>,
    pub children: Vec<ParseChild>,
    pub span: Span,
}

/// An arena of contexts plus the token stream they reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseTree {
    pub id: TreeId,
    contexts: Vec<Context>,
    tokens: Vec<Token>,
}

impl ParseTree {
    /// Create an empty tree over a token stream.
    pub fn new(id: TreeId, tokens: Vec<Token>) -> Self {
        Self {
            id,
            contexts: Vec::new(),
            tokens,
        }
    }

    /// Allocate a context.
    pub fn push_context(&mut self, kind: ContextKind, parent: Option<ContextId>) -> ContextId {
        let id = ContextId(self.contexts.len() as u32);
        self.contexts.push(Context {
            kind,
            parent,
            children: Vec::new(),
            span: Span::dummy(),
        });
        if let Some(p) = parent {
            self.contexts[p.0 as usize].children.push(ParseChild::Context(id));
        }
        id
    }

    /// Attach a token to a context and widen its span.
    pub fn attach_token(&mut self, ctx: ContextId, token_index: u32) {
        let span = self.tokens[token_index as usize].span;
        let c = &mut self.contexts[ctx.0 as usize];
        c.children.push(ParseChild::Token(token_index));
        c.span = if c.span == Span::dummy() {
            span
        } else {
            c.span.extend(span)
        };
    }

    /// Widen a context span with a child's span.
    pub fn widen(&mut self, ctx: ContextId, span: Span) {
        if span == Span::dummy() {
            return;
        }
        let c = &mut self.contexts[ctx.0 as usize];
        c.span = if c.span == Span::dummy() {
            span
        } else {
            c.span.extend(span)
        };
    }

    /// The root context (the first one allocated).
    pub fn root(&self) -> ContextId {
        ContextId(0)
    }

    pub fn kind(&self, ctx: ContextId) -> ContextKind {
        self.contexts[ctx.0 as usize].kind
    }

    pub fn parent(&self, ctx: ContextId) -> Option<ContextId> {
        self.contexts[ctx.0 as usize].parent
    }

    pub fn span(&self, ctx: ContextId) -> Span {
        self.contexts[ctx.0 as usize].span
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Direct child contexts, in source order.
    pub fn child_contexts(&self, ctx: ContextId) -> impl Iterator<Item = ContextId> + '_ {
        self.contexts[ctx.0 as usize]
            .children
            .iter()
            .filter_map(|c| match c {
                ParseChild::Context(id) => Some(*id),
                ParseChild::Token(_) => None,
            })
    }

    /// Direct terminal tokens, in source order.
    pub fn child_tokens(&self, ctx: ContextId) -> impl DoubleEndedIterator<Item = &Token> + '_ {
        self.contexts[ctx.0 as usize]
            .children
            .iter()
            .filter_map(|c| match c {
                ParseChild::Token(i) => Some(&self.tokens[*i as usize]),
                ParseChild::Context(_) => None,
            })
    }

    /// First direct child context of a kind.
    pub fn find_child(&self, ctx: ContextId, kind: ContextKind) -> Option<ContextId> {
        self.child_contexts(ctx).find(|c| self.kind(*c) == kind)
    }

    /// All direct child contexts of a kind.
    pub fn children_of_kind(&self, ctx: ContextId, kind: ContextKind) -> Vec<ContextId> {
        self.child_contexts(ctx)
            .filter(|c| self.kind(*c) == kind)
            .collect()
    }

    /// Direct token texts joined by single spaces.
    pub fn token_text(&self, ctx: ContextId) -> String {
        self.child_tokens(ctx)
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First direct word token text.
    pub fn first_word(&self, ctx: ContextId) -> Option<&str> {
        self.child_tokens(ctx)
            .find(|t| t.kind == crate::parser::token::TokenKind::Word)
            .map(|t| t.text.as_str())
    }

    /// All direct word token texts.
    pub fn words(&self, ctx: ContextId) -> Vec<&str> {
        self.child_tokens(ctx)
            .filter(|t| t.kind == crate::parser::token::TokenKind::Word)
            .map(|t| t.text.as_str())
            .collect()
    }

    /// The ordered child slots (contexts and tokens interleaved).
    pub fn children_slots(&self, ctx: ContextId) -> &[ParseChild] {
        &self.contexts[ctx.0 as usize].children
    }

    /// Token by stream index.
    pub fn token(&self, index: u32) -> &Token {
        &self.tokens[index as usize]
    }

    /// All token texts in a subtree, in source order, joined by spaces.
    pub fn deep_text(&self, ctx: ContextId) -> String {
        let mut parts: Vec<&str> = Vec::new();
        self.collect_deep(ctx, &mut parts);
        parts.join(" ")
    }

    fn collect_deep<'a>(&'a self, ctx: ContextId, out: &mut Vec<&'a str>) {
        for slot in &self.contexts[ctx.0 as usize].children {
            match slot {
                ParseChild::Token(i) => out.push(&self.tokens[*i as usize].text),
                ParseChild::Context(c) => self.collect_deep(*c, out),
            }
        }
    }

    /// Depth-first iterator over a subtree, parents before children.
    pub fn descendants(&self, ctx: ContextId) -> Vec<ContextId> {
        let mut out = Vec::new();
        let mut stack = vec![ctx];
        while let Some(c) = stack.pop() {
            out.push(c);
            let children: Vec<ContextId> = self.child_contexts(c).collect();
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::token::TokenKind;

    fn tok(text: &str, start: u32) -> Token {
        Token::new(
            TokenKind::Word,
            text,
            Span::main(start, start + text.len() as u32),
        )
    }

    #[test]
    fn parent_links_and_children() {
        let tokens = vec![tok("MOVE", 0), tok("A", 5)];
        let mut tree = ParseTree::new(TreeId(0), tokens);

        let root = tree.push_context(ContextKind::StartRule, None);
        let stmt = tree.push_context(ContextKind::MoveStatement, Some(root));
        tree.attach_token(stmt, 0);
        let operand = tree.push_context(ContextKind::QualifiedDataName, Some(stmt));
        tree.attach_token(operand, 1);

        assert_eq!(tree.parent(stmt), Some(root));
        assert_eq!(tree.parent(operand), Some(stmt));
        assert_eq!(tree.child_contexts(root).count(), 1);
        assert_eq!(tree.find_child(stmt, ContextKind::QualifiedDataName), Some(operand));
        assert_eq!(tree.first_word(operand), Some("A"));
    }

    #[test]
    fn statement_kinds_are_flagged() {
        assert!(ContextKind::MoveStatement.is_statement());
        assert!(ContextKind::ExecSqlStatement.is_statement());
        assert!(!ContextKind::Paragraph.is_statement());
        assert!(!ContextKind::QualifiedDataName.is_statement());
    }

    #[test]
    fn descendants_are_preorder() {
        let mut tree = ParseTree::new(TreeId(0), Vec::new());
        let root = tree.push_context(ContextKind::StartRule, None);
        let a = tree.push_context(ContextKind::CompilationUnit, Some(root));
        let b = tree.push_context(ContextKind::ProgramUnit, Some(a));
        let c = tree.push_context(ContextKind::CompilationUnit, Some(root));

        assert_eq!(tree.descendants(root), vec![root, a, b, c]);
    }

    #[test]
    fn token_text_joins_words() {
        let tokens = vec![tok("AMOUNT", 0), tok("OF", 7), tok("CUSTOMER", 10)];
        let mut tree = ParseTree::new(TreeId(0), tokens);
        let ctx = tree.push_context(ContextKind::QualifiedDataName, None);
        tree.attach_token(ctx, 0);
        tree.attach_token(ctx, 1);
        tree.attach_token(ctx, 2);
        assert_eq!(tree.token_text(ctx), "AMOUNT OF CUSTOMER");
    }
}
