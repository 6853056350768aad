//! Procedure division elements.
//!
//! The procedure-division pass creates sections, paragraphs, and statement
//! skeletons (the verb is known from the parse context); the
//! procedure-statement pass fills operands and resolves every name
//! reference. Statements nested inside IF or inline PERFORM bodies are
//! owned by their paragraph in source order, matching the walker's
//! nearest-owner protocol.

use serde::{Deserialize, Serialize};

use crate::asg::node::NodeId;
use crate::asg::reference::{ExpressionInfo, Operand, Reference};

/// The PROCEDURE DIVISION of a program unit.
#[derive(Debug, Clone, Default)]
pub struct ProcedureDivisionNode {
    /// USING parameters, resolved against the linkage section.
    pub using_params: Vec<Reference>,
    /// RETURNING parameter.
    pub returning: Option<Reference>,
    pub sections: Vec<NodeId>,
    /// Paragraphs not contained in any section.
    pub paragraphs: Vec<NodeId>,
    /// Statements preceding any paragraph or section.
    pub statements: Vec<NodeId>,
}

/// A procedure section.
#[derive(Debug, Clone)]
pub struct ProcedureSectionNode {
    pub name: String,
    pub paragraphs: Vec<NodeId>,
    /// Statements preceding the section's first paragraph.
    pub statements: Vec<NodeId>,
}

/// A paragraph.
#[derive(Debug, Clone)]
pub struct ParagraphNode {
    pub name: String,
    pub statements: Vec<NodeId>,
}

/// OPEN mode for one file group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenMode {
    Input,
    Output,
    InputOutput,
    Extend,
}

impl OpenMode {
    /// Map an OPEN mode word.
    pub fn from_word(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("INPUT") {
            Some(OpenMode::Input)
        } else if word.eq_ignore_ascii_case("OUTPUT") {
            Some(OpenMode::Output)
        } else if word.eq_ignore_ascii_case("I-O") {
            Some(OpenMode::InputOutput)
        } else if word.eq_ignore_ascii_case("EXTEND") {
            Some(OpenMode::Extend)
        } else {
            None
        }
    }
}

/// Statement payloads. Skeletons are created with empty operand fields;
/// the statement pass fills them without rewriting anything set earlier.
#[derive(Debug, Clone, Default)]
pub enum StatementKind {
    Move {
        sending: Option<Operand>,
        receiving: Vec<Operand>,
    },
    Display {
        operands: Vec<Operand>,
        upon: Option<Reference>,
    },
    Accept {
        target: Option<Operand>,
        /// DATE, DAY, DAY-OF-WEEK, or TIME when given.
        source: Option<String>,
        /// Mnemonic source from SPECIAL-NAMES.
        mnemonic: Option<Reference>,
    },
    Perform {
        /// Target procedure (and THRU end), empty for inline bodies.
        procedures: Vec<Reference>,
        times: Option<Operand>,
        until: Option<ExpressionInfo>,
    },
    If {
        condition: Option<ExpressionInfo>,
    },
    GoTo {
        targets: Vec<Reference>,
    },
    Call {
        target: Option<Operand>,
        using_params: Vec<Operand>,
    },
    Add {
        operands: Vec<Operand>,
        targets: Vec<Operand>,
    },
    Subtract {
        operands: Vec<Operand>,
        targets: Vec<Operand>,
    },
    Multiply {
        operands: Vec<Operand>,
        targets: Vec<Operand>,
    },
    Divide {
        operands: Vec<Operand>,
        targets: Vec<Operand>,
    },
    Compute {
        targets: Vec<Operand>,
        expression: Option<ExpressionInfo>,
    },
    Open {
        files: Vec<(OpenMode, Reference)>,
    },
    Close {
        files: Vec<Reference>,
    },
    Read {
        file: Option<Reference>,
        into: Option<Operand>,
    },
    Write {
        record: Option<Reference>,
        from: Option<Operand>,
    },
    Rewrite {
        record: Option<Reference>,
        from: Option<Operand>,
    },
    Delete {
        file: Option<Reference>,
    },
    Start {
        file: Option<Reference>,
    },
    StopRun,
    Goback,
    Exit,
    #[default]
    Continue,
    ExecSql {
        payload: String,
    },
    ExecCics {
        payload: String,
    },
    /// Statements carried with a shallow operand list (SET, INITIALIZE,
    /// INSPECT, STRING, UNSTRING, EVALUATE, SEARCH, SORT, MERGE, RELEASE,
    /// RETURN, CANCEL).
    Other {
        verb: String,
        operands: Vec<Operand>,
    },
}

impl StatementKind {
    /// The verb this statement was written with.
    pub fn verb(&self) -> &str {
        match self {
            StatementKind::Move { .. } => "MOVE",
            StatementKind::Display { .. } => "DISPLAY",
            StatementKind::Accept { .. } => "ACCEPT",
            StatementKind::Perform { .. } => "PERFORM",
            StatementKind::If { .. } => "IF",
            StatementKind::GoTo { .. } => "GO",
            StatementKind::Call { .. } => "CALL",
            StatementKind::Add { .. } => "ADD",
            StatementKind::Subtract { .. } => "SUBTRACT",
            StatementKind::Multiply { .. } => "MULTIPLY",
            StatementKind::Divide { .. } => "DIVIDE",
            StatementKind::Compute { .. } => "COMPUTE",
            StatementKind::Open { .. } => "OPEN",
            StatementKind::Close { .. } => "CLOSE",
            StatementKind::Read { .. } => "READ",
            StatementKind::Write { .. } => "WRITE",
            StatementKind::Rewrite { .. } => "REWRITE",
            StatementKind::Delete { .. } => "DELETE",
            StatementKind::Start { .. } => "START",
            StatementKind::StopRun => "STOP",
            StatementKind::Goback => "GOBACK",
            StatementKind::Exit => "EXIT",
            StatementKind::Continue => "CONTINUE",
            StatementKind::ExecSql { .. } => "EXEC",
            StatementKind::ExecCics { .. } => "EXEC",
            StatementKind::Other { verb, .. } => verb,
        }
    }
}

/// A statement node.
#[derive(Debug, Clone)]
pub struct StatementNode {
    pub kind: StatementKind,
}

impl StatementNode {
    pub fn new(kind: StatementKind) -> Self {
        Self { kind }
    }
}
