//! COBOL-85 preprocessor and Abstract Semantic Graph builder.
//!
//! This crate ingests COBOL-85 source text and produces an ASG: a typed,
//! cross-linked representation of every compilation unit, division,
//! section, paragraph, clause, statement, data item, and file-control
//! entry in the program, with name references resolved to the nodes that
//! declare them. Static analyzers, refactoring tools, and translators
//! traverse the ASG instead of a raw parse tree.
//!
//! # Pipeline
//!
//! 1. The [`preprocessor`] normalizes fixed/variable/tandem reference
//!    format, expands `COPY`/`REPLACE` directives, and frames
//!    `EXEC ... END-EXEC` blocks.
//! 2. The [`parser`] front-end turns the expanded text into a parse tree
//!    of grammar-production contexts.
//! 3. The [`asg`] builder runs a fixed sequence of passes over each
//!    compilation unit, creating nodes, enforcing parent/child
//!    invariants, and resolving names across passes.
//!
//! # Example
//!
//! ```
//! use cobol_asg::{AsgRunner, SourceFormat};
//!
//! // Fixed reference format: columns 1-6 sequence, 7 indicator, 8+ code.
//! let source = [
//!     "       IDENTIFICATION DIVISION.",
//!     "       PROGRAM-ID. HELLO.",
//!     "       PROCEDURE DIVISION.",
//!     "           DISPLAY \"HI\".",
//! ]
//! .join("\n");
//!
//! let program = AsgRunner::new()
//!     .analyze_text("hello", &source, SourceFormat::Fixed)
//!     .expect("analysis succeeds");
//! assert_eq!(program.compilation_units().len(), 1);
//! ```

pub mod asg;
pub mod error;
pub mod parser;
pub mod preprocessor;
pub mod runner;
pub mod span;
pub mod text;

pub use asg::{
    Arena, ContextKey, ElementRegistry, NodeId, NodeKind, NodeTag, Operand, Program, Reference,
    SourceUnit,
};
pub use error::{AsgError, Result};
pub use preprocessor::{Preprocessor, PreprocessorParams, SourceFormat};
pub use runner::AsgRunner;
pub use span::{FileId, Location, Span};
