//! Error types for preprocessing and ASG construction.
//!
//! Preprocessor and parser errors are fatal for the compilation unit that
//! produced them; a batch run reports them and moves on to the next file.
//! [`AsgError::UnownedContext`] indicates a mismatch between the grammar and
//! the builder passes and is surfaced with the offending context for
//! debugging. Unresolved name references are deliberately *not* errors: they
//! are recorded on the ASG as placeholder references (see
//! [`crate::asg::Reference`]) and left for downstream tools to judge.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::span::Location;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, AsgError>;

/// Errors raised while preprocessing source or building the ASG.
#[derive(Debug, Error, Diagnostic)]
pub enum AsgError {
    /// A COPY directive named a copybook that no configured directory holds.
    #[error("copybook '{name}' not found at {location} (searched {})", fmt_paths(searched))]
    #[diagnostic(code(asg::copybook_not_found))]
    CopybookNotFound {
        name: String,
        searched: Vec<PathBuf>,
        location: Location,
    },

    /// Copybook expansion re-entered a copybook already being expanded.
    #[error("recursive copybook expansion at {location}: {}", chain.join(" -> "))]
    #[diagnostic(code(asg::recursive_copybook))]
    RecursiveCopybook {
        chain: Vec<String>,
        location: Location,
    },

    /// Copybook nesting exceeded the configured depth limit.
    #[error("copybook nesting exceeds the maximum depth of {max_depth} at {location}")]
    #[diagnostic(code(asg::copy_depth_exceeded))]
    CopyDepthExceeded { max_depth: usize, location: Location },

    /// A COPY or REPLACE directive was malformed.
    #[error("malformed directive at {location}: {message}")]
    #[diagnostic(code(asg::preprocessor_syntax))]
    PreprocessorSyntax { message: String, location: Location },

    /// The grammar front-end rejected the preprocessed source.
    #[error("parse error at {location}: {message}")]
    #[diagnostic(code(asg::parse_error))]
    ParseError { message: String, location: Location },

    /// A builder pass could not locate the owning element for a context.
    ///
    /// This is a bug in the grammar/builder pairing, not in user source.
    #[error("no registered owner of kind {wanted} for {kind} context at {location}")]
    #[diagnostic(code(asg::unowned_context))]
    UnownedContext {
        kind: &'static str,
        wanted: &'static str,
        location: Location,
    },

    /// Reading a source file or copybook from disk failed.
    #[error("i/o error on {}: {message}", path.display())]
    #[diagnostic(code(asg::io))]
    Io { path: PathBuf, message: String },
}

fn fmt_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no directories".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
