//! The COBOL preprocessor.
//!
//! Turns raw reference-format source into the expanded stream the grammar
//! front-end consumes:
//!
//! 1. [`normalizer`] strips sequence numbers and indicator areas, folds
//!    continuation lines, and blanks comments (per source format).
//! 2. [`directives`] expands `COPY ... REPLACING ...` recursively and
//!    applies block-scoped `REPLACE` phrase sets.
//! 3. [`exec`] collapses `EXEC ... END-EXEC` blocks onto single lines so
//!    the grammar can treat them as one statement.
//!
//! The expanded text is retrievable as an intermediate artifact; the runner
//! stores it on every compilation unit it builds.

pub mod copybook;
pub mod directives;
pub mod exec;
pub mod normalizer;
pub mod replacing;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{AsgError, Result};
use crate::text::normalize_line_endings;

pub use directives::{CopyDirective, DirectiveExpander, ReplaceDirective};
pub use normalizer::{Indicator, SourceFormat};
pub use replacing::ReplacePhrase;

/// Configuration for one preprocessor invocation.
#[derive(Debug, Clone)]
pub struct PreprocessorParams {
    /// Ordered copybook search directories. When empty, the directory of
    /// the input file is used.
    pub copybook_dirs: Vec<PathBuf>,
    /// Allowed copybook file extensions, in priority order.
    pub copybook_extensions: Vec<String>,
    /// Maximum copybook nesting depth.
    pub max_copy_depth: usize,
    /// Whether `D` indicator lines are compiled (WITH DEBUGGING MODE).
    pub debugging_mode: bool,
    /// Per-copybook source format overrides, keyed by lowercase stem.
    /// Copybooks without an entry inherit the including file's format.
    pub copybook_formats: HashMap<String, SourceFormat>,
}

impl Default for PreprocessorParams {
    fn default() -> Self {
        Self {
            copybook_dirs: Vec::new(),
            copybook_extensions: vec![".cpy", ".cbl", ".CPY", ".CBL"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_copy_depth: 50,
            debugging_mode: false,
            copybook_formats: HashMap::new(),
        }
    }
}

impl PreprocessorParams {
    /// Fill in the default copybook directory for an input file.
    fn effective_for(&self, input: Option<&Path>) -> Self {
        let mut params = self.clone();
        if params.copybook_dirs.is_empty() {
            if let Some(parent) = input.and_then(|p| p.parent()) {
                params.copybook_dirs.push(parent.to_path_buf());
            }
        }
        params
    }
}

/// The preprocessor facade.
#[derive(Debug, Default)]
pub struct Preprocessor {
    params: PreprocessorParams,
}

impl Preprocessor {
    /// Create a preprocessor with explicit parameters.
    pub fn new(params: PreprocessorParams) -> Self {
        Self { params }
    }

    /// Preprocess a source file.
    pub fn process_file(&self, path: &Path, format: SourceFormat) -> Result<String> {
        let raw = std::fs::read_to_string(path).map_err(|e| AsgError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let origin = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<source>")
            .to_string();

        let params = self.params.effective_for(Some(path));
        self.run(&raw, format, &origin, &params)
    }

    /// Preprocess source text. `origin` names the input in diagnostics.
    pub fn process_text(&self, text: &str, format: SourceFormat, origin: &str) -> Result<String> {
        let params = self.params.effective_for(None);
        self.run(text, format, origin, &params)
    }

    /// Run only the directive stage over already-normalized text.
    ///
    /// Lines are taken as logical lines as-is; no column stripping happens.
    /// Running this over its own output with no directives left is the
    /// identity modulo trailing whitespace.
    pub fn expand_directives(
        &self,
        text: &str,
        format: SourceFormat,
        origin: &str,
    ) -> Result<String> {
        let params = self.params.effective_for(None);
        let logical: Vec<String> = text.lines().map(String::from).collect();
        finish(&logical, format, origin, &params)
    }

    fn run(
        &self,
        raw: &str,
        format: SourceFormat,
        origin: &str,
        params: &PreprocessorParams,
    ) -> Result<String> {
        info!(file = origin, ?format, "preprocessing");
        let text = normalize_line_endings(raw);
        let logical = normalizer::normalize(&text, format, params.debugging_mode, origin)?;
        finish(&logical, format, origin, params)
    }
}

/// Directive expansion and EXEC framing over logical lines.
fn finish(
    lines: &[String],
    format: SourceFormat,
    origin: &str,
    params: &PreprocessorParams,
) -> Result<String> {
    let mut expander = DirectiveExpander::new(params);
    let expanded = expander.expand(lines, format, origin)?;
    let collapsed = exec::collapse_exec_blocks(&expanded, origin)?;

    let mut out = String::new();
    for line in &collapsed {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixed_line(code: &str) -> String {
        format!("       {code}")
    }

    #[test]
    fn comment_lines_vanish_and_sequence_is_stripped() {
        let source = "000100* COMMENT LINE\n000200 DISPLAY \"HI\".";
        let pp = Preprocessor::default();
        let out = pp
            .process_text(source, SourceFormat::Fixed, "t.cbl")
            .unwrap();
        assert_eq!(out, "\nDISPLAY \"HI\".\n");
    }

    #[test]
    fn copy_with_replacing_expands_and_substitutes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("PART.cpy"),
            format!(
                "{}\n{}",
                fixed_line("01 :TAG:-REC."),
                fixed_line("   05 :TAG:-NAME PIC X(20).")
            ),
        )
        .unwrap();

        let params = PreprocessorParams {
            copybook_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let pp = Preprocessor::new(params);
        let source = fixed_line("COPY PART REPLACING ==:TAG:== BY CUST.");
        let out = pp
            .process_text(&source, SourceFormat::Fixed, "MAIN.cbl")
            .unwrap();

        assert!(out.contains("01 CUST-REC."));
        assert!(out.contains("05 CUST-NAME PIC X(20)."));
        assert!(!out.contains(":TAG:"));
    }

    #[test]
    fn recursive_copy_fails_with_chain() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("A.cpy"), fixed_line("COPY B.")).unwrap();
        fs::write(dir.path().join("B.cpy"), fixed_line("COPY A.")).unwrap();

        let params = PreprocessorParams {
            copybook_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let pp = Preprocessor::new(params);
        let err = pp
            .process_text(&fixed_line("COPY A."), SourceFormat::Fixed, "MAIN.cbl")
            .unwrap_err();

        match err {
            AsgError::RecursiveCopybook { chain, .. } => {
                assert!(chain.contains(&"A".to_string()));
                assert!(chain.contains(&"B".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn replace_block_applies_until_off() {
        let source = [
            fixed_line("REPLACE ==FOO== BY ==BAR==."),
            fixed_line("MOVE FOO TO X."),
            fixed_line("REPLACE OFF."),
            fixed_line("MOVE FOO TO Y."),
        ]
        .join("\n");

        let pp = Preprocessor::default();
        let out = pp
            .process_text(&source, SourceFormat::Fixed, "t.cbl")
            .unwrap();
        assert!(out.contains("MOVE BAR TO X."));
        assert!(out.contains("MOVE FOO TO Y."));
    }

    #[test]
    fn replace_applies_to_copied_text() {
        // REPLACE before COPY must see the spliced copybook text, the same
        // as if the copybook had been inlined by hand.
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("F.cpy"), fixed_line("MOVE X TO OUT.")).unwrap();

        let params = PreprocessorParams {
            copybook_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let pp = Preprocessor::new(params);
        let source = [
            fixed_line("REPLACE ==X== BY ==Y==."),
            fixed_line("COPY F."),
        ]
        .join("\n");
        let out = pp
            .process_text(&source, SourceFormat::Fixed, "t.cbl")
            .unwrap();
        assert!(out.contains("MOVE Y TO OUT."));
    }

    #[test]
    fn directive_stage_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("REC.cpy"), fixed_line("01 R PIC X.")).unwrap();

        let params = PreprocessorParams {
            copybook_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let pp = Preprocessor::new(params);
        let source = [
            fixed_line("REPLACE ==A== BY ==B==."),
            fixed_line("COPY REC."),
            fixed_line("MOVE A TO OUT."),
        ]
        .join("\n");
        let once = pp
            .process_text(&source, SourceFormat::Fixed, "t.cbl")
            .unwrap();
        let twice = pp
            .expand_directives(&once, SourceFormat::Fixed, "t.cbl")
            .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn repeated_copy_keeps_trailing_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        // The trailing comment normalizes to a blank line; the second
        // inclusion is served from the expansion cache and must keep it.
        fs::write(
            dir.path().join("TAIL.cpy"),
            format!("{}\n      * end of copybook", fixed_line("01 T PIC X.")),
        )
        .unwrap();

        let params = PreprocessorParams {
            copybook_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let pp = Preprocessor::new(params);
        let source = format!("{}\n{}", fixed_line("COPY TAIL."), fixed_line("COPY TAIL."));
        let out = pp
            .process_text(&source, SourceFormat::Fixed, "t.cbl")
            .unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], "01 T PIC X.");
        assert_eq!(lines[2], "");
        assert_eq!(lines[4], "01 T PIC X.");
        assert_eq!(lines[5], "");
    }

    #[test]
    fn nested_copy_expands() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("OUTER.cpy"), fixed_line("COPY INNER.")).unwrap();
        fs::write(dir.path().join("INNER.cpy"), fixed_line("01 DEEP PIC 9.")).unwrap();

        let params = PreprocessorParams {
            copybook_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let pp = Preprocessor::new(params);
        let out = pp
            .process_text(&fixed_line("COPY OUTER."), SourceFormat::Fixed, "t.cbl")
            .unwrap();
        assert!(out.contains("01 DEEP PIC 9."));
    }

    #[test]
    fn exec_block_survives_with_payload() {
        let source = [
            fixed_line("EXEC SQL"),
            fixed_line("    SELECT 1 FROM DUAL"),
            fixed_line("END-EXEC."),
        ]
        .join("\n");
        let pp = Preprocessor::default();
        let out = pp
            .process_text(&source, SourceFormat::Fixed, "t.cbl")
            .unwrap();
        assert!(out.contains("EXEC SQL SELECT 1 FROM DUAL END-EXEC."));
    }

    #[test]
    fn missing_copybook_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let params = PreprocessorParams {
            copybook_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let pp = Preprocessor::new(params);
        let err = pp
            .process_text(&fixed_line("COPY GHOST."), SourceFormat::Fixed, "t.cbl")
            .unwrap_err();
        assert!(matches!(err, AsgError::CopybookNotFound { .. }));
    }
}
