//! The analysis runner: preprocess, parse, build.
//!
//! One [`AsgRunner`] call takes COBOL source to a finished [`Program`]:
//! the preprocessor expands directives, the front-end parses the expanded
//! text, the compilation-unit collector allocates one unit per PROGRAM-ID,
//! and the builder passes populate the divisions in their fixed order.
//!
//! Batch analysis is per-unit fault-isolated: a file that fails to
//! preprocess or parse is reported and skipped, the remaining files are
//! still analyzed into the same program.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::asg::{builder, Program, SourceUnit};
use crate::error::{AsgError, Result};
use crate::parser::{self, TreeId};
use crate::preprocessor::{Preprocessor, PreprocessorParams, SourceFormat};
use crate::span::FileId;

/// Builds programs from COBOL source files or text.
#[derive(Debug, Default)]
pub struct AsgRunner {
    params: PreprocessorParams,
}

impl AsgRunner {
    /// A runner with default preprocessor parameters (copybooks are
    /// searched next to each input file).
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner with explicit preprocessor parameters.
    pub fn with_params(params: PreprocessorParams) -> Self {
        Self { params }
    }

    /// Analyze one source file into a fresh program.
    pub fn analyze_file(&self, path: &Path, format: SourceFormat) -> Result<Program> {
        let mut program = Program::new();
        self.add_file(&mut program, path, format)?;
        builder::build(&mut program)?;
        Ok(program)
    }

    /// Analyze several files into one program, sequentially, so
    /// cross-unit references observe a monotonically growing ASG.
    ///
    /// Preprocessor and parser failures are fatal only for their own file;
    /// they are returned alongside the program built from the rest.
    pub fn analyze_files(
        &self,
        paths: &[PathBuf],
        format: SourceFormat,
    ) -> Result<(Program, Vec<AsgError>)> {
        let mut program = Program::new();
        let mut failures = Vec::new();

        for path in paths {
            if let Err(error) = self.add_file(&mut program, path, format) {
                warn!(file = %path.display(), %error, "skipping compilation unit");
                failures.push(error);
            }
        }

        builder::build(&mut program)?;
        Ok((program, failures))
    }

    /// Analyze source text into a fresh program. `name` stands in for the
    /// file stem in diagnostics and unit naming.
    pub fn analyze_text(
        &self,
        name: &str,
        text: &str,
        format: SourceFormat,
    ) -> Result<Program> {
        let mut program = Program::new();
        self.add_text(&mut program, name, name, text, format)?;
        builder::build(&mut program)?;
        Ok(program)
    }

    fn add_file(&self, program: &mut Program, path: &Path, format: SourceFormat) -> Result<()> {
        let text = std::fs::read_to_string(path).map_err(|e| AsgError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<source>")
            .to_string();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("<source>")
            .to_string();

        let mut params = self.params.clone();
        if params.copybook_dirs.is_empty() {
            if let Some(parent) = path.parent() {
                params.copybook_dirs.push(parent.to_path_buf());
            }
        }

        self.add_prepared(program, &stem, &file_name, &text, format, params)
    }

    fn add_text(
        &self,
        program: &mut Program,
        name: &str,
        file_name: &str,
        text: &str,
        format: SourceFormat,
    ) -> Result<()> {
        self.add_prepared(program, name, file_name, text, format, self.params.clone())
    }

    fn add_prepared(
        &self,
        program: &mut Program,
        name: &str,
        file_name: &str,
        text: &str,
        format: SourceFormat,
        params: PreprocessorParams,
    ) -> Result<()> {
        info!(file = file_name, "parsing compilation unit source");

        let preprocessor = Preprocessor::new(params);
        let preprocessed = preprocessor.process_text(text, format, file_name)?;

        let tree_id = TreeId(program.sources.len() as u32);
        let tokens = parser::scan(&preprocessed, FileId::MAIN, file_name)?;
        let tree = parser::parse(&preprocessed, tokens, tree_id, file_name)?;

        program.add_source(SourceUnit {
            name: name.to_string(),
            file_name: file_name.to_string(),
            format,
            preprocessed,
            tree,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asg::NodeKind;

    fn fixed(lines: &[&str]) -> String {
        lines
            .iter()
            .map(|l| format!("       {l}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn analyze_text_builds_a_unit() {
        let source = fixed(&[
            "IDENTIFICATION DIVISION.",
            "PROGRAM-ID. HELLO.",
            "PROCEDURE DIVISION.",
            "    DISPLAY \"HI\".",
        ]);
        let program = AsgRunner::new()
            .analyze_text("hello", &source, SourceFormat::Fixed)
            .unwrap();

        assert_eq!(program.compilation_units().len(), 1);
        let unit = program.compilation_units()[0];
        assert_eq!(program.compilation_unit(unit).unwrap().name, "Hello");
        assert!(program.registry.is_frozen());
    }

    #[test]
    fn unit_name_comes_from_program_id() {
        let source = fixed(&["IDENTIFICATION DIVISION.", "PROGRAM-ID. PAYROLL-RUN."]);
        let program = AsgRunner::new()
            .analyze_text("payroll", &source, SourceFormat::Fixed)
            .unwrap();
        let unit = program.compilation_units()[0];
        assert_eq!(program.compilation_unit(unit).unwrap().name, "Payroll-run");
    }

    #[test]
    fn analyze_files_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("GOOD.cbl");
        let bad = dir.path().join("BAD.cbl");
        std::fs::write(
            &good,
            fixed(&["IDENTIFICATION DIVISION.", "PROGRAM-ID. GOOD."]),
        )
        .unwrap();
        std::fs::write(&bad, fixed(&["COPY MISSING-BOOK."])).unwrap();

        let (program, failures) = AsgRunner::new()
            .analyze_files(&[good, bad], SourceFormat::Fixed)
            .unwrap();

        assert_eq!(program.compilation_units().len(), 1);
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], AsgError::CopybookNotFound { .. }));
    }

    #[test]
    fn preprocessed_text_is_retrievable() {
        let source = fixed(&[
            "IDENTIFICATION DIVISION.",
            "PROGRAM-ID. KEEP.",
            "PROCEDURE DIVISION.",
            "    DISPLAY \"X\".",
        ]);
        let program = AsgRunner::new()
            .analyze_text("keep", &source, SourceFormat::Fixed)
            .unwrap();
        let unit = program.compilation_units()[0];
        let text = program.preprocessed_text(unit).unwrap();
        assert!(text.contains("DISPLAY \"X\"."));
        assert!(!text.contains("       PROGRAM-ID"));
    }

    #[test]
    fn statements_reach_the_procedure_division() {
        let source = fixed(&[
            "IDENTIFICATION DIVISION.",
            "PROGRAM-ID. FLOW.",
            "PROCEDURE DIVISION.",
            "MAIN-PARA.",
            "    DISPLAY \"A\".",
            "    STOP RUN.",
        ]);
        let program = AsgRunner::new()
            .analyze_text("flow", &source, SourceFormat::Fixed)
            .unwrap();

        let unit = program.compilation_units()[0];
        let statements: Vec<_> = program
            .descendants(unit)
            .into_iter()
            .filter(|id| matches!(program.arena.kind(*id), NodeKind::Statement(_)))
            .collect();
        assert_eq!(statements.len(), 2);
    }
}
