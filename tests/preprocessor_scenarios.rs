//! Preprocessor end-to-end scenarios and textual properties.

use indoc::indoc;

use cobol_asg::parser;
use cobol_asg::span::FileId;
use cobol_asg::{Preprocessor, PreprocessorParams, SourceFormat};

fn fixed(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|l| format!("       {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn with_dirs(dir: &std::path::Path) -> Preprocessor {
    Preprocessor::new(PreprocessorParams {
        copybook_dirs: vec![dir.to_path_buf()],
        ..Default::default()
    })
}

/// Token texts of a preprocessed stream, for whitespace-insensitive
/// comparison.
fn token_texts(text: &str) -> Vec<String> {
    parser::scan(text, FileId::MAIN, "cmp.cbl")
        .unwrap()
        .into_iter()
        .map(|t| t.text)
        .collect()
}

#[test]
fn fixed_format_normalization() {
    // Pad the code line so the identification area starts at column 73.
    let code = "000200 MOVE A TO B.";
    let padded = format!("{code}{}SEQ00001", " ".repeat(72 - code.len()));
    let source = format!("000100* COMMENT LINE GOES AWAY\n{padded}");
    let out = Preprocessor::default()
        .process_text(&source, SourceFormat::Fixed, "t.cbl")
        .unwrap();

    let expected = indoc! {"

        MOVE A TO B.
    "};
    assert_eq!(out, expected);
}

#[test]
fn comment_lines_keep_line_numbers_stable() {
    let source = fixed(&["MOVE A TO B."]);
    let commented = format!("      * one\n      * two\n{source}");
    let out = Preprocessor::default()
        .process_text(&commented, SourceFormat::Fixed, "t.cbl")
        .unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "");
    assert_eq!(lines[1], "");
    assert_eq!(lines[2], "MOVE A TO B.");
}

#[test]
fn copy_with_replacing_stamps_the_prefix() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("PART.cpy"),
        fixed(&["01 :TAG:-REC. 05 :TAG:-NAME PIC X(20)."]),
    )
    .unwrap();

    let out = with_dirs(dir.path())
        .process_text(
            &fixed(&["COPY PART REPLACING ==:TAG:== BY CUST."]),
            SourceFormat::Fixed,
            "MAIN.cbl",
        )
        .unwrap();
    assert!(out.contains("01 CUST-REC. 05 CUST-NAME PIC X(20)."));
}

#[test]
fn copybook_commutes_with_replace() {
    // REPLACE X BY Y. COPY F.  must produce the same token stream as
    // inlining F's text and applying the replacement, when F holds no
    // nested directives.
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("F.cpy"), fixed(&["MOVE X TO OUT."])).unwrap();

    let copied = with_dirs(dir.path())
        .process_text(
            &fixed(&["REPLACE ==X== BY ==Y==.", "COPY F."]),
            SourceFormat::Fixed,
            "a.cbl",
        )
        .unwrap();
    let inlined = with_dirs(dir.path())
        .process_text(
            &fixed(&["REPLACE ==X== BY ==Y==.", "MOVE X TO OUT."]),
            SourceFormat::Fixed,
            "b.cbl",
        )
        .unwrap();

    assert_eq!(token_texts(&copied), token_texts(&inlined));
    assert!(copied.contains("MOVE Y TO OUT."));
}

#[test]
fn directive_expansion_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("REC.cpy"), fixed(&["01 R PIC X."])).unwrap();

    let pp = with_dirs(dir.path());
    let once = pp
        .process_text(
            &fixed(&[
                "REPLACE ==OLD== BY ==NEW==.",
                "COPY REC.",
                "MOVE OLD TO OUT.",
            ]),
            SourceFormat::Fixed,
            "t.cbl",
        )
        .unwrap();
    let twice = pp
        .expand_directives(&once, SourceFormat::Fixed, "t.cbl")
        .unwrap();
    assert_eq!(once, twice);
}

#[test]
fn variable_format_exec_cics_is_framed() {
    // Variable format: columns 1-6 sequence, 7 indicator, no right margin.
    let source = "000100 EXEC CICS\n\
                  000200     SEND MAP('DEMO') MAPSET('DEMOSET') ERASE\n\
                  000300 END-EXEC.";
    let out = Preprocessor::default()
        .process_text(source, SourceFormat::Variable, "ExecCics.cbl")
        .unwrap();
    assert!(out.contains(
        "EXEC CICS SEND MAP('DEMO') MAPSET('DEMOSET') ERASE END-EXEC."
    ));
}

#[test]
fn debug_lines_follow_the_debugging_toggle() {
    let source = "      D    DISPLAY \"TRACE\".\n       MOVE A TO B.";

    let off = Preprocessor::default()
        .process_text(source, SourceFormat::Fixed, "t.cbl")
        .unwrap();
    assert!(!off.contains("TRACE"));

    let on = Preprocessor::new(PreprocessorParams {
        debugging_mode: true,
        ..Default::default()
    })
    .process_text(source, SourceFormat::Fixed, "t.cbl")
    .unwrap();
    assert!(on.contains("DISPLAY \"TRACE\"."));
}

#[test]
fn continuation_joins_literals() {
    let source = "       DISPLAY \"HELLO \n      -    \"WORLD\".";
    let out = Preprocessor::default()
        .process_text(source, SourceFormat::Fixed, "t.cbl")
        .unwrap();
    assert!(out.contains("DISPLAY \"HELLO WORLD\"."));
}

#[test]
fn copybook_search_is_case_insensitive_first_match() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    std::fs::write(first.path().join("BOOK.cpy"), fixed(&["MOVE 1 TO A."])).unwrap();
    std::fs::write(second.path().join("book.cpy"), fixed(&["MOVE 2 TO A."])).unwrap();

    let pp = Preprocessor::new(PreprocessorParams {
        copybook_dirs: vec![first.path().to_path_buf(), second.path().to_path_buf()],
        ..Default::default()
    });
    let out = pp
        .process_text(&fixed(&["COPY book."]), SourceFormat::Fixed, "t.cbl")
        .unwrap();
    assert!(out.contains("MOVE 1 TO A."));
}
