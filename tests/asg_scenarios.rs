//! End-to-end ASG scenarios over the full pipeline.

use cobol_asg::asg::data::FileDescriptorKind;
use cobol_asg::asg::procedure::StatementKind;
use cobol_asg::asg::{NodeId, NodeKind, Program, Reference};
use cobol_asg::{AsgError, AsgRunner, PreprocessorParams, SourceFormat};

/// Lay lines out in fixed reference format (7 blank columns, code from
/// column 8).
fn fixed(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|l| format!("       {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn analyze(lines: &[&str]) -> Program {
    AsgRunner::new()
        .analyze_text("test", &fixed(lines), SourceFormat::Fixed)
        .unwrap()
}

/// Every statement node in the program, in preorder.
fn statements(program: &Program) -> Vec<(NodeId, StatementKind)> {
    program
        .descendants(program.root())
        .into_iter()
        .filter_map(|id| match program.arena.kind(id) {
            NodeKind::Statement(st) => Some((id, st.kind.clone())),
            _ => None,
        })
        .collect()
}

fn entry_name(program: &Program, id: NodeId) -> Option<String> {
    match program.arena.kind(id) {
        NodeKind::DataDescriptionEntry(d) => d.name.clone(),
        _ => None,
    }
}

#[test]
fn hello_program() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. HELLO.",
        "PROCEDURE DIVISION.",
        "    DISPLAY \"HI\".",
    ]);

    assert_eq!(program.compilation_units().len(), 1);
    let unit_id = program.compilation_units()[0];
    let unit = program.compilation_unit(unit_id).unwrap();
    assert_eq!(unit.name, "Hello");

    let pu = unit.program_unit.expect("program unit exists");
    match program.arena.kind(pu) {
        NodeKind::ProgramUnit(p) => {
            assert!(p.identification.is_some());
            assert!(p.procedure.is_some());
            assert!(p.environment.is_none());
            assert!(p.data.is_none());
        }
        other => panic!("unexpected node: {other:?}"),
    }

    let all = statements(&program);
    assert_eq!(all.len(), 1);
    match &all[0].1 {
        StatementKind::Display { operands, upon } => {
            assert!(upon.is_none());
            assert_eq!(operands.len(), 1);
            assert_eq!(operands[0].literal_text(), Some("\"HI\""));
        }
        other => panic!("expected DISPLAY, got {other:?}"),
    }
}

#[test]
fn registry_is_a_bijection() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. BIJECT.",
        "DATA DIVISION.",
        "WORKING-STORAGE SECTION.",
        "01 REC.",
        "   05 FLD PIC X(4).",
        "   88 FLD-SET VALUE \"GOOD\".",
        "PROCEDURE DIVISION.",
        "MAIN-PARA.",
        "    MOVE \"GOOD\" TO FLD.",
        "    STOP RUN.",
    ]);

    assert!(program.registry.is_frozen());
    assert!(!program.registry.is_empty());

    for (key, node) in program.registry.iter() {
        assert_eq!(
            program.arena.get(node).ctx,
            Some(key),
            "registered context must round-trip through its node"
        );
    }
    for node in program.arena.iter() {
        if let Some(key) = node.ctx {
            assert_eq!(
                program.registry.lookup(key),
                Some(node.id),
                "node context must resolve back to the node"
            );
        }
    }
}

#[test]
fn parent_links_reach_the_program_root() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. TREE.",
        "DATA DIVISION.",
        "WORKING-STORAGE SECTION.",
        "01 A.",
        "   05 B PIC 9.",
        "PROCEDURE DIVISION.",
        "    MOVE 1 TO B.",
    ]);

    let limit = program.arena.len();
    for node in program.arena.iter() {
        let mut current = node.id;
        let mut steps = 0;
        loop {
            match program.arena.get(current).parent {
                Some(parent) => {
                    current = parent;
                    steps += 1;
                    assert!(steps <= limit, "parent chain must terminate");
                }
                None => {
                    assert_eq!(current, program.root());
                    break;
                }
            }
        }
    }
}

#[test]
fn copy_with_replacing_reaches_the_asg() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("PART.cpy"),
        fixed(&["01 :TAG:-REC.", "   05 :TAG:-NAME PIC X(20)."]),
    )
    .unwrap();

    let params = PreprocessorParams {
        copybook_dirs: vec![dir.path().to_path_buf()],
        ..Default::default()
    };
    let program = AsgRunner::with_params(params)
        .analyze_text(
            "main",
            &fixed(&[
                "IDENTIFICATION DIVISION.",
                "PROGRAM-ID. MAIN-PROG.",
                "DATA DIVISION.",
                "WORKING-STORAGE SECTION.",
                "COPY PART REPLACING ==:TAG:== BY CUST.",
            ]),
            SourceFormat::Fixed,
        )
        .unwrap();

    let unit = program.compilation_units()[0];
    let text = program.preprocessed_text(unit).unwrap();
    assert!(text.contains("01 CUST-REC."));
    assert!(text.contains("05 CUST-NAME PIC X(20)."));

    let names: Vec<String> = program
        .descendants(unit)
        .into_iter()
        .filter_map(|id| entry_name(&program, id))
        .collect();
    assert!(names.contains(&"CUST-REC".to_string()));
    assert!(names.contains(&"CUST-NAME".to_string()));
}

#[test]
fn recursive_copy_fails_naming_both_books() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("A.cpy"), fixed(&["COPY B."])).unwrap();
    std::fs::write(dir.path().join("B.cpy"), fixed(&["COPY A."])).unwrap();

    let params = PreprocessorParams {
        copybook_dirs: vec![dir.path().to_path_buf()],
        ..Default::default()
    };
    let err = AsgRunner::with_params(params)
        .analyze_text("main", &fixed(&["COPY A."]), SourceFormat::Fixed)
        .unwrap_err();

    match err {
        AsgError::RecursiveCopybook { chain, .. } => {
            assert!(chain.contains(&"A".to_string()));
            assert!(chain.contains(&"B".to_string()));
        }
        other => panic!("expected RecursiveCopybook, got {other:?}"),
    }
}

#[test]
fn qualified_names_resolve_to_distinct_records() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. QUAL.",
        "DATA DIVISION.",
        "WORKING-STORAGE SECTION.",
        "01 CUSTOMER.",
        "   05 AMOUNT PIC 9(5).",
        "01 ORDER-REC.",
        "   05 AMOUNT PIC 9(5).",
        "PROCEDURE DIVISION.",
        "    MOVE AMOUNT OF CUSTOMER TO AMOUNT OF ORDER-REC.",
    ]);

    let all = statements(&program);
    let (sending, receiving) = match &all[0].1 {
        StatementKind::Move { sending, receiving } => {
            (sending.clone().unwrap(), receiving.clone())
        }
        other => panic!("expected MOVE, got {other:?}"),
    };

    let src = sending.data_ref().unwrap().target().expect("resolved");
    let dst = receiving[0].data_ref().unwrap().target().expect("resolved");
    assert_ne!(src, dst);

    let src_record = entry_name(&program, program.arena.get(src).parent.unwrap());
    let dst_record = entry_name(&program, program.arena.get(dst).parent.unwrap());
    assert_eq!(src_record.as_deref(), Some("CUSTOMER"));
    assert_eq!(dst_record.as_deref(), Some("ORDER-REC"));
}

#[test]
fn ambiguous_reference_keeps_every_candidate() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. AMBIG.",
        "DATA DIVISION.",
        "WORKING-STORAGE SECTION.",
        "01 CUSTOMER.",
        "   05 AMOUNT PIC 9(5).",
        "01 ORDER-REC.",
        "   05 AMOUNT PIC 9(5).",
        "77 WS-OUT PIC 9(5).",
        "PROCEDURE DIVISION.",
        "    MOVE AMOUNT TO WS-OUT.",
    ]);

    let all = statements(&program);
    match &all[0].1 {
        StatementKind::Move { sending, .. } => match sending.as_ref().unwrap().data_ref() {
            Some(Reference::Unresolved { candidates, .. }) => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected ambiguous reference, got {other:?}"),
        },
        other => panic!("expected MOVE, got {other:?}"),
    }
}

#[test]
fn unknown_name_becomes_placeholder_not_error() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. GHOSTLY.",
        "DATA DIVISION.",
        "WORKING-STORAGE SECTION.",
        "77 WS-OUT PIC 9.",
        "PROCEDURE DIVISION.",
        "    MOVE GHOST TO WS-OUT.",
    ]);

    let all = statements(&program);
    match &all[0].1 {
        StatementKind::Move { sending, receiving } => {
            match sending.as_ref().unwrap().data_ref() {
                Some(Reference::Unresolved { name, candidates, .. }) => {
                    assert_eq!(name, "GHOST");
                    assert!(candidates.is_empty());
                }
                other => panic!("expected placeholder, got {other:?}"),
            }
            assert!(receiving[0].data_ref().unwrap().is_resolved());
        }
        other => panic!("expected MOVE, got {other:?}"),
    }
}

#[test]
fn exec_sql_payload_is_verbatim() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. SQLPROG.",
        "PROCEDURE DIVISION.",
        "    EXEC SQL SELECT 1 FROM DUAL END-EXEC.",
    ]);

    let all = statements(&program);
    match &all[0].1 {
        StatementKind::ExecSql { payload } => assert_eq!(payload, "SELECT 1 FROM DUAL"),
        other => panic!("expected EXEC SQL, got {other:?}"),
    }
}

#[test]
fn fd_cross_links_to_its_select_entry() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. FILES.",
        "ENVIRONMENT DIVISION.",
        "INPUT-OUTPUT SECTION.",
        "FILE-CONTROL.",
        "    SELECT CUST-FILE ASSIGN TO \"CUST.DAT\"",
        "        ORGANIZATION IS INDEXED",
        "        RECORD KEY IS CUST-ID",
        "        FILE STATUS IS WS-FS.",
        "DATA DIVISION.",
        "FILE SECTION.",
        "FD CUST-FILE",
        "    LABEL RECORDS ARE STANDARD.",
        "01 CUST-REC.",
        "   05 CUST-ID PIC 9(6).",
        "WORKING-STORAGE SECTION.",
        "77 WS-FS PIC XX.",
        "PROCEDURE DIVISION.",
        "    OPEN INPUT CUST-FILE.",
        "    CLOSE CUST-FILE.",
    ]);

    let unit = program.compilation_units()[0];

    let fd = program
        .descendants(unit)
        .into_iter()
        .find(|id| matches!(program.arena.kind(*id), NodeKind::FileDescriptionEntry(_)))
        .expect("FD exists");
    let (select_ref, kind) = match program.arena.kind(fd) {
        NodeKind::FileDescriptionEntry(f) => (f.select_entry.clone().unwrap(), f.kind),
        _ => unreachable!(),
    };
    assert_eq!(kind, FileDescriptorKind::Fd);

    let select = select_ref.target().expect("FD links to its SELECT");
    match program.arena.kind(select) {
        NodeKind::FileControlEntry(entry) => {
            assert_eq!(entry.file_name, "CUST-FILE");
            assert_eq!(entry.assign_to.as_deref(), Some("\"CUST.DAT\""));
            assert!(entry.record_key.as_ref().unwrap().is_resolved());
            assert!(entry.file_status.as_ref().unwrap().is_resolved());
        }
        other => panic!("expected SELECT entry, got {other:?}"),
    }

    // OPEN and CLOSE resolve the file name to the same entry.
    for (_, st) in statements(&program) {
        match st {
            StatementKind::Open { files } => {
                assert_eq!(files[0].1.target(), Some(select));
            }
            StatementKind::Close { files } => {
                assert_eq!(files[0].target(), Some(select));
            }
            _ => {}
        }
    }
}

#[test]
fn global_items_resolve_in_nested_programs() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. OUTER-PROG.",
        "DATA DIVISION.",
        "WORKING-STORAGE SECTION.",
        "01 SHARED-FLAG PIC X GLOBAL.",
        "PROCEDURE DIVISION.",
        "    DISPLAY \"O\".",
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. INNER-PROG.",
        "PROCEDURE DIVISION.",
        "    MOVE \"Y\" TO SHARED-FLAG.",
        "END PROGRAM INNER-PROG.",
        "END PROGRAM OUTER-PROG.",
    ]);

    assert_eq!(program.compilation_units().len(), 2);
    let outer = program.unit_by_name("Outer-prog").unwrap();
    let inner = program.unit_by_name("Inner-prog").unwrap();
    assert_eq!(
        program.compilation_unit(inner).unwrap().parent_unit,
        Some(outer)
    );

    let shared = program
        .descendants(outer)
        .into_iter()
        .find(|id| entry_name(&program, *id).as_deref() == Some("SHARED-FLAG"))
        .unwrap();

    let inner_move = program
        .descendants(inner)
        .into_iter()
        .find_map(|id| match program.arena.kind(id) {
            NodeKind::Statement(st) => match &st.kind {
                StatementKind::Move { receiving, .. } => Some(receiving.clone()),
                _ => None,
            },
            _ => None,
        })
        .expect("inner MOVE exists");
    assert_eq!(inner_move[0].data_ref().unwrap().target(), Some(shared));
}

#[test]
fn display_upon_resolves_mnemonic() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. MNEM.",
        "ENVIRONMENT DIVISION.",
        "CONFIGURATION SECTION.",
        "SPECIAL-NAMES.",
        "    CONSOLE IS CONS.",
        "PROCEDURE DIVISION.",
        "    DISPLAY \"X\" UPON CONS.",
    ]);

    let unit = program.compilation_units()[0];
    let special = program
        .descendants(unit)
        .into_iter()
        .find(|id| matches!(program.arena.kind(*id), NodeKind::SpecialName(_)))
        .expect("SPECIAL-NAMES entry exists");
    match program.arena.kind(special) {
        NodeKind::SpecialName(s) => {
            assert_eq!(s.system_name, "CONSOLE");
            assert_eq!(s.mnemonic.as_deref(), Some("CONS"));
        }
        _ => unreachable!(),
    }

    let all = statements(&program);
    match &all[0].1 {
        StatementKind::Display { upon, .. } => {
            assert_eq!(upon.as_ref().unwrap().target(), Some(special));
        }
        other => panic!("expected DISPLAY, got {other:?}"),
    }
}

#[test]
fn redefines_and_depending_resolve() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. SHAPES.",
        "DATA DIVISION.",
        "WORKING-STORAGE SECTION.",
        "01 REC-A PIC X(10).",
        "01 REC-B REDEFINES REC-A PIC 9(10).",
        "01 TBL.",
        "   05 CNT PIC 9(3).",
        "   05 ITM OCCURS 1 TO 50 TIMES DEPENDING ON CNT PIC X.",
    ]);

    let unit = program.compilation_units()[0];
    let find = |name: &str| {
        program
            .descendants(unit)
            .into_iter()
            .find(|id| entry_name(&program, *id).as_deref() == Some(name))
            .unwrap()
    };

    let rec_a = find("REC-A");
    let rec_b = find("REC-B");
    match program.arena.kind(rec_b) {
        NodeKind::DataDescriptionEntry(d) => {
            assert_eq!(d.redefines.as_ref().unwrap().target(), Some(rec_a));
        }
        _ => unreachable!(),
    }

    let cnt = find("CNT");
    let itm = find("ITM");
    match program.arena.kind(itm) {
        NodeKind::DataDescriptionEntry(d) => {
            let occurs = d.occurs.as_ref().unwrap();
            assert_eq!(occurs.min, 1);
            assert_eq!(occurs.max, Some(50));
            assert_eq!(occurs.depending.as_ref().unwrap().target(), Some(cnt));
        }
        _ => unreachable!(),
    }
}

#[test]
fn condition_names_carry_value_tables() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. CONDS.",
        "DATA DIVISION.",
        "WORKING-STORAGE SECTION.",
        "01 FLAG PIC X.",
        "   88 FLAG-ON VALUE \"Y\".",
        "   88 FLAG-RANGE VALUES 1 THRU 9.",
    ]);

    let unit = program.compilation_units()[0];
    let flag = program
        .descendants(unit)
        .into_iter()
        .find(|id| entry_name(&program, *id).as_deref() == Some("FLAG"))
        .unwrap();

    let conditions: Vec<_> = program
        .arena
        .children(flag)
        .into_iter()
        .filter_map(|id| match program.arena.kind(id) {
            NodeKind::ConditionName(c) => Some(c.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(conditions.len(), 2);

    assert_eq!(conditions[0].name, "FLAG-ON");
    assert_eq!(conditions[0].values[0].from, "\"Y\"");
    assert_eq!(conditions[0].values[0].to, None);

    assert_eq!(conditions[1].name, "FLAG-RANGE");
    assert_eq!(conditions[1].values[0].from, "1");
    assert_eq!(conditions[1].values[0].to.as_deref(), Some("9"));
}

#[test]
fn level_hierarchy_follows_the_stack_machine() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. LEVELS.",
        "DATA DIVISION.",
        "WORKING-STORAGE SECTION.",
        "01 TOP-REC.",
        "   05 GROUP-A.",
        "      10 LEAF-1 PIC X.",
        "      10 LEAF-2 PIC X.",
        "   05 GROUP-B.",
        "      10 LEAF-3 PIC X.",
        "77 LONE PIC 9.",
    ]);

    let unit = program.compilation_units()[0];
    let find = |name: &str| {
        program
            .descendants(unit)
            .into_iter()
            .find(|id| entry_name(&program, *id).as_deref() == Some(name))
            .unwrap()
    };

    let top = find("TOP-REC");
    let group_a = find("GROUP-A");
    let group_b = find("GROUP-B");
    let leaf_2 = find("LEAF-2");
    let leaf_3 = find("LEAF-3");
    let lone = find("LONE");

    assert_eq!(program.arena.get(group_a).parent, Some(top));
    assert_eq!(program.arena.get(group_b).parent, Some(top));
    assert_eq!(program.arena.get(leaf_2).parent, Some(group_a));
    assert_eq!(program.arena.get(leaf_3).parent, Some(group_b));
    // 77 restarts at section level.
    assert_ne!(program.arena.get(lone).parent, Some(top));
}

#[test]
fn perform_resolves_paragraph_targets() {
    let program = analyze(&[
        "IDENTIFICATION DIVISION.",
        "PROGRAM-ID. FLOW.",
        "DATA DIVISION.",
        "WORKING-STORAGE SECTION.",
        "77 WS-DONE PIC X VALUE \"N\".",
        "PROCEDURE DIVISION.",
        "MAIN-PARA.",
        "    PERFORM WORK-PARA UNTIL WS-DONE = \"Y\".",
        "    STOP RUN.",
        "WORK-PARA.",
        "    MOVE \"Y\" TO WS-DONE.",
    ]);

    let unit = program.compilation_units()[0];
    let work = program
        .descendants(unit)
        .into_iter()
        .find(|id| {
            matches!(program.arena.kind(*id), NodeKind::Paragraph(p) if p.name == "WORK-PARA")
        })
        .unwrap();

    let perform = statements(&program)
        .into_iter()
        .find_map(|(_, st)| match st {
            StatementKind::Perform {
                procedures, until, ..
            } => Some((procedures, until)),
            _ => None,
        })
        .expect("PERFORM exists");

    assert_eq!(perform.0[0].target(), Some(work));
    let until = perform.1.unwrap();
    assert!(until.text.contains("WS-DONE"));
    assert!(until.refs[0].is_resolved());
}
