//! Procedure-statement pass.
//!
//! Fills the statement skeletons with operands and resolves every data,
//! procedure, file, and mnemonic name against the nodes earlier passes
//! created. Resolution failures become unresolved placeholder references
//! on the ASG; they never abort the build.

use crate::asg::builder::{qualified_name_parts, walk_unit, PassCtx};
use crate::asg::node::{NodeKind, NodeTag};
use crate::asg::procedure::{OpenMode, StatementKind};
use crate::asg::reference::{ExpressionInfo, Operand, Reference};
use crate::asg::resolve::SymbolIndex;
use crate::error::Result;
use crate::parser::{ContextId, ContextKind, ParseChild, ParseTree, TokenKind};

fn qname_ref(tree: &ParseTree, index: &SymbolIndex, qctx: ContextId) -> Reference {
    let (name, quals) = qualified_name_parts(tree, qctx);
    index.resolve_data(&name, &quals)
}

fn operand_of(tree: &ParseTree, index: &SymbolIndex, ctx: ContextId) -> Operand {
    match tree.kind(ctx) {
        ContextKind::Literal => Operand::Literal {
            text: tree.token_text(ctx),
        },
        _ => Operand::DataRef(qname_ref(tree, index, ctx)),
    }
}

/// Direct Literal and QualifiedDataName children, in source order.
fn operand_children(tree: &ParseTree, ctx: ContextId) -> Vec<ContextId> {
    tree.child_contexts(ctx)
        .filter(|c| {
            matches!(
                tree.kind(*c),
                ContextKind::Literal | ContextKind::QualifiedDataName
            )
        })
        .collect()
}

fn expression_of(tree: &ParseTree, index: &SymbolIndex, ctx: ContextId) -> ExpressionInfo {
    let refs = tree
        .children_of_kind(ctx, ContextKind::QualifiedDataName)
        .into_iter()
        .map(|q| qname_ref(tree, index, q))
        .collect();
    ExpressionInfo {
        text: tree.deep_text(ctx),
        refs,
    }
}

/// Split arithmetic operands into sources and targets on the keyword
/// tokens (TO / FROM / INTO / BY / GIVING / REMAINDER).
fn arithmetic_split(
    tree: &ParseTree,
    index: &SymbolIndex,
    ctx: ContextId,
) -> (Vec<Operand>, Vec<Operand>) {
    let mut phase = 0usize;
    let mut phases: [Vec<Operand>; 3] = [Vec::new(), Vec::new(), Vec::new()];

    for slot in tree.children_slots(ctx) {
        match slot {
            ParseChild::Token(i) => {
                let t = tree.token(*i);
                if t.is_word("TO") || t.is_word("FROM") || t.is_word("INTO") || t.is_word("BY") {
                    phase = phase.max(1);
                } else if t.is_word("GIVING") || t.is_word("REMAINDER") {
                    phase = 2;
                }
            }
            ParseChild::Context(c)
                if matches!(
                    tree.kind(*c),
                    ContextKind::Literal | ContextKind::QualifiedDataName
                ) =>
            {
                phases[phase].push(operand_of(tree, index, *c));
            }
            ParseChild::Context(_) => {}
        }
    }

    let [sources, middle, giving] = phases;
    if giving.is_empty() {
        (sources, middle)
    } else {
        let mut operands = sources;
        operands.extend(middle);
        (operands, giving)
    }
}

fn fill_header(p: &mut PassCtx<'_>, index: &SymbolIndex, ctx: ContextId) -> Result<()> {
    let division = p.find_owner(ctx, NodeTag::ProcedureDivision)?;

    let mut using_params = Vec::new();
    let mut returning = None;
    let mut after_returning = false;

    for slot in p.tree.children_slots(ctx) {
        match slot {
            ParseChild::Token(i) => {
                if p.tree.token(*i).is_word("RETURNING") {
                    after_returning = true;
                }
            }
            ParseChild::Context(c) if p.tree.kind(*c) == ContextKind::QualifiedDataName => {
                let reference = qname_ref(p.tree, index, *c);
                if after_returning {
                    returning = Some(reference);
                } else {
                    using_params.push(reference);
                }
            }
            ParseChild::Context(_) => {}
        }
    }

    if let NodeKind::ProcedureDivision(div) = p.arena.kind_mut(division) {
        div.using_params = using_params;
        div.returning = returning;
    }
    Ok(())
}

fn fill_statement(p: &mut PassCtx<'_>, index: &SymbolIndex, ctx: ContextId) -> Result<()> {
    let id = p.node_of(ctx)?;
    let tree = p.tree;
    let section = p
        .registry
        .find_enclosing(p.arena, tree, ctx, NodeTag::ProcedureSection);

    let new_kind = match tree.kind(ctx) {
        ContextKind::MoveStatement => {
            let ops = operand_children(tree, ctx);
            StatementKind::Move {
                sending: ops.first().map(|c| operand_of(tree, index, *c)),
                receiving: ops[1.min(ops.len())..]
                    .iter()
                    .map(|c| operand_of(tree, index, *c))
                    .collect(),
            }
        }
        ContextKind::DisplayStatement => {
            let upon = tree
                .find_child(ctx, ContextKind::MnemonicName)
                .and_then(|m| tree.first_word(m).map(|w| w.to_string()))
                .map(|name| index.resolve_mnemonic(&name));
            StatementKind::Display {
                operands: operand_children(tree, ctx)
                    .into_iter()
                    .map(|c| operand_of(tree, index, c))
                    .collect(),
                upon,
            }
        }
        ContextKind::AcceptStatement => {
            let source = tree
                .words(ctx)
                .iter()
                .find(|w| {
                    w.eq_ignore_ascii_case("DATE")
                        || w.eq_ignore_ascii_case("DAY")
                        || w.eq_ignore_ascii_case("DAY-OF-WEEK")
                        || w.eq_ignore_ascii_case("TIME")
                })
                .map(|w| w.to_ascii_uppercase());
            let mnemonic = tree
                .find_child(ctx, ContextKind::MnemonicName)
                .and_then(|m| tree.first_word(m).map(|w| w.to_string()))
                .map(|name| index.resolve_mnemonic(&name));
            StatementKind::Accept {
                target: operand_children(tree, ctx)
                    .first()
                    .map(|c| operand_of(tree, index, *c)),
                source,
                mnemonic,
            }
        }
        ContextKind::PerformStatement => {
            let procedures = tree
                .children_of_kind(ctx, ContextKind::ProcedureName)
                .into_iter()
                .filter_map(|c| tree.child_tokens(c).next().map(|t| t.text.clone()))
                .map(|name| index.resolve_procedure(&name, section))
                .collect();
            let times = tree
                .find_child(ctx, ContextKind::Literal)
                .map(|c| operand_of(tree, index, c));
            let until = tree
                .find_child(ctx, ContextKind::Condition)
                .map(|c| expression_of(tree, index, c));
            StatementKind::Perform {
                procedures,
                times,
                until,
            }
        }
        ContextKind::IfStatement => StatementKind::If {
            condition: tree
                .find_child(ctx, ContextKind::Condition)
                .map(|c| expression_of(tree, index, c)),
        },
        ContextKind::GoToStatement => StatementKind::GoTo {
            targets: tree
                .children_of_kind(ctx, ContextKind::ProcedureName)
                .into_iter()
                .filter_map(|c| tree.child_tokens(c).next().map(|t| t.text.clone()))
                .map(|name| index.resolve_procedure(&name, section))
                .collect(),
        },
        ContextKind::CallStatement => {
            let ops = operand_children(tree, ctx);
            StatementKind::Call {
                target: ops.first().map(|c| operand_of(tree, index, *c)),
                using_params: ops[1.min(ops.len())..]
                    .iter()
                    .map(|c| operand_of(tree, index, *c))
                    .collect(),
            }
        }
        ContextKind::AddStatement => {
            let (operands, targets) = arithmetic_split(tree, index, ctx);
            StatementKind::Add { operands, targets }
        }
        ContextKind::SubtractStatement => {
            let (operands, targets) = arithmetic_split(tree, index, ctx);
            StatementKind::Subtract { operands, targets }
        }
        ContextKind::MultiplyStatement => {
            let (operands, targets) = arithmetic_split(tree, index, ctx);
            StatementKind::Multiply { operands, targets }
        }
        ContextKind::DivideStatement => {
            let (operands, targets) = arithmetic_split(tree, index, ctx);
            StatementKind::Divide { operands, targets }
        }
        ContextKind::ComputeStatement => StatementKind::Compute {
            targets: tree
                .children_of_kind(ctx, ContextKind::QualifiedDataName)
                .into_iter()
                .map(|c| Operand::DataRef(qname_ref(tree, index, c)))
                .collect(),
            expression: tree
                .find_child(ctx, ContextKind::ArithmeticExpression)
                .map(|c| expression_of(tree, index, c)),
        },
        ContextKind::OpenStatement => {
            let mut files = Vec::new();
            let mut mode = OpenMode::Input;
            for slot in tree.children_slots(ctx) {
                match slot {
                    ParseChild::Token(i) => {
                        if let Some(m) = OpenMode::from_word(&tree.token(*i).text) {
                            mode = m;
                        }
                    }
                    ParseChild::Context(c)
                        if tree.kind(*c) == ContextKind::QualifiedDataName =>
                    {
                        let (name, _) = qualified_name_parts(tree, *c);
                        files.push((mode, index.resolve_file(&name)));
                    }
                    ParseChild::Context(_) => {}
                }
            }
            StatementKind::Open { files }
        }
        ContextKind::CloseStatement => StatementKind::Close {
            files: tree
                .children_of_kind(ctx, ContextKind::QualifiedDataName)
                .into_iter()
                .map(|c| {
                    let (name, _) = qualified_name_parts(tree, c);
                    index.resolve_file(&name)
                })
                .collect(),
        },
        ContextKind::ReadStatement => {
            let qnames = tree.children_of_kind(ctx, ContextKind::QualifiedDataName);
            let file = qnames.first().map(|c| {
                let (name, _) = qualified_name_parts(tree, *c);
                index.resolve_file(&name)
            });
            // INTO target is the qualified name right after the INTO token.
            let mut into = None;
            let mut after_into = false;
            for slot in tree.children_slots(ctx) {
                match slot {
                    ParseChild::Token(i) if tree.token(*i).is_word("INTO") => after_into = true,
                    ParseChild::Context(c)
                        if after_into && tree.kind(*c) == ContextKind::QualifiedDataName =>
                    {
                        into = Some(Operand::DataRef(qname_ref(tree, index, *c)));
                        after_into = false;
                    }
                    _ => {}
                }
            }
            StatementKind::Read { file, into }
        }
        ContextKind::WriteStatement | ContextKind::RewriteStatement => {
            let qnames = tree.children_of_kind(ctx, ContextKind::QualifiedDataName);
            let record = qnames.first().map(|c| qname_ref(tree, index, *c));
            let mut from = None;
            let mut after_from = false;
            for slot in tree.children_slots(ctx) {
                match slot {
                    ParseChild::Token(i) if tree.token(*i).is_word("FROM") => after_from = true,
                    ParseChild::Context(c)
                        if after_from
                            && matches!(
                                tree.kind(*c),
                                ContextKind::Literal | ContextKind::QualifiedDataName
                            ) =>
                    {
                        from = Some(operand_of(tree, index, *c));
                        after_from = false;
                    }
                    _ => {}
                }
            }
            if tree.kind(ctx) == ContextKind::WriteStatement {
                StatementKind::Write { record, from }
            } else {
                StatementKind::Rewrite { record, from }
            }
        }
        ContextKind::DeleteStatement => StatementKind::Delete {
            file: tree
                .find_child(ctx, ContextKind::QualifiedDataName)
                .map(|c| {
                    let (name, _) = qualified_name_parts(tree, c);
                    index.resolve_file(&name)
                }),
        },
        ContextKind::StartStatement => StatementKind::Start {
            file: tree
                .find_child(ctx, ContextKind::QualifiedDataName)
                .map(|c| {
                    let (name, _) = qualified_name_parts(tree, c);
                    index.resolve_file(&name)
                }),
        },
        ContextKind::ExecSqlStatement => StatementKind::ExecSql {
            payload: tree
                .child_tokens(ctx)
                .find(|t| t.kind == TokenKind::RawText)
                .map(|t| t.text.clone())
                .unwrap_or_default(),
        },
        ContextKind::ExecCicsStatement => StatementKind::ExecCics {
            payload: tree
                .child_tokens(ctx)
                .find(|t| t.kind == TokenKind::RawText)
                .map(|t| t.text.clone())
                .unwrap_or_default(),
        },
        ContextKind::StopStatement
        | ContextKind::GobackStatement
        | ContextKind::ExitStatement
        | ContextKind::ContinueStatement => return Ok(()),
        other if other.is_statement() => StatementKind::Other {
            verb: tree
                .first_word(ctx)
                .map(|w| w.to_ascii_uppercase())
                .unwrap_or_default(),
            operands: operand_children(tree, ctx)
                .into_iter()
                .map(|c| operand_of(tree, index, c))
                .collect(),
        },
        _ => return Ok(()),
    };

    if let NodeKind::Statement(statement) = p.arena.kind_mut(id) {
        statement.kind = new_kind;
    }
    Ok(())
}

pub(crate) fn run(pass: &mut PassCtx<'_>, unit_ctx: ContextId, unit: crate::asg::node::NodeId) -> Result<()> {
    let index = SymbolIndex::for_unit(pass.arena, unit);

    walk_unit(unit_ctx, pass, &mut |p, ctx| {
        let kind = p.tree.kind(ctx);
        if kind == ContextKind::ProcedureDivisionHeader {
            return fill_header(p, &index, ctx);
        }
        if kind.is_statement() {
            return fill_statement(p, &index, ctx);
        }
        Ok(())
    })
}
