//! Procedure-division pass.
//!
//! Creates sections, paragraphs, and statement skeletons. A statement's
//! owner is the nearest enclosing paragraph, then section, then the
//! division itself (COBOL allows paragraph-less procedure bodies), so
//! statements nested in IF or inline PERFORM bodies land on their
//! paragraph in source order.

use crate::asg::builder::{walk_unit, PassCtx};
use crate::asg::node::{NodeId, NodeKind, NodeTag};
use crate::asg::procedure::{ParagraphNode, ProcedureSectionNode, StatementKind, StatementNode};
use crate::error::Result;
use crate::parser::{ContextId, ContextKind, ParseTree};

/// The empty payload for a statement context; operands arrive in the
/// statement pass.
fn skeleton(tree: &ParseTree, ctx: ContextId) -> StatementKind {
    match tree.kind(ctx) {
        ContextKind::MoveStatement => StatementKind::Move {
            sending: None,
            receiving: Vec::new(),
        },
        ContextKind::DisplayStatement => StatementKind::Display {
            operands: Vec::new(),
            upon: None,
        },
        ContextKind::AcceptStatement => StatementKind::Accept {
            target: None,
            source: None,
            mnemonic: None,
        },
        ContextKind::PerformStatement => StatementKind::Perform {
            procedures: Vec::new(),
            times: None,
            until: None,
        },
        ContextKind::IfStatement => StatementKind::If { condition: None },
        ContextKind::GoToStatement => StatementKind::GoTo {
            targets: Vec::new(),
        },
        ContextKind::CallStatement => StatementKind::Call {
            target: None,
            using_params: Vec::new(),
        },
        ContextKind::AddStatement => StatementKind::Add {
            operands: Vec::new(),
            targets: Vec::new(),
        },
        ContextKind::SubtractStatement => StatementKind::Subtract {
            operands: Vec::new(),
            targets: Vec::new(),
        },
        ContextKind::MultiplyStatement => StatementKind::Multiply {
            operands: Vec::new(),
            targets: Vec::new(),
        },
        ContextKind::DivideStatement => StatementKind::Divide {
            operands: Vec::new(),
            targets: Vec::new(),
        },
        ContextKind::ComputeStatement => StatementKind::Compute {
            targets: Vec::new(),
            expression: None,
        },
        ContextKind::OpenStatement => StatementKind::Open { files: Vec::new() },
        ContextKind::CloseStatement => StatementKind::Close { files: Vec::new() },
        ContextKind::ReadStatement => StatementKind::Read {
            file: None,
            into: None,
        },
        ContextKind::WriteStatement => StatementKind::Write {
            record: None,
            from: None,
        },
        ContextKind::RewriteStatement => StatementKind::Rewrite {
            record: None,
            from: None,
        },
        ContextKind::DeleteStatement => StatementKind::Delete { file: None },
        ContextKind::StartStatement => StatementKind::Start { file: None },
        ContextKind::StopStatement => StatementKind::StopRun,
        ContextKind::GobackStatement => StatementKind::Goback,
        ContextKind::ExitStatement => StatementKind::Exit,
        ContextKind::ContinueStatement => StatementKind::Continue,
        ContextKind::ExecSqlStatement => StatementKind::ExecSql {
            payload: String::new(),
        },
        ContextKind::ExecCicsStatement => StatementKind::ExecCics {
            payload: String::new(),
        },
        _ => StatementKind::Other {
            verb: tree
                .first_word(ctx)
                .map(|w| w.to_ascii_uppercase())
                .unwrap_or_default(),
            operands: Vec::new(),
        },
    }
}

/// Nearest paragraph, section, or division for a statement context.
fn statement_owner(p: &PassCtx<'_>, ctx: ContextId) -> Result<NodeId> {
    if let Some(par) = p
        .registry
        .find_enclosing(p.arena, p.tree, ctx, NodeTag::Paragraph)
    {
        return Ok(par);
    }
    if let Some(sec) = p
        .registry
        .find_enclosing(p.arena, p.tree, ctx, NodeTag::ProcedureSection)
    {
        return Ok(sec);
    }
    p.find_owner(ctx, NodeTag::ProcedureDivision)
}

fn append_statement(kind: &mut NodeKind, id: NodeId) {
    match kind {
        NodeKind::Paragraph(par) => par.statements.push(id),
        NodeKind::ProcedureSection(sec) => sec.statements.push(id),
        NodeKind::ProcedureDivision(div) => div.statements.push(id),
        _ => {}
    }
}

pub(crate) fn run(pass: &mut PassCtx<'_>, unit_ctx: ContextId, _unit: NodeId) -> Result<()> {
    walk_unit(unit_ctx, pass, &mut |p, ctx| {
        let kind = p.tree.kind(ctx);

        if kind == ContextKind::ProcedureSection {
            let owner = p.find_owner(ctx, NodeTag::ProcedureDivision)?;
            let name = p
                .tree
                .child_tokens(ctx)
                .next()
                .map(|t| t.text.clone())
                .unwrap_or_default();
            p.attach(
                owner,
                ctx,
                NodeKind::ProcedureSection(ProcedureSectionNode {
                    name,
                    paragraphs: Vec::new(),
                    statements: Vec::new(),
                }),
                |k, id| {
                    if let NodeKind::ProcedureDivision(div) = k {
                        div.sections.push(id);
                    }
                },
            );
            return Ok(());
        }

        if kind == ContextKind::Paragraph {
            let owner = match p
                .registry
                .find_enclosing(p.arena, p.tree, ctx, NodeTag::ProcedureSection)
            {
                Some(sec) => sec,
                None => p.find_owner(ctx, NodeTag::ProcedureDivision)?,
            };
            let name = p
                .tree
                .child_tokens(ctx)
                .next()
                .map(|t| t.text.clone())
                .unwrap_or_default();
            p.attach(
                owner,
                ctx,
                NodeKind::Paragraph(ParagraphNode {
                    name,
                    statements: Vec::new(),
                }),
                |k, id| match k {
                    NodeKind::ProcedureSection(sec) => sec.paragraphs.push(id),
                    NodeKind::ProcedureDivision(div) => div.paragraphs.push(id),
                    _ => {}
                },
            );
            return Ok(());
        }

        if kind.is_statement() {
            let owner = statement_owner(p, ctx)?;
            let node = StatementNode::new(skeleton(p.tree, ctx));
            p.attach(owner, ctx, NodeKind::Statement(node), append_statement);
        }

        Ok(())
    })
}
