//! File-control clause pass.
//!
//! Attaches the SELECT sub-clauses to the file-control entries the
//! program-unit pass created. Key and status names resolve against the
//! data division, which both data passes have fully populated by now.

use crate::asg::builder::{qualified_name_parts, walk_unit, PassCtx};
use crate::asg::environment::{AccessMode, FileOrganization};
use crate::asg::node::{NodeId, NodeKind};
use crate::asg::reference::Reference;
use crate::asg::resolve::SymbolIndex;
use crate::error::Result;
use crate::parser::{ContextId, ContextKind, ParseTree, TokenKind};

fn clause_reference(
    tree: &ParseTree,
    index: &SymbolIndex,
    clause: ContextId,
) -> Option<Reference> {
    let qctx = tree.find_child(clause, ContextKind::QualifiedDataName)?;
    let (name, quals) = qualified_name_parts(tree, qctx);
    Some(index.resolve_data(&name, &quals))
}

pub(crate) fn run(pass: &mut PassCtx<'_>, unit_ctx: ContextId, unit: NodeId) -> Result<()> {
    let index = SymbolIndex::for_unit(pass.arena, unit);

    walk_unit(unit_ctx, pass, &mut |p, ctx| {
        if p.tree.kind(ctx) != ContextKind::FileControlEntry {
            return Ok(());
        }
        let id = p.node_of(ctx)?;

        let mut assign_to = None;
        let mut organization = None;
        let mut access_mode = None;
        let mut record_key = None;
        let mut alternate_keys = Vec::new();
        let mut file_status = None;
        let mut reserve = None;
        let mut padding_character = None;

        for clause in p.tree.child_contexts(ctx) {
            match p.tree.kind(clause) {
                ContextKind::AssignClause => {
                    let parts: Vec<&str> = p
                        .tree
                        .child_tokens(clause)
                        .filter(|t| !(t.is_word("ASSIGN") || t.is_word("TO")))
                        .map(|t| t.text.as_str())
                        .collect();
                    if !parts.is_empty() {
                        assign_to = Some(parts.join(" "));
                    }
                }
                ContextKind::OrganizationClause => {
                    let words = p.tree.words(clause);
                    organization = if words.iter().any(|w| w.eq_ignore_ascii_case("LINE")) {
                        Some(FileOrganization::LineSequential)
                    } else {
                        words.iter().find_map(|w| FileOrganization::from_word(w))
                    };
                }
                ContextKind::AccessModeClause => {
                    access_mode = p
                        .tree
                        .words(clause)
                        .iter()
                        .find_map(|w| AccessMode::from_word(w));
                }
                ContextKind::RecordKeyClause => {
                    record_key = clause_reference(p.tree, &index, clause);
                }
                ContextKind::AlternateRecordKeyClause => {
                    if let Some(r) = clause_reference(p.tree, &index, clause) {
                        alternate_keys.push(r);
                    }
                }
                ContextKind::FileStatusClause => {
                    file_status = clause_reference(p.tree, &index, clause);
                }
                ContextKind::ReserveClause => {
                    reserve = p
                        .tree
                        .child_tokens(clause)
                        .find(|t| t.kind == TokenKind::Integer)
                        .and_then(|t| t.text.parse().ok());
                }
                ContextKind::PaddingCharacterClause => {
                    padding_character = p
                        .tree
                        .child_tokens(clause)
                        .filter(|t| {
                            !(t.is_word("PADDING") || t.is_word("CHARACTER") || t.is_word("IS"))
                        })
                        .next_back()
                        .map(|t| t.text.clone());
                }
                _ => {}
            }
        }

        if let NodeKind::FileControlEntry(entry) = p.arena.kind_mut(id) {
            entry.assign_to = assign_to;
            entry.organization = organization;
            entry.access_mode = access_mode;
            entry.record_key = record_key;
            entry.alternate_keys = alternate_keys;
            entry.file_status = file_status;
            entry.reserve = reserve;
            entry.padding_character = padding_character;
        }
        Ok(())
    })
}
