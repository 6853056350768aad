//! File-description clause pass.
//!
//! Attaches FD/SD clause values to the descriptors and cross-links every
//! descriptor to the SELECT entry declaring the same file name. The link
//! is a non-owning reference: a missing SELECT becomes an unresolved
//! placeholder, never a build failure.

use crate::asg::builder::{walk_unit, PassCtx};
use crate::asg::node::{NodeId, NodeKind};
use crate::asg::resolve::SymbolIndex;
use crate::error::Result;
use crate::parser::{ContextId, ContextKind, ParseTree, TokenKind};

/// `min [TO max]` integers of a CONTAINS clause.
fn contains_range(tree: &ParseTree, clause: ContextId) -> Option<(u32, Option<u32>)> {
    let mut integers = tree
        .child_tokens(clause)
        .filter(|t| t.kind == TokenKind::Integer)
        .filter_map(|t| t.text.parse().ok());
    let min = integers.next()?;
    Some((min, integers.next()))
}

pub(crate) fn run(pass: &mut PassCtx<'_>, unit_ctx: ContextId, unit: NodeId) -> Result<()> {
    let index = SymbolIndex::for_unit(pass.arena, unit);

    walk_unit(unit_ctx, pass, &mut |p, ctx| {
        if p.tree.kind(ctx) != ContextKind::FileDescriptionEntry {
            return Ok(());
        }
        let id = p.node_of(ctx)?;

        let mut block_contains = None;
        let mut record_contains = None;
        let mut label_standard = None;
        let mut data_record_names = Vec::new();

        for clause in p.tree.child_contexts(ctx) {
            match p.tree.kind(clause) {
                ContextKind::BlockContainsClause => {
                    block_contains = contains_range(p.tree, clause);
                }
                ContextKind::RecordContainsClause => {
                    record_contains = contains_range(p.tree, clause);
                }
                ContextKind::LabelRecordsClause => {
                    let words = p.tree.words(clause);
                    if words.iter().any(|w| w.eq_ignore_ascii_case("STANDARD")) {
                        label_standard = Some(true);
                    } else if words.iter().any(|w| w.eq_ignore_ascii_case("OMITTED")) {
                        label_standard = Some(false);
                    }
                }
                ContextKind::DataRecordsClause => {
                    data_record_names = p
                        .tree
                        .words(clause)
                        .into_iter()
                        .filter(|w| {
                            !(w.eq_ignore_ascii_case("DATA")
                                || w.eq_ignore_ascii_case("RECORD")
                                || w.eq_ignore_ascii_case("RECORDS")
                                || w.eq_ignore_ascii_case("IS")
                                || w.eq_ignore_ascii_case("ARE"))
                        })
                        .map(|w| w.to_string())
                        .collect();
                }
                _ => {}
            }
        }

        let file_name = match p.arena.kind(id) {
            NodeKind::FileDescriptionEntry(f) => f.file_name.clone(),
            _ => return Ok(()),
        };
        let select_entry = index.resolve_file(&file_name);

        if let NodeKind::FileDescriptionEntry(fd) = p.arena.kind_mut(id) {
            fd.block_contains = block_contains;
            fd.record_contains = record_contains;
            fd.label_standard = label_standard;
            fd.data_record_names = data_record_names;
            fd.select_entry = Some(select_entry);
        }
        Ok(())
    })
}
