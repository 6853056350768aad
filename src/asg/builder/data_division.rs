//! Data division passes.
//!
//! Step 1 creates the data description entries and wires the level-number
//! hierarchy with a stack machine: on an entry with level L, pop while the
//! stack top's level is >= L, the remaining top is the parent, then push.
//! 01 and 77 start records, 02-49 nest, 88 condition names attach to the
//! entry above them, 66 RENAMES entries attach to the current record.
//!
//! Step 2 resolves everything that needs the full entry set: REDEFINES
//! targets (preferring a sibling of the same level), OCCURS DEPENDING ON,
//! RENAMES ranges, and 88 value tables.

use crate::asg::builder::{qualified_name_parts, walk_unit, PassCtx};
use crate::asg::data::{
    ConditionNameNode, ConditionValueRange, DataEntryNode, OccursInfo, RenamesEntryNode, SignInfo,
    UsageKind,
};
use crate::asg::node::{NodeId, NodeKind, NodeTag};
use crate::asg::reference::Reference;
use crate::asg::resolve::SymbolIndex;
use crate::error::{AsgError, Result};
use crate::parser::{ContextId, ContextKind, ParseTree, TokenKind};

/// Append a data child to whatever owns it.
fn append_child(kind: &mut NodeKind, id: NodeId) {
    match kind {
        NodeKind::DataDescriptionEntry(d) => d.children.push(id),
        NodeKind::FileDescriptionEntry(f) => f.records.push(id),
        NodeKind::WorkingStorageSection(s)
        | NodeKind::LocalStorageSection(s)
        | NodeKind::LinkageSection(s) => s.entries.push(id),
        NodeKind::FileSection(f) => f.entries.push(id),
        _ => {}
    }
}

/// The level number of a data description entry context.
fn entry_level(tree: &ParseTree, ctx: ContextId) -> u8 {
    tree.child_tokens(ctx)
        .find(|t| t.kind == TokenKind::Integer)
        .and_then(|t| t.text.parse().ok())
        .unwrap_or(0)
}

/// The declared name: the first direct word, with FILLER meaning none.
fn entry_name(tree: &ParseTree, ctx: ContextId) -> Option<String> {
    let name = tree.words(ctx).first()?.to_string();
    if name.eq_ignore_ascii_case("FILLER") {
        None
    } else {
        Some(name)
    }
}

/// Build an entry node from its clause contexts (references left for
/// step 2).
fn build_entry(tree: &ParseTree, ctx: ContextId) -> DataEntryNode {
    let mut node = DataEntryNode::new(entry_level(tree, ctx), entry_name(tree, ctx));

    for clause in tree.child_contexts(ctx) {
        match tree.kind(clause) {
            ContextKind::PictureClause => {
                node.picture = tree
                    .child_tokens(clause)
                    .find(|t| t.kind == TokenKind::Picture)
                    .map(|t| t.text.clone());
            }
            ContextKind::UsageClause => {
                node.usage = tree
                    .words(clause)
                    .iter()
                    .find_map(|w| UsageKind::from_word(w));
            }
            ContextKind::SignClause => {
                let words = tree.words(clause);
                let leading = words.iter().any(|w| w.eq_ignore_ascii_case("LEADING"));
                let separate = words.iter().any(|w| w.eq_ignore_ascii_case("SEPARATE"));
                node.sign = Some(SignInfo { leading, separate });
            }
            ContextKind::ValueClause => {
                let parts: Vec<&str> = tree
                    .child_tokens(clause)
                    .filter(|t| {
                        !(t.is_word("VALUE")
                            || t.is_word("VALUES")
                            || t.is_word("IS")
                            || t.is_word("ARE"))
                    })
                    .map(|t| t.text.as_str())
                    .collect();
                if !parts.is_empty() {
                    node.value = Some(parts.join(" "));
                }
            }
            ContextKind::OccursClause => {
                let mut integers = tree
                    .child_tokens(clause)
                    .filter(|t| t.kind == TokenKind::Integer)
                    .map(|t| t.text.parse().unwrap_or(0));
                let min = integers.next().unwrap_or(0);
                let max = integers.next();

                let words = tree.words(clause);
                let indexed_by: Vec<String> = match words
                    .iter()
                    .position(|w| w.eq_ignore_ascii_case("INDEXED"))
                {
                    Some(at) => words[at + 1..]
                        .iter()
                        .filter(|w| !w.eq_ignore_ascii_case("BY"))
                        .map(|w| w.to_string())
                        .collect(),
                    None => Vec::new(),
                };

                node.occurs = Some(OccursInfo {
                    min,
                    max,
                    depending: None,
                    indexed_by,
                });
            }
            ContextKind::GlobalClause => node.is_global = true,
            ContextKind::ExternalClause => node.is_external = true,
            _ => {}
        }
    }

    node
}

/// Step 1 state: the level stack and the current section or FD container.
#[derive(Default)]
struct Step1 {
    stack: Vec<(u8, NodeId)>,
    container: Option<NodeId>,
}

impl Step1 {
    fn visit(&mut self, p: &mut PassCtx<'_>, ctx: ContextId) -> Result<()> {
        match p.tree.kind(ctx) {
            ContextKind::FileSection => {
                self.container = None;
                self.stack.clear();
            }
            ContextKind::FileDescriptionEntry
            | ContextKind::WorkingStorageSection
            | ContextKind::LocalStorageSection
            | ContextKind::LinkageSection => {
                self.container = Some(p.node_of(ctx)?);
                self.stack.clear();
            }
            ContextKind::DataDescriptionEntry => self.entry(p, ctx)?,
            _ => {}
        }
        Ok(())
    }

    fn parent_for(&self, p: &PassCtx<'_>, ctx: ContextId, level: u8) -> Result<NodeId> {
        let parent = match level {
            // RENAMES attaches to the record being renamed into.
            66 => self.stack.first().map(|(_, id)| *id).or(self.container),
            // Condition names attach to the entry directly above.
            88 => self.stack.last().map(|(_, id)| *id).or(self.container),
            _ => self.stack.last().map(|(_, id)| *id).or(self.container),
        };
        parent.ok_or_else(|| AsgError::UnownedContext {
            kind: "DataDescriptionEntry",
            wanted: "data entry or section",
            location: p.location(ctx),
        })
    }

    fn entry(&mut self, p: &mut PassCtx<'_>, ctx: ContextId) -> Result<()> {
        let level = entry_level(p.tree, ctx);

        if level == 66 {
            let parent = self.parent_for(p, ctx, level)?;
            let name = entry_name(p.tree, ctx).unwrap_or_default();
            p.attach(
                parent,
                ctx,
                NodeKind::RenamesEntry(RenamesEntryNode {
                    name,
                    from: None,
                    thru: None,
                }),
                append_child,
            );
            return Ok(());
        }

        if level == 88 {
            let parent = self.parent_for(p, ctx, level)?;
            let name = entry_name(p.tree, ctx).unwrap_or_default();
            p.attach(
                parent,
                ctx,
                NodeKind::ConditionName(ConditionNameNode {
                    name,
                    values: Vec::new(),
                }),
                append_child,
            );
            return Ok(());
        }

        // 01 and 77 both start records at the section/FD level; 77 would
        // otherwise nest under any lower level still on the stack.
        if level == 77 {
            self.stack.clear();
        }
        while let Some(&(top, _)) = self.stack.last() {
            if top >= level {
                self.stack.pop();
            } else {
                break;
            }
        }

        let parent = self.parent_for(p, ctx, level)?;
        let node = build_entry(p.tree, ctx);
        let id = p.attach(parent, ctx, NodeKind::DataDescriptionEntry(node), append_child);
        self.stack.push((level, id));
        Ok(())
    }
}

pub(crate) fn run_step1(pass: &mut PassCtx<'_>, unit_ctx: ContextId, _unit: NodeId) -> Result<()> {
    let mut state = Step1::default();
    walk_unit(unit_ctx, pass, &mut |p, ctx| state.visit(p, ctx))
}

/// Resolve a REDEFINES target, preferring a sibling entry with the same
/// level over a same-named entry elsewhere.
fn resolve_redefines(
    p: &PassCtx<'_>,
    index: &SymbolIndex,
    entry: NodeId,
    target: &str,
) -> Reference {
    let reference = index.resolve_data(target, &[]);
    if let Reference::Unresolved { candidates, .. } = &reference {
        if candidates.len() > 1 {
            let my_parent = p.arena.get(entry).parent;
            let my_level = match p.arena.kind(entry) {
                NodeKind::DataDescriptionEntry(d) => d.level,
                _ => 0,
            };
            let siblings: Vec<NodeId> = candidates
                .iter()
                .copied()
                .filter(|c| {
                    p.arena.get(*c).parent == my_parent
                        && matches!(p.arena.kind(*c),
                            NodeKind::DataDescriptionEntry(d) if d.level == my_level)
                })
                .collect();
            if siblings.len() == 1 {
                return Reference::resolved(target, siblings[0]);
            }
        }
    }
    reference
}

/// 88 value ranges from a ConditionValueClause context.
fn condition_values(tree: &ParseTree, clause: ContextId) -> Vec<ConditionValueRange> {
    let mut values: Vec<ConditionValueRange> = Vec::new();
    let mut thru_pending = false;

    for slot in tree.children_slots(clause) {
        match slot {
            crate::parser::ParseChild::Context(c)
                if tree.kind(*c) == ContextKind::Literal =>
            {
                let text = tree.token_text(*c);
                if thru_pending {
                    if let Some(last) = values.last_mut() {
                        last.to = Some(text);
                    }
                    thru_pending = false;
                } else {
                    values.push(ConditionValueRange {
                        from: text,
                        to: None,
                    });
                }
            }
            crate::parser::ParseChild::Token(i) => {
                let t = tree.token(*i);
                if t.is_word("THRU") || t.is_word("THROUGH") {
                    thru_pending = true;
                }
            }
            _ => {}
        }
    }

    values
}

pub(crate) fn run_step2(pass: &mut PassCtx<'_>, unit_ctx: ContextId, unit: NodeId) -> Result<()> {
    let index = SymbolIndex::for_unit(pass.arena, unit);

    walk_unit(unit_ctx, pass, &mut |p, ctx| {
        if p.tree.kind(ctx) != ContextKind::DataDescriptionEntry {
            return Ok(());
        }
        let id = p.node_of(ctx)?;

        match p.arena.kind(id).tag() {
            NodeTag::RenamesEntry => {
                let clause = p.tree.find_child(ctx, ContextKind::RenamesClause);
                let mut from = None;
                let mut thru = None;
                if let Some(clause) = clause {
                    let mut names = p
                        .tree
                        .children_of_kind(clause, ContextKind::QualifiedDataName)
                        .into_iter();
                    if let Some(qctx) = names.next() {
                        let (name, quals) = qualified_name_parts(p.tree, qctx);
                        from = Some(index.resolve_data(&name, &quals));
                    }
                    if let Some(qctx) = names.next() {
                        let (name, quals) = qualified_name_parts(p.tree, qctx);
                        thru = Some(index.resolve_data(&name, &quals));
                    }
                }
                if let NodeKind::RenamesEntry(r) = p.arena.kind_mut(id) {
                    r.from = from;
                    r.thru = thru;
                }
            }
            NodeTag::ConditionName => {
                let values = p
                    .tree
                    .find_child(ctx, ContextKind::ConditionValueClause)
                    .map(|clause| condition_values(p.tree, clause))
                    .unwrap_or_default();
                if let NodeKind::ConditionName(c) = p.arena.kind_mut(id) {
                    c.values = values;
                }
            }
            NodeTag::DataDescriptionEntry => {
                let redefines = p
                    .tree
                    .find_child(ctx, ContextKind::RedefinesClause)
                    .and_then(|clause| p.tree.words(clause).get(1).map(|w| w.to_string()))
                    .map(|target| resolve_redefines(p, &index, id, &target));

                let depending = p
                    .tree
                    .find_child(ctx, ContextKind::OccursClause)
                    .and_then(|clause| {
                        p.tree.find_child(clause, ContextKind::QualifiedDataName)
                    })
                    .map(|qctx| {
                        let (name, quals) = qualified_name_parts(p.tree, qctx);
                        index.resolve_data(&name, &quals)
                    });

                if let NodeKind::DataDescriptionEntry(d) = p.arena.kind_mut(id) {
                    if redefines.is_some() {
                        d.redefines = redefines;
                    }
                    if let (Some(r), Some(occurs)) = (depending, d.occurs.as_mut()) {
                        occurs.depending = Some(r);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    })
}
