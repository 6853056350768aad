//! The ASG builder: a fixed, ordered sequence of tree walks.
//!
//! Each pass walks one compilation unit's parse-tree subtree depth-first
//! and, for every context it recognizes, locates the owning ASG element
//! through the registry and attaches a new child to it. The pass order is
//! load-bearing: later passes resolve names against nodes earlier passes
//! created, and no pass rewrites a field an earlier pass set.
//!
//! 1. Compilation-unit collector (one node per PROGRAM-ID, nested included)
//! 2. Program-unit pass: divisions, sections, entry skeletons
//! 3. Data division step 1: entries with level-number hierarchy
//! 4. Data division step 2: REDEFINES, OCCURS DEPENDING ON, 66/88 tables
//! 5. File-control clause pass
//! 6. File-description clause pass (FD -> SELECT cross-link)
//! 7. Procedure-division pass: sections, paragraphs, statement skeletons
//! 8. Procedure-statement pass: operands and name resolution

pub(crate) mod compilation_unit;
pub(crate) mod data_division;
pub(crate) mod file_control;
pub(crate) mod file_description;
pub(crate) mod procedure_division;
pub(crate) mod procedure_statement;
pub(crate) mod program_unit;

use tracing::info;

use crate::asg::node::{Arena, ContextKey, NodeId, NodeKind, NodeTag};
use crate::asg::registry::ElementRegistry;
use crate::asg::Program;
use crate::error::{AsgError, Result};
use crate::parser::{ContextId, ContextKind, ParseTree};
use crate::span::Location;
use crate::text::LineIndex;

/// Shared state handed to every builder pass: the unit's parse tree plus
/// mutable access to the arena and registry.
pub(crate) struct PassCtx<'a> {
    pub tree: &'a ParseTree,
    pub arena: &'a mut Arena,
    pub registry: &'a mut ElementRegistry,
    pub origin: &'a str,
    pub lines: LineIndex,
}

impl PassCtx<'_> {
    pub fn key(&self, ctx: ContextId) -> ContextKey {
        ContextKey::new(self.tree.id, ctx)
    }

    pub fn location(&self, ctx: ContextId) -> Location {
        let (line, column) = self.lines.line_col_1(self.tree.span(ctx).start);
        Location::new(self.origin, line, column)
    }

    /// The nearest enclosing ASG element of the wanted kind.
    pub fn find_owner(&self, ctx: ContextId, wanted: NodeTag) -> Result<NodeId> {
        self.registry
            .find_enclosing(self.arena, self.tree, ctx, wanted)
            .ok_or_else(|| AsgError::UnownedContext {
                kind: self.tree.kind(ctx).name(),
                wanted: wanted.name(),
                location: self.location(ctx),
            })
    }

    /// The node registered for a context.
    pub fn node_of(&self, ctx: ContextId) -> Result<NodeId> {
        self.registry
            .lookup(self.key(ctx))
            .ok_or_else(|| AsgError::UnownedContext {
                kind: self.tree.kind(ctx).name(),
                wanted: "registered node",
                location: self.location(ctx),
            })
    }

    /// The uniform add contract: construct a child bound to `ctx`,
    /// register it, append it to the owner through `append`, and return it.
    pub fn attach(
        &mut self,
        owner: NodeId,
        ctx: ContextId,
        kind: NodeKind,
        append: impl FnOnce(&mut NodeKind, NodeId),
    ) -> NodeId {
        let key = self.key(ctx);
        let id = self.arena.alloc(Some(key), Some(owner), kind);
        self.registry.register(key, id);
        append(self.arena.kind_mut(owner), id);
        id
    }
}

/// Depth-first walk over one unit's subtree, pruned at nested units.
pub(crate) fn walk_unit(
    ctx: ContextId,
    pass: &mut PassCtx<'_>,
    f: &mut dyn FnMut(&mut PassCtx<'_>, ContextId) -> Result<()>,
) -> Result<()> {
    f(pass, ctx)?;
    let children: Vec<ContextId> = pass.tree.child_contexts(ctx).collect();
    for child in children {
        if pass.tree.kind(child) == ContextKind::CompilationUnit {
            continue;
        }
        walk_unit(child, pass, f)?;
    }
    Ok(())
}

/// Split a QualifiedDataName context into the name and its OF/IN
/// qualifiers, in written order.
pub(crate) fn qualified_name_parts(tree: &ParseTree, ctx: ContextId) -> (String, Vec<String>) {
    let words = tree.words(ctx);
    let name = words.first().copied().unwrap_or("").to_string();
    let mut qualifiers = Vec::new();
    let mut i = 1;
    while i + 1 < words.len()
        && (words[i].eq_ignore_ascii_case("OF") || words[i].eq_ignore_ascii_case("IN"))
    {
        qualifiers.push(words[i + 1].to_string());
        i += 2;
    }
    (name, qualifiers)
}

type PassFn = fn(&mut PassCtx<'_>, ContextId, NodeId) -> Result<()>;

/// Run one pass over every compilation unit, in collection order.
fn run_pass(program: &mut Program, name: &str, f: PassFn) -> Result<()> {
    let unit_ids = program.units.clone();
    for unit_id in unit_ids {
        let (unit_ctx, source_index, unit_name) = match &program.arena.get(unit_id).kind {
            NodeKind::CompilationUnit(u) => {
                let Some(key) = program.arena.get(unit_id).ctx else {
                    continue;
                };
                (key.ctx, u.source_index, u.name.clone())
            }
            _ => continue,
        };

        info!(unit = %unit_name, pass = name, "analyzing compilation unit");

        let Program {
            arena,
            registry,
            sources,
            ..
        } = program;
        let source = &sources[source_index];
        let mut pass = PassCtx {
            tree: &source.tree,
            arena,
            registry,
            origin: &source.file_name,
            lines: LineIndex::new(&source.preprocessed),
        };
        f(&mut pass, unit_ctx, unit_id)?;
    }
    Ok(())
}

/// Run all builder passes over a program and freeze its registry.
pub fn build(program: &mut Program) -> Result<()> {
    compilation_unit::collect(program)?;

    run_pass(program, "program-unit", program_unit::run)?;
    run_pass(program, "data-division-1", data_division::run_step1)?;
    run_pass(program, "data-division-2", data_division::run_step2)?;
    run_pass(program, "file-control", file_control::run)?;
    run_pass(program, "file-description", file_description::run)?;
    run_pass(program, "procedure-division", procedure_division::run)?;
    run_pass(program, "procedure-statements", procedure_statement::run)?;

    program.registry.freeze();
    Ok(())
}
