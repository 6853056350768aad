//! Compilation-unit collection.
//!
//! Walks every parse tree top-down and allocates one compilation-unit node
//! per ProgramUnit-bearing context, nested programs included. Runs before
//! all other passes so that every later `find_owner` can stop at a unit.

use tracing::info;

use crate::asg::node::{CompilationUnitNode, ContextKey, NodeKind, NodeTag};
use crate::asg::Program;
use crate::error::Result;
use crate::parser::{ContextId, ContextKind, ParseTree};

/// Unit name, capitalized the way the runner names units: first letter
/// upper, the rest lower.
pub(crate) fn capitalize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => lower,
    }
}

/// The PROGRAM-ID name inside a CompilationUnit context, if present.
fn program_id_name(tree: &ParseTree, unit_ctx: ContextId) -> Option<String> {
    let pu = tree.find_child(unit_ctx, ContextKind::ProgramUnit)?;
    let id_div = tree.find_child(pu, ContextKind::IdentificationDivision)?;
    let pid = tree.find_child(id_div, ContextKind::ProgramIdParagraph)?;
    tree.words(pid).get(1).map(|w| w.to_string())
}

/// Allocate compilation-unit nodes for every unit in every source.
pub(crate) fn collect(program: &mut Program) -> Result<()> {
    let root_node = program.root();

    for index in 0..program.sources.len() {
        let Program {
            arena,
            registry,
            sources,
            units,
            ..
        } = program;
        let source = &sources[index];
        let tree = &source.tree;

        for ctx in tree.descendants(tree.root()) {
            if tree.kind(ctx) != ContextKind::CompilationUnit {
                continue;
            }

            let parent_unit = registry.find_enclosing(arena, tree, ctx, NodeTag::CompilationUnit);
            let parent_node = parent_unit.unwrap_or(root_node);
            let raw_name =
                program_id_name(tree, ctx).unwrap_or_else(|| source.name.clone());
            let name = capitalize(&raw_name);

            info!(unit = %name, file = %source.file_name, "collected compilation unit");

            let key = ContextKey::new(tree.id, ctx);
            let id = arena.alloc(
                Some(key),
                Some(parent_node),
                NodeKind::CompilationUnit(CompilationUnitNode {
                    name,
                    program_unit: None,
                    parent_unit,
                    nested: Vec::new(),
                    source_index: index,
                }),
            );
            registry.register(key, id);

            match arena.kind_mut(parent_node) {
                NodeKind::Program(p) => p.units.push(id),
                NodeKind::CompilationUnit(u) => u.nested.push(id),
                _ => {}
            }
            units.push(id);
        }
    }

    Ok(())
}
