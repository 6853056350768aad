//! Program-unit pass.
//!
//! Creates the skeleton every later pass navigates: the program unit, its
//! divisions, the environment sections with their special names and
//! file-control entries, the data division sections, and the file
//! description entries. Clause contents stay untouched; the dedicated
//! passes fill them in.

use crate::asg::builder::{walk_unit, PassCtx};
use crate::asg::data::{
    DataDivisionNode, FileDescriptionEntryNode, FileDescriptorKind, FileSectionNode,
    StorageSectionNode,
};
use crate::asg::environment::{
    ConfigurationSectionNode, EnvironmentDivisionNode, FileControlEntryNode,
    InputOutputSectionNode, SpecialNameNode,
};
use crate::asg::identification::IdentificationDivisionNode;
use crate::asg::node::{NodeId, NodeKind, NodeTag, ProgramUnitNode};
use crate::asg::procedure::ProcedureDivisionNode;
use crate::error::Result;
use crate::parser::{ContextId, ContextKind, ParseTree};

/// Comment-entry text of an identification paragraph: everything after the
/// paragraph keyword and its period.
fn comment_entry(tree: &ParseTree, ctx: ContextId) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for token in tree.child_tokens(ctx).skip(1) {
        parts.push(token.text.as_str());
    }
    while parts.first() == Some(&".") {
        parts.remove(0);
    }
    while parts.last() == Some(&".") {
        parts.pop();
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn build_identification(tree: &ParseTree, ctx: ContextId) -> IdentificationDivisionNode {
    let mut node = IdentificationDivisionNode::default();

    if let Some(pid) = tree.find_child(ctx, ContextKind::ProgramIdParagraph) {
        let words = tree.words(pid);
        node.program_name = words.get(1).map(|w| w.to_string());
        node.is_common = words.iter().any(|w| w.eq_ignore_ascii_case("COMMON"));
        node.is_initial = words.iter().any(|w| w.eq_ignore_ascii_case("INITIAL"));
    }

    let text_of = |kind| tree.find_child(ctx, kind).and_then(|p| comment_entry(tree, p));
    node.author = text_of(ContextKind::AuthorParagraph);
    node.installation = text_of(ContextKind::InstallationParagraph);
    node.date_written = text_of(ContextKind::DateWrittenParagraph);
    node.date_compiled = text_of(ContextKind::DateCompiledParagraph);
    node.security = text_of(ContextKind::SecurityParagraph);
    node.remarks = text_of(ContextKind::RemarksParagraph);

    node
}

fn build_configuration(tree: &ParseTree, ctx: ContextId) -> ConfigurationSectionNode {
    let mut node = ConfigurationSectionNode::default();

    if let Some(sc) = tree.find_child(ctx, ContextKind::SourceComputerParagraph) {
        let words = tree.words(sc);
        node.debugging_mode = words
            .windows(2)
            .any(|w| w[0].eq_ignore_ascii_case("DEBUGGING") && w[1].eq_ignore_ascii_case("MODE"));
        let name: Vec<&str> = words
            .iter()
            .skip(1)
            .filter(|w| {
                !w.eq_ignore_ascii_case("WITH")
                    && !w.eq_ignore_ascii_case("DEBUGGING")
                    && !w.eq_ignore_ascii_case("MODE")
            })
            .copied()
            .collect();
        if !name.is_empty() {
            node.source_computer = Some(name.join(" "));
        }
    }

    if let Some(oc) = tree.find_child(ctx, ContextKind::ObjectComputerParagraph) {
        let words = tree.words(oc);
        if words.len() > 1 {
            node.object_computer = Some(words[1..].join(" "));
        }
    }

    node
}

/// The file name declared by a SELECT entry: the first word after SELECT
/// and an optional OPTIONAL.
fn select_file_name(tree: &ParseTree, ctx: ContextId) -> String {
    tree.words(ctx)
        .into_iter()
        .skip(1)
        .find(|w| !w.eq_ignore_ascii_case("OPTIONAL"))
        .unwrap_or("")
        .to_string()
}

pub(crate) fn run(pass: &mut PassCtx<'_>, unit_ctx: ContextId, _unit: NodeId) -> Result<()> {
    walk_unit(unit_ctx, pass, &mut |p, ctx| {
        match p.tree.kind(ctx) {
            ContextKind::ProgramUnit => {
                let owner = p.find_owner(ctx, NodeTag::CompilationUnit)?;
                p.attach(
                    owner,
                    ctx,
                    NodeKind::ProgramUnit(ProgramUnitNode::default()),
                    |k, id| {
                        if let NodeKind::CompilationUnit(u) = k {
                            u.program_unit = Some(id);
                        }
                    },
                );
            }
            ContextKind::IdentificationDivision => {
                let owner = p.find_owner(ctx, NodeTag::ProgramUnit)?;
                let node = build_identification(p.tree, ctx);
                p.attach(
                    owner,
                    ctx,
                    NodeKind::IdentificationDivision(node),
                    |k, id| {
                        if let NodeKind::ProgramUnit(u) = k {
                            u.identification = Some(id);
                        }
                    },
                );
            }
            ContextKind::EnvironmentDivision => {
                let owner = p.find_owner(ctx, NodeTag::ProgramUnit)?;
                p.attach(
                    owner,
                    ctx,
                    NodeKind::EnvironmentDivision(EnvironmentDivisionNode::default()),
                    |k, id| {
                        if let NodeKind::ProgramUnit(u) = k {
                            u.environment = Some(id);
                        }
                    },
                );
            }
            ContextKind::ConfigurationSection => {
                let owner = p.find_owner(ctx, NodeTag::EnvironmentDivision)?;
                let node = build_configuration(p.tree, ctx);
                p.attach(owner, ctx, NodeKind::ConfigurationSection(node), |k, id| {
                    if let NodeKind::EnvironmentDivision(e) = k {
                        e.configuration = Some(id);
                    }
                });
            }
            ContextKind::SpecialNameClause => {
                let owner = p.find_owner(ctx, NodeTag::ConfigurationSection)?;
                let words = p.tree.words(ctx);
                let system_name = words.first().copied().unwrap_or("").to_string();
                let mnemonic = words
                    .iter()
                    .position(|w| w.eq_ignore_ascii_case("IS"))
                    .and_then(|at| words.get(at + 1))
                    .map(|w| w.to_string());
                p.attach(
                    owner,
                    ctx,
                    NodeKind::SpecialName(SpecialNameNode {
                        system_name,
                        mnemonic,
                    }),
                    |k, id| {
                        if let NodeKind::ConfigurationSection(c) = k {
                            c.special_names.push(id);
                        }
                    },
                );
            }
            ContextKind::InputOutputSection => {
                let owner = p.find_owner(ctx, NodeTag::EnvironmentDivision)?;
                p.attach(
                    owner,
                    ctx,
                    NodeKind::InputOutputSection(InputOutputSectionNode::default()),
                    |k, id| {
                        if let NodeKind::EnvironmentDivision(e) = k {
                            e.input_output = Some(id);
                        }
                    },
                );
            }
            ContextKind::FileControlEntry => {
                let owner = p.find_owner(ctx, NodeTag::InputOutputSection)?;
                let name = select_file_name(p.tree, ctx);
                p.attach(
                    owner,
                    ctx,
                    NodeKind::FileControlEntry(FileControlEntryNode::named(name)),
                    |k, id| {
                        if let NodeKind::InputOutputSection(io) = k {
                            io.file_control_entries.push(id);
                        }
                    },
                );
            }
            ContextKind::DataDivision => {
                let owner = p.find_owner(ctx, NodeTag::ProgramUnit)?;
                p.attach(
                    owner,
                    ctx,
                    NodeKind::DataDivision(DataDivisionNode::default()),
                    |k, id| {
                        if let NodeKind::ProgramUnit(u) = k {
                            u.data = Some(id);
                        }
                    },
                );
            }
            ContextKind::FileSection => {
                let owner = p.find_owner(ctx, NodeTag::DataDivision)?;
                p.attach(
                    owner,
                    ctx,
                    NodeKind::FileSection(FileSectionNode::default()),
                    |k, id| {
                        if let NodeKind::DataDivision(d) = k {
                            d.file_section = Some(id);
                        }
                    },
                );
            }
            ContextKind::WorkingStorageSection => {
                let owner = p.find_owner(ctx, NodeTag::DataDivision)?;
                p.attach(
                    owner,
                    ctx,
                    NodeKind::WorkingStorageSection(StorageSectionNode::default()),
                    |k, id| {
                        if let NodeKind::DataDivision(d) = k {
                            d.working_storage = Some(id);
                        }
                    },
                );
            }
            ContextKind::LocalStorageSection => {
                let owner = p.find_owner(ctx, NodeTag::DataDivision)?;
                p.attach(
                    owner,
                    ctx,
                    NodeKind::LocalStorageSection(StorageSectionNode::default()),
                    |k, id| {
                        if let NodeKind::DataDivision(d) = k {
                            d.local_storage = Some(id);
                        }
                    },
                );
            }
            ContextKind::LinkageSection => {
                let owner = p.find_owner(ctx, NodeTag::DataDivision)?;
                p.attach(
                    owner,
                    ctx,
                    NodeKind::LinkageSection(StorageSectionNode::default()),
                    |k, id| {
                        if let NodeKind::DataDivision(d) = k {
                            d.linkage = Some(id);
                        }
                    },
                );
            }
            ContextKind::FileDescriptionEntry => {
                let owner = p.find_owner(ctx, NodeTag::FileSection)?;
                let words = p.tree.words(ctx);
                let kind = if words.first().is_some_and(|w| w.eq_ignore_ascii_case("SD")) {
                    FileDescriptorKind::Sd
                } else {
                    FileDescriptorKind::Fd
                };
                let name = words.get(1).copied().unwrap_or("").to_string();
                p.attach(
                    owner,
                    ctx,
                    NodeKind::FileDescriptionEntry(FileDescriptionEntryNode::named(kind, name)),
                    |k, id| {
                        if let NodeKind::FileSection(f) = k {
                            f.entries.push(id);
                        }
                    },
                );
            }
            ContextKind::ProcedureDivision => {
                let owner = p.find_owner(ctx, NodeTag::ProgramUnit)?;
                p.attach(
                    owner,
                    ctx,
                    NodeKind::ProcedureDivision(ProcedureDivisionNode::default()),
                    |k, id| {
                        if let NodeKind::ProgramUnit(u) = k {
                            u.procedure = Some(id);
                        }
                    },
                );
            }
            _ => {}
        }
        Ok(())
    })
}
