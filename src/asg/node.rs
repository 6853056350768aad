//! ASG node storage.
//!
//! Every node lives in a per-program [`Arena`] and carries the same small
//! header: its identity, the parse-tree context it was built from, and its
//! owning parent. The element-specific payload hangs off [`NodeKind`], one
//! variant per element kind. Ownership edges are [`NodeId`]s inside the
//! payloads; cross-references use [`crate::asg::Reference`] and never imply
//! ownership, so parent links always form a tree rooted at the program
//! node.

use serde::{Deserialize, Serialize};

use crate::asg::data::{ConditionNameNode, DataDivisionNode, DataEntryNode, FileDescriptionEntryNode, FileSectionNode, RenamesEntryNode, StorageSectionNode};
use crate::asg::environment::{ConfigurationSectionNode, EnvironmentDivisionNode, FileControlEntryNode, InputOutputSectionNode, SpecialNameNode};
use crate::asg::identification::IdentificationDivisionNode;
use crate::asg::procedure::{ParagraphNode, ProcedureDivisionNode, ProcedureSectionNode, StatementNode};
use crate::parser::{ContextId, TreeId};

/// Identity of an ASG node, unique within its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// A parse-tree context qualified by the tree it belongs to.
///
/// One program may span several parse trees (one per analyzed file); the
/// registry keys on this pair so contexts from different trees never
/// collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextKey {
    pub tree: TreeId,
    pub ctx: ContextId,
}

impl ContextKey {
    pub fn new(tree: TreeId, ctx: ContextId) -> Self {
        Self { tree, ctx }
    }
}

macro_rules! for_all_node_kinds {
    ($mac:ident) => {
        $mac! {
            Program(ProgramNode),
            CompilationUnit(CompilationUnitNode),
            ProgramUnit(ProgramUnitNode),
            IdentificationDivision(IdentificationDivisionNode),
            EnvironmentDivision(EnvironmentDivisionNode),
            ConfigurationSection(ConfigurationSectionNode),
            SpecialName(SpecialNameNode),
            InputOutputSection(InputOutputSectionNode),
            FileControlEntry(FileControlEntryNode),
            DataDivision(DataDivisionNode),
            FileSection(FileSectionNode),
            WorkingStorageSection(StorageSectionNode),
            LocalStorageSection(StorageSectionNode),
            LinkageSection(StorageSectionNode),
            FileDescriptionEntry(FileDescriptionEntryNode),
            DataDescriptionEntry(DataEntryNode),
            ConditionName(ConditionNameNode),
            RenamesEntry(RenamesEntryNode),
            ProcedureDivision(ProcedureDivisionNode),
            ProcedureSection(ProcedureSectionNode),
            Paragraph(ParagraphNode),
            Statement(StatementNode),
        }
    };
}

macro_rules! gen_node_kind {
    ( $($variant:ident($payload:ty)),* $(,)? ) => {
        /// Element-specific payload, one variant per ASG element kind.
        #[derive(Debug, Clone)]
        pub enum NodeKind {
            $($variant($payload),)*
        }

        /// Fieldless discriminant of [`NodeKind`], used for owner lookups.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum NodeTag {
            $($variant,)*
        }

        impl NodeKind {
            /// The discriminant of this payload.
            pub fn tag(&self) -> NodeTag {
                match self {
                    $(NodeKind::$variant(_) => NodeTag::$variant,)*
                }
            }
        }

        impl NodeTag {
            /// Element kind name for diagnostics.
            pub fn name(self) -> &'static str {
                match self {
                    $(NodeTag::$variant => stringify!($variant),)*
                }
            }
        }
    };
}
for_all_node_kinds!(gen_node_kind);

/// The program root payload.
#[derive(Debug, Clone, Default)]
pub struct ProgramNode {
    /// Top-level compilation units, in analysis order.
    pub units: Vec<NodeId>,
}

/// One COBOL program (possibly nested) found in a source file.
#[derive(Debug, Clone)]
pub struct CompilationUnitNode {
    /// Unit name, derived from PROGRAM-ID (capitalized).
    pub name: String,
    /// The single program unit owned by this compilation unit.
    pub program_unit: Option<NodeId>,
    /// The enclosing compilation unit for nested programs.
    pub parent_unit: Option<NodeId>,
    /// Nested compilation units, in source order.
    pub nested: Vec<NodeId>,
    /// Index into the program's source list.
    pub source_index: usize,
}

/// The body of a compilation unit: the four optional divisions.
#[derive(Debug, Clone, Default)]
pub struct ProgramUnitNode {
    pub identification: Option<NodeId>,
    pub environment: Option<NodeId>,
    pub data: Option<NodeId>,
    pub procedure: Option<NodeId>,
}

/// Header-plus-payload for one node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub id: NodeId,
    /// The parse-tree context this node was built from. The program root,
    /// which spans all trees, has none.
    pub ctx: Option<ContextKey>,
    /// Owning parent; `None` only for the program root.
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

/// Per-program node storage.
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<NodeData>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node.
    pub fn alloc(
        &mut self,
        ctx: Option<ContextKey>,
        parent: Option<NodeId>,
        kind: NodeKind,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            id,
            ctx,
            parent,
            kind,
        });
        id
    }

    pub fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.get_mut(id).kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeData> {
        self.nodes.iter()
    }

    /// Owned children of a node, in declaration order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.kind(id) {
            NodeKind::Program(p) => p.units.clone(),
            NodeKind::CompilationUnit(u) => {
                let mut out: Vec<NodeId> = u.program_unit.into_iter().collect();
                out.extend(&u.nested);
                out
            }
            NodeKind::ProgramUnit(p) => [p.identification, p.environment, p.data, p.procedure]
                .into_iter()
                .flatten()
                .collect(),
            NodeKind::IdentificationDivision(_) => Vec::new(),
            NodeKind::EnvironmentDivision(e) => [e.configuration, e.input_output]
                .into_iter()
                .flatten()
                .collect(),
            NodeKind::ConfigurationSection(c) => c.special_names.clone(),
            NodeKind::SpecialName(_) => Vec::new(),
            NodeKind::InputOutputSection(io) => io.file_control_entries.clone(),
            NodeKind::FileControlEntry(_) => Vec::new(),
            NodeKind::DataDivision(d) => {
                [d.file_section, d.working_storage, d.local_storage, d.linkage]
                    .into_iter()
                    .flatten()
                    .collect()
            }
            NodeKind::FileSection(f) => f.entries.clone(),
            NodeKind::WorkingStorageSection(s)
            | NodeKind::LocalStorageSection(s)
            | NodeKind::LinkageSection(s) => s.entries.clone(),
            NodeKind::FileDescriptionEntry(f) => f.records.clone(),
            NodeKind::DataDescriptionEntry(d) => d.children.clone(),
            NodeKind::ConditionName(_) | NodeKind::RenamesEntry(_) => Vec::new(),
            NodeKind::ProcedureDivision(p) => {
                let mut out = p.sections.clone();
                out.extend(&p.paragraphs);
                out.extend(&p.statements);
                out
            }
            NodeKind::ProcedureSection(s) => {
                let mut out = s.paragraphs.clone();
                out.extend(&s.statements);
                out
            }
            NodeKind::Paragraph(p) => p.statements.clone(),
            NodeKind::Statement(_) => Vec::new(),
        }
    }
}
