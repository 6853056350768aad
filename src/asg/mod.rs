//! The Abstract Semantic Graph.
//!
//! A [`Program`] owns everything one analysis produced: the node arena,
//! the context registry, the source units (preprocessed text plus parse
//! tree), and the list of compilation units. Traversal is by owning
//! children ([`Arena::children`]); cross-references are explicit
//! [`Reference`] values resolved through node ids.
//!
//! The registry is scoped to the program value: every analysis obtains a
//! fresh one, nothing is process-global. It is written only while the
//! builder passes run and frozen afterwards, so a finished program is
//! immutable and safe to hand around.

pub mod builder;
pub mod data;
pub mod environment;
pub mod identification;
pub mod node;
pub mod procedure;
pub mod reference;
pub mod registry;
pub mod resolve;

pub use node::{
    Arena, CompilationUnitNode, ContextKey, NodeData, NodeId, NodeKind, NodeTag, ProgramNode,
    ProgramUnitNode,
};
pub use reference::{ExpressionInfo, Operand, Reference};
pub use registry::ElementRegistry;
pub use resolve::SymbolIndex;

use crate::parser::ParseTree;
use crate::preprocessor::SourceFormat;

/// One analyzed source file: its preprocessed text and parse tree.
#[derive(Debug)]
pub struct SourceUnit {
    /// Base name (file stem) used when no PROGRAM-ID is present.
    pub name: String,
    /// File name for diagnostics.
    pub file_name: String,
    /// The source format the file was read with.
    pub format: SourceFormat,
    /// The fully preprocessed text, retrievable as an artifact.
    pub preprocessed: String,
    /// The parse tree built from the preprocessed text.
    pub tree: ParseTree,
}

/// The ASG root: owns all nodes, the registry, and the analyzed sources.
#[derive(Debug)]
pub struct Program {
    pub arena: Arena,
    pub registry: ElementRegistry,
    root: NodeId,
    /// Every compilation unit, nested ones included, in collection order.
    pub units: Vec<NodeId>,
    pub sources: Vec<SourceUnit>,
}

impl Program {
    /// An empty program with just its root node.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(None, None, NodeKind::Program(ProgramNode::default()));
        Self {
            arena,
            registry: ElementRegistry::new(),
            root,
            units: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// The root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Register an analyzed source. Its tree id must equal its index.
    pub fn add_source(&mut self, source: SourceUnit) {
        debug_assert_eq!(
            source.tree.id.0 as usize,
            self.sources.len(),
            "tree id must match source index"
        );
        self.sources.push(source);
    }

    /// All compilation units, nested ones included.
    pub fn compilation_units(&self) -> &[NodeId] {
        &self.units
    }

    /// Typed access to a compilation unit node.
    pub fn compilation_unit(&self, id: NodeId) -> Option<&CompilationUnitNode> {
        match self.arena.kind(id) {
            NodeKind::CompilationUnit(u) => Some(u),
            _ => None,
        }
    }

    /// Find a compilation unit by name (case-insensitive).
    pub fn unit_by_name(&self, name: &str) -> Option<NodeId> {
        self.units.iter().copied().find(|id| {
            self.compilation_unit(*id)
                .is_some_and(|u| u.name.eq_ignore_ascii_case(name))
        })
    }

    /// The preprocessed text a unit was built from.
    pub fn preprocessed_text(&self, unit: NodeId) -> Option<&str> {
        let u = self.compilation_unit(unit)?;
        self.sources
            .get(u.source_index)
            .map(|s| s.preprocessed.as_str())
    }

    /// Preorder traversal of the owned subtree under a node.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            let children = self.arena.children(n);
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
