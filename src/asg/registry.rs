//! The element registry: parse-tree context to ASG node mapping.
//!
//! The registry is the builder's navigation structure. Every `add_*`
//! operation records the (context, node) pair it creates; later passes find
//! the owner of a clause by walking the context's parse-tree parents until
//! they hit a registered node of the wanted kind. The mapping is a
//! bijection: one node per context, one context per node.
//!
//! A registry belongs to exactly one [`crate::asg::Program`] value; it is
//! written only while the builder passes run and frozen afterwards.

use std::collections::HashMap;

use crate::asg::node::{Arena, ContextKey, NodeId, NodeTag};
use crate::parser::{ContextId, ParseTree};

/// Context-to-node registry, scoped to one program.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    map: HashMap<ContextKey, NodeId>,
    frozen: bool,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the node built from a context.
    ///
    /// Registering twice for one context, or after [`freeze`](Self::freeze),
    /// is a builder bug.
    pub fn register(&mut self, key: ContextKey, node: NodeId) {
        debug_assert!(!self.frozen, "registry is frozen");
        let previous = self.map.insert(key, node);
        debug_assert!(
            previous.is_none(),
            "context registered twice: {key:?} -> {previous:?} and {node:?}"
        );
    }

    /// The node built from a context, if any.
    pub fn lookup(&self, key: ContextKey) -> Option<NodeId> {
        self.map.get(&key).copied()
    }

    /// Walk a context's parse-tree ancestors to the nearest registered node
    /// of the wanted kind.
    pub fn find_enclosing(
        &self,
        arena: &Arena,
        tree: &ParseTree,
        ctx: ContextId,
        wanted: NodeTag,
    ) -> Option<NodeId> {
        let mut current = tree.parent(ctx);
        while let Some(p) = current {
            if let Some(node) = self.lookup(ContextKey::new(tree.id, p)) {
                if arena.kind(node).tag() == wanted {
                    return Some(node);
                }
            }
            current = tree.parent(p);
        }
        None
    }

    /// Nearest registered ancestor node of any kind.
    pub fn find_any_enclosing(&self, tree: &ParseTree, ctx: ContextId) -> Option<NodeId> {
        let mut current = tree.parent(ctx);
        while let Some(p) = current {
            if let Some(node) = self.lookup(ContextKey::new(tree.id, p)) {
                return Some(node);
            }
            current = tree.parent(p);
        }
        None
    }

    /// Stop accepting registrations.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate all registered pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ContextKey, NodeId)> + '_ {
        self.map.iter().map(|(k, v)| (*k, *v))
    }
}
