//! Non-owning cross-references between ASG nodes.
//!
//! A reference records a use of a name (data item, procedure, file,
//! mnemonic) pointing at the node that declares it. References are opaque
//! ids, not pointers, so the graph serializes cleanly and reference cycles
//! never entangle ownership. Resolution failure is data, not an error: an
//! unresolved reference keeps the raw name, its qualifiers, and every
//! candidate the resolver could not decide between, and downstream tools
//! choose how strict to be.

use serde::{Deserialize, Serialize};

use crate::asg::node::NodeId;

/// A resolved or placeholder link to a declaring node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reference {
    /// The name resolved to exactly one declaration.
    Resolved { name: String, target: NodeId },
    /// The name did not resolve uniquely. `candidates` is empty when
    /// nothing matched and holds every tied declaration when the name was
    /// ambiguous.
    Unresolved {
        name: String,
        qualifiers: Vec<String>,
        candidates: Vec<NodeId>,
    },
}

impl Reference {
    /// Shorthand for a resolved link.
    pub fn resolved(name: impl Into<String>, target: NodeId) -> Self {
        Reference::Resolved {
            name: name.into(),
            target,
        }
    }

    /// Shorthand for an unresolved placeholder with no candidates.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Reference::Unresolved {
            name: name.into(),
            qualifiers: Vec::new(),
            candidates: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved { .. })
    }

    /// The target node, when resolved.
    pub fn target(&self) -> Option<NodeId> {
        match self {
            Reference::Resolved { target, .. } => Some(*target),
            Reference::Unresolved { .. } => None,
        }
    }

    /// The referenced name as written (unqualified part).
    pub fn name(&self) -> &str {
        match self {
            Reference::Resolved { name, .. } => name,
            Reference::Unresolved { name, .. } => name,
        }
    }
}

/// A statement operand: a literal value or a reference to a data item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// A literal or figurative constant, kept as written.
    Literal { text: String },
    /// A data-name use.
    DataRef(Reference),
}

impl Operand {
    /// The data reference, when this operand is one.
    pub fn data_ref(&self) -> Option<&Reference> {
        match self {
            Operand::DataRef(r) => Some(r),
            Operand::Literal { .. } => None,
        }
    }

    /// The literal text, when this operand is a literal.
    pub fn literal_text(&self) -> Option<&str> {
        match self {
            Operand::Literal { text } => Some(text),
            Operand::DataRef(_) => None,
        }
    }
}

/// A condition or arithmetic expression kept as raw text plus the data
/// references found inside it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpressionInfo {
    /// The expression text as written.
    pub text: String,
    /// References for every data name appearing in the expression.
    pub refs: Vec<Reference>,
}
