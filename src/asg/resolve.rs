//! Name resolution against a compilation unit's declarations.
//!
//! A [`SymbolIndex`] snapshots every name a unit declares: data items
//! (with their ancestor chains for OF/IN qualification), condition names,
//! files, mnemonics, paragraphs, and sections, plus the GLOBAL data items
//! of enclosing units for nested programs. The index owns its data, so the
//! statement pass can keep resolving while it mutates the arena.
//!
//! Lookup order for data names: the unit's own declarations first
//! (qualified matches narrow the candidate set), then GLOBAL items of
//! enclosing units. One match resolves; zero or several produce an
//! unresolved placeholder carrying every candidate, and the consumer
//! decides what ambiguity means.

use std::collections::HashMap;

use crate::asg::node::{Arena, NodeId, NodeKind, NodeTag};
use crate::asg::reference::Reference;

/// One named declaration with its qualification chain.
#[derive(Debug, Clone)]
struct Symbol {
    name: String,
    id: NodeId,
    /// Names of enclosing groups and file descriptors, nearest first.
    ancestors: Vec<String>,
}

/// Owned snapshot of a unit's declarations.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    data: Vec<Symbol>,
    globals: Vec<Symbol>,
    files: Vec<Symbol>,
    mnemonics: Vec<Symbol>,
    paragraphs: Vec<Symbol>,
    sections: Vec<Symbol>,
    /// Paragraph id -> owning section id.
    paragraph_sections: HashMap<NodeId, NodeId>,
}

/// The declared name of a node, when it has one.
fn node_name(arena: &Arena, id: NodeId) -> Option<String> {
    match arena.kind(id) {
        NodeKind::DataDescriptionEntry(d) => d.name.clone(),
        NodeKind::ConditionName(c) => Some(c.name.clone()),
        NodeKind::RenamesEntry(r) => Some(r.name.clone()),
        NodeKind::FileDescriptionEntry(f) => Some(f.file_name.clone()),
        NodeKind::FileControlEntry(f) => Some(f.file_name.clone()),
        NodeKind::SpecialName(s) => s.mnemonic.clone(),
        NodeKind::ProcedureSection(s) => Some(s.name.clone()),
        NodeKind::Paragraph(p) => Some(p.name.clone()),
        _ => None,
    }
}

/// Ancestor names for qualification, nearest enclosing first.
fn ancestor_names(arena: &Arena, id: NodeId) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = arena.get(id).parent;
    while let Some(p) = current {
        match arena.kind(p) {
            NodeKind::DataDescriptionEntry(d) => {
                if let Some(name) = &d.name {
                    out.push(name.to_ascii_uppercase());
                }
            }
            NodeKind::FileDescriptionEntry(f) => {
                out.push(f.file_name.to_ascii_uppercase());
            }
            NodeKind::CompilationUnit(_) | NodeKind::Program(_) => break,
            _ => {}
        }
        current = arena.get(p).parent;
    }
    out
}

impl SymbolIndex {
    /// Snapshot the declarations of one compilation unit.
    pub fn for_unit(arena: &Arena, unit: NodeId) -> Self {
        let mut index = SymbolIndex::default();
        index.collect(arena, unit, unit);

        // GLOBAL items of enclosing units, outermost last.
        let mut enclosing = match arena.kind(unit) {
            NodeKind::CompilationUnit(u) => u.parent_unit,
            _ => None,
        };
        while let Some(ancestor_unit) = enclosing {
            index.collect_globals(arena, ancestor_unit, ancestor_unit);
            enclosing = match arena.kind(ancestor_unit) {
                NodeKind::CompilationUnit(u) => u.parent_unit,
                _ => None,
            };
        }

        index
    }

    fn collect(&mut self, arena: &Arena, unit: NodeId, node: NodeId) {
        for child in arena.children(node) {
            // Nested programs index themselves.
            if arena.kind(child).tag() == NodeTag::CompilationUnit {
                continue;
            }
            self.record(arena, unit, child);
            self.collect(arena, unit, child);
        }
    }

    fn record(&mut self, arena: &Arena, _unit: NodeId, id: NodeId) {
        let Some(name) = node_name(arena, id) else {
            return;
        };
        let symbol = Symbol {
            name: name.to_ascii_uppercase(),
            id,
            ancestors: ancestor_names(arena, id),
        };

        match arena.kind(id).tag() {
            NodeTag::DataDescriptionEntry | NodeTag::ConditionName | NodeTag::RenamesEntry => {
                self.data.push(symbol)
            }
            NodeTag::FileControlEntry => self.files.push(symbol),
            NodeTag::SpecialName => self.mnemonics.push(symbol),
            NodeTag::ProcedureSection => self.sections.push(symbol),
            NodeTag::Paragraph => {
                if let Some(parent) = arena.get(id).parent {
                    if arena.kind(parent).tag() == NodeTag::ProcedureSection {
                        self.paragraph_sections.insert(id, parent);
                    }
                }
                self.paragraphs.push(symbol)
            }
            _ => {}
        }
    }

    fn collect_globals(&mut self, arena: &Arena, unit: NodeId, node: NodeId) {
        for child in arena.children(node) {
            if arena.kind(child).tag() == NodeTag::CompilationUnit {
                continue;
            }
            if let NodeKind::DataDescriptionEntry(d) = arena.kind(child) {
                if d.is_global {
                    if let Some(name) = &d.name {
                        self.globals.push(Symbol {
                            name: name.to_ascii_uppercase(),
                            id: child,
                            ancestors: ancestor_names(arena, child),
                        });
                    }
                }
            }
            self.collect_globals(arena, unit, child);
        }
    }

    /// Whether a symbol satisfies an OF/IN qualifier chain, resolved
    /// bottom-up through its enclosing groups.
    fn qualifies(symbol: &Symbol, qualifiers: &[String]) -> bool {
        let mut from = 0;
        for qual in qualifiers {
            let qual_upper = qual.to_ascii_uppercase();
            match symbol.ancestors[from..]
                .iter()
                .position(|a| *a == qual_upper)
            {
                Some(at) => from += at + 1,
                None => return false,
            }
        }
        true
    }

    fn pick(
        matches: Vec<&Symbol>,
        fallback_candidates: Vec<NodeId>,
        name: &str,
        qualifiers: &[String],
    ) -> Option<Reference> {
        match matches.len() {
            0 => {
                if fallback_candidates.is_empty() {
                    None
                } else {
                    Some(Reference::Unresolved {
                        name: name.to_string(),
                        qualifiers: qualifiers.to_vec(),
                        candidates: fallback_candidates,
                    })
                }
            }
            1 => Some(Reference::resolved(name, matches[0].id)),
            _ => Some(Reference::Unresolved {
                name: name.to_string(),
                qualifiers: qualifiers.to_vec(),
                candidates: matches.iter().map(|s| s.id).collect(),
            }),
        }
    }

    /// Resolve a data name with optional OF/IN qualifiers.
    pub fn resolve_data(&self, name: &str, qualifiers: &[String]) -> Reference {
        let upper = name.to_ascii_uppercase();
        let by_name: Vec<&Symbol> = self.data.iter().filter(|s| s.name == upper).collect();
        let filtered: Vec<&Symbol> = by_name
            .iter()
            .copied()
            .filter(|s| Self::qualifies(s, qualifiers))
            .collect();

        let name_candidates: Vec<NodeId> = by_name.iter().map(|s| s.id).collect();
        if let Some(reference) = Self::pick(filtered, name_candidates, name, qualifiers) {
            return reference;
        }

        // Not declared locally: GLOBAL items of enclosing units.
        let globals: Vec<&Symbol> = self
            .globals
            .iter()
            .filter(|s| s.name == upper && Self::qualifies(s, qualifiers))
            .collect();
        Self::pick(globals, Vec::new(), name, qualifiers).unwrap_or(Reference::Unresolved {
            name: name.to_string(),
            qualifiers: qualifiers.to_vec(),
            candidates: Vec::new(),
        })
    }

    /// Resolve a file name against FILE-CONTROL.
    pub fn resolve_file(&self, name: &str) -> Reference {
        let upper = name.to_ascii_uppercase();
        let matches: Vec<&Symbol> = self.files.iter().filter(|s| s.name == upper).collect();
        Self::pick(matches, Vec::new(), name, &[]).unwrap_or_else(|| Reference::unresolved(name))
    }

    /// Resolve a mnemonic name against SPECIAL-NAMES.
    pub fn resolve_mnemonic(&self, name: &str) -> Reference {
        let upper = name.to_ascii_uppercase();
        let matches: Vec<&Symbol> = self.mnemonics.iter().filter(|s| s.name == upper).collect();
        Self::pick(matches, Vec::new(), name, &[]).unwrap_or_else(|| Reference::unresolved(name))
    }

    /// Resolve a procedure name, preferring paragraphs of the current
    /// section.
    pub fn resolve_procedure(&self, name: &str, current_section: Option<NodeId>) -> Reference {
        let upper = name.to_ascii_uppercase();
        let paragraphs: Vec<&Symbol> =
            self.paragraphs.iter().filter(|s| s.name == upper).collect();

        if paragraphs.len() > 1 {
            if let Some(section) = current_section {
                let local: Vec<&Symbol> = paragraphs
                    .iter()
                    .copied()
                    .filter(|s| self.paragraph_sections.get(&s.id) == Some(&section))
                    .collect();
                if local.len() == 1 {
                    return Reference::resolved(name, local[0].id);
                }
            }
        }
        if paragraphs.len() == 1 {
            return Reference::resolved(name, paragraphs[0].id);
        }
        if paragraphs.len() > 1 {
            return Reference::Unresolved {
                name: name.to_string(),
                qualifiers: Vec::new(),
                candidates: paragraphs.iter().map(|s| s.id).collect(),
            };
        }

        let sections: Vec<&Symbol> = self.sections.iter().filter(|s| s.name == upper).collect();
        Self::pick(sections, Vec::new(), name, &[]).unwrap_or_else(|| Reference::unresolved(name))
    }
}
