//! Data division elements.
//!
//! Data description entries are created by the first data pass, which turns
//! the flat level-numbered entry list into a tree with the classic stack
//! machine: on an entry with level L, pop while the stack top's level is
//! >= L, the remaining top is the parent. The second data pass fills in
//! everything that needs other entries to exist already: REDEFINES targets,
//! OCCURS DEPENDING ON, RENAMES ranges, and 88 condition value tables.

use serde::{Deserialize, Serialize};

use crate::asg::node::NodeId;
use crate::asg::reference::Reference;

/// The DATA DIVISION of a program unit.
#[derive(Debug, Clone, Default)]
pub struct DataDivisionNode {
    pub file_section: Option<NodeId>,
    pub working_storage: Option<NodeId>,
    pub local_storage: Option<NodeId>,
    pub linkage: Option<NodeId>,
}

/// The FILE SECTION, holding FD/SD entries.
#[derive(Debug, Clone, Default)]
pub struct FileSectionNode {
    pub entries: Vec<NodeId>,
}

/// WORKING-STORAGE, LOCAL-STORAGE, or LINKAGE SECTION.
#[derive(Debug, Clone, Default)]
pub struct StorageSectionNode {
    /// Top-level (01/77) entries in source order.
    pub entries: Vec<NodeId>,
}

/// FD or SD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileDescriptorKind {
    Fd,
    Sd,
}

/// A file (or sort file) description entry.
#[derive(Debug, Clone)]
pub struct FileDescriptionEntryNode {
    pub kind: FileDescriptorKind,
    pub file_name: String,
    /// BLOCK CONTAINS min (and TO max) value.
    pub block_contains: Option<(u32, Option<u32>)>,
    /// RECORD CONTAINS min (and TO max) value.
    pub record_contains: Option<(u32, Option<u32>)>,
    /// LABEL RECORDS ARE STANDARD (true) / OMITTED (false).
    pub label_standard: Option<bool>,
    /// DATA RECORDS ARE names, as written.
    pub data_record_names: Vec<String>,
    /// The 01-level record entries described by this FD.
    pub records: Vec<NodeId>,
    /// Cross-link to the SELECT entry with the same file name.
    pub select_entry: Option<Reference>,
}

impl FileDescriptionEntryNode {
    /// A fresh descriptor carrying only its kind and name.
    pub fn named(kind: FileDescriptorKind, file_name: impl Into<String>) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            block_contains: None,
            record_contains: None,
            label_standard: None,
            data_record_names: Vec::new(),
            records: Vec::new(),
            select_entry: None,
        }
    }
}

/// USAGE of an elementary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageKind {
    Display,
    Binary,
    PackedDecimal,
    FloatShort,
    FloatLong,
    Index,
    Pointer,
}

impl UsageKind {
    /// Map a USAGE clause word, including the COMP aliases.
    pub fn from_word(word: &str) -> Option<Self> {
        let upper = word.to_ascii_uppercase();
        match upper.as_str() {
            "DISPLAY" => Some(UsageKind::Display),
            "BINARY" | "COMP" | "COMPUTATIONAL" | "COMP-4" | "COMPUTATIONAL-4" | "COMP-5"
            | "COMPUTATIONAL-5" => Some(UsageKind::Binary),
            "PACKED-DECIMAL" | "COMP-3" | "COMPUTATIONAL-3" => Some(UsageKind::PackedDecimal),
            "COMP-1" | "COMPUTATIONAL-1" => Some(UsageKind::FloatShort),
            "COMP-2" | "COMPUTATIONAL-2" => Some(UsageKind::FloatLong),
            "INDEX" => Some(UsageKind::Index),
            "POINTER" => Some(UsageKind::Pointer),
            _ => None,
        }
    }
}

/// SIGN clause details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInfo {
    /// LEADING (true) or TRAILING (false).
    pub leading: bool,
    /// SEPARATE CHARACTER present.
    pub separate: bool,
}

/// OCCURS clause details. `depending` is resolved by the second data pass.
#[derive(Debug, Clone, Default)]
pub struct OccursInfo {
    pub min: u32,
    pub max: Option<u32>,
    pub depending: Option<Reference>,
    pub indexed_by: Vec<String>,
}

/// A data description entry (levels 01-49 and 77).
#[derive(Debug, Clone)]
pub struct DataEntryNode {
    pub level: u8,
    /// Declared name; `None` for FILLER and anonymous entries.
    pub name: Option<String>,
    pub picture: Option<String>,
    pub usage: Option<UsageKind>,
    pub sign: Option<SignInfo>,
    /// VALUE clause literal as written.
    pub value: Option<String>,
    pub occurs: Option<OccursInfo>,
    /// REDEFINES target, resolved by the second data pass.
    pub redefines: Option<Reference>,
    pub is_global: bool,
    pub is_external: bool,
    /// Subordinate entries and condition names, in source order.
    pub children: Vec<NodeId>,
}

impl DataEntryNode {
    /// A fresh entry with level and optional name.
    pub fn new(level: u8, name: Option<String>) -> Self {
        Self {
            level,
            name,
            picture: None,
            usage: None,
            sign: None,
            value: None,
            occurs: None,
            redefines: None,
            is_global: false,
            is_external: false,
            children: Vec::new(),
        }
    }

    /// Whether this entry is a group (no picture, has children).
    pub fn is_group(&self) -> bool {
        self.picture.is_none() && !self.children.is_empty()
    }
}

/// One value or value range of an 88 condition name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionValueRange {
    pub from: String,
    pub to: Option<String>,
}

/// A level-88 condition name. Values are filled by the second data pass.
#[derive(Debug, Clone)]
pub struct ConditionNameNode {
    pub name: String,
    pub values: Vec<ConditionValueRange>,
}

/// A level-66 RENAMES entry. Range refs are filled by the second data pass.
#[derive(Debug, Clone)]
pub struct RenamesEntryNode {
    pub name: String,
    pub from: Option<Reference>,
    pub thru: Option<Reference>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_aliases_collapse() {
        assert_eq!(UsageKind::from_word("COMP"), Some(UsageKind::Binary));
        assert_eq!(UsageKind::from_word("comp-3"), Some(UsageKind::PackedDecimal));
        assert_eq!(UsageKind::from_word("COMPUTATIONAL-1"), Some(UsageKind::FloatShort));
        assert_eq!(UsageKind::from_word("WHATEVER"), None);
    }

    #[test]
    fn group_detection() {
        let mut entry = DataEntryNode::new(1, Some("REC".to_string()));
        assert!(!entry.is_group());
        entry.children.push(NodeId(9));
        assert!(entry.is_group());
    }
}
