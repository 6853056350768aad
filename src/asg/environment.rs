//! Environment division elements.

use serde::{Deserialize, Serialize};

use crate::asg::node::NodeId;
use crate::asg::reference::Reference;

/// The ENVIRONMENT DIVISION of a program unit.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentDivisionNode {
    pub configuration: Option<NodeId>,
    pub input_output: Option<NodeId>,
}

/// The CONFIGURATION SECTION.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationSectionNode {
    /// SOURCE-COMPUTER text, WITH DEBUGGING MODE stripped.
    pub source_computer: Option<String>,
    /// OBJECT-COMPUTER text.
    pub object_computer: Option<String>,
    /// SOURCE-COMPUTER carried WITH DEBUGGING MODE.
    pub debugging_mode: bool,
    /// SPECIAL-NAMES entries.
    pub special_names: Vec<NodeId>,
}

/// One SPECIAL-NAMES entry, e.g. `CONSOLE IS CONS`.
#[derive(Debug, Clone)]
pub struct SpecialNameNode {
    /// The environment (system) name.
    pub system_name: String,
    /// The user-defined mnemonic, when the entry declares one.
    pub mnemonic: Option<String>,
}

/// The INPUT-OUTPUT SECTION.
#[derive(Debug, Clone, Default)]
pub struct InputOutputSectionNode {
    /// FILE-CONTROL entries in source order.
    pub file_control_entries: Vec<NodeId>,
}

/// File organization from the SELECT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileOrganization {
    #[default]
    Sequential,
    Indexed,
    Relative,
    LineSequential,
}

impl FileOrganization {
    /// Map an ORGANIZATION clause word.
    pub fn from_word(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("SEQUENTIAL") {
            Some(FileOrganization::Sequential)
        } else if word.eq_ignore_ascii_case("INDEXED") {
            Some(FileOrganization::Indexed)
        } else if word.eq_ignore_ascii_case("RELATIVE") {
            Some(FileOrganization::Relative)
        } else {
            None
        }
    }
}

/// File access mode from the SELECT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessMode {
    #[default]
    Sequential,
    Random,
    Dynamic,
}

impl AccessMode {
    /// Map an ACCESS MODE clause word.
    pub fn from_word(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("SEQUENTIAL") {
            Some(AccessMode::Sequential)
        } else if word.eq_ignore_ascii_case("RANDOM") {
            Some(AccessMode::Random)
        } else if word.eq_ignore_ascii_case("DYNAMIC") {
            Some(AccessMode::Dynamic)
        } else {
            None
        }
    }
}

/// A FILE-CONTROL entry (one SELECT statement).
///
/// Created with just its name by the program-unit pass; the clause fields
/// are attached by the file-control clause pass.
#[derive(Debug, Clone)]
pub struct FileControlEntryNode {
    /// The file name declared by SELECT.
    pub file_name: String,
    /// ASSIGN TO target, joined as written.
    pub assign_to: Option<String>,
    pub organization: Option<FileOrganization>,
    pub access_mode: Option<AccessMode>,
    /// RECORD KEY data name.
    pub record_key: Option<Reference>,
    /// ALTERNATE RECORD KEY data names.
    pub alternate_keys: Vec<Reference>,
    /// FILE STATUS data name.
    pub file_status: Option<Reference>,
    /// RESERVE area count.
    pub reserve: Option<u32>,
    /// PADDING CHARACTER value as written.
    pub padding_character: Option<String>,
}

impl FileControlEntryNode {
    /// A fresh entry carrying only its declared name.
    pub fn named(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            assign_to: None,
            organization: None,
            access_mode: None,
            record_key: None,
            alternate_keys: Vec::new(),
            file_status: None,
            reserve: None,
            padding_character: None,
        }
    }
}
