//! Identification division elements.

/// The IDENTIFICATION DIVISION of a program unit.
///
/// The comment-entry paragraphs keep their text as written; nothing in
/// them affects later passes.
#[derive(Debug, Clone, Default)]
pub struct IdentificationDivisionNode {
    /// The PROGRAM-ID name as written in the source.
    pub program_name: Option<String>,
    /// PROGRAM-ID ... IS COMMON PROGRAM.
    pub is_common: bool,
    /// PROGRAM-ID ... IS INITIAL PROGRAM.
    pub is_initial: bool,
    pub author: Option<String>,
    pub installation: Option<String>,
    pub date_written: Option<String>,
    pub date_compiled: Option<String>,
    pub security: Option<String>,
    pub remarks: Option<String>,
}
