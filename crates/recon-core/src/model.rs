use serde::{Deserialize, Serialize};

/// How an issue origin expresses "this finding covers the whole file".
///
/// Most origins leave the line absent. Some cannot represent an absent line
/// and report position 1:1 instead, so such an issue may be either file-level
/// or a genuine finding on the first line.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileScope {
    #[default]
    Standard,
    AmbiguousFileLevel,
}

/// File-level classification of a local issue, derived once per comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileLevel {
    /// Has a line, cannot be file-level.
    No,
    /// No line at all.
    Yes,
    /// Reported at 1:1 by an origin without an "absent line" notion.
    Maybe,
}
