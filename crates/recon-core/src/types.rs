use serde::{Deserialize, Serialize};

use crate::model::{FileLevel, FileScope};
use crate::path::eq_ignore_case;

/// Branch names as reported by the server for one project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerBranchSet {
    pub main_branch_name: String,
    pub branch_names: Vec<String>,
}

impl ServerBranchSet {
    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.branch_names.iter().any(|b| eq_ignore_case(b, name))
    }
}

/// A finding produced by local analysis.
///
/// `file_path` absent means a module-level issue; such an issue never has a line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIssue {
    pub rule_id: String,
    pub file_path: Option<String>,
    pub start_line: Option<u32>,
    pub line_hash: Option<String>,
    #[serde(default)]
    pub scope: FileScope,
}

impl LocalIssue {
    pub fn new(
        rule_id: impl Into<String>,
        file_path: Option<String>,
        start_line: Option<u32>,
        line_hash: Option<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            file_path,
            start_line,
            line_hash,
            scope: FileScope::Standard,
        }
    }

    /// Builds an issue from an origin that always reports a position.
    /// Position 1:1 is how such origins flag whole-file findings.
    pub fn from_position(
        rule_id: impl Into<String>,
        file_path: impl Into<String>,
        line: u32,
        column: u32,
        line_hash: Option<String>,
    ) -> Self {
        let scope = if line == 1 && column == 1 {
            FileScope::AmbiguousFileLevel
        } else {
            FileScope::Standard
        };
        Self {
            rule_id: rule_id.into(),
            file_path: Some(file_path.into()),
            start_line: Some(line),
            line_hash,
            scope,
        }
    }

    pub fn file_level(&self) -> FileLevel {
        match (self.start_line, self.scope) {
            (None, _) => FileLevel::Yes,
            (Some(_), FileScope::AmbiguousFileLevel) => FileLevel::Maybe,
            (Some(_), FileScope::Standard) => FileLevel::No,
        }
    }
}

/// An issue as tracked by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIssue {
    pub key: String,
    pub rule_id: String,
    /// Project-relative path; absent for module-level issues.
    pub file_path: Option<String>,
    pub start_line: Option<u32>,
    pub line_hash: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ServerIssue {
    pub fn is_file_level(&self) -> bool {
        self.start_line.is_none()
    }
}
