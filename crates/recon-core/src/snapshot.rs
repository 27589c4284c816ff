use serde::{Deserialize, Serialize};

use crate::CommitId;

/// A local branch and its history, newest commit first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit_log: Vec<CommitId>,
}

impl Branch {
    pub fn new(name: impl Into<String>, commit_log: Vec<CommitId>) -> Self {
        Self { name: name.into(), commit_log }
    }

    pub fn tip(&self) -> Option<&CommitId> {
        self.commit_log.first()
    }
}

/// Read-only view of a working copy used by branch matching.
/// The VCS adapter produces it fresh for every call; nothing here retains it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub head: Option<Branch>,
    /// All local branches, head included.
    pub branches: Vec<Branch>,
}
