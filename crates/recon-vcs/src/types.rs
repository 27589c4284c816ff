use std::path::Path;

use anyhow::Result;
use recon_core::RepositorySnapshot;

/// Produces a fresh view of a working copy's branches and their histories.
pub trait SnapshotProvider: Send + Sync {
    fn snapshot(&self, repo_root: &Path) -> Result<RepositorySnapshot>;
}
