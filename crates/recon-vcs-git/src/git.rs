use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use recon_core::{Branch, CommitId, RepositorySnapshot};
use recon_vcs::SnapshotProvider;
use tracing::debug;

/// Reads local branches and their logs through the `git` CLI.
#[derive(Clone, Debug, Default)]
pub struct GitSnapshotProvider;

impl GitSnapshotProvider {
    pub fn new() -> Self {
        Self
    }

    fn run(repo: &Path, args: &[&str]) -> Result<String> {
        let out = Command::new("git")
            .args(args)
            .current_dir(repo)
            .output()
            .with_context(|| format!("run git {:?}", args))?;
        if !out.status.success() {
            return Err(anyhow!(
                "command failed: git {:?}\nstdout:{}\nstderr:{}",
                args,
                String::from_utf8_lossy(&out.stdout),
                String::from_utf8_lossy(&out.stderr)
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    fn branch_names(repo: &Path) -> Result<Vec<String>> {
        let out = Self::run(repo, &["for-each-ref", "--format=%(refname:short)", "refs/heads/"])?;
        Ok(out.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
    }

    /// Commits reachable from `name`, newest first.
    fn commit_log(repo: &Path, name: &str) -> Result<Vec<CommitId>> {
        let refname = format!("refs/heads/{name}");
        let out = Self::run(repo, &["rev-list", &refname])?;
        Ok(out.lines().map(|l| CommitId::from_str(l.trim())).collect())
    }

    /// Name of the checked-out branch; `None` when HEAD is detached.
    fn head_name(repo: &Path) -> Option<String> {
        Self::run(repo, &["symbolic-ref", "--quiet", "--short", "HEAD"]).ok()
    }
}

impl SnapshotProvider for GitSnapshotProvider {
    fn snapshot(&self, repo_root: &Path) -> Result<RepositorySnapshot> {
        let mut branches = Vec::new();
        for name in Self::branch_names(repo_root)? {
            let log = Self::commit_log(repo_root, &name)?;
            branches.push(Branch::new(name, log));
        }

        // an unborn branch has a symbolic HEAD but no ref yet, so it is not in `branches`
        let head = Self::head_name(repo_root)
            .and_then(|name| branches.iter().find(|b| b.name == name).cloned());
        debug!(
            head = ?head.as_ref().map(|b| &b.name),
            branches = branches.len(),
            "read git snapshot"
        );

        Ok(RepositorySnapshot { head, branches })
    }
}
