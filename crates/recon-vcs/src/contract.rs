use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};

use crate::types::SnapshotProvider;

/// Shared adapter contract suite, run by every `SnapshotProvider` implementation.
///
/// Builds `main -> dev -> feature` in a fresh repo at `dir` with feature
/// checked out, then checks the snapshot shape.
pub fn run_snapshot_contract_suite(provider: &dyn SnapshotProvider, dir: &Path) -> Result<()> {
    init_git_repo(dir)?;
    git(dir, &["checkout", "-b", "dev"])?;
    commit_file(dir, "dev.txt", "dev")?;
    git(dir, &["checkout", "-b", "feature"])?;
    commit_file(dir, "feature.txt", "feature")?;

    let snap = provider.snapshot(dir)?;
    let head = snap.head.as_ref().ok_or_else(|| anyhow!("expected a head branch"))?;
    if head.name != "feature" {
        return Err(anyhow!("expected head 'feature', got '{}'", head.name));
    }
    if head.commit_log.len() != 3 {
        return Err(anyhow!("expected 3 commits on head, got {}", head.commit_log.len()));
    }
    if !snap.branches.iter().any(|b| b.name == head.name) {
        return Err(anyhow!("branches must include head"));
    }

    let dev = snap
        .branches
        .iter()
        .find(|b| b.name == "dev")
        .ok_or_else(|| anyhow!("expected branch 'dev'"))?;
    // newest first: dev's tip is head's parent
    if dev.tip() != head.commit_log.get(1) {
        return Err(anyhow!("dev tip should be the parent of head"));
    }
    Ok(())
}

/// Initialize a minimal git repo fixture with one commit on `main`.
pub fn init_git_repo(dir: &Path) -> Result<()> {
    git(dir, &["init"])?;
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
    git(dir, &["config", "user.email", "recon@example.com"])?;
    git(dir, &["config", "user.name", "recon"])?;
    commit_file(dir, "README.md", "fixture")
}

/// Write `name` with `content` and commit it on the current branch.
pub fn commit_file(dir: &Path, name: &str, content: &str) -> Result<()> {
    std::fs::write(dir.join(name), content)?;
    git(dir, &["add", "."])?;
    git(dir, &["commit", "-m", name])
}

pub fn git(dir: &Path, args: &[&str]) -> Result<()> {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("run git {:?}", args))?;
    if !out.status.success() {
        return Err(anyhow!("command failed: git {:?}\nstdout:{}\nstderr:{}",
            args,
            String::from_utf8_lossy(&out.stdout),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(())
}
