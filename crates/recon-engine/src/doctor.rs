use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::Command;

use recon_server::ServerApi;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::Config;

fn git_toplevel(dir: &Path) -> Result<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(dir)
        .output()
        .context("run git rev-parse")?;
    if !out.status.success() {
        return Err(anyhow!(
            "not a git repository: {}\n{}",
            dir.display(),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

pub async fn doctor(
    repo_root: &Path,
    cfg: &Config,
    server: &dyn ServerApi,
    cancel: &CancellationToken,
) -> Result<()> {
    // must be repo root
    let top = git_toplevel(repo_root)?;
    let top = Path::new(&top).canonicalize().context("canonicalize git toplevel")?;
    let here = repo_root.canonicalize().context("canonicalize repo root")?;
    if top != here {
        return Err(anyhow!(
            "must run from repo root. expected={}, got={}",
            top.display(),
            repo_root.display()
        ));
    }

    let Some(project) = cfg.binding().project_key().cloned() else {
        info!("standalone; skipping server checks");
        return Ok(());
    };

    let branches = server
        .get_branches(&project, cancel)
        .await
        .with_context(|| format!("query branches of {} at {}", project, cfg.server.url))?;
    info!(
        %project,
        main = %branches.main_branch_name,
        count = branches.branch_names.len(),
        "server reachable"
    );
    Ok(())
}
