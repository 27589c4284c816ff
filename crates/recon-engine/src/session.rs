use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use recon_server::{HttpServerApi, ServerApi};
use recon_vcs::SnapshotProvider;
use tokio_util::sync::CancellationToken;

use crate::branch::{BranchMatcher, BranchTracker};
use crate::finder::ServerIssueFinder;
use crate::root::ProjectRootCalculator;
use crate::thread::ThreadGuard;
use crate::{doctor::doctor, Config};

/// Everything needed to reconcile one working copy with its server project.
pub struct Session {
    pub repo_root: PathBuf,
    pub cfg: Config,
    pub server: Arc<dyn ServerApi>,
    pub tracker: Arc<BranchTracker>,
    pub snapshots: Box<dyn SnapshotProvider>,
}

impl Session {
    pub fn open(repo_root: PathBuf, snapshots: Box<dyn SnapshotProvider>) -> Result<Self> {
        let cfg_path = Config::config_path(&repo_root);
        let cfg = Config::load_from(&cfg_path)
            .with_context(|| "no usable config; run `recon init` first")?;
        let server = HttpServerApi::new(cfg.server.url.clone(), cfg.token()?, cfg.timeout())?;
        Ok(Self::with_server(repo_root, cfg, Arc::new(server), snapshots))
    }

    pub fn with_server(
        repo_root: PathBuf,
        cfg: Config,
        server: Arc<dyn ServerApi>,
        snapshots: Box<dyn SnapshotProvider>,
    ) -> Self {
        let tracker = Arc::new(BranchTracker::new(BranchMatcher::new(server.clone())));
        Self { repo_root, cfg, server, tracker, snapshots }
    }

    /// Writes a default config unless one exists. Returns its path.
    pub fn init_repo(
        repo_root: &Path,
        project_key: Option<&str>,
        server_url: Option<&str>,
    ) -> Result<PathBuf> {
        let cfg_path = Config::config_path(repo_root);
        if !cfg_path.exists() {
            let mut cfg = Config::default_for_repo(project_key);
            if let Some(url) = server_url {
                cfg.server.url = url.to_string();
            }
            cfg.save_to(&cfg_path)?;
        }
        Ok(cfg_path)
    }

    /// Re-reads the working copy and updates the tracked server branch.
    pub async fn refresh_branch(&self, cancel: &CancellationToken) -> Result<Option<String>> {
        let Some(project) = self.cfg.binding().project_key().cloned() else {
            return Ok(None);
        };
        let snapshot = self.snapshots.snapshot(&self.repo_root)?;
        Ok(self.tracker.refresh(&project, &snapshot, cancel).await?)
    }

    pub fn root_calculator(&self) -> ProjectRootCalculator {
        ProjectRootCalculator::new(
            Arc::new(self.cfg.binding()),
            self.tracker.clone(),
            self.server.clone(),
        )
    }

    pub fn issue_finder(&self, guard: ThreadGuard) -> ServerIssueFinder {
        ServerIssueFinder::new(
            Arc::new(self.cfg.binding()),
            self.tracker.clone(),
            self.server.clone(),
            guard,
        )
    }

    pub async fn doctor(&self, cancel: &CancellationToken) -> Result<()> {
        doctor(&self.repo_root, &self.cfg, self.server.as_ref(), cancel).await
    }
}
