use std::sync::{Arc, PoisonError, RwLock};

use recon_core::{select_matching_branch, CommitId, ProjectKey, RepositorySnapshot};
use recon_server::{ServerApi, ServerError, ServerResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The server branch that queries should currently target.
/// `None` lets the server pick its main branch.
pub trait CurrentBranch: Send + Sync {
    fn current_branch(&self) -> Option<String>;
}

/// A branch that never changes; handy for tests and one-shot CLI calls.
#[derive(Clone, Debug, Default)]
pub struct FixedBranch(pub Option<String>);

impl CurrentBranch for FixedBranch {
    fn current_branch(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Asks the server for its branches and picks the one the local HEAD derives from.
#[derive(Clone)]
pub struct BranchMatcher {
    server: Arc<dyn ServerApi>,
}

impl BranchMatcher {
    pub fn new(server: Arc<dyn ServerApi>) -> Self {
        Self { server }
    }

    /// `Ok(None)` when the server is not connected or there is no local HEAD.
    pub async fn find_matching_branch(
        &self,
        project: &ProjectKey,
        snapshot: &RepositorySnapshot,
        cancel: &CancellationToken,
    ) -> ServerResult<Option<String>> {
        match self.resolve(project, snapshot, cancel).await {
            Err(ServerError::NotConnected) => {
                debug!(%project, "server not connected; no branch match");
                Ok(None)
            }
            res => res,
        }
    }

    /// Like `find_matching_branch`, but reports a missing connection as `NotConnected`.
    async fn resolve(
        &self,
        project: &ProjectKey,
        snapshot: &RepositorySnapshot,
        cancel: &CancellationToken,
    ) -> ServerResult<Option<String>> {
        let server_branches = self.server.get_branches(project, cancel).await?;
        let matched = select_matching_branch(&server_branches, snapshot);
        info!(%project, branch = ?matched, "matched server branch");
        Ok(matched)
    }
}

#[derive(Default)]
struct TrackerState {
    /// What the last resolution was computed from: project, HEAD name and HEAD tip.
    key: Option<(ProjectKey, Option<(String, Option<CommitId>)>)>,
    branch: Option<String>,
}

/// Holds the resolved server branch and recomputes it when HEAD moves.
pub struct BranchTracker {
    matcher: BranchMatcher,
    state: RwLock<TrackerState>,
}

impl BranchTracker {
    pub fn new(matcher: BranchMatcher) -> Self {
        Self { matcher, state: RwLock::new(TrackerState::default()) }
    }

    /// Re-resolves the branch if the project, HEAD branch or HEAD tip changed since
    /// the last refresh. A disconnected server leaves nothing cached.
    pub async fn refresh(
        &self,
        project: &ProjectKey,
        snapshot: &RepositorySnapshot,
        cancel: &CancellationToken,
    ) -> ServerResult<Option<String>> {
        let head = snapshot.head.as_ref().map(|h| (h.name.clone(), h.tip().cloned()));
        let key = Some((project.clone(), head));

        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if state.key == key {
                debug!(branch = ?state.branch, "head unchanged; keeping branch");
                return Ok(state.branch.clone());
            }
        }

        let branch = match self.matcher.resolve(project, snapshot, cancel).await {
            Ok(branch) => branch,
            Err(ServerError::NotConnected) => {
                // nothing to remember; the next refresh asks the server again
                debug!(%project, "server not connected; branch left unresolved");
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                *state = TrackerState::default();
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.key = key;
        state.branch = branch.clone();
        Ok(branch)
    }
}

impl CurrentBranch for BranchTracker {
    fn current_branch(&self) -> Option<String> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).branch.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_core::{Branch, ServerBranchSet};
    use recon_server::{InMemoryServer, RecordedCall};

    fn project() -> ProjectKey {
        ProjectKey::from_str("proj")
    }

    fn server() -> Arc<InMemoryServer> {
        let server = Arc::new(InMemoryServer::new());
        server
            .add_project(
                &project(),
                ServerBranchSet {
                    main_branch_name: "master".into(),
                    branch_names: vec!["master".into(), "dev".into()],
                },
            )
            .unwrap();
        server
    }

    fn repo(head_log: &[&str]) -> RepositorySnapshot {
        let log = |l: &[&str]| l.iter().map(|c| CommitId::from_str(*c)).collect::<Vec<_>>();
        let head = Branch::new("local", log(head_log));
        RepositorySnapshot {
            head: Some(head.clone()),
            branches: vec![
                head,
                Branch::new("dev", log(&["c2", "m"])),
                Branch::new("master", log(&["m"])),
            ],
        }
    }

    #[tokio::test]
    async fn test_matcher_picks_closest_branch() {
        let matcher = BranchMatcher::new(server());
        let got = matcher
            .find_matching_branch(&project(), &repo(&["h", "c2", "m"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(got.as_deref(), Some("dev"));
    }

    #[tokio::test]
    async fn test_matcher_not_connected_is_none() {
        let server = server();
        server.set_connected(false).unwrap();
        let matcher = BranchMatcher::new(server);
        let got = matcher
            .find_matching_branch(&project(), &repo(&["h"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn test_matcher_propagates_cancellation() {
        let matcher = BranchMatcher::new(server());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = matcher
            .find_matching_branch(&project(), &repo(&["h"]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Cancelled));
    }

    #[tokio::test]
    async fn test_tracker_only_refreshes_when_head_moves() {
        let server = server();
        let tracker = BranchTracker::new(BranchMatcher::new(server.clone()));
        let cancel = CancellationToken::new();
        assert_eq!(tracker.current_branch(), None);

        let first = tracker.refresh(&project(), &repo(&["h", "c2", "m"]), &cancel).await.unwrap();
        assert_eq!(first.as_deref(), Some("dev"));
        tracker.refresh(&project(), &repo(&["h", "c2", "m"]), &cancel).await.unwrap();
        assert_eq!(server.calls().unwrap().len(), 1);

        // head moved and now sits closer to master than to dev
        let moved = tracker.refresh(&project(), &repo(&["h2", "m"]), &cancel).await.unwrap();
        assert_eq!(moved.as_deref(), Some("master"));
        assert_eq!(tracker.current_branch().as_deref(), Some("master"));
        let branch_calls = server
            .calls()
            .unwrap()
            .into_iter()
            .filter(|c| matches!(c, RecordedCall::GetBranches { .. }))
            .count();
        assert_eq!(branch_calls, 2);
    }

    #[tokio::test]
    async fn test_tracker_retries_after_server_reconnects() {
        let server = server();
        let tracker = BranchTracker::new(BranchMatcher::new(server.clone()));
        let cancel = CancellationToken::new();
        let head = repo(&["h", "c2", "m"]);

        server.set_connected(false).unwrap();
        assert_eq!(tracker.refresh(&project(), &head, &cancel).await.unwrap(), None);
        assert_eq!(tracker.current_branch(), None);

        server.set_connected(true).unwrap();
        let branch = tracker.refresh(&project(), &head, &cancel).await.unwrap();
        assert_eq!(branch.as_deref(), Some("dev"));
        assert_eq!(tracker.current_branch().as_deref(), Some("dev"));
    }

    #[tokio::test]
    async fn test_tracker_drops_branch_when_server_goes_away() {
        let server = server();
        let tracker = BranchTracker::new(BranchMatcher::new(server.clone()));
        let cancel = CancellationToken::new();

        tracker.refresh(&project(), &repo(&["h", "c2", "m"]), &cancel).await.unwrap();
        assert_eq!(tracker.current_branch().as_deref(), Some("dev"));

        server.set_connected(false).unwrap();
        let moved = tracker.refresh(&project(), &repo(&["h2", "m"]), &cancel).await.unwrap();
        assert_eq!(moved, None);
        assert_eq!(tracker.current_branch(), None);
    }
}
