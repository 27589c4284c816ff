use std::sync::Arc;

use recon_core::path::component_key;
use recon_core::{find_first_likely_match, LocalIssue, ServerIssue};
use recon_server::{ServerApi, ServerResult};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::binding::{Binding, BindingProvider};
use crate::branch::CurrentBranch;
use crate::root::ProjectRootCalculator;
use crate::thread::ThreadGuard;

/// Answers "does the server already know this local issue?".
///
/// Each call re-resolves binding, branch and root; nothing is cached. Server
/// failures and cancellation propagate unchanged. `Ok(None)` only means the
/// issue could not be correlated or has no counterpart.
pub struct ServerIssueFinder {
    binding: Arc<dyn BindingProvider>,
    branch: Arc<dyn CurrentBranch>,
    server: Arc<dyn ServerApi>,
    roots: ProjectRootCalculator,
    guard: ThreadGuard,
}

impl ServerIssueFinder {
    pub fn new(
        binding: Arc<dyn BindingProvider>,
        branch: Arc<dyn CurrentBranch>,
        server: Arc<dyn ServerApi>,
        guard: ThreadGuard,
    ) -> Self {
        let roots = ProjectRootCalculator::new(binding.clone(), branch.clone(), server.clone());
        Self { binding, branch, server, roots, guard }
    }

    /// # Panics
    /// When called on the thread `guard` marks as primary.
    pub async fn find_server_issue(
        &self,
        local: &LocalIssue,
        cancel: &CancellationToken,
    ) -> ServerResult<Option<ServerIssue>> {
        self.guard.assert_background();

        let Binding::Connected { project_key } = self.binding.binding() else {
            debug!("standalone; issue not correlated");
            return Ok(None);
        };

        // module-level issues live on the project component itself
        let component = match local.file_path.as_deref() {
            None => project_key.0.clone(),
            Some(path) => {
                let Some(root) = self.roots.calculate_root(path, cancel).await? else {
                    debug!(file = path, "no project root; issue not correlated");
                    return Ok(None);
                };
                component_key(path, &root, &project_key)
            }
        };

        let branch = self.branch.current_branch();
        let candidates = self
            .server
            .get_issues(&project_key, branch.as_deref(), &component, &local.rule_id, cancel)
            .await?;

        let found = find_first_likely_match(local, &candidates).cloned();
        debug!(
            %component,
            rule = %local.rule_id,
            candidates = candidates.len(),
            matched = ?found.as_ref().map(|i| &i.key),
            "server issue lookup"
        );
        Ok(found)
    }
}
