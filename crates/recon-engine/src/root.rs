use std::sync::Arc;

use recon_core::path::{file_name, strip_path_suffix};
use recon_server::{ServerApi, ServerResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::binding::{Binding, BindingProvider};
use crate::branch::CurrentBranch;

/// Infers which local directory corresponds to the server project's root,
/// using the server's file index as the oracle. Nothing is cached.
#[derive(Clone)]
pub struct ProjectRootCalculator {
    binding: Arc<dyn BindingProvider>,
    branch: Arc<dyn CurrentBranch>,
    server: Arc<dyn ServerApi>,
}

impl ProjectRootCalculator {
    pub fn new(
        binding: Arc<dyn BindingProvider>,
        branch: Arc<dyn CurrentBranch>,
        server: Arc<dyn ServerApi>,
    ) -> Self {
        Self { binding, branch, server }
    }

    /// Local root such that `root + server_path == local_file_path`, keeping the
    /// trailing separator.
    ///
    /// When the server knows several files with the same name, the first one it
    /// returns decides the root.
    pub async fn calculate_root(
        &self,
        local_file_path: &str,
        cancel: &CancellationToken,
    ) -> ServerResult<Option<String>> {
        let Binding::Connected { project_key } = self.binding.binding() else {
            debug!("standalone; no project root");
            return Ok(None);
        };
        let Some(name) = file_name(local_file_path) else {
            return Ok(None);
        };

        let branch = self.branch.current_branch();
        let found = self
            .server
            .find_files_by_name(&project_key, branch.as_deref(), name, cancel)
            .await?;
        if found.len() > 1 {
            warn!(
                file = name,
                candidates = found.len(),
                "several server files share this name; using the first"
            );
        }
        let Some(server_path) = found.first() else {
            debug!(file = name, "file unknown to the server");
            return Ok(None);
        };

        let root = strip_path_suffix(local_file_path, server_path).map(str::to_string);
        debug!(local = local_file_path, server = %server_path, ?root, "inferred project root");
        Ok(root)
    }
}
