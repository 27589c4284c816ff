use async_trait::async_trait;
use recon_core::{ProjectKey, ServerBranchSet, ServerIssue};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("not connected to a server")]
    NotConnected,
    #[error("request cancelled")]
    Cancelled,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("cannot decode server response: {0}")]
    Decode(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Remote issue-tracking server, as seen by the reconciliation engine.
///
/// Every call takes a cancellation token; a cancelled call fails with
/// `ServerError::Cancelled` rather than returning an empty result.
/// `branch: None` asks for the server's main branch.
#[async_trait]
pub trait ServerApi: Send + Sync {
    async fn get_branches(
        &self,
        project: &ProjectKey,
        cancel: &CancellationToken,
    ) -> ServerResult<ServerBranchSet>;

    /// Project-relative paths of files named `file_name`.
    async fn find_files_by_name(
        &self,
        project: &ProjectKey,
        branch: Option<&str>,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> ServerResult<Vec<String>>;

    /// Issues on one component raised by `rule_id`, in server order.
    async fn get_issues(
        &self,
        project: &ProjectKey,
        branch: Option<&str>,
        component_key: &str,
        rule_id: &str,
        cancel: &CancellationToken,
    ) -> ServerResult<Vec<ServerIssue>>;
}
