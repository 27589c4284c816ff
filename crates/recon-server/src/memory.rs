use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use recon_core::path::{eq_ignore_case, file_name};
use recon_core::{ProjectKey, ServerBranchSet, ServerIssue};
use tokio_util::sync::CancellationToken;

use crate::traits::{ServerApi, ServerError, ServerResult};

/// A call observed by `InMemoryServer`, for assertions in tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedCall {
    GetBranches { project: String },
    FindFiles { project: String, branch: Option<String>, file_name: String },
    GetIssues { project: String, branch: Option<String>, component_key: String, rule_id: String },
}

/// In-memory server for tests and offline runs. Branch `None` resolves to the
/// project's main branch.
pub struct InMemoryServer {
    inner: Mutex<Inner>,
}

struct Inner {
    connected: bool,
    branch_sets: HashMap<String, ServerBranchSet>,
    files: HashMap<(String, String), Vec<String>>,
    issues: HashMap<(String, String), Vec<ServerIssue>>,
    calls: Vec<RecordedCall>,
}

impl Default for InMemoryServer {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                connected: true,
                branch_sets: HashMap::new(),
                files: HashMap::new(),
                issues: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }
}

impl InMemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ServerResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| ServerError::Transport("in-memory server lock poisoned".into()))
    }

    pub fn set_connected(&self, connected: bool) -> ServerResult<()> {
        self.lock()?.connected = connected;
        Ok(())
    }

    pub fn add_project(&self, project: &ProjectKey, branches: ServerBranchSet) -> ServerResult<()> {
        self.lock()?.branch_sets.insert(project.0.clone(), branches);
        Ok(())
    }

    pub fn add_file(
        &self,
        project: &ProjectKey,
        branch: &str,
        path: impl Into<String>,
    ) -> ServerResult<()> {
        self.lock()?
            .files
            .entry((project.0.clone(), branch.to_string()))
            .or_default()
            .push(path.into());
        Ok(())
    }

    pub fn add_issue(
        &self,
        project: &ProjectKey,
        branch: &str,
        issue: ServerIssue,
    ) -> ServerResult<()> {
        self.lock()?
            .issues
            .entry((project.0.clone(), branch.to_string()))
            .or_default()
            .push(issue);
        Ok(())
    }

    pub fn calls(&self) -> ServerResult<Vec<RecordedCall>> {
        Ok(self.lock()?.calls.clone())
    }

    /// Fails on a cancelled token, then records the call, then checks connectivity.
    fn enter(
        &self,
        cancel: &CancellationToken,
        call: RecordedCall,
    ) -> ServerResult<MutexGuard<'_, Inner>> {
        if cancel.is_cancelled() {
            return Err(ServerError::Cancelled);
        }
        let mut inner = self.lock()?;
        inner.calls.push(call);
        if !inner.connected {
            return Err(ServerError::NotConnected);
        }
        Ok(inner)
    }
}

impl Inner {
    fn resolve_branch(&self, project: &ProjectKey, branch: Option<&str>) -> String {
        match branch {
            Some(b) => b.to_string(),
            None => self
                .branch_sets
                .get(project.as_str())
                .map(|s| s.main_branch_name.clone())
                .unwrap_or_default(),
        }
    }
}

fn component_of(project: &ProjectKey, issue: &ServerIssue) -> String {
    match &issue.file_path {
        Some(path) => format!("{}:{}", project.as_str(), path),
        None => project.0.clone(),
    }
}

#[async_trait]
impl ServerApi for InMemoryServer {
    async fn get_branches(
        &self,
        project: &ProjectKey,
        cancel: &CancellationToken,
    ) -> ServerResult<ServerBranchSet> {
        let inner = self.enter(cancel, RecordedCall::GetBranches { project: project.0.clone() })?;
        inner
            .branch_sets
            .get(project.as_str())
            .cloned()
            .ok_or_else(|| ServerError::Status { status: 404, url: format!("project {}", project) })
    }

    async fn find_files_by_name(
        &self,
        project: &ProjectKey,
        branch: Option<&str>,
        file_name_query: &str,
        cancel: &CancellationToken,
    ) -> ServerResult<Vec<String>> {
        let inner = self.enter(
            cancel,
            RecordedCall::FindFiles {
                project: project.0.clone(),
                branch: branch.map(String::from),
                file_name: file_name_query.to_string(),
            },
        )?;
        let key = (project.0.clone(), inner.resolve_branch(project, branch));
        Ok(inner
            .files
            .get(&key)
            .map(|files| {
                files
                    .iter()
                    .filter(|p| file_name(p).is_some_and(|n| eq_ignore_case(n, file_name_query)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_issues(
        &self,
        project: &ProjectKey,
        branch: Option<&str>,
        component_key: &str,
        rule_id: &str,
        cancel: &CancellationToken,
    ) -> ServerResult<Vec<ServerIssue>> {
        let inner = self.enter(
            cancel,
            RecordedCall::GetIssues {
                project: project.0.clone(),
                branch: branch.map(String::from),
                component_key: component_key.to_string(),
                rule_id: rule_id.to_string(),
            },
        )?;
        let key = (project.0.clone(), inner.resolve_branch(project, branch));
        Ok(inner
            .issues
            .get(&key)
            .map(|issues| {
                issues
                    .iter()
                    .filter(|i| component_of(project, i) == component_key)
                    .filter(|i| eq_ignore_case(&i.rule_id, rule_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectKey {
        ProjectKey::from_str("proj")
    }

    fn seeded() -> InMemoryServer {
        let server = InMemoryServer::new();
        server
            .add_project(
                &project(),
                ServerBranchSet {
                    main_branch_name: "main".into(),
                    branch_names: vec!["main".into(), "dev".into()],
                },
            )
            .unwrap();
        server.add_file(&project(), "main", "src/File.cs").unwrap();
        server.add_file(&project(), "main", "src/Other.cs").unwrap();
        server.add_file(&project(), "dev", "lib/File.cs").unwrap();
        server
    }

    fn issue(rule: &str, path: &str, line: u32) -> ServerIssue {
        ServerIssue {
            key: format!("{rule}-{line}"),
            rule_id: rule.into(),
            file_path: Some(path.into()),
            start_line: Some(line),
            line_hash: None,
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn test_find_files_defaults_to_main_branch() {
        let server = seeded();
        let cancel = CancellationToken::new();
        let found = server.find_files_by_name(&project(), None, "file.cs", &cancel).await.unwrap();
        assert_eq!(found, vec!["src/File.cs".to_string()]);

        let found = server
            .find_files_by_name(&project(), Some("dev"), "File.cs", &cancel)
            .await
            .unwrap();
        assert_eq!(found, vec!["lib/File.cs".to_string()]);
    }

    #[tokio::test]
    async fn test_get_issues_filters_component_and_rule() {
        let server = seeded();
        server.add_issue(&project(), "main", issue("r1", "src/File.cs", 3)).unwrap();
        server.add_issue(&project(), "main", issue("r2", "src/File.cs", 4)).unwrap();
        server.add_issue(&project(), "main", issue("r1", "src/Other.cs", 5)).unwrap();

        let cancel = CancellationToken::new();
        let found = server
            .get_issues(&project(), Some("main"), "proj:src/File.cs", "R1", &cancel)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start_line, Some(3));
    }

    #[tokio::test]
    async fn test_disconnected_server_reports_not_connected() {
        let server = seeded();
        server.set_connected(false).unwrap();
        let err = server.get_branches(&project(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ServerError::NotConnected));
    }

    #[tokio::test]
    async fn test_cancelled_token_fails_before_any_work() {
        let server = seeded();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = server.get_branches(&project(), &cancel).await.unwrap_err();
        assert!(matches!(err, ServerError::Cancelled));
        assert!(server.calls().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let server = seeded();
        let cancel = CancellationToken::new();
        server.get_branches(&project(), &cancel).await.unwrap();
        assert_eq!(
            server.calls().unwrap(),
            vec![RecordedCall::GetBranches { project: "proj".into() }]
        );
    }
}
