use std::time::Duration;

use async_trait::async_trait;
use recon_core::path::{eq_ignore_case, file_name};
use recon_core::{ProjectKey, ServerBranchSet, ServerIssue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::traits::{ServerApi, ServerError, ServerResult};

const PAGE_SIZE: usize = 500;
/// Search endpoints refuse to page past this many results.
const MAX_RESULTS: usize = 10_000;

/// `ServerApi` over a SonarQube-style web API.
#[derive(Clone, Debug)]
pub struct HttpServerApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BranchesResponse {
    branches: Vec<WireBranch>,
}

#[derive(Debug, Deserialize)]
struct WireBranch {
    name: String,
    #[serde(rename = "isMain", default)]
    is_main: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paging {
    page_index: usize,
    page_size: usize,
    total: usize,
}

/// A search response that spreads its results over numbered pages.
trait Paged: DeserializeOwned + Send {
    type Item: Send;

    fn into_parts(self) -> (Option<Paging>, Vec<Self::Item>);
}

#[derive(Debug, Deserialize)]
struct ComponentsResponse {
    #[serde(default)]
    paging: Option<Paging>,
    components: Vec<WireComponent>,
}

impl Paged for ComponentsResponse {
    type Item = WireComponent;

    fn into_parts(self) -> (Option<Paging>, Vec<WireComponent>) {
        (self.paging, self.components)
    }
}

#[derive(Debug, Deserialize)]
struct WireComponent {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssuesResponse {
    #[serde(default)]
    paging: Option<Paging>,
    issues: Vec<WireIssue>,
}

impl Paged for IssuesResponse {
    type Item = WireIssue;

    fn into_parts(self) -> (Option<Paging>, Vec<WireIssue>) {
        (self.paging, self.issues)
    }
}

/// Page to request after `fetched` results, or `None` once everything is in.
fn next_page(paging: Option<&Paging>, fetched: usize) -> Option<usize> {
    let paging = paging?;
    if fetched >= paging.total {
        return None;
    }
    if (paging.page_index + 1) * paging.page_size > MAX_RESULTS {
        warn!(total = paging.total, fetched, "result window exhausted; remaining results skipped");
        return None;
    }
    Some(paging.page_index + 1)
}

#[derive(Debug, Deserialize)]
struct WireIssue {
    key: String,
    rule: String,
    component: String,
    line: Option<u32>,
    hash: Option<String>,
    #[serde(default)]
    message: String,
}

impl HttpServerApi {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> ServerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::Transport(e.to_string()))?;
        Ok(Self { client, base_url: base_url.into(), token })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> ServerResult<T> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        debug!(%url, ?query, "GET");

        let mut req = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let call = async move {
            let resp = req.send().await.map_err(|e| ServerError::Transport(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(ServerError::Status { status: status.as_u16(), url: url.clone() });
            }
            resp.json::<T>().await.map_err(|e| ServerError::Decode(e.to_string()))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ServerError::Cancelled),
            res = call => res,
        }
    }

    /// Fetches every page of a search, starting from page 1.
    async fn get_all_pages<T: Paged>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> ServerResult<Vec<T::Item>> {
        let page_size = PAGE_SIZE.to_string();
        let mut items = Vec::new();
        let mut page: usize = 1;
        loop {
            let page_str = page.to_string();
            let mut paged_query = query.to_vec();
            paged_query.push(("ps", page_size.as_str()));
            paged_query.push(("p", page_str.as_str()));

            let resp: T = self.get_json(path, &paged_query, cancel).await?;
            let (paging, batch) = resp.into_parts();
            let empty = batch.is_empty();
            items.extend(batch);

            match next_page(paging.as_ref(), items.len()) {
                Some(next) if !empty => page = next,
                _ => break,
            }
        }
        Ok(items)
    }
}

fn branch_set(resp: BranchesResponse) -> ServerResult<ServerBranchSet> {
    let main = resp
        .branches
        .iter()
        .find(|b| b.is_main)
        .map(|b| b.name.clone())
        .ok_or_else(|| ServerError::Decode("no main branch in branch list".into()))?;
    Ok(ServerBranchSet {
        main_branch_name: main,
        branch_names: resp.branches.into_iter().map(|b| b.name).collect(),
    })
}

// Component keys look like `<project>:<path>`; the project itself is the module-level component.
fn server_issue(project: &ProjectKey, wire: WireIssue) -> ServerIssue {
    let file_path = if wire.component == project.as_str() {
        None
    } else {
        let prefix = format!("{}:", project.as_str());
        Some(wire.component.strip_prefix(&prefix).unwrap_or(&wire.component).to_string())
    };
    ServerIssue {
        key: wire.key,
        rule_id: wire.rule,
        file_path,
        start_line: wire.line,
        line_hash: wire.hash,
        message: wire.message,
    }
}

#[async_trait]
impl ServerApi for HttpServerApi {
    async fn get_branches(
        &self,
        project: &ProjectKey,
        cancel: &CancellationToken,
    ) -> ServerResult<ServerBranchSet> {
        let resp: BranchesResponse = self
            .get_json("/api/project_branches/list", &[("project", project.as_str())], cancel)
            .await?;
        branch_set(resp)
    }

    async fn find_files_by_name(
        &self,
        project: &ProjectKey,
        branch: Option<&str>,
        name: &str,
        cancel: &CancellationToken,
    ) -> ServerResult<Vec<String>> {
        let mut query = vec![("component", project.as_str()), ("qualifiers", "FIL"), ("q", name)];
        if let Some(branch) = branch {
            query.push(("branch", branch));
        }
        let components = self
            .get_all_pages::<ComponentsResponse>("/api/components/tree", &query, cancel)
            .await?;

        // `q` is a substring search on the server side
        Ok(components
            .into_iter()
            .filter_map(|c| c.path)
            .filter(|p| file_name(p).is_some_and(|n| eq_ignore_case(n, name)))
            .collect())
    }

    async fn get_issues(
        &self,
        project: &ProjectKey,
        branch: Option<&str>,
        component_key: &str,
        rule_id: &str,
        cancel: &CancellationToken,
    ) -> ServerResult<Vec<ServerIssue>> {
        let mut query = vec![("componentKeys", component_key), ("rules", rule_id)];
        if let Some(branch) = branch {
            query.push(("branch", branch));
        }
        let issues = self
            .get_all_pages::<IssuesResponse>("/api/issues/search", &query, cancel)
            .await?;
        Ok(issues.into_iter().map(|w| server_issue(project, w)).collect())
    }
}
