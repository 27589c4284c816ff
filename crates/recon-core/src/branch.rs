use std::collections::HashMap;

use tracing::debug;

use crate::{Branch, CommitId, RepositorySnapshot, ServerBranchSet};

/// Sum of the distances from both tips to their nearest shared commit.
///
/// The nearest shared commit is the first commit of `candidate` (scanning from
/// its tip) that also appears in `head`'s log. Logs are treated as linear
/// histories; this approximates a merge base without walking the DAG.
/// Returns `None` when the two logs share nothing.
pub fn divergence_score(head: &Branch, candidate: &Branch) -> Option<usize> {
    let mut head_index: HashMap<&CommitId, usize> = HashMap::with_capacity(head.commit_log.len());
    for (pos, commit) in head.commit_log.iter().enumerate() {
        head_index.entry(commit).or_insert(pos);
    }

    candidate
        .commit_log
        .iter()
        .enumerate()
        .find_map(|(candidate_pos, commit)| {
            head_index.get(commit).map(|head_pos| head_pos + candidate_pos)
        })
}

/// Picks the server branch the local HEAD most plausibly derives from.
///
/// - no HEAD: `None`
/// - HEAD itself is a server branch (case-insensitive): HEAD's local name
/// - otherwise the server-known local branch with the lowest divergence score,
///   first in `snapshot.branches` order on ties, returned with its local casing
/// - nothing shares history with HEAD: the server's main branch name
pub fn select_matching_branch(
    server: &ServerBranchSet,
    snapshot: &RepositorySnapshot,
) -> Option<String> {
    let head = snapshot.head.as_ref()?;

    if server.contains_ignore_case(&head.name) {
        debug!(branch = %head.name, "head is a server branch");
        return Some(head.name.clone());
    }

    let mut best: Option<(&Branch, usize)> = None;
    for candidate in snapshot
        .branches
        .iter()
        .filter(|b| b.name != head.name && server.contains_ignore_case(&b.name))
    {
        let Some(score) = divergence_score(head, candidate) else {
            debug!(branch = %candidate.name, "no shared history with head");
            continue;
        };
        debug!(branch = %candidate.name, score, "candidate branch");
        if best.map_or(true, |(_, best_score)| score < best_score) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((branch, _)) => Some(branch.name.clone()),
        None => Some(server.main_branch_name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(name: &str, log: &[&str]) -> Branch {
        Branch::new(name, log.iter().map(|c| CommitId::from_str(*c)).collect())
    }

    #[test]
    fn score_is_sum_of_both_distances() {
        let head = branch("feature", &["h2", "h1", "c2", "root"]);
        let dev = branch("dev", &["d1", "c2", "root"]);
        assert_eq!(divergence_score(&head, &dev), Some(3));
    }

    #[test]
    fn score_absent_without_shared_commit() {
        let head = branch("feature", &["a", "b"]);
        let other = branch("other", &["x", "y"]);
        assert_eq!(divergence_score(&head, &other), None);
    }

    #[test]
    fn score_uses_first_occurrence_in_head() {
        let head = branch("feature", &["a", "shared", "b", "shared"]);
        let other = branch("other", &["shared"]);
        assert_eq!(divergence_score(&head, &other), Some(1));
    }

    #[test]
    fn candidate_name_match_is_case_insensitive_and_keeps_local_casing() {
        let head = branch("feature", &["h", "c"]);
        let snapshot = RepositorySnapshot {
            head: Some(head.clone()),
            branches: vec![head, branch("Develop", &["c"])],
        };
        let server = ServerBranchSet {
            main_branch_name: "main".into(),
            branch_names: vec!["main".into(), "develop".into()],
        };
        assert_eq!(select_matching_branch(&server, &snapshot).as_deref(), Some("Develop"));
    }
}
