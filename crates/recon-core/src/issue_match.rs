use crate::path::{eq_ignore_case, is_path_suffix_match};
use crate::{FileLevel, LocalIssue, ServerIssue};

/// Decides whether `local` and `server` describe the same finding.
///
/// Checks run in order and short-circuit: rule, file, file-level combination,
/// then line or hash. Line drift is tolerated when the hash still matches and
/// vice versa.
pub fn is_likely_match(local: &LocalIssue, server: &ServerIssue) -> bool {
    if !rule_matches(&local.rule_id, &server.rule_id) {
        return false;
    }
    if !file_matches(local.file_path.as_deref(), server.file_path.as_deref()) {
        return false;
    }

    match (local.file_level(), server.is_file_level()) {
        (FileLevel::Yes | FileLevel::Maybe, true) => return true,
        (FileLevel::Yes, false) => return false,
        (FileLevel::No, true) => return false,
        (FileLevel::Maybe | FileLevel::No, false) => {}
    }

    local.start_line == server.start_line
        || hash_matches(local.line_hash.as_deref(), server.line_hash.as_deref())
}

/// First element of `server_issues`, in the order given, that matches `local`.
pub fn find_first_likely_match<'a, I>(
    local: &LocalIssue,
    server_issues: I,
) -> Option<&'a ServerIssue>
where
    I: IntoIterator<Item = &'a ServerIssue>,
{
    server_issues.into_iter().find(|s| is_likely_match(local, s))
}

// An empty rule id carries no identity, so it never matches, not even another empty one.
fn rule_matches(local: &str, server: &str) -> bool {
    !local.is_empty() && !server.is_empty() && eq_ignore_case(local, server)
}

fn file_matches(local: Option<&str>, server: Option<&str>) -> bool {
    match (local, server) {
        (None, None) => true,
        (Some(local), Some(server)) => is_path_suffix_match(server, local),
        _ => false,
    }
}

fn hash_matches(local: Option<&str>, server: Option<&str>) -> bool {
    match (local, server) {
        (Some(l), Some(s)) => !l.is_empty() && l == s,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(
        rule: &str,
        file: Option<&str>,
        line: Option<u32>,
        hash: Option<&str>,
    ) -> ServerIssue {
        ServerIssue {
            key: "AX-1".into(),
            rule_id: rule.into(),
            file_path: file.map(Into::into),
            start_line: line,
            line_hash: hash.map(Into::into),
            message: String::new(),
        }
    }

    #[test]
    fn empty_hashes_never_match() {
        let local = LocalIssue::new("r", Some("/p/a.cs".into()), Some(3), Some(String::new()));
        assert!(!is_likely_match(&local, &server("r", Some("a.cs"), Some(4), Some(""))));
    }

    #[test]
    fn empty_rule_ids_never_match() {
        let local = LocalIssue::new("", Some("/p/a.cs".into()), Some(3), None);
        assert!(!is_likely_match(&local, &server("", Some("a.cs"), Some(3), None)));
    }

    #[test]
    fn module_level_issues_match_each_other() {
        let local = LocalIssue::new("r", None, None, None);
        assert!(is_likely_match(&local, &server("r", None, None, None)));
        assert!(!is_likely_match(&local, &server("r", Some("a.cs"), None, None)));
    }
}
