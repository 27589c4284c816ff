//! Path helpers shared by root inference, component keys and issue matching.
//!
//! Local paths may use either `/` or `\` separators regardless of the host,
//! since they come from analyzers and editors on any platform. Comparisons are
//! case-insensitive and always aligned on segment boundaries.

use crate::ProjectKey;

const SEPARATORS: [char; 2] = ['/', '\\'];

/// Case-insensitive equality, with an ASCII fast path.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || (!a.is_ascii() && a.to_lowercase() == b.to_lowercase())
}

/// Non-empty segments of `path` with their byte offsets.
fn segment_spans(path: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, c) in path.char_indices() {
        if SEPARATORS.contains(&c) {
            if i > start {
                spans.push((start, &path[start..i]));
            }
            start = i + c.len_utf8();
        }
    }
    if start < path.len() {
        spans.push((start, &path[start..]));
    }
    spans
}

/// Byte offset in `full_path` where the segments of `tail` start, if `tail`
/// is a segment-aligned suffix of `full_path`.
fn suffix_start(tail: &str, full_path: &str) -> Option<usize> {
    let tail = segment_spans(tail);
    let full = segment_spans(full_path);
    if tail.is_empty() || tail.len() > full.len() {
        return None;
    }
    let offset = full.len() - tail.len();
    let aligned = full[offset..]
        .iter()
        .zip(&tail)
        .all(|((_, a), (_, b))| eq_ignore_case(a, b));
    aligned.then(|| full[offset].0)
}

/// True when `tail` names the trailing segments of `full_path`.
///
/// `"same.txt"` matches `"c:\\dir\\SAME.TXT"` but not `"c:\\dir\\XXXsame.txt"`.
pub fn is_path_suffix_match(tail: &str, full_path: &str) -> bool {
    suffix_start(tail, full_path).is_some()
}

/// Strips the segment-aligned suffix `tail` from `full_path`, keeping the
/// trailing separator, so that `root + tail` spells `full_path` again.
pub fn strip_path_suffix<'a>(full_path: &'a str, tail: &str) -> Option<&'a str> {
    suffix_start(tail, full_path).map(|start| &full_path[..start])
}

/// Last segment of a path.
pub fn file_name(path: &str) -> Option<&str> {
    segment_spans(path).last().map(|(_, s)| *s)
}

/// `local_path` below `root`, compared case-insensitively.
fn strip_root<'a>(local_path: &'a str, root: &str) -> Option<&'a str> {
    if root.is_empty() {
        return None;
    }
    let prefix = local_path.get(..root.len())?;
    if !eq_ignore_case(prefix, root) {
        return None;
    }
    let rest = &local_path[root.len()..];
    let on_boundary = root.ends_with(SEPARATORS) || rest.is_empty() || rest.starts_with(SEPARATORS);
    on_boundary.then_some(rest)
}

/// Server-side component key of a local file: `<project>:<relative/path>`.
///
/// A path outside `root` keeps its full (normalized) form as the relative part.
/// `root` only counts as a prefix when it ends on a segment boundary.
pub fn component_key(local_path: &str, root: &str, project_key: &ProjectKey) -> String {
    let relative = strip_root(local_path, root).unwrap_or(local_path).replace('\\', "/");
    format!("{}:{}", project_key.as_str(), relative.trim_start_matches('/'))
}
