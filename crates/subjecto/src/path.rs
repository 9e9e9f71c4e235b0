//! `/`-delimited paths and wildcard patterns.
//!
//! A path names a location in a value tree: `""` is the root, `"user/name"`
//! a nested field, `"items/0"` an array slot. A pattern is a path that may
//! contain `*` (exactly one segment) and `**` (zero or more segments).
//!
//! [`matches`] is a small backtracking matcher. Cost is bounded by
//! pattern length times path length for patterns with a single `**`.

/// Segment separator.
pub const SEPARATOR: char = '/';

/// Matches exactly one segment.
pub const ANY_SEGMENT: &str = "*";

/// Matches any number of segments, including none.
pub const ANY_DEPTH: &str = "**";

/// Whether `path` is matched by `pattern`.
///
/// ```
/// use subjecto::path::matches;
///
/// assert!(matches("**", ""));
/// assert!(matches("user/*", "user/name"));
/// assert!(!matches("user/*", "user/profile/name"));
/// assert!(matches("user/**", "user/profile/name"));
/// assert!(matches("**/name", "user/profile/name"));
/// ```
#[must_use]
pub fn matches(pattern: &str, path: &str) -> bool {
    if pattern == ANY_DEPTH {
        return true;
    }
    let pattern: Vec<&str> = pattern.split(SEPARATOR).collect();
    let path: Vec<&str> = path.split(SEPARATOR).collect();
    matches_segments(&pattern, &path)
}

fn matches_segments(pattern: &[&str], path: &[&str]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < pattern.len() && j < path.len() {
        if pattern[i] == ANY_DEPTH {
            if i == pattern.len() - 1 {
                return true;
            }
            return (j..path.len()).any(|split| matches_segments(&pattern[i + 1..], &path[split..]));
        } else if pattern[i] == ANY_SEGMENT || pattern[i] == path[j] {
            i += 1;
            j += 1;
        } else {
            return false;
        }
    }

    // Trailing `**` segments need no path segments.
    while i < pattern.len() && pattern[i] == ANY_DEPTH {
        i += 1;
    }
    i == pattern.len() && j == path.len()
}

/// Append `segment` to `parent`. The root has no leading separator.
#[must_use]
pub fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_owned()
    } else {
        let mut joined = String::with_capacity(parent.len() + 1 + segment.len());
        joined.push_str(parent);
        joined.push(SEPARATOR);
        joined.push_str(segment);
        joined
    }
}

/// Everything before the last segment (`""` for top-level paths).
#[must_use]
pub fn parent(path: &str) -> &str {
    path.rsplit_once(SEPARATOR).map_or("", |(parent, _)| parent)
}

/// The final segment of `path`.
#[must_use]
pub fn last_segment(path: &str) -> &str {
    path.rsplit_once(SEPARATOR).map_or(path, |(_, last)| last)
}

/// Whether any segment of `pattern` is exactly `*`.
#[must_use]
pub fn has_any_segment(pattern: &str) -> bool {
    pattern.split(SEPARATOR).any(|s| s == ANY_SEGMENT)
}

/// The path preceding the first `**` segment, if the pattern has one.
///
/// `"user/**"` yields `Some("user")`, `"**/x"` yields `Some("")`.
#[must_use]
pub fn any_depth_prefix(pattern: &str) -> Option<String> {
    let segments: Vec<&str> = pattern.split(SEPARATOR).collect();
    let index = segments.iter().position(|s| *s == ANY_DEPTH)?;
    Some(segments[..index].join("/"))
}
