//! Property-based invariant tests for the path matcher and path helpers.
//!
//! 1. `**` matches every path.
//! 2. A pattern without wildcards matches exactly itself.
//! 3. Replacing any one segment of a path with `*` still matches.
//! 4. A `*` pattern never matches a path of different depth.
//! 5. `prefix/**` matches every path under `prefix`, including `prefix`.
//! 6. `join` and `parent`/`last_segment` are inverse.
//! 7. No panics on arbitrary input.

use proptest::prelude::*;
use subjecto::path::{self, any_depth_prefix, join, last_segment, matches, parent};

// ── Helpers ─────────────────────────────────────────────────────────────

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,6}"
}

fn segments(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(segment(), 1..=max)
}

fn pattern_segment() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => segment(),
        1 => Just(path::ANY_SEGMENT.to_owned()),
        1 => Just(path::ANY_DEPTH.to_owned()),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. `**` matches everything
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn any_depth_alone_matches_every_path(parts in segments(8)) {
        prop_assert!(matches("**", &parts.join("/")));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Literal patterns are equality
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn literal_pattern_is_equality(a in segments(5), b in segments(5)) {
        let (a, b) = (a.join("/"), b.join("/"));
        prop_assert!(matches(&a, &a));
        prop_assert_eq!(matches(&a, &b), a == b);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3-4. `*` replaces exactly one segment
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn any_segment_substitution_matches(parts in segments(6), pick in any::<prop::sample::Index>()) {
        let mut pattern = parts.clone();
        let i = pick.index(pattern.len());
        pattern[i] = path::ANY_SEGMENT.to_owned();
        prop_assert!(matches(&pattern.join("/"), &parts.join("/")));
    }

    #[test]
    fn any_segment_pattern_requires_equal_depth(parts in segments(6), extra in segment()) {
        let pattern = vec![path::ANY_SEGMENT; parts.len()].join("/");
        let deeper = join(&parts.join("/"), &extra);
        prop_assert!(matches(&pattern, &parts.join("/")));
        prop_assert!(!matches(&pattern, &deeper));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Trailing `**`
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn trailing_any_depth_matches_subtree(prefix in segments(4), rest in proptest::collection::vec(segment(), 0..4)) {
        let prefix = prefix.join("/");
        let pattern = join(&prefix, path::ANY_DEPTH);
        let mut full = prefix.clone();
        for part in &rest {
            full = join(&full, part);
        }
        prop_assert!(matches(&pattern, &full));
        prop_assert_eq!(any_depth_prefix(&pattern), Some(prefix));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. `join` / `parent` / `last_segment`
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn join_and_split_are_inverse(parts in segments(6), last in segment()) {
        let base = parts.join("/");
        let joined = join(&base, &last);
        prop_assert_eq!(parent(&joined), base.as_str());
        prop_assert_eq!(last_segment(&joined), last.as_str());
        prop_assert_eq!(join("", &last), last);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. No panics
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn arbitrary_patterns_never_panic(
        pattern in proptest::collection::vec(pattern_segment(), 0..8),
        target in proptest::collection::vec(segment(), 0..8),
    ) {
        let pattern = pattern.join("/");
        let target = target.join("/");
        let _ = matches(&pattern, &target);
        let _ = any_depth_prefix(&pattern);
        let _ = path::has_any_segment(&pattern);
    }
}
