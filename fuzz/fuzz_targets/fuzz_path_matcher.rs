#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use subjecto::path;

#[derive(Arbitrary, Debug)]
enum Segment {
    Literal(u8),
    Any,
    AnyDepth,
}

impl Segment {
    fn render(&self) -> String {
        match self {
            Segment::Literal(b) => format!("k{}", b % 4),
            Segment::Any => path::ANY_SEGMENT.to_owned(),
            Segment::AnyDepth => path::ANY_DEPTH.to_owned(),
        }
    }
}

fn render(segments: &[Segment]) -> String {
    segments
        .iter()
        .take(12)
        .map(Segment::render)
        .collect::<Vec<_>>()
        .join("/")
}

fuzz_target!(|input: (Vec<Segment>, Vec<u8>)| {
    let (pattern, path_keys) = input;
    let pattern = render(&pattern);
    let concrete = path_keys
        .iter()
        .take(12)
        .map(|b| format!("k{}", b % 4))
        .collect::<Vec<_>>()
        .join("/");

    let matched = path::matches(&pattern, &concrete);

    // A pattern without wildcards matches only itself.
    if !pattern.contains('*') {
        assert_eq!(matched, pattern == concrete);
    }
    if pattern == path::ANY_DEPTH {
        assert!(matched);
    }
    let _ = path::any_depth_prefix(&pattern);
});
