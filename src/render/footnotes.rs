use std::sync::OnceLock;

use regex::{Captures, Regex};

const SEPARATOR: &str = "\n\n---\n\n## Footnotes\n\n";

fn link_pattern() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"\[(.*?)\]\((.*?)\)").expect("valid link pattern"))
}

fn marker_pattern() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"^\[\d+\]$").expect("valid marker pattern"))
}

/// Rewrites inline links `[text](url)` as `text [n]` and appends a numbered
/// list of the targets.
///
/// Links whose text is already a marker like `[2]`, or whose target is a
/// `#fn:`/`#fnref:` anchor, are left alone, so running the transform twice
/// yields the same text. Input without links comes back unchanged.
pub fn footnote_links(text: &str) -> String {
    let mut targets: Vec<String> = Vec::new();

    let body = link_pattern().replace_all(text, |caps: &Captures| {
        let label = &caps[1];
        let url = &caps[2];

        if marker_pattern().is_match(label) || url.starts_with("#fn:") || url.starts_with("#fnref:")
        {
            return caps[0].to_string();
        }

        targets.push(url.to_string());
        format!("{} [{}]", label, targets.len())
    });

    if targets.is_empty() {
        return text.to_string();
    }

    let mut out = body.into_owned();
    out.push_str(SEPARATOR);
    let list: Vec<String> = targets
        .iter()
        .enumerate()
        .map(|(i, url)| format!("[{}]: {}", i + 1, url))
        .collect();
    out.push_str(&list.join("\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_link() {
        let out = footnote_links("See [Site](https://example.com) for more.");
        assert!(out.starts_with("See Site [1] for more."));
        assert!(out.contains("## Footnotes"));
        assert!(out.ends_with("[1]: https://example.com"));
    }

    #[test]
    fn test_no_links_unchanged() {
        let input = "Plain text with [brackets] and (parens) but no links.";
        assert_eq!(footnote_links(input), input);
        assert_eq!(footnote_links(""), "");
    }

    #[test]
    fn test_numbers_in_order_of_appearance() {
        let out = footnote_links("[a](https://a.dev) then [b](https://b.dev)");
        assert!(out.starts_with("a [1] then b [2]"));
        assert!(out.ends_with("[1]: https://a.dev\n[2]: https://b.dev"));
    }

    #[test]
    fn test_idempotent() {
        let once = footnote_links("Read [the docs](https://docs.rs) and [book](https://rust-lang.org).");
        let twice = footnote_links(&once);
        assert_eq!(once, twice);
        assert_eq!(twice.matches("## Footnotes").count(), 1);
    }

    #[test]
    fn test_skips_existing_markers() {
        let input = "Claim[[1]](#note) here.";
        assert_eq!(footnote_links(input), input);
    }

    #[test]
    fn test_skips_footnote_anchors() {
        let input = "Text [back](#fnref:1) and [note](#fn:2).";
        assert_eq!(footnote_links(input), input);
    }

    #[test]
    fn test_mixed_skip_and_transform() {
        let out = footnote_links("[x](#fn:1) [y](https://y.dev)");
        assert!(out.starts_with("[x](#fn:1) y [1]"));
        assert!(out.ends_with("[1]: https://y.dev"));
    }

    #[test]
    fn test_malformed_links_left_verbatim() {
        let input = "Broken [link](https://example.com and [other] text";
        assert_eq!(footnote_links(input), input);
    }

    #[test]
    fn test_link_does_not_span_lines() {
        let input = "[text\n](https://example.com)";
        assert_eq!(footnote_links(input), input);
    }
}
