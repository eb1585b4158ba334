use std::sync::OnceLock;

use html_escape::decode_html_entities;
use regex::Regex;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"))
}

fn expression_pattern() -> &'static Regex {
    static EXPR: OnceLock<Regex> = OnceLock::new();
    EXPR.get_or_init(|| Regex::new(r"\{[^}]*\}").expect("valid expression pattern"))
}

/// Removes markup that has no meaning in a terminal: component tags,
/// `{...}` template expressions and the given import statements. HTML
/// entities left behind are decoded.
pub fn strip_markup(body: &str, literals: &[String]) -> String {
    let mut text = body.to_string();
    for literal in literals.iter().filter(|l| !l.is_empty()) {
        text = text.replace(literal.as_str(), "");
    }

    let text = tag_pattern().replace_all(&text, "");
    let text = expression_pattern().replace_all(&text, "");
    decode_html_entities(&text).into_owned()
}
