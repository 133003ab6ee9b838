//! Placeholder normalization for error messages and selectors.
//!
//! Two failures that differ only in concrete values (ids, counts, urls)
//! normalize to the same signature and therefore compare as similar.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

pub const URL_PLACEHOLDER: &str = "<URL>";
pub const STRING_PLACEHOLDER: &str = "<STR>";
pub const PATH_PLACEHOLDER: &str = "<PATH>";
pub const NUMBER_PLACEHOLDER: &str = "<N>";

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:https?|wss?|file|about|data|chrome)://[^\s"'`<>)]*"#).expect("static regex")
});
static QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'|`[^`]*`"#).expect("static regex"));
static PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[A-Za-z]:)?(?:[\\/][\w.@\-]+){2,}[\\/]?").expect("static regex")
});
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?(?:ms|s|px)?\b").expect("static regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[\s*[\w:-]+\s*[*^$~|]?=\s*(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|[^\]]*)\s*(?:[is]\s*)?\]"#)
        .expect("static regex")
});
static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#(?:[\w-]|\\.)+").expect("static regex"));
static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.-?[A-Za-z_](?:[\w-]|\\.)*").expect("static regex"));
static NTH_CHILD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"nth-child\(\s*[^)]*\)").expect("static regex"));

/// Canonical form of an error message.
///
/// Urls, quoted substrings, filesystem paths and bare numbers are replaced by
/// fixed placeholders, whitespace is collapsed.
pub fn normalize_message(text: &str) -> String {
    let out = URL_RE.replace_all(text, URL_PLACEHOLDER);
    let out = QUOTED_RE.replace_all(&out, STRING_PLACEHOLDER);
    let out = PATH_RE.replace_all(&out, PATH_PLACEHOLDER);
    let out = NUMBER_RE.replace_all(&out, NUMBER_PLACEHOLDER);
    collapse(&out)
}

/// Canonical form of a CSS selector, keeping its structure.
///
/// `#login123` becomes `#<ID>`, `.btn-primary` becomes `.<CLASS>`,
/// `[name="q"]` becomes `[<ATTR>="<VAL>"]` and `nth-child(3)` becomes
/// `nth-child(<N>)`.
pub fn normalize_selector(selector: &str) -> String {
    let out = ATTR_RE.replace_all(selector, r#"[<ATTR>="<VAL>"]"#);
    let out = NTH_CHILD_RE.replace_all(&out, "nth-child(<N>)");
    let out = ID_RE.replace_all(&out, "#<ID>");
    let out = CLASS_RE.replace_all(&out, ".<CLASS>");
    collapse(&out)
}

static FRAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<path>(?:[A-Za-z]:)?[\w./\\@+-]*[\w-]\.[A-Za-z]{1,5}):(?P<line>\d+)(?::\d+)?")
        .expect("static regex")
});

const DEPENDENCY_MARKERS: &[&str] = &[
    "node_modules",
    ".cargo/registry",
    ".cargo/git",
    "/rustc/",
    "internal/",
    "<anonymous>",
];

/// First stack frame outside dependency paths, as `path:line`
pub fn code_location(stack: &str) -> Option<String> {
    stack
        .lines()
        .filter(|line| !DEPENDENCY_MARKERS.iter().any(|marker| line.contains(marker)))
        .find_map(|line| {
            FRAME_RE
                .captures(line)
                .map(|caps| format!("{}:{}", &caps["path"], &caps["line"]))
        })
}

fn collapse(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

fn words(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect()
}

/// Jaccard overlap of the whitespace-separated words of two strings
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let left = words(a);
    let right = words(b);
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let shared = left.intersection(&right).count();
    let union = left.union(&right).count();
    if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    }
}

/// 1.0 on exact equality, word overlap otherwise
pub fn exact_or_overlap(a: &str, b: &str) -> f64 {
    if a == b {
        1.0
    } else {
        word_overlap(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn selector_placeholders() {
        assert_eq!(normalize_selector("#login123"), "#<ID>");
        assert_eq!(normalize_selector(".btn-primary"), ".<CLASS>");
        assert_eq!(
            normalize_selector("form#checkout > button.btn.large[type=\"submit\"]"),
            "form#<ID> > button.<CLASS>.<CLASS>[<ATTR>=\"<VAL>\"]"
        );
        assert_eq!(
            normalize_selector("ul li:nth-child(12) a"),
            "ul li:nth-child(<N>) a"
        );
        assert_eq!(
            normalize_selector("input[placeholder='a.b #c']"),
            "input[<ATTR>=\"<VAL>\"]"
        );
    }

    #[test]
    fn message_placeholders() {
        assert_eq!(
            normalize_message("Timeout 30000ms exceeded waiting for \"#submit\""),
            "Timeout <N> exceeded waiting for <STR>"
        );
        assert_eq!(
            normalize_message("net::ERR_NAME_NOT_RESOLVED at https://shop.example.com/cart?id=9"),
            "net::ERR_NAME_NOT_RESOLVED at <URL>"
        );
        assert_eq!(
            normalize_message("ENOENT: open   /home/ci/app/data.json"),
            "ENOENT: open <PATH>"
        );
    }

    #[test]
    fn normalization_is_deterministic() {
        let msg = "Element not found: #item-42 after 3 retries";
        assert_eq!(normalize_message(msg), normalize_message(msg));
        assert_eq!(
            normalize_message("Element not found: #item-42"),
            normalize_message("Element not found: #item-97")
        );
    }

    #[test]
    fn code_location_skips_dependencies() {
        let stack = "Error: Element not found\n    at waitFor (/app/node_modules/driver/lib/wait.js:88:11)\n    at clickTool (/app/src/tools/click.js:42:7)\n    at run (/app/src/main.js:10:3)";
        assert_eq!(
            code_location(stack).as_deref(),
            Some("/app/src/tools/click.js:42")
        );

        let rust = "   0: core::panicking\n             at /rustc/abc/library/core/src/panicking.rs:72:14\n   1: app::run\n             at src/run.rs:19:5";
        assert_eq!(code_location(rust).as_deref(), Some("src/run.rs:19"));

        assert_eq!(code_location("no frames here"), None);
    }

    #[test]
    fn overlap_scores() {
        assert_eq!(word_overlap("a b c", "a b c"), 1.0);
        assert_eq!(word_overlap("", ""), 1.0);
        assert_eq!(word_overlap("a b", "c d"), 0.0);
        assert!((word_overlap("a b c", "a b d") - 0.5).abs() < 1e-9);
        assert_eq!(exact_or_overlap("#<ID>", "#<ID>"), 1.0);
    }
}
