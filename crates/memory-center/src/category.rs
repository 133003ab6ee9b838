//! Failure taxonomy and ordered categorization rules

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    SelectorNotFound,
    SelectorInvalid,
    ElementNotClickable,
    ElementNotVisible,
    Timeout,
    NavigationFailed,
    NetworkError,
    BrowserNotInitialized,
    CaptchaFailed,
    JavascriptError,
    PermissionDenied,
    FileNotFound,
    #[default]
    Unknown,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 13] = [
        ErrorCategory::SelectorNotFound,
        ErrorCategory::SelectorInvalid,
        ErrorCategory::ElementNotClickable,
        ErrorCategory::ElementNotVisible,
        ErrorCategory::Timeout,
        ErrorCategory::NavigationFailed,
        ErrorCategory::NetworkError,
        ErrorCategory::BrowserNotInitialized,
        ErrorCategory::CaptchaFailed,
        ErrorCategory::JavascriptError,
        ErrorCategory::PermissionDenied,
        ErrorCategory::FileNotFound,
        ErrorCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::SelectorNotFound => "selector-not-found",
            ErrorCategory::SelectorInvalid => "selector-invalid",
            ErrorCategory::ElementNotClickable => "element-not-clickable",
            ErrorCategory::ElementNotVisible => "element-not-visible",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::NavigationFailed => "navigation-failed",
            ErrorCategory::NetworkError => "network-error",
            ErrorCategory::BrowserNotInitialized => "browser-not-initialized",
            ErrorCategory::CaptchaFailed => "captcha-failed",
            ErrorCategory::JavascriptError => "javascript-error",
            ErrorCategory::PermissionDenied => "permission-denied",
            ErrorCategory::FileNotFound => "file-not-found",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Categories where an alternative locator may fix the failure
    pub fn is_locator_problem(&self) -> bool {
        matches!(
            self,
            ErrorCategory::SelectorNotFound
                | ErrorCategory::SelectorInvalid
                | ErrorCategory::ElementNotVisible
                | ErrorCategory::ElementNotClickable
        )
    }

    pub fn likely_causes(&self) -> &'static [&'static str] {
        match self {
            ErrorCategory::SelectorNotFound => &[
                "The page markup changed and the selector no longer matches",
                "The element is rendered later than the operation ran",
                "The element lives inside an iframe or shadow root",
            ],
            ErrorCategory::SelectorInvalid => &[
                "The selector has a syntax error",
                "An id or class starts with a digit and is not escaped",
            ],
            ErrorCategory::ElementNotClickable => &[
                "Another element (overlay, modal, banner) covers the target",
                "The element is disabled or detached from the document",
                "The element is still animating into place",
            ],
            ErrorCategory::ElementNotVisible => &[
                "The element is hidden by CSS or has zero size",
                "The element is outside the viewport and needs scrolling",
                "A parent container is collapsed",
            ],
            ErrorCategory::Timeout => &[
                "The page or element took longer than the configured timeout",
                "A slow network or server response",
                "The awaited condition never becomes true",
            ],
            ErrorCategory::NavigationFailed => &[
                "The target URL is wrong or unreachable",
                "A redirect or script aborted the navigation",
                "The page crashed while loading",
            ],
            ErrorCategory::NetworkError => &[
                "No network connectivity or DNS resolution failure",
                "The server refused or reset the connection",
                "A proxy rejected the request",
            ],
            ErrorCategory::BrowserNotInitialized => &[
                "The browser was not launched before the operation",
                "The browser or page was closed or crashed",
            ],
            ErrorCategory::CaptchaFailed => &[
                "The site presented a bot challenge",
                "The challenge could not be solved automatically",
            ],
            ErrorCategory::JavascriptError => &[
                "The evaluated script references a missing variable or function",
                "The page script threw an exception",
            ],
            ErrorCategory::PermissionDenied => &[
                "The site requires authentication or refuses access",
                "The process lacks file system permissions",
            ],
            ErrorCategory::FileNotFound => &[
                "The referenced file path does not exist",
                "The working directory differs from the expected one",
            ],
            ErrorCategory::Unknown => &["The failure did not match any known category"],
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ErrorCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| format!("unknown error category '{s}'"))
    }
}

/// Ordered rule list; the first matching rule wins.
static RULES: Lazy<Vec<(ErrorCategory, Regex)>> = Lazy::new(|| {
    let rules: [(ErrorCategory, &str); 12] = [
        (
            ErrorCategory::SelectorNotFound,
            r"(?i)\b(element|node|selector|locator)\b.*\bnot\s+found|no\s+(element|node)s?\s+(found|match)|(unable to|could not|couldn't|failed to|cannot) (find|locate|resolve) (the )?(element|node|selector|locator)|waiting for (selector|locator)|no such element|resolved to 0 elements",
        ),
        (
            ErrorCategory::SelectorInvalid,
            r"(?i)(invalid|malformed|unsupported|bad)\s+(css\s+|xpath\s+)?selector|is not a valid (css )?selector|failed to execute '?query ?selector|unexpected token .*selector|selector.*syntax",
        ),
        (
            ErrorCategory::ElementNotClickable,
            r"(?i)not\s+clickable|click\s+intercepted|intercepts pointer events|would receive the click|element is (disabled|detached|not enabled)|not attached to the dom",
        ),
        (
            ErrorCategory::ElementNotVisible,
            r"(?i)not\s+visible|not\s+displayed|element is hidden|hidden element|outside (of )?the viewport|has zero size|not in (the )?viewport",
        ),
        (
            ErrorCategory::Timeout,
            r"(?i)\btimed?[\s-]?out\b|timeout|deadline exceeded|took too long",
        ),
        (
            ErrorCategory::NavigationFailed,
            r"(?i)navigat(e|ion)\w*\b.*\b(failed|error|aborted|interrupted)|failed to navigate|net::err_aborted|page (crashed|failed to load)|frame (was )?detached",
        ),
        (
            ErrorCategory::NetworkError,
            r"(?i)net::err_|network\s*(error|request failed|failure|changed)|econnrefused|econnreset|enotfound|etimedout|connection (refused|reset|closed)|dns|fetch failed|socket hang up|proxy",
        ),
        (
            ErrorCategory::BrowserNotInitialized,
            r"(?i)browser (is )?not (initiali[sz]ed|launched|started|running|connected)|no (browser|page) (instance|available|open)|browser (has )?(been )?(closed|disconnected)|target (page, context or browser )?(has been )?closed|session (closed|not found)",
        ),
        (
            ErrorCategory::CaptchaFailed,
            r"(?i)captcha|challenge (failed|detected|required)|are you a (robot|human)|verify you are human",
        ),
        (
            ErrorCategory::JavascriptError,
            r"(?i)(evaluation|script|javascript|js) (failed|error)|referenceerror|typeerror|syntaxerror|is not a function|is not defined|cannot read propert(y|ies)|uncaught",
        ),
        (
            ErrorCategory::PermissionDenied,
            r"(?i)permission denied|access (is )?denied|not (allowed|permitted)|forbidden|unauthori[sz]ed|eacces|eperm\b",
        ),
        (
            ErrorCategory::FileNotFound,
            r"(?i)enoent|no such file|file not found|cannot find (the )?file|(path|file) does not exist",
        ),
    ];
    rules
        .into_iter()
        .map(|(category, pattern)| (category, Regex::new(pattern).expect("static regex")))
        .collect()
});

/// Categorize an error message; deterministic, first rule wins.
pub fn categorize(message: &str) -> ErrorCategory {
    RULES
        .iter()
        .find(|(_, rule)| rule.is_match(message))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_each_family() {
        let cases = [
            ("Element not found: #submit-old", ErrorCategory::SelectorNotFound),
            ("waiting for selector `.cart` failed", ErrorCategory::SelectorNotFound),
            (
                "SyntaxError: Failed to execute 'querySelector' on 'Document': '##a' is not a valid selector",
                ErrorCategory::SelectorInvalid,
            ),
            (
                "Element is not clickable at point (10, 20). Other element would receive the click",
                ErrorCategory::ElementNotClickable,
            ),
            ("Node is not visible or not an HTMLElement", ErrorCategory::ElementNotVisible),
            ("Timeout 30000ms exceeded", ErrorCategory::Timeout),
            ("Navigation to https://x/ was aborted", ErrorCategory::NavigationFailed),
            ("net::ERR_CONNECTION_REFUSED", ErrorCategory::NetworkError),
            ("Browser not initialized", ErrorCategory::BrowserNotInitialized),
            ("reCAPTCHA challenge failed", ErrorCategory::CaptchaFailed),
            ("ReferenceError: foo is not defined", ErrorCategory::JavascriptError),
            ("EACCES: permission denied, open '/root/x'", ErrorCategory::PermissionDenied),
            ("ENOENT: no such file or directory", ErrorCategory::FileNotFound),
            ("something odd happened", ErrorCategory::Unknown),
        ];
        for (message, expected) in cases {
            assert_eq!(categorize(message), expected, "{message}");
        }
    }

    #[test]
    fn overlapping_rules_resolve_by_order() {
        // matches both the not-found and the timeout rule
        let message = "Timeout while waiting for selector #go";
        assert_eq!(categorize(message), ErrorCategory::SelectorNotFound);
        assert_eq!(categorize(message), categorize(message));
    }

    #[test]
    fn round_trips_names() {
        for category in ErrorCategory::ALL {
            assert_eq!(category.as_str().parse::<ErrorCategory>(), Ok(category));
            assert!(!category.likely_causes().is_empty());
        }
        assert_eq!(
            serde_json::to_string(&ErrorCategory::ElementNotVisible).expect("json"),
            "\"element-not-visible\""
        );
        assert!(ErrorCategory::SelectorInvalid.is_locator_problem());
        assert!(!ErrorCategory::Timeout.is_locator_problem());
    }
}
