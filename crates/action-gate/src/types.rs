//! Core types for result validation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Issue severity; any `Error` makes a result invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One problem found in a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub message: String,
    pub severity: Severity,
    /// Points taken off the score
    pub deduction: u32,
}

impl Issue {
    pub fn new(
        issue_type: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        deduction: u32,
    ) -> Self {
        Self {
            issue_type: issue_type.into(),
            message: message.into(),
            severity,
            deduction,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Quality verdict for a nominally successful result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// 0-100, starting at 100
    pub score: u32,
    pub issues: Vec<Issue>,
    pub warnings: Vec<String>,
    /// False iff any issue has error severity
    pub valid: bool,
    /// The result already reported failure and was not scored
    #[serde(default)]
    pub skipped: bool,
}

impl ValidationResult {
    pub const MAX_SCORE: u32 = 100;

    /// Perfect score, no issues
    pub fn clean() -> Self {
        Self {
            score: Self::MAX_SCORE,
            issues: Vec::new(),
            warnings: Vec::new(),
            valid: true,
            skipped: false,
        }
    }

    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::clean()
        }
    }

    /// Build from a list of issues; score and validity are derived
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        let total: u32 = issues
            .iter()
            .fold(0u32, |acc, issue| acc.saturating_add(issue.deduction));
        let warnings = issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
            .map(|issue| issue.message.clone())
            .collect();
        Self {
            score: Self::MAX_SCORE.saturating_sub(total),
            valid: !issues.iter().any(Issue::is_error),
            warnings,
            issues,
            skipped: false,
        }
    }

    pub fn has_issue(&self, issue_type: &str) -> bool {
        self.issues.iter().any(|issue| issue.issue_type == issue_type)
    }

    pub fn is_perfect(&self) -> bool {
        self.score == Self::MAX_SCORE
    }
}

/// Page state before the operation plus timing, used by rules that compare
/// against what was there before
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationContext {
    #[serde(default)]
    pub previous_url: Option<String>,

    #[serde(default)]
    pub previous_title: Option<String>,

    /// Wall-clock duration of the operation
    #[serde(default)]
    pub duration_ms: Option<u64>,

    /// Custom signals (extensible)
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_previous_url(mut self, url: impl Into<String>) -> Self {
        self.previous_url = Some(url.into());
        self
    }

    pub fn with_previous_title(mut self, title: impl Into<String>) -> Self {
        self.previous_title = Some(title.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn add_signal(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
    }

    /// Look up a context value by name; accepts snake_case and camelCase
    /// spellings of the typed fields
    pub fn lookup(&self, key: &str) -> Option<Value> {
        match key {
            "previous_url" | "previousUrl" => self.previous_url.clone().map(Value::String),
            "previous_title" | "previousTitle" => self.previous_title.clone().map(Value::String),
            "duration_ms" | "durationMs" => self.duration_ms.map(Value::from),
            other => self.extra.get(other).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn score_and_validity_follow_issues() {
        assert_eq!(ValidationResult::from_issues(Vec::new()), ValidationResult::clean());

        let result = ValidationResult::from_issues(vec![
            Issue::new("slow_execution", "slow", Severity::Warning, 15),
            Issue::new("content_empty", "empty", Severity::Error, 80),
            Issue::new("content_short", "short", Severity::Warning, 20),
        ]);
        assert_eq!(result.score, 0);
        assert!(!result.valid);
        assert_eq!(result.warnings, vec!["slow", "short"]);
        assert!(result.has_issue("content_empty"));
    }

    #[test]
    fn context_lookup() {
        let mut context = ValidationContext::new()
            .with_previous_url("https://x/")
            .with_duration_ms(42);
        context.add_signal("tab", json!(3));
        assert_eq!(context.lookup("previousUrl"), Some(json!("https://x/")));
        assert_eq!(context.lookup("duration_ms"), Some(json!(42)));
        assert_eq!(context.lookup("tab"), Some(json!(3)));
        assert_eq!(context.lookup("previous_title"), None);
    }
}
