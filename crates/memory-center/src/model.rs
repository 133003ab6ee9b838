use crate::category::ErrorCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Parameters and page state at the time of a failure
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub page_title: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_page_title(mut self, title: impl Into<String>) -> Self {
        self.page_title = Some(title.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub tool: String,
    pub category: ErrorCategory,
    pub message: String,
    pub message_signature: String,
    #[serde(default)]
    pub selector_signature: Option<String>,
    #[serde(default)]
    pub code_location: Option<String>,
    /// Redacted copy of the capture context
    #[serde(default)]
    pub context: ErrorContext,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub fix_ref: Option<String>,
}

impl FailureRecord {
    pub fn new(tool: impl Into<String>, category: ErrorCategory, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            tool: tool.into(),
            category,
            message_signature: crate::signature::normalize_message(&message),
            message,
            selector_signature: None,
            code_location: None,
            context: ErrorContext::default(),
            resolved: false,
            fix_ref: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixKind {
    #[default]
    SelectorSubstitution,
    ParameterChange,
    Retry,
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub kind: FixKind,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl Fix {
    pub fn selector_substitution(before: impl Into<String>, after: impl Into<String>) -> Self {
        let before = before.into();
        let after = after.into();
        Self {
            kind: FixKind::SelectorSubstitution,
            description: format!("replace selector {before} with {after}"),
            before: Some(before),
            after: Some(after),
        }
    }
}

/// Input to [`crate::PatternLearner::learn`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixInfo {
    pub fix: Fix,
    /// Overrides the learner's configured initial confidence
    #[serde(default)]
    pub initial_confidence: Option<f64>,
}

impl From<Fix> for FixInfo {
    fn from(fix: Fix) -> Self {
        Self {
            fix,
            initial_confidence: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSignature {
    pub tool: String,
    pub category: ErrorCategory,
    pub message_pattern: String,
    #[serde(default)]
    pub locator_pattern: Option<String>,
    #[serde(default)]
    pub code_location: Option<String>,
}

/// The failure a pattern was learned from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorSnapshot {
    pub record_id: String,
    pub message: String,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternMetrics {
    #[serde(default)]
    pub times_matched: u64,
    #[serde(default)]
    pub times_successful: u64,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub signature: PatternSignature,
    pub original_error: ErrorSnapshot,
    pub fix: Fix,
    pub metrics: PatternMetrics,
}

impl Pattern {
    /// Empirical success rate, `None` until the pattern has been used
    pub fn success_rate(&self) -> Option<f64> {
        if self.metrics.times_matched == 0 {
            None
        } else {
            Some(self.metrics.times_successful as f64 / self.metrics.times_matched as f64)
        }
    }

    /// Eviction weight; lowest goes first
    pub fn retention_score(&self) -> f64 {
        self.metrics.confidence * self.metrics.times_matched as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    #[default]
    Fuzzy,
    Exact,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: Pattern,
    pub similarity: f64,
    /// similarity x confidence x success rate (0.5 when unused)
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasedOn {
    pub pattern_id: String,
    pub original_error: String,
    pub success_rate: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestedFix {
    pub fix: Fix,
    pub confidence: f64,
    pub similarity: f64,
    pub based_on: BasedOn,
}

impl From<PatternMatch> for SuggestedFix {
    fn from(matched: PatternMatch) -> Self {
        let success_rate = matched.pattern.success_rate();
        Self {
            confidence: matched.pattern.metrics.confidence,
            similarity: matched.similarity,
            based_on: BasedOn {
                pattern_id: matched.pattern.id,
                original_error: matched.pattern.original_error.message,
                success_rate,
            },
            fix: matched.pattern.fix,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarError {
    pub record: FailureRecord,
    pub similarity: f64,
}
