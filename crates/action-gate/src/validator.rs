//! Rule-driven result validator

use crate::{
    conditions::render,
    errors::GateError,
    history::{ValidationHistory, ValidatorStats, DEFAULT_HISTORY_CAP},
    rules::{normalize_tool, RuleTable, ToolRule},
    types::*,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Thresholds and extra rules for the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorPolicy {
    pub history_cap: usize,
    /// Duration above which a small deduction applies
    pub slow_warn_ms: u64,
    /// Duration above which a larger deduction applies
    pub slow_error_ms: u64,
    pub slow_warn_deduction: u32,
    pub slow_error_deduction: u32,
    pub healed_deduction: u32,
    /// Appended after the built-in rules of their tool
    pub extra_rules: Vec<ToolRule>,
}

impl Default for ValidatorPolicy {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
            slow_warn_ms: 5_000,
            slow_error_ms: 10_000,
            slow_warn_deduction: 5,
            slow_error_deduction: 15,
            healed_deduction: 10,
            extra_rules: Vec::new(),
        }
    }
}

/// Scores results of operations that reported success.
pub struct ResultValidator {
    policy: ValidatorPolicy,
    rules: RuleTable,
    history: Mutex<ValidationHistory>,
}

impl Default for ResultValidator {
    fn default() -> Self {
        Self::with_rules(ValidatorPolicy::default(), RuleTable::builtin())
    }
}

impl ResultValidator {
    /// Built-in rules plus the policy's extra rules
    pub fn new(policy: ValidatorPolicy) -> Result<Self, GateError> {
        let mut rules = RuleTable::builtin();
        rules.extend(policy.extra_rules.clone())?;
        Ok(Self::with_rules(policy, rules))
    }

    pub fn with_rules(policy: ValidatorPolicy, rules: RuleTable) -> Self {
        let history = ValidationHistory::new(policy.history_cap);
        Self {
            policy,
            rules,
            history: Mutex::new(history),
        }
    }

    pub fn policy(&self) -> &ValidatorPolicy {
        &self.policy
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Whether the result itself already reports a failure
    pub fn signals_failure(result: &Value) -> bool {
        if result.get("success").and_then(Value::as_bool) == Some(false) {
            return true;
        }
        matches!(result.get("error"), Some(error) if !error.is_null() && error != &Value::Bool(false))
    }

    /// Score `result` for `tool`.
    ///
    /// Universal checks (duration, healed flag) run first, then the tool's
    /// rules in table order.
    pub fn validate(
        &self,
        tool: &str,
        result: &Value,
        params: &Value,
        context: &ValidationContext,
    ) -> ValidationResult {
        if Self::signals_failure(result) {
            debug!("Result for {} already reports failure, not scoring", tool);
            let verdict = ValidationResult::skipped();
            self.history.lock().record(&normalize_tool(tool), &verdict);
            return verdict;
        }

        let mut issues = self.universal_issues(result, context);
        for compiled in self.rules.for_tool(tool) {
            let rule = &compiled.rule;
            let fired = rule
                .check
                .evaluate(compiled.regex.as_ref(), result, params, context);
            if let Some(offending) = fired {
                debug!("Rule {} fired for {}", rule.issue_type, tool);
                issues.push(Issue::new(
                    rule.issue_type.clone(),
                    rule.message.replace("{value}", &render(&offending)),
                    rule.severity,
                    rule.deduction,
                ));
            }
        }

        let verdict = ValidationResult::from_issues(issues);
        if !verdict.is_perfect() {
            info!(
                tool = %tool,
                score = verdict.score,
                valid = verdict.valid,
                "Result validation found {} issue(s)",
                verdict.issues.len()
            );
        }
        self.history.lock().record(&normalize_tool(tool), &verdict);
        verdict
    }

    fn universal_issues(&self, result: &Value, context: &ValidationContext) -> Vec<Issue> {
        let mut issues = Vec::new();
        let duration = context.duration_ms.or_else(|| {
            result
                .get("duration_ms")
                .or_else(|| result.get("durationMs"))
                .and_then(Value::as_u64)
        });
        if let Some(duration) = duration {
            if duration > self.policy.slow_error_ms {
                issues.push(Issue::new(
                    "slow_execution",
                    format!("Execution took {duration}ms"),
                    Severity::Warning,
                    self.policy.slow_error_deduction,
                ));
            } else if duration > self.policy.slow_warn_ms {
                issues.push(Issue::new(
                    "slow_execution",
                    format!("Execution took {duration}ms"),
                    Severity::Warning,
                    self.policy.slow_warn_deduction,
                ));
            }
        }
        if result.get("healed").and_then(Value::as_bool) == Some(true) {
            issues.push(Issue::new(
                "healed_selector",
                "Operation succeeded only after selector healing",
                Severity::Warning,
                self.policy.healed_deduction,
            ));
        }
        issues
    }

    pub fn stats(&self) -> ValidatorStats {
        self.history.lock().stats()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::Check;
    use crate::rules::Rule;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn validator() -> ResultValidator {
        ResultValidator::default()
    }

    #[test]
    fn empty_content_is_an_error() {
        let verdict = validator().validate(
            "get_content",
            &json!({"success": true, "content": ""}),
            &json!({}),
            &ValidationContext::default(),
        );
        assert!(verdict.score <= 20);
        assert!(!verdict.valid);
        let issue = verdict
            .issues
            .iter()
            .find(|issue| issue.issue_type == "content_empty")
            .expect("content issue");
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.message, "Content is empty");
    }

    #[test]
    fn error_page_navigation() {
        let verdict = validator().validate(
            "navigate",
            &json!({"success": true, "url": "https://x/404", "title": "404 Not Found"}),
            &json!({}),
            &ValidationContext::new().with_previous_url("https://x/"),
        );
        assert!(!verdict.valid);
        let issue = verdict
            .issues
            .iter()
            .find(|issue| issue.issue_type == "error_page")
            .expect("error page issue");
        assert_eq!(issue.severity, Severity::Error);
        assert!(!verdict.has_issue("url_unchanged"));
    }

    #[test]
    fn unchanged_url_is_a_warning() {
        let verdict = validator().validate(
            "navigate",
            &json!({"success": true, "url": "https://x/", "title": "Home"}),
            &json!({}),
            &ValidationContext::new().with_previous_url("https://x/"),
        );
        assert!(verdict.valid);
        assert_eq!(verdict.score, 80);
        assert_eq!(verdict.warnings, vec!["URL did not change: https://x/"]);
    }

    #[test]
    fn failed_results_are_not_scored() {
        let v = validator();
        for result in [
            json!({"success": false, "content": ""}),
            json!({"error": "boom"}),
        ] {
            let verdict = v.validate("get_content", &result, &json!({}), &ValidationContext::default());
            assert!(verdict.skipped);
            assert!(verdict.issues.is_empty());
            assert_eq!(verdict.score, 100);
        }
    }

    #[test]
    fn failed_results_leave_stats_unchanged() {
        let v = validator();
        v.validate(
            "get_content",
            &json!({"success": true, "content": ""}),
            &json!({}),
            &ValidationContext::default(),
        );
        let before = v.stats();

        v.validate(
            "get_content",
            &json!({"success": false}),
            &json!({}),
            &ValidationContext::default(),
        );

        let after = v.stats();
        assert_eq!(v.history_len(), 1);
        assert_eq!(after.total_validations, before.total_validations);
        assert_eq!(after.average_score, before.average_score);
        assert_eq!(after.valid_rate, 0.0);
        assert_eq!(after.top_issues, before.top_issues);
        assert_eq!(after.skipped_validations, 1);
    }

    #[test]
    fn universal_checks() {
        let v = validator();
        let slow = v.validate(
            "hover",
            &json!({"success": true, "duration_ms": 12_000, "healed": true}),
            &json!({}),
            &ValidationContext::default(),
        );
        assert_eq!(slow.score, 75);
        assert!(slow.valid);
        assert_eq!(slow.warnings.len(), 2);

        let moderate = v.validate(
            "hover",
            &json!({"success": true}),
            &json!({}),
            &ValidationContext::new().with_duration_ms(6_000),
        );
        assert_eq!(moderate.score, 95);

        let clean = v.validate("hover", &json!({"success": true}), &json!({}), &ValidationContext::default());
        assert_eq!(clean, ValidationResult::clean());
    }

    #[test]
    fn score_never_negative() {
        let mut rules = RuleTable::builtin();
        for n in 0..3 {
            rules
                .add(
                    "get_content",
                    Rule::new(
                        format!("extra_{n}"),
                        Check::FieldEmpty {
                            field: "content".into(),
                        },
                        "extra",
                        Severity::Error,
                        90,
                    ),
                )
                .expect("rule");
        }
        let v = ResultValidator::with_rules(ValidatorPolicy::default(), rules);
        let verdict = v.validate(
            "get_content",
            &json!({"content": null}),
            &json!({}),
            &ValidationContext::default(),
        );
        assert_eq!(verdict.score, 0);
        assert!(!verdict.valid);
    }

    #[test]
    fn tool_specific_rules() {
        let v = validator();
        let typed = v.validate(
            "type_text",
            &json!({"success": true, "value": "hel"}),
            &json!({"text": "hello"}),
            &ValidationContext::default(),
        );
        assert_eq!(typed.issues[0].message, "Field value differs from the typed text: hel");

        let found = v.validate(
            "find_element",
            &json!({"success": true, "candidates": []}),
            &json!({}),
            &ValidationContext::default(),
        );
        assert_eq!(found.score, 40);
        assert!(!found.valid);
    }

    #[test]
    fn history_and_stats() {
        let v = ResultValidator::new(ValidatorPolicy {
            history_cap: 2,
            ..ValidatorPolicy::default()
        })
        .expect("validator");
        for content in ["", "", "plenty of content that easily clears the fifty character bar"] {
            v.validate(
                "get_content",
                &json!({"content": content}),
                &json!({}),
                &ValidationContext::default(),
            );
        }
        assert_eq!(v.history_len(), 2);
        let stats = v.stats();
        assert_eq!(stats.total_validations, 2);
        assert!((stats.average_score - 60.0).abs() < 1e-9);
        assert_eq!(stats.top_issues[0].issue_type, "content_empty");
    }
}
