//! Declarative per-tool rule table

use crate::{conditions::Check, errors::GateError, types::Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `{predicate, message, severity, deduction}` for one tool.
///
/// `{value}` in the message is replaced by the offending value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub issue_type: String,
    #[serde(flatten)]
    pub check: Check,
    pub message: String,
    pub severity: Severity,
    pub deduction: u32,
}

impl Rule {
    pub fn new(
        issue_type: impl Into<String>,
        check: Check,
        message: impl Into<String>,
        severity: Severity,
        deduction: u32,
    ) -> Self {
        Self {
            issue_type: issue_type.into(),
            check,
            message: message.into(),
            severity,
            deduction,
        }
    }
}

/// A rule bound to a tool name, as written in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRule {
    pub tool: String,
    #[serde(flatten)]
    pub rule: Rule,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub rule: Rule,
    pub regex: Option<Regex>,
}

/// Ordered rules per tool name
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<String, Vec<CompiledRule>>,
}

/// Tool names compare case-insensitively with `-` and `_` interchangeable
pub fn normalize_tool(tool: &str) -> String {
    tool.trim().to_ascii_lowercase().replace('-', "_")
}

fn field(name: &str) -> String {
    name.to_string()
}

impl RuleTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in rules for the standard browser tools
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (tool, rule) in builtin_rules() {
            // built-in patterns are literals
            if let Err(err) = table.add(tool, rule) {
                tracing::warn!("skipping built-in rule for {}: {}", tool, err);
            }
        }
        table
    }

    /// Append a rule after the existing ones for `tool`
    pub fn add(&mut self, tool: &str, rule: Rule) -> Result<(), GateError> {
        if rule.issue_type.trim().is_empty() {
            return Err(GateError::InvalidRule(format!(
                "rule for '{tool}' has no issue type"
            )));
        }
        if rule.deduction > 100 {
            return Err(GateError::InvalidRule(format!(
                "deduction {} for '{}' exceeds 100",
                rule.deduction, rule.issue_type
            )));
        }
        let regex = rule.check.compile().map_err(|err| GateError::InvalidPattern {
            pattern: match &rule.check {
                Check::FieldMatches { pattern, .. } => pattern.clone(),
                _ => String::new(),
            },
            reason: err.to_string(),
        })?;
        self.rules
            .entry(normalize_tool(tool))
            .or_default()
            .push(CompiledRule { rule, regex });
        Ok(())
    }

    pub fn extend(&mut self, rules: impl IntoIterator<Item = ToolRule>) -> Result<(), GateError> {
        for tool_rule in rules {
            self.add(&tool_rule.tool, tool_rule.rule)?;
        }
        Ok(())
    }

    pub(crate) fn for_tool(&self, tool: &str) -> &[CompiledRule] {
        self.rules
            .get(&normalize_tool(tool))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rules_for(&self, tool: &str) -> Vec<Rule> {
        self.for_tool(tool)
            .iter()
            .map(|compiled| compiled.rule.clone())
            .collect()
    }

    pub fn tools(&self) -> Vec<String> {
        let mut tools: Vec<String> = self.rules.keys().cloned().collect();
        tools.sort();
        tools
    }
}

fn builtin_rules() -> Vec<(&'static str, Rule)> {
    use Severity::{Error, Warning};
    vec![
        (
            "get_content",
            Rule::new(
                "content_empty",
                Check::FieldEmpty {
                    field: field("content"),
                },
                "Content is empty",
                Error,
                80,
            ),
        ),
        (
            "get_content",
            Rule::new(
                "content_short",
                Check::FieldShorterThan {
                    field: field("content"),
                    min_chars: 50,
                },
                "Content is suspiciously short: {value}",
                Warning,
                20,
            ),
        ),
        (
            "get_content",
            Rule::new(
                "content_blocked",
                Check::FieldMatches {
                    fields: vec![field("content")],
                    pattern: r"access denied|verify you are (a )?human|enable javascript|are you a robot".into(),
                },
                "Content looks like a block or challenge page",
                Warning,
                25,
            ),
        ),
        (
            "navigate",
            Rule::new(
                "error_page",
                Check::FieldMatches {
                    fields: vec![field("url"), field("title")],
                    pattern: r"\b(?:400|401|403|404|500|502|503)\b|not found|\berror\b|forbidden|access denied".into(),
                },
                "Navigation landed on an error page: {value}",
                Error,
                50,
            ),
        ),
        (
            "navigate",
            Rule::new(
                "blank_page",
                Check::FieldEquals {
                    field: field("url"),
                    value: "about:blank".into(),
                },
                "Navigation ended on a blank page",
                Error,
                40,
            ),
        ),
        (
            "navigate",
            Rule::new(
                "url_unchanged",
                Check::UnchangedFromContext {
                    field: field("url"),
                    context_key: field("previous_url"),
                },
                "URL did not change: {value}",
                Warning,
                20,
            ),
        ),
        (
            "click",
            Rule::new(
                "no_effect",
                Check::FieldEquals {
                    field: field("changed"),
                    value: false.into(),
                },
                "Click had no visible effect",
                Warning,
                15,
            ),
        ),
        (
            "find_element",
            Rule::new(
                "no_candidates",
                Check::ArrayEmpty {
                    field: field("candidates"),
                },
                "No candidates found",
                Error,
                60,
            ),
        ),
        (
            "find_element",
            Rule::new(
                "low_confidence",
                Check::NumberBelow {
                    field: field("confidence"),
                    min: 0.5,
                },
                "Best candidate has low confidence: {value}",
                Warning,
                20,
            ),
        ),
        (
            "type_text",
            Rule::new(
                "text_mismatch",
                Check::ParamMismatch {
                    field: field("value"),
                    param: field("text"),
                },
                "Field value differs from the typed text: {value}",
                Warning,
                30,
            ),
        ),
        (
            "screenshot",
            Rule::new(
                "screenshot_empty",
                Check::FieldEmpty {
                    field: field("data"),
                },
                "Screenshot data is empty",
                Error,
                70,
            ),
        ),
        (
            "evaluate",
            Rule::new(
                "no_value",
                Check::FieldEmpty {
                    field: field("result"),
                },
                "Evaluation returned no value",
                Warning,
                10,
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_table_covers_tools() {
        let table = RuleTable::builtin();
        assert_eq!(
            table.tools(),
            vec![
                "click",
                "evaluate",
                "find_element",
                "get_content",
                "navigate",
                "screenshot",
                "type_text"
            ]
        );
        assert_eq!(table.rules_for("Get-Content").len(), 3);
        assert!(table.rules_for("hover").is_empty());
    }

    #[test]
    fn rejects_bad_rules() {
        let mut table = RuleTable::empty();
        let bad_pattern = Rule::new(
            "x",
            Check::FieldMatches {
                fields: vec!["a".into()],
                pattern: "(".into(),
            },
            "m",
            Severity::Warning,
            5,
        );
        assert!(matches!(
            table.add("t", bad_pattern),
            Err(GateError::InvalidPattern { .. })
        ));
        let too_much = Rule::new(
            "x",
            Check::FieldEmpty { field: "a".into() },
            "m",
            Severity::Error,
            150,
        );
        assert!(matches!(table.add("t", too_much), Err(GateError::InvalidRule(_))));
    }

    #[test]
    fn tool_rules_parse_from_yaml() {
        let yaml = r#"
- tool: get_content
  issue_type: paywall
  check: field_matches
  fields: [content]
  pattern: "subscribe to continue"
  message: "Content is behind a paywall"
  severity: error
  deduction: 40
"#;
        let rules: Vec<ToolRule> = serde_yaml::from_str(yaml).expect("yaml");
        assert_eq!(rules[0].rule.issue_type, "paywall");
        let mut table = RuleTable::builtin();
        table.extend(rules).expect("extend");
        let ordered = table.rules_for("get_content");
        assert_eq!(ordered.last().map(|r| r.issue_type.as_str()), Some("paywall"));
    }
}
