//! Predicates over a tool result

use crate::types::ValidationContext;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A rule predicate. A check "fires" when the problem it describes is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Field is missing, null, an empty/blank string, or an empty array/object
    FieldEmpty { field: String },

    /// Field is a non-empty string shorter than `min_chars`
    FieldShorterThan { field: String, min_chars: usize },

    /// Any of the fields is a string matching the (case-insensitive) pattern
    FieldMatches { fields: Vec<String>, pattern: String },

    /// Field equals the given value
    FieldEquals { field: String, value: Value },

    /// Field equals the named context value
    UnchangedFromContext { field: String, context_key: String },

    /// Field is an array with no elements
    ArrayEmpty { field: String },

    /// Field is a number below `min`
    NumberBelow { field: String, min: f64 },

    /// Field and the named parameter are both present and differ
    ParamMismatch { field: String, param: String },
}

impl Check {
    /// Build the case-insensitive regex a `FieldMatches` check needs
    pub fn compile(&self) -> Result<Option<Regex>, regex::Error> {
        match self {
            Check::FieldMatches { pattern, .. } => Regex::new(&format!("(?i){pattern}")).map(Some),
            _ => Ok(None),
        }
    }

    /// Evaluate against a result. Returns the offending value when the check fires.
    pub fn evaluate(
        &self,
        regex: Option<&Regex>,
        result: &Value,
        params: &Value,
        context: &ValidationContext,
    ) -> Option<Value> {
        match self {
            Check::FieldEmpty { field } => match lookup(result, field) {
                None => Some(Value::Null),
                Some(value) if is_empty(value) => Some(value.clone()),
                Some(_) => None,
            },
            Check::FieldShorterThan { field, min_chars } => lookup(result, field)
                .and_then(Value::as_str)
                .filter(|text| {
                    let len = text.trim().chars().count();
                    len > 0 && len < *min_chars
                })
                .map(|text| Value::String(text.to_string())),
            Check::FieldMatches { fields, .. } => {
                let regex = regex?;
                fields.iter().find_map(|field| {
                    lookup(result, field)
                        .and_then(Value::as_str)
                        .filter(|text| regex.is_match(text))
                        .map(|text| Value::String(text.to_string()))
                })
            }
            Check::FieldEquals { field, value } => {
                lookup(result, field).filter(|actual| *actual == value).cloned()
            }
            Check::UnchangedFromContext { field, context_key } => {
                let before = context.lookup(context_key)?;
                lookup(result, field)
                    .filter(|after| **after == before)
                    .cloned()
            }
            Check::ArrayEmpty { field } => lookup(result, field)
                .and_then(Value::as_array)
                .filter(|items| items.is_empty())
                .map(|_| Value::Array(Vec::new())),
            Check::NumberBelow { field, min } => lookup(result, field)
                .and_then(Value::as_f64)
                .filter(|number| number < min)
                .map(Value::from),
            Check::ParamMismatch { field, param } => {
                let actual = lookup(result, field)?;
                let expected = lookup(params, param)?;
                (actual != expected).then(|| actual.clone())
            }
        }
    }
}

/// Resolve a dotted path (`page.url`) inside an object
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Short rendering of an offending value for message templates
pub fn render(value: &Value) -> String {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Null => "nothing".to_string(),
        other => other.to_string(),
    };
    if text.chars().count() > 80 {
        let truncated: String = text.chars().take(77).collect();
        format!("{truncated}...")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fires(check: Check, result: Value) -> bool {
        let regex = check.compile().expect("pattern");
        check
            .evaluate(regex.as_ref(), &result, &json!({}), &ValidationContext::default())
            .is_some()
    }

    #[test]
    fn empty_and_short_fields() {
        let empty = Check::FieldEmpty {
            field: "content".into(),
        };
        assert!(fires(empty.clone(), json!({"content": "  "})));
        assert!(fires(empty.clone(), json!({})));
        assert!(!fires(empty, json!({"content": "hello"})));

        let short = Check::FieldShorterThan {
            field: "content".into(),
            min_chars: 10,
        };
        assert!(fires(short.clone(), json!({"content": "hi"})));
        assert!(!fires(short.clone(), json!({"content": ""})));
        assert!(!fires(short, json!({"content": "long enough text"})));
    }

    #[test]
    fn pattern_and_nested_fields() {
        let check = Check::FieldMatches {
            fields: vec!["page.title".into()],
            pattern: r"not found".into(),
        };
        assert!(fires(check.clone(), json!({"page": {"title": "Page Not Found"}})));
        assert!(!fires(check, json!({"page": {"title": "Welcome"}})));
    }

    #[test]
    fn context_and_param_comparisons() {
        let context = ValidationContext::new().with_previous_url("https://x/");
        let unchanged = Check::UnchangedFromContext {
            field: "url".into(),
            context_key: "previousUrl".into(),
        };
        assert!(unchanged
            .evaluate(None, &json!({"url": "https://x/"}), &json!({}), &context)
            .is_some());
        assert!(unchanged
            .evaluate(None, &json!({"url": "https://x/next"}), &json!({}), &context)
            .is_none());

        let mismatch = Check::ParamMismatch {
            field: "value".into(),
            param: "text".into(),
        };
        let params = json!({"text": "hello"});
        assert!(mismatch
            .evaluate(None, &json!({"value": "hell"}), &params, &context)
            .is_some());
        assert!(mismatch
            .evaluate(None, &json!({"value": "hello"}), &params, &context)
            .is_none());
        assert!(mismatch
            .evaluate(None, &json!({}), &params, &context)
            .is_none());
    }

    #[test]
    fn numbers_and_arrays() {
        assert!(fires(
            Check::NumberBelow {
                field: "confidence".into(),
                min: 0.5
            },
            json!({"confidence": 0.3})
        ));
        assert!(fires(
            Check::ArrayEmpty {
                field: "candidates".into()
            },
            json!({"candidates": []})
        ));
        assert!(!fires(
            Check::ArrayEmpty {
                field: "candidates".into()
            },
            json!({"candidates": [1]})
        ));
    }

    #[test]
    fn render_truncates() {
        assert_eq!(render(&json!("abc")), "abc");
        assert_eq!(render(&Value::Null), "nothing");
        assert!(render(&json!("x".repeat(200))).ends_with("..."));
    }
}
