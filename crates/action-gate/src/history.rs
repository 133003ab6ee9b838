//! Rolling validation history

use crate::types::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_HISTORY_CAP: usize = 100;
const TOP_ISSUES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub tool: String,
    pub score: u32,
    pub valid: bool,
    pub issue_types: Vec<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFrequency {
    pub issue_type: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorStats {
    /// Validations in the current window
    pub total_validations: usize,
    pub average_score: f64,
    pub valid_rate: f64,
    pub top_issues: Vec<IssueFrequency>,
    /// Results that already reported failure; kept out of the aggregates
    #[serde(default)]
    pub skipped_validations: u64,
}

#[derive(Debug, Clone)]
pub struct ValidationHistory {
    cap: usize,
    entries: VecDeque<HistoryEntry>,
    skipped: u64,
}

impl Default for ValidationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl ValidationHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            entries: VecDeque::with_capacity(cap.min(DEFAULT_HISTORY_CAP)),
            skipped: 0,
        }
    }

    /// Append a scored verdict; skipped verdicts are only counted.
    pub fn record(&mut self, tool: &str, result: &ValidationResult) {
        if result.skipped {
            self.skipped = self.skipped.saturating_add(1);
            return;
        }
        if self.cap == 0 {
            return;
        }
        while self.entries.len() >= self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            tool: tool.to_string(),
            score: result.score,
            valid: result.valid,
            issue_types: result
                .issues
                .iter()
                .map(|issue| issue.issue_type.clone())
                .collect(),
            at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn stats(&self) -> ValidatorStats {
        let total = self.entries.len();
        if total == 0 {
            return ValidatorStats {
                skipped_validations: self.skipped,
                ..ValidatorStats::default()
            };
        }
        let score_sum: u64 = self.entries.iter().map(|entry| entry.score as u64).sum();
        let valid = self.entries.iter().filter(|entry| entry.valid).count();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entry in &self.entries {
            for issue_type in &entry.issue_types {
                *counts.entry(issue_type.as_str()).or_default() += 1;
            }
        }
        let mut top_issues: Vec<IssueFrequency> = counts
            .into_iter()
            .map(|(issue_type, count)| IssueFrequency {
                issue_type: issue_type.to_string(),
                count,
            })
            .collect();
        top_issues.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.issue_type.cmp(&b.issue_type))
        });
        top_issues.truncate(TOP_ISSUES);

        ValidatorStats {
            total_validations: total,
            average_score: score_sum as f64 / total as f64,
            valid_rate: valid as f64 / total as f64,
            top_issues,
            skipped_validations: self.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Issue, Severity};

    fn with_issues(types: &[&str]) -> ValidationResult {
        ValidationResult::from_issues(
            types
                .iter()
                .map(|t| Issue::new(*t, *t, Severity::Warning, 10))
                .collect(),
        )
    }

    #[test]
    fn window_is_bounded() {
        let mut history = ValidationHistory::new(3);
        for _ in 0..5 {
            history.record("click", &ValidationResult::clean());
        }
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn skipped_verdicts_stay_out_of_aggregates() {
        let mut history = ValidationHistory::default();
        history.record("get_content", &with_issues(&["a", "b", "c", "d"]));
        let before = history.stats();

        history.record("get_content", &ValidationResult::skipped());
        history.record("click", &ValidationResult::skipped());

        let after = history.stats();
        assert_eq!(history.len(), 1);
        assert_eq!(after.skipped_validations, 2);
        assert_eq!(after.average_score, before.average_score);
        assert_eq!(after.valid_rate, before.valid_rate);
        assert_eq!(after.total_validations, 1);
    }

    #[test]
    fn stats_rank_issue_types() {
        let mut history = ValidationHistory::default();
        history.record("get_content", &with_issues(&["a", "b"]));
        history.record("get_content", &with_issues(&["b"]));
        history.record("navigate", &with_issues(&["c", "d", "e", "f", "g"]));
        history.record("click", &ValidationResult::clean());

        let stats = history.stats();
        assert_eq!(stats.total_validations, 4);
        // 80 + 90 + 50 + 100
        assert!((stats.average_score - 80.0).abs() < 1e-9);
        assert_eq!(stats.top_issues.len(), 5);
        assert_eq!(stats.top_issues[0].issue_type, "b");
        assert_eq!(stats.top_issues[0].count, 2);
        assert_eq!(stats.valid_rate, 1.0);
    }
}
