//! Result quality gate - rule-driven scoring of tool results
//!
//! A result that reports success can still be wrong: empty content, an error
//! page, a click that changed nothing. This crate scores such results:
//! - Declarative per-tool rule table (built-in rules plus YAML extensions)
//! - Universal checks for slow execution and healed selectors
//! - Rolling history with aggregate statistics

pub mod conditions;
pub mod errors;
pub mod history;
pub mod rules;
pub mod types;
pub mod validator;

pub use conditions::{lookup, render, Check};
pub use errors::*;
pub use history::{HistoryEntry, IssueFrequency, ValidationHistory, ValidatorStats};
pub use rules::{normalize_tool, Rule, RuleTable, ToolRule};
pub use types::*;
pub use validator::*;
