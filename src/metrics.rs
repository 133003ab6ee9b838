//! Rolling execution statistics for guarded operations

use action_gate::ValidatorStats;
use chrono::{DateTime, Utc};
use memory_center::{CollectorStats, LearnerStats};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExecutionStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub healed: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Successes that needed a heal-and-retry
    pub healed: u64,
    pub cancelled: u64,
    pub by_tool: BTreeMap<String, ToolExecutionStats>,
    pub since: DateTime<Utc>,
}

impl Default for ExecutionStats {
    fn default() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            healed: 0,
            cancelled: 0,
            by_tool: BTreeMap::new(),
            since: Utc::now(),
        }
    }
}

impl ExecutionStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }

    pub fn heal_rate(&self) -> f64 {
        if self.succeeded == 0 {
            0.0
        } else {
            self.healed as f64 / self.succeeded as f64
        }
    }
}

/// How a guarded operation ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionKind {
    Succeeded { healed: bool },
    Failed { cancelled: bool },
}

#[derive(Debug, Default)]
pub struct ExecutionTracker {
    inner: Mutex<ExecutionStats>,
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, tool: &str, kind: ExecutionKind) {
        let mut guard = self.inner.lock();
        let stats = &mut *guard;
        stats.total += 1;
        let per_tool = stats.by_tool.entry(tool.to_string()).or_default();
        per_tool.total += 1;
        match kind {
            ExecutionKind::Succeeded { healed } => {
                per_tool.succeeded += 1;
                if healed {
                    per_tool.healed += 1;
                }
                stats.succeeded += 1;
                if healed {
                    stats.healed += 1;
                }
            }
            ExecutionKind::Failed { cancelled } => {
                per_tool.failed += 1;
                stats.failed += 1;
                if cancelled {
                    stats.cancelled += 1;
                }
            }
        }
    }

    pub fn snapshot(&self) -> ExecutionStats {
        self.inner.lock().clone()
    }
}

/// Everything the subsystem counts, in one document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResilienceStats {
    pub execution: ExecutionStats,
    pub errors: CollectorStats,
    pub patterns: LearnerStats,
    pub validation: ValidatorStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_tool_breakdown() {
        let tracker = ExecutionTracker::new();
        tracker.record("click", ExecutionKind::Succeeded { healed: true });
        tracker.record("click", ExecutionKind::Failed { cancelled: false });
        tracker.record("navigate", ExecutionKind::Succeeded { healed: false });
        tracker.record("navigate", ExecutionKind::Failed { cancelled: true });

        let stats = tracker.snapshot();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.healed, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.success_rate(), 0.5);
        assert_eq!(stats.heal_rate(), 0.5);
        assert_eq!(
            stats.by_tool["click"],
            ToolExecutionStats {
                total: 2,
                succeeded: 1,
                failed: 1,
                healed: 1,
            }
        );
    }
}
