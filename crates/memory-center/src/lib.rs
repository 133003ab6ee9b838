//! Failure memory: signatures, categorization, error history and learned fixes

pub mod category;
pub mod collector;
pub mod errors;
pub mod learner;
pub mod model;
pub mod redact;
pub mod signature;
pub mod snapshot;

pub use category::{categorize, ErrorCategory};
pub use collector::{record_similarity, CollectorConfig, CollectorStats, ErrorCollector};
pub use errors::{MemoryError, MemoryResult};
pub use learner::{pattern_similarity, LearnerConfig, LearnerStats, PatternLearner, SimilarOptions};
pub use model::*;
pub use signature::{normalize_message, normalize_selector};
pub use snapshot::{ERROR_HISTORY_FILE, PATTERN_STORE_FILE};

use std::sync::Arc;

pub type SharedErrorCollector = Arc<ErrorCollector>;
pub type SharedPatternLearner = Arc<PatternLearner>;
