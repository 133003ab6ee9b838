//! Learned fix patterns and their reliability

use crate::{
    errors::MemoryError,
    model::{
        ErrorSnapshot, FailureRecord, FixInfo, MatchStrategy, Pattern, PatternMatch,
        PatternMetrics, PatternSignature, SuggestedFix,
    },
    signature::exact_or_overlap,
    snapshot::{self, PatternStoreDocument},
};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub max_patterns: usize,
    pub persist_limit: usize,
    pub initial_confidence: f64,
    /// Minimum signature similarity for a pattern to be returned
    pub min_similarity: f64,
    pub max_results: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            max_patterns: 500,
            persist_limit: 500,
            initial_confidence: 0.8,
            min_similarity: 0.6,
            max_results: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarOptions {
    pub max_results: usize,
    pub min_similarity: f64,
    pub strategy: MatchStrategy,
}

impl Default for SimilarOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_similarity: 0.6,
            strategy: MatchStrategy::Fuzzy,
        }
    }
}

impl SimilarOptions {
    pub fn exact() -> Self {
        Self {
            strategy: MatchStrategy::Exact,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerStats {
    pub total_patterns: usize,
    pub by_tool: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub total_matches: u64,
    pub total_successes: u64,
    pub success_rate: f64,
    pub average_confidence: f64,
    pub lookups: u64,
    pub hits: u64,
    pub match_rate: f64,
    pub learned_total: u64,
    pub evicted_total: u64,
}

#[derive(Default)]
struct PatternIndex {
    order: Vec<String>,
    patterns: HashMap<String, Pattern>,
    by_tool: HashMap<String, BTreeSet<String>>,
    by_category: HashMap<String, BTreeSet<String>>,
    by_locator: HashMap<String, BTreeSet<String>>,
}

impl PatternIndex {
    fn insert(&mut self, pattern: Pattern) {
        let id = pattern.id.clone();
        self.order.push(id.clone());
        self.by_tool
            .entry(pattern.signature.tool.clone())
            .or_default()
            .insert(id.clone());
        self.by_category
            .entry(pattern.signature.category.as_str().to_string())
            .or_default()
            .insert(id.clone());
        if let Some(locator) = pattern.signature.locator_pattern.clone() {
            self.by_locator.entry(locator).or_default().insert(id.clone());
        }
        self.patterns.insert(id, pattern);
    }

    fn remove(&mut self, id: &str) -> Option<Pattern> {
        let pattern = self.patterns.remove(id)?;
        self.order.retain(|candidate| candidate != id);
        detach(&mut self.by_tool, &pattern.signature.tool, id);
        detach(
            &mut self.by_category,
            pattern.signature.category.as_str(),
            id,
        );
        if let Some(locator) = pattern.signature.locator_pattern.as_deref() {
            detach(&mut self.by_locator, locator, id);
        }
        Some(pattern)
    }

    /// Lowest confidence x times matched, oldest first on ties
    fn eviction_victim(&self, keep: &str) -> Option<String> {
        self.order
            .iter()
            .filter(|id| id.as_str() != keep)
            .filter_map(|id| self.patterns.get(id))
            .fold(None::<&Pattern>, |lowest, pattern| match lowest {
                Some(current) if current.retention_score() <= pattern.retention_score() => {
                    Some(current)
                }
                _ => Some(pattern),
            })
            .map(|pattern| pattern.id.clone())
    }

    fn candidates(&self, record: &FailureRecord) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        if let Some(set) = self.by_tool.get(&record.tool) {
            ids.extend(set.iter().cloned());
        }
        if let Some(set) = self.by_category.get(record.category.as_str()) {
            ids.extend(set.iter().cloned());
        }
        if let Some(set) = record
            .selector_signature
            .as_deref()
            .and_then(|locator| self.by_locator.get(locator))
        {
            ids.extend(set.iter().cloned());
        }
        ids
    }

    fn ordered(&self) -> impl Iterator<Item = &Pattern> + '_ {
        self.order.iter().filter_map(|id| self.patterns.get(id))
    }
}

fn detach(index: &mut HashMap<String, BTreeSet<String>>, key: &str, id: &str) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

/// Signature similarity between a failure and a stored pattern.
///
/// Weights: tool 3, category 3, message pattern 2, locator pattern 2,
/// averaged over 10. Message and locator score 1.0 on exact equality, word
/// overlap otherwise. When neither side has a locator the locator term is
/// dropped and the average is taken over 8; a one-sided locator counts as a
/// mismatch over 10.
pub fn pattern_similarity(record: &FailureRecord, signature: &PatternSignature) -> f64 {
    let mut score = 0.0;
    let mut weight = 6.0;
    if record.tool == signature.tool {
        score += 3.0;
    }
    if record.category == signature.category {
        score += 3.0;
    }
    weight += 2.0;
    score += 2.0 * exact_or_overlap(&record.message_signature, &signature.message_pattern);
    match (
        record.selector_signature.as_deref(),
        signature.locator_pattern.as_deref(),
    ) {
        (None, None) => {}
        (Some(left), Some(right)) => {
            weight += 2.0;
            score += 2.0 * exact_or_overlap(left, right);
        }
        _ => weight += 2.0,
    }
    score / weight
}

fn exact_match(record: &FailureRecord, signature: &PatternSignature) -> bool {
    record.tool == signature.tool
        && record.message_signature == signature.message_pattern
        && record.selector_signature == signature.locator_pattern
}

#[derive(Default)]
struct LearnerMetrics {
    lookups: AtomicU64,
    hits: AtomicU64,
    learned: AtomicU64,
    evicted: AtomicU64,
}

impl LearnerMetrics {
    fn record_lookup(&self, hit: bool) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Stores confirmed fixes and retrieves them for new failures.
#[derive(Default)]
pub struct PatternLearner {
    config: LearnerConfig,
    index: RwLock<PatternIndex>,
    storage_path: Option<PathBuf>,
    /// Held from snapshot to rename so an older document never lands last
    persist_lock: Mutex<()>,
    metrics: LearnerMetrics,
}

impl PatternLearner {
    pub fn new(config: LearnerConfig) -> Self {
        Self {
            config,
            index: RwLock::new(PatternIndex::default()),
            storage_path: None,
            persist_lock: Mutex::new(()),
            metrics: LearnerMetrics::default(),
        }
    }

    pub fn with_persistence(
        config: LearnerConfig,
        path: impl Into<PathBuf>,
    ) -> Result<Self, MemoryError> {
        let path = path.into();
        let mut learner = Self::new(config);
        if let Some(document) = snapshot::load::<PatternStoreDocument>(&path)? {
            let mut index = learner.index.write();
            let skip = document
                .patterns
                .len()
                .saturating_sub(learner.config.max_patterns);
            for pattern in document.patterns.into_iter().skip(skip) {
                index.insert(pattern);
            }
            debug!("Loaded {} patterns from {}", index.order.len(), path.display());
        }
        learner.storage_path = Some(path);
        Ok(learner)
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Store a confirmed fix for the failure described by `record`.
    pub fn learn(&self, record: &FailureRecord, info: impl Into<FixInfo>) -> Pattern {
        let info = info.into();
        let confidence = info
            .initial_confidence
            .unwrap_or(self.config.initial_confidence);
        let pattern = Pattern {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            signature: PatternSignature {
                tool: record.tool.clone(),
                category: record.category,
                message_pattern: record.message_signature.clone(),
                locator_pattern: record.selector_signature.clone(),
                code_location: record.code_location.clone(),
            },
            original_error: ErrorSnapshot {
                record_id: record.id.clone(),
                message: record.message.clone(),
                selector: record.context.selector.clone(),
                url: record.context.url.clone(),
            },
            fix: info.fix,
            metrics: PatternMetrics {
                times_matched: 0,
                times_successful: 0,
                last_used: None,
                confidence: clamp_unit(confidence),
            },
        };

        {
            let mut index = self.index.write();
            index.insert(pattern.clone());
            while index.patterns.len() > self.config.max_patterns {
                // The new pattern goes too when it is the only one left
                let victim = index
                    .eviction_victim(&pattern.id)
                    .unwrap_or_else(|| pattern.id.clone());
                if let Some(evicted) = index.remove(&victim) {
                    debug!(
                        "Evicted pattern {} (score {:.3})",
                        evicted.id,
                        evicted.retention_score()
                    );
                    self.metrics.evicted.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        self.metrics.learned.fetch_add(1, Ordering::Relaxed);
        info!(
            tool = %pattern.signature.tool,
            category = %pattern.signature.category,
            "Learned pattern {}",
            pattern.id
        );
        self.persist_best_effort("learn");
        pattern
    }

    /// Patterns ranked by similarity x confidence x success rate.
    pub fn find_similar(&self, record: &FailureRecord, options: &SimilarOptions) -> Vec<PatternMatch> {
        let index = self.index.read();
        let mut matches: Vec<PatternMatch> = index
            .candidates(record)
            .iter()
            .filter_map(|id| index.patterns.get(id))
            .filter_map(|pattern| {
                let similarity = match options.strategy {
                    MatchStrategy::Exact => {
                        if exact_match(record, &pattern.signature) {
                            1.0
                        } else {
                            return None;
                        }
                    }
                    MatchStrategy::Fuzzy => pattern_similarity(record, &pattern.signature),
                };
                if similarity < options.min_similarity {
                    return None;
                }
                let score =
                    similarity * pattern.metrics.confidence * pattern.success_rate().unwrap_or(0.5);
                Some(PatternMatch {
                    pattern: pattern.clone(),
                    similarity,
                    score,
                })
            })
            .collect();
        drop(index);

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.pattern.created_at.cmp(&b.pattern.created_at))
        });
        matches.truncate(options.max_results);
        self.metrics.record_lookup(!matches.is_empty());
        matches
    }

    /// Best known fix for `record`, if any pattern is similar enough.
    pub fn get_suggested_fix(&self, record: &FailureRecord) -> Option<SuggestedFix> {
        let options = SimilarOptions {
            max_results: 1,
            min_similarity: self.config.min_similarity,
            strategy: MatchStrategy::Fuzzy,
        };
        self.find_similar(record, &options)
            .into_iter()
            .next()
            .map(SuggestedFix::from)
    }

    /// Fold one usage outcome into a pattern's confidence.
    ///
    /// `confidence = 0.5 * confidence + 0.5 * (successes / matches)`
    pub fn record_usage(&self, pattern_id: &str, successful: bool) -> Option<Pattern> {
        let updated = {
            let mut index = self.index.write();
            index.patterns.get_mut(pattern_id).map(|pattern| {
                let metrics = &mut pattern.metrics;
                metrics.times_matched = metrics.times_matched.saturating_add(1);
                if successful {
                    metrics.times_successful = metrics.times_successful.saturating_add(1);
                }
                metrics.last_used = Some(Utc::now());
                let rate = metrics.times_successful as f64 / metrics.times_matched as f64;
                metrics.confidence = clamp_unit(0.5 * metrics.confidence + 0.5 * rate);
                pattern.clone()
            })
        };
        match &updated {
            Some(pattern) => {
                debug!(
                    "Pattern {} usage recorded (successful={}, confidence={:.3})",
                    pattern_id, successful, pattern.metrics.confidence
                );
                self.persist_best_effort("usage");
            }
            None => warn!("record_usage for unknown pattern {}", pattern_id),
        }
        updated
    }

    pub fn get(&self, id: &str) -> Option<Pattern> {
        self.index.read().patterns.get(id).cloned()
    }

    /// Oldest first
    pub fn patterns(&self) -> Vec<Pattern> {
        self.index.read().ordered().cloned().collect()
    }

    pub fn forget(&self, id: &str) -> Option<Pattern> {
        let removed = self.index.write().remove(id);
        if removed.is_some() {
            self.persist_best_effort("forget");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.index.read().patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> LearnerStats {
        let index = self.index.read();
        let total_patterns = index.patterns.len();
        let mut total_matches = 0u64;
        let mut total_successes = 0u64;
        let mut confidence_sum = 0.0;
        for pattern in index.patterns.values() {
            total_matches += pattern.metrics.times_matched;
            total_successes += pattern.metrics.times_successful;
            confidence_sum += pattern.metrics.confidence;
        }
        let lookups = self.metrics.lookups.load(Ordering::Relaxed);
        let hits = self.metrics.hits.load(Ordering::Relaxed);
        LearnerStats {
            total_patterns,
            by_tool: index
                .by_tool
                .iter()
                .map(|(tool, ids)| (tool.clone(), ids.len()))
                .collect(),
            by_category: index
                .by_category
                .iter()
                .map(|(category, ids)| (category.clone(), ids.len()))
                .collect(),
            total_matches,
            total_successes,
            success_rate: ratio(total_successes, total_matches),
            average_confidence: if total_patterns == 0 {
                0.0
            } else {
                confidence_sum / total_patterns as f64
            },
            lookups,
            hits,
            match_rate: ratio(hits, lookups),
            learned_total: self.metrics.learned.load(Ordering::Relaxed),
            evicted_total: self.metrics.evicted.load(Ordering::Relaxed),
        }
    }

    pub fn persist_now(&self) -> Result<(), MemoryError> {
        self.persist_to_disk()
    }

    fn persist_best_effort(&self, after: &str) {
        if let Err(err) = self.persist_to_disk() {
            warn!(error = %err, "pattern store persist failed after {}", after);
        }
    }

    fn persist_to_disk(&self) -> Result<(), MemoryError> {
        let Some(path) = self.storage_path.as_ref() else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock();
        let stats = self.stats();
        let patterns: Vec<Pattern> = {
            let index = self.index.read();
            let skip = index.order.len().saturating_sub(self.config.persist_limit);
            index.ordered().skip(skip).cloned().collect()
        };
        snapshot::save(
            path,
            &PatternStoreDocument {
                patterns,
                stats,
                saved_at: Utc::now(),
            },
        )
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
