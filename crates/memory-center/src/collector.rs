//! Failure capture, indexing and similarity search

use crate::{
    category::{categorize, ErrorCategory},
    errors::MemoryError,
    model::{ErrorContext, FailureRecord, SimilarError},
    redact::{redact_params, redact_url},
    signature::{code_location, normalize_selector, word_overlap},
    snapshot::{self, ErrorHistoryDocument},
};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// In-memory capacity; oldest records are evicted first
    pub max_errors: usize,
    /// Records written to the history document
    pub persist_limit: usize,
    /// Default threshold for similar-failure lookups
    pub similarity_threshold: f64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_errors: 1000,
            persist_limit: 500,
            similarity_threshold: 0.85,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectorStats {
    pub total_errors: usize,
    pub resolved_errors: usize,
    pub resolution_rate: f64,
    pub by_tool: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub captured_total: u64,
    pub evicted_total: u64,
}

#[derive(Default)]
struct CollectorIndex {
    order: VecDeque<String>,
    records: HashMap<String, FailureRecord>,
    by_tool: HashMap<String, Vec<String>>,
    by_category: HashMap<ErrorCategory, Vec<String>>,
}

impl CollectorIndex {
    fn insert(&mut self, record: FailureRecord) {
        self.order.push_back(record.id.clone());
        self.by_tool
            .entry(record.tool.clone())
            .or_default()
            .push(record.id.clone());
        self.by_category
            .entry(record.category)
            .or_default()
            .push(record.id.clone());
        self.records.insert(record.id.clone(), record);
    }

    fn evict_oldest(&mut self) -> Option<FailureRecord> {
        let id = self.order.pop_front()?;
        let record = self.records.remove(&id)?;
        if let Some(ids) = self.by_tool.get_mut(&record.tool) {
            ids.retain(|candidate| candidate != &id);
            if ids.is_empty() {
                self.by_tool.remove(&record.tool);
            }
        }
        if let Some(ids) = self.by_category.get_mut(&record.category) {
            ids.retain(|candidate| candidate != &id);
            if ids.is_empty() {
                self.by_category.remove(&record.category);
            }
        }
        Some(record)
    }

    fn resolve<'a>(&'a self, ids: &'a [String]) -> impl Iterator<Item = &'a FailureRecord> + 'a {
        ids.iter().filter_map(move |id| self.records.get(id))
    }

    fn ordered(&self) -> impl DoubleEndedIterator<Item = &FailureRecord> + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }
}

/// Weighted similarity between two failure records.
///
/// Weights: tool 3, category 3, selector signature 2, message word overlap 2,
/// averaged over 10. When neither record carries a selector the selector term
/// is dropped and the average is taken over 8, so two selector-less failures
/// are not capped at 0.8. One-sided selectors count as a mismatch over 10.
pub fn record_similarity(a: &FailureRecord, b: &FailureRecord) -> f64 {
    let mut score = 0.0;
    let mut weight = 0.0;

    weight += 3.0;
    if a.tool == b.tool {
        score += 3.0;
    }
    weight += 3.0;
    if a.category == b.category {
        score += 3.0;
    }
    match (&a.selector_signature, &b.selector_signature) {
        (None, None) => {}
        (left, right) => {
            weight += 2.0;
            if left == right {
                score += 2.0;
            }
        }
    }
    weight += 2.0;
    score += 2.0 * word_overlap(&a.message_signature, &b.message_signature);

    score / weight
}

#[derive(Default)]
struct CollectorMetrics {
    captured: AtomicU64,
    evicted: AtomicU64,
}

/// Captures failures into a bounded, indexed history.
#[derive(Default)]
pub struct ErrorCollector {
    config: CollectorConfig,
    index: RwLock<CollectorIndex>,
    storage_path: Option<PathBuf>,
    /// Held from snapshot to rename so an older document never lands last
    persist_lock: Mutex<()>,
    metrics: CollectorMetrics,
}

impl ErrorCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            index: RwLock::new(CollectorIndex::default()),
            storage_path: None,
            persist_lock: Mutex::new(()),
            metrics: CollectorMetrics::default(),
        }
    }

    /// Rehydrate from the history document at `path` (if any) and persist
    /// back to it after every mutation.
    pub fn with_persistence(
        config: CollectorConfig,
        path: impl Into<PathBuf>,
    ) -> Result<Self, MemoryError> {
        let path = path.into();
        let mut collector = Self::new(config);
        if let Some(document) = snapshot::load::<ErrorHistoryDocument>(&path)? {
            let mut index = collector.index.write();
            let skip = document.errors.len().saturating_sub(collector.config.max_errors);
            for record in document.errors.into_iter().skip(skip) {
                index.insert(record);
            }
            debug!("Loaded {} failure records from {}", index.order.len(), path.display());
        }
        collector.storage_path = Some(path);
        Ok(collector)
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Record a failed operation.
    ///
    /// Context parameters and url are redacted before storage. Never fails;
    /// persistence problems are logged.
    pub fn capture(
        &self,
        tool: &str,
        message: &str,
        stack: Option<&str>,
        context: &ErrorContext,
    ) -> FailureRecord {
        let category = categorize(message);
        let mut record = FailureRecord::new(tool, category, message);
        record.selector_signature = context
            .selector
            .as_deref()
            .filter(|selector| !selector.trim().is_empty())
            .map(normalize_selector);
        record.code_location = stack.and_then(code_location);
        record.context = ErrorContext {
            params: redact_params(&context.params),
            url: context.url.as_deref().map(redact_url),
            selector: context.selector.clone(),
            page_title: context.page_title.clone(),
        };

        {
            let mut index = self.index.write();
            index.insert(record.clone());
            while index.records.len() > self.config.max_errors {
                if index.evict_oldest().is_none() {
                    break;
                }
                self.metrics.evicted.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.metrics.captured.fetch_add(1, Ordering::Relaxed);
        info!(tool = %tool, category = %category, "Captured failure {}", record.id);

        self.persist_best_effort("capture");
        record
    }

    pub fn get(&self, id: &str) -> Option<FailureRecord> {
        self.index.read().records.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.index.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<FailureRecord> {
        self.index
            .read()
            .ordered()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn by_tool(&self, tool: &str) -> Vec<FailureRecord> {
        let index = self.index.read();
        index
            .by_tool
            .get(tool)
            .map(|ids| index.resolve(ids).cloned().collect())
            .unwrap_or_default()
    }

    pub fn by_category(&self, category: ErrorCategory) -> Vec<FailureRecord> {
        let index = self.index.read();
        index
            .by_category
            .get(&category)
            .map(|ids| index.resolve(ids).cloned().collect())
            .unwrap_or_default()
    }

    /// Stored records at or above `threshold` similarity, most similar first.
    /// The record itself is excluded.
    pub fn find_similar_errors(&self, record: &FailureRecord, threshold: f64) -> Vec<SimilarError> {
        let index = self.index.read();
        let mut similar: Vec<SimilarError> = index
            .ordered()
            .filter(|other| other.id != record.id)
            .filter_map(|other| {
                let similarity = record_similarity(record, other);
                (similarity >= threshold).then(|| SimilarError {
                    record: other.clone(),
                    similarity,
                })
            })
            .collect();
        similar.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        similar
    }

    /// Mark a record as fixed by `fix_ref` (usually a pattern id).
    pub fn mark_resolved(&self, id: &str, fix_ref: Option<&str>) -> Option<FailureRecord> {
        let updated = {
            let mut index = self.index.write();
            index.records.get_mut(id).map(|record| {
                record.resolved = true;
                record.fix_ref = fix_ref.map(str::to_string);
                record.clone()
            })
        };
        if updated.is_some() {
            self.persist_best_effort("resolve");
        }
        updated
    }

    pub fn stats(&self) -> CollectorStats {
        let index = self.index.read();
        let total_errors = index.records.len();
        let resolved_errors = index.records.values().filter(|r| r.resolved).count();
        let resolution_rate = if total_errors == 0 {
            0.0
        } else {
            resolved_errors as f64 / total_errors as f64
        };
        CollectorStats {
            total_errors,
            resolved_errors,
            resolution_rate,
            by_tool: index
                .by_tool
                .iter()
                .map(|(tool, ids)| (tool.clone(), ids.len()))
                .collect(),
            by_category: index
                .by_category
                .iter()
                .map(|(category, ids)| (category.as_str().to_string(), ids.len()))
                .collect(),
            captured_total: self.metrics.captured.load(Ordering::Relaxed),
            evicted_total: self.metrics.evicted.load(Ordering::Relaxed),
        }
    }

    pub fn persist_now(&self) -> Result<(), MemoryError> {
        self.persist_to_disk()
    }

    fn persist_best_effort(&self, after: &str) {
        if let Err(err) = self.persist_to_disk() {
            warn!(error = %err, "error history persist failed after {}", after);
        }
    }

    fn persist_to_disk(&self) -> Result<(), MemoryError> {
        let Some(path) = self.storage_path.as_ref() else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock();
        let stats = self.stats();
        let errors: Vec<FailureRecord> = {
            let index = self.index.read();
            let skip = index.order.len().saturating_sub(self.config.persist_limit);
            index.ordered().skip(skip).cloned().collect()
        };
        let document = ErrorHistoryDocument {
            errors,
            stats,
            saved_at: Utc::now(),
        };
        snapshot::save(path, &document)
    }
}
