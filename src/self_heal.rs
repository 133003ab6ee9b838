//! Per-operation diagnosis and heal-and-retry lifecycle.
//!
//! An operation is attempted once. On failure the error is captured and
//! categorized; for locator problems a learned fix or a fresh heal candidate
//! is tried in exactly one retry. Successes are scored by the result
//! validator and every outcome feeds the pattern store.

use crate::config::{HealSettings, ResilienceConfig};
use crate::errors::{OperationError, ResilienceError, ResilienceResult};
use crate::metrics::{ExecutionKind, ExecutionTracker, ResilienceStats};
use action_gate::{Issue, ResultValidator, ValidationContext, ValidationResult};
use action_locator::{
    Candidate, DomQueryable, ElementFinder, ElementHandle, FindOptions, FindOutcome, HealOptions,
    LocatorStrategy, SelectorHealer,
};
use memory_center::{
    ErrorCategory, ErrorCollector, ErrorContext, FailureRecord, Fix, FixKind, PatternLearner,
    SharedErrorCollector, SharedPatternLearner, SuggestedFix,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One guarded browser operation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub tool: String,

    /// Parameters as passed to the tool; redacted before storage
    #[serde(default)]
    pub params: Value,

    /// Selector the operation targets, if any
    #[serde(default)]
    pub selector: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub page_title: Option<String>,

    /// Text the target element showed when it last worked
    #[serde(default)]
    pub last_known_text: Option<String>,

    #[serde(default)]
    pub last_known_attributes: BTreeMap<String, String>,

    /// Page state before the operation, for result validation
    #[serde(default)]
    pub validation: ValidationContext,
}

impl OperationRequest {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            params: Value::Object(Default::default()),
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_page_title(mut self, title: impl Into<String>) -> Self {
        self.page_title = Some(title.into());
        self
    }

    pub fn with_last_known_text(mut self, text: impl Into<String>) -> Self {
        self.last_known_text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.last_known_attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_validation(mut self, context: ValidationContext) -> Self {
        self.validation = context;
        self
    }

    fn error_context(&self) -> ErrorContext {
        ErrorContext {
            params: self.params.clone(),
            url: self.url.clone(),
            selector: self.selector.clone(),
            page_title: self.page_title.clone(),
        }
    }
}

/// Where a replacement selector came from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HealSource {
    LearnedPattern { pattern_id: String, confidence: f64 },
    Healer { strategy: LocatorStrategy, confidence: f64 },
}

/// Marker on a success that needed a substituted selector, so the calling
/// script can be corrected
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub original_selector: String,
    pub healed_selector: String,
    pub source: HealSource,
    /// Pattern that was reused or learned from this heal
    pub pattern_id: Option<String>,
}

/// Everything known about an unrecovered failure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub record_id: String,
    pub category: ErrorCategory,
    pub likely_causes: Vec<String>,
    pub suggested_fix: Option<SuggestedFix>,
    /// A similar failure is already in the history
    pub seen_before: bool,
    pub similar_count: usize,
    pub heal_attempted: bool,
    /// Heal candidates considered, best first
    pub candidates: Vec<Candidate>,
    pub retried_selector: Option<String>,
    pub retry_error: Option<String>,
    pub cancelled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationOutcome {
    Success {
        result: Value,
        validation: ValidationResult,
        healed: bool,
        provenance: Option<Provenance>,
    },
    Failure {
        /// The original error, unchanged
        error: OperationError,
        diagnostic: Diagnostic,
    },
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Success { .. })
    }

    pub fn healed(&self) -> bool {
        matches!(self, OperationOutcome::Success { healed: true, .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            OperationOutcome::Success { result, .. } => Some(result),
            OperationOutcome::Failure { .. } => None,
        }
    }

    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            OperationOutcome::Success { validation, .. } => Some(validation),
            OperationOutcome::Failure { .. } => None,
        }
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        match self {
            OperationOutcome::Success { provenance, .. } => provenance.as_ref(),
            OperationOutcome::Failure { .. } => None,
        }
    }

    /// Non-fatal issues of a success that scored below 100
    pub fn issue_report(&self) -> Option<&[Issue]> {
        self.validation()
            .filter(|validation| !validation.is_perfect())
            .map(|validation| validation.issues.as_slice())
    }

    pub fn error(&self) -> Option<&OperationError> {
        match self {
            OperationOutcome::Failure { error, .. } => Some(error),
            OperationOutcome::Success { .. } => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            OperationOutcome::Failure { diagnostic, .. } => Some(diagnostic),
            OperationOutcome::Success { .. } => None,
        }
    }
}

struct Alternative {
    selector: String,
    source: HealSource,
    pattern_id: Option<String>,
}

struct LearnedCandidate {
    alternative: Alternative,
    confidence: f64,
    /// The fix was learned for this very selector
    exact: bool,
}

/// Whether an element agrees with what the request last saw there; `None`
/// when nothing is known about the target
fn corroborates(handle: &ElementHandle, request: &OperationRequest) -> Option<bool> {
    let text = request
        .last_known_text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty());
    if text.is_none() && request.last_known_attributes.is_empty() {
        return None;
    }
    let text_matches =
        text.is_some_and(|text| handle.searchable_text().contains(&text.to_lowercase()));
    let attribute_matches = request
        .last_known_attributes
        .iter()
        .any(|(name, value)| handle.attr(name) == Some(value.as_str()));
    Some(text_matches || attribute_matches)
}

struct HealPhase {
    candidates: Vec<Candidate>,
    attempt: Option<(Alternative, Result<Value, OperationError>)>,
}

/// Owns the failure history, the pattern store and the validator for one
/// session or process.
pub struct Orchestrator {
    settings: HealSettings,
    collector: SharedErrorCollector,
    learner: SharedPatternLearner,
    validator: Arc<ResultValidator>,
    healer: SelectorHealer,
    finder: ElementFinder,
    tracker: ExecutionTracker,
}

impl Orchestrator {
    /// Build the stores from configuration.
    ///
    /// A snapshot document that cannot be read is logged and left on disk
    /// untouched; that store then runs in memory only.
    pub fn new(config: &ResilienceConfig) -> ResilienceResult<Self> {
        let validator = ResultValidator::new(config.validator.clone())?;

        let collector = match config.error_history_path() {
            Some(path) => ErrorCollector::with_persistence(config.collector.clone(), &path)
                .unwrap_or_else(|err| {
                    warn!("Error history at {} unusable: {}", path.display(), err);
                    ErrorCollector::new(config.collector.clone())
                }),
            None => ErrorCollector::new(config.collector.clone()),
        };
        let learner = match config.pattern_store_path() {
            Some(path) => PatternLearner::with_persistence(config.learner.clone(), &path)
                .unwrap_or_else(|err| {
                    warn!("Pattern store at {} unusable: {}", path.display(), err);
                    PatternLearner::new(config.learner.clone())
                }),
            None => PatternLearner::new(config.learner.clone()),
        };

        Ok(Self::from_parts(
            config.heal.clone(),
            Arc::new(collector),
            Arc::new(learner),
            Arc::new(validator),
        ))
    }

    pub fn from_parts(
        settings: HealSettings,
        collector: SharedErrorCollector,
        learner: SharedPatternLearner,
        validator: Arc<ResultValidator>,
    ) -> Self {
        Self {
            settings,
            collector,
            learner,
            validator,
            healer: SelectorHealer::new(),
            finder: ElementFinder::new(),
            tracker: ExecutionTracker::new(),
        }
    }

    pub fn settings(&self) -> &HealSettings {
        &self.settings
    }

    pub fn collector(&self) -> &SharedErrorCollector {
        &self.collector
    }

    pub fn learner(&self) -> &SharedPatternLearner {
        &self.learner
    }

    pub fn validator(&self) -> &Arc<ResultValidator> {
        &self.validator
    }

    /// Run `op` under the heal-and-retry lifecycle.
    ///
    /// `op` receives the selector to use: the request's own selector on the
    /// first attempt, the substituted one on the retry. It is called at most
    /// twice. Only the heal-and-retry phase is raced against `cancel`.
    pub async fn execute<F, Fut>(
        &self,
        request: &OperationRequest,
        dom: Option<&dyn DomQueryable>,
        cancel: &CancellationToken,
        mut op: F,
    ) -> OperationOutcome
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Value, OperationError>>,
    {
        let started = Instant::now();
        match op(request.selector.clone()).await {
            Ok(result) => self.complete_success(request, result, started, None),
            Err(error) => {
                self.handle_failure(request, error, dom, cancel, &mut op, started)
                    .await
            }
        }
    }

    async fn handle_failure<F, Fut>(
        &self,
        request: &OperationRequest,
        error: OperationError,
        dom: Option<&dyn DomQueryable>,
        cancel: &CancellationToken,
        op: &mut F,
        started: Instant,
    ) -> OperationOutcome
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Value, OperationError>>,
    {
        let record = self.collector.capture(
            &request.tool,
            &error.message,
            error.stack.as_deref(),
            &request.error_context(),
        );
        let suggested_fix = self.learner.get_suggested_fix(&record);
        let similar = self
            .collector
            .find_similar_errors(&record, self.collector.config().similarity_threshold);

        let mut diagnostic = Diagnostic {
            record_id: record.id.clone(),
            category: record.category,
            likely_causes: record
                .category
                .likely_causes()
                .iter()
                .map(|cause| cause.to_string())
                .collect(),
            suggested_fix: suggested_fix.clone(),
            seen_before: !similar.is_empty(),
            similar_count: similar.len(),
            heal_attempted: false,
            candidates: Vec::new(),
            retried_selector: None,
            retry_error: None,
            cancelled: false,
        };

        let (Some(dom), Some(broken)) = (dom, request.selector.as_deref()) else {
            return self.fail(request, error, diagnostic);
        };
        if !self.settings.enabled || !record.category.is_locator_problem() {
            return self.fail(request, error, diagnostic);
        }
        if cancel.is_cancelled() {
            diagnostic.cancelled = true;
            return self.fail(request, error, diagnostic);
        }

        diagnostic.heal_attempted = true;
        info!(
            tool = %request.tool,
            category = %record.category,
            "Attempting heal of {}",
            broken
        );
        let phase = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            phase = self.heal_and_retry(request, broken, dom, suggested_fix.as_ref(), op) => Some(phase),
        };
        let Some(phase) = phase else {
            warn!(tool = %request.tool, "Heal of {} cancelled", broken);
            diagnostic.cancelled = true;
            return self.fail(request, error, diagnostic);
        };

        diagnostic.candidates = phase.candidates;
        let Some((alternative, retry)) = phase.attempt else {
            info!(tool = %request.tool, "No usable alternative for {}", broken);
            return self.fail(request, error, diagnostic);
        };

        match retry {
            Ok(result) => {
                let pattern_id = self.confirm_fix(
                    &record,
                    broken,
                    &alternative.selector,
                    alternative.pattern_id.as_deref(),
                );
                info!(
                    tool = %request.tool,
                    "Healed {} -> {}",
                    broken,
                    alternative.selector
                );
                let provenance = Provenance {
                    original_selector: broken.to_string(),
                    healed_selector: alternative.selector,
                    source: alternative.source,
                    pattern_id: Some(pattern_id),
                };
                self.complete_success(request, result, started, Some(provenance))
            }
            Err(retry_error) => {
                if let Some(pattern_id) = alternative.pattern_id.as_deref() {
                    self.learner.record_usage(pattern_id, false);
                }
                info!(
                    tool = %request.tool,
                    "Retry with {} failed: {}",
                    alternative.selector,
                    retry_error
                );
                diagnostic.retried_selector = Some(alternative.selector);
                diagnostic.retry_error = Some(retry_error.message);
                self.fail(request, error, diagnostic)
            }
        }
    }

    /// Pick one alternative and retry once.
    ///
    /// A learned fix recorded for this exact selector is reused directly.
    /// A fix learned for a different selector only competes with the
    /// healer's candidates, and only when the element it points at agrees
    /// with the last known text or attributes.
    async fn heal_and_retry<F, Fut>(
        &self,
        request: &OperationRequest,
        broken: &str,
        dom: &dyn DomQueryable,
        suggested: Option<&SuggestedFix>,
        op: &mut F,
    ) -> HealPhase
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Value, OperationError>>,
    {
        let learned = match suggested {
            Some(fix) => self.learned_alternative(request, dom, broken, fix).await,
            None => None,
        };

        let mut candidates = Vec::new();
        let alternative = match learned {
            Some(learned) if learned.exact => Some(learned.alternative),
            learned => {
                let options = HealOptions {
                    last_known_text: request.last_known_text.clone(),
                    last_known_attributes: request.last_known_attributes.clone(),
                    max_alternatives: self.settings.max_alternatives,
                };
                match self.healer.heal(dom, broken, &options).await {
                    Ok(found) => candidates = found,
                    Err(err) => warn!("Selector healer failed for {}: {}", broken, err),
                }
                let healed = candidates
                    .iter()
                    .find(|candidate| {
                        candidate.confidence >= self.settings.min_candidate_confidence
                    })
                    .map(|candidate| LearnedCandidate {
                        alternative: Alternative {
                            selector: candidate.selector.clone(),
                            source: HealSource::Healer {
                                strategy: candidate.strategy,
                                confidence: candidate.confidence,
                            },
                            pattern_id: None,
                        },
                        confidence: candidate.confidence,
                        exact: false,
                    });
                let learned = learned
                    .filter(|learned| learned.confidence >= self.settings.min_candidate_confidence);
                match (learned, healed) {
                    (Some(learned), Some(healed)) if healed.confidence > learned.confidence => {
                        Some(healed.alternative)
                    }
                    (Some(learned), _) => Some(learned.alternative),
                    (None, healed) => healed.map(|healed| healed.alternative),
                }
            }
        };

        let Some(alternative) = alternative else {
            return HealPhase {
                candidates,
                attempt: None,
            };
        };
        debug!("Retrying {} with {}", request.tool, alternative.selector);
        let retry = op(Some(alternative.selector.clone())).await;
        HealPhase {
            candidates,
            attempt: Some((alternative, retry)),
        }
    }

    async fn learned_alternative(
        &self,
        request: &OperationRequest,
        dom: &dyn DomQueryable,
        broken: &str,
        suggested: &SuggestedFix,
    ) -> Option<LearnedCandidate> {
        if suggested.fix.kind != FixKind::SelectorSubstitution {
            return None;
        }
        let after = suggested
            .fix
            .after
            .as_deref()
            .filter(|after| !after.trim().is_empty() && *after != broken)?;
        let exact = suggested.fix.before.as_deref().map(str::trim) == Some(broken.trim());

        let mut confidence = suggested.confidence;
        if self.settings.verify_learned_fix || !exact {
            let handle = match dom.query_one(after).await {
                Ok(Some(handle)) => handle,
                Ok(None) => {
                    debug!("Learned selector {} no longer resolves", after);
                    return None;
                }
                Err(err) => {
                    warn!("Could not verify learned selector {}: {}", after, err);
                    return None;
                }
            };
            if !exact {
                match corroborates(&handle, request) {
                    Some(true) => {}
                    Some(false) => {
                        debug!(
                            "Learned selector {} was fixed for {:?}, element does not match",
                            after, suggested.fix.before
                        );
                        return None;
                    }
                    None => confidence *= 0.5,
                }
            }
        }

        let pattern_id = suggested.based_on.pattern_id.clone();
        Some(LearnedCandidate {
            alternative: Alternative {
                selector: after.to_string(),
                source: HealSource::LearnedPattern {
                    pattern_id: pattern_id.clone(),
                    confidence,
                },
                pattern_id: Some(pattern_id),
            },
            confidence,
            exact,
        })
    }

    /// Reinforce the reused pattern, or learn the substitution as a new one.
    /// A pattern borrowed from another selector is reinforced and the
    /// substitution for this selector is learned as well. Returns the id of
    /// the pattern keyed on `broken`.
    fn confirm_fix(
        &self,
        record: &FailureRecord,
        broken: &str,
        healed: &str,
        reused: Option<&str>,
    ) -> String {
        let reused = reused.and_then(|id| self.learner.record_usage(id, true));
        let pattern_id = match reused {
            Some(pattern) if pattern.fix.before.as_deref() == Some(broken) => pattern.id,
            _ => {
                self.learner
                    .learn(record, Fix::selector_substitution(broken, healed))
                    .id
            }
        };
        self.collector.mark_resolved(&record.id, Some(&pattern_id));
        pattern_id
    }

    fn complete_success(
        &self,
        request: &OperationRequest,
        mut result: Value,
        started: Instant,
        provenance: Option<Provenance>,
    ) -> OperationOutcome {
        let healed = provenance.is_some();
        if healed {
            if let Value::Object(map) = &mut result {
                map.insert("healed".to_string(), Value::Bool(true));
            }
        }

        let mut context = request.validation.clone();
        if context.duration_ms.is_none() {
            let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            context.duration_ms = Some(elapsed);
        }
        let validation = self
            .validator
            .validate(&request.tool, &result, &request.params, &context);
        if !validation.is_perfect() {
            info!(
                tool = %request.tool,
                score = validation.score,
                "Operation succeeded with issues: {:?}",
                validation
                    .issues
                    .iter()
                    .map(|issue| issue.issue_type.as_str())
                    .collect::<Vec<_>>()
            );
        }

        self.tracker
            .record(&request.tool, ExecutionKind::Succeeded { healed });
        OperationOutcome::Success {
            result,
            validation,
            healed,
            provenance,
        }
    }

    fn fail(
        &self,
        request: &OperationRequest,
        error: OperationError,
        diagnostic: Diagnostic,
    ) -> OperationOutcome {
        warn!(
            tool = %request.tool,
            category = %diagnostic.category,
            seen_before = diagnostic.seen_before,
            "Operation failed: {}",
            error
        );
        self.tracker.record(
            &request.tool,
            ExecutionKind::Failed {
                cancelled: diagnostic.cancelled,
            },
        );
        OperationOutcome::Failure { error, diagnostic }
    }

    /// Semantic element search, abandoned when `cancel` fires
    pub async fn find(
        &self,
        dom: &dyn DomQueryable,
        query: &str,
        options: &FindOptions,
        cancel: &CancellationToken,
    ) -> ResilienceResult<FindOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ResilienceError::Cancelled),
            outcome = self.finder.find(dom, query, options) => Ok(outcome?),
        }
    }

    /// Alternatives for a broken selector without retrying anything
    pub async fn heal(
        &self,
        dom: &dyn DomQueryable,
        broken_selector: &str,
        options: &HealOptions,
    ) -> ResilienceResult<Vec<Candidate>> {
        Ok(self.healer.heal(dom, broken_selector, options).await?)
    }

    pub fn validate(
        &self,
        tool: &str,
        result: &Value,
        params: &Value,
        context: &ValidationContext,
    ) -> ValidationResult {
        self.validator.validate(tool, result, params, context)
    }

    pub fn stats(&self) -> ResilienceStats {
        ResilienceStats {
            execution: self.tracker.snapshot(),
            errors: self.collector.stats(),
            patterns: self.learner.stats(),
            validation: self.validator.stats(),
        }
    }

    /// Write both snapshot documents now
    pub fn persist(&self) -> ResilienceResult<()> {
        self.collector.persist_now()?;
        self.learner.persist_now()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_locator::{ElementHandle, SnapshotDom, Viewport};
    use serde_json::json;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(&ResilienceConfig::default()).expect("orchestrator")
    }

    fn page() -> SnapshotDom {
        SnapshotDom::new(Viewport::default()).with(
            ElementHandle::new("", "button")
                .with_attr("id", "checkout-submit")
                .with_text("Submit")
                .with_visible(true),
            None,
        )
    }

    #[tokio::test]
    async fn plain_success_is_validated() {
        let orchestrator = orchestrator();
        let request = OperationRequest::new("get_content");
        let outcome = orchestrator
            .execute(&request, None, &CancellationToken::new(), |_| async {
                Ok(json!({"success": true, "content": ""}))
            })
            .await;
        assert!(outcome.is_success());
        assert!(!outcome.healed());
        let issues = outcome.issue_report().expect("issues");
        assert!(issues.iter().any(|issue| issue.issue_type == "content_empty"));
        assert_eq!(orchestrator.stats().execution.succeeded, 1);
    }

    #[tokio::test]
    async fn non_locator_failures_are_not_healed() {
        let orchestrator = orchestrator();
        let dom = page();
        let request = OperationRequest::new("navigate").with_selector("#checkout-submit");
        let outcome = orchestrator
            .execute(&request, Some(&dom), &CancellationToken::new(), |_| async {
                Err(OperationError::new("Navigation timeout of 30000 ms exceeded"))
            })
            .await;
        let diagnostic = outcome.diagnostic().expect("diagnostic");
        assert_eq!(diagnostic.category, ErrorCategory::Timeout);
        assert!(!diagnostic.heal_attempted);
        assert!(!diagnostic.likely_causes.is_empty());
        assert_eq!(
            outcome.error().map(|err| err.message.as_str()),
            Some("Navigation timeout of 30000 ms exceeded")
        );
    }

    #[tokio::test]
    async fn disabled_healing_only_diagnoses() {
        let mut config = ResilienceConfig::default();
        config.heal.enabled = false;
        let orchestrator = Orchestrator::new(&config).expect("orchestrator");
        let dom = page();
        let request = OperationRequest::new("click")
            .with_selector("#submit-old")
            .with_last_known_text("Submit");
        let outcome = orchestrator
            .execute(&request, Some(&dom), &CancellationToken::new(), |_| async {
                Err(OperationError::new("Element not found: #submit-old"))
            })
            .await;
        let diagnostic = outcome.diagnostic().expect("diagnostic");
        assert_eq!(diagnostic.category, ErrorCategory::SelectorNotFound);
        assert!(!diagnostic.heal_attempted);
        assert!(orchestrator.learner().is_empty());
    }

    #[tokio::test]
    async fn find_honours_cancellation() {
        let orchestrator = orchestrator();
        let dom = page();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = orchestrator
            .find(&dom, "submit button", &FindOptions::default(), &cancel)
            .await;
        assert!(matches!(result, Err(ResilienceError::Cancelled)));

        let found = orchestrator
            .find(&dom, "submit button", &FindOptions::default(), &CancellationToken::new())
            .await
            .expect("find");
        assert_eq!(found.best().map(|c| c.selector.as_str()), Some("#checkout-submit"));
    }
}
