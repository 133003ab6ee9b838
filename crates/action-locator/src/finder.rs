//! Multi-strategy semantic element search

use crate::{
    errors::LocatorError,
    ports::DomQueryable,
    query::ParsedQuery,
    strategies::*,
    types::*,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Finds elements from a loose natural-language description.
pub struct ElementFinder {
    text_strategy: Arc<TextStrategy>,
    aria_strategy: Arc<AriaStrategy>,
    semantic_strategy: Arc<SemanticStrategy>,
    visual_strategy: Arc<VisualStrategy>,
}

impl Default for ElementFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementFinder {
    pub fn new() -> Self {
        Self {
            text_strategy: Arc::new(TextStrategy),
            aria_strategy: Arc::new(AriaStrategy),
            semantic_strategy: Arc::new(SemanticStrategy),
            visual_strategy: Arc::new(VisualStrategy),
        }
    }

    fn get_strategy(&self, strategy_type: LocatorStrategy) -> Option<Arc<dyn Strategy>> {
        match strategy_type {
            LocatorStrategy::Text => Some(self.text_strategy.clone()),
            LocatorStrategy::Aria => Some(self.aria_strategy.clone()),
            LocatorStrategy::Semantic => Some(self.semantic_strategy.clone()),
            LocatorStrategy::Visual => Some(self.visual_strategy.clone()),
            _ => None,
        }
    }

    /// Run the requested strategies and merge their candidates.
    ///
    /// A failing strategy is logged and skipped; the call only errors when
    /// the query is empty.
    pub async fn find(
        &self,
        dom: &dyn DomQueryable,
        query: &str,
        options: &FindOptions,
    ) -> Result<FindOutcome, LocatorError> {
        if query.trim().is_empty() {
            return Err(LocatorError::InvalidSelector("empty element query".into()));
        }
        let parsed = ParsedQuery::parse(query).with_context(options.context.as_deref());
        info!(
            "Finding element: {} (type={}, terms={:?})",
            query,
            parsed.element_type.name(),
            parsed.terms
        );

        let mut merged = CandidateSet::new();
        for strategy_type in options.strategy.strategies() {
            let Some(strategy) = self.get_strategy(strategy_type) else {
                continue;
            };
            match strategy.scan(dom, &parsed).await {
                Ok(candidates) => {
                    debug!(
                        "Strategy {} returned {} candidates",
                        strategy.name(),
                        candidates.len()
                    );
                    merged.extend(candidates);
                }
                Err(e) => {
                    warn!("Strategy {} failed: {}", strategy.name(), e);
                }
            }
        }

        let threshold = clamp_confidence(options.confidence_threshold);
        let ranked: Vec<Candidate> = merged
            .into_ranked()
            .into_iter()
            .filter(|candidate| candidate.confidence >= threshold)
            .collect();

        if let Some(best) = ranked.first() {
            info!(
                "Best match {} via {} (confidence: {:.2})",
                best.selector,
                best.strategy.name(),
                best.confidence
            );
        } else {
            debug!("No candidate reached threshold {:.2}", threshold);
        }

        if options.return_multiple {
            Ok(FindOutcome::Ranked { candidates: ranked })
        } else {
            Ok(FindOutcome::Best {
                candidate: ranked.into_iter().next(),
            })
        }
    }
}
