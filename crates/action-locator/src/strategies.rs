//! Element search strategies
//!
//! Four independent scorers, each scanning the page through
//! [`DomQueryable`]:
//! 1. Text - visible text, placeholder and aria-label
//! 2. ARIA - aria attributes and roles
//! 3. Semantic - taxonomy tag/role lists
//! 4. Visual - screen region and color hints

use crate::{
    errors::LocatorError,
    ports::{DomQueryable, ElementHandle, Rect, Viewport},
    query::{ElementType, ParsedQuery, PositionHint},
    types::*,
};
use async_trait::async_trait;
use tracing::debug;

const TEXT_BEARING: &str = "button, a, input, textarea, select, label, option, summary, \
     [role], [aria-label], [placeholder], h1, h2, h3, h4, h5, h6, p, span, li, td";

const ARIA_BEARING: &str = "[aria-label], [role], [aria-placeholder]";

const LAYOUT_BEARING: &str = "button, a, input, textarea, select, img, svg, video, \
     [role], [onclick], nav, header, footer, h1, h2, h3";

/// Strategy trait for element search
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Score every element this strategy knows how to judge
    async fn scan(
        &self,
        dom: &dyn DomQueryable,
        query: &ParsedQuery,
    ) -> Result<Vec<Candidate>, LocatorError>;

    /// Get strategy type
    fn strategy_type(&self) -> LocatorStrategy;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.strategy_type().name()
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|value| value.to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Text content matching strategy
pub struct TextStrategy;

#[async_trait]
impl Strategy for TextStrategy {
    async fn scan(
        &self,
        dom: &dyn DomQueryable,
        query: &ParsedQuery,
    ) -> Result<Vec<Candidate>, LocatorError> {
        if query.terms.is_empty() && query.target_text.is_none() {
            return Ok(Vec::new());
        }
        let target = query.target_text.as_deref().map(str::to_lowercase);
        let mut candidates = Vec::new();

        for handle in dom.query_all(TEXT_BEARING).await? {
            let text = handle.text.to_lowercase();
            let mut score = 0.0;
            let mut matched = 0usize;

            for term in &query.terms {
                if text.contains(term.as_str()) {
                    score += 0.3;
                    matched += 1;
                } else if contains_ci(handle.placeholder(), term)
                    || contains_ci(handle.aria_label(), term)
                {
                    score += 0.25;
                    matched += 1;
                }
            }

            let exact = target.as_deref().is_some_and(|target| {
                text.trim() == target
                    || handle
                        .placeholder()
                        .is_some_and(|p| p.trim().to_lowercase() == target)
                    || handle
                        .aria_label()
                        .is_some_and(|l| l.trim().to_lowercase() == target)
            });
            if exact {
                score += 0.4;
            }

            if score <= 0.0 {
                continue;
            }
            if handle.visible {
                score += 0.1;
            }

            let reason = if exact {
                format!("exact text match, {matched} term(s)")
            } else {
                format!("text matched {matched} term(s)")
            };
            candidates.push(
                Candidate::new(handle.selector(), score, LocatorStrategy::Text, reason)
                    .with_visible(handle.visible),
            );
        }

        debug!("text strategy produced {} candidates", candidates.len());
        Ok(candidates)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Text
    }
}

/// ARIA attribute and role strategy
pub struct AriaStrategy;

#[async_trait]
impl Strategy for AriaStrategy {
    async fn scan(
        &self,
        dom: &dyn DomQueryable,
        query: &ParsedQuery,
    ) -> Result<Vec<Candidate>, LocatorError> {
        let mut candidates = Vec::new();
        let type_roles = query.element_type.roles();

        for handle in dom.query_all(ARIA_BEARING).await? {
            let mut score = 0.0;
            let mut matched = 0usize;

            for term in &query.terms {
                if contains_ci(handle.aria_label(), term) {
                    score += 0.35;
                    matched += 1;
                } else if contains_ci(handle.attr("aria-placeholder"), term) {
                    score += 0.25;
                    matched += 1;
                } else if contains_ci(handle.role(), term) {
                    score += 0.2;
                    matched += 1;
                }
            }

            let role_match = handle
                .role()
                .map(|role| type_roles.iter().any(|r| r.eq_ignore_ascii_case(role)))
                .unwrap_or(false);
            if role_match {
                score += 0.2;
            }

            if score <= 0.0 {
                continue;
            }

            let reason = if role_match {
                format!(
                    "role matches {}, {matched} aria term(s)",
                    query.element_type.name()
                )
            } else {
                format!("aria matched {matched} term(s)")
            };
            candidates.push(
                Candidate::new(handle.selector(), score, LocatorStrategy::Aria, reason)
                    .with_visible(handle.visible),
            );
        }

        debug!("aria strategy produced {} candidates", candidates.len());
        Ok(candidates)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Aria
    }
}

/// Taxonomy-driven strategy
pub struct SemanticStrategy;

#[async_trait]
impl Strategy for SemanticStrategy {
    async fn scan(
        &self,
        dom: &dyn DomQueryable,
        query: &ParsedQuery,
    ) -> Result<Vec<Candidate>, LocatorError> {
        if query.element_type == ElementType::Any {
            return Ok(Vec::new());
        }
        let selector = query.element_type.selectors().join(", ");
        let mut candidates = Vec::new();

        for handle in dom.query_all(&selector).await? {
            let mut score = 0.5;
            if handle.id().is_some() || handle.name().is_some() {
                score += 0.1;
            }
            let text = handle.searchable_text();
            let matched = query
                .terms
                .iter()
                .filter(|term| text.contains(term.as_str()))
                .count();
            score += 0.2 * matched as f64;

            candidates.push(
                Candidate::new(
                    handle.selector(),
                    score,
                    LocatorStrategy::Semantic,
                    format!("{} element, {matched} term(s)", query.element_type.name()),
                )
                .with_visible(handle.visible),
            );
        }

        debug!("semantic strategy produced {} candidates", candidates.len());
        Ok(candidates)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Semantic
    }
}

/// Layout strategy; only scores when the query carries a position or color hint
pub struct VisualStrategy;

impl VisualStrategy {
    /// Whether an element's box falls into the requested screen region
    pub fn in_region(rect: &Rect, viewport: &Viewport, hint: PositionHint) -> bool {
        if rect.is_empty() || viewport.width <= 0.0 || viewport.height <= 0.0 {
            return false;
        }
        let (cx, cy) = rect.center();
        let (w, h) = (viewport.width, viewport.height);
        match hint {
            PositionHint::Top => cy < h / 3.0,
            PositionHint::Bottom => cy > h * 2.0 / 3.0,
            PositionHint::Left => cx < w / 3.0,
            PositionHint::Right => cx > w * 2.0 / 3.0,
            PositionHint::Center => {
                cx >= w / 3.0 && cx <= w * 2.0 / 3.0 && cy >= h / 3.0 && cy <= h * 2.0 / 3.0
            }
            PositionHint::Header => rect.y < h * 0.2,
            PositionHint::Footer => rect.y + rect.height > h * 0.8,
        }
    }

    fn color_match(handle: &ElementHandle, color: &str) -> bool {
        ["class", "style", "id"]
            .iter()
            .any(|attr| contains_ci(handle.attr(attr), color))
    }
}

#[async_trait]
impl Strategy for VisualStrategy {
    async fn scan(
        &self,
        dom: &dyn DomQueryable,
        query: &ParsedQuery,
    ) -> Result<Vec<Candidate>, LocatorError> {
        if query.position.is_none() && query.color.is_none() {
            return Ok(Vec::new());
        }
        let viewport = dom.viewport().await;
        let mut candidates = Vec::new();

        for handle in dom.query_all(LAYOUT_BEARING).await? {
            let mut score = 0.3;
            let mut notes: Vec<String> = Vec::new();

            if let Some(position) = query.position {
                if let Some(rect) = dom.bounding_box(&handle).await? {
                    if Self::in_region(&rect, &viewport, position) {
                        score += 0.3;
                        notes.push(format!("in {position:?} region").to_lowercase());
                    }
                }
            }
            if let Some(color) = query.color.as_deref() {
                if Self::color_match(&handle, color) {
                    score += 0.1;
                    notes.push(format!("{color} styling"));
                }
            }
            let text = handle.text.to_lowercase();
            let matched = query
                .terms
                .iter()
                .filter(|term| text.contains(term.as_str()))
                .count();
            score += 0.2 * matched as f64;
            if matched > 0 {
                notes.push(format!("{matched} term(s)"));
            }

            let reason = if notes.is_empty() {
                "layout candidate".to_string()
            } else {
                notes.join(", ")
            };
            candidates.push(
                Candidate::new(handle.selector(), score, LocatorStrategy::Visual, reason)
                    .with_visible(handle.visible),
            );
        }

        debug!("visual strategy produced {} candidates", candidates.len());
        Ok(candidates)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Visual
    }
}
