//! Alternative locator generation for a broken selector

use crate::{
    errors::LocatorError,
    ports::{escape_attr, DomQueryable, ElementHandle},
    selector::{decompose, SelectorParts},
    types::*,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

const INTERACTIVE_TEXT: &str = "button, a, input, textarea, select, label, option, summary, \
     [role], [onclick], h1, h2, h3, h4, h5, h6, p, span, li, td";

/// Tokens that carry no identity when splitting ids/classes/names
const NOISE_TOKENS: &[&str] = &[
    "old", "new", "tmp", "temp", "copy", "legacy", "deprecated", "wrapper", "container", "inner",
    "outer", "div", "span",
];

static TOKEN_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_:.\s]+|\d+").expect("static regex"));

/// Generates ranked alternative selectors for a selector that stopped matching.
#[derive(Debug, Default, Clone)]
pub struct SelectorHealer;

impl SelectorHealer {
    pub fn new() -> Self {
        Self
    }

    /// Identity-bearing fragments of an id, class or name value
    pub fn tokens(value: &str) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        for raw in TOKEN_SPLIT.split(value) {
            for piece in split_camel(raw) {
                let token = piece.to_lowercase();
                if token.chars().count() < 3 || NOISE_TOKENS.contains(&token.as_str()) {
                    continue;
                }
                if !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
        }
        tokens
    }

    /// Produce up to `max_alternatives` candidates, best first.
    pub async fn heal(
        &self,
        dom: &dyn DomQueryable,
        broken_selector: &str,
        options: &HealOptions,
    ) -> Result<Vec<Candidate>, LocatorError> {
        info!("Attempting self-heal for selector: {}", broken_selector);
        if options.max_alternatives == 0 {
            return Ok(Vec::new());
        }

        let parts = match decompose(broken_selector) {
            Ok(parts) => parts,
            Err(e) => {
                // Invalid selectors can still heal from last known text/attributes
                warn!("Could not decompose '{}': {}", broken_selector, e);
                SelectorParts::default()
            }
        };

        let mut set = CandidateSet::new();
        let heuristics: [(LocatorStrategy, Result<Vec<Candidate>, LocatorError>); 6] = [
            (
                LocatorStrategy::IdPartial,
                self.by_id(dom, &parts).await,
            ),
            (
                LocatorStrategy::NamePartial,
                self.by_name(dom, &parts).await,
            ),
            (
                LocatorStrategy::TextContent,
                self.by_text(dom, options.last_known_text.as_deref()).await,
            ),
            (
                LocatorStrategy::ClassPartial,
                self.by_class(dom, &parts).await,
            ),
            (
                LocatorStrategy::Structural,
                self.by_structure(dom, &parts).await,
            ),
            (
                LocatorStrategy::AriaLabel,
                self.by_aria_label(
                    dom,
                    options
                        .last_known_attributes
                        .get("aria-label")
                        .map(String::as_str),
                )
                .await,
            ),
        ];

        for (strategy, result) in heuristics {
            match result {
                Ok(candidates) => {
                    debug!("{} produced {} candidates", strategy.name(), candidates.len());
                    set.extend(
                        candidates
                            .into_iter()
                            .filter(|candidate| candidate.selector != broken_selector.trim()),
                    );
                }
                Err(e) => warn!("Heal heuristic {} failed: {}", strategy.name(), e),
            }
        }

        let mut ranked = set.into_ranked();
        ranked.truncate(options.max_alternatives);
        match ranked.first() {
            Some(best) => info!(
                "Heal produced {} alternatives, best {} (confidence: {:.2})",
                ranked.len(),
                best.selector,
                best.confidence
            ),
            None => warn!("No alternatives found for {}", broken_selector),
        }
        Ok(ranked)
    }

    async fn partial_attribute(
        &self,
        dom: &dyn DomQueryable,
        attribute: &str,
        value: Option<&str>,
        strategy: LocatorStrategy,
        selector_for: impl Fn(&ElementHandle) -> Option<String>,
    ) -> Result<Vec<Candidate>, LocatorError> {
        let Some(value) = value else {
            return Ok(Vec::new());
        };
        let base = strategy.heal_base_confidence().unwrap_or(0.5);
        let mut candidates = Vec::new();
        for token in Self::tokens(value) {
            let query = format!("[{attribute}*=\"{}\"]", escape_attr(&token));
            for handle in dom.query_all(&query).await? {
                if let Some(selector) = selector_for(&handle) {
                    candidates.push(
                        Candidate::new(
                            selector,
                            base,
                            strategy,
                            format!("{attribute} contains '{token}'"),
                        )
                        .with_visible(handle.visible),
                    );
                }
            }
        }
        Ok(candidates)
    }

    async fn by_id(
        &self,
        dom: &dyn DomQueryable,
        parts: &SelectorParts,
    ) -> Result<Vec<Candidate>, LocatorError> {
        self.partial_attribute(
            dom,
            "id",
            parts.id.as_deref(),
            LocatorStrategy::IdPartial,
            |handle| handle.id().map(|_| handle.selector()),
        )
        .await
    }

    async fn by_name(
        &self,
        dom: &dyn DomQueryable,
        parts: &SelectorParts,
    ) -> Result<Vec<Candidate>, LocatorError> {
        self.partial_attribute(
            dom,
            "name",
            parts.name(),
            LocatorStrategy::NamePartial,
            |handle| {
                handle
                    .name()
                    .map(|name| format!("{}[name=\"{}\"]", handle.tag, escape_attr(name)))
            },
        )
        .await
    }

    async fn by_text(
        &self,
        dom: &dyn DomQueryable,
        last_known_text: Option<&str>,
    ) -> Result<Vec<Candidate>, LocatorError> {
        let Some(text) = last_known_text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Vec::new());
        };
        let needle = text.to_lowercase();
        let base = LocatorStrategy::TextContent
            .heal_base_confidence()
            .unwrap_or(0.5);
        let mut candidates = Vec::new();
        for handle in dom.query_all(INTERACTIVE_TEXT).await? {
            if handle.text.to_lowercase().contains(&needle) {
                candidates.push(
                    Candidate::new(
                        handle.selector(),
                        base,
                        LocatorStrategy::TextContent,
                        format!("text contains '{text}'"),
                    )
                    .with_visible(handle.visible),
                );
            }
        }
        Ok(candidates)
    }

    async fn by_class(
        &self,
        dom: &dyn DomQueryable,
        parts: &SelectorParts,
    ) -> Result<Vec<Candidate>, LocatorError> {
        let mut candidates = Vec::new();
        for class in &parts.classes {
            candidates.extend(
                self.partial_attribute(
                    dom,
                    "class",
                    Some(class),
                    LocatorStrategy::ClassPartial,
                    |handle| Some(handle.selector()),
                )
                .await?,
            );
        }
        Ok(candidates)
    }

    async fn by_structure(
        &self,
        dom: &dyn DomQueryable,
        parts: &SelectorParts,
    ) -> Result<Vec<Candidate>, LocatorError> {
        let Some(tag) = parts.tag.as_deref().filter(|tag| *tag != "*") else {
            return Ok(Vec::new());
        };
        let base_selector = match parts.input_type() {
            Some(input_type) => format!("{tag}[type=\"{}\"]", escape_attr(input_type)),
            None => tag.to_string(),
        };
        let base = LocatorStrategy::Structural
            .heal_base_confidence()
            .unwrap_or(0.5);
        let matches = dom.query_all(&base_selector).await?;
        if matches.len() == 1 {
            let handle = &matches[0];
            return Ok(vec![Candidate::new(
                base_selector.clone(),
                base,
                LocatorStrategy::Structural,
                format!("only {base_selector} on page"),
            )
            .with_visible(handle.visible)]);
        }

        let mut candidates = Vec::new();
        for handle in &matches {
            for attribute in ["placeholder", "value"] {
                let Some(value) = handle.attr(attribute) else {
                    continue;
                };
                let refined = format!("{base_selector}[{attribute}=\"{}\"]", escape_attr(value));
                if dom.query_all(&refined).await?.len() == 1 {
                    candidates.push(
                        Candidate::new(
                            refined,
                            base,
                            LocatorStrategy::Structural,
                            format!("unique {attribute} among {base_selector}"),
                        )
                        .with_visible(handle.visible),
                    );
                    break;
                }
            }
        }
        Ok(candidates)
    }

    async fn by_aria_label(
        &self,
        dom: &dyn DomQueryable,
        label: Option<&str>,
    ) -> Result<Vec<Candidate>, LocatorError> {
        let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
            return Ok(Vec::new());
        };
        let base = LocatorStrategy::AriaLabel
            .heal_base_confidence()
            .unwrap_or(0.5);
        let query = format!("[aria-label*=\"{}\"]", escape_attr(label));
        Ok(dom
            .query_all(&query)
            .await?
            .into_iter()
            .filter_map(|handle| {
                let current = handle.aria_label()?;
                Some(
                    Candidate::new(
                        format!("{}[aria-label=\"{}\"]", handle.tag, escape_attr(current)),
                        base,
                        LocatorStrategy::AriaLabel,
                        format!("aria-label contains '{label}'"),
                    )
                    .with_visible(handle.visible),
                )
            })
            .collect())
    }
}

fn split_camel(raw: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in raw.chars() {
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase();
        current.push(ch);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
