//! Core types for locator system

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Locator strategy enumeration
///
/// The first four tags are produced by [`crate::ElementFinder`], the rest by
/// [`crate::SelectorHealer`] heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorStrategy {
    /// Visible text, placeholder and aria-label matching
    Text,

    /// ARIA attribute and role matching
    Aria,

    /// Element taxonomy (tag/role) matching
    Semantic,

    /// Screen region and layout matching
    Visual,

    /// Partial match on the broken selector's id
    IdPartial,

    /// Partial match on the broken selector's name attribute
    NamePartial,

    /// Last known text content
    TextContent,

    /// Partial match on the broken selector's classes
    ClassPartial,

    /// Tag and type structure, refined by placeholder/value
    Structural,

    /// Last known aria-label
    AriaLabel,
}

impl LocatorStrategy {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Text => "text",
            LocatorStrategy::Aria => "aria",
            LocatorStrategy::Semantic => "semantic",
            LocatorStrategy::Visual => "visual",
            LocatorStrategy::IdPartial => "id-partial",
            LocatorStrategy::NamePartial => "name-partial",
            LocatorStrategy::TextContent => "text-content",
            LocatorStrategy::ClassPartial => "class-partial",
            LocatorStrategy::Structural => "structural",
            LocatorStrategy::AriaLabel => "aria-label",
        }
    }

    /// Strategies run by the finder in `auto` mode, in execution order
    pub fn finder_chain() -> Vec<LocatorStrategy> {
        vec![
            LocatorStrategy::Text,
            LocatorStrategy::Aria,
            LocatorStrategy::Semantic,
            LocatorStrategy::Visual,
        ]
    }

    /// Fixed base confidence of a heal heuristic
    pub fn heal_base_confidence(&self) -> Option<f64> {
        match self {
            LocatorStrategy::IdPartial => Some(0.9),
            LocatorStrategy::NamePartial => Some(0.85),
            LocatorStrategy::AriaLabel => Some(0.85),
            LocatorStrategy::TextContent => Some(0.8),
            LocatorStrategy::ClassPartial => Some(0.7),
            LocatorStrategy::Structural => Some(0.6),
            _ => None,
        }
    }
}

/// Locator suggestion produced by the finder or the healer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Selector that should resolve the element
    pub selector: String,

    /// Confidence score (0.0-1.0)
    pub confidence: f64,

    /// Strategy used to find this candidate
    pub strategy: LocatorStrategy,

    /// Human readable rationale
    pub reason: String,

    /// Whether the element was visible when scanned
    pub visible: bool,
}

impl Candidate {
    /// Create a new candidate, clamping confidence into range
    pub fn new(
        selector: impl Into<String>,
        confidence: f64,
        strategy: LocatorStrategy,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            selector: selector.into(),
            confidence: clamp_confidence(confidence),
            strategy,
            reason: reason.into(),
            visible: false,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Check if this is a high-confidence match (>= 0.8)
    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= 0.8
    }

    /// Check if this is an acceptable match (>= 0.5)
    pub fn is_acceptable(&self) -> bool {
        self.confidence >= 0.5
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Deduplicating candidate collector.
///
/// Keeps a single entry per selector string holding the maximum confidence
/// seen; `into_ranked` sorts descending and is stable for equal scores.
#[derive(Debug, Default)]
pub struct CandidateSet {
    order: Vec<String>,
    entries: BTreeMap<String, Candidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: Candidate) {
        match self.entries.get_mut(&candidate.selector) {
            Some(existing) => {
                if candidate.confidence > existing.confidence {
                    *existing = candidate;
                }
            }
            None => {
                self.order.push(candidate.selector.clone());
                self.entries.insert(candidate.selector.clone(), candidate);
            }
        }
    }

    pub fn extend(&mut self, candidates: impl IntoIterator<Item = Candidate>) {
        for candidate in candidates {
            self.push(candidate);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_ranked(mut self) -> Vec<Candidate> {
        let mut ranked: Vec<Candidate> = self
            .order
            .iter()
            .filter_map(|selector| self.entries.remove(selector))
            .collect();
        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }
}

/// Which finder strategies to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindStrategy {
    #[default]
    Auto,
    Text,
    Aria,
    Semantic,
    Visual,
}

impl FindStrategy {
    pub fn strategies(&self) -> Vec<LocatorStrategy> {
        match self {
            FindStrategy::Auto => LocatorStrategy::finder_chain(),
            FindStrategy::Text => vec![LocatorStrategy::Text],
            FindStrategy::Aria => vec![LocatorStrategy::Aria],
            FindStrategy::Semantic => vec![LocatorStrategy::Semantic],
            FindStrategy::Visual => vec![LocatorStrategy::Visual],
        }
    }
}

impl std::str::FromStr for FindStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(FindStrategy::Auto),
            "text" => Ok(FindStrategy::Text),
            "aria" => Ok(FindStrategy::Aria),
            "semantic" => Ok(FindStrategy::Semantic),
            "visual" => Ok(FindStrategy::Visual),
            other => Err(format!("unknown find strategy '{other}'")),
        }
    }
}

/// Options for [`crate::ElementFinder::find`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindOptions {
    pub strategy: FindStrategy,

    /// Free-form context appended to the query terms
    pub context: Option<String>,

    pub confidence_threshold: f64,

    pub return_multiple: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            strategy: FindStrategy::Auto,
            context: None,
            confidence_threshold: 0.7,
            return_multiple: false,
        }
    }
}

impl FindOptions {
    pub fn with_strategy(mut self, strategy: FindStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = clamp_confidence(threshold);
        self
    }

    pub fn multiple(mut self) -> Self {
        self.return_multiple = true;
        self
    }
}

/// Result of a finder run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindOutcome {
    /// Single best candidate (`return_multiple = false`)
    Best { candidate: Option<Candidate> },

    /// Full ranked set above threshold
    Ranked { candidates: Vec<Candidate> },
}

impl FindOutcome {
    pub fn best(&self) -> Option<&Candidate> {
        match self {
            FindOutcome::Best { candidate } => candidate.as_ref(),
            FindOutcome::Ranked { candidates } => candidates.first(),
        }
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        match self {
            FindOutcome::Best { candidate } => candidate.iter().cloned().collect(),
            FindOutcome::Ranked { candidates } => candidates.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.best().is_none()
    }
}

/// Options for [`crate::SelectorHealer::heal`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealOptions {
    pub last_known_text: Option<String>,

    #[serde(default)]
    pub last_known_attributes: BTreeMap<String, String>,

    pub max_alternatives: usize,
}

impl Default for HealOptions {
    fn default() -> Self {
        Self {
            last_known_text: None,
            last_known_attributes: BTreeMap::new(),
            max_alternatives: 5,
        }
    }
}

impl HealOptions {
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.last_known_text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.last_known_attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_max_alternatives(mut self, max: usize) -> Self {
        self.max_alternatives = max;
        self
    }
}
