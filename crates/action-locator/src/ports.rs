//! Page access port consumed by the finder and the healer.
//!
//! The browser driver implements [`DomQueryable`]; everything in this crate
//! only talks to the page through it.

use crate::errors::LocatorError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Page-scoped script returning `{ width, height }` of the layout viewport.
pub const VIEWPORT_SCRIPT: &str =
    "() => ({ width: window.innerWidth, height: window.innerHeight })";

static PLAIN_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("static regex"));

/// Serializable view of one element as returned by a page query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-specific node reference
    #[serde(default)]
    pub node_id: String,

    /// Lowercase tag name
    pub tag: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Trimmed visible text
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub visible: bool,

    /// Unique css path computed page-side, when the driver provides one
    #[serde(default)]
    pub css_path: Option<String>,
}

impl ElementHandle {
    pub fn new(node_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.attr("name")
    }

    pub fn role(&self) -> Option<&str> {
        self.attr("role")
    }

    pub fn aria_label(&self) -> Option<&str> {
        self.attr("aria-label")
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.attr("placeholder")
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Text, placeholder, aria-label and value joined for loose matching
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !self.text.is_empty() {
            parts.push(&self.text);
        }
        for key in ["placeholder", "aria-label", "value", "title", "alt"] {
            if let Some(value) = self.attr(key) {
                parts.push(value);
            }
        }
        parts.join(" ").to_lowercase()
    }

    /// Best-effort stable selector for this element.
    ///
    /// Preference: id, name, data-testid, aria-label, class chain, css path, tag.
    pub fn selector(&self) -> String {
        if let Some(id) = self.id() {
            return if PLAIN_IDENT.is_match(id) {
                format!("#{id}")
            } else {
                format!("[id=\"{}\"]", escape_attr(id))
            };
        }
        if let Some(name) = self.name() {
            return format!("{}[name=\"{}\"]", self.tag, escape_attr(name));
        }
        if let Some(test_id) = self.attr("data-testid") {
            return format!("[data-testid=\"{}\"]", escape_attr(test_id));
        }
        if let Some(label) = self.aria_label() {
            return format!("{}[aria-label=\"{}\"]", self.tag, escape_attr(label));
        }
        let classes: Vec<&str> = self
            .classes()
            .into_iter()
            .filter(|class| PLAIN_IDENT.is_match(class))
            .collect();
        if !classes.is_empty() {
            return format!("{}.{}", self.tag, classes.join("."));
        }
        if let Some(path) = self.css_path.as_deref().filter(|p| !p.is_empty()) {
            return path.to_string();
        }
        self.tag.clone()
    }
}

pub fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Element bounding geometry in viewport coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Page query capability implemented by the browser driver.
#[async_trait]
pub trait DomQueryable: Send + Sync {
    /// First element matching the selector
    async fn query_one(&self, selector: &str) -> Result<Option<ElementHandle>, LocatorError>;

    /// All elements matching the selector, in document order
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, LocatorError>;

    /// Evaluate a page-scoped function with serializable arguments
    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value, LocatorError>;

    /// Bounding geometry of an element, `None` when not rendered
    async fn bounding_box(&self, handle: &ElementHandle) -> Result<Option<Rect>, LocatorError>;

    /// Layout viewport size, defaulting to 1280x720 when the page cannot tell
    async fn viewport(&self) -> Viewport {
        match self.evaluate(VIEWPORT_SCRIPT, Vec::new()).await {
            Ok(value) => serde_json::from_value::<Viewport>(value).unwrap_or_default(),
            Err(err) => {
                debug!("viewport evaluation failed: {}", err);
                Viewport::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_prefers_id() {
        let handle = ElementHandle::new("1", "BUTTON")
            .with_attr("id", "submit-new")
            .with_attr("name", "submit");
        assert_eq!(handle.tag, "button");
        assert_eq!(handle.selector(), "#submit-new");
    }

    #[test]
    fn selector_escapes_odd_ids() {
        let handle = ElementHandle::new("1", "div").with_attr("id", "123:main");
        assert_eq!(handle.selector(), "[id=\"123:main\"]");
    }

    #[test]
    fn selector_fallback_chain() {
        let named = ElementHandle::new("1", "input").with_attr("name", "email");
        assert_eq!(named.selector(), "input[name=\"email\"]");

        let labelled = ElementHandle::new("2", "button").with_attr("aria-label", "Close \"x\"");
        assert_eq!(labelled.selector(), "button[aria-label=\"Close \\\"x\\\"\"]");

        let classed = ElementHandle::new("3", "a").with_attr("class", "nav  link");
        assert_eq!(classed.selector(), "a.nav.link");

        let mut pathed = ElementHandle::new("4", "span");
        pathed.css_path = Some("body > div:nth-child(2) > span".into());
        assert_eq!(pathed.selector(), "body > div:nth-child(2) > span");

        assert_eq!(ElementHandle::new("5", "p").selector(), "p");
    }

    #[test]
    fn searchable_text_joins_attributes() {
        let handle = ElementHandle::new("1", "input")
            .with_attr("placeholder", "Search products")
            .with_attr("aria-label", "Site search");
        let text = handle.searchable_text();
        assert!(text.contains("search products"));
        assert!(text.contains("site search"));
    }

    #[test]
    fn rect_helpers() {
        let rect = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(rect.center(), (60.0, 40.0));
        assert!(!rect.is_empty());
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_empty());
    }
}
