//! Captured-page implementation of [`DomQueryable`].
//!
//! A snapshot is a flat, document-ordered list of element descriptors with
//! optional geometry. Selector matching covers compound selectors and comma
//! groups; ancestor combinators are not evaluated (only the right-most
//! compound is matched) unless the selector equals an element's css path.

use crate::{
    errors::LocatorError,
    ports::{DomQueryable, ElementHandle, Rect, Viewport, VIEWPORT_SCRIPT},
    selector::decompose_groups,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotElement {
    #[serde(flatten)]
    pub handle: ElementHandle,

    #[serde(default)]
    pub rect: Option<Rect>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDom {
    #[serde(default)]
    pub viewport: Viewport,

    #[serde(default)]
    pub elements: Vec<SnapshotElement>,
}

impl SnapshotDom {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            elements: Vec::new(),
        }
    }

    /// Append an element; node ids are assigned in document order when blank
    pub fn push(&mut self, mut handle: ElementHandle, rect: Option<Rect>) -> &mut Self {
        if handle.node_id.is_empty() {
            handle.node_id = format!("node-{}", self.elements.len() + 1);
        }
        self.elements.push(SnapshotElement { handle, rect });
        self
    }

    pub fn with(mut self, handle: ElementHandle, rect: Option<Rect>) -> Self {
        self.push(handle, rect);
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, LocatorError> {
        let mut dom: SnapshotDom = serde_json::from_str(raw)
            .map_err(|err| LocatorError::Internal(format!("invalid DOM snapshot: {err}")))?;
        for (idx, element) in dom.elements.iter_mut().enumerate() {
            if element.handle.node_id.is_empty() {
                element.handle.node_id = format!("node-{}", idx + 1);
            }
            element.handle.tag = element.handle.tag.to_ascii_lowercase();
        }
        Ok(dom)
    }

    pub fn load(path: &Path) -> Result<Self, LocatorError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| LocatorError::Internal(format!("{}: {err}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn matching(&self, selector: &str) -> Result<Vec<ElementHandle>, LocatorError> {
        let trimmed = selector.trim();
        let by_path: Vec<ElementHandle> = self
            .elements
            .iter()
            .filter(|element| element.handle.css_path.as_deref() == Some(trimmed))
            .map(|element| element.handle.clone())
            .collect();
        if !by_path.is_empty() {
            return Ok(by_path);
        }

        let groups = decompose_groups(trimmed)?;
        Ok(self
            .elements
            .iter()
            .filter(|element| groups.iter().any(|group| group.matches(&element.handle)))
            .map(|element| element.handle.clone())
            .collect())
    }
}

#[async_trait]
impl DomQueryable for SnapshotDom {
    async fn query_one(&self, selector: &str) -> Result<Option<ElementHandle>, LocatorError> {
        Ok(self.matching(selector)?.into_iter().next())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, LocatorError> {
        self.matching(selector)
    }

    async fn evaluate(&self, script: &str, _args: Vec<Value>) -> Result<Value, LocatorError> {
        if script.trim() == VIEWPORT_SCRIPT {
            return Ok(json!({
                "width": self.viewport.width,
                "height": self.viewport.height,
            }));
        }
        Err(LocatorError::Query(
            "script evaluation is not available on a DOM snapshot".into(),
        ))
    }

    async fn bounding_box(&self, handle: &ElementHandle) -> Result<Option<Rect>, LocatorError> {
        Ok(self
            .elements
            .iter()
            .find(|element| element.handle.node_id == handle.node_id)
            .and_then(|element| element.rect))
    }
}
