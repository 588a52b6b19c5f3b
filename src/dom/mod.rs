//! Live document access
//!
//! This module defines the seam between the relay logic and a page it does not control:
//! - Document: the operations the locator and dispatcher need from a live page
//! - ElementHandle: an opaque, re-resolvable reference to an element owned by the page
//! - ElementSnapshot: geometry, style and content of an element at one instant
//! - MemoryDocument: an in-memory page for tests and offline diagnosis
//! - TabDocument: a page inside a headless_chrome tab

pub mod element;
pub mod memory;
pub mod tab;

pub use element::{BoundingBox, ComputedStyle, ElementNode};
pub use memory::{MemoryDocument, Reaction, RecordedEvent};
pub use tab::TabDocument;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque reference to an element; the page owns the element, the handle only re-resolves it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Geometry, style and content of an element, captured in one synchronous read
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementSnapshot {
    pub handle: ElementHandle,
    pub tag_name: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub content_editable: bool,
    /// Rendered text, trimmed
    #[serde(default)]
    pub text: String,
    /// Live value for input/textarea elements
    #[serde(default)]
    pub value: Option<String>,
    /// `d` attributes of descendant svg paths
    #[serde(default)]
    pub svg_paths: Vec<String>,
    /// Whether the element contains an icon (svg or icon font element)
    #[serde(default)]
    pub has_icon: bool,
}

impl ElementSnapshot {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }

    /// Non-zero box and not hidden by style
    pub fn is_visible(&self) -> bool {
        self.bounding_box.is_visible() && !self.style.hides()
    }

    /// Not disabled and not read-only
    pub fn is_interactable(&self) -> bool {
        !self.disabled && !self.read_only
    }

    pub fn is_value_field(&self) -> bool {
        self.is_tag("input") || self.is_tag("textarea")
    }

    /// Elements that accept typed text
    pub fn is_text_input(&self) -> bool {
        self.is_value_field() || self.content_editable
    }

    /// Lowercased text a human would read as the element's label
    pub fn label_haystack(&self) -> String {
        let mut parts = vec![self.text.as_str()];
        for name in ["aria-label", "title", "class", "data-placeholder", "data-testid", "placeholder"] {
            if let Some(value) = self.attribute(name) {
                parts.push(value);
            }
        }
        parts.join(" ").to_lowercase()
    }
}

/// How new content is written into an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMethod {
    /// Assign the `value` property (input/textarea)
    Value,
    /// Select all and `execCommand('insertText')` (rich editors)
    InsertText,
    /// Assign `textContent`
    TextContent,
}

/// What "empty" looks like for the element being cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyContent {
    /// `value = ""`
    Value,
    /// A single empty paragraph, the resting state of paragraph-based editors
    Paragraph,
    /// `textContent = ""`
    Plain,
}

/// A key pressed as a whole (keydown followed by keyup)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChord {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
}

impl KeyChord {
    pub fn enter() -> Self {
        Self { key: "Enter".to_string(), ctrl: false, meta: false, shift: false }
    }
}

/// Synthetic events the dispatcher can send to an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SyntheticEvent {
    /// `input` notification
    Input,
    /// `change` notification
    Change,
    /// Programmatic `element.click()`
    Activate,
    /// Pointer click at the element's center
    PointerClick,
    /// Key press delivered to the focused element
    Key(KeyChord),
}

/// The operations the locator and the dispatcher need from a live page.
///
/// Every call is a synchronous read or write within one turn of the page; callers
/// never hold page state across an await point, and handles may stop resolving at
/// any time because the page re-renders.
pub trait Document: Send + Sync {
    /// Identifies the current document context; changes on navigation or reload
    fn context_id(&self) -> Result<String>;

    /// Elements matching a CSS selector, in document order
    fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>>;

    /// Snapshot of an element, or None when the handle no longer resolves
    fn describe(&self, element: &ElementHandle) -> Result<Option<ElementSnapshot>>;

    fn focus(&self, element: &ElementHandle) -> Result<()>;

    fn clear_content(&self, element: &ElementHandle, empty: EmptyContent) -> Result<()>;

    /// Write text with the given mechanism; Ok(false) when the mechanism refused
    fn write_content(&self, element: &ElementHandle, text: &str, method: WriteMethod) -> Result<bool>;

    /// Rendered content (value for form fields, text otherwise), None when detached
    fn read_content(&self, element: &ElementHandle) -> Result<Option<String>>;

    fn dispatch(&self, element: &ElementHandle, event: SyntheticEvent) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(tag: &str) -> ElementSnapshot {
        ElementSnapshot {
            handle: ElementHandle::new("node-1"),
            tag_name: tag.to_string(),
            attributes: HashMap::new(),
            bounding_box: BoundingBox::new(0.0, 0.0, 32.0, 32.0),
            style: ComputedStyle::default(),
            disabled: false,
            read_only: false,
            content_editable: false,
            text: String::new(),
            value: None,
            svg_paths: Vec::new(),
            has_icon: false,
        }
    }

    #[test]
    fn test_visibility_rules() {
        let mut snap = snapshot("button");
        assert!(snap.is_visible());

        snap.style.visibility = "hidden".to_string();
        assert!(!snap.is_visible());

        let mut zero = snapshot("button");
        zero.bounding_box.width = 0.0;
        assert!(!zero.is_visible());
    }

    #[test]
    fn test_interactable_rules() {
        let mut snap = snapshot("textarea");
        assert!(snap.is_interactable());
        assert!(snap.is_text_input());

        snap.read_only = true;
        assert!(!snap.is_interactable());
    }

    #[test]
    fn test_label_haystack_lowercases_attributes() {
        let mut snap = snapshot("button");
        snap.attributes.insert("aria-label".to_string(), "Send Message".to_string());
        snap.text = "Go".to_string();
        let haystack = snap.label_haystack();
        assert!(haystack.contains("send message"));
        assert!(haystack.contains("go"));
    }

    #[test]
    fn test_synthetic_event_serialization() {
        let json = serde_json::to_value(SyntheticEvent::Key(KeyChord::enter())).unwrap();
        assert_eq!(json["type"], "key");
        assert_eq!(json["key"], "Enter");
    }
}
