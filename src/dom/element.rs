use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a DOM element node used to build in-memory pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// HTML tag name (e.g., "div", "button", "rich-textarea")
    pub tag_name: String,

    /// Element attributes (e.g., id, class, aria-label, contenteditable)
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// Own text content of the element (children contribute their own text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    /// Live `value` property for form fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Child elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,

    /// Layout box; elements without one have not been laid out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,

    /// Computed style relevant to visibility
    #[serde(default)]
    pub style: ComputedStyle,
}

/// Bounding box coordinates for an element
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The subset of computed style the locator cares about
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
        }
    }
}

impl ComputedStyle {
    /// Whether the style alone hides the element
    pub fn hides(&self) -> bool {
        self.display == "none" || self.visibility == "hidden" || self.visibility == "collapse" || self.opacity <= 0.0
    }
}

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: HashMap::new(),
            text_content: None,
            value: None,
            children: Vec::new(),
            bounding_box: None,
            style: ComputedStyle::default(),
        }
    }

    /// Builder method: set a single attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder method: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Builder method: set the form value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }

    /// Builder method: append a child
    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder method: set bounding box
    pub fn with_bounding_box(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounding_box = Some(BoundingBox { x, y, width, height });
        self
    }

    /// Builder method: hide the element with `display: none`
    pub fn hidden(mut self) -> Self {
        self.style.display = "none".to_string();
        self
    }

    /// Builder method: mark the element disabled
    pub fn disabled(self) -> Self {
        self.with_attribute("disabled", "")
    }

    /// Builder method: make the element a rich editable region
    pub fn editable(self) -> Self {
        self.with_attribute("contenteditable", "true")
    }
}

impl BoundingBox {
    /// Create a new BoundingBox
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the bounding box is visible (has non-zero dimensions)
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Calculate the area of the bounding box
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}
