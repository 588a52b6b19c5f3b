//! In-memory page used by tests and by offline diagnosis of strategy tables.
//!
//! The page behaves like a tiny browser: disabled elements ignore clicks,
//! `maxlength` truncates form values, rich editors accept `insertText`, and
//! reactions registered on an element simulate what the real site does when
//! the element is activated (for example clearing the input after sending).

use crate::dom::{
    BoundingBox, ComputedStyle, Document, ElementHandle, ElementNode, ElementSnapshot, EmptyContent, SyntheticEvent,
    WriteMethod,
};
use crate::error::{RelayError, Result};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Mutex, MutexGuard};

/// What the page does when an element receives an activating event
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// Empty the content of another element
    ClearContent(ElementHandle),
    /// Detach an element from the page
    Remove(ElementHandle),
    /// Set an attribute on an element
    SetAttribute(ElementHandle, String, String),
    /// Move to another document
    Navigate(String),
}

/// An event the page received, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub element: ElementHandle,
    pub event: SyntheticEvent,
}

#[derive(Debug, Clone)]
struct Node {
    tag_name: String,
    attributes: HashMap<String, String>,
    text: Option<String>,
    value: Option<String>,
    bounding_box: Option<BoundingBox>,
    style: ComputedStyle,
    parent: Option<usize>,
    children: Vec<usize>,
    attached: bool,
}

#[derive(Debug)]
struct Page {
    nodes: Vec<Node>,
    url: String,
    generation: u64,
    events: Vec<RecordedEvent>,
    on_click: HashMap<usize, Vec<Reaction>>,
    on_commit_key: HashMap<usize, Vec<Reaction>>,
    insert_text_supported: bool,
    focused: Option<usize>,
}

/// A mutable in-memory document implementing [`Document`]
#[derive(Debug)]
pub struct MemoryDocument {
    page: Mutex<Page>,
}

impl Page {
    fn push(&mut self, element: ElementNode, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            tag_name: element.tag_name.to_lowercase(),
            attributes: element.attributes,
            text: element.text_content,
            value: element.value,
            bounding_box: element.bounding_box,
            style: element.style,
            parent,
            children: Vec::new(),
            attached: true,
        });
        let children: Vec<usize> = element
            .children
            .into_iter()
            .map(|child| self.push(child, Some(index)))
            .collect();
        self.nodes[index].children = children;
        index
    }

    fn resolve(&self, handle: &ElementHandle) -> Option<usize> {
        let index: usize = handle.as_str().strip_prefix("node-")?.parse().ok()?;
        let node = self.nodes.get(index)?;
        if node.attached && self.ancestors_attached(index) {
            Some(index)
        } else {
            None
        }
    }

    fn require(&self, handle: &ElementHandle) -> Result<usize> {
        self.resolve(handle)
            .ok_or_else(|| RelayError::ElementNotFound(format!("{} is detached", handle)))
    }

    fn ancestors_attached(&self, index: usize) -> bool {
        let mut current = self.nodes[index].parent;
        while let Some(parent) = current {
            if !self.nodes[parent].attached {
                return false;
            }
            current = self.nodes[parent].parent;
        }
        true
    }

    /// Serialize the attached tree as HTML, tagging every element with its index
    fn to_html(&self) -> String {
        let mut body = String::new();
        self.render(0, &mut body);
        if self.nodes[0].tag_name == "body" {
            format!("<!DOCTYPE html><html><head></head>{}</html>", body)
        } else {
            format!("<!DOCTYPE html><html><head></head><body>{}</body></html>", body)
        }
    }

    fn render(&self, index: usize, out: &mut String) {
        let node = &self.nodes[index];
        if !node.attached {
            return;
        }

        let _ = write!(out, "<{} {}=\"{}\"", node.tag_name, NODE_ATTRIBUTE, index);
        for (name, value) in &node.attributes {
            if name != NODE_ATTRIBUTE {
                let _ = write!(out, " {}=\"{}\"", name, escape_attribute(value));
            }
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&node.tag_name.as_str()) {
            return;
        }
        for &child in &node.children {
            self.render(child, out);
        }
        let _ = write!(out, "</{}>", node.tag_name);
    }

    fn descendants(&self, index: usize) -> Vec<usize> {
        let mut found = Vec::new();
        let mut stack: Vec<usize> = self.nodes[index].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if !self.nodes[current].attached {
                continue;
            }
            found.push(current);
            stack.extend(self.nodes[current].children.iter().rev().copied());
        }
        found
    }

    fn text_of(&self, index: usize) -> String {
        let mut parts = Vec::new();
        if let Some(text) = &self.nodes[index].text {
            parts.push(text.clone());
        }
        for child in self.descendants(index) {
            if let Some(text) = &self.nodes[child].text {
                parts.push(text.clone());
            }
        }
        parts.join("")
    }

    fn effective_style(&self, index: usize) -> ComputedStyle {
        let mut style = self.nodes[index].style.clone();
        let mut current = self.nodes[index].parent;
        while let Some(parent) = current {
            let inherited = &self.nodes[parent].style;
            if inherited.display == "none" {
                style.display = "none".to_string();
            }
            if inherited.opacity <= 0.0 {
                style.opacity = 0.0;
            }
            current = self.nodes[parent].parent;
        }
        style
    }

    fn is_content_editable(&self, index: usize) -> bool {
        self.nodes[index]
            .attributes
            .get("contenteditable")
            .is_some_and(|v| v.is_empty() || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("plaintext-only"))
    }

    fn is_value_field(&self, index: usize) -> bool {
        matches!(self.nodes[index].tag_name.as_str(), "input" | "textarea")
    }

    fn is_disabled(&self, index: usize) -> bool {
        self.nodes[index].attributes.contains_key("disabled")
            || self.nodes[index].attributes.get("aria-disabled").is_some_and(|v| v == "true")
    }

    fn clear(&mut self, index: usize, empty: EmptyContent) {
        if self.is_value_field(index) {
            self.nodes[index].value = Some(String::new());
            return;
        }
        for child in self.nodes[index].children.clone() {
            self.nodes[child].attached = false;
        }
        self.nodes[index].children.clear();
        self.nodes[index].text = None;
        if empty == EmptyContent::Paragraph {
            let paragraph = ElementNode::new("p").with_child(ElementNode::new("br"));
            let child = self.push(paragraph, Some(index));
            self.nodes[index].children.push(child);
        }
    }

    fn set_text(&mut self, index: usize, text: &str) {
        for child in self.nodes[index].children.clone() {
            self.nodes[child].attached = false;
        }
        self.nodes[index].children.clear();
        self.nodes[index].text = Some(text.to_string());
    }

    fn apply(&mut self, reactions: Vec<Reaction>) {
        for reaction in reactions {
            match reaction {
                Reaction::ClearContent(handle) => {
                    if let Some(index) = self.resolve(&handle) {
                        self.clear(index, EmptyContent::Plain);
                    }
                }
                Reaction::Remove(handle) => {
                    if let Some(index) = self.resolve(&handle) {
                        self.nodes[index].attached = false;
                    }
                }
                Reaction::SetAttribute(handle, name, value) => {
                    if let Some(index) = self.resolve(&handle) {
                        self.nodes[index].attributes.insert(name, value);
                    }
                }
                Reaction::Navigate(url) => {
                    self.url = url;
                    self.generation += 1;
                }
            }
        }
    }
}

/// Attribute carrying a node's index through the HTML round trip
const NODE_ATTRIBUTE: &str = "data-relay-node";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn handle_of(index: usize) -> ElementHandle {
    ElementHandle::new(format!("node-{}", index))
}

impl MemoryDocument {
    /// Build a page from a root element (usually `body`)
    pub fn new(root: ElementNode) -> Self {
        Self::with_url("about:blank", root)
    }

    pub fn with_url(url: impl Into<String>, root: ElementNode) -> Self {
        let mut page = Page {
            nodes: Vec::new(),
            url: url.into(),
            generation: 0,
            events: Vec::new(),
            on_click: HashMap::new(),
            on_commit_key: HashMap::new(),
            insert_text_supported: true,
            focused: None,
        };
        page.push(root, None);
        Self { page: Mutex::new(page) }
    }

    fn page(&self) -> MutexGuard<'_, Page> {
        // A panic while holding the lock leaves the page usable for inspection
        self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// First element matching a selector, for test setup
    pub fn find(&self, selector: &str) -> Option<ElementHandle> {
        self.query_all(selector).ok()?.into_iter().next()
    }

    /// Run reactions when the element is clicked (ignored while it is disabled)
    pub fn on_click(&self, element: &ElementHandle, reactions: Vec<Reaction>) {
        let mut page = self.page();
        if let Some(index) = page.resolve(element) {
            page.on_click.entry(index).or_default().extend(reactions);
        }
    }

    /// Run reactions when Enter is pressed on the element
    pub fn on_commit_key(&self, element: &ElementHandle, reactions: Vec<Reaction>) {
        let mut page = self.page();
        if let Some(index) = page.resolve(element) {
            page.on_commit_key.entry(index).or_default().extend(reactions);
        }
    }

    /// Emulate editors where `execCommand('insertText')` is unavailable
    pub fn set_insert_text_supported(&self, supported: bool) {
        self.page().insert_text_supported = supported;
    }

    /// Append an element under a parent, as a late render would
    pub fn append(&self, parent: &ElementHandle, element: ElementNode) -> Result<ElementHandle> {
        let mut page = self.page();
        let parent_index = page.require(parent)?;
        let index = page.push(element, Some(parent_index));
        page.nodes[parent_index].children.push(index);
        Ok(handle_of(index))
    }

    /// Set or replace an attribute on a live element
    pub fn set_attribute(&self, element: &ElementHandle, name: &str, value: &str) -> Result<()> {
        let mut page = self.page();
        let index = page.require(element)?;
        page.nodes[index].attributes.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_attribute(&self, element: &ElementHandle, name: &str) -> Result<()> {
        let mut page = self.page();
        let index = page.require(element)?;
        page.nodes[index].attributes.remove(name);
        Ok(())
    }

    /// Simulate a navigation to a new URL
    pub fn navigate(&self, url: impl Into<String>) {
        let mut page = self.page();
        page.url = url.into();
        page.generation += 1;
    }

    /// All events received so far
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.page().events.clone()
    }

    /// Events received by one element
    pub fn events_for(&self, element: &ElementHandle) -> Vec<SyntheticEvent> {
        self.page()
            .events
            .iter()
            .filter(|recorded| &recorded.element == element)
            .map(|recorded| recorded.event.clone())
            .collect()
    }

    pub fn url(&self) -> String {
        self.page().url.clone()
    }
}

impl Document for MemoryDocument {
    fn context_id(&self) -> Result<String> {
        let page = self.page();
        Ok(format!("{}#{}", page.url, page.generation))
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let parsed = Selector::parse(selector).map_err(|e| RelayError::InvalidSelector {
            selector: selector.to_string(),
            reason: format!("{:?}", e),
        })?;
        let html = Html::parse_document(&self.page().to_html());
        Ok(html
            .select(&parsed)
            .filter_map(|element| element.value().attr(NODE_ATTRIBUTE))
            .filter_map(|index| index.parse::<usize>().ok())
            .map(handle_of)
            .collect())
    }

    fn describe(&self, element: &ElementHandle) -> Result<Option<ElementSnapshot>> {
        let page = self.page();
        let Some(index) = page.resolve(element) else {
            return Ok(None);
        };

        let node = &page.nodes[index];
        let descendants = page.descendants(index);
        let svg_paths = descendants
            .iter()
            .filter(|&&d| page.nodes[d].tag_name == "path")
            .filter_map(|&d| page.nodes[d].attributes.get("d").cloned())
            .collect();
        let has_icon = descendants.iter().any(|&d| {
            let tag = page.nodes[d].tag_name.as_str();
            tag == "svg" || tag == "mat-icon"
        });

        Ok(Some(ElementSnapshot {
            handle: element.clone(),
            tag_name: node.tag_name.clone(),
            attributes: node.attributes.clone(),
            bounding_box: node.bounding_box.unwrap_or_default(),
            style: page.effective_style(index),
            disabled: page.is_disabled(index),
            read_only: node.attributes.contains_key("readonly"),
            content_editable: page.is_content_editable(index),
            text: page.text_of(index).trim().to_string(),
            value: if page.is_value_field(index) {
                Some(node.value.clone().unwrap_or_default())
            } else {
                None
            },
            svg_paths,
            has_icon,
        }))
    }

    fn focus(&self, element: &ElementHandle) -> Result<()> {
        let mut page = self.page();
        let index = page.require(element)?;
        page.focused = Some(index);
        Ok(())
    }

    fn clear_content(&self, element: &ElementHandle, empty: EmptyContent) -> Result<()> {
        let mut page = self.page();
        let index = page.require(element)?;
        page.clear(index, empty);
        Ok(())
    }

    fn write_content(&self, element: &ElementHandle, text: &str, method: WriteMethod) -> Result<bool> {
        let mut page = self.page();
        let index = page.require(element)?;

        match method {
            WriteMethod::Value => {
                if !page.is_value_field(index) {
                    return Ok(false);
                }
                let limit = page.nodes[index]
                    .attributes
                    .get("maxlength")
                    .and_then(|v| v.parse::<usize>().ok());
                let value: String = match limit {
                    Some(max) => text.chars().take(max).collect(),
                    None => text.to_string(),
                };
                page.nodes[index].value = Some(value);
                Ok(true)
            }
            WriteMethod::InsertText => {
                if !page.insert_text_supported || !page.is_content_editable(index) {
                    return Ok(false);
                }
                page.set_text(index, text);
                Ok(true)
            }
            WriteMethod::TextContent => {
                page.set_text(index, text);
                Ok(true)
            }
        }
    }

    fn read_content(&self, element: &ElementHandle) -> Result<Option<String>> {
        let page = self.page();
        let Some(index) = page.resolve(element) else {
            return Ok(None);
        };
        if page.is_value_field(index) {
            return Ok(Some(page.nodes[index].value.clone().unwrap_or_default()));
        }
        Ok(Some(page.text_of(index)))
    }

    fn dispatch(&self, element: &ElementHandle, event: SyntheticEvent) -> Result<()> {
        let mut page = self.page();
        let index = page.require(element)?;
        page.events.push(RecordedEvent { element: element.clone(), event: event.clone() });

        let reactions = match &event {
            SyntheticEvent::Activate | SyntheticEvent::PointerClick if !page.is_disabled(index) => {
                page.on_click.get(&index).cloned().unwrap_or_default()
            }
            SyntheticEvent::Key(chord) if chord.key == "Enter" && !page.is_disabled(index) => {
                page.on_commit_key.get(&index).cloned().unwrap_or_default()
            }
            _ => Vec::new(),
        };
        page.apply(reactions);
        Ok(())
    }
}
