//! Side-effecting page actions, each paired with a check of its observable effect.
//!
//! Sending an event never counts as success on its own: sites built on
//! framework-controlled editors routinely swallow programmatic input, so the
//! dispatcher re-reads the page after every attempt.

use crate::dom::{Document, ElementHandle, ElementSnapshot, EmptyContent, KeyChord, SyntheticEvent, WriteMethod};
use crate::error::{ErrorKind, Result};
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;

/// Characters of the expected text compared during read-back
const VERIFY_PREFIX_CHARS: usize = 50;

/// Result of one dispatcher call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    /// The action ran to completion without the page refusing it
    pub succeeded: bool,
    /// The intended effect was observed afterwards
    pub verified_effect: bool,
    /// Number of mechanisms tried
    pub dispatched: u32,
    /// Mechanism that produced the verified effect (or the last one tried)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ActionOutcome {
    fn verified(dispatched: u32, method: String) -> Self {
        Self { succeeded: true, verified_effect: true, dispatched, method: Some(method), error_kind: None }
    }

    fn failed(dispatched: u32, method: Option<String>, kind: ErrorKind) -> Self {
        Self { succeeded: false, verified_effect: false, dispatched, method, error_kind: Some(kind) }
    }
}

/// Observable condition that proves an action took effect
pub trait EffectPredicate: Send + Sync {
    fn observe(&self, document: &dyn Document) -> Result<bool>;
}

impl<F> EffectPredicate for F
where
    F: Fn(&dyn Document) -> Result<bool> + Send + Sync,
{
    fn observe(&self, document: &dyn Document) -> Result<bool> {
        self(document)
    }
}

/// The destination accepted a message: its input became empty or was removed
#[derive(Debug, Clone)]
pub struct InputCleared {
    pub input: ElementHandle,
}

impl InputCleared {
    pub fn new(input: ElementHandle) -> Self {
        Self { input }
    }
}

impl EffectPredicate for InputCleared {
    fn observe(&self, document: &dyn Document) -> Result<bool> {
        Ok(match document.read_content(&self.input)? {
            None => true,
            Some(content) => is_blank(&content),
        })
    }
}

fn is_blank(content: &str) -> bool {
    content.chars().all(|c| c.is_whitespace() || c == '\u{200b}' || c == '\u{feff}')
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `actual` shows the injected `expected` text: an exact match, or
/// content starting with the first characters of it (editors may append a
/// trailing placeholder or line break). Leftover text before it is a failure.
pub fn content_matches(actual: &str, expected: &str) -> bool {
    let actual = normalize(actual);
    let expected = normalize(expected);
    if actual == expected {
        return true;
    }
    if expected.is_empty() {
        return false;
    }
    let prefix: String = expected.chars().take(VERIFY_PREFIX_CHARS).collect();
    actual.starts_with(&prefix)
}

fn write_methods(target: &ElementSnapshot) -> Vec<WriteMethod> {
    if target.is_value_field() {
        vec![WriteMethod::Value]
    } else if target.content_editable {
        vec![WriteMethod::InsertText, WriteMethod::TextContent]
    } else {
        vec![WriteMethod::TextContent]
    }
}

fn empty_state(target: &ElementSnapshot) -> EmptyContent {
    if target.is_value_field() {
        EmptyContent::Value
    } else if target.has_class("ql-editor") || target.has_class("ProseMirror") {
        EmptyContent::Paragraph
    } else {
        EmptyContent::Plain
    }
}

fn error_kind_or(e: &crate::error::RelayError, fallback: ErrorKind) -> ErrorKind {
    e.kind().unwrap_or(fallback)
}

/// Performs text injection and activation against a [`Document`]
#[derive(Debug, Clone, Copy)]
pub struct ActionDispatcher {
    settle: Duration,
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

impl ActionDispatcher {
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// Replace the target's content with `text` and verify it by reading it back.
    ///
    /// Mechanisms are tried from most to least direct; the first one whose
    /// result reads back correctly wins. Injecting twice leaves only the
    /// second text.
    pub async fn inject_text(&self, document: &dyn Document, target: &ElementSnapshot, text: &str) -> ActionOutcome {
        let element = &target.handle;
        if let Err(e) = document.focus(element) {
            log::warn!("Could not focus {}: {}", element, e);
            return ActionOutcome::failed(0, None, error_kind_or(&e, ErrorKind::InjectionFailed));
        }

        let mut dispatched = 0;
        let mut last_method = None;
        for method in write_methods(target) {
            dispatched += 1;
            let name = format!("{:?}", method).to_lowercase();
            last_method = Some(name.clone());

            match self.write_once(document, target, text, method).await {
                Ok(true) => {
                    log::debug!("Injected {} chars into {} via {}", text.chars().count(), element, name);
                    return ActionOutcome::verified(dispatched, name);
                }
                Ok(false) => log::debug!("Write via {} did not read back on {}", name, element),
                Err(e) => {
                    log::warn!("Write via {} failed on {}: {}", name, element, e);
                    if e.kind() == Some(ErrorKind::TargetNotFound) {
                        return ActionOutcome::failed(dispatched, last_method, ErrorKind::TargetNotFound);
                    }
                }
            }
        }

        ActionOutcome::failed(dispatched, last_method, ErrorKind::InjectionFailed)
    }

    async fn write_once(
        &self,
        document: &dyn Document,
        target: &ElementSnapshot,
        text: &str,
        method: WriteMethod,
    ) -> Result<bool> {
        let element = &target.handle;
        document.clear_content(element, empty_state(target))?;
        if !document.write_content(element, text, method)? {
            return Ok(false);
        }
        document.dispatch(element, SyntheticEvent::Input)?;
        document.dispatch(element, SyntheticEvent::Change)?;

        sleep(self.settle).await;

        Ok(document
            .read_content(element)?
            .is_some_and(|content| content_matches(&content, text)))
    }

    /// Activate the target until `effect` is observed.
    ///
    /// Tries a programmatic click, then a pointer click, then (for text inputs
    /// only) the Enter key, settling and checking the effect after each.
    pub async fn activate(
        &self,
        document: &dyn Document,
        target: &ElementSnapshot,
        effect: &dyn EffectPredicate,
    ) -> ActionOutcome {
        let element = &target.handle;
        let mut methods = vec![("click", SyntheticEvent::Activate), ("pointer_click", SyntheticEvent::PointerClick)];
        if target.is_text_input() {
            methods.push(("commit_key", SyntheticEvent::Key(KeyChord::enter())));
        }

        let mut dispatched = 0;
        let mut last_method = None;
        for (name, event) in methods {
            dispatched += 1;
            last_method = Some(name.to_string());

            if let Err(e) = document.dispatch(element, event) {
                log::warn!("Activation via {} failed on {}: {}", name, element, e);
                continue;
            }

            sleep(self.settle).await;

            match effect.observe(document) {
                Ok(true) => {
                    log::debug!("Activation of {} observed after {}", element, name);
                    return ActionOutcome::verified(dispatched, name.to_string());
                }
                Ok(false) => log::debug!("No effect observed after {} on {}", name, element),
                Err(e) => log::warn!("Effect check after {} failed: {}", name, e),
            }
        }

        ActionOutcome::failed(dispatched, last_method, ErrorKind::ActivationUnverified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementNode, MemoryDocument, Reaction};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn page() -> MemoryDocument {
        MemoryDocument::new(ElementNode::new("body").with_bounding_box(0.0, 0.0, 800.0, 600.0).with_children(vec![
            ElementNode::new("div")
                .editable()
                .with_attribute("id", "editor")
                .with_attribute("class", "ql-editor")
                .with_bounding_box(0.0, 500.0, 600.0, 40.0),
            ElementNode::new("textarea").with_attribute("id", "plain").with_bounding_box(0.0, 400.0, 600.0, 40.0),
            ElementNode::new("button").with_attribute("id", "send").with_bounding_box(610.0, 500.0, 32.0, 32.0),
        ]))
    }

    fn snapshot(doc: &MemoryDocument, selector: &str) -> ElementSnapshot {
        doc.describe(&doc.find(selector).unwrap()).unwrap().unwrap()
    }

    #[test]
    fn test_content_matches_prefix_and_whitespace() {
        assert!(content_matches("hello   world\n", "hello world"));
        let long = "x".repeat(80);
        assert!(content_matches(&format!("{}-trailing", &long[..60]), &long));
        assert!(!content_matches("hel", "hello"));
        assert!(content_matches("", ""));
        assert!(!content_matches("", "hello"));
    }

    #[test]
    fn test_content_matches_rejects_appended_text() {
        assert!(!content_matches("first promptsecond prompt", "second prompt"));
        assert!(!content_matches("old draft second prompt", "second prompt"));
        assert!(content_matches("second prompt\n", "second prompt"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inject_falls_back_to_text_content() {
        let doc = page();
        doc.set_insert_text_supported(false);
        let target = snapshot(&doc, "#editor");

        let outcome = ActionDispatcher::default().inject_text(&doc, &target, "hello").await;
        assert!(outcome.verified_effect);
        assert_eq!(outcome.dispatched, 2);
        assert_eq!(outcome.method.as_deref(), Some("textcontent"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inject_reports_truncated_write() {
        let doc = page();
        doc.set_attribute(&doc.find("#plain").unwrap(), "maxlength", "3").unwrap();
        let target = snapshot(&doc, "#plain");

        let outcome = ActionDispatcher::default().inject_text(&doc, &target, "hello").await;
        assert!(!outcome.verified_effect);
        assert_eq!(outcome.error_kind, Some(ErrorKind::InjectionFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_escalates_to_pointer_click() {
        let doc = page();
        let send = doc.find("#send").unwrap();

        // Ignores the programmatic click, observes the second attempt
        let counter = AtomicU32::new(0);
        let second_attempt = move |_: &dyn Document| -> Result<bool> { Ok(counter.fetch_add(1, Ordering::SeqCst) >= 1) };
        let target = snapshot(&doc, "#send");
        let outcome = ActionDispatcher::default().activate(&doc, &target, &second_attempt).await;
        assert!(outcome.verified_effect);
        assert_eq!(outcome.method.as_deref(), Some("pointer_click"));
        assert_eq!(doc.events_for(&send).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_key_only_for_text_inputs() {
        let doc = page();
        let editor = doc.find("#editor").unwrap();
        doc.write_content(&editor, "draft", WriteMethod::TextContent).unwrap();
        doc.on_commit_key(&editor, vec![Reaction::ClearContent(editor.clone())]);

        let target = snapshot(&doc, "#editor");
        let outcome = ActionDispatcher::default()
            .activate(&doc, &target, &InputCleared::new(editor.clone()))
            .await;
        assert!(outcome.verified_effect);
        assert_eq!(outcome.method.as_deref(), Some("commit_key"));

        let button = snapshot(&doc, "#send");
        let outcome = ActionDispatcher::default()
            .activate(&doc, &button, &|_: &dyn Document| -> Result<bool> { Ok(false) })
            .await;
        assert_eq!(outcome.dispatched, 2);
        assert_eq!(outcome.error_kind, Some(ErrorKind::ActivationUnverified));
    }

    #[test]
    fn test_input_cleared_on_detach() {
        let doc = page();
        let editor = doc.find("#editor").unwrap();
        let send = doc.find("#send").unwrap();
        doc.write_content(&editor, "draft", WriteMethod::TextContent).unwrap();
        let predicate = InputCleared::new(editor.clone());
        assert!(!predicate.observe(&doc).unwrap());

        doc.on_click(&send, vec![Reaction::Remove(editor)]);
        doc.dispatch(&send, SyntheticEvent::Activate).unwrap();
        assert!(predicate.observe(&doc).unwrap());
    }
}
