use crate::dom::{Document, ElementSnapshot};
use crate::error::Result;
use crate::locator::score::Scoring;
use serde::{Deserialize, Serialize};

/// Inclusive size bounds in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min_width: f64,
    pub max_width: f64,
    pub min_height: f64,
    pub max_height: f64,
}

impl SizeRange {
    pub fn square(min: f64, max: f64) -> Self {
        Self { min_width: min, max_width: max, min_height: min, max_height: max }
    }

    pub fn contains(&self, snapshot: &ElementSnapshot) -> bool {
        let b = &snapshot.bounding_box;
        b.width >= self.min_width && b.width <= self.max_width && b.height >= self.min_height && b.height <= self.max_height
    }
}

/// How a strategy finds raw matches in the live document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Matcher {
    /// Attribute or structural match through a CSS selector
    Css { selector: String },
    /// Containers holding an svg path whose `d` contains one of the fragments
    SvgPath {
        container: String,
        fragments: Vec<String>,
        #[serde(default)]
        size: Option<SizeRange>,
    },
    /// Visual match on the rendered box
    Geometry {
        selector: String,
        size: SizeRange,
        #[serde(default)]
        require_icon: bool,
    },
    /// Label, title, class or text containing one of the needles (case-insensitive)
    Text { selector: String, needles: Vec<String> },
    /// Matches that accept typed text: form fields and regions whose
    /// `contenteditable` resolves to editable (`""`, `true`, `plaintext-only`)
    Editable { selector: String },
}

impl Matcher {
    pub fn css(selector: impl Into<String>) -> Self {
        Matcher::Css { selector: selector.into() }
    }

    fn selector(&self) -> &str {
        match self {
            Matcher::Css { selector } => selector,
            Matcher::SvgPath { container, .. } => container,
            Matcher::Geometry { selector, .. } => selector,
            Matcher::Text { selector, .. } => selector,
            Matcher::Editable { selector } => selector,
        }
    }

    fn admits(&self, snapshot: &ElementSnapshot) -> bool {
        match self {
            Matcher::Css { .. } => true,
            Matcher::SvgPath { fragments, size, .. } => {
                size.is_none_or(|range| range.contains(snapshot))
                    && snapshot
                        .svg_paths
                        .iter()
                        .any(|d| fragments.iter().any(|fragment| d.contains(fragment.as_str())))
            }
            Matcher::Geometry { size, require_icon, .. } => size.contains(snapshot) && (!require_icon || snapshot.has_icon),
            Matcher::Text { needles, .. } => {
                let haystack = snapshot.label_haystack();
                needles.iter().any(|needle| haystack.contains(&needle.to_lowercase()))
            }
            Matcher::Editable { .. } => snapshot.is_text_input(),
        }
    }

    /// Raw matches in document order, before validation
    pub fn find(&self, document: &dyn Document) -> Result<Vec<ElementSnapshot>> {
        let mut matches = Vec::new();
        for handle in document.query_all(self.selector())? {
            // Elements can detach between the query and the snapshot
            let Some(snapshot) = document.describe(&handle)? else {
                continue;
            };
            if self.admits(&snapshot) {
                matches.push(snapshot);
            }
        }
        Ok(matches)
    }
}

/// Acceptance rules applied to every raw match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    /// Non-zero box, not `display:none`, not `visibility:hidden`, opacity above zero
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Not disabled and not read-only
    #[serde(default = "default_true")]
    pub interactable: bool,
    #[serde(default)]
    pub min_width: f64,
    #[serde(default)]
    pub min_height: f64,
}

fn default_true() -> bool {
    true
}

impl Default for Validator {
    fn default() -> Self {
        Self { visible: true, interactable: true, min_width: 0.0, min_height: 0.0 }
    }
}

impl Validator {
    pub fn with_min_size(mut self, width: f64, height: f64) -> Self {
        self.min_width = width;
        self.min_height = height;
        self
    }

    pub fn accepts(&self, snapshot: &ElementSnapshot) -> bool {
        if self.visible && !snapshot.is_visible() {
            return false;
        }
        if self.interactable && !snapshot.is_interactable() {
            return false;
        }
        snapshot.bounding_box.width >= self.min_width && snapshot.bounding_box.height >= self.min_height
    }
}

/// One independent way of finding an element; stateless and re-evaluated on every poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorStrategy {
    pub id: String,
    pub matcher: Matcher,
    #[serde(default)]
    pub validator: Validator,
    /// Lower runs first; ties keep declaration order
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub scoring: Scoring,
    /// ARIA/label words that raise a candidate's score
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

impl SelectorStrategy {
    pub fn new(id: impl Into<String>, matcher: Matcher) -> Self {
        Self {
            id: id.into(),
            matcher,
            validator: Validator::default(),
            priority: 0,
            scoring: Scoring::default(),
            hints: Vec::new(),
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints = hints.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementNode, MemoryDocument};

    fn page() -> MemoryDocument {
        MemoryDocument::new(ElementNode::new("body").with_bounding_box(0.0, 0.0, 800.0, 600.0).with_children(vec![
            ElementNode::new("button")
                .with_attribute("id", "attach")
                .with_bounding_box(0.0, 0.0, 32.0, 32.0)
                .with_child(ElementNode::new("svg").with_child(ElementNode::new("path").with_attribute("d", "M0,0L1,1"))),
            ElementNode::new("button")
                .with_attribute("id", "send")
                .with_attribute("aria-label", "Send message")
                .with_bounding_box(40.0, 0.0, 32.0, 32.0)
                .with_child(
                    ElementNode::new("svg").with_child(ElementNode::new("path").with_attribute("d", "M208.49,120.49a12")),
                ),
            ElementNode::new("button").with_attribute("id", "wide").with_bounding_box(80.0, 0.0, 200.0, 32.0),
        ]))
    }

    fn ids(matches: &[ElementSnapshot]) -> Vec<String> {
        matches.iter().map(|m| m.attribute("id").unwrap_or_default().to_string()).collect()
    }

    #[test]
    fn test_svg_path_matcher() {
        let doc = page();
        let matcher = Matcher::SvgPath { container: "button".into(), fragments: vec!["208.49".into()], size: None };
        assert_eq!(ids(&matcher.find(&doc).unwrap()), vec!["send"]);
    }

    #[test]
    fn test_geometry_matcher_requires_icon() {
        let doc = page();
        let matcher = Matcher::Geometry { selector: "button".into(), size: SizeRange::square(28.0, 40.0), require_icon: true };
        assert_eq!(ids(&matcher.find(&doc).unwrap()), vec!["attach", "send"]);
    }

    #[test]
    fn test_text_matcher_is_case_insensitive() {
        let doc = page();
        let matcher = Matcher::Text { selector: "button".into(), needles: vec!["SEND".into()] };
        assert_eq!(ids(&matcher.find(&doc).unwrap()), vec!["send"]);
    }

    #[test]
    fn test_editable_matcher_skips_contenteditable_false() {
        let doc = MemoryDocument::new(ElementNode::new("body").with_children(vec![
            ElementNode::new("div").with_attribute("id", "off").with_attribute("contenteditable", "false"),
            ElementNode::new("div").with_attribute("id", "bare").with_attribute("contenteditable", ""),
            ElementNode::new("div").with_attribute("id", "on").editable(),
        ]));
        let matcher = Matcher::Editable { selector: "[contenteditable]".into() };
        assert_eq!(ids(&matcher.find(&doc).unwrap()), vec!["bare", "on"]);
    }

    #[test]
    fn test_validator_min_size() {
        let doc = page();
        let validator = Validator::default().with_min_size(100.0, 15.0);
        let accepted: Vec<_> = Matcher::css("button")
            .find(&doc)
            .unwrap()
            .into_iter()
            .filter(|s| validator.accepts(s))
            .collect();
        assert_eq!(ids(&accepted), vec!["wide"]);
    }

    #[test]
    fn test_strategy_roundtrips_through_json() {
        let strategy = SelectorStrategy::new("send-aria", Matcher::css(r#"button[aria-label="Send message"]"#))
            .priority(3)
            .hints(["send"]);
        let json = serde_json::to_value(&strategy).unwrap();
        assert_eq!(json["matcher"]["kind"], "css");
        let parsed: SelectorStrategy = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, strategy);
    }
}
