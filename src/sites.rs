//! Destination chat sites and their strategy tables.
//!
//! One table per site and role; each table lists every way we know of finding
//! the element, most specific first.

use crate::error::RelayError;
use crate::locator::{Matcher, Scoring, SelectorStrategy, SizeRange, Validator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Full `d` attribute of Claude's up-arrow send icon
pub const CLAUDE_SEND_ICON_PATH: &str = "M208.49,120.49a12,12,0,0,1-17,0L140,69V216a12,12,0,0,1-24,0V69L64.49,120.49a12,12,0,0,1-17-17l72-72a12,12,0,0,1,17,0l72,72A12,12,0,0,1,208.49,120.49Z";

/// Which element of the destination page a table finds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    Input,
    Send,
}

impl FromStr for TargetRole {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(TargetRole::Input),
            "send" => Ok(TargetRole::Send),
            other => Err(RelayError::InvalidArgument(format!("unknown target role '{}'", other))),
        }
    }
}

/// AI chat web app a prompt is relayed into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    #[default]
    Claude,
    Gemini,
}

impl Destination {
    pub fn display_name(&self) -> &'static str {
        match self {
            Destination::Claude => "Claude AI",
            Destination::Gemini => "Google Gemini",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Destination::Claude => "https://claude.ai/new",
            Destination::Gemini => "https://gemini.google.com/app",
        }
    }

    /// The other engine, for the toggle
    pub fn toggled(&self) -> Self {
        match self {
            Destination::Claude => Destination::Gemini,
            Destination::Gemini => Destination::Claude,
        }
    }

    /// URL to open for a prompt.
    ///
    /// Claude accepts a prefilled query in `?q=`, which pre-seeds the editor
    /// on pages that honor it; injection still runs and overwrites it.
    pub fn open_url(&self, prompt: &str) -> String {
        match self {
            Destination::Claude => format!("{}?q={}", self.base_url(), urlencoding::encode(prompt)),
            Destination::Gemini => self.base_url().to_string(),
        }
    }

    pub fn strategies(&self, role: TargetRole) -> Vec<SelectorStrategy> {
        match (self, role) {
            (Destination::Claude, TargetRole::Input) => claude_input(),
            (Destination::Claude, TargetRole::Send) => claude_send(),
            (Destination::Gemini, TargetRole::Input) => gemini_input(),
            (Destination::Gemini, TargetRole::Send) => gemini_send(),
        }
    }

    pub fn input_strategies(&self) -> Vec<SelectorStrategy> {
        self.strategies(TargetRole::Input)
    }

    pub fn send_strategies(&self) -> Vec<SelectorStrategy> {
        self.strategies(TargetRole::Send)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Destination::Claude => "claude",
            Destination::Gemini => "gemini",
        })
    }
}

impl FromStr for Destination {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(Destination::Claude),
            "gemini" => Ok(Destination::Gemini),
            other => Err(RelayError::InvalidArgument(format!("unknown engine '{}'", other))),
        }
    }
}

/// Assign priorities in declaration order
fn ranked(strategies: Vec<SelectorStrategy>) -> Vec<SelectorStrategy> {
    strategies
        .into_iter()
        .enumerate()
        .map(|(i, strategy)| strategy.priority(i as i32))
        .collect()
}

fn claude_input() -> Vec<SelectorStrategy> {
    ranked(vec![
        SelectorStrategy::new("claude-input-contenteditable", Matcher::css(r#"div[contenteditable="true"]"#))
            .scoring(Scoring::Bottommost),
        SelectorStrategy::new("claude-input-textarea", Matcher::css("textarea")).scoring(Scoring::Bottommost),
        SelectorStrategy::new("claude-input-textbox-role", Matcher::css(r#"[role="textbox"]"#)),
        SelectorStrategy::new("claude-input-testid", Matcher::css(r#"div[data-testid="chat-input"]"#)),
        SelectorStrategy::new("claude-input-any-editable", Matcher::Editable { selector: "[contenteditable]".into() })
            .scoring(Scoring::Bottommost),
    ])
}

fn claude_send() -> Vec<SelectorStrategy> {
    let icon_button = SizeRange::square(28.0, 40.0);
    ranked(vec![
        SelectorStrategy::new("claude-send-aria", Matcher::css(r#"button[aria-label="Send message"]"#)),
        SelectorStrategy::new(
            "claude-send-icon-exact",
            Matcher::SvgPath { container: "button".into(), fragments: vec![CLAUDE_SEND_ICON_PATH.into()], size: None },
        ),
        SelectorStrategy::new(
            "claude-send-icon-fragment",
            Matcher::SvgPath {
                container: "button".into(),
                fragments: vec!["208.49".into(), "120.49".into(), "L140,69V216".into()],
                size: Some(icon_button),
            },
        ),
        SelectorStrategy::new(
            "claude-send-icon-geometry",
            Matcher::Geometry { selector: "button".into(), size: icon_button, require_icon: true },
        )
        .hints(["send"])
        .scoring(Scoring::Bottommost),
    ])
}

fn gemini_input() -> Vec<SelectorStrategy> {
    let editor = Validator::default().with_min_size(100.0, 16.0);
    let selectors = [
        ("gemini-input-rich-textarea-editor", r#"rich-textarea div.ql-editor[contenteditable="true"]"#),
        ("gemini-input-editor-textbox", r#"div.ql-editor[role="textbox"][contenteditable="true"]"#),
        ("gemini-input-editor", r#"div.ql-editor[contenteditable="true"]"#),
        ("gemini-input-rich-textarea", r#"rich-textarea [contenteditable="true"]"#),
        ("gemini-input-textbox", r#"[role="textbox"][contenteditable="true"]"#),
        ("gemini-input-contenteditable", r#"div[contenteditable="true"]"#),
    ];
    let hints = ["prompt", "enter a prompt", "textbox"];
    let mut table: Vec<SelectorStrategy> = selectors
        .into_iter()
        .map(|(id, selector)| SelectorStrategy::new(id, Matcher::css(selector)).validator(editor).hints(hints))
        .collect();
    table.push(
        SelectorStrategy::new("gemini-input-any-editable", Matcher::Editable { selector: "[contenteditable]".into() })
            .validator(editor)
            .hints(hints)
            .scoring(Scoring::Bottommost),
    );
    ranked(table)
}

fn gemini_send() -> Vec<SelectorStrategy> {
    ranked(vec![
        SelectorStrategy::new("gemini-send-aria", Matcher::css(r#"button[aria-label*="Send message"]"#)),
        SelectorStrategy::new(
            "gemini-send-testid-title",
            Matcher::css(r#"button[data-testid*="send"], button[title*="Send"]"#),
        ),
        SelectorStrategy::new(
            "gemini-send-text",
            Matcher::Text {
                selector: r#"button, div[role="button"]"#.into(),
                needles: vec!["send".into(), "submit".into(), "傳送".into()],
            },
        ),
        SelectorStrategy::new(
            "gemini-send-icon-geometry",
            Matcher::Geometry { selector: "button".into(), size: SizeRange::square(20.0, 80.0), require_icon: true },
        )
        .scoring(Scoring::SmallestArea),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_destination_parsing_and_names() {
        assert_eq!("Gemini".parse::<Destination>().unwrap(), Destination::Gemini);
        assert_eq!(" claude ".parse::<Destination>().unwrap(), Destination::Claude);
        assert!("bard".parse::<Destination>().is_err());
        assert_eq!(Destination::Claude.display_name(), "Claude AI");
        assert_eq!(Destination::Gemini.toggled(), Destination::Claude);
    }

    #[test]
    fn test_open_url_prefills_claude_only() {
        assert_eq!(Destination::Claude.open_url("a b"), "https://claude.ai/new?q=a%20b");
        assert_eq!(Destination::Gemini.open_url("a b"), "https://gemini.google.com/app");
    }

    #[test]
    fn test_tables_have_unique_ordered_priorities() {
        for destination in [Destination::Claude, Destination::Gemini] {
            for role in [TargetRole::Input, TargetRole::Send] {
                let table = destination.strategies(role);
                assert!(!table.is_empty());
                let priorities: Vec<i32> = table.iter().map(|s| s.priority).collect();
                let expected: Vec<i32> = (0..table.len() as i32).collect();
                assert_eq!(priorities, expected);
            }
        }
    }

    #[test]
    fn test_every_selector_parses() {
        for destination in [Destination::Claude, Destination::Gemini] {
            for role in [TargetRole::Input, TargetRole::Send] {
                for strategy in destination.strategies(role) {
                    let selector = match &strategy.matcher {
                        Matcher::Css { selector } => selector,
                        Matcher::SvgPath { container, .. } => container,
                        Matcher::Geometry { selector, .. } => selector,
                        Matcher::Text { selector, .. } => selector,
                        Matcher::Editable { selector } => selector,
                    };
                    assert!(Selector::parse(selector).is_ok(), "{} failed to parse", strategy.id);
                }
            }
        }
    }
}
