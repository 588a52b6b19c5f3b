//! Prompt assembly from page content.

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const TRUNCATION_NOTICE: &str = "...\n\n[Content truncated; see the original page for the full text]";

const SUMMARY_TEMPLATE: &str = "I want you to act as a summarization assistant. I will give you articles, reports, \
meeting notes, academic papers or other long-form text, and you will extract the key information into a concise, \
clear summary. Keep the core arguments, important figures, main conclusions and key details of the original, with \
a logical structure. Stay neutral and do not add opinions or interpretation. Scale the length to the complexity \
and importance of the content, usually 10-30% of the original. Keep necessary technical terms for specialist \
content.";

const TRANSLATE_TEMPLATE: &str = "I want you to act as a professional translation assistant. I will give you text or \
web pages to translate; provide an accurate, fluent translation that reads naturally in the target language. Keep \
the tone, style and meaning of the original. Choose the most fitting equivalents for terminology, idioms and \
culture-specific expressions. Where a passage is ambiguous, give the most reasonable reading. Reply with the \
translation only, without extra explanation.";

const OCR_PROMPT: &str = "Please recognize the text in this image and convert it into editable text. Keep the \
original layout structure.";

/// Which overlay action produced a prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ActionType {
    Summary,
    Translate,
    Search,
    Ocr,
    #[default]
    Default,
}

impl ActionType {
    /// Lenient parse used for inbound messages: anything unknown is `Default`
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "summary" => ActionType::Summary,
            "translate" => ActionType::Translate,
            "search" => ActionType::Search,
            "ocr" => ActionType::Ocr,
            _ => ActionType::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Summary => "summary",
            ActionType::Translate => "translate",
            ActionType::Search => "search",
            ActionType::Ocr => "ocr",
            ActionType::Default => "default",
        }
    }

    /// Only the OCR flow stops after injection, leaving the user to attach the image
    pub fn stops_after_injection(&self) -> bool {
        matches!(self, ActionType::Ocr)
    }
}

impl From<String> for ActionType {
    fn from(value: String) -> Self {
        ActionType::parse_lenient(&value)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readable content of a source page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub title: String,
    pub url: String,
    pub text: String,
}

/// Collapse whitespace runs and cap the length, appending a notice when cut
pub fn clean_text(raw: &str, max_chars: usize) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_NOTICE);
    truncated
}

fn require_length(action: ActionType, text: &str, minimum: usize) -> Result<()> {
    let length = text.trim().chars().count();
    if length < minimum {
        return Err(RelayError::ContentTooShort { action: action.as_str().to_string(), length, minimum });
    }
    Ok(())
}

fn with_source_link(prompt: String, url: &str) -> String {
    if url.is_empty() {
        prompt
    } else {
        format!("{}\n\nPage link: {}", prompt, url)
    }
}

/// Builds the prompt text for each action
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    min_summary_chars: usize,
    min_translate_chars: usize,
    max_content_chars: usize,
    target_language: String,
}

impl PromptBuilder {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            min_summary_chars: config.min_summary_chars,
            min_translate_chars: config.min_translate_chars,
            max_content_chars: config.max_content_chars,
            target_language: config.target_language.clone(),
        }
    }

    fn body(&self, page: &PageContent) -> String {
        format!(
            "Title: {}\nSource: {}\n\nContent:\n{}",
            page.title,
            page.url,
            clean_text(&page.text, self.max_content_chars)
        )
    }

    pub fn summary(&self, page: &PageContent) -> Result<String> {
        require_length(ActionType::Summary, &page.text, self.min_summary_chars)?;
        let prompt = format!("{}\n\nPlease summarize the following content:\n\n{}", SUMMARY_TEMPLATE, self.body(page));
        Ok(with_source_link(prompt, &page.url))
    }

    pub fn translate(&self, page: &PageContent) -> Result<String> {
        require_length(ActionType::Translate, &page.text, self.min_translate_chars)?;
        let prompt = format!(
            "{}\n\nPlease translate the following content into {}:\n\n{}",
            TRANSLATE_TEMPLATE,
            self.target_language,
            self.body(page)
        );
        Ok(with_source_link(prompt, &page.url))
    }

    pub fn search(&self, keyword: &str) -> Result<String> {
        let keyword = keyword.trim();
        require_length(ActionType::Search, keyword, 1)?;
        Ok(format!(
            "Please collect the latest information about \"{}\" and follow these rules: answer only from public data \
you actually retrieved with a search tool, never from built-in knowledge or speculation. Cite a clear source \
(news, official announcements, professional sites) for every important figure and fact, with a source note on \
each point. If something was not found through search or external sources, reply \"No data found\" or \
\"Insufficient information\" and do not fill the gap with assumptions.",
            keyword
        ))
    }

    pub fn ocr(&self, url: &str) -> String {
        with_source_link(OCR_PROMPT.to_string(), url)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(&RelayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn page(text: &str) -> PageContent {
        PageContent { title: "Title".into(), url: "https://example.com/a".into(), text: text.into() }
    }

    #[test]
    fn test_action_type_parses_leniently() {
        assert_eq!(ActionType::parse_lenient("Summary"), ActionType::Summary);
        assert_eq!(ActionType::parse_lenient("shout"), ActionType::Default);
        let parsed: ActionType = serde_json::from_str("\"whatever\"").unwrap();
        assert_eq!(parsed, ActionType::Default);
        assert_eq!(serde_json::to_string(&ActionType::Ocr).unwrap(), "\"ocr\"");
    }

    #[test]
    fn test_clean_text_collapses_and_truncates() {
        assert_eq!(clean_text("  a \n\n b\tc ", 100), "a b c");
        let cut = clean_text("abcdef", 3);
        assert!(cut.starts_with("abc..."));
        assert!(cut.contains("Content truncated"));
    }

    #[test]
    fn test_summary_requires_minimum_content() {
        let builder = PromptBuilder::default();
        let err = builder.summary(&page("too short")).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ContentTooShort));

        let prompt = builder.summary(&page(&"word ".repeat(20))).unwrap();
        assert!(prompt.contains("Please summarize"));
        assert!(prompt.ends_with("Page link: https://example.com/a"));
    }

    #[test]
    fn test_translate_names_target_language() {
        let config = RelayConfig { target_language: "German".into(), ..RelayConfig::default() };
        let prompt = PromptBuilder::new(&config).translate(&page("Hello world")).unwrap();
        assert!(prompt.contains("into German"));
    }

    #[test]
    fn test_search_has_no_link_and_rejects_blank() {
        let builder = PromptBuilder::default();
        let prompt = builder.search("  rust 2024 ").unwrap();
        assert!(prompt.contains("\"rust 2024\""));
        assert!(!prompt.contains("Page link"));
        assert!(builder.search("   ").is_err());
    }
}
