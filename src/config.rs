use crate::error::Result;
use crate::locator::LocateOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Timings and limits of the relay pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// How long to look for the chat input
    pub input_deadline_ms: u64,
    /// How long to look for the send control
    pub send_deadline_ms: u64,
    pub poll_interval_ms: u64,
    /// Wait between an action and checking its effect
    pub settle_ms: u64,
    /// Wait after injection before looking for the send control
    pub post_inject_delay_ms: u64,
    /// Extra wait after the destination page reports loaded
    pub page_load_grace_ms: u64,
    pub fingerprint_capacity: usize,
    pub min_summary_chars: usize,
    pub min_translate_chars: usize,
    pub max_content_chars: usize,
    pub target_language: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            input_deadline_ms: 30_000,
            send_deadline_ms: 10_000,
            poll_interval_ms: 500,
            settle_ms: 300,
            post_inject_delay_ms: 1_500,
            page_load_grace_ms: 2_000,
            fingerprint_capacity: 10,
            min_summary_chars: 50,
            min_translate_chars: 10,
            max_content_chars: 8_000,
            target_language: "Traditional Chinese".to_string(),
        }
    }
}

impl RelayConfig {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: RelayConfig = serde_json::from_str(&raw)?;
        log::debug!("Loaded relay config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn input_locate(&self) -> LocateOptions {
        LocateOptions::from_millis(self.input_deadline_ms, self.poll_interval_ms)
    }

    pub fn send_locate(&self) -> LocateOptions {
        LocateOptions::from_millis(self.send_deadline_ms, self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn post_inject_delay(&self) -> Duration {
        Duration::from_millis(self.post_inject_delay_ms)
    }

    pub fn page_load_grace(&self) -> Duration {
        Duration::from_millis(self.page_load_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "input_deadline_ms": 5000, "target_language": "English" }}"#).unwrap();

        let config = RelayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.input_deadline_ms, 5000);
        assert_eq!(config.target_language, "English");
        assert_eq!(config.send_deadline_ms, 10_000);
        assert_eq!(config.input_locate().poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(RelayConfig::from_file("/nonexistent/prompt-relay.json").is_err());
    }
}
