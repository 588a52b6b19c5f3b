//! The prompt relay: one consented request, pushed through locate, inject and
//! activate against the destination page, at most once per prompt.

pub mod fingerprint;
pub mod notify;

pub use fingerprint::{Fingerprint, ProcessedFingerprintSet};
pub use notify::{LogNotifier, MultiNotifier, Notifier, PageAlertNotifier, RecordingNotifier};

use crate::capture::from_data_url;
use crate::config::RelayConfig;
use crate::dispatch::{ActionDispatcher, InputCleared};
use crate::dom::Document;
use crate::error::{ErrorKind, Result};
use crate::locator::locate;
use crate::prompt::ActionType;
use crate::sites::Destination;
use crate::state::StateStore;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::time::sleep;

/// Which user-triggered entry point granted consent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentOrigin {
    CommandLine,
    InboundMessage,
}

/// Explicit permission to act on the destination page, attached by the entry
/// point the user invoked. There is no other way to authorize a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consent {
    origin: ConsentOrigin,
}

impl Consent {
    pub fn command_line() -> Self {
        Self { origin: ConsentOrigin::CommandLine }
    }

    pub fn inbound_message() -> Self {
        Self { origin: ConsentOrigin::InboundMessage }
    }

    pub fn origin(&self) -> ConsentOrigin {
        self.origin
    }
}

/// A prompt to relay; consumed by [`PromptRelay::relay`]
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub prompt_text: String,
    pub action_type: ActionType,
    pub destination: Destination,
    pub authorized: Option<Consent>,
    pub fingerprint: Fingerprint,
    /// Screenshot data URL accompanying an OCR prompt
    pub image_data: Option<String>,
}

impl RelayRequest {
    pub fn new(prompt_text: impl Into<String>, action_type: ActionType, destination: Destination) -> Self {
        let prompt_text = prompt_text.into();
        let fingerprint = Fingerprint::of(&prompt_text);
        Self { prompt_text, action_type, destination, authorized: None, fingerprint, image_data: None }
    }

    pub fn authorize(mut self, consent: Consent) -> Self {
        self.authorized = Some(consent);
        self
    }

    pub fn with_image(mut self, data_url: impl Into<String>) -> Self {
        self.image_data = Some(data_url.into());
        self
    }
}

/// Lifecycle of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error_kind")]
pub enum RelayState {
    Created,
    Authorized,
    Located,
    Injected,
    Verified,
    Failed(ErrorKind),
    /// The prompt was already relayed; nothing was done
    Duplicate,
    /// No consent was attached; nothing was done
    Rejected,
}

impl RelayState {
    pub fn name(&self) -> &'static str {
        match self {
            RelayState::Created => "Created",
            RelayState::Authorized => "Authorized",
            RelayState::Located => "Located",
            RelayState::Injected => "Injected",
            RelayState::Verified => "Verified",
            RelayState::Failed(_) => "Failed",
            RelayState::Duplicate => "Duplicate",
            RelayState::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayState::Verified | RelayState::Failed(_) | RelayState::Duplicate | RelayState::Rejected)
    }
}

/// What happened to one request
#[derive(Debug, Clone, Serialize)]
pub struct RelayReport {
    pub state: RelayState,
    /// Every state entered, in order
    pub transitions: Vec<RelayState>,
    pub fingerprint: Fingerprint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Strategy that located the input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_source: Option<String>,
    /// Strategy that located the send control, if one was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_source: Option<String>,
}

impl RelayReport {
    fn start(fingerprint: Fingerprint) -> Self {
        Self {
            state: RelayState::Created,
            transitions: vec![RelayState::Created],
            fingerprint,
            error_kind: None,
            input_source: None,
            send_source: None,
        }
    }

    fn enter(&mut self, state: RelayState) {
        log::info!("Relay {}: {} -> {}", self.fingerprint, self.state.name(), state.name());
        self.state = state;
        self.transitions.push(state);
        if let RelayState::Failed(kind) = state {
            self.error_kind = Some(kind);
        }
    }

    pub fn is_verified(&self) -> bool {
        self.state == RelayState::Verified
    }
}

/// Runs consented requests against a destination page
pub struct PromptRelay {
    config: RelayConfig,
    dispatcher: ActionDispatcher,
    processed: Mutex<ProcessedFingerprintSet>,
    notifier: Arc<dyn Notifier>,
    store: Option<Arc<StateStore>>,
}

impl PromptRelay {
    pub fn new(config: RelayConfig, notifier: Arc<dyn Notifier>) -> Self {
        let dispatcher = ActionDispatcher::new(config.settle());
        let processed = Mutex::new(ProcessedFingerprintSet::new(config.fingerprint_capacity));
        Self { config, dispatcher, processed, notifier, store: None }
    }

    /// Restore processed fingerprints from the store and persist new ones to it
    pub fn with_store(mut self, store: Arc<StateStore>) -> Result<Self> {
        let restored = store.get()?.processed;
        log::debug!("Restored {} processed fingerprint(s)", restored.len());
        self.processed = Mutex::new(ProcessedFingerprintSet::from_entries(self.config.fingerprint_capacity, restored));
        self.store = Some(store);
        Ok(self)
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn is_processed(&self, fingerprint: &Fingerprint) -> bool {
        self.processed.lock().map(|set| set.contains(fingerprint)).unwrap_or(false)
    }

    /// Check and record the fingerprint in one critical section.
    /// Returns false when it was already processed.
    fn claim(&self, fingerprint: &Fingerprint) -> bool {
        let entries = {
            let mut set = match self.processed.lock() {
                Ok(set) => set,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !set.insert(fingerprint.clone()) {
                return false;
            }
            set.entries()
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.update(|state| state.processed = entries) {
                log::warn!("Could not persist processed fingerprints: {}", e);
            }
        }
        true
    }

    fn fail(&self, report: &mut RelayReport, request: &RelayRequest, kind: ErrorKind) {
        report.enter(RelayState::Failed(kind));
        self.notifier.notify(&failure_message(request.destination, kind, &request.prompt_text));
    }

    /// Relay one request. Every failure notifies the user with the prompt text.
    pub async fn relay(&self, document: &dyn Document, request: RelayRequest) -> RelayReport {
        let mut report = RelayReport::start(request.fingerprint.clone());

        if request.authorized.is_none() {
            log::warn!("Relay {} has no consent attached; ignoring it", request.fingerprint);
            report.enter(RelayState::Rejected);
            return report;
        }

        if !self.claim(&request.fingerprint) {
            report.enter(RelayState::Duplicate);
            return report;
        }
        report.enter(RelayState::Authorized);

        let destination = request.destination;
        let input = match locate(document, &destination.input_strategies(), self.config.input_locate()).await {
            Ok(result) => match result.element {
                Some(candidate) => candidate,
                None => {
                    log::warn!(
                        "No input box on {} after {} attempts in {} ms",
                        destination.display_name(),
                        result.attempts_made,
                        result.elapsed_ms
                    );
                    self.fail(&mut report, &request, ErrorKind::TargetNotFound);
                    return report;
                }
            },
            Err(e) => {
                log::warn!("Input lookup failed: {}", e);
                self.fail(&mut report, &request, ErrorKind::TargetNotFound);
                return report;
            }
        };
        report.input_source = Some(input.source.clone());
        report.enter(RelayState::Located);

        let injected = self.dispatcher.inject_text(document, &input.element, &request.prompt_text).await;
        if !injected.verified_effect {
            self.fail(&mut report, &request, injected.error_kind.unwrap_or(ErrorKind::InjectionFailed));
            return report;
        }
        report.enter(RelayState::Injected);

        if request.action_type.stops_after_injection() {
            self.notifier.notify(&ocr_notice(destination, request.image_data.as_deref()));
            report.enter(RelayState::Verified);
            return report;
        }

        sleep(self.config.post_inject_delay()).await;

        let send = match locate(document, &destination.send_strategies(), self.config.send_locate()).await {
            Ok(result) => result.element,
            Err(e) => {
                log::warn!("Send control lookup failed: {}", e);
                None
            }
        };
        let target = match send {
            Some(candidate) => {
                report.send_source = Some(candidate.source.clone());
                candidate.element
            }
            None => {
                log::info!("No send control found; committing from the input box");
                input.element.clone()
            }
        };

        let activated = self
            .dispatcher
            .activate(document, &target, &InputCleared::new(input.element.handle.clone()))
            .await;
        if !activated.verified_effect {
            self.fail(&mut report, &request, ErrorKind::ActivationUnverified);
            return report;
        }

        report.enter(RelayState::Verified);
        report
    }
}

/// User-facing text for a failed relay; always carries the prompt so it can be pasted by hand
pub fn failure_message(destination: Destination, kind: ErrorKind, prompt: &str) -> String {
    let reason = match kind {
        ErrorKind::TargetNotFound => "could not find the chat input",
        ErrorKind::InjectionFailed => "could not enter the prompt",
        ErrorKind::ActivationUnverified => "could not confirm the prompt was sent",
        ErrorKind::ContentTooShort => "there was not enough page content",
        ErrorKind::PermissionDenied => "the browser refused access",
    };
    format!(
        "Automatic input into {} failed: {} ({}). Please copy this prompt manually:\n\n{}",
        destination.display_name(),
        reason,
        kind,
        prompt
    )
}

/// Notice shown once an OCR prompt sits in the input; the screenshot still has to be attached by hand
pub fn ocr_notice(destination: Destination, image_data: Option<&str>) -> String {
    let screenshot = match image_data.map(from_data_url) {
        Some(Ok(bytes)) => format!("the captured screenshot ({} KB)", bytes.len().div_ceil(1024)),
        Some(Err(e)) => {
            log::warn!("Screenshot attached to the OCR prompt is unreadable: {}", e);
            "a screenshot of the text".to_string()
        }
        None => "a screenshot of the text".to_string(),
    };
    format!("OCR prompt entered into {}. Attach {} and send it.", destination.display_name(), screenshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocr_notice_reflects_attached_screenshot() {
        let with_image = ocr_notice(Destination::Claude, Some("data:image/png;base64,iVBORw0KGgo="));
        assert_eq!(with_image, "OCR prompt entered into Claude AI. Attach the captured screenshot (1 KB) and send it.");

        let without = ocr_notice(Destination::Gemini, None);
        assert!(without.contains("Attach a screenshot of the text"));
        assert_eq!(ocr_notice(Destination::Gemini, Some("not a data url")), without);
    }

    #[test]
    fn test_request_fingerprint_follows_prompt() {
        let a = RelayRequest::new("hello", ActionType::Default, Destination::Claude);
        let b = RelayRequest::new("hello", ActionType::Summary, Destination::Gemini);
        assert_eq!(a.fingerprint, b.fingerprint);
        assert!(a.authorized.is_none());
        assert_eq!(
            a.authorize(Consent::command_line()).authorized.map(|c| c.origin()),
            Some(ConsentOrigin::CommandLine)
        );
    }

    #[test]
    fn test_failure_message_carries_prompt() {
        let message = failure_message(Destination::Gemini, ErrorKind::TargetNotFound, "hello there");
        assert!(message.contains("Google Gemini"));
        assert!(message.ends_with("hello there"));
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(RelayState::Failed(ErrorKind::InjectionFailed)).unwrap();
        assert_eq!(json["state"], "Failed");
        assert_eq!(json["error_kind"], "InjectionFailed");
        assert!(RelayState::Duplicate.is_terminal());
        assert!(!RelayState::Located.is_terminal());
    }
}
