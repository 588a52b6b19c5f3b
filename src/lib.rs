//! # prompt-relay
//!
//! Relay page summaries, translations, searches and OCR prompts into AI chat web
//! apps (Claude AI, Google Gemini) by driving Chrome over the DevTools Protocol.
//!
//! The chat pages are third-party markup that changes without notice, so the
//! crate never trusts a single selector: each element is found through a ranked
//! list of strategies polled until a deadline, and every action is followed by a
//! check of its visible effect.
//!
//! ## Relaying a prompt
//!
//! ```rust,no_run
//! use prompt_relay::{BrowserSession, LaunchOptions, PromptRelay, RelayConfig, RelayRequest, Consent};
//! use prompt_relay::{ActionType, Destination, LogNotifier};
//! use std::sync::Arc;
//!
//! # async fn run() -> prompt_relay::Result<()> {
//! let session = BrowserSession::launch(LaunchOptions::new().headless(false))?;
//! let page = session.open_destination(Destination::Gemini, "hello")?;
//!
//! let relay = PromptRelay::new(RelayConfig::default(), Arc::new(LogNotifier));
//! let request = RelayRequest::new("hello", ActionType::Default, Destination::Gemini)
//!     .authorize(Consent::command_line());
//!
//! let report = relay.relay(&page, request).await;
//! println!("{}", report.state.name());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`locator`]: strategies, scoring and the deadline-bounded `locate` loop
//! - [`dispatch`]: text injection and activation with effect verification
//! - [`relay`]: the consent-gated, at-most-once relay state machine
//! - [`sites`]: strategy tables for each destination
//! - [`dom`]: the `Document` seam, with in-memory and live-tab backends
//! - [`browser`]: Chrome session management
//! - [`tools`]: inbound message handlers
//! - [`prompt`], [`capture`], [`state`], [`config`], [`error`]

pub mod browser;
pub mod capture;
pub mod config;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod locator;
pub mod prompt;
pub mod relay;
pub mod sites;
pub mod state;
pub mod tools;

pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
pub use capture::{CaptureArea, ScreenCapture};
pub use config::RelayConfig;
pub use dispatch::{ActionDispatcher, ActionOutcome, EffectPredicate, InputCleared};
pub use dom::{Document, ElementHandle, ElementNode, ElementSnapshot, MemoryDocument, TabDocument};
pub use error::{ErrorKind, RelayError, Result};
pub use locator::{Candidate, LocateOptions, LocateResult, SelectorStrategy, diagnose, locate};
pub use prompt::{ActionType, PageContent, PromptBuilder};
pub use relay::{
    Consent, Fingerprint, LogNotifier, Notifier, ProcessedFingerprintSet, PromptRelay, RecordingNotifier,
    RelayReport, RelayRequest, RelayState,
};
pub use sites::{Destination, TargetRole};
pub use state::{PersistedState, StateStore};
pub use tools::{Tool, ToolContext, ToolRegistry, ToolResult};
