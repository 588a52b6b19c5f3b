use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the browser plumbing and the relay infrastructure
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Script evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Tool '{tool}' failed: {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Not enough content to {action}: {length} chars, need at least {minimum}")]
    ContentTooShort { action: String, length: usize, minimum: usize },

    #[error("State store error: {0}")]
    StateStore(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RelayError {
    /// Map an infrastructure error onto the user-facing taxonomy, where one applies
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RelayError::ScreenshotFailed(_) => Some(ErrorKind::PermissionDenied),
            RelayError::ElementNotFound(_) => Some(ErrorKind::TargetNotFound),
            RelayError::ContentTooShort { .. } => Some(ErrorKind::ContentTooShort),
            _ => None,
        }
    }
}

/// Terminal failure categories surfaced by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No strategy matched before the deadline
    TargetNotFound,
    /// Text could not be verified in the target
    InjectionFailed,
    /// A send action was dispatched but delivery was never observed
    ActivationUnverified,
    /// The source page yielded too little text
    ContentTooShort,
    /// Screenshot or clipboard access was refused
    PermissionDenied,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TargetNotFound => "TargetNotFound",
            ErrorKind::InjectionFailed => "InjectionFailed",
            ErrorKind::ActivationUnverified => "ActivationUnverified",
            ErrorKind::ContentTooShort => "ContentTooShort",
            ErrorKind::PermissionDenied => "PermissionDenied",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
