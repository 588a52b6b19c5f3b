//! Inbound message handlers.
//!
//! Each message is a JSON object whose `action` field names a tool; the rest of
//! the object is the tool's parameters. Responses always carry `success`.

pub mod capture;
pub mod relay_prompt;
pub mod visibility;

pub use capture::{CaptureAreaParams, CaptureAreaTool, CaptureTabTool};
pub use relay_prompt::{AutoInputPromptParams, AutoInputPromptTool};
pub use visibility::{GetFloatingButtonsStateTool, ToggleFloatingButtonsTool};

use crate::capture::ScreenCapture;
use crate::dom::Document;
use crate::error::{ErrorKind, RelayError, Result};
use crate::relay::PromptRelay;
use crate::sites::Destination;
use crate::state::StateStore;
use async_trait::async_trait;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Parameters of handlers that take none
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoParams {}

/// Everything a handler may act on
pub struct ToolContext<'a> {
    /// The destination chat page
    pub document: &'a dyn Document,
    pub relay: &'a PromptRelay,
    pub destination: Destination,
    /// Screenshot source (the page the user is reading)
    pub capture: Option<&'a dyn ScreenCapture>,
    pub state: Option<&'a StateStore>,
}

impl<'a> ToolContext<'a> {
    pub fn new(document: &'a dyn Document, relay: &'a PromptRelay, destination: Destination) -> Self {
        Self { document, relay, destination, capture: None, state: None }
    }

    pub fn with_capture(mut self, capture: &'a dyn ScreenCapture) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_state(mut self, state: &'a StateStore) -> Self {
        self.state = Some(state);
        self
    }

    pub fn require_capture(&self) -> Result<&'a dyn ScreenCapture> {
        self.capture
            .ok_or_else(|| RelayError::ScreenshotFailed("no page available to capture".to_string()))
    }

    pub fn require_state(&self) -> Result<&'a StateStore> {
        self.state
            .ok_or_else(|| RelayError::StateStore("no state store configured".to_string()))
    }
}

/// Outcome of one handler call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ToolResult {
    pub fn success() -> Self {
        Self { success: true, data: None, error: None, error_kind: None }
    }

    pub fn success_with(data: Value) -> Self {
        Self { success: true, data: Some(data), error: None, error_kind: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()), error_kind: None }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    /// Flatten into a message response: `success`, the data fields, then `error`/`errorKind`
    pub fn into_response(self) -> Value {
        let mut response = Map::new();
        response.insert("success".to_string(), Value::Bool(self.success));
        if let Some(Value::Object(fields)) = self.data {
            response.extend(fields);
        } else if let Some(other) = self.data {
            response.insert("data".to_string(), other);
        }
        if let Some(error) = self.error {
            response.insert("error".to_string(), Value::String(error));
        }
        if let Some(kind) = self.error_kind {
            response.insert("errorKind".to_string(), Value::String(kind.as_str().to_string()));
        }
        Value::Object(response)
    }
}

impl From<RelayError> for ToolResult {
    fn from(e: RelayError) -> Self {
        let kind = e.kind();
        let result = ToolResult::failure(e.to_string());
        match kind {
            Some(kind) => result.with_kind(kind),
            None => result,
        }
    }
}

/// A typed message handler
#[async_trait]
pub trait Tool: Send + Sync {
    type Params: DeserializeOwned + JsonSchema + Send;

    /// The `action` value this tool answers
    fn name(&self) -> &str;

    async fn execute_typed(&self, params: Self::Params, context: &mut ToolContext<'_>) -> Result<ToolResult>;

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(Self::Params)).unwrap_or(Value::Null)
    }
}

/// Object-safe view of a [`Tool`], used by the registry
#[async_trait]
pub trait DynTool: Send + Sync {
    fn name(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    async fn execute(&self, params: Value, context: &mut ToolContext<'_>) -> Result<ToolResult>;
}

#[async_trait]
impl<T: Tool> DynTool for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn parameters_schema(&self) -> Value {
        Tool::parameters_schema(self)
    }

    async fn execute(&self, params: Value, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let typed: T::Params = serde_json::from_value(params).map_err(|e| RelayError::InvalidArgument(format!(
            "invalid parameters for {}: {}",
            Tool::name(self),
            e
        )))?;
        self.execute_typed(typed, context).await
    }
}

/// Handlers by action name
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn DynTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(AutoInputPromptTool);
        registry.register(CaptureTabTool);
        registry.register(CaptureAreaTool);
        registry.register(ToggleFloatingButtonsTool);
        registry.register(GetFloatingButtonsStateTool);
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(Tool::name(&tool).to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn DynTool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub async fn execute(&self, name: &str, params: Value, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let tool = self.get(name).ok_or_else(|| RelayError::UnknownAction(name.to_string()))?;
        log::debug!("Executing {}", name);
        tool.execute(params, context).await
    }

    /// Dispatch one inbound message on its `action` field and build the response
    pub async fn handle_message(&self, message: Value, context: &mut ToolContext<'_>) -> Value {
        let Value::Object(mut fields) = message else {
            return Self::malformed_message("expected a JSON object");
        };
        let Some(Value::String(action)) = fields.remove("action") else {
            return Self::malformed_message("no action");
        };

        match self.execute(&action, Value::Object(fields), context).await {
            Ok(result) => result.into_response(),
            Err(e) => {
                log::warn!("Message {} failed: {}", action, e);
                ToolResult::from(e).into_response()
            }
        }
    }

    /// Response for a message that is not valid JSON or carries no action
    pub fn malformed_message(reason: &str) -> Value {
        ToolResult::failure(format!("malformed message: {}", reason)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_malformed_message_response() {
        let response = ToolRegistry::malformed_message("expected value at line 1 column 1");
        assert_eq!(response["success"], false);
        assert_eq!(response["error"], "malformed message: expected value at line 1 column 1");
        assert!(response.get("errorKind").is_none());
    }

    #[test]
    fn test_response_flattens_data() {
        let response = ToolResult::success_with(json!({ "visible": false })).into_response();
        assert_eq!(response, json!({ "success": true, "visible": false }));

        let response = ToolResult::from(RelayError::ScreenshotFailed("denied".into())).into_response();
        assert_eq!(response["success"], false);
        assert_eq!(response["errorKind"], "PermissionDenied");
    }

    #[test]
    fn test_default_registry_names() {
        let registry = ToolRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec![
                "autoInputPrompt",
                "captureTab",
                "captureArea",
                "toggleFloatingButtons",
                "getFloatingButtonsState"
            ]
        );
        for name in registry.names() {
            assert!(registry.get(name).unwrap().parameters_schema().is_object());
        }
    }
}
