use crate::capture::from_data_url;
use crate::error::Result;
use crate::prompt::ActionType;
use crate::relay::{Consent, RelayRequest, RelayState};
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters of an `autoInputPrompt` message
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoInputPromptParams {
    /// Prompt text to enter into the chat input
    pub prompt: String,

    /// summary, translate, search, ocr or default; anything else is treated as default
    #[serde(default)]
    pub action_type: Option<String>,

    /// Screenshot data URL accompanying an OCR prompt
    #[serde(default)]
    pub image_data: Option<String>,
}

/// Relays a prompt into the destination page.
///
/// Receiving this message is the user's consent: it is only ever sent in
/// response to a user action.
#[derive(Default)]
pub struct AutoInputPromptTool;

#[async_trait]
impl Tool for AutoInputPromptTool {
    type Params = AutoInputPromptParams;

    fn name(&self) -> &str {
        "autoInputPrompt"
    }

    async fn execute_typed(&self, params: AutoInputPromptParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let action_type = params
            .action_type
            .as_deref()
            .map(ActionType::parse_lenient)
            .unwrap_or_default();

        let mut request =
            RelayRequest::new(params.prompt, action_type, context.destination).authorize(Consent::inbound_message());
        if let Some(image) = params.image_data {
            let bytes = from_data_url(&image)?;
            log::debug!("Prompt carries a {} byte screenshot", bytes.len());
            request = request.with_image(image);
        }

        let report = context.relay.relay(context.document, request).await;
        let data = serde_json::json!({
            "state": report.state.name(),
            "fingerprint": report.fingerprint,
            "transitions": report.transitions.iter().map(RelayState::name).collect::<Vec<_>>(),
        });

        let result = match report.state {
            RelayState::Verified => ToolResult::success_with(data),
            // Nothing left to do for a prompt that was already relayed
            RelayState::Duplicate => ToolResult::success_with(data),
            RelayState::Failed(kind) => ToolResult::failure(format!("relay failed: {}", kind))
                .with_kind(kind)
                .with_data(data),
            other => ToolResult::failure(format!("relay stopped in state {}", other.name())).with_data(data),
        };
        Ok(result)
    }
}
