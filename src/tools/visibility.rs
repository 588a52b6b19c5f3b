use crate::error::Result;
use crate::tools::{NoParams, Tool, ToolContext, ToolResult};
use async_trait::async_trait;

/// Flip whether the floating action buttons are shown
#[derive(Default)]
pub struct ToggleFloatingButtonsTool;

#[async_trait]
impl Tool for ToggleFloatingButtonsTool {
    type Params = NoParams;

    fn name(&self) -> &str {
        "toggleFloatingButtons"
    }

    async fn execute_typed(&self, _params: NoParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let state = context
            .require_state()?
            .update(|state| state.buttons_visible = !state.buttons_visible)?;
        log::info!("Floating buttons {}", if state.buttons_visible { "shown" } else { "hidden" });
        Ok(ToolResult::success_with(serde_json::json!({ "visible": state.buttons_visible })))
    }
}

#[derive(Default)]
pub struct GetFloatingButtonsStateTool;

#[async_trait]
impl Tool for GetFloatingButtonsStateTool {
    type Params = NoParams;

    fn name(&self) -> &str {
        "getFloatingButtonsState"
    }

    async fn execute_typed(&self, _params: NoParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let state = context.require_state()?.get()?;
        Ok(ToolResult::success_with(serde_json::json!({ "visible": state.buttons_visible })))
    }
}
