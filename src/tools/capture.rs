use crate::capture::{CaptureArea, to_data_url};
use crate::error::Result;
use crate::tools::{NoParams, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Screenshot of the visible page as a PNG data URL
#[derive(Default)]
pub struct CaptureTabTool;

#[async_trait]
impl Tool for CaptureTabTool {
    type Params = NoParams;

    fn name(&self) -> &str {
        "captureTab"
    }

    async fn execute_typed(&self, _params: NoParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let png = context.require_capture()?.capture_png()?;
        Ok(ToolResult::success_with(serde_json::json!({ "dataUrl": to_data_url(&png) })))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaptureAreaParams {
    /// Region in CSS pixels; clamped to the visible page
    pub area: AreaParams,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct AreaParams {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl From<AreaParams> for CaptureArea {
    fn from(area: AreaParams) -> Self {
        CaptureArea::new(area.left, area.top, area.width, area.height)
    }
}

/// Screenshot of a region of the visible page as a PNG data URL
#[derive(Default)]
pub struct CaptureAreaTool;

#[async_trait]
impl Tool for CaptureAreaTool {
    type Params = CaptureAreaParams;

    fn name(&self) -> &str {
        "captureArea"
    }

    async fn execute_typed(&self, params: CaptureAreaParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let area = CaptureArea::from(params.area);
        let png = context.require_capture()?.capture_area_png(area)?;
        Ok(ToolResult::success_with(serde_json::json!({
            "dataUrl": to_data_url(&png),
            "area": area,
        })))
    }
}
