use crate::dom::TabDocument;
use crate::error::{RelayError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use headless_chrome::protocol::cdp::Page;
use image::ImageOutputFormat;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Rectangle of the visible page to capture, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CaptureArea {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Integer pixel rectangle clamped to an image of the given size, None when empty
    fn clamp_to(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let left = self.left.max(0.0).floor() as u32;
        let top = self.top.max(0.0).floor() as u32;
        let right = ((self.left + self.width).ceil().max(0.0) as u32).min(image_width);
        let bottom = ((self.top + self.height).ceil().max(0.0) as u32).min(image_height);
        if left >= right || top >= bottom {
            return None;
        }
        Some((left, top, right - left, bottom - top))
    }
}

impl std::str::FromStr for CaptureArea {
    type Err = RelayError;

    /// `left,top,width,height`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| RelayError::InvalidArgument(format!("invalid capture area '{}': {}", s, e)))?;
        match parts.as_slice() {
            [left, top, width, height] => Ok(Self::new(*left, *top, *width, *height)),
            _ => Err(RelayError::InvalidArgument(format!(
                "capture area '{}' must be left,top,width,height",
                s
            ))),
        }
    }
}

/// Source of PNG screenshots of the visible page
pub trait ScreenCapture: Send + Sync {
    fn capture_png(&self) -> Result<Vec<u8>>;

    fn capture_area_png(&self, area: CaptureArea) -> Result<Vec<u8>> {
        crop_png(&self.capture_png()?, area)
    }
}

impl ScreenCapture for TabDocument {
    fn capture_png(&self) -> Result<Vec<u8>> {
        self.tab()
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| RelayError::ScreenshotFailed(e.to_string()))
    }
}

/// Crop a PNG to an area, clamped to the image bounds
pub fn crop_png(png: &[u8], area: CaptureArea) -> Result<Vec<u8>> {
    let image = image::load_from_memory(png)
        .map_err(|e| RelayError::ScreenshotFailed(format!("Failed to decode screenshot: {}", e)))?;

    let (x, y, width, height) = area
        .clamp_to(image.width(), image.height())
        .ok_or_else(|| RelayError::InvalidArgument(format!("capture area {:?} lies outside the page", area)))?;

    let mut buffer = Cursor::new(Vec::new());
    image
        .crop_imm(x, y, width, height)
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .map_err(|e| RelayError::ScreenshotFailed(format!("Failed to encode screenshot: {}", e)))?;
    Ok(buffer.into_inner())
}

pub fn to_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Decode a `data:image/png;base64,` URL back into bytes
pub fn from_data_url(data_url: &str) -> Result<Vec<u8>> {
    let encoded = data_url
        .split_once(";base64,")
        .map(|(_, data)| data)
        .ok_or_else(|| RelayError::InvalidArgument("not a base64 data URL".to_string()))?;
    STANDARD
        .decode(encoded)
        .map_err(|e| RelayError::InvalidArgument(format!("invalid base64 image data: {}", e)))
}
