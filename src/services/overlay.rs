use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// True when the payload is a browser canvas export we should persist
/// (`data:image/...`). Anything else is ignored by the autosave paths.
pub(crate) fn is_image_data_url(value: &str) -> bool {
    value.starts_with("data:image")
}

/// Decode the base64 payload of an image data URL
/// (`data:image/png;base64,<payload>`), yielding the raw image bytes.
pub(crate) fn decode_image_data_url(value: &str) -> Result<Vec<u8>> {
    if !is_image_data_url(value) {
        return Err(anyhow!("Not an image data URL"));
    }

    let payload = value
        .split_once(',')
        .map(|(_, payload)| payload)
        .ok_or_else(|| anyhow!("Image data URL has no payload"))?;

    STANDARD.decode(payload.trim()).context("Invalid base64 image payload")
}
