//! Output format selection for re-encoded images.

use anyhow::{anyhow, Result};
use image::ImageFormat;

/// Content-type subtypes that carry no usable format information.
const GENERIC_SUBTYPES: [&str; 4] = ["octet-stream", "x-octet-stream", "binary", "unknown"];

/// Pick the encode format from the stored content type.
///
/// Generic content types fall back to the format the decoder detected,
/// and an empty content type falls back to JPEG. A subtype the encoder
/// does not support is an error.
pub fn resolve_output_format(
    content_type: &str,
    detected: Option<ImageFormat>,
) -> Result<ImageFormat> {
    let subtype = content_type
        .rsplit('/')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if subtype.is_empty() {
        return Ok(ImageFormat::Jpeg);
    }
    if GENERIC_SUBTYPES.contains(&subtype.as_str()) {
        return Ok(detected.unwrap_or(ImageFormat::Jpeg));
    }

    ImageFormat::from_extension(&subtype)
        .ok_or_else(|| anyhow!("Unsupported output format: {}", subtype))
}
