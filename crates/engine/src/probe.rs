//! Source-dimension probing.

use crate::{EngineError, Result};
use core_types::ImageDimensions;
use image::ImageReader;
use std::io::Cursor;

/// Decode just enough of an image header to learn its pixel dimensions.
///
/// Used to establish crop bounds before any geometry is accepted; the result
/// is never persisted.
pub fn probe_dimensions(bytes: &[u8]) -> Result<ImageDimensions> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| EngineError::Decode(e.to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| EngineError::Decode(e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(EngineError::Decode(format!(
            "degenerate dimensions {width}x{height}"
        )));
    }
    Ok(ImageDimensions { width, height })
}
