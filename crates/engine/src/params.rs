//! Parameter validation and multiplier scaling for engine requests.

use crate::{crop, EngineError, Result};
use core_types::{
    EngineRequest, ImageDimensions, ScaleMultiplier, TransformParameters, AUTO_WHITE_THRESHOLD,
};

/// Validate a parameter bag before any network call.
///
/// Crop containment is only checked when the source dimensions are known;
/// range checks always run. Errors surface verbatim and are never retried.
pub fn validate(params: &TransformParameters, source: Option<&ImageDimensions>) -> Result<()> {
    match params {
        TransformParameters::CanvasExtension {
            desired_height,
            padding_fraction,
            white_threshold,
        } => {
            if *desired_height == 0 {
                return Err(EngineError::OutOfRange {
                    field: "desired_height",
                    value: desired_height.to_string(),
                    expected: "a positive pixel height",
                });
            }
            if !(0.0..=1.0).contains(padding_fraction) {
                return Err(EngineError::OutOfRange {
                    field: "padding_fraction",
                    value: padding_fraction.to_string(),
                    expected: "0.0 to 1.0",
                });
            }
            if *white_threshold != AUTO_WHITE_THRESHOLD && !(0..=255).contains(white_threshold) {
                return Err(EngineError::OutOfRange {
                    field: "white_threshold",
                    value: white_threshold.to_string(),
                    expected: "0 to 255, or -1 for auto",
                });
            }
        }
        TransformParameters::ImageMatte {
            canvas_width,
            canvas_height,
            padding_percent,
            matte_color,
        } => {
            if *canvas_width == 0 || *canvas_height == 0 {
                return Err(EngineError::OutOfRange {
                    field: "canvas",
                    value: format!("{canvas_width}x{canvas_height}"),
                    expected: "positive canvas dimensions",
                });
            }
            // 50 is excluded: the content area collapses to zero there.
            if !(0.0..50.0).contains(padding_percent) {
                return Err(EngineError::OutOfRange {
                    field: "padding_percent",
                    value: padding_percent.to_string(),
                    expected: "0 to 50 (exclusive)",
                });
            }
            normalize_color(matte_color)?;
        }
        TransformParameters::Crop {
            area,
            output_width,
            output_height,
            scale,
        } => {
            if *output_width == 0 || *output_height == 0 {
                return Err(EngineError::OutOfRange {
                    field: "output",
                    value: format!("{output_width}x{output_height}"),
                    expected: "positive output dimensions",
                });
            }
            if !(*scale > 0.0) {
                return Err(EngineError::OutOfRange {
                    field: "scale",
                    value: scale.to_string(),
                    expected: "a positive factor",
                });
            }
            if area.width == 0 || area.height == 0 {
                return Err(EngineError::OutOfRange {
                    field: "crop",
                    value: format!("{}x{}", area.width, area.height),
                    expected: "positive crop dimensions",
                });
            }
            if let Some(dims) = source {
                if !crop::validate(area, dims) {
                    return Err(EngineError::CropOutOfBounds {
                        crop: *area,
                        bounds: *dims,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Normalize a matte color to lowercase `#rrggbb`. Accepts an optional
/// leading `#`.
pub fn normalize_color(raw: &str) -> Result<String> {
    let digits = raw.strip_prefix('#').unwrap_or(raw);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EngineError::InvalidColor(raw.to_string()));
    }
    Ok(format!("#{}", digits.to_ascii_lowercase()))
}

/// Validate, then scale into the wire request for the given multiplier.
///
/// Target dimensions scale by the multiplier; the originally-requested
/// width/height ride along so the engine can produce proportional output
/// without re-deriving geometry. Composition geometry (crop area, padding)
/// is never scaled.
pub fn build_request(
    params: &TransformParameters,
    source: Option<&ImageDimensions>,
    multiplier: ScaleMultiplier,
) -> Result<EngineRequest> {
    validate(params, source)?;
    let factor = multiplier.factor();

    let (scaled, requested_width, requested_height) = match params {
        TransformParameters::CanvasExtension {
            desired_height,
            padding_fraction,
            white_threshold,
        } => (
            TransformParameters::CanvasExtension {
                desired_height: desired_height * factor,
                padding_fraction: *padding_fraction,
                white_threshold: *white_threshold,
            },
            None,
            Some(*desired_height),
        ),
        TransformParameters::ImageMatte {
            canvas_width,
            canvas_height,
            padding_percent,
            matte_color,
        } => (
            TransformParameters::ImageMatte {
                canvas_width: canvas_width * factor,
                canvas_height: canvas_height * factor,
                padding_percent: *padding_percent,
                matte_color: normalize_color(matte_color)?,
            },
            Some(*canvas_width),
            Some(*canvas_height),
        ),
        TransformParameters::Crop {
            area,
            output_width,
            output_height,
            scale,
        } => (
            TransformParameters::Crop {
                area: *area,
                output_width: output_width * factor,
                output_height: output_height * factor,
                scale: scale * f64::from(factor),
            },
            Some(*output_width),
            Some(*output_height),
        ),
    };

    Ok(EngineRequest {
        parameters: scaled,
        requested_width,
        requested_height,
        scale_multiplier: factor,
    })
}
