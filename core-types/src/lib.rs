use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel accepted by the canvas-extension engine in place of an explicit
/// white threshold; the engine then samples the frame itself. Passed through
/// opaquely, never interpreted locally.
pub const AUTO_WHITE_THRESHOLD: i32 = -1;

/// A gallery image as the CMS references it. Identity is `id`; `url` is a
/// delivery-network locator that may end in a variant token. The gallery owns
/// the record; the transform pipeline never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ImageRef {
    /// String view of a metadata value, if present and textual.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Pixel dimensions probed from a decoded image. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Rectangular crop region in source-pixel coordinates.
///
/// Valid only while `x + width <= source.width` and
/// `y + height <= source.height`; see `engine::crop::validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The three transform kinds dispatched through one invocation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    CanvasExtension,
    ImageMatte,
    Crop,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::CanvasExtension => "canvas-extension",
            TransformKind::ImageMatte => "image-matte",
            TransformKind::Crop => "crop",
        }
    }
}

/// Transform-specific parameter bag, as entered by the user (base resolution,
/// unscaled). Field names follow the processing engine's wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TransformParameters {
    CanvasExtension {
        desired_height: u32,
        padding_fraction: f64,
        /// 0-255, or [`AUTO_WHITE_THRESHOLD`].
        white_threshold: i32,
    },
    ImageMatte {
        canvas_width: u32,
        canvas_height: u32,
        padding_percent: f64,
        /// Six hex digits, optionally `#`-prefixed.
        matte_color: String,
    },
    Crop {
        area: CropArea,
        output_width: u32,
        output_height: u32,
        scale: f64,
    },
}

impl TransformParameters {
    pub fn kind(&self) -> TransformKind {
        match self {
            TransformParameters::CanvasExtension { .. } => TransformKind::CanvasExtension,
            TransformParameters::ImageMatte { .. } => TransformKind::ImageMatte,
            TransformParameters::Crop { .. } => TransformKind::Crop,
        }
    }
}

/// Output-resolution multiplier. Scales the transform's target dimensions
/// without changing its crop/composition geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMultiplier {
    #[default]
    One,
    Two,
    Four,
}

impl ScaleMultiplier {
    pub fn factor(&self) -> u32 {
        match self {
            ScaleMultiplier::One => 1,
            ScaleMultiplier::Two => 2,
            ScaleMultiplier::Four => 4,
        }
    }
}

/// The scaled parameter bag sent to the remote engine. Built by
/// `engine::params::build_request` only; carries the originally-requested
/// dimensions so the engine can compute proportional output without
/// re-deriving geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineRequest {
    #[serde(flatten)]
    pub parameters: TransformParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_height: Option<u32>,
    pub scale_multiplier: u32,
}

impl EngineRequest {
    pub fn kind(&self) -> TransformKind {
        self.parameters.kind()
    }
}

/// Where a transform result lives for the duration of a preview/commit
/// round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProcessedPayload {
    Url(String),
    Bytes(Vec<u8>),
}

/// Ephemeral result of a preview or commit-path transform. Exists only for
/// the life of the round trip; never stored by the gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedImage {
    pub source_image_id: String,
    pub payload: ProcessedPayload,
    pub dimensions: Option<ImageDimensions>,
    pub elapsed_ms: u64,
}

/// One entry of a gallery's persisted ordering. After any successful reorder
/// the `order` values form a dense 0-based permutation of the image set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedImageEntry {
    pub image_id: String,
    pub order: u32,
}

/// Per-item batch state. Terminal once `Completed` or `Failed` within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed(String),
}

impl ProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Completed | ProcessingStatus::Failed(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// What a sorted gallery orders by. `Date` and `Text` name a metadata key;
/// `Date` values compare chronologically (RFC 3339), `Text` values compare as
/// plain strings, filenames compare numeric-aware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortCriterion {
    Filename,
    Date(String),
    Text(String),
}

/// Gallery ordering mode: user-placed manual order, or an order derived from
/// an image attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderMode {
    Manual,
    Sorted {
        criterion: SortCriterion,
        direction: SortDirection,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_request_serializes_engine_field_names() {
        let request = EngineRequest {
            parameters: TransformParameters::CanvasExtension {
                desired_height: 2400,
                padding_fraction: 0.05,
                white_threshold: 90,
            },
            requested_width: None,
            requested_height: Some(1200),
            scale_multiplier: 2,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "canvas-extension");
        assert_eq!(json["desiredHeight"], 2400);
        assert_eq!(json["paddingFraction"], 0.05);
        assert_eq!(json["whiteThreshold"], 90);
        assert_eq!(json["requestedHeight"], 1200);
        assert_eq!(json["scaleMultiplier"], 2);
    }

    #[test]
    fn metadata_str_ignores_non_string_values() {
        let mut image = ImageRef {
            id: "img-1".into(),
            url: "https://example.com/img-1.jpg".into(),
            filename: "img-1.jpg".into(),
            metadata: HashMap::new(),
        };
        image
            .metadata
            .insert("brand".into(), serde_json::json!("Aurora"));
        image.metadata.insert("year".into(), serde_json::json!(2024));

        assert_eq!(image.metadata_str("brand"), Some("Aurora"));
        assert_eq!(image.metadata_str("year"), None);
        assert_eq!(image.metadata_str("missing"), None);
    }
}
