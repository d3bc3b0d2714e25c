use core_types::{CropArea, ImageDimensions};

pub mod crop;
pub mod params;
pub mod probe;
pub mod sort;
pub mod variant;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("crop area {crop:?} exceeds source bounds {bounds:?}")]
    CropOutOfBounds {
        crop: CropArea,
        bounds: ImageDimensions,
    },

    #[error("{field} out of range: got {value}, expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid matte color {0:?}: expected six hex digits")]
    InvalidColor(String),

    #[error("decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
