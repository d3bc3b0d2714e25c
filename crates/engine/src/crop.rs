//! Crop geometry against known source bounds.

use core_types::{CropArea, ImageDimensions};

/// Center the largest rectangle of the target aspect ratio that fits
/// entirely within the source.
///
/// When the target is wider than the source, width is pinned to the source
/// width and height derived (floor); otherwise height is pinned and width
/// derived. Called on first load of source dimensions or on an explicit
/// aspect preset selection only; manual edits are never overwritten.
pub fn initialize(source: ImageDimensions, target_width: u32, target_height: u32) -> CropArea {
    let source_aspect = f64::from(source.width) / f64::from(source.height);
    let target_aspect = f64::from(target_width) / f64::from(target_height);

    let (width, height) = if target_aspect > source_aspect {
        let width = source.width;
        let height = (f64::from(width) / target_aspect).floor() as u32;
        (width, height)
    } else {
        let height = source.height;
        let width = (f64::from(height) * target_aspect).floor() as u32;
        (width, height)
    };

    let width = width.clamp(1, source.width);
    let height = height.clamp(1, source.height);

    CropArea {
        x: (source.width - width) / 2,
        y: (source.height - height) / 2,
        width,
        height,
    }
}

/// Pure containment check. A failing crop is a terminal user-facing error at
/// the call site, never an automatic correction: silently resizing a
/// user-specified crop would make crop edits implicit.
pub fn validate(crop: &CropArea, source: &ImageDimensions) -> bool {
    crop.width > 0
        && crop.height > 0
        && crop
            .x
            .checked_add(crop.width)
            .is_some_and(|right| right <= source.width)
        && crop
            .y
            .checked_add(crop.height)
            .is_some_and(|bottom| bottom <= source.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_preset_pins_height_and_centers() {
        // 4000x3000 source, 1080x1920 preset: target aspect 0.5625 is
        // narrower than the source's 1.333, so height pins at 3000.
        let crop = initialize(
            ImageDimensions {
                width: 4000,
                height: 3000,
            },
            1080,
            1920,
        );
        assert_eq!(
            crop,
            CropArea {
                x: 1156,
                y: 0,
                width: 1687,
                height: 3000,
            }
        );
        assert!(validate(
            &crop,
            &ImageDimensions {
                width: 4000,
                height: 3000,
            }
        ));
    }

    #[test]
    fn wide_preset_pins_width() {
        let source = ImageDimensions {
            width: 1000,
            height: 2000,
        };
        let crop = initialize(source, 16, 9);
        assert_eq!(crop.width, 1000);
        assert_eq!(crop.height, 562); // floor(1000 / (16/9))
        assert_eq!(crop.x, 0);
        assert_eq!(crop.y, 719);
        assert!(validate(&crop, &source));
    }

    #[test]
    fn matching_aspect_covers_full_source() {
        let source = ImageDimensions {
            width: 1920,
            height: 1080,
        };
        let crop = initialize(source, 16, 9);
        assert_eq!(
            crop,
            CropArea {
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
            }
        );
    }

    #[test]
    fn initialized_crop_always_contained() {
        let sources = [(4000, 3000), (301, 47), (1, 1), (1080, 1920)];
        let presets = [(1, 1), (16, 9), (9, 16), (4, 5), (3, 2)];
        for (sw, sh) in sources {
            for (tw, th) in presets {
                let source = ImageDimensions {
                    width: sw,
                    height: sh,
                };
                let crop = initialize(source, tw, th);
                assert!(validate(&crop, &source), "{sw}x{sh} preset {tw}:{th}");
            }
        }
    }

    #[test]
    fn validate_rejects_out_of_bounds() {
        let source = ImageDimensions {
            width: 100,
            height: 100,
        };
        let cases = [
            CropArea {
                x: 0,
                y: 0,
                width: 101,
                height: 100,
            },
            CropArea {
                x: 1,
                y: 0,
                width: 100,
                height: 100,
            },
            CropArea {
                x: 0,
                y: 50,
                width: 100,
                height: 51,
            },
            CropArea {
                x: 0,
                y: 0,
                width: 0,
                height: 100,
            },
            CropArea {
                x: u32::MAX,
                y: 0,
                width: 1,
                height: 1,
            },
        ];
        for crop in cases {
            assert!(!validate(&crop, &source), "{crop:?}");
        }
    }
}
