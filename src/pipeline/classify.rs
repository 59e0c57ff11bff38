//! Radiograph heuristic.
//!
//! Grayscale does not imply x-ray; this is advisory metadata only. It is
//! reported alongside the analysis and does not change the prompt, the
//! dispatch, or the document.

use image::{ColorType, DynamicImage};

/// `true` iff the decoded pixels are single-channel luminance.
///
/// Luma+alpha is two channels and does not count.
pub fn is_likely_xray(image: &DynamicImage) -> bool {
    matches!(image.color(), ColorType::L8 | ColorType::L16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, GrayImage, Luma, LumaA, Rgb, RgbImage};

    #[test]
    fn grayscale_is_flagged_and_identical_colour_copy_is_not() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 16, Luma([90])));
        let rgb = DynamicImage::ImageRgb8(gray.to_rgb8());

        assert!(is_likely_xray(&gray));
        assert!(!is_likely_xray(&rgb));
    }

    #[test]
    fn sixteen_bit_grayscale_is_flagged() {
        let gray16 = DynamicImage::ImageLuma16(image::ImageBuffer::from_pixel(2, 2, Luma([40_000u16])));
        assert!(is_likely_xray(&gray16));
    }

    #[test]
    fn gray_with_alpha_is_not_flagged() {
        let la = DynamicImage::ImageLumaA8(GrayAlphaImage::from_pixel(2, 2, LumaA([1, 255])));
        assert!(!is_likely_xray(&la));
    }

    #[test]
    fn colour_is_not_flagged() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([200, 10, 10])));
        assert!(!is_likely_xray(&rgb));
    }
}
