use image::imageops::{self, FilterType};
use image::DynamicImage;

use super::fit_within;
use crate::error::{PersonalizeError, Result};
use crate::models::SourceImage;

/// Decodes an upload into an RGB image no larger than `max_dimension` on
/// either side.
pub fn normalize(bytes: &[u8], content_type: Option<&str>, max_dimension: u32) -> Result<SourceImage> {
    let is_image = content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(PersonalizeError::InvalidInput("File must be an image".into()));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| PersonalizeError::InvalidInput(format!("Could not decode image: {}", e)))?;

    let rgb = match decoded {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => {
            log::debug!("Converting upload from {:?} to RGB", other.color());
            other.to_rgb8()
        }
    };

    let (width, height) = rgb.dimensions();
    let (target_w, target_h) = fit_within(width, height, max_dimension);
    if (target_w, target_h) == (width, height) {
        return Ok(SourceImage::from_rgb(rgb));
    }

    log::debug!(
        "Downsampling upload from {}x{} to {}x{}",
        width,
        height,
        target_w,
        target_h
    );
    let resized = imageops::resize(&rgb, target_w, target_h, FilterType::Lanczos3);
    Ok(SourceImage::from_rgb(resized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::encode_png;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    fn png_of(image: DynamicImage) -> Vec<u8> {
        encode_png(&image).unwrap()
    }

    #[test]
    fn test_rejects_non_image_content_type() {
        let bytes = png_of(DynamicImage::ImageLuma8(GrayImage::new(4, 4)));
        let err = normalize(&bytes, Some("text/plain"), 1024).unwrap_err();
        assert!(matches!(err, PersonalizeError::InvalidInput(_)));

        let err = normalize(&bytes, None, 1024).unwrap_err();
        assert!(matches!(err, PersonalizeError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_undecodable_bytes() {
        let err = normalize(b"definitely not a png", Some("image/png"), 1024).unwrap_err();
        assert!(matches!(err, PersonalizeError::InvalidInput(_)));
    }

    #[test]
    fn test_converts_gray_and_rgba_to_rgb() {
        let gray = png_of(DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 6, Luma([77]))));
        let source = normalize(&gray, Some("image/png"), 1024).unwrap();
        assert_eq!((source.width(), source.height()), (8, 6));
        assert_eq!(source.pixels().get_pixel(0, 0).0, [77, 77, 77]);

        let rgba = png_of(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            5,
            5,
            Rgba([1, 2, 3, 128]),
        )));
        let source = normalize(&rgba, Some("IMAGE/PNG"), 1024).unwrap();
        assert_eq!(source.pixels().get_pixel(4, 4).0, [1, 2, 3]);
    }

    #[test]
    fn test_bounds_dimensions_and_keeps_aspect_ratio() {
        for (w, h) in [(300u32, 120u32), (120, 300), (257, 257), (64, 20)] {
            let bytes = png_of(DynamicImage::ImageLuma8(GrayImage::new(w, h)));
            let source = normalize(&bytes, Some("image/png"), 100).unwrap();
            assert!(source.width().max(source.height()) <= 100);
            if w.max(h) <= 100 {
                assert_eq!((source.width(), source.height()), (w, h));
            } else {
                let before = w as f64 / h as f64;
                let after = source.width() as f64 / source.height() as f64;
                let tolerance = 1.0 / source.width().min(source.height()) as f64 + 0.01;
                assert!((before - after).abs() <= before * tolerance);
            }
        }
    }
}
