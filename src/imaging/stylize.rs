//! Network-free "illustration" look: soften, then push color and contrast.

use image::{Rgb, RgbImage};

pub const SATURATION_FACTOR: f32 = 1.3;
pub const CONTRAST_FACTOR: f32 = 1.1;

/// 5x5 smoothing kernel, weights sum to 100.
const SMOOTH_MORE: [[u32; 5]; 5] = [
    [1, 1, 1, 1, 1],
    [1, 5, 5, 5, 1],
    [1, 5, 44, 5, 1],
    [1, 5, 5, 5, 1],
    [1, 1, 1, 1, 1],
];
const SMOOTH_MORE_SCALE: u32 = 100;

/// Smooth, boost saturation, boost contrast, in that order. Deterministic.
pub fn stylize(image: &RgbImage) -> RgbImage {
    let smoothed = smooth_more(image);
    let saturated = enhance_color(&smoothed, SATURATION_FACTOR);
    enhance_contrast(&saturated, CONTRAST_FACTOR)
}

pub fn smooth_more(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;

    RgbImage::from_fn(width, height, |x, y| {
        let mut acc = [0u32; 3];
        for (ky, row) in SMOOTH_MORE.iter().enumerate() {
            let sy = (y as i64 + ky as i64 - 2).clamp(0, max_y) as u32;
            for (kx, weight) in row.iter().enumerate() {
                let sx = (x as i64 + kx as i64 - 2).clamp(0, max_x) as u32;
                let px = image.get_pixel(sx, sy);
                for c in 0..3 {
                    acc[c] += u32::from(px[c]) * weight;
                }
            }
        }
        Rgb(acc.map(|sum| ((sum + SMOOTH_MORE_SCALE / 2) / SMOOTH_MORE_SCALE) as u8))
    })
}

/// Blend away from (factor > 1) or toward the pixel's own gray level.
pub fn enhance_color(image: &RgbImage, factor: f32) -> RgbImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let gray = f32::from(luma(px));
        *px = Rgb(px.0.map(|c| blend(gray, f32::from(c), factor)));
    }
    out
}

/// Blend away from (factor > 1) or toward the image's mean gray level.
pub fn enhance_contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return image.clone();
    }
    let total: u64 = image.pixels().map(|px| u64::from(luma(px))).sum();
    let mean = (total as f64 / count as f64 + 0.5).floor() as f32;

    let mut out = image.clone();
    for px in out.pixels_mut() {
        *px = Rgb(px.0.map(|c| blend(mean, f32::from(c), factor)));
    }
    out
}

/// ITU-R 601-2 luma in 16-bit fixed point.
fn luma(px: &Rgb<u8>) -> u8 {
    let [r, g, b] = px.0.map(u32::from);
    ((r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16) as u8
}

fn blend(degenerate: f32, value: f32, factor: f32) -> u8 {
    (degenerate + (value - degenerate) * factor)
        .round()
        .clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 37 % 256) as u8,
                (y * 53 % 256) as u8,
                ((x + y) * 11 % 256) as u8,
            ])
        })
    }

    #[test]
    fn test_stylize_is_deterministic() {
        let input = gradient(33, 21);
        let first = stylize(&input);
        let second = stylize(&input);
        assert_eq!(first.as_raw(), second.as_raw());
        assert_eq!(first.dimensions(), input.dimensions());
    }

    #[test]
    fn test_smooth_more_keeps_flat_regions() {
        let flat = RgbImage::from_pixel(7, 7, Rgb([90, 140, 200]));
        assert_eq!(smooth_more(&flat), flat);
    }

    #[test]
    fn test_smooth_more_softens_a_single_spike() {
        let mut image = RgbImage::from_pixel(9, 9, Rgb([0, 0, 0]));
        image.put_pixel(4, 4, Rgb([200, 200, 200]));
        let smoothed = smooth_more(&image);
        assert_eq!(smoothed.get_pixel(4, 4).0, [88, 88, 88]);
        assert_eq!(smoothed.get_pixel(3, 4).0, [10, 10, 10]);
        assert_eq!(smoothed.get_pixel(2, 4).0, [2, 2, 2]);
        assert_eq!(smoothed.get_pixel(1, 4).0, [0, 0, 0]);
    }

    #[test]
    fn test_enhance_color_spreads_channels_around_gray() {
        let image = RgbImage::from_pixel(2, 2, Rgb([200, 100, 50]));
        let out = enhance_color(&image, SATURATION_FACTOR);
        let px = out.get_pixel(0, 0);
        // gray level of (200, 100, 50) is 124
        assert_eq!(px.0, [223, 93, 28]);

        let gray = RgbImage::from_pixel(2, 2, Rgb([120, 120, 120]));
        assert_eq!(enhance_color(&gray, SATURATION_FACTOR), gray);
    }

    #[test]
    fn test_enhance_contrast_pushes_away_from_mean() {
        let mut image = RgbImage::from_pixel(2, 1, Rgb([100, 100, 100]));
        image.put_pixel(1, 0, Rgb([200, 200, 200]));
        let out = enhance_contrast(&image, CONTRAST_FACTOR);
        assert_eq!(out.get_pixel(0, 0).0, [95, 95, 95]);
        assert_eq!(out.get_pixel(1, 0).0, [205, 205, 205]);
    }
}
