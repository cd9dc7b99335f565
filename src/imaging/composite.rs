use image::imageops::{self, FilterType};
use image::DynamicImage;

use super::fit_within;

/// Pastes `face` centered over a copy of `template`, shrunk to fit a square
/// half the template's shorter side. There is no face detection: the center
/// of the template is assumed to be the face slot.
///
/// A face with an alpha channel is blended through it; an opaque face
/// overwrites the destination region.
pub fn composite(face: &DynamicImage, template: &DynamicImage) -> DynamicImage {
    let (template_w, template_h) = (template.width(), template.height());
    let face_size = template_w.min(template_h) / 2;

    let (face_w, face_h) = fit_within(face.width(), face.height(), face_size);
    let face = if (face_w, face_h) == (face.width(), face.height()) {
        face.clone()
    } else {
        face.resize_exact(face_w, face_h, FilterType::Lanczos3)
    };

    let x = i64::from((template_w - face_w) / 2);
    let y = i64::from((template_h - face_h) / 2);
    log::debug!(
        "Compositing {}x{} face into {}x{} template at ({}, {})",
        face_w,
        face_h,
        template_w,
        template_h,
        x,
        y
    );

    if face.color().has_alpha() {
        let mut base = template.to_rgba8();
        imageops::overlay(&mut base, &face.to_rgba8(), x, y);
        DynamicImage::ImageRgba8(base)
    } else if template.color().has_alpha() {
        let mut base = template.to_rgba8();
        imageops::replace(&mut base, &face.to_rgba8(), x, y);
        DynamicImage::ImageRgba8(base)
    } else {
        let mut base = template.to_rgb8();
        imageops::replace(&mut base, &face.to_rgb8(), x, y);
        DynamicImage::ImageRgb8(base)
    }
}
