use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::Result;

/// A normalized upload: always RGB8 and bounded in size.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pixels: RgbImage,
}

impl SourceImage {
    pub(crate) fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.pixels.clone())
    }

    /// PNG data URL, the form the prediction API accepts for image inputs.
    pub fn to_data_url(&self) -> Result<String> {
        let png = encode_png(&self.to_dynamic())?;
        Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
    }
}

/// Lossless encoding used for every image that leaves the pipeline.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_data_url_round_trips_through_png() {
        let source = SourceImage::from_rgb(RgbImage::from_pixel(3, 2, Rgb([10, 20, 30])));
        let url = source.to_data_url().unwrap();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = image::load_from_memory(&BASE64.decode(payload).unwrap()).unwrap();
        assert_eq!(decoded.to_rgb8(), *source.pixels());
    }
}
