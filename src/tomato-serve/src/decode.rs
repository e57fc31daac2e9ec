use image::RgbImage;

use crate::error::{Error, Result};

/// Decoded RGB raster, `height x width x 3` bytes. Never empty.
#[derive(Debug, Clone)]
pub struct PixelArray(RgbImage);

impl PixelArray {
    pub fn new(image: RgbImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::Preprocess(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }

        Ok(PixelArray(image))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.0
    }
}

/// Decode an uploaded image of any format the `image` crate recognises.
///
/// The result is always 8-bit RGB: grayscale is replicated across channels,
/// alpha is dropped and 16-bit samples are scaled down. EXIF orientation is
/// ignored.
pub fn decode(data: &[u8]) -> Result<PixelArray> {
    if data.is_empty() {
        return Err(Error::Decode("empty upload".to_owned()));
    }

    let image = image::load_from_memory(data).map_err(|e| Error::Decode(e.to_string()))?;

    PixelArray::new(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn grayscale_is_replicated() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(7, 3, Luma([42])));
        let pixels = decode(&encode(gray, ImageOutputFormat::Png)).unwrap();

        assert_eq!((pixels.width(), pixels.height()), (7, 3));
        assert!(pixels.as_image().pixels().all(|p| p.0 == [42, 42, 42]));
    }

    #[test]
    fn alpha_is_dropped() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 0])));
        let pixels = decode(&encode(rgba, ImageOutputFormat::Png)).unwrap();

        assert_eq!(pixels.as_image().get_pixel(3, 3).0, [10, 20, 30]);
    }

    #[test]
    fn jpeg_is_accepted() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, image::Rgb([200, 0, 0])));
        let pixels = decode(&encode(rgb, ImageOutputFormat::Jpeg(90))).unwrap();

        assert_eq!((pixels.width(), pixels.height()), (16, 8));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(decode(b"not an image"), Err(Error::Decode(_))));
        assert!(matches!(decode(&[]), Err(Error::Decode(_))));
    }

    #[test]
    fn empty_raster_is_rejected() {
        assert!(matches!(
            PixelArray::new(RgbImage::new(0, 5)),
            Err(Error::Preprocess(_))
        ));
    }
}
