use image::{DynamicImage, codecs::jpeg::JpegEncoder};
use std::borrow::Cow;

use crate::errors::CodecError;

/// Decode an image in any enabled input format and re-encode it as JPEG
pub fn transcode_to_jpeg(data: &[u8], quality: u8) -> Result<Vec<u8>, CodecError> {
    let img = image::load_from_memory(data).map_err(CodecError::Decode)?;
    encode_jpeg(&img, quality)
}

/// Encode an already decoded image as JPEG
///
/// JPEG has no alpha channel and only 8-bit samples, so anything other than
/// 8-bit RGB or grayscale is flattened to 8-bit RGB first.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let img = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => Cow::Borrowed(img),
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    };

    let mut jpeg_bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_bytes, quality);
    img.write_with_encoder(encoder)
        .map_err(CodecError::Encode)?;

    Ok(jpeg_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format)
            .expect("Failed to write test image");
        bytes
    }

    #[test]
    fn test_png_becomes_jpeg() {
        let img = ImageBuffer::from_fn(100, 50, |x, y| Rgb([x as u8, y as u8, 128]));
        let png = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);

        let jpeg = transcode_to_jpeg(&png, 75).unwrap();

        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[test]
    fn test_alpha_channel_is_flattened() {
        let img = ImageBuffer::from_fn(8, 8, |x, _| Rgba([255, 0, 0, (x * 30) as u8]));
        let png = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);

        let jpeg = transcode_to_jpeg(&png, 75).unwrap();

        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_jpeg_input_is_reencoded() {
        let img = ImageBuffer::from_fn(16, 16, |_, _| Rgb([10u8, 20, 30]));
        let jpeg_in = encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg);

        let jpeg_out = transcode_to_jpeg(&jpeg_in, 75).unwrap();

        let decoded = image::load_from_memory(&jpeg_out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn test_transcode_is_deterministic() {
        let img = ImageBuffer::from_fn(32, 32, |x, y| Rgb([x as u8 * 8, y as u8 * 8, 0]));
        let png = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);

        assert_eq!(
            transcode_to_jpeg(&png, 75).unwrap(),
            transcode_to_jpeg(&png, 75).unwrap()
        );
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let result = transcode_to_jpeg(b"definitely not an image", 75);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
