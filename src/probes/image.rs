use super::container;
use crate::error::ExtractError;
use crate::metadata::{round_to, ImageMetadata};
use image::io::Reader;
use image::{ColorType, DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// A decoded image together with the container bytes it came from.
///
/// The file is read once and closed before decoding starts, so holding a
/// `DecodedImage` never pins a file descriptor.
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

pub fn probe(path: &Path) -> Result<(ImageMetadata, DecodedImage), ExtractError> {
    log::trace!("Opening image: {:?}", path);
    let bytes = std::fs::read(path).map_err(|e| ExtractError::from_io(path, e))?;
    let decoded = decode(bytes)?;
    let metadata = describe(&decoded);
    log::debug!(
        "Decoded {:?}: {}x{} {} {}",
        path,
        metadata.width,
        metadata.height,
        metadata.format,
        metadata.color_mode
    );
    Ok((metadata, decoded))
}

pub fn decode(bytes: Vec<u8>) -> Result<DecodedImage, ExtractError> {
    let reader = Reader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| ExtractError::CorruptImage(e.to_string()))?;
    let format = reader.format().ok_or_else(|| {
        ExtractError::UnsupportedFormat("content does not match any known image signature".into())
    })?;
    let image = reader.decode()?;
    Ok(DecodedImage {
        image,
        format,
        bytes,
    })
}

pub fn describe(decoded: &DecodedImage) -> ImageMetadata {
    let (width, height) = (decoded.image.width(), decoded.image.height());
    let frames = container::frame_count(decoded.format, &decoded.bytes);
    let is_animated = frames.is_some_and(|n| n > 1);

    ImageMetadata {
        width,
        height,
        aspect_ratio: aspect_ratio(width, height),
        color_mode: color_mode(decoded.image.color()),
        format: format_name(decoded.format),
        dpi: container::read_dpi(decoded.format, &decoded.bytes),
        is_animated,
        frame_count: frames.filter(|_| is_animated),
    }
}

/// `width / height` to two decimals; undefined for a zero height.
pub fn aspect_ratio(width: u32, height: u32) -> Option<f64> {
    if height == 0 {
        return None;
    }
    Some(round_to(width as f64 / height as f64, 2))
}

fn color_mode(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L8".into(),
        ColorType::La8 => "LA8".into(),
        ColorType::Rgb8 => "RGB8".into(),
        ColorType::Rgba8 => "RGBA8".into(),
        ColorType::L16 => "L16".into(),
        ColorType::La16 => "LA16".into(),
        ColorType::Rgb16 => "RGB16".into(),
        ColorType::Rgba16 => "RGBA16".into(),
        ColorType::Rgb32F => "RGB32F".into(),
        ColorType::Rgba32F => "RGBA32F".into(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

fn format_name(format: ImageFormat) -> String {
    format!("{:?}", format).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn aspect_ratio_guards_zero_height() {
        assert_eq!(aspect_ratio(1920, 1080), Some(1.78));
        assert_eq!(aspect_ratio(100, 100), Some(1.0));
        assert_eq!(aspect_ratio(100, 0), None);
        assert_eq!(aspect_ratio(0, 100), Some(0.0));
    }

    #[test]
    fn describes_a_still_png() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([10, 20, 30])));
        let decoded = decode(png_bytes(image)).unwrap();
        let meta = describe(&decoded);

        assert_eq!(meta.width, 40);
        assert_eq!(meta.height, 30);
        assert_eq!(meta.aspect_ratio, Some(1.33));
        assert_eq!(meta.format, "PNG");
        assert_eq!(meta.color_mode, "RGB8");
        assert_eq!(meta.dpi, None);
        assert!(!meta.is_animated);
        assert_eq!(meta.frame_count, None);
    }

    #[test]
    fn grayscale_mode_is_reported() {
        let decoded = decode(png_bytes(DynamicImage::new_luma8(3, 3))).unwrap();
        assert_eq!(describe(&decoded).color_mode, "L8");
    }

    #[test]
    fn unknown_bytes_are_unsupported() {
        let err = decode(b"definitely not an image".to_vec()).err().unwrap();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn truncated_png_is_corrupt() {
        let bytes = png_bytes(DynamicImage::new_rgb8(64, 64));
        let err = decode(bytes[..bytes.len() / 2].to_vec()).err().unwrap();
        assert!(matches!(err, ExtractError::CorruptImage(_)));
    }
}
