//! Format-specific details the decoder does not surface: resolution and
//! animation frame counts, read straight from the container bytes.

use crate::metadata::Dpi;
use exif::{In, Tag, Value};
use image::codecs::gif::GifDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, ImageFormat};
use std::io::Cursor;

const INCHES_PER_METER: f64 = 0.0254;
const CM_PER_INCH: f64 = 2.54;

/// Resolution stored in the container, if any. Never guessed.
pub fn read_dpi(format: ImageFormat, bytes: &[u8]) -> Option<Dpi> {
    let native = match format {
        ImageFormat::Png => png_dpi(bytes),
        ImageFormat::Jpeg => jfif_dpi(bytes),
        ImageFormat::Bmp => bmp_dpi(bytes),
        _ => None,
    };
    native.or_else(|| match format {
        ImageFormat::Jpeg | ImageFormat::Tiff | ImageFormat::Png | ImageFormat::WebP => {
            exif_dpi(bytes)
        }
        _ => None,
    })
}

/// Number of frames, for containers that can hold more than one.
pub fn frame_count(format: ImageFormat, bytes: &[u8]) -> Option<u32> {
    match format {
        ImageFormat::Png => apng_frames(bytes),
        ImageFormat::Gif => gif_frames(bytes),
        ImageFormat::WebP => webp_frames(bytes),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// PNG: pHYs and acTL chunks
// ---------------------------------------------------------------------------

fn png_info(bytes: &[u8]) -> Option<png::Reader<Cursor<&[u8]>>> {
    png::Decoder::new(Cursor::new(bytes)).read_info().ok()
}

fn png_dpi(bytes: &[u8]) -> Option<Dpi> {
    let reader = png_info(bytes)?;
    let dims = reader.info().pixel_dims?;
    match dims.unit {
        png::Unit::Meter if dims.xppu > 0 && dims.yppu > 0 => Some(Dpi::new(
            dims.xppu as f64 * INCHES_PER_METER,
            dims.yppu as f64 * INCHES_PER_METER,
        )),
        _ => None,
    }
}

/// APNG frame count from the animation control chunk; no frame is decoded.
fn apng_frames(bytes: &[u8]) -> Option<u32> {
    let reader = png_info(bytes)?;
    let count = reader
        .info()
        .animation_control
        .map(|actl| actl.num_frames)
        .unwrap_or(1);
    Some(count)
}

// ---------------------------------------------------------------------------
// GIF
// ---------------------------------------------------------------------------

/// GIF has no frame count in its header, so every frame is walked.
fn gif_frames(bytes: &[u8]) -> Option<u32> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).ok()?;
    let count = decoder
        .into_frames()
        .take_while(|frame| frame.is_ok())
        .count();
    u32::try_from(count).ok()
}

// ---------------------------------------------------------------------------
// WebP: ANIM flag in the extended header
// ---------------------------------------------------------------------------

/// Still WebP images count as a single frame without touching the frames.
fn webp_frames(bytes: &[u8]) -> Option<u32> {
    let decoder = WebPDecoder::new(Cursor::new(bytes)).ok()?;
    if !decoder.has_animation() {
        return Some(1);
    }
    let count = decoder
        .into_frames()
        .take_while(|frame| frame.is_ok())
        .count();
    u32::try_from(count).ok()
}

// ---------------------------------------------------------------------------
// JPEG: JFIF APP0 density
// ---------------------------------------------------------------------------

const JFIF_IDENTIFIER: &[u8] = b"JFIF\0";

/// Walk the marker segments up to the start of scan looking for APP0/JFIF.
///
/// APP0 payload layout:
///   0..5   "JFIF\0"
///   5..7   version
///   7      density unit (0 = aspect ratio only, 1 = dpi, 2 = dots per cm)
///   8..10  X density (big-endian u16)
///   10..12 Y density (big-endian u16)
fn jfif_dpi(data: &[u8]) -> Option<Dpi> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // SOS / EOI: no more metadata segments
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }

        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if length < 2 {
            return None;
        }
        let payload = data.get(pos + 4..pos + 2 + length)?;

        if marker == 0xE0 && payload.len() >= 12 && payload.starts_with(JFIF_IDENTIFIER) {
            let unit = payload[7];
            let x = u16::from_be_bytes([payload[8], payload[9]]);
            let y = u16::from_be_bytes([payload[10], payload[11]]);
            return density_to_dpi(unit, x as f64, y as f64);
        }

        pos += 2 + length;
    }
    None
}

/// `unit`: 1 = per inch, 2 = per centimetre, anything else carries no
/// physical size.
fn density_to_dpi(unit: u8, x: f64, y: f64) -> Option<Dpi> {
    if x <= 0.0 || y <= 0.0 {
        return None;
    }
    match unit {
        1 => Some(Dpi::new(x, y)),
        2 => Some(Dpi::new(x * CM_PER_INCH, y * CM_PER_INCH)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// BMP: BITMAPINFOHEADER pixels per metre
// ---------------------------------------------------------------------------

const BMP_FILE_HEADER_LEN: usize = 14;
const BMP_INFO_HEADER_MIN_LEN: u32 = 40;

fn bmp_dpi(data: &[u8]) -> Option<Dpi> {
    if !data.starts_with(b"BM") || data.len() < BMP_FILE_HEADER_LEN + 32 {
        return None;
    }
    let header_len = u32::from_le_bytes(data[14..18].try_into().ok()?);
    // The 12-byte OS/2 core header has no resolution fields
    if header_len < BMP_INFO_HEADER_MIN_LEN {
        return None;
    }
    let x = i32::from_le_bytes(data[38..42].try_into().ok()?);
    let y = i32::from_le_bytes(data[42..46].try_into().ok()?);
    if x <= 0 || y <= 0 {
        return None;
    }
    Some(Dpi::new(
        x as f64 * INCHES_PER_METER,
        y as f64 * INCHES_PER_METER,
    ))
}

// ---------------------------------------------------------------------------
// EXIF XResolution / YResolution
// ---------------------------------------------------------------------------

fn exif_dpi(bytes: &[u8]) -> Option<Dpi> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;

    let resolution = |tag: Tag| match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(v) => v.first().map(|r| r.to_f64()).filter(|r| r.is_finite()),
        _ => None,
    };
    // TIFF default unit is inches
    let unit = exif
        .get_field(Tag::ResolutionUnit, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(2);

    let x = resolution(Tag::XResolution)?;
    // A lone X resolution applies to both axes
    let y = resolution(Tag::YResolution).unwrap_or(x);
    match unit {
        2 => density_to_dpi(1, x, y),
        3 => density_to_dpi(2, x, y),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_with_app0(unit: u8, x: u16, y: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[1, 1, unit]);
        data.extend_from_slice(&x.to_be_bytes());
        data.extend_from_slice(&y.to_be_bytes());
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        data
    }

    #[test]
    fn jfif_density_in_inches() {
        let data = jpeg_with_app0(1, 300, 150);
        assert_eq!(jfif_dpi(&data), Some(Dpi { x: 300.0, y: 150.0 }));
    }

    #[test]
    fn jfif_density_in_centimetres() {
        let data = jpeg_with_app0(2, 100, 100);
        assert_eq!(jfif_dpi(&data), Some(Dpi { x: 254.0, y: 254.0 }));
    }

    #[test]
    fn jfif_aspect_ratio_only_has_no_dpi() {
        assert_eq!(jfif_dpi(&jpeg_with_app0(0, 1, 1)), None);
        assert_eq!(jfif_dpi(&jpeg_with_app0(1, 0, 0)), None);
    }

    #[test]
    fn jfif_parser_survives_truncation() {
        let data = jpeg_with_app0(1, 300, 300);
        for len in 0..data.len() {
            let _ = jfif_dpi(&data[..len]);
        }
        assert_eq!(jfif_dpi(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x00]), None);
    }

    #[test]
    fn bmp_pixels_per_metre() {
        let mut data = vec![0u8; 54];
        data[0..2].copy_from_slice(b"BM");
        data[14..18].copy_from_slice(&40u32.to_le_bytes());
        data[38..42].copy_from_slice(&3780i32.to_le_bytes());
        data[42..46].copy_from_slice(&3780i32.to_le_bytes());
        assert_eq!(bmp_dpi(&data), Some(Dpi { x: 96.01, y: 96.01 }));

        data[38..42].copy_from_slice(&0i32.to_le_bytes());
        assert_eq!(bmp_dpi(&data), None);
    }

    #[test]
    fn png_without_phys_has_no_dpi() {
        let mut bytes = Vec::new();
        image::DynamicImage::new_rgb8(4, 4)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        assert_eq!(read_dpi(ImageFormat::Png, &bytes), None);
        assert_eq!(frame_count(ImageFormat::Png, &bytes), Some(1));
    }

    #[test]
    fn png_phys_in_metres() {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, 2, 2);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: 2835,
                yppu: 5670,
                unit: png::Unit::Meter,
            }));
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0u8; 12]).unwrap();
        }
        assert_eq!(read_dpi(ImageFormat::Png, &bytes), Some(Dpi { x: 72.01, y: 144.02 }));
    }

    fn tiff_with(fields: &[(Tag, Value)]) -> Vec<u8> {
        let fields: Vec<exif::Field> = fields
            .iter()
            .map(|(tag, value)| exif::Field {
                tag: *tag,
                ifd_num: In::PRIMARY,
                value: value.clone(),
            })
            .collect();
        let mut writer = exif::experimental::Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).unwrap();
        buf.into_inner()
    }

    fn resolution(n: u32) -> Value {
        Value::Rational(vec![exif::Rational::from((n, 1))])
    }

    #[test]
    fn exif_resolution_in_inches() {
        let bytes = tiff_with(&[
            (Tag::XResolution, resolution(300)),
            (Tag::YResolution, resolution(150)),
            (Tag::ResolutionUnit, Value::Short(vec![2])),
        ]);
        assert_eq!(read_dpi(ImageFormat::Tiff, &bytes), Some(Dpi { x: 300.0, y: 150.0 }));
    }

    #[test]
    fn lone_x_resolution_applies_to_both_axes() {
        let bytes = tiff_with(&[(Tag::XResolution, resolution(240))]);
        assert_eq!(read_dpi(ImageFormat::Tiff, &bytes), Some(Dpi { x: 240.0, y: 240.0 }));
    }

    #[test]
    fn exif_resolution_units() {
        let per_cm = tiff_with(&[
            (Tag::XResolution, resolution(100)),
            (Tag::YResolution, resolution(100)),
            (Tag::ResolutionUnit, Value::Short(vec![3])),
        ]);
        assert_eq!(read_dpi(ImageFormat::Tiff, &per_cm), Some(Dpi { x: 254.0, y: 254.0 }));

        let no_unit = tiff_with(&[
            (Tag::XResolution, resolution(72)),
            (Tag::YResolution, resolution(72)),
            (Tag::ResolutionUnit, Value::Short(vec![1])),
        ]);
        assert_eq!(read_dpi(ImageFormat::Tiff, &no_unit), None);

        let no_resolution = tiff_with(&[(Tag::ResolutionUnit, Value::Short(vec![2]))]);
        assert_eq!(read_dpi(ImageFormat::Tiff, &no_resolution), None);
    }

    #[test]
    fn apng_frames_from_actl() {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, 2, 2);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_animated(3, 0).unwrap();
            let mut writer = encoder.write_header().unwrap();
            for shade in [0u8, 128, 255] {
                writer.write_image_data(&[shade; 12]).unwrap();
            }
            writer.finish().unwrap();
        }
        assert_eq!(frame_count(ImageFormat::Png, &bytes), Some(3));
    }

    #[test]
    fn still_webp_is_one_frame() {
        let mut bytes = Vec::new();
        image::codecs::webp::WebPEncoder::new_lossless(&mut bytes)
            .encode(&[200u8; 4 * 4 * 3], 4, 4, image::ColorType::Rgb8)
            .unwrap();
        assert_eq!(frame_count(ImageFormat::WebP, &bytes), Some(1));
        assert_eq!(frame_count(ImageFormat::WebP, b"RIFF\0\0\0\0WEBP"), None);
    }

    #[test]
    fn density_units() {
        assert_eq!(density_to_dpi(1, 72.0, 72.0), Some(Dpi { x: 72.0, y: 72.0 }));
        assert_eq!(density_to_dpi(3, 72.0, 72.0), None);
        assert_eq!(density_to_dpi(1, -1.0, 72.0), None);
    }
}
