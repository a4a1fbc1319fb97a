//! EXIF tags, with the commonly used ones lifted into typed fields.
//!
//! Make/Model, exposure, GPS position and capture time are normalized onto
//! [`ExifMetadata`]; every other primary-IFD tag is kept in `tags` under its
//! name with its value type intact.

use super::DecodedImage;
use crate::error::ExtractError;
use crate::metadata::{CaptureTime, ExifMetadata, GpsCoordinates, Rational, TagValue};
use chrono::NaiveDateTime;
use exif::{Exif, Field, In, Tag, Value};
use image::ImageFormat;
use std::collections::HashMap;
use std::io::Cursor;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

pub fn probe(decoded: &DecodedImage) -> Result<ExifMetadata, ExtractError> {
    if !can_carry_exif(decoded.format) {
        log::debug!("{:?} containers carry no EXIF", decoded.format);
        return Ok(ExifMetadata::default());
    }

    match exif::Reader::new().read_from_container(&mut Cursor::new(&decoded.bytes)) {
        Ok(exif) => Ok(normalize(&exif)),
        Err(exif::Error::NotFound(_)) => {
            log::debug!("No EXIF data found");
            Ok(ExifMetadata::default())
        }
        Err(e) => Err(e.into()),
    }
}

fn can_carry_exif(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Tiff | ImageFormat::WebP
    )
}

pub fn normalize(exif: &Exif) -> ExifMetadata {
    let mut fields: HashMap<Tag, &Field> = exif
        .fields()
        .filter(|f| f.ifd_num == In::PRIMARY)
        .map(|f| (f.tag, f))
        .collect();
    log::trace!("Found {} primary EXIF fields", fields.len());

    let mut metadata = ExifMetadata {
        camera_make: take(&mut fields, Tag::Make, first_text),
        camera_model: take(&mut fields, Tag::Model, first_text),
        exposure_time: take(&mut fields, Tag::ExposureTime, first_rational),
        f_number: take(&mut fields, Tag::FNumber, |v| {
            first_rational(v).and_then(Rational::to_f64)
        }),
        iso: take(&mut fields, Tag::PhotographicSensitivity, |v| v.get_uint(0)),
        gps: None,
        captured_at: None,
        tags: Default::default(),
    };

    metadata.captured_at = take(&mut fields, Tag::DateTimeOriginal, first_text)
        .or_else(|| take(&mut fields, Tag::DateTime, first_text))
        .map(|s| parse_capture_time(&s));

    metadata.gps = read_gps(&mut fields);

    metadata.tags = fields
        .into_values()
        .filter_map(|field| {
            let value = convert(&field.value);
            if value.is_none() {
                log::trace!("Skipping EXIF tag {} with unknown value type", field.tag);
            }
            value.map(|v| (field.tag.to_string(), v))
        })
        .collect();

    metadata
}

/// Normalize a field and consume it. A field whose value does not convert is
/// left in place so it is still reported under `tags`.
fn take<T>(
    fields: &mut HashMap<Tag, &Field>,
    tag: Tag,
    normalize: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let value = normalize(&fields.get(&tag)?.value)?;
    fields.remove(&tag);
    Some(value)
}

/// Latitude and longitude are only consumed when both convert; otherwise the
/// raw GPS tags stay in the tag map untouched.
fn read_gps(fields: &mut HashMap<Tag, &Field>) -> Option<GpsCoordinates> {
    let reference = |fields: &HashMap<Tag, &Field>, tag: Tag| {
        fields
            .get(&tag)
            .and_then(|f| first_text(&f.value))
            .unwrap_or_default()
    };

    let latitude = dms_value(&fields.get(&Tag::GPSLatitude)?.value)?;
    let longitude = dms_value(&fields.get(&Tag::GPSLongitude)?.value)?;
    let latitude = dms_to_decimal(latitude, &reference(&*fields, Tag::GPSLatitudeRef));
    let longitude = dms_to_decimal(longitude, &reference(&*fields, Tag::GPSLongitudeRef));

    let altitude = fields
        .get(&Tag::GPSAltitude)
        .and_then(|f| first_rational(&f.value))
        .and_then(Rational::to_f64)
        .map(|alt| {
            let below_sea_level = fields
                .get(&Tag::GPSAltitudeRef)
                .and_then(|f| f.value.get_uint(0))
                == Some(1);
            if below_sea_level {
                -alt
            } else {
                alt
            }
        });

    for tag in [Tag::GPSLatitude, Tag::GPSLatitudeRef, Tag::GPSLongitude, Tag::GPSLongitudeRef] {
        fields.remove(&tag);
    }
    if altitude.is_some() {
        fields.remove(&Tag::GPSAltitude);
        fields.remove(&Tag::GPSAltitudeRef);
    }

    Some(GpsCoordinates {
        latitude,
        longitude,
        altitude,
    })
}

fn dms_value(value: &Value) -> Option<[f64; 3]> {
    match value {
        Value::Rational(v) if v.len() >= 3 => {
            let mut dms = [0.0; 3];
            for (slot, r) in dms.iter_mut().zip(v) {
                *slot = rational(r.num.into(), r.denom.into()).to_f64()?;
            }
            Some(dms)
        }
        _ => None,
    }
}

/// `degrees + minutes/60 + seconds/3600`, negated for the southern and
/// western hemispheres.
pub fn dms_to_decimal(dms: [f64; 3], hemisphere: &str) -> f64 {
    let [degrees, minutes, seconds] = dms;
    let magnitude = degrees + minutes / 60.0 + seconds / 3600.0;
    match hemisphere.trim().chars().next() {
        Some('S' | 's' | 'W' | 'w') => -magnitude,
        _ => magnitude,
    }
}

pub fn parse_capture_time(raw: &str) -> CaptureTime {
    match NaiveDateTime::parse_from_str(raw.trim(), EXIF_DATETIME_FORMAT) {
        Ok(ts) => CaptureTime::Parsed(ts),
        Err(e) => {
            log::debug!("Keeping unparsable capture time {:?}: {}", raw, e);
            CaptureTime::Raw(raw.to_string())
        }
    }
}

fn rational(num: i64, den: i64) -> Rational {
    Rational { num, den }
}

fn first_rational(value: &Value) -> Option<Rational> {
    match value {
        Value::Rational(v) => v.first().map(|r| rational(r.num.into(), r.denom.into())),
        Value::SRational(v) => v.first().map(|r| rational(r.num.into(), r.denom.into())),
        _ => None,
    }
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(v) => v.first().map(|s| ascii(s)).filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn ascii(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// Single-element arrays become scalars; longer ones become tuples.
fn collapse(mut items: Vec<TagValue>) -> TagValue {
    if items.len() == 1 {
        if let Some(item) = items.pop() {
            return item;
        }
    }
    TagValue::Tuple(items)
}

fn integers<T: Copy + Into<i64>>(v: &[T]) -> TagValue {
    collapse(v.iter().map(|&n| TagValue::Integer(n.into())).collect())
}

pub fn convert(value: &Value) -> Option<TagValue> {
    let converted = match value {
        Value::Byte(v) => TagValue::Bytes(v.clone()),
        Value::Undefined(v, _) => TagValue::Bytes(v.clone()),
        Value::Ascii(v) => collapse(v.iter().map(|s| TagValue::Text(ascii(s))).collect()),
        Value::Short(v) => integers(v),
        Value::Long(v) => integers(v),
        Value::SByte(v) => integers(v),
        Value::SShort(v) => integers(v),
        Value::SLong(v) => integers(v),
        Value::Rational(v) => collapse(
            v.iter()
                .map(|r| TagValue::Rational(rational(r.num.into(), r.denom.into())))
                .collect(),
        ),
        Value::SRational(v) => collapse(
            v.iter()
                .map(|r| TagValue::Rational(rational(r.num.into(), r.denom.into())))
                .collect(),
        ),
        Value::Float(v) => collapse(v.iter().map(|&f| TagValue::Float(f.into())).collect()),
        Value::Double(v) => collapse(v.iter().map(|&f| TagValue::Float(f)).collect()),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(converted)
}
